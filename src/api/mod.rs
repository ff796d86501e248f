pub mod auth;
pub mod error;
pub mod payments;
pub mod portfolio;
pub mod rest;
