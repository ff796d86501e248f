pub mod cache;
pub mod catalog;
pub mod client;
pub mod pairs;
pub mod retry;
pub mod types;
