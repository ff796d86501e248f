// =============================================================================
// Pair naming — pure helpers for the upstream provider's symbol conventions
// =============================================================================
//
// The upstream provider is inconsistent about pair keys: a request for
// "XBTUSD" may come back under "XXBTZUSD" (legacy X/Z prefixing), while newer
// listings use the plain concatenated form. Everything in this module is a
// pure function so the heuristics stay independently testable.
// =============================================================================

/// Default pair set served when the caller requests none.
pub const DEFAULT_PAIRS: [&str; 6] = [
    "XBTUSD", "ETHUSD", "SOLUSD", "ADAUSD", "XRPUSD", "BNBUSD",
];

/// Quote currencies we know how to strip off a pair code. Order matters only
/// for readability; at most one suffix can match a given pair.
const KNOWN_QUOTES: [&str; 4] = ["USDT", "USD", "EUR", "GBP"];

/// Display metadata for one recognized base asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseMeta {
    pub id: &'static str,
    pub symbol: &'static str,
    pub name: &'static str,
}

/// Fixed lookup table keyed by recognized base-asset codes. The legacy
/// Bitcoin code "XBT" maps to the BTC display symbol.
pub fn base_metadata(base: &str) -> Option<BaseMeta> {
    let meta = match base {
        "XBT" => BaseMeta { id: "bitcoin", symbol: "BTC", name: "Bitcoin" },
        "ETH" => BaseMeta { id: "ethereum", symbol: "ETH", name: "Ethereum" },
        "SOL" => BaseMeta { id: "solana", symbol: "SOL", name: "Solana" },
        "ADA" => BaseMeta { id: "cardano", symbol: "ADA", name: "Cardano" },
        "XRP" => BaseMeta { id: "ripple", symbol: "XRP", name: "XRP" },
        "BNB" => BaseMeta { id: "binancecoin", symbol: "BNB", name: "BNB" },
        "USDT" => BaseMeta { id: "tether", symbol: "USDT", name: "Tether" },
        "DOT" => BaseMeta { id: "polkadot", symbol: "DOT", name: "Polkadot" },
        "LTC" => BaseMeta { id: "litecoin", symbol: "LTC", name: "Litecoin" },
        "TRX" => BaseMeta { id: "tron", symbol: "TRX", name: "TRON" },
        "DOGE" => BaseMeta { id: "dogecoin", symbol: "DOGE", name: "Dogecoin" },
        "LINK" => BaseMeta { id: "chainlink", symbol: "LINK", name: "Chainlink" },
        "MATIC" => BaseMeta { id: "matic-network", symbol: "MATIC", name: "Polygon" },
        "AVAX" => BaseMeta { id: "avalanche", symbol: "AVAX", name: "Avalanche" },
        "ATOM" => BaseMeta { id: "cosmos", symbol: "ATOM", name: "Cosmos" },
        "XLM" => BaseMeta { id: "stellar", symbol: "XLM", name: "Stellar" },
        "XMR" => BaseMeta { id: "monero", symbol: "XMR", name: "Monero" },
        "UNI" => BaseMeta { id: "uniswap", symbol: "UNI", name: "Uniswap" },
        "AAVE" => BaseMeta { id: "aave", symbol: "AAVE", name: "Aave" },
        "ALGO" => BaseMeta { id: "algorand", symbol: "ALGO", name: "Algorand" },
        "BCH" => BaseMeta { id: "bitcoin-cash", symbol: "BCH", name: "Bitcoin Cash" },
        "ETC" => BaseMeta { id: "ethereum-classic", symbol: "ETC", name: "Ethereum Classic" },
        "NEAR" => BaseMeta { id: "near", symbol: "NEAR", name: "NEAR Protocol" },
        "FIL" => BaseMeta { id: "filecoin", symbol: "FIL", name: "Filecoin" },
        _ => return None,
    };
    Some(meta)
}

/// Split a pair code into `(base, quote)`. Falls back to a trailing
/// three-byte quote when the suffix is not a known quote currency. Upstream
/// pair codes are ASCII; anything where the three-byte cut would land inside
/// a multibyte character gets no quote and will match no upstream key.
pub fn split_pair(pair: &str) -> (&str, &str) {
    for quote in KNOWN_QUOTES {
        if pair.len() > quote.len() && pair.ends_with(quote) {
            return (&pair[..pair.len() - quote.len()], quote);
        }
    }
    if pair.len() > 3 && pair.is_char_boundary(pair.len() - 3) {
        pair.split_at(pair.len() - 3)
    } else {
        (pair, "")
    }
}

/// Locate the upstream record key for a requested pair.
///
/// Two-stage lookup: exact key match first, then a fuzzy match that requires
/// the key to contain the base code AND end with the quote code (this is what
/// absorbs the upstream's legacy prefixing, e.g. "XBTUSD" → "XXBTZUSD").
/// Ambiguous fuzzy matches resolve to the first key in `keys` order.
pub fn match_upstream_key<'a>(pair: &str, keys: &'a [String]) -> Option<&'a str> {
    if let Some(exact) = keys.iter().find(|k| k.as_str() == pair) {
        return Some(exact.as_str());
    }
    let (base, quote) = split_pair(pair);
    if base.is_empty() || quote.is_empty() {
        return None;
    }
    keys.iter()
        .find(|k| k.contains(base) && k.ends_with(quote))
        .map(|k| k.as_str())
}

/// Derive `(id, symbol, name)` display metadata for a requested pair. Known
/// bases use the fixed table; anything else gets a best-effort derivation
/// from the pair string itself.
pub fn pair_metadata(pair: &str) -> (String, String, String) {
    let (base, _) = split_pair(pair);
    match base_metadata(base) {
        Some(meta) => (meta.id.to_string(), meta.symbol.to_string(), meta.name.to_string()),
        None => (base.to_lowercase(), base.to_uppercase(), base.to_string()),
    }
}

/// Map a canonical asset id to its USD pair on the upstream provider. Covers
/// the ~50 well-known assets the dashboard can chart; everything else is
/// searchable but un-paired.
pub fn map_id_to_pair(id: &str) -> Option<&'static str> {
    let pair = match id {
        // Majors
        "bitcoin" => "XBTUSD",
        "ethereum" => "ETHUSD",
        "tether" => "USDTUSD",
        "ripple" => "XRPUSD",
        "cardano" => "ADAUSD",
        "solana" => "SOLUSD",
        "polkadot" => "DOTUSD",
        "litecoin" => "LTCUSD",
        "tron" => "TRXUSD",
        "dogecoin" => "DOGEUSD",
        "chainlink" => "LINKUSD",
        "binancecoin" => "BNBUSD",
        // Popular L1/L2 & tokens
        "matic-network" => "MATICUSD",
        "shiba-inu" => "SHIBUSD",
        "internet-computer" => "ICPUSD",
        "uniswap" => "UNIUSD",
        "aave" => "AAVEUSD",
        "algorand" => "ALGOUSD",
        "stellar" => "XLMUSD",
        "monero" => "XMRUSD",
        "cosmos" => "ATOMUSD",
        "filecoin" => "FILUSD",
        "eos" => "EOSUSD",
        "near" => "NEARUSD",
        "aptos" => "APTUSD",
        "avalanche" => "AVAXUSD",
        "curve-dao-token" => "CRVUSD",
        "compound-governance-token" => "COMPUSD",
        "maker" => "MKRUSD",
        "synthetix-network-token" => "SNXUSD",
        "optimism" => "OPUSD",
        "arbitrum" => "ARBUSD",
        "pepe" => "PEPEUSD",
        "kaspa" => "KASUSD",
        "celestia" => "TIAUSD",
        "render-token" => "RNDRUSD",
        "immutable-x" => "IMXUSD",
        "bonk" => "BONKUSD",
        "sui" => "SUIUSD",
        "mantle" => "MNTUSD",
        "hedera-hashgraph" => "HBARUSD",
        "bitcoin-cash" => "BCHUSD",
        "ethereum-classic" => "ETCUSD",
        "lido-dao" => "LDOUSD",
        "injective" => "INJUSD",
        "floki" => "FLOKIUSD",
        "the-sandbox" => "SANDUSD",
        "decentraland" => "MANAUSD",
        "loopring" => "LRCUSD",
        "arweave" => "ARUSD",
        "mina-protocol" => "MINAUSD",
        "gala" => "GALAUSD",
        "apecoin" => "APEUSD",
        "1inch" => "1INCHUSD",
        _ => return None,
    };
    Some(pair)
}

/// Parse the `pairs` query parameter: comma-separated, case-insensitive,
/// whitespace-trimmed. Empty or missing input yields the default set.
pub fn parse_requested_pairs(raw: Option<&str>) -> Vec<String> {
    let pairs: Vec<String> = raw
        .unwrap_or_default()
        .split(',')
        .map(|p| p.trim().to_uppercase())
        .filter(|p| !p.is_empty())
        .collect();
    if pairs.is_empty() {
        DEFAULT_PAIRS.iter().map(|p| p.to_string()).collect()
    } else {
        pairs
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn split_known_quotes() {
        assert_eq!(split_pair("XBTUSD"), ("XBT", "USD"));
        assert_eq!(split_pair("ETHEUR"), ("ETH", "EUR"));
        assert_eq!(split_pair("ETHUSDT"), ("ETH", "USDT"));
        assert_eq!(split_pair("USDTUSD"), ("USDT", "USD"));
    }

    #[test]
    fn split_unknown_quote_falls_back_to_three_chars() {
        assert_eq!(split_pair("XBTJPY"), ("XBT", "JPY"));
        assert_eq!(split_pair("AB"), ("AB", ""));
    }

    #[test]
    fn split_multibyte_pair_never_panics() {
        // Requests arrive unauthenticated and uppercased but otherwise raw;
        // a multibyte code must fall through cleanly instead of slicing
        // inside a character.
        assert_eq!(split_pair("A€B"), ("A€B", ""));
        assert_eq!(split_pair("€€"), ("€", "€"));
        assert_eq!(split_pair("ÉTHUSD"), ("ÉTH", "USD"));
    }

    #[test]
    fn multibyte_pair_matches_no_upstream_key() {
        let ks = keys(&["XXBTZUSD"]);
        assert_eq!(match_upstream_key("A€B", &ks), None);
    }

    #[test]
    fn exact_key_match_wins() {
        let ks = keys(&["XXBTZUSD", "XBTUSD"]);
        assert_eq!(match_upstream_key("XBTUSD", &ks), Some("XBTUSD"));
    }

    #[test]
    fn fuzzy_match_handles_legacy_prefixing() {
        let ks = keys(&["XXBTZUSD", "XETHZUSD"]);
        assert_eq!(match_upstream_key("XBTUSD", &ks), Some("XXBTZUSD"));
        assert_eq!(match_upstream_key("ETHUSD", &ks), Some("XETHZUSD"));
    }

    #[test]
    fn fuzzy_match_requires_quote_suffix() {
        // Contains the base but quoted in EUR — must not match a USD request.
        let ks = keys(&["XXBTZEUR"]);
        assert_eq!(match_upstream_key("XBTUSD", &ks), None);
    }

    #[test]
    fn ambiguous_fuzzy_match_takes_first_key() {
        let ks = keys(&["XXBTZUSD", "XBTUSDC.USD"]);
        assert_eq!(match_upstream_key("XBTUSD", &ks), Some("XXBTZUSD"));
    }

    #[test]
    fn unknown_pair_matches_nothing() {
        let ks = keys(&["XXBTZUSD"]);
        assert_eq!(match_upstream_key("FOOUSD", &ks), None);
    }

    #[test]
    fn metadata_from_table_and_fallback() {
        assert_eq!(
            pair_metadata("XBTUSD"),
            ("bitcoin".to_string(), "BTC".to_string(), "Bitcoin".to_string())
        );
        assert_eq!(
            pair_metadata("ZZZUSD"),
            ("zzz".to_string(), "ZZZ".to_string(), "ZZZ".to_string())
        );
    }

    #[test]
    fn id_pair_table_covers_majors() {
        assert_eq!(map_id_to_pair("bitcoin"), Some("XBTUSD"));
        assert_eq!(map_id_to_pair("ethereum"), Some("ETHUSD"));
        assert_eq!(map_id_to_pair("some-unknown-asset"), None);
    }

    #[test]
    fn parse_pairs_defaults_and_normalizes() {
        assert_eq!(parse_requested_pairs(None).len(), 6);
        assert_eq!(parse_requested_pairs(Some("  ")).len(), 6);
        assert_eq!(
            parse_requested_pairs(Some(" xbtusd , ethUSD ,")),
            vec!["XBTUSD".to_string(), "ETHUSD".to_string()]
        );
    }
}
