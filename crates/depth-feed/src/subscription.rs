//! Book subscription derived from the engine configuration

use depth_types::{BookParams, BookRequest, Depth, Symbol};

/// The one book subscription a session maintains
///
/// Never stored on its own: the owner rebuilds it from its configuration
/// before every connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    /// Trading pair
    pub symbol: Symbol,
    /// Depth tier requested from the exchange
    pub depth: Depth,
}

impl Subscription {
    /// Create a book subscription
    pub fn new(symbol: Symbol, depth: Depth) -> Self {
        Self { symbol, depth }
    }

    fn params(&self) -> BookParams {
        BookParams::new(self.symbol.as_str(), self.depth)
    }

    /// Subscribe request tagged with `req_id`
    pub fn subscribe_request(&self, req_id: u64) -> BookRequest {
        BookRequest::subscribe(self.params()).with_req_id(req_id)
    }

    /// Unsubscribe request tagged with `req_id`
    pub fn unsubscribe_request(&self, req_id: u64) -> BookRequest {
        BookRequest::unsubscribe(self.params()).with_req_id(req_id)
    }

    /// Check if a book entry for `symbol` belongs to this subscription
    pub fn matches(&self, symbol: &str) -> bool {
        self.symbol == *symbol
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_request_json() {
        let sub = Subscription::new("ETH/USD".parse().unwrap(), Depth::D25);
        let json = sub.subscribe_request(7).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["method"], "subscribe");
        assert_eq!(value["params"]["channel"], "book");
        assert_eq!(value["params"]["symbol"][0], "ETH/USD");
        assert_eq!(value["params"]["snapshot"], true);
        assert_eq!(value["params"]["depth"], 25);
        assert_eq!(value["req_id"], 7);
    }

    #[test]
    fn test_unsubscribe_request() {
        let sub = Subscription::new(Symbol::default(), Depth::D10);
        let request = sub.unsubscribe_request(1);
        assert_eq!(request.method, depth_types::Method::Unsubscribe);
        assert_eq!(request.params.symbol, vec!["BTC/USD".to_string()]);
    }

    #[test]
    fn test_matches() {
        let sub = Subscription::new(Symbol::default(), Depth::D10);
        assert!(sub.matches("BTC/USD"));
        assert!(!sub.matches("ETH/USD"));
    }
}
