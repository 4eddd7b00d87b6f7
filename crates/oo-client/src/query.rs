//! Query string parameters
//!
//! List values are sent as a single comma-joined string (`tags=a,b,c`),
//! which is what the compute API parses. Repeated keys are never emitted.

/// A single query parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Str(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    List(Vec<String>),
}

impl QueryValue {
    /// Wire form of the value
    pub fn encode(&self) -> String {
        match self {
            QueryValue::Str(s) => s.clone(),
            QueryValue::Int(n) => n.to_string(),
            QueryValue::UInt(n) => n.to_string(),
            QueryValue::Float(f) => f.to_string(),
            QueryValue::Bool(b) => b.to_string(),
            QueryValue::List(items) => items.join(","),
        }
    }
}

impl From<&str> for QueryValue {
    fn from(s: &str) -> Self {
        QueryValue::Str(s.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(s: String) -> Self {
        QueryValue::Str(s)
    }
}

impl From<i64> for QueryValue {
    fn from(n: i64) -> Self {
        QueryValue::Int(n)
    }
}

impl From<u32> for QueryValue {
    fn from(n: u32) -> Self {
        QueryValue::UInt(u64::from(n))
    }
}

impl From<u64> for QueryValue {
    fn from(n: u64) -> Self {
        QueryValue::UInt(n)
    }
}

impl From<f64> for QueryValue {
    fn from(f: f64) -> Self {
        QueryValue::Float(f)
    }
}

impl From<bool> for QueryValue {
    fn from(b: bool) -> Self {
        QueryValue::Bool(b)
    }
}

impl From<Vec<String>> for QueryValue {
    fn from(items: Vec<String>) -> Self {
        QueryValue::List(items)
    }
}

/// Ordered set of query parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    pairs: Vec<(String, QueryValue)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter, replacing an earlier one with the same key
    pub fn push(mut self, key: &str, value: impl Into<QueryValue>) -> Self {
        let value = value.into();
        if matches!(&value, QueryValue::List(items) if items.is_empty()) {
            return self;
        }
        match self.pairs.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => self.pairs.push((key.to_string(), value)),
        }
        self
    }

    /// Add a parameter only when a value is present
    pub fn push_opt<V: Into<QueryValue>>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.push(key, v),
            None => self,
        }
    }

    /// Add a comma-joined list; an empty list adds nothing
    pub fn push_list<I, S>(self, key: &str, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items: Vec<String> = items.into_iter().map(Into::into).collect();
        self.push(key, QueryValue::List(items))
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Encoded value for `key`
    pub fn get(&self, key: &str) -> Option<String> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.encode())
    }

    /// Key/value pairs in insertion order, ready for the query string
    pub fn encode(&self) -> Vec<(String, String)> {
        self.pairs
            .iter()
            .map(|(k, v)| (k.clone(), v.encode()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_is_comma_joined() {
        let query = QueryParams::new().push_list("tags", ["a", "b", "c"]);
        assert_eq!(query.get("tags").as_deref(), Some("a,b,c"));
    }

    #[test]
    fn test_empty_list_is_omitted() {
        let query = QueryParams::new().push_list("tags", Vec::<String>::new());
        assert!(query.is_empty());
    }

    #[test]
    fn test_scalar_encoding() {
        let query = QueryParams::new()
            .push("limit", 100u32)
            .push("offset", 0i64)
            .push("ratio", 0.5)
            .push("graceful", true)
            .push("status", "active");

        assert_eq!(
            query.encode(),
            vec![
                ("limit".to_string(), "100".to_string()),
                ("offset".to_string(), "0".to_string()),
                ("ratio".to_string(), "0.5".to_string()),
                ("graceful".to_string(), "true".to_string()),
                ("status".to_string(), "active".to_string()),
            ]
        );
    }

    #[test]
    fn test_push_opt_and_replace() {
        let query = QueryParams::new()
            .push_opt("category", None::<&str>)
            .push_opt("search", Some("plan"))
            .push("limit", 10u32)
            .push("limit", 20u32);

        assert_eq!(query.len(), 2);
        assert_eq!(query.get("category"), None);
        assert_eq!(query.get("search").as_deref(), Some("plan"));
        assert_eq!(query.get("limit").as_deref(), Some("20"));
    }
}
