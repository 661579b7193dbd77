use serde::{Deserialize, Serialize};
use std::fmt;

/// A literal or bound parameter value flowing through routing
///
/// Parameters arrive positionally, so a statement parameter list is a
/// plain `Vec<SqlValue>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl SqlValue {
    /// Integer view used by sharding algorithms
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Int(v) => Some(*v),
            SqlValue::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            SqlValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Rounds half up, the way LIMIT parameters are read
    pub fn round_half_up(&self) -> Option<i64> {
        match self {
            SqlValue::Int(v) => Some(*v),
            SqlValue::Float(f) => Some(f.round() as i64),
            SqlValue::Text(s) => s.trim().parse::<f64>().ok().map(|f| f.round() as i64),
            _ => None,
        }
    }

    /// Parse a value given on the command line or in a config file
    pub fn parse_literal(raw: &str) -> Self {
        if let Ok(v) = raw.parse::<i64>() {
            return SqlValue::Int(v);
        }
        if let Ok(f) = raw.parse::<f64>() {
            return SqlValue::Float(f);
        }
        match raw.to_lowercase().as_str() {
            "null" => SqlValue::Null,
            "true" => SqlValue::Bool(true),
            "false" => SqlValue::Bool(false),
            _ => SqlValue::Text(raw.to_string()),
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Bool(b) => write!(f, "{}", b),
            SqlValue::Int(v) => write!(f, "{}", v),
            SqlValue::Float(v) => write!(f, "{}", v),
            SqlValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(v as i64)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Float(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_views() {
        assert_eq!(SqlValue::Int(7).as_i64(), Some(7));
        assert_eq!(SqlValue::Float(4.0).as_i64(), Some(4));
        assert_eq!(SqlValue::Float(4.5).as_i64(), None);
        assert_eq!(SqlValue::Text(" 12 ".into()).as_i64(), Some(12));
        assert_eq!(SqlValue::Null.as_i64(), None);

        assert_eq!(SqlValue::Float(2.5).round_half_up(), Some(3));
        assert_eq!(SqlValue::Text("9.4".into()).round_half_up(), Some(9));
    }

    #[test]
    fn test_parse_literal() {
        assert_eq!(SqlValue::parse_literal("10"), SqlValue::Int(10));
        assert_eq!(SqlValue::parse_literal("1.5"), SqlValue::Float(1.5));
        assert_eq!(SqlValue::parse_literal("NULL"), SqlValue::Null);
        assert_eq!(SqlValue::parse_literal("INIT"), SqlValue::Text("INIT".into()));
    }

    #[test]
    fn test_untagged_json() {
        let values: Vec<SqlValue> = serde_json::from_str(r#"[1, "a", 2.5, null, true]"#).unwrap();
        assert_eq!(
            values,
            vec![
                SqlValue::Int(1),
                SqlValue::Text("a".into()),
                SqlValue::Float(2.5),
                SqlValue::Null,
                SqlValue::Bool(true),
            ]
        );
    }
}
