use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Limits applied while parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Open container frames beyond this depth stop opening new containers.
    pub max_nesting_depth: usize,
    /// Longest link label, in bytes, that can match a reference definition.
    pub max_link_label_length: usize,
    /// Deepest parenthesis nesting accepted in a raw link destination.
    pub max_parenthesis_nesting: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            max_nesting_depth: 100,
            max_link_label_length: 999,
            max_parenthesis_nesting: 32,
        }
    }
}

impl ParseOptions {
    /// Reads options from JSON; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, ParseError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let options = ParseOptions::from_json(r#"{ "max_nesting_depth": 8 }"#).unwrap();
        assert_eq!(options.max_nesting_depth, 8);
        assert_eq!(options.max_link_label_length, 999);
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = ParseOptions::from_json("{ nope").unwrap_err();
        assert!(matches!(err, ParseError::InvalidOptions(_)));
    }
}
