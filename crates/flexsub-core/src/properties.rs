//! Typed access to CloudFormation `ResourceProperties`.
//!
//! CloudFormation hands every scalar property to the function as a string,
//! so `"true"` and `"42"` have to be coerced here. Native JSON values are
//! accepted as well, which keeps hand-written test events simple.
//! Empty strings count as "not set".

use serde_json::{Map, Value};

use crate::error::{CoreError, Result};

/// Read-only view over the raw property map.
#[derive(Debug, Clone, Copy)]
pub struct Properties<'a> {
    raw: &'a Map<String, Value>,
}

impl<'a> Properties<'a> {
    pub fn new(raw: &'a Map<String, Value>) -> Self {
        Self { raw }
    }

    fn present(&self, name: &str) -> Option<&'a Value> {
        match self.raw.get(name) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(v) => Some(v),
        }
    }

    pub fn string(&self, name: &str) -> Result<Option<String>> {
        match self.present(name) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(Value::Bool(b)) => Ok(Some(b.to_string())),
            Some(_) => Err(CoreError::invalid_property(name, "expected a string")),
        }
    }

    pub fn required_string(&self, name: &str) -> Result<String> {
        self.string(name)?
            .ok_or_else(|| CoreError::missing_property(name))
    }

    pub fn bool(&self, name: &str) -> Result<Option<bool>> {
        match self.present(name) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(Value::String(s)) => parse_bool(s)
                .map(Some)
                .ok_or_else(|| {
                    CoreError::invalid_property(name, format!("expected \"true\" or \"false\", got {s:?}"))
                }),
            Some(_) => Err(CoreError::invalid_property(name, "expected a boolean")),
        }
    }

    pub fn int(&self, name: &str) -> Result<Option<i64>> {
        match self.present(name) {
            None => Ok(None),
            Some(Value::Number(n)) => n
                .as_i64()
                .map(Some)
                .ok_or_else(|| CoreError::invalid_property(name, format!("expected an integer, got {n}"))),
            Some(Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|e| CoreError::invalid_property(name, format!("expected an integer, got {s:?}: {e}"))),
            Some(_) => Err(CoreError::invalid_property(name, "expected an integer")),
        }
    }

    pub fn required_int(&self, name: &str) -> Result<i64> {
        self.int(name)?
            .ok_or_else(|| CoreError::missing_property(name))
    }

    /// A list given either as a JSON array or as a comma separated string
    /// (what a `CommaDelimitedList` parameter turns into).
    pub fn list(&self, name: &str) -> Result<Option<Vec<String>>> {
        match self.present(name) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(split_list(s))),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.trim().to_string()),
                    Value::Number(n) => Ok(n.to_string()),
                    _ => Err(CoreError::invalid_property(name, "expected a list of strings")),
                })
                .collect::<Result<Vec<_>>>()
                .map(Some),
            Some(_) => Err(CoreError::invalid_property(name, "expected a list")),
        }
    }

    /// Pass-through value, parsed if it arrives as a JSON document in a string.
    pub fn json(&self, name: &str) -> Option<Value> {
        match self.present(name)? {
            Value::String(s) => Some(
                serde_json::from_str::<Value>(s)
                    .ok()
                    .filter(|v| v.is_object() || v.is_array())
                    .unwrap_or_else(|| Value::String(s.clone())),
            ),
            other => Some(other.clone()),
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Split a comma separated list, dropping whitespace and empty entries.
pub fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(|part| part.chars().filter(|c| !c.is_whitespace()).collect::<String>())
        .filter(|part| !part.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_bool_coercion() {
        let raw = props(json!({"a": "true", "b": "FALSE", "c": true, "d": "yes", "e": ""}));
        let p = Properties::new(&raw);
        assert_eq!(p.bool("a").unwrap(), Some(true));
        assert_eq!(p.bool("b").unwrap(), Some(false));
        assert_eq!(p.bool("c").unwrap(), Some(true));
        assert!(p.bool("d").is_err());
        assert_eq!(p.bool("e").unwrap(), None);
        assert_eq!(p.bool("missing").unwrap(), None);
    }

    #[test]
    fn test_int_coercion() {
        let raw = props(json!({"a": "42", "b": 7, "c": "1.5", "d": " 3 "}));
        let p = Properties::new(&raw);
        assert_eq!(p.int("a").unwrap(), Some(42));
        assert_eq!(p.int("b").unwrap(), Some(7));
        assert_eq!(p.int("d").unwrap(), Some(3));

        let err = p.int("c").unwrap_err();
        assert!(err.to_string().contains("Invalid property c"));

        let err = p.required_int("missing").unwrap_err();
        assert_eq!(err.to_string(), "Missing required property: missing");
    }

    #[test]
    fn test_list_forms() {
        let raw = props(json!({
            "csv": "us-east-1a, us-east-1b,",
            "arr": ["us-east-1a", "us-east-1c"]
        }));
        let p = Properties::new(&raw);
        assert_eq!(
            p.list("csv").unwrap().unwrap(),
            vec!["us-east-1a", "us-east-1b"]
        );
        assert_eq!(
            p.list("arr").unwrap().unwrap(),
            vec!["us-east-1a", "us-east-1c"]
        );
    }

    #[test]
    fn test_split_list_strips_inner_spaces() {
        assert_eq!(
            split_list("RedisJSON , Redis Search,"),
            vec!["RedisJSON", "RedisSearch"]
        );
        assert!(split_list(" , ").is_empty());
    }

    #[test]
    fn test_json_passthrough() {
        let raw = props(json!({
            "doc": "{\"a\": 1}",
            "plain": "not json",
            "native": {"b": 2}
        }));
        let p = Properties::new(&raw);
        assert_eq!(p.json("doc"), Some(json!({"a": 1})));
        assert_eq!(p.json("plain"), Some(json!("not json")));
        assert_eq!(p.json("native"), Some(json!({"b": 2})));
        assert_eq!(p.json("missing"), None);
    }
}
