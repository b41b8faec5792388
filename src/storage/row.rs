use std::fmt;

/// A single scalar stored in a dynamic table column.
///
/// One generic representation covers every dynamic model; the column kinds
/// a value may legally inhabit are checked by the engine against the
/// model's materialized shape, not encoded in the type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    String(String),
    Boolean(bool),
    Null,
}

impl Value {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Converts a JSON scalar into a `Value`. Returns `None` for JSON
    /// shapes no dynamic column can hold (floats, arrays, objects).
    pub fn from_json(json: &serde_json::Value) -> Option<Value> {
        match json {
            serde_json::Value::Null => Some(Value::Null),
            serde_json::Value::Bool(b) => Some(Value::Boolean(*b)),
            serde_json::Value::Number(n) => n.as_i64().map(Value::Integer),
            serde_json::Value::String(s) => Some(Value::String(s.clone())),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Integer(i) => serde_json::Value::from(*i),
            Value::String(s) => serde_json::Value::from(s.as_str()),
            Value::Boolean(b) => serde_json::Value::from(*b),
            Value::Null => serde_json::Value::Null,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::String(s) => write!(f, "{}", s),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Null => write!(f, "NULL"),
        }
    }
}

/// One row of a dynamic table: the implicit identity column plus the
/// model's columns in shape order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub id: i64,
    pub values: Vec<(String, Value)>,
}

impl Row {
    pub fn new(id: i64, values: Vec<(String, Value)>) -> Self {
        Self { id, values }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        map.insert("id".to_string(), serde_json::Value::from(self.id));
        for (name, value) in &self.values {
            map.insert(name.clone(), value.to_json());
        }
        serde_json::Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::Integer(7).as_integer(), Some(7));
        assert_eq!(Value::String("x".to_string()).as_string(), Some("x"));
        assert_eq!(Value::Boolean(true).as_bool(), Some(true));
        assert!(Value::Null.is_null());
        assert_eq!(Value::Boolean(true).as_integer(), None);
    }

    #[test]
    fn test_from_json() {
        assert_eq!(
            Value::from_json(&serde_json::json!(2012)),
            Some(Value::Integer(2012))
        );
        assert_eq!(
            Value::from_json(&serde_json::json!("toyota")),
            Some(Value::String("toyota".to_string()))
        );
        assert_eq!(
            Value::from_json(&serde_json::json!(true)),
            Some(Value::Boolean(true))
        );
        assert_eq!(Value::from_json(&serde_json::json!(null)), Some(Value::Null));
        // No dynamic column kind can hold these
        assert_eq!(Value::from_json(&serde_json::json!(1.5)), None);
        assert_eq!(Value::from_json(&serde_json::json!([1, 2])), None);
    }

    #[test]
    fn test_row_lookup_and_json() {
        let row = Row::new(
            1,
            vec![
                ("make".to_string(), Value::String("toyota".to_string())),
                ("year".to_string(), Value::Integer(2012)),
            ],
        );
        assert_eq!(row.get("year"), Some(&Value::Integer(2012)));
        assert_eq!(row.get("missing"), None);

        let json = row.to_json();
        assert_eq!(json["id"], 1);
        assert_eq!(json["make"], "toyota");
    }
}
