use std::fmt::Display;

use super::schema::TypeId;

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Value {
    Boolean(bool),
    Integer(i32),
    Text(String),
}

impl Value {
    pub fn type_id(&self) -> TypeId {
        match self {
            Value::Boolean(_) => TypeId::Boolean,
            Value::Integer(_) => TypeId::Integer,
            Value::Text(_) => TypeId::Text,
        }
    }

    /// Returns how many bytes the marshalled value occupies
    pub fn size(&self) -> usize {
        match self {
            Value::Boolean(_) => std::mem::size_of::<i32>(),
            Value::Integer(_) => std::mem::size_of::<i32>(),
            Value::Text(val) => std::mem::size_of::<u16>() + val.as_bytes().len(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(val) => Some(val),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Integer(val) => Some(*val),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(val) => Some(*val),
            _ => None,
        }
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Boolean(val) => write!(f, "{val}"),
            Value::Integer(val) => write!(f, "{val}"),
            Value::Text(val) => write!(f, "\"{val}\""),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Value;
    use crate::tuple::schema::TypeId;

    #[test]
    fn size_test() {
        assert_eq!(Value::Integer(-7).size(), 4);
        assert_eq!(Value::Boolean(false).size(), 4);
        assert_eq!(Value::from("heap").size(), 6);
        assert_eq!(Value::from("").size(), 2);
    }

    #[test]
    fn accessors_test() {
        let text = Value::from("heap");
        assert_eq!(text.type_id(), TypeId::Text);
        assert_eq!(text.as_str(), Some("heap"));
        assert_eq!(text.as_i32(), None);
        assert_eq!(Value::from(true).as_bool(), Some(true));
        assert_eq!(Value::from(42).as_i32(), Some(42));
        assert_eq!(Value::from(42).to_string(), "42");
        assert_eq!(text.to_string(), "\"heap\"");
    }
}
