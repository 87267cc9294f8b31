//! Value types exchanged with the simulation host and their coercions.

use std::fmt;

use crate::error::{Error, Result};

const BOOL_TYPE_NAME: &str = "bool";
const BOOL_TYPE_NAME_ALT: &str = "boolean";
const INT_TYPE_NAME: &str = "int";
const INT_TYPE_NAME_ALT: &str = "integer";
const FLOAT_TYPE_NAME: &str = "float";
const FLOAT_TYPE_NAME_ALT: &str = "real";
const STR_TYPE_NAME: &str = "str";
const STR_TYPE_NAME_ALT: &str = "string";

/// Native type tag of a host variable or table column.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum ValueType {
    Bool,
    Int,
    Float,
    Str,
}

impl fmt::Display for ValueType {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> std::result::Result<(), fmt::Error> {
        write!(formatter, "{}", self.to_str())
    }
}

impl ValueType {
    /// Creates new `ValueType` from str.
    pub fn from_str(s: &str) -> Result<ValueType> {
        let value_type = match s {
            BOOL_TYPE_NAME | BOOL_TYPE_NAME_ALT => ValueType::Bool,
            INT_TYPE_NAME | INT_TYPE_NAME_ALT => ValueType::Int,
            FLOAT_TYPE_NAME | FLOAT_TYPE_NAME_ALT => ValueType::Float,
            STR_TYPE_NAME | STR_TYPE_NAME_ALT => ValueType::Str,
            _ => return Err(Error::Other(format!("invalid value type: {}", s))),
        };
        Ok(value_type)
    }

    /// Returns string literal name of the `ValueType`.
    pub fn to_str(&self) -> &'static str {
        match self {
            ValueType::Bool => BOOL_TYPE_NAME,
            ValueType::Int => INT_TYPE_NAME,
            ValueType::Float => FLOAT_TYPE_NAME,
            ValueType::Str => STR_TYPE_NAME,
        }
    }
}

impl serde::Serialize for ValueType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.to_str())
    }
}

impl<'de> serde::Deserialize<'de> for ValueType {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ValueType::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Single value read from or written to the host.
///
/// # Coercion
///
/// Hosts store values using the native type of the target variable or
/// column. Writing a value of a different type goes through
/// [`Value::coerce_to`], which applies the following rules:
///
/// - a value of the same type is stored as is
/// - `Int` widens to `Float`
/// - `Float` narrows to `Int` only if it has no fractional part and fits
/// - anything else is a type mismatch
///
/// Reading back a value written with widening therefore yields a `Float`
/// where an `Int` was written. This normalization is left visible to the
/// caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Null,
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl Value {
    /// Returns the type tag, `None` for null.
    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            Value::Bool(_) => Some(ValueType::Bool),
            Value::Int(_) => Some(ValueType::Int),
            Value::Float(_) => Some(ValueType::Float),
            Value::Str(_) => Some(ValueType::Str),
            Value::Null => None,
        }
    }

    pub fn is_null(&self) -> bool {
        match self {
            Value::Null => true,
            _ => false,
        }
    }

    /// Converts the value to the given native type, returning the original
    /// value back if the conversion is not allowed.
    pub fn coerce_to(self, target: ValueType) -> std::result::Result<Value, Value> {
        match (self, target) {
            (Value::Bool(b), ValueType::Bool) => Ok(Value::Bool(b)),
            (Value::Int(i), ValueType::Int) => Ok(Value::Int(i)),
            (Value::Float(f), ValueType::Float) => Ok(Value::Float(f)),
            (Value::Str(s), ValueType::Str) => Ok(Value::Str(s)),
            (Value::Int(i), ValueType::Float) => Ok(Value::Float(i as f64)),
            (Value::Float(f), ValueType::Int)
                if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 =>
            {
                Ok(Value::Int(f as i64))
            }
            (v, _) => Err(v),
        }
    }

    /// Same as [`coerce_to`] but reports failures as `TypeMismatch` on the
    /// named target.
    ///
    /// [`coerce_to`]: #method.coerce_to
    pub fn coerce_for(self, name: &str, target: ValueType) -> Result<Value> {
        self.coerce_to(target).map_err(|v| Error::TypeMismatch {
            name: name.to_string(),
            expected: target,
            found: v.type_name().to_string(),
        })
    }

    /// Name of the value's type, `"null"` for null.
    pub fn type_name(&self) -> &'static str {
        match self.value_type() {
            Some(t) => t.to_str(),
            None => "null",
        }
    }

    /// Numeric view of the value. Booleans count as 0 and 1.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Truthiness as seen by model rules.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Null => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Str(s) => write!(f, "{}", s),
            Value::Null => write!(f, "null"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}
impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}
impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}
impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}
impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}
impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

#[test]
fn coercion_rules() {
    assert_eq!(Value::Int(3).coerce_to(ValueType::Float), Ok(Value::Float(3.0)));
    assert_eq!(Value::Float(4.0).coerce_to(ValueType::Int), Ok(Value::Int(4)));
    assert_eq!(
        Value::Float(4.5).coerce_to(ValueType::Int),
        Err(Value::Float(4.5))
    );
    assert!(Value::Bool(true).coerce_to(ValueType::Int).is_err());
    assert!(Value::from("1").coerce_to(ValueType::Int).is_err());
    assert!(Value::Null.coerce_to(ValueType::Bool).is_err());
}

#[test]
fn float_to_int_stays_in_range() {
    let two_pow_63 = 9_223_372_036_854_775_808.0;
    assert_eq!(
        Value::Float(two_pow_63).coerce_to(ValueType::Int),
        Err(Value::Float(two_pow_63))
    );
    assert_eq!(
        Value::Float(-two_pow_63).coerce_to(ValueType::Int),
        Ok(Value::Int(i64::MIN))
    );
    assert_eq!(Value::Float(1.5).type_name(), "float");
    assert_eq!(Value::Null.type_name(), "null");
}

#[test]
fn coerce_for_reports_type_mismatch() {
    match Value::from("abc").coerce_for("speed", ValueType::Float) {
        Err(Error::TypeMismatch {
            name,
            expected,
            found,
        }) => {
            assert_eq!(name, "speed");
            assert_eq!(expected, ValueType::Float);
            assert_eq!(found, "str");
        }
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn untagged_deser_from_toml() {
    #[derive(Deserialize)]
    struct Doc {
        flags: Vec<Value>,
        counts: Vec<Value>,
        rates: Vec<Value>,
        names: Vec<Value>,
    }
    let doc: Doc = toml::from_str(
        r#"
        flags = [false, true]
        counts = [3]
        rates = [2.5]
        names = ["x"]
        "#,
    )
    .unwrap();
    assert_eq!(doc.flags, vec![Value::Bool(false), Value::Bool(true)]);
    assert_eq!(doc.counts, vec![Value::Int(3)]);
    assert_eq!(doc.rates, vec![Value::Float(2.5)]);
    assert_eq!(doc.names, vec![Value::from("x")]);
}
