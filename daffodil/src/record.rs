//! Records filtered by the predicate backend.
//!
//! A record is anything that can look up a [`Value`] by key. Maps from `String` to
//! [`Value`] implement [`Record`] out of the box.
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use crate::ast::Literal;

/// A value held by a record field.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Value {
    #[default]
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
}

impl Value {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Equality against a literal. Integers and floats compare numerically.
    pub fn equals(&self, literal: &Literal) -> bool {
        match (self, literal) {
            (Value::Boolean(a), Literal::Boolean(b)) => a == b,
            (Value::Integer(a), Literal::Integer(b)) => a == b,
            (Value::String(a), Literal::String(b)) => a == b,
            (Value::Integer(_) | Value::Float(_), Literal::Integer(_) | Literal::Float(_)) => {
                self.as_f64() == literal.as_f64()
            }
            _ => false,
        }
    }

    /// Ordering against a literal, defined only for number/number and string/string pairs.
    ///
    /// Strings are ordered by Unicode code point.
    pub fn compare(&self, literal: &Literal) -> Option<Ordering> {
        match (self, literal) {
            (Value::Integer(a), Literal::Integer(b)) => Some(a.cmp(b)),
            (Value::String(a), Literal::String(b)) => Some(a.as_str().cmp(b.as_str())),
            (Value::Integer(_) | Value::Float(_), Literal::Integer(_) | Literal::Float(_)) => {
                self.as_f64()?.partial_cmp(&literal.as_f64()?)
            }
            _ => None,
        }
    }

    /// Whether `self` and `literal` belong to mutually ordered types: number/number or
    /// string/string. A NaN float is orderable but compares as `None`.
    pub fn orders_with(&self, literal: &Literal) -> bool {
        matches!(
            (self, literal),
            (
                Value::Integer(_) | Value::Float(_),
                Literal::Integer(_) | Literal::Float(_)
            ) | (Value::String(_), Literal::String(_))
        )
    }

    /// Short name of the value's type, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
        }
    }

    /// Containment test: case-insensitive substring for strings, membership for lists.
    pub fn contains(&self, literal: &Literal) -> bool {
        match (self, literal) {
            (Value::String(haystack), Literal::String(needle)) => haystack
                .to_lowercase()
                .contains(needle.to_lowercase().as_str()),
            (Value::List(items), _) => items.iter().any(|item| item.equals(literal)),
            _ => false,
        }
    }
}

impl From<Literal> for Value {
    fn from(literal: Literal) -> Self {
        match literal {
            Literal::Boolean(b) => Value::Boolean(b),
            Literal::Integer(i) => Value::Integer(i),
            Literal::Float(f) => Value::Float(f),
            Literal::String(s) => Value::String(s),
        }
    }
}

macro_rules! impl_value_from {
    ($($t:ty => $variant:ident as $as:ty),* $(,)?) => {
        $(
            impl From<$t> for Value {
                #[inline]
                fn from(value: $t) -> Self {
                    Value::$variant(<$as>::from(value))
                }
            }
        )*
    };
}

impl_value_from!(
    bool => Boolean as bool,
    i8 => Integer as i64,
    i16 => Integer as i64,
    i32 => Integer as i64,
    i64 => Integer as i64,
    u8 => Integer as i64,
    u16 => Integer as i64,
    u32 => Integer as i64,
    f32 => Float as f64,
    f64 => Float as f64,
    String => String as String,
    &str => String as String,
);

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// Key-based access to the fields of a record.
pub trait Record {
    /// Value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<&Value>;

    fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

impl<S: BuildHasher> Record for HashMap<String, Value, S> {
    #[inline]
    fn get(&self, key: &str) -> Option<&Value> {
        HashMap::get(self, key)
    }

    #[inline]
    fn contains_key(&self, key: &str) -> bool {
        HashMap::contains_key(self, key)
    }
}

impl Record for BTreeMap<String, Value> {
    #[inline]
    fn get(&self, key: &str) -> Option<&Value> {
        BTreeMap::get(self, key)
    }

    #[inline]
    fn contains_key(&self, key: &str) -> bool {
        BTreeMap::contains_key(self, key)
    }
}

impl<R: Record + ?Sized> Record for &R {
    #[inline]
    fn get(&self, key: &str) -> Option<&Value> {
        (**self).get(key)
    }

    #[inline]
    fn contains_key(&self, key: &str) -> bool {
        (**self).contains_key(key)
    }
}

impl<R: Record + ?Sized> Record for Box<R> {
    #[inline]
    fn get(&self, key: &str) -> Option<&Value> {
        (**self).get(key)
    }

    #[inline]
    fn contains_key(&self, key: &str) -> bool {
        (**self).contains_key(key)
    }
}

/// Build a record from `(key, value)` pairs.
pub fn record<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> BTreeMap<String, Value>
where
    K: Into<String>,
    V: Into<Value>,
{
    fields
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_equality_mixes_integers_and_floats() {
        assert!(Value::from(18).equals(&Literal::Float(18.0)));
        assert!(Value::from(18.0).equals(&Literal::Integer(18)));
        assert!(!Value::from(18.5).equals(&Literal::Integer(18)));
        assert!(!Value::from("18").equals(&Literal::Integer(18)));
        assert!(!Value::from(true).equals(&Literal::Integer(1)));
    }

    #[test]
    fn ordering_is_only_defined_between_compatible_types() {
        assert_eq!(
            Value::from(25).compare(&Literal::Integer(18)),
            Some(Ordering::Greater)
        );
        assert_eq!(
            Value::from(17.5).compare(&Literal::Integer(18)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::from("apple").compare(&Literal::String("banana".into())),
            Some(Ordering::Less)
        );
        assert_eq!(Value::from("25").compare(&Literal::Integer(18)), None);
        assert_eq!(Value::Null.compare(&Literal::Integer(18)), None);
        assert_eq!(Value::from(f64::NAN).compare(&Literal::Float(1.0)), None);

        assert!(Value::from(f64::NAN).orders_with(&Literal::Float(1.0)));
        assert!(Value::from(3).orders_with(&Literal::Float(1.0)));
        assert!(!Value::from("25").orders_with(&Literal::Integer(18)));
        assert!(!Value::from(vec![1, 2]).orders_with(&Literal::Integer(1)));
        assert!(!Value::Null.orders_with(&Literal::String("a".into())));
    }

    #[test]
    fn containment() {
        let text = Value::from("Hello World");
        assert!(text.contains(&Literal::String("world".into())));
        assert!(!text.contains(&Literal::String("planet".into())));

        let tags = Value::from(vec!["red", "green"]);
        assert!(tags.contains(&Literal::String("green".into())));
        assert!(!tags.contains(&Literal::String("blue".into())));

        assert!(!Value::from(5).contains(&Literal::Integer(5)));
    }

    #[test]
    fn maps_are_records() {
        let map = record([("age", 25)]);
        assert!(map.contains_key("age"));
        assert!(!map.contains_key("name"));
        assert_eq!(Record::get(&map, "age"), Some(&Value::Integer(25)));

        let hashed: HashMap<String, Value> = map.into_iter().collect();
        assert_eq!(Record::get(&hashed, "age"), Some(&Value::Integer(25)));
    }
}
