//! Query parameter serialization.
//!
//! [`Params`] is an insertion-ordered mapping from keys to [`ParamValue`]s.
//! [`serialize_params`] turns it into a query string, encoding list values
//! according to an [`ArrayFormat`].

use serde::Serialize;

/// How list values are written into a query string.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrayFormat {
    /// `ids[]=1&ids[]=2`
    #[default]
    Brackets,
    /// `ids=1&ids=2`
    Repeat,
    /// `ids=1,2`
    Comma,
}

/// A single query parameter value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParamValue {
    /// Present in the mapping but skipped during serialization.
    Absent,
    One(String),
    Many(Vec<String>),
}

macro_rules! impl_param_value_from_display {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for ParamValue {
                fn from(value: $ty) -> Self {
                    ParamValue::One(value.to_string())
                }
            }
        )*
    };
}

impl_param_value_from_display!(
    bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64
);

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::One(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::One(value.to_owned())
    }
}

impl From<&String> for ParamValue {
    fn from(value: &String) -> Self {
        ParamValue::One(value.clone())
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ParamValue::Absent, Into::into)
    }
}

impl<T: ToString> From<Vec<T>> for ParamValue {
    fn from(values: Vec<T>) -> Self {
        ParamValue::Many(values.iter().map(ToString::to_string).collect())
    }
}

impl<T: ToString> From<&[T]> for ParamValue {
    fn from(values: &[T]) -> Self {
        ParamValue::Many(values.iter().map(ToString::to_string).collect())
    }
}

impl<T: ToString, const N: usize> From<[T; N]> for ParamValue {
    fn from(values: [T; N]) -> Self {
        ParamValue::Many(values.iter().map(ToString::to_string).collect())
    }
}

impl ParamValue {
    /// Convert a JSON value. `null` becomes [`ParamValue::Absent`], arrays
    /// become [`ParamValue::Many`] and strings keep their raw text.
    pub fn from_json(value: &serde_json::Value) -> Self {
        fn scalar(value: &serde_json::Value) -> String {
            match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            }
        }

        match value {
            serde_json::Value::Null => ParamValue::Absent,
            serde_json::Value::Array(items) => ParamValue::Many(
                items
                    .iter()
                    .filter(|item| !item.is_null())
                    .map(scalar)
                    .collect(),
            ),
            other => ParamValue::One(scalar(other)),
        }
    }
}

/// Ordered query parameters.
///
/// Serialization follows insertion order. Inserting an existing key
/// replaces its value in place.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Params {
    entries: Vec<(String, ParamValue)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter, replacing any existing value for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Merge `other` into `self`; keys in `other` win.
    pub fn extend(&mut self, other: Params) {
        for (key, value) in other.entries {
            self.insert(key, value);
        }
    }

    /// Build params from any serializable struct or map.
    ///
    /// The value must serialize to a JSON object; field order is preserved.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        match serde_json::to_value(value)? {
            serde_json::Value::Object(map) => Ok(map
                .iter()
                .fold(Params::new(), |params, (k, v)| {
                    params.with(k.clone(), ParamValue::from_json(v))
                })),
            _ => Err(serde::ser::Error::custom(
                "query params must serialize to an object",
            )),
        }
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

/// Serialize params into a query string (without the leading `?`).
///
/// Absent values are skipped. Single values are written as `key=value`;
/// lists follow `format`. Keys and values are form-urlencoded.
pub fn serialize_params(
    params: &Params,
    format: ArrayFormat,
) -> Result<String, serde_urlencoded::ser::Error> {
    let mut pairs: Vec<(String, String)> = Vec::with_capacity(params.len());

    for (key, value) in params.iter() {
        match value {
            ParamValue::Absent => {}
            ParamValue::One(v) => pairs.push((key.to_owned(), v.clone())),
            ParamValue::Many(items) => match format {
                ArrayFormat::Comma => pairs.push((key.to_owned(), items.join(","))),
                ArrayFormat::Brackets => {
                    pairs.extend(items.iter().map(|item| (format!("{key}[]"), item.clone())))
                }
                ArrayFormat::Repeat => {
                    pairs.extend(items.iter().map(|item| (key.to_owned(), item.clone())))
                }
            },
        }
    }

    serde_urlencoded::to_string(&pairs)
}
