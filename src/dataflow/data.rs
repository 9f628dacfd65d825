//! Stream chunks and connect-time stream settings.
//!
//! `Data` is the unit exchanged across a connection during one `process`
//! call: a batch of items plus an end-of-stream flag. `Settings` is the
//! out-of-band metadata (e.g. sample rate) attached to a port at connect
//! time and fixed thereafter.

use std::collections::BTreeMap;

/// A batch of items flowing through one port during one processing call.
#[derive(Debug, Clone, PartialEq)]
pub struct Data<T> {
    pub items: Vec<T>,
    /// No further items will ever flow through the port.
    pub finished: bool,
}

impl<T> Data<T> {
    pub fn new(items: Vec<T>, finished: bool) -> Self {
        Self { items, finished }
    }

    /// An empty, unfinished chunk ("nothing this round").
    pub fn empty() -> Self {
        Self::new(Vec::new(), false)
    }

    /// An empty chunk that ends the stream.
    pub fn end() -> Self {
        Self::new(Vec::new(), true)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Map items while keeping the finished flag.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Data<U> {
        Data {
            items: self.items.into_iter().map(f).collect(),
            finished: self.finished,
        }
    }
}

impl<T> Default for Data<T> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Mapping from port name to chunk, the shape of `process` inputs and outputs.
pub type DataMap<T> = BTreeMap<String, Data<T>>;

/// A single stream setting value.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl SettingValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            SettingValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Float value; integers are widened.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            SettingValue::Float(v) => Some(*v),
            SettingValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingValue::String(v) => Some(v),
            _ => None,
        }
    }
}

impl From<bool> for SettingValue {
    fn from(v: bool) -> Self {
        SettingValue::Bool(v)
    }
}

impl From<i64> for SettingValue {
    fn from(v: i64) -> Self {
        SettingValue::Int(v)
    }
}

impl From<f64> for SettingValue {
    fn from(v: f64) -> Self {
        SettingValue::Float(v)
    }
}

impl From<&str> for SettingValue {
    fn from(v: &str) -> Self {
        SettingValue::String(v.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(v: String) -> Self {
        SettingValue::String(v)
    }
}

/// Opaque key/value settings describing the stream on one port.
///
/// The keys understood by adjacent processors are a convention between them;
/// the engine only carries the bag from producer to consumer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    values: BTreeMap<String, SettingValue>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<SettingValue>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<SettingValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SettingValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Mapping from port name to settings.
pub type PortSettings = BTreeMap<String, Settings>;
