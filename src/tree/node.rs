//! Node types of a configuration tree
//!
//! Every node is explicitly one of three shapes:
//!
//! - [`Scalar`] - string, integer, float or boolean leaf
//! - Sequence - ordered list of nodes
//! - [`Mapping`] - ordered set of uniquely named child nodes
//!
//! There is no null and no implicit coercion between shapes.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

// =============================================================================
// Scalars
// =============================================================================

/// Runtime type of a [`Scalar`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    String,
    Integer,
    Float,
    Boolean,
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScalarType::String => "string",
            ScalarType::Integer => "integer",
            ScalarType::Float => "float",
            ScalarType::Boolean => "boolean",
        })
    }
}

/// A single primitive value
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl Scalar {
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            Scalar::String(_) => ScalarType::String,
            Scalar::Integer(_) => ScalarType::Integer,
            Scalar::Float(_) => ScalarType::Float,
            Scalar::Boolean(_) => ScalarType::Boolean,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric value; integers widen to float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Float(n) => Some(*n),
            Scalar::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Scalar::String(s) => Value::String(s.clone()),
            Scalar::Integer(n) => Value::from(*n),
            Scalar::Float(n) => serde_json::Number::from_f64(*n).map_or(Value::Null, Value::Number),
            Scalar::Boolean(b) => Value::Bool(*b),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::String(s) => write!(f, "\"{s}\""),
            Scalar::Integer(n) => write!(f, "{n}"),
            Scalar::Float(n) => write!(f, "{n:?}"),
            Scalar::Boolean(b) => write!(f, "{b}"),
        }
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Scalar::String(s) => serializer.serialize_str(s),
            Scalar::Integer(n) => serializer.serialize_i64(*n),
            Scalar::Float(n) => serializer.serialize_f64(*n),
            Scalar::Boolean(b) => serializer.serialize_bool(*b),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::String(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::String(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Integer(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Integer(i64::from(value))
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Boolean(value)
    }
}

// =============================================================================
// Nodes
// =============================================================================

/// Shape of a node, used in error messages and rule checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Scalar(ScalarType),
    Sequence,
    Mapping,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Scalar(t) => t.fmt(f),
            NodeKind::Sequence => f.write_str("sequence"),
            NodeKind::Mapping => f.write_str("mapping"),
        }
    }
}

/// One node of a configuration tree
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigNode {
    Scalar(Scalar),
    Sequence(Vec<ConfigNode>),
    Mapping(Mapping),
}

impl ConfigNode {
    pub fn kind(&self) -> NodeKind {
        match self {
            ConfigNode::Scalar(s) => NodeKind::Scalar(s.scalar_type()),
            ConfigNode::Sequence(_) => NodeKind::Sequence,
            ConfigNode::Mapping(_) => NodeKind::Mapping,
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            ConfigNode::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[ConfigNode]> {
        match self {
            ConfigNode::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            ConfigNode::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self, ConfigNode::Mapping(_))
    }

    /// Convert into a `serde_json::Value` for typed deserialization.
    ///
    /// Non-finite floats become `null`.
    pub fn to_json(&self) -> Value {
        match self {
            ConfigNode::Scalar(s) => s.to_json(),
            ConfigNode::Sequence(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            ConfigNode::Mapping(m) => m.to_json(),
        }
    }
}

impl Serialize for ConfigNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ConfigNode::Scalar(s) => s.serialize(serializer),
            ConfigNode::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            ConfigNode::Mapping(m) => m.serialize(serializer),
        }
    }
}

impl From<Scalar> for ConfigNode {
    fn from(value: Scalar) -> Self {
        ConfigNode::Scalar(value)
    }
}

macro_rules! node_from_scalar {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for ConfigNode {
                fn from(value: $ty) -> Self {
                    ConfigNode::Scalar(Scalar::from(value))
                }
            }
        )*
    };
}

node_from_scalar!(&str, String, i64, i32, f64, bool);

impl From<Mapping> for ConfigNode {
    fn from(mapping: Mapping) -> Self {
        ConfigNode::Mapping(mapping)
    }
}

impl From<Vec<ConfigNode>> for ConfigNode {
    fn from(items: Vec<ConfigNode>) -> Self {
        ConfigNode::Sequence(items)
    }
}

// =============================================================================
// Mapping
// =============================================================================

/// Ordered collection of uniquely named child nodes
///
/// Insertion order is preserved so that rendering and debugging output are
/// deterministic. Configuration sections are small, so lookups scan linearly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mapping {
    entries: Vec<(String, ConfigNode)>,
}

impl Mapping {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&ConfigNode> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Insert or replace a child.
    ///
    /// A replaced key keeps its original position; a new key is appended.
    /// Returns the previous node for that key.
    pub fn insert(&mut self, key: impl Into<String>, node: impl Into<ConfigNode>) -> Option<ConfigNode> {
        let key = key.into();
        let node = node.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Some(std::mem::replace(existing, node)),
            None => {
                self.entries.push((key, node));
                None
            }
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigNode)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn to_json(&self) -> Value {
        Value::Object(
            self.entries
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

impl<K, V> FromIterator<(K, V)> for Mapping
where
    K: Into<String>,
    V: Into<ConfigNode>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut mapping = Mapping::new();
        for (key, value) in iter {
            mapping.insert(key, value);
        }
        mapping
    }
}

impl Serialize for Mapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Build a [`Mapping`] from `key => value` pairs
///
/// Values are converted with `Into<ConfigNode>`, so string, integer, float,
/// boolean literals and nested `mapping!` invocations can be mixed freely.
/// Sequences are written as `Vec<ConfigNode>`.
///
/// # Example
///
/// ```
/// use cfgtree::{mapping, ConfigNode, ConfigTree};
///
/// let tree = ConfigTree::new(mapping! {
///     "GFX" => mapping! {
///         "processor" => "GraphicsMagick",
///         "processor_enabled" => true,
///     },
///     "SYS" => mapping! {
///         "systemMaintainers" => vec![ConfigNode::from(1), ConfigNode::from(3)],
///     },
/// });
/// assert_eq!(tree.get_str("GFX.processor").unwrap(), "GraphicsMagick");
/// ```
#[macro_export]
macro_rules! mapping {
    ($($key:expr => $value:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut map = $crate::Mapping::new();
        $(
            map.insert($key, $value);
        )*
        map
    }};
}
