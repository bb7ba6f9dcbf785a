//! Intermediate document representation shared by the parsers
//!
//! Parsers produce a [`RawNode`] that keeps every mapping entry, including
//! repeated keys. Conversion into a [`ConfigTree`] is where duplicates are
//! rejected, so every format reports them the same way.

use crate::error::{Error, Result};
use crate::tree::{ConfigNode, ConfigPath, ConfigTree, Mapping, Scalar};
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RawNode {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Seq(Vec<RawNode>),
    Map(Vec<(String, RawNode)>),
}

impl RawNode {
    /// Convert a parsed document into a tree. The top level must be a mapping.
    pub(crate) fn into_tree(self, format: &str) -> Result<ConfigTree> {
        match self.into_node(&ConfigPath::root())? {
            ConfigNode::Mapping(root) => Ok(ConfigTree::new(root)),
            other => Err(Error::parse(
                format,
                None,
                format!("top-level value must be a mapping, found {}", other.kind()),
            )),
        }
    }

    fn into_node(self, path: &ConfigPath) -> Result<ConfigNode> {
        Ok(match self {
            RawNode::Str(s) => ConfigNode::Scalar(Scalar::String(s)),
            RawNode::Int(n) => ConfigNode::Scalar(Scalar::Integer(n)),
            RawNode::Float(n) => ConfigNode::Scalar(Scalar::Float(n)),
            RawNode::Bool(b) => ConfigNode::Scalar(Scalar::Boolean(b)),
            RawNode::Seq(items) => ConfigNode::Sequence(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| item.into_node(&path.child(i.to_string())))
                    .collect::<Result<_>>()?,
            ),
            RawNode::Map(entries) => {
                let mut mapping = Mapping::new();
                for (key, value) in entries {
                    let child = path.child(key.as_str());
                    if mapping.contains_key(&key) {
                        return Err(Error::DuplicateKey(child.to_string()));
                    }
                    let node = value.into_node(&child)?;
                    mapping.insert(key, node);
                }
                ConfigNode::Mapping(mapping)
            }
        })
    }
}

impl<'de> Deserialize<'de> for RawNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(RawNodeVisitor)
    }
}

struct RawNodeVisitor;

impl<'de> Visitor<'de> for RawNodeVisitor {
    type Value = RawNode;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string, number, boolean, sequence or mapping")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<RawNode, E> {
        Ok(RawNode::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<RawNode, E> {
        Ok(RawNode::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<RawNode, E> {
        // out of i64 range degrades to float
        Ok(i64::try_from(v).map_or(RawNode::Float(v as f64), RawNode::Int))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<RawNode, E> {
        Ok(RawNode::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<RawNode, E> {
        Ok(RawNode::Str(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<RawNode, E> {
        Ok(RawNode::Str(v))
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<RawNode, E> {
        Err(E::custom("null values are not supported"))
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<RawNode, E> {
        Err(E::custom("null values are not supported"))
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> std::result::Result<RawNode, D::Error> {
        RawNode::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<RawNode, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(RawNode::Seq(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<RawNode, A::Error> {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((key, value)) = map.next_entry::<String, RawNode>()? {
            entries.push((key, value));
        }
        Ok(RawNode::Map(entries))
    }
}
