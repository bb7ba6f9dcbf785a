//! YAML format

use super::Format;
use super::raw::RawNode;
use crate::error::{Error, Location, Result};
use crate::tree::ConfigTree;

/// YAML format
#[derive(Debug, Clone, Default)]
pub struct YamlFormat;

impl YamlFormat {
    pub fn new() -> Self {
        Self
    }
}

impl Format for YamlFormat {
    fn extension(&self) -> &str {
        "yaml"
    }

    fn parse(&self, content: &str) -> Result<ConfigTree> {
        // an empty document is an empty tree, not a null
        if content.trim().is_empty() {
            return Ok(ConfigTree::default());
        }
        let raw: RawNode = serde_yaml::from_str(content).map_err(|e| {
            let location = e.location().map(|l| Location::new(l.line(), l.column()));
            Error::parse("yaml", location, e.to_string())
        })?;
        raw.into_tree("yaml")
    }

    fn render(&self, tree: &ConfigTree) -> Result<String> {
        serde_yaml::to_string(tree).map_err(|e| Error::Serialize(e.to_string()))
    }
}
