//! JSON format

use super::raw::RawNode;
use super::{Format, ensure_finite};
use crate::error::{Error, Location, Result};
use crate::tree::ConfigTree;

/// JSON format (default)
#[derive(Debug, Clone)]
pub struct JsonFormat {
    /// Pretty print JSON output
    pretty: bool,
}

impl Default for JsonFormat {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonFormat {
    /// Create a JSON format with pretty printing enabled
    pub fn new() -> Self {
        Self { pretty: true }
    }

    /// Create a compact JSON format (no pretty printing)
    pub fn compact() -> Self {
        Self { pretty: false }
    }
}

impl Format for JsonFormat {
    fn extension(&self) -> &str {
        "json"
    }

    fn parse(&self, content: &str) -> Result<ConfigTree> {
        let raw: RawNode = serde_json::from_str(content).map_err(|e| {
            let location = (e.line() > 0).then(|| Location::new(e.line(), e.column()));
            Error::parse("json", location, e.to_string())
        })?;
        raw.into_tree("json")
    }

    fn render(&self, tree: &ConfigTree) -> Result<String> {
        ensure_finite("json", tree)?;
        let rendered = if self.pretty {
            serde_json::to_string_pretty(tree)
        } else {
            serde_json::to_string(tree)
        };
        rendered.map_err(|e| Error::Serialize(e.to_string()))
    }
}
