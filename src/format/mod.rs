//! Configuration file formats
//!
//! Each format turns text into a [`ConfigTree`] and back. Parsers reject
//! null values, non-mapping documents and duplicate keys; renderers produce
//! text that parses back into an equal tree.
//!
//! | Format | Extension | Feature |
//! |--------|-----------|---------|
//! | [`JsonFormat`] | `json` | always |
//! | [`PhpFormat`] | `php` | `php` (default) |
//! | [`TomlFormat`] | `toml` | `toml` |
//! | [`YamlFormat`] | `yaml`, `yml` | `yaml` |

mod json;
#[cfg(feature = "php")]
mod php;
mod raw;
#[cfg(feature = "toml")]
mod toml;
#[cfg(feature = "yaml")]
mod yaml;

pub use json::JsonFormat;
#[cfg(feature = "php")]
pub use php::PhpFormat;
#[cfg(feature = "toml")]
pub use self::toml::TomlFormat;
#[cfg(feature = "yaml")]
pub use yaml::YamlFormat;

use crate::error::{Error, Result};
use crate::tree::{ConfigNode, ConfigPath, ConfigTree, Mapping, Scalar};
use std::path::Path;
use std::sync::Arc;

/// A text encoding of a configuration tree
///
/// Implementations are stateless apart from rendering options, so a single
/// instance can be shared behind an `Arc`.
pub trait Format: Send + Sync {
    /// Canonical file extension, without the dot
    fn extension(&self) -> &str;

    /// Short name used in error messages
    fn name(&self) -> &str {
        self.extension()
    }

    /// Parse a whole document.
    fn parse(&self, content: &str) -> Result<ConfigTree>;

    /// Render a tree so that [`parse`](Self::parse) returns an equal tree.
    fn render(&self, tree: &ConfigTree) -> Result<String>;

    /// Read and parse a file
    fn read(&self, path: &Path) -> Result<ConfigTree> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        self.parse(&content)
    }

    /// Render and write a file
    ///
    /// Uses atomic write: writes to a temp file next to `path`, then renames.
    fn write(&self, path: &Path, tree: &ConfigTree) -> Result<()> {
        let content = self.render(tree)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::DirectoryCreate {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let file_name = path.file_name().ok_or_else(|| {
            Error::Config(format!(
                "Invalid path '{}': must have a filename",
                path.display()
            ))
        })?;
        let mut temp_filename = file_name.to_os_string();
        temp_filename.push(".tmp");
        let temp_path = path.with_file_name(temp_filename);

        std::fs::write(&temp_path, &content).map_err(|e| Error::FileWrite {
            path: temp_path.clone(),
            source: e,
        })?;

        std::fs::rename(&temp_path, path).map_err(|e| Error::FileWrite {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

// =============================================================================
// Detection
// =============================================================================

/// Format for a file extension (case-insensitive, without the dot).
///
/// # Errors
///
/// [`Error::UnsupportedFormat`] if the extension is unknown or its feature is
/// disabled.
pub fn for_extension(extension: &str) -> Result<Arc<dyn Format>> {
    match extension.to_ascii_lowercase().as_str() {
        "json" => Ok(Arc::new(JsonFormat::new())),
        #[cfg(feature = "php")]
        "php" => Ok(Arc::new(PhpFormat::new())),
        #[cfg(feature = "toml")]
        "toml" => Ok(Arc::new(TomlFormat::new())),
        #[cfg(feature = "yaml")]
        "yaml" | "yml" => Ok(Arc::new(YamlFormat::new())),
        other => Err(Error::UnsupportedFormat(other.to_string())),
    }
}

/// Format for a path, chosen by its extension.
pub fn for_path(path: &Path) -> Result<Arc<dyn Format>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| Error::UnsupportedFormat(format!("no extension on '{}'", path.display())))?;
    for_extension(extension)
}

/// Guess the format of in-memory content.
///
/// A leading `<?php` tag selects PHP and a leading `{` selects JSON.
pub fn sniff(content: &str) -> Result<Arc<dyn Format>> {
    let trimmed = content.trim_start_matches('\u{feff}').trim_start();
    if trimmed.starts_with("<?php") {
        return for_extension("php");
    }
    if trimmed.starts_with('{') {
        return for_extension("json");
    }
    Err(Error::UnsupportedFormat(
        "unable to detect format from content".to_string(),
    ))
}

// =============================================================================
// Rendering helpers
// =============================================================================

/// Fail on NaN or infinite floats, which some formats cannot express.
pub(crate) fn ensure_finite(format: &str, tree: &ConfigTree) -> Result<()> {
    fn walk(format: &str, mapping: &Mapping, path: &ConfigPath) -> Result<()> {
        for (key, node) in mapping.iter() {
            check(format, node, &path.child(key))?;
        }
        Ok(())
    }

    fn check(format: &str, node: &ConfigNode, path: &ConfigPath) -> Result<()> {
        match node {
            ConfigNode::Scalar(Scalar::Float(n)) if !n.is_finite() => Err(Error::Serialize(
                format!("{format} cannot represent {n} at {path}"),
            )),
            ConfigNode::Scalar(_) => Ok(()),
            ConfigNode::Sequence(items) => items
                .iter()
                .enumerate()
                .try_for_each(|(i, item)| check(format, item, &path.child(i.to_string()))),
            ConfigNode::Mapping(inner) => walk(format, inner, path),
        }
    }

    walk(format, tree.root(), &ConfigPath::root())
}
