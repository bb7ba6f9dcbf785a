//! Loading configuration trees from text and files

use crate::error::Result;
use crate::format::{self, Format};
use crate::schema::SchemaValidator;
use crate::tree::ConfigTree;
use log::{debug, info};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Expand a leading `~` to the home directory.
pub(crate) fn expand_home(path: &Path) -> PathBuf {
    if path.starts_with("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(path.strip_prefix("~").unwrap_or(path));
        }
    }
    path.to_path_buf()
}

/// Parses configuration sources into [`ConfigTree`]s
///
/// Files are resolved against the base directory and parsed with the format
/// matching their extension, unless a format was fixed on the builder.
///
/// # Example
///
/// ```rust,no_run
/// use cfgtree::{ConfigLoader, SchemaValidator, cms};
///
/// let loader = ConfigLoader::builder()
///     .base_dir("~/site/config/system")
///     .build();
///
/// let validator = SchemaValidator::new(cms::rules())?;
/// let tree = loader.load_validated("settings.php", &validator)?;
/// println!("{}", tree.get_str("SYS.sitename")?);
/// # Ok::<(), cfgtree::Error>(())
/// ```
#[derive(Clone)]
pub struct ConfigLoader {
    base_dir: PathBuf,
    format: Option<Arc<dyn Format>>,
    pretty_json: bool,
}

impl fmt::Debug for ConfigLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigLoader")
            .field("base_dir", &self.base_dir)
            .field("format", &self.format.as_ref().map(|fmt| fmt.extension().to_string()))
            .field("pretty_json", &self.pretty_json)
            .finish()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        ConfigLoaderBuilder::new().build()
    }
}

impl ConfigLoader {
    /// Create a new builder for ConfigLoader
    pub fn builder() -> ConfigLoaderBuilder {
        ConfigLoaderBuilder::new()
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Full path of a source: `~` expanded, relative paths joined to the base directory
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = expand_home(path.as_ref());
        if path.is_absolute() {
            path
        } else {
            self.base_dir.join(path)
        }
    }

    fn format_for_path(&self, path: &Path) -> Result<Arc<dyn Format>> {
        if let Some(format) = &self.format {
            return Ok(Arc::clone(format));
        }
        if path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"))
            && !self.pretty_json
        {
            return Ok(Arc::new(format::JsonFormat::compact()));
        }
        format::for_path(path)
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Parse in-memory content.
    ///
    /// Uses the builder's format, or detects PHP and JSON from the content.
    pub fn load_str(&self, content: &str) -> Result<ConfigTree> {
        let format = match &self.format {
            Some(format) => Arc::clone(format),
            None => format::sniff(content)?,
        };
        let tree = format.parse(content)?;
        debug!(
            "Parsed {} input into {} top-level section(s)",
            format.name(),
            tree.root().len()
        );
        Ok(tree)
    }

    /// Read and parse a file.
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedFormat`] for an unknown extension
    /// - [`Error::FileRead`] if the file cannot be read
    /// - parse errors from the format
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<ConfigTree> {
        let path = self.resolve(path);
        let format = self.format_for_path(&path)?;
        let tree = format.read(&path)?;
        info!("Loaded configuration from {}", path.display());
        Ok(tree)
    }

    /// Load files in order and merge them, later files overriding earlier ones.
    ///
    /// Fails on the first layer that cannot be loaded. No paths yields an
    /// empty tree.
    pub fn load_layers<I, P>(&self, paths: I) -> Result<ConfigTree>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut merged = ConfigTree::default();
        let mut count = 0usize;
        for path in paths {
            let layer = self.load_file(path)?;
            merged = merged.merge(&layer);
            count += 1;
        }
        debug!("Merged {count} configuration layer(s)");
        Ok(merged)
    }

    /// Load a file, validate it and publish it as a shared tree.
    ///
    /// # Errors
    ///
    /// Load errors, or [`Error::Validation`] carrying every violation.
    pub fn load_validated(
        &self,
        path: impl AsRef<Path>,
        validator: &SchemaValidator,
    ) -> Result<Arc<ConfigTree>> {
        publish(self.load_file(path)?, validator)
    }

    /// Like [`load_validated`](Self::load_validated) for in-memory content.
    pub fn load_str_validated(
        &self,
        content: &str,
        validator: &SchemaValidator,
    ) -> Result<Arc<ConfigTree>> {
        publish(self.load_str(content)?, validator)
    }

    /// Merge several layers, then validate the result.
    pub fn load_layers_validated<I, P>(
        &self,
        paths: I,
        validator: &SchemaValidator,
    ) -> Result<Arc<ConfigTree>>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        publish(self.load_layers(paths)?, validator)
    }

    // =========================================================================
    // Writing
    // =========================================================================

    /// Render a tree with the builder's format (JSON when none was set).
    pub fn render(&self, tree: &ConfigTree) -> Result<String> {
        match &self.format {
            Some(format) => format.render(tree),
            None if self.pretty_json => format::JsonFormat::new().render(tree),
            None => format::JsonFormat::compact().render(tree),
        }
    }

    /// Render and atomically write a tree, choosing the format like
    /// [`load_file`](Self::load_file).
    pub fn write_file(&self, path: impl AsRef<Path>, tree: &ConfigTree) -> Result<()> {
        let path = self.resolve(path);
        let format = self.format_for_path(&path)?;
        format.write(&path, tree)?;
        info!("Wrote configuration to {}", path.display());
        Ok(())
    }
}

fn publish(tree: ConfigTree, validator: &SchemaValidator) -> Result<Arc<ConfigTree>> {
    validator.validate(&tree).into_result()?;
    Ok(Arc::new(tree))
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for creating ConfigLoader with a fluent API
#[derive(Clone, Default)]
pub struct ConfigLoaderBuilder {
    base_dir: Option<PathBuf>,
    format: Option<Arc<dyn Format>>,
    compact_json: bool,
}

impl fmt::Debug for ConfigLoaderBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigLoaderBuilder")
            .field("base_dir", &self.base_dir)
            .field("format", &self.format.as_ref().map(|fmt| fmt.extension().to_string()))
            .field("compact_json", &self.compact_json)
            .finish()
    }
}

impl ConfigLoaderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory relative paths are resolved against
    ///
    /// Supports `~` expansion for home directory. Defaults to the current
    /// directory.
    #[must_use]
    pub fn base_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(expand_home(&path.into()));
        self
    }

    /// Always use this format instead of detecting it
    #[must_use]
    pub fn format(mut self, format: impl Format + 'static) -> Self {
        self.format = Some(Arc::new(format));
        self
    }

    /// Always use the format registered for `extension`
    pub fn format_extension(mut self, extension: &str) -> Result<Self> {
        self.format = Some(format::for_extension(extension)?);
        Ok(self)
    }

    /// Use compact JSON (no pretty printing)
    #[must_use]
    pub fn compact_json(mut self) -> Self {
        self.compact_json = true;
        self
    }

    pub fn build(self) -> ConfigLoader {
        ConfigLoader {
            base_dir: self.base_dir.unwrap_or_else(|| PathBuf::from(".")),
            format: self.format,
            pretty_json: !self.compact_json,
        }
    }
}

impl From<ConfigLoaderBuilder> for ConfigLoader {
    fn from(builder: ConfigLoaderBuilder) -> Self {
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::mapping;
    use crate::schema::ValidationRule;
    use tempfile::tempdir;

    #[test]
    fn test_builder_defaults() {
        let loader = ConfigLoader::builder().build();
        assert_eq!(loader.base_dir(), Path::new("."));
        assert!(loader.render(&ConfigTree::default()).is_ok());
    }

    #[test]
    fn test_base_dir_expands_home() {
        let loader = ConfigLoader::builder().base_dir("~/site").build();
        if let Some(home) = dirs::home_dir() {
            assert_eq!(loader.base_dir(), home.join("site"));
        }
        assert_eq!(loader.resolve("/etc/settings.php"), PathBuf::from("/etc/settings.php"));
    }

    #[test]
    fn test_load_str_detects_format() {
        let loader = ConfigLoader::default();
        let php = loader.load_str("<?php return ['SYS' => ['sitename' => 'Demo']];").unwrap();
        let json = loader.load_str(r#"{"SYS": {"sitename": "Demo"}}"#).unwrap();
        assert_eq!(php, json);
    }

    #[test]
    fn test_fixed_format() {
        let loader = ConfigLoader::builder()
            .format_extension("php")
            .unwrap()
            .build();
        assert!(matches!(
            loader.load_str(r#"{"a": 1}"#),
            Err(Error::Parse { .. })
        ));
    }

    #[test]
    fn test_write_then_load_file() {
        let dir = tempdir().unwrap();
        let loader = ConfigLoader::builder().base_dir(dir.path()).compact_json().build();
        let tree = ConfigTree::new(mapping! {
            "MAIL" => mapping! { "transport" => "smtp" },
        });

        loader.write_file("additional.json", &tree).unwrap();
        let written = std::fs::read_to_string(dir.path().join("additional.json")).unwrap();
        assert!(!written.contains('\n'));
        assert_eq!(loader.load_file("additional.json").unwrap(), tree);
    }

    #[test]
    fn test_load_file_errors() {
        let dir = tempdir().unwrap();
        let loader = ConfigLoader::builder().base_dir(dir.path()).build();
        assert!(matches!(loader.load_file("missing.json"), Err(Error::FileRead { .. })));
        assert!(matches!(
            loader.load_file("settings.ini"),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_load_layers_merges_in_order() {
        let dir = tempdir().unwrap();
        let loader = ConfigLoader::builder().base_dir(dir.path()).build();
        loader
            .write_file(
                "settings.php",
                &ConfigTree::new(mapping! {
                    "SYS" => mapping! { "sitename" => "Base", "displayErrors" => 0 },
                }),
            )
            .unwrap();
        loader
            .write_file(
                "additional.json",
                &ConfigTree::new(mapping! { "SYS" => mapping! { "displayErrors" => 1 } }),
            )
            .unwrap();

        let tree = loader.load_layers(["settings.php", "additional.json"]).unwrap();
        assert_eq!(tree.get_str("SYS.sitename").unwrap(), "Base");
        assert_eq!(tree.get_i64("SYS.displayErrors").unwrap(), 1);

        assert!(loader.load_layers(["settings.php", "missing.json"]).is_err());
        assert!(loader.load_layers(Vec::<PathBuf>::new()).unwrap().is_empty());
    }

    #[test]
    fn test_load_validated() {
        let loader = ConfigLoader::default();
        let validator = SchemaValidator::new(vec![
            ValidationRule::one_of("GFX.processor_colorspace", ["RGB", "CMYK", "GRAY"]),
        ])
        .unwrap();

        let tree = loader
            .load_str_validated(r#"{"GFX": {"processor_colorspace": "RGB"}}"#, &validator)
            .unwrap();
        assert_eq!(tree.get_str("GFX.processor_colorspace").unwrap(), "RGB");

        let err = loader
            .load_str_validated(r#"{"GFX": {"processor_colorspace": "XYZ"}}"#, &validator)
            .unwrap_err();
        assert!(matches!(err, Error::Validation(ref errors) if errors.len() == 1));
    }
}
