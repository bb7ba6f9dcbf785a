//! # cfgtree - Typed Configuration Trees
//!
//! Loads hierarchical configuration (CMS `settings.php` arrays, JSON, TOML,
//! YAML) into an immutable, strongly typed tree, validates it against a rule
//! set and publishes it to the rest of the application.
//!
//! ## Features
//!
//! - **Typed tree**: every node is a scalar, a sequence or a mapping; no nulls, no coercion
//! - **Path queries**: `tree.get_str("DB.Connections.Default.host")` with precise errors
//! - **Layering**: merge defaults and overrides, right-biased
//! - **Schema validation**: type, enum, range and regex rules with wildcards, all errors collected
//! - **Hot reload**: [`ConfigHandle`] swaps trees atomically and notifies listeners
//! - **Docs**: Markdown reference generated from the rules
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cfgtree::{ConfigLoader, SchemaValidator, cms};
//!
//! let loader = ConfigLoader::builder()
//!     .base_dir("~/site/config/system")
//!     .build();
//!
//! let validator = SchemaValidator::new(cms::rules())?;
//! let settings = loader.load_layers_validated(
//!     ["settings.php", "additional.json"],
//!     &validator,
//! )?;
//!
//! let colorspace = settings.get_str("GFX.processor_colorspace")?;
//! let port = settings.get_i64("DB.Connections.Default.port")?;
//! # Ok::<(), cfgtree::Error>(())
//! ```
//!
//! ## Defining Rules
//!
//! ```rust
//! use cfgtree::{mapping, ConfigTree, SchemaValidator, ScalarType, ValidationRule};
//!
//! let validator = SchemaValidator::new(vec![
//!     ValidationRule::mapping("SYS").required(),
//!     ValidationRule::sequence("SYS.systemMaintainers").items(ScalarType::Integer),
//!     ValidationRule::boolean("SYS.features.*"),
//!     ValidationRule::integer("DB.Connections.*.port").min(1.0).max(65535.0),
//! ])?
//! .strict(true);
//!
//! let tree = ConfigTree::new(mapping! {
//!     "SYS" => mapping! { "features" => mapping! { "fluidBasedPageModule" => "yes" } },
//! });
//!
//! let result = validator.validate(&tree);
//! assert_eq!(result.errors().len(), 1);
//! assert_eq!(result.errors()[0].path.to_string(), "SYS.features.fluidBasedPageModule");
//! # Ok::<(), cfgtree::Error>(())
//! ```
//!
//! ## Typed Sections
//!
//! Consumers receive their section as a plain struct instead of walking the tree:
//!
//! ```rust
//! use cfgtree::{mapping, ConfigTree};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Mail {
//!     transport: String,
//!     #[serde(default)]
//!     transport_smtp_server: String,
//! }
//!
//! let tree = ConfigTree::new(mapping! {
//!     "MAIL" => mapping! { "transport" => "sendmail" },
//! });
//! let mail: Mail = tree.get_as("MAIL")?;
//! assert_eq!(mail.transport, "sendmail");
//! # Ok::<(), cfgtree::Error>(())
//! ```

// Core modules
mod docs;
mod error;
mod events;
mod handle;
mod loader;
mod sync;
mod tree;

// Grouped modules
pub mod format;
pub mod schema;

// Re-exports from core
pub use docs::{DocsConfig, generate_docs, generate_docs_from_rules, generate_schema_docs};
pub use error::{Error, Location, Result};
pub use events::{ChangeCallback, EventManager, ReloadCallback};
pub use handle::{ConfigHandle, Snapshot};
pub use loader::{ConfigLoader, ConfigLoaderBuilder};
pub use tree::{ConfigNode, ConfigPath, ConfigTree, Mapping, NodeKind, Scalar, ScalarType};

// Re-exports from format
pub use format::{Format, JsonFormat};
#[cfg(feature = "php")]
pub use format::PhpFormat;
#[cfg(feature = "toml")]
pub use format::TomlFormat;
#[cfg(feature = "yaml")]
pub use format::YamlFormat;

// Re-exports from schema
pub use schema::{
    ConfigSchema, ExpectedType, PathPattern, SchemaValidator, ValidationError,
    ValidationErrorKind, ValidationErrors, ValidationResult, ValidationRule, cms, validate,
};
