//! The configuration tree and its path-based query API
//!
//! A [`ConfigTree`] is a root [`Mapping`] built once at load time. It exposes
//! only shared references, so once it is wrapped in an `Arc` and handed to
//! consumers it can be read from any number of threads without locking.
//!
//! ```
//! use cfgtree::{mapping, ConfigTree, ScalarType};
//!
//! let tree = ConfigTree::new(mapping! {
//!     "DB" => mapping! {
//!         "Connections" => mapping! {
//!             "Default" => mapping! { "host" => "database", "port" => 3306 },
//!         },
//!     },
//! });
//!
//! assert_eq!(tree.get_str("DB.Connections.Default.host")?, "database");
//! assert_eq!(tree.get_i64(["DB", "Connections", "Default", "port"])?, 3306);
//! assert!(tree.get_scalar("DB.Connections.Default.port", ScalarType::String).is_err());
//! # Ok::<(), cfgtree::Error>(())
//! ```

mod merge;
mod node;
mod path;

pub use node::{ConfigNode, Mapping, NodeKind, Scalar, ScalarType};
pub use path::ConfigPath;

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};

/// Immutable, ordered, nested configuration data
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigTree {
    root: Mapping,
}

impl ConfigTree {
    pub fn new(root: Mapping) -> Self {
        Self { root }
    }

    /// The top-level mapping
    pub fn root(&self) -> &Mapping {
        &self.root
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    // =========================================================================
    // Path resolution
    // =========================================================================

    /// Resolve a path to its node.
    ///
    /// # Errors
    ///
    /// - [`Error::PathNotFound`] if any segment is missing (or the path is empty)
    /// - [`Error::TypeMismatch`] if an intermediate segment is not a mapping
    pub fn get(&self, path: impl Into<ConfigPath>) -> Result<&ConfigNode> {
        let path = path.into();
        self.lookup(&path)
    }

    fn lookup(&self, path: &ConfigPath) -> Result<&ConfigNode> {
        let (last, parents) = path
            .segments()
            .split_last()
            .ok_or_else(|| Error::PathNotFound(path.to_string()))?;

        let mut current = &self.root;
        for (depth, segment) in parents.iter().enumerate() {
            current = match current.get(segment) {
                Some(ConfigNode::Mapping(inner)) => inner,
                Some(other) => {
                    return Err(Error::TypeMismatch {
                        path: path.prefix(depth + 1).to_string(),
                        expected: "mapping".to_string(),
                        actual: other.kind().to_string(),
                    });
                }
                None => return Err(Error::PathNotFound(path.to_string())),
            };
        }

        current
            .get(last)
            .ok_or_else(|| Error::PathNotFound(path.to_string()))
    }

    /// Whether the path resolves to any node
    pub fn contains(&self, path: impl Into<ConfigPath>) -> bool {
        self.get(path).is_ok()
    }

    /// Resolve a path to a scalar of the given runtime type.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get), plus [`Error::TypeMismatch`] when the node is
    /// not a scalar of `expected` type.
    pub fn get_scalar(&self, path: impl Into<ConfigPath>, expected: ScalarType) -> Result<&Scalar> {
        let path = path.into();
        let node = self.lookup(&path)?;
        match node {
            ConfigNode::Scalar(scalar) if scalar.scalar_type() == expected => Ok(scalar),
            other => Err(type_mismatch(&path, expected, other)),
        }
    }

    pub fn get_str(&self, path: impl Into<ConfigPath>) -> Result<&str> {
        let path = path.into();
        match self.lookup(&path)? {
            ConfigNode::Scalar(Scalar::String(s)) => Ok(s),
            other => Err(type_mismatch(&path, ScalarType::String, other)),
        }
    }

    pub fn get_i64(&self, path: impl Into<ConfigPath>) -> Result<i64> {
        let path = path.into();
        match self.lookup(&path)? {
            ConfigNode::Scalar(Scalar::Integer(n)) => Ok(*n),
            other => Err(type_mismatch(&path, ScalarType::Integer, other)),
        }
    }

    /// Numeric value; integer nodes are accepted and widened.
    pub fn get_f64(&self, path: impl Into<ConfigPath>) -> Result<f64> {
        let path = path.into();
        let node = self.lookup(&path)?;
        node.as_scalar()
            .and_then(Scalar::as_f64)
            .ok_or_else(|| type_mismatch(&path, ScalarType::Float, node))
    }

    pub fn get_bool(&self, path: impl Into<ConfigPath>) -> Result<bool> {
        let path = path.into();
        match self.lookup(&path)? {
            ConfigNode::Scalar(Scalar::Boolean(b)) => Ok(*b),
            other => Err(type_mismatch(&path, ScalarType::Boolean, other)),
        }
    }

    pub fn get_sequence(&self, path: impl Into<ConfigPath>) -> Result<&[ConfigNode]> {
        let path = path.into();
        let node = self.lookup(&path)?;
        node.as_sequence().ok_or_else(|| Error::TypeMismatch {
            path: path.to_string(),
            expected: "sequence".to_string(),
            actual: node.kind().to_string(),
        })
    }

    pub fn get_mapping(&self, path: impl Into<ConfigPath>) -> Result<&Mapping> {
        let path = path.into();
        let node = self.lookup(&path)?;
        node.as_mapping().ok_or_else(|| Error::TypeMismatch {
            path: path.to_string(),
            expected: "mapping".to_string(),
            actual: node.kind().to_string(),
        })
    }

    // =========================================================================
    // Typed access
    // =========================================================================

    /// Deserialize the node at `path` into `T`.
    ///
    /// The root path deserializes the whole tree. This is the intended way for
    /// a consumer (database connector, mail subsystem) to receive its section
    /// as a plain struct.
    ///
    /// ```
    /// use cfgtree::{mapping, ConfigTree};
    /// use serde::Deserialize;
    ///
    /// #[derive(Deserialize)]
    /// struct Connection {
    ///     host: String,
    ///     port: u16,
    /// }
    ///
    /// let tree = ConfigTree::new(mapping! {
    ///     "DB" => mapping! { "host" => "database", "port" => 3306 },
    /// });
    /// let conn: Connection = tree.get_as("DB")?;
    /// assert_eq!(conn.port, 3306);
    /// # Ok::<(), cfgtree::Error>(())
    /// ```
    ///
    /// # Errors
    ///
    /// Resolution errors as for [`get`](Self::get), or
    /// [`Error::InvalidValue`] when the node does not fit `T`.
    pub fn get_as<T>(&self, path: impl Into<ConfigPath>) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let path = path.into();
        let value = if path.is_root() {
            ConfigNode::Mapping(self.root.clone()).to_json()
        } else {
            self.lookup(&path)?.to_json()
        };

        serde_json::from_value(value).map_err(|e| Error::InvalidValue {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }

    /// Like [`get_as`](Self::get_as), but returns `default` when the path does
    /// not exist. Type errors are still reported.
    pub fn get_or<T>(&self, path: impl Into<ConfigPath>, default: T) -> Result<T>
    where
        T: DeserializeOwned,
    {
        match self.get_as(path) {
            Err(Error::PathNotFound(_)) => Ok(default),
            other => other,
        }
    }

    // =========================================================================
    // Whole-tree operations
    // =========================================================================

    /// Layer `other` on top of this tree.
    ///
    /// For every path present in `other` its value wins. Mappings merge
    /// recursively field by field, sequences and scalars are replaced
    /// wholesale. Neither input is modified.
    #[must_use]
    pub fn merge(&self, other: &ConfigTree) -> ConfigTree {
        ConfigTree {
            root: merge::merge_mappings(&self.root, &other.root),
        }
    }

    /// Paths of leaves that changed, disappeared or appeared in `other`.
    ///
    /// Empty mappings count as leaves, so adding or removing `options => []`
    /// is reported.
    pub fn diff(&self, other: &ConfigTree) -> Vec<ConfigPath> {
        merge::diff_mappings(&self.root, &other.root)
    }

    /// Every non-mapping node and every empty mapping with its path, in
    /// document order.
    pub fn leaves(&self) -> Vec<(ConfigPath, &ConfigNode)> {
        let mut out = Vec::new();
        merge::collect_leaves(&self.root, &ConfigPath::root(), &mut out);
        out
    }
}

impl From<Mapping> for ConfigTree {
    fn from(root: Mapping) -> Self {
        Self::new(root)
    }
}

impl Serialize for ConfigTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.root.serialize(serializer)
    }
}

fn type_mismatch(path: &ConfigPath, expected: ScalarType, actual: &ConfigNode) -> Error {
    Error::TypeMismatch {
        path: path.to_string(),
        expected: expected.to_string(),
        actual: actual.kind().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping;
    use serde::Deserialize;

    fn sample() -> ConfigTree {
        ConfigTree::new(mapping! {
            "DB" => mapping! {
                "Connections" => mapping! {
                    "Default" => mapping! {
                        "host" => "database",
                        "port" => 3306,
                        "driver" => "mysqli",
                    },
                },
            },
            "SYS" => mapping! {
                "sitename" => "TYPO3 Demo",
                "displayErrors" => -1,
                "systemMaintainers" => vec![ConfigNode::from(1), ConfigNode::from(3)],
                "features" => mapping! { "felogin.extbase" => true },
            },
            "GFX" => mapping! { "processor_enabled" => true },
        })
    }

    #[test]
    fn test_get_nested() {
        let tree = sample();
        assert_eq!(
            tree.get("DB.Connections.Default.host").unwrap(),
            &ConfigNode::from("database")
        );
        assert!(tree.get("DB.Connections").unwrap().is_mapping());
    }

    #[test]
    fn test_missing_segment_is_path_not_found() {
        let tree = sample();
        let err = tree.get("DB.Connections.Replica.host").unwrap_err();
        assert!(matches!(err, Error::PathNotFound(ref p) if p == "DB.Connections.Replica.host"));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_scalar_in_the_middle_is_type_mismatch() {
        let tree = sample();
        let err = tree.get("SYS.sitename.length").unwrap_err();
        match err {
            Error::TypeMismatch { path, expected, actual } => {
                assert_eq!(path, "SYS.sitename");
                assert_eq!(expected, "mapping");
                assert_eq!(actual, "string");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_path_is_not_found() {
        assert!(matches!(sample().get(""), Err(Error::PathNotFound(_))));
    }

    #[test]
    fn test_get_scalar_on_sequence_is_type_mismatch() {
        let tree = sample();
        let err = tree
            .get_scalar(["SYS", "systemMaintainers"], ScalarType::Integer)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::TypeMismatch { ref expected, ref actual, .. } if expected == "integer" && actual == "sequence"
        ));
    }

    #[test]
    fn test_typed_getters() {
        let tree = sample();
        assert_eq!(tree.get_i64("SYS.displayErrors").unwrap(), -1);
        assert_eq!(tree.get_f64("DB.Connections.Default.port").unwrap(), 3306.0);
        assert!(tree.get_bool("GFX.processor_enabled").unwrap());
        assert!(tree.get_bool(["SYS", "features", "felogin.extbase"]).unwrap());
        assert_eq!(tree.get_sequence("SYS.systemMaintainers").unwrap().len(), 2);
        assert_eq!(tree.get_mapping("DB.Connections").unwrap().len(), 1);
        assert!(tree.get_str("DB.Connections.Default.port").is_err());
        assert!(tree.get_mapping("SYS.sitename").is_err());
    }

    #[test]
    fn test_get_or_falls_back_only_when_missing() {
        let tree = sample();
        assert_eq!(tree.get_or("MAIL.transport", "sendmail".to_string()).unwrap(), "sendmail");
        assert_eq!(tree.get_or("DB.Connections.Default.port", 1_i64).unwrap(), 3306);
        assert!(matches!(
            tree.get_or("SYS.sitename", 0_i64),
            Err(Error::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_get_as_struct() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Connection {
            host: String,
            port: u16,
            driver: String,
        }

        let conn: Connection = sample().get_as("DB.Connections.Default").unwrap();
        assert_eq!(
            conn,
            Connection {
                host: "database".into(),
                port: 3306,
                driver: "mysqli".into(),
            }
        );

        let maintainers: Vec<u32> = sample().get_as("SYS.systemMaintainers").unwrap();
        assert_eq!(maintainers, vec![1, 3]);
    }

    #[test]
    fn test_merge_is_right_biased() {
        let a = sample();
        let b = ConfigTree::new(mapping! {
            "SYS" => mapping! { "sitename" => "Production" },
            "MAIL" => mapping! { "transport" => "smtp" },
        });

        let merged = a.merge(&b);
        assert_eq!(merged.get("SYS.sitename").unwrap(), b.get("SYS.sitename").unwrap());
        assert_eq!(merged.get_str("MAIL.transport").unwrap(), "smtp");
        assert_eq!(merged.get_i64("SYS.displayErrors").unwrap(), -1);
        // inputs untouched
        assert_eq!(a.get_str("SYS.sitename").unwrap(), "TYPO3 Demo");
    }

    #[test]
    fn test_merge_associative_for_disjoint_paths() {
        let a = ConfigTree::new(mapping! { "SYS" => mapping! { "sitename" => "A" } });
        let b = ConfigTree::new(mapping! { "SYS" => mapping! { "devIPmask" => "127.0.0.1" } });
        let c = ConfigTree::new(mapping! { "GFX" => mapping! { "processor" => "ImageMagick" } });

        assert_eq!(a.merge(&b).merge(&c), a.merge(&b.merge(&c)));
    }

    #[test]
    fn test_leaves_in_document_order() {
        let tree = sample();
        let paths: Vec<String> = tree.leaves().iter().map(|(p, _)| p.to_string()).collect();
        assert_eq!(paths.first().map(String::as_str), Some("DB.Connections.Default.host"));
        assert!(paths.contains(&"SYS.features.felogin\\.extbase".to_string()));
        assert_eq!(paths.last().map(String::as_str), Some("GFX.processor_enabled"));
    }
}
