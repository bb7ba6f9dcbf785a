//! TOML format

use super::Format;
use super::raw::RawNode;
use crate::error::{Error, Location, Result};
use crate::tree::{ConfigNode, ConfigTree, Mapping, Scalar};
use ::toml::{Table, Value};
use std::fmt::Write as _;

/// TOML format
///
/// Datetimes have no counterpart in a configuration tree and are read as
/// strings in their RFC 3339 form.
///
/// Rendering keeps key order: a mapping followed by plain values in the same
/// table is written as an inline table, trailing mappings become `[sections]`.
#[derive(Debug, Clone, Default)]
pub struct TomlFormat;

impl TomlFormat {
    pub fn new() -> Self {
        Self
    }
}

fn convert(value: Value) -> RawNode {
    match value {
        Value::String(s) => RawNode::Str(s),
        Value::Integer(n) => RawNode::Int(n),
        Value::Float(n) => RawNode::Float(n),
        Value::Boolean(b) => RawNode::Bool(b),
        Value::Datetime(d) => RawNode::Str(d.to_string()),
        Value::Array(items) => RawNode::Seq(items.into_iter().map(convert).collect()),
        Value::Table(table) => RawNode::Map(table.into_iter().map(|(k, v)| (k, convert(v))).collect()),
    }
}

impl Format for TomlFormat {
    fn extension(&self) -> &str {
        "toml"
    }

    fn parse(&self, content: &str) -> Result<ConfigTree> {
        let table: Table = content.parse().map_err(|e: ::toml::de::Error| {
            let location = e.span().map(|span| Location::from_offset(content, span.start));
            Error::parse("toml", location, e.message())
        })?;
        convert(Value::Table(table)).into_tree("toml")
    }

    fn render(&self, tree: &ConfigTree) -> Result<String> {
        let mut out = String::new();
        render_table(&mut out, &[], tree.root());
        Ok(out)
    }
}

// =============================================================================
// Renderer
// =============================================================================

fn is_bare_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

fn render_key(key: &str) -> String {
    if is_bare_key(key) {
        key.to_string()
    } else {
        Value::String(key.to_string()).to_string()
    }
}

fn to_value(node: &ConfigNode) -> Value {
    match node {
        ConfigNode::Scalar(Scalar::String(s)) => Value::String(s.clone()),
        ConfigNode::Scalar(Scalar::Integer(n)) => Value::Integer(*n),
        ConfigNode::Scalar(Scalar::Float(n)) => Value::Float(*n),
        ConfigNode::Scalar(Scalar::Boolean(b)) => Value::Boolean(*b),
        ConfigNode::Sequence(items) => Value::Array(items.iter().map(to_value).collect()),
        ConfigNode::Mapping(mapping) => {
            let mut table = Table::new();
            for (key, child) in mapping.iter() {
                table.insert(key.to_string(), to_value(child));
            }
            Value::Table(table)
        }
    }
}

/// Write the entries of `mapping`, whose header (if any) is already written.
fn render_table(out: &mut String, path: &[String], mapping: &Mapping) {
    let entries: Vec<(&str, &ConfigNode)> = mapping.iter().collect();
    let last_value = entries.iter().rposition(|(_, node)| !node.is_mapping());

    let mut sections = Vec::new();
    for (index, (key, node)) in entries.into_iter().enumerate() {
        if node.is_mapping() && last_value.is_none_or(|last| index > last) {
            sections.push((key, node));
            continue;
        }
        let _ = writeln!(out, "{} = {}", render_key(key), to_value(node));
    }

    for (key, node) in sections {
        let ConfigNode::Mapping(inner) = node else {
            continue;
        };
        let mut child = path.to_vec();
        child.push(key.to_string());

        if !out.is_empty() {
            out.push('\n');
        }
        let header: Vec<String> = child.iter().map(|k| render_key(k)).collect();
        let _ = writeln!(out, "[{}]", header.join("."));
        render_table(out, &child, inner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping;
    use crate::tree::ConfigNode;

    #[test]
    fn test_parse_tables() {
        let tree = TomlFormat::new()
            .parse(
                r#"
[DB.Connections.Default]
host = "database"
port = 3306

[SYS]
systemMaintainers = [1, 3]
installed = 1979-05-27T07:32:00Z
"#,
            )
            .unwrap();
        assert_eq!(tree.get_str("DB.Connections.Default.host").unwrap(), "database");
        assert_eq!(tree.get_i64("DB.Connections.Default.port").unwrap(), 3306);
        assert_eq!(tree.get_str("SYS.installed").unwrap(), "1979-05-27T07:32:00Z");
    }

    #[test]
    fn test_duplicate_key_is_load_error() {
        let err = TomlFormat::new()
            .parse("[SYS]\nsitename = \"A\"\nsitename = \"B\"\n")
            .unwrap_err();
        assert!(err.is_load_error());
    }

    #[test]
    fn test_parse_error_location() {
        let err = TomlFormat::new().parse("[SYS]\nsitename = \n").unwrap_err();
        match err {
            Error::Parse { location, .. } => assert_eq!(location.map(|l| l.line), Some(2)),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_render_keeps_table_before_value() {
        let format = TomlFormat::new();
        let tree = format
            .parse("[SYS]\nfeatures = { fluidBasedPageModule = true }\nsitename = \"Demo\"\n")
            .unwrap();

        let rendered = format.render(&tree).unwrap();
        let reloaded = format.parse(&rendered).unwrap();
        assert_eq!(reloaded, tree);
        assert_eq!(
            reloaded.get_mapping("SYS").unwrap().keys().collect::<Vec<_>>(),
            ["features", "sitename"]
        );
        assert!(rendered.starts_with("[SYS]\nfeatures = {"));
    }

    #[test]
    fn test_render_sections_and_quoted_keys() {
        let tree = ConfigTree::new(mapping! {
            "LOG" => mapping! {
                "writerConfiguration" => mapping! {
                    "error" => mapping! {
                        "TYPO3\\CMS\\Core\\Log\\Writer\\FileWriter" => mapping! { "disabled" => false },
                    },
                },
            },
            "SYS" => mapping! {
                "features" => mapping! { "felogin.extbase" => true },
                "options" => mapping! {},
            },
        });

        let rendered = TomlFormat::new().render(&tree).unwrap();
        assert!(rendered.starts_with("[LOG]\n"));
        assert!(rendered.contains("[SYS.features]\n\"felogin.extbase\" = true\n"));
        assert!(rendered.contains("[SYS.options]"));
        assert_eq!(TomlFormat::new().parse(&rendered).unwrap(), tree);
    }

    #[test]
    fn test_render_round_trip() {
        let tree = ConfigTree::new(mapping! {
            "GFX" => mapping! { "processor" => "ImageMagick", "quality" => 0.85 },
            "SYS" => mapping! {
                "sitename" => "Demo",
                "systemMaintainers" => vec![ConfigNode::from(1), ConfigNode::from(3)],
            },
        });
        let rendered = TomlFormat::new().render(&tree).unwrap();
        assert_eq!(TomlFormat::new().parse(&rendered).unwrap(), tree);
    }
}
