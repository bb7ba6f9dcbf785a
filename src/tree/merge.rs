//! Layering and comparison of trees

use super::node::{ConfigNode, Mapping};
use super::path::ConfigPath;
use std::collections::HashMap;

/// Right-biased recursive merge of two mappings.
///
/// Mappings present on both sides merge key by key; any other pairing is
/// replaced wholesale by the overlay. Keys of `base` keep their order and keys
/// only present in `overlay` are appended.
pub(crate) fn merge_mappings(base: &Mapping, overlay: &Mapping) -> Mapping {
    let mut merged = base.clone();
    for (key, node) in overlay.iter() {
        let next = match (merged.get(key), node) {
            (Some(ConfigNode::Mapping(left)), ConfigNode::Mapping(right)) => {
                ConfigNode::Mapping(merge_mappings(left, right))
            }
            _ => node.clone(),
        };
        merged.insert(key, next);
    }
    merged
}

/// Collect every non-mapping node and every empty mapping below `mapping`,
/// in document order.
pub(crate) fn collect_leaves<'a>(
    mapping: &'a Mapping,
    path: &ConfigPath,
    out: &mut Vec<(ConfigPath, &'a ConfigNode)>,
) {
    for (key, node) in mapping.iter() {
        let child = path.child(key);
        match node {
            ConfigNode::Mapping(inner) if !inner.is_empty() => collect_leaves(inner, &child, out),
            _ => out.push((child, node)),
        }
    }
}

/// Leaf paths whose value differs between `old` and `new`.
///
/// Changed and removed leaves come first in the order of `old`, followed by
/// leaves that only exist in `new`.
pub(crate) fn diff_mappings(old: &Mapping, new: &Mapping) -> Vec<ConfigPath> {
    let mut old_leaves = Vec::new();
    collect_leaves(old, &ConfigPath::root(), &mut old_leaves);
    let mut new_leaves = Vec::new();
    collect_leaves(new, &ConfigPath::root(), &mut new_leaves);

    let new_index: HashMap<&ConfigPath, &ConfigNode> =
        new_leaves.iter().map(|(p, n)| (p, *n)).collect();
    let old_index: HashMap<&ConfigPath, &ConfigNode> =
        old_leaves.iter().map(|(p, n)| (p, *n)).collect();

    let mut changed: Vec<ConfigPath> = old_leaves
        .iter()
        .filter(|(path, node)| new_index.get(path) != Some(node))
        .map(|(path, _)| path.clone())
        .collect();

    changed.extend(
        new_leaves
            .iter()
            .filter(|(path, _)| !old_index.contains_key(path))
            .map(|(path, _)| path.clone()),
    );

    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping;

    #[test]
    fn test_merge_recurses_into_mappings() {
        let base = mapping! {
            "DB" => mapping! { "host" => "localhost", "port" => 3306 },
        };
        let overlay = mapping! {
            "DB" => mapping! { "host" => "database" },
        };

        let merged = merge_mappings(&base, &overlay);
        let db = merged.get("DB").and_then(ConfigNode::as_mapping).unwrap();
        assert_eq!(db.get("host"), Some(&ConfigNode::from("database")));
        assert_eq!(db.get("port"), Some(&ConfigNode::from(3306)));
    }

    #[test]
    fn test_merge_replaces_sequences_wholesale() {
        let base = mapping! { "langs" => vec![ConfigNode::from("de"), ConfigNode::from("fr")] };
        let overlay = mapping! { "langs" => vec![ConfigNode::from("en")] };

        let merged = merge_mappings(&base, &overlay);
        assert_eq!(merged.get("langs"), Some(&ConfigNode::from(vec![ConfigNode::from("en")])));
    }

    #[test]
    fn test_scalar_overlay_replaces_mapping() {
        let base = mapping! { "options" => mapping! { "cost" => 10 } };
        let overlay = mapping! { "options" => false };

        let merged = merge_mappings(&base, &overlay);
        assert_eq!(merged.get("options"), Some(&ConfigNode::from(false)));
    }

    #[test]
    fn test_diff_reports_changed_removed_and_added() {
        let old = mapping! {
            "GFX" => mapping! { "processor" => "GraphicsMagick", "processor_effects" => false },
            "MAIL" => mapping! { "transport" => "sendmail" },
        };
        let new = mapping! {
            "GFX" => mapping! { "processor" => "ImageMagick" },
            "MAIL" => mapping! { "transport" => "sendmail", "transport_smtp_server" => "mx:25" },
        };

        let changed: Vec<String> = diff_mappings(&old, &new).iter().map(ToString::to_string).collect();
        assert_eq!(
            changed,
            [
                "GFX.processor",
                "GFX.processor_effects",
                "MAIL.transport_smtp_server"
            ]
        );
    }

    #[test]
    fn test_diff_sees_empty_mappings() {
        let old = mapping! {
            "BE" => mapping! {
                "passwordHashing" => mapping! { "className" => "Argon2i", "options" => Mapping::new() },
            },
        };
        let new = mapping! {
            "BE" => mapping! { "passwordHashing" => mapping! { "className" => "Argon2i" } },
        };

        let removed: Vec<String> = diff_mappings(&old, &new).iter().map(ToString::to_string).collect();
        assert_eq!(removed, ["BE.passwordHashing.options"]);

        let added: Vec<String> = diff_mappings(&new, &old).iter().map(ToString::to_string).collect();
        assert_eq!(added, ["BE.passwordHashing.options"]);

        // filling an empty mapping replaces the empty leaf with the new ones
        let filled = mapping! {
            "BE" => mapping! {
                "passwordHashing" => mapping! {
                    "className" => "Argon2i",
                    "options" => mapping! { "memory_cost" => 65536 },
                },
            },
        };
        let changed: Vec<String> = diff_mappings(&old, &filled).iter().map(ToString::to_string).collect();
        assert_eq!(
            changed,
            ["BE.passwordHashing.options", "BE.passwordHashing.options.memory_cost"]
        );
    }
}
