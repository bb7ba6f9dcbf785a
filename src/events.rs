//! Event system for configuration reloads
//!
//! Provides reactive callbacks invoked after a [`ConfigHandle`](crate::ConfigHandle)
//! publishes a new tree.

use crate::sync::RwLockExt;
use crate::tree::{ConfigNode, ConfigPath, ConfigTree};
use std::sync::Arc;
use std::sync::RwLock;

/// Type alias for a reload callback receiving (old, new)
pub type ReloadCallback = Arc<dyn Fn(&ConfigTree, &ConfigTree) + Send + Sync>;

/// Type alias for a change callback receiving (path, old value, new value)
///
/// A value is `None` when the leaf did not exist on that side.
pub type ChangeCallback =
    Arc<dyn Fn(&ConfigPath, Option<&ConfigNode>, Option<&ConfigNode>) + Send + Sync>;

/// Manages listeners for configuration reloads
pub struct EventManager {
    /// Called once per swap with both trees
    reload_listeners: RwLock<Vec<ReloadCallback>>,

    /// Called for each changed leaf at or below the watched path
    path_listeners: RwLock<Vec<(ConfigPath, ChangeCallback)>>,
}

impl EventManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            reload_listeners: RwLock::new(Vec::new()),
            path_listeners: RwLock::new(Vec::new()),
        }
    }

    /// Register a listener called after every swap
    pub fn on_reload<F>(&self, callback: F)
    where
        F: Fn(&ConfigTree, &ConfigTree) + Send + Sync + 'static,
    {
        self.reload_listeners.write_recovered().push(Arc::new(callback));
    }

    /// Register a listener for leaves at or below `path`
    ///
    /// # Arguments
    /// * `path` - A section (e.g. "DB.Connections") or a single leaf
    /// * `callback` - Function receiving (`leaf_path`, `old_value`, `new_value`)
    pub fn watch<F>(&self, path: impl Into<ConfigPath>, callback: F)
    where
        F: Fn(&ConfigPath, Option<&ConfigNode>, Option<&ConfigNode>) + Send + Sync + 'static,
    {
        self.path_listeners
            .write_recovered()
            .push((path.into(), Arc::new(callback)));
    }

    /// Notify listeners about a swap from `old` to `new`
    ///
    /// Callbacks are collected before any is invoked, so a callback may
    /// register further listeners without deadlocking.
    pub fn notify(&self, old: &ConfigTree, new: &ConfigTree) {
        let reload: Vec<ReloadCallback> = self.reload_listeners.read_recovered().clone();
        for callback in &reload {
            callback(old, new);
        }

        let watchers: Vec<(ConfigPath, ChangeCallback)> =
            self.path_listeners.read_recovered().clone();
        if watchers.is_empty() {
            return;
        }

        for changed in old.diff(new) {
            let before = old.get(&changed).ok();
            let after = new.get(&changed).ok();
            for (watched, callback) in &watchers {
                if changed.starts_with(watched) {
                    callback(&changed, before, after);
                }
            }
        }
    }

    /// Remove all listeners for a specific path
    pub fn unwatch(&self, path: impl Into<ConfigPath>) {
        let path = path.into();
        self.path_listeners
            .write_recovered()
            .retain(|(watched, _)| *watched != path);
    }

    /// Clear all listeners
    pub fn clear(&self) {
        self.reload_listeners.write_recovered().clear();
        self.path_listeners.write_recovered().clear();
    }
}

impl Default for EventManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventManager")
            .field("reload_listeners", &self.reload_listeners.read_recovered().len())
            .field("path_listeners", &self.path_listeners.read_recovered().len())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn trees() -> (ConfigTree, ConfigTree) {
        let old = ConfigTree::new(mapping! {
            "DB" => mapping! { "Connections" => mapping! {
                "Default" => mapping! { "host" => "database", "port" => 3306 },
            } },
            "GFX" => mapping! { "processor" => "GraphicsMagick" },
        });
        let new = ConfigTree::new(mapping! {
            "DB" => mapping! { "Connections" => mapping! {
                "Default" => mapping! { "host" => "replica", "port" => 3306 },
            } },
            "GFX" => mapping! { "processor" => "GraphicsMagick", "processor_path" => "/usr/bin/" },
        });
        (old, new)
    }

    #[test]
    fn test_reload_listener() {
        let events = EventManager::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();

        events.on_reload(move |_old, _new| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });

        let (old, new) = trees();
        events.notify(&old, &new);

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_path_listener_sees_changed_leaves_only() {
        let events = EventManager::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();

        events.watch("DB", move |path, old, new| {
            seen_clone
                .lock()
                .unwrap()
                .push((path.to_string(), old.cloned(), new.cloned()));
        });

        let (old, new) = trees();
        events.notify(&old, &new);

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![(
                "DB.Connections.Default.host".to_string(),
                Some(ConfigNode::from("database")),
                Some(ConfigNode::from("replica")),
            )]
        );
    }

    #[test]
    fn test_added_leaf_has_no_old_value() {
        let events = EventManager::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();

        events.watch("GFX.processor_path", move |_path, old, new| {
            assert!(old.is_none());
            assert_eq!(new, Some(&ConfigNode::from("/usr/bin/")));
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });

        let (old, new) = trees();
        events.notify(&old, &new);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unwatch_and_clear() {
        let events = EventManager::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let c1 = counter.clone();
        let c2 = counter.clone();

        events.watch("DB", move |_, _, _| {
            c1.fetch_add(1, Ordering::SeqCst);
        });
        events.on_reload(move |_, _| {
            c2.fetch_add(1, Ordering::SeqCst);
        });

        events.unwatch("DB");
        let (old, new) = trees();
        events.notify(&old, &new);
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        events.clear();
        events.notify(&old, &new);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
