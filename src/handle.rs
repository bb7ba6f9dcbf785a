//! Shared handle for hot-reloadable configuration
//!
//! A [`ConfigHandle`] publishes one immutable [`ConfigTree`] at a time.
//! Readers take an `Arc` snapshot without locking; a reload builds and
//! validates the next tree completely before swapping it in, so readers see
//! either the old tree or the new one, never a mix.
//!
//! Writers are serialized from the start of a reload until its listeners
//! have run. Listeners therefore see swaps in generation order, and must not
//! publish on the same handle themselves.

use crate::error::{Error, Result};
use crate::events::EventManager;
use crate::loader::ConfigLoader;
use crate::schema::SchemaValidator;
use crate::sync::MutexExt;
use crate::tree::{ConfigNode, ConfigPath, ConfigTree};
use arc_swap::ArcSwap;
use log::{info, warn};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use time::OffsetDateTime;

/// A published tree with its generation number
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub tree: Arc<ConfigTree>,
    /// Starts at 0 and increases by one per swap
    pub generation: u64,
    pub loaded_at: OffsetDateTime,
}

struct ReloadSource {
    loader: ConfigLoader,
    paths: Vec<PathBuf>,
    validator: SchemaValidator,
}

/// Atomically swappable configuration shared between threads
///
/// # Example
///
/// ```
/// use cfgtree::{mapping, ConfigHandle, ConfigTree};
/// use std::sync::Arc;
///
/// let handle = ConfigHandle::new(Arc::new(ConfigTree::new(mapping! {
///     "MAIL" => mapping! { "transport" => "sendmail" },
/// })));
///
/// handle.watch("MAIL", |path, _old, new| {
///     println!("{path} changed to {new:?}");
/// });
///
/// let generation = handle.replace(ConfigTree::new(mapping! {
///     "MAIL" => mapping! { "transport" => "smtp" },
/// }));
/// assert_eq!(generation, 1);
/// assert_eq!(handle.current().get_str("MAIL.transport")?, "smtp");
/// # Ok::<(), cfgtree::Error>(())
/// ```
pub struct ConfigHandle {
    current: ArcSwap<Snapshot>,
    /// Held across load, swap and notification; readers never take it
    writer_lock: Mutex<()>,
    source: Option<ReloadSource>,
    events: EventManager,
}

impl ConfigHandle {
    /// Publish `tree` as generation 0. Handles built this way can only be
    /// updated with [`replace`](Self::replace).
    pub fn new(tree: Arc<ConfigTree>) -> Self {
        Self::with_source(tree, None)
    }

    /// Load and validate `paths` (merged in order) and keep them as the
    /// reload source.
    ///
    /// # Errors
    ///
    /// Fails like [`ConfigLoader::load_layers_validated`].
    pub fn from_source<I, P>(
        loader: ConfigLoader,
        paths: I,
        validator: SchemaValidator,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let paths: Vec<PathBuf> = paths.into_iter().map(|p| loader.resolve(p)).collect();
        let tree = loader.load_layers_validated(&paths, &validator)?;
        info!("Configuration published from {} file(s)", paths.len());
        Ok(Self::with_source(
            tree,
            Some(ReloadSource {
                loader,
                paths,
                validator,
            }),
        ))
    }

    fn with_source(tree: Arc<ConfigTree>, source: Option<ReloadSource>) -> Self {
        Self {
            current: ArcSwap::new(Arc::new(Snapshot {
                tree,
                generation: 0,
                loaded_at: OffsetDateTime::now_utc(),
            })),
            writer_lock: Mutex::new(()),
            source,
            events: EventManager::new(),
        }
    }

    // =========================================================================
    // Readers
    // =========================================================================

    /// The currently published tree
    pub fn current(&self) -> Arc<ConfigTree> {
        Arc::clone(&self.current.load().tree)
    }

    /// The current tree together with its generation and load time
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    pub fn generation(&self) -> u64 {
        self.current.load().generation
    }

    pub fn loaded_at(&self) -> OffsetDateTime {
        self.current.load().loaded_at
    }

    // =========================================================================
    // Writers
    // =========================================================================

    /// Publish `tree`, returning its generation. Listeners run after the swap.
    pub fn replace(&self, tree: ConfigTree) -> u64 {
        let _guard = self.writer_lock.lock_recovered();
        self.publish(Arc::new(tree))
    }

    /// Reload the source files and publish the result.
    ///
    /// On any load or validation failure the current tree stays published
    /// and the error is returned.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if the handle was not built with
    /// [`from_source`](Self::from_source), otherwise the load or validation error.
    pub fn reload(&self) -> Result<u64> {
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| Error::Config("handle has no reload source".to_string()))?;

        // a concurrent reload must not publish an older read after a newer one
        let _guard = self.writer_lock.lock_recovered();
        match source
            .loader
            .load_layers_validated(&source.paths, &source.validator)
        {
            Ok(tree) => Ok(self.publish(tree)),
            Err(e) => {
                warn!(
                    "Failed to reload configuration: {e}. Keeping generation {}.",
                    self.generation()
                );
                Err(e)
            }
        }
    }

    /// Swap in `tree` and notify listeners. Callers hold `writer_lock`.
    fn publish(&self, tree: Arc<ConfigTree>) -> u64 {
        let old = self.current.load_full();
        let generation = old.generation + 1;
        self.current.store(Arc::new(Snapshot {
            tree: Arc::clone(&tree),
            generation,
            loaded_at: OffsetDateTime::now_utc(),
        }));

        info!("Published configuration generation {generation}");
        self.events.notify(&old.tree, &tree);
        generation
    }

    // =========================================================================
    // Listeners
    // =========================================================================

    pub fn events(&self) -> &EventManager {
        &self.events
    }

    /// Shortcut for [`EventManager::on_reload`]
    pub fn on_reload<F>(&self, callback: F)
    where
        F: Fn(&ConfigTree, &ConfigTree) + Send + Sync + 'static,
    {
        self.events.on_reload(callback);
    }

    /// Shortcut for [`EventManager::watch`]
    pub fn watch<F>(&self, path: impl Into<ConfigPath>, callback: F)
    where
        F: Fn(&ConfigPath, Option<&ConfigNode>, Option<&ConfigNode>) + Send + Sync + 'static,
    {
        self.events.watch(path, callback);
    }
}

impl fmt::Debug for ConfigHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigHandle")
            .field("generation", &self.generation())
            .field("loaded_at", &self.loaded_at())
            .field("paths", &self.source.as_ref().map(|s| &s.paths))
            .field("events", &self.events)
            .finish()
    }
}
