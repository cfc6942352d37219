//! Extension catalog and loader.
//!
//! Extensions are statically-typed factories registered in an
//! [`ExtensionCatalog`] under their summon name. The settings file lists
//! which catalog entries are installed; loading resolves every configured
//! descriptor against the catalog all-or-nothing, so a broken configuration
//! surfaces at engine construction instead of mid-run.

use crate::core::error::{Error, Result};
use crate::core::types::{ExtensionDescriptor, Task};
use crate::ops::Operation;
use std::collections::HashMap;
use std::sync::Arc;

/// Factory for custom operations.
pub trait Extension: Send + Sync {
    /// Build the operation for one resolved task.
    fn create(&self, task: Task) -> Box<dyn Operation>;
}

/// Every extension this build knows how to summon, keyed by name.
#[derive(Default)]
pub struct ExtensionCatalog {
    entries: HashMap<String, Arc<dyn Extension>>,
}

impl ExtensionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, extension: Arc<dyn Extension>) {
        self.entries.insert(name.to_string(), extension);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Extension>> {
        self.entries.get(name).cloned()
    }
}

/// Extensions resolved for one engine instance.
#[derive(Default)]
pub struct LoadedExtensions {
    entries: HashMap<String, Arc<dyn Extension>>,
}

impl LoadedExtensions {
    pub fn get(&self, name: &str) -> Option<Arc<dyn Extension>> {
        self.entries.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }
}

/// Resolve the configured descriptors against the catalog. Any miss fails
/// the whole load.
pub fn load(
    catalog: &ExtensionCatalog,
    descriptors: &[ExtensionDescriptor],
) -> Result<LoadedExtensions> {
    let mut loaded = LoadedExtensions::default();
    for descriptor in descriptors {
        let extension = catalog
            .get(&descriptor.name)
            .ok_or_else(|| Error::ExtensionLoad {
                name: descriptor.name.clone(),
                reason: "not present in the extension catalog".to_string(),
            })?;
        loaded.entries.insert(descriptor.name.clone(), extension);
        tracing::debug!(extension = %descriptor.name, "extension loaded");
    }
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::Result as OpResult;
    use indexmap::IndexMap;
    use serde_json::Value;

    struct NoopOp {
        task: Task,
        ok: bool,
    }

    impl Operation for NoopOp {
        fn task(&self) -> &Task {
            &self.task
        }
        fn execute(&mut self) -> OpResult<()> {
            Ok(())
        }
        fn rollback(&mut self) {}
        fn state(&self) -> bool {
            self.ok
        }
        fn set_state(&mut self, ok: bool) {
            self.ok = ok;
        }
        fn captured(&self) -> IndexMap<String, Value> {
            IndexMap::new()
        }
    }

    struct NoopExtension;

    impl Extension for NoopExtension {
        fn create(&self, task: Task) -> Box<dyn Operation> {
            Box::new(NoopOp { task, ok: true })
        }
    }

    fn descriptor(name: &str) -> ExtensionDescriptor {
        ExtensionDescriptor {
            name: name.to_string(),
            file: String::new(),
            path: String::new(),
            version: 1,
        }
    }

    #[test]
    fn test_load_resolves_registered_extensions() {
        let mut catalog = ExtensionCatalog::new();
        catalog.register("notifier", Arc::new(NoopExtension));
        let loaded = load(&catalog, &[descriptor("notifier")]).unwrap();
        assert!(loaded.get("notifier").is_some());
    }

    #[test]
    fn test_load_is_all_or_nothing() {
        let mut catalog = ExtensionCatalog::new();
        catalog.register("notifier", Arc::new(NoopExtension));
        match load(&catalog, &[descriptor("notifier"), descriptor("ghost")]) {
            Err(Error::ExtensionLoad { name, .. }) => assert_eq!(name, "ghost"),
            Err(other) => panic!("expected extension-load error, got {other}"),
            Ok(_) => panic!("load should fail when any descriptor is unknown"),
        }
    }
}
