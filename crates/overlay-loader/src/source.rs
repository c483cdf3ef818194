//! Where overlay modules come from.

use std::collections::HashMap;
use std::fmt;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use overlay_sdk::MountFn;

use crate::error::LoaderError;
use crate::LoaderResult;

/// Resolve a bundle location to the module entry point.
pub fn resolve_bundle_url(bundle_url: &str) -> String {
    if bundle_url.ends_with(".js") {
        bundle_url.to_string()
    } else {
        format!("{bundle_url}/index.js")
    }
}

/// What a module installs once it has been executed.
#[derive(Clone, Default)]
pub struct ModuleExports {
    /// Entry point used to mount the overlay.
    pub mount: Option<MountFn>,

    /// Optional manifest document.
    pub manifest: Option<Value>,
}

impl ModuleExports {
    /// Exports with a mount function and no manifest.
    pub fn new(mount: MountFn) -> Self {
        Self {
            mount: Some(mount),
            manifest: None,
        }
    }

    /// Attach a manifest document.
    pub fn with_manifest(mut self, manifest: Value) -> Self {
        self.manifest = Some(manifest);
        self
    }
}

impl fmt::Debug for ModuleExports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleExports")
            .field("mount", &self.mount.is_some())
            .field("manifest", &self.manifest.is_some())
            .finish()
    }
}

/// A mechanism that can fetch and execute an overlay module.
pub trait ModuleSource: Send + Sync {
    /// Fetch the module at `url` (already resolved to its entry point).
    ///
    /// `Ok(None)` means the module ran but installed nothing.
    fn fetch(&self, url: &str) -> LoaderResult<Option<ModuleExports>>;
}

/// In-process registry of overlay modules.
#[derive(Debug, Default)]
pub struct OverlayRegistry {
    modules: RwLock<HashMap<String, ModuleExports>>,
}

impl OverlayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `exports` under `bundle_url`. Replaces an earlier registration.
    pub fn register(&self, bundle_url: &str, exports: ModuleExports) {
        let url = resolve_bundle_url(bundle_url);
        debug!(%url, ?exports, "Registering overlay module");
        self.modules.write().insert(url, exports);
    }

    /// Bundle entry points currently registered.
    pub fn urls(&self) -> Vec<String> {
        let mut urls: Vec<_> = self.modules.read().keys().cloned().collect();
        urls.sort();
        urls
    }
}

impl ModuleSource for OverlayRegistry {
    fn fetch(&self, url: &str) -> LoaderResult<Option<ModuleExports>> {
        self.modules
            .read()
            .get(url)
            .cloned()
            .map(Some)
            .ok_or_else(|| LoaderError::load(url, "module not registered"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_bundle_url() {
        assert_eq!(
            resolve_bundle_url("https://cdn.example.com/overlay.js"),
            "https://cdn.example.com/overlay.js"
        );
        assert_eq!(
            resolve_bundle_url("builtin://chat-log"),
            "builtin://chat-log/index.js"
        );
    }

    #[test]
    fn test_registry_lookup() {
        let registry = OverlayRegistry::new();
        registry.register("builtin://empty", ModuleExports::default());

        assert_eq!(registry.urls(), ["builtin://empty/index.js"]);
        assert!(registry.fetch("builtin://empty/index.js").unwrap().is_some());
        assert!(matches!(
            registry.fetch("builtin://missing/index.js"),
            Err(LoaderError::Load { .. })
        ));
    }
}
