//! Loading and mounting of a single overlay module.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use overlay_ipc::OverlayConfig;
use overlay_sdk::{EventEmitter, MountProps, OverlayHandle, Surface};

use crate::bridge::subscribe_bridge;
use crate::error::LoaderError;
use crate::source::{resolve_bundle_url, ModuleExports, ModuleSource};
use crate::LoaderResult;

/// A mounted overlay.
pub struct LoadedOverlay {
    /// Lifecycle handle returned by the module.
    pub handle: Box<dyn OverlayHandle>,

    /// Manifest exported by the module, if any.
    pub manifest: Option<Value>,
}

impl fmt::Debug for LoadedOverlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedOverlay")
            .field("manifest", &self.manifest.is_some())
            .finish_non_exhaustive()
    }
}

/// Loads one overlay module at a time and mounts it.
pub struct OverlayLoader {
    source: Arc<dyn ModuleSource>,
    installed: Option<ModuleExports>,
}

impl OverlayLoader {
    pub fn new(source: Arc<dyn ModuleSource>) -> Self {
        Self {
            source,
            installed: None,
        }
    }

    /// Load the module at `bundle_url`. Does not mount.
    ///
    /// Any previously installed module is discarded first, so a failed load
    /// never leaves a stale module behind.
    #[instrument(skip(self))]
    pub fn load(&mut self, bundle_url: &str) -> LoaderResult<()> {
        self.installed = None;

        let url = resolve_bundle_url(bundle_url);
        let exports = self.source.fetch(&url).map_err(|e| {
            warn!(%url, error = ?e, "Overlay fetch failed");
            match e {
                LoaderError::Load { reason, .. } => LoaderError::load(bundle_url, reason),
                other => other,
            }
        })?;

        let exports = match exports {
            Some(exports) if exports.mount.is_some() => exports,
            _ => return Err(LoaderError::MissingMount),
        };

        info!(%url, manifest = exports.manifest.is_some(), "Overlay loaded");
        self.installed = Some(exports);
        Ok(())
    }

    /// Whether a module is installed.
    pub fn is_loaded(&self) -> bool {
        self.installed.is_some()
    }

    /// Manifest exported by the installed module.
    pub fn manifest(&self) -> Option<&Value> {
        self.installed.as_ref().and_then(|e| e.manifest.as_ref())
    }

    /// Mount the installed module into `surface`, fed by `emitter`.
    pub fn mount(
        &self,
        surface: Arc<dyn Surface>,
        emitter: &Arc<EventEmitter>,
        config: OverlayConfig,
    ) -> LoaderResult<LoadedOverlay> {
        let exports = self.installed.as_ref().ok_or(LoaderError::NotLoaded)?;
        let mount = exports.mount.as_ref().ok_or(LoaderError::NotLoaded)?;

        let props = MountProps {
            config,
            subscribe_to_events: subscribe_bridge(Arc::clone(emitter)),
        };
        let handle = mount(surface, props);
        debug!("Overlay mounted");

        Ok(LoadedOverlay {
            handle,
            manifest: exports.manifest.clone(),
        })
    }
}

impl fmt::Debug for OverlayLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayLoader")
            .field("installed", &self.installed)
            .finish_non_exhaustive()
    }
}
