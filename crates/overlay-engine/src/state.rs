//! Overlay lifecycle owned by the display host.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use overlay_ipc::{DisplayConfig, OverlayConfig, OverlayState};
use overlay_loader::{LoadedOverlay, LoaderError, ModuleSource, OverlayLoader};
use overlay_sdk::{default_config, merge_with_defaults, EventEmitter, OverlayManifest, Surface};

use crate::error::EngineError;

/// Loads the configured overlay once and mounts it for each connection.
pub struct OverlaySession {
    loader: OverlayLoader,
    bundle_url: String,
    manifest_path: Option<PathBuf>,
    overrides: OverlayConfig,
    mounted: Option<LoadedOverlay>,
    state: OverlayState,
    failure: Option<LoaderError>,
}

impl OverlaySession {
    /// Create a session fetching modules from `source`.
    pub fn new(source: Arc<dyn ModuleSource>) -> Self {
        Self {
            loader: OverlayLoader::new(source),
            bundle_url: String::new(),
            manifest_path: None,
            overrides: OverlayConfig::new(),
            mounted: None,
            state: OverlayState::NotLoaded,
            failure: None,
        }
    }

    /// Apply a new display configuration.
    ///
    /// Switching to another bundle unmounts the current overlay and forces a
    /// fresh load.
    pub fn configure(&mut self, config: &DisplayConfig) {
        if config.bundle_url != self.bundle_url {
            self.unmount();
            self.bundle_url = config.bundle_url.clone();
            self.state = OverlayState::NotLoaded;
            self.failure = None;
        }
        self.manifest_path = config.manifest_path.clone();
        self.overrides = config.overlay_config.clone();
    }

    /// Current load/mount state.
    pub fn state(&self) -> &OverlayState {
        &self.state
    }

    /// Stored overrides, without manifest defaults.
    pub fn overrides(&self) -> &OverlayConfig {
        &self.overrides
    }

    /// Load the bundle unless it is already loaded.
    ///
    /// A failed load is not retried until the session is reconfigured.
    #[instrument(name = "ensure_loaded", skip(self), fields(bundle = %self.bundle_url))]
    pub fn ensure_loaded(&mut self) -> Result<(), EngineError> {
        match &self.state {
            OverlayState::Loaded | OverlayState::Mounted => return Ok(()),
            OverlayState::Failed { message } => {
                debug!(%message, "Overlay previously failed, not reloading");
                if let Some(e) = &self.failure {
                    return Err(e.clone().into());
                }
            }
            OverlayState::NotLoaded => {}
        }
        self.failure = None;

        if self.bundle_url.is_empty() {
            return Err(EngineError::NoBundle);
        }

        match self.loader.load(&self.bundle_url) {
            Ok(()) => {
                self.state = OverlayState::Loaded;
                Ok(())
            }
            Err(e) => {
                self.state = OverlayState::Failed {
                    message: e.to_string(),
                };
                self.failure = Some(e.clone());
                Err(e.into())
            }
        }
    }

    /// Manifest defaults merged with the stored overrides.
    pub fn effective_config(&self) -> OverlayConfig {
        let defaults = self
            .manifest()
            .map(|manifest| default_config(&manifest))
            .unwrap_or_default();
        merge_with_defaults(&self.overrides, &defaults)
    }

    /// Mount the loaded overlay, fed by `emitter`.
    pub fn mount(
        &mut self,
        surface: Arc<dyn Surface>,
        emitter: &Arc<EventEmitter>,
    ) -> Result<(), EngineError> {
        if self.mounted.is_some() {
            debug!("Overlay already mounted");
            return Ok(());
        }

        self.ensure_loaded()?;
        let config = self.effective_config();
        let loaded = self.loader.mount(surface, emitter, config)?;

        self.mounted = Some(loaded);
        self.state = OverlayState::Mounted;
        info!("Overlay mounted");
        Ok(())
    }

    /// Unmount the overlay if it is mounted.
    pub fn unmount(&mut self) {
        if let Some(mut loaded) = self.mounted.take() {
            loaded.handle.unmount();
            self.state = OverlayState::Loaded;
            info!("Overlay unmounted");
        }
    }

    /// Replace the stored overrides and push the result to a mounted overlay.
    pub fn update_overrides(&mut self, overrides: OverlayConfig) {
        self.overrides = overrides;
        let config = self.effective_config();
        if let Some(loaded) = self.mounted.as_mut() {
            debug!(keys = config.len(), "Updating overlay config");
            loaded.handle.update_config(config);
        }
    }

    /// Manifest exported by the module, else the one at `manifest_path`.
    fn manifest(&self) -> Option<OverlayManifest> {
        let exported = match self.mounted.as_ref() {
            Some(loaded) => loaded.manifest.as_ref(),
            None => self.loader.manifest(),
        };
        if let Some(value) = exported {
            match OverlayManifest::from_value(value.clone()) {
                Ok(manifest) => return Some(manifest),
                Err(e) => warn!("Ignoring invalid module manifest: {}", e),
            }
        }

        let path = self.manifest_path.as_ref()?;
        match OverlayManifest::from_path(path) {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                warn!(path = %path.display(), "Failed to read manifest: {}", e);
                None
            }
        }
    }
}

impl Drop for OverlaySession {
    fn drop(&mut self) {
        self.unmount();
    }
}
