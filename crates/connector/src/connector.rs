use crate::error::{VolError, VolErrorExt};
use crate::record::{AccessConfig, HandleRecord};
use parking_lot::Mutex;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use stratum_buffer::BufferingInterface;
use stratum_domain::config::{ConnectorSettings, StratumConfig};
use stratum_domain::{ConnectorId, LayerInfo, PlistId};
use stratum_native::{NATIVE_DRIVER_NAME, NativeBackend};
use tracing::{debug, info, instrument, warn};

/// Name the connector registers under with the native backend.
pub const CONNECTOR_NAME: &str = "stratum";

/// Lifecycle of a registered connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum LifecycleState {
    Active,
    Terminated,
}

/// The internal shared state of a [`Connector`].
pub struct ConnectorInner {
    id: ConnectorId,
    driver: ConnectorId,
    name: String,
    native: Arc<dyn NativeBackend>,
    buffering: Arc<dyn BufferingInterface>,
    layers: Vec<LayerInfo>,
    settings: ConnectorSettings,
    state: Mutex<LifecycleState>,
    live_access: AtomicUsize,
    open_datasets: AtomicUsize,
    /// Set when the last access configuration went away while datasets were still open.
    teardown_pending: AtomicBool,
}

impl ConnectorInner {
    /// Unregisters from the native backend and cleans the buffering subsystem, once.
    fn teardown(&self, reason: &'static str) -> Result<(), VolError> {
        {
            let mut state = self.state.lock();
            if *state == LifecycleState::Terminated {
                return Ok(());
            }
            *state = LifecycleState::Terminated;
        }

        let unregistered = self.native.unregister_connector(self.id);
        self.buffering.clean();
        info!(connector = %self.id, reason, "Connector terminated");

        unregistered.context("Unregistering connector")
    }
}

impl Drop for ConnectorInner {
    fn drop(&mut self) {
        if *self.state.get_mut() == LifecycleState::Terminated {
            return;
        }
        if let Err(error) = self.teardown("dropped") {
            warn!(connector = %self.id, %error, "Teardown on drop failed");
        }
    }
}

impl fmt::Debug for ConnectorInner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorInner")
            .field("id", &self.id)
            .field("driver", &self.driver)
            .field("name", &self.name)
            .field("layers", &self.layers)
            .field("settings", &self.settings)
            .field("state", &*self.state.lock())
            .field("live_access", &self.live_access.load(Ordering::Relaxed))
            .field("open_datasets", &self.open_datasets.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// A connector registered with the native backend.
///
/// Cheap to clone; every clone drives the same registration. The layer is torn down once the last
/// access configuration is released and no dataset is left open, on [`Connector::shutdown`], or
/// when the last clone is dropped, whichever comes first.
#[derive(Debug, Clone)]
pub struct Connector {
    inner: Arc<ConnectorInner>,
}

impl Deref for Connector {
    type Target = ConnectorInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl Connector {
    /// Creates a new [`ConnectorBuilder`].
    pub fn builder() -> ConnectorBuilder {
        ConnectorBuilder::new()
    }

    /// Backend-selector token returned by the native registration.
    #[must_use]
    pub fn id(&self) -> ConnectorId {
        self.id
    }

    /// Id of the native driver the connector forwards to.
    #[must_use]
    pub fn driver(&self) -> ConnectorId {
        self.driver
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn layers(&self) -> &[LayerInfo] {
        &self.layers
    }

    #[must_use]
    pub fn settings(&self) -> &ConnectorSettings {
        &self.settings
    }

    #[must_use]
    pub fn state(&self) -> LifecycleState {
        *self.state.lock()
    }

    /// Access configurations attached and not yet released.
    #[must_use]
    pub fn live_access(&self) -> usize {
        self.live_access.load(Ordering::Acquire)
    }

    /// Datasets created or opened and not yet closed.
    #[must_use]
    pub fn open_datasets(&self) -> usize {
        self.open_datasets.load(Ordering::Acquire)
    }

    pub(crate) fn native(&self) -> &dyn NativeBackend {
        self.native.as_ref()
    }

    pub(crate) fn buffering(&self) -> &dyn BufferingInterface {
        self.buffering.as_ref()
    }

    pub(crate) fn ensure_active(&self) -> Result<(), VolError> {
        match self.state() {
            LifecycleState::Active => Ok(()),
            LifecycleState::Terminated => Err(VolError::Terminated { context: None }),
        }
    }

    pub(crate) fn dataset_opened(&self) {
        self.open_datasets.fetch_add(1, Ordering::AcqRel);
    }

    /// Finishes a teardown deferred by [`Connector::release_access`] once the last dataset is
    /// closed.
    pub(crate) fn dataset_closed(&self) -> Result<(), VolError> {
        let previous = self.open_datasets.fetch_sub(1, Ordering::AcqRel);
        if previous <= 1 && self.teardown_pending.swap(false, Ordering::AcqRel) {
            return self.inner.teardown("last dataset closed after the last access release");
        }
        Ok(())
    }

    /// Attaches the connector to an application file access configuration.
    ///
    /// The returned configuration owns a private native copy of `fapl`.
    #[instrument(level = "debug", skip(self), fields(connector = %self.id))]
    pub fn set_fapl(&self, fapl: PlistId) -> Result<AccessConfig, VolError> {
        self.ensure_active()?;
        let record = HandleRecord::attach(
            self.native(),
            self.id,
            self.driver,
            fapl,
            self.settings.sync_on_close,
        )
        .context("Copying file access list")?;

        self.live_access.fetch_add(1, Ordering::AcqRel);
        self.teardown_pending.store(false, Ordering::Release);
        debug!(access = %record.access_plist(), "Access configuration attached");
        Ok(AccessConfig { record })
    }

    /// Handle copy: a deep duplicate of `access`, not bound to its file.
    #[instrument(level = "debug", skip_all, fields(connector = %self.id))]
    pub fn copy_access(&self, access: &AccessConfig) -> Result<AccessConfig, VolError> {
        self.ensure_active()?;
        let record = access.record.duplicate(self.native()).context("Copying access record")?;
        self.live_access.fetch_add(1, Ordering::AcqRel);
        self.teardown_pending.store(false, Ordering::Release);
        Ok(AccessConfig { record })
    }

    /// Handle release. Releasing the last live configuration tears the layer down, or defers the
    /// teardown to the close of the last open dataset so that it still syncs.
    ///
    /// A file still bound to the configuration is closed natively. The native handles are
    /// released even after the connector terminated.
    #[instrument(level = "debug", skip_all, fields(connector = %self.id))]
    pub fn release_access(&self, access: AccessConfig) -> Result<(), VolError> {
        let closed = match access.file() {
            Some(file) => {
                warn!(%file, "Releasing an access configuration with an open file");
                self.native().file_close(file).context("Closing file on access release")
            }
            None => Ok(()),
        };
        let released = access.record.release(self.native()).context("Releasing access record");
        if self.state() == LifecycleState::Terminated {
            return closed.and(released);
        }

        let previous = self.live_access.fetch_sub(1, Ordering::AcqRel);
        if previous <= 1 {
            self.live_access.store(0, Ordering::Release);
            // Raised before the check so a concurrent last close cannot miss it.
            self.teardown_pending.store(true, Ordering::Release);
            if self.open_datasets() == 0 && self.teardown_pending.swap(false, Ordering::AcqRel) {
                self.inner.teardown("last access configuration released")?;
            } else {
                debug!(open = self.open_datasets(), "Teardown deferred until datasets close");
            }
        }
        closed.and(released)
    }

    /// Tears the layer down; later calls are no-ops.
    pub fn shutdown(&self) -> Result<(), VolError> {
        self.inner.teardown("shutdown")
    }
}

/// A fluent builder registering a [`Connector`] with a native backend.
#[must_use = "builders do nothing unless you call .register()"]
#[derive(Default)]
pub struct ConnectorBuilder {
    native: Option<Arc<dyn NativeBackend>>,
    buffering: Option<Arc<dyn BufferingInterface>>,
    layers: Vec<LayerInfo>,
    settings: ConnectorSettings,
    name: Option<String>,
}

impl fmt::Debug for ConnectorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorBuilder")
            .field("native", &self.native.is_some())
            .field("buffering", &self.buffering.is_some())
            .field("layers", &self.layers)
            .field("settings", &self.settings)
            .field("name", &self.name)
            .finish()
    }
}

impl ConnectorBuilder {
    /// Creates a new [`ConnectorBuilder`].
    pub fn new() -> Self {
        Self::default()
    }

    /// The storage library backend the connector forwards to.
    pub fn native(mut self, native: impl NativeBackend + 'static) -> Self {
        self.native = Some(Arc::new(native));
        self
    }

    /// The buffering subsystem data is redirected through.
    pub fn buffering(mut self, buffering: impl BufferingInterface + 'static) -> Self {
        self.buffering = Some(Arc::new(buffering));
        self
    }

    /// Buffering tiers pushed to the buffering subsystem on registration.
    pub fn layers(mut self, layers: impl IntoIterator<Item = LayerInfo>) -> Self {
        self.layers = layers.into_iter().collect();
        self
    }

    pub fn settings(mut self, settings: ConnectorSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Takes layers and connector settings from a loaded configuration.
    pub fn config(self, config: &StratumConfig) -> Self {
        self.layers(config.layers.iter().cloned()).settings(config.connector.clone())
    }

    /// Overrides the registration name (default [`CONNECTOR_NAME`]).
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Validates the layers, activates them in the buffering subsystem and registers the
    /// connector with the native backend.
    ///
    /// # Errors
    /// * [`VolError::Configuration`] when a collaborator is missing or no layer is defined. Nothing
    ///   has been registered or activated in that case.
    /// * [`VolError::Buffer`] when the buffering subsystem rejects the layers.
    /// * [`VolError::Native`] when the driver lookup or the registration fails.
    #[instrument(level = "debug", skip(self), fields(layers = self.layers.len()))]
    pub fn register(self) -> Result<Connector, VolError> {
        let native = self.native.ok_or(VolError::Configuration {
            message: "a native backend is required".into(),
            context: None,
        })?;
        let buffering = self.buffering.ok_or(VolError::Configuration {
            message: "a buffering subsystem is required".into(),
            context: None,
        })?;
        if self.layers.is_empty() {
            return Err(VolError::Configuration {
                message: "at least one buffering layer must be defined".into(),
                context: Some("Registering connector".into()),
            });
        }

        buffering.update_layers(&self.layers).context("Activating buffering layers")?;

        let name = self.name.unwrap_or_else(|| CONNECTOR_NAME.to_owned());
        let driver = native.driver_id(NATIVE_DRIVER_NAME).context("Looking up native driver")?;
        let id = native.register_connector(&name).context("Registering connector")?;

        info!(
            connector = %id,
            %driver,
            name = %name,
            layers = self.layers.len(),
            open_flags = ?self.settings.open_flags,
            sync_on_close = self.settings.sync_on_close,
            "Connector registered"
        );

        Ok(Connector {
            inner: Arc::new(ConnectorInner {
                id,
                driver,
                name,
                native,
                buffering,
                layers: self.layers,
                settings: self.settings,
                state: Mutex::new(LifecycleState::Active),
                live_access: AtomicUsize::new(0),
                open_datasets: AtomicUsize::new(0),
                teardown_pending: AtomicBool::new(false),
            }),
        })
    }
}
