use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use stratum_buffer::{BufferError, BufferingInterface, MemoryBuffer, Transfer};
use stratum_connector::{AccessConfig, Connector};
use stratum_domain::config::ConnectorSettings;
use stratum_domain::{AccessFlags, DatasetKey, ElementType, Extents, LayerInfo, ObjectId, PlistId};
use stratum_native::{MemoryNative, NativeBackend};

/// One call observed by [`RecordingBuffer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    UpdateLayers(Vec<LayerInfo>),
    Init { key: DatasetKey, element: ElementType, extents: Extents, dataset: ObjectId },
    Read { key: DatasetKey, transfer: Transfer },
    Write { key: DatasetKey, transfer: Transfer },
    Sync { key: DatasetKey, extents: Extents, dataset: ObjectId },
    Clean,
}

impl Call {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::UpdateLayers(_) => "update_layers",
            Self::Init { .. } => "init",
            Self::Read { .. } => "read",
            Self::Write { .. } => "write",
            Self::Sync { .. } => "sync",
            Self::Clean => "clean",
        }
    }
}

/// A [`MemoryBuffer`] that records every call made through the buffering interface.
#[derive(Debug, Clone, Default)]
pub struct RecordingBuffer {
    pub staging: MemoryBuffer,
    calls: Arc<Mutex<Vec<Call>>>,
    fail_sync: Arc<AtomicBool>,
}

impl RecordingBuffer {
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.calls.lock().iter().map(Call::name).collect()
    }

    #[must_use]
    pub fn count(&self, name: &str) -> usize {
        self.calls.lock().iter().filter(|call| call.name() == name).count()
    }

    /// Makes every following `sync` fail.
    pub fn fail_syncs(&self) {
        self.fail_sync.store(true, Ordering::SeqCst);
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

impl BufferingInterface for RecordingBuffer {
    fn update_layers(&self, layers: &[LayerInfo]) -> Result<(), BufferError> {
        self.record(Call::UpdateLayers(layers.to_vec()));
        self.staging.update_layers(layers)
    }

    fn init(
        &self,
        key: &DatasetKey,
        element: ElementType,
        extents: &Extents,
        dataset: ObjectId,
    ) -> Result<(), BufferError> {
        self.record(Call::Init { key: key.clone(), element, extents: extents.clone(), dataset });
        self.staging.init(key, element, extents, dataset)
    }

    fn read(
        &self,
        key: &DatasetKey,
        transfer: &Transfer,
        out: &mut [u8],
    ) -> Result<(), BufferError> {
        self.record(Call::Read { key: key.clone(), transfer: transfer.clone() });
        self.staging.read(key, transfer, out)
    }

    fn write(&self, key: &DatasetKey, transfer: &Transfer, data: &[u8]) -> Result<(), BufferError> {
        self.record(Call::Write { key: key.clone(), transfer: transfer.clone() });
        self.staging.write(key, transfer, data)
    }

    fn sync(
        &self,
        key: &DatasetKey,
        extents: &Extents,
        dataset: ObjectId,
    ) -> Result<(), BufferError> {
        self.record(Call::Sync { key: key.clone(), extents: extents.clone(), dataset });
        if self.fail_sync.load(Ordering::SeqCst) {
            return Err(BufferError::Internal {
                message: "flush target unavailable".into(),
                context: None,
            });
        }
        self.staging.sync(key, extents, dataset)
    }

    fn clean(&self) {
        self.record(Call::Clean);
        self.staging.clean();
    }
}

/// A registered connector over fresh reference backends.
#[derive(Debug)]
pub struct Harness {
    pub native: MemoryNative,
    pub buffer: RecordingBuffer,
    pub connector: Connector,
}

impl Harness {
    #[must_use]
    pub fn new() -> Self {
        Self::with_settings(ConnectorSettings::default())
    }

    #[must_use]
    pub fn with_settings(settings: ConnectorSettings) -> Self {
        let native = MemoryNative::new();
        let buffer = RecordingBuffer::default();
        let connector = Connector::builder()
            .native(native.clone())
            .buffering(buffer.clone())
            .layers([LayerInfo::memory("ram", 16 * 1024 * 1024)])
            .settings(settings)
            .register()
            .expect("registration failed");
        Self { native, buffer, connector }
    }

    /// An access configuration with `path` created (truncating) through it.
    #[must_use]
    pub fn create_file(&self, path: &str) -> AccessConfig {
        let fapl = self.native.create_fapl();
        let mut access = self.connector.set_fapl(fapl).expect("set_fapl failed");
        self.native.plist_close(fapl).expect("plist close");
        self.connector
            .file_create(&mut access, path, AccessFlags::TRUNCATE, PlistId::DEFAULT)
            .expect("file_create failed");
        access
    }

    /// A dataset creation list for `element` data of shape `current` (growable to `maximum`).
    /// The intermediate dataspace is closed.
    #[must_use]
    pub fn dcpl(&self, element: ElementType, current: &[u64], maximum: Option<&[u64]>) -> PlistId {
        let space = self.native.create_simple_space(current, maximum).expect("space");
        let dcpl = self.native.create_dcpl(element, space).expect("dcpl");
        self.native.space_close(space).expect("space close");
        dcpl
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

#[must_use]
pub fn encode(values: &[i32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_ne_bytes()).collect()
}

#[must_use]
pub fn decode(bytes: &[u8]) -> Vec<i32> {
    bytes.chunks_exact(4).map(|c| i32::from_ne_bytes(c.try_into().unwrap())).collect()
}
