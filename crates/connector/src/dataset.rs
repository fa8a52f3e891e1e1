//! Dataset lifecycle and data movement.
//!
//! Every dataset opened through the connector is announced to the buffering subsystem before the
//! handle is returned, and every transfer is redirected to it. The native backend only sees
//! metadata traffic.

use crate::connector::Connector;
use crate::error::{VolError, VolErrorExt};
use crate::record::{AccessConfig, HandleRecord};
use crate::selection::{Selection, SelectionShape, SpaceGuard, resolve};
use serde::Serialize;
use stratum_buffer::Transfer;
use stratum_domain::config::SyncFailurePolicy;
use stratum_domain::{DatasetKey, ElementType, Extents, ObjectId, PlistId, SpaceId};
use stratum_native::SpaceStatus;
use tracing::{debug, instrument, trace, warn};

/// An open dataset.
///
/// Must be handed back to [`Connector::dataset_close`]; dropping it leaks the native dataset.
#[derive(Debug)]
#[must_use = "datasets must be closed with Connector::dataset_close"]
pub struct Dataset {
    record: HandleRecord,
    object: ObjectId,
    key: DatasetKey,
}

impl Dataset {
    #[must_use]
    pub const fn record(&self) -> &HandleRecord {
        &self.record
    }

    #[must_use]
    pub const fn object(&self) -> ObjectId {
        self.object
    }

    /// Key the buffering subsystem knows this dataset by.
    #[must_use]
    pub const fn key(&self) -> &DatasetKey {
        &self.key
    }

    pub const fn set_sync_on_close(&mut self, sync: bool) {
        self.record.set_sync_on_close(sync);
    }
}

/// Dataset properties answered by the native backend.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    strum_macros::Display,
    strum_macros::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum DatasetQuery {
    Space,
    SpaceStatus,
    Type,
    CreatePlist,
    AccessPlist,
    StorageSize,
    Offset,
}

/// Answer to a [`DatasetQuery`]. Returned dataspace and property-list ids are owned by the
/// caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DatasetInfo {
    Space(SpaceId),
    SpaceStatus(SpaceStatus),
    Type(ElementType),
    CreatePlist(PlistId),
    AccessPlist(PlistId),
    StorageSize(u64),
    Offset(Option<u64>),
}

impl Connector {
    /// Creates a dataset in the file open through `parent`.
    ///
    /// Element type and shape come from `dcpl`. The dataset is initialized in the buffering
    /// subsystem before it is returned.
    #[instrument(level = "debug", skip(self, parent), fields(connector = %self.id()))]
    pub fn dataset_create(
        &self,
        parent: &AccessConfig,
        name: &str,
        dcpl: PlistId,
        dapl: PlistId,
    ) -> Result<Dataset, VolError> {
        self.ensure_active()?;
        let (record, location, key) = self.derive_record(parent, name)?;

        match self.create_native(location, name, dcpl, dapl) {
            Ok((object, element)) => self.bind_dataset(record, object, element, key),
            Err(error) => {
                self.discard(record);
                Err(error)
            }
        }
    }

    /// Opens an existing dataset in the file open through `parent`.
    #[instrument(level = "debug", skip(self, parent), fields(connector = %self.id()))]
    pub fn dataset_open(
        &self,
        parent: &AccessConfig,
        name: &str,
        dapl: PlistId,
    ) -> Result<Dataset, VolError> {
        self.ensure_active()?;
        let (record, location, key) = self.derive_record(parent, name)?;

        match self.open_native(location, name, dapl) {
            Ok((object, element)) => self.bind_dataset(record, object, element, key),
            Err(error) => {
                self.discard(record);
                Err(error)
            }
        }
    }

    /// Fills `out`, laid out as the memory selection, from the buffering subsystem.
    #[instrument(level = "debug", skip(self, dataset, out), fields(key = %dataset.key))]
    pub fn dataset_read(
        &self,
        dataset: &Dataset,
        mem_type: ElementType,
        memory: Selection,
        file: Selection,
        dxpl: PlistId,
        out: &mut [u8],
    ) -> Result<(), VolError> {
        self.ensure_active()?;
        let Some(transfer) = self.plan_transfer(dataset, mem_type, memory, file)? else {
            return Ok(());
        };
        self.buffering().read(&dataset.key, &transfer, out).context("Reading buffered dataset")?;
        trace!(elements = transfer.file.element_count(), "Read complete");
        Ok(())
    }

    /// Stores `data`, laid out as the memory selection, in the buffering subsystem.
    #[instrument(level = "debug", skip(self, dataset, data), fields(key = %dataset.key))]
    pub fn dataset_write(
        &self,
        dataset: &Dataset,
        mem_type: ElementType,
        memory: Selection,
        file: Selection,
        dxpl: PlistId,
        data: &[u8],
    ) -> Result<(), VolError> {
        self.ensure_active()?;
        let Some(transfer) = self.plan_transfer(dataset, mem_type, memory, file)? else {
            return Ok(());
        };
        self.buffering().write(&dataset.key, &transfer, data).context("Writing buffered dataset")?;
        trace!(elements = transfer.file.element_count(), "Write complete");
        Ok(())
    }

    #[instrument(level = "debug", skip(self, dataset), fields(key = %dataset.key))]
    pub fn dataset_get(
        &self,
        dataset: &Dataset,
        query: DatasetQuery,
    ) -> Result<DatasetInfo, VolError> {
        self.ensure_active()?;
        let native = self.native();
        let object = dataset.object;

        let info = match query {
            DatasetQuery::Space => native.dataset_space(object).map(DatasetInfo::Space),
            DatasetQuery::SpaceStatus => {
                native.dataset_space_status(object).map(DatasetInfo::SpaceStatus)
            }
            DatasetQuery::Type => native.dataset_type(object).map(DatasetInfo::Type),
            DatasetQuery::CreatePlist => {
                native.dataset_create_plist(object).map(DatasetInfo::CreatePlist)
            }
            DatasetQuery::AccessPlist => {
                native.dataset_access_plist(object).map(DatasetInfo::AccessPlist)
            }
            DatasetQuery::StorageSize => {
                native.dataset_storage_size(object).map(DatasetInfo::StorageSize)
            }
            DatasetQuery::Offset => native.dataset_offset(object).map(DatasetInfo::Offset),
        };
        info.context(format!("Querying dataset {query}"))
    }

    /// Syncs the dataset (when its sync flag is set), closes it natively and releases its record.
    ///
    /// The sync sees the extent current at close time. How a failed sync is reported follows
    /// [`SyncFailurePolicy`]; the native close happens either way. On a terminated connector
    /// nothing is synced, the native handles are still released and `Terminated` is returned.
    #[instrument(level = "debug", skip(self, dataset), fields(key = %dataset.key))]
    pub fn dataset_close(&self, dataset: Dataset) -> Result<(), VolError> {
        let active = self.ensure_active();
        let Dataset { record, object, key } = dataset;

        let synced = if active.is_ok() && record.sync_on_close() {
            self.sync_dataset(&key, object)
        } else {
            Ok(())
        };
        let closed = self.native().dataset_close(object).context("Closing dataset");
        let released = record.release(self.native()).context("Releasing dataset record");
        let teardown = self.dataset_closed();
        if let Err(error) = active {
            warn!(%key, "Dataset closed after teardown, staged data was not synced");
            return Err(error);
        }
        closed?;
        released?;

        if let Err(error) = synced {
            match self.settings().sync_failure {
                SyncFailurePolicy::Warn => {
                    warn!(%key, %error, "Sync on close failed, dataset closed anyway");
                }
                SyncFailurePolicy::Surface => {
                    return Err(VolError::SyncFailed {
                        message: error.to_string().into(),
                        context: Some(key.to_string().into()),
                    });
                }
            }
        }

        debug!(%key, %object, "Dataset closed");
        teardown
    }

    /// Current extents of an open dataset, read as rank first, then dimensions for that rank.
    pub(crate) fn current_extents(&self, object: ObjectId) -> Result<Extents, VolError> {
        let native = self.native();
        let space = native.dataset_space(object).context("Reading dataset dataspace")?;
        let space = SpaceGuard::new(native, space);
        let rank = native.space_rank(space.id()).context("Reading dataspace rank")?;
        native.space_extents(space.id(), rank).context("Reading dataspace extents")
    }

    fn sync_dataset(&self, key: &DatasetKey, object: ObjectId) -> Result<(), VolError> {
        let extents = self.current_extents(object)?;
        self.buffering().sync(key, &extents, object).context("Syncing buffered dataset")?;
        debug!(%key, extent = ?extents.current(), "Dataset synced");
        Ok(())
    }

    /// A record for a new dataset under `parent`, plus the file it lives in and its key.
    fn derive_record(
        &self,
        parent: &AccessConfig,
        name: &str,
    ) -> Result<(HandleRecord, ObjectId, DatasetKey), VolError> {
        if name.is_empty() {
            return Err(VolError::InvalidArgument {
                message: "dataset name is empty".into(),
                context: None,
            });
        }
        let (Some(location), Some(path)) = (parent.file(), parent.file_path()) else {
            return Err(VolError::InvalidHandle {
                message: "no file is open through the parent access configuration".into(),
                context: Some(format!("dataset {name}").into()),
            });
        };

        let mut record =
            parent.record().duplicate(self.native()).context("Duplicating parent record")?;
        record.set_dataset_name(name);
        Ok((record, location, DatasetKey::from_path(path, name)))
    }

    fn create_native(
        &self,
        location: ObjectId,
        name: &str,
        dcpl: PlistId,
        dapl: PlistId,
    ) -> Result<(ObjectId, ElementType), VolError> {
        let native = self.native();
        let element = native.dcpl_type(dcpl).context("Reading element type from creation list")?;
        let space = native.dcpl_space(dcpl).context("Reading dataspace from creation list")?;
        let space = SpaceGuard::new(native, space);

        let object = native
            .dataset_create(location, name, element, space.id(), dcpl, dapl)
            .context("Creating dataset")?;
        Ok((object, element))
    }

    fn open_native(
        &self,
        location: ObjectId,
        name: &str,
        dapl: PlistId,
    ) -> Result<(ObjectId, ElementType), VolError> {
        let native = self.native();
        let object = native.dataset_open(location, name, dapl).context("Opening dataset")?;
        match native.dataset_type(object).context("Reading dataset type") {
            Ok(element) => Ok((object, element)),
            Err(error) => {
                self.close_quietly(object);
                Err(error)
            }
        }
    }

    /// Reads the extents of a freshly created or opened dataset and initializes it in the
    /// buffering subsystem. On failure the native dataset is closed and the record released.
    fn bind_dataset(
        &self,
        mut record: HandleRecord,
        object: ObjectId,
        element: ElementType,
        key: DatasetKey,
    ) -> Result<Dataset, VolError> {
        record.bind(object);
        let initialized = self.current_extents(object).and_then(|extents| {
            self.buffering()
                .init(&key, element, &extents, object)
                .context("Initializing buffered dataset")?;
            Ok(extents)
        });

        match initialized {
            Ok(extents) => {
                debug!(%key, %object, %element, extent = ?extents.current(), "Dataset bound");
                self.dataset_opened();
                Ok(Dataset { record, object, key })
            }
            Err(error) => {
                self.close_quietly(object);
                self.discard(record);
                Err(error)
            }
        }
    }

    /// Resolves a transfer. `None` when the file region is empty and nothing moves.
    fn plan_transfer(
        &self,
        dataset: &Dataset,
        mem_type: ElementType,
        memory: Selection,
        file: Selection,
    ) -> Result<Option<Transfer>, VolError> {
        let native = self.native();
        let object = dataset.object;

        let element = native.dataset_type(object).context("Reading dataset type")?;
        if mem_type != element {
            return Err(VolError::InvalidArgument {
                message: format!("memory type {mem_type} does not match dataset type {element}")
                    .into(),
                context: Some(dataset.key.to_string().into()),
            });
        }

        let memory_shape = match memory {
            Selection::All => None,
            Selection::Explicit(space) => {
                Some(SelectionShape::query(native, space).context("Reading memory selection")?)
            }
        };
        let (file_shape, dataset_extent) = match file {
            Selection::All => (None, self.current_extents(object)?.current().to_vec()),
            Selection::Explicit(space) => {
                let shape = SelectionShape::query(native, space).context("Reading file selection")?;
                let extent = shape.extent.clone();
                (Some(shape), extent)
            }
        };

        let resolved = resolve(memory_shape.as_ref(), file_shape.as_ref(), &dataset_extent)?;
        if resolved.file.is_empty() {
            trace!(key = %dataset.key, "Empty file region, nothing to move");
            return Ok(None);
        }

        Ok(Some(Transfer {
            rank: resolved.file_rank(),
            element,
            file: resolved.file,
            memory: resolved.memory,
            dataset: object,
        }))
    }

    fn close_quietly(&self, object: ObjectId) {
        if let Err(error) = self.native().dataset_close(object) {
            warn!(%object, %error, "Failed to close dataset after a failed bind");
        }
    }

    fn discard(&self, record: HandleRecord) {
        if let Err(error) = record.release(self.native()) {
            warn!(%error, "Failed to release dataset record");
        }
    }
}
