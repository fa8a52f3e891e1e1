use crate::error::NativeError;
use serde::{Deserialize, Serialize};
use stratum_domain::{
    AccessFlags, ConnectorId, ElementType, Extents, Hyperslab, ObjectId, PlistId, SpaceId,
};

/// Name under which the storage library's own driver is registered.
pub const NATIVE_DRIVER_NAME: &str = "native";

/// Allocation state of a dataset's raw storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SpaceStatus {
    NotAllocated,
    PartAllocated,
    Allocated,
}

/// Primitive operations of the wrapped storage library.
///
/// Every handle returned by a method ending up in a new id (`dataset_space`, `dcpl_space`,
/// `plist_copy`, `dataset_create_plist`, ...) is owned by the caller and must be closed with the
/// matching `*_close` call.
///
/// Extents are read in two steps: [`NativeBackend::space_rank`] first, then
/// [`NativeBackend::space_extents`] with that rank. A rank that no longer matches the dataspace
/// is rejected instead of silently truncated.
pub trait NativeBackend: Send + Sync {
    // --- files ---

    fn file_create(
        &self,
        path: &str,
        flags: AccessFlags,
        fcpl: PlistId,
        fapl: PlistId,
    ) -> Result<ObjectId, NativeError>;

    fn file_open(&self, path: &str, flags: AccessFlags, fapl: PlistId)
    -> Result<ObjectId, NativeError>;

    fn file_close(&self, file: ObjectId) -> Result<(), NativeError>;

    // --- datasets ---

    fn dataset_create(
        &self,
        location: ObjectId,
        name: &str,
        element: ElementType,
        space: SpaceId,
        dcpl: PlistId,
        dapl: PlistId,
    ) -> Result<ObjectId, NativeError>;

    fn dataset_open(&self, location: ObjectId, name: &str, dapl: PlistId)
    -> Result<ObjectId, NativeError>;

    fn dataset_close(&self, dataset: ObjectId) -> Result<(), NativeError>;

    /// A new dataspace with the dataset's current shape and everything selected.
    fn dataset_space(&self, dataset: ObjectId) -> Result<SpaceId, NativeError>;

    fn dataset_type(&self, dataset: ObjectId) -> Result<ElementType, NativeError>;

    fn dataset_space_status(&self, dataset: ObjectId) -> Result<SpaceStatus, NativeError>;

    fn dataset_create_plist(&self, dataset: ObjectId) -> Result<PlistId, NativeError>;

    fn dataset_access_plist(&self, dataset: ObjectId) -> Result<PlistId, NativeError>;

    /// Bytes of raw storage allocated for the dataset.
    fn dataset_storage_size(&self, dataset: ObjectId) -> Result<u64, NativeError>;

    /// Address of the dataset's raw data in the file, `None` when it has none yet.
    fn dataset_offset(&self, dataset: ObjectId) -> Result<Option<u64>, NativeError>;

    // --- dataspaces ---

    fn space_rank(&self, space: SpaceId) -> Result<usize, NativeError>;

    fn space_extents(&self, space: SpaceId, rank: usize) -> Result<Extents, NativeError>;

    /// Bounding box of the current selection, `None` when nothing is selected.
    fn space_selection_bounds(&self, space: SpaceId) -> Result<Option<Hyperslab>, NativeError>;

    fn space_selected_points(&self, space: SpaceId) -> Result<u64, NativeError>;

    fn space_close(&self, space: SpaceId) -> Result<(), NativeError>;

    // --- property lists ---

    /// Element type stored in a dataset creation property list.
    fn dcpl_type(&self, dcpl: PlistId) -> Result<ElementType, NativeError>;

    /// A new dataspace copied from a dataset creation property list.
    fn dcpl_space(&self, dcpl: PlistId) -> Result<SpaceId, NativeError>;

    fn plist_copy(&self, plist: PlistId) -> Result<PlistId, NativeError>;

    fn plist_close(&self, plist: PlistId) -> Result<(), NativeError>;

    // --- connector registry ---

    fn driver_id(&self, name: &str) -> Result<ConnectorId, NativeError>;

    fn register_connector(&self, name: &str) -> Result<ConnectorId, NativeError>;

    fn unregister_connector(&self, connector: ConnectorId) -> Result<(), NativeError>;
}
