//! An in-memory stand-in for the storage library.
//!
//! Files live in a process-local table keyed by path and outlive their handles, so a file can
//! be created, closed and opened again. Datasets carry their element type and extents only;
//! raw bytes are the buffering subsystem's business.

use crate::backend::{NATIVE_DRIVER_NAME, NativeBackend, SpaceStatus};
use crate::error::NativeError;
use crate::plist::{PlistClass, PropertyList};
use crate::space::{Dataspace, SpaceSelection};
use fxhash::FxHashMap;
use parking_lot::RwLock;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use stratum_domain::{
    AccessFlags, ConnectorId, ElementType, Extents, Hyperslab, ObjectId, PlistId, SpaceId,
};
use tracing::{debug, trace};

/// First address handed to dataset storage; the range below stands in for file metadata.
const FIRST_DATA_ADDRESS: u64 = 2048;

#[derive(Debug)]
enum Handle {
    File { path: String },
    Dataset { path: String, name: String },
    Space(Dataspace),
    Plist(PropertyList),
}

#[derive(Debug)]
struct DatasetImage {
    element: ElementType,
    extents: Extents,
    dcpl: PropertyList,
    dapl: PropertyList,
    address: u64,
}

impl DatasetImage {
    fn storage_bytes(&self) -> u64 {
        self.extents.element_count().saturating_mul(self.element.size() as u64)
    }
}

#[derive(Debug)]
struct FileImage {
    datasets: FxHashMap<String, DatasetImage>,
    next_address: u64,
}

impl Default for FileImage {
    fn default() -> Self {
        Self { datasets: FxHashMap::default(), next_address: FIRST_DATA_ADDRESS }
    }
}

#[derive(Debug, Default)]
struct Tables {
    handles: FxHashMap<i64, Handle>,
    files: FxHashMap<String, FileImage>,
    connectors: FxHashMap<i64, String>,
}

impl Tables {
    fn file_path(&self, file: ObjectId) -> Result<&str, NativeError> {
        match self.handles.get(&file.raw()) {
            Some(Handle::File { path }) => Ok(path),
            _ => Err(invalid_handle("file", file)),
        }
    }

    fn dataset(&self, dataset: ObjectId) -> Result<&DatasetImage, NativeError> {
        let Some(Handle::Dataset { path, name }) = self.handles.get(&dataset.raw()) else {
            return Err(invalid_handle("dataset", dataset));
        };
        self.files.get(path).and_then(|file| file.datasets.get(name)).ok_or_else(|| {
            NativeError::NotFound {
                message: format!("dataset {name} in {path}").into(),
                context: Some("File was truncated while the dataset was open".into()),
            }
        })
    }

    fn dataset_mut(&mut self, dataset: ObjectId) -> Result<&mut DatasetImage, NativeError> {
        let Some(Handle::Dataset { path, name }) = self.handles.get(&dataset.raw()) else {
            return Err(invalid_handle("dataset", dataset));
        };
        let (path, name) = (path.clone(), name.clone());
        self.files.get_mut(&path).and_then(|file| file.datasets.get_mut(&name)).ok_or_else(|| {
            NativeError::NotFound { message: format!("dataset {name} in {path}").into(), context: None }
        })
    }

    fn space(&self, space: SpaceId) -> Result<&Dataspace, NativeError> {
        match self.handles.get(&space.raw()) {
            Some(Handle::Space(dataspace)) => Ok(dataspace),
            _ => Err(invalid_handle("dataspace", space)),
        }
    }

    fn space_mut(&mut self, space: SpaceId) -> Result<&mut Dataspace, NativeError> {
        match self.handles.get_mut(&space.raw()) {
            Some(Handle::Space(dataspace)) => Ok(dataspace),
            _ => Err(invalid_handle("dataspace", space)),
        }
    }

    fn plist(&self, plist: PlistId) -> Result<&PropertyList, NativeError> {
        match self.handles.get(&plist.raw()) {
            Some(Handle::Plist(list)) => Ok(list),
            _ => Err(invalid_handle("property list", plist)),
        }
    }

    /// Accepts the default list or a list of the expected class.
    fn expect_class(&self, plist: PlistId, class: PlistClass) -> Result<(), NativeError> {
        if plist.is_default() {
            return Ok(());
        }
        let list = self.plist(plist)?;
        if list.class == class {
            Ok(())
        } else {
            Err(NativeError::InvalidArgument {
                message: format!("{plist} is a {} list, expected {class}", list.class).into(),
                context: None,
            })
        }
    }

    /// Resolves a property list to a stored value; the default list becomes an empty one.
    fn plist_or_default(&self, plist: PlistId, class: PlistClass) -> Result<PropertyList, NativeError> {
        self.expect_class(plist, class)?;
        if plist.is_default() { Ok(PropertyList::of(class)) } else { self.plist(plist).cloned() }
    }
}

/// The internal shared state of a [`MemoryNative`] instance.
#[derive(Debug)]
pub struct MemoryNativeInner {
    tables: RwLock<Tables>,
    next_id: AtomicI64,
    driver: ConnectorId,
}

/// Thread-safe, cheaply cloneable in-memory native backend.
///
/// Besides the [`NativeBackend`] contract it exposes the handful of storage-library calls an
/// application makes directly: dataspace and property-list creation, hyperslab selection and
/// dataset resizing.
#[derive(Debug, Clone)]
pub struct MemoryNative {
    inner: Arc<MemoryNativeInner>,
}

impl Deref for MemoryNative {
    type Target = MemoryNativeInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl Default for MemoryNative {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryNative {
    #[must_use]
    pub fn new() -> Self {
        let mut tables = Tables::default();
        // Id 0 is reserved for `PlistId::DEFAULT`.
        let driver = ConnectorId::new(1);
        tables.connectors.insert(driver.raw(), NATIVE_DRIVER_NAME.to_owned());

        Self {
            inner: Arc::new(MemoryNativeInner {
                tables: RwLock::new(tables),
                next_id: AtomicI64::new(2),
                driver,
            }),
        }
    }

    fn insert(&self, tables: &mut Tables, handle: Handle) -> i64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        tables.handles.insert(id, handle);
        id
    }

    /// Creates a simple dataspace; `maximum` defaults to `current`.
    pub fn create_simple_space(
        &self,
        current: &[u64],
        maximum: Option<&[u64]>,
    ) -> Result<SpaceId, NativeError> {
        let extents = match maximum {
            Some(max) => Extents::new(current.to_vec(), max.to_vec()).ok_or_else(|| {
                NativeError::InvalidArgument {
                    message: format!("current {current:?} does not fit maximum {max:?}").into(),
                    context: None,
                }
            })?,
            None => Extents::fixed(current.to_vec()),
        };
        let mut tables = self.tables.write();
        Ok(SpaceId::new(self.insert(&mut tables, Handle::Space(Dataspace::new(extents)))))
    }

    /// Replaces the selection with a single block of `count` elements at `start`.
    pub fn select_hyperslab(
        &self,
        space: SpaceId,
        start: &[u64],
        count: &[u64],
    ) -> Result<(), NativeError> {
        let mut tables = self.tables.write();
        let dataspace = tables.space_mut(space)?;
        if !dataspace.block_fits(start, count) {
            return Err(NativeError::InvalidArgument {
                message: format!(
                    "block start {start:?} count {count:?} outside extent {:?}",
                    dataspace.extents.current()
                )
                .into(),
                context: None,
            });
        }
        dataspace.selection = SpaceSelection::Block { start: start.to_vec(), count: count.to_vec() };
        Ok(())
    }

    pub fn select_none(&self, space: SpaceId) -> Result<(), NativeError> {
        self.tables.write().space_mut(space)?.selection = SpaceSelection::None;
        Ok(())
    }

    pub fn select_all(&self, space: SpaceId) -> Result<(), NativeError> {
        self.tables.write().space_mut(space)?.selection = SpaceSelection::All;
        Ok(())
    }

    /// Creates an empty property list of `class`.
    #[must_use]
    pub fn create_plist(&self, class: PlistClass) -> PlistId {
        let mut tables = self.tables.write();
        PlistId::new(self.insert(&mut tables, Handle::Plist(PropertyList::of(class))))
    }

    #[must_use]
    pub fn create_fapl(&self) -> PlistId {
        self.create_plist(PlistClass::FileAccess)
    }

    /// Creates a dataset creation list carrying `element` and a copy of `space`.
    pub fn create_dcpl(&self, element: ElementType, space: SpaceId) -> Result<PlistId, NativeError> {
        let mut tables = self.tables.write();
        let dataspace = tables.space(space)?.clone();
        let list = PropertyList::dataset_create(element, dataspace);
        Ok(PlistId::new(self.insert(&mut tables, Handle::Plist(list))))
    }

    /// Changes the current extent of an open dataset within its maximum.
    pub fn set_extent(&self, dataset: ObjectId, dims: &[u64]) -> Result<(), NativeError> {
        let mut tables = self.tables.write();
        let image = tables.dataset_mut(dataset)?;
        image.extents = image.extents.resized(dims).ok_or_else(|| NativeError::ExtentExceeded {
            message: format!("{dims:?} exceeds maximum {:?}", image.extents.maximum()).into(),
            context: Some(format!("resizing {dataset}").into()),
        })?;
        debug!(%dataset, extent = ?dims, "Dataset resized");
        Ok(())
    }

    /// Class of a live property list.
    #[must_use]
    pub fn plist_class(&self, plist: PlistId) -> Option<PlistClass> {
        self.tables.read().plist(plist).ok().map(|list| list.class)
    }

    #[must_use]
    pub fn dataset_exists(&self, path: &str, name: &str) -> bool {
        let Ok(name) = dataset_path(name) else {
            return false;
        };
        self.tables.read().files.get(path).is_some_and(|file| file.datasets.contains_key(&name))
    }

    /// Live files, datasets, dataspaces and property lists.
    #[must_use]
    pub fn open_handles(&self) -> usize {
        self.tables.read().handles.len()
    }

    /// Registered connectors, the built-in native driver included.
    #[must_use]
    pub fn registered_connectors(&self) -> usize {
        self.tables.read().connectors.len()
    }
}

impl NativeBackend for MemoryNative {
    fn file_create(
        &self,
        path: &str,
        flags: AccessFlags,
        fcpl: PlistId,
        fapl: PlistId,
    ) -> Result<ObjectId, NativeError> {
        if path.is_empty() {
            return Err(NativeError::InvalidArgument {
                message: "file path is empty".into(),
                context: None,
            });
        }
        let mut tables = self.tables.write();
        tables.expect_class(fcpl, PlistClass::FileCreate)?;
        tables.expect_class(fapl, PlistClass::FileAccess)?;

        if tables.files.contains_key(path) && !flags.contains(AccessFlags::TRUNCATE) {
            return Err(NativeError::AlreadyExists {
                message: path.to_owned().into(),
                context: Some("create without TRUNCATE".into()),
            });
        }
        tables.files.insert(path.to_owned(), FileImage::default());

        let id = ObjectId::new(self.insert(&mut tables, Handle::File { path: path.to_owned() }));
        debug!(path, file = %id, ?flags, "File created");
        Ok(id)
    }

    fn file_open(
        &self,
        path: &str,
        flags: AccessFlags,
        fapl: PlistId,
    ) -> Result<ObjectId, NativeError> {
        let mut tables = self.tables.write();
        tables.expect_class(fapl, PlistClass::FileAccess)?;

        let Some(image) = tables.files.get_mut(path) else {
            return Err(NativeError::NotFound { message: path.to_owned().into(), context: None });
        };
        if flags.contains(AccessFlags::TRUNCATE) {
            *image = FileImage::default();
        }

        let id = ObjectId::new(self.insert(&mut tables, Handle::File { path: path.to_owned() }));
        debug!(path, file = %id, ?flags, "File opened");
        Ok(id)
    }

    fn file_close(&self, file: ObjectId) -> Result<(), NativeError> {
        let mut tables = self.tables.write();
        tables.file_path(file)?;
        tables.handles.remove(&file.raw());
        trace!(%file, "File closed");
        Ok(())
    }

    fn dataset_create(
        &self,
        location: ObjectId,
        name: &str,
        element: ElementType,
        space: SpaceId,
        dcpl: PlistId,
        dapl: PlistId,
    ) -> Result<ObjectId, NativeError> {
        let name = dataset_path(name)?;
        if element.size() == 0 {
            return Err(NativeError::InvalidArgument {
                message: format!("element type {element} has no size").into(),
                context: None,
            });
        }

        let mut tables = self.tables.write();
        let path = tables.file_path(location)?.to_owned();
        let extents = tables.space(space)?.extents.clone();
        let dcpl = tables.plist_or_default(dcpl, PlistClass::DatasetCreate)?;
        let dapl = tables.plist_or_default(dapl, PlistClass::DatasetAccess)?;

        let file = tables.files.entry(path.clone()).or_default();
        if file.datasets.contains_key(&name) {
            return Err(NativeError::AlreadyExists {
                message: format!("dataset {name} in {path}").into(),
                context: None,
            });
        }
        let mut image = DatasetImage { element, extents, dcpl, dapl, address: file.next_address };
        file.next_address = file.next_address.saturating_add(image.storage_bytes().max(1));
        if image.storage_bytes() == 0 {
            image.address = 0;
        }
        file.datasets.insert(name.clone(), image);

        let id = ObjectId::new(self.insert(&mut tables, Handle::Dataset { path, name: name.clone() }));
        debug!(dataset = %name, id = %id, %element, "Dataset created");
        Ok(id)
    }

    fn dataset_open(
        &self,
        location: ObjectId,
        name: &str,
        dapl: PlistId,
    ) -> Result<ObjectId, NativeError> {
        let name = dataset_path(name)?;
        let mut tables = self.tables.write();
        let path = tables.file_path(location)?.to_owned();
        tables.expect_class(dapl, PlistClass::DatasetAccess)?;

        if !tables.files.get(&path).is_some_and(|file| file.datasets.contains_key(&name)) {
            return Err(NativeError::NotFound {
                message: format!("dataset {name} in {path}").into(),
                context: None,
            });
        }

        let id = ObjectId::new(self.insert(&mut tables, Handle::Dataset { path, name: name.clone() }));
        debug!(dataset = %name, id = %id, "Dataset opened");
        Ok(id)
    }

    fn dataset_close(&self, dataset: ObjectId) -> Result<(), NativeError> {
        let mut tables = self.tables.write();
        match tables.handles.get(&dataset.raw()) {
            Some(Handle::Dataset { .. }) => {
                tables.handles.remove(&dataset.raw());
                trace!(%dataset, "Dataset closed");
                Ok(())
            }
            _ => Err(invalid_handle("dataset", dataset)),
        }
    }

    fn dataset_space(&self, dataset: ObjectId) -> Result<SpaceId, NativeError> {
        let mut tables = self.tables.write();
        let extents = tables.dataset(dataset)?.extents.clone();
        Ok(SpaceId::new(self.insert(&mut tables, Handle::Space(Dataspace::new(extents)))))
    }

    fn dataset_type(&self, dataset: ObjectId) -> Result<ElementType, NativeError> {
        Ok(self.tables.read().dataset(dataset)?.element)
    }

    fn dataset_space_status(&self, dataset: ObjectId) -> Result<SpaceStatus, NativeError> {
        let tables = self.tables.read();
        let image = tables.dataset(dataset)?;
        Ok(if image.storage_bytes() == 0 { SpaceStatus::NotAllocated } else { SpaceStatus::Allocated })
    }

    fn dataset_create_plist(&self, dataset: ObjectId) -> Result<PlistId, NativeError> {
        let mut tables = self.tables.write();
        let list = tables.dataset(dataset)?.dcpl.clone();
        Ok(PlistId::new(self.insert(&mut tables, Handle::Plist(list))))
    }

    fn dataset_access_plist(&self, dataset: ObjectId) -> Result<PlistId, NativeError> {
        let mut tables = self.tables.write();
        let list = tables.dataset(dataset)?.dapl.clone();
        Ok(PlistId::new(self.insert(&mut tables, Handle::Plist(list))))
    }

    fn dataset_storage_size(&self, dataset: ObjectId) -> Result<u64, NativeError> {
        Ok(self.tables.read().dataset(dataset)?.storage_bytes())
    }

    fn dataset_offset(&self, dataset: ObjectId) -> Result<Option<u64>, NativeError> {
        let tables = self.tables.read();
        let image = tables.dataset(dataset)?;
        Ok((image.address != 0).then_some(image.address))
    }

    fn space_rank(&self, space: SpaceId) -> Result<usize, NativeError> {
        Ok(self.tables.read().space(space)?.extents.rank())
    }

    fn space_extents(&self, space: SpaceId, rank: usize) -> Result<Extents, NativeError> {
        let tables = self.tables.read();
        let extents = &tables.space(space)?.extents;
        if extents.rank() != rank {
            return Err(NativeError::InvalidArgument {
                message: format!("{space} has rank {}, caller expected {rank}", extents.rank())
                    .into(),
                context: None,
            });
        }
        Ok(extents.clone())
    }

    fn space_selection_bounds(&self, space: SpaceId) -> Result<Option<Hyperslab>, NativeError> {
        Ok(self.tables.read().space(space)?.bounds())
    }

    fn space_selected_points(&self, space: SpaceId) -> Result<u64, NativeError> {
        Ok(self.tables.read().space(space)?.selected_points())
    }

    fn space_close(&self, space: SpaceId) -> Result<(), NativeError> {
        let mut tables = self.tables.write();
        tables.space(space)?;
        tables.handles.remove(&space.raw());
        Ok(())
    }

    fn dcpl_type(&self, dcpl: PlistId) -> Result<ElementType, NativeError> {
        let tables = self.tables.read();
        layout(&tables, dcpl).map(|(element, _)| *element)
    }

    fn dcpl_space(&self, dcpl: PlistId) -> Result<SpaceId, NativeError> {
        let mut tables = self.tables.write();
        let dataspace = layout(&tables, dcpl)?.1.clone();
        Ok(SpaceId::new(self.insert(&mut tables, Handle::Space(dataspace))))
    }

    fn plist_copy(&self, plist: PlistId) -> Result<PlistId, NativeError> {
        if plist.is_default() {
            return Err(NativeError::InvalidArgument {
                message: "the default property list cannot be copied".into(),
                context: None,
            });
        }
        let mut tables = self.tables.write();
        let list = tables.plist(plist)?.clone();
        let id = PlistId::new(self.insert(&mut tables, Handle::Plist(list)));
        trace!(source = %plist, copy = %id, "Property list copied");
        Ok(id)
    }

    fn plist_close(&self, plist: PlistId) -> Result<(), NativeError> {
        let mut tables = self.tables.write();
        tables.plist(plist)?;
        tables.handles.remove(&plist.raw());
        trace!(%plist, "Property list closed");
        Ok(())
    }

    fn driver_id(&self, name: &str) -> Result<ConnectorId, NativeError> {
        if name == NATIVE_DRIVER_NAME {
            return Ok(self.driver);
        }
        self.tables
            .read()
            .connectors
            .iter()
            .find_map(|(id, registered)| (registered == name).then_some(ConnectorId::new(*id)))
            .ok_or_else(|| NativeError::NotFound {
                message: format!("driver {name}").into(),
                context: None,
            })
    }

    fn register_connector(&self, name: &str) -> Result<ConnectorId, NativeError> {
        if name.trim().is_empty() {
            return Err(NativeError::InvalidArgument {
                message: "connector name is empty".into(),
                context: None,
            });
        }
        let id = ConnectorId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.tables.write().connectors.insert(id.raw(), name.to_owned());
        debug!(connector = %id, name, "Connector registered");
        Ok(id)
    }

    fn unregister_connector(&self, connector: ConnectorId) -> Result<(), NativeError> {
        if connector == self.driver {
            return Err(NativeError::InvalidArgument {
                message: "the native driver cannot be unregistered".into(),
                context: None,
            });
        }
        self.tables.write().connectors.remove(&connector.raw()).map(|_| ()).ok_or_else(|| {
            NativeError::NotFound { message: connector.to_string().into(), context: None }
        })?;
        debug!(%connector, "Connector unregistered");
        Ok(())
    }
}

fn layout(tables: &Tables, dcpl: PlistId) -> Result<&(ElementType, Dataspace), NativeError> {
    let list = tables.plist(dcpl)?;
    match (&list.class, &list.layout) {
        (PlistClass::DatasetCreate, Some(layout)) => Ok(layout),
        _ => Err(NativeError::InvalidArgument {
            message: format!("{dcpl} carries no dataset type and dataspace").into(),
            context: None,
        }),
    }
}

/// Dataset names are absolute inside their file; `grid` and `/grid` name the same dataset.
fn dataset_path(name: &str) -> Result<String, NativeError> {
    let trimmed = name.trim().trim_start_matches('/');
    if trimmed.is_empty() {
        return Err(NativeError::InvalidArgument {
            message: "dataset name is empty".into(),
            context: None,
        });
    }
    Ok(format!("/{trimmed}"))
}

fn invalid_handle(kind: &'static str, id: impl fmt::Display) -> NativeError {
    NativeError::InvalidHandle { message: format!("{id} is not an open {kind}").into(), context: None }
}
