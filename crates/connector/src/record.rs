//! Per-object state threaded through every connector operation.

use stratum_domain::{ConnectorId, ObjectId, PlistId};
use stratum_native::{NativeBackend, NativeError};
use tracing::trace;

/// State attached to a file access configuration, an open file or an open dataset.
///
/// The access property list is a private duplicate made through the native backend; two
/// records never share one. Records are not `Clone`: use [`HandleRecord::duplicate`].
#[derive(Debug)]
pub struct HandleRecord {
    object: Option<ObjectId>,
    connector: ConnectorId,
    driver: ConnectorId,
    access_plist: PlistId,
    file_path: Option<String>,
    dataset_name: Option<String>,
    sync_on_close: bool,
}

impl HandleRecord {
    /// A record bound to nothing yet, holding its own copy of `fapl`.
    pub(crate) fn attach(
        native: &dyn NativeBackend,
        connector: ConnectorId,
        driver: ConnectorId,
        fapl: PlistId,
        sync_on_close: bool,
    ) -> Result<Self, NativeError> {
        Ok(Self {
            object: None,
            connector,
            driver,
            access_plist: copy_plist(native, fapl)?,
            file_path: None,
            dataset_name: None,
            sync_on_close,
        })
    }

    /// Deep copy: ids and flags are copied, strings cloned, the access list duplicated natively.
    ///
    /// The copy is not bound to the original's native object.
    pub fn duplicate(&self, native: &dyn NativeBackend) -> Result<Self, NativeError> {
        let access_plist = copy_plist(native, self.access_plist)?;
        trace!(from = %self.access_plist, to = %access_plist, "Handle record duplicated");
        Ok(Self {
            object: None,
            connector: self.connector,
            driver: self.driver,
            access_plist,
            file_path: self.file_path.clone(),
            dataset_name: self.dataset_name.clone(),
            sync_on_close: self.sync_on_close,
        })
    }

    /// Closes the private access list and drops the record.
    pub fn release(self, native: &dyn NativeBackend) -> Result<(), NativeError> {
        if !self.access_plist.is_default() {
            native.plist_close(self.access_plist)?;
        }
        Ok(())
    }

    #[must_use]
    pub const fn object(&self) -> Option<ObjectId> {
        self.object
    }

    #[must_use]
    pub const fn connector(&self) -> ConnectorId {
        self.connector
    }

    #[must_use]
    pub const fn driver(&self) -> ConnectorId {
        self.driver
    }

    #[must_use]
    pub const fn access_plist(&self) -> PlistId {
        self.access_plist
    }

    #[must_use]
    pub fn file_path(&self) -> Option<&str> {
        self.file_path.as_deref()
    }

    #[must_use]
    pub fn dataset_name(&self) -> Option<&str> {
        self.dataset_name.as_deref()
    }

    #[must_use]
    pub const fn sync_on_close(&self) -> bool {
        self.sync_on_close
    }

    pub fn set_file_path(&mut self, path: impl Into<String>) {
        self.file_path = Some(path.into());
    }

    pub fn set_dataset_name(&mut self, name: impl Into<String>) {
        self.dataset_name = Some(name.into());
    }

    pub const fn set_sync_on_close(&mut self, sync: bool) {
        self.sync_on_close = sync;
    }

    pub(crate) const fn bind(&mut self, object: ObjectId) {
        self.object = Some(object);
    }

    /// Forgets the bound file so the record can serve another create/open.
    pub(crate) fn unbind(&mut self) {
        self.object = None;
        self.file_path = None;
    }
}

/// The default list is a library singleton and is shared rather than copied.
fn copy_plist(native: &dyn NativeBackend, plist: PlistId) -> Result<PlistId, NativeError> {
    if plist.is_default() { Ok(PlistId::DEFAULT) } else { native.plist_copy(plist) }
}

/// The connector's view of an application file access configuration.
///
/// Created by [`crate::Connector::set_fapl`]; file create/open binds its record to a native file
/// and datasets opened through it inherit the file path.
#[derive(Debug)]
pub struct AccessConfig {
    pub(crate) record: HandleRecord,
}

impl AccessConfig {
    #[must_use]
    pub const fn record(&self) -> &HandleRecord {
        &self.record
    }

    /// The native file currently bound, if any.
    #[must_use]
    pub const fn file(&self) -> Option<ObjectId> {
        self.record.object
    }

    #[must_use]
    pub fn file_path(&self) -> Option<&str> {
        self.record.file_path()
    }

    /// Sync-on-close flag inherited by datasets opened through this configuration.
    pub const fn set_sync_on_close(&mut self, sync: bool) {
        self.record.set_sync_on_close(sync);
    }
}
