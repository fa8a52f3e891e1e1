//! The connector's operation table.
//!
//! [`Operation`] names every slot a storage-library connector class exposes. Only the slots in
//! [`Capabilities::SUPPORTED`] have handlers; [`Connector::dispatch`] answers the rest with
//! [`VolError::Unsupported`].

use crate::connector::Connector;
use crate::dataset::{Dataset, DatasetInfo, DatasetQuery};
use crate::error::VolError;
use crate::record::AccessConfig;
use crate::selection::Selection;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use stratum_domain::{AccessFlags, ElementType, ObjectId, PlistId};
use tracing::{debug, trace};

/// Every operation slot of a connector class.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumIter,
    strum_macros::IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum Operation {
    Initialize,
    Terminate,
    InfoCopy,
    InfoFree,

    AttributeCreate,
    AttributeOpen,
    AttributeRead,
    AttributeWrite,
    AttributeGet,
    AttributeSpecific,
    AttributeOptional,
    AttributeClose,

    DatasetCreate,
    DatasetOpen,
    DatasetRead,
    DatasetWrite,
    DatasetGet,
    DatasetSpecific,
    DatasetOptional,
    DatasetClose,

    DatatypeCommit,
    DatatypeOpen,
    DatatypeGet,
    DatatypeSpecific,
    DatatypeOptional,
    DatatypeClose,

    FileCreate,
    FileOpen,
    FileGet,
    FileSpecific,
    FileOptional,
    FileClose,

    GroupCreate,
    GroupOpen,
    GroupGet,
    GroupSpecific,
    GroupOptional,
    GroupClose,

    LinkCreate,
    LinkCopy,
    LinkMove,
    LinkGet,
    LinkSpecific,
    LinkOptional,

    ObjectOpen,
    ObjectCopy,
    ObjectGet,
    ObjectSpecific,
    ObjectOptional,

    AsyncCancel,
    AsyncTest,
    AsyncWait,

    Optional,
}

bitflags! {
    /// Operation slots that have a handler.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Capabilities: u32 {
        const INITIALIZE = 1 << 0;
        const TERMINATE = 1 << 1;
        const INFO_COPY = 1 << 2;
        const INFO_FREE = 1 << 3;
        const FILE_CREATE = 1 << 4;
        const FILE_OPEN = 1 << 5;
        const FILE_CLOSE = 1 << 6;
        const DATASET_CREATE = 1 << 7;
        const DATASET_OPEN = 1 << 8;
        const DATASET_READ = 1 << 9;
        const DATASET_WRITE = 1 << 10;
        const DATASET_GET = 1 << 11;
        const DATASET_CLOSE = 1 << 12;

        const SUPPORTED = Self::INITIALIZE.bits()
            | Self::TERMINATE.bits()
            | Self::INFO_COPY.bits()
            | Self::INFO_FREE.bits()
            | Self::FILE_CREATE.bits()
            | Self::FILE_OPEN.bits()
            | Self::FILE_CLOSE.bits()
            | Self::DATASET_CREATE.bits()
            | Self::DATASET_OPEN.bits()
            | Self::DATASET_READ.bits()
            | Self::DATASET_WRITE.bits()
            | Self::DATASET_GET.bits()
            | Self::DATASET_CLOSE.bits();
    }
}

impl Capabilities {
    /// The flag handling `operation`, empty for slots without a handler.
    #[must_use]
    pub const fn of(operation: Operation) -> Self {
        match operation {
            Operation::Initialize => Self::INITIALIZE,
            Operation::Terminate => Self::TERMINATE,
            Operation::InfoCopy => Self::INFO_COPY,
            Operation::InfoFree => Self::INFO_FREE,
            Operation::FileCreate => Self::FILE_CREATE,
            Operation::FileOpen => Self::FILE_OPEN,
            Operation::FileClose => Self::FILE_CLOSE,
            Operation::DatasetCreate => Self::DATASET_CREATE,
            Operation::DatasetOpen => Self::DATASET_OPEN,
            Operation::DatasetRead => Self::DATASET_READ,
            Operation::DatasetWrite => Self::DATASET_WRITE,
            Operation::DatasetGet => Self::DATASET_GET,
            Operation::DatasetClose => Self::DATASET_CLOSE,
            _ => Self::empty(),
        }
    }
}

impl Operation {
    #[must_use]
    pub const fn is_supported(self) -> bool {
        !Capabilities::of(self).is_empty()
    }
}

/// Typed arguments of one operation.
///
/// [`Request::Slot`] names any other slot; it exists so callers routing by slot get the
/// "not supported" answer from the table rather than from their own bookkeeping.
#[derive(Debug)]
pub enum Request<'a> {
    Initialize,
    Terminate,
    InfoCopy(&'a AccessConfig),
    InfoFree(AccessConfig),
    FileCreate { access: &'a mut AccessConfig, path: &'a str, flags: AccessFlags, fcpl: PlistId },
    FileOpen { access: &'a mut AccessConfig, path: &'a str, flags: AccessFlags },
    FileClose { access: &'a mut AccessConfig },
    DatasetCreate { parent: &'a AccessConfig, name: &'a str, dcpl: PlistId, dapl: PlistId },
    DatasetOpen { parent: &'a AccessConfig, name: &'a str, dapl: PlistId },
    DatasetRead {
        dataset: &'a Dataset,
        mem_type: ElementType,
        memory: Selection,
        file: Selection,
        dxpl: PlistId,
        out: &'a mut [u8],
    },
    DatasetWrite {
        dataset: &'a Dataset,
        mem_type: ElementType,
        memory: Selection,
        file: Selection,
        dxpl: PlistId,
        data: &'a [u8],
    },
    DatasetGet { dataset: &'a Dataset, query: DatasetQuery },
    DatasetClose(Dataset),
    Slot(Operation),
}

impl Request<'_> {
    #[must_use]
    pub const fn operation(&self) -> Operation {
        match self {
            Self::Initialize => Operation::Initialize,
            Self::Terminate => Operation::Terminate,
            Self::InfoCopy(_) => Operation::InfoCopy,
            Self::InfoFree(_) => Operation::InfoFree,
            Self::FileCreate { .. } => Operation::FileCreate,
            Self::FileOpen { .. } => Operation::FileOpen,
            Self::FileClose { .. } => Operation::FileClose,
            Self::DatasetCreate { .. } => Operation::DatasetCreate,
            Self::DatasetOpen { .. } => Operation::DatasetOpen,
            Self::DatasetRead { .. } => Operation::DatasetRead,
            Self::DatasetWrite { .. } => Operation::DatasetWrite,
            Self::DatasetGet { .. } => Operation::DatasetGet,
            Self::DatasetClose(_) => Operation::DatasetClose,
            Self::Slot(operation) => *operation,
        }
    }
}

/// Result of a dispatched operation.
#[derive(Debug)]
pub enum Response {
    Done,
    Access(AccessConfig),
    File(ObjectId),
    Dataset(Dataset),
    Info(DatasetInfo),
}

impl Connector {
    /// Slots this connector handles.
    #[must_use]
    pub const fn capabilities(&self) -> Capabilities {
        Capabilities::SUPPORTED
    }

    /// Routes `request` to its handler.
    ///
    /// # Errors
    /// [`VolError::Unsupported`] for slots outside [`Capabilities::SUPPORTED`], otherwise
    /// whatever the handler returns. A [`Request::Slot`] naming a supported slot is rejected
    /// with [`VolError::InvalidArgument`] since it carries no arguments.
    pub fn dispatch(&self, request: Request<'_>) -> Result<Response, VolError> {
        let operation = request.operation();
        let flag = Capabilities::of(operation);
        if flag.is_empty() || !self.capabilities().contains(flag) {
            debug!(%operation, "Unsupported operation requested");
            return Err(VolError::Unsupported { operation, context: None });
        }
        trace!(%operation, "Dispatching");

        match request {
            Request::Initialize => self.ensure_active().map(|()| Response::Done),
            Request::Terminate => self.shutdown().map(|()| Response::Done),
            Request::InfoCopy(access) => self.copy_access(access).map(Response::Access),
            Request::InfoFree(access) => self.release_access(access).map(|()| Response::Done),
            Request::FileCreate { access, path, flags, fcpl } => {
                self.file_create(access, path, flags, fcpl).map(Response::File)
            }
            Request::FileOpen { access, path, flags } => {
                self.file_open(access, path, flags).map(Response::File)
            }
            Request::FileClose { access } => self.file_close(access).map(|()| Response::Done),
            Request::DatasetCreate { parent, name, dcpl, dapl } => {
                self.dataset_create(parent, name, dcpl, dapl).map(Response::Dataset)
            }
            Request::DatasetOpen { parent, name, dapl } => {
                self.dataset_open(parent, name, dapl).map(Response::Dataset)
            }
            Request::DatasetRead { dataset, mem_type, memory, file, dxpl, out } => self
                .dataset_read(dataset, mem_type, memory, file, dxpl, out)
                .map(|()| Response::Done),
            Request::DatasetWrite { dataset, mem_type, memory, file, dxpl, data } => self
                .dataset_write(dataset, mem_type, memory, file, dxpl, data)
                .map(|()| Response::Done),
            Request::DatasetGet { dataset, query } => {
                self.dataset_get(dataset, query).map(Response::Info)
            }
            Request::DatasetClose(dataset) => self.dataset_close(dataset).map(|()| Response::Done),
            Request::Slot(operation) => Err(VolError::InvalidArgument {
                message: format!("{operation} needs its typed request").into(),
                context: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_supported_slots() {
        let supported: Vec<Operation> = Operation::iter().filter(|op| op.is_supported()).collect();
        assert_eq!(supported.len(), 13);
        assert!(Operation::DatasetWrite.is_supported());
        assert!(!Operation::AttributeCreate.is_supported());
        assert!(!Operation::DatasetSpecific.is_supported());
        assert!(!Operation::GroupCreate.is_supported());
    }

    #[test]
    fn test_capability_flags_are_distinct() {
        let mut seen = Capabilities::empty();
        for op in Operation::iter().filter(|op| op.is_supported()) {
            let flag = Capabilities::of(op);
            assert!(!seen.intersects(flag), "{op} shares a flag");
            seen |= flag;
        }
        assert_eq!(seen, Capabilities::SUPPORTED);
    }

    #[test]
    fn test_operation_names() {
        assert_eq!(Operation::DatasetRead.to_string(), "dataset_read");
        let name: &'static str = Operation::InfoFree.into();
        assert_eq!(name, "info_free");
    }
}
