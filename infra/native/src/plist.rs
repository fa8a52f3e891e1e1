use crate::space::Dataspace;
use stratum_domain::ElementType;

/// Class of a property list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum PlistClass {
    FileCreate,
    FileAccess,
    DatasetCreate,
    DatasetAccess,
    Transfer,
}

#[derive(Debug, Clone)]
pub(crate) struct PropertyList {
    pub(crate) class: PlistClass,
    /// Element type and dataspace carried by a dataset creation list.
    pub(crate) layout: Option<(ElementType, Dataspace)>,
}

impl PropertyList {
    pub(crate) const fn of(class: PlistClass) -> Self {
        Self { class, layout: None }
    }

    pub(crate) const fn dataset_create(element: ElementType, space: Dataspace) -> Self {
        Self { class: PlistClass::DatasetCreate, layout: Some((element, space)) }
    }
}
