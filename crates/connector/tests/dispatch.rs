pub mod fixtures;

use fixtures::{Harness, decode, encode};
use strum::IntoEnumIterator;
use stratum_connector::{
    DatasetInfo, DatasetQuery, LifecycleState, Operation, Request, Response, Selection, VolError,
};
use stratum_domain::{AccessFlags, ElementType, PlistId};
use stratum_native::NativeBackend;

#[test]
fn slots_without_handlers_are_unsupported() {
    let h = Harness::new();

    for operation in Operation::iter().filter(|op| !op.is_supported()) {
        let err = h.connector.dispatch(Request::Slot(operation)).unwrap_err();
        assert!(
            matches!(err, VolError::Unsupported { operation: op, .. } if op == operation),
            "{operation} answered {err:?}"
        );
    }
    assert_eq!(h.buffer.names(), vec!["update_layers"]);
}

#[test]
fn untyped_supported_slot_is_rejected() {
    let h = Harness::new();
    let err = h.connector.dispatch(Request::Slot(Operation::DatasetWrite)).unwrap_err();
    assert!(matches!(err, VolError::InvalidArgument { .. }));
}

#[test]
fn unsupported_error_names_the_operation() {
    let h = Harness::new();
    let err = h.connector.dispatch(Request::Slot(Operation::AttributeCreate)).unwrap_err();
    assert!(err.to_string().contains("attribute_create"), "{err}");
}

#[test]
fn full_cycle_through_the_table() {
    let h = Harness::new();
    let c = &h.connector;
    let fapl = h.native.create_fapl();

    c.dispatch(Request::Initialize).unwrap();
    let original = c.set_fapl(fapl).unwrap();
    let Response::Access(mut access) = c.dispatch(Request::InfoCopy(&original)).unwrap() else {
        panic!("access expected");
    };
    c.dispatch(Request::InfoFree(original)).unwrap();
    assert_eq!(c.live_access(), 1);
    h.native.plist_close(fapl).unwrap();

    let Response::File(file) = c
        .dispatch(Request::FileCreate {
            access: &mut access,
            path: "sample.dat",
            flags: AccessFlags::TRUNCATE,
            fcpl: PlistId::DEFAULT,
        })
        .unwrap()
    else {
        panic!("file expected");
    };
    assert_eq!(access.file(), Some(file));

    let dcpl = h.dcpl(ElementType::Int32, &[2, 3], None);
    let request =
        Request::DatasetCreate { parent: &access, name: "grid", dcpl, dapl: PlistId::DEFAULT };
    let Response::Dataset(grid) = c.dispatch(request).unwrap() else {
        panic!("dataset expected");
    };
    h.native.plist_close(dcpl).unwrap();

    let data = encode(&[1, 2, 3, 4, 5, 6]);
    c.dispatch(Request::DatasetWrite {
        dataset: &grid,
        mem_type: ElementType::Int32,
        memory: Selection::All,
        file: Selection::All,
        dxpl: PlistId::DEFAULT,
        data: &data,
    })
    .unwrap();

    let mut out = vec![0u8; data.len()];
    c.dispatch(Request::DatasetRead {
        dataset: &grid,
        mem_type: ElementType::Int32,
        memory: Selection::All,
        file: Selection::All,
        dxpl: PlistId::DEFAULT,
        out: &mut out,
    })
    .unwrap();
    assert_eq!(decode(&out), vec![1, 2, 3, 4, 5, 6]);

    let Response::Info(info) =
        c.dispatch(Request::DatasetGet { dataset: &grid, query: DatasetQuery::Type }).unwrap()
    else {
        panic!("info expected");
    };
    assert_eq!(info, DatasetInfo::Type(ElementType::Int32));

    c.dispatch(Request::DatasetClose(grid)).unwrap();
    c.dispatch(Request::FileClose { access: &mut access }).unwrap();
    c.dispatch(Request::InfoFree(access)).unwrap();

    assert_eq!(c.state(), LifecycleState::Terminated);
    assert_eq!(h.buffer.names(), vec!["update_layers", "init", "write", "read", "sync", "clean"]);
    assert_eq!(h.native.open_handles(), 0);
}

#[test]
fn terminate_through_the_table() {
    let h = Harness::new();
    h.connector.dispatch(Request::Terminate).unwrap();
    h.connector.dispatch(Request::Terminate).unwrap();

    assert!(matches!(h.connector.dispatch(Request::Initialize), Err(VolError::Terminated { .. })));
    assert_eq!(h.buffer.count("clean"), 1);
}
