use std::sync::Arc;

use crate::error::Error;
use crate::place::Place;
use crate::registry;
use crate::runtime::SoftRuntime;

fn register_test_runtime() {
    registry::register(Arc::new(SoftRuntime::new("reg", 2)));
}

#[test]
fn context_is_created_once_per_place() {
    register_test_runtime();

    let place = Place::device("reg", 0);
    let first = registry::context(&place).unwrap();
    let second = registry::context(&place).unwrap();
    assert!(Arc::ptr_eq(&first, &second), "contexts are process-scoped");
    assert_eq!(first.place(), &place);
}

#[test]
fn distinct_devices_get_distinct_contexts() {
    register_test_runtime();

    let ctx0 = registry::context(&Place::device("reg", 0)).unwrap();
    let ctx1 = registry::context(&Place::device("reg", 1)).unwrap();
    assert!(!Arc::ptr_eq(&ctx0, &ctx1));
}

#[test]
fn unknown_kind_is_rejected() {
    let err = registry::context(&Place::device("never-registered", 0)).unwrap_err();
    assert!(matches!(err, Error::UnknownKind { .. }), "unexpected error: {err}");
}

#[test]
fn out_of_range_id_is_rejected() {
    register_test_runtime();

    let err = registry::context(&Place::device("reg", 9)).unwrap_err();
    assert!(matches!(err, Error::DeviceOutOfRange { .. }), "unexpected error: {err}");
}

#[test]
fn duplicate_registration_keeps_first() {
    register_test_runtime();
    // A second runtime under the same kind with a different device count
    // must not replace the first.
    registry::register(Arc::new(SoftRuntime::new("reg", 16)));

    let err = registry::context(&Place::device("reg", 9)).unwrap_err();
    assert!(matches!(err, Error::DeviceOutOfRange { .. }), "unexpected error: {err}");
}

#[test]
fn host_context_is_host_bound() {
    let ctx = registry::host().unwrap();
    assert!(ctx.place().is_host());
}

#[test]
fn get_device_parses() {
    register_test_runtime();

    let ctx = registry::get_device("REG:1").unwrap();
    assert_eq!(ctx.place(), &Place::device("reg", 1));

    let err = registry::get_device("reg:nope").unwrap_err();
    assert!(matches!(err, Error::InvalidDevice { .. }), "unexpected error: {err}");
}
