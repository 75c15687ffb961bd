use std::str::FromStr;

use test_case::test_case;

use crate::error::Error;
use crate::place::{DeviceKind, Place};

#[test]
fn host_never_equals_device() {
    assert_ne!(Place::Host, Place::device("gcu", 0));
    assert_ne!(Place::Host, Place::device("gcu", 7));
}

#[test]
fn device_equality_needs_kind_and_id() {
    assert_eq!(Place::device("gcu", 1), Place::device("gcu", 1));
    assert_ne!(Place::device("gcu", 0), Place::device("gcu", 1));
    assert_ne!(Place::device("gcu", 0), Place::device("sdaa", 0));
}

#[test]
fn kind_is_case_insensitive() {
    assert_eq!(DeviceKind::new("GCU"), DeviceKind::new("gcu"));
    assert_eq!(Place::device("GCU", 2), Place::device("gcu", 2));
}

#[test]
fn display() {
    assert_eq!(Place::Host.to_string(), "host");
    assert_eq!(Place::device("gcu", 3).to_string(), "gcu:3");
}

#[test_case("host", Place::Host ; "lowercase host")]
#[test_case("cpu", Place::Host ; "cpu alias")]
#[test_case("HOST", Place::Host ; "uppercase host")]
#[test_case("gcu:1", Place::device("gcu", 1) ; "lowercase gcu 1")]
#[test_case("GCU:1", Place::device("gcu", 1) ; "uppercase gcu 1")]
#[test_case("sdaa", Place::device("sdaa", 0) ; "bare kind defaults to device 0")]
fn parse(input: &str, expected: Place) {
    assert_eq!(Place::from_str(input).unwrap(), expected);
}

#[test_case("gcu:x")]
#[test_case(":1")]
#[test_case("")]
fn parse_rejects(input: &str) {
    let err = Place::from_str(input).unwrap_err();
    assert!(matches!(err, Error::InvalidDevice { .. }), "unexpected error: {err}");
}

#[test]
fn accessors() {
    assert!(Place::Host.is_host());
    assert_eq!(Place::Host.device_id(), None);

    let place = Place::device("gcu", 2);
    assert!(!place.is_host());
    assert_eq!(place.device_id(), Some(2));
    assert_eq!(place.kind().map(DeviceKind::as_str), Some("gcu"));
}
