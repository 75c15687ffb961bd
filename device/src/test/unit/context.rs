use std::sync::Arc;

use ferry_dtype::DType;

use crate::buffer::Buffer;
use crate::context::DeviceContext;
use crate::error::Error;
use crate::place::Place;
use crate::runtime::SoftRuntime;

fn device_context(id: usize) -> DeviceContext {
    DeviceContext::new(Arc::new(SoftRuntime::new("mock", 2)), id).unwrap()
}

#[test]
fn alloc_places_the_buffer() {
    let ctx = device_context(0);
    let mut buffer = Buffer::new(DType::Float32);
    buffer.resize(&[4]);

    let ptr = ctx.alloc(&mut buffer, DType::Float32).unwrap();
    assert!(!ptr.is_null());
    assert!(buffer.is_allocated());
    assert_eq!(buffer.place(), &Place::device("mock", 0));
}

#[test]
fn alloc_reuses_matching_storage() {
    let ctx = device_context(0);
    let mut buffer = Buffer::new(DType::Float32);
    buffer.resize(&[4]);

    let first = ctx.alloc(&mut buffer, DType::Float32).unwrap();
    let second = ctx.alloc(&mut buffer, DType::Float32).unwrap();
    assert_eq!(first, second, "same place and size must reuse the allocation");
}

#[test]
fn alloc_replaces_on_size_change() {
    let ctx = device_context(0);
    let mut buffer = Buffer::new(DType::Float32);
    buffer.resize(&[4]);
    ctx.alloc(&mut buffer, DType::Float32).unwrap();
    let old = buffer.data_ptr();

    buffer.resize(&[8]);
    ctx.alloc(&mut buffer, DType::Float32).unwrap();
    assert_ne!(buffer.data_ptr(), old, "resized footprint requires a fresh allocation");
    assert_eq!(buffer.byte_size(), 32);
}

#[test]
fn alloc_replaces_on_place_change() {
    let ctx0 = device_context(0);
    let ctx1 = device_context(1);
    let mut buffer = Buffer::new(DType::Int32);
    buffer.resize(&[2]);

    ctx0.alloc(&mut buffer, DType::Int32).unwrap();
    let old = buffer.data_ptr();

    ctx1.alloc(&mut buffer, DType::Int32).unwrap();
    assert_eq!(buffer.place(), &Place::device("mock", 1));
    assert_ne!(buffer.data_ptr(), old);
}

#[test]
fn alloc_retags_dtype() {
    let ctx = device_context(0);
    let mut buffer = Buffer::new(DType::Float32);
    buffer.resize(&[2]);

    ctx.alloc(&mut buffer, DType::Int16).unwrap();
    assert_eq!(buffer.dtype(), DType::Int16);
}

#[test]
fn zero_size_alloc_clears_storage() {
    let ctx = device_context(0);
    let mut buffer = Buffer::new(DType::Float32);
    buffer.resize(&[4]);
    ctx.alloc(&mut buffer, DType::Float32).unwrap();
    assert!(buffer.is_allocated());

    buffer.resize(&[0]);
    let ptr = ctx.alloc(&mut buffer, DType::Float32).unwrap();
    assert!(ptr.is_null());
    assert!(!buffer.is_allocated());
}

#[test]
fn host_alloc_is_host_placed() {
    let ctx = device_context(0);
    let mut buffer = Buffer::new(DType::Float64);
    buffer.resize(&[3]);

    let ptr = ctx.host_alloc(&mut buffer, DType::Float64).unwrap();
    assert!(!ptr.is_null());
    assert!(buffer.place().is_host());
}

#[test]
fn device_alloc_on_host_context_fails() {
    let ctx = DeviceContext::host(Arc::new(SoftRuntime::new("host", 0)));
    let mut buffer = Buffer::new(DType::Float32);
    buffer.resize(&[1]);

    let err = ctx.alloc(&mut buffer, DType::Float32).unwrap_err();
    assert!(matches!(err, Error::UnsupportedPlace { .. }), "unexpected error: {err}");
}

#[test]
fn out_of_range_device_rejected() {
    let err = DeviceContext::new(Arc::new(SoftRuntime::new("mock", 2)), 5).unwrap_err();
    assert!(matches!(err, Error::DeviceOutOfRange { .. }), "unexpected error: {err}");
}
