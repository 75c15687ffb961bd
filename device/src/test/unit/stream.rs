use std::sync::Arc;

use ferry_dtype::DType;

use crate::buffer::Buffer;
use crate::context::DeviceContext;
use crate::runtime::SoftRuntime;

fn context() -> DeviceContext {
    DeviceContext::new(Arc::new(SoftRuntime::new("fifo", 1)), 0).unwrap()
}

#[test]
fn transfers_are_deferred_until_wait() {
    let ctx = context();
    let src = Buffer::from_host_slice(&[7u8, 8, 9]);

    let mut dst = Buffer::new(DType::UInt8);
    dst.resize(&[3]);
    let dst_ptr = ctx.alloc(&mut dst, DType::UInt8).unwrap();

    // SAFETY: both buffers outlive the wait below.
    unsafe {
        ctx.runtime()
            .memcpy_h2d(0, ctx.stream(), dst_ptr, src.data_ptr().unwrap(), 3)
            .unwrap();
    }

    assert!(!ctx.stream().is_idle(), "the copy must be queued, not executed");
    // Device storage of the software runtime is host-backed, so the
    // not-yet-visible state is directly observable.
    let staged = unsafe { std::slice::from_raw_parts(dst.data_ptr().unwrap(), 3).to_vec() };
    assert_eq!(staged, vec![0, 0, 0], "nothing is visible before wait");

    ctx.wait().unwrap();
    assert!(ctx.stream().is_idle());
    let visible = unsafe { std::slice::from_raw_parts(dst.data_ptr().unwrap(), 3).to_vec() };
    assert_eq!(visible, vec![7, 8, 9]);
}

#[test]
fn issue_order_is_preserved() {
    let ctx = context();
    let a = Buffer::from_host_slice(&[1u8, 2, 3, 4]);

    let mut b = Buffer::new(DType::UInt8);
    b.resize(&[4]);
    let b_ptr = ctx.alloc(&mut b, DType::UInt8).unwrap();
    let mut c = Buffer::new(DType::UInt8);
    c.resize(&[4]);
    let c_ptr = ctx.alloc(&mut c, DType::UInt8).unwrap();

    // a -> b, then b -> c: the second copy only sees a's bytes if the
    // queue retires in issue order.
    unsafe {
        ctx.runtime().memcpy_h2d(0, ctx.stream(), b_ptr, a.data_ptr().unwrap(), 4).unwrap();
        ctx.runtime().memcpy_d2d(0, ctx.stream(), c_ptr, b_ptr, 4).unwrap();
    }
    ctx.wait().unwrap();

    let visible = unsafe { std::slice::from_raw_parts(c.data_ptr().unwrap(), 4).to_vec() };
    assert_eq!(visible, vec![1, 2, 3, 4]);
}

#[test]
fn zero_length_transfers_are_tolerated() {
    let ctx = context();
    unsafe {
        ctx.runtime()
            .memcpy_h2d(0, ctx.stream(), std::ptr::null_mut(), std::ptr::null(), 0)
            .unwrap();
    }
    ctx.wait().unwrap();
}

#[test]
fn retained_allocations_survive_until_wait() {
    let ctx = context();
    let staging = crate::alloc::RawBuffer::pinned(4);
    let staging_ptr = staging.as_mut_ptr();
    unsafe { std::ptr::write_bytes(staging_ptr, 0x5a, 4) };

    let mut dst = Buffer::new(DType::UInt8);
    dst.resize(&[4]);
    ctx.alloc(&mut dst, DType::UInt8).unwrap();
    let dst_ptr = dst.data_mut_ptr().unwrap();

    unsafe {
        ctx.runtime().memcpy_h2d(0, ctx.stream(), dst_ptr, staging_ptr, 4).unwrap();
    }
    // The transfer still reads from the staging allocation; the stream
    // owns it from here until the wait.
    ctx.stream().retain(staging);

    ctx.wait().unwrap();
    let visible = unsafe { std::slice::from_raw_parts(dst.data_ptr().unwrap(), 4).to_vec() };
    assert_eq!(visible, vec![0x5a; 4]);
}
