//! Adapters between host sequences and device buffers.
//!
//! Numeric entry points are generic over `T: HasDType + Pod` and move
//! bytes directly; boolean sequences take a separate materialize-to-bytes
//! path, because device storage holds one byte per `bool` and raw device
//! bytes must be validated before they become `bool`s again. Every
//! boolean path synchronizes the context before its temporary is
//! released.

use bytemuck::{Pod, Zeroable};
use ferry_device::{Buffer, DeviceContext, PinnedVec, Place};
use ferry_dtype::ext::HasDType;
use ferry_dtype::DType;
use snafu::{ensure, ResultExt};

use crate::copy;
use crate::error::{DTypeMismatchSnafu, DeviceSnafu, Result, UnsupportedSnafu};

/// Wrap a single scalar as a rank-0 buffer on `ctx`'s device.
///
/// The value is staged through a pinned element owned by the stream, so
/// the call stays asynchronous without reading a dead stack slot.
pub fn from_scalar<T: HasDType + Pod>(
    ctx: &DeviceContext,
    value: T,
    dst: &mut Buffer,
) -> Result<()> {
    let Some(device_id) = ctx.place().device_id() else {
        return UnsupportedSnafu { operation: "from_scalar", place: ctx.place().clone() }.fail();
    };

    dst.resize(&[]);
    let dst_ptr = ctx.alloc(dst, T::DTYPE).context(DeviceSnafu)?;
    let size = std::mem::size_of::<T>();
    if size == 0 {
        return Ok(());
    }

    let staging = PinnedVec::from_slice(ctx, std::slice::from_ref(&value)).context(DeviceSnafu)?;
    // SAFETY: both allocations cover `size` bytes; the staging element is
    // parked on the stream below, the destination owns its storage.
    unsafe {
        ctx.runtime().memcpy_h2d(device_id, ctx.stream(), dst_ptr, staging.as_ptr() as *const u8, size)
    }
    .context(DeviceSnafu)?;
    ctx.stream().retain(staging.into_raw());
    Ok(())
}

/// Wrap a single `bool` as a rank-0 buffer on `ctx`'s device.
pub fn from_bool_scalar(ctx: &DeviceContext, value: bool, dst: &mut Buffer) -> Result<()> {
    let Some(device_id) = ctx.place().device_id() else {
        return UnsupportedSnafu { operation: "from_bool_scalar", place: ctx.place().clone() }.fail();
    };

    dst.resize(&[]);
    let dst_ptr = ctx.alloc(dst, DType::Bool).context(DeviceSnafu)?;
    let byte = [value as u8];
    // SAFETY: one byte on either side; the temporary outlives the
    // transfer because of the wait below.
    unsafe { ctx.runtime().memcpy_h2d(device_id, ctx.stream(), dst_ptr, byte.as_ptr(), 1) }
        .context(DeviceSnafu)?;
    // The temporary lives on this stack frame; it must not be released
    // before the transfer retires.
    ctx.wait().context(DeviceSnafu)?;
    Ok(())
}

/// Pinned host sequence → rank-1 buffer on `ctx`'s device.
///
/// Asynchronous: the caller keeps `src` alive until the context is next
/// synchronized.
pub fn from_pinned_slice<T: HasDType + Pod>(
    ctx: &DeviceContext,
    src: &PinnedVec<T>,
    dst: &mut Buffer,
) -> Result<()> {
    let Some(device_id) = ctx.place().device_id() else {
        return UnsupportedSnafu { operation: "from_pinned_slice", place: ctx.place().clone() }
            .fail();
    };

    dst.resize(&[src.len()]);
    let dst_ptr = ctx.alloc(dst, T::DTYPE).context(DeviceSnafu)?;
    let size = src.byte_len();
    if size == 0 {
        return Ok(());
    }

    // SAFETY: both allocations cover `size` bytes; caller keeps `src`
    // alive until synchronize.
    unsafe {
        ctx.runtime().memcpy_h2d(device_id, ctx.stream(), dst_ptr, src.as_ptr() as *const u8, size)
    }
    .context(DeviceSnafu)
}

/// Plain host sequence → rank-1 buffer.
///
/// On a device-bound context the sequence is first copied into a pinned
/// staging vector (asynchronous host-to-device transfers are only well
/// defined from pinned memory); the stream owns the staging until the
/// transfer retires. On a host-bound context this is a synchronous host
/// copy.
pub fn from_slice<T: HasDType + Pod>(ctx: &DeviceContext, src: &[T], dst: &mut Buffer) -> Result<()> {
    match ctx.place() {
        Place::Device { .. } => {
            let staging = PinnedVec::from_slice(ctx, src).context(DeviceSnafu)?;
            from_pinned_slice(ctx, &staging, dst)?;
            ctx.stream().retain(staging.into_raw());
            Ok(())
        }
        Place::Host => {
            dst.resize(&[src.len()]);
            let bytes: &[u8] = bytemuck::cast_slice(src);
            if bytes.is_empty() {
                return Ok(());
            }
            let dst_ptr = ctx.host_alloc(dst, T::DTYPE).context(DeviceSnafu)?;
            tracing::trace!(src = ?bytes.as_ptr(), dst = ?dst_ptr, bytes = bytes.len(), "host sequence copy");
            // SAFETY: the destination was just sized to bytes.len().
            unsafe { std::ptr::copy_nonoverlapping(bytes.as_ptr(), dst_ptr, bytes.len()) };
            Ok(())
        }
    }
}

/// Boolean host sequence → rank-1 buffer on `ctx`'s device.
///
/// The sequence is materialized into a contiguous byte temporary first;
/// the context is synchronized before the temporary is released. Moving a
/// boolean sequence between two host contexts is not supported.
pub fn from_bool_slice(ctx: &DeviceContext, src: &[bool], dst: &mut Buffer) -> Result<()> {
    let Some(device_id) = ctx.place().device_id() else {
        return UnsupportedSnafu { operation: "from_bool_slice", place: ctx.place().clone() }.fail();
    };

    let array: Vec<u8> = src.iter().map(|b| *b as u8).collect();

    dst.resize(&[src.len()]);
    let dst_ptr = ctx.alloc(dst, DType::Bool).context(DeviceSnafu)?;
    if array.is_empty() {
        return Ok(());
    }

    // SAFETY: both allocations cover array.len() bytes; the temporary
    // outlives the transfer because of the wait below.
    unsafe { ctx.runtime().memcpy_h2d(device_id, ctx.stream(), dst_ptr, array.as_ptr(), array.len()) }
        .context(DeviceSnafu)?;
    // Release of the temporary is sequenced after the wait, never before.
    ctx.wait().context(DeviceSnafu)?;
    drop(array);
    Ok(())
}

/// Unmanaged pointer/length pair → rank-1 buffer on `ctx`'s device.
///
/// The core never takes ownership of the source memory.
///
/// # Safety
///
/// `src` must point to `len` initialized elements that stay valid until
/// the context is next synchronized; the transfer is asynchronous.
pub unsafe fn from_raw_parts<T: HasDType + Pod>(
    ctx: &DeviceContext,
    src: *const T,
    len: usize,
    dst: &mut Buffer,
) -> Result<()> {
    let Some(device_id) = ctx.place().device_id() else {
        return UnsupportedSnafu { operation: "from_raw_parts", place: ctx.place().clone() }.fail();
    };

    dst.resize(&[len]);
    let dst_ptr = ctx.alloc(dst, T::DTYPE).context(DeviceSnafu)?;
    let size = len * std::mem::size_of::<T>();

    // SAFETY: caller upholds the pointer obligations; primitives tolerate
    // a zero byte count.
    unsafe {
        ctx.runtime().memcpy_h2d(device_id, ctx.stream(), dst_ptr, src as *const u8, size)
    }
    .context(DeviceSnafu)
}

/// Device buffer → host `Vec`. Always synchronizes before returning, so
/// the result is immediately visible.
pub fn to_vec<T: HasDType + Pod>(ctx: &DeviceContext, src: &Buffer) -> Result<Vec<T>> {
    ensure!(
        src.dtype() == T::DTYPE,
        DTypeMismatchSnafu { requested: T::DTYPE, actual: src.dtype() }
    );
    let Some(device_id) = src.place().device_id() else {
        return UnsupportedSnafu { operation: "to_vec", place: src.place().clone() }.fail();
    };

    let numel = src.numel();
    let mut out = vec![T::zeroed(); numel];
    if numel == 0 {
        return Ok(out);
    }
    let src_ptr = src.data_ptr().ok_or(ferry_device::Error::NotAllocated).context(DeviceSnafu)?;
    let size = numel * std::mem::size_of::<T>();

    // SAFETY: `out` holds `numel` elements and outlives the wait below.
    unsafe { ctx.runtime().memcpy_d2h(device_id, ctx.stream(), out.as_mut_ptr() as *mut u8, src_ptr, size) }
        .context(DeviceSnafu)?;
    ctx.wait().context(DeviceSnafu)?;
    Ok(out)
}

/// Boolean device buffer → host `Vec<bool>`, read through a byte
/// temporary and validated (`byte != 0`).
pub fn to_bool_vec(ctx: &DeviceContext, src: &Buffer) -> Result<Vec<bool>> {
    ensure!(
        src.dtype() == DType::Bool,
        DTypeMismatchSnafu { requested: DType::Bool, actual: src.dtype() }
    );
    let Some(device_id) = src.place().device_id() else {
        return UnsupportedSnafu { operation: "to_bool_vec", place: src.place().clone() }.fail();
    };

    let numel = src.numel();
    if numel == 0 {
        return Ok(Vec::new());
    }
    let src_ptr = src.data_ptr().ok_or(ferry_device::Error::NotAllocated).context(DeviceSnafu)?;

    let mut array = vec![0u8; numel];
    // SAFETY: `array` holds `numel` bytes and outlives the wait below.
    unsafe { ctx.runtime().memcpy_d2h(device_id, ctx.stream(), array.as_mut_ptr(), src_ptr, numel) }
        .context(DeviceSnafu)?;
    ctx.wait().context(DeviceSnafu)?;
    Ok(array.into_iter().map(|b| b != 0).collect())
}

/// Fill `dst` with `dst.numel()` copies of `value` via a pinned constant
/// sequence. The destination's shape is preserved.
pub fn fill_constant<T: HasDType + Pod>(ctx: &DeviceContext, dst: &mut Buffer, value: T) -> Result<()> {
    let numel = dst.numel();
    let shape: Vec<usize> = dst.shape().to_vec();

    let staging = PinnedVec::filled(ctx, value, numel).context(DeviceSnafu)?;
    from_pinned_slice(ctx, &staging, dst)?;
    ctx.stream().retain(staging.into_raw());

    dst.resize(&shape);
    Ok(())
}

/// Fill a boolean buffer with `dst.numel()` copies of `value`.
pub fn fill_bool_constant(ctx: &DeviceContext, dst: &mut Buffer, value: bool) -> Result<()> {
    let numel = dst.numel();
    let shape: Vec<usize> = dst.shape().to_vec();

    let src = vec![value; numel];
    from_bool_slice(ctx, &src, dst)?;

    dst.resize(&shape);
    Ok(())
}

/// Read a buffer's values on the host, copying device-resident buffers
/// back with a blocking copy first.
pub fn host_values<T: HasDType + Pod>(ctx: &DeviceContext, src: &Buffer) -> Result<Vec<T>> {
    ensure!(
        src.dtype() == T::DTYPE,
        DTypeMismatchSnafu { requested: T::DTYPE, actual: src.dtype() }
    );
    if src.place().is_host() {
        return src.host_vec::<T>().context(DeviceSnafu);
    }

    let mut staged = Buffer::new(T::DTYPE);
    copy::copy(ctx, src, true, &mut staged, &Place::Host)?;
    staged.host_vec::<T>().context(DeviceSnafu)
}
