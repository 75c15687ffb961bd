//! The placement-aware copy engine.

use ferry_device::{Buffer, DeviceContext, Place};
use snafu::{ensure, ResultExt};

use crate::error::{
    DeviceSnafu, PlaceMismatchSnafu, Result, ScratchTooSmallSnafu, UnsupportedCopySnafu,
};

/// Copy `src` into `dst` at `dst_place`.
///
/// A non-host destination place is forced to `ctx`'s own device: a copy
/// cannot target an arbitrary device other than the context's bound one.
/// Transfers that involve a device are issued asynchronously on `ctx`'s
/// stream; with `blocking` the context is synchronized before returning,
/// otherwise the caller must not read `dst`, and must keep `src` alive,
/// until a later `ctx.wait()`. Host-to-host copies are synchronous.
///
/// A source without storage is a silent no-op. When the caller pre-aliased
/// `dst` to `src`'s storage (a shallow clone) and the placement matches,
/// the transfer is skipped if the shapes also match (or the data is
/// host-resident); a shape change over reused device storage instead
/// reallocates the destination before transferring.
pub fn copy(
    ctx: &DeviceContext,
    src: &Buffer,
    blocking: bool,
    dst: &mut Buffer,
    dst_place: &Place,
) -> Result<()> {
    let Some(src_ptr) = src.data_ptr() else {
        tracing::trace!(from = %src.place(), "source has no storage, nothing to copy");
        return Ok(());
    };
    let src_place = src.place().clone();

    let dst_place = if dst_place.is_host() { Place::Host } else { ctx.place().clone() };

    let prior_dims: Vec<usize> = dst.shape().to_vec();
    dst.resize(src.shape());
    let mut dst_ptr = if dst_place.is_host() {
        ctx.host_alloc(dst, src.dtype()).context(DeviceSnafu)?
    } else {
        ctx.alloc(dst, src.dtype()).context(DeviceSnafu)?
    };

    ensure!(
        dst.place() == &dst_place,
        PlaceMismatchSnafu { expected: dst_place.clone(), actual: dst.place().clone() }
    );

    let size = src.byte_size();

    if std::ptr::eq(src_ptr, dst_ptr as *const u8) && src_place == dst_place {
        if prior_dims == src.shape() || src_place.is_host() {
            tracing::trace!(ptr = ?src_ptr, place = %dst_place, "skip copy of shared storage");
            return Ok(());
        }
        // The caller reused the source's storage while changing the
        // destination's shape (scatter pattern): the destination keeps its
        // prior dims and receives fresh scratch storage before the
        // transfer.
        tracing::trace!(ptr = ?src_ptr, place = %dst_place, "shape change over reused storage");
        dst.resize(&prior_dims);
        dst.clear_storage();
        dst_ptr = ctx.alloc(dst, src.dtype()).context(DeviceSnafu)?;
        ensure!(
            dst.place() == &dst_place,
            PlaceMismatchSnafu { expected: dst_place.clone(), actual: dst.place().clone() }
        );
        ensure!(
            dst.byte_size() >= size,
            ScratchTooSmallSnafu { capacity: dst.byte_size(), needed: size }
        );
    }

    if size == 0 {
        return Ok(());
    }

    tracing::debug!(
        src = ?src_ptr,
        from = %src_place,
        dst = ?dst_ptr,
        to = %dst_place,
        bytes = size,
        blocking,
        "tensor copy"
    );

    let stream = ctx.stream();
    match (&src_place, &dst_place) {
        (Place::Host, Place::Device { id, .. }) => {
            // SAFETY: both allocations cover `size` bytes; `dst` owns its
            // storage and the caller keeps `src` alive until synchronize.
            unsafe { ctx.runtime().memcpy_h2d(*id, stream, dst_ptr, src_ptr, size) }
                .context(DeviceSnafu)?;
            if blocking {
                ctx.wait().context(DeviceSnafu)?;
            }
        }
        (Place::Device { id, .. }, Place::Host) => {
            // SAFETY: as above; the transfer is addressed to the source's
            // device.
            unsafe { ctx.runtime().memcpy_d2h(*id, stream, dst_ptr, src_ptr, size) }
                .context(DeviceSnafu)?;
            if blocking {
                ctx.wait().context(DeviceSnafu)?;
            }
        }
        (
            Place::Device { kind: src_kind, id: src_id },
            Place::Device { kind: dst_kind, id: dst_id },
        ) => {
            ensure!(
                src_kind == dst_kind && src_id == dst_id,
                UnsupportedCopySnafu { src: src_place.clone(), dst: dst_place.clone() }
            );
            // SAFETY: as above; both allocations live on the same device.
            unsafe { ctx.runtime().memcpy_d2d(*src_id, stream, dst_ptr, src_ptr, size) }
                .context(DeviceSnafu)?;
            if blocking {
                ctx.wait().context(DeviceSnafu)?;
            }
        }
        (Place::Host, Place::Host) => {
            // SAFETY: the shared-storage case returned above, so the
            // ranges are distinct allocations of at least `size` bytes.
            unsafe { std::ptr::copy_nonoverlapping(src_ptr, dst_ptr, size) };
        }
    }

    Ok(())
}

/// Re-place `buf` at `place`, copying through a snapshot of its current
/// state.
///
/// This is the same-object form of [`copy`]: when the requested place
/// equals the buffer's current place it is a no-op; otherwise a shallow
/// snapshot keeps the old storage alive while the buffer is reallocated
/// and filled at the new place. For a non-blocking call the snapshot's
/// allocation is parked on the stream so an in-flight transfer never
/// reads freed memory.
pub fn copy_to_place(
    ctx: &DeviceContext,
    buf: &mut Buffer,
    blocking: bool,
    place: &Place,
) -> Result<()> {
    if buf.data_ptr().is_none() {
        tracing::trace!(from = %buf.place(), "buffer has no storage, nothing to copy");
        return Ok(());
    }

    let target = if place.is_host() { Place::Host } else { ctx.place().clone() };
    if buf.place() == &target {
        tracing::trace!(ptr = ?buf.data_ptr(), place = %target, "skip copy to identical place");
        return Ok(());
    }

    tracing::trace!(from = %buf.place(), to = %target, "in-place copy via snapshot");
    let snapshot = buf.clone();
    copy(ctx, &snapshot, blocking, buf, &target)?;

    if !blocking {
        // The snapshot was the last handle on the old allocation; an
        // asynchronous transfer still reads from it, so the stream owns
        // it until the next synchronize.
        if let Some(raw) = snapshot.release_storage() {
            ctx.stream().retain(raw);
        }
    }

    Ok(())
}
