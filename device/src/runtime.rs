//! The collaborator contract every accelerator runtime provides, and the
//! host-backed reference runtime.
//!
//! The primitive signatures mirror the C plugin ABI the movement layer
//! was designed against: raw byte copies addressed to an explicit device
//! index and stream. The engine never reimplements them; it only decides
//! which one to call.

use std::fmt;

use snafu::ensure;

use crate::alloc::RawBuffer;
use crate::error::{DeviceOutOfRangeSnafu, Error, Result};
use crate::place::DeviceKind;
use crate::stream::{FifoStream, Stream};

/// One accelerator runtime: allocation plus raw transfer primitives.
///
/// Each primitive must be safe to call with `len == 0`.
pub trait DeviceRuntime: Send + Sync + fmt::Debug {
    /// Kind under which this runtime's devices are addressed.
    fn kind(&self) -> &DeviceKind;

    /// Number of devices this runtime exposes.
    fn device_count(&self) -> usize;

    /// Create the default stream for `device_id`.
    fn create_stream(&self, device_id: usize) -> Result<Stream>;

    /// Allocate `len` bytes of device memory on `device_id`.
    fn alloc(&self, device_id: usize, len: usize) -> Result<RawBuffer>;

    /// Allocate `len` bytes of page-locked host memory.
    fn alloc_pinned(&self, len: usize) -> Result<RawBuffer>;

    /// Queue an asynchronous host-to-device copy on `stream`.
    ///
    /// # Safety
    ///
    /// `dst` and `src` must each cover `len` bytes and stay valid until
    /// `stream` is synchronized.
    unsafe fn memcpy_h2d(
        &self,
        device_id: usize,
        stream: &Stream,
        dst: *mut u8,
        src: *const u8,
        len: usize,
    ) -> Result<()>;

    /// Queue an asynchronous device-to-host copy on `stream`.
    ///
    /// # Safety
    ///
    /// Same pointer obligations as [`DeviceRuntime::memcpy_h2d`].
    unsafe fn memcpy_d2h(
        &self,
        device_id: usize,
        stream: &Stream,
        dst: *mut u8,
        src: *const u8,
        len: usize,
    ) -> Result<()>;

    /// Queue an asynchronous device-to-device copy on `stream`. Both
    /// allocations must live on `device_id`.
    ///
    /// # Safety
    ///
    /// Same pointer obligations as [`DeviceRuntime::memcpy_h2d`].
    unsafe fn memcpy_d2d(
        &self,
        device_id: usize,
        stream: &Stream,
        dst: *mut u8,
        src: *const u8,
        len: usize,
    ) -> Result<()>;

    /// Block until every operation issued on `stream` has retired.
    fn synchronize(&self, stream: &Stream) -> Result<()>;
}

/// Host-backed reference runtime.
///
/// Device memory is an ordinary heap allocation tagged with its device
/// place, and the stream is a software FIFO, so transfers follow the same
/// issue-order/visible-after-wait rules as a hardware runtime. Useful for
/// tests and for running device-placed code without an accelerator.
#[derive(Debug)]
pub struct SoftRuntime {
    kind: DeviceKind,
    device_count: usize,
}

impl SoftRuntime {
    pub fn new(kind: impl Into<DeviceKind>, device_count: usize) -> Self {
        Self { kind: kind.into(), device_count }
    }

    fn queue<'a>(&self, stream: &'a Stream) -> Result<&'a FifoStream> {
        stream.fifo_queue().ok_or(Error::ForeignStream)
    }

    fn check_device(&self, device_id: usize) -> Result<()> {
        ensure!(
            device_id < self.device_count,
            DeviceOutOfRangeSnafu { kind: self.kind.as_str(), id: device_id, count: self.device_count }
        );
        Ok(())
    }
}

impl DeviceRuntime for SoftRuntime {
    fn kind(&self) -> &DeviceKind {
        &self.kind
    }

    fn device_count(&self) -> usize {
        self.device_count
    }

    fn create_stream(&self, _device_id: usize) -> Result<Stream> {
        Ok(Stream::fifo())
    }

    fn alloc(&self, device_id: usize, len: usize) -> Result<RawBuffer> {
        self.check_device(device_id)?;
        Ok(RawBuffer::device(len, self.kind.clone(), device_id))
    }

    fn alloc_pinned(&self, len: usize) -> Result<RawBuffer> {
        Ok(RawBuffer::pinned(len))
    }

    unsafe fn memcpy_h2d(
        &self,
        device_id: usize,
        stream: &Stream,
        dst: *mut u8,
        src: *const u8,
        len: usize,
    ) -> Result<()> {
        self.check_device(device_id)?;
        let queue = self.queue(stream)?;
        // SAFETY: caller upholds the pointer obligations until synchronize.
        unsafe { queue.push(dst, src, len) };
        Ok(())
    }

    unsafe fn memcpy_d2h(
        &self,
        device_id: usize,
        stream: &Stream,
        dst: *mut u8,
        src: *const u8,
        len: usize,
    ) -> Result<()> {
        self.check_device(device_id)?;
        let queue = self.queue(stream)?;
        // SAFETY: caller upholds the pointer obligations until synchronize.
        unsafe { queue.push(dst, src, len) };
        Ok(())
    }

    unsafe fn memcpy_d2d(
        &self,
        device_id: usize,
        stream: &Stream,
        dst: *mut u8,
        src: *const u8,
        len: usize,
    ) -> Result<()> {
        self.check_device(device_id)?;
        let queue = self.queue(stream)?;
        // SAFETY: caller upholds the pointer obligations until synchronize.
        unsafe { queue.push(dst, src, len) };
        Ok(())
    }

    fn synchronize(&self, stream: &Stream) -> Result<()> {
        self.queue(stream)?.drain();
        stream.release_holds();
        Ok(())
    }
}
