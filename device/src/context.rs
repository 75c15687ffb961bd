use std::rc::Rc;
use std::sync::Arc;

use ferry_dtype::DType;
use snafu::ensure;

use crate::buffer::Buffer;
use crate::error::{Result, UnsupportedPlaceSnafu};
use crate::place::Place;
use crate::runtime::DeviceRuntime;
use crate::stream::Stream;

/// Execution context bound to one place.
///
/// Owns the device's default stream; created once per device by the
/// registry and reused for the process lifetime. Allocation goes through
/// the context so that a buffer's placement always tracks its storage.
#[derive(Debug)]
pub struct DeviceContext {
    place: Place,
    runtime: Arc<dyn DeviceRuntime>,
    stream: Stream,
}

impl DeviceContext {
    /// Context for device `device_id` of `runtime`.
    pub fn new(runtime: Arc<dyn DeviceRuntime>, device_id: usize) -> Result<Self> {
        let count = runtime.device_count();
        ensure!(
            device_id < count,
            crate::error::DeviceOutOfRangeSnafu {
                kind: runtime.kind().as_str(),
                id: device_id,
                count,
            }
        );
        let place = Place::Device { kind: runtime.kind().clone(), id: device_id };
        let stream = runtime.create_stream(device_id)?;
        Ok(Self { place, runtime, stream })
    }

    /// Host-bound context: pinned allocation and synchronous host copies
    /// only.
    pub(crate) fn host(runtime: Arc<dyn DeviceRuntime>) -> Self {
        Self { place: Place::Host, runtime, stream: Stream::fifo() }
    }

    pub fn place(&self) -> &Place {
        &self.place
    }

    pub fn stream(&self) -> &Stream {
        &self.stream
    }

    pub fn runtime(&self) -> &dyn DeviceRuntime {
        self.runtime.as_ref()
    }

    /// Block until every operation issued on this context's stream has
    /// completed, then release allocations parked on the stream.
    pub fn wait(&self) -> Result<()> {
        self.runtime.synchronize(&self.stream)
    }

    /// Allocate `buffer`'s storage at this context's device place, sized
    /// to its current shape, and tag it with `dtype`.
    ///
    /// Reuses the existing allocation when both placement and byte size
    /// already match; otherwise the previous allocation is replaced. A
    /// zero byte size clears storage and returns a null pointer.
    pub fn alloc(&self, buffer: &mut Buffer, dtype: DType) -> Result<*mut u8> {
        ensure!(
            !self.place.is_host(),
            UnsupportedPlaceSnafu { operation: "device allocation", place: self.place.clone() }
        );
        self.alloc_at(buffer, dtype, self.place.clone())
    }

    /// Allocate `buffer`'s storage in pinned host memory.
    pub fn host_alloc(&self, buffer: &mut Buffer, dtype: DType) -> Result<*mut u8> {
        self.alloc_at(buffer, dtype, Place::Host)
    }

    fn alloc_at(&self, buffer: &mut Buffer, dtype: DType, place: Place) -> Result<*mut u8> {
        buffer.set_dtype(dtype);
        let needed = buffer.byte_size();

        if needed == 0 {
            buffer.set_storage(None, place);
            return Ok(std::ptr::null_mut());
        }

        if let Some(raw) = buffer.storage() {
            if raw.len() == needed && buffer.place() == &place {
                return Ok(raw.as_mut_ptr());
            }
        }

        let raw = match &place {
            Place::Host => self.runtime.alloc_pinned(needed)?,
            Place::Device { id, .. } => self.runtime.alloc(*id, needed)?,
        };
        let ptr = raw.as_mut_ptr();
        buffer.set_storage(Some(Rc::new(raw)), place);
        Ok(ptr)
    }
}
