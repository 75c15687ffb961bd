//! CUDA runtime backed by `cudarc`.

use std::collections::HashMap;
use std::sync::Arc;

use cudarc::driver::{result, CudaContext, DevicePtr};
use parking_lot::Mutex;
use snafu::ResultExt;

use crate::alloc::RawBuffer;
use crate::error::{CudaSnafu, Error, Result};
use crate::place::DeviceKind;
use crate::runtime::DeviceRuntime;
use crate::stream::Stream;

#[derive(Debug)]
pub struct CudaRuntime {
    kind: DeviceKind,
    device_count: usize,
    contexts: Mutex<HashMap<usize, Arc<CudaContext>>>,
}

impl CudaRuntime {
    pub fn new() -> Result<Self> {
        result::init().context(CudaSnafu)?;
        let device_count = result::device::get_count().context(CudaSnafu)? as usize;
        Ok(Self { kind: DeviceKind::new("cuda"), device_count, contexts: Mutex::new(HashMap::new()) })
    }

    fn cuda_context(&self, device_id: usize) -> Result<Arc<CudaContext>> {
        let mut contexts = self.contexts.lock();
        if let Some(ctx) = contexts.get(&device_id) {
            return Ok(Arc::clone(ctx));
        }
        let ctx = CudaContext::new(device_id).context(CudaSnafu)?;
        contexts.insert(device_id, Arc::clone(&ctx));
        Ok(ctx)
    }

    fn cu_stream(stream: &Stream) -> Result<cudarc::driver::sys::CUstream> {
        Ok(stream.cuda_stream().ok_or(Error::ForeignStream)?.cu_stream())
    }
}

impl DeviceRuntime for CudaRuntime {
    fn kind(&self) -> &DeviceKind {
        &self.kind
    }

    fn device_count(&self) -> usize {
        self.device_count
    }

    fn create_stream(&self, device_id: usize) -> Result<Stream> {
        let ctx = self.cuda_context(device_id)?;
        Ok(Stream::cuda(ctx.default_stream()))
    }

    fn alloc(&self, device_id: usize, len: usize) -> Result<RawBuffer> {
        let ctx = self.cuda_context(device_id)?;
        let stream = ctx.default_stream();
        // SAFETY: the slice is only ever written through transfer
        // primitives before being read.
        let data = unsafe { stream.alloc::<u8>(len) }.context(CudaSnafu)?;
        let (ptr, _sync) = data.device_ptr(&stream);
        Ok(RawBuffer::Cuda { data, ptr, context: ctx, id: device_id })
    }

    fn alloc_pinned(&self, len: usize) -> Result<RawBuffer> {
        // Staging through pageable memory; transfers stay correct because
        // issue order and synchronization are unchanged.
        Ok(RawBuffer::pinned(len))
    }

    unsafe fn memcpy_h2d(
        &self,
        _device_id: usize,
        stream: &Stream,
        dst: *mut u8,
        src: *const u8,
        len: usize,
    ) -> Result<()> {
        if len == 0 {
            return Ok(());
        }
        let cu_stream = Self::cu_stream(stream)?;
        let src = unsafe { std::slice::from_raw_parts(src, len) };
        unsafe { result::memcpy_htod_async(dst as u64, src, cu_stream) }.context(CudaSnafu)
    }

    unsafe fn memcpy_d2h(
        &self,
        _device_id: usize,
        stream: &Stream,
        dst: *mut u8,
        src: *const u8,
        len: usize,
    ) -> Result<()> {
        if len == 0 {
            return Ok(());
        }
        let cu_stream = Self::cu_stream(stream)?;
        let dst = unsafe { std::slice::from_raw_parts_mut(dst, len) };
        unsafe { result::memcpy_dtoh_async(dst, src as u64, cu_stream) }.context(CudaSnafu)
    }

    unsafe fn memcpy_d2d(
        &self,
        _device_id: usize,
        stream: &Stream,
        dst: *mut u8,
        src: *const u8,
        len: usize,
    ) -> Result<()> {
        if len == 0 {
            return Ok(());
        }
        let cu_stream = Self::cu_stream(stream)?;
        unsafe { result::memcpy_dtod_async(dst as u64, src as u64, len, cu_stream) }
            .context(CudaSnafu)
    }

    fn synchronize(&self, stream: &Stream) -> Result<()> {
        stream.cuda_stream().ok_or(Error::ForeignStream)?.synchronize().context(CudaSnafu)?;
        stream.release_holds();
        Ok(())
    }
}
