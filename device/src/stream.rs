//! Placement-scoped ordering handles for asynchronous transfers.
//!
//! The software stream is a FIFO of raw byte copies: transfers queue in
//! issue order and retire only when the owning runtime synchronizes the
//! stream. Until then nothing is visible to the host, which makes the
//! "visible after wait" contract observable in tests.

use parking_lot::Mutex;

#[cfg(feature = "cuda")]
use std::sync::Arc;

#[cfg(feature = "cuda")]
use cudarc::driver::CudaStream;

use crate::alloc::RawBuffer;

/// A byte copy queued on a software stream.
struct PendingCopy {
    dst: *mut u8,
    src: *const u8,
    len: usize,
}

// SAFETY: the pointers are only dereferenced inside `drain()`, which the
// owning context serializes; until then the referenced allocations are
// kept alive either by live buffers (caller obligation until synchronize)
// or by the stream's hold list.
unsafe impl Send for PendingCopy {}

/// FIFO of pending copies used by host-backed runtimes.
#[derive(Default)]
pub struct FifoStream {
    pending: Mutex<Vec<PendingCopy>>,
}

impl FifoStream {
    /// Queue a raw byte copy in issue order.
    ///
    /// # Safety
    ///
    /// `dst` and `src` must each cover `len` bytes and stay valid until
    /// the stream is drained.
    pub(crate) unsafe fn push(&self, dst: *mut u8, src: *const u8, len: usize) {
        self.pending.lock().push(PendingCopy { dst, src, len });
    }

    /// Execute every queued copy in issue order.
    pub(crate) fn drain(&self) {
        let ops = std::mem::take(&mut *self.pending.lock());
        for op in ops {
            if op.len == 0 {
                continue;
            }
            // SAFETY: push() requires the pointers to stay valid until the
            // drain; buffers are single-owner, so nothing aliases the
            // destination range concurrently.
            unsafe {
                std::ptr::copy_nonoverlapping(op.src, op.dst, op.len);
            }
        }
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }
}

impl std::fmt::Debug for FifoStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FifoStream").field("pending", &self.pending.lock().len()).finish()
    }
}

enum StreamImpl {
    Fifo(FifoStream),
    #[cfg(feature = "cuda")]
    Cuda(Arc<CudaStream>),
}

/// Ordering handle for one device's default execution queue.
///
/// Operations issued on the same stream retire in issue order; their
/// effects become visible to the host only after the owning runtime's
/// `synchronize`.
pub struct Stream {
    inner: StreamImpl,
    /// Allocations owned by in-flight transfers, released after the next
    /// synchronize.
    holds: Mutex<Vec<RawBuffer>>,
}

impl Stream {
    pub fn fifo() -> Self {
        Self { inner: StreamImpl::Fifo(FifoStream::default()), holds: Mutex::new(Vec::new()) }
    }

    #[cfg(feature = "cuda")]
    pub fn cuda(stream: Arc<CudaStream>) -> Self {
        Self { inner: StreamImpl::Cuda(stream), holds: Mutex::new(Vec::new()) }
    }

    /// The FIFO queue, if this is a software stream.
    pub fn fifo_queue(&self) -> Option<&FifoStream> {
        match &self.inner {
            StreamImpl::Fifo(queue) => Some(queue),
            #[cfg(feature = "cuda")]
            _ => None,
        }
    }

    #[cfg(feature = "cuda")]
    pub fn cuda_stream(&self) -> Option<&Arc<CudaStream>> {
        match &self.inner {
            StreamImpl::Cuda(stream) => Some(stream),
            _ => None,
        }
    }

    /// Hand an allocation to the stream until it is next synchronized.
    ///
    /// Used for engine-owned staging memory that an in-flight transfer
    /// still reads from; the release is sequenced after the wait, never
    /// before.
    pub fn retain(&self, raw: RawBuffer) {
        self.holds.lock().push(raw);
    }

    /// Drop every allocation retained for in-flight transfers. Called by
    /// runtimes at the end of `synchronize`.
    pub(crate) fn release_holds(&self) {
        self.holds.lock().clear();
    }

    /// Whether nothing is queued on this stream.
    pub fn is_idle(&self) -> bool {
        match &self.inner {
            StreamImpl::Fifo(queue) => queue.pending_len() == 0,
            #[cfg(feature = "cuda")]
            StreamImpl::Cuda(_) => true,
        }
    }
}

impl std::fmt::Debug for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.inner {
            StreamImpl::Fifo(_) => "fifo",
            #[cfg(feature = "cuda")]
            StreamImpl::Cuda(_) => "cuda",
        };
        f.debug_struct("Stream").field("kind", &kind).field("holds", &self.holds.lock().len()).finish()
    }
}
