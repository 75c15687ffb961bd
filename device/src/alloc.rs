use std::cell::RefCell;

#[cfg(feature = "cuda")]
use std::sync::Arc;

#[cfg(feature = "cuda")]
use cudarc::driver::{CudaContext, CudaSlice};

use crate::place::DeviceKind;

/// Owned storage behind a buffer.
///
/// Uses `RefCell` for interior mutability with runtime borrow checking;
/// safe for single-threaded use (`Buffer` is `!Send + !Sync`). The heap
/// block of a host-backed variant does not move while the `RawBuffer` is
/// alive, so raw pointers taken from it stay valid until it is dropped.
#[derive(Debug)]
pub enum RawBuffer {
    /// Pageable host memory.
    Host { data: RefCell<Box<[u8]>> },
    /// Page-locked host memory. Software runtimes back this with an
    /// ordinary heap allocation.
    Pinned { data: RefCell<Box<[u8]>> },
    /// Accelerator memory owned by a software runtime.
    Device { data: RefCell<Box<[u8]>>, kind: DeviceKind, id: usize },
    #[cfg(feature = "cuda")]
    Cuda { data: CudaSlice<u8>, ptr: u64, context: Arc<CudaContext>, id: usize },
}

impl RawBuffer {
    pub fn host(len: usize) -> Self {
        RawBuffer::Host { data: RefCell::new(vec![0u8; len].into_boxed_slice()) }
    }

    pub fn pinned(len: usize) -> Self {
        RawBuffer::Pinned { data: RefCell::new(vec![0u8; len].into_boxed_slice()) }
    }

    pub fn device(len: usize, kind: DeviceKind, id: usize) -> Self {
        RawBuffer::Device { data: RefCell::new(vec![0u8; len].into_boxed_slice()), kind, id }
    }

    /// Size of the allocation in bytes.
    pub fn len(&self) -> usize {
        match self {
            RawBuffer::Host { data } | RawBuffer::Pinned { data } | RawBuffer::Device { data, .. } => {
                data.borrow().len()
            }
            #[cfg(feature = "cuda")]
            RawBuffer::Cuda { data, .. } => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stable pointer to the first byte of the allocation.
    pub fn as_ptr(&self) -> *const u8 {
        match self {
            RawBuffer::Host { data } | RawBuffer::Pinned { data } | RawBuffer::Device { data, .. } => {
                data.borrow().as_ptr()
            }
            #[cfg(feature = "cuda")]
            RawBuffer::Cuda { ptr, .. } => *ptr as *const u8,
        }
    }

    pub fn as_mut_ptr(&self) -> *mut u8 {
        match self {
            RawBuffer::Host { data } | RawBuffer::Pinned { data } | RawBuffer::Device { data, .. } => {
                data.borrow_mut().as_mut_ptr()
            }
            #[cfg(feature = "cuda")]
            RawBuffer::Cuda { ptr, .. } => *ptr as *mut u8,
        }
    }

    /// Copy of the first `len` bytes. Host-backed variants only.
    pub(crate) fn copy_out(&self, len: usize) -> Vec<u8> {
        match self {
            RawBuffer::Host { data } | RawBuffer::Pinned { data } | RawBuffer::Device { data, .. } => {
                data.borrow()[..len].to_vec()
            }
            #[cfg(feature = "cuda")]
            RawBuffer::Cuda { .. } => unreachable!("host-backed storage expected"),
        }
    }
}
