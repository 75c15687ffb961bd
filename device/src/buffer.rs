use std::rc::Rc;

use bytemuck::{Pod, Zeroable};
use ferry_dtype::ext::HasDType;
use ferry_dtype::DType;
use smallvec::SmallVec;
use snafu::ensure;

use crate::alloc::RawBuffer;
use crate::error::{DTypeMismatchSnafu, NotAllocatedSnafu, Result, UnsupportedPlaceSnafu};
use crate::place::Place;

/// A typed, resizable memory region with a known placement.
///
/// Storage is `Rc`-shared: cloning a buffer is a shallow copy that shares
/// the allocation, which is how snapshots for in-place re-placement (and
/// the caller-aliased fast path in the copy engine) are expressed. The
/// `Rc` also makes buffers `!Send + !Sync`, matching the single-owner
/// mutation model: exactly one owner mutates a buffer at a time.
#[derive(Debug, Clone)]
pub struct Buffer {
    dtype: DType,
    shape: SmallVec<[usize; 4]>,
    place: Place,
    storage: Option<Rc<RawBuffer>>,
}

impl Buffer {
    /// Create an empty, unallocated buffer.
    pub fn new(dtype: DType) -> Self {
        Self { dtype, shape: SmallVec::new(), place: Place::Host, storage: None }
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn place(&self) -> &Place {
        &self.place
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Number of elements. A rank-0 buffer holds one scalar.
    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn byte_size(&self) -> usize {
        self.numel() * self.dtype.bytes()
    }

    /// Set the logical shape. Does not allocate; a later allocation sizes
    /// storage to the new element count.
    pub fn resize(&mut self, shape: &[usize]) {
        self.shape = SmallVec::from_slice(shape);
    }

    /// Pointer to the first byte of storage, if allocated.
    pub fn data_ptr(&self) -> Option<*const u8> {
        self.storage.as_ref().map(|raw| raw.as_ptr())
    }

    pub fn data_mut_ptr(&self) -> Option<*mut u8> {
        self.storage.as_ref().map(|raw| raw.as_mut_ptr())
    }

    pub fn is_allocated(&self) -> bool {
        self.storage.is_some()
    }

    /// Whether two buffers share one underlying allocation.
    pub fn shares_storage_with(&self, other: &Buffer) -> bool {
        match (&self.storage, &other.storage) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Drop this buffer's handle on its storage. The allocation is freed
    /// once no other buffer shares it.
    pub fn clear_storage(&mut self) {
        self.storage = None;
    }

    /// Consume the buffer, returning its allocation when no other buffer
    /// shares it. Lets a caller park storage on a stream while an
    /// in-flight transfer still references it.
    pub fn release_storage(self) -> Option<RawBuffer> {
        self.storage.and_then(|rc| Rc::try_unwrap(rc).ok())
    }

    pub(crate) fn storage(&self) -> Option<&Rc<RawBuffer>> {
        self.storage.as_ref()
    }

    pub(crate) fn set_storage(&mut self, storage: Option<Rc<RawBuffer>>, place: Place) {
        self.storage = storage;
        self.place = place;
    }

    pub(crate) fn set_dtype(&mut self, dtype: DType) {
        self.dtype = dtype;
    }

    /// Host buffer holding a copy of `src`, shaped `[src.len()]`.
    pub fn from_host_slice<T: HasDType + Pod>(src: &[T]) -> Self {
        let mut buffer = Self::new(T::DTYPE);
        buffer.resize(&[src.len()]);
        let bytes: &[u8] = bytemuck::cast_slice(src);
        if !bytes.is_empty() {
            let raw = RawBuffer::host(bytes.len());
            // SAFETY: the allocation is exactly bytes.len() long.
            unsafe { std::ptr::copy_nonoverlapping(bytes.as_ptr(), raw.as_mut_ptr(), bytes.len()) };
            buffer.storage = Some(Rc::new(raw));
        }
        buffer
    }

    /// Host buffer of element type `Bool` holding a copy of `src`.
    ///
    /// Stored one byte per element, `0` or `1`.
    pub fn from_host_bools(src: &[bool]) -> Self {
        let mut buffer = Self::new(DType::Bool);
        buffer.resize(&[src.len()]);
        if !src.is_empty() {
            let raw = RawBuffer::host(src.len());
            let base = raw.as_mut_ptr();
            for (i, value) in src.iter().enumerate() {
                // SAFETY: the allocation holds src.len() bytes.
                unsafe { base.add(i).write(*value as u8) };
            }
            buffer.storage = Some(Rc::new(raw));
        }
        buffer
    }

    /// Copy of the host-resident storage as raw bytes.
    pub fn host_bytes(&self) -> Result<Vec<u8>> {
        ensure!(
            self.place.is_host(),
            UnsupportedPlaceSnafu { operation: "host read", place: self.place.clone() }
        );
        match &self.storage {
            Some(raw) => Ok(raw.copy_out(self.byte_size())),
            None if self.byte_size() == 0 => Ok(Vec::new()),
            None => NotAllocatedSnafu.fail(),
        }
    }

    /// Copy of the host-resident storage as typed values.
    pub fn host_vec<T: HasDType + Pod>(&self) -> Result<Vec<T>> {
        ensure!(
            self.dtype == T::DTYPE,
            DTypeMismatchSnafu { requested: T::DTYPE, actual: self.dtype }
        );
        let bytes = self.host_bytes()?;
        let mut out = vec![T::zeroed(); self.numel()];
        // Host storage is byte-aligned, so go through a fresh, properly
        // aligned Vec<T> rather than casting the byte buffer in place.
        bytemuck::cast_slice_mut::<T, u8>(&mut out).copy_from_slice(&bytes);
        Ok(out)
    }

    /// Copy of host-resident `Bool` storage as `bool`s (`byte != 0`).
    pub fn host_bools(&self) -> Result<Vec<bool>> {
        ensure!(
            self.dtype == DType::Bool,
            DTypeMismatchSnafu { requested: DType::Bool, actual: self.dtype }
        );
        Ok(self.host_bytes()?.into_iter().map(|b| b != 0).collect())
    }
}
