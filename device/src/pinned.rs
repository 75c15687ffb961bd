use std::marker::PhantomData;

use bytemuck::Pod;

use crate::alloc::RawBuffer;
use crate::context::DeviceContext;
use crate::error::Result;

/// A typed sequence in page-locked host memory.
///
/// Asynchronous host-to-device transfers are only well defined from
/// pinned memory, so sequence adapters stage through this type. The `Pod`
/// bound keeps non-byte-addressable element types (`bool`) out at compile
/// time; boolean sequences take the byte-materialization path instead.
pub struct PinnedVec<T: Pod> {
    raw: RawBuffer,
    len: usize,
    _marker: PhantomData<T>,
}

impl<T: Pod> PinnedVec<T> {
    /// Allocate pinned storage through `ctx`'s runtime and copy `src` in.
    pub fn from_slice(ctx: &DeviceContext, src: &[T]) -> Result<Self> {
        let bytes: &[u8] = bytemuck::cast_slice(src);
        let raw = ctx.runtime().alloc_pinned(bytes.len())?;
        if !bytes.is_empty() {
            // SAFETY: the allocation is exactly bytes.len() long and
            // freshly owned by `raw`.
            unsafe { std::ptr::copy_nonoverlapping(bytes.as_ptr(), raw.as_mut_ptr(), bytes.len()) };
        }
        Ok(Self { raw, len: src.len(), _marker: PhantomData })
    }

    /// Allocate pinned storage holding `len` copies of `value`.
    pub fn filled(ctx: &DeviceContext, value: T, len: usize) -> Result<Self> {
        let raw = ctx.runtime().alloc_pinned(len * std::mem::size_of::<T>())?;
        let base = raw.as_mut_ptr() as *mut T;
        for i in 0..len {
            // SAFETY: the allocation holds `len` elements of T and `Pod`
            // guarantees T has no alignment surprises beyond its size.
            unsafe { base.add(i).write_unaligned(value) };
        }
        Ok(Self { raw, len, _marker: PhantomData })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn byte_len(&self) -> usize {
        self.len * std::mem::size_of::<T>()
    }

    pub fn as_ptr(&self) -> *const T {
        self.raw.as_ptr() as *const T
    }

    /// Element at `i`. The pinned allocation is byte-aligned, so elements
    /// are read unaligned.
    pub fn get(&self, i: usize) -> T {
        assert!(i < self.len, "index {i} out of bounds for length {}", self.len);
        // SAFETY: the allocation holds `len` valid elements written at
        // construction.
        unsafe { (self.as_ptr()).add(i).read_unaligned() }
    }

    pub fn to_vec(&self) -> Vec<T> {
        (0..self.len).map(|i| self.get(i)).collect()
    }

    /// Give up the underlying allocation, e.g. to park it on a stream
    /// until an in-flight transfer retires.
    pub fn into_raw(self) -> RawBuffer {
        self.raw
    }
}

impl<T: Pod + std::fmt::Debug> std::fmt::Debug for PinnedVec<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.to_vec()).finish()
    }
}
