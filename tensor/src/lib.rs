//! Placement-aware tensor data movement.
//!
//! The copy engine ([`copy`], [`copy_to_place`]) moves a buffer between
//! host memory and accelerator devices, deciding per call whether a copy
//! is needed at all, how the destination is allocated, which transfer
//! primitive applies, and whether the transfer blocks or stays queued on
//! the context's stream. The conversion adapters in [`convert`] layer
//! host-sequence entry points on top of it.

pub mod convert;
pub mod copy;
pub mod error;
pub mod layout;

#[cfg(test)]
mod test;

pub use convert::{
    fill_bool_constant, fill_constant, from_bool_scalar, from_bool_slice, from_pinned_slice,
    from_raw_parts, from_scalar, from_slice, host_values, to_bool_vec, to_vec,
};
pub use copy::{copy, copy_to_place};
pub use error::{Error, Result};
pub use layout::{canonical_axis, extract_ncdhw, DataLayout};
