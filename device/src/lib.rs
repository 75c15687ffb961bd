pub mod alloc;
pub mod buffer;
pub mod context;
#[cfg(feature = "cuda")]
pub mod cuda;
pub mod error;
pub mod pinned;
pub mod place;
pub mod registry;
pub mod runtime;
pub mod stream;

#[cfg(test)]
mod test;

pub use alloc::RawBuffer;
pub use buffer::Buffer;
pub use context::DeviceContext;
pub use error::{Error, Result};
pub use pinned::PinnedVec;
pub use place::{DeviceKind, Place};
pub use registry::registry;
pub use runtime::{DeviceRuntime, SoftRuntime};
pub use stream::Stream;
