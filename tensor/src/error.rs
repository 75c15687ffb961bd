use snafu::Snafu;

use ferry_device::Place;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Failure in the device layer.
    #[snafu(display("device error"))]
    Device { source: ferry_device::Error },

    /// Copy direction the engine does not implement: device-to-device
    /// across device indices or across device kinds.
    #[snafu(display("copy from {src} to {dst} is not supported"))]
    UnsupportedCopy { src: Place, dst: Place },

    /// Adapter entry point invoked against a placement it does not
    /// support.
    #[snafu(display("{operation} on {place} is not supported"))]
    Unsupported { operation: &'static str, place: Place },

    /// Destination placement after allocation does not match the
    /// normalized placement. Indicates an internal bug.
    #[snafu(display("destination resolved to {actual}, expected {expected}"))]
    PlaceMismatch { expected: Place, actual: Place },

    /// Scratch storage in the reused-storage path cannot hold the
    /// transfer. Indicates an internal bug.
    #[snafu(display("scratch storage of {capacity} bytes cannot hold a {needed}-byte transfer"))]
    ScratchTooSmall { capacity: usize, needed: usize },

    #[snafu(display("buffer holds {actual:?}, requested {requested:?}"))]
    DTypeMismatch { requested: ferry_dtype::DType, actual: ferry_dtype::DType },

    #[snafu(display("layout {layout} is not supported"))]
    UnknownLayout { layout: String },
}
