use snafu::Snafu;

use crate::place::Place;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Operation invoked against a placement it does not support.
    #[snafu(display("{operation} on {place} is not supported"))]
    UnsupportedPlace { operation: String, place: Place },

    /// Invalid device specification.
    #[snafu(display("invalid device: {device}"))]
    InvalidDevice { device: String },

    #[snafu(display("no runtime registered for device kind '{kind}'"))]
    UnknownKind { kind: String },

    #[snafu(display("device id {id} out of range for kind '{kind}' ({count} devices)"))]
    DeviceOutOfRange { kind: String, id: usize, count: usize },

    /// Stream handed to a runtime that did not create it.
    #[snafu(display("stream does not belong to this runtime"))]
    ForeignStream,

    /// Buffer is not allocated.
    #[snafu(display("buffer not allocated"))]
    NotAllocated,

    #[snafu(display("buffer holds {actual:?}, requested {requested:?}"))]
    DTypeMismatch { requested: ferry_dtype::DType, actual: ferry_dtype::DType },

    #[cfg(feature = "cuda")]
    /// CUDA-specific errors.
    #[snafu(display("CUDA error: {source}"))]
    Cuda { source: cudarc::driver::DriverError },
}
