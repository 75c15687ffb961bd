use crate::DType;

/// Maps a Rust primitive to its element-type tag.
///
/// `Float16`/`BFloat16` have no implementor: nothing on the host side
/// produces them natively, they only travel as raw bytes.
pub trait HasDType {
    const DTYPE: DType;
}

macro_rules! has_dtype {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl HasDType for $ty {
                const DTYPE: DType = DType::$variant;
            }
        )*
    };
}

has_dtype! {
    bool => Bool,
    i8 => Int8,
    u8 => UInt8,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
}
