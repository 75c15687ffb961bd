//! Proptest strategies shared with downstream crates.

use proptest::prelude::*;
use strum::VariantArray;

use crate::DType;

/// Any element type.
pub fn dtype_strategy() -> impl Strategy<Value = DType> {
    proptest::sample::select(DType::VARIANTS)
}

/// Any non-bool element type.
pub fn numeric_dtype_strategy() -> impl Strategy<Value = DType> {
    let numeric: Vec<DType> = DType::VARIANTS.iter().copied().filter(|d| !d.is_bool()).collect();
    proptest::sample::select(numeric)
}
