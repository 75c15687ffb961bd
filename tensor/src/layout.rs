//! Layout-string parsing and axis utilities consumed by kernel glue.

use std::str::FromStr;

use crate::error::{Error, Result, UnknownLayoutSnafu};

/// Memory layout of a dense tensor's dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataLayout {
    Nchw,
    Nhwc,
    AnyLayout,
    SparseCoo,
    SparseCsr,
}

impl FromStr for DataLayout {
    type Err = Error;

    /// Case-insensitive parse of layout names.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "NCHW" => Ok(Self::Nchw),
            "NHWC" => Ok(Self::Nhwc),
            "ANYLAYOUT" => Ok(Self::AnyLayout),
            "SPARSE_COO" => Ok(Self::SparseCoo),
            "SPARSE_CSR" => Ok(Self::SparseCsr),
            _ => UnknownLayoutSnafu { layout: s }.fail(),
        }
    }
}

/// Normalize a possibly negative axis against `rank`.
pub const fn canonical_axis(axis: isize, rank: usize) -> isize {
    if axis < 0 {
        axis + rank as isize
    } else {
        axis
    }
}

/// Extract `(n, c, d, h, w)` from 3/4/5-rank dims, honoring channel-first
/// vs channel-last layout. Missing spatial dims read as 1.
pub fn extract_ncdhw(dims: &[usize], layout: DataLayout) -> (usize, usize, usize, usize, usize) {
    let channel_first = layout == DataLayout::Nchw;
    let n = dims[0];

    match dims.len() {
        3 => {
            let c = if channel_first { dims[1] } else { dims[2] };
            let w = if channel_first { dims[2] } else { dims[1] };
            (n, c, 1, 1, w)
        }
        4 => {
            let c = if channel_first { dims[1] } else { dims[3] };
            let h = if channel_first { dims[2] } else { dims[1] };
            let w = if channel_first { dims[3] } else { dims[2] };
            (n, c, 1, h, w)
        }
        _ => {
            let c = if channel_first { dims[1] } else { dims[4] };
            let d = if channel_first { dims[2] } else { dims[1] };
            let h = if channel_first { dims[3] } else { dims[2] };
            let w = if channel_first { dims[4] } else { dims[3] };
            (n, c, d, h, w)
        }
    }
}
