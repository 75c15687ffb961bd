use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, InvalidDeviceSnafu, Result};

/// Identifier of an accelerator runtime kind.
///
/// Kinds form an open set (runtimes are registered by name), so this is a
/// normalized string rather than a closed enum. Comparison is exact; the
/// constructor lowercases so that `"GCU"` and `"gcu"` name the same kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceKind(Cow<'static, str>);

impl DeviceKind {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        let name = name.into();
        if name.bytes().any(|b| b.is_ascii_uppercase()) {
            Self(Cow::Owned(name.to_lowercase()))
        } else {
            Self(name)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for DeviceKind {
    fn from(name: &'static str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A memory location: host, or one device of a registered runtime kind.
///
/// Host never compares equal to any device place; two device places are
/// equal iff both kind and index match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Place {
    Host,
    Device { kind: DeviceKind, id: usize },
}

impl Place {
    pub fn device(kind: impl Into<DeviceKind>, id: usize) -> Self {
        Place::Device { kind: kind.into(), id }
    }

    pub const fn is_host(&self) -> bool {
        matches!(self, Place::Host)
    }

    /// Device index, if this is a device place.
    pub fn device_id(&self) -> Option<usize> {
        match self {
            Place::Host => None,
            Place::Device { id, .. } => Some(*id),
        }
    }

    pub fn kind(&self) -> Option<&DeviceKind> {
        match self {
            Place::Host => None,
            Place::Device { kind, .. } => Some(kind),
        }
    }
}

impl fmt::Display for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Place::Host => f.write_str("host"),
            Place::Device { kind, id } => write!(f, "{kind}:{id}"),
        }
    }
}

impl FromStr for Place {
    type Err = Error;

    /// Parses `"host"` (or `"cpu"`) and `"<kind>:<id>"`; a bare kind
    /// defaults to device 0. Case-insensitive.
    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_lowercase();
        if lower == "host" || lower == "cpu" {
            return Ok(Place::Host);
        }

        let (kind, id) = match lower.split_once(':') {
            Some((kind, id)) => {
                let id = id.parse().map_err(|_| Error::InvalidDevice { device: s.to_string() })?;
                (kind, id)
            }
            None => (lower.as_str(), 0),
        };
        snafu::ensure!(!kind.is_empty(), InvalidDeviceSnafu { device: s });

        Ok(Place::Device { kind: DeviceKind::new(kind.to_string()), id })
    }
}
