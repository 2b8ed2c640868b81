use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::model::CimInstanceName;

/// The fixed set of CIM data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CimType {
    Boolean,
    String,
    Char16,
    Uint8,
    Sint8,
    Uint16,
    Sint16,
    Uint32,
    Sint32,
    Uint64,
    Sint64,
    Real32,
    Real64,
    Datetime,
    Reference,
}

impl CimType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::String => "string",
            Self::Char16 => "char16",
            Self::Uint8 => "uint8",
            Self::Sint8 => "sint8",
            Self::Uint16 => "uint16",
            Self::Sint16 => "sint16",
            Self::Uint32 => "uint32",
            Self::Sint32 => "sint32",
            Self::Uint64 => "uint64",
            Self::Sint64 => "sint64",
            Self::Real32 => "real32",
            Self::Real64 => "real64",
            Self::Datetime => "datetime",
            Self::Reference => "reference",
        }
    }
}

impl fmt::Display for CimType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed CIM value. Arrays are homogeneous lists of scalar values.
///
/// Equality and hashing are computed from the current payload; reals compare
/// by bit pattern so that values used in key bindings hash consistently.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum CimValue {
    Boolean(bool),
    String(String),
    Char16(char),
    Uint8(u8),
    Sint8(i8),
    Uint16(u16),
    Sint16(i16),
    Uint32(u32),
    Sint32(i32),
    Uint64(u64),
    Sint64(i64),
    Real32(f32),
    Real64(f64),
    /// CIM datetime or interval in its 25 character string form.
    Datetime(String),
    Reference(Box<CimInstanceName>),
    Array(Vec<CimValue>),
}

impl CimValue {
    /// Type of the value; for arrays the element type, `None` for an empty array.
    pub fn cim_type(&self) -> Option<CimType> {
        Some(match self {
            Self::Boolean(_) => CimType::Boolean,
            Self::String(_) => CimType::String,
            Self::Char16(_) => CimType::Char16,
            Self::Uint8(_) => CimType::Uint8,
            Self::Sint8(_) => CimType::Sint8,
            Self::Uint16(_) => CimType::Uint16,
            Self::Sint16(_) => CimType::Sint16,
            Self::Uint32(_) => CimType::Uint32,
            Self::Sint32(_) => CimType::Sint32,
            Self::Uint64(_) => CimType::Uint64,
            Self::Sint64(_) => CimType::Sint64,
            Self::Real32(_) => CimType::Real32,
            Self::Real64(_) => CimType::Real64,
            Self::Datetime(_) => CimType::Datetime,
            Self::Reference(_) => CimType::Reference,
            Self::Array(items) => return items.first().and_then(CimValue::cim_type),
        })
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::Datetime(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&CimInstanceName> {
        match self {
            Self::Reference(path) => Some(path),
            _ => None,
        }
    }

    pub fn reference(path: CimInstanceName) -> Self {
        Self::Reference(Box::new(path))
    }

    fn discriminant(&self) -> u8 {
        match self {
            Self::Boolean(_) => 0,
            Self::String(_) => 1,
            Self::Char16(_) => 2,
            Self::Uint8(_) => 3,
            Self::Sint8(_) => 4,
            Self::Uint16(_) => 5,
            Self::Sint16(_) => 6,
            Self::Uint32(_) => 7,
            Self::Sint32(_) => 8,
            Self::Uint64(_) => 9,
            Self::Sint64(_) => 10,
            Self::Real32(_) => 11,
            Self::Real64(_) => 12,
            Self::Datetime(_) => 13,
            Self::Reference(_) => 14,
            Self::Array(_) => 15,
        }
    }
}

impl PartialEq for CimValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Char16(a), Self::Char16(b)) => a == b,
            (Self::Uint8(a), Self::Uint8(b)) => a == b,
            (Self::Sint8(a), Self::Sint8(b)) => a == b,
            (Self::Uint16(a), Self::Uint16(b)) => a == b,
            (Self::Sint16(a), Self::Sint16(b)) => a == b,
            (Self::Uint32(a), Self::Uint32(b)) => a == b,
            (Self::Sint32(a), Self::Sint32(b)) => a == b,
            (Self::Uint64(a), Self::Uint64(b)) => a == b,
            (Self::Sint64(a), Self::Sint64(b)) => a == b,
            (Self::Real32(a), Self::Real32(b)) => a.to_bits() == b.to_bits(),
            (Self::Real64(a), Self::Real64(b)) => a.to_bits() == b.to_bits(),
            (Self::Datetime(a), Self::Datetime(b)) => a == b,
            (Self::Reference(a), Self::Reference(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for CimValue {}

impl Hash for CimValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.discriminant().hash(state);
        match self {
            Self::Boolean(v) => v.hash(state),
            Self::String(v) | Self::Datetime(v) => v.hash(state),
            Self::Char16(v) => v.hash(state),
            Self::Uint8(v) => v.hash(state),
            Self::Sint8(v) => v.hash(state),
            Self::Uint16(v) => v.hash(state),
            Self::Sint16(v) => v.hash(state),
            Self::Uint32(v) => v.hash(state),
            Self::Sint32(v) => v.hash(state),
            Self::Uint64(v) => v.hash(state),
            Self::Sint64(v) => v.hash(state),
            Self::Real32(v) => v.to_bits().hash(state),
            Self::Real64(v) => v.to_bits().hash(state),
            Self::Reference(v) => v.hash(state),
            Self::Array(v) => v.hash(state),
        }
    }
}

/// Renders the value the way it appears in a WBEM URI key binding.
impl fmt::Display for CimValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(v) => write!(f, "{}", if *v { "TRUE" } else { "FALSE" }),
            Self::String(v) | Self::Datetime(v) => {
                write!(f, "\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\""))
            }
            Self::Char16(v) => write!(f, "'{v}'"),
            Self::Uint8(v) => write!(f, "{v}"),
            Self::Sint8(v) => write!(f, "{v}"),
            Self::Uint16(v) => write!(f, "{v}"),
            Self::Sint16(v) => write!(f, "{v}"),
            Self::Uint32(v) => write!(f, "{v}"),
            Self::Sint32(v) => write!(f, "{v}"),
            Self::Uint64(v) => write!(f, "{v}"),
            Self::Sint64(v) => write!(f, "{v}"),
            Self::Real32(v) => write!(f, "{v}"),
            Self::Real64(v) => write!(f, "{v}"),
            Self::Reference(path) => {
                let rendered = path.to_string();
                write!(f, "\"{}\"", rendered.replace('\\', "\\\\").replace('"', "\\\""))
            }
            Self::Array(items) => {
                write!(f, "{{")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<bool> for CimValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<&str> for CimValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for CimValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<u8> for CimValue {
    fn from(value: u8) -> Self {
        Self::Uint8(value)
    }
}

impl From<u16> for CimValue {
    fn from(value: u16) -> Self {
        Self::Uint16(value)
    }
}

impl From<u32> for CimValue {
    fn from(value: u32) -> Self {
        Self::Uint32(value)
    }
}

impl From<i32> for CimValue {
    fn from(value: i32) -> Self {
        Self::Sint32(value)
    }
}

impl From<u64> for CimValue {
    fn from(value: u64) -> Self {
        Self::Uint64(value)
    }
}

impl From<i64> for CimValue {
    fn from(value: i64) -> Self {
        Self::Sint64(value)
    }
}

impl From<f64> for CimValue {
    fn from(value: f64) -> Self {
        Self::Real64(value)
    }
}

impl From<CimInstanceName> for CimValue {
    fn from(value: CimInstanceName) -> Self {
        Self::reference(value)
    }
}
