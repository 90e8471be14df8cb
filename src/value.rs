//! Runtime values produced by absorption and consumed by generation.

use crate::ast::IntType;

/// A single decoded leaf value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    /// Bit-packed subfields, most significant first.
    Bits(Vec<u64>),
    Bytes(Vec<u8>),
}

impl Value {
    /// Build an integer value of type `ty`, or `None` if `n` does not fit.
    pub fn from_int(ty: IntType, n: i128) -> Option<Value> {
        Some(match ty {
            IntType::U8 => Value::U8(u8::try_from(n).ok()?),
            IntType::U16 => Value::U16(u16::try_from(n).ok()?),
            IntType::U32 => Value::U32(u32::try_from(n).ok()?),
            IntType::U64 => Value::U64(u64::try_from(n).ok()?),
            IntType::I8 => Value::I8(i8::try_from(n).ok()?),
            IntType::I16 => Value::I16(i16::try_from(n).ok()?),
            IntType::I32 => Value::I32(i32::try_from(n).ok()?),
            IntType::I64 => Value::I64(i64::try_from(n).ok()?),
        })
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::U8(x) => Some(*x as u64),
            Value::U16(x) => Some(*x as u64),
            Value::U32(x) => Some(*x as u64),
            Value::U64(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_i128().and_then(|n| i64::try_from(n).ok())
    }

    /// Any integer value, widened so unsigned 64-bit values compare correctly.
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Value::U8(x) => Some(*x as i128),
            Value::U16(x) => Some(*x as i128),
            Value::U32(x) => Some(*x as i128),
            Value::U64(x) => Some(*x as i128),
            Value::I8(x) => Some(*x as i128),
            Value::I16(x) => Some(*x as i128),
            Value::I32(x) => Some(*x as i128),
            Value::I64(x) => Some(*x as i128),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_bits(&self) -> Option<&[u64]> {
        match self {
            Value::Bits(v) => Some(v),
            _ => None,
        }
    }

    /// True for integers and bit-packed values (what metadata hooks extract).
    pub fn is_scalar(&self) -> bool {
        !matches!(self, Value::Bytes(_))
    }
}
