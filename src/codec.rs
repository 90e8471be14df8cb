//! Value codec: fixed-width integers, bit-packed subfields and byte strings to and from raw
//! buffers.
//!
//! The codec knows nothing about structure. It reads or writes one leaf at a given offset and
//! checks the leaf's own value constraint; length dependencies between siblings are the
//! [absorption engine](crate::absorb)'s business.

use crate::ast::{BitFieldSpec, Constraint, ConstraintKind, IntType, ValueSpec, ValueType};
use crate::value::Value;
use byteorder::{BigEndian, ByteOrder, LittleEndian};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endianness {
    #[default]
    Big,
    Little,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("truncated input at offset {offset}: need {needed} byte(s), {available} available")]
    TruncatedInput { offset: usize, needed: usize, available: usize },
    #[error("value rejected: {0}")]
    ValueRejected(String),
    #[error("{node}: instance shape does not match its {mode} definition")]
    ShapeMismatch { node: String, mode: String },
}

/// Decode one leaf at `offset` and check its value constraint.
///
/// Byte strings without a fixed width take the rest of `buf`.
pub fn decode_value(buf: &[u8], offset: usize, spec: &ValueSpec) -> Result<(Value, usize), CodecError> {
    let (value, consumed) = read_value(buf, offset, spec, None)?;
    check_value(&value, &spec.constraint)?;
    Ok((value, consumed))
}

/// Decode one leaf without any constraint check. `len` overrides the width of byte strings.
pub fn read_value(
    buf: &[u8],
    offset: usize,
    spec: &ValueSpec,
    len: Option<usize>,
) -> Result<(Value, usize), CodecError> {
    match spec.ty {
        ValueType::Int(ty) => {
            let b = take(buf, offset, ty.width())?;
            let v = match spec.endianness {
                Endianness::Big => read_int::<BigEndian>(ty, b),
                Endianness::Little => read_int::<LittleEndian>(ty, b),
            };
            Ok((v, ty.width()))
        }
        ValueType::Bytes => {
            let n = len
                .or_else(|| spec.fixed_width())
                .unwrap_or_else(|| buf.len().saturating_sub(offset));
            let b = take(buf, offset, n)?;
            Ok((Value::Bytes(b.to_vec()), n))
        }
    }
}

/// Check a value against an enumeration, a range, or a static byte-string size bound.
/// Dependency-bearing constraints are resolved by the engine and pass here.
pub fn check_value(v: &Value, c: &Constraint) -> Result<(), CodecError> {
    if c.depends_on.is_some() {
        return Ok(());
    }
    match &c.kind {
        ConstraintKind::Unconstrained => Ok(()),
        ConstraintKind::ValueEnumerated(_) | ConstraintKind::ValueRanged { .. } => {
            let n = v
                .as_i128()
                .ok_or_else(|| CodecError::ValueRejected("expected an integer".to_string()))?;
            check_int(n, c)
        }
        ConstraintKind::SizeExact(_) | ConstraintKind::SizeBounded { .. } => {
            let len = match v {
                Value::Bytes(b) => b.len() as u64,
                _ => return Ok(()),
            };
            check_size(len, c)
        }
    }
}

fn check_int(n: i128, c: &Constraint) -> Result<(), CodecError> {
    match &c.kind {
        ConstraintKind::ValueEnumerated(allowed) => {
            if allowed.iter().any(|&a| a as i128 == n) {
                Ok(())
            } else {
                Err(CodecError::ValueRejected(format!("{} not in {:?}", n, allowed)))
            }
        }
        ConstraintKind::ValueRanged { min, max } => {
            if n >= *min as i128 && n <= *max as i128 {
                Ok(())
            } else {
                Err(CodecError::ValueRejected(format!("{} not in [{}, {}]", n, min, max)))
            }
        }
        _ => Ok(()),
    }
}

fn check_size(len: u64, c: &Constraint) -> Result<(), CodecError> {
    match c.kind {
        ConstraintKind::SizeExact(n) if len != n => Err(CodecError::ValueRejected(format!(
            "size {} differs from exact size {}",
            len, n
        ))),
        ConstraintKind::SizeBounded { min, max } if len < min || max.is_some_and(|m| len > m) => {
            Err(CodecError::ValueRejected(format!(
                "size {} outside [{}, {:?}]",
                len, min, max
            )))
        }
        _ => Ok(()),
    }
}

/// Encode one leaf. Rejects values that do not fit the type or violate the value constraint.
pub fn encode_value(v: &Value, spec: &ValueSpec) -> Result<Vec<u8>, CodecError> {
    match spec.ty {
        ValueType::Int(ty) => {
            let n = v
                .as_i128()
                .ok_or_else(|| CodecError::ValueRejected(format!("expected an integer, got {:?}", v)))?;
            encode_int(n, ty, spec)
        }
        ValueType::Bytes => {
            let b = v
                .as_bytes()
                .ok_or_else(|| CodecError::ValueRejected(format!("expected bytes, got {:?}", v)))?;
            check_value(v, &spec.constraint)?;
            Ok(b.to_vec())
        }
    }
}

/// Encode an integer for an integer leaf (used for computed lengths and counts).
pub fn encode_int(n: i128, ty: IntType, spec: &ValueSpec) -> Result<Vec<u8>, CodecError> {
    if n < ty.min_value() || n > ty.max_value() {
        return Err(CodecError::ValueRejected(format!("{} does not fit {:?}", n, ty)));
    }
    check_int(n, &spec.constraint)?;
    let mut out = vec![0u8; ty.width()];
    match spec.endianness {
        Endianness::Big => write_int::<BigEndian>(ty, n, &mut out),
        Endianness::Little => write_int::<LittleEndian>(ty, n, &mut out),
    }
    Ok(out)
}

/// Decode a bit-packed container into its subfields (no bound check).
pub fn decode_bits(buf: &[u8], offset: usize, spec: &BitFieldSpec) -> Result<(Value, usize), CodecError> {
    let width = spec.width();
    let b = take(buf, offset, width)?;
    let raw = match spec.endianness {
        Endianness::Big => BigEndian::read_uint(b, width),
        Endianness::Little => LittleEndian::read_uint(b, width),
    };
    let mut fields = Vec::with_capacity(spec.subfields.len());
    let mut used = 0u32;
    for s in &spec.subfields {
        used += s.width;
        let shift = spec.total_bits - used;
        fields.push((raw >> shift) & mask(s.width));
    }
    Ok((Value::Bits(fields), width))
}

/// Check every subfield against its `[min, max]`.
pub fn check_bits(v: &Value, spec: &BitFieldSpec) -> Result<(), CodecError> {
    let fields = v
        .as_bits()
        .ok_or_else(|| CodecError::ValueRejected(format!("expected bit subfields, got {:?}", v)))?;
    if fields.len() != spec.subfields.len() {
        return Err(CodecError::ValueRejected(format!(
            "{} subfield(s), expected {}",
            fields.len(),
            spec.subfields.len()
        )));
    }
    for (x, s) in fields.iter().zip(&spec.subfields) {
        if *x < s.min || *x > s.max {
            return Err(CodecError::ValueRejected(format!(
                "{}: {} not in [{}, {}]",
                s.label, x, s.min, s.max
            )));
        }
    }
    Ok(())
}

pub fn encode_bits(v: &Value, spec: &BitFieldSpec) -> Result<Vec<u8>, CodecError> {
    check_bits(v, spec)?;
    let fields = v.as_bits().unwrap_or_default();
    let mut raw = 0u64;
    let mut used = 0u32;
    for (x, s) in fields.iter().zip(&spec.subfields) {
        used += s.width;
        raw |= (x & mask(s.width)) << (spec.total_bits - used);
    }
    let mut out = vec![0u8; spec.width()];
    match spec.endianness {
        Endianness::Big => BigEndian::write_uint(&mut out, raw, spec.width()),
        Endianness::Little => LittleEndian::write_uint(&mut out, raw, spec.width()),
    }
    Ok(out)
}

fn mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

fn take(buf: &[u8], offset: usize, n: usize) -> Result<&[u8], CodecError> {
    let available = buf.len().saturating_sub(offset);
    if available < n {
        return Err(CodecError::TruncatedInput { offset, needed: n, available });
    }
    Ok(&buf[offset..offset + n])
}

fn read_int<B: ByteOrder>(ty: IntType, b: &[u8]) -> Value {
    match ty {
        IntType::U8 => Value::U8(b[0]),
        IntType::U16 => Value::U16(B::read_u16(b)),
        IntType::U32 => Value::U32(B::read_u32(b)),
        IntType::U64 => Value::U64(B::read_u64(b)),
        IntType::I8 => Value::I8(b[0] as i8),
        IntType::I16 => Value::I16(B::read_i16(b)),
        IntType::I32 => Value::I32(B::read_i32(b)),
        IntType::I64 => Value::I64(B::read_i64(b)),
    }
}

// `n` is range-checked by the caller.
fn write_int<B: ByteOrder>(ty: IntType, n: i128, out: &mut [u8]) {
    match ty {
        IntType::U8 => out[0] = n as u8,
        IntType::U16 => B::write_u16(out, n as u16),
        IntType::U32 => B::write_u32(out, n as u32),
        IntType::U64 => B::write_u64(out, n as u64),
        IntType::I8 => out[0] = n as i8 as u8,
        IntType::I16 => B::write_i16(out, n as i16),
        IntType::I32 => B::write_i32(out, n as i32),
        IntType::I64 => B::write_i64(out, n as i64),
    }
}
