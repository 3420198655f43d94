//! Typed data streams: one homogeneous channel of a sub-mesh.
//!
//! Source values are held at full width (`i64` or `f64`) and narrowed to
//! the declared [`ElementType`] only when written:
//!
//! - integer narrowing wraps, keeping the low-order bits of the target
//!   width (two's complement), so `300` written as `UInt8` is `44` and
//!   `-1` written as `UInt16` is `0xffff`;
//! - `f64` to `f32` rounds to nearest, values beyond the `f32` range
//!   become infinities and NaN stays NaN;
//! - integer sources may be written as float element types (rounded);
//! - float sources can not be written as integer element types, that is
//!   rejected when the stream is created.

use std::io::Write;

use crate::io::{WireWrite, len_u32};
use crate::write::WriteError;

/// Size of the stream header: role, element type, payload length.
pub const STREAM_HEADER_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StreamRole {
    Vertices = 1,
    Triangles = 2,
    Uvs = 3,
    VertexNormals = 4,
    VertexTangents = 5,
    JointIndices = 6,
    VertexWeights = 7,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ElementType {
    Int8 = 1,
    Int16 = 2,
    Int32 = 3,
    UInt8 = 4,
    UInt16 = 5,
    UInt32 = 6,
    Float32 = 7,
    Float64 = 8,
}

impl ElementType {
    pub const fn size(self) -> usize {
        match self {
            ElementType::Int8 | ElementType::UInt8 => 1,
            ElementType::Int16 | ElementType::UInt16 => 2,
            ElementType::Int32 | ElementType::UInt32 | ElementType::Float32 => 4,
            ElementType::Float64 => 8,
        }
    }

    pub const fn is_float(self) -> bool {
        matches!(self, ElementType::Float32 | ElementType::Float64)
    }
}

/// Full-width source values of a stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamData {
    Int(Vec<i64>),
    Float(Vec<f64>),
}

impl StreamData {
    pub fn len(&self) -> usize {
        match self {
            StreamData::Int(v) => v.len(),
            StreamData::Float(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<i64>> for StreamData {
    fn from(v: Vec<i64>) -> Self {
        StreamData::Int(v)
    }
}

impl From<Vec<u32>> for StreamData {
    fn from(v: Vec<u32>) -> Self {
        StreamData::Int(v.into_iter().map(i64::from).collect())
    }
}

impl From<Vec<f64>> for StreamData {
    fn from(v: Vec<f64>) -> Self {
        StreamData::Float(v)
    }
}

impl From<Vec<f32>> for StreamData {
    fn from(v: Vec<f32>) -> Self {
        StreamData::Float(v.into_iter().map(f64::from).collect())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataStream {
    role: StreamRole,
    element_type: ElementType,
    data: StreamData,
}

impl DataStream {
    /// Create a stream of `count` elements.
    ///
    /// `count` must equal the number of source values.
    pub fn new(
        role: StreamRole,
        element_type: ElementType,
        data: impl Into<StreamData>,
        count: usize,
    ) -> Result<Self, WriteError> {
        let data = data.into();
        if data.len() != count {
            return Err(WriteError::ElementCountMismatch {
                declared: count,
                actual: data.len(),
            });
        }
        if matches!(data, StreamData::Float(_)) && !element_type.is_float() {
            return Err(WriteError::ElementTypeMismatch {
                role,
                element_type,
            });
        }
        Ok(Self {
            role,
            element_type,
            data,
        })
    }

    pub fn role(&self) -> StreamRole {
        self.role
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    pub fn data(&self) -> &StreamData {
        &self.data
    }

    pub fn count(&self) -> usize {
        self.data.len()
    }

    pub fn payload_len(&self) -> usize {
        self.count() * self.element_type.size()
    }

    pub fn calc_length(&self) -> usize {
        STREAM_HEADER_LEN + self.payload_len()
    }

    pub fn write<W: Write + ?Sized>(&self, w: &mut W) -> Result<(), WriteError> {
        let payload_len = len_u32("stream payload", self.payload_len())?;
        w.put_u8(self.role as u8)?;
        w.put_u8(self.element_type as u8)?;
        w.put_u32(payload_len)?;
        match &self.data {
            StreamData::Int(values) => {
                for v in values.iter() {
                    write_int(w, self.element_type, *v)?;
                }
            }
            StreamData::Float(values) => {
                for v in values.iter() {
                    write_float(w, self.role, self.element_type, *v)?;
                }
            }
        }
        Ok(())
    }
}

fn write_int<W: Write + ?Sized>(
    w: &mut W,
    ty: ElementType,
    v: i64,
) -> std::io::Result<()> {
    match ty {
        ElementType::Int8 => w.put_i8(v as i8),
        ElementType::Int16 => w.put_i16(v as i16),
        ElementType::Int32 => w.put_i32(v as i32),
        ElementType::UInt8 => w.put_u8(v as u8),
        ElementType::UInt16 => w.put_u16(v as u16),
        ElementType::UInt32 => w.put_u32(v as u32),
        ElementType::Float32 => w.put_f32(v as f32),
        ElementType::Float64 => w.put_f64(v as f64),
    }
}

fn write_float<W: Write + ?Sized>(
    w: &mut W,
    role: StreamRole,
    ty: ElementType,
    v: f64,
) -> Result<(), WriteError> {
    match ty {
        ElementType::Float32 => w.put_f32(v as f32)?,
        ElementType::Float64 => w.put_f64(v)?,
        _ => {
            return Err(WriteError::ElementTypeMismatch {
                role,
                element_type: ty,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(stream: &DataStream) -> Vec<u8> {
        let mut buf: Vec<u8> = vec![];
        stream.write(&mut buf).unwrap();
        assert_eq!(buf.len(), stream.calc_length());
        buf
    }

    #[test]
    fn float_data_with_int_type_fails_to_write() {
        // bypasses the check in `new`
        let s = DataStream {
            role: StreamRole::Vertices,
            element_type: ElementType::Int16,
            data: StreamData::Float(vec![1.5]),
        };
        let mut buf: Vec<u8> = vec![];
        let err = s.write(&mut buf).unwrap_err();
        assert!(matches!(
            err,
            WriteError::ElementTypeMismatch {
                role: StreamRole::Vertices,
                element_type: ElementType::Int16,
            }
        ));
    }

    #[test]
    fn header_layout() {
        let s = DataStream::new(
            StreamRole::Triangles,
            ElementType::UInt16,
            vec![0u32, 1, 2],
            3,
        )
        .unwrap();
        assert_eq!(encode(&s), [2, 5, 6, 0, 0, 0, 0, 0, 1, 0, 2, 0]);
    }

    #[test]
    fn integer_narrowing_wraps() {
        let s = DataStream::new(
            StreamRole::JointIndices,
            ElementType::UInt8,
            vec![300i64, -1, 255],
            3,
        )
        .unwrap();
        assert_eq!(&encode(&s)[STREAM_HEADER_LEN..], [44, 255, 255]);

        let s = DataStream::new(
            StreamRole::Triangles,
            ElementType::Int16,
            vec![40_000i64],
            1,
        )
        .unwrap();
        assert_eq!(
            &encode(&s)[STREAM_HEADER_LEN..],
            (40_000i64 as i16).to_le_bytes()
        );
    }

    #[test]
    fn float_narrowing_rounds_and_overflows_to_infinity() {
        let s = DataStream::new(
            StreamRole::Vertices,
            ElementType::Float32,
            vec![0.1f64, 1e300, -1e300],
            3,
        )
        .unwrap();
        let bytes = encode(&s);
        let decoded: Vec<f32> = bytes[STREAM_HEADER_LEN..]
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        assert_eq!(decoded, [0.1f32, f32::INFINITY, f32::NEG_INFINITY]);
    }

    #[test]
    fn nan_survives_narrowing() {
        let s = DataStream::new(
            StreamRole::Uvs,
            ElementType::Float32,
            vec![f64::NAN],
            1,
        )
        .unwrap();
        let bytes = encode(&s);
        let v = f32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]);
        assert!(v.is_nan());
    }

    #[test]
    fn float_data_as_integer_type_is_rejected() {
        let err = DataStream::new(
            StreamRole::Vertices,
            ElementType::Int32,
            vec![1.0f64],
            1,
        )
        .unwrap_err();
        assert!(matches!(err, WriteError::ElementTypeMismatch { .. }));
    }

    #[test]
    fn count_must_match_data() {
        let err = DataStream::new(
            StreamRole::Vertices,
            ElementType::Float32,
            vec![1.0f64, 2.0],
            3,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            WriteError::ElementCountMismatch {
                declared: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn integer_source_as_float_type() {
        let s = DataStream::new(
            StreamRole::VertexWeights,
            ElementType::Float64,
            vec![3i64],
            1,
        )
        .unwrap();
        assert_eq!(&encode(&s)[STREAM_HEADER_LEN..], 3.0f64.to_le_bytes());
    }
}
