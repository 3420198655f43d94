use std::fmt;
use std::io::Write;
use std::num::NonZeroU32;

use crate::io::WireWrite;
use crate::write::WriteError;

/// Address of a registered block.
///
/// Addresses are 1-based and assigned in registration order. Zero is
/// reserved on the wire for "no reference", which is why an absent
/// reference is spelled `Option<Address>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(NonZeroU32);

impl Address {
    pub fn new(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    /// Address of the block at `index` in the block list.
    pub(crate) fn from_index(index: usize) -> Option<Self> {
        u32::try_from(index + 1).ok().and_then(Self::new)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }

    pub(crate) fn index(self) -> usize {
        self.0.get() as usize - 1
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Compression {
    #[default]
    Uncompressed = 0,
}

/// Document-wide width decisions, resolved once per flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Encoding {
    pub wide_addresses: bool,
    pub wide_matrices: bool,
    pub compression: Compression,
}

impl Encoding {
    pub const FLAG_STREAMING: u16 = 1 << 0;
    pub const FLAG_WIDE_MATRICES: u16 = 1 << 1;
    pub const FLAG_WIDE_ADDRESSES: u16 = 1 << 2;

    pub fn flags(&self) -> u16 {
        let mut flags = 0;
        if self.wide_matrices {
            flags |= Self::FLAG_WIDE_MATRICES;
        }
        if self.wide_addresses {
            flags |= Self::FLAG_WIDE_ADDRESSES;
        }
        flags
    }

    pub fn address_len(&self) -> usize {
        if self.wide_addresses { 4 } else { 2 }
    }

    /// Largest address representable with the selected address width.
    pub fn max_address(&self) -> u32 {
        if self.wide_addresses {
            u32::MAX
        } else {
            u16::MAX as u32
        }
    }

    pub fn matrix_component_len(&self) -> usize {
        if self.wide_matrices { 8 } else { 4 }
    }
}

/// Row-major 4x4 matrix, stored at full precision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix4(pub [f64; 16]);

impl Matrix4 {
    #[rustfmt::skip]
    pub const IDENTITY: Self = Self([
        1.0, 0.0, 0.0, 0.0,
        0.0, 1.0, 0.0, 0.0,
        0.0, 0.0, 1.0, 0.0,
        0.0, 0.0, 0.0, 1.0,
    ]);

    pub fn encoded_len(enc: &Encoding) -> usize {
        16 * enc.matrix_component_len()
    }
}

impl Default for Matrix4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Row-major 3x4 affine transform: three rows of rotation/scale with the
/// translation in the last column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform(pub [f64; 12]);

impl Transform {
    #[rustfmt::skip]
    pub const IDENTITY: Self = Self([
        1.0, 0.0, 0.0, 0.0,
        0.0, 1.0, 0.0, 0.0,
        0.0, 0.0, 1.0, 0.0,
    ]);

    pub fn from_translation(x: f64, y: f64, z: f64) -> Self {
        let mut t = Self::IDENTITY;
        t.0[3] = x;
        t.0[7] = y;
        t.0[11] = z;
        t
    }

    pub fn encoded_len(enc: &Encoding) -> usize {
        12 * enc.matrix_component_len()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AttrType {
    Int16 = 1,
    Int32 = 2,
    Float32 = 3,
    Float64 = 4,
    String = 5,
    BlockAddr = 6,
    Matrix4 = 7,
}

/// Value held by an attribute entry.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Int16(i16),
    Int32(i32),
    Float32(f32),
    Float64(f64),
    String(String),
    BlockAddr(Address),
    Matrix4(Matrix4),
}

impl AttrValue {
    pub fn attr_type(&self) -> AttrType {
        match self {
            AttrValue::Int16(_) => AttrType::Int16,
            AttrValue::Int32(_) => AttrType::Int32,
            AttrValue::Float32(_) => AttrType::Float32,
            AttrValue::Float64(_) => AttrType::Float64,
            AttrValue::String(_) => AttrType::String,
            AttrValue::BlockAddr(_) => AttrType::BlockAddr,
            AttrValue::Matrix4(_) => AttrType::Matrix4,
        }
    }

    /// Encoded size of the value bytes alone.
    pub fn value_len(&self, enc: &Encoding) -> usize {
        match self {
            AttrValue::Int16(_) => 2,
            AttrValue::Int32(_) => 4,
            AttrValue::Float32(_) => 4,
            AttrValue::Float64(_) => 8,
            AttrValue::String(s) => s.len(),
            AttrValue::BlockAddr(_) => enc.address_len(),
            AttrValue::Matrix4(_) => Matrix4::encoded_len(enc),
        }
    }

    pub(crate) fn write_value<W: Write + ?Sized>(
        &self,
        w: &mut W,
        enc: &Encoding,
    ) -> Result<(), WriteError> {
        match self {
            AttrValue::Int16(v) => w.put_i16(*v)?,
            AttrValue::Int32(v) => w.put_i32(*v)?,
            AttrValue::Float32(v) => w.put_f32(*v)?,
            AttrValue::Float64(v) => w.put_f64(*v)?,
            AttrValue::String(s) => w.write_all(s.as_bytes())?,
            AttrValue::BlockAddr(addr) => w.put_address(Some(*addr), enc)?,
            AttrValue::Matrix4(m) => w.put_matrix(&m.0, enc)?,
        }
        Ok(())
    }

    pub fn as_address(&self) -> Option<Address> {
        match self {
            AttrValue::BlockAddr(addr) => Some(*addr),
            _ => None,
        }
    }
}

impl From<i16> for AttrValue {
    fn from(v: i16) -> Self {
        AttrValue::Int16(v)
    }
}

impl From<i32> for AttrValue {
    fn from(v: i32) -> Self {
        AttrValue::Int32(v)
    }
}

impl From<f32> for AttrValue {
    fn from(v: f32) -> Self {
        AttrValue::Float32(v)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Float64(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::String(v.to_owned())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::String(v)
    }
}

impl From<Address> for AttrValue {
    fn from(v: Address) -> Self {
        AttrValue::BlockAddr(v)
    }
}

impl From<Matrix4> for AttrValue {
    fn from(v: Matrix4) -> Self {
        AttrValue::Matrix4(v)
    }
}
