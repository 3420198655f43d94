#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C, packed)]
pub struct AwdHeader {
    pub magic: [u8; 3],
    pub version_major: u8,
    pub version_minor: u8,
    pub flags: u16,
    pub compression: u8,
    /// Length of everything following the header.
    pub body_len: u32,
}

impl AwdHeader {
    pub const fn encoded_len() -> usize {
        std::mem::size_of::<Self>()
    }

    pub fn to_le(&self) -> Self {
        Self {
            magic: self.magic,
            version_major: self.version_major,
            version_minor: self.version_minor,
            flags: self.flags.to_le(),
            compression: self.compression,
            body_len: self.body_len.to_le(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

/// Per-block header. The block address is not stored: the k-th block in
/// the file has address k.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C, packed)]
pub struct BlockHeader {
    pub namespace: u8,
    pub block_type: u8,
    pub flags: u8,
    pub body_len: u32,
}

impl BlockHeader {
    pub const fn encoded_len() -> usize {
        std::mem::size_of::<Self>()
    }

    pub fn to_le(&self) -> Self {
        Self {
            body_len: self.body_len.to_le(),
            ..*self
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}
