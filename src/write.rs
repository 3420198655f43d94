use std::io::Write;
use std::path::Path;

use crate::block::{Block, BlockType, RefTarget};
use crate::header::{AwdHeader, BlockHeader};
use crate::io::len_u32;
use crate::material::{BitmapTexture, Material};
use crate::mesh::MeshData;
use crate::scene::SceneBlock;
use crate::skeleton::Skeleton;
use crate::stream::{ElementType, StreamRole};
use crate::types::{Address, Encoding};

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot persist output file: {0}")]
    Persist(#[from] tempfile::PersistError),
    #[error("{what} too large: {len} exceeds the maximum of {max}")]
    Capacity {
        what: &'static str,
        len: u64,
        max: u64,
    },
    #[error("Block #{from} refers to #{to}, which is not registered before it")]
    UnregisteredReference { from: u64, to: u32 },
    #[error("Block #{from} refers to #{to}, a {found:?} block, where {expected:?} is required")]
    WrongReferenceKind {
        from: u64,
        to: u32,
        expected: RefTarget,
        found: BlockType,
    },
    #[error("Float data cannot be written as {element_type:?} in a {role:?} stream")]
    ElementTypeMismatch {
        role: StreamRole,
        element_type: ElementType,
    },
    #[error("Stream declares {declared} elements but holds {actual}")]
    ElementCountMismatch { declared: usize, actual: usize },
    #[error("{what}: calculated {calculated} bytes but wrote {written}")]
    LengthMismatch {
        what: &'static str,
        calculated: usize,
        written: usize,
    },
    #[error("Joint does not belong to this skeleton")]
    UnknownJoint,
}

/// Width used for block addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressMode {
    /// Always `u16`. Flushing more than 65535 blocks fails.
    Narrow,
    /// Always `u32`.
    Wide,
    /// `u16`, switching to `u32` when more than 65535 blocks are registered.
    #[default]
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AwdSettings {
    pub address_mode: AddressMode,
    /// Write matrix and transform components as `f64` instead of `f32`.
    pub wide_matrices: bool,
}

/// An AWD document being assembled.
///
/// Blocks get their address when registered, and may only refer to blocks
/// registered before them. Nothing is written until [`AwdDocument::flush`].
#[derive(Debug, Clone, Default)]
pub struct AwdDocument {
    settings: AwdSettings,
    blocks: Vec<Block>,
}

impl AwdDocument {
    pub fn new() -> Self {
        Self::new_with_settings(Default::default())
    }

    pub fn new_with_settings(settings: AwdSettings) -> Self {
        Self {
            settings,
            blocks: vec![],
        }
    }

    pub fn settings(&self) -> &AwdSettings {
        &self.settings
    }

    /// Append a block and assign it the next address.
    ///
    /// Fails if the block refers to any address that is not already
    /// registered, or to a block of the wrong kind.
    pub fn register(
        &mut self,
        block: impl Into<Block>,
    ) -> Result<Address, WriteError> {
        let block = block.into();
        let addr = Address::from_index(self.blocks.len()).ok_or(
            WriteError::Capacity {
                what: "block count",
                len: self.blocks.len() as u64 + 1,
                max: u32::MAX as u64,
            },
        )?;
        check_references(addr, &block, &self.blocks)?;
        tracing::debug!(
            address = addr.get(),
            block_type = ?block.block_type(),
            name = block.name(),
            "registered block"
        );
        self.blocks.push(block);
        Ok(addr)
    }

    pub fn add_mesh_data(&mut self, mesh: MeshData) -> Result<Address, WriteError> {
        self.register(mesh)
    }

    /// Register a [`Container`](crate::scene::Container) or a
    /// [`MeshInstance`](crate::scene::MeshInstance).
    pub fn add_scene_block(
        &mut self,
        block: impl Into<SceneBlock>,
    ) -> Result<Address, WriteError> {
        let block: SceneBlock = block.into();
        self.register(block)
    }

    pub fn add_material(&mut self, material: Material) -> Result<Address, WriteError> {
        self.register(material)
    }

    pub fn add_texture(
        &mut self,
        texture: BitmapTexture,
    ) -> Result<Address, WriteError> {
        self.register(texture)
    }

    pub fn add_skeleton(&mut self, skeleton: Skeleton) -> Result<Address, WriteError> {
        self.register(skeleton)
    }

    pub fn get(&self, addr: Address) -> Option<&Block> {
        self.blocks.get(addr.index())
    }

    /// Mutable access to a registered block.
    ///
    /// References added through this are checked again when flushing.
    pub fn get_mut(&mut self, addr: Address) -> Option<&mut Block> {
        self.blocks.get_mut(addr.index())
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Address, &Block)> {
        self.blocks
            .iter()
            .enumerate()
            .filter_map(|(i, b)| Address::from_index(i).map(|a| (a, b)))
    }

    /// Resolve the settings into the encoding used for this document.
    pub fn encoding(&self) -> Result<Encoding, WriteError> {
        let n_blocks = self.blocks.len();
        let needs_wide = n_blocks > u16::MAX as usize;
        let wide_addresses = match self.settings.address_mode {
            AddressMode::Narrow if needs_wide => {
                return Err(WriteError::Capacity {
                    what: "block count with narrow addresses",
                    len: n_blocks as u64,
                    max: u16::MAX as u64,
                });
            }
            AddressMode::Narrow => false,
            AddressMode::Wide => true,
            AddressMode::Auto => needs_wide,
        };
        Ok(Encoding {
            wide_addresses,
            wide_matrices: self.settings.wide_matrices,
            ..Default::default()
        })
    }

    /// Encode the whole document into memory.
    pub fn encode_to_vec(&self) -> Result<Vec<u8>, WriteError> {
        let enc = self.encoding()?;

        let mut body_lens = Vec::with_capacity(self.blocks.len());
        for (addr, block) in self.iter() {
            check_references(addr, block, &self.blocks)?;
            body_lens.push(block.calc_body_length(&enc));
        }
        let total: usize = body_lens
            .iter()
            .map(|len| BlockHeader::encoded_len() + len)
            .sum();

        let header = AwdHeader {
            magic: crate::MAGIC,
            version_major: crate::FORMAT_VERSION_MAJOR,
            version_minor: crate::FORMAT_VERSION_MINOR,
            flags: enc.flags(),
            compression: enc.compression as u8,
            body_len: len_u32("document body", total)?,
        }
        .to_le();

        let mut buf = Vec::with_capacity(AwdHeader::encoded_len() + total);
        buf.extend_from_slice(header.as_bytes());
        for (block, &body_len) in self.blocks.iter().zip(body_lens.iter()) {
            let block_header = BlockHeader {
                namespace: 0,
                block_type: block.block_type() as u8,
                flags: enc.flags() as u8,
                body_len: len_u32("block body", body_len)?,
            }
            .to_le();
            buf.extend_from_slice(block_header.as_bytes());
            let start = buf.len();
            block.write_body(&mut buf, &enc)?;
            let written = buf.len() - start;
            if written != body_len {
                return Err(WriteError::LengthMismatch {
                    what: "block body",
                    calculated: body_len,
                    written,
                });
            }
            tracing::trace!(
                block_type = ?block.block_type(),
                body_len,
                "wrote block"
            );
        }
        Ok(buf)
    }

    /// Encode the document and write it to `write`.
    ///
    /// The document is fully encoded before the first byte is written, so
    /// an encoding error leaves `write` untouched.
    pub fn flush(self, write: &mut dyn Write) -> Result<(), WriteError> {
        let bytes = self.encode_to_vec()?;
        write.write_all(&bytes)?;
        write.flush()?;
        tracing::debug!(
            blocks = self.blocks.len(),
            bytes = bytes.len(),
            "flushed document"
        );
        Ok(())
    }

    /// Encode the document into a file.
    ///
    /// Data goes to a temporary file next to `path`, which is only moved
    /// into place once everything was written. Without `overwrite`, an
    /// existing file at `path` is an error.
    pub fn flush_to_path(
        self,
        path: &Path,
        overwrite: bool,
    ) -> Result<(), WriteError> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        self.flush(tmp.as_file_mut())?;
        tmp.as_file().sync_all()?;
        if overwrite {
            tmp.persist(path)?;
        } else {
            tmp.persist_noclobber(path)?;
        }
        Ok(())
    }
}

/// `earlier` must hold at least every block registered before `addr`.
fn check_references(
    addr: Address,
    block: &Block,
    earlier: &[Block],
) -> Result<(), WriteError> {
    for (to, expected) in block.references() {
        let target = match earlier.get(to.index()) {
            Some(target) if to < addr => target,
            _ => {
                return Err(WriteError::UnregisteredReference {
                    from: addr.get() as u64,
                    to: to.get(),
                });
            }
        };
        if !expected.accepts(target.block_type()) {
            return Err(WriteError::WrongReferenceKind {
                from: addr.get() as u64,
                to: to.get(),
                expected,
                found: target.block_type(),
            });
        }
    }
    Ok(())
}
