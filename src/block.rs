use std::io::Write;

use crate::attr::AttrElement;
use crate::material::{BitmapTexture, Material, MaterialKind};
use crate::mesh::MeshData;
use crate::scene::{Container, MeshInstance, SceneBlock};
use crate::skeleton::Skeleton;
use crate::types::{Address, Encoding};
use crate::write::WriteError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BlockType {
    MeshData = 1,
    Container = 22,
    MeshInstance = 23,
    Material = 81,
    BitmapTexture = 82,
    Skeleton = 101,
}

/// Kind of block a reference is allowed to point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefTarget {
    /// Address-valued attributes may point anywhere.
    Any,
    /// Scene parents: a `Container` or a `MeshInstance`.
    SceneNode,
    Exactly(BlockType),
}

impl RefTarget {
    pub fn accepts(self, block_type: BlockType) -> bool {
        match self {
            RefTarget::Any => true,
            RefTarget::SceneNode => matches!(
                block_type,
                BlockType::Container | BlockType::MeshInstance
            ),
            RefTarget::Exactly(expected) => block_type == expected,
        }
    }
}

/// One addressable record of the document.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    MeshData(MeshData),
    Container(Container),
    MeshInstance(MeshInstance),
    Material(Material),
    BitmapTexture(BitmapTexture),
    Skeleton(Skeleton),
}

impl Block {
    pub fn block_type(&self) -> BlockType {
        match self {
            Block::MeshData(_) => BlockType::MeshData,
            Block::Container(_) => BlockType::Container,
            Block::MeshInstance(_) => BlockType::MeshInstance,
            Block::Material(_) => BlockType::Material,
            Block::BitmapTexture(_) => BlockType::BitmapTexture,
            Block::Skeleton(_) => BlockType::Skeleton,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Block::MeshData(b) => &b.name,
            Block::Container(b) => &b.node.name,
            Block::MeshInstance(b) => &b.node.name,
            Block::Material(b) => &b.name,
            Block::BitmapTexture(b) => &b.name,
            Block::Skeleton(b) => &b.name,
        }
    }

    pub fn attributes(&self) -> &AttrElement {
        match self {
            Block::MeshData(b) => &b.attributes,
            Block::Container(b) => &b.attributes,
            Block::MeshInstance(b) => &b.attributes,
            Block::Material(b) => &b.attributes,
            Block::BitmapTexture(b) => &b.attributes,
            Block::Skeleton(b) => &b.attributes,
        }
    }

    pub fn attributes_mut(&mut self) -> &mut AttrElement {
        match self {
            Block::MeshData(b) => &mut b.attributes,
            Block::Container(b) => &mut b.attributes,
            Block::MeshInstance(b) => &mut b.attributes,
            Block::Material(b) => &mut b.attributes,
            Block::BitmapTexture(b) => &mut b.attributes,
            Block::Skeleton(b) => &mut b.attributes,
        }
    }

    /// Every block address this block's body refers to, with the kind of
    /// block expected there.
    pub fn references(&self) -> Vec<(Address, RefTarget)> {
        let any = |addr: Address| (addr, RefTarget::Any);
        match self {
            Block::MeshData(b) => {
                let mut refs: Vec<_> = b.attributes.references().map(any).collect();
                for sub in b.sub_meshes() {
                    refs.extend(sub.attributes.references().map(any));
                }
                refs
            }
            Block::Container(b) => b
                .node
                .parent
                .map(|p| (p, RefTarget::SceneNode))
                .into_iter()
                .chain(b.attributes.references().map(any))
                .collect(),
            Block::MeshInstance(b) => b
                .node
                .parent
                .map(|p| (p, RefTarget::SceneNode))
                .into_iter()
                .chain(std::iter::once((
                    b.mesh_data,
                    RefTarget::Exactly(BlockType::MeshData),
                )))
                .chain(
                    b.materials()
                        .iter()
                        .map(|m| (*m, RefTarget::Exactly(BlockType::Material))),
                )
                .chain(b.attributes.references().map(any))
                .collect(),
            Block::Material(b) => {
                let texture = match b.kind {
                    MaterialKind::Texture(addr) => {
                        Some((addr, RefTarget::Exactly(BlockType::BitmapTexture)))
                    }
                    MaterialKind::Color(_) => None,
                };
                texture
                    .into_iter()
                    .chain(b.attributes.references().map(any))
                    .collect()
            }
            Block::BitmapTexture(b) => b.attributes.references().map(any).collect(),
            Block::Skeleton(b) => b.references().map(any).collect(),
        }
    }

    pub fn calc_body_length(&self, enc: &Encoding) -> usize {
        match self {
            Block::MeshData(b) => b.calc_body_length(enc),
            Block::Container(b) => b.calc_body_length(enc),
            Block::MeshInstance(b) => b.calc_body_length(enc),
            Block::Material(b) => b.calc_body_length(enc),
            Block::BitmapTexture(b) => b.calc_body_length(enc),
            Block::Skeleton(b) => b.calc_body_length(enc),
        }
    }

    pub fn write_body<W: Write + ?Sized>(
        &self,
        w: &mut W,
        enc: &Encoding,
    ) -> Result<(), WriteError> {
        match self {
            Block::MeshData(b) => b.write_body(w, enc),
            Block::Container(b) => b.write_body(w, enc),
            Block::MeshInstance(b) => b.write_body(w, enc),
            Block::Material(b) => b.write_body(w, enc),
            Block::BitmapTexture(b) => b.write_body(w, enc),
            Block::Skeleton(b) => b.write_body(w, enc),
        }
    }
}

impl From<MeshData> for Block {
    fn from(b: MeshData) -> Self {
        Block::MeshData(b)
    }
}

impl From<Container> for Block {
    fn from(b: Container) -> Self {
        Block::Container(b)
    }
}

impl From<MeshInstance> for Block {
    fn from(b: MeshInstance) -> Self {
        Block::MeshInstance(b)
    }
}

impl From<SceneBlock> for Block {
    fn from(b: SceneBlock) -> Self {
        match b {
            SceneBlock::Container(b) => Block::Container(b),
            SceneBlock::MeshInstance(b) => Block::MeshInstance(b),
        }
    }
}

impl From<Material> for Block {
    fn from(b: Material) -> Self {
        Block::Material(b)
    }
}

impl From<BitmapTexture> for Block {
    fn from(b: BitmapTexture) -> Self {
        Block::BitmapTexture(b)
    }
}

impl From<Skeleton> for Block {
    fn from(b: Skeleton) -> Self {
        Block::Skeleton(b)
    }
}
