use std::io::Write;

use crate::attr::AttrElement;
use crate::io::{WireWrite, len_u16, varstr_len};
use crate::types::{Address, Encoding, Transform};
use crate::write::WriteError;

/// Fields shared by every scene-graph block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneNode {
    pub name: String,
    /// Local transform, relative to the parent.
    pub transform: Transform,
    pub parent: Option<Address>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_parent(mut self, parent: Address) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn calc_length(&self, enc: &Encoding) -> usize {
        enc.address_len() + Transform::encoded_len(enc) + varstr_len(&self.name)
    }

    pub fn write<W: Write + ?Sized>(
        &self,
        w: &mut W,
        enc: &Encoding,
    ) -> Result<(), WriteError> {
        w.put_address(self.parent, enc)?;
        w.put_matrix(&self.transform.0, enc)?;
        w.put_varstr(&self.name)?;
        Ok(())
    }
}

/// Scene node without geometry, used to group children.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Container {
    pub node: SceneNode,
    pub attributes: AttrElement,
}

impl Container {
    pub fn new(node: SceneNode) -> Self {
        Self {
            node,
            attributes: AttrElement::new(),
        }
    }

    pub fn references(&self) -> impl Iterator<Item = Address> + '_ {
        self.node.parent.into_iter().chain(self.attributes.references())
    }

    pub fn calc_body_length(&self, enc: &Encoding) -> usize {
        self.node.calc_length(enc) + self.attributes.calc_length(enc)
    }

    pub fn write_body<W: Write + ?Sized>(
        &self,
        w: &mut W,
        enc: &Encoding,
    ) -> Result<(), WriteError> {
        self.node.write(w, enc)?;
        self.attributes.properties.write(w, enc)?;
        self.attributes.user_attributes.write(w, enc)?;
        Ok(())
    }
}

/// Placement of a mesh in the scene.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshInstance {
    pub node: SceneNode,
    pub mesh_data: Address,
    pub attributes: AttrElement,
    materials: Vec<Address>,
}

impl MeshInstance {
    pub fn new(node: SceneNode, mesh_data: Address) -> Self {
        Self {
            node,
            mesh_data,
            attributes: AttrElement::new(),
            materials: vec![],
        }
    }

    pub fn add_material(&mut self, material: Address) {
        self.materials.push(material);
    }

    pub fn with_material(mut self, material: Address) -> Self {
        self.add_material(material);
        self
    }

    pub fn materials(&self) -> &[Address] {
        &self.materials
    }

    pub fn references(&self) -> impl Iterator<Item = Address> + '_ {
        self.node
            .parent
            .into_iter()
            .chain(std::iter::once(self.mesh_data))
            .chain(self.materials.iter().copied())
            .chain(self.attributes.references())
    }

    pub fn calc_body_length(&self, enc: &Encoding) -> usize {
        self.node.calc_length(enc)
            + enc.address_len()
            + 2
            + self.materials.len() * enc.address_len()
            + self.attributes.calc_length(enc)
    }

    pub fn write_body<W: Write + ?Sized>(
        &self,
        w: &mut W,
        enc: &Encoding,
    ) -> Result<(), WriteError> {
        self.node.write(w, enc)?;
        w.put_address(Some(self.mesh_data), enc)?;
        w.put_u16(len_u16("material count", self.materials.len())?)?;
        for material in self.materials.iter() {
            w.put_address(Some(*material), enc)?;
        }
        self.attributes.properties.write(w, enc)?;
        self.attributes.user_attributes.write(w, enc)?;
        Ok(())
    }
}

/// Either kind of scene-graph block.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneBlock {
    Container(Container),
    MeshInstance(MeshInstance),
}

impl From<Container> for SceneBlock {
    fn from(b: Container) -> Self {
        SceneBlock::Container(b)
    }
}

impl From<MeshInstance> for SceneBlock {
    fn from(b: MeshInstance) -> Self {
        SceneBlock::MeshInstance(b)
    }
}
