use std::io::Write;

use crate::attr::{AttrElement, PropKey};
use crate::io::{WireWrite, len_u16, len_u32, varstr_len};
use crate::stream::{DataStream, ElementType, StreamData, StreamRole};
use crate::types::{AttrValue, Encoding, Matrix4};
use crate::write::WriteError;

/// Property key under which the skinning bind matrix of a mesh is stored.
pub const MESH_PROP_BIND_MATRIX: PropKey = 1;

/// One group of aligned streams sharing an index space.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubMesh {
    pub attributes: AttrElement,
    streams: Vec<DataStream>,
}

impl SubMesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stream of `count` elements.
    pub fn add_stream(
        &mut self,
        role: StreamRole,
        element_type: ElementType,
        data: impl Into<StreamData>,
        count: usize,
    ) -> Result<(), WriteError> {
        self.streams
            .push(DataStream::new(role, element_type, data, count)?);
        Ok(())
    }

    pub fn streams(&self) -> &[DataStream] {
        &self.streams
    }

    pub fn stream(&self, role: StreamRole) -> Option<&DataStream> {
        self.streams.iter().find(|s| s.role() == role)
    }

    fn streams_len(&self) -> usize {
        self.streams.iter().map(DataStream::calc_length).sum()
    }

    /// Length of everything after the sub-mesh length prefix.
    fn inner_len(&self, enc: &Encoding) -> usize {
        self.attributes.calc_length(enc) + 2 + self.streams_len()
    }

    pub fn calc_length(&self, enc: &Encoding) -> usize {
        4 + self.inner_len(enc)
    }

    pub fn write<W: Write + ?Sized>(
        &self,
        w: &mut W,
        enc: &Encoding,
    ) -> Result<(), WriteError> {
        w.put_u32(len_u32("sub-mesh", self.inner_len(enc))?)?;
        self.attributes.properties.write(w, enc)?;
        w.put_u16(len_u16("stream count", self.streams.len())?)?;
        for stream in self.streams.iter() {
            stream.write(w)?;
        }
        self.attributes.user_attributes.write(w, enc)?;
        Ok(())
    }
}

/// Named geometry block: an ordered list of sub-meshes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub name: String,
    pub attributes: AttrElement,
    sub_meshes: Vec<SubMesh>,
}

impl MeshData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn add_sub_mesh(&mut self, sub: SubMesh) {
        self.sub_meshes.push(sub);
    }

    pub fn sub_meshes(&self) -> &[SubMesh] {
        &self.sub_meshes
    }

    pub fn sub_meshes_mut(&mut self) -> &mut [SubMesh] {
        &mut self.sub_meshes
    }

    pub fn set_bind_matrix(&mut self, mtx: Matrix4) {
        self.attributes.properties.set(MESH_PROP_BIND_MATRIX, mtx);
    }

    pub fn bind_matrix(&self) -> Option<Matrix4> {
        match self.attributes.properties.get(MESH_PROP_BIND_MATRIX) {
            Some(AttrValue::Matrix4(m)) => Some(*m),
            _ => None,
        }
    }

    pub fn calc_body_length(&self, enc: &Encoding) -> usize {
        varstr_len(&self.name)
            + 2
            + self.attributes.calc_length(enc)
            + self
                .sub_meshes
                .iter()
                .map(|s| s.calc_length(enc))
                .sum::<usize>()
    }

    pub fn write_body<W: Write + ?Sized>(
        &self,
        w: &mut W,
        enc: &Encoding,
    ) -> Result<(), WriteError> {
        w.put_varstr(&self.name)?;
        w.put_u16(len_u16("sub-mesh count", self.sub_meshes.len())?)?;
        self.attributes.properties.write(w, enc)?;
        for sub in self.sub_meshes.iter() {
            sub.write(w, enc)?;
        }
        self.attributes.user_attributes.write(w, enc)?;
        Ok(())
    }
}
