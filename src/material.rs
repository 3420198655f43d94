use std::io::Write;

use crate::attr::AttrElement;
use crate::io::{WireWrite, longstr_len, varstr_len};
use crate::types::{Address, Encoding};
use crate::write::WriteError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// `0x00RRGGBB`
    pub const fn to_u32(self) -> u32 {
        (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }

    pub const fn from_u32(rgb: u32) -> Self {
        Self {
            r: (rgb >> 16) as u8,
            g: (rgb >> 8) as u8,
            b: rgb as u8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialKind {
    Color(Color),
    /// Address of a [`BitmapTexture`] block.
    Texture(Address),
}

impl MaterialKind {
    fn tag(&self) -> u8 {
        match self {
            MaterialKind::Color(_) => 1,
            MaterialKind::Texture(_) => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub kind: MaterialKind,
    pub attributes: AttrElement,
}

impl Material {
    pub fn color(name: impl Into<String>, color: Color) -> Self {
        Self {
            name: name.into(),
            kind: MaterialKind::Color(color),
            attributes: AttrElement::new(),
        }
    }

    pub fn texture(name: impl Into<String>, texture: Address) -> Self {
        Self {
            name: name.into(),
            kind: MaterialKind::Texture(texture),
            attributes: AttrElement::new(),
        }
    }

    pub fn references(&self) -> impl Iterator<Item = Address> + '_ {
        let texture = match self.kind {
            MaterialKind::Texture(addr) => Some(addr),
            MaterialKind::Color(_) => None,
        };
        texture.into_iter().chain(self.attributes.references())
    }

    pub fn calc_body_length(&self, enc: &Encoding) -> usize {
        let payload = match self.kind {
            MaterialKind::Color(_) => 4,
            MaterialKind::Texture(_) => enc.address_len(),
        };
        varstr_len(&self.name) + 1 + payload + self.attributes.calc_length(enc)
    }

    pub fn write_body<W: Write + ?Sized>(
        &self,
        w: &mut W,
        enc: &Encoding,
    ) -> Result<(), WriteError> {
        w.put_varstr(&self.name)?;
        w.put_u8(self.kind.tag())?;
        match self.kind {
            MaterialKind::Color(color) => w.put_u32(color.to_u32())?,
            MaterialKind::Texture(addr) => w.put_address(Some(addr), enc)?,
        }
        self.attributes.properties.write(w, enc)?;
        self.attributes.user_attributes.write(w, enc)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum TextureSource {
    /// Image referenced by URL, not embedded in the file.
    #[default]
    External = 0,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BitmapTexture {
    pub name: String,
    pub source: TextureSource,
    pub url: String,
    pub attributes: AttrElement,
}

impl BitmapTexture {
    pub fn external(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: TextureSource::External,
            url: url.into(),
            attributes: AttrElement::new(),
        }
    }

    pub fn calc_body_length(&self, enc: &Encoding) -> usize {
        varstr_len(&self.name)
            + 1
            + longstr_len(&self.url)
            + self.attributes.calc_length(enc)
    }

    pub fn write_body<W: Write + ?Sized>(
        &self,
        w: &mut W,
        enc: &Encoding,
    ) -> Result<(), WriteError> {
        w.put_varstr(&self.name)?;
        w.put_u8(self.source as u8)?;
        w.put_longstr(&self.url)?;
        self.attributes.properties.write(w, enc)?;
        self.attributes.user_attributes.write(w, enc)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_packing() {
        let c = Color::new(0x12, 0x34, 0x56);
        assert_eq!(c.to_u32(), 0x123456);
        assert_eq!(Color::from_u32(0xff123456), c);
    }

    #[test]
    fn color_material_layout() {
        let enc = Encoding::default();
        let m = Material::color("red", Color::new(255, 0, 0));
        let mut buf: Vec<u8> = vec![];
        m.write_body(&mut buf, &enc).unwrap();
        assert_eq!(buf.len(), m.calc_body_length(&enc));
        assert_eq!(&buf[..10], [3, 0, b'r', b'e', b'd', 1, 0, 0, 0xff, 0]);
        assert_eq!(m.references().count(), 0);
    }

    #[test]
    fn texture_material_references_texture() {
        let enc = Encoding {
            wide_addresses: true,
            ..Default::default()
        };
        let tex = Address::new(5).unwrap();
        let m = Material::texture("wood", tex);
        let mut buf: Vec<u8> = vec![];
        m.write_body(&mut buf, &enc).unwrap();
        assert_eq!(buf.len(), m.calc_body_length(&enc));
        assert_eq!(&buf[6..12], [2, 5, 0, 0, 0, 0]);
        assert_eq!(m.references().collect::<Vec<_>>(), [tex]);
    }

    #[test]
    fn texture_layout() {
        let enc = Encoding::default();
        let t = BitmapTexture::external("wood", "tex/wood.png");
        let mut buf: Vec<u8> = vec![];
        t.write_body(&mut buf, &enc).unwrap();
        assert_eq!(buf.len(), t.calc_body_length(&enc));
        assert_eq!(&buf[6..11], [0, 12, 0, 0, 0]);
        assert_eq!(&buf[11..23], b"tex/wood.png");
    }
}
