use std::io::Write;

use crate::types::{Address, Encoding};
use crate::write::WriteError;

/// Little-endian primitive writers for the AWD wire format.
///
/// Every multi-byte value goes through `to_le_bytes`, so the output does
/// not depend on host byte order.
pub trait WireWrite: Write {
    fn put_u8(&mut self, v: u8) -> std::io::Result<()> {
        self.write_all(&[v])
    }

    fn put_i8(&mut self, v: i8) -> std::io::Result<()> {
        self.write_all(&v.to_le_bytes())
    }

    fn put_u16(&mut self, v: u16) -> std::io::Result<()> {
        self.write_all(&v.to_le_bytes())
    }

    fn put_i16(&mut self, v: i16) -> std::io::Result<()> {
        self.write_all(&v.to_le_bytes())
    }

    fn put_u32(&mut self, v: u32) -> std::io::Result<()> {
        self.write_all(&v.to_le_bytes())
    }

    fn put_i32(&mut self, v: i32) -> std::io::Result<()> {
        self.write_all(&v.to_le_bytes())
    }

    fn put_f32(&mut self, v: f32) -> std::io::Result<()> {
        self.write_all(&v.to_le_bytes())
    }

    fn put_f64(&mut self, v: f64) -> std::io::Result<()> {
        self.write_all(&v.to_le_bytes())
    }

    /// `u16` byte length followed by the UTF-8 bytes.
    fn put_varstr(&mut self, s: &str) -> Result<(), WriteError> {
        let len = len_u16("string", s.len())?;
        self.put_u16(len)?;
        self.write_all(s.as_bytes())?;
        Ok(())
    }

    /// `u32` byte length followed by the UTF-8 bytes.
    fn put_longstr(&mut self, s: &str) -> Result<(), WriteError> {
        let len = len_u32("long string", s.len())?;
        self.put_u32(len)?;
        self.write_all(s.as_bytes())?;
        Ok(())
    }

    fn put_address(
        &mut self,
        addr: Option<Address>,
        enc: &Encoding,
    ) -> Result<(), WriteError> {
        let raw = addr.map(Address::get).unwrap_or(0);
        if raw > enc.max_address() {
            return Err(WriteError::Capacity {
                what: "block address",
                len: raw as u64,
                max: enc.max_address() as u64,
            });
        }
        if enc.wide_addresses {
            self.put_u32(raw)?;
        } else {
            self.put_u16(raw as u16)?;
        }
        Ok(())
    }

    /// Matrix components at the document's matrix width.
    fn put_matrix(
        &mut self,
        components: &[f64],
        enc: &Encoding,
    ) -> std::io::Result<()> {
        for c in components {
            if enc.wide_matrices {
                self.put_f64(*c)?;
            } else {
                self.put_f32(*c as f32)?;
            }
        }
        Ok(())
    }
}

impl<W: Write + ?Sized> WireWrite for W {}

pub fn varstr_len(s: &str) -> usize {
    2 + s.len()
}

pub fn longstr_len(s: &str) -> usize {
    4 + s.len()
}

pub(crate) fn len_u16(what: &'static str, len: usize) -> Result<u16, WriteError> {
    u16::try_from(len).map_err(|_| WriteError::Capacity {
        what,
        len: len as u64,
        max: u16::MAX as u64,
    })
}

pub(crate) fn len_u32(what: &'static str, len: usize) -> Result<u32, WriteError> {
    u32::try_from(len).map_err(|_| WriteError::Capacity {
        what,
        len: len as u64,
        max: u32::MAX as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn little_endian_regardless_of_host() {
        let mut buf: Vec<u8> = vec![];
        buf.put_u16(0x0102).unwrap();
        buf.put_u32(0x03040506).unwrap();
        buf.put_f32(1.0).unwrap();
        assert_eq!(buf, [0x02, 0x01, 0x06, 0x05, 0x04, 0x03, 0x00, 0x00, 0x80, 0x3f]);
    }

    #[test]
    fn varstr() {
        let mut buf: Vec<u8> = vec![];
        buf.put_varstr("abc").unwrap();
        assert_eq!(buf, [3, 0, b'a', b'b', b'c']);
        assert_eq!(buf.len(), varstr_len("abc"));
    }

    #[test]
    fn oversized_varstr_is_rejected() {
        let long = "x".repeat(u16::MAX as usize + 1);
        let mut buf: Vec<u8> = vec![];
        let err = buf.put_varstr(&long).unwrap_err();
        assert!(matches!(err, WriteError::Capacity { what: "string", .. }));
        assert!(buf.is_empty());
    }

    #[test]
    fn addresses_use_selected_width() {
        let narrow = Encoding::default();
        let wide = Encoding {
            wide_addresses: true,
            ..Default::default()
        };
        let mut buf: Vec<u8> = vec![];
        buf.put_address(Address::new(0x0102), &narrow).unwrap();
        buf.put_address(None, &narrow).unwrap();
        buf.put_address(Address::new(0x0102), &wide).unwrap();
        assert_eq!(buf, [0x02, 0x01, 0, 0, 0x02, 0x01, 0, 0]);

        let err = Vec::<u8>::new()
            .put_address(Address::new(70_000), &narrow)
            .unwrap_err();
        assert!(matches!(err, WriteError::Capacity { .. }));
    }

    #[test]
    fn narrow_matrices_round_to_f32() {
        let mut buf: Vec<u8> = vec![];
        buf.put_matrix(&[0.1], &Encoding::default()).unwrap();
        assert_eq!(buf, (0.1f64 as f32).to_le_bytes());
    }
}
