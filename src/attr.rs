//! Attribute lists attachable to blocks, sub-meshes and skeleton joints.
//!
//! Two parallel lists exist on every [`AttrElement`]:
//! numeric-keyed "properties" defined by the format itself, and
//! string-keyed "user attributes" scoped by a namespace byte.
//!
//! Both lists are always written, even when empty: a `u32` byte length
//! (zero for an empty list) followed by the entries. Entry order is
//! insertion order.

use std::io::Write;

use crate::io::{WireWrite, len_u32, varstr_len};
use crate::types::{Address, AttrValue, Encoding};
use crate::write::WriteError;

pub type PropKey = u16;

/// Size of the byte-length prefix in front of every attribute list.
const LIST_PREFIX_LEN: usize = 4;

#[derive(Debug, Clone, PartialEq)]
struct NumAttr {
    key: PropKey,
    value: AttrValue,
}

#[derive(Debug, Clone, PartialEq)]
struct UserAttr {
    namespace: u8,
    key: String,
    value: AttrValue,
}

/// Numeric-keyed attributes ("properties").
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumAttrList {
    attrs: Vec<NumAttr>,
}

impl NumAttrList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `value` under `key`, replacing any existing value.
    pub fn set(
        &mut self,
        key: PropKey,
        value: impl Into<AttrValue>,
    ) {
        let value = value.into();
        match self.attrs.iter_mut().find(|a| a.key == key) {
            Some(attr) => attr.value = value,
            None => self.attrs.push(NumAttr { key, value }),
        }
    }

    pub fn get(&self, key: PropKey) -> Option<&AttrValue> {
        self.attrs.iter().find(|a| a.key == key).map(|a| &a.value)
    }

    pub fn remove(&mut self, key: PropKey) -> Option<AttrValue> {
        let pos = self.attrs.iter().position(|a| a.key == key)?;
        Some(self.attrs.remove(pos).value)
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PropKey, &AttrValue)> {
        self.attrs.iter().map(|a| (a.key, &a.value))
    }

    fn entries_len(&self, enc: &Encoding) -> usize {
        self.attrs
            .iter()
            // key + type + value length + value
            .map(|a| 2 + 1 + 4 + a.value.value_len(enc))
            .sum()
    }

    pub fn calc_length(&self, enc: &Encoding) -> usize {
        LIST_PREFIX_LEN + self.entries_len(enc)
    }

    pub fn write<W: Write + ?Sized>(
        &self,
        w: &mut W,
        enc: &Encoding,
    ) -> Result<(), WriteError> {
        w.put_u32(len_u32("property list", self.entries_len(enc))?)?;
        for attr in self.attrs.iter() {
            w.put_u16(attr.key)?;
            w.put_u8(attr.value.attr_type() as u8)?;
            w.put_u32(len_u32("property value", attr.value.value_len(enc))?)?;
            attr.value.write_value(w, enc)?;
        }
        Ok(())
    }
}

/// String-keyed attributes, each scoped by a namespace byte.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserAttrList {
    attrs: Vec<UserAttr>,
}

impl UserAttrList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(
        &mut self,
        namespace: u8,
        key: &str,
        value: impl Into<AttrValue>,
    ) {
        let value = value.into();
        match self
            .attrs
            .iter_mut()
            .find(|a| a.namespace == namespace && a.key == key)
        {
            Some(attr) => attr.value = value,
            None => self.attrs.push(UserAttr {
                namespace,
                key: key.to_owned(),
                value,
            }),
        }
    }

    pub fn get(&self, namespace: u8, key: &str) -> Option<&AttrValue> {
        self.attrs
            .iter()
            .find(|a| a.namespace == namespace && a.key == key)
            .map(|a| &a.value)
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, &str, &AttrValue)> {
        self.attrs
            .iter()
            .map(|a| (a.namespace, a.key.as_str(), &a.value))
    }

    fn entries_len(&self, enc: &Encoding) -> usize {
        self.attrs
            .iter()
            // namespace + key + type + value length + value
            .map(|a| 1 + varstr_len(&a.key) + 1 + 4 + a.value.value_len(enc))
            .sum()
    }

    pub fn calc_length(&self, enc: &Encoding) -> usize {
        LIST_PREFIX_LEN + self.entries_len(enc)
    }

    pub fn write<W: Write + ?Sized>(
        &self,
        w: &mut W,
        enc: &Encoding,
    ) -> Result<(), WriteError> {
        w.put_u32(len_u32("user attribute list", self.entries_len(enc))?)?;
        for attr in self.attrs.iter() {
            w.put_u8(attr.namespace)?;
            w.put_varstr(&attr.key)?;
            w.put_u8(attr.value.attr_type() as u8)?;
            w.put_u32(len_u32("user attribute value", attr.value.value_len(enc))?)?;
            attr.value.write_value(w, enc)?;
        }
        Ok(())
    }
}

/// Both attribute lists of an element.
///
/// Blocks write the properties near the start of their body and the user
/// attributes at the very end, so the two lists are encoded separately
/// rather than as one unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttrElement {
    pub properties: NumAttrList,
    pub user_attributes: UserAttrList,
}

impl AttrElement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calc_length(&self, enc: &Encoding) -> usize {
        self.properties.calc_length(enc) + self.user_attributes.calc_length(enc)
    }

    /// Every block address stored in either list.
    pub fn references(&self) -> impl Iterator<Item = Address> + '_ {
        self.properties
            .iter()
            .map(|(_, v)| v)
            .chain(self.user_attributes.iter().map(|(_, _, v)| v))
            .filter_map(AttrValue::as_address)
    }
}
