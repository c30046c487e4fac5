//! Constant pool model.
//!
//! UTF-8 entries keep their raw (modified UTF-8) bytes so that a pool which is
//! parsed and written back without edits is reproduced byte for byte. Lookups
//! decode on demand.

use crate::bytes::ByteReader;
use crate::error::{ClassFileError, Result};

pub const TAG_UTF8: u8 = 1;
pub const TAG_INTEGER: u8 = 3;
pub const TAG_FLOAT: u8 = 4;
pub const TAG_LONG: u8 = 5;
pub const TAG_DOUBLE: u8 = 6;
pub const TAG_CLASS: u8 = 7;
pub const TAG_STRING: u8 = 8;
pub const TAG_FIELDREF: u8 = 9;
pub const TAG_METHODREF: u8 = 10;
pub const TAG_INTERFACE_METHODREF: u8 = 11;
pub const TAG_NAME_AND_TYPE: u8 = 12;
pub const TAG_METHOD_HANDLE: u8 = 15;
pub const TAG_METHOD_TYPE: u8 = 16;
pub const TAG_DYNAMIC: u8 = 17;
pub const TAG_INVOKE_DYNAMIC: u8 = 18;
pub const TAG_MODULE: u8 = 19;
pub const TAG_PACKAGE: u8 = 20;

/// `Fieldref`, `Methodref` and `InterfaceMethodref` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberRef {
    pub class_index: u16,
    pub name_and_type_index: u16,
}

/// `Dynamic` and `InvokeDynamic` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DynamicRef {
    pub bootstrap_method_attr_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constant {
    /// Slot 0 and the upper half of `Long`/`Double` entries.
    Unusable,
    Utf8(Vec<u8>),
    Integer(u32),
    Float(u32),
    Long(u64),
    Double(u64),
    Class { name_index: u16 },
    String { string_index: u16 },
    FieldRef(MemberRef),
    MethodRef(MemberRef),
    InterfaceMethodRef(MemberRef),
    NameAndType { name_index: u16, descriptor_index: u16 },
    MethodHandle { reference_kind: u8, reference_index: u16 },
    MethodType { descriptor_index: u16 },
    Dynamic(DynamicRef),
    InvokeDynamic(DynamicRef),
    Module { name_index: u16 },
    Package { name_index: u16 },
}

impl Constant {
    fn is_wide(&self) -> bool {
        matches!(self, Constant::Long(_) | Constant::Double(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantPool {
    entries: Vec<Constant>,
}

impl Default for ConstantPool {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstantPool {
    pub fn new() -> Self {
        Self {
            entries: vec![Constant::Unusable],
        }
    }

    pub(crate) fn parse(reader: &mut ByteReader<'_>) -> Result<Self> {
        let count = reader.u16()?;
        let mut entries = Vec::with_capacity(count as usize);
        entries.push(Constant::Unusable);

        while entries.len() < count as usize {
            let index = entries.len() as u16;
            let tag = reader.u8()?;
            let constant = match tag {
                TAG_UTF8 => {
                    let len = reader.u16()? as usize;
                    Constant::Utf8(reader.take(len)?.to_vec())
                }
                TAG_INTEGER => Constant::Integer(reader.u32()?),
                TAG_FLOAT => Constant::Float(reader.u32()?),
                TAG_LONG => Constant::Long(reader.u64()?),
                TAG_DOUBLE => Constant::Double(reader.u64()?),
                TAG_CLASS => Constant::Class {
                    name_index: reader.u16()?,
                },
                TAG_STRING => Constant::String {
                    string_index: reader.u16()?,
                },
                TAG_FIELDREF | TAG_METHODREF | TAG_INTERFACE_METHODREF => {
                    let member = MemberRef {
                        class_index: reader.u16()?,
                        name_and_type_index: reader.u16()?,
                    };
                    match tag {
                        TAG_FIELDREF => Constant::FieldRef(member),
                        TAG_METHODREF => Constant::MethodRef(member),
                        _ => Constant::InterfaceMethodRef(member),
                    }
                }
                TAG_NAME_AND_TYPE => Constant::NameAndType {
                    name_index: reader.u16()?,
                    descriptor_index: reader.u16()?,
                },
                TAG_METHOD_HANDLE => Constant::MethodHandle {
                    reference_kind: reader.u8()?,
                    reference_index: reader.u16()?,
                },
                TAG_METHOD_TYPE => Constant::MethodType {
                    descriptor_index: reader.u16()?,
                },
                TAG_DYNAMIC | TAG_INVOKE_DYNAMIC => {
                    let dynamic = DynamicRef {
                        bootstrap_method_attr_index: reader.u16()?,
                        name_and_type_index: reader.u16()?,
                    };
                    if tag == TAG_DYNAMIC {
                        Constant::Dynamic(dynamic)
                    } else {
                        Constant::InvokeDynamic(dynamic)
                    }
                }
                TAG_MODULE => Constant::Module {
                    name_index: reader.u16()?,
                },
                TAG_PACKAGE => Constant::Package {
                    name_index: reader.u16()?,
                },
                other => return Err(ClassFileError::UnknownConstantTag { tag: other, index }),
            };
            let wide = constant.is_wide();
            entries.push(constant);
            if wide {
                entries.push(Constant::Unusable);
            }
        }

        Ok(Self { entries })
    }

    pub(crate) fn write(&self, out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(&(self.entries.len() as u16).to_be_bytes());
        for constant in &self.entries {
            match constant {
                Constant::Unusable => {}
                Constant::Utf8(bytes) => {
                    let length = u16::try_from(bytes.len()).map_err(|_| {
                        ClassFileError::Utf8TooLong {
                            length: bytes.len(),
                        }
                    })?;
                    out.push(TAG_UTF8);
                    out.extend_from_slice(&length.to_be_bytes());
                    out.extend_from_slice(bytes);
                }
                Constant::Integer(v) => {
                    out.push(TAG_INTEGER);
                    out.extend_from_slice(&v.to_be_bytes());
                }
                Constant::Float(v) => {
                    out.push(TAG_FLOAT);
                    out.extend_from_slice(&v.to_be_bytes());
                }
                Constant::Long(v) => {
                    out.push(TAG_LONG);
                    out.extend_from_slice(&v.to_be_bytes());
                }
                Constant::Double(v) => {
                    out.push(TAG_DOUBLE);
                    out.extend_from_slice(&v.to_be_bytes());
                }
                Constant::Class { name_index } => {
                    out.push(TAG_CLASS);
                    out.extend_from_slice(&name_index.to_be_bytes());
                }
                Constant::String { string_index } => {
                    out.push(TAG_STRING);
                    out.extend_from_slice(&string_index.to_be_bytes());
                }
                Constant::FieldRef(m) | Constant::MethodRef(m) | Constant::InterfaceMethodRef(m) => {
                    out.push(match constant {
                        Constant::FieldRef(_) => TAG_FIELDREF,
                        Constant::MethodRef(_) => TAG_METHODREF,
                        _ => TAG_INTERFACE_METHODREF,
                    });
                    out.extend_from_slice(&m.class_index.to_be_bytes());
                    out.extend_from_slice(&m.name_and_type_index.to_be_bytes());
                }
                Constant::NameAndType {
                    name_index,
                    descriptor_index,
                } => {
                    out.push(TAG_NAME_AND_TYPE);
                    out.extend_from_slice(&name_index.to_be_bytes());
                    out.extend_from_slice(&descriptor_index.to_be_bytes());
                }
                Constant::MethodHandle {
                    reference_kind,
                    reference_index,
                } => {
                    out.push(TAG_METHOD_HANDLE);
                    out.push(*reference_kind);
                    out.extend_from_slice(&reference_index.to_be_bytes());
                }
                Constant::MethodType { descriptor_index } => {
                    out.push(TAG_METHOD_TYPE);
                    out.extend_from_slice(&descriptor_index.to_be_bytes());
                }
                Constant::Dynamic(d) | Constant::InvokeDynamic(d) => {
                    out.push(if matches!(constant, Constant::Dynamic(_)) {
                        TAG_DYNAMIC
                    } else {
                        TAG_INVOKE_DYNAMIC
                    });
                    out.extend_from_slice(&d.bootstrap_method_attr_index.to_be_bytes());
                    out.extend_from_slice(&d.name_and_type_index.to_be_bytes());
                }
                Constant::Module { name_index } => {
                    out.push(TAG_MODULE);
                    out.extend_from_slice(&name_index.to_be_bytes());
                }
                Constant::Package { name_index } => {
                    out.push(TAG_PACKAGE);
                    out.extend_from_slice(&name_index.to_be_bytes());
                }
            }
        }
        Ok(())
    }

    /// Number of slots, including the unusable slot 0.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }

    pub fn get(&self, index: u16) -> Result<&Constant> {
        match self.entries.get(index as usize) {
            Some(Constant::Unusable) | None => Err(ClassFileError::BadConstantIndex { index }),
            Some(constant) => Ok(constant),
        }
    }

    pub fn get_mut(&mut self, index: u16) -> Result<&mut Constant> {
        match self.entries.get_mut(index as usize) {
            Some(Constant::Unusable) | None => Err(ClassFileError::BadConstantIndex { index }),
            Some(constant) => Ok(constant),
        }
    }

    /// Iterate over usable entries with their indices.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &Constant)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, c)| !matches!(c, Constant::Unusable))
            .map(|(i, c)| (i as u16, c))
    }

    pub fn utf8(&self, index: u16) -> Result<String> {
        match self.get(index)? {
            Constant::Utf8(bytes) => {
                decode_modified_utf8(bytes).ok_or(ClassFileError::InvalidUtf8 { index })
            }
            _ => Err(ClassFileError::WrongConstantKind {
                index,
                expected: "Utf8",
            }),
        }
    }

    /// Internal name (or array descriptor) referenced by a `Class` entry.
    pub fn class_name(&self, index: u16) -> Result<String> {
        match self.get(index)? {
            Constant::Class { name_index } => self.utf8(*name_index),
            _ => Err(ClassFileError::WrongConstantKind {
                index,
                expected: "Class",
            }),
        }
    }

    /// `(name, descriptor)` of a `NameAndType` entry.
    pub fn name_and_type(&self, index: u16) -> Result<(String, String)> {
        match self.get(index)? {
            Constant::NameAndType {
                name_index,
                descriptor_index,
            } => Ok((self.utf8(*name_index)?, self.utf8(*descriptor_index)?)),
            _ => Err(ClassFileError::WrongConstantKind {
                index,
                expected: "NameAndType",
            }),
        }
    }

    /// Append an entry and return its index.
    pub fn push(&mut self, constant: Constant) -> Result<u16> {
        let slots = if constant.is_wide() { 2 } else { 1 };
        if self.entries.len() + slots > u16::MAX as usize {
            return Err(ClassFileError::ConstantPoolOverflow);
        }
        let index = self.entries.len() as u16;
        let wide = constant.is_wide();
        self.entries.push(constant);
        if wide {
            self.entries.push(Constant::Unusable);
        }
        Ok(index)
    }

    pub fn find_utf8(&self, value: &str) -> Option<u16> {
        let encoded = encode_modified_utf8(value);
        self.iter().find_map(|(index, c)| match c {
            Constant::Utf8(bytes) if *bytes == encoded => Some(index),
            _ => None,
        })
    }

    pub fn intern_utf8(&mut self, value: &str) -> Result<u16> {
        match self.find_utf8(value) {
            Some(index) => Ok(index),
            None => self.push(Constant::Utf8(encode_modified_utf8(value))),
        }
    }

    pub fn intern_class(&mut self, name: &str) -> Result<u16> {
        let name_index = self.intern_utf8(name)?;
        let existing = self.iter().find_map(|(index, c)| match c {
            Constant::Class { name_index: n } if *n == name_index => Some(index),
            _ => None,
        });
        match existing {
            Some(index) => Ok(index),
            None => self.push(Constant::Class { name_index }),
        }
    }

    pub fn intern_name_and_type(&mut self, name: &str, descriptor: &str) -> Result<u16> {
        let name_index = self.intern_utf8(name)?;
        let descriptor_index = self.intern_utf8(descriptor)?;
        let existing = self.iter().find_map(|(index, c)| match c {
            Constant::NameAndType {
                name_index: n,
                descriptor_index: d,
            } if *n == name_index && *d == descriptor_index => Some(index),
            _ => None,
        });
        match existing {
            Some(index) => Ok(index),
            None => self.push(Constant::NameAndType {
                name_index,
                descriptor_index,
            }),
        }
    }
}

/// Decode JVM modified UTF-8. Lone surrogates are replaced with U+FFFD.
pub fn decode_modified_utf8(bytes: &[u8]) -> Option<String> {
    if let Ok(s) = std::str::from_utf8(bytes) {
        return Some(s.to_string());
    }

    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b & 0x80 == 0 {
            units.push(b as u16);
            i += 1;
        } else if b & 0xE0 == 0xC0 {
            let b2 = *bytes.get(i + 1)?;
            if b2 & 0xC0 != 0x80 {
                return None;
            }
            units.push((((b & 0x1F) as u16) << 6) | (b2 & 0x3F) as u16);
            i += 2;
        } else if b & 0xF0 == 0xE0 {
            let b2 = *bytes.get(i + 1)?;
            let b3 = *bytes.get(i + 2)?;
            if b2 & 0xC0 != 0x80 || b3 & 0xC0 != 0x80 {
                return None;
            }
            units.push(
                (((b & 0x0F) as u16) << 12) | (((b2 & 0x3F) as u16) << 6) | (b3 & 0x3F) as u16,
            );
            i += 3;
        } else {
            return None;
        }
    }
    Some(String::from_utf16_lossy(&units))
}

/// Encode a string as JVM modified UTF-8.
pub fn encode_modified_utf8(value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    for unit in value.encode_utf16() {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | (unit >> 6) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | (unit >> 12) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    out
}
