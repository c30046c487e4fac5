//! Structural class definition and its binary form.

use crate::bytes::ByteReader;
use crate::constant_pool::ConstantPool;
use crate::error::{ClassFileError, Result};

pub const MAGIC: u32 = 0xCAFE_BABE;

/// Raw attribute. Bodies are kept opaque; the rename pass patches the ones
/// that carry symbols.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeInfo {
    pub name_index: u16,
    pub info: Vec<u8>,
}

/// A declared field or method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    pub access_flags: u16,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Vec<AttributeInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassFile {
    pub minor_version: u16,
    pub major_version: u16,
    pub constant_pool: ConstantPool,
    pub access_flags: u16,
    pub this_class: u16,
    /// 0 for `java/lang/Object` and module descriptors.
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<MemberInfo>,
    pub methods: Vec<MemberInfo>,
    pub attributes: Vec<AttributeInfo>,
}

impl ClassFile {
    /// Decode a complete class file.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(data);
        let (minor_version, major_version) = read_prologue(&mut reader)?;
        let constant_pool = ConstantPool::parse(&mut reader)?;
        let access_flags = reader.u16()?;
        let this_class = reader.u16()?;
        let super_class = reader.u16()?;
        let interfaces = read_u16_list(&mut reader)?;
        let fields = read_members(&mut reader)?;
        let methods = read_members(&mut reader)?;
        let attributes = read_attributes(&mut reader)?;

        Ok(Self {
            minor_version,
            major_version,
            constant_pool,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        })
    }

    /// Encode back to the binary form.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(1024);
        out.extend_from_slice(&MAGIC.to_be_bytes());
        out.extend_from_slice(&self.minor_version.to_be_bytes());
        out.extend_from_slice(&self.major_version.to_be_bytes());
        self.constant_pool.write(&mut out)?;
        out.extend_from_slice(&self.access_flags.to_be_bytes());
        out.extend_from_slice(&self.this_class.to_be_bytes());
        out.extend_from_slice(&self.super_class.to_be_bytes());
        out.extend_from_slice(&(self.interfaces.len() as u16).to_be_bytes());
        for interface in &self.interfaces {
            out.extend_from_slice(&interface.to_be_bytes());
        }
        self.write_members(&self.fields, &mut out)?;
        self.write_members(&self.methods, &mut out)?;
        self.write_attributes(&self.attributes, &mut out)?;
        Ok(out)
    }

    fn write_members(&self, members: &[MemberInfo], out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(&(members.len() as u16).to_be_bytes());
        for member in members {
            out.extend_from_slice(&member.access_flags.to_be_bytes());
            out.extend_from_slice(&member.name_index.to_be_bytes());
            out.extend_from_slice(&member.descriptor_index.to_be_bytes());
            self.write_attributes(&member.attributes, out)?;
        }
        Ok(())
    }

    fn write_attributes(&self, attributes: &[AttributeInfo], out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(&(attributes.len() as u16).to_be_bytes());
        for attribute in attributes {
            let len = u32::try_from(attribute.info.len()).map_err(|_| {
                ClassFileError::AttributeTooLarge {
                    name: self
                        .constant_pool
                        .utf8(attribute.name_index)
                        .unwrap_or_default(),
                }
            })?;
            out.extend_from_slice(&attribute.name_index.to_be_bytes());
            out.extend_from_slice(&len.to_be_bytes());
            out.extend_from_slice(&attribute.info);
        }
        Ok(())
    }

    /// Internal name of this class.
    pub fn name(&self) -> Result<String> {
        self.constant_pool.class_name(self.this_class)
    }

    pub fn super_name(&self) -> Result<Option<String>> {
        if self.super_class == 0 {
            return Ok(None);
        }
        self.constant_pool.class_name(self.super_class).map(Some)
    }

    pub fn interface_names(&self) -> Result<Vec<String>> {
        self.interfaces
            .iter()
            .map(|index| self.constant_pool.class_name(*index))
            .collect()
    }

    pub fn attribute_name(&self, attribute: &AttributeInfo) -> Result<String> {
        self.constant_pool.utf8(attribute.name_index)
    }

    pub fn member_name(&self, member: &MemberInfo) -> Result<String> {
        self.constant_pool.utf8(member.name_index)
    }

    pub fn member_descriptor(&self, member: &MemberInfo) -> Result<String> {
        self.constant_pool.utf8(member.descriptor_index)
    }
}

/// The structural header of a class: its own name, super class and
/// interfaces in declaration order. Parsing stops after the interface table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassHeader {
    pub access_flags: u16,
    pub name: String,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
}

impl ClassHeader {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(data);
        read_prologue(&mut reader)?;
        let pool = ConstantPool::parse(&mut reader)?;
        let access_flags = reader.u16()?;
        let this_class = reader.u16()?;
        let super_class = reader.u16()?;
        let interfaces = read_u16_list(&mut reader)?
            .into_iter()
            .map(|index| pool.class_name(index))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            access_flags,
            name: pool.class_name(this_class)?,
            super_name: if super_class == 0 {
                None
            } else {
                Some(pool.class_name(super_class)?)
            },
            interfaces,
        })
    }
}

fn read_prologue(reader: &mut ByteReader<'_>) -> Result<(u16, u16)> {
    let magic = reader.u32()?;
    if magic != MAGIC {
        return Err(ClassFileError::BadMagic(magic));
    }
    let minor = reader.u16()?;
    let major = reader.u16()?;
    Ok((minor, major))
}

fn read_u16_list(reader: &mut ByteReader<'_>) -> Result<Vec<u16>> {
    let count = reader.u16()?;
    (0..count).map(|_| reader.u16()).collect()
}

fn read_members(reader: &mut ByteReader<'_>) -> Result<Vec<MemberInfo>> {
    let count = reader.u16()?;
    let mut members = Vec::with_capacity(count as usize);
    for _ in 0..count {
        members.push(MemberInfo {
            access_flags: reader.u16()?,
            name_index: reader.u16()?,
            descriptor_index: reader.u16()?,
            attributes: read_attributes(reader)?,
        });
    }
    Ok(members)
}

pub(crate) fn read_attributes(reader: &mut ByteReader<'_>) -> Result<Vec<AttributeInfo>> {
    let count = reader.u16()?;
    let mut attributes = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let name_index = reader.u16()?;
        let len = reader.u32()? as usize;
        attributes.push(AttributeInfo {
            name_index,
            info: reader.take(len)?.to_vec(),
        });
    }
    Ok(attributes)
}
