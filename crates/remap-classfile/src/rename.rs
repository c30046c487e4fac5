//! The rename pass: `apply_rename(class, remapper) -> class`.
//!
//! The input is never touched. The output shares every constant pool slot with
//! the input; renamed strings and name-and-type pairs are appended, and the
//! entries and attributes that reference them are repointed. UTF-8 slots are
//! never rewritten in place because a single slot may back both a symbol and
//! an unrelated string literal. Attribute bodies keep their length (only u16
//! indices change), so they are patched in place on a copy.

use std::collections::HashMap;

use tracing::trace;

use crate::attributes::{
    decode_inner_classes, ANNOTATION_DEFAULT, CODE, ENCLOSING_METHOD, INNER_CLASSES,
    LOCAL_VARIABLE_TABLE, LOCAL_VARIABLE_TYPE_TABLE, RECORD, RUNTIME_INVISIBLE_ANNOTATIONS,
    RUNTIME_INVISIBLE_PARAMETER_ANNOTATIONS, RUNTIME_INVISIBLE_TYPE_ANNOTATIONS,
    RUNTIME_VISIBLE_ANNOTATIONS, RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS,
    RUNTIME_VISIBLE_TYPE_ANNOTATIONS, SIGNATURE,
};
use crate::bytes::{read_u16_at, read_u32_at, read_u8_at, write_u16_at};
use crate::class_file::{AttributeInfo, ClassFile, MemberInfo};
use crate::constant_pool::{encode_modified_utf8, Constant, DynamicRef, MemberRef};
use crate::error::{ClassFileError, Result};
use crate::remapper::{Remapper, SignatureKind};

/// Rename every symbol of `class` through `remapper`.
///
/// A remapper that maps everything to itself yields a class that serializes
/// to the same bytes as the input.
pub fn apply_rename(class: &ClassFile, remapper: &dyn Remapper) -> Result<ClassFile> {
    let mut renamer = Renamer::new(class, remapper)?;
    renamer.constant_pool()?;
    renamer.members()?;
    renamer.class_attributes()?;
    Ok(renamer.out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MemberKind {
    Field,
    Method,
}

/// Where an attribute sits; decides which attributes are meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Site {
    Class,
    Field,
    Method,
    Code,
    RecordComponent,
}

struct Renamer<'a> {
    original: &'a ClassFile,
    remapper: &'a dyn Remapper,
    /// Original internal name of the class being renamed.
    owner: String,
    out: ClassFile,
    utf8_index: HashMap<String, u16>,
    name_and_type_index: HashMap<(u16, u16), u16>,
}

impl<'a> Renamer<'a> {
    fn new(original: &'a ClassFile, remapper: &'a dyn Remapper) -> Result<Self> {
        let mut utf8_index = HashMap::new();
        let mut name_and_type_index = HashMap::new();
        for (index, constant) in original.constant_pool.iter() {
            match constant {
                Constant::Utf8(_) => {
                    if let Ok(value) = original.constant_pool.utf8(index) {
                        utf8_index.entry(value).or_insert(index);
                    }
                }
                Constant::NameAndType {
                    name_index,
                    descriptor_index,
                } => {
                    name_and_type_index
                        .entry((*name_index, *descriptor_index))
                        .or_insert(index);
                }
                _ => {}
            }
        }

        Ok(Self {
            original,
            remapper,
            owner: original.name()?,
            out: original.clone(),
            utf8_index,
            name_and_type_index,
        })
    }

    fn intern_utf8(&mut self, value: &str) -> Result<u16> {
        if let Some(index) = self.utf8_index.get(value) {
            return Ok(*index);
        }
        let index = self
            .out
            .constant_pool
            .push(Constant::Utf8(encode_modified_utf8(value)))?;
        self.utf8_index.insert(value.to_string(), index);
        Ok(index)
    }

    fn intern_name_and_type(&mut self, name: &str, descriptor: &str) -> Result<u16> {
        let key = (self.intern_utf8(name)?, self.intern_utf8(descriptor)?);
        if let Some(index) = self.name_and_type_index.get(&key) {
            return Ok(*index);
        }
        let index = self.out.constant_pool.push(Constant::NameAndType {
            name_index: key.0,
            descriptor_index: key.1,
        })?;
        self.name_and_type_index.insert(key, index);
        Ok(index)
    }

    /// Remap the string at `index`; `Some(new_index)` only if it changed.
    fn remap_utf8(
        &mut self,
        index: u16,
        map: impl FnOnce(&dyn Remapper, &str) -> String,
    ) -> Result<Option<u16>> {
        let old = self.original.constant_pool.utf8(index)?;
        let new = map(self.remapper, &old);
        if new == old {
            return Ok(None);
        }
        self.intern_utf8(&new).map(Some)
    }

    // =========================================================================
    // Constant pool
    // =========================================================================

    fn constant_pool(&mut self) -> Result<()> {
        let original = self.original;
        for (index, constant) in original.constant_pool.iter() {
            let replacement = match *constant {
                Constant::Class { name_index } => {
                    match self.remap_utf8(name_index, |r, name| r.map_type(name))? {
                        Some(name_index) => Constant::Class { name_index },
                        None => continue,
                    }
                }
                Constant::FieldRef(member) => match self.member_ref(member, MemberKind::Field)? {
                    Some(member) => Constant::FieldRef(member),
                    None => continue,
                },
                Constant::MethodRef(member) => match self.member_ref(member, MemberKind::Method)? {
                    Some(member) => Constant::MethodRef(member),
                    None => continue,
                },
                Constant::InterfaceMethodRef(member) => {
                    match self.member_ref(member, MemberKind::Method)? {
                        Some(member) => Constant::InterfaceMethodRef(member),
                        None => continue,
                    }
                }
                Constant::MethodType { descriptor_index } => {
                    match self.remap_utf8(descriptor_index, |r, d| r.map_descriptor(d))? {
                        Some(descriptor_index) => Constant::MethodType { descriptor_index },
                        None => continue,
                    }
                }
                Constant::InvokeDynamic(dynamic) => match self.dynamic_ref(dynamic)? {
                    Some(dynamic) => Constant::InvokeDynamic(dynamic),
                    None => continue,
                },
                Constant::Dynamic(dynamic) => match self.dynamic_ref(dynamic)? {
                    Some(dynamic) => Constant::Dynamic(dynamic),
                    None => continue,
                },
                _ => continue,
            };
            *self.out.constant_pool.get_mut(index)? = replacement;
        }
        Ok(())
    }

    fn member_ref(&mut self, member: MemberRef, kind: MemberKind) -> Result<Option<MemberRef>> {
        let pool = &self.original.constant_pool;
        let owner = pool.class_name(member.class_index)?;
        let (name, descriptor) = pool.name_and_type(member.name_and_type_index)?;
        let new_name = match kind {
            MemberKind::Field => self.remapper.map_field_name(&owner, &name, &descriptor),
            MemberKind::Method => self.remapper.map_method_name(&owner, &name, &descriptor),
        };
        let new_descriptor = self.remapper.map_descriptor(&descriptor);
        if new_name == name && new_descriptor == descriptor {
            return Ok(None);
        }
        trace!(%owner, %name, %new_name, "member reference");
        Ok(Some(MemberRef {
            class_index: member.class_index,
            name_and_type_index: self.intern_name_and_type(&new_name, &new_descriptor)?,
        }))
    }

    /// Call-site names are left alone; only the descriptor follows the renames.
    fn dynamic_ref(&mut self, dynamic: DynamicRef) -> Result<Option<DynamicRef>> {
        let (name, descriptor) = self
            .original
            .constant_pool
            .name_and_type(dynamic.name_and_type_index)?;
        let new_descriptor = self.remapper.map_descriptor(&descriptor);
        if new_descriptor == descriptor {
            return Ok(None);
        }
        Ok(Some(DynamicRef {
            bootstrap_method_attr_index: dynamic.bootstrap_method_attr_index,
            name_and_type_index: self.intern_name_and_type(&name, &new_descriptor)?,
        }))
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    fn members(&mut self) -> Result<()> {
        let original = self.original;
        for (i, field) in original.fields.iter().enumerate() {
            self.out.fields[i] = self.member(field, MemberKind::Field)?;
        }
        for (i, method) in original.methods.iter().enumerate() {
            self.out.methods[i] = self.member(method, MemberKind::Method)?;
        }
        Ok(())
    }

    fn member(&mut self, member: &MemberInfo, kind: MemberKind) -> Result<MemberInfo> {
        let pool = &self.original.constant_pool;
        let name = pool.utf8(member.name_index)?;
        let descriptor = pool.utf8(member.descriptor_index)?;
        let new_name = match kind {
            MemberKind::Field => self.remapper.map_field_name(&self.owner, &name, &descriptor),
            MemberKind::Method => self.remapper.map_method_name(&self.owner, &name, &descriptor),
        };

        let mut out = member.clone();
        if new_name != name {
            trace!(owner = %self.owner, %name, %new_name, ?kind, "declaration");
            out.name_index = self.intern_utf8(&new_name)?;
        }
        if let Some(index) = self.remap_utf8(member.descriptor_index, |r, d| r.map_descriptor(d))? {
            out.descriptor_index = index;
        }

        let site = match kind {
            MemberKind::Field => Site::Field,
            MemberKind::Method => Site::Method,
        };
        for attribute in &mut out.attributes {
            self.attribute(attribute, site)?;
        }
        Ok(out)
    }

    fn class_attributes(&mut self) -> Result<()> {
        let mut attributes = std::mem::take(&mut self.out.attributes);
        for attribute in &mut attributes {
            self.attribute(attribute, Site::Class)?;
        }
        self.out.attributes = attributes;
        Ok(())
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    fn attribute(&mut self, attribute: &mut AttributeInfo, site: Site) -> Result<()> {
        let name = self.original.constant_pool.utf8(attribute.name_index)?;
        self.attribute_body(&name, &mut attribute.info, site)
            .map_err(|err| match err {
                ClassFileError::UnexpectedEof { .. } | ClassFileError::MalformedAttribute { .. } => {
                    ClassFileError::MalformedAttribute { name: name.clone() }
                }
                other => other,
            })
    }

    fn attribute_body(&mut self, name: &str, buf: &mut [u8], site: Site) -> Result<()> {
        match name {
            SIGNATURE => {
                let kind = match site {
                    Site::Class => SignatureKind::Class,
                    Site::Method => SignatureKind::Method,
                    _ => SignatureKind::Field,
                };
                self.signature_at(buf, 0, kind)
            }
            CODE if site == Site::Method => self.code(buf),
            LOCAL_VARIABLE_TABLE if site == Site::Code => self.local_variables(buf, false),
            LOCAL_VARIABLE_TYPE_TABLE if site == Site::Code => self.local_variables(buf, true),
            ENCLOSING_METHOD if site == Site::Class => self.enclosing_method(buf),
            INNER_CLASSES if site == Site::Class => self.inner_classes(buf),
            RECORD if site == Site::Class => self.record(buf),
            RUNTIME_VISIBLE_ANNOTATIONS | RUNTIME_INVISIBLE_ANNOTATIONS => {
                self.annotations(buf, 0).map(drop)
            }
            RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS | RUNTIME_INVISIBLE_PARAMETER_ANNOTATIONS => {
                self.parameter_annotations(buf)
            }
            RUNTIME_VISIBLE_TYPE_ANNOTATIONS | RUNTIME_INVISIBLE_TYPE_ANNOTATIONS => {
                self.type_annotations(buf)
            }
            ANNOTATION_DEFAULT if site == Site::Method => self.element_value(buf, 0).map(drop),
            _ => Ok(()),
        }
    }

    fn descriptor_at(&mut self, buf: &mut [u8], pos: usize) -> Result<()> {
        let index = read_u16_at(buf, pos)?;
        if let Some(new_index) = self.remap_utf8(index, |r, d| r.map_descriptor(d))? {
            write_u16_at(buf, pos, new_index)?;
        }
        Ok(())
    }

    fn signature_at(&mut self, buf: &mut [u8], pos: usize, kind: SignatureKind) -> Result<()> {
        let index = read_u16_at(buf, pos)?;
        if let Some(new_index) = self.remap_utf8(index, |r, s| r.map_signature(s, kind))? {
            write_u16_at(buf, pos, new_index)?;
        }
        Ok(())
    }

    /// Walk an `attributes_count` + attributes block at `pos`; returns its end.
    fn nested_attributes(&mut self, buf: &mut [u8], pos: usize, site: Site) -> Result<usize> {
        let count = read_u16_at(buf, pos)?;
        let mut pos = pos + 2;
        for _ in 0..count {
            let name_index = read_u16_at(buf, pos)?;
            let len = read_u32_at(buf, pos + 2)? as usize;
            let start = pos + 6;
            let end = start
                .checked_add(len)
                .filter(|end| *end <= buf.len())
                .ok_or(ClassFileError::UnexpectedEof {
                    offset: start,
                    wanted: len,
                })?;
            let name = self.original.constant_pool.utf8(name_index)?;
            self.attribute_body(&name, &mut buf[start..end], site)?;
            pos = end;
        }
        Ok(pos)
    }

    fn code(&mut self, buf: &mut [u8]) -> Result<()> {
        let code_length = read_u32_at(buf, 4)? as usize;
        let exception_table = 8 + code_length;
        let exceptions = read_u16_at(buf, exception_table)? as usize;
        self.nested_attributes(buf, exception_table + 2 + exceptions * 8, Site::Code)?;
        Ok(())
    }

    /// Variable names are kept; only their types follow the renames.
    fn local_variables(&mut self, buf: &mut [u8], generic: bool) -> Result<()> {
        let count = read_u16_at(buf, 0)? as usize;
        for i in 0..count {
            let type_pos = 2 + i * 10 + 6;
            if generic {
                self.signature_at(buf, type_pos, SignatureKind::Field)?;
            } else {
                self.descriptor_at(buf, type_pos)?;
            }
        }
        Ok(())
    }

    fn enclosing_method(&mut self, buf: &mut [u8]) -> Result<()> {
        let class_index = read_u16_at(buf, 0)?;
        let method_index = read_u16_at(buf, 2)?;
        if method_index == 0 {
            return Ok(());
        }
        let pool = &self.original.constant_pool;
        let owner = pool.class_name(class_index)?;
        let (name, descriptor) = pool.name_and_type(method_index)?;
        let new_name = self.remapper.map_method_name(&owner, &name, &descriptor);
        let new_descriptor = self.remapper.map_descriptor(&descriptor);
        if new_name != name || new_descriptor != descriptor {
            let index = self.intern_name_and_type(&new_name, &new_descriptor)?;
            write_u16_at(buf, 2, index)?;
        }
        Ok(())
    }

    fn inner_classes(&mut self, buf: &mut [u8]) -> Result<()> {
        let original = self.original;
        let pool = &original.constant_pool;
        for (i, entry) in decode_inner_classes(buf)?.iter().enumerate() {
            if entry.inner_class_info_index == 0 || entry.inner_name_index == 0 {
                continue;
            }
            let name = pool.class_name(entry.inner_class_info_index)?;
            let mapped = self.remapper.map_type(&name);
            if mapped == name {
                continue;
            }
            let inner_name = pool.utf8(entry.inner_name_index)?;
            if let Some(simple) = inner_simple_name(&mapped) {
                if simple != inner_name {
                    let index = self.intern_utf8(&simple)?;
                    write_u16_at(buf, 2 + i * 8 + 4, index)?;
                }
            }
        }
        Ok(())
    }

    fn record(&mut self, buf: &mut [u8]) -> Result<()> {
        let original = self.original;
        let pool = &original.constant_pool;
        let count = read_u16_at(buf, 0)?;
        let mut pos = 2;
        for _ in 0..count {
            let name = pool.utf8(read_u16_at(buf, pos)?)?;
            let descriptor = pool.utf8(read_u16_at(buf, pos + 2)?)?;
            // components mirror the backing fields, so they follow field renames
            let new_name = self.remapper.map_field_name(&self.owner, &name, &descriptor);
            if new_name != name {
                let index = self.intern_utf8(&new_name)?;
                write_u16_at(buf, pos, index)?;
            }
            self.descriptor_at(buf, pos + 2)?;
            pos = self.nested_attributes(buf, pos + 4, Site::RecordComponent)?;
        }
        Ok(())
    }

    fn annotations(&mut self, buf: &mut [u8], pos: usize) -> Result<usize> {
        let count = read_u16_at(buf, pos)?;
        let mut pos = pos + 2;
        for _ in 0..count {
            pos = self.annotation(buf, pos)?;
        }
        Ok(pos)
    }

    fn annotation(&mut self, buf: &mut [u8], pos: usize) -> Result<usize> {
        self.descriptor_at(buf, pos)?;
        let pairs = read_u16_at(buf, pos + 2)?;
        let mut pos = pos + 4;
        for _ in 0..pairs {
            // element_name_index, then the value
            pos = self.element_value(buf, pos + 2)?;
        }
        Ok(pos)
    }

    fn element_value(&mut self, buf: &mut [u8], pos: usize) -> Result<usize> {
        let tag = read_u8_at(buf, pos)?;
        let pos = pos + 1;
        match tag {
            b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b's' => Ok(pos + 2),
            b'e' => {
                self.descriptor_at(buf, pos)?;
                Ok(pos + 4)
            }
            b'c' => {
                self.descriptor_at(buf, pos)?;
                Ok(pos + 2)
            }
            b'@' => self.annotation(buf, pos),
            b'[' => {
                let count = read_u16_at(buf, pos)?;
                let mut pos = pos + 2;
                for _ in 0..count {
                    pos = self.element_value(buf, pos)?;
                }
                Ok(pos)
            }
            _ => Err(malformed()),
        }
    }

    fn parameter_annotations(&mut self, buf: &mut [u8]) -> Result<()> {
        let parameters = read_u8_at(buf, 0)?;
        let mut pos = 1;
        for _ in 0..parameters {
            pos = self.annotations(buf, pos)?;
        }
        Ok(())
    }

    fn type_annotations(&mut self, buf: &mut [u8]) -> Result<()> {
        let count = read_u16_at(buf, 0)?;
        let mut pos = 2;
        for _ in 0..count {
            let target_type = read_u8_at(buf, pos)?;
            pos += 1;
            pos += match target_type {
                0x13..=0x15 => 0,
                0x00 | 0x01 | 0x16 => 1,
                0x10 | 0x11 | 0x12 | 0x17 | 0x42..=0x46 => 2,
                0x47..=0x4B => 3,
                0x40 | 0x41 => 2 + read_u16_at(buf, pos)? as usize * 6,
                _ => return Err(malformed()),
            };
            let path_length = read_u8_at(buf, pos)? as usize;
            pos += 1 + path_length * 2;
            pos = self.annotation(buf, pos)?;
        }
        Ok(())
    }
}

fn malformed() -> ClassFileError {
    ClassFileError::MalformedAttribute {
        name: String::new(),
    }
}

/// Simple name recorded in `InnerClasses` for a renamed nested class:
/// the part after the last `$` minus any leading digits, or the part after
/// the last `/` when the new name is no longer nested.
fn inner_simple_name(mapped: &str) -> Option<String> {
    let start = match mapped.rfind('$') {
        Some(dollar) => {
            let tail = &mapped[dollar + 1..];
            let digits = tail.len() - tail.trim_start_matches(|c: char| c.is_ascii_digit()).len();
            dollar + 1 + digits
        }
        None => mapped.rfind('/').map(|slash| slash + 1).unwrap_or(0),
    };
    let simple = &mapped[start..];
    (!simple.is_empty()).then(|| simple.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inner_simple_name() {
        assert_eq!(inner_simple_name("x/Host$Nested").as_deref(), Some("Nested"));
        assert_eq!(inner_simple_name("x/Host$1Local").as_deref(), Some("Local"));
        assert_eq!(inner_simple_name("x/Free").as_deref(), Some("Free"));
        assert_eq!(inner_simple_name("x/Host$12"), None);
    }
}
