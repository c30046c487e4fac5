//! Attribute names and decoders for the attributes other crates need to edit.

use crate::bytes::ByteReader;
use crate::class_file::{AttributeInfo, ClassFile};
use crate::error::Result;

pub const CODE: &str = "Code";
pub const SIGNATURE: &str = "Signature";
pub const INNER_CLASSES: &str = "InnerClasses";
pub const ENCLOSING_METHOD: &str = "EnclosingMethod";
pub const RECORD: &str = "Record";
pub const LOCAL_VARIABLE_TABLE: &str = "LocalVariableTable";
pub const LOCAL_VARIABLE_TYPE_TABLE: &str = "LocalVariableTypeTable";
pub const RUNTIME_VISIBLE_ANNOTATIONS: &str = "RuntimeVisibleAnnotations";
pub const RUNTIME_INVISIBLE_ANNOTATIONS: &str = "RuntimeInvisibleAnnotations";
pub const RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS: &str = "RuntimeVisibleParameterAnnotations";
pub const RUNTIME_INVISIBLE_PARAMETER_ANNOTATIONS: &str = "RuntimeInvisibleParameterAnnotations";
pub const RUNTIME_VISIBLE_TYPE_ANNOTATIONS: &str = "RuntimeVisibleTypeAnnotations";
pub const RUNTIME_INVISIBLE_TYPE_ANNOTATIONS: &str = "RuntimeInvisibleTypeAnnotations";
pub const ANNOTATION_DEFAULT: &str = "AnnotationDefault";

/// One row of an `InnerClasses` attribute. Index 0 means "absent".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InnerClassEntry {
    pub inner_class_info_index: u16,
    pub outer_class_info_index: u16,
    pub inner_name_index: u16,
    pub access_flags: u16,
}

pub fn decode_inner_classes(info: &[u8]) -> Result<Vec<InnerClassEntry>> {
    let mut reader = ByteReader::new(info);
    let count = reader.u16()?;
    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        entries.push(InnerClassEntry {
            inner_class_info_index: reader.u16()?,
            outer_class_info_index: reader.u16()?,
            inner_name_index: reader.u16()?,
            access_flags: reader.u16()?,
        });
    }
    Ok(entries)
}

pub fn encode_inner_classes(entries: &[InnerClassEntry]) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + entries.len() * 8);
    out.extend_from_slice(&(entries.len() as u16).to_be_bytes());
    for entry in entries {
        out.extend_from_slice(&entry.inner_class_info_index.to_be_bytes());
        out.extend_from_slice(&entry.outer_class_info_index.to_be_bytes());
        out.extend_from_slice(&entry.inner_name_index.to_be_bytes());
        out.extend_from_slice(&entry.access_flags.to_be_bytes());
    }
    out
}

impl ClassFile {
    /// Positions of class-level attributes called `name`.
    pub fn find_attributes(&self, name: &str) -> Vec<usize> {
        self.attributes
            .iter()
            .enumerate()
            .filter(|(_, attribute)| self.is_named(attribute, name))
            .map(|(i, _)| i)
            .collect()
    }

    pub(crate) fn is_named(&self, attribute: &AttributeInfo, name: &str) -> bool {
        self.attribute_name(attribute)
            .map(|n| n == name)
            .unwrap_or(false)
    }
}
