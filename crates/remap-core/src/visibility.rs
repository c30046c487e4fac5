//! Force declared members public.

use remap_classfile::access::{ACC_PUBLIC, VISIBILITY_MASK};
use remap_classfile::attributes::{decode_inner_classes, encode_inner_classes, INNER_CLASSES};
use remap_classfile::{ClassFile, Result};

/// Clear the visibility bits and set `ACC_PUBLIC`; other modifiers are kept.
pub fn to_public(access_flags: u16) -> u16 {
    (access_flags & !VISIBILITY_MASK) | ACC_PUBLIC
}

/// Make every declared field, method and `InnerClasses` row of `class` public.
/// The class's own access flags and references to other classes' members are
/// left alone.
pub fn normalize_visibility(class: &mut ClassFile) -> Result<()> {
    for member in class.fields.iter_mut().chain(class.methods.iter_mut()) {
        member.access_flags = to_public(member.access_flags);
    }

    for position in class.find_attributes(INNER_CLASSES) {
        let attribute = &mut class.attributes[position];
        let mut entries = decode_inner_classes(&attribute.info)?;
        for entry in &mut entries {
            entry.access_flags = to_public(entry.access_flags);
        }
        attribute.info = encode_inner_classes(&entries);
    }
    Ok(())
}
