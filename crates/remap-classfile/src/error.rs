//! Error type shared by the parser, the serializer and the rename pass.

use thiserror::Error;

/// Errors raised while decoding or editing a class file.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClassFileError {
    #[error("not a class file (bad magic 0x{0:08x})")]
    BadMagic(u32),

    #[error("unexpected end of data at offset {offset} (wanted {wanted} more bytes)")]
    UnexpectedEof { offset: usize, wanted: usize },

    #[error("unknown constant pool tag {tag} at index {index}")]
    UnknownConstantTag { tag: u8, index: u16 },

    #[error("constant pool index {index} is out of range")]
    BadConstantIndex { index: u16 },

    #[error("constant pool entry {index} is not a {expected}")]
    WrongConstantKind { index: u16, expected: &'static str },

    #[error("constant pool entry {index} holds malformed modified UTF-8")]
    InvalidUtf8 { index: u16 },

    #[error("constant pool is full (more than 65535 slots)")]
    ConstantPoolOverflow,

    #[error("UTF-8 constant of {length} bytes exceeds the 65535-byte limit")]
    Utf8TooLong { length: usize },

    #[error("malformed {name} attribute")]
    MalformedAttribute { name: String },

    #[error("attribute {name} is larger than 4 GiB")]
    AttributeTooLarge { name: String },
}

pub type Result<T> = std::result::Result<T, ClassFileError>;
