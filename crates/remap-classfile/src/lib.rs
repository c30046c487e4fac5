//! JVM class-file model for the remapper.
//!
//! - [`ClassFile`] / [`ClassHeader`]: decode and re-encode class bytes
//! - [`Remapper`]: the naming capability a rename pass consults
//! - [`apply_rename`]: rewrite every symbol of a class through a [`Remapper`]
//! - `ClassFileBuilder`: synthesise small classes for tests (`test-support` feature)

pub mod access;
pub mod attributes;
#[cfg(any(test, feature = "test-support"))]
mod builder;
mod bytes;
mod class_file;
mod constant_pool;
mod error;
mod remapper;
mod rename;

#[cfg(any(test, feature = "test-support"))]
pub use builder::{ClassFileBuilder, DEFAULT_MAJOR_VERSION};
pub use class_file::{AttributeInfo, ClassFile, ClassHeader, MemberInfo, MAGIC};
pub use constant_pool::{
    decode_modified_utf8, encode_modified_utf8, Constant, ConstantPool, DynamicRef, MemberRef,
};
pub use error::{ClassFileError, Result};
pub use remapper::{remap_descriptor, remap_signature, Remapper, SignatureKind};
pub use rename::apply_rename;
