//! Programmatic construction of small class files.
//!
//! Used to synthesise fixtures and stub classes; it emits exactly what it is
//! told to and performs no verification.

use crate::class_file::{AttributeInfo, ClassFile, MemberInfo};
use crate::constant_pool::{Constant, ConstantPool, MemberRef};
use crate::error::Result;

/// Java 8 class file version.
pub const DEFAULT_MAJOR_VERSION: u16 = 52;

#[derive(Debug, Clone)]
pub struct ClassFileBuilder {
    class: ClassFile,
}

impl ClassFileBuilder {
    pub fn new(name: &str, super_name: Option<&str>) -> Result<Self> {
        let mut constant_pool = ConstantPool::new();
        let this_class = constant_pool.intern_class(name)?;
        let super_class = match super_name {
            Some(super_name) => constant_pool.intern_class(super_name)?,
            None => 0,
        };
        Ok(Self {
            class: ClassFile {
                minor_version: 0,
                major_version: DEFAULT_MAJOR_VERSION,
                constant_pool,
                access_flags: crate::access::ACC_PUBLIC | crate::access::ACC_SUPER,
                this_class,
                super_class,
                interfaces: Vec::new(),
                fields: Vec::new(),
                methods: Vec::new(),
                attributes: Vec::new(),
            },
        })
    }

    pub fn access_flags(&mut self, flags: u16) -> &mut Self {
        self.class.access_flags = flags;
        self
    }

    pub fn pool_mut(&mut self) -> &mut ConstantPool {
        &mut self.class.constant_pool
    }

    pub fn interface(&mut self, name: &str) -> Result<()> {
        let index = self.class.constant_pool.intern_class(name)?;
        self.class.interfaces.push(index);
        Ok(())
    }

    /// Declare a field; returns its position in the field table.
    pub fn field(&mut self, access_flags: u16, name: &str, descriptor: &str) -> Result<usize> {
        let member = self.member(access_flags, name, descriptor)?;
        self.class.fields.push(member);
        Ok(self.class.fields.len() - 1)
    }

    /// Declare a method without a body; returns its position in the method table.
    pub fn method(&mut self, access_flags: u16, name: &str, descriptor: &str) -> Result<usize> {
        let member = self.member(access_flags, name, descriptor)?;
        self.class.methods.push(member);
        Ok(self.class.methods.len() - 1)
    }

    /// Declare a method with a `Code` attribute holding `code` verbatim.
    pub fn method_with_code(
        &mut self,
        access_flags: u16,
        name: &str,
        descriptor: &str,
        max_stack: u16,
        max_locals: u16,
        code: &[u8],
    ) -> Result<usize> {
        let index = self.method(access_flags, name, descriptor)?;
        let mut info = Vec::with_capacity(12 + code.len());
        info.extend_from_slice(&max_stack.to_be_bytes());
        info.extend_from_slice(&max_locals.to_be_bytes());
        info.extend_from_slice(&(code.len() as u32).to_be_bytes());
        info.extend_from_slice(code);
        info.extend_from_slice(&0u16.to_be_bytes()); // exception table
        info.extend_from_slice(&0u16.to_be_bytes()); // attributes
        self.method_attribute(index, "Code", info)?;
        Ok(index)
    }

    pub fn class_attribute(&mut self, name: &str, info: Vec<u8>) -> Result<()> {
        let attribute = self.attribute(name, info)?;
        self.class.attributes.push(attribute);
        Ok(())
    }

    pub fn field_attribute(&mut self, field: usize, name: &str, info: Vec<u8>) -> Result<()> {
        let attribute = self.attribute(name, info)?;
        if let Some(member) = self.class.fields.get_mut(field) {
            member.attributes.push(attribute);
        }
        Ok(())
    }

    pub fn method_attribute(&mut self, method: usize, name: &str, info: Vec<u8>) -> Result<()> {
        let attribute = self.attribute(name, info)?;
        if let Some(member) = self.class.methods.get_mut(method) {
            member.attributes.push(attribute);
        }
        Ok(())
    }

    pub fn utf8(&mut self, value: &str) -> Result<u16> {
        self.class.constant_pool.intern_utf8(value)
    }

    pub fn class_ref(&mut self, name: &str) -> Result<u16> {
        self.class.constant_pool.intern_class(name)
    }

    pub fn string(&mut self, value: &str) -> Result<u16> {
        let string_index = self.class.constant_pool.intern_utf8(value)?;
        self.class
            .constant_pool
            .push(Constant::String { string_index })
    }

    pub fn field_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> Result<u16> {
        let member = self.member_ref(owner, name, descriptor)?;
        self.class.constant_pool.push(Constant::FieldRef(member))
    }

    pub fn method_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> Result<u16> {
        let member = self.member_ref(owner, name, descriptor)?;
        self.class.constant_pool.push(Constant::MethodRef(member))
    }

    pub fn interface_method_ref(
        &mut self,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<u16> {
        let member = self.member_ref(owner, name, descriptor)?;
        self.class
            .constant_pool
            .push(Constant::InterfaceMethodRef(member))
    }

    pub fn finish(self) -> ClassFile {
        self.class
    }

    pub fn build(&self) -> Result<Vec<u8>> {
        self.class.to_bytes()
    }

    fn member(&mut self, access_flags: u16, name: &str, descriptor: &str) -> Result<MemberInfo> {
        Ok(MemberInfo {
            access_flags,
            name_index: self.class.constant_pool.intern_utf8(name)?,
            descriptor_index: self.class.constant_pool.intern_utf8(descriptor)?,
            attributes: Vec::new(),
        })
    }

    fn member_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> Result<MemberRef> {
        Ok(MemberRef {
            class_index: self.class.constant_pool.intern_class(owner)?,
            name_and_type_index: self
                .class
                .constant_pool
                .intern_name_and_type(name, descriptor)?,
        })
    }

    fn attribute(&mut self, name: &str, info: Vec<u8>) -> Result<AttributeInfo> {
        Ok(AttributeInfo {
            name_index: self.class.constant_pool.intern_utf8(name)?,
            info,
        })
    }
}
