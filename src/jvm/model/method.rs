use crate::jvm::class_file;
use crate::jvm::class_file::ConstantPool;
use crate::jvm::code::Code;
use crate::jvm::model::attribute::{insert_attribute, serialize_attributes};
use crate::jvm::model::{Attribute, AttributeKind, AttributeParent, Attributes, ParentKind};
use crate::jvm::{Error, MethodAccessFlags, MethodDescriptor, RenderDescriptor};

/// Method of a class
///
/// The method remembers the name of the class declaring it, since the entry frame of its body
/// needs the type of `this`.
#[derive(Debug)]
pub struct Method {
    name: String,
    descriptor: MethodDescriptor,
    access_flags: MethodAccessFlags,
    class_name: String,
    attributes: Attributes,
}

impl Method {
    pub fn new(
        name: impl Into<String>,
        descriptor: MethodDescriptor,
        access_flags: MethodAccessFlags,
        class_name: impl Into<String>,
    ) -> Method {
        Method {
            name: name.into(),
            descriptor,
            access_flags,
            class_name: class_name.into(),
            attributes: Attributes::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> &MethodDescriptor {
        &self.descriptor
    }

    pub fn access_flags(&self) -> MethodAccessFlags {
        self.access_flags
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Attach a fresh attribute to the method, replacing any existing one of the same kind
    pub fn add_attribute(&mut self, kind: AttributeKind) -> Result<&mut Attribute, Error> {
        let parent = AttributeParent::Method {
            descriptor: &self.descriptor,
            access_flags: self.access_flags,
            class_name: &self.class_name,
        };
        insert_attribute(&mut self.attributes, kind, parent)
    }

    pub fn has_attribute(&self, kind: AttributeKind) -> bool {
        self.attributes.contains_key(&kind)
    }

    pub fn get_attribute(&self, kind: AttributeKind) -> Option<&Attribute> {
        self.attributes.get(&kind)
    }

    pub fn get_attribute_mut(&mut self, kind: AttributeKind) -> Option<&mut Attribute> {
        self.attributes.get_mut(&kind)
    }

    pub fn code(&self) -> Option<&Code> {
        self.get_attribute(AttributeKind::Code)
            .and_then(Attribute::as_code)
    }

    pub fn code_mut(&mut self) -> Option<&mut Code> {
        self.get_attribute_mut(AttributeKind::Code)
            .and_then(Attribute::as_code_mut)
    }

    /// Body of the method, which gets created empty if there isn't one yet
    pub fn code_or_insert(&mut self) -> Result<&mut Code, Error> {
        if !self.has_attribute(AttributeKind::Code) {
            self.add_attribute(AttributeKind::Code)?;
        }
        self.code_mut().ok_or(Error::IllegalAttachment {
            attribute: AttributeKind::Code,
            parent: ParentKind::Method,
        })
    }

    pub fn serialize_method(&mut self, constants: &mut ConstantPool) -> Result<class_file::Method, Error> {
        Ok(class_file::Method {
            access_flags: self.access_flags,
            name_index: constants.add_utf8(self.name.as_str())?,
            descriptor_index: constants.add_utf8(self.descriptor.render())?,
            attributes: serialize_attributes(&mut self.attributes, constants)?,
        })
    }
}
