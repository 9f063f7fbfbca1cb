use crate::jvm::class_file;
use crate::jvm::class_file::ConstantPool;
use crate::jvm::model::attribute::{insert_attribute, serialize_attributes};
use crate::jvm::model::{Attribute, AttributeKind, AttributeParent, Attributes};
use crate::jvm::{Error, FieldAccessFlags, FieldType, RenderDescriptor};

/// Field of a class
#[derive(Debug)]
pub struct Field {
    name: String,
    descriptor: FieldType,
    access_flags: FieldAccessFlags,
    attributes: Attributes,
}

impl Field {
    pub fn new(name: impl Into<String>, descriptor: FieldType, access_flags: FieldAccessFlags) -> Field {
        Field {
            name: name.into(),
            descriptor,
            access_flags,
            attributes: Attributes::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> &FieldType {
        &self.descriptor
    }

    pub fn access_flags(&self) -> FieldAccessFlags {
        self.access_flags
    }

    /// Attach an attribute to the field
    ///
    /// None of the supported attributes belong on fields, so this always fails with
    /// [`Error::IllegalAttachment`].
    pub fn add_attribute(&mut self, kind: AttributeKind) -> Result<&mut Attribute, Error> {
        insert_attribute(&mut self.attributes, kind, AttributeParent::Field)
    }

    pub fn has_attribute(&self, kind: AttributeKind) -> bool {
        self.attributes.contains_key(&kind)
    }

    pub fn serialize_field(&mut self, constants: &mut ConstantPool) -> Result<class_file::Field, Error> {
        Ok(class_file::Field {
            access_flags: self.access_flags,
            name_index: constants.add_utf8(self.name.as_str())?,
            descriptor_index: constants.add_utf8(self.descriptor.render())?,
            attributes: serialize_attributes(&mut self.attributes, constants)?,
        })
    }
}
