use crate::jvm::class_file;
use crate::jvm::class_file::{AttributeLike, ConstantPool};
use crate::jvm::code::Code;
use crate::jvm::model::{InnerClasses, StackMapTable};
use crate::jvm::{Error, MethodAccessFlags, MethodDescriptor};
use indexmap::map::Entry;
use indexmap::IndexMap;
use std::fmt;
use std::str::FromStr;

/// The attributes this generator knows how to produce
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum AttributeKind {
    Code,
    InnerClasses,
    StackMapTable,
}

impl AttributeKind {
    /// Name of the attribute in the class file
    pub fn name(&self) -> &'static str {
        match self {
            AttributeKind::Code => class_file::Code::NAME,
            AttributeKind::InnerClasses => class_file::InnerClasses::NAME,
            AttributeKind::StackMapTable => class_file::StackMapTable::NAME,
        }
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Look up an attribute by its class file name
impl FromStr for AttributeKind {
    type Err = Error;

    fn from_str(name: &str) -> Result<AttributeKind, Error> {
        match name {
            "Code" => Ok(AttributeKind::Code),
            "InnerClasses" => Ok(AttributeKind::InnerClasses),
            "StackMapTable" => Ok(AttributeKind::StackMapTable),
            other => Err(Error::UnsupportedAttribute(other.to_owned())),
        }
    }
}

/// What sort of structure an attribute is attached to
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum ParentKind {
    Class,
    Field,
    Method,
    Code,
}

/// Structure an attribute is being attached to, along with whatever the attribute needs to know
/// about it when it is created
#[derive(Copy, Clone, Debug)]
pub enum AttributeParent<'a> {
    Class {
        name: &'a str,
    },
    Field,
    Method {
        descriptor: &'a MethodDescriptor,
        access_flags: MethodAccessFlags,
        class_name: &'a str,
    },
    Code,
}

impl AttributeParent<'_> {
    pub fn kind(&self) -> ParentKind {
        match self {
            AttributeParent::Class { .. } => ParentKind::Class,
            AttributeParent::Field => ParentKind::Field,
            AttributeParent::Method { .. } => ParentKind::Method,
            AttributeParent::Code => ParentKind::Code,
        }
    }
}

/// Semantic representation of an attribute
///
/// Only a closed set of attributes is supported, and each can only be attached in one place:
///
///   - [`Code`] on methods
///   - [`InnerClasses`] on classes
///   - [`StackMapTable`] on the code of a method
#[derive(Debug)]
pub enum Attribute {
    Code(Code),
    InnerClasses(InnerClasses),
    StackMapTable(StackMapTable),
}

impl Attribute {
    /// Create a fresh attribute for the given parent
    pub fn create(kind: AttributeKind, parent: AttributeParent<'_>) -> Result<Attribute, Error> {
        match (kind, parent) {
            (
                AttributeKind::Code,
                AttributeParent::Method {
                    descriptor,
                    access_flags,
                    class_name,
                },
            ) => Ok(Attribute::Code(Code::new(descriptor, access_flags, class_name)?)),
            (AttributeKind::InnerClasses, AttributeParent::Class { name }) => {
                Ok(Attribute::InnerClasses(InnerClasses::new(name)))
            }
            (AttributeKind::StackMapTable, AttributeParent::Code) => {
                Ok(Attribute::StackMapTable(StackMapTable::new()))
            }
            (attribute, parent) => Err(Error::IllegalAttachment {
                attribute,
                parent: parent.kind(),
            }),
        }
    }

    pub fn kind(&self) -> AttributeKind {
        match self {
            Attribute::Code(_) => AttributeKind::Code,
            Attribute::InnerClasses(_) => AttributeKind::InnerClasses,
            Attribute::StackMapTable(_) => AttributeKind::StackMapTable,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    pub fn as_code(&self) -> Option<&Code> {
        match self {
            Attribute::Code(code) => Some(code),
            _ => None,
        }
    }

    pub fn as_code_mut(&mut self) -> Option<&mut Code> {
        match self {
            Attribute::Code(code) => Some(code),
            _ => None,
        }
    }

    pub fn as_inner_classes(&self) -> Option<&InnerClasses> {
        match self {
            Attribute::InnerClasses(inner_classes) => Some(inner_classes),
            _ => None,
        }
    }

    pub fn as_inner_classes_mut(&mut self) -> Option<&mut InnerClasses> {
        match self {
            Attribute::InnerClasses(inner_classes) => Some(inner_classes),
            _ => None,
        }
    }

    pub fn as_stack_map_table(&self) -> Option<&StackMapTable> {
        match self {
            Attribute::StackMapTable(table) => Some(table),
            _ => None,
        }
    }

    pub fn as_stack_map_table_mut(&mut self) -> Option<&mut StackMapTable> {
        match self {
            Attribute::StackMapTable(table) => Some(table),
            _ => None,
        }
    }

    /// Lower the attribute, interning everything it refers to
    pub fn serialize_attribute(
        &mut self,
        constants: &mut ConstantPool,
    ) -> Result<class_file::Attribute, Error> {
        match self {
            Attribute::Code(code) => {
                let code = code.serialize_code(constants)?;
                constants.get_attribute(&code)
            }
            Attribute::InnerClasses(inner_classes) => {
                let inner_classes = inner_classes.serialize_inner_classes(constants)?;
                constants.get_attribute(&inner_classes)
            }
            Attribute::StackMapTable(table) => {
                let table = table.serialize_stack_map_table(constants)?;
                constants.get_attribute(&table)
            }
        }
    }
}

/// Attributes of a class, field, method, or code body (at most one of each kind)
pub type Attributes = IndexMap<AttributeKind, Attribute>;

/// Create an attribute and put it in the map, replacing any attribute of the same kind
pub(crate) fn insert_attribute<'m>(
    attributes: &'m mut Attributes,
    kind: AttributeKind,
    parent: AttributeParent<'_>,
) -> Result<&'m mut Attribute, Error> {
    let attribute = Attribute::create(kind, parent)?;
    log::debug!("adding {} attribute to {:?}", kind, parent.kind());
    Ok(match attributes.entry(kind) {
        Entry::Occupied(mut occupied) => {
            occupied.insert(attribute);
            occupied.into_mut()
        }
        Entry::Vacant(vacant) => vacant.insert(attribute),
    })
}

/// Lower all attributes, in the order they were first added
pub(crate) fn serialize_attributes(
    attributes: &mut Attributes,
    constants: &mut ConstantPool,
) -> Result<Vec<class_file::Attribute>, Error> {
    attributes
        .values_mut()
        .map(|attribute| attribute.serialize_attribute(constants))
        .collect()
}
