use crate::jvm::class_file::{u16_length, Attribute, AttributeLike, Serialize};
use crate::jvm::descriptors::RenderDescriptor;
use crate::jvm::Error;
use byteorder::WriteBytesExt;
use indexmap::IndexSet;
use std::borrow::Cow;

/// Largest index the pool hands out
///
/// `constant_pool_count` is one more than the largest index and must still fit in a `u16`.
const MAX_CONSTANT_INDEX: usize = u16::MAX as usize - 1;

/// Class file constants pool builder
///
/// The pool is append only: entries are deduplicated on their tag and payload, and each one keeps
/// the 1-based index it was first given. Index 0 is reserved by the format and never handed out.
#[derive(Default, Debug, Clone)]
pub struct ConstantPool {
    constants: IndexSet<Constant>,
}

impl ConstantPool {
    /// Make a fresh empty constants pool
    pub fn new() -> ConstantPool {
        ConstantPool::default()
    }

    /// Number of entries in the pool (not counting the reserved index 0)
    pub fn size(&self) -> usize {
        self.constants.len()
    }

    /// Value of `constant_pool_count`, which is one more than the number of entries
    pub fn count(&self) -> Result<u16, Error> {
        let count = self.constants.len() + 1;
        u16::try_from(count).map_err(|_| Error::ValueOverflow {
            what: "constant_pool_count",
            value: count,
        })
    }

    /// Look up the constant at an index
    pub fn get(&self, index: impl Into<ConstantIndex>) -> Option<&Constant> {
        let ConstantIndex(index) = index.into();
        (index as usize)
            .checked_sub(1)
            .and_then(|offset| self.constants.get_index(offset))
    }

    /// Iterate through the constants, in index order
    pub fn iter(&self) -> impl Iterator<Item = (ConstantIndex, &Constant)> + '_ {
        self.constants
            .iter()
            .enumerate()
            .map(|(offset, constant)| (ConstantIndex(offset as u16 + 1), constant))
    }

    /// Push a constant into the constant pool, or find the index it already has
    fn push_constant(&mut self, constant: Constant) -> Result<ConstantIndex, Error> {
        if let Some(offset) = self.constants.get_index_of(&constant) {
            return Ok(ConstantIndex(offset as u16 + 1));
        }

        // Detect if the next constant would overflow the pool
        let offset = self.constants.len();
        if offset + 1 > MAX_CONSTANT_INDEX {
            return Err(Error::ConstantPoolOverflow { constant });
        }

        log::trace!("constant #{}: {:?}", offset + 1, constant);
        self.constants.insert(constant);
        Ok(ConstantIndex(offset as u16 + 1))
    }

    /// Get or insert a utf8 constant
    pub fn add_utf8<'a, S: Into<Cow<'a, str>>>(&mut self, utf8: S) -> Result<Utf8ConstantIndex, Error> {
        let constant = Constant::Utf8(utf8.into().into_owned());
        self.push_constant(constant).map(Utf8ConstantIndex)
    }

    /// Get or insert a class constant for a class with the given internal name
    ///
    /// Array classes are named by their descriptor (eg. `[I`).
    pub fn add_class<'a, S: Into<Cow<'a, str>>>(&mut self, name: S) -> Result<ClassConstantIndex, Error> {
        let name = self.add_utf8(name)?;
        self.push_constant(Constant::Class(name)).map(ClassConstantIndex)
    }

    /// Get or insert a `java.lang.String` constant
    pub fn add_string<'a, S: Into<Cow<'a, str>>>(&mut self, string: S) -> Result<StringConstantIndex, Error> {
        let utf8 = self.add_utf8(string)?;
        self.push_constant(Constant::String(utf8)).map(StringConstantIndex)
    }

    /// Get or insert an `int` constant
    pub fn add_integer(&mut self, integer: i32) -> Result<ConstantIndex, Error> {
        self.push_constant(Constant::Integer(integer))
    }

    /// Get or insert a name & type constant
    pub fn add_name_and_type<'a, 'b>(
        &mut self,
        name: impl Into<Cow<'a, str>>,
        descriptor: impl Into<Cow<'b, str>>,
    ) -> Result<NameAndTypeConstantIndex, Error> {
        let name = self.add_utf8(name)?;
        let descriptor = self.add_utf8(descriptor)?;
        let constant = Constant::NameAndType { name, descriptor };
        self.push_constant(constant).map(NameAndTypeConstantIndex)
    }

    /// Get or insert a field reference
    pub fn add_fieldref(
        &mut self,
        class: &str,
        name: &str,
        descriptor: &impl RenderDescriptor,
    ) -> Result<FieldRefConstantIndex, Error> {
        let class = self.add_class(class)?;
        let name_and_type = self.add_name_and_type(name, descriptor.render())?;
        let constant = Constant::FieldRef(class, name_and_type);
        self.push_constant(constant).map(FieldRefConstantIndex)
    }

    /// Get or insert a method reference
    pub fn add_methodref(
        &mut self,
        class: &str,
        name: &str,
        descriptor: &impl RenderDescriptor,
    ) -> Result<MethodRefConstantIndex, Error> {
        let class = self.add_class(class)?;
        let name_and_type = self.add_name_and_type(name, descriptor.render())?;
        let constant = Constant::MethodRef(class, name_and_type);
        self.push_constant(constant).map(MethodRefConstantIndex)
    }

    /// Text of a utf8 constant
    pub fn utf8(&self, index: Utf8ConstantIndex) -> Option<&str> {
        match self.get(index) {
            Some(Constant::Utf8(text)) => Some(text),
            _ => None,
        }
    }

    /// Descriptor of the value a constant denotes
    ///
    ///   - `int` and `java.lang.String` constants have the obvious descriptors
    ///   - a class constant denotes a value of that class (array classes are already named by
    ///     their descriptor)
    ///   - member references and name & types have the descriptor they were registered with
    ///
    /// Utf8 constants (and missing indices) have no descriptor.
    pub fn find_descriptor_by_index(&self, index: impl Into<ConstantIndex>) -> Option<Cow<'_, str>> {
        match self.get(index)? {
            Constant::Integer(_) => Some(Cow::Borrowed("I")),
            Constant::String(_) => Some(Cow::Borrowed("Ljava/lang/String;")),
            Constant::Class(name) => {
                let name = self.utf8(*name)?;
                if name.starts_with('[') {
                    Some(Cow::Borrowed(name))
                } else {
                    Some(Cow::Owned(format!("L{};", name)))
                }
            }
            Constant::NameAndType { descriptor, .. } => self.utf8(*descriptor).map(Cow::Borrowed),
            Constant::FieldRef(_, name_and_type) | Constant::MethodRef(_, name_and_type) => {
                self.find_descriptor_by_index(*name_and_type)
            }
            Constant::Utf8(_) => None,
        }
    }

    /// Add an attribute to the constant pool
    pub fn get_attribute<A: AttributeLike>(&mut self, attribute: &A) -> Result<Attribute, Error> {
        let name_index = self.add_utf8(A::NAME)?;
        let info = attribute.to_bytes()?;
        Ok(Attribute { name_index, info })
    }
}

/// The pool is written out without its count, since the class file puts the count first
impl Serialize for ConstantPool {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        for constant in &self.constants {
            constant.serialize(writer)?;
        }
        Ok(())
    }
}

/// Constants as in the constant pool
///
/// Only the constants this generator emits are included.
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se14/html/jvms-4.html#jvms-4.4
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    /// Class or an interface
    Class(Utf8ConstantIndex),

    /// Field
    FieldRef(ClassConstantIndex, NameAndTypeConstantIndex),

    /// Method
    MethodRef(ClassConstantIndex, NameAndTypeConstantIndex),

    /// Constant object of type `java.lang.String`
    String(Utf8ConstantIndex),

    /// Constant primitive of type `int`
    Integer(i32),

    /// Name and a type (eg. for a field or a method)
    NameAndType {
        name: Utf8ConstantIndex,
        descriptor: Utf8ConstantIndex,
    },

    /// Constant UTF-8 encoded raw string value
    ///
    /// Despite the name, the encoding is not quite UTF-8 (the encoding of the
    /// null character `\u{0000}` and the encoding of supplementary characters
    /// is different).
    Utf8(String),
}

impl Serialize for Constant {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        match self {
            Constant::Utf8(string) => {
                1u8.serialize(writer)?;
                let buffer: Vec<u8> = encode_modified_utf8(string);
                u16_length("utf8 constant", buffer.len())?.serialize(writer)?;
                writer.write_all(&buffer)?;
            }
            Constant::Integer(integer) => {
                3u8.serialize(writer)?;
                integer.serialize(writer)?;
            }
            Constant::Class(name) => {
                7u8.serialize(writer)?;
                name.serialize(writer)?;
            }
            Constant::String(utf8) => {
                8u8.serialize(writer)?;
                utf8.serialize(writer)?;
            }
            Constant::FieldRef(class, name_and_type) => {
                9u8.serialize(writer)?;
                class.serialize(writer)?;
                name_and_type.serialize(writer)?;
            }
            Constant::MethodRef(class, name_and_type) => {
                10u8.serialize(writer)?;
                class.serialize(writer)?;
                name_and_type.serialize(writer)?;
            }
            Constant::NameAndType { name, descriptor } => {
                12u8.serialize(writer)?;
                name.serialize(writer)?;
                descriptor.serialize(writer)?;
            }
        };
        Ok(())
    }
}

/// Modified UTF-8 format used in class files.
///
/// See [this `DataInput` section for details][0]. Quoting from that section:
///
/// > The differences between this format and the standard UTF-8 format are the following:
/// >
/// >  * The null byte `\u0000` is encoded in 2-byte format rather than 1-byte, so that the encoded
/// >    strings never have embedded nulls.
/// >  * Only the 1-byte, 2-byte, and 3-byte formats are used.
/// >  * Supplementary characters are represented in the form of surrogate pairs.
///
/// [0]: https://docs.oracle.com/en/java/javase/17/docs/api/java.base/java/io/DataInput.html#modified-utf-8
pub fn encode_modified_utf8(string: &str) -> Vec<u8> {
    let mut buffer: Vec<u8> = Vec::with_capacity(string.len());
    for unit in string.encode_utf16() {
        match unit {
            0x0001..=0x007F => buffer.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                buffer.push((unit >> 6 & 0x1F) as u8 | 0b1100_0000);
                buffer.push((unit & 0x3F) as u8 | 0b1000_0000);
            }
            _ => {
                buffer.push((unit >> 12 & 0x0F) as u8 | 0b1110_0000);
                buffer.push((unit >> 6 & 0x3F) as u8 | 0b1000_0000);
                buffer.push((unit & 0x3F) as u8 | 0b1000_0000);
            }
        }
    }
    buffer
}

#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Debug)]
pub struct ConstantIndex(pub u16);

impl Serialize for ConstantIndex {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        self.0.serialize(writer)
    }
}

macro_rules! typed_constant_index {
    ($($(#[$meta:meta])* $name:ident,)*) => {
        $(
            $(#[$meta])*
            #[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
            pub struct $name(ConstantIndex);

            impl From<$name> for ConstantIndex {
                fn from(index: $name) -> ConstantIndex {
                    index.0
                }
            }

            impl Serialize for $name {
                fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
                    self.0.serialize(writer)
                }
            }
        )*
    };
}

typed_constant_index! {
    /// Index of a `CONSTANT_Utf8_info`
    Utf8ConstantIndex,
    /// Index of a `CONSTANT_String_info`
    StringConstantIndex,
    /// Index of a `CONSTANT_NameAndType_info`
    NameAndTypeConstantIndex,
    /// Index of a `CONSTANT_Class_info`
    ClassConstantIndex,
    /// Index of a `CONSTANT_Fieldref_info`
    FieldRefConstantIndex,
    /// Index of a `CONSTANT_Methodref_info`
    MethodRefConstantIndex,
}
