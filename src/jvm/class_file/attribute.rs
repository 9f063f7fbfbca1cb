use crate::jvm::class_file::{
    u16_length, u32_length, ClassConstantIndex, Serialize, Utf8ConstantIndex,
};
use crate::jvm::{Error, InnerClassAccessFlags};
use byteorder::WriteBytesExt;

/// Attributes (used in classes, fields, methods, and even on some attributes)
///
/// Once lowered, every attribute is just a name and an opaque body. The typed bodies below turn
/// into this through [`crate::jvm::class_file::ConstantPool::get_attribute`].
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se14/html/jvms-4.html#jvms-4.7
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name_index: Utf8ConstantIndex,
    pub info: Vec<u8>,
}

impl Serialize for Attribute {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        self.name_index.serialize(writer)?;

        // Attribute info length is 4 bytes
        u32_length("attribute", self.info.len())?.serialize(writer)?;
        writer.write_all(&self.info)?;

        Ok(())
    }
}

/// Attributes are all stored in the same way (see `Attribute`), but internally
/// they represent very different things. This trait is implemented by things
/// which can be turned into attributes.
pub trait AttributeLike: Serialize {
    /// Name of the attribute
    const NAME: &'static str;
}

/// [0]: https://docs.oracle.com/javase/specs/jvms/se14/html/jvms-4.html#jvms-4.7.3
#[derive(Debug)]
pub struct Code {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code_array: BytecodeArray,
    pub attributes: Vec<Attribute>,
}

impl Serialize for Code {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        self.max_stack.serialize(writer)?;
        self.max_locals.serialize(writer)?;
        self.code_array.serialize(writer)?;

        // Exception handlers are never generated
        0u16.serialize(writer)?;
        self.attributes.serialize(writer)?;
        Ok(())
    }
}

impl AttributeLike for Code {
    const NAME: &'static str = "Code";
}

/// Encoded bytecode instructions
///
/// The length field is a `u32`, but the code must still be shorter than 65536 bytes.
#[derive(Debug)]
pub struct BytecodeArray(pub Vec<u8>);

impl Serialize for BytecodeArray {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        u32::from(u16_length("code", self.0.len())?).serialize(writer)?;
        writer.write_all(&self.0)?;
        Ok(())
    }
}

/// [0]: https://docs.oracle.com/javase/specs/jvms/se14/html/jvms-4.html#jvms-4.7.4
#[derive(Debug)]
pub struct StackMapTable(pub Vec<StackMapFrame>);

impl AttributeLike for StackMapTable {
    const NAME: &'static str = "StackMapTable";
}

impl Serialize for StackMapTable {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        self.0.serialize(writer)
    }
}

/// Frame which has exactly the locals and stack specified (`full_frame`, tag 255)
///
/// The format has more compact frame kinds, but they are never generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackMapFrame {
    pub offset_delta: u16,
    pub locals: Vec<VerificationType>,
    pub stack: Vec<VerificationType>,
}

impl StackMapFrame {
    const FULL_FRAME: u8 = 255;
}

impl Serialize for StackMapFrame {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        StackMapFrame::FULL_FRAME.serialize(writer)?;
        self.offset_delta.serialize(writer)?;
        self.locals.serialize(writer)?;
        self.stack.serialize(writer)?;
        Ok(())
    }
}

/// Type of a local or stack slot, as the verifier sees it
///
/// Only `int`-like values and object references are modeled.
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se14/html/jvms-4.html#jvms-4.7.4
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationType {
    Integer,
    Object(ClassConstantIndex),
}

impl Serialize for VerificationType {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        match self {
            VerificationType::Integer => 1u8.serialize(writer)?,
            VerificationType::Object(class) => {
                7u8.serialize(writer)?;
                class.serialize(writer)?;
            }
        }
        Ok(())
    }
}

/// Every inner class referenced in a class' constant pool must be included in the inner classes
/// attribute on the class.
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se14/html/jvms-4.html#jvms-4.7.6
#[derive(Debug)]
pub struct InnerClasses(pub Vec<InnerClass>);

impl AttributeLike for InnerClasses {
    const NAME: &'static str = "InnerClasses";
}

impl Serialize for InnerClasses {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        self.0.serialize(writer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerClass {
    pub inner_class: ClassConstantIndex,
    pub outer_class: ClassConstantIndex,
    pub inner_name: Utf8ConstantIndex,
    pub access_flags: InnerClassAccessFlags,
}

impl Serialize for InnerClass {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        self.inner_class.serialize(writer)?;
        self.outer_class.serialize(writer)?;
        self.inner_name.serialize(writer)?;
        self.access_flags.serialize(writer)?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::class_file::ConstantPool;

    #[test]
    fn attribute_has_u32_length() {
        let mut pool = ConstantPool::new();
        let name_index = pool.add_utf8("Custom").unwrap();
        let attribute = Attribute {
            name_index,
            info: vec![0xAB, 0xCD],
        };
        assert_eq!(attribute.to_bytes().unwrap(), vec![0, 1, 0, 0, 0, 2, 0xAB, 0xCD]);
    }

    #[test]
    fn full_frame_layout() {
        let mut pool = ConstantPool::new();
        let string = pool.add_class("java/lang/String").unwrap();
        let frame = StackMapFrame {
            offset_delta: 5,
            locals: vec![VerificationType::Integer, VerificationType::Object(string)],
            stack: vec![],
        };
        assert_eq!(
            frame.to_bytes().unwrap(),
            vec![255, 0, 5, 0, 2, 1, 7, 0, 2, 0, 0]
        );
    }

    #[test]
    fn code_array_length() {
        assert_eq!(
            BytecodeArray(vec![0xb1]).to_bytes().unwrap(),
            vec![0, 0, 0, 1, 0xb1]
        );
        assert_eq!(BytecodeArray(vec![0; 65535]).to_bytes().unwrap().len(), 4 + 65535);
        assert!(matches!(
            BytecodeArray(vec![0; 65536]).to_bytes(),
            Err(Error::LengthOverflow {
                what: "code",
                length: 65536
            })
        ));
    }

    #[test]
    fn empty_code_body() {
        let code = Code {
            max_stack: 0,
            max_locals: 1,
            code_array: BytecodeArray(vec![0xb1]),
            attributes: vec![],
        };
        let mut pool = ConstantPool::new();
        let attribute = pool.get_attribute(&code).unwrap();
        assert_eq!(pool.utf8(attribute.name_index), Some("Code"));
        assert_eq!(attribute.info, vec![0, 0, 0, 1, 0, 0, 0, 1, 0xb1, 0, 0, 0, 0]);
    }
}
