use crate::jvm::Error;
use byteorder::{BigEndian, WriteBytesExt};

/// Utility trait for serializing data inside class files
///
/// Java class files have some peculiarities that make it useful to define an extra trait (instead
/// of just using `serde`):
///
///   - everything multi-byte is big-endian
///   - tags are always `u8`
///   - when serializing a sequence, the length of the sequence is usually `u16`
///
/// Lengths and counts are never truncated: something which doesn't fit is an error.
pub trait Serialize: Sized {
    /// Serialize construct into a binary output stream
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error>;

    /// Serialize construct into a fresh byte buffer
    fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut bytes = vec![];
        self.serialize(&mut bytes)?;
        Ok(bytes)
    }
}

impl Serialize for u8 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        Ok(writer.write_u8(*self)?)
    }
}

impl Serialize for u16 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        Ok(writer.write_u16::<BigEndian>(*self)?)
    }
}

impl Serialize for u32 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        Ok(writer.write_u32::<BigEndian>(*self)?)
    }
}

impl Serialize for i8 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        Ok(writer.write_i8(*self)?)
    }
}

impl Serialize for i16 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        Ok(writer.write_i16::<BigEndian>(*self)?)
    }
}

impl Serialize for i32 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        Ok(writer.write_i32::<BigEndian>(*self)?)
    }
}

/// Size in `u16` is the first thing serialized
impl<A: Serialize> Serialize for Vec<A> {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        u16_length("sequence", self.len())?.serialize(writer)?;
        for elem in self {
            elem.serialize(writer)?;
        }
        Ok(())
    }
}

/// Check that a length fits in the `u16` field the format gives it
pub fn u16_length(what: &'static str, length: usize) -> Result<u16, Error> {
    u16::try_from(length).map_err(|_| Error::LengthOverflow { what, length })
}

/// Check that a length fits in the `u32` field the format gives it
pub fn u32_length(what: &'static str, length: usize) -> Result<u32, Error> {
    u32::try_from(length).map_err(|_| Error::LengthOverflow { what, length })
}
