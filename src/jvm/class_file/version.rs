use crate::jvm::class_file::Serialize;
use crate::jvm::Error;
use byteorder::WriteBytesExt;

/// Version of the class file, which is used to verify that the JVM has the
/// necessary features to interpret the class
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct Version {
    pub major_version: u16,
    pub minor_version: u16,
}

impl Version {
    /// JVM class file version corresponding to Java SE 14 (released March 2020)
    pub const JAVA14: Version = Version {
        major_version: 58,
        minor_version: 0,
    };
}

/// Minor version goes first
impl Serialize for Version {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        self.minor_version.serialize(writer)?;
        self.major_version.serialize(writer)?;
        Ok(())
    }
}
