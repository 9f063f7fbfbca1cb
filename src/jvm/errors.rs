use crate::jvm::class_file::{Constant, ConstantIndex};
use crate::jvm::code::Label;
use crate::jvm::model::{AttributeKind, Frame, ParentKind};
use crate::jvm::FieldType;
use std::fmt;

#[derive(Debug)]
pub enum Error {
    /// The constant pool can hold at most 65534 entries
    ConstantPoolOverflow {
        constant: Constant,
    },
    IoError(std::io::Error),

    /// A sequence is too long for the unsigned length prefix the format gives it
    LengthOverflow {
        what: &'static str,
        length: usize,
    },

    /// A number is too large for the unsigned field the format gives it
    ValueOverflow {
        what: &'static str,
        value: usize,
    },

    /// No attribute by this name is supported
    UnsupportedAttribute(String),

    /// The attribute cannot be attached to this kind of parent
    IllegalAttachment {
        attribute: AttributeKind,
        parent: ParentKind,
    },

    /// A field or method with the same name and descriptor is already in the class
    DuplicateMember {
        name: String,
        descriptor: String,
    },
    MissingMember {
        name: String,
        descriptor: String,
    },

    /// Stack map frames must be supplied in non-decreasing offset order
    DescendingFrameOffset {
        previous: u16,
        offset: u16,
    },

    /// Only `int`-like and reference types can be encoded in a stack map frame
    UnsupportedVerificationType(FieldType),

    BadDescriptor(String),
    ZeroDimensionArray,

    /// Error trying to track the effect of an instruction on the frame
    VerifierError {
        instruction: String,
        kind: VerifierErrorKind,
    },

    /// Two places claim to be the same label
    DuplicateLabel(Label),

    /// A jump refers to a label that was never placed
    UnplacedLabel(Label),

    /// Two ways of reaching a label disagree on the frame there
    IncompatibleFrames {
        label: Label,
        found: Frame,
        expected: Frame,
    },

    /// A jump is too far to be encoded with a 16-bit offset
    JumpOverflow {
        from: usize,
        to: usize,
    },
}

#[derive(Debug)]
pub enum VerifierErrorKind {
    EmptyStack,
    InvalidIndex(u16),
    NotArrayType,
    MissingConstant(ConstantIndex),
    NotLoadableConstant(ConstantIndex),

    /// The constant has a descriptor, but not one of the expected sort
    InvalidDescriptor(ConstantIndex),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::IoError(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ConstantPoolOverflow { constant } => {
                write!(f, "constant pool is full, cannot add {:?}", constant)
            }
            Error::IoError(err) => write!(f, "I/O error: {}", err),
            Error::LengthOverflow { what, length } => {
                write!(f, "{} has length {} which does not fit its length field", what, length)
            }
            Error::ValueOverflow { what, value } => {
                write!(f, "{} is {} which does not fit its field", what, value)
            }
            Error::UnsupportedAttribute(name) => write!(f, "unsupported attribute '{}'", name),
            Error::IllegalAttachment { attribute, parent } => write!(
                f,
                "attribute '{}' cannot be attached to a {:?}",
                attribute.name(),
                parent
            ),
            Error::DuplicateMember { name, descriptor } => {
                write!(f, "member '{}:{}' is already defined", name, descriptor)
            }
            Error::MissingMember { name, descriptor } => {
                write!(f, "member '{}:{}' is not defined", name, descriptor)
            }
            Error::DescendingFrameOffset { previous, offset } => write!(
                f,
                "stack map frame at offset {} comes after a frame at offset {}",
                offset, previous
            ),
            Error::UnsupportedVerificationType(field_type) => {
                write!(f, "type {:?} cannot be encoded in a stack map frame", field_type)
            }
            Error::BadDescriptor(msg) => write!(f, "malformed descriptor: {}", msg),
            Error::ZeroDimensionArray => write!(f, "array type must have at least one dimension"),
            Error::VerifierError { instruction, kind } => {
                write!(f, "invalid instruction {}: {:?}", instruction, kind)
            }
            Error::DuplicateLabel(label) => write!(f, "label {:?} is placed twice", label),
            Error::UnplacedLabel(label) => write!(f, "label {:?} is never placed", label),
            Error::IncompatibleFrames {
                label,
                found,
                expected,
            } => write!(
                f,
                "label {:?} is reached with locals {:?} and stack {:?}, but expects locals {:?} and stack {:?}",
                label, found.locals, found.stack, expected.locals, expected.stack
            ),
            Error::JumpOverflow { from, to } => {
                write!(f, "jump from {} to {} does not fit in 16 bits", from, to)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(err) => Some(err),
            _ => None,
        }
    }
}
