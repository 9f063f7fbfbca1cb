//! This module contains the AST of the JVM bytecode we emit. The representation is slightly
//! different from the usual presentation to make it more convenient to construct bytecode:
//!
//!   - The "wide" instruction doesn't show up at all, but instead gets merged into the
//!     instructions it is allowed to modify
//!
//!   - Some instructions (like the branches) get abstracted into one instruction with a field.
//!     This helps with repetitive pattern matches and also simplifies tasks like inverting a
//!     branch condition.
//!
//!   - Only the instructions the code generator needs are present

use crate::jvm::class_file::{
    ClassConstantIndex, ConstantIndex, FieldRefConstantIndex, MethodRefConstantIndex, Serialize,
};
use crate::jvm::code::Label;
use crate::jvm::{BaseType, Error};
use byteorder::WriteBytesExt;
use std::ops::Not;

/// Opcode prefix which widens the local variable index of the next instruction
const WIDE: u8 = 0xC4;

/// Non-branching JVM bytecode instruction
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    IConstM1,
    IConst0,
    IConst1,
    IConst2,
    IConst3,
    IConst4,
    IConst5,
    BiPush(i8),
    SiPush(i16),
    Ldc(ConstantIndex), // covers both `ldc` and `ldc_w`
    ILoad(u16),         // covers `iload`, `iload{0,3}`, and `wide iload`
    ALoad(u16),
    IALoad,
    AALoad,
    BALoad,
    IStore(u16), // covers `istore`, `istore{0,3}`, and `wide istore`
    AStore(u16),
    IAStore,
    AAStore,
    BAStore,
    Pop,
    Dup,
    Swap,
    IAdd,
    ISub,
    IMul,
    IDiv,
    IRem,
    INeg,
    IShl,
    IShr,
    IInc(u16, i16), // covers `iinc` and `wide iinc`
    GetStatic(FieldRefConstantIndex),
    PutStatic(FieldRefConstantIndex),
    GetField(FieldRefConstantIndex),
    PutField(FieldRefConstantIndex),
    InvokeVirtual(MethodRefConstantIndex),
    InvokeSpecial(MethodRefConstantIndex),
    InvokeStatic(MethodRefConstantIndex),
    New(ClassConstantIndex),
    NewArray(BaseType),
    ANewArray(ClassConstantIndex),
    ArrayLength,
}

impl Serialize for Instruction {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        /* The load/store instructions follow the same pattern:
         *
         *   - short form (0-3) have special bytes
         *   - normal form (0-255) use `iload` plus a byte operand
         *   - wide form (256-65535) use `wide iload` plus two byte operands
         */
        fn serialize_load_or_store<W: WriteBytesExt>(
            idx: u16,
            short_form_start: u8,
            normal_form: u8,
            writer: &mut W,
        ) -> Result<(), Error> {
            match u8::try_from(idx) {
                Ok(n @ 0..=3) => (short_form_start + n).serialize(writer),
                Ok(n) => {
                    normal_form.serialize(writer)?;
                    n.serialize(writer)
                }
                Err(_) => {
                    WIDE.serialize(writer)?;
                    normal_form.serialize(writer)?;
                    idx.serialize(writer)
                }
            }
        }

        match self {
            Instruction::IConstM1 => 0x02u8.serialize(writer)?,
            Instruction::IConst0 => 0x03u8.serialize(writer)?,
            Instruction::IConst1 => 0x04u8.serialize(writer)?,
            Instruction::IConst2 => 0x05u8.serialize(writer)?,
            Instruction::IConst3 => 0x06u8.serialize(writer)?,
            Instruction::IConst4 => 0x07u8.serialize(writer)?,
            Instruction::IConst5 => 0x08u8.serialize(writer)?,
            Instruction::BiPush(b) => {
                0x10u8.serialize(writer)?;
                b.serialize(writer)?;
            }
            Instruction::SiPush(s) => {
                0x11u8.serialize(writer)?;
                s.serialize(writer)?;
            }
            Instruction::Ldc(ConstantIndex(idx)) => match u8::try_from(*idx) {
                Ok(b) => {
                    0x12u8.serialize(writer)?;
                    b.serialize(writer)?;
                }
                Err(_) => {
                    0x13u8.serialize(writer)?;
                    idx.serialize(writer)?;
                }
            },
            Instruction::ILoad(idx) => serialize_load_or_store(*idx, 0x1A, 0x15, writer)?,
            Instruction::ALoad(idx) => serialize_load_or_store(*idx, 0x2A, 0x19, writer)?,
            Instruction::IALoad => 0x2eu8.serialize(writer)?,
            Instruction::AALoad => 0x32u8.serialize(writer)?,
            Instruction::BALoad => 0x33u8.serialize(writer)?,
            Instruction::IStore(idx) => serialize_load_or_store(*idx, 0x3B, 0x36, writer)?,
            Instruction::AStore(idx) => serialize_load_or_store(*idx, 0x4B, 0x3A, writer)?,
            Instruction::IAStore => 0x4fu8.serialize(writer)?,
            Instruction::AAStore => 0x53u8.serialize(writer)?,
            Instruction::BAStore => 0x54u8.serialize(writer)?,
            Instruction::Pop => 0x57u8.serialize(writer)?,
            Instruction::Dup => 0x59u8.serialize(writer)?,
            Instruction::Swap => 0x5fu8.serialize(writer)?,
            Instruction::IAdd => 0x60u8.serialize(writer)?,
            Instruction::ISub => 0x64u8.serialize(writer)?,
            Instruction::IMul => 0x68u8.serialize(writer)?,
            Instruction::IDiv => 0x6cu8.serialize(writer)?,
            Instruction::IRem => 0x70u8.serialize(writer)?,
            Instruction::INeg => 0x74u8.serialize(writer)?,
            Instruction::IShl => 0x78u8.serialize(writer)?,
            Instruction::IShr => 0x7au8.serialize(writer)?,
            Instruction::IInc(idx, diff) => match (u8::try_from(*idx), i8::try_from(*diff)) {
                (Ok(idx), Ok(diff)) => {
                    0x84u8.serialize(writer)?;
                    idx.serialize(writer)?;
                    diff.serialize(writer)?;
                }
                _ => {
                    WIDE.serialize(writer)?;
                    0x84u8.serialize(writer)?;
                    idx.serialize(writer)?;
                    diff.serialize(writer)?;
                }
            },
            Instruction::GetStatic(idx) => {
                0xb2u8.serialize(writer)?;
                idx.serialize(writer)?;
            }
            Instruction::PutStatic(idx) => {
                0xb3u8.serialize(writer)?;
                idx.serialize(writer)?;
            }
            Instruction::GetField(idx) => {
                0xb4u8.serialize(writer)?;
                idx.serialize(writer)?;
            }
            Instruction::PutField(idx) => {
                0xb5u8.serialize(writer)?;
                idx.serialize(writer)?;
            }
            Instruction::InvokeVirtual(idx) => {
                0xb6u8.serialize(writer)?;
                idx.serialize(writer)?;
            }
            Instruction::InvokeSpecial(idx) => {
                0xb7u8.serialize(writer)?;
                idx.serialize(writer)?;
            }
            Instruction::InvokeStatic(idx) => {
                0xb8u8.serialize(writer)?;
                idx.serialize(writer)?;
            }
            Instruction::New(idx) => {
                0xbbu8.serialize(writer)?;
                idx.serialize(writer)?;
            }
            Instruction::NewArray(base_type) => {
                0xbcu8.serialize(writer)?;
                base_type.array_type_code().serialize(writer)?;
            }
            Instruction::ANewArray(idx) => {
                0xbdu8.serialize(writer)?;
                idx.serialize(writer)?;
            }
            Instruction::ArrayLength => 0xbeu8.serialize(writer)?,
        }
        Ok(())
    }
}

/// Branching JVM bytecode instruction
///
/// Jump targets are labels. They only turn into signed 16-bit offsets (relative to the start of
/// the branch instruction) once the whole method body is known.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BranchInstruction {
    If(OrdComparison, Label), // covers `ifeq`, `ifne`, `iflt`, `ifge`, `ifgt`, `ifle`
    IfICmp(OrdComparison, Label), // covers `if_icmpeq`, `if_icmpne`, `if_icmplt`, ... `if_icmple`
    IfACmp(EqComparison, Label), // covers `if_acmpeq`, `if_acmpne`
    Goto(Label),
    IReturn,
    AReturn,
    Return,
}

impl BranchInstruction {
    /// Opcode of the instruction
    pub fn opcode(&self) -> u8 {
        match self {
            BranchInstruction::If(comp, _) => match comp {
                OrdComparison::EQ => 0x99,
                OrdComparison::NE => 0x9a,
                OrdComparison::LT => 0x9b,
                OrdComparison::GE => 0x9c,
                OrdComparison::GT => 0x9d,
                OrdComparison::LE => 0x9e,
            },
            BranchInstruction::IfICmp(comp, _) => match comp {
                OrdComparison::EQ => 0x9f,
                OrdComparison::NE => 0xa0,
                OrdComparison::LT => 0xa1,
                OrdComparison::GE => 0xa2,
                OrdComparison::GT => 0xa3,
                OrdComparison::LE => 0xa4,
            },
            BranchInstruction::IfACmp(comp, _) => match comp {
                EqComparison::EQ => 0xa5,
                EqComparison::NE => 0xa6,
            },
            BranchInstruction::Goto(_) => 0xa7,
            BranchInstruction::IReturn => 0xac,
            BranchInstruction::AReturn => 0xb0,
            BranchInstruction::Return => 0xb1,
        }
    }

    /// Where the instruction may jump, other than falling through
    pub fn jump_target(&self) -> Option<Label> {
        match self {
            BranchInstruction::If(_, lbl)
            | BranchInstruction::IfICmp(_, lbl)
            | BranchInstruction::IfACmp(_, lbl)
            | BranchInstruction::Goto(lbl) => Some(*lbl),
            BranchInstruction::IReturn | BranchInstruction::AReturn | BranchInstruction::Return => {
                None
            }
        }
    }

    /// Does the instruction never fall through to the next one?
    pub fn is_unconditional(&self) -> bool {
        matches!(
            self,
            BranchInstruction::Goto(_)
                | BranchInstruction::IReturn
                | BranchInstruction::AReturn
                | BranchInstruction::Return
        )
    }
}

/// Binary comparison operators available for `int` branches
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum OrdComparison {
    EQ,
    GE,
    GT,
    LE,
    LT,
    NE,
}

impl Not for OrdComparison {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            OrdComparison::EQ => OrdComparison::NE,
            OrdComparison::GE => OrdComparison::LT,
            OrdComparison::GT => OrdComparison::LE,
            OrdComparison::LE => OrdComparison::GT,
            OrdComparison::LT => OrdComparison::GE,
            OrdComparison::NE => OrdComparison::EQ,
        }
    }
}

/// Equality/inequality comparison operators
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum EqComparison {
    EQ,
    NE,
}

impl Not for EqComparison {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            EqComparison::EQ => EqComparison::NE,
            EqComparison::NE => EqComparison::EQ,
        }
    }
}
