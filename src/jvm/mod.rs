//! JVM class file generation
//!
//! ```
//! use classgen::jvm::code::{BranchInstruction, Instruction};
//! use classgen::jvm::model::Class;
//! use classgen::jvm::*;
//!
//! # fn main() -> Result<(), Error> {
//! let mut class = Class::new("Hi", "java/lang/Object", ClassAccessFlags::PUBLIC);
//! class.add_field("x", FieldType::int(), FieldAccessFlags::PRIVATE)?;
//!
//! let main = MethodDescriptor::parse("([Ljava/lang/String;)V")?;
//! class.add_method("main", main.clone(), MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC)?;
//!
//! let print_stream = FieldType::object("java/io/PrintStream");
//! let out = class
//!     .constants_mut()
//!     .add_fieldref("java/lang/System", "out", &print_stream)?;
//! let println = class.constants_mut().add_methodref(
//!     "java/io/PrintStream",
//!     "println",
//!     &MethodDescriptor::parse("(Ljava/lang/String;)V")?,
//! )?;
//! let hello = class.constants_mut().add_string("Hello, world")?;
//!
//! class
//!     .code_builder("main", &main)?
//!     .push_instruction(Instruction::GetStatic(out))?
//!     .push_instruction(Instruction::Ldc(hello.into()))?
//!     .push_instruction(Instruction::InvokeVirtual(println))?
//!     .push_branch_instruction(BranchInstruction::Return)?;
//!
//! let bytes = class.generate()?;
//! assert_eq!(&bytes[..4], &[0xCA, 0xFE, 0xBA, 0xBE]);
//! # Ok(())
//! # }
//! ```

mod access_flags;
pub mod class_file;
pub mod code;
mod descriptors;
mod errors;
pub mod model;

pub use access_flags::*;
pub use descriptors::*;
pub use errors::*;
