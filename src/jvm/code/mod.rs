//! Method bodies
//!
//! [`Code`] is the `Code` attribute of a method. It gets filled in through a [`CodeBuilder`],
//! which encodes instructions as they are pushed and tracks their effect on the frame.

mod bytecode;
mod code;
mod code_builder;
mod label;

pub use bytecode::*;
pub use code::*;
pub use code_builder::*;
pub use label::*;
