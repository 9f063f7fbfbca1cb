//! Semantic model of a class being generated
//!
//! Classes, fields, methods, and attributes here refer to each other by name and descriptor
//! rather than by constant pool index. Indices are only assigned when the model is lowered into
//! [`crate::jvm::class_file`], which all goes through [`Class::generate`].

mod attribute;
mod class;
mod field;
mod frame;
mod inner_classes;
mod method;
mod stack_map_table;

pub use attribute::*;
pub(crate) use attribute::{insert_attribute, serialize_attributes};
pub use class::*;
pub use field::*;
pub use frame::*;
pub use inner_classes::*;
pub use method::*;
pub use stack_map_table::*;
