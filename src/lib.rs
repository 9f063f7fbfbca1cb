//! Emit JVM class files from a structural description of a class
//!
//! The interesting entry point is [`jvm::model::Class`]: add fields, methods, and attributes to
//! it, emit method bodies through [`jvm::code::CodeBuilder`], then call
//! [`jvm::model::Class::generate`] to get the bytes of the class file.

pub mod jvm;
