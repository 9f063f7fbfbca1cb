//! Low-level representation of the class file format
//!
//! Everything in here is already resolved down to constant pool indices and serializes
//! directly to bytes with [`Serialize`]. The semantic layer in [`crate::jvm::model`] lowers
//! into these structures.

mod attribute;
mod class;
mod constants;
mod field;
mod method;
mod serialize;
mod version;

pub use attribute::*;
pub use class::*;
pub use constants::*;
pub use field::*;
pub use method::*;
pub use serialize::*;
pub use version::*;
