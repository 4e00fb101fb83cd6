//! # Domain Module
//!
//! Operation state machine, reports and error types.

pub mod entities;
pub mod errors;
pub mod value_objects;

pub use entities::*;
pub use errors::*;
pub use value_objects::*;
