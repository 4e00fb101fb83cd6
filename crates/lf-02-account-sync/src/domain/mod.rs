//! # Domain Module
//!
//! Core domain types for account state sync.

pub mod entities;
pub mod errors;
pub mod value_objects;

pub use entities::*;
pub use errors::*;
pub use value_objects::*;
