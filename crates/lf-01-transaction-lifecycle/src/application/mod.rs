//! # Application Module
//!
//! Application services orchestrating the domain and outbound ports.

pub mod builder;
pub mod submitter;

pub use builder::TransactionBuilder;
pub use submitter::TransactionSubmitter;
