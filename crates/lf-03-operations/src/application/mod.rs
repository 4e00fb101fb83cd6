//! # Application Module

pub mod facade;

pub use facade::OperationFacade;
