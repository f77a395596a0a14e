//! # Value model
//!
//! The tagged value types that flow through the data stack and into
//! variable bindings.
//!
//! ## Documentation conventions
//!
//! - Stack effects are written as `( before -- after )`.
//! - "Materialize" means flattening a string value into one owned buffer.

pub mod value;
