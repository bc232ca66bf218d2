//! Deploy-time template rewriting and custom-resource domain primitives.
//!
//! This crate owns the resource graph model, the custom type registry, the
//! macro transform pipeline, property validation and the sequence expression
//! calculator. It intentionally excludes AWS SDK and Lambda runtime concerns.

pub mod calc;
pub mod contract;
pub mod graph;
pub mod redirector;
pub mod registry;
pub mod schema;
pub mod transform;
