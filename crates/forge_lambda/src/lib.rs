//! AWS-oriented adapters and handlers for the Forge CloudFormation extensions.
//!
//! This crate owns runtime integration details (Lambda handlers, response
//! delivery, environment configuration) on top of the pure `forge_core`
//! domain crate. AWS SDK clients live in the `bin/` entry points behind the
//! adapter traits so handlers stay testable with in-memory fakes.

pub mod adapters;
pub mod config;
pub mod handlers;
