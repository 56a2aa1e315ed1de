//! Workflow Definition Module
//!
//! Holds the editable pipeline model and decides whether it can be turned
//! into a runnable script.
//!
//! # Structure
//!
//! - [`model`]: Core data structures (parameters, processes, bindings)
//! - [`identifier`]: Identifier and reserved word rules
//! - [`registry`]: Ordered parameter registry
//! - [`store`]: Ordered process store
//! - [`session`]: The mutable [`WorkflowModel`] and generation entry point
//! - [`validator`]: Reference checks, cycle detection and execution order
//! - [`parser`]: Form document loading

pub mod identifier;
pub mod model;
pub mod parser;
pub mod registry;
pub mod session;
pub mod store;
pub mod validator;

pub use model::{
    Directives, InputSource, OutputChannel, ParamValue, ParameterId, ProcessDefinition, ProcessId,
    ProcessPatch, ProjectInfo,
};
pub use parser::{load_model, parse_model, LoadError};
pub use session::{GenerationResult, Removal, RemovalPolicy, WorkflowModel};
pub use validator::{Reference, ValidationFinding};
