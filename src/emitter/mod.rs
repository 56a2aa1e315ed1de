//! Script Emitter Module
//!
//! Renders a validated workflow model into Nextflow source text.
//!
//! # Structure
//!
//! - [`script`]: the workflow script (`main.nf`)
//! - [`config`]: the environment configuration (`nextflow.config`)
//! - [`literal`]: quoting and literal formatting shared by both
//!
//! The emitter trusts its input. It must only be handed a model together with
//! the execution order the validator produced for it; an unresolved reference
//! is treated as a bug and panics.

pub mod config;
pub mod literal;
pub mod script;

use log::debug;

use crate::workflow::WorkflowModel;

/// Conventional file name of the workflow script.
pub const SCRIPT_FILE_NAME: &str = "main.nf";

/// Conventional file name of the configuration file.
pub const CONFIG_FILE_NAME: &str = "nextflow.config";

/// The two rendered texts of a workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedWorkflow {
    pub script: String,
    pub config: String,
}

/// Renders the script and configuration for `model`.
///
/// `order` must be the execution order returned by validating this exact
/// model state.
pub fn emit(model: &WorkflowModel, order: &[String]) -> RenderedWorkflow {
    debug!("Emitting {} processes in order {:?}", order.len(), order);

    RenderedWorkflow {
        script: script::render(model, order),
        config: config::render(model),
    }
}
