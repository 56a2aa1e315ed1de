//! NextForge - Form-Driven Nextflow Pipeline Generator
//!
//! Lets researchers describe a bioinformatics pipeline as plain form data
//! (parameters, processes, environment profiles) and turns it into a
//! Nextflow DSL2 workflow script plus its `nextflow.config`, without writing
//! Groovy by hand.
//!
//! # Architecture
//!
//! The library is organized into four main modules:
//!
//! - [`workflow`]: The editable model, its validation and form loading
//! - [`environment`]: Profiles, containers, scheduler and output settings
//! - [`emitter`]: Rendering of the script and configuration text
//! - [`error`]: Errors raised by model mutations
//!
//! # Example
//!
//! ```rust,no_run
//! use nextforge::{load_model, GenerationResult};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Load a workflow form from YAML
//!     let mut model = load_model("pipeline.yaml")?;
//!
//!     // Validate and render
//!     match model.generate() {
//!         GenerationResult::Success { workflow_script, environment_config } => {
//!             std::fs::write("main.nf", workflow_script)?;
//!             std::fs::write("nextflow.config", environment_config)?;
//!         }
//!         GenerationResult::Failure { findings } => {
//!             for finding in findings {
//!                 eprintln!("{}", finding);
//!             }
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod emitter;
pub mod environment;
pub mod error;
pub mod workflow;

// Re-export commonly used types
pub use error::{ModelError, Namespace};
pub use workflow::parser::{load_model, parse_model};
pub use workflow::session::{GenerationResult, WorkflowModel};
pub use workflow::validator::ValidationFinding;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "NextForge";
