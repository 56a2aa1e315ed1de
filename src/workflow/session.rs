//! Workflow Model
//!
//! The single mutable object behind one authoring session. It owns the
//! parameter registry, the process store and the environment configurator,
//! and is the only entry point for changing any of them.
//!
//! Mutations are checked locally and either applied completely or rejected
//! with a [`ModelError`]. Cross-entity problems are only looked for by
//! [`WorkflowModel::generate`], which reports them all together.
//!
//! # Example
//!
//! ```
//! use nextforge::workflow::{GenerationResult, InputSource, ParamValue, ProcessDefinition, WorkflowModel};
//!
//! let mut model = WorkflowModel::new();
//! model.add_parameter("threads", ParamValue::Integer(4), None).unwrap();
//! model.add_process(ProcessDefinition::new("align", "run aligner").with_output("bam")).unwrap();
//! model.add_process(
//!     ProcessDefinition::new("sort", "sort %bam%")
//!         .with_input("bam", InputSource::process_output("align", "bam"))
//!         .with_output("sorted_bam"),
//! ).unwrap();
//!
//! match model.generate() {
//!     GenerationResult::Success { workflow_script, .. } => {
//!         assert!(workflow_script.contains("sort(align.out.bam)"));
//!     }
//!     GenerationResult::Failure { findings } => panic!("{:?}", findings),
//! }
//! ```

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::emitter;
use crate::environment::{
    ContainerSetup, EnvironmentConfigurator, EnvironmentProfile, OutputSettings, Scheduler,
};
use crate::error::{ModelError, Result};

use super::model::{
    Directives, ParamValue, Parameter, ParameterId, ProcessDefinition, ProcessId, ProcessPatch,
    ProjectInfo,
};
use super::registry::ParameterRegistry;
use super::store::ProcessStore;
use super::validator::{self, Resolution, ValidationFinding};

/// What to do when removing a parameter that processes still read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemovalPolicy {
    /// Refuse with [`ModelError::ReferencedByProcess`]
    #[default]
    Restrict,
    /// Remove anyway; the readers are left with dangling references
    Cascade,
}

/// Outcome of a removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    /// Name of the removed entity
    pub removed: String,
    /// Processes whose references now dangle, in insertion order
    pub dangling: Vec<String>,
}

/// Result of a generation request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GenerationResult {
    Success {
        workflow_script: String,
        environment_config: String,
    },
    Failure {
        findings: Vec<ValidationFinding>,
    },
}

impl GenerationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The findings of a failed generation; empty on success.
    pub fn findings(&self) -> &[ValidationFinding] {
        match self {
            Self::Success { .. } => &[],
            Self::Failure { findings } => findings,
        }
    }
}

#[derive(Debug, Clone)]
struct CachedResolution {
    revision: u64,
    resolution: Resolution,
}

/// The workflow being authored.
#[derive(Debug, Clone, Default)]
pub struct WorkflowModel {
    project: ProjectInfo,
    parameters: ParameterRegistry,
    processes: ProcessStore,
    environment: EnvironmentConfigurator,
    revision: u64,
    resolution: Option<CachedResolution>,
}

impl WorkflowModel {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter bumped by every successful mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn project(&self) -> &ProjectInfo {
        &self.project
    }

    pub fn parameters(&self) -> &ParameterRegistry {
        &self.parameters
    }

    pub fn processes(&self) -> &ProcessStore {
        &self.processes
    }

    pub fn environment(&self) -> &EnvironmentConfigurator {
        &self.environment
    }

    pub fn set_project(&mut self, project: ProjectInfo) {
        self.project = project;
        self.touch();
    }

    // Parameters

    pub fn add_parameter(
        &mut self,
        name: &str,
        default_value: impl Into<ParamValue>,
        description: Option<&str>,
    ) -> Result<ParameterId> {
        let id = self.parameters.add(
            name,
            default_value.into(),
            description.map(str::to_string),
        )?;
        self.touch();
        Ok(id)
    }

    pub fn update_parameter(
        &mut self,
        id: ParameterId,
        default_value: impl Into<ParamValue>,
        description: Option<&str>,
    ) -> Result<()> {
        self.parameters.update(
            id,
            default_value.into(),
            description.map(str::to_string),
        )?;
        self.touch();
        Ok(())
    }

    /// Removes a parameter.
    ///
    /// With [`RemovalPolicy::Restrict`] a parameter that some process reads is
    /// kept and the readers are reported in the error. With
    /// [`RemovalPolicy::Cascade`] it is removed and the readers are returned;
    /// they show up as dangling references on the next generation.
    pub fn remove_parameter(&mut self, id: ParameterId, policy: RemovalPolicy) -> Result<Removal> {
        let name = self.parameters.get_by_id(id)?.name.clone();
        let dangling = self.processes.dependents_of_parameter(&name);

        if !dangling.is_empty() && policy == RemovalPolicy::Restrict {
            return Err(ModelError::ReferencedByProcess {
                parameter: name,
                processes: dangling,
            });
        }

        self.parameters.remove(id)?;
        self.touch();

        for process in &dangling {
            warn!("Process '{}' now references removed parameter '{}'", process, name);
        }

        Ok(Removal {
            removed: name,
            dangling,
        })
    }

    pub fn get_parameter(&self, name: &str) -> Result<&Parameter> {
        self.parameters.get(name)
    }

    // Processes

    pub fn add_process(&mut self, definition: ProcessDefinition) -> Result<ProcessId> {
        let id = self.processes.add(definition)?;
        self.touch();
        Ok(id)
    }

    /// Applies a patch to a process.
    ///
    /// Only local checks run here. Whether the patched references resolve is
    /// decided at generation time, so processes can be edited in any order.
    pub fn update_process(&mut self, id: ProcessId, patch: &ProcessPatch) -> Result<()> {
        self.processes.update(id, patch)?;
        self.touch();
        Ok(())
    }

    /// Removes a process; processes that read its outputs are left dangling.
    pub fn remove_process(&mut self, id: ProcessId) -> Result<Removal> {
        let name = self.processes.get_by_id(id)?.name.clone();
        let dangling = self.processes.dependents_of_process(&name);

        self.processes.remove(id)?;
        self.touch();

        for process in &dangling {
            warn!("Process '{}' now reads from removed process '{}'", process, name);
        }

        Ok(Removal {
            removed: name,
            dangling,
        })
    }

    pub fn get_process(&self, name: &str) -> Result<&ProcessDefinition> {
        self.processes.get(name)
    }

    // Environment

    pub fn set_profile(&mut self, name: &str, directives: Directives) -> Result<()> {
        self.environment.set_profile(name, directives)?;
        self.touch();
        Ok(())
    }

    pub fn get_profile(&self, name: &str) -> Result<&EnvironmentProfile> {
        self.environment.get_profile(name)
    }

    pub fn remove_profile(&mut self, name: &str) -> Result<()> {
        self.environment.remove_profile(name)?;
        self.touch();
        Ok(())
    }

    pub fn set_container(&mut self, container: ContainerSetup) -> Result<()> {
        self.environment.set_container(container)?;
        self.touch();
        Ok(())
    }

    pub fn set_scheduler(&mut self, scheduler: Option<Scheduler>) -> Result<()> {
        self.environment.set_scheduler(scheduler)?;
        self.touch();
        Ok(())
    }

    pub fn set_output(&mut self, output: Option<OutputSettings>) -> Result<()> {
        self.environment.set_output(output)?;
        self.touch();
        Ok(())
    }

    // Generation

    /// Validates the current model, reusing the last result if nothing changed.
    pub fn resolve(&mut self) -> Resolution {
        if let Some(cached) = &self.resolution {
            if cached.revision == self.revision {
                debug!("Reusing validation result for revision {}", self.revision);
                return cached.resolution.clone();
            }
        }

        let resolution = validator::resolve(self);
        self.resolution = Some(CachedResolution {
            revision: self.revision,
            resolution: resolution.clone(),
        });
        resolution
    }

    /// Validates the model and, if it is sound, renders the workflow script
    /// and its configuration file.
    pub fn generate(&mut self) -> GenerationResult {
        info!("Generating workflow (revision {})", self.revision);

        match self.resolve() {
            Ok(order) => {
                let rendered = emitter::emit(self, &order);
                info!(
                    "Generated {} processes: script {} bytes, config {} bytes",
                    order.len(),
                    rendered.script.len(),
                    rendered.config.len()
                );
                GenerationResult::Success {
                    workflow_script: rendered.script,
                    environment_config: rendered.config,
                }
            }
            Err(findings) => {
                warn!("Generation blocked by {} finding(s)", findings.len());
                GenerationResult::Failure { findings }
            }
        }
    }

    fn touch(&mut self) {
        self.revision += 1;
        self.resolution = None;
    }
}
