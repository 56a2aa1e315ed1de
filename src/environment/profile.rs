//! Execution Environment Configuration
//!
//! Holds everything that ends up in `nextflow.config`:
//!
//! - named profiles, each a bundle of dotted configuration directives
//!   (`process.executor`, `docker.enabled`, `conda.channels`, ...)
//! - the default container or conda environment for all processes
//! - the cluster scheduler and queue
//! - where and how results are published
//!
//! The configurator knows nothing about processes. Processes refer to
//! profiles by name, and those references are checked by the validator.

use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Namespace, Result};
use crate::workflow::identifier::{check_dotted_identifier, check_identifier};
use crate::workflow::model::Directives;

/// A named bundle of environment directives.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EnvironmentProfile {
    pub name: String,
    #[serde(default)]
    pub directives: Directives,
}

/// How process software is provisioned by default.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(tag = "engine", rename_all = "lowercase")]
pub enum ContainerSetup {
    #[default]
    None,
    Docker { image: String },
    Singularity { image: String },
    /// Conda environment file or package specification
    Conda { environment: String },
}

impl ContainerSetup {
    fn check(&self) -> Result<()> {
        match self {
            Self::None => Ok(()),
            Self::Docker { image } | Self::Singularity { image } if image.trim().is_empty() => {
                Err(ModelError::invalid_value("container.image", "image name is empty"))
            }
            Self::Conda { environment } if environment.trim().is_empty() => Err(
                ModelError::invalid_value("container.environment", "conda environment is empty"),
            ),
            _ => Ok(()),
        }
    }
}

/// Executor backends understood by Nextflow.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Executor {
    Local,
    Slurm,
    Sge,
    Pbs,
    Lsf,
    Awsbatch,
    GoogleBatch,
    #[serde(untagged)]
    Other(String),
}

impl Executor {
    /// Parses an executor name as chosen on the form.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "local" => Self::Local,
            "slurm" => Self::Slurm,
            "sge" => Self::Sge,
            "pbs" => Self::Pbs,
            "lsf" => Self::Lsf,
            "awsbatch" => Self::Awsbatch,
            "google-batch" => Self::GoogleBatch,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Local => "local",
            Self::Slurm => "slurm",
            Self::Sge => "sge",
            Self::Pbs => "pbs",
            Self::Lsf => "lsf",
            Self::Awsbatch => "awsbatch",
            Self::GoogleBatch => "google-batch",
            Self::Other(name) => name,
        };
        f.write_str(name)
    }
}

/// Cluster or cloud scheduler settings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Scheduler {
    pub executor: Executor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue: Option<String>,
}

impl Scheduler {
    pub fn new(executor: Executor) -> Self {
        Self {
            executor,
            queue: None,
        }
    }

    pub fn with_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = Some(queue.into());
        self
    }
}

/// Result publishing settings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OutputSettings {
    pub publish_dir: String,

    /// Echo process output to the console
    #[serde(default)]
    pub debug_logs: bool,

    /// Only publish files matching this pattern
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_pattern: Option<String>,
}

impl OutputSettings {
    pub fn new(publish_dir: impl Into<String>) -> Self {
        Self {
            publish_dir: publish_dir.into(),
            debug_logs: false,
            file_pattern: None,
        }
    }
}

/// Environment profiles plus the global execution defaults.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct EnvironmentConfigurator {
    #[serde(default)]
    profiles: Vec<EnvironmentProfile>,
    #[serde(default)]
    container: ContainerSetup,
    #[serde(default)]
    scheduler: Option<Scheduler>,
    #[serde(default)]
    output: Option<OutputSettings>,
}

impl EnvironmentConfigurator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or replaces a profile.
    ///
    /// A replaced profile keeps its position in the emitted configuration.
    pub fn set_profile(&mut self, name: &str, directives: Directives) -> Result<()> {
        let name = name.trim();
        check_identifier(Namespace::Profile, name)?;
        for (key, value) in directives.iter() {
            check_dotted_identifier(Namespace::Directive, key)?;
            if value.trim().is_empty() {
                return Err(ModelError::invalid_value(
                    format!("{}.{}", name, key),
                    "directive value is empty",
                ));
            }
        }

        match self.profiles.iter_mut().find(|p| p.name == name) {
            Some(existing) => {
                debug!("Replacing profile '{}'", name);
                existing.directives = directives;
            }
            None => {
                debug!("Adding profile '{}' ({} directives)", name, directives.len());
                self.profiles.push(EnvironmentProfile {
                    name: name.to_string(),
                    directives,
                });
            }
        }
        Ok(())
    }

    pub fn get_profile(&self, name: &str) -> Result<&EnvironmentProfile> {
        self.profiles
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| ModelError::not_found(Namespace::Profile, name))
    }

    pub fn remove_profile(&mut self, name: &str) -> Result<EnvironmentProfile> {
        let index = self
            .profiles
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| ModelError::not_found(Namespace::Profile, name))?;
        Ok(self.profiles.remove(index))
    }

    pub fn has_profile(&self, name: &str) -> bool {
        self.profiles.iter().any(|p| p.name == name)
    }

    /// Iterates profiles in insertion order.
    pub fn profiles(&self) -> impl Iterator<Item = &EnvironmentProfile> {
        self.profiles.iter()
    }

    pub fn set_container(&mut self, container: ContainerSetup) -> Result<()> {
        container.check()?;
        self.container = container;
        Ok(())
    }

    pub fn container(&self) -> &ContainerSetup {
        &self.container
    }

    /// Sets the scheduler; `None` runs processes with the default executor.
    pub fn set_scheduler(&mut self, scheduler: Option<Scheduler>) -> Result<()> {
        if let Some(scheduler) = &scheduler {
            if scheduler.executor.to_string().trim().is_empty() {
                return Err(ModelError::invalid_value(
                    "scheduler.executor",
                    "executor name is empty",
                ));
            }
            if matches!(&scheduler.queue, Some(q) if q.trim().is_empty()) {
                return Err(ModelError::invalid_value("scheduler.queue", "queue is empty"));
            }
        }
        self.scheduler = scheduler;
        Ok(())
    }

    pub fn scheduler(&self) -> Option<&Scheduler> {
        self.scheduler.as_ref()
    }

    pub fn set_output(&mut self, output: Option<OutputSettings>) -> Result<()> {
        if let Some(output) = &output {
            if output.publish_dir.trim().is_empty() {
                return Err(ModelError::invalid_value(
                    "output.publish_dir",
                    "publish directory is empty",
                ));
            }
        }
        self.output = output;
        Ok(())
    }

    pub fn output(&self) -> Option<&OutputSettings> {
        self.output.as_ref()
    }
}
