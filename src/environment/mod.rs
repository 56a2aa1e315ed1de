//! Environment Configuration Module
//!
//! Execution environment settings for the generated pipeline: profiles,
//! container or conda provisioning, scheduler and result publishing.

pub mod profile;

pub use profile::{
    ContainerSetup, EnvironmentConfigurator, EnvironmentProfile, Executor, OutputSettings,
    Scheduler,
};
