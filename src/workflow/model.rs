//! Workflow Data Model
//!
//! Core data structures describing parameters, processes and their channel
//! bindings, as collected from the workflow form.
//!
//! # Example
//!
//! ```
//! use nextforge::workflow::{InputSource, ProcessDefinition};
//!
//! let sort = ProcessDefinition::new("sort", "samtools sort ${bam} > sorted.bam")
//!     .with_input("bam", InputSource::process_output("align", "bam"))
//!     .with_output("sorted_bam")
//!     .with_directive("cpus", "4");
//!
//! assert_eq!(sort.inputs.len(), 1);
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Namespace, Result};

use super::identifier::check_identifier;

/// Directive key that binds a process to an environment profile.
pub const PROFILE_DIRECTIVE: &str = "profile";

/// Registry-assigned handle of a parameter.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParameterId(pub(crate) u64);

/// Store-assigned handle of a process.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessId(pub(crate) u64);

impl fmt::Display for ParameterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "param#{}", self.0)
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "process#{}", self.0)
    }
}

/// A typed default value.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ParamValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    /// A file or directory path, kept as written.
    Path(String),
}

impl ParamValue {
    /// Human readable type name, as shown on the form.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "String",
            Self::Integer(_) => "Integer",
            Self::Float(_) => "Float",
            Self::Boolean(_) => "Boolean",
            Self::Path(_) => "Path",
        }
    }

    /// Returns true for path values, which bind as `path` inputs.
    pub fn is_path(&self) -> bool {
        matches!(self, Self::Path(_))
    }

    /// Rejects values that have no literal form in the generated source.
    pub(crate) fn check(&self, field: &str) -> Result<()> {
        match self {
            Self::Float(v) if !v.is_finite() => Err(ModelError::invalid_value(
                field,
                format!("{} has no literal representation", v),
            )),
            Self::Path(p) if p.trim().is_empty() => {
                Err(ModelError::invalid_value(field, "path is empty"))
            }
            _ => Ok(()),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

/// A named workflow parameter with its default value.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Parameter {
    pub id: ParameterId,
    pub name: String,
    pub default_value: ParamValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Where a process input takes its data from.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum InputSource {
    /// A workflow parameter, by name.
    Parameter(String),
    /// A named output channel of another process.
    ProcessOutput { process: String, output: String },
    /// A constant value.
    Literal(ParamValue),
}

impl InputSource {
    pub fn parameter(name: impl Into<String>) -> Self {
        Self::Parameter(name.into())
    }

    pub fn process_output(process: impl Into<String>, output: impl Into<String>) -> Self {
        Self::ProcessOutput {
            process: process.into(),
            output: output.into(),
        }
    }

    pub fn literal(value: impl Into<ParamValue>) -> Self {
        Self::Literal(value.into())
    }
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parameter(name) => write!(f, "params.{}", name),
            Self::ProcessOutput { process, output } => write!(f, "{}.{}", process, output),
            Self::Literal(value) => write!(f, "literal {}", value.type_name()),
        }
    }
}

/// A named input of a process.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct InputBinding {
    pub name: String,
    pub source: InputSource,
}

/// A named output channel of a process.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OutputChannel {
    pub name: String,

    /// File pattern captured by the channel; the channel name when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl OutputChannel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: None,
        }
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// The file pattern to declare for this channel.
    pub fn file_pattern(&self) -> &str {
        self.pattern.as_deref().unwrap_or(&self.name)
    }
}

/// A single key/value execution hint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Directive {
    pub key: String,
    pub value: String,
}

/// Ordered, string-keyed directive mapping.
///
/// Iteration follows insertion order; re-setting a key keeps its position.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct Directives {
    entries: Vec<Directive>,
}

impl Directives {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` to `value`, replacing an existing entry in place.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|d| d.key == key) {
            Some(existing) => existing.value = value,
            None => self.entries.push(Directive { key, value }),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|d| d.key == key)
            .map(|d| d.value.as_str())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.entries.iter().position(|d| d.key == key)?;
        Some(self.entries.remove(index).value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|d| (d.key.as_str(), d.value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Directives {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut directives = Directives::new();
        for (key, value) in iter {
            directives.set(key, value);
        }
        directives
    }
}

/// A computational step of the workflow.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProcessDefinition {
    /// Unique process name, also the block name in the generated script
    pub name: String,

    /// Input bindings, in declaration order
    #[serde(default)]
    pub inputs: Vec<InputBinding>,

    /// Output channels, in declaration order
    #[serde(default)]
    pub outputs: Vec<OutputChannel>,

    /// Script body, kept byte for byte
    pub script: String,

    /// Execution hints such as `cpus`, `memory` or `container`
    #[serde(default, skip_serializing_if = "Directives::is_empty")]
    pub directives: Directives,
}

impl ProcessDefinition {
    /// Creates a process with no inputs, outputs or directives.
    ///
    /// The name is trimmed; the script is stored exactly as given.
    pub fn new(name: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            name: name.into().trim().to_string(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            script: script.into(),
            directives: Directives::new(),
        }
    }

    /// Appends an input binding.
    pub fn with_input(mut self, name: impl Into<String>, source: InputSource) -> Self {
        self.inputs.push(InputBinding {
            name: name.into(),
            source,
        });
        self
    }

    /// Appends an output channel named `name`.
    pub fn with_output(mut self, name: impl Into<String>) -> Self {
        self.outputs.push(OutputChannel::new(name));
        self
    }

    /// Appends a fully specified output channel.
    pub fn with_output_channel(mut self, channel: OutputChannel) -> Self {
        self.outputs.push(channel);
        self
    }

    /// Sets a directive.
    pub fn with_directive(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.directives.set(key, value);
        self
    }

    /// Binds this process to an environment profile.
    pub fn with_profile(self, profile: impl Into<String>) -> Self {
        self.with_directive(PROFILE_DIRECTIVE, profile)
    }

    /// Name of the environment profile this process runs under, if any.
    pub fn profile(&self) -> Option<&str> {
        self.directives.get(PROFILE_DIRECTIVE)
    }

    /// Looks up a declared output channel.
    pub fn output(&self, name: &str) -> Option<&OutputChannel> {
        self.outputs.iter().find(|o| o.name == name)
    }

    /// Returns true if any input reads parameter `name`.
    pub fn references_parameter(&self, name: &str) -> bool {
        self.inputs
            .iter()
            .any(|i| matches!(&i.source, InputSource::Parameter(p) if p == name))
    }

    /// Returns true if any input reads an output of process `name`.
    pub fn references_process(&self, name: &str) -> bool {
        self.inputs.iter().any(
            |i| matches!(&i.source, InputSource::ProcessOutput { process, .. } if process == name),
        )
    }

    /// Checks everything that can be checked without looking at the rest of
    /// the model: names, script body and directive values.
    pub(crate) fn check_local(&self) -> Result<()> {
        check_identifier(Namespace::Process, &self.name)?;

        if self.script.trim().is_empty() {
            return Err(ModelError::EmptyScript(self.name.clone()));
        }

        let mut seen = Vec::with_capacity(self.inputs.len());
        for input in &self.inputs {
            check_identifier(Namespace::Input, &input.name)?;
            if seen.contains(&input.name.as_str()) {
                return Err(ModelError::duplicate(Namespace::Input, &input.name));
            }
            seen.push(input.name.as_str());

            match &input.source {
                InputSource::Literal(value) => {
                    value.check(&format!("{}.{}", self.name, input.name))?
                }
                InputSource::Parameter(name) if name.trim().is_empty() => {
                    return Err(ModelError::invalid_value(
                        format!("{}.{}", self.name, input.name),
                        "parameter reference is empty",
                    ));
                }
                InputSource::ProcessOutput { process, output }
                    if process.trim().is_empty() || output.trim().is_empty() =>
                {
                    return Err(ModelError::invalid_value(
                        format!("{}.{}", self.name, input.name),
                        "process output reference is incomplete",
                    ));
                }
                _ => {}
            }
        }

        let mut seen = Vec::with_capacity(self.outputs.len());
        for output in &self.outputs {
            check_identifier(Namespace::Output, &output.name)?;
            if seen.contains(&output.name.as_str()) {
                return Err(ModelError::duplicate(Namespace::Output, &output.name));
            }
            seen.push(output.name.as_str());

            if matches!(&output.pattern, Some(p) if p.trim().is_empty()) {
                return Err(ModelError::invalid_value(
                    format!("{}.{}", self.name, output.name),
                    "output pattern is empty",
                ));
            }
        }

        for (key, value) in self.directives.iter() {
            check_identifier(Namespace::Directive, key)?;
            if value.trim().is_empty() {
                return Err(ModelError::invalid_value(
                    format!("{}.{}", self.name, key),
                    "directive value is empty",
                ));
            }
        }

        Ok(())
    }
}

/// Partial update of a process; `None` fields are left unchanged.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ProcessPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub inputs: Option<Vec<InputBinding>>,
    #[serde(default)]
    pub outputs: Option<Vec<OutputChannel>>,
    #[serde(default)]
    pub script: Option<String>,
    #[serde(default)]
    pub directives: Option<Directives>,
}

impl ProcessPatch {
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn script(script: impl Into<String>) -> Self {
        Self {
            script: Some(script.into()),
            ..Self::default()
        }
    }

    /// Returns the definition with this patch applied.
    pub(crate) fn apply_to(&self, definition: &ProcessDefinition) -> ProcessDefinition {
        let mut patched = definition.clone();
        if let Some(name) = &self.name {
            patched.name = name.trim().to_string();
        }
        if let Some(inputs) = &self.inputs {
            patched.inputs = inputs.clone();
        }
        if let Some(outputs) = &self.outputs {
            patched.outputs = outputs.clone();
        }
        if let Some(script) = &self.script {
            patched.script = script.clone();
        }
        if let Some(directives) = &self.directives {
            patched.directives = directives.clone();
        }
        patched
    }
}

/// Descriptive information about the pipeline project.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ProjectInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author_name: String,
    #[serde(default)]
    pub author_email: String,

    /// Generation timestamp printed in the script header
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
}

impl ProjectInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_author(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.author_name = name.into();
        self.author_email = email.into();
        self
    }
}
