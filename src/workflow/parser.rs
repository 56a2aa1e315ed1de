//! Workflow Form Loader
//!
//! Reads a workflow form document (YAML) and replays it against a fresh
//! [`WorkflowModel`] through the regular mutation calls, exactly as the
//! interactive form would. Any entry the model rejects aborts loading with
//! the model's own error.
//!
//! # Example Form
//!
//! ```yaml
//! project:
//!   name: RNA_Seq_Analysis
//!   author_name: Jane Doe
//!
//! parameters:
//!   - name: threads
//!     type: Integer
//!     default: 4
//!     description: Aligner threads
//!   - name: genome
//!     type: Path
//!     default: ref/hg38.fa
//!
//! processes:
//!   - name: align
//!     inputs:
//!       - name: ref
//!         param: genome
//!     outputs: bam
//!     script: bwa mem ${ref} reads.fq > out.bam
//!     directives:
//!       cpus: 8
//!       profile: cluster
//!
//!   - name: sort
//!     inputs:
//!       - name: bam
//!         from: align.bam
//!     outputs:
//!       - name: sorted_bam
//!         pattern: "*.sorted.bam"
//!     script: samtools sort ${bam}
//!
//! environment:
//!   container:
//!     engine: docker
//!     image: biocontainers/samtools:v1.9.0_cv4
//!   scheduler:
//!     executor: SLURM
//!     queue: bioinformatics_queue
//!
//! profiles:
//!   - name: cluster
//!     directives:
//!       process.executor: slurm
//! ```

use std::fs;
use std::path::Path;

use log::{debug, info};
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use thiserror::Error;

use crate::environment::{ContainerSetup, Executor, OutputSettings, Scheduler};
use crate::error::ModelError;

use super::model::{Directives, InputSource, OutputChannel, ParamValue, ProcessDefinition, ProjectInfo};
use super::session::WorkflowModel;

/// Errors raised while loading a form document.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read form file '{path}': {source}. Check that the file exists and is readable.")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse form YAML: {0}. Check the file format.")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid {context}: {message}")]
    Form { context: String, message: String },

    #[error("Rejected {context}: {source}")]
    Model {
        context: String,
        #[source]
        source: ModelError,
    },
}

impl LoadError {
    fn form(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Form {
            context: context.into(),
            message: message.into(),
        }
    }

    fn model(context: impl Into<String>) -> impl FnOnce(ModelError) -> Self {
        let context = context.into();
        move |source| Self::Model { context, source }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct FormDocument {
    #[serde(default)]
    project: Option<ProjectInfo>,
    #[serde(default)]
    parameters: Vec<ParameterEntry>,
    #[serde(default)]
    processes: Vec<ProcessEntry>,
    #[serde(default)]
    environment: EnvironmentEntry,
    #[serde(default)]
    profiles: Vec<ProfileEntry>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct ParameterEntry {
    name: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    default: Value,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct InputEntry {
    name: String,
    /// Parameter name
    #[serde(default)]
    param: Option<String>,
    /// Upstream output as `process.output`
    #[serde(default)]
    from: Option<String>,
    /// Literal value
    #[serde(default)]
    value: Option<Value>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum OutputEntry {
    Name(String),
    Channel {
        name: String,
        #[serde(default)]
        pattern: Option<String>,
    },
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct ProcessEntry {
    name: String,
    #[serde(default)]
    inputs: Vec<InputEntry>,
    #[serde(default, deserialize_with = "single_or_vec")]
    outputs: Vec<OutputEntry>,
    #[serde(default)]
    script: String,
    #[serde(default)]
    directives: Mapping,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct EnvironmentEntry {
    #[serde(default)]
    container: Option<ContainerSetup>,
    #[serde(default)]
    scheduler: Option<SchedulerEntry>,
    #[serde(default)]
    output: Option<OutputSettings>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct SchedulerEntry {
    executor: String,
    #[serde(default)]
    queue: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct ProfileEntry {
    name: String,
    #[serde(default)]
    directives: Mapping,
}

/// Deserializes either a single output or a list of outputs.
fn single_or_vec<'de, D>(deserializer: D) -> Result<Vec<OutputEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    let val = Value::deserialize(deserializer)?;
    match val {
        Value::Null => Ok(Vec::new()),
        Value::String(s) if s.trim().is_empty() => Ok(Vec::new()),
        Value::Sequence(items) => items
            .into_iter()
            .map(|item| OutputEntry::deserialize(item).map_err(de::Error::custom))
            .collect(),
        other => OutputEntry::deserialize(other)
            .map(|entry| vec![entry])
            .map_err(de::Error::custom),
    }
}

/// Loads a workflow model from a form file.
///
/// # Example
///
/// ```rust,no_run
/// use nextforge::workflow::load_model;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut model = load_model("pipeline.yaml")?;
///     println!("Loaded {} processes", model.processes().len());
///     let _result = model.generate();
///     Ok(())
/// }
/// ```
pub fn load_model(path: impl AsRef<Path>) -> Result<WorkflowModel, LoadError> {
    let path = path.as_ref();
    info!("Loading workflow form from: {}", path.display());

    let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;

    debug!("Form content loaded ({} bytes)", content.len());
    parse_model(&content)
}

/// Builds a workflow model from form YAML text.
pub fn parse_model(content: &str) -> Result<WorkflowModel, LoadError> {
    let document: FormDocument = if content.trim().is_empty() {
        FormDocument::default()
    } else {
        serde_yaml::from_str(content)?
    };

    let mut model = WorkflowModel::new();

    if let Some(project) = document.project {
        model.set_project(project);
    }

    for entry in &document.parameters {
        let context = format!("parameter '{}'", entry.name);
        let value = to_param_value(entry.kind.as_deref(), &entry.default, &context)?;
        model
            .add_parameter(&entry.name, value, entry.description.as_deref())
            .map_err(LoadError::model(context))?;
    }

    for entry in &document.profiles {
        let context = format!("profile '{}'", entry.name);
        let directives = to_directives(&entry.directives, &context)?;
        model
            .set_profile(&entry.name, directives)
            .map_err(LoadError::model(context))?;
    }

    apply_environment(&mut model, document.environment)?;

    for entry in &document.processes {
        let context = format!("process '{}'", entry.name);
        let definition = to_process(entry, &context)?;
        model
            .add_process(definition)
            .map_err(LoadError::model(context))?;
    }

    info!(
        "Parsed {} parameters, {} processes, {} profiles",
        model.parameters().len(),
        model.processes().len(),
        model.environment().profiles().count()
    );

    Ok(model)
}

fn apply_environment(model: &mut WorkflowModel, entry: EnvironmentEntry) -> Result<(), LoadError> {
    if let Some(container) = entry.container {
        model
            .set_container(container)
            .map_err(LoadError::model("container settings"))?;
    }

    if let Some(scheduler) = entry.scheduler {
        // The form offers "None" alongside the real schedulers
        if !scheduler.executor.trim().eq_ignore_ascii_case("none") {
            let mut settings = Scheduler::new(Executor::parse(&scheduler.executor));
            settings.queue = scheduler.queue.filter(|q| !q.trim().is_empty());
            model
                .set_scheduler(Some(settings))
                .map_err(LoadError::model("scheduler settings"))?;
        }
    }

    if let Some(output) = entry.output {
        model
            .set_output(Some(output))
            .map_err(LoadError::model("output settings"))?;
    }

    Ok(())
}

fn to_process(entry: &ProcessEntry, context: &str) -> Result<ProcessDefinition, LoadError> {
    let mut definition = ProcessDefinition::new(&entry.name, entry.script.as_str());

    for input in &entry.inputs {
        let input_context = format!("{} input '{}'", context, input.name);
        let source = match (&input.param, &input.from, &input.value) {
            (Some(param), None, None) => InputSource::parameter(param.trim()),
            (None, Some(from), None) => {
                let (process, output) = from.trim().split_once('.').ok_or_else(|| {
                    LoadError::form(&input_context, "'from' must be written as process.output")
                })?;
                InputSource::process_output(process, output)
            }
            (None, None, Some(value)) => {
                InputSource::Literal(to_param_value(input.kind.as_deref(), value, &input_context)?)
            }
            _ => {
                return Err(LoadError::form(
                    input_context,
                    "exactly one of 'param', 'from' or 'value' is required",
                ))
            }
        };
        definition = definition.with_input(input.name.trim(), source);
    }

    for output in &entry.outputs {
        let channel = match output {
            OutputEntry::Name(name) => OutputChannel::new(name.trim()),
            OutputEntry::Channel { name, pattern } => OutputChannel {
                name: name.trim().to_string(),
                pattern: pattern.clone(),
            },
        };
        definition = definition.with_output_channel(channel);
    }

    definition.directives = to_directives(&entry.directives, context)?;
    Ok(definition)
}

fn to_directives(mapping: &Mapping, context: &str) -> Result<Directives, LoadError> {
    let mut directives = Directives::new();
    for (key, value) in mapping {
        let key = key
            .as_str()
            .ok_or_else(|| LoadError::form(context, "directive names must be strings"))?;
        let value = scalar_text(value).ok_or_else(|| {
            LoadError::form(context, format!("directive '{}' must be a scalar", key))
        })?;
        directives.set(key, value);
    }
    Ok(directives)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Converts a form value to a typed value.
///
/// Without an explicit type the YAML scalar type decides. Type names follow
/// the form's choices and are case-insensitive.
fn to_param_value(kind: Option<&str>, value: &Value, context: &str) -> Result<ParamValue, LoadError> {
    let mismatch = |expected: &str| {
        LoadError::form(
            context,
            format!("expected {} default, found {:?}", expected, value),
        )
    };

    let Some(kind) = kind else {
        return match value {
            Value::Bool(b) => Ok(ParamValue::Boolean(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(ParamValue::Integer(i)),
                None => n.as_f64().map(ParamValue::Float).ok_or_else(|| mismatch("a numeric")),
            },
            Value::String(s) => Ok(ParamValue::String(s.clone())),
            _ => Err(mismatch("a scalar")),
        };
    };

    match kind.trim().to_ascii_lowercase().as_str() {
        "string" => scalar_text(value)
            .map(ParamValue::String)
            .ok_or_else(|| mismatch("a string")),
        "path" => scalar_text(value)
            .map(ParamValue::Path)
            .ok_or_else(|| mismatch("a path")),
        "integer" | "int" => match value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
        .map(ParamValue::Integer)
        .ok_or_else(|| mismatch("an integer")),
        "float" | "number" => match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
        .map(ParamValue::Float)
        .ok_or_else(|| mismatch("a float")),
        "boolean" | "bool" => match value {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" => Some(true),
                "false" | "no" => Some(false),
                _ => None,
            },
            _ => None,
        }
        .map(ParamValue::Boolean)
        .ok_or_else(|| mismatch("a boolean")),
        other => Err(LoadError::form(context, format!("unknown type '{}'", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Namespace;
    use crate::workflow::GenerationResult;

    const FORM: &str = r#"
project:
  name: RNA_Seq_Analysis
  description: Differential expression
  author_name: Jane Doe
  author_email: jane.doe@example.com

parameters:
  - name: threads
    type: Integer
    default: 4
  - name: genome
    type: Path
    default: ref/hg38.fa
  - name: paired
    default: true

processes:
  - name: align
    inputs:
      - name: ref
        param: genome
      - name: threads
        param: threads
    outputs: bam
    script: |
      bwa mem -t ${threads} ${ref} reads.fq > out.bam
    directives:
      memory: 8 GB
      cpus: 8
      profile: cluster

  - name: sort
    inputs:
      - name: bam
        from: align.bam
      - name: level
        value: "9"
        type: integer
    outputs:
      - name: sorted_bam
        pattern: "*.sorted.bam"
    script: samtools sort -l ${level} ${bam}

environment:
  container:
    engine: docker
    image: biocontainers/samtools:v1.9.0_cv4
  scheduler:
    executor: SLURM
    queue: bioinformatics_queue
  output:
    publish_dir: results/
    debug_logs: true

profiles:
  - name: cluster
    directives:
      process.executor: slurm
      process.queue: long
"#;

    #[test]
    fn test_parse_full_form() {
        let model = parse_model(FORM).unwrap();

        assert_eq!(model.project().name, "RNA_Seq_Analysis");
        assert_eq!(model.parameters().len(), 3);
        assert_eq!(
            model.get_parameter("genome").unwrap().default_value,
            ParamValue::Path("ref/hg38.fa".into())
        );
        assert_eq!(
            model.get_parameter("paired").unwrap().default_value,
            ParamValue::Boolean(true)
        );

        let align = model.get_process("align").unwrap();
        let keys: Vec<_> = align.directives.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["memory", "cpus", "profile"]);
        assert_eq!(align.directives.get("cpus"), Some("8"));
        assert_eq!(align.outputs[0].name, "bam");

        let sort = model.get_process("sort").unwrap();
        assert_eq!(
            sort.inputs[0].source,
            InputSource::process_output("align", "bam")
        );
        assert_eq!(
            sort.inputs[1].source,
            InputSource::Literal(ParamValue::Integer(9))
        );
        assert_eq!(sort.outputs[0].file_pattern(), "*.sorted.bam");

        let scheduler = model.environment().scheduler().unwrap();
        assert_eq!(scheduler.executor, Executor::Slurm);
        assert!(model.get_profile("cluster").is_ok());
    }

    #[test]
    fn test_parsed_form_generates() {
        let mut model = parse_model(FORM).unwrap();
        match model.generate() {
            GenerationResult::Success {
                workflow_script,
                environment_config,
            } => {
                assert!(workflow_script.contains("    align(file(params.genome), params.threads)\n"));
                assert!(workflow_script.contains("    sort(align.out.bam, 9)\n"));
                assert!(environment_config.contains("executor = 'slurm'"));
            }
            GenerationResult::Failure { findings } => panic!("unexpected findings: {:?}", findings),
        }
    }

    #[test]
    fn test_empty_form() {
        let model = parse_model("").unwrap();
        assert!(model.processes().is_empty());
    }

    #[test]
    fn test_scheduler_none_is_ignored() {
        let model = parse_model("environment:\n  scheduler:\n    executor: None\n").unwrap();
        assert!(model.environment().scheduler().is_none());
    }

    #[test]
    fn test_model_errors_are_reported() {
        let form = "parameters:\n  - name: read-length\n    default: 150\n";
        match parse_model(form).unwrap_err() {
            LoadError::Model { context, source } => {
                assert_eq!(context, "parameter 'read-length'");
                assert!(matches!(
                    source,
                    ModelError::InvalidIdentifier {
                        namespace: Namespace::Parameter,
                        ..
                    }
                ));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_empty_script_rejected() {
        let form = "processes:\n  - name: idle\n    script: \"\"\n";
        assert!(matches!(
            parse_model(form),
            Err(LoadError::Model {
                source: ModelError::EmptyScript(_),
                ..
            })
        ));
    }

    #[test]
    fn test_input_needs_exactly_one_source() {
        let form = "processes:\n  - name: p\n    script: echo\n    inputs:\n      - name: x\n        param: a\n        from: b.c\n";
        assert!(matches!(parse_model(form), Err(LoadError::Form { .. })));
    }

    #[test]
    fn test_from_requires_dot() {
        let form = "processes:\n  - name: p\n    script: echo\n    inputs:\n      - name: x\n        from: align\n";
        assert!(matches!(parse_model(form), Err(LoadError::Form { .. })));
    }

    #[test]
    fn test_type_mismatch() {
        let form = "parameters:\n  - name: depth\n    type: Integer\n    default: deep\n";
        assert!(matches!(parse_model(form), Err(LoadError::Form { .. })));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let form = "processes:\n  - name: p\n    script: echo\n    command: ls\n";
        assert!(matches!(parse_model(form), Err(LoadError::Yaml(_))));
    }

    #[test]
    fn test_load_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(FORM.as_bytes()).unwrap();

        let model = load_model(file.path()).unwrap();
        assert_eq!(model.processes().len(), 2);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            load_model("/nonexistent/form.yaml"),
            Err(LoadError::Io { .. })
        ));
    }
}
