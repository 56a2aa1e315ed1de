//! Configuration File Rendering
//!
//! Produces `nextflow.config`: the manifest, parameter defaults,
//! process-wide defaults derived from the container, scheduler and output
//! settings, container engine scopes, and one entry per environment profile.
//!
//! A profile bound to processes through their `profile` directive also gets
//! a `withLabel` selector in the `process` scope carrying its `process.*`
//! directives, so the binding applies without selecting the profile.

use crate::environment::{ContainerSetup, EnvironmentConfigurator};
use crate::workflow::WorkflowModel;

use super::{literal, SCRIPT_FILE_NAME};

const INDENT: &str = "    ";

/// Renders the environment configuration.
pub fn render(model: &WorkflowModel) -> String {
    let environment = model.environment();
    let mut content = String::new();

    let project = model.project();
    if project.name.trim().is_empty() {
        content.push_str("// Nextflow configuration\n\n");
    } else {
        content.push_str(&format!(
            "// Nextflow configuration - {}\n\n",
            literal::comment(&project.name)
        ));
    }

    content.push_str(&render_manifest(model));

    let parameters: Vec<(&str, String)> = model
        .parameters()
        .iter()
        .map(|p| (p.name.as_str(), literal::value(&p.default_value)))
        .collect();
    if !parameters.is_empty() {
        content.push('\n');
        content.push_str(&render_scope("params", &parameters, INDENT));
    }

    let process_scope = process_settings(environment);
    let selectors = label_selectors(model);
    if !process_scope.is_empty() || !selectors.is_empty() {
        content.push('\n');
        content.push_str(&render_process_scope(&process_scope, &selectors));
    }

    let engine_scope = match environment.container() {
        ContainerSetup::None => None,
        ContainerSetup::Docker { .. } => Some(("docker", vec![("enabled", "true".to_string())])),
        ContainerSetup::Singularity { .. } => Some((
            "singularity",
            vec![
                ("enabled", "true".to_string()),
                ("autoMounts", "true".to_string()),
            ],
        )),
        ContainerSetup::Conda { .. } => Some(("conda", vec![("enabled", "true".to_string())])),
    };
    if let Some((scope, settings)) = engine_scope {
        content.push('\n');
        content.push_str(&render_scope(scope, &settings, INDENT));
    }

    let mut profiles = environment.profiles().peekable();
    if profiles.peek().is_some() {
        content.push_str("\nprofiles {\n");
        for profile in profiles {
            let settings: Vec<(&str, String)> = profile
                .directives
                .iter()
                .map(|(key, value)| (key, literal::directive(value)))
                .collect();
            content.push_str(&indent(&render_scope(&profile.name, &settings, INDENT)));
        }
        content.push_str("}\n");
    }

    content
}

fn render_manifest(model: &WorkflowModel) -> String {
    let project = model.project();
    let mut settings = Vec::new();

    if !project.name.trim().is_empty() {
        settings.push(("name", literal::quote(project.name.trim())));
    }
    if !project.description.trim().is_empty() {
        settings.push(("description", literal::quote(project.description.trim())));
    }
    if !project.author_name.trim().is_empty() {
        let author = if project.author_email.trim().is_empty() {
            project.author_name.trim().to_string()
        } else {
            format!(
                "{} <{}>",
                project.author_name.trim(),
                project.author_email.trim()
            )
        };
        settings.push(("author", literal::quote(&author)));
    }
    settings.push(("mainScript", literal::quote(SCRIPT_FILE_NAME)));

    render_scope("manifest", &settings, INDENT)
}

/// Process-wide defaults, values already rendered as literals.
fn process_settings(environment: &EnvironmentConfigurator) -> Vec<(&'static str, String)> {
    let mut settings = Vec::new();

    if let Some(scheduler) = environment.scheduler() {
        settings.push(("executor", literal::quote(&scheduler.executor.to_string())));
        if let Some(queue) = &scheduler.queue {
            settings.push(("queue", literal::quote(queue.trim())));
        }
    }

    match environment.container() {
        ContainerSetup::None => {}
        ContainerSetup::Docker { image } | ContainerSetup::Singularity { image } => {
            settings.push(("container", literal::quote(image.trim())));
        }
        ContainerSetup::Conda { environment } => {
            settings.push(("conda", literal::quote(environment.trim())));
        }
    }

    if let Some(output) = environment.output() {
        let mut options = vec![
            format!("path: {}", literal::quote(output.publish_dir.trim())),
            "mode: 'copy'".to_string(),
        ];
        if let Some(pattern) = output.file_pattern.as_deref().map(str::trim) {
            if !pattern.is_empty() {
                options.push(format!("pattern: {}", literal::quote(pattern)));
            }
        }
        settings.push(("publishDir", format!("[{}]", options.join(", "))));

        if output.debug_logs {
            settings.push(("debug", "true".to_string()));
        }
    }

    settings
}

/// `process.*` directives of every profile some process is labelled with,
/// keyed by profile name in profile order.
fn label_selectors(model: &WorkflowModel) -> Vec<(&str, Vec<(&str, String)>)> {
    model
        .environment()
        .profiles()
        .filter(|profile| {
            model
                .processes()
                .iter()
                .any(|p| p.profile() == Some(profile.name.as_str()))
        })
        .map(|profile| {
            let settings: Vec<(&str, String)> = profile
                .directives
                .iter()
                .filter_map(|(key, value)| {
                    key.strip_prefix("process.")
                        .map(|key| (key, literal::directive(value)))
                })
                .collect();
            (profile.name.as_str(), settings)
        })
        .filter(|(_, settings)| !settings.is_empty())
        .collect()
}

fn render_process_scope(
    settings: &[(&str, String)],
    selectors: &[(&str, Vec<(&str, String)>)],
) -> String {
    let mut scope = String::from("process {\n");
    for (key, value) in settings {
        scope.push_str(&format!("{}{} = {}\n", INDENT, key, value));
    }
    for (label, label_settings) in selectors {
        let selector = format!("withLabel: {}", literal::quote(label));
        scope.push_str(&indent(&render_scope(&selector, label_settings, INDENT)));
    }
    scope.push_str("}\n");
    scope
}

fn render_scope(name: &str, settings: &[(&str, String)], indent: &str) -> String {
    let mut scope = format!("{} {{\n", name);
    for (key, value) in settings {
        scope.push_str(&format!("{}{} = {}\n", indent, key, value));
    }
    scope.push_str("}\n");
    scope
}

fn indent(block: &str) -> String {
    block
        .lines()
        .map(|line| format!("{}{}\n", INDENT, line))
        .collect()
}
