//! NextForge CLI Entry Point
//!
//! Reads a workflow form document and prints the generated Nextflow
//! script and configuration.
//!
//! # Usage
//!
//! ```bash
//! # Print main.nf and nextflow.config
//! nextforge pipeline.yaml
//!
//! # Only the workflow script, redirected to a file
//! nextforge pipeline.yaml --script-only > main.nf
//!
//! # Machine-readable result (texts or findings)
//! nextforge pipeline.yaml --json
//!
//! # Record the generation time in the script header
//! nextforge pipeline.yaml --stamp
//! ```

use std::env;
use std::process::ExitCode;

use chrono::Utc;
use colored::Colorize;
use log::{error, info};

use nextforge::emitter::{CONFIG_FILE_NAME, SCRIPT_FILE_NAME};
use nextforge::workflow::parser::load_model;
use nextforge::{GenerationResult, ValidationFinding, APP_NAME, VERSION};

/// Default form file used when none is specified.
const DEFAULT_FORM: &str = "workflow.yaml";

/// Which of the generated texts to print.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Selection {
    Both,
    ScriptOnly,
    ConfigOnly,
}

/// Command-line configuration parsed from arguments.
#[derive(Debug)]
struct Config {
    form_path: String,
    selection: Selection,
    json: bool,
    stamp: bool,
    verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            form_path: DEFAULT_FORM.to_string(),
            selection: Selection::Both,
            json: false,
            stamp: false,
            verbose: false,
        }
    }
}

/// Configures the logging system with appropriate formatting.
///
/// Logs go to stderr so generated text on stdout can be redirected.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Warn | log::Level::Error => {
                    writeln!(buf, "[{}] {}", record.level(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .init();
}

/// Prints the application banner with version information.
fn print_banner() {
    eprintln!();
    eprintln!("{} v{}", APP_NAME, VERSION);
    eprintln!("Form-Driven Nextflow Pipeline Generator");
    eprintln!();
}

/// Prints usage information.
fn print_usage() {
    println!("Usage: nextforge [OPTIONS] <FORM_FILE>");
    println!();
    println!("Arguments:");
    println!("  <FORM_FILE>         Path to workflow form YAML file (default: {})", DEFAULT_FORM);
    println!();
    println!("Options:");
    println!("  --script-only       Print only {}", SCRIPT_FILE_NAME);
    println!("  --config-only       Print only {}", CONFIG_FILE_NAME);
    println!("  --json              Print the generation result as JSON");
    println!("  --stamp             Record the generation time in the script header");
    println!("  --verbose           Enable debug logging");
    println!("  --help              Show this help message");
    println!("  --version           Show version information");
    println!();
    println!("Examples:");
    println!("  nextforge pipeline.yaml");
    println!("  nextforge pipeline.yaml --script-only > {}", SCRIPT_FILE_NAME);
    println!("  nextforge pipeline.yaml --json");
}

/// Parses command-line arguments into a Config struct.
fn parse_arguments(args: &[String]) -> Result<Config, String> {
    let mut config = Config::default();
    let mut form_given = false;

    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("{} {}", APP_NAME, VERSION);
                std::process::exit(0);
            }
            "--script-only" => {
                if config.selection == Selection::ConfigOnly {
                    return Err("--script-only and --config-only are mutually exclusive".to_string());
                }
                config.selection = Selection::ScriptOnly;
            }
            "--config-only" => {
                if config.selection == Selection::ScriptOnly {
                    return Err("--script-only and --config-only are mutually exclusive".to_string());
                }
                config.selection = Selection::ConfigOnly;
            }
            "--json" => {
                config.json = true;
            }
            "--stamp" => {
                config.stamp = true;
            }
            "--verbose" | "-v" => {
                config.verbose = true;
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            _ => {
                if form_given {
                    return Err(format!("Unexpected argument: {}", arg));
                }
                config.form_path = arg.clone();
                form_given = true;
            }
        }
    }

    Ok(config)
}

/// Prints validation findings in a human-readable form.
fn print_findings(findings: &[ValidationFinding]) {
    eprintln!(
        "{} {} problem(s) must be fixed before the workflow can be generated:",
        "Error".red().bold(),
        findings.len()
    );
    for finding in findings {
        eprintln!("  {} [{}] {}", "✗".red(), finding.code().yellow(), finding);
    }
}

fn print_section(file_name: &str, content: &str, with_marker: bool) {
    if with_marker {
        println!("{}", format!("// ===== {} =====", file_name).dimmed());
    }
    print!("{}", content);
}

/// Main application entry point.
///
/// Returns whether generation succeeded.
fn run() -> Result<bool, Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    // Parse arguments
    let config = parse_arguments(&args).map_err(|e| {
        eprintln!("Error: {}", e);
        eprintln!();
        print_usage();
        e
    })?;

    setup_logging(config.verbose);

    if !config.json {
        print_banner();
    }

    // Load form
    let mut model = load_model(&config.form_path).map_err(|e| {
        error!("Failed to load workflow form: {}", e);
        format!("Could not load workflow form from '{}': {}", config.form_path, e)
    })?;

    if config.stamp {
        let mut project = model.project().clone();
        project.generated_at = Some(Utc::now());
        model.set_project(project);
    }

    info!(
        "Form loaded: {} parameters, {} processes",
        model.parameters().len(),
        model.processes().len()
    );

    let result = model.generate();

    if config.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(result.is_success());
    }

    match result {
        GenerationResult::Success {
            workflow_script,
            environment_config,
        } => {
            match config.selection {
                Selection::ScriptOnly => print_section(SCRIPT_FILE_NAME, &workflow_script, false),
                Selection::ConfigOnly => {
                    print_section(CONFIG_FILE_NAME, &environment_config, false)
                }
                Selection::Both => {
                    print_section(SCRIPT_FILE_NAME, &workflow_script, true);
                    println!();
                    print_section(CONFIG_FILE_NAME, &environment_config, true);
                }
            }
            eprintln!("{} Workflow generated", "✓".green());
            Ok(true)
        }
        GenerationResult::Failure { findings } => {
            print_findings(&findings);
            Ok(false)
        }
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!();
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("nextforge")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_default_config() {
        let config = parse_arguments(&args(&[])).unwrap();
        assert_eq!(config.form_path, DEFAULT_FORM);
        assert_eq!(config.selection, Selection::Both);
        assert!(!config.json);
    }

    #[test]
    fn test_parse_flags() {
        let config =
            parse_arguments(&args(&["form.yaml", "--script-only", "--stamp", "-v"])).unwrap();
        assert_eq!(config.form_path, "form.yaml");
        assert_eq!(config.selection, Selection::ScriptOnly);
        assert!(config.stamp);
        assert!(config.verbose);
    }

    #[test]
    fn test_conflicting_selection() {
        assert!(parse_arguments(&args(&["--script-only", "--config-only"])).is_err());
    }

    #[test]
    fn test_unknown_option() {
        assert!(parse_arguments(&args(&["--dry-run"])).is_err());
    }

    #[test]
    fn test_extra_positional() {
        assert!(parse_arguments(&args(&["a.yaml", "b.yaml"])).is_err());
    }
}
