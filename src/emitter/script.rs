//! Workflow Script Rendering
//!
//! Produces the `main.nf` source: header, parameter declarations, one
//! `process` block per process and the `workflow` block wiring them
//! together.

use crate::workflow::model::{InputSource, ParamValue, ProcessDefinition, PROFILE_DIRECTIVE};
use crate::workflow::WorkflowModel;

use super::literal;

const INDENT: &str = "    ";

/// Renders the workflow script for processes in `order`.
pub fn render(model: &WorkflowModel, order: &[String]) -> String {
    let processes: Vec<&ProcessDefinition> = order
        .iter()
        .map(|name| {
            model
                .processes()
                .find(name)
                .unwrap_or_else(|| panic!("process '{}' in execution order is not in the model", name))
        })
        .collect();

    let mut content = render_header(model);
    content.push_str("nextflow.enable.dsl = 2\n\n");

    let parameters = render_parameters(model);
    if !parameters.is_empty() {
        content.push_str(&parameters);
        content.push('\n');
    }

    for process in &processes {
        content.push_str(&render_process(model, process));
        content.push('\n');
    }

    content.push_str(&render_workflow(model, &processes));
    content
}

fn render_header(model: &WorkflowModel) -> String {
    let project = model.project();
    let mut header = String::from("#!/usr/bin/env nextflow\n");

    if project.name.trim().is_empty() {
        header.push_str("// Nextflow Workflow\n");
    } else {
        header.push_str(&format!(
            "// Nextflow Workflow - {}\n",
            literal::comment(&project.name)
        ));
    }

    if !project.description.trim().is_empty() {
        header.push_str(&format!(
            "// Description: {}\n",
            literal::comment(&project.description)
        ));
    }

    if !project.author_name.trim().is_empty() {
        let author = literal::comment(&project.author_name);
        if project.author_email.trim().is_empty() {
            header.push_str(&format!("// Author: {}\n", author));
        } else {
            header.push_str(&format!(
                "// Author: {} ({})\n",
                author,
                literal::comment(&project.author_email)
            ));
        }
    }

    if let Some(generated_at) = project.generated_at {
        header.push_str(&format!("// Generated: {}\n", generated_at.to_rfc3339()));
    }

    header.push('\n');
    header
}

fn render_parameters(model: &WorkflowModel) -> String {
    let mut block = String::new();
    for parameter in model.parameters().iter() {
        if let Some(description) = &parameter.description {
            block.push_str(&format!("// {}\n", literal::comment(description)));
        }
        block.push_str(&format!(
            "params.{} = {}\n",
            parameter.name,
            literal::value(&parameter.default_value)
        ));
    }
    block
}

fn render_process(model: &WorkflowModel, process: &ProcessDefinition) -> String {
    let mut block = format!("process {} {{\n", process.name);

    if !process.directives.is_empty() {
        for (key, value) in process.directives.iter() {
            let key = if key == PROFILE_DIRECTIVE { "label" } else { key };
            block.push_str(&format!("{}{} {}\n", INDENT, key, literal::directive(value)));
        }
        block.push('\n');
    }

    if !process.inputs.is_empty() {
        block.push_str(&format!("{}input:\n", INDENT));
        for input in &process.inputs {
            let qualifier = if binds_path(model, &input.source) {
                "path"
            } else {
                "val"
            };
            block.push_str(&format!("{}{} {}\n", INDENT, qualifier, input.name));
        }
        block.push('\n');
    }

    if !process.outputs.is_empty() {
        block.push_str(&format!("{}output:\n", INDENT));
        for output in &process.outputs {
            block.push_str(&format!(
                "{}path {}, emit: {}\n",
                INDENT,
                literal::quote(output.file_pattern()),
                output.name
            ));
        }
        block.push('\n');
    }

    block.push_str(&format!("{}script:\n", INDENT));
    block.push_str(&render_body(&process.script));
    block.push_str("}\n");
    block
}

/// Wraps the script body in `"""`, indenting non-empty lines.
///
/// Line contents are kept byte for byte, including any carriage returns,
/// except that runs of three or more double quotes are escaped so they
/// cannot close the string. The interpolated text is unchanged.
fn render_body(script: &str) -> String {
    const DELIMITER: &str = "\"\"\"";

    let body = script.strip_suffix('\n').unwrap_or(script);

    let mut out = format!("{}{}\n", INDENT, DELIMITER);
    for line in body.split('\n') {
        if !line.is_empty() {
            out.push_str(INDENT);
            out.push_str(&escape_quote_runs(line));
        }
        out.push('\n');
    }
    out.push_str(&format!("{}{}\n", INDENT, DELIMITER));
    out
}

/// Backslash-escapes every quote in a run of three or more `"`.
///
/// A quote already escaped by a preceding backslash is left as is.
fn escape_quote_runs(line: &str) -> String {
    let chars: Vec<char> = line.chars().collect();
    let mut out = String::with_capacity(line.len());
    let mut backslashes = 0;
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '"' {
            backslashes = if chars[i] == '\\' { backslashes + 1 } else { 0 };
            out.push(chars[i]);
            i += 1;
            continue;
        }

        let run = chars[i..].iter().take_while(|&&c| c == '"').count();
        for position in 0..run {
            let escaped = position == 0 && backslashes % 2 == 1;
            if run >= 3 && !escaped {
                out.push('\\');
            }
            out.push('"');
        }
        backslashes = 0;
        i += run;
    }
    out
}

fn render_workflow(model: &WorkflowModel, processes: &[&ProcessDefinition]) -> String {
    let mut block = String::from("workflow {\n");
    for process in processes {
        let arguments: Vec<String> = process
            .inputs
            .iter()
            .map(|input| render_argument(model, &input.source))
            .collect();
        block.push_str(&format!(
            "{}{}({})\n",
            INDENT,
            process.name,
            arguments.join(", ")
        ));
    }
    block.push_str("}\n");
    block
}

fn render_argument(model: &WorkflowModel, source: &InputSource) -> String {
    match source {
        InputSource::Parameter(name) => {
            if parameter_value(model, name).is_path() {
                format!("file(params.{})", name)
            } else {
                format!("params.{}", name)
            }
        }
        InputSource::ProcessOutput { process, output } => format!("{}.out.{}", process, output),
        InputSource::Literal(value) => literal::argument(value),
    }
}

fn binds_path(model: &WorkflowModel, source: &InputSource) -> bool {
    match source {
        InputSource::Parameter(name) => parameter_value(model, name).is_path(),
        InputSource::ProcessOutput { .. } => true,
        InputSource::Literal(value) => value.is_path(),
    }
}

fn parameter_value<'a>(model: &'a WorkflowModel, name: &str) -> &'a ParamValue {
    &model
        .parameters()
        .find(name)
        .unwrap_or_else(|| panic!("parameter '{}' is referenced but not registered", name))
        .default_value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::model::{OutputChannel, ProjectInfo};

    fn render_all(model: &mut WorkflowModel) -> String {
        let order = model.resolve().expect("model should resolve");
        render(model, &order)
    }

    #[test]
    fn test_full_script_layout() {
        let mut model = WorkflowModel::new();
        model.set_project(
            ProjectInfo::new("RNA_Seq_Analysis")
                .with_description("Differential expression")
                .with_author("Jane Doe", "jane.doe@example.com"),
        );
        model
            .add_parameter("threads", ParamValue::Integer(4), Some("Aligner threads"))
            .unwrap();
        model
            .add_process(ProcessDefinition::new("align", "run aligner").with_output("bam"))
            .unwrap();
        model
            .add_process(
                ProcessDefinition::new("sort", "sort %bam%")
                    .with_input("bam", InputSource::process_output("align", "bam"))
                    .with_input("threads", InputSource::parameter("threads"))
                    .with_output("sorted_bam"),
            )
            .unwrap();

        let expected = "\
#!/usr/bin/env nextflow
// Nextflow Workflow - RNA_Seq_Analysis
// Description: Differential expression
// Author: Jane Doe (jane.doe@example.com)

nextflow.enable.dsl = 2

// Aligner threads
params.threads = 4

process align {
    output:
    path 'bam', emit: bam

    script:
    \"\"\"
    run aligner
    \"\"\"
}

process sort {
    input:
    path bam
    val threads

    output:
    path 'sorted_bam', emit: sorted_bam

    script:
    \"\"\"
    sort %bam%
    \"\"\"
}

workflow {
    align()
    sort(align.out.bam, params.threads)
}
";
        assert_eq!(render_all(&mut model), expected);
    }

    #[test]
    fn test_directives_in_insertion_order() {
        let mut model = WorkflowModel::new();
        model.set_profile("cluster", Default::default()).unwrap();
        model
            .add_process(
                ProcessDefinition::new("align", "bwa mem")
                    .with_directive("memory", "8 GB")
                    .with_directive("cpus", "8")
                    .with_profile("cluster")
                    .with_directive("container", "biocontainers/bwa:0.7.17"),
            )
            .unwrap();

        let script = render_all(&mut model);
        assert!(script.contains(
            "process align {\n    memory '8 GB'\n    cpus 8\n    label 'cluster'\n    container 'biocontainers/bwa:0.7.17'\n\n"
        ));
    }

    #[test]
    fn test_path_parameters_and_literals() {
        let mut model = WorkflowModel::new();
        model
            .add_parameter("genome", ParamValue::Path("ref/hg38.fa".into()), None)
            .unwrap();
        model
            .add_process(
                ProcessDefinition::new("index", "bwa index ${ref}")
                    .with_input("ref", InputSource::parameter("genome"))
                    .with_input("algo", InputSource::literal("bwtsw"))
                    .with_input("ratio", InputSource::literal(0.5))
                    .with_input(
                        "adapters",
                        InputSource::Literal(ParamValue::Path("adapters.fa".into())),
                    )
                    .with_output_channel(OutputChannel::new("index").with_pattern("*.bwt")),
            )
            .unwrap();

        let script = render_all(&mut model);
        assert!(script.contains("params.genome = 'ref/hg38.fa'\n"));
        assert!(script.contains(
            "    input:\n    path ref\n    val algo\n    val ratio\n    path adapters\n"
        ));
        assert!(script.contains("    path '*.bwt', emit: index\n"));
        assert!(script.contains(
            "    index(file(params.genome), 'bwtsw', 0.5, file('adapters.fa'))\n"
        ));
    }

    #[test]
    fn test_body_is_preserved() {
        let body = "set -e\n\n  samtools sort \\\n    -o out.bam in.bam\r\necho done\n";
        let rendered = render_body(body);
        assert_eq!(
            rendered,
            "    \"\"\"\n    set -e\n\n      samtools sort \\\n        -o out.bam in.bam\r\n    echo done\n    \"\"\"\n"
        );
    }

    #[test]
    fn test_body_with_triple_quotes_keeps_interpolation() {
        let rendered = render_body("python -c \"\"\"print(1)\"\"\" ${bam}");
        assert_eq!(
            rendered,
            "    \"\"\"\n    python -c \\\"\\\"\\\"print(1)\\\"\\\"\\\" ${bam}\n    \"\"\"\n"
        );
    }

    #[test]
    fn test_body_with_both_quote_styles_stays_one_string() {
        let rendered = render_body("python -c \"\"\"print(1)\"\"\"\necho '''x'''");
        assert!(rendered.starts_with("    \"\"\"\n"));
        assert!(rendered.ends_with("    \"\"\"\n"));
        assert_eq!(rendered.matches("\"\"\"").count(), 2);
        assert!(rendered.contains("\n    echo '''x'''\n"));
    }

    #[test]
    fn test_quote_runs() {
        assert_eq!(escape_quote_runs(r#"say "hi""#), r#"say "hi""#);
        assert_eq!(escape_quote_runs(r#"x = """#), r#"x = """#);
        assert_eq!(escape_quote_runs(r#""""""#), r#"\"\"\"\""#);
        assert_eq!(escape_quote_runs(r#"\""""#), r#"\"\"\""#);
    }

    #[test]
    fn test_minimal_header() {
        let mut model = WorkflowModel::new();
        let script = render_all(&mut model);
        assert_eq!(
            script,
            "#!/usr/bin/env nextflow\n// Nextflow Workflow\n\nnextflow.enable.dsl = 2\n\nworkflow {\n}\n"
        );
    }

    #[test]
    #[should_panic(expected = "not in the model")]
    fn test_unresolved_order_panics() {
        let model = WorkflowModel::new();
        render(&model, &["ghost".to_string()]);
    }
}
