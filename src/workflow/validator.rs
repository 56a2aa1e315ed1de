//! Workflow Validation
//!
//! Model-wide structural checks run when a workflow is generated:
//! - Reference integrity (parameters, upstream outputs, profiles)
//! - Dependency graph construction from output -> input bindings
//! - Cycle detection (three-colour depth-first search)
//! - Deterministic topological ordering
//!
//! Every problem in the model is collected before returning, so a single
//! generation attempt reports all of them at once.

use std::collections::BTreeSet;
use std::fmt;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::model::InputSource;
use super::session::WorkflowModel;
use super::store::ProcessStore;

/// The entity a dangling reference points at.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reference {
    /// A parameter that is not registered
    Parameter { name: String },
    /// A process that does not exist
    Process { name: String },
    /// An output the (existing) upstream process does not declare
    ProcessOutput { process: String, output: String },
    /// An environment profile that is not configured
    Profile { name: String },
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parameter { name } => write!(f, "unknown parameter '{}'", name),
            Self::Process { name } => write!(f, "unknown process '{}'", name),
            Self::ProcessOutput { process, output } => {
                write!(f, "unknown output '{}' of process '{}'", output, process)
            }
            Self::Profile { name } => write!(f, "unknown profile '{}'", name),
        }
    }
}

/// A structural problem found while validating the model.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationFinding {
    DanglingReference {
        process: String,
        /// Input holding the reference; `None` for directive references
        #[serde(default, skip_serializing_if = "Option::is_none")]
        input: Option<String>,
        reference: Reference,
    },
    CyclicDependency {
        processes: Vec<String>,
    },
}

impl ValidationFinding {
    pub fn code(&self) -> &'static str {
        match self {
            Self::DanglingReference { .. } => "DANGLING_REFERENCE",
            Self::CyclicDependency { .. } => "CYCLIC_DEPENDENCY",
        }
    }
}

impl fmt::Display for ValidationFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DanglingReference {
                process,
                input: Some(input),
                reference,
            } => write!(
                f,
                "Process '{}': input '{}' references {}",
                process, input, reference
            ),
            Self::DanglingReference {
                process,
                input: None,
                reference,
            } => write!(f, "Process '{}' references {}", process, reference),
            Self::CyclicDependency { processes } => write!(
                f,
                "Cyclic dependency between processes: {} -> {}",
                processes.join(" -> "),
                processes.first().map(String::as_str).unwrap_or_default()
            ),
        }
    }
}

/// Either a valid execution order or every finding in the model.
pub type Resolution = Result<Vec<String>, Vec<ValidationFinding>>;

/// Validates a model snapshot and computes the process execution order.
///
/// Performs the following checks:
/// 1. Every parameter reference names a registered parameter
/// 2. Every upstream reference names an existing process and one of its outputs
/// 3. Every `profile` directive names a configured profile
/// 4. The output -> input graph has no cycles
///
/// With no findings, returns process names in dependency order, breaking
/// ties by insertion order.
pub fn resolve(model: &WorkflowModel) -> Resolution {
    info!(
        "Validating workflow with {} parameters and {} processes",
        model.parameters().len(),
        model.processes().len()
    );

    let mut findings = check_references(model);

    let graph = DependencyGraph::build(model.processes());
    findings.extend(
        graph
            .find_cycles()
            .into_iter()
            .map(|processes| ValidationFinding::CyclicDependency { processes }),
    );

    if !findings.is_empty() {
        for finding in &findings {
            debug!("{}", finding);
        }
        return Err(findings);
    }

    let order = graph.topological_order();
    debug!("Topological order: {:?}", order);
    Ok(order)
}

/// Collects a finding for every reference that does not resolve.
fn check_references(model: &WorkflowModel) -> Vec<ValidationFinding> {
    let parameters = model.parameters();
    let processes = model.processes();
    let environment = model.environment();

    let mut findings = Vec::new();

    for process in processes.iter() {
        for input in &process.inputs {
            let missing = match &input.source {
                InputSource::Parameter(name) if !parameters.contains(name) => {
                    Some(Reference::Parameter { name: name.clone() })
                }
                InputSource::ProcessOutput {
                    process: upstream,
                    output,
                } => match processes.find(upstream) {
                    None => Some(Reference::Process {
                        name: upstream.clone(),
                    }),
                    Some(producer) if producer.output(output).is_none() => {
                        Some(Reference::ProcessOutput {
                            process: upstream.clone(),
                            output: output.clone(),
                        })
                    }
                    Some(_) => None,
                },
                _ => None,
            };

            if let Some(reference) = missing {
                findings.push(ValidationFinding::DanglingReference {
                    process: process.name.clone(),
                    input: Some(input.name.clone()),
                    reference,
                });
            }
        }

        if let Some(profile) = process.profile() {
            if !environment.has_profile(profile) {
                findings.push(ValidationFinding::DanglingReference {
                    process: process.name.clone(),
                    input: None,
                    reference: Reference::Profile {
                        name: profile.to_string(),
                    },
                });
            }
        }
    }

    findings
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mark {
    White,
    Gray,
    Black,
}

/// Directed graph of processes, one edge per producer -> consumer pair.
///
/// Node indices follow store insertion order and successor lists follow the
/// insertion order of consumers, which keeps every traversal deterministic.
#[derive(Debug)]
struct DependencyGraph {
    nodes: Vec<String>,
    successors: Vec<Vec<usize>>,
}

impl DependencyGraph {
    fn build(store: &ProcessStore) -> Self {
        let nodes: Vec<String> = store.iter().map(|p| p.name.clone()).collect();
        let mut successors: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];

        for (consumer, process) in store.iter().enumerate() {
            for input in &process.inputs {
                let InputSource::ProcessOutput { process: upstream, output } = &input.source
                else {
                    continue;
                };

                let Some(producer) = nodes.iter().position(|n| n == upstream) else {
                    continue;
                };

                let declared = store
                    .find(upstream)
                    .map(|p| p.output(output).is_some())
                    .unwrap_or(false);

                if declared && !successors[producer].contains(&consumer) {
                    successors[producer].push(consumer);
                }
            }
        }

        Self { nodes, successors }
    }

    /// Returns the members of every distinct cycle, in traversal order.
    ///
    /// Iterative depth-first search; each stack frame holds a node and the
    /// index of its next successor to explore.
    fn find_cycles(&self) -> Vec<Vec<String>> {
        let mut marks = vec![Mark::White; self.nodes.len()];
        let mut cycles: Vec<Vec<usize>> = Vec::new();
        let mut stack: Vec<(usize, usize)> = Vec::new();

        for root in 0..self.nodes.len() {
            if marks[root] != Mark::White {
                continue;
            }
            marks[root] = Mark::Gray;
            stack.push((root, 0));

            while let Some(frame) = stack.last_mut() {
                let (node, cursor) = *frame;
                let Some(&next) = self.successors[node].get(cursor) else {
                    marks[node] = Mark::Black;
                    stack.pop();
                    continue;
                };
                frame.1 += 1;

                match marks[next] {
                    Mark::White => {
                        marks[next] = Mark::Gray;
                        stack.push((next, 0));
                    }
                    Mark::Gray => {
                        // Back edge: the cycle is the stack suffix starting at `next`
                        if let Some(from) = stack.iter().position(|&(n, _)| n == next) {
                            let members: Vec<usize> = stack[from..].iter().map(|&(n, _)| n).collect();
                            record_cycle(&mut cycles, members);
                        }
                    }
                    Mark::Black => {}
                }
            }
        }

        cycles
            .into_iter()
            .map(|members| members.into_iter().map(|i| self.nodes[i].clone()).collect())
            .collect()
    }

    /// Kahn's algorithm, always taking the earliest-inserted ready process.
    ///
    /// Only meaningful on an acyclic graph; nodes on a cycle are left out.
    fn topological_order(&self) -> Vec<String> {
        let mut in_degree = vec![0usize; self.nodes.len()];
        for successors in &self.successors {
            for &next in successors {
                in_degree[next] += 1;
            }
        }

        let mut ready: BTreeSet<usize> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree == 0)
            .map(|(index, _)| index)
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(current) = ready.pop_first() {
            order.push(self.nodes[current].clone());

            for &next in &self.successors[current] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.insert(next);
                }
            }
        }

        order
    }
}

/// Keeps `members` unless a cycle over the same set of processes is known.
fn record_cycle(cycles: &mut Vec<Vec<usize>>, members: Vec<usize>) {
    let mut key = members.clone();
    key.sort_unstable();

    let seen = cycles.iter().any(|c| {
        let mut other = c.clone();
        other.sort_unstable();
        other == key
    });
    if !seen {
        cycles.push(members);
    }
}
