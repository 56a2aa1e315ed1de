//! Process Definition Store
//!
//! Holds the workflow's processes in insertion order. Only local checks
//! (names, script body, directive values) run here; whether inputs point at
//! anything real is left to the validator so processes can be entered in any
//! order.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Namespace, Result};

use super::model::{ProcessDefinition, ProcessId, ProcessPatch};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct StoredProcess {
    id: ProcessId,
    definition: ProcessDefinition,
}

/// Insertion-ordered collection of uniquely named processes.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ProcessStore {
    processes: Vec<StoredProcess>,
    next_id: u64,
}

impl ProcessStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a process after checking it locally.
    pub fn add(&mut self, definition: ProcessDefinition) -> Result<ProcessId> {
        definition.check_local()?;
        if self.contains(&definition.name) {
            return Err(ModelError::duplicate(Namespace::Process, &definition.name));
        }

        let id = ProcessId(self.next_id);
        self.next_id += 1;

        debug!(
            "Stored process '{}' as {} ({} inputs, {} outputs)",
            definition.name,
            id,
            definition.inputs.len(),
            definition.outputs.len()
        );

        self.processes.push(StoredProcess { id, definition });
        Ok(id)
    }

    /// Applies a patch, keeping the process at its original position.
    pub fn update(&mut self, id: ProcessId, patch: &ProcessPatch) -> Result<()> {
        let index = self.index_of(id)?;
        let patched = patch.apply_to(&self.processes[index].definition);
        patched.check_local()?;

        let clash = self
            .processes
            .iter()
            .any(|p| p.id != id && p.definition.name == patched.name);
        if clash {
            return Err(ModelError::duplicate(Namespace::Process, &patched.name));
        }

        if patched.name != self.processes[index].definition.name {
            debug!(
                "Renamed process '{}' to '{}'",
                self.processes[index].definition.name, patched.name
            );
        }

        self.processes[index].definition = patched;
        Ok(())
    }

    /// Removes a process and returns its definition.
    pub fn remove(&mut self, id: ProcessId) -> Result<ProcessDefinition> {
        let index = self.index_of(id)?;
        Ok(self.processes.remove(index).definition)
    }

    /// Looks up a process by name.
    pub fn get(&self, name: &str) -> Result<&ProcessDefinition> {
        self.find(name)
            .ok_or_else(|| ModelError::not_found(Namespace::Process, name))
    }

    /// Looks up a process by handle.
    pub fn get_by_id(&self, id: ProcessId) -> Result<&ProcessDefinition> {
        let index = self.index_of(id)?;
        Ok(&self.processes[index].definition)
    }

    /// Returns the handle of the process called `name`.
    pub fn id_of(&self, name: &str) -> Result<ProcessId> {
        self.processes
            .iter()
            .find(|p| p.definition.name == name)
            .map(|p| p.id)
            .ok_or_else(|| ModelError::not_found(Namespace::Process, name))
    }

    pub fn find(&self, name: &str) -> Option<&ProcessDefinition> {
        self.iter().find(|p| p.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Iterates processes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ProcessDefinition> {
        self.processes.iter().map(|p| &p.definition)
    }

    /// Names of processes that read from process `name`, in insertion order.
    pub fn dependents_of_process(&self, name: &str) -> Vec<String> {
        self.iter()
            .filter(|p| p.name != name && p.references_process(name))
            .map(|p| p.name.clone())
            .collect()
    }

    /// Names of processes that read parameter `name`, in insertion order.
    pub fn dependents_of_parameter(&self, name: &str) -> Vec<String> {
        self.iter()
            .filter(|p| p.references_parameter(name))
            .map(|p| p.name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    fn index_of(&self, id: ProcessId) -> Result<usize> {
        self.processes
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| ModelError::not_found(Namespace::Process, id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::model::InputSource;

    fn align() -> ProcessDefinition {
        ProcessDefinition::new("align", "run aligner").with_output("bam")
    }

    fn sort() -> ProcessDefinition {
        ProcessDefinition::new("sort", "sort %bam%")
            .with_input("bam", InputSource::process_output("align", "bam"))
            .with_output("sorted_bam")
    }

    #[test]
    fn test_add_process() {
        let mut store = ProcessStore::new();
        let id = store.add(align()).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get_by_id(id).unwrap().name, "align");
        assert_eq!(store.id_of("align").unwrap(), id);
    }

    #[test]
    fn test_add_duplicate() {
        let mut store = ProcessStore::new();
        store.add(align()).unwrap();
        assert_eq!(
            store.add(align()).unwrap_err(),
            ModelError::duplicate(Namespace::Process, "align")
        );
    }

    #[test]
    fn test_add_empty_script() {
        let mut store = ProcessStore::new();
        let err = store.add(ProcessDefinition::new("idle", "")).unwrap_err();
        assert_eq!(err, ModelError::EmptyScript("idle".to_string()));
        assert!(store.is_empty());
    }

    #[test]
    fn test_add_with_dangling_reference_is_accepted() {
        let mut store = ProcessStore::new();
        assert!(store.add(sort()).is_ok());
    }

    #[test]
    fn test_update_keeps_position() {
        let mut store = ProcessStore::new();
        let a = store.add(align()).unwrap();
        store.add(sort()).unwrap();

        store.update(a, &ProcessPatch::rename("map_reads")).unwrap();

        let names: Vec<_> = store.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["map_reads", "sort"]);
    }

    #[test]
    fn test_update_rename_does_not_touch_dependents() {
        let mut store = ProcessStore::new();
        let a = store.add(align()).unwrap();
        store.add(sort()).unwrap();

        store.update(a, &ProcessPatch::rename("map_reads")).unwrap();
        assert!(store.get("sort").unwrap().references_process("align"));
    }

    #[test]
    fn test_update_rejects_clash_and_leaves_process() {
        let mut store = ProcessStore::new();
        let a = store.add(align()).unwrap();
        store.add(sort()).unwrap();

        let err = store.update(a, &ProcessPatch::rename("sort")).unwrap_err();
        assert_eq!(err, ModelError::duplicate(Namespace::Process, "sort"));
        assert_eq!(store.get_by_id(a).unwrap().name, "align");
    }

    #[test]
    fn test_update_rejects_empty_script() {
        let mut store = ProcessStore::new();
        let a = store.add(align()).unwrap();
        assert!(matches!(
            store.update(a, &ProcessPatch::script("  ")),
            Err(ModelError::EmptyScript(_))
        ));
        assert_eq!(store.get_by_id(a).unwrap().script, "run aligner");
    }

    #[test]
    fn test_update_missing() {
        let mut store = ProcessStore::new();
        assert!(matches!(
            store.update(ProcessId(3), &ProcessPatch::default()),
            Err(ModelError::NotFound { .. })
        ));
    }

    #[test]
    fn test_dependents() {
        let mut store = ProcessStore::new();
        store.add(align()).unwrap();
        store.add(sort()).unwrap();
        store
            .add(
                ProcessDefinition::new("stats", "samtools stats")
                    .with_input("bam", InputSource::process_output("align", "bam"))
                    .with_input("depth", InputSource::parameter("depth")),
            )
            .unwrap();

        assert_eq!(store.dependents_of_process("align"), vec!["sort", "stats"]);
        assert_eq!(store.dependents_of_parameter("depth"), vec!["stats"]);
        assert!(store.dependents_of_process("sort").is_empty());
    }

    #[test]
    fn test_remove() {
        let mut store = ProcessStore::new();
        let a = store.add(align()).unwrap();
        let removed = store.remove(a).unwrap();

        assert_eq!(removed.name, "align");
        assert!(store.get("align").is_err());
    }
}
