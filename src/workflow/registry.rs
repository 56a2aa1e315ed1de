//! Parameter Registry
//!
//! Holds the named, typed defaults exposed to the workflow as `params.*`.
//! Insertion order is kept; it is the order parameters are emitted in.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Namespace, Result};

use super::identifier::check_identifier;
use super::model::{ParamValue, Parameter, ParameterId};

/// Insertion-ordered collection of uniquely named parameters.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ParameterRegistry {
    parameters: Vec<Parameter>,
    next_id: u64,
}

impl ParameterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new parameter.
    pub fn add(
        &mut self,
        name: &str,
        default_value: ParamValue,
        description: Option<String>,
    ) -> Result<ParameterId> {
        let name = name.trim();
        check_identifier(Namespace::Parameter, name)?;
        if self.contains(name) {
            return Err(ModelError::duplicate(Namespace::Parameter, name));
        }
        default_value.check(name)?;

        let id = ParameterId(self.next_id);
        self.next_id += 1;

        debug!(
            "Registered parameter '{}' ({}) as {}",
            name,
            default_value.type_name(),
            id
        );

        self.parameters.push(Parameter {
            id,
            name: name.to_string(),
            default_value,
            description: normalize_description(description),
        });
        Ok(id)
    }

    /// Replaces the default value and description of an existing parameter.
    pub fn update(
        &mut self,
        id: ParameterId,
        default_value: ParamValue,
        description: Option<String>,
    ) -> Result<()> {
        let parameter = self
            .parameters
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| ModelError::not_found(Namespace::Parameter, id.to_string()))?;

        default_value.check(&parameter.name)?;
        parameter.default_value = default_value;
        parameter.description = normalize_description(description);
        Ok(())
    }

    /// Removes a parameter and returns it.
    pub fn remove(&mut self, id: ParameterId) -> Result<Parameter> {
        let index = self
            .parameters
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| ModelError::not_found(Namespace::Parameter, id.to_string()))?;
        Ok(self.parameters.remove(index))
    }

    /// Looks up a parameter by name.
    pub fn get(&self, name: &str) -> Result<&Parameter> {
        self.find(name)
            .ok_or_else(|| ModelError::not_found(Namespace::Parameter, name))
    }

    /// Looks up a parameter by handle.
    pub fn get_by_id(&self, id: ParameterId) -> Result<&Parameter> {
        self.parameters
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| ModelError::not_found(Namespace::Parameter, id.to_string()))
    }

    pub fn find(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Iterates parameters in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter()
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_get() {
        let mut registry = ParameterRegistry::new();
        let id = registry
            .add("threads", ParamValue::Integer(4), Some("CPU threads".into()))
            .unwrap();

        let param = registry.get("threads").unwrap();
        assert_eq!(param.id, id);
        assert_eq!(param.default_value, ParamValue::Integer(4));
        assert_eq!(param.description.as_deref(), Some("CPU threads"));
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = ParameterRegistry::new();
        registry.add("reads", "a.fq".into(), None).unwrap();

        let err = registry.add("reads", "b.fq".into(), None).unwrap_err();
        assert_eq!(err, ModelError::duplicate(Namespace::Parameter, "reads"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_invalid_identifier_rejected() {
        let mut registry = ParameterRegistry::new();
        assert!(matches!(
            registry.add("read-length", ParamValue::Integer(150), None),
            Err(ModelError::InvalidIdentifier { .. })
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_ids_are_not_reused() {
        let mut registry = ParameterRegistry::new();
        let first = registry.add("a", ParamValue::Boolean(true), None).unwrap();
        registry.remove(first).unwrap();
        let second = registry.add("a", ParamValue::Boolean(true), None).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_update() {
        let mut registry = ParameterRegistry::new();
        let id = registry.add("depth", ParamValue::Integer(10), None).unwrap();
        registry
            .update(id, ParamValue::Float(2.5), Some("  ".into()))
            .unwrap();

        let param = registry.get_by_id(id).unwrap();
        assert_eq!(param.default_value, ParamValue::Float(2.5));
        assert!(param.description.is_none());
    }

    #[test]
    fn test_remove_missing() {
        let mut registry = ParameterRegistry::new();
        assert!(matches!(
            registry.remove(ParameterId(42)),
            Err(ModelError::NotFound { .. })
        ));
    }

    #[test]
    fn test_get_missing() {
        let registry = ParameterRegistry::new();
        assert_eq!(
            registry.get("ghost").unwrap_err(),
            ModelError::not_found(Namespace::Parameter, "ghost")
        );
    }

    #[test]
    fn test_insertion_order() {
        let mut registry = ParameterRegistry::new();
        registry.add("zeta", ParamValue::Integer(1), None).unwrap();
        registry.add("alpha", ParamValue::Integer(2), None).unwrap();

        let names: Vec<_> = registry.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }
}
