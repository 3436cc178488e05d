//! Phase registry
//!
//! Maps phase names to [`Phase`] definitions and remembers registration
//! order, which is the order a multi-step walk applies phases in.

use super::{LifecycleError, Phase, Result};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct PhaseRegistry {
    phases: Vec<Arc<Phase>>,
    positions: HashMap<String, usize>,
}

impl PhaseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a phase after every phase registered so far
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::DuplicatePhase`] if the name is taken.
    pub fn register(&mut self, phase: Phase) -> Result<()> {
        if self.positions.contains_key(phase.name()) {
            return Err(LifecycleError::DuplicatePhase(phase.name().to_string()));
        }
        self.positions
            .insert(phase.name().to_string(), self.phases.len());
        self.phases.push(Arc::new(phase));
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`LifecycleError::UnknownPhase`] if no phase has this name.
    pub fn get(&self, name: &str) -> Result<Arc<Phase>> {
        self.positions
            .get(name)
            .map(|&index| Arc::clone(&self.phases[index]))
            .ok_or_else(|| LifecycleError::UnknownPhase(name.to_string()))
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut Phase> {
        let index = *self.positions.get(name)?;
        Arc::get_mut(&mut self.phases[index])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    /// Ordinal of the phase in registration order
    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    /// Phase names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.phases.iter().map(|p| p.name())
    }

    /// Phases strictly after `from`, up to and including `to`
    pub fn between(&self, from: &str, to: &str) -> Result<Vec<Arc<Phase>>> {
        let start = self
            .position(from)
            .ok_or_else(|| LifecycleError::UnknownPhase(from.to_string()))?;
        let end = self
            .position(to)
            .ok_or_else(|| LifecycleError::UnknownPhase(to.to_string()))?;
        if end <= start {
            return Ok(Vec::new());
        }
        Ok(self.phases[start + 1..=end].to_vec())
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::StandardPhase;
    use strum::IntoEnumIterator;

    fn standard() -> PhaseRegistry {
        let mut registry = PhaseRegistry::new();
        for phase in StandardPhase::iter() {
            registry.register(Phase::standard(phase)).unwrap();
        }
        registry
    }

    #[test]
    fn test_registration_order() {
        let registry = standard();
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec!["not in lifecycle", "initialise", "start", "stop", "dispose"]
        );
        assert_eq!(registry.position("stop"), Some(3));
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = standard();
        let err = registry
            .register(Phase::standard(StandardPhase::Start))
            .unwrap_err();
        assert!(matches!(err, LifecycleError::DuplicatePhase(name) if name == "start"));
    }

    #[test]
    fn test_unknown_phase() {
        let registry = standard();
        assert!(matches!(
            registry.get("restart"),
            Err(LifecycleError::UnknownPhase(name)) if name == "restart"
        ));
    }

    #[test]
    fn test_between() {
        let registry = standard();
        let names: Vec<_> = registry
            .between("not in lifecycle", "stop")
            .unwrap()
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(names, vec!["initialise", "start", "stop"]);
        assert!(registry.between("stop", "start").unwrap().is_empty());
    }
}
