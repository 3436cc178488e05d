//! Transition table
//!
//! Declares which phase-to-phase jumps are legal without walking the phases
//! in between. Absence means the jump is not direct.

use super::StandardPhase;
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct TransitionTable {
    direct: HashSet<(String, String)>,
}

impl TransitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The transitions between the standard phases
    ///
    /// ```text
    /// not in lifecycle → initialise → start ⇄ stop
    /// {not in lifecycle, initialise, stop} → dispose
    /// ```
    pub fn standard() -> Self {
        use StandardPhase::*;

        let mut table = Self::new();
        for (from, to) in [
            (NotInLifecycle, Initialise),
            (Initialise, Start),
            (Start, Stop),
            (Stop, Start),
            (NotInLifecycle, Dispose),
            (Initialise, Dispose),
            (Stop, Dispose),
        ] {
            table.add_direct_transition(from.name(), to.name());
        }
        table
    }

    pub fn add_direct_transition(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.direct.insert((from.into(), to.into()));
    }

    pub fn is_direct_transition(&self, from: &str, to: &str) -> bool {
        self.direct.contains(&(from.to_string(), to.to_string()))
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.direct.iter().map(|(f, t)| (f.as_str(), t.as_str()))
    }

    pub fn len(&self) -> usize {
        self.direct.len()
    }

    pub fn is_empty(&self) -> bool {
        self.direct.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table() {
        let table = TransitionTable::standard();
        assert_eq!(table.len(), 7);
        assert!(table.is_direct_transition("start", "stop"));
        assert!(table.is_direct_transition("stop", "start"));
        assert!(table.is_direct_transition("stop", "dispose"));
        assert!(!table.is_direct_transition("start", "dispose"));
        assert!(!table.is_direct_transition("not in lifecycle", "start"));
    }

    #[test]
    fn test_direction_matters() {
        let mut table = TransitionTable::new();
        table.add_direct_transition("a", "b");
        assert!(table.is_direct_transition("a", "b"));
        assert!(!table.is_direct_transition("b", "a"));
    }
}
