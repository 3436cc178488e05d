//! Capability descriptors
//!
//! A target declares once, at registration time, which of the standard
//! lifecycle behaviors it supports. Phases consult the descriptor instead of
//! probing the object on every call.

use serde::{Deserialize, Serialize};
use std::fmt;
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};

/// One of the standard lifecycle behaviors a target can support
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Initialise,
    Start,
    Stop,
    Dispose,
}

impl Capability {
    const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// A closed set of [`Capability`] values
///
/// Built with const functions so it can be computed at compile time,
/// which is what `#[derive(Capable)]` relies on.
///
/// # Example
///
/// ```
/// use phaseflow::lifecycle::{Capabilities, Capability};
///
/// const CONNECTOR: Capabilities = Capabilities::NONE
///     .with(Capability::Start)
///     .with(Capability::Stop);
///
/// assert!(CONNECTOR.contains(Capability::Start));
/// assert!(!CONNECTOR.contains(Capability::Dispose));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Capabilities(u8);

impl Capabilities {
    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self::NONE
        .with(Capability::Initialise)
        .with(Capability::Start)
        .with(Capability::Stop)
        .with(Capability::Dispose);

    /// Add a capability
    pub const fn with(self, capability: Capability) -> Self {
        Self(self.0 | capability.bit())
    }

    /// Remove a capability
    pub const fn without(self, capability: Capability) -> Self {
        Self(self.0 & !capability.bit())
    }

    pub const fn contains(self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate over the contained capabilities in lifecycle order
    pub fn iter(self) -> impl Iterator<Item = Capability> {
        Capability::iter().filter(move |c| self.contains(*c))
    }
}

impl FromIterator<Capability> for Capabilities {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        iter.into_iter().fold(Self::NONE, Self::with)
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl Serialize for Capabilities {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

/// Types whose capabilities are known statically
///
/// Usually implemented with `#[derive(Capable)]`:
///
/// ```rust,ignore
/// #[derive(Capable)]
/// #[lifecycle(initialise, dispose)]
/// struct ObjectStore { /* ... */ }
/// ```
pub trait Capable {
    const CAPABILITIES: Capabilities;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_with_and_without() {
        let caps = Capabilities::NONE
            .with(Capability::Initialise)
            .with(Capability::Dispose);
        assert!(caps.contains(Capability::Initialise));
        assert!(!caps.contains(Capability::Start));

        let caps = caps.without(Capability::Initialise);
        assert!(!caps.contains(Capability::Initialise));
        assert!(caps.contains(Capability::Dispose));
    }

    #[test]
    fn test_iter_follows_lifecycle_order() {
        let caps: Capabilities = [Capability::Dispose, Capability::Start].into_iter().collect();
        assert_eq!(
            caps.iter().collect::<Vec<_>>(),
            vec![Capability::Start, Capability::Dispose]
        );
        assert_eq!(Capabilities::ALL.iter().count(), 4);
    }

    #[test]
    fn test_capability_names_match_phase_names() {
        assert_eq!(Capability::Initialise.to_string(), "initialise");
        assert_eq!(Capability::from_str("stop").unwrap(), Capability::Stop);
        assert!(Capability::from_str("not in lifecycle").is_err());
    }
}
