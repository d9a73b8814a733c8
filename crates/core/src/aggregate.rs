//! Aggregate traits and the optimistic concurrency guard.

/// Something stored and versioned as a unit.
pub trait AggregateRoot {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;

    /// Revision of the stored state; 0 means "never persisted".
    ///
    /// Stores compare this against an [`ExpectedVersion`] before writing.
    fn version(&self) -> u64;
}

/// What a writer believes the stored version to be.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Overwrite unconditionally.
    Any,
    /// Write only if the stored version is exactly this. `Exact(0)` requires
    /// that nothing is stored yet.
    Exact(u64),
}

impl ExpectedVersion {
    /// Guard for a write based on state read at `version`.
    pub fn read_at(version: u64) -> Self {
        ExpectedVersion::Exact(version)
    }

    pub fn matches(self, stored: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == stored,
        }
    }
}

/// Command/event split for aggregates.
///
/// `handle` decides without mutating; `apply` evolves state and bumps
/// `version()` by one per event. Neither performs IO; time arrives inside commands.
pub trait Aggregate: AggregateRoot {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;

    fn apply(&mut self, event: &Self::Event);
}
