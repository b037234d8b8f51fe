//! Aggregate traits for state machines driven by commands.

/// Aggregate root marker + minimal interface.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;

    /// Monotonically increasing version of the aggregate's state.
    ///
    /// Incremented once per applied event.
    fn version(&self) -> u64;
}

/// Aggregate execution semantics (pure, deterministic).
///
/// - **Decision logic**: `handle(&self, cmd)` returns events or a rejection.
/// - **State mutation**: `apply(&mut self, event)` evolves state.
///
/// Aggregates must not perform IO. A rejected command leaves state untouched
/// because `handle` cannot mutate.
pub trait Aggregate: AggregateRoot {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    /// Evolve in-memory state from a single event.
    fn apply(&mut self, event: &Self::Event);

    /// Decide which events to emit given the current state and a command.
    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;

    /// Decide, then apply every resulting event in order.
    fn execute(&mut self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        let events = self.handle(command)?;
        for event in &events {
            self.apply(event);
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Counter {
        value: i64,
        version: u64,
    }

    impl AggregateRoot for Counter {
        type Id = u8;

        fn id(&self) -> &u8 {
            &0
        }

        fn version(&self) -> u64 {
            self.version
        }
    }

    impl Aggregate for Counter {
        type Command = i64;
        type Event = i64;
        type Error = &'static str;

        fn apply(&mut self, event: &i64) {
            self.value += event;
            self.version += 1;
        }

        fn handle(&self, command: &i64) -> Result<Vec<i64>, &'static str> {
            if self.value + command < 0 {
                return Err("negative");
            }
            Ok(vec![*command])
        }
    }

    #[test]
    fn execute_applies_accepted_events() {
        let mut counter = Counter::default();
        assert_eq!(counter.execute(&5).unwrap(), vec![5]);
        assert_eq!(counter.value, 5);
        assert_eq!(counter.version(), 1);
    }

    #[test]
    fn execute_leaves_state_on_rejection() {
        let mut counter = Counter::default();
        assert_eq!(counter.execute(&-1), Err("negative"));
        assert_eq!(counter.value, 0);
        assert_eq!(counter.version(), 0);
    }
}
