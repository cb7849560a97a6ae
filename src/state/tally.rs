use crate::state::{ItemState, UnitState};
use std::collections::BTreeMap;

/// Count of terminal states reached by units and items
///
/// Every worker keeps its own tally; the coordinator merges them once the
/// workers have been joined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateTally {
    pub units: BTreeMap<UnitState, u64>,
    pub items: BTreeMap<ItemState, u64>,
}

impl StateTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_unit(&mut self, state: UnitState) {
        *self.units.entry(state).or_default() += 1;
    }

    pub fn record_item(&mut self, state: ItemState) {
        *self.items.entry(state).or_default() += 1;
    }

    pub fn merge(&mut self, other: StateTally) {
        for (state, count) in other.units {
            *self.units.entry(state).or_default() += count;
        }
        for (state, count) in other.items {
            *self.items.entry(state).or_default() += count;
        }
    }

    pub fn units_in(&self, state: UnitState) -> u64 {
        self.units.get(&state).copied().unwrap_or(0)
    }

    pub fn items_in(&self, state: ItemState) -> u64 {
        self.items.get(&state).copied().unwrap_or(0)
    }

    /// True if no unit or item reached an error state
    pub fn is_clean(&self) -> bool {
        let units_ok = self
            .units
            .iter()
            .all(|(state, count)| *count == 0 || !state.is_error());
        let items_ok = self
            .items
            .iter()
            .all(|(state, count)| *count == 0 || !state.is_terminal() || state.is_success());
        units_ok && items_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_merge() {
        let mut a = StateTally::new();
        a.record_unit(UnitState::Ready);
        a.record_item(ItemState::Downloaded);
        a.record_item(ItemState::Downloaded);

        let mut b = StateTally::new();
        b.record_unit(UnitState::Ready);
        b.record_unit(UnitState::FetchFailed);

        a.merge(b);
        assert_eq!(a.units_in(UnitState::Ready), 2);
        assert_eq!(a.units_in(UnitState::FetchFailed), 1);
        assert_eq!(a.items_in(ItemState::Downloaded), 2);
        assert_eq!(a.items_in(ItemState::Skipped), 0);
        assert!(!a.is_clean());
    }

    #[test]
    fn test_empty_tally_is_clean() {
        assert!(StateTally::new().is_clean());
    }

    #[test]
    fn test_success_states_are_clean() {
        let mut tally = StateTally::new();
        tally.record_unit(UnitState::Skipped);
        tally.record_unit(UnitState::Ready);
        tally.record_item(ItemState::Skipped);
        tally.record_item(ItemState::Downloaded);
        assert!(tally.is_clean());

        tally.record_item(ItemState::DownloadFailed);
        assert!(!tally.is_clean());
    }

    #[test]
    fn test_failed_unit_is_not_clean() {
        let mut tally = StateTally::new();
        tally.record_unit(UnitState::FetchFailed);
        assert!(!tally.is_clean());
    }
}
