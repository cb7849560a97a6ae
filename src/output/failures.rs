use std::fmt;
use std::sync::{Mutex, PoisonError};

/// A unit whose document could not be fetched or parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedUnit {
    pub work_title: String,
    pub unit: u32,
    pub url: String,
    pub error: String,
}

/// An item whose resource could not be resolved or downloaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedItem {
    pub work_title: String,
    pub unit: u32,
    pub item: u32,
    pub url: String,
    pub error: String,
}

impl fmt::Display for FailedUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} / unit {}: {} ({})",
            self.work_title, self.unit, self.error, self.url
        )
    }
}

impl fmt::Display for FailedItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} / unit {} / item {}: {} ({})",
            self.work_title, self.unit, self.item, self.error, self.url
        )
    }
}

/// Failures collected during one crawl session
///
/// Workers only ever append. The coordinator drains both lists once every
/// worker of a work has been joined.
#[derive(Debug, Default)]
pub struct FailureLog {
    units: Mutex<Vec<FailedUnit>>,
    items: Mutex<Vec<FailedItem>>,
}

/// Failures drained from a [`FailureLog`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Failures {
    pub units: Vec<FailedUnit>,
    pub items: Vec<FailedItem>,
}

impl Failures {
    pub fn is_empty(&self) -> bool {
        self.units.is_empty() && self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.units.len() + self.items.len()
    }
}

impl FailureLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_unit(&self, failure: FailedUnit) {
        self.units
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(failure);
    }

    pub fn record_item(&self, failure: FailedItem) {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(failure);
    }

    /// Takes every failure recorded so far, leaving the log empty
    pub fn drain(&self) -> Failures {
        let mut units =
            std::mem::take(&mut *self.units.lock().unwrap_or_else(PoisonError::into_inner));
        let mut items =
            std::mem::take(&mut *self.items.lock().unwrap_or_else(PoisonError::into_inner));
        units.sort_by_key(|f| f.unit);
        items.sort_by_key(|f| (f.unit, f.item));
        Failures { units, items }
    }
}
