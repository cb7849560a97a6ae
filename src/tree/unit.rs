use crate::tree::handle::{StateError, UnitKey, WorkId};
use crate::tree::item::Item;
use crate::tree::sanitize_directory_name;
use serde::{Deserialize, Serialize};

/// One chapter-equivalent grouping of a work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    /// Position within the work, starting at 1. Stable across runs.
    pub num: u32,

    pub url: String,

    pub title: Option<String>,

    pub items: Vec<Item>,

    #[serde(skip)]
    pub(crate) parent: WorkId,
}

impl Unit {
    /// Creates a skeleton unit that only knows where it lives
    pub fn new(parent: WorkId, num: u32, url: impl Into<String>) -> Self {
        Self {
            num,
            url: url.into(),
            title: None,
            items: Vec::new(),
            parent,
        }
    }

    /// Id of the work that owns this unit
    pub fn parent(&self) -> WorkId {
        self.parent
    }

    pub fn key(&self) -> UnitKey {
        UnitKey {
            work: self.parent,
            unit: self.num,
        }
    }

    /// Titled, has at least one item, and every item is downloaded
    pub fn is_complete(&self) -> bool {
        self.title.is_some() && !self.items.is_empty() && self.items.iter().all(|i| i.downloaded)
    }

    /// No item is left waiting for an attempt
    pub fn is_settled(&self) -> bool {
        self.items.iter().all(Item::is_settled)
    }

    /// Has already been fetched and parsed, in this run or a previous one
    pub fn is_populated(&self) -> bool {
        self.title.is_some() && !self.items.is_empty()
    }

    pub fn item(&self, num: u32) -> Result<&Item, StateError> {
        self.items
            .iter()
            .find(|i| i.num == num)
            .ok_or(StateError::ItemNotFound {
                unit: self.num,
                item: num,
            })
    }

    pub fn item_mut(&mut self, num: u32) -> Result<&mut Item, StateError> {
        let unit = self.num;
        self.items
            .iter_mut()
            .find(|i| i.num == num)
            .ok_or(StateError::ItemNotFound { unit, item: num })
    }

    /// Sanitized title used as this unit's output directory
    pub fn directory_name(&self) -> Result<String, StateError> {
        self.title
            .as_deref()
            .map(sanitize_directory_name)
            .ok_or_else(|| StateError::MissingTitle(format!("unit {}", self.num)))
    }

    /// Points this unit at `work` and every item at this unit
    pub(crate) fn relink(&mut self, work: WorkId) {
        self.parent = work;
        let key = self.key();
        for item in &mut self.items {
            item.parent = key;
        }
    }
}
