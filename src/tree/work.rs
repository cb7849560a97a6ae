use crate::tree::handle::{ItemKey, StateError, UnitKey, WorkId};
use crate::tree::item::Item;
use crate::tree::sanitize_directory_name;
use crate::tree::unit::Unit;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// One crawl target and its full tree
///
/// A `Work` owns its units, which own their items. Children refer back to
/// their parents through [`WorkId`]/[`UnitKey`] handles, so every lookup in
/// the upward direction goes through the methods on this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Work {
    #[serde(skip, default = "WorkId::next")]
    id: WorkId,

    pub url: String,

    pub title: Option<String>,

    pub units: Vec<Unit>,

    #[serde(skip)]
    directory_name: OnceLock<String>,
}

impl Work {
    /// Creates an untitled work with no units
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            id: WorkId::next(),
            url: url.into(),
            title: None,
            units: Vec::new(),
            directory_name: OnceLock::new(),
        }
    }

    pub fn id(&self) -> WorkId {
        self.id
    }

    /// Replaces the unit list with one skeleton unit per URL, numbered from 1
    pub fn set_unit_urls<I, S>(&mut self, urls: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id = self.id;
        self.units = urls
            .into_iter()
            .enumerate()
            .map(|(idx, url)| Unit::new(id, idx as u32 + 1, url))
            .collect();
    }

    pub fn unit(&self, num: u32) -> Result<&Unit, StateError> {
        self.units
            .iter()
            .find(|u| u.num == num)
            .ok_or(StateError::UnitNotFound(num))
    }

    pub fn unit_mut(&mut self, num: u32) -> Result<&mut Unit, StateError> {
        self.units
            .iter_mut()
            .find(|u| u.num == num)
            .ok_or(StateError::UnitNotFound(num))
    }

    /// Resolves a unit handle minted by this work
    pub fn resolve_unit(&self, key: UnitKey) -> Result<&Unit, StateError> {
        self.check_owner(key.work)?;
        self.unit(key.unit)
    }

    pub fn resolve_unit_mut(&mut self, key: UnitKey) -> Result<&mut Unit, StateError> {
        self.check_owner(key.work)?;
        self.unit_mut(key.unit)
    }

    /// Resolves an item handle minted by this work
    pub fn resolve_item(&self, key: ItemKey) -> Result<&Item, StateError> {
        self.resolve_unit(key.unit_key())?.item(key.item)
    }

    pub fn resolve_item_mut(&mut self, key: ItemKey) -> Result<&mut Item, StateError> {
        self.resolve_unit_mut(key.unit_key())?.item_mut(key.item)
    }

    /// Follows an item's back-reference to its unit
    pub fn parent_of(&self, item: &Item) -> Result<&Unit, StateError> {
        self.resolve_unit(item.parent())
    }

    /// Sanitized title used as this work's output directory
    ///
    /// Computed on first use and kept for the lifetime of this instance.
    pub fn directory_name(&self) -> Result<&str, StateError> {
        if let Some(name) = self.directory_name.get() {
            return Ok(name);
        }

        let title = self
            .title
            .as_deref()
            .ok_or_else(|| StateError::MissingTitle(format!("work {}", self.url)))?;
        let name = sanitize_directory_name(title);
        tracing::debug!("Directory name of '{}' is '{}'", title, name);

        Ok(self.directory_name.get_or_init(|| name))
    }

    /// Re-establishes every back-reference so that it points into this work
    pub fn relink(&mut self) {
        let id = self.id;
        for unit in &mut self.units {
            unit.relink(id);
        }
    }

    /// Number of units that need no further work
    pub fn complete_units(&self) -> usize {
        self.units.iter().filter(|u| u.is_complete()).count()
    }

    pub fn item_count(&self) -> usize {
        self.units.iter().map(|u| u.items.len()).sum()
    }

    fn check_owner(&self, work: WorkId) -> Result<(), StateError> {
        if work == self.id {
            Ok(())
        } else {
            Err(StateError::StaleHandle {
                expected: self.id,
                found: work,
            })
        }
    }
}
