//! Turns raw collection entries into usable items.

use super::models::Item;
use crate::catalog_api::RawEntry;
use std::collections::HashMap;
use tracing::debug;

/// Artist name used when the provider lists none.
const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Items that survived filtering, in collection order, with an id index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilteredItems {
    items: Vec<Item>,
    index: HashMap<String, usize>,
}

impl FilteredItems {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&Item> {
        self.index.get(id).map(|&position| &self.items[position])
    }

    /// Identifiers in collection order.
    pub fn ids(&self) -> Vec<String> {
        self.items.iter().map(|item| item.id.clone()).collect()
    }

    fn insert(&mut self, item: Item) {
        match self.index.get(&item.id) {
            Some(&position) => self.items[position] = item,
            None => {
                self.index.insert(item.id.clone(), self.items.len());
                self.items.push(item);
            }
        }
    }
}

impl FromIterator<Item> for FilteredItems {
    fn from_iter<I: IntoIterator<Item = Item>>(iter: I) -> Self {
        let mut filtered = FilteredItems::default();
        for item in iter {
            filtered.insert(item);
        }
        filtered
    }
}

/// Drop entries with no track, no identifier, or local-only storage.
///
/// Order is preserved. A repeated identifier keeps the position of its first
/// occurrence and the data of its last one.
pub fn filter_entries(entries: &[RawEntry]) -> FilteredItems {
    let filtered: FilteredItems = entries.iter().filter_map(usable_item).collect();

    debug!(
        "Filtered {} entries down to {} items",
        entries.len(),
        filtered.len()
    );
    filtered
}

fn usable_item(entry: &RawEntry) -> Option<Item> {
    if entry.is_local {
        return None;
    }
    let track = entry.track.as_ref()?;
    if track.is_local {
        return None;
    }
    let id = track.id.as_deref().map(str::trim).filter(|id| !id.is_empty())?;

    let artist = track
        .artists
        .iter()
        .map(|a| a.name.trim())
        .find(|name| !name.is_empty())
        .unwrap_or(UNKNOWN_ARTIST);

    Some(Item {
        id: id.to_string(),
        name: track.name.clone(),
        artist: artist.to_string(),
        popularity: track.popularity.unwrap_or(0).min(100) as u8,
        year: track
            .album
            .as_ref()
            .and_then(|album| album.release_date.as_deref())
            .and_then(release_year),
    })
}

/// First four characters of a release date, when they are all digits.
pub fn release_year(release_date: &str) -> Option<String> {
    let year: String = release_date.trim().chars().take(4).collect();
    if year.len() == 4 && year.chars().all(|c| c.is_ascii_digit()) {
        Some(year)
    } else {
        None
    }
}
