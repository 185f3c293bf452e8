//! Inventory selector
//!
//! Picks crates of one series out of an inventory snapshot.

use regex::Regex;
use tracing::debug;

use crate::types::InventoryItem;

/// Result of selecting items for a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Enough items to fill the whole request
    Complete(Vec<InventoryItem>),
    /// Fewer items than requested; carries everything that matched
    Partial {
        items: Vec<InventoryItem>,
        requested: u32,
    },
    NoMatchingItems,
}

/// Build the pattern matching `#<series>` not followed by another digit.
///
/// `82` must match "Series #82" but never "Series #820".
pub fn series_pattern(series: &str) -> Option<Regex> {
    Regex::new(&format!(r"(?i)#{}(?:[^0-9]|$)", regex::escape(series))).ok()
}

/// Select up to `requested` items tagged `category_tag` from one series.
///
/// Order follows the snapshot, so the same inventory always yields the same
/// items.
pub fn select(
    inventory: &[InventoryItem],
    category_tag: &str,
    series: &str,
    requested: u32,
) -> Selection {
    let Some(pattern) = series_pattern(series) else {
        return Selection::NoMatchingItems;
    };

    let pool: Vec<InventoryItem> = inventory
        .iter()
        .filter(|item| item.has_tag(category_tag))
        .filter(|item| pattern.is_match(&item.name))
        .cloned()
        .collect();

    debug!(
        "{} of {} items match '{}' series {}",
        pool.len(),
        inventory.len(),
        category_tag,
        series
    );

    if pool.is_empty() {
        return Selection::NoMatchingItems;
    }

    if requested as usize > pool.len() {
        return Selection::Partial {
            items: pool,
            requested,
        };
    }

    Selection::Complete(pool.into_iter().take(requested as usize).collect())
}
