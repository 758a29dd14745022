//! Display projections
//!
//! Filtering, sorting and progress for whatever renders the list. These
//! never touch the collection itself.

use std::cmp::Ordering;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::domain::{Collection, Item};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Filter {
    #[default]
    All,
    /// Done ("learned")
    Done,
    NotDone,
    Pinned,
}

impl Filter {
    pub fn matches(&self, item: &Item) -> bool {
        match self {
            Filter::All => true,
            Filter::Done => item.done,
            Filter::NotDone => !item.done,
            Filter::Pinned => item.pinned,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortOrder {
    /// Done items first
    Done,
    Category,
    Title,
    CompletedOldest,
    CompletedNewest,
    Shuffle,
}

fn completed_millis(item: &Item) -> i64 {
    item.completed_at.map(|t| t.as_millis()).unwrap_or(0)
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}

pub fn sort(items: &mut [Item], order: SortOrder) {
    match order {
        SortOrder::Done => items.sort_by(|a, b| b.done.cmp(&a.done)),
        SortOrder::Category => items.sort_by(|a, b| compare_text(&a.category, &b.category)),
        SortOrder::Title => items.sort_by(|a, b| compare_text(&a.title, &b.title)),
        SortOrder::CompletedOldest => items.sort_by_key(completed_millis),
        SortOrder::CompletedNewest => items.sort_by_key(|item| std::cmp::Reverse(completed_millis(item))),
        SortOrder::Shuffle => items.shuffle(&mut rand::thread_rng()),
    }
}

/// Filter, optionally sort, then float pinned items to the top (stable)
pub fn display_list(items: &Collection, filter: Filter, order: Option<SortOrder>) -> Vec<Item> {
    let mut visible: Vec<Item> = items.iter().filter(|item| filter.matches(item)).cloned().collect();
    if let Some(order) = order {
        sort(&mut visible, order);
    }
    visible.sort_by(|a, b| b.pinned.cmp(&a.pinned));
    visible
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProgressBand {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub done: usize,
    pub total: usize,
    pub percent: u32,
    pub band: ProgressBand,
}

pub fn progress(items: &Collection) -> Progress {
    let total = items.len();
    let done = items.iter().filter(|item| item.done).count();
    let percent = if total == 0 {
        0
    } else {
        ((done as f64 * 100.0) / total as f64).round() as u32
    };
    let band = match percent {
        p if p < 40 => ProgressBand::Low,
        p if p < 80 => ProgressBand::Medium,
        _ => ProgressBand::High,
    };
    Progress {
        done,
        total,
        percent,
        band,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ItemDraft, ItemId, Timestamp};

    fn item(id: &str, title: &str, category: &str, done: bool, pinned: bool, completed: Option<i64>) -> Item {
        let mut item = ItemDraft::new(title, category)
            .unwrap()
            .with_done(done)
            .with_pinned(pinned)
            .build(ItemId::from(id), Timestamp(1));
        item.completed_at = completed.map(Timestamp);
        item
    }

    fn sample() -> Collection {
        Collection::from_items(vec![
            item("a", "banana", "food", true, false, Some(300)),
            item("b", "Apple", "fruit", false, true, None),
            item("c", "cherry", "Art", true, false, Some(100)),
            item("d", "date", "", false, false, None),
        ])
    }

    fn titles(items: &[Item]) -> Vec<&str> {
        items.iter().map(|i| i.title.as_str()).collect()
    }

    #[test]
    fn test_filters() {
        let items = sample();
        assert_eq!(display_list(&items, Filter::All, None).len(), 4);
        assert_eq!(titles(&display_list(&items, Filter::Done, None)), vec!["banana", "cherry"]);
        assert_eq!(titles(&display_list(&items, Filter::NotDone, None)), vec!["Apple", "date"]);
        assert_eq!(titles(&display_list(&items, Filter::Pinned, None)), vec!["Apple"]);
    }

    #[test]
    fn test_pinned_first() {
        let shown = display_list(&sample(), Filter::All, None);
        assert_eq!(titles(&shown), vec!["Apple", "banana", "cherry", "date"]);
    }

    #[test]
    fn test_sorts() {
        let mut items = sample().to_vec();

        sort(&mut items, SortOrder::Title);
        assert_eq!(titles(&items), vec!["Apple", "banana", "cherry", "date"]);

        sort(&mut items, SortOrder::Category);
        assert_eq!(titles(&items), vec!["date", "cherry", "banana", "Apple"]);

        sort(&mut items, SortOrder::CompletedOldest);
        assert_eq!(titles(&items)[2..], ["cherry", "banana"]);

        sort(&mut items, SortOrder::CompletedNewest);
        assert_eq!(titles(&items)[..2], ["banana", "cherry"]);

        sort(&mut items, SortOrder::Done);
        assert!(items[0].done && items[1].done);
        assert!(!items[2].done && !items[3].done);
    }

    #[test]
    fn test_shuffle_keeps_items() {
        let mut items = sample().to_vec();
        sort(&mut items, SortOrder::Shuffle);
        let mut ids: Vec<_> = items.iter().map(|i| i.id.to_string()).collect();
        ids.sort();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_progress() {
        let p = progress(&sample());
        assert_eq!((p.done, p.total, p.percent), (2, 4, 50));
        assert_eq!(p.band, ProgressBand::Medium);

        let empty = progress(&Collection::new());
        assert_eq!(empty.percent, 0);
        assert_eq!(empty.band, ProgressBand::Low);

        let one_of_three = Collection::from_items(vec![
            item("a", "a", "", true, false, None),
            item("b", "b", "", false, false, None),
            item("c", "c", "", false, false, None),
        ]);
        assert_eq!(progress(&one_of_three).percent, 33);
    }
}
