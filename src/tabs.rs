//! Single-selection state over the feed sources a user can switch between.

use crate::api::Category;
use crate::feed::FeedIdentity;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TabError {
    #[error("A tab set needs at least one tab")]
    Empty,
    #[error("Tab index {index} out of range (have {len} tabs)")]
    OutOfRange { index: usize, len: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tab {
    pub title: String,
    pub identity: FeedIdentity,
    selected: bool,
}

impl Tab {
    pub fn is_selected(&self) -> bool {
        self.selected
    }
}

/// Ordered, fixed-size set of tabs with exactly one selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabSet {
    tabs: Vec<Tab>,
}

impl TabSet {
    /// Build a tab set with the first tab selected.
    pub fn new(entries: Vec<(String, FeedIdentity)>) -> Result<Self, TabError> {
        if entries.is_empty() {
            return Err(TabError::Empty);
        }
        let tabs = entries
            .into_iter()
            .enumerate()
            .map(|(index, (title, identity))| Tab {
                title,
                identity,
                selected: index == 0,
            })
            .collect();
        Ok(Self { tabs })
    }

    /// The built-in sources: latest topics, then popular topics.
    pub fn default_tabs() -> Self {
        Self {
            tabs: vec![
                Tab {
                    title: "Latest".to_string(),
                    identity: FeedIdentity::Recent,
                    selected: true,
                },
                Tab {
                    title: "Popular".to_string(),
                    identity: FeedIdentity::Popular,
                    selected: false,
                },
            ],
        }
    }

    /// Default tabs followed by one tab per category.
    pub fn with_categories(categories: &[Category]) -> Self {
        let mut set = Self::default_tabs();
        set.tabs.extend(categories.iter().map(|c| Tab {
            title: c.name.clone(),
            identity: FeedIdentity::category(c.cid),
            selected: false,
        }));
        set
    }

    /// Handle a page-change event: select the tab at `index`, deselect the
    /// rest. An out-of-range index leaves the selection unchanged.
    pub fn select(&mut self, index: usize) -> Result<&Tab, TabError> {
        let len = self.tabs.len();
        if index >= len {
            return Err(TabError::OutOfRange { index, len });
        }
        for (i, tab) in self.tabs.iter_mut().enumerate() {
            tab.selected = i == index;
        }
        Ok(&self.tabs[index])
    }

    pub fn selected_index(&self) -> usize {
        self.tabs.iter().position(Tab::is_selected).unwrap_or(0)
    }

    pub fn selected(&self) -> &Tab {
        &self.tabs[self.selected_index()]
    }

    /// Index of the first tab showing `identity`.
    pub fn position(&self, identity: &FeedIdentity) -> Option<usize> {
        self.tabs.iter().position(|t| &t.identity == identity)
    }

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }
}

impl Default for TabSet {
    fn default() -> Self {
        Self::default_tabs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn selection(set: &TabSet) -> Vec<bool> {
        set.tabs().iter().map(Tab::is_selected).collect()
    }

    #[test]
    fn test_initial_selection_is_first_tab() {
        let set = TabSet::default_tabs();
        assert_eq!(selection(&set), vec![true, false]);
        assert_eq!(set.selected().identity, FeedIdentity::Recent);
    }

    #[test]
    fn test_page_change_moves_selection() {
        let mut set = TabSet::default_tabs();
        let tab = set.select(1).unwrap();
        assert_eq!(tab.identity, FeedIdentity::Popular);
        assert_eq!(selection(&set), vec![false, true]);
        assert_eq!(set.selected_index(), 1);
    }

    #[test]
    fn test_reselecting_same_index_is_stable() {
        let mut set = TabSet::default_tabs();
        set.select(0).unwrap();
        set.select(0).unwrap();
        assert_eq!(selection(&set), vec![true, false]);
    }

    #[test]
    fn test_out_of_range_keeps_selection() {
        let mut set = TabSet::default_tabs();
        set.select(1).unwrap();
        assert_eq!(
            set.select(2).unwrap_err(),
            TabError::OutOfRange { index: 2, len: 2 }
        );
        assert_eq!(selection(&set), vec![false, true]);
    }

    #[test]
    fn test_empty_set_rejected() {
        assert_eq!(TabSet::new(Vec::new()).unwrap_err(), TabError::Empty);
    }

    #[test]
    fn test_with_categories_appends_tabs() {
        let categories = vec![
            Category {
                cid: 2,
                name: "General".into(),
                slug: None,
                description: None,
            },
            Category {
                cid: 7,
                name: "Help".into(),
                slug: None,
                description: None,
            },
        ];
        let mut set = TabSet::with_categories(&categories);
        assert_eq!(set.len(), 4);
        assert_eq!(set.position(&FeedIdentity::category(7)), Some(3));
        set.select(3).unwrap();
        assert_eq!(selection(&set), vec![false, false, false, true]);
        assert_eq!(set.selected().title, "Help");
    }

    #[test]
    fn test_exactly_one_selected_after_any_sequence() {
        let mut set = TabSet::new(vec![
            ("a".into(), FeedIdentity::Recent),
            ("b".into(), FeedIdentity::Popular),
            ("c".into(), FeedIdentity::category(1)),
        ])
        .unwrap();
        for index in [2, 0, 5, 1, 1, 9, 2] {
            let _ = set.select(index);
            assert_eq!(set.tabs().iter().filter(|t| t.is_selected()).count(), 1);
        }
        assert_eq!(set.selected_index(), 2);
    }
}
