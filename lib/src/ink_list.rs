//! Set of list items with origin tracking, the runtime form of an ink `LIST` value.
use core::fmt;
use std::collections::HashMap;

use crate::{
    ink_list_item::InkListItem, list_definitions_origin::ListDefinitionsOrigin,
    story_error::StoryError,
};

/// An ink list value: items keyed by origin and name, mapped to their
/// numeric values.
///
/// Lists remember the names of the `LIST` definitions they were built from,
/// even when empty, so that operations like `LIST_ALL` or `LIST_INVERT` can
/// still find the full definition.
#[derive(Clone, Debug, Default)]
pub struct InkList {
    pub items: HashMap<InkListItem, i32>,
    initial_origin_names: Vec<String>,
}

impl InkList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_single_element(item: InkListItem, value: i32) -> Self {
        let mut list = Self::new();
        list.items.insert(item, value);
        list
    }

    /// Creates an empty list whose origin is the named list definition.
    pub fn from_single_origin(
        origin_name: &str,
        origins: &ListDefinitionsOrigin,
    ) -> Result<Self, StoryError> {
        if origins.get_list_definition(origin_name).is_none() {
            return Err(StoryError::BadArgument(format!(
                "InkList origin could not be found in story when constructing new list: {origin_name}"
            )));
        }

        let mut list = Self::new();
        list.initial_origin_names.push(origin_name.to_owned());
        Ok(list)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Names of the list definitions the items come from, or the names set
    /// when the list was created if it has no items.
    pub fn origin_names(&self) -> Vec<String> {
        if self.items.is_empty() {
            return self.initial_origin_names.clone();
        }

        let mut names: Vec<String> = Vec::new();
        for item in self.items.keys() {
            if let Some(origin) = item.get_origin_name() {
                if !names.contains(origin) {
                    names.push(origin.clone());
                }
            }
        }
        names.sort();
        names
    }

    pub fn set_initial_origin_names(&mut self, names: Vec<String>) {
        self.initial_origin_names = names;
    }

    /// Items sorted by value, ties broken by origin name.
    pub fn ordered_items(&self) -> Vec<(&InkListItem, i32)> {
        let mut ordered: Vec<(&InkListItem, i32)> =
            self.items.iter().map(|(k, v)| (k, *v)).collect();
        ordered.sort_by(|a, b| {
            a.1.cmp(&b.1)
                .then_with(|| a.0.get_origin_name().cmp(&b.0.get_origin_name()))
                .then_with(|| a.0.get_item_name().cmp(b.0.get_item_name()))
        });
        ordered
    }

    pub fn max_item(&self) -> Option<(&InkListItem, i32)> {
        self.ordered_items().last().copied()
    }

    pub fn min_item(&self) -> Option<(&InkListItem, i32)> {
        self.ordered_items().first().copied()
    }

    pub fn max_as_list(&self) -> InkList {
        match self.max_item() {
            Some((item, value)) => InkList::from_single_element(item.clone(), value),
            None => self.empty_with_same_origins(),
        }
    }

    pub fn min_as_list(&self) -> InkList {
        match self.min_item() {
            Some((item, value)) => InkList::from_single_element(item.clone(), value),
            None => self.empty_with_same_origins(),
        }
    }

    fn empty_with_same_origins(&self) -> InkList {
        let mut list = InkList::new();
        list.set_initial_origin_names(self.origin_names());
        list
    }

    pub fn union(&self, other: &InkList) -> InkList {
        let mut union = self.clone();
        for (k, v) in &other.items {
            union.items.insert(k.clone(), *v);
        }
        union
    }

    pub fn intersect(&self, other: &InkList) -> InkList {
        let mut intersection = self.empty_with_same_origins();
        for (k, v) in &self.items {
            if other.items.contains_key(k) {
                intersection.items.insert(k.clone(), *v);
            }
        }
        intersection
    }

    pub fn without(&self, to_remove: &InkList) -> InkList {
        let mut result = self.clone();
        result.initial_origin_names = self.origin_names();
        for k in to_remove.items.keys() {
            result.items.remove(k);
        }
        result
    }

    /// True when every item of `other` is in this list. Empty lists never
    /// contain, nor are contained.
    pub fn contains(&self, other: &InkList) -> bool {
        if other.items.is_empty() || self.items.is_empty() {
            return false;
        }

        other.items.keys().all(|k| self.items.contains_key(k))
    }

    pub fn contains_item_named(&self, item_name: &str) -> bool {
        self.items.keys().any(|k| k.get_item_name() == item_name)
    }

    pub fn greater_than(&self, other: &InkList) -> bool {
        match (self.min_item(), other.max_item()) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some((_, min)), Some((_, other_max))) => min > other_max,
        }
    }

    pub fn greater_than_or_equals(&self, other: &InkList) -> bool {
        if self.items.is_empty() {
            return false;
        }
        if other.items.is_empty() {
            return true;
        }

        self.min_value() >= other.min_value() && self.max_value() >= other.max_value()
    }

    pub fn less_than(&self, other: &InkList) -> bool {
        match (self.max_item(), other.min_item()) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some((_, max)), Some((_, other_min))) => max < other_min,
        }
    }

    pub fn less_than_or_equals(&self, other: &InkList) -> bool {
        if other.items.is_empty() {
            return false;
        }
        if self.items.is_empty() {
            return true;
        }

        self.max_value() <= other.max_value() && self.min_value() <= other.min_value()
    }

    fn min_value(&self) -> i32 {
        self.min_item().map(|(_, v)| v).unwrap_or(0)
    }

    fn max_value(&self) -> i32 {
        self.max_item().map(|(_, v)| v).unwrap_or(0)
    }

    /// Every item of every origin list definition.
    pub fn all(&self, origins: &ListDefinitionsOrigin) -> InkList {
        let mut list = InkList::new();
        let origin_names = self.origin_names();
        for name in &origin_names {
            if let Some(def) = origins.get_list_definition(name) {
                for (item, value) in def.items() {
                    list.items.insert(item.clone(), *value);
                }
            }
        }
        list.set_initial_origin_names(origin_names);
        list
    }

    /// Items of the origin list definitions that are not in this list.
    pub fn inverse(&self, origins: &ListDefinitionsOrigin) -> InkList {
        let mut list = InkList::new();
        let origin_names = self.origin_names();
        for name in &origin_names {
            if let Some(def) = origins.get_list_definition(name) {
                for (item, value) in def.items() {
                    if !self.items.contains_key(item) {
                        list.items.insert(item.clone(), *value);
                    }
                }
            }
        }
        list.set_initial_origin_names(origin_names);
        list
    }

    /// Items whose value is in `min..=max`.
    pub fn list_with_sub_range(&self, min: i32, max: i32) -> InkList {
        let mut list = self.empty_with_same_origins();
        for (item, value) in self.ordered_items() {
            if value >= min && value <= max {
                list.items.insert(item.clone(), value);
            }
        }
        list
    }
}

impl PartialEq for InkList {
    fn eq(&self, other: &Self) -> bool {
        self.items.len() == other.items.len()
            && self.items.keys().all(|k| other.items.contains_key(k))
    }
}

impl fmt::Display for InkList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self
            .ordered_items()
            .into_iter()
            .map(|(item, _)| item.get_item_name())
            .collect();

        write!(f, "{}", names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(origin: &str, name: &str) -> InkListItem {
        InkListItem::new(Some(origin.to_owned()), name.to_owned())
    }

    fn list(entries: &[(&str, i32)]) -> InkList {
        let mut l = InkList::new();
        for (name, value) in entries {
            l.items.insert(item("Colors", name), *value);
        }
        l
    }

    #[test]
    fn displays_items_in_value_order() {
        let l = list(&[("blue", 3), ("red", 1), ("green", 2)]);
        assert_eq!("red, green, blue", l.to_string());
    }

    #[test]
    fn set_operations() {
        let a = list(&[("red", 1), ("green", 2)]);
        let b = list(&[("green", 2), ("blue", 3)]);

        assert_eq!(list(&[("red", 1), ("green", 2), ("blue", 3)]), a.union(&b));
        assert_eq!(list(&[("green", 2)]), a.intersect(&b));
        assert_eq!(list(&[("red", 1)]), a.without(&b));
        assert!(a.contains(&list(&[("red", 1)])));
        assert!(!a.contains(&InkList::new()));
    }

    #[test]
    fn comparisons_use_min_and_max() {
        let low = list(&[("red", 1), ("green", 2)]);
        let high = list(&[("blue", 3)]);

        assert!(high.greater_than(&low));
        assert!(low.less_than(&high));
        assert!(!low.greater_than(&high));
        assert!(high.greater_than_or_equals(&low));
        assert!(low.less_than_or_equals(&high));
    }

    #[test]
    fn empty_list_keeps_origin() {
        let l = list(&[("red", 1)]);
        let empty = l.without(&l);
        assert!(empty.is_empty());
        assert_eq!(vec!["Colors".to_owned()], empty.origin_names());
    }
}
