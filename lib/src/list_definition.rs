use std::collections::HashMap;

use crate::ink_list_item::InkListItem;

/// A `LIST` declaration from the story: its name and the value of each item.
#[derive(Clone, Debug)]
pub struct ListDefinition {
    name: String,
    items: HashMap<InkListItem, i32>,
}

impl ListDefinition {
    pub fn new(name: String, item_values: HashMap<String, i32>) -> Self {
        let items = item_values
            .into_iter()
            .map(|(item_name, value)| (InkListItem::new(Some(name.clone()), item_name), value))
            .collect();

        Self { name, items }
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn items(&self) -> &HashMap<InkListItem, i32> {
        &self.items
    }

    pub fn contains_item_with_name(&self, item_name: &str) -> bool {
        self.items.keys().any(|i| i.get_item_name() == item_name)
    }

    pub fn get_item_with_value(&self, val: i32) -> Option<InkListItem> {
        self.items
            .iter()
            .find(|(_, v)| **v == val)
            .map(|(item, _)| item.clone())
    }
}
