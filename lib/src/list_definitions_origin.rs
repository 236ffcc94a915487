use std::collections::HashMap;

use crate::{ink_list::InkList, list_definition::ListDefinition, value_type::ValueType};

/// All the `LIST` definitions of a story.
#[derive(Clone, Debug, Default)]
pub struct ListDefinitionsOrigin {
    lists: HashMap<String, ListDefinition>,
    // single item lists by item name and by full name, unambiguous names only
    all_unambiguous_list_value_cache: HashMap<String, ValueType>,
}

impl ListDefinitionsOrigin {
    pub fn new(lists: Vec<ListDefinition>) -> Self {
        let mut origin = ListDefinitionsOrigin::default();

        for list in lists {
            for (item, value) in list.items() {
                let single = ValueType::List(InkList::from_single_element(item.clone(), *value));

                origin
                    .all_unambiguous_list_value_cache
                    .insert(item.get_item_name().to_owned(), single.clone());
                origin
                    .all_unambiguous_list_value_cache
                    .insert(item.get_full_name(), single);
            }

            origin.lists.insert(list.get_name().to_owned(), list);
        }

        origin
    }

    pub fn get_list_definition(&self, name: &str) -> Option<&ListDefinition> {
        self.lists.get(name)
    }

    pub fn lists(&self) -> impl Iterator<Item = &ListDefinition> {
        self.lists.values()
    }

    pub fn find_single_item_list_with_name(&self, name: &str) -> Option<&ValueType> {
        self.all_unambiguous_list_value_cache.get(name)
    }
}
