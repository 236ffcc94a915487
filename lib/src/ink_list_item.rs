use std::fmt;

/// One item of an ink list, identified by the name of its origin list
/// definition and its own name.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct InkListItem {
    origin_name: Option<String>,
    item_name: String,
}

impl InkListItem {
    pub fn new(origin_name: Option<String>, item_name: String) -> Self {
        Self {
            origin_name,
            item_name,
        }
    }

    /// Parses `Origin.item`. A name with no dot has no origin.
    pub fn from_full_name(full_name: &str) -> Self {
        match full_name.split_once('.') {
            Some((origin, item)) => Self::new(Some(origin.to_owned()), item.to_owned()),
            None => Self::new(None, full_name.to_owned()),
        }
    }

    pub fn get_origin_name(&self) -> Option<&String> {
        self.origin_name.as_ref()
    }

    pub fn get_item_name(&self) -> &str {
        &self.item_name
    }

    pub fn get_full_name(&self) -> String {
        let origin = self.origin_name.as_deref().unwrap_or("?");
        format!("{}.{}", origin, self.item_name)
    }
}

impl fmt::Display for InkListItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get_full_name())
    }
}
