//! A generated Choice from the story.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{callstack::Thread, path::Path};

/// An option offered to the player at a decision point.
///
/// Choices are regenerated every time the story reaches a decision point,
/// so `index` only makes sense within the current choice set.
#[derive(Clone, Debug)]
pub struct Choice {
    /// The main text to presented to the player for this Choice.
    pub text: String,
    /// Position of this choice in the current choice set.
    pub index: usize,
    pub tags: Vec<String>,
    pub(crate) target_path: Path,
    /// Where the choice was defined in the story.
    pub(crate) source_path: String,
    pub(crate) original_thread_index: usize,
    pub(crate) thread_at_generation: Option<Thread>,
    pub(crate) is_invisible_default: bool,
}

impl Choice {
    pub(crate) fn new(
        target_path: Path,
        source_path: String,
        is_invisible_default: bool,
        tags: Vec<String>,
        thread_at_generation: Thread,
        text: String,
    ) -> Choice {
        Choice {
            text,
            index: 0,
            tags,
            target_path,
            source_path,
            original_thread_index: thread_at_generation.thread_index,
            thread_at_generation: Some(thread_at_generation),
            is_invisible_default,
        }
    }

    /// Path of the content the story continues from once this choice is
    /// taken.
    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    pub fn source_path(&self) -> &str {
        &self.source_path
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.index + 1, self.text)
    }
}

/// Saved form of a [`Choice`]. The thread it was generated in is stored
/// apart, next to the flow callstack.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChoiceRecord {
    pub text: String,
    pub index: usize,
    pub original_choice_path: String,
    pub original_thread_index: usize,
    pub target_path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl From<&Choice> for ChoiceRecord {
    fn from(c: &Choice) -> Self {
        ChoiceRecord {
            text: c.text.clone(),
            index: c.index,
            original_choice_path: c.source_path.clone(),
            original_thread_index: c.original_thread_index,
            target_path: c.target_path.get_components_string(),
            tags: c.tags.clone(),
        }
    }
}

impl ChoiceRecord {
    /// Rebuilds the choice. Its generation thread has to be attached by the
    /// caller.
    pub(crate) fn into_choice(self) -> Choice {
        Choice {
            text: self.text,
            index: self.index,
            tags: self.tags,
            target_path: Path::new_with_components_string(&self.target_path),
            source_path: self.original_choice_path,
            original_thread_index: self.original_thread_index,
            thread_at_generation: None,
            is_invisible_default: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_uses_camel_case_keys() {
        let record = ChoiceRecord {
            text: "Go".to_owned(),
            index: 0,
            original_choice_path: "0.3".to_owned(),
            original_thread_index: 0,
            target_path: "0.c-0".to_owned(),
            tags: Vec::new(),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!("0.c-0", json["targetPath"]);
        assert_eq!("0.3", json["originalChoicePath"]);
        assert!(json.get("tags").is_none());

        let back: ChoiceRecord = serde_json::from_value(json).unwrap();
        assert_eq!(record, back);
    }
}
