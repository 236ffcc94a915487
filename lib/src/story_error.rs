//! Errors returned by the runtime, when loading or running a [`Story`](crate::story::Story).
use thiserror::Error;

/// Error returned by a fallible [`Story`](crate::story::Story) operation.
///
/// Author errors raised by the ink content itself are not reported through
/// this type unless no [`ErrorHandler`](crate::story::errors::ErrorHandler)
/// is installed; they are buffered in the story state instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoryError {
    /// Story is in an invalid state.
    #[error("Invalid story state: {0}")]
    InvalidStoryState(String),
    /// JSON for the ink was not valid.
    #[error("Error parsing JSON: {0}")]
    BadJson(String),
    /// A method was called with an inappropriate argument.
    #[error("Bad argument: {0}")]
    BadArgument(String),
    /// A path could not be resolved against the compiled content.
    #[error("Path not found: {0}")]
    PathNotFound(String),
    /// A value was popped from an empty evaluation stack.
    #[error("Evaluation stack underflow")]
    StackUnderflow,
    /// A choice index outside of the current choice set was selected.
    #[error("Choice index {index} out of range, there are {count} choices")]
    InvalidChoiceIndex { index: usize, count: usize },
    /// A saved state could not be restored.
    #[error("Corrupt state: {0}")]
    CorruptState(String),
    /// The compiled story was built with an incompatible ink version.
    #[error("Unsupported ink format version {version}, supported versions are {min} to {max}")]
    UnsupportedFormatVersion { version: i32, min: i32, max: i32 },
    /// An external function that isn't lookahead safe was reached while the
    /// engine was scanning ahead of the current line.
    #[error("External function '{0}' is not lookahead safe and was reached during lookahead")]
    UnsafeExternalDuringLookahead(String),
    /// External functions declared in the story with no binding and no fallback.
    #[error("Missing function binding for external{}: '{}'", if .0.len() > 1 { "s" } else { "" }, .0.join("', '"))]
    MissingExternalBinding(Vec<String>),
}

impl From<serde_json::Error> for StoryError {
    fn from(err: serde_json::Error) -> StoryError {
        StoryError::BadJson(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_binding_message_lists_every_name() {
        let err = StoryError::MissingExternalBinding(vec!["a".to_owned(), "b".to_owned()]);
        assert_eq!(
            "Missing function binding for externals: 'a', 'b'",
            err.to_string()
        );
    }

    #[test]
    fn choice_index_message() {
        let err = StoryError::InvalidChoiceIndex { index: 3, count: 1 };
        assert_eq!("Choice index 3 out of range, there are 1 choices", err.to_string());
    }
}
