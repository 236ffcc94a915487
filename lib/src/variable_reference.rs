use std::fmt;

use crate::path::Path;

/// Pushes the value of a variable, or the read count of a container, onto
/// the evaluation stack.
#[derive(Clone, Debug)]
pub struct VariableReference {
    pub name: String,
    pub path_for_count: Option<Path>,
}

impl VariableReference {
    pub fn new(name: &str) -> Self {
        VariableReference {
            name: name.to_owned(),
            path_for_count: None,
        }
    }

    pub fn from_path_for_count(path_for_count: &str) -> Self {
        VariableReference {
            name: String::new(),
            path_for_count: Some(Path::new_with_components_string(path_for_count)),
        }
    }
}

impl fmt::Display for VariableReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path_for_count {
            Some(path) => write!(f, "read_count({})", path),
            None => write!(f, "var({})", self.name),
        }
    }
}
