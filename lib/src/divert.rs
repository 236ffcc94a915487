use std::fmt;

use crate::{path::Path, push_pop::PushPopType};

/// Jump of the content pointer: plain divert, tunnel or function call,
/// variable divert, or call to an external function.
#[derive(Clone, Debug)]
pub struct Divert {
    pub external_args: usize,
    pub is_conditional: bool,
    pub is_external: bool,
    pub pushes_to_stack: bool,
    pub stack_push_type: PushPopType,
    /// Absolute once the story is loaded. For externals, the function name.
    pub target_path: Option<Path>,
    pub variable_divert_name: Option<String>,
}

impl Divert {
    pub fn new(
        pushes_to_stack: bool,
        stack_push_type: PushPopType,
        is_external: bool,
        external_args: usize,
        is_conditional: bool,
        var_divert_name: Option<String>,
        target_path: Option<&str>,
    ) -> Self {
        Divert {
            is_conditional,
            pushes_to_stack,
            stack_push_type,
            is_external,
            external_args,
            target_path: target_path.map(Path::new_with_components_string),
            variable_divert_name: var_divert_name,
        }
    }

    pub fn has_variable_target(&self) -> bool {
        self.variable_divert_name.is_some()
    }
}

impl fmt::Display for Divert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.variable_divert_name {
            return write!(f, "Divert(variable: {})", name);
        }

        let Some(target) = &self.target_path else {
            return write!(f, "Divert(null)");
        };

        write!(f, "Divert")?;

        if self.is_conditional {
            write!(f, "?")?;
        }

        if self.pushes_to_stack {
            if self.stack_push_type == PushPopType::Function {
                write!(f, " function")?;
            } else {
                write!(f, " tunnel")?;
            }
        }

        write!(f, " -> {}", target)
    }
}
