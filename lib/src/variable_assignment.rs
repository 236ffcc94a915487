use std::fmt;

/// Pops the top of the evaluation stack into a variable.
#[derive(Clone, Debug)]
pub struct VariableAssignment {
    pub is_global: bool,
    pub is_new_declaration: bool,
    pub variable_name: String,
}

impl VariableAssignment {
    pub fn new(variable_name: &str, is_new_declaration: bool, is_global: bool) -> Self {
        VariableAssignment {
            is_global,
            is_new_declaration,
            variable_name: variable_name.to_owned(),
        }
    }
}

impl fmt::Display for VariableAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VarAssign to {}", self.variable_name)
    }
}
