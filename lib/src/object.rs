//! Content nodes of a compiled story.
use std::fmt;

use crate::{
    choice_point::ChoicePoint, container::ContainerId, control_command::CommandType,
    divert::Divert, native_function_call::Op, value_type::ValueType,
    variable_assignment::VariableAssignment, variable_reference::VariableReference,
};

/// Every kind of object that can appear in container content, in the
/// output stream or on the evaluation stack.
#[derive(Clone, Debug)]
pub enum RTObject {
    Value(ValueType),
    Container(ContainerId),
    ControlCommand(CommandType),
    NativeCall(Op),
    Divert(Divert),
    ChoicePoint(ChoicePoint),
    VariableReference(VariableReference),
    VariableAssignment(VariableAssignment),
    Glue,
    /// Legacy tag, written as a single object rather than `#`..`/#` content.
    Tag(String),
    Void,
}

impl RTObject {
    pub fn is_command(&self, command: CommandType) -> bool {
        matches!(self, RTObject::ControlCommand(c) if *c == command)
    }
}

impl From<ValueType> for RTObject {
    fn from(value: ValueType) -> Self {
        RTObject::Value(value)
    }
}

impl fmt::Display for RTObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RTObject::Value(v) => write!(f, "{v}"),
            RTObject::Container(id) => write!(f, "Container#{}", id.0),
            RTObject::ControlCommand(c) => write!(f, "{c}"),
            RTObject::NativeCall(op) => write!(f, "{op}"),
            RTObject::Divert(d) => write!(f, "{d}"),
            RTObject::ChoicePoint(cp) => write!(f, "{cp}"),
            RTObject::VariableReference(vr) => write!(f, "{vr}"),
            RTObject::VariableAssignment(va) => write!(f, "{va}"),
            RTObject::Glue => write!(f, "Glue"),
            RTObject::Tag(t) => write!(f, "# {t}"),
            RTObject::Void => write!(f, "Void"),
        }
    }
}
