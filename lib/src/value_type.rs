//! Values exchanged between the host and the story, tagged with their ink type.
//!
//! This is the host bridge: external functions, variable access and
//! observers all see story values as [`ValueType`]. Host `bool`, `i32`,
//! `f32` and strings convert in with [`From`] and back out with
//! [`ValueType::get`]. A function returning nothing is modelled as `None`
//! on the host side. Lists cross the bridge untouched as [`InkList`].
use std::fmt;

use crate::{ink_list::InkList, path::Path, story_error::StoryError};

/// An ink value, tagged with its type.
#[derive(Clone, Debug, PartialEq)]
pub enum ValueType {
    Bool(bool),
    Int(i32),
    Float(f32),
    /// An ink list value.
    List(InkList),
    /// Ink string, constructed with [`new`](ValueType::new) from a `&str`.
    String(StringValue),
    /// Reference to an ink divert target.
    DivertTarget(Path),
    /// Reference to an ink variable.
    VariablePointer(VariablePointerValue),
}

impl From<bool> for ValueType {
    fn from(value: bool) -> ValueType {
        ValueType::Bool(value)
    }
}

impl From<i32> for ValueType {
    fn from(value: i32) -> ValueType {
        ValueType::Int(value)
    }
}

impl From<f32> for ValueType {
    fn from(value: f32) -> ValueType {
        ValueType::Float(value)
    }
}

impl From<&str> for ValueType {
    fn from(value: &str) -> ValueType {
        ValueType::String(StringValue::new(value))
    }
}

impl From<String> for ValueType {
    fn from(value: String) -> ValueType {
        ValueType::String(StringValue::new(&value))
    }
}

impl From<InkList> for ValueType {
    fn from(value: InkList) -> ValueType {
        ValueType::List(value)
    }
}

impl From<Path> for ValueType {
    fn from(value: Path) -> ValueType {
        ValueType::DivertTarget(value)
    }
}

impl From<VariablePointerValue> for ValueType {
    fn from(value: VariablePointerValue) -> Self {
        ValueType::VariablePointer(value)
    }
}

impl TryFrom<&ValueType> for bool {
    type Error = ();
    fn try_from(value: &ValueType) -> Result<Self, Self::Error> {
        match value {
            ValueType::Bool(v) => Ok(*v),
            _ => Err(()),
        }
    }
}

impl TryFrom<&ValueType> for i32 {
    type Error = ();
    fn try_from(value: &ValueType) -> Result<Self, Self::Error> {
        match value {
            ValueType::Int(v) => Ok(*v),
            _ => Err(()),
        }
    }
}

impl TryFrom<&ValueType> for f32 {
    type Error = ();
    fn try_from(value: &ValueType) -> Result<Self, Self::Error> {
        match value {
            ValueType::Float(v) => Ok(*v),
            _ => Err(()),
        }
    }
}

impl<'val> TryFrom<&'val ValueType> for &'val str {
    type Error = ();
    fn try_from(value: &'val ValueType) -> Result<Self, Self::Error> {
        match value {
            ValueType::String(v) => Ok(&v.string),
            _ => Err(()),
        }
    }
}

impl<'val> TryFrom<&'val ValueType> for &'val InkList {
    type Error = ();
    fn try_from(value: &'val ValueType) -> Result<Self, Self::Error> {
        match value {
            ValueType::List(l) => Ok(l),
            _ => Err(()),
        }
    }
}

impl<'val> TryFrom<&'val ValueType> for &'val Path {
    type Error = ();
    fn try_from(value: &'val ValueType) -> Result<Self, Self::Error> {
        match value {
            ValueType::DivertTarget(p) => Ok(p),
            _ => Err(()),
        }
    }
}

impl<'val> TryFrom<&'val ValueType> for &'val VariablePointerValue {
    type Error = ();
    fn try_from(value: &'val ValueType) -> Result<Self, Self::Error> {
        match value {
            ValueType::VariablePointer(p) => Ok(p),
            _ => Err(()),
        }
    }
}

impl ValueType {
    pub fn new<T: Into<ValueType>>(v: T) -> Self {
        v.into()
    }

    pub(crate) fn new_variable_pointer(variable_name: &str, context_index: i32) -> Self {
        ValueType::VariablePointer(VariablePointerValue {
            variable_name: variable_name.to_owned(),
            context_index,
        })
    }

    /// Gets the inner value if it has the requested type.
    ///
    /// ```
    /// use inkrt::value_type::ValueType;
    ///
    /// let v = ValueType::new(5);
    /// assert_eq!(Some(5), v.get::<i32>());
    /// assert_eq!(None, v.get::<&str>());
    /// ```
    pub fn get<'val, T>(&'val self) -> Option<T>
    where
        &'val Self: TryInto<T>,
    {
        self.try_into().ok()
    }

    /// Tries to convert the internal value of this `ValueType` to `i32`
    pub fn coerce_to_int(&self) -> Result<i32, StoryError> {
        match self {
            ValueType::Bool(v) => Ok(i32::from(*v)),
            ValueType::Int(v) => Ok(*v),
            ValueType::Float(v) => Ok(*v as i32),
            _ => Err(StoryError::BadArgument("Failed to cast to int".to_owned())),
        }
    }

    /// Tries to convert the internal value of this `ValueType` to `f32`
    pub fn coerce_to_float(&self) -> Result<f32, StoryError> {
        match self {
            ValueType::Bool(v) => Ok(if *v { 1.0 } else { 0.0 }),
            ValueType::Int(v) => Ok(*v as f32),
            ValueType::Float(v) => Ok(*v),
            _ => Err(StoryError::BadArgument(
                "Failed to cast to float".to_owned(),
            )),
        }
    }

    /// Tries to convert the internal value of this `ValueType` to `bool`
    pub fn coerce_to_bool(&self) -> Result<bool, StoryError> {
        match self {
            ValueType::Bool(v) => Ok(*v),
            ValueType::Int(v) => Ok(*v != 0),
            ValueType::Float(v) => Ok(*v != 0.0),
            _ => Err(StoryError::BadArgument(
                "Failed to cast to boolean".to_owned(),
            )),
        }
    }

    /// Tries to convert the internal value of this `ValueType` to `String`
    pub fn coerce_to_string(&self) -> Result<String, StoryError> {
        match self {
            ValueType::Bool(_) | ValueType::Int(_) | ValueType::Float(_) | ValueType::List(_) => {
                Ok(self.to_string())
            }
            ValueType::String(v) => Ok(v.string.clone()),
            _ => Err(StoryError::BadArgument(
                "Failed to cast to string".to_owned(),
            )),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Bool(v) => write!(f, "{}", v),
            ValueType::Int(v) => write!(f, "{}", v),
            ValueType::Float(v) => write!(f, "{}", v),
            ValueType::String(v) => write!(f, "{}", v.string),
            ValueType::DivertTarget(p) => write!(f, "DivertTargetValue({})", p),
            ValueType::VariablePointer(v) => {
                write!(f, "VariablePointerValue({})", v.variable_name)
            }
            ValueType::List(l) => write!(f, "{}", l),
        }
    }
}

/// Ink runtime representation of a string.
#[derive(Clone, Debug, PartialEq)]
pub struct StringValue {
    /// The internal string value.
    pub string: String,
    pub(crate) is_inline_whitespace: bool,
    pub(crate) is_newline: bool,
}

impl StringValue {
    pub fn new(s: &str) -> Self {
        StringValue {
            string: s.to_owned(),
            is_inline_whitespace: s.chars().all(|c| c == ' ' || c == '\t'),
            is_newline: s == "\n",
        }
    }

    pub fn is_non_whitespace(&self) -> bool {
        !self.is_newline && !self.is_inline_whitespace
    }
}

/// Ink runtime representation of a reference to a variable.
#[derive(Clone, PartialEq, Debug)]
pub struct VariablePointerValue {
    pub(crate) variable_name: String,

    // Where the variable is located
    // -1 = default, unknown, yet to be determined
    // 0  = in global scope
    // 1+ = callstack element index + 1 (so that the first doesn't conflict with special global scope)
    pub(crate) context_index: i32,
}

impl VariablePointerValue {
    pub fn variable_name(&self) -> &str {
        &self.variable_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_values_round_trip() {
        assert_eq!(Some(true), ValueType::new(true).get::<bool>());
        assert_eq!(Some(2.5), ValueType::new(2.5f32).get::<f32>());
        assert_eq!(Some("hi"), ValueType::new("hi").get::<&str>());
        assert_eq!(None, ValueType::new("hi").get::<i32>());
    }

    #[test]
    fn whitespace_flags() {
        let ws = StringValue::new(" \t");
        assert!(ws.is_inline_whitespace);
        assert!(!ws.is_non_whitespace());
        assert!(StringValue::new("\n").is_newline);
        assert!(StringValue::new("a").is_non_whitespace());
    }

    #[test]
    fn floats_display_without_trailing_zero() {
        assert_eq!("2", ValueType::Float(2.0).to_string());
        assert_eq!("3.5", ValueType::Float(3.5).to_string());
    }
}
