//! Casting and truthiness rules for runtime values.
use crate::{
    ink_list::InkList,
    story_error::StoryError,
    value_type::{StringValue, ValueType},
};

pub(crate) const CAST_BOOL: u8 = 0;
pub(crate) const CAST_INT: u8 = 1;
pub(crate) const CAST_FLOAT: u8 = 2;
pub(crate) const CAST_LIST: u8 = 3;
pub(crate) const CAST_STRING: u8 = 4;
pub(crate) const CAST_DIVERT_TARGET: u8 = 5;
pub(crate) const CAST_VARIABLE_POINTER: u8 = 6;

impl ValueType {
    pub(crate) fn is_truthy(&self) -> Result<bool, StoryError> {
        match self {
            ValueType::Bool(v) => Ok(*v),
            ValueType::Int(v) => Ok(*v != 0),
            ValueType::Float(v) => Ok(*v != 0.0),
            ValueType::String(v) => Ok(!v.string.is_empty()),
            ValueType::DivertTarget(p) => Err(StoryError::InvalidStoryState(format!(
                "Shouldn't use a divert target (to {p}) as a conditional value. Did you intend a function call 'likeThis()' or a read count check 'likeThis'? (no arrows)"
            ))),
            ValueType::VariablePointer(_) => Err(StoryError::InvalidStoryState(
                "Shouldn't be checking the truthiness of a variable pointer".to_owned(),
            )),
            ValueType::List(l) => Ok(!l.is_empty()),
        }
    }

    /// Position of the type in the promotion order used by binary operations.
    pub(crate) fn get_cast_ordinal(&self) -> u8 {
        match self {
            ValueType::Bool(_) => CAST_BOOL,
            ValueType::Int(_) => CAST_INT,
            ValueType::Float(_) => CAST_FLOAT,
            ValueType::List(_) => CAST_LIST,
            ValueType::String(_) => CAST_STRING,
            ValueType::DivertTarget(_) => CAST_DIVERT_TARGET,
            ValueType::VariablePointer(_) => CAST_VARIABLE_POINTER,
        }
    }

    /// An empty list assigned over a list keeps the old list's origins.
    pub(crate) fn retain_list_origins_for_assignment(old_value: &ValueType, new_value: &mut ValueType) {
        if let (ValueType::List(old_list), ValueType::List(new_list)) = (old_value, new_value) {
            if new_list.is_empty() {
                new_list.set_initial_origin_names(old_list.origin_names());
            }
        }
    }

    pub(crate) fn cast(&self, cast_dest_type: u8) -> Result<ValueType, StoryError> {
        if self.get_cast_ordinal() == cast_dest_type {
            return Ok(self.clone());
        }

        let bad_cast = || {
            StoryError::InvalidStoryState(format!(
                "Can't cast {} from {} to {}",
                self,
                type_name(self.get_cast_ordinal()),
                type_name(cast_dest_type)
            ))
        };

        match self {
            ValueType::Bool(v) => match cast_dest_type {
                CAST_INT => Ok(ValueType::Int(i32::from(*v))),
                CAST_FLOAT => Ok(ValueType::Float(if *v { 1.0 } else { 0.0 })),
                CAST_STRING => Ok(ValueType::new(if *v { "true" } else { "false" })),
                _ => Err(bad_cast()),
            },
            ValueType::Int(v) => match cast_dest_type {
                CAST_BOOL => Ok(ValueType::Bool(*v != 0)),
                CAST_FLOAT => Ok(ValueType::Float(*v as f32)),
                CAST_STRING => Ok(ValueType::new(v.to_string())),
                _ => Err(bad_cast()),
            },
            ValueType::Float(v) => match cast_dest_type {
                CAST_BOOL => Ok(ValueType::Bool(*v != 0.0)),
                CAST_INT => Ok(ValueType::Int(*v as i32)),
                CAST_STRING => Ok(ValueType::new(v.to_string())),
                _ => Err(bad_cast()),
            },
            ValueType::String(v) => match cast_dest_type {
                CAST_INT => v
                    .string
                    .trim()
                    .parse::<i32>()
                    .map(ValueType::Int)
                    .map_err(|_| bad_cast()),
                CAST_FLOAT => v
                    .string
                    .trim()
                    .parse::<f32>()
                    .map(ValueType::Float)
                    .map_err(|_| bad_cast()),
                _ => Err(bad_cast()),
            },
            ValueType::List(l) => match cast_dest_type {
                CAST_INT => Ok(ValueType::Int(max_value(l))),
                CAST_FLOAT => Ok(ValueType::Float(max_value(l) as f32)),
                CAST_STRING => Ok(ValueType::String(StringValue::new(
                    &l.max_item()
                        .map(|(item, _)| item.to_string())
                        .unwrap_or_default(),
                ))),
                _ => Err(bad_cast()),
            },
            ValueType::DivertTarget(_) | ValueType::VariablePointer(_) => Err(bad_cast()),
        }
    }
}

fn max_value(l: &InkList) -> i32 {
    l.max_item().map(|(_, v)| v).unwrap_or(0)
}

fn type_name(ordinal: u8) -> &'static str {
    match ordinal {
        CAST_BOOL => "Bool",
        CAST_INT => "Int",
        CAST_FLOAT => "Float",
        CAST_LIST => "List",
        CAST_STRING => "String",
        CAST_DIVERT_TARGET => "DivertTarget",
        _ => "VariablePointer",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_promotes_to_float_and_string() {
        let v = ValueType::Int(3);
        assert_eq!(Some(3.0), v.cast(CAST_FLOAT).unwrap().get::<f32>());
        assert_eq!(Some("3"), v.cast(CAST_STRING).unwrap().get::<&str>());
    }

    #[test]
    fn string_to_int_fails_cleanly() {
        assert!(ValueType::new("abc").cast(CAST_INT).is_err());
        assert_eq!(Some(12), ValueType::new("12").cast(CAST_INT).unwrap().get::<i32>());
    }

    #[test]
    fn truthiness() {
        assert!(ValueType::Int(2).is_truthy().unwrap());
        assert!(!ValueType::new("").is_truthy().unwrap());
        assert!(ValueType::DivertTarget(Default::default()).is_truthy().is_err());
    }
}
