//! Built-in operators and functions executed on the evaluation stack.
use std::fmt;

use crate::{
    ink_list::InkList, list_definitions_origin::ListDefinitionsOrigin, object::RTObject,
    story_error::StoryError, value::CAST_INT, value_type::ValueType,
};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Op {
    Add,
    Subtract,
    Divide,
    Multiply,
    Mod,
    Negate,

    Equal,
    Greater,
    Less,
    GreaterThanOrEquals,
    LessThanOrEquals,
    NotEquals,
    Not,

    And,
    Or,

    Min,
    Max,

    Pow,
    Floor,
    Ceiling,
    Int,
    Float,

    Has,
    Hasnt,
    Intersect,

    ListMin,
    ListMax,
    All,
    Count,
    ValueOfList,
    Invert,
}

const ADD_NAME: &str = "+";
const SUBTRACT_NAME: &str = "-";
const DIVIDE_NAME: &str = "/";
const MULTIPLY_NAME: &str = "*";
const MOD_NAME: &str = "%";
const NEGATE_NAME: &str = "_";
const EQUAL_NAME: &str = "==";
const GREATER_NAME: &str = ">";
const LESS_NAME: &str = "<";
const GREATER_THAN_OR_EQUALS_NAME: &str = ">=";
const LESS_THAN_OR_EQUALS_NAME: &str = "<=";
const NOT_EQUALS_NAME: &str = "!=";
const NOT_NAME: &str = "!";
const AND_NAME: &str = "&&";
const OR_NAME: &str = "||";
const MIN_NAME: &str = "MIN";
const MAX_NAME: &str = "MAX";
const POW_NAME: &str = "POW";
const FLOOR_NAME: &str = "FLOOR";
const CEILING_NAME: &str = "CEILING";
const INT_NAME: &str = "INT";
const FLOAT_NAME: &str = "FLOAT";
const HAS_NAME: &str = "?";
const HASNT_NAME: &str = "!?";
const INTERSECT_NAME: &str = "^";
const LIST_MIN_NAME: &str = "LIST_MIN";
const LIST_MAX_NAME: &str = "LIST_MAX";
const LIST_ALL_NAME: &str = "LIST_ALL";
const LIST_COUNT_NAME: &str = "LIST_COUNT";
const LIST_VALUE_NAME: &str = "LIST_VALUE";
const LIST_INVERT_NAME: &str = "LIST_INVERT";

/// Result of a native call: the value to push and, for recoverable
/// problems like an integer division by zero, a warning to report.
pub(crate) struct CallResult {
    pub value: ValueType,
    pub warning: Option<String>,
}

impl From<ValueType> for CallResult {
    fn from(value: ValueType) -> Self {
        CallResult {
            value,
            warning: None,
        }
    }
}

impl Op {
    pub fn from_name(name: &str) -> Option<Op> {
        let op = match name {
            ADD_NAME => Op::Add,
            SUBTRACT_NAME => Op::Subtract,
            DIVIDE_NAME => Op::Divide,
            MULTIPLY_NAME => Op::Multiply,
            MOD_NAME => Op::Mod,
            NEGATE_NAME => Op::Negate,
            EQUAL_NAME => Op::Equal,
            GREATER_NAME => Op::Greater,
            LESS_NAME => Op::Less,
            GREATER_THAN_OR_EQUALS_NAME => Op::GreaterThanOrEquals,
            LESS_THAN_OR_EQUALS_NAME => Op::LessThanOrEquals,
            NOT_EQUALS_NAME => Op::NotEquals,
            NOT_NAME => Op::Not,
            AND_NAME => Op::And,
            OR_NAME => Op::Or,
            MIN_NAME => Op::Min,
            MAX_NAME => Op::Max,
            POW_NAME => Op::Pow,
            FLOOR_NAME => Op::Floor,
            CEILING_NAME => Op::Ceiling,
            INT_NAME => Op::Int,
            FLOAT_NAME => Op::Float,
            HAS_NAME => Op::Has,
            HASNT_NAME => Op::Hasnt,
            INTERSECT_NAME => Op::Intersect,
            LIST_MIN_NAME => Op::ListMin,
            LIST_MAX_NAME => Op::ListMax,
            LIST_ALL_NAME => Op::All,
            LIST_COUNT_NAME => Op::Count,
            LIST_VALUE_NAME => Op::ValueOfList,
            LIST_INVERT_NAME => Op::Invert,
            _ => return None,
        };

        Some(op)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Op::Add => ADD_NAME,
            Op::Subtract => SUBTRACT_NAME,
            Op::Divide => DIVIDE_NAME,
            Op::Multiply => MULTIPLY_NAME,
            Op::Mod => MOD_NAME,
            Op::Negate => NEGATE_NAME,
            Op::Equal => EQUAL_NAME,
            Op::Greater => GREATER_NAME,
            Op::Less => LESS_NAME,
            Op::GreaterThanOrEquals => GREATER_THAN_OR_EQUALS_NAME,
            Op::LessThanOrEquals => LESS_THAN_OR_EQUALS_NAME,
            Op::NotEquals => NOT_EQUALS_NAME,
            Op::Not => NOT_NAME,
            Op::And => AND_NAME,
            Op::Or => OR_NAME,
            Op::Min => MIN_NAME,
            Op::Max => MAX_NAME,
            Op::Pow => POW_NAME,
            Op::Floor => FLOOR_NAME,
            Op::Ceiling => CEILING_NAME,
            Op::Int => INT_NAME,
            Op::Float => FLOAT_NAME,
            Op::Has => HAS_NAME,
            Op::Hasnt => HASNT_NAME,
            Op::Intersect => INTERSECT_NAME,
            Op::ListMin => LIST_MIN_NAME,
            Op::ListMax => LIST_MAX_NAME,
            Op::All => LIST_ALL_NAME,
            Op::Count => LIST_COUNT_NAME,
            Op::ValueOfList => LIST_VALUE_NAME,
            Op::Invert => LIST_INVERT_NAME,
        }
    }

    pub fn number_of_parameters(&self) -> usize {
        match self {
            Op::Negate
            | Op::Not
            | Op::Floor
            | Op::Ceiling
            | Op::Int
            | Op::Float
            | Op::ListMin
            | Op::ListMax
            | Op::All
            | Op::Count
            | Op::ValueOfList
            | Op::Invert => 1,
            _ => 2,
        }
    }

    /// Applies the operation to `params`, given in push order.
    pub(crate) fn call(
        &self,
        params: Vec<RTObject>,
        origins: &ListDefinitionsOrigin,
    ) -> Result<CallResult, StoryError> {
        if self.number_of_parameters() != params.len() {
            return Err(StoryError::InvalidStoryState(format!(
                "Unexpected number of parameters to '{}'",
                self.name()
            )));
        }

        let mut values = Vec::with_capacity(params.len());
        for p in params {
            match p {
                RTObject::Value(v) => values.push(v),
                RTObject::Void => return Err(StoryError::InvalidStoryState("Attempting to perform operation on a void value. Did you forget to 'return' a value from a function you called here?".to_owned())),
                other => return Err(StoryError::InvalidStoryState(format!("RTObject of type Value expected: {other}"))),
            }
        }

        let has_list = values.iter().any(|v| matches!(v, ValueType::List(_)));

        // Binary operations on lists are treated outside of the standard
        // coercion rules
        if values.len() == 2 && has_list {
            return self.call_binary_list_operation(&values, origins);
        }

        let coerced = coerce_values_to_single_type(values)?;

        self.call_type(&coerced, origins)
    }

    fn call_binary_list_operation(
        &self,
        params: &[ValueType],
        origins: &ListDefinitionsOrigin,
    ) -> Result<CallResult, StoryError> {
        match (self, &params[0], &params[1]) {
            // List-Int addition/subtraction returns a List (e.g. "alpha" + 1 = "beta")
            (Op::Add | Op::Subtract, ValueType::List(list), ValueType::Int(delta)) => {
                Ok(self.call_list_increment_operation(list, *delta, origins).into())
            }
            (Op::And | Op::Or, ValueType::List(_), ValueType::List(_)) => {
                self.call_type(params, origins)
            }
            // And/or with any other type requires coercion to bool
            (Op::And, v1, v2) => Ok(ValueType::Bool(v1.is_truthy()? && v2.is_truthy()?).into()),
            (Op::Or, v1, v2) => Ok(ValueType::Bool(v1.is_truthy()? || v2.is_truthy()?).into()),
            (_, ValueType::List(_), ValueType::List(_)) => self.call_type(params, origins),
            (_, v1, v2) => Err(StoryError::InvalidStoryState(format!(
                "Can not call use '{}' operation on {} and {}",
                self.name(),
                v1,
                v2
            ))),
        }
    }

    fn call_list_increment_operation(
        &self,
        list: &InkList,
        delta: i32,
        origins: &ListDefinitionsOrigin,
    ) -> ValueType {
        let mut result = InkList::new();

        for (item, value) in &list.items {
            let target = if *self == Op::Add {
                value.wrapping_add(delta)
            } else {
                value.wrapping_sub(delta)
            };

            let incremented = item
                .get_origin_name()
                .and_then(|name| origins.get_list_definition(name))
                .and_then(|def| def.get_item_with_value(target));

            if let Some(incremented) = incremented {
                result.items.insert(incremented, target);
            }
        }

        result.set_initial_origin_names(list.origin_names());

        ValueType::List(result)
    }

    fn call_type(
        &self,
        params: &[ValueType],
        origins: &ListDefinitionsOrigin,
    ) -> Result<CallResult, StoryError> {
        let unavailable = || {
            StoryError::InvalidStoryState(format!(
                "Operation '{}' not available for type {}",
                self.name(),
                params.first().map(|v| v.to_string()).unwrap_or_default()
            ))
        };

        if params.len() == 1 {
            let value = match (self, &params[0]) {
                (Op::Negate, ValueType::Int(v)) => ValueType::Int(v.wrapping_neg()),
                (Op::Negate, ValueType::Float(v)) => ValueType::Float(-v),
                (Op::Not, ValueType::Int(v)) => ValueType::Bool(*v == 0),
                (Op::Not, ValueType::Float(v)) => ValueType::Bool(*v == 0.0),
                (Op::Not, ValueType::List(l)) => ValueType::Bool(l.is_empty()),
                (Op::Floor | Op::Ceiling | Op::Int, ValueType::Int(v)) => ValueType::Int(*v),
                (Op::Floor, ValueType::Float(v)) => ValueType::Float(v.floor()),
                (Op::Ceiling, ValueType::Float(v)) => ValueType::Float(v.ceil()),
                (Op::Int, ValueType::Float(v)) => ValueType::Int(*v as i32),
                (Op::Float, ValueType::Int(v)) => ValueType::Float(*v as f32),
                (Op::Float, ValueType::Float(v)) => ValueType::Float(*v),
                (Op::ListMin, ValueType::List(l)) => ValueType::List(l.min_as_list()),
                (Op::ListMax, ValueType::List(l)) => ValueType::List(l.max_as_list()),
                (Op::All, ValueType::List(l)) => ValueType::List(l.all(origins)),
                (Op::Count, ValueType::List(l)) => ValueType::Int(l.len() as i32),
                (Op::ValueOfList, ValueType::List(l)) => {
                    ValueType::Int(l.max_item().map(|(_, v)| v).unwrap_or(0))
                }
                (Op::Invert, ValueType::List(l)) => ValueType::List(l.inverse(origins)),
                _ => return Err(unavailable()),
            };

            return Ok(value.into());
        }

        match (&params[0], &params[1]) {
            (ValueType::Int(a), ValueType::Int(b)) => self.int_op(*a, *b).ok_or_else(unavailable),
            (ValueType::Float(a), ValueType::Float(b)) => {
                self.float_op(*a, *b).map(CallResult::from).ok_or_else(unavailable)
            }
            (ValueType::String(a), ValueType::String(b)) => {
                let value = match self {
                    Op::Add => ValueType::new(format!("{}{}", a.string, b.string)),
                    Op::Equal => ValueType::Bool(a.string == b.string),
                    Op::NotEquals => ValueType::Bool(a.string != b.string),
                    Op::Has => ValueType::Bool(a.string.contains(&b.string)),
                    Op::Hasnt => ValueType::Bool(!a.string.contains(&b.string)),
                    _ => return Err(unavailable()),
                };
                Ok(value.into())
            }
            (ValueType::List(a), ValueType::List(b)) => {
                let value = match self {
                    Op::Add => ValueType::List(a.union(b)),
                    Op::Subtract => ValueType::List(a.without(b)),
                    Op::Intersect => ValueType::List(a.intersect(b)),
                    Op::Has => ValueType::Bool(a.contains(b)),
                    Op::Hasnt => ValueType::Bool(!a.contains(b)),
                    Op::Equal => ValueType::Bool(a == b),
                    Op::NotEquals => ValueType::Bool(a != b),
                    Op::Greater => ValueType::Bool(a.greater_than(b)),
                    Op::Less => ValueType::Bool(a.less_than(b)),
                    Op::GreaterThanOrEquals => ValueType::Bool(a.greater_than_or_equals(b)),
                    Op::LessThanOrEquals => ValueType::Bool(a.less_than_or_equals(b)),
                    Op::And => ValueType::Bool(!a.is_empty() && !b.is_empty()),
                    Op::Or => ValueType::Bool(!a.is_empty() || !b.is_empty()),
                    _ => return Err(unavailable()),
                };
                Ok(value.into())
            }
            (ValueType::DivertTarget(a), ValueType::DivertTarget(b)) => match self {
                Op::Equal => Ok(ValueType::Bool(a == b).into()),
                Op::NotEquals => Ok(ValueType::Bool(a != b).into()),
                _ => Err(unavailable()),
            },
            _ => Err(unavailable()),
        }
    }

    fn int_op(&self, a: i32, b: i32) -> Option<CallResult> {
        let value = match self {
            Op::Add => ValueType::Int(a.wrapping_add(b)),
            Op::Subtract => ValueType::Int(a.wrapping_sub(b)),
            Op::Multiply => ValueType::Int(a.wrapping_mul(b)),
            Op::Divide | Op::Mod => {
                let result = match (b, *self) {
                    (0, _) => None,
                    (_, Op::Divide) => Some(a.wrapping_div(b)),
                    _ => Some(a.wrapping_rem(b)),
                };

                return Some(match result {
                    Some(v) => ValueType::Int(v).into(),
                    None => CallResult {
                        value: ValueType::Int(0),
                        warning: Some(format!(
                            "Integer {} by zero ({} {} {}), using 0 instead",
                            if *self == Op::Divide { "division" } else { "modulo" },
                            a,
                            self.name(),
                            b
                        )),
                    },
                });
            }
            Op::Pow => ValueType::Float((a as f32).powf(b as f32)),
            Op::Equal => ValueType::Bool(a == b),
            Op::NotEquals => ValueType::Bool(a != b),
            Op::Greater => ValueType::Bool(a > b),
            Op::Less => ValueType::Bool(a < b),
            Op::GreaterThanOrEquals => ValueType::Bool(a >= b),
            Op::LessThanOrEquals => ValueType::Bool(a <= b),
            Op::And => ValueType::Bool(a != 0 && b != 0),
            Op::Or => ValueType::Bool(a != 0 || b != 0),
            Op::Min => ValueType::Int(a.min(b)),
            Op::Max => ValueType::Int(a.max(b)),
            _ => return None,
        };

        Some(value.into())
    }

    fn float_op(&self, a: f32, b: f32) -> Option<ValueType> {
        let value = match self {
            Op::Add => ValueType::Float(a + b),
            Op::Subtract => ValueType::Float(a - b),
            Op::Multiply => ValueType::Float(a * b),
            Op::Divide => ValueType::Float(a / b),
            Op::Mod => ValueType::Float(a % b),
            Op::Pow => ValueType::Float(a.powf(b)),
            Op::Equal => ValueType::Bool(a == b),
            Op::NotEquals => ValueType::Bool(a != b),
            Op::Greater => ValueType::Bool(a > b),
            Op::Less => ValueType::Bool(a < b),
            Op::GreaterThanOrEquals => ValueType::Bool(a >= b),
            Op::LessThanOrEquals => ValueType::Bool(a <= b),
            Op::And => ValueType::Bool(a != 0.0 && b != 0.0),
            Op::Or => ValueType::Bool(a != 0.0 || b != 0.0),
            Op::Min => ValueType::Float(a.min(b)),
            Op::Max => ValueType::Float(a.max(b)),
            _ => return None,
        };

        Some(value)
    }
}

// "Higher level" types infect both sides so that binary operations use the
// same type, e.g. an int and a float are both operated on as floats.
// Bools are lifted to ints.
fn coerce_values_to_single_type(values: Vec<ValueType>) -> Result<Vec<ValueType>, StoryError> {
    let dest_type = values
        .iter()
        .map(|v| v.get_cast_ordinal())
        .fold(CAST_INT, u8::max);

    values.iter().map(|v| v.cast(dest_type)).collect()
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Native '{}'", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(op: Op, params: Vec<ValueType>) -> CallResult {
        let origins = ListDefinitionsOrigin::default();
        op.call(params.into_iter().map(RTObject::Value).collect(), &origins)
            .unwrap()
    }

    #[test]
    fn mixed_int_float_promotes_to_float() {
        let r = call(Op::Add, vec![ValueType::Int(1), ValueType::Float(0.5)]);
        assert_eq!(Some(1.5), r.value.get::<f32>());
    }

    #[test]
    fn integer_division_by_zero_warns_and_gives_zero() {
        let r = call(Op::Divide, vec![ValueType::Int(5), ValueType::Int(0)]);
        assert_eq!(Some(0), r.value.get::<i32>());
        assert!(r.warning.is_some());

        let r = call(Op::Mod, vec![ValueType::Int(5), ValueType::Int(0)]);
        assert_eq!(Some(0), r.value.get::<i32>());
        assert!(r.warning.is_some());
    }

    #[test]
    fn int_overflow_wraps() {
        let r = call(Op::Negate, vec![ValueType::Int(i32::MIN)]);
        assert_eq!(Some(i32::MIN), r.value.get::<i32>());

        let r = call(Op::Add, vec![ValueType::Int(i32::MAX), ValueType::Int(1)]);
        assert_eq!(Some(i32::MIN), r.value.get::<i32>());

        let r = call(Op::Divide, vec![ValueType::Int(i32::MIN), ValueType::Int(-1)]);
        assert_eq!(Some(i32::MIN), r.value.get::<i32>());
        assert!(r.warning.is_none());
    }

    #[test]
    fn strings_concatenate_with_numbers() {
        let r = call(Op::Add, vec![ValueType::new("a"), ValueType::Int(1)]);
        assert_eq!(Some("a1"), r.value.get::<&str>());
    }

    #[test]
    fn void_operand_is_an_error() {
        let origins = ListDefinitionsOrigin::default();
        let r = Op::Not.call(vec![RTObject::Void], &origins);
        assert!(r.is_err());
    }

    #[test]
    fn names_round_trip() {
        for name in ["+", "==", "LIST_INVERT", "!?", "POW"] {
            assert_eq!(name, Op::from_name(name).unwrap().name());
        }
        assert!(Op::from_name("nope").is_none());
    }
}
