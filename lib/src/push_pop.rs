use crate::story_error::StoryError;

/// Kind of callstack frame.
#[derive(PartialEq, Clone, Copy, Eq, Hash, Debug)]
pub enum PushPopType {
    Tunnel,
    Function,
    FunctionEvaluationFromGame,
}

impl PushPopType {
    pub(crate) fn from_value(value: u64) -> Result<PushPopType, StoryError> {
        match value {
            0 => Ok(PushPopType::Tunnel),
            1 => Ok(PushPopType::Function),
            2 => Ok(PushPopType::FunctionEvaluationFromGame),
            _ => Err(StoryError::BadJson(format!(
                "Unexpected PushPopType value {value}"
            ))),
        }
    }

    pub(crate) fn to_value(self) -> u64 {
        match self {
            PushPopType::Tunnel => 0,
            PushPopType::Function => 1,
            PushPopType::FunctionEvaluationFromGame => 2,
        }
    }
}
