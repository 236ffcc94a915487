use strum::Display;

/// Commands embedded in content that drive the evaluator rather than
/// produce output.
#[derive(PartialEq, Eq, Display, Clone, Copy, Debug)]
pub enum CommandType {
    EvalStart,
    EvalOutput,
    EvalEnd,
    Duplicate,
    PopEvaluatedValue,
    PopFunction,
    PopTunnel,
    BeginString,
    EndString,
    NoOp,
    ChoiceCount,
    Turns,
    TurnsSince,
    ReadCount,
    Random,
    SeedRandom,
    VisitIndex,
    SequenceShuffleIndex,
    StartThread,
    Done,
    End,
    ListFromInt,
    ListRange,
    ListRandom,
    BeginTag,
    EndTag,
}

const EVAL_START_NAME: &str = "ev";
const EVAL_OUTPUT_NAME: &str = "out";
const EVAL_END_NAME: &str = "/ev";
const DUPLICATE_NAME: &str = "du";
const POP_EVALUATED_VALUE_NAME: &str = "pop";
const POP_FUNCTION_NAME: &str = "~ret";
const POP_TUNNEL_NAME: &str = "->->";
const BEGIN_STRING_NAME: &str = "str";
const END_STRING_NAME: &str = "/str";
const NO_OP_NAME: &str = "nop";
const CHOICE_COUNT_NAME: &str = "choiceCnt";
const TURNS_NAME: &str = "turn";
const TURNS_SINCE_NAME: &str = "turns";
const READ_COUNT_NAME: &str = "readc";
const RANDOM_NAME: &str = "rnd";
const SEED_RANDOM_NAME: &str = "srnd";
const VISIT_INDEX_NAME: &str = "visit";
const SEQUENCE_SHUFFLE_INDEX_NAME: &str = "seq";
const START_THREAD_NAME: &str = "thread";
const DONE_NAME: &str = "done";
const END_NAME: &str = "end";
const LIST_FROM_INT_NAME: &str = "listInt";
const LIST_RANGE_NAME: &str = "range";
const LIST_RANDOM_NAME: &str = "lrnd";
const BEGIN_TAG_NAME: &str = "#";
const END_TAG_NAME: &str = "/#";

impl CommandType {
    pub fn from_name(name: &str) -> Option<Self> {
        let command = match name {
            EVAL_START_NAME => CommandType::EvalStart,
            EVAL_OUTPUT_NAME => CommandType::EvalOutput,
            EVAL_END_NAME => CommandType::EvalEnd,
            DUPLICATE_NAME => CommandType::Duplicate,
            POP_EVALUATED_VALUE_NAME => CommandType::PopEvaluatedValue,
            POP_FUNCTION_NAME => CommandType::PopFunction,
            POP_TUNNEL_NAME => CommandType::PopTunnel,
            BEGIN_STRING_NAME => CommandType::BeginString,
            END_STRING_NAME => CommandType::EndString,
            NO_OP_NAME => CommandType::NoOp,
            CHOICE_COUNT_NAME => CommandType::ChoiceCount,
            TURNS_NAME => CommandType::Turns,
            TURNS_SINCE_NAME => CommandType::TurnsSince,
            READ_COUNT_NAME => CommandType::ReadCount,
            RANDOM_NAME => CommandType::Random,
            SEED_RANDOM_NAME => CommandType::SeedRandom,
            VISIT_INDEX_NAME => CommandType::VisitIndex,
            SEQUENCE_SHUFFLE_INDEX_NAME => CommandType::SequenceShuffleIndex,
            START_THREAD_NAME => CommandType::StartThread,
            DONE_NAME => CommandType::Done,
            END_NAME => CommandType::End,
            LIST_FROM_INT_NAME => CommandType::ListFromInt,
            LIST_RANGE_NAME => CommandType::ListRange,
            LIST_RANDOM_NAME => CommandType::ListRandom,
            BEGIN_TAG_NAME => CommandType::BeginTag,
            END_TAG_NAME => CommandType::EndTag,
            _ => return None,
        };

        Some(command)
    }

    /// Name used for the command in compiled JSON.
    pub fn name(&self) -> &'static str {
        match self {
            CommandType::EvalStart => EVAL_START_NAME,
            CommandType::EvalOutput => EVAL_OUTPUT_NAME,
            CommandType::EvalEnd => EVAL_END_NAME,
            CommandType::Duplicate => DUPLICATE_NAME,
            CommandType::PopEvaluatedValue => POP_EVALUATED_VALUE_NAME,
            CommandType::PopFunction => POP_FUNCTION_NAME,
            CommandType::PopTunnel => POP_TUNNEL_NAME,
            CommandType::BeginString => BEGIN_STRING_NAME,
            CommandType::EndString => END_STRING_NAME,
            CommandType::NoOp => NO_OP_NAME,
            CommandType::ChoiceCount => CHOICE_COUNT_NAME,
            CommandType::Turns => TURNS_NAME,
            CommandType::TurnsSince => TURNS_SINCE_NAME,
            CommandType::ReadCount => READ_COUNT_NAME,
            CommandType::Random => RANDOM_NAME,
            CommandType::SeedRandom => SEED_RANDOM_NAME,
            CommandType::VisitIndex => VISIT_INDEX_NAME,
            CommandType::SequenceShuffleIndex => SEQUENCE_SHUFFLE_INDEX_NAME,
            CommandType::StartThread => START_THREAD_NAME,
            CommandType::Done => DONE_NAME,
            CommandType::End => END_NAME,
            CommandType::ListFromInt => LIST_FROM_INT_NAME,
            CommandType::ListRange => LIST_RANGE_NAME,
            CommandType::ListRandom => LIST_RANDOM_NAME,
            CommandType::BeginTag => BEGIN_TAG_NAME,
            CommandType::EndTag => END_TAG_NAME,
        }
    }
}
