use std::{collections::HashMap, rc::Rc};

use rand::Rng;
use serde_json::{json, Map};
use tracing::debug;

use crate::{
    callstack::CallStack,
    choice::Choice,
    container::{ContainerArena, ContainerId},
    control_command::CommandType,
    flow::Flow,
    json::{json_read, json_write},
    list_definitions_origin::ListDefinitionsOrigin,
    object::RTObject,
    path::Path,
    pointer::Pointer,
    push_pop::PushPopType,
    state_patch::PatchedMap,
    story::INK_VERSION_CURRENT,
    story_error::StoryError,
    value_type::{StringValue, ValueType},
    variable_assignment::VariableAssignment,
    variables_state::VariablesState,
};

/// Version of the saved state format written by [`StoryState::to_json`].
pub const INK_SAVE_STATE_VERSION: i64 = 10;
/// Oldest saved state format that can still be loaded.
pub const MIN_COMPATIBLE_LOAD_VERSION: i64 = 8;

pub(crate) const DEFAULT_FLOW_NAME: &str = "DEFAULT_FLOW";

/// The parts of the current flow a host function evaluation can disturb.
pub(crate) struct FlowCheckpoint {
    flow: Flow,
    evaluation_stack_height: usize,
    did_safe_exit: bool,
}

/// Everything that changes while a story runs. Cloning a state gives an
/// independent snapshot that can be restored later.
#[derive(Clone)]
pub(crate) struct StoryState {
    content: Rc<ContainerArena>,
    list_definitions: Rc<ListDefinitionsOrigin>,
    pub current_flow: Flow,
    /// Every flow but the current one.
    named_flows: HashMap<String, Flow>,
    pub variables_state: VariablesState,
    pub evaluation_stack: Vec<RTObject>,
    pub diverted_pointer: Pointer,
    pub visit_counts: PatchedMap<i32>,
    pub turn_indices: PatchedMap<i32>,
    pub current_turn_index: i32,
    pub story_seed: i32,
    pub previous_random: i32,
    pub did_safe_exit: bool,
    current_errors: Vec<String>,
    current_warnings: Vec<String>,
}

impl StoryState {
    pub fn new(content: Rc<ContainerArena>, list_definitions: Rc<ListDefinitionsOrigin>) -> StoryState {
        let current_flow = Flow::new(DEFAULT_FLOW_NAME, &content);

        let story_seed = rand::thread_rng().gen_range(0..100);

        let mut state = StoryState {
            current_flow,
            named_flows: HashMap::new(),
            variables_state: VariablesState::new(list_definitions.clone()),
            evaluation_stack: Vec::new(),
            diverted_pointer: Pointer::NULL,
            visit_counts: PatchedMap::new(),
            turn_indices: PatchedMap::new(),
            current_turn_index: -1,
            story_seed,
            previous_random: 0,
            did_safe_exit: false,
            current_errors: Vec::new(),
            current_warnings: Vec::new(),
            content,
            list_definitions,
        };

        state.go_to_start();

        state
    }

    fn go_to_start(&mut self) {
        let root = self.content.root();
        self.set_current_pointer(Pointer::start_of(root));
    }

    pub fn can_continue(&self) -> bool {
        !self.get_current_pointer().is_null() && !self.has_error()
    }

    pub fn callstack(&self) -> &CallStack {
        &self.current_flow.callstack
    }

    pub fn callstack_mut(&mut self) -> &mut CallStack {
        &mut self.current_flow.callstack
    }

    pub fn get_current_pointer(&self) -> Pointer {
        self.callstack().get_current_element().current_pointer
    }

    pub fn set_current_pointer(&mut self, pointer: Pointer) {
        self.callstack_mut().get_current_element_mut().current_pointer = pointer;
    }

    pub fn get_previous_pointer(&self) -> Pointer {
        self.callstack().get_current_thread().previous_pointer
    }

    pub fn set_previous_pointer(&mut self, pointer: Pointer) {
        self.callstack_mut().get_current_thread_mut().previous_pointer = pointer;
    }

    pub fn get_in_expression_evaluation(&self) -> bool {
        self.callstack().get_current_element().in_expression_evaluation
    }

    pub fn set_in_expression_evaluation(&mut self, value: bool) {
        self.callstack_mut()
            .get_current_element_mut()
            .in_expression_evaluation = value;
    }

    pub fn get_output_stream(&self) -> &Vec<RTObject> {
        &self.current_flow.output_stream
    }

    pub fn reset_output(&mut self, objs: Option<Vec<RTObject>>) {
        self.current_flow.output_stream = objs.unwrap_or_default();
    }

    /// Choices generated so far, including invisible defaults.
    pub fn get_generated_choices(&self) -> &Vec<Choice> {
        &self.current_flow.current_choices
    }

    pub fn get_generated_choices_mut(&mut self) -> &mut Vec<Choice> {
        &mut self.current_flow.current_choices
    }

    /// Choices are only offered once the flow can't continue.
    pub fn get_current_choices(&self) -> &[Choice] {
        if self.can_continue() {
            return &[];
        }

        &self.current_flow.current_choices
    }

    pub fn has_error(&self) -> bool {
        !self.current_errors.is_empty()
    }

    pub fn has_warning(&self) -> bool {
        !self.current_warnings.is_empty()
    }

    pub fn get_current_errors(&self) -> &Vec<String> {
        &self.current_errors
    }

    pub fn get_current_warnings(&self) -> &Vec<String> {
        &self.current_warnings
    }

    pub(crate) fn add_error(&mut self, message: String, is_warning: bool) {
        if is_warning {
            self.current_warnings.push(message);
        } else {
            self.current_errors.push(message);
        }
    }

    pub(crate) fn reset_warnings(&mut self) {
        self.current_warnings.clear();
    }

    pub(crate) fn reset_errors(&mut self) {
        self.current_errors.clear();
        self.current_warnings.clear();
    }

    pub fn in_string_evaluation(&self) -> bool {
        self.get_output_stream()
            .iter()
            .rev()
            .any(|e| e.is_command(CommandType::BeginString))
    }

    pub fn get_current_text(&self) -> String {
        let mut sb = String::new();
        let mut in_tag = false;

        for output_obj in self.get_output_stream() {
            match output_obj {
                RTObject::Value(ValueType::String(text)) if !in_tag => sb.push_str(&text.string),
                RTObject::ControlCommand(CommandType::BeginTag) => in_tag = true,
                RTObject::ControlCommand(CommandType::EndTag) => in_tag = false,
                _ => {}
            }
        }

        StoryState::clean_output_whitespace(&sb)
    }

    pub fn get_current_tags(&self) -> Vec<String> {
        let mut tags = Vec::new();
        let mut in_tag = false;
        let mut sb = String::new();

        for output_obj in self.get_output_stream() {
            match output_obj {
                RTObject::ControlCommand(CommandType::BeginTag) => {
                    if in_tag && !sb.is_empty() {
                        tags.push(Self::clean_output_whitespace(&sb));
                        sb.clear();
                    }
                    in_tag = true;
                }
                RTObject::ControlCommand(CommandType::EndTag) => {
                    if !sb.is_empty() {
                        tags.push(Self::clean_output_whitespace(&sb));
                        sb.clear();
                    }
                    in_tag = false;
                }
                RTObject::Value(ValueType::String(s)) if in_tag => sb.push_str(&s.string),
                // Legacy tags already carry cleaned text.
                RTObject::Tag(text) if !in_tag && !text.is_empty() => tags.push(text.clone()),
                _ => {}
            }
        }

        if !sb.is_empty() {
            tags.push(Self::clean_output_whitespace(&sb));
        }

        tags
    }

    /// Collapses runs of inline whitespace to a single space and drops it at
    /// the start and end of lines.
    pub fn clean_output_whitespace(input_str: &str) -> String {
        let mut sb = String::with_capacity(input_str.len());
        let mut current_whitespace_start: i32 = -1;
        let mut start_of_line = 0;

        for (i, c) in input_str.chars().enumerate() {
            let i = i as i32;
            let is_inline_whitespace = c == ' ' || c == '\t';

            if is_inline_whitespace && current_whitespace_start == -1 {
                current_whitespace_start = i;
            }

            if !is_inline_whitespace {
                if c != '\n' && current_whitespace_start > 0 && current_whitespace_start != start_of_line {
                    sb.push(' ');
                }
                current_whitespace_start = -1;
            }

            if c == '\n' {
                start_of_line = i + 1;
            }

            if !is_inline_whitespace {
                sb.push(c);
            }
        }

        sb
    }

    pub fn output_stream_ends_in_newline(&self) -> bool {
        for e in self.get_output_stream().iter().rev() {
            match e {
                RTObject::ControlCommand(_) => break,
                RTObject::Value(ValueType::String(text)) => {
                    if text.is_newline {
                        return true;
                    } else if text.is_non_whitespace() {
                        break;
                    }
                }
                _ => {}
            }
        }

        false
    }

    fn output_stream_contains_content(&self) -> bool {
        self.get_output_stream()
            .iter()
            .any(|o| matches!(o, RTObject::Value(ValueType::String(_))))
    }

    pub fn push_evaluation_stack(&mut self, obj: RTObject) {
        self.evaluation_stack.push(obj);
    }

    pub fn pop_evaluation_stack(&mut self) -> Result<RTObject, StoryError> {
        self.evaluation_stack.pop().ok_or(StoryError::StackUnderflow)
    }

    /// Pops a value, failing if the top of the stack isn't one.
    pub fn pop_evaluation_value(&mut self) -> Result<ValueType, StoryError> {
        match self.pop_evaluation_stack()? {
            RTObject::Value(v) => Ok(v),
            other => Err(StoryError::InvalidStoryState(format!(
                "Expected a value on the evaluation stack, found {other}"
            ))),
        }
    }

    pub fn peek_evaluation_stack(&self) -> Option<&RTObject> {
        self.evaluation_stack.last()
    }

    /// Pops `number_of_objects`, returned in the order they were pushed.
    pub fn pop_evaluation_stack_multiple(
        &mut self,
        number_of_objects: usize,
    ) -> Result<Vec<RTObject>, StoryError> {
        if number_of_objects > self.evaluation_stack.len() {
            return Err(StoryError::StackUnderflow);
        }

        let start = self.evaluation_stack.len() - number_of_objects;
        Ok(self.evaluation_stack.drain(start..).collect())
    }

    pub fn push_to_output_stream(&mut self, obj: RTObject) {
        if let RTObject::Value(ValueType::String(s)) = &obj {
            if let Some(list_text) = StoryState::try_splitting_head_tail_whitespace(&s.string) {
                for text_obj in list_text {
                    self.push_to_output_stream_individual(RTObject::Value(ValueType::String(text_obj)));
                }
                return;
            }
        }

        self.push_to_output_stream_individual(obj);
    }

    pub fn pop_from_output_stream(&mut self, count: usize) {
        let output_stream = &mut self.current_flow.output_stream;
        let start = output_stream.len().saturating_sub(count);
        output_stream.truncate(start);
    }

    /// Splits leading and trailing newlines (and the inline whitespace around
    /// them) off a piece of text, so that glue and function trimming can
    /// deal with them separately.
    fn try_splitting_head_tail_whitespace(text: &str) -> Option<Vec<StringValue>> {
        let bytes = text.as_bytes();

        let mut head_first_newline_idx = None;
        let mut head_last_newline_idx = 0;
        for (i, c) in bytes.iter().enumerate() {
            match c {
                b'\n' => {
                    head_first_newline_idx.get_or_insert(i);
                    head_last_newline_idx = i;
                }
                b' ' | b'\t' => continue,
                _ => break,
            }
        }

        let mut tail_last_newline_idx = None;
        let mut tail_first_newline_idx = 0;
        for (i, c) in bytes.iter().enumerate().rev() {
            match c {
                b'\n' => {
                    tail_last_newline_idx.get_or_insert(i);
                    tail_first_newline_idx = i;
                }
                b' ' | b'\t' => continue,
                _ => break,
            }
        }

        if head_first_newline_idx.is_none() && tail_last_newline_idx.is_none() {
            return None;
        }

        let mut list_texts = Vec::new();
        let mut inner_str_start = 0;
        let mut inner_str_end = text.len();

        if let Some(head_first) = head_first_newline_idx {
            if head_first > 0 {
                list_texts.push(StringValue::new(&text[..head_first]));
            }
            list_texts.push(StringValue::new("\n"));
            inner_str_start = head_last_newline_idx + 1;
        }

        if tail_last_newline_idx.is_some() {
            inner_str_end = tail_first_newline_idx;
        }

        if inner_str_end > inner_str_start {
            list_texts.push(StringValue::new(&text[inner_str_start..inner_str_end]));
        }

        if let Some(tail_last) = tail_last_newline_idx {
            let after_head = head_first_newline_idx.map_or(true, |_| tail_first_newline_idx > head_last_newline_idx);
            if after_head {
                list_texts.push(StringValue::new("\n"));
                if tail_last < text.len() - 1 {
                    list_texts.push(StringValue::new(&text[tail_last + 1..]));
                }
            }
        }

        Some(list_texts)
    }

    fn push_to_output_stream_individual(&mut self, obj: RTObject) {
        let mut include_in_output = true;

        match &obj {
            // New glue, so chomp away any whitespace from the end of the stream
            RTObject::Glue => self.trim_newlines_from_output_stream(),
            // New text: do we really want to append it, if it's whitespace?
            // It's thrown away when trimming the start of a function's
            // output, or when following glue.
            RTObject::Value(ValueType::String(text)) => {
                let mut function_trim_index: i32 = -1;

                let curr_el = self.callstack().get_current_element();
                if curr_el.push_pop_type == PushPopType::Function {
                    function_trim_index = curr_el.function_start_in_output_stream;
                }

                let mut glue_trim_index: i32 = -1;
                for (i, o) in self.get_output_stream().iter().enumerate().rev() {
                    match o {
                        RTObject::Glue => {
                            glue_trim_index = i as i32;
                            break;
                        }
                        RTObject::ControlCommand(CommandType::BeginString) => {
                            if i as i32 >= function_trim_index {
                                function_trim_index = -1;
                            }
                            break;
                        }
                        _ => {}
                    }
                }

                let trim_index = match (glue_trim_index, function_trim_index) {
                    (-1, f) => f,
                    (g, -1) => g,
                    (g, f) => g.min(f),
                };

                if trim_index != -1 {
                    if text.is_newline {
                        include_in_output = false;
                    } else if text.is_non_whitespace() {
                        if glue_trim_index > -1 {
                            self.remove_existing_glue();
                        }

                        if function_trim_index > -1 {
                            for el in self.callstack_mut().get_callstack_mut().iter_mut().rev() {
                                if el.push_pop_type == PushPopType::Function {
                                    el.function_start_in_output_stream = -1;
                                } else {
                                    break;
                                }
                            }
                        }
                    }
                } else if text.is_newline
                    && (self.output_stream_ends_in_newline() || !self.output_stream_contains_content())
                {
                    include_in_output = false;
                }
            }
            _ => {}
        }

        if include_in_output {
            self.current_flow.output_stream.push(obj);
        }
    }

    fn trim_newlines_from_output_stream(&mut self) {
        let output_stream = &mut self.current_flow.output_stream;

        // Work back to the first newline of the trailing run of whitespace.
        let mut remove_whitespace_from = None;
        for (i, obj) in output_stream.iter().enumerate().rev() {
            match obj {
                RTObject::ControlCommand(_) => break,
                RTObject::Value(ValueType::String(sv)) => {
                    if sv.is_non_whitespace() {
                        break;
                    } else if sv.is_newline {
                        remove_whitespace_from = Some(i);
                    }
                }
                _ => {}
            }
        }

        if let Some(from) = remove_whitespace_from {
            let mut i = from;
            while i < output_stream.len() {
                if matches!(output_stream[i], RTObject::Value(ValueType::String(_))) {
                    output_stream.remove(i);
                } else {
                    i += 1;
                }
            }
        }
    }

    fn remove_existing_glue(&mut self) {
        let output_stream = &mut self.current_flow.output_stream;

        let mut i = output_stream.len();
        while i > 0 {
            i -= 1;
            match output_stream[i] {
                RTObject::Glue => {
                    output_stream.remove(i);
                }
                RTObject::ControlCommand(_) => break,
                _ => {}
            }
        }
    }

    fn container_path_string(&self, container: ContainerId) -> String {
        self.content.get(container).get_path().to_string()
    }

    pub fn increment_visit_count_for_container(&mut self, container: ContainerId) {
        let path = self.container_path_string(container);
        let count = self.visit_counts.get(&path).copied().unwrap_or(0);
        self.visit_counts.insert(path, count + 1);
    }

    pub fn visit_count_for_container(&self, container: ContainerId) -> Result<i32, StoryError> {
        let c = self.content.get(container);
        if !c.visits_should_be_counted {
            return Err(StoryError::InvalidStoryState(format!(
                "Read count for target ({}) unknown.",
                c.get_path()
            )));
        }

        Ok(self
            .visit_counts
            .get(&self.container_path_string(container))
            .copied()
            .unwrap_or(0))
    }

    pub fn record_turn_index_visit_to_container(&mut self, container: ContainerId) {
        let path = self.container_path_string(container);
        self.turn_indices.insert(path, self.current_turn_index);
    }

    pub(crate) fn turns_since_for_container(&self, container: ContainerId) -> Result<i32, StoryError> {
        let c = self.content.get(container);
        if !c.turn_index_should_be_counted {
            return Err(StoryError::InvalidStoryState(format!(
                "TURNS_SINCE() for target ({}) unknown.",
                c.get_path()
            )));
        }

        Ok(self
            .turn_indices
            .get(&self.container_path_string(container))
            .map(|index| self.current_turn_index - index)
            .unwrap_or(-1))
    }

    pub fn visit_count_at_path_string(&self, path_string: &str) -> Result<i32, StoryError> {
        let path = Path::new_with_components_string(path_string);
        if self.content.container_with_path(&path).is_none() {
            return Err(StoryError::PathNotFound(format!(
                "Content at path not found: {path_string}"
            )));
        }

        Ok(self.visit_counts.get(path_string).copied().unwrap_or(0))
    }

    pub fn assign_variable(
        &mut self,
        var_ass: &VariableAssignment,
        value: ValueType,
    ) -> Result<(), StoryError> {
        self.variables_state
            .assign(var_ass, value, &mut self.current_flow.callstack)
    }

    pub fn get_variable_with_name(&self, name: &str, context_index: i32) -> Option<ValueType> {
        self.variables_state
            .get_variable_with_name(name, context_index, &self.current_flow.callstack)
    }

    pub fn try_exit_function_evaluation_from_game(&mut self) -> bool {
        if self.callstack().get_current_element().push_pop_type
            == PushPopType::FunctionEvaluationFromGame
        {
            self.set_current_pointer(Pointer::NULL);
            self.did_safe_exit = true;
            return true;
        }

        false
    }

    pub fn pop_callstack(&mut self, t: Option<PushPopType>) -> Result<(), StoryError> {
        // Add the end of a function call, trim any whitespace from the end.
        if self.callstack().get_current_element().push_pop_type == PushPopType::Function {
            self.trim_whitespace_from_function_end();
        }

        self.callstack_mut().pop(t)
    }

    // The start of a function's output is trimmed as it is generated, the
    // end is trimmed in one go when the function is popped.
    fn trim_whitespace_from_function_end(&mut self) {
        let function_start_point = match self
            .callstack()
            .get_current_element()
            .function_start_in_output_stream
        {
            -1 => 0,
            start_point => start_point.max(0) as usize,
        };

        let output_stream = &mut self.current_flow.output_stream;
        let mut i = output_stream.len();
        while i > function_start_point {
            i -= 1;
            match &output_stream[i] {
                RTObject::ControlCommand(_) => break,
                RTObject::Value(ValueType::String(txt)) => {
                    if txt.is_newline || txt.is_inline_whitespace {
                        output_stream.remove(i);
                    } else {
                        break;
                    }
                }
                _ => {}
            }
        }
    }

    pub fn set_chosen_path(&mut self, path: &Path, incrementing_turn_index: bool) -> Result<(), StoryError> {
        let mut new_pointer = self.content.pointer_at_path(path)?;
        if !new_pointer.is_null() && new_pointer.index == -1 {
            new_pointer.index = 0;
        }

        // Changing direction, assume we need to clear current set of choices
        self.current_flow.current_choices.clear();

        self.set_current_pointer(new_pointer);

        if incrementing_turn_index {
            self.current_turn_index += 1;
        }

        Ok(())
    }

    pub(crate) fn force_end(&mut self) {
        self.callstack_mut().reset();

        self.current_flow.current_choices.clear();

        self.set_current_pointer(Pointer::NULL);
        self.set_previous_pointer(Pointer::NULL);

        self.did_safe_exit = true;
    }

    pub fn flow_checkpoint(&self) -> FlowCheckpoint {
        FlowCheckpoint {
            flow: self.current_flow.clone(),
            evaluation_stack_height: self.evaluation_stack.len(),
            did_safe_exit: self.did_safe_exit,
        }
    }

    /// Puts the current flow back as it was at the checkpoint. Errors and
    /// warnings raised since then stay buffered.
    pub fn restore_flow_checkpoint(&mut self, checkpoint: FlowCheckpoint) {
        self.current_flow = checkpoint.flow;
        self.evaluation_stack
            .truncate(checkpoint.evaluation_stack_height);
        self.did_safe_exit = checkpoint.did_safe_exit;
    }

    /// Makes later writes to globals, visit counts and turn indices go to
    /// a patch, leaving the maps shared with clones taken before untouched.
    pub fn start_patching(&mut self) {
        self.visit_counts.start_patching();
        self.turn_indices.start_patching();
        self.variables_state.start_patching();
    }

    pub fn apply_any_patch(&mut self) {
        self.visit_counts.apply_patch();
        self.turn_indices.apply_patch();
        self.variables_state.apply_patch();
    }

    pub fn start_function_evaluation_from_game(
        &mut self,
        func_container: ContainerId,
        arguments: &[ValueType],
    ) {
        let height = self.evaluation_stack.len();
        self.callstack_mut()
            .push(PushPopType::FunctionEvaluationFromGame, height, 0);
        self.set_current_pointer(Pointer::start_of(func_container));

        self.pass_arguments_to_evaluation_stack(arguments);
    }

    pub fn pass_arguments_to_evaluation_stack(&mut self, arguments: &[ValueType]) {
        for arg in arguments {
            self.push_evaluation_stack(RTObject::Value(arg.clone()));
        }
    }

    /// Pops the host function call frame, returning what the function
    /// returned. Extra values left on the stack are discarded.
    pub fn complete_function_evaluation_from_game(&mut self) -> Result<Option<ValueType>, StoryError> {
        if self.callstack().get_current_element().push_pop_type
            != PushPopType::FunctionEvaluationFromGame
        {
            return Err(StoryError::InvalidStoryState(format!(
                "Expected external function evaluation to be complete. Stack trace: {}",
                self.callstack().get_callstack_trace(&self.content)
            )));
        }

        let original_evaluation_stack_height = self
            .callstack()
            .get_current_element()
            .evaluation_stack_height_when_pushed;

        let mut returned_obj = None;
        while self.evaluation_stack.len() > original_evaluation_stack_height {
            let popped_obj = self.pop_evaluation_stack()?;
            if returned_obj.is_none() {
                returned_obj = Some(popped_obj);
            }
        }

        self.callstack_mut()
            .pop(Some(PushPopType::FunctionEvaluationFromGame))?;

        Ok(match returned_obj {
            Some(RTObject::Value(v)) => Some(v),
            _ => None,
        })
    }

    pub fn current_flow_name(&self) -> &str {
        &self.current_flow.name
    }

    pub fn current_flow_is_default_flow(&self) -> bool {
        self.current_flow.name == DEFAULT_FLOW_NAME
    }

    /// Names of every flow but the default one, sorted.
    pub fn alive_flow_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .named_flows
            .keys()
            .chain(std::iter::once(&self.current_flow.name))
            .filter(|n| n.as_str() != DEFAULT_FLOW_NAME)
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub(crate) fn switch_flow_internal(&mut self, flow_name: &str) {
        if flow_name == self.current_flow.name {
            return;
        }

        let next_flow = self
            .named_flows
            .remove(flow_name)
            .unwrap_or_else(|| Flow::new(flow_name, &self.content));

        let previous = std::mem::replace(&mut self.current_flow, next_flow);
        let previous_name = previous.name.clone();
        self.named_flows.insert(previous_name.clone(), previous);

        debug!(from = %previous_name, to = flow_name, "switched flow");
    }

    pub(crate) fn remove_flow_internal(&mut self, flow_name: &str) -> Result<(), StoryError> {
        if flow_name == DEFAULT_FLOW_NAME {
            return Err(StoryError::BadArgument(
                "Cannot destroy default flow".to_owned(),
            ));
        }

        // If we're currently in the flow that's being removed, switch back to default
        if self.current_flow.name == flow_name {
            self.switch_to_default_flow_internal();
        }

        self.named_flows.remove(flow_name);

        Ok(())
    }

    pub(crate) fn switch_to_default_flow_internal(&mut self) {
        self.switch_flow_internal(DEFAULT_FLOW_NAME);
    }

    pub fn to_json(&self) -> Result<String, StoryError> {
        Ok(self.write_json()?.to_string())
    }

    fn write_json(&self) -> Result<serde_json::Value, StoryError> {
        let mut obj: Map<String, serde_json::Value> = Map::new();

        let mut flows: Map<String, serde_json::Value> = Map::new();
        flows.insert(
            self.current_flow.name.clone(),
            self.current_flow.write_json(&self.content)?,
        );
        for (k, v) in &self.named_flows {
            flows.insert(k.clone(), v.write_json(&self.content)?);
        }

        obj.insert("flows".to_owned(), serde_json::Value::Object(flows));
        obj.insert("currentFlowName".to_owned(), json!(self.current_flow.name));
        obj.insert("variablesState".to_owned(), self.variables_state.write_json());
        obj.insert(
            "evalStack".to_owned(),
            json_write::write_list_rt_objs(&self.evaluation_stack)?,
        );

        if let Some(path) = self.diverted_pointer.get_path(&self.content) {
            obj.insert(
                "currentDivertTarget".to_owned(),
                json!(path.get_components_string()),
            );
        }

        obj.insert(
            "visitCounts".to_owned(),
            json_write::write_int_dictionary(self.visit_counts.iter()),
        );
        obj.insert(
            "turnIndices".to_owned(),
            json_write::write_int_dictionary(self.turn_indices.iter()),
        );

        obj.insert("turnIdx".to_owned(), json!(self.current_turn_index));
        obj.insert("storySeed".to_owned(), json!(self.story_seed));
        obj.insert("previousRandom".to_owned(), json!(self.previous_random));
        obj.insert("inkSaveVersion".to_owned(), json!(INK_SAVE_STATE_VERSION));
        obj.insert("inkFormatVersion".to_owned(), json!(INK_VERSION_CURRENT));

        Ok(serde_json::Value::Object(obj))
    }

    /// Builds the state described by `save_string`. `self` provides the
    /// story content and the default global values and is left untouched.
    pub fn load_json(&self, save_string: &str) -> Result<StoryState, StoryError> {
        let j_object: serde_json::Value = serde_json::from_str(save_string)
            .map_err(|e| StoryError::CorruptState(format!("State not in JSON format: {e}")))?;

        let mut state = StoryState::new(self.content.clone(), self.list_definitions.clone());
        state.variables_state = self.variables_state.clone();
        state.load_json_obj(&j_object)?;

        debug!(flows = state.named_flows.len() + 1, "loaded story state");

        Ok(state)
    }

    fn load_json_obj(&mut self, j_object: &serde_json::Value) -> Result<(), StoryError> {
        let corrupt = |what: &str| StoryError::CorruptState(format!("Invalid {what} in saved state"));

        let version = j_object
            .get("inkSaveVersion")
            .and_then(|v| v.as_i64())
            .ok_or_else(|| {
                StoryError::CorruptState("ink save format incorrect, can't load.".to_owned())
            })?;

        if version < MIN_COMPATIBLE_LOAD_VERSION {
            return Err(StoryError::CorruptState(format!(
                "Ink save format isn't compatible with the current version (saw '{version}', but minimum is {MIN_COMPATIBLE_LOAD_VERSION}), so can't load."
            )));
        }

        match j_object.get("flows") {
            Some(flows_obj) => {
                let flows_obj_dict = flows_obj.as_object().ok_or_else(|| corrupt("flows"))?;

                let mut flows: HashMap<String, Flow> = HashMap::with_capacity(flows_obj_dict.len());
                for (name, flow_obj) in flows_obj_dict {
                    let flow_obj = flow_obj.as_object().ok_or_else(|| corrupt("flow"))?;
                    flows.insert(name.clone(), Flow::from_json(name, &self.content, flow_obj)?);
                }

                let current_flow_name = j_object
                    .get("currentFlowName")
                    .and_then(|n| n.as_str())
                    .or_else(|| flows.keys().next().map(|k| k.as_str()))
                    .map(str::to_owned)
                    .ok_or_else(|| corrupt("flows"))?;

                self.current_flow = flows
                    .remove(&current_flow_name)
                    .ok_or_else(|| corrupt("currentFlowName"))?;
                self.named_flows = flows;
            }
            // Older saves hold the single flow at the top level.
            None => {
                let mut flow_obj = Map::new();
                for (from, to) in [
                    ("callstackThreads", "callstack"),
                    ("outputStream", "outputStream"),
                    ("currentChoices", "currentChoices"),
                    ("choiceThreads", "choiceThreads"),
                ] {
                    if let Some(v) = j_object.get(from) {
                        flow_obj.insert(to.to_owned(), v.clone());
                    }
                }

                self.current_flow = Flow::from_json(DEFAULT_FLOW_NAME, &self.content, &flow_obj)?;
                self.named_flows.clear();
            }
        }

        let variables_state_obj = j_object
            .get("variablesState")
            .and_then(|v| v.as_object())
            .ok_or_else(|| corrupt("variablesState"))?;
        self.variables_state
            .load_json(variables_state_obj)
            .map_err(|e| StoryError::CorruptState(e.to_string()))?;

        let eval_stack = j_object
            .get("evalStack")
            .and_then(|e| e.as_array())
            .ok_or_else(|| corrupt("evalStack"))?;
        self.evaluation_stack = json_read::jarray_to_runtime_obj_list(eval_stack)
            .map_err(|e| StoryError::CorruptState(e.to_string()))?;

        if let Some(current_divert_target_path) = j_object.get("currentDivertTarget").and_then(|p| p.as_str()) {
            let divert_path = Path::new_with_components_string(current_divert_target_path);
            self.diverted_pointer = self
                .content
                .pointer_at_path(&divert_path)
                .map_err(|e| StoryError::CorruptState(e.to_string()))?;
        }

        let int_map = |key: &str| -> Result<HashMap<String, i32>, StoryError> {
            match j_object.get(key) {
                Some(obj) => json_read::jobject_to_int_hashmap(obj.as_object().ok_or_else(|| corrupt(key))?)
                    .map_err(|e| StoryError::CorruptState(e.to_string())),
                None => Ok(HashMap::new()),
            }
        };
        self.visit_counts = int_map("visitCounts")?.into();
        self.turn_indices = int_map("turnIndices")?.into();

        let int_field = |key: &str| -> Result<Option<i32>, StoryError> {
            j_object
                .get(key)
                .map(|v| v.as_i64().map(|i| i as i32).ok_or_else(|| corrupt(key)))
                .transpose()
        };
        self.current_turn_index = int_field("turnIdx")?.ok_or_else(|| corrupt("turnIdx"))?;
        self.story_seed = int_field("storySeed")?.ok_or_else(|| corrupt("storySeed"))?;
        // Some saves omit it.
        self.previous_random = int_field("previousRandom")?.unwrap_or(0);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_is_collapsed_and_trimmed_at_line_edges() {
        assert_eq!(
            "a b\nc",
            StoryState::clean_output_whitespace("a   b\n  c")
        );
        assert_eq!("x\n", StoryState::clean_output_whitespace("x  \n"));
    }

    #[test]
    fn head_and_tail_newlines_are_split_off() {
        let parts: Vec<String> = StoryState::try_splitting_head_tail_whitespace("\nhello \n ")
            .unwrap()
            .into_iter()
            .map(|s| s.string)
            .collect();
        assert_eq!(vec!["\n", "hello ", "\n", " "], parts);

        assert!(StoryState::try_splitting_head_tail_whitespace("plain text").is_none());
        let only_newline = StoryState::try_splitting_head_tail_whitespace("\n").unwrap();
        assert_eq!(1, only_newline.len());
    }

    fn empty_state() -> StoryState {
        let (_, arena, defs) = json_read::load_from_string(
            r##"{"inkVersion":21,"root":[["^Line.","\n",["done",{"#n":"g-0"}],null],"done",null],"listDefs":{}}"##,
        )
        .unwrap();
        StoryState::new(Rc::new(arena), Rc::new(defs))
    }

    #[test]
    fn glue_eats_the_previous_newline() {
        let mut state = empty_state();
        state.push_to_output_stream(RTObject::Value(ValueType::new("Hello")));
        state.push_to_output_stream(RTObject::Value(ValueType::new("\n")));
        state.push_to_output_stream(RTObject::Glue);
        state.push_to_output_stream(RTObject::Value(ValueType::new(" world")));
        assert_eq!("Hello world", state.get_current_text());
    }

    #[test]
    fn leading_newline_is_dropped() {
        let mut state = empty_state();
        state.push_to_output_stream(RTObject::Value(ValueType::new("\n")));
        assert!(state.get_output_stream().is_empty());
    }

    #[test]
    fn flows_keep_their_own_output() {
        let mut state = empty_state();
        state.push_to_output_stream(RTObject::Value(ValueType::new("main")));
        state.switch_flow_internal("side");
        assert!(state.get_output_stream().is_empty());
        assert_eq!(vec!["side".to_owned()], state.alive_flow_names());

        state.switch_to_default_flow_internal();
        assert_eq!("main", state.get_current_text());
        assert!(state.remove_flow_internal(DEFAULT_FLOW_NAME).is_err());
        state.remove_flow_internal("side").unwrap();
        assert!(state.alive_flow_names().is_empty());
    }

    #[test]
    fn empty_evaluation_stack_underflows() {
        let mut state = empty_state();
        assert_eq!(Err(StoryError::StackUnderflow), state.pop_evaluation_stack().map(|_| ()));
    }

    #[test]
    fn saved_state_loads_back() {
        let mut state = empty_state();
        state.visit_counts.insert("0".to_owned(), 2);
        state.current_turn_index = 3;
        state.switch_flow_internal("side");

        let saved = state.to_json().unwrap();
        let loaded = empty_state().load_json(&saved).unwrap();

        assert_eq!("side", loaded.current_flow_name());
        assert_eq!(Some(&2), loaded.visit_counts.get("0"));
        assert_eq!(3, loaded.current_turn_index);
        assert_eq!(state.story_seed, loaded.story_seed);
    }

    #[test]
    fn unrecognised_state_is_corrupt() {
        let state = empty_state();
        assert!(matches!(state.load_json("[1,2]"), Err(StoryError::CorruptState(_))));
        assert!(matches!(state.load_json("nope"), Err(StoryError::CorruptState(_))));
        assert!(matches!(
            state.load_json(r#"{"inkSaveVersion":2}"#),
            Err(StoryError::CorruptState(_))
        ));
    }
}
