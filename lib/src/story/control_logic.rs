use crate::{
    control_command::CommandType,
    divert::Divert,
    ink_list::InkList,
    native_function_call::Op,
    object::RTObject,
    path::Path,
    pointer::Pointer,
    push_pop::PushPopType,
    story::Story,
    story_error::StoryError,
    story_state::StoryState,
    value_type::ValueType,
    variable_assignment::VariableAssignment,
    variable_reference::VariableReference,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// # Control and Logic
/// Methods for performing logic and flow control.
impl Story {
    /// Runs `content_obj` if it is an instruction rather than content.
    /// Returns `true` when it was, so it must not reach the output.
    pub(crate) fn perform_logic_and_flow_control(
        &mut self,
        content_obj: Option<&RTObject>,
    ) -> Result<bool, StoryError> {
        match content_obj {
            Some(RTObject::Divert(divert)) => {
                self.perform_divert(divert)?;
                Ok(true)
            }
            Some(RTObject::ControlCommand(command)) => {
                self.perform_command(*command)?;
                Ok(true)
            }
            Some(RTObject::VariableAssignment(var_ass)) => {
                self.perform_variable_assignment(var_ass)?;
                Ok(true)
            }
            Some(RTObject::VariableReference(var_ref)) => {
                self.perform_variable_reference(var_ref)?;
                Ok(true)
            }
            Some(RTObject::NativeCall(op)) => {
                self.perform_native_call(*op)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn perform_divert(&mut self, current_divert: &Divert) -> Result<(), StoryError> {
        if current_divert.is_conditional {
            let o = self.get_state_mut().pop_evaluation_stack()?;
            if !self.is_truthy(o)? {
                return Ok(());
            }
        }

        if let Some(var_name) = &current_divert.variable_divert_name {
            let var_contents = self
                .get_state()
                .get_variable_with_name(var_name, -1)
                .ok_or_else(|| {
                    StoryError::InvalidStoryState(format!(
                        "Tried to divert using a target from a variable that could not be found ({var_name})"
                    ))
                })?;

            match &var_contents {
                ValueType::DivertTarget(target) => {
                    let p = self.content.pointer_at_path(target)?;
                    self.get_state_mut().diverted_pointer = p;
                }
                ValueType::Int(0) => {
                    return Err(StoryError::InvalidStoryState(format!("Tried to divert to a target from a variable, but the variable ({var_name}) didn't contain a divert target, it was empty/null (the value 0).")));
                }
                other => {
                    return Err(StoryError::InvalidStoryState(format!("Tried to divert to a target from a variable, but the variable ({var_name}) didn't contain a divert target, it contained '{other}'.")));
                }
            }
        } else if current_divert.is_external {
            let func_name = current_divert
                .target_path
                .as_ref()
                .map(Path::get_components_string)
                .unwrap_or_default();

            self.call_external_function(&func_name, current_divert.external_args)?;

            return Ok(());
        } else {
            let target = current_divert.target_path.as_ref().ok_or_else(|| {
                StoryError::InvalidStoryState("Divert without a target".to_owned())
            })?;

            let mut p = self.content.pointer_at_path(target)?;

            // Diverting to a container means starting at its first element.
            if p.index < 0 {
                if let Some(c) = p.container {
                    p = Pointer::start_of(c);
                }
            }

            self.get_state_mut().diverted_pointer = p;
        }

        if current_divert.pushes_to_stack {
            let output_len = self.get_state().get_output_stream().len() as i32;
            self.get_state_mut()
                .callstack_mut()
                .push(current_divert.stack_push_type, 0, output_len);
        }

        if self.get_state().diverted_pointer.is_null() && !current_divert.is_external {
            self.add_error(&format!("Divert resolution failed: {current_divert}"), false);
        }

        Ok(())
    }

    fn perform_command(&mut self, command: CommandType) -> Result<(), StoryError> {
        match command {
            CommandType::EvalStart => {
                if self.get_state().get_in_expression_evaluation() {
                    return Err(StoryError::InvalidStoryState(
                        "Already in expression evaluation?".to_owned(),
                    ));
                }

                self.get_state_mut().set_in_expression_evaluation(true);
            }
            CommandType::EvalOutput => {
                // If the expression turned out to be empty, there may not be
                // anything on the stack
                if !self.get_state().evaluation_stack.is_empty() {
                    let output = self.get_state_mut().pop_evaluation_stack()?;

                    // Functions may evaluate to Void, in which case we skip output
                    if !matches!(output, RTObject::Void) {
                        let text = RTObject::Value(ValueType::new(output.to_string()));
                        self.get_state_mut().push_to_output_stream(text);
                    }
                }
            }
            CommandType::EvalEnd => {
                if !self.get_state().get_in_expression_evaluation() {
                    return Err(StoryError::InvalidStoryState(
                        "Not in expression evaluation mode".to_owned(),
                    ));
                }

                self.get_state_mut().set_in_expression_evaluation(false);
            }
            CommandType::Duplicate => {
                let obj = self
                    .get_state()
                    .peek_evaluation_stack()
                    .cloned()
                    .ok_or(StoryError::StackUnderflow)?;
                self.get_state_mut().push_evaluation_stack(obj);
            }
            CommandType::PopEvaluatedValue => {
                self.get_state_mut().pop_evaluation_stack()?;
            }
            CommandType::PopFunction | CommandType::PopTunnel => {
                self.perform_pop(command)?;
            }
            CommandType::BeginString => {
                self.get_state_mut()
                    .push_to_output_stream(RTObject::ControlCommand(command));

                if !self.get_state().get_in_expression_evaluation() {
                    return Err(StoryError::InvalidStoryState(
                        "Expected to be in an expression when evaluating a string".to_owned(),
                    ));
                }

                self.get_state_mut().set_in_expression_evaluation(false);
            }
            CommandType::EndString => self.perform_end_string(),
            CommandType::NoOp | CommandType::StartThread => {
                // Threads are started in the main step function
            }
            CommandType::ChoiceCount => {
                let choice_count = self.get_state().get_generated_choices().len() as i32;
                self.get_state_mut()
                    .push_evaluation_stack(ValueType::new(choice_count).into());
            }
            CommandType::Turns => {
                let current_turn = self.get_state().current_turn_index;
                self.get_state_mut()
                    .push_evaluation_stack(ValueType::new(current_turn + 1).into());
            }
            CommandType::TurnsSince | CommandType::ReadCount => {
                self.perform_turns_since_or_read_count(command)?;
            }
            CommandType::Random => {
                let max_int = self.pop_int("the maximum parameter of RANDOM(min, max)")?;
                let min_int = self.pop_int("the minimum parameter of RANDOM(min, max)")?;

                let random_range = max_int as i64 - min_int as i64 + 1;
                if random_range <= 0 {
                    return Err(StoryError::InvalidStoryState(format!(
                        "RANDOM was called with minimum as {min_int} and maximum as {max_int}. The maximum must be larger"
                    )));
                }

                let next_random = self.next_random();
                let chosen_value = (next_random as i64 % random_range + min_int as i64) as i32;

                self.get_state_mut()
                    .push_evaluation_stack(ValueType::new(chosen_value).into());

                // Next random number (rather than keeping the Random object around)
                self.get_state_mut().previous_random = next_random;
            }
            CommandType::SeedRandom => {
                let seed = self.pop_int("the seed passed to SEED_RANDOM")?;

                // Story seed affects both RANDOM and shuffle behaviour
                self.get_state_mut().story_seed = seed;
                self.get_state_mut().previous_random = 0;

                // SEED_RANDOM returns nothing.
                self.get_state_mut().push_evaluation_stack(RTObject::Void);
            }
            CommandType::VisitIndex => {
                let cpc = self
                    .get_state()
                    .get_current_pointer()
                    .container
                    .ok_or_else(|| {
                        StoryError::InvalidStoryState("Visit index outside of a container".to_owned())
                    })?;

                // index not count
                let count = self.get_state().visit_count_for_container(cpc)? - 1;
                self.get_state_mut()
                    .push_evaluation_stack(ValueType::new(count).into());
            }
            CommandType::SequenceShuffleIndex => {
                let shuffle_index = self.next_sequence_shuffle_index()?;
                self.get_state_mut()
                    .push_evaluation_stack(ValueType::new(shuffle_index).into());
            }
            CommandType::Done => {
                // We may exist in the context of the initial
                // act of creating the thread, or in the context of
                // evaluating the content.
                if self.get_state().callstack().can_pop_thread() {
                    self.get_state_mut().callstack_mut().pop_thread()?;
                }
                // In normal flow - allow safe exit without warning
                else {
                    self.get_state_mut().did_safe_exit = true;

                    // Stop flow in current thread
                    self.get_state_mut().set_current_pointer(Pointer::NULL);
                }
            }
            CommandType::End => self.get_state_mut().force_end(),
            CommandType::ListFromInt => {
                let int_val = self.pop_int("the value when creating a list element from a number")?;

                let list_name = match self.get_state_mut().pop_evaluation_value()? {
                    ValueType::String(s) => s.string,
                    other => {
                        return Err(StoryError::InvalidStoryState(format!(
                            "Expected a list name, found {other}"
                        )))
                    }
                };

                let found_list_def = self
                    .list_definitions
                    .get_list_definition(&list_name)
                    .ok_or_else(|| {
                        StoryError::InvalidStoryState(format!("Failed to find List called {list_name}"))
                    })?;

                let generated_list = match found_list_def.get_item_with_value(int_val) {
                    Some(found_item) => InkList::from_single_element(found_item, int_val),
                    None => InkList::new(),
                };

                self.get_state_mut()
                    .push_evaluation_stack(ValueType::new(generated_list).into());
            }
            CommandType::ListRange => {
                let max = self.get_state_mut().pop_evaluation_value()?;
                let min = self.get_state_mut().pop_evaluation_value()?;
                let target = self.get_state_mut().pop_evaluation_value()?;

                let ValueType::List(target_list) = target else {
                    return Err(StoryError::InvalidStoryState(
                        "Expected List, minimum and maximum for LIST_RANGE".to_owned(),
                    ));
                };

                let min_value = match &min {
                    ValueType::Int(i) => *i,
                    ValueType::List(l) => l.min_item().map(|(_, v)| v).unwrap_or(0),
                    _ => 0,
                };

                let max_value = match &max {
                    ValueType::Int(i) => *i,
                    ValueType::List(l) => l.max_item().map(|(_, v)| v).unwrap_or(0),
                    _ => i32::MAX,
                };

                let result = target_list.list_with_sub_range(min_value, max_value);
                self.get_state_mut()
                    .push_evaluation_stack(ValueType::new(result).into());
            }
            CommandType::ListRandom => {
                let ValueType::List(list) = self.get_state_mut().pop_evaluation_value()? else {
                    return Err(StoryError::InvalidStoryState(
                        "Expected list for LIST_RANDOM".to_owned(),
                    ));
                };

                // List was empty: return empty list
                let new_list = if list.is_empty() {
                    InkList::new()
                }
                // Non-empty source list
                else {
                    let next_random = self.next_random();

                    // Iterate through to get the random element, sorted for
                    // predictability
                    let ordered = list.ordered_items();
                    let (random_item, random_value) = ordered[next_random as usize % ordered.len()];

                    // Origin list is simply the origin of the one element
                    let mut new_list = match random_item.get_origin_name() {
                        Some(origin) => InkList::from_single_origin(origin, &self.list_definitions)?,
                        None => InkList::new(),
                    };
                    new_list.items.insert(random_item.clone(), random_value);

                    self.get_state_mut().previous_random = next_random;

                    new_list
                };

                self.get_state_mut()
                    .push_evaluation_stack(ValueType::new(new_list).into());
            }
            CommandType::BeginTag => self
                .get_state_mut()
                .push_to_output_stream(RTObject::ControlCommand(command)),
            CommandType::EndTag => self.perform_end_tag()?,
        }

        Ok(())
    }

    /// Deterministic random number from the story seed and the last one
    /// generated, so that a loaded state replays the same sequence.
    fn next_random(&self) -> i32 {
        let result_seed = self
            .get_state()
            .story_seed
            .wrapping_add(self.get_state().previous_random);
        let mut rng = StdRng::seed_from_u64(result_seed as u64);
        rng.gen_range(0..i32::MAX)
    }

    fn perform_pop(&mut self, command: CommandType) -> Result<(), StoryError> {
        let pop_type = if command == CommandType::PopFunction {
            PushPopType::Function
        } else {
            PushPopType::Tunnel
        };

        // Tunnel onwards is allowed to specify an optional override
        // divert to go to immediately after returning: ->-> target
        let mut override_tunnel_return_target = None;
        if pop_type == PushPopType::Tunnel {
            match self.get_state_mut().pop_evaluation_stack()? {
                RTObject::Value(ValueType::DivertTarget(p)) => {
                    override_tunnel_return_target = Some(p);
                }
                RTObject::Void => {}
                _ => {
                    return Err(StoryError::InvalidStoryState(
                        "Expected void if ->-> doesn't override target".to_owned(),
                    ));
                }
            }
        }

        if self.get_state_mut().try_exit_function_evaluation_from_game() {
            return Ok(());
        }

        let current_type = self.get_state().callstack().get_current_element().push_pop_type;
        let can_pop = self.get_state().callstack().can_pop();

        if current_type != pop_type || !can_pop {
            let describe = |t: PushPopType| match t {
                PushPopType::Function => "function return statement (~ return)",
                PushPopType::Tunnel => "tunnel onwards statement (->->)",
                PushPopType::FunctionEvaluationFromGame => "end of function evaluation",
            };

            let expected = if can_pop {
                describe(current_type)
            } else {
                "end of flow (-> END or choice)"
            };

            return Err(StoryError::InvalidStoryState(format!(
                "Found {}, when expected {}",
                describe(pop_type),
                expected
            )));
        }

        self.get_state_mut().pop_callstack(None)?;

        // Does tunnel onwards override by diverting to a new ->-> target?
        if let Some(target) = override_tunnel_return_target {
            let p = self.content.pointer_at_path(&target)?;
            self.get_state_mut().diverted_pointer = p;
        }

        Ok(())
    }

    fn perform_end_string(&mut self) {
        // Walk back to the matching BeginString, collecting the text and any
        // tags generated in between.
        let mut content_stack_for_string: Vec<String> = Vec::new();
        let mut content_to_retain: Vec<RTObject> = Vec::new();
        let mut output_count_consumed = 0;

        for obj in self.get_state().get_output_stream().iter().rev() {
            output_count_consumed += 1;

            if obj.is_command(CommandType::BeginString) {
                break;
            }

            match obj {
                RTObject::Tag(_) => content_to_retain.push(obj.clone()),
                RTObject::Value(ValueType::String(s)) => {
                    content_stack_for_string.push(s.string.clone())
                }
                _ => {}
            }
        }

        // Consume the content that was produced for this string
        self.get_state_mut()
            .pop_from_output_stream(output_count_consumed);

        // Rescue the tags that we want actually to keep on the output stack
        // rather than consume as part of the string we're building.
        for rescue_tag in content_to_retain.into_iter().rev() {
            self.get_state_mut().push_to_output_stream(rescue_tag);
        }

        // Build string out of the content we collected
        let sb: String = content_stack_for_string.into_iter().rev().collect();

        // Return to expression evaluation (from content mode)
        self.get_state_mut().set_in_expression_evaluation(true);
        self.get_state_mut()
            .push_evaluation_stack(ValueType::new(sb).into());
    }

    fn perform_end_tag(&mut self) -> Result<(), StoryError> {
        // A tag closed during string evaluation belongs to choice text, as
        // in `+ choice # tag`. Push it to the evaluation stack so that it's
        // picked up with the choice's strings.
        if !self.get_state().in_string_evaluation() {
            // Otherwise keep [BeginTag, "the tag content", EndTag] in the output
            self.get_state_mut()
                .push_to_output_stream(RTObject::ControlCommand(CommandType::EndTag));
            return Ok(());
        }

        let mut content_stack_for_tag: Vec<String> = Vec::new();
        let mut output_count_consumed = 0;

        for obj in self.get_state().get_output_stream().iter().rev() {
            output_count_consumed += 1;

            match obj {
                RTObject::ControlCommand(CommandType::BeginTag) => break,
                RTObject::ControlCommand(_) => {
                    return Err(StoryError::InvalidStoryState(
                        "Unexpected ControlCommand while extracting tag from choice".to_owned(),
                    ));
                }
                RTObject::Value(ValueType::String(s)) => content_stack_for_tag.push(s.string.clone()),
                _ => {}
            }
        }

        // Consume the content that was produced for this string
        self.get_state_mut()
            .pop_from_output_stream(output_count_consumed);

        let sb: String = content_stack_for_tag.into_iter().rev().collect();

        let choice_tag = RTObject::Tag(StoryState::clean_output_whitespace(&sb));
        self.get_state_mut().push_evaluation_stack(choice_tag);

        Ok(())
    }

    fn perform_turns_since_or_read_count(&mut self, command: CommandType) -> Result<(), StoryError> {
        let target = match self.get_state_mut().pop_evaluation_value()? {
            ValueType::DivertTarget(p) => p,
            other => {
                let extra_note = if let ValueType::Int(_) = other {
                    ". Did you accidentally pass a read count ('knot_name') instead of a target ('-> knot_name')?"
                } else {
                    ""
                };

                return Err(StoryError::InvalidStoryState(format!(
                    "TURNS_SINCE / READ_COUNT expected a divert target (knot, stitch, label name), but saw {other}{extra_note}"
                )));
            }
        };

        let either_count = match self.content.content_at_path(&target) {
            Some(RTObject::Container(container)) => {
                if command == CommandType::TurnsSince {
                    self.get_state().turns_since_for_container(container)?
                } else {
                    self.get_state().visit_count_for_container(container)?
                }
            }
            _ => {
                self.add_error(
                    &format!("Failed to find container for {command} lookup at {target}"),
                    true,
                );

                // turn count defaults to never, visit count to 0 to allow entry
                if command == CommandType::TurnsSince {
                    -1
                } else {
                    0
                }
            }
        };

        self.get_state_mut()
            .push_evaluation_stack(ValueType::new(either_count).into());

        Ok(())
    }

    fn perform_variable_assignment(&mut self, var_ass: &VariableAssignment) -> Result<(), StoryError> {
        let assigned_val = self.get_state_mut().pop_evaluation_value()?;

        self.get_state_mut().assign_variable(var_ass, assigned_val)
    }

    fn perform_variable_reference(&mut self, var_ref: &VariableReference) -> Result<(), StoryError> {
        // Explicit read count value
        let found_value = if let Some(path) = &var_ref.path_for_count {
            let container = self
                .content
                .container_with_path(path)
                .ok_or_else(|| StoryError::PathNotFound(path.to_string()))?;

            ValueType::new(self.get_state().visit_count_for_container(container)?)
        }
        // Normal variable reference
        else {
            match self.get_state().get_variable_with_name(&var_ref.name, -1) {
                Some(v) => v,
                None => {
                    self.add_error(&format!("Variable not found: '{}'. Using default value of 0 (false). This can happen with temporary variables if the declaration hasn't yet been hit. Globals are always given a default value on load if a value doesn't exist in the save state.", var_ref.name), true);
                    ValueType::new(0)
                }
            }
        };

        self.get_state_mut().push_evaluation_stack(found_value.into());

        Ok(())
    }

    fn perform_native_call(&mut self, op: Op) -> Result<(), StoryError> {
        let func_params = self
            .get_state_mut()
            .pop_evaluation_stack_multiple(op.number_of_parameters())?;

        let result = op.call(func_params, &self.list_definitions)?;

        if let Some(warning) = result.warning {
            self.add_error(&warning, true);
        }

        self.get_state_mut()
            .push_evaluation_stack(result.value.into());

        Ok(())
    }
}
