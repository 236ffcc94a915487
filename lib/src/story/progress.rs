use crate::{
    choice::Choice,
    container::ContainerId,
    object::RTObject,
    pointer::Pointer,
    push_pop::PushPopType,
    story::{errors::ErrorType, OutputStateChange, Story},
    story_error::StoryError,
    value_type::ValueType,
};
use web_time::Instant;

/// # Story Progress
/// Methods to move the story forwards.
impl Story {
    /// `true` if the story is not waiting for user input from
    /// [`choose_choice_index`](Story::choose_choice_index).
    pub fn can_continue(&self) -> bool {
        self.get_state().can_continue()
    }

    /// Tries to continue pulling text from the story, one line at a time.
    /// Returns an empty string if the story can't continue.
    pub fn cont(&mut self) -> Result<String, StoryError> {
        if !self.can_continue() {
            return Ok(String::new());
        }

        self.continue_async(0.0)?;
        self.get_current_text()
    }

    /// Continues the story until a choice or error is reached.
    /// If a choice is reached, returns all text produced along the way.
    pub fn continue_maximally(&mut self) -> Result<String, StoryError> {
        self.if_async_we_cant("continue_maximally")?;

        let mut sb = String::new();

        while self.can_continue() {
            sb.push_str(&self.cont()?);
        }

        Ok(sb)
    }

    /// Continues running the story code for the specified number of
    /// milliseconds. Check [`async_continue_complete`](Story::async_continue_complete)
    /// to know whether the line has been completed.
    pub fn continue_async(&mut self, millisecs_limit_async: f32) -> Result<(), StoryError> {
        if !self.has_validated_externals {
            self.validate_external_bindings()?;
        }

        self.continue_internal(millisecs_limit_async)
    }

    /// `false` while a time limited [`continue_async`](Story::continue_async)
    /// hasn't finished its line yet.
    pub fn async_continue_complete(&self) -> bool {
        !self.async_continue_active
    }

    pub(crate) fn continue_internal(
        &mut self,
        millisecs_limit_async: f32,
    ) -> Result<(), StoryError> {
        let is_async_time_limited = millisecs_limit_async > 0.0;

        // Doing either:
        // - full run through non-async (so not active and don't want to be)
        // - Starting async run-through
        if !self.async_continue_active {
            if !self.can_continue() {
                return Err(StoryError::InvalidStoryState(
                    "Can't continue - should check can_continue before calling Continue".to_owned(),
                ));
            }

            self.async_continue_active = is_async_time_limited;

            self.get_state_mut().did_safe_exit = false;

            self.get_state_mut().reset_output(None);

            // It's possible for ink to call game to call ink to call game etc
            if self.recursive_continue_count == 0 {
                self.get_state_mut().reset_warnings();

                if let Some(warning) = self.load_warning.take() {
                    self.get_state_mut().add_error(warning, true);
                }
            }
        }

        self.recursive_continue_count += 1;

        // Start timing
        let duration_stopwatch = Instant::now();

        let mut output_stream_ends_in_newline = false;
        let mut fatal: Option<StoryError> = None;
        self.saw_lookahead_unsafe_function_after_new_line = false;

        loop {
            match self.continue_single_step() {
                Ok(r) => output_stream_ends_in_newline = r,
                Err(e @ StoryError::UnsafeExternalDuringLookahead(_)) => {
                    fatal = Some(e);
                    break;
                }
                Err(e) => {
                    self.add_error(&e.to_string(), false);
                    fatal = Some(e);
                    break;
                }
            }

            if output_stream_ends_in_newline {
                break;
            }

            // Run out of async time?
            if self.async_continue_active
                && duration_stopwatch.elapsed().as_secs_f32() * 1000.0 > millisecs_limit_async
            {
                break;
            }

            if !self.can_continue() {
                break;
            }
        }

        // 4 outcomes:
        // - got newline (so finished this line of text)
        // - can't continue (e.g. choices or ending)
        // - ran out of time during evaluation
        // - error
        //
        // Successfully finished evaluation in time (or in error)
        if output_stream_ends_in_newline || !self.can_continue() || fatal.is_some() {
            // Need to rewind, due to evaluating further than we should?
            // An errored state is kept as it is.
            if self.get_state().has_error() {
                self.discard_snapshot();
            } else if self.state_snapshot_at_last_new_line.is_some() {
                self.restore_state_snapshot();
            }

            // Finished a section of content / reached a choice point?
            if !self.can_continue() && fatal.is_none() {
                if self.state.callstack().can_pop_thread() {
                    self.add_error("Thread available to pop, threads should always be flat by the end of evaluation?", false);
                }

                if self.state.get_generated_choices().is_empty()
                    && !self.get_state().did_safe_exit
                    && !self.get_state().has_error()
                {
                    if self
                        .state
                        .callstack()
                        .can_pop_type(Some(PushPopType::Tunnel))
                    {
                        self.add_error("unexpectedly reached end of content. Do you need a '->->' to return from a tunnel?", false);
                    } else if self
                        .state
                        .callstack()
                        .can_pop_type(Some(PushPopType::Function))
                    {
                        self.add_error(
                            "unexpectedly reached end of content. Do you need a '~ return'?",
                            false,
                        );
                    } else if !self.get_state().callstack().can_pop() {
                        self.add_error(
                            "ran out of content. Do you need a '-> DONE' or '-> END'?",
                            false,
                        );
                    } else {
                        self.add_error("unexpectedly reached end of content for unknown reason. Please debug compiler!", false);
                    }
                }
            }

            self.get_state_mut().did_safe_exit = false;
            self.saw_lookahead_unsafe_function_after_new_line = false;
            self.unsafe_lookahead_function = None;

            // Snapshot is gone by now, what's left of the writes is final.
            self.notify_committed_variable_changes();

            self.async_continue_active = false;
        }

        self.recursive_continue_count -= 1;

        // Report any errors that occured during evaluation.
        if let Some(on_err) = self.on_error.clone() {
            if self.get_state().has_error() || self.get_state().has_warning() {
                for err in self.get_state().get_current_errors() {
                    on_err.borrow_mut().error(err, ErrorType::Error);
                }

                for warning in self.get_state().get_current_warnings() {
                    on_err.borrow_mut().error(warning, ErrorType::Warning);
                }

                self.reset_errors();
            }
        } else if fatal.is_none() && self.get_state().has_error() {
            // No handler: errors can't go unnoticed, warnings stay buffered.
            let errors = self.get_state().get_current_errors();
            let warnings = self.get_state().get_current_warnings();

            let mut sb = format!(
                "Ink had {} error{}",
                errors.len(),
                if errors.len() == 1 { "" } else { "s" }
            );

            if !warnings.is_empty() {
                sb.push_str(&format!(
                    " and {} warning{}",
                    warnings.len(),
                    if warnings.len() == 1 { "" } else { "s" }
                ));
            }

            sb.push_str(". It is strongly suggested that you assign an error handler with set_error_handler. The first issue was: ");
            sb.push_str(&errors[0]);

            return Err(StoryError::InvalidStoryState(sb));
        }

        match fatal {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub(crate) fn continue_single_step(&mut self) -> Result<bool, StoryError> {
        // Run main step function (walks through content)
        self.step()?;

        // Writes made past a newline wait until we know whether they
        // will be rewound.
        if self.state_snapshot_at_last_new_line.is_none() {
            self.notify_committed_variable_changes();
        }

        // Run out of content and we have a default invisible choice that we can follow?
        if !self.can_continue() && !self.state.callstack().element_is_evaluate_from_game() {
            self.try_follow_default_invisible_choice()?;
        }

        // Don't save/rewind during string evaluation, which is e.g. used for choices
        if !self.get_state().in_string_evaluation() {
            // We previously found a newline, but were we just double checking that
            // it wouldn't immediately be removed by glue?
            if let Some(snapshot) = self.state_snapshot_at_last_new_line.as_ref() {
                // Has proper text or a tag been added? Then we know that the newline
                // that was previously added is definitely the end of the line.
                let change = Story::calculate_newline_output_state_change(
                    &snapshot.get_current_text(),
                    &self.state.get_current_text(),
                    snapshot.get_current_tags().len(),
                    self.state.get_current_tags().len(),
                );

                // The last time we saw a newline, it was definitely the end of the line, so we
                // want to rewind to that point.
                if change == OutputStateChange::ExtendedBeyondNewline
                    || self.saw_lookahead_unsafe_function_after_new_line
                {
                    let unsafe_function = self.unsafe_lookahead_function.take();

                    self.restore_state_snapshot();

                    if let (true, Some(name)) = (self.strict_lookahead, unsafe_function) {
                        return Err(StoryError::UnsafeExternalDuringLookahead(name));
                    }

                    // Hit a newline for sure, we're done
                    return Ok(true);
                }
                // Newline that previously existed is no longer valid - e.g.
                // glue was encounted that caused it to be removed.
                else if change == OutputStateChange::NewlineRemoved {
                    self.discard_snapshot();
                }
            }

            // Current content ends in a newline - approaching end of our evaluation
            if self.get_state().output_stream_ends_in_newline() {
                // If we can continue evaluation for a bit:
                // Create a snapshot in case we need to rewind.
                // We're going to continue stepping in case we see glue or some
                // non-text content such as choices.
                if self.can_continue() {
                    // Don't bother to record the state beyond the current newline.
                    if self.state_snapshot_at_last_new_line.is_none() {
                        self.state_snapshot();
                    }
                }
                // Can't continue, so we're about to exit - make sure we
                // don't have an old state hanging around.
                else {
                    self.discard_snapshot();
                }
            }
        }

        Ok(false)
    }

    pub(crate) fn step(&mut self) -> Result<(), StoryError> {
        let mut should_add_to_stream = true;

        // Get current content
        let mut pointer = self.get_state().get_current_pointer();

        if pointer.is_null() {
            return Ok(());
        }

        // Step directly to the first element of content in a container (if
        // necessary)
        while let Some(RTObject::Container(container_to_enter)) = pointer.resolve(&self.content) {
            // Mark container as being entered
            self.visit_container(container_to_enter, true);

            // No content? the most we can do is step past it
            if self.content.get(container_to_enter).content.is_empty() {
                break;
            }

            pointer = Pointer::start_of(container_to_enter);
        }

        self.get_state_mut().set_current_pointer(pointer);

        // Is the current content Object:
        // - Normal content
        // - Or a logic/flow statement - if so, do it
        // Stop flow if we hit a stack pop when we're unable to pop (e.g.
        // return/done statement in knot
        // that was diverted to rather than called as a function)
        let mut current_content_obj = pointer.resolve(&self.content);

        let is_logic_or_flow_control =
            self.perform_logic_and_flow_control(current_content_obj.as_ref())?;

        // Has flow been forced to end by flow control above?
        if self.get_state().get_current_pointer().is_null() {
            return Ok(());
        }

        if is_logic_or_flow_control {
            should_add_to_stream = false;
        }

        match current_content_obj.take() {
            // If the container has no content, then it will be
            // the "content" itself, but we skip over it.
            Some(RTObject::Container(id)) => {
                should_add_to_stream = false;
                current_content_obj = Some(RTObject::Container(id));
            }
            // Choice with condition?
            Some(RTObject::ChoicePoint(choice_point)) => {
                if let Some(choice) = self.process_choice(&choice_point, &pointer)? {
                    self.get_state_mut().get_generated_choices_mut().push(choice);
                }

                should_add_to_stream = false;
            }
            other => current_content_obj = other,
        }

        // Content to add to evaluation stack or the output stream
        if should_add_to_stream {
            if let Some(mut obj) = current_content_obj.clone() {
                // If we're pushing a variable pointer onto the evaluation stack,
                // ensure that it's specific to our current (possibly temporary)
                // context index.
                if let RTObject::Value(ValueType::VariablePointer(var_pointer)) = &obj {
                    if var_pointer.context_index == -1 {
                        let context_idx = self
                            .get_state()
                            .callstack()
                            .context_for_variable_named(&var_pointer.variable_name);
                        obj = RTObject::Value(ValueType::new_variable_pointer(
                            &var_pointer.variable_name,
                            context_idx,
                        ));
                    }
                }

                // Expression evaluation content
                if self.get_state().get_in_expression_evaluation() {
                    self.get_state_mut().push_evaluation_stack(obj);
                }
                // Output stream content (i.e. not expression evaluation)
                else {
                    self.get_state_mut().push_to_output_stream(obj);
                }
            }
        }

        // Increment the content pointer, following diverts if necessary
        self.next_content()?;

        // Starting a thread should be done after the increment to the content
        // pointer, so that when returning from the thread, it returns to the
        // content after this instruction.
        if let Some(RTObject::ControlCommand(crate::control_command::CommandType::StartThread)) =
            current_content_obj
        {
            self.get_state_mut().callstack_mut().push_thread();
        }

        Ok(())
    }

    pub(crate) fn next_content(&mut self) -> Result<(), StoryError> {
        // Setting previousContentObject is critical for
        // VisitChangedContainersDueToDivert
        let cp = self.get_state().get_current_pointer();
        self.get_state_mut().set_previous_pointer(cp);

        // Divert step?
        if !self.get_state().diverted_pointer.is_null() {
            let dp = self.get_state().diverted_pointer;
            self.get_state_mut().set_current_pointer(dp);
            self.get_state_mut().diverted_pointer = Pointer::NULL;

            // Internally uses state.previousContentObject and
            // state.currentContentObject
            self.visit_changed_containers_due_to_divert();

            // Diverted location has valid content?
            if !self.get_state().get_current_pointer().is_null() {
                return Ok(());
            }

            // Otherwise, if diverted location doesn't have valid content,
            // drop down and attempt to increment.
            // This can happen if the diverted path is intentionally jumping
            // to the end of a container - e.g. a Conditional that's
            // re-joining
        }

        let successful_pointer_increment = self.increment_content_pointer();

        // Ran out of content? Try to auto-exit from a function,
        // or finish evaluating the content of a thread
        if !successful_pointer_increment {
            let mut did_pop = false;

            if self
                .get_state()
                .callstack()
                .can_pop_type(Some(PushPopType::Function))
            {
                // Pop from the call stack
                self.get_state_mut()
                    .pop_callstack(Some(PushPopType::Function))?;

                // This pop was due to dropping off the end of a function that
                // didn't return anything, so in this case, we make sure that the
                // evaluator has something to chomp on if it needs it
                if self.get_state().get_in_expression_evaluation() {
                    self.get_state_mut().push_evaluation_stack(RTObject::Void);
                }

                did_pop = true;
            } else if self.get_state().callstack().can_pop_thread() {
                self.get_state_mut().callstack_mut().pop_thread()?;

                did_pop = true;
            } else {
                self.get_state_mut()
                    .try_exit_function_evaluation_from_game();
            }

            // Step past the point where we last called out
            if did_pop && !self.get_state().get_current_pointer().is_null() {
                self.next_content()?;
            }
        }

        Ok(())
    }

    pub(crate) fn increment_content_pointer(&mut self) -> bool {
        let mut successful_increment = true;

        let mut pointer = self.get_state().get_current_pointer();
        pointer.index += 1;

        let Some(mut container) = pointer.container else {
            return false;
        };

        // Each time we step off the end, we fall out to the next container, all
        // the while we're in indexed rather than named content
        while pointer.index >= self.content.get(container).content.len() as i32 {
            successful_increment = false;

            let Some(next_ancestor) = self.content.get(container).parent else {
                break;
            };

            let Some(index_in_ancestor) = self.index_in_parent(next_ancestor, container) else {
                break;
            };

            // Increment to next content in outer container
            pointer = Pointer::new(Some(next_ancestor), index_in_ancestor as i32 + 1);
            container = next_ancestor;

            successful_increment = true;
        }

        if !successful_increment {
            pointer = Pointer::NULL;
        }

        self.get_state_mut().set_current_pointer(pointer);

        successful_increment
    }

    /// Position of `child` in the indexed content of `parent`.
    pub(crate) fn index_in_parent(&self, parent: ContainerId, child: ContainerId) -> Option<usize> {
        self.content
            .get(parent)
            .content
            .iter()
            .position(|o| matches!(o, RTObject::Container(c) if *c == child))
    }

    pub(crate) fn calculate_newline_output_state_change(
        prev_text: &str,
        curr_text: &str,
        prev_tag_count: usize,
        curr_tag_count: usize,
    ) -> OutputStateChange {
        // Simple case: nothing's changed, and we still have a newline
        // at the end of the current content
        let newline_still_exists = curr_text.len() >= prev_text.len()
            && !prev_text.is_empty()
            && curr_text.as_bytes()[prev_text.len() - 1] == b'\n';
        if prev_tag_count == curr_tag_count
            && prev_text.len() == curr_text.len()
            && newline_still_exists
        {
            return OutputStateChange::NoChange;
        }

        // Old newline has been removed, it wasn't the end of the line after all
        if !newline_still_exists {
            return OutputStateChange::NewlineRemoved;
        }

        // Tag added - definitely the start of a new line
        if curr_tag_count > prev_tag_count {
            return OutputStateChange::ExtendedBeyondNewline;
        }

        // There must be new content - check whether it's just whitespace
        if curr_text.as_bytes()[prev_text.len()..]
            .iter()
            .any(|c| *c != b' ' && *c != b'\t')
        {
            return OutputStateChange::ExtendedBeyondNewline;
        }

        // There's new text but it's just spaces and tabs, so there's still the
        // potential for glue to kill the newline.
        OutputStateChange::NoChange
    }

    pub(crate) fn visit_container(&mut self, container: ContainerId, at_start: bool) {
        let c = self.content.get(container);
        let (counting_at_start_only, visits, turns) = (
            c.counting_at_start_only,
            c.visits_should_be_counted,
            c.turn_index_should_be_counted,
        );

        if !counting_at_start_only || at_start {
            if visits {
                self.get_state_mut()
                    .increment_visit_count_for_container(container);
            }

            if turns {
                self.get_state_mut()
                    .record_turn_index_visit_to_container(container);
            }
        }
    }

    /// The [`Choice`] objects available at the current point in the
    /// `Story`, indexed from 0. This vector will be populated as the `Story`
    /// is stepped through with the [`cont`](Story::cont) method.
    /// Once [`can_continue`](Story::can_continue) becomes `false`, this
    /// vector will be populated, and is usually (but not always) on the
    /// final [`cont`](Story::cont) step.
    pub fn get_current_choices(&self) -> Vec<Choice> {
        // Don't include invisible choices for external usage.
        self.get_state()
            .get_current_choices()
            .iter()
            .filter(|c| !c.is_invisible_default)
            .enumerate()
            .map(|(i, c)| {
                let mut choice = c.clone();
                choice.index = i;
                choice
            })
            .collect()
    }

    /// The string of output text available at the current point in
    /// the `Story`. This string will be built as the `Story` is stepped
    /// through with the [`cont`](Story::cont) method.
    pub fn get_current_text(&self) -> Result<String, StoryError> {
        self.if_async_we_cant("call currentText since it's a work in progress")?;
        Ok(self.get_state().get_current_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glue_removing_the_newline_is_detected() {
        assert_eq!(
            OutputStateChange::NewlineRemoved,
            Story::calculate_newline_output_state_change("Hello\n", "Hello world", 0, 0)
        );
    }

    #[test]
    fn new_text_after_the_newline_ends_the_line() {
        assert_eq!(
            OutputStateChange::ExtendedBeyondNewline,
            Story::calculate_newline_output_state_change("Hello\n", "Hello\nNext", 0, 0)
        );
        assert_eq!(
            OutputStateChange::NoChange,
            Story::calculate_newline_output_state_change("Hello\n", "Hello\n  ", 0, 0)
        );
        assert_eq!(
            OutputStateChange::ExtendedBeyondNewline,
            Story::calculate_newline_output_state_change("Hello\n", "Hello\n", 0, 1)
        );
    }
}

