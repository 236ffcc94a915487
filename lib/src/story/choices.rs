use crate::{
    choice::Choice, choice_point::ChoicePoint, object::RTObject, path::Path, pointer::Pointer,
    story::Story, story_error::StoryError, value_type::ValueType,
};

/// # Choices
/// Methods to get and select choices.
impl Story {
    /// Chooses the [`Choice`](crate::choice::Choice) from the
    /// `currentChoices` list with the given index. Internally, this
    /// sets the current content path to what the
    /// [`Choice`](crate::choice::Choice) points to, ready
    /// to continue story evaluation.
    pub fn choose_choice_index(&mut self, choice_index: usize) -> Result<(), StoryError> {
        let mut choices = self.get_current_choices();
        if choice_index >= choices.len() {
            return Err(StoryError::InvalidChoiceIndex {
                index: choice_index,
                count: choices.len(),
            });
        }

        let choice_to_choose = choices.swap_remove(choice_index);

        // Replace callstack with the one from the thread at the choosing point,
        // so that we can jump into the right place in the flow.
        // This is important in case the flow was forked by a new thread, which
        // can create multiple leading edges for the story, each of
        // which has its own context.
        let thread = choice_to_choose.thread_at_generation.ok_or_else(|| {
            StoryError::InvalidStoryState(format!(
                "Choice '{}' has lost the thread it was generated in",
                choice_to_choose.text
            ))
        })?;

        self.get_state_mut().callstack_mut().set_current_thread(thread);

        self.choose_path(&choice_to_choose.target_path, true)
    }

    pub(crate) fn choose_path(
        &mut self,
        p: &Path,
        incrementing_turn_index: bool,
    ) -> Result<(), StoryError> {
        self.get_state_mut()
            .set_chosen_path(p, incrementing_turn_index)?;

        // Take a note of newly visited containers for read counts etc
        self.visit_changed_containers_due_to_divert();

        Ok(())
    }

    pub(crate) fn process_choice(
        &mut self,
        choice_point: &ChoicePoint,
        pointer: &Pointer,
    ) -> Result<Option<Choice>, StoryError> {
        let mut show_choice = true;

        // Don't create choice if choice point doesn't pass conditional
        if choice_point.has_condition {
            let condition_value = self.get_state_mut().pop_evaluation_stack()?;
            if !self.is_truthy(condition_value)? {
                show_choice = false;
            }
        }

        let mut start_text = String::new();
        let mut choice_only_text = String::new();
        let mut tags: Vec<String> = Vec::new();

        if choice_point.has_choice_only_content {
            choice_only_text = self.pop_choice_string_and_tags(&mut tags)?;
        }

        if choice_point.has_start_content {
            start_text = self.pop_choice_string_and_tags(&mut tags)?;
        }

        // Don't create choice if player has already read this content
        if choice_point.once_only {
            let target = self
                .content
                .container_with_path(&choice_point.path_on_choice)
                .ok_or_else(|| StoryError::PathNotFound(choice_point.path_on_choice.to_string()))?;

            if self.get_state().visit_count_for_container(target)? > 0 {
                show_choice = false;
            }
        }

        // We go through the full process of creating the choice above so
        // that we consume the content for it, since otherwise it'll
        // be shown on the output stream.
        if !show_choice {
            return Ok(None);
        }

        start_text.push_str(&choice_only_text);

        let source_path = pointer
            .get_path(&self.content)
            .map(|p| p.to_string())
            .unwrap_or_default();

        let thread = self.get_state_mut().callstack_mut().fork_thread();

        let choice = Choice::new(
            choice_point.path_on_choice.clone(),
            source_path,
            choice_point.is_invisible_default,
            tags,
            thread,
            start_text.trim_matches(|c| c == ' ' || c == '\t').to_owned(),
        );

        Ok(Some(choice))
    }

    pub(crate) fn try_follow_default_invisible_choice(&mut self) -> Result<(), StoryError> {
        let all_choices = self.get_state().get_current_choices();

        // Is a default invisible choice the ONLY choice?
        if all_choices.is_empty() || all_choices.iter().any(|c| !c.is_invisible_default) {
            return Ok(());
        }

        let choice = all_choices[0].clone();

        // Invisible choice may have been generated on a different thread,
        // in which case we need to restore it before we continue
        if let Some(thread) = choice.thread_at_generation {
            self.get_state_mut().callstack_mut().set_current_thread(thread);
        }

        // If there's a chance that this state will be rolled back to before
        // the invisible choice then make sure that the choice thread is
        // left intact, and it isn't re-entered in an old state.
        if self.state_snapshot_at_last_new_line.is_some() {
            let fork_thread = self.get_state_mut().callstack_mut().fork_thread();
            self.get_state_mut()
                .callstack_mut()
                .set_current_thread(fork_thread);
        }

        self.choose_path(&choice.target_path, false)
    }

    /// Pops the text of a choice, and the tags generated along with it
    /// which sit just below it on the evaluation stack.
    fn pop_choice_string_and_tags(&mut self, tags: &mut Vec<String>) -> Result<String, StoryError> {
        let choice_only_str_val = match self.get_state_mut().pop_evaluation_stack()? {
            RTObject::Value(ValueType::String(s)) => s.string,
            other => {
                return Err(StoryError::InvalidStoryState(format!(
                    "Expected choice text on the evaluation stack, found {other}"
                )))
            }
        };

        while let Some(RTObject::Tag(_)) = self.get_state().peek_evaluation_stack() {
            if let RTObject::Tag(tag) = self.get_state_mut().pop_evaluation_stack()? {
                // popped in reverse order
                tags.insert(0, tag);
            }
        }

        Ok(choice_only_str_val)
    }
}
