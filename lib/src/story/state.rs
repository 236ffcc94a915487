use tracing::debug;

use crate::{
    path::Path, story::Story, story_error::StoryError, story_state::StoryState,
    value_type::ValueType,
};

/// A copy of the story state taken for a background save.
pub struct StateCopy {
    state: StoryState,
}

impl StateCopy {
    /// Exports the copied state to JSON format.
    pub fn to_json(&self) -> Result<String, StoryError> {
        self.state.to_json()
    }
}

/// # State
/// Methods to read and write story state.
impl Story {
    #[inline]
    pub(crate) fn get_state(&self) -> &StoryState {
        &self.state
    }

    #[inline]
    pub(crate) fn get_state_mut(&mut self) -> &mut StoryState {
        &mut self.state
    }

    /// Runs the global variable declarations again, bringing every global
    /// back to its initial value.
    pub fn reset_globals(&mut self) -> Result<(), StoryError> {
        if self
            .content
            .get(self.content.root())
            .named_content
            .contains_key("global decl")
        {
            let original_pointer = self.get_state().get_current_pointer();

            self.choose_path(&Path::new_with_components_string("global decl"), false)?;

            // Continue, but without validating external bindings,
            // since we may be doing this reset at initialisation time.
            self.continue_internal(0.0)?;

            self.get_state_mut().set_current_pointer(original_pointer);
        }

        self.get_state_mut()
            .variables_state
            .snapshot_default_globals();

        Ok(())
    }

    /// Set the value of a named global ink variable. Variables that don't
    /// exist yet are created.
    pub fn set_variable(
        &mut self,
        variable_name: &str,
        value_type: &ValueType,
    ) -> Result<(), StoryError> {
        let stored = self
            .get_state_mut()
            .variables_state
            .set(variable_name, value_type.clone());

        self.notify_variable_changed(variable_name, &stored);

        Ok(())
    }

    /// Get the value of a named global ink variable.
    pub fn get_variable(&self, variable_name: &str) -> Option<ValueType> {
        self.get_state().variables_state.get(variable_name)
    }

    pub(crate) fn restore_state_snapshot(&mut self) {
        if let Some(snapshot) = self.state_snapshot_at_last_new_line.take() {
            self.state = snapshot;
        }

        if !self.async_saving {
            self.get_state_mut().apply_any_patch();
        }
    }

    pub(crate) fn state_snapshot(&mut self) {
        self.state_snapshot_at_last_new_line = Some(self.state.clone());
    }

    pub(crate) fn discard_snapshot(&mut self) {
        self.state_snapshot_at_last_new_line = None;

        if !self.async_saving {
            self.get_state_mut().apply_any_patch();
        }
    }

    /// Exports the current state to JSON format, in order to save the game.
    pub fn save_state(&self) -> Result<String, StoryError> {
        self.if_async_we_cant("save the state")?;

        let json = self.get_state().to_json()?;

        debug!(bytes = json.len(), "state saved");

        Ok(json)
    }

    /// Takes a copy of the current state that can be turned into JSON
    /// later, for instance spread over several frames, while the story
    /// keeps running. Until
    /// [`background_save_complete`](Story::background_save_complete) is
    /// called, the story writes its changes to a patch so the copy and the
    /// story can share the bulk of their data.
    pub fn copy_state_for_background_thread_save(&mut self) -> Result<StateCopy, StoryError> {
        self.if_async_we_cant("start saving on a background thread")?;

        if self.async_saving {
            return Err(StoryError::InvalidStoryState(
                "Story is already in background saving mode, can't call copy_state_for_background_thread_save again!".to_owned(),
            ));
        }

        let copy = self.get_state().clone();
        self.get_state_mut().start_patching();
        self.async_saving = true;

        debug!("background save started");

        Ok(StateCopy { state: copy })
    }

    /// Ends a save started with
    /// [`copy_state_for_background_thread_save`](Story::copy_state_for_background_thread_save),
    /// folding the patched changes back into the story state.
    pub fn background_save_complete(&mut self) {
        // A snapshot taken while saving carries the patch too; it is
        // applied when the snapshot goes away.
        if self.state_snapshot_at_last_new_line.is_none() {
            self.get_state_mut().apply_any_patch();
        }

        self.async_saving = false;

        debug!("background save complete");
    }

    /// Loads a previously saved state in JSON format. On failure the
    /// current state is left as it was.
    pub fn load_state(&mut self, json_state: &str) -> Result<(), StoryError> {
        self.if_async_we_cant("load a state")?;

        let loaded = self.get_state().load_json(json_state)?;

        self.state = loaded;
        self.discard_snapshot();

        debug!(flow = self.get_state().current_flow_name(), "state loaded");

        Ok(())
    }

    /// Reset the Story back to its initial state as it was when it was first constructed.
    pub fn reset_state(&mut self) -> Result<(), StoryError> {
        self.if_async_we_cant("reset the state")?;

        self.state = StoryState::new(self.content.clone(), self.list_definitions.clone());
        self.discard_snapshot();

        self.reset_globals()
    }
}
