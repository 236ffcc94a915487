use tracing::debug;

use crate::{story::Story, story_error::StoryError};

/// # Flow
/// Methods to work with flows and the call-stack.
impl Story {
    /// Discards any tunnels, threads or function calls in progress, ending
    /// the current flow. Use [`choose_path_string`](Story::choose_path_string)
    /// to start again from somewhere.
    pub fn reset_callstack(&mut self) -> Result<(), StoryError> {
        self.if_async_we_cant("reset the callstack")?;

        self.get_state_mut().force_end();

        Ok(())
    }

    /// Changes from the current flow to the specified one, creating it at
    /// the start of the story if it doesn't exist yet.
    pub fn switch_flow(&mut self, flow_name: &str) -> Result<(), StoryError> {
        self.if_async_we_cant("switch flow")?;

        self.get_state_mut().switch_flow_internal(flow_name);

        Ok(())
    }

    /// Removes the specified flow from the story. Removing the current flow
    /// switches back to the default one first.
    pub fn remove_flow(&mut self, flow_name: &str) -> Result<(), StoryError> {
        self.if_async_we_cant("remove flow")?;

        debug!(flow_name, "removing flow");

        self.get_state_mut().remove_flow_internal(flow_name)
    }

    /// Switches to the default flow, keeping the current flow around for
    /// later.
    pub fn switch_to_default_flow(&mut self) -> Result<(), StoryError> {
        self.if_async_we_cant("switch to the default flow")?;

        self.get_state_mut().switch_to_default_flow_internal();

        Ok(())
    }

    pub fn current_flow_name(&self) -> &str {
        self.get_state().current_flow_name()
    }

    pub fn current_flow_is_default_flow(&self) -> bool {
        self.get_state().current_flow_is_default_flow()
    }

    /// Names of the flows other than the default one, sorted.
    pub fn alive_flow_names(&self) -> Vec<String> {
        self.get_state().alive_flow_names()
    }
}
