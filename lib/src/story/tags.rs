use crate::{
    control_command::CommandType, object::RTObject, path::Path, story::Story,
    story_error::StoryError, value_type::ValueType,
};

/// # Tags
/// Methods to read tags.
impl Story {
    /// Get any global tags associated with the story. These are defined as
    /// hash tags defined at the very top of the story.
    pub fn global_tags(&self) -> Result<Vec<String>, StoryError> {
        self.tags_at_start_of_flow_container_with_path_string("")
    }

    /// Gets any tags associated with a particular knot or knot.stitch.
    /// These are defined as hash tags defined at the very top of a
    /// knot or stitch.
    pub fn tags_for_content_at_path(&self, path: &str) -> Result<Vec<String>, StoryError> {
        self.tags_at_start_of_flow_container_with_path_string(path)
    }

    fn tags_at_start_of_flow_container_with_path_string(
        &self,
        path_string: &str,
    ) -> Result<Vec<String>, StoryError> {
        let path = Path::new_with_components_string(path_string);

        // Expected to be global story, knot, or stitch
        let mut flow_container = match self.content.content_at_path(&path) {
            Some(RTObject::Container(c)) => c,
            _ => return Err(StoryError::PathNotFound(path_string.to_owned())),
        };

        while let Some(RTObject::Container(first)) = self.content.get(flow_container).content.first() {
            flow_container = *first;
        }

        // Any initial tag objects count as the "main tags" associated with that
        // story/knot/stitch
        let mut in_tag = false;
        let mut tags = Vec::new();

        for content in &self.content.get(flow_container).content {
            match content {
                RTObject::ControlCommand(CommandType::BeginTag) => in_tag = true,
                RTObject::ControlCommand(CommandType::EndTag) => in_tag = false,
                RTObject::Tag(text) if !in_tag => tags.push(text.clone()),
                RTObject::Value(ValueType::String(s)) if in_tag => tags.push(s.string.clone()),
                _ if in_tag => {
                    return Err(StoryError::InvalidStoryState("Tag contained non-text content. Only plain text is allowed when using global_tags or tags_for_content_at_path. If you want to evaluate dynamic content, you need to use story.cont()".to_owned()));
                }
                _ => break,
            }
        }

        Ok(tags)
    }

    /// Gets a list of tags defined with '#' in the ink source that were
    /// seen during the most recent [`cont`](Story::cont) call.
    pub fn get_current_tags(&self) -> Result<Vec<String>, StoryError> {
        self.if_async_we_cant("call get_current_tags since it's a work in progress")?;
        Ok(self.get_state().get_current_tags())
    }
}
