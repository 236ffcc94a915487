use serde_json::Map;

use crate::{
    callstack::{CallStack, Thread},
    choice::{Choice, ChoiceRecord},
    container::ContainerArena,
    json::{json_read, json_write},
    object::RTObject,
    story_error::StoryError,
};

/// An independently resumable line of execution: its own callstack, output
/// and pending choices.
#[derive(Clone, Debug)]
pub(crate) struct Flow {
    pub name: String,
    pub callstack: CallStack,
    pub output_stream: Vec<RTObject>,
    pub current_choices: Vec<Choice>,
}

impl Flow {
    pub fn new(name: &str, content: &ContainerArena) -> Flow {
        Flow {
            name: name.to_owned(),
            callstack: CallStack::new(content.root()),
            output_stream: Vec::new(),
            current_choices: Vec::new(),
        }
    }

    pub fn from_json(
        name: &str,
        content: &ContainerArena,
        j_obj: &Map<String, serde_json::Value>,
    ) -> Result<Flow, StoryError> {
        let corrupt = |e: StoryError| StoryError::CorruptState(e.to_string());

        let mut callstack = CallStack::new(content.root());
        callstack.load_json(
            content,
            j_obj
                .get("callstack")
                .and_then(|c| c.as_object())
                .ok_or_else(|| StoryError::CorruptState("Flow without callstack".to_owned()))?,
        )?;

        let output_stream = json_read::jarray_to_runtime_obj_list(
            j_obj
                .get("outputStream")
                .and_then(|o| o.as_array())
                .ok_or_else(|| StoryError::CorruptState("outputStream not found".to_owned()))?,
        )
        .map_err(corrupt)?;

        let records: Vec<ChoiceRecord> = serde_json::from_value(
            j_obj
                .get("currentChoices")
                .cloned()
                .ok_or_else(|| StoryError::CorruptState("currentChoices not found".to_owned()))?,
        )
        .map_err(|e| StoryError::CorruptState(e.to_string()))?;

        let mut flow = Flow {
            name: name.to_owned(),
            callstack,
            output_stream,
            current_choices: records.into_iter().map(ChoiceRecord::into_choice).collect(),
        };

        flow.load_flow_choice_threads(j_obj.get("choiceThreads"), content)?;

        Ok(flow)
    }

    pub(crate) fn write_json(&self, content: &ContainerArena) -> Result<serde_json::Value, StoryError> {
        let mut flow: Map<String, serde_json::Value> = Map::new();

        flow.insert("callstack".to_owned(), self.callstack.write_json(content));
        flow.insert(
            "outputStream".to_owned(),
            json_write::write_list_rt_objs(&self.output_stream)?,
        );

        // Threads that choices were generated in, unless the callstack
        // still holds them.
        let mut jct: Map<String, serde_json::Value> = Map::new();
        for c in &self.current_choices {
            if self
                .callstack
                .get_thread_with_index(c.original_thread_index)
                .is_none()
            {
                if let Some(thread) = &c.thread_at_generation {
                    jct.insert(
                        c.original_thread_index.to_string(),
                        thread.write_json(content),
                    );
                }
            }
        }

        if !jct.is_empty() {
            flow.insert("choiceThreads".to_owned(), serde_json::Value::Object(jct));
        }

        let records: Vec<ChoiceRecord> = self.current_choices.iter().map(ChoiceRecord::from).collect();
        flow.insert("currentChoices".to_owned(), serde_json::to_value(records)?);

        Ok(serde_json::Value::Object(flow))
    }

    fn load_flow_choice_threads(
        &mut self,
        j_choice_threads: Option<&serde_json::Value>,
        content: &ContainerArena,
    ) -> Result<(), StoryError> {
        for choice in self.current_choices.iter_mut() {
            let thread = match self.callstack.get_thread_with_index(choice.original_thread_index) {
                Some(t) => t.clone(),
                None => {
                    let key = choice.original_thread_index.to_string();
                    let j_saved_choice_thread = j_choice_threads
                        .and_then(|c| c.get(&key))
                        .and_then(|t| t.as_object())
                        .ok_or_else(|| {
                            StoryError::CorruptState(format!(
                                "Missing thread {key} for choice '{}'",
                                choice.text
                            ))
                        })?;
                    Thread::from_json(content, j_saved_choice_thread)?
                }
            };

            choice.thread_at_generation = Some(thread);
        }

        Ok(())
    }
}
