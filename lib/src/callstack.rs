use std::collections::HashMap;

use serde_json::{json, Map};

use crate::{
    container::{ContainerArena, ContainerId},
    json::{json_read, json_write},
    object::RTObject,
    path::Path,
    pointer::Pointer,
    push_pop::PushPopType,
    story_error::StoryError,
    value_type::ValueType,
};

/// One frame of a callstack: a tunnel, a function call, or the outermost
/// frame of a thread.
#[derive(Clone, Debug)]
pub(crate) struct Element {
    pub current_pointer: Pointer,
    pub in_expression_evaluation: bool,
    pub temporary_variables: HashMap<String, ValueType>,
    pub push_pop_type: PushPopType,
    pub evaluation_stack_height_when_pushed: usize,
    pub function_start_in_output_stream: i32,
}

impl Element {
    fn new(push_pop_type: PushPopType, pointer: Pointer, in_expression_evaluation: bool) -> Element {
        Element {
            current_pointer: pointer,
            in_expression_evaluation,
            temporary_variables: HashMap::new(),
            push_pop_type,
            evaluation_stack_height_when_pushed: 0,
            function_start_in_output_stream: 0,
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Thread {
    pub callstack: Vec<Element>,
    pub previous_pointer: Pointer,
    pub thread_index: usize,
}

impl Thread {
    fn new() -> Thread {
        Thread {
            callstack: Vec::new(),
            previous_pointer: Pointer::NULL,
            thread_index: 0,
        }
    }

    pub(crate) fn from_json(
        content: &ContainerArena,
        j_obj: &Map<String, serde_json::Value>,
    ) -> Result<Thread, StoryError> {
        let mut thread = Thread::new();

        thread.thread_index = j_obj
            .get("threadIndex")
            .and_then(|i| i.as_u64())
            .ok_or_else(|| StoryError::CorruptState("Invalid thread index".to_owned()))?
            as usize;

        let j_thread_callstack = j_obj
            .get("callstack")
            .and_then(|callstack| callstack.as_array())
            .ok_or_else(|| StoryError::CorruptState("Thread without callstack".to_owned()))?;

        for j_el_tok in j_thread_callstack {
            let j_element_obj = j_el_tok.as_object().ok_or_else(|| {
                StoryError::CorruptState("Callstack element is not an object".to_owned())
            })?;

            let push_pop_type = PushPopType::from_value(
                j_element_obj
                    .get("type")
                    .and_then(|t| t.as_u64())
                    .ok_or_else(|| StoryError::CorruptState("Invalid push/pop type".to_owned()))?,
            )
            .map_err(|e| StoryError::CorruptState(e.to_string()))?;

            let mut pointer = Pointer::NULL;

            if let Some(current_container_path_str) =
                j_element_obj.get("cPath").and_then(|c| c.as_str())
            {
                let container_path = Path::new_with_components_string(current_container_path_str);
                let container = content.container_with_path(&container_path).ok_or_else(|| {
                    StoryError::CorruptState(format!(
                        "Saved callstack points at missing content '{current_container_path_str}'. Has the story changed since this save data was created?"
                    ))
                })?;

                pointer.container = Some(container);
                pointer.index = j_element_obj
                    .get("idx")
                    .and_then(|i| i.as_i64())
                    .ok_or_else(|| StoryError::CorruptState("Invalid pointer index".to_owned()))?
                    as i32;
            }

            let in_expression_evaluation = j_element_obj
                .get("exp")
                .and_then(|exp| exp.as_bool())
                .unwrap_or(false);

            let mut el = Element::new(push_pop_type, pointer, in_expression_evaluation);

            if let Some(temps) = j_element_obj.get("temp").and_then(|temp| temp.as_object()) {
                el.temporary_variables = json_read::jobject_to_hashmap_values(temps)
                    .map_err(|e| StoryError::CorruptState(e.to_string()))?;
            }

            thread.callstack.push(el);
        }

        if let Some(prev_content_obj_path) =
            j_obj.get("previousContentObject").and_then(|p| p.as_str())
        {
            let prev_path = Path::new_with_components_string(prev_content_obj_path);
            thread.previous_pointer = content
                .pointer_at_path(&prev_path)
                .map_err(|e| StoryError::CorruptState(e.to_string()))?;
        }

        if thread.callstack.is_empty() {
            return Err(StoryError::CorruptState(
                "Thread with an empty callstack".to_owned(),
            ));
        }

        Ok(thread)
    }

    pub(crate) fn write_json(&self, content: &ContainerArena) -> serde_json::Value {
        let mut thread: Map<String, serde_json::Value> = Map::new();

        let mut cs_array: Vec<serde_json::Value> = Vec::with_capacity(self.callstack.len());

        for el in &self.callstack {
            let mut el_map: Map<String, serde_json::Value> = Map::new();

            if let Some(container) = el.current_pointer.container {
                el_map.insert(
                    "cPath".to_owned(),
                    json!(content.get(container).get_path().get_components_string()),
                );
                el_map.insert("idx".to_owned(), json!(el.current_pointer.index));
            }

            el_map.insert("exp".to_owned(), json!(el.in_expression_evaluation));
            el_map.insert("type".to_owned(), json!(el.push_pop_type.to_value()));

            if !el.temporary_variables.is_empty() {
                el_map.insert(
                    "temp".to_owned(),
                    json_write::write_dictionary_values(&el.temporary_variables),
                );
            }

            cs_array.push(serde_json::Value::Object(el_map));
        }

        thread.insert("callstack".to_owned(), serde_json::Value::Array(cs_array));
        thread.insert("threadIndex".to_owned(), json!(self.thread_index));

        if let Some(path) = resolved_path(&self.previous_pointer, content) {
            thread.insert(
                "previousContentObject".to_owned(),
                json!(path.get_components_string()),
            );
        }

        serde_json::Value::Object(thread)
    }
}

/// Path of the object a pointer resolves to. A pointer at a container
/// gives the path of that container.
fn resolved_path(pointer: &Pointer, content: &ContainerArena) -> Option<Path> {
    match pointer.resolve(content)? {
        RTObject::Container(id) => Some(content.get(id).get_path().clone()),
        _ => pointer.get_path(content),
    }
}

/// The stack of frames of the current flow. Forked threads keep their own
/// copy of the frames they started with.
#[derive(Clone, Debug)]
pub(crate) struct CallStack {
    thread_counter: usize,
    start_of_root: Pointer,
    threads: Vec<Thread>,
}

impl CallStack {
    pub fn new(root: ContainerId) -> CallStack {
        let mut cs = CallStack {
            thread_counter: 0,
            start_of_root: Pointer::start_of(root),
            threads: Vec::new(),
        };

        cs.reset();

        cs
    }

    // A callstack always holds at least one thread, and every thread at
    // least one element.
    pub fn get_current_element(&self) -> &Element {
        let cs = self.get_callstack();
        &cs[cs.len() - 1]
    }

    pub fn get_current_element_mut(&mut self) -> &mut Element {
        let cs = self.get_callstack_mut();
        let last = cs.len() - 1;
        &mut cs[last]
    }

    pub fn get_current_element_index(&self) -> i32 {
        self.get_callstack().len() as i32 - 1
    }

    pub fn reset(&mut self) {
        self.threads.clear();
        self.threads.push(Thread::new());
        self.threads[0]
            .callstack
            .push(Element::new(PushPopType::Tunnel, self.start_of_root, false));
    }

    pub fn can_pop_thread(&self) -> bool {
        self.threads.len() > 1 && !self.element_is_evaluate_from_game()
    }

    pub fn pop_thread(&mut self) -> Result<(), StoryError> {
        if self.can_pop_thread() {
            self.threads.pop();
            Ok(())
        } else {
            Err(StoryError::InvalidStoryState("Can't pop thread".to_owned()))
        }
    }

    pub fn push_thread(&mut self) {
        let mut new_thread = self.get_current_thread().clone();
        self.thread_counter += 1;
        new_thread.thread_index = self.thread_counter;
        self.threads.push(new_thread);
    }

    pub fn can_pop(&self) -> bool {
        self.get_callstack().len() > 1
    }

    pub fn can_pop_type(&self, t: Option<PushPopType>) -> bool {
        if !self.can_pop() {
            return false;
        }

        match t {
            Some(t) => self.get_current_element().push_pop_type == t,
            None => true,
        }
    }

    pub fn pop(&mut self, t: Option<PushPopType>) -> Result<(), StoryError> {
        if self.can_pop_type(t) {
            self.get_callstack_mut().pop();
            Ok(())
        } else {
            Err(StoryError::InvalidStoryState(
                "Mismatched push/pop in Callstack".to_owned(),
            ))
        }
    }

    pub fn element_is_evaluate_from_game(&self) -> bool {
        self.get_current_element().push_pop_type == PushPopType::FunctionEvaluationFromGame
    }

    pub fn get_callstack(&self) -> &Vec<Element> {
        &self.get_current_thread().callstack
    }

    pub fn get_callstack_mut(&mut self) -> &mut Vec<Element> {
        &mut self.get_current_thread_mut().callstack
    }

    pub fn get_current_thread(&self) -> &Thread {
        &self.threads[self.threads.len() - 1]
    }

    pub fn get_current_thread_mut(&mut self) -> &mut Thread {
        let last = self.threads.len() - 1;
        &mut self.threads[last]
    }

    /// Replaces every thread with `value`. Used when a choice restores the
    /// thread it was generated in.
    pub fn set_current_thread(&mut self, value: Thread) {
        self.threads.clear();
        self.threads.push(value);
    }

    pub fn fork_thread(&mut self) -> Thread {
        let mut forked_thread = self.get_current_thread().clone();
        self.thread_counter += 1;
        forked_thread.thread_index = self.thread_counter;
        forked_thread
    }

    pub fn set_temporary_variable(
        &mut self,
        name: String,
        mut value: ValueType,
        declare_new: bool,
        mut context_index: i32,
    ) -> Result<(), StoryError> {
        if context_index == -1 {
            context_index = self.get_current_element_index() + 1;
        }

        let context_element = usize::try_from(context_index - 1)
            .ok()
            .and_then(|i| self.get_callstack_mut().get_mut(i))
            .ok_or_else(|| {
                StoryError::InvalidStoryState(format!(
                    "Invalid callstack context {context_index} for temporary variable '{name}'"
                ))
            })?;

        if !declare_new && !context_element.temporary_variables.contains_key(&name) {
            return Err(StoryError::InvalidStoryState(format!(
                "Could not find temporary variable to set: {name}"
            )));
        }

        if let Some(old_value) = context_element.temporary_variables.get(&name) {
            ValueType::retain_list_origins_for_assignment(old_value, &mut value);
        }

        context_element.temporary_variables.insert(name, value);

        Ok(())
    }

    /// Context index where `name` lives: 0 for a global, or the index of
    /// the current element plus one for a temporary.
    pub fn context_for_variable_named(&self, name: &str) -> i32 {
        if self
            .get_current_element()
            .temporary_variables
            .contains_key(name)
        {
            return self.get_current_element_index() + 1;
        }

        0
    }

    pub fn get_temporary_variable_with_name(
        &self,
        name: &str,
        mut context_index: i32,
    ) -> Option<&ValueType> {
        if context_index == -1 {
            context_index = self.get_current_element_index() + 1;
        }

        let context_element = self
            .get_callstack()
            .get(usize::try_from(context_index - 1).ok()?)?;

        context_element.temporary_variables.get(name)
    }

    pub fn push(
        &mut self,
        t: PushPopType,
        external_evaluation_stack_height: usize,
        output_stream_length_with_pushed: i32,
    ) {
        // Keep the current content path, but leave expression evaluation.
        let mut element = Element::new(t, self.get_current_element().current_pointer, false);

        element.evaluation_stack_height_when_pushed = external_evaluation_stack_height;
        element.function_start_in_output_stream = output_stream_length_with_pushed;

        self.get_callstack_mut().push(element);
    }

    pub fn get_thread_with_index(&self, index: usize) -> Option<&Thread> {
        self.threads.iter().find(|t| t.thread_index == index)
    }

    pub(crate) fn write_json(&self, content: &ContainerArena) -> serde_json::Value {
        let threads: Vec<serde_json::Value> = self
            .threads
            .iter()
            .map(|thread| thread.write_json(content))
            .collect();

        json!({
            "threads": threads,
            "threadCounter": self.thread_counter,
        })
    }

    pub(crate) fn load_json(
        &mut self,
        content: &ContainerArena,
        j_obj: &Map<String, serde_json::Value>,
    ) -> Result<(), StoryError> {
        let j_threads = j_obj
            .get("threads")
            .and_then(|t| t.as_array())
            .ok_or_else(|| StoryError::CorruptState("Callstack without threads".to_owned()))?;

        let mut threads = Vec::with_capacity(j_threads.len());
        for j_thread_tok in j_threads {
            let j_thread_obj = j_thread_tok.as_object().ok_or_else(|| {
                StoryError::CorruptState("Thread is not an object".to_owned())
            })?;
            threads.push(Thread::from_json(content, j_thread_obj)?);
        }

        if threads.is_empty() {
            return Err(StoryError::CorruptState(
                "Callstack without threads".to_owned(),
            ));
        }

        self.threads = threads;
        self.thread_counter = j_obj
            .get("threadCounter")
            .and_then(|c| c.as_u64())
            .ok_or_else(|| StoryError::CorruptState("Invalid thread counter".to_owned()))?
            as usize;
        self.start_of_root = Pointer::start_of(content.root());

        Ok(())
    }

    pub fn get_callstack_trace(&self, content: &ContainerArena) -> String {
        let mut sb = String::new();

        for (t, thread) in self.threads.iter().enumerate() {
            let is_current = t == self.threads.len() - 1;

            sb.push_str(&format!(
                "=== THREAD {}/{} {}===\n",
                t + 1,
                self.threads.len(),
                if is_current { "(current) " } else { "" }
            ));

            for element in &thread.callstack {
                if element.push_pop_type == PushPopType::Function {
                    sb.push_str("  [FUNCTION] ");
                } else {
                    sb.push_str("  [TUNNEL] ");
                }

                if let Some(container) = element.current_pointer.container {
                    sb.push_str(&format!(
                        "<SOMEWHERE IN {}>\n",
                        content.get(container).get_path()
                    ));
                }
            }
        }

        sb
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Container;

    fn arena() -> ContainerArena {
        let mut arena = ContainerArena::new();
        let root = arena.add(Container::new(None, 0));
        arena.add_content(root, RTObject::Value(ValueType::new("a")));
        let knot = arena.add(Container::new(Some("knot".to_owned()), 0));
        arena.add_content(knot, RTObject::Value(ValueType::new("b")));
        arena.add_content(root, RTObject::Container(knot));
        arena.finalize();
        arena
    }

    #[test]
    fn temporaries_die_with_their_frame() {
        let arena = arena();
        let mut cs = CallStack::new(arena.root());
        cs.push(PushPopType::Function, 0, 0);
        cs.set_temporary_variable("t".to_owned(), ValueType::Int(1), true, -1)
            .unwrap();
        assert_eq!(2, cs.context_for_variable_named("t"));
        assert!(cs.get_temporary_variable_with_name("t", -1).is_some());

        cs.pop(Some(PushPopType::Function)).unwrap();
        assert!(cs.get_temporary_variable_with_name("t", -1).is_none());
        assert_eq!(0, cs.context_for_variable_named("t"));
    }

    #[test]
    fn mismatched_pop_is_rejected() {
        let arena = arena();
        let mut cs = CallStack::new(arena.root());
        cs.push(PushPopType::Tunnel, 0, 0);
        assert!(cs.pop(Some(PushPopType::Function)).is_err());
        assert!(cs.pop(Some(PushPopType::Tunnel)).is_ok());
        assert!(!cs.can_pop());
    }

    #[test]
    fn forked_threads_get_fresh_indices() {
        let arena = arena();
        let mut cs = CallStack::new(arena.root());
        let forked = cs.fork_thread();
        cs.push_thread();
        assert_eq!(1, forked.thread_index);
        assert_eq!(2, cs.get_current_thread().thread_index);
        assert!(cs.can_pop_thread());
    }

    #[test]
    fn json_round_trip_keeps_pointers_and_temps() {
        let arena = arena();
        let knot = arena.knot_container_with_name("knot").unwrap();

        let mut cs = CallStack::new(arena.root());
        cs.push(PushPopType::Tunnel, 0, 0);
        cs.get_current_element_mut().current_pointer = Pointer::start_of(knot);
        cs.set_temporary_variable("t".to_owned(), ValueType::new("x"), true, -1)
            .unwrap();

        let json = cs.write_json(&arena);
        let mut loaded = CallStack::new(arena.root());
        loaded
            .load_json(&arena, json.as_object().unwrap())
            .unwrap();

        assert_eq!(1, loaded.get_current_element_index());
        assert_eq!(Pointer::start_of(knot), loaded.get_current_element().current_pointer);
        assert_eq!(
            Some("x"),
            loaded
                .get_temporary_variable_with_name("t", -1)
                .and_then(|v| v.get::<&str>())
        );
    }

    #[test]
    fn missing_container_is_corrupt_state() {
        let arena = arena();
        let json = json!({
            "threads": [{"callstack": [{"cPath": "nowhere", "idx": 0, "exp": false, "type": 0}], "threadIndex": 0}],
            "threadCounter": 0
        });
        let mut cs = CallStack::new(arena.root());
        assert!(matches!(
            cs.load_json(&arena, json.as_object().unwrap()),
            Err(StoryError::CorruptState(_))
        ));
    }
}
