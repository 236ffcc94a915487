//! [`Story`] is the entry point to load and run an Ink story.
use crate::{
    container::ContainerArena,
    list_definitions_origin::ListDefinitionsOrigin,
    story::{
        errors::ErrorHandler, external_functions::ExternalFunctionDef,
        variable_observer::VariableObserver,
    },
    story_state::StoryState,
};
use std::{cell::RefCell, collections::HashMap, rc::Rc};

/// The current version of the Ink story file format.
pub const INK_VERSION_CURRENT: i32 = 21;
/// The minimum legacy version of ink that can be loaded by the current version
/// of the code.
pub const INK_VERSION_MINIMUM_COMPATIBLE: i32 = 18;

#[derive(PartialEq, Debug)]
pub(crate) enum OutputStateChange {
    NoChange,
    ExtendedBeyondNewline,
    NewlineRemoved,
}

/// A `Story` is the core struct representing a complete Ink narrative,
/// managing evaluation and state.
///
/// A story is single threaded and not reentrant: host callbacks (external
/// functions, variable observers, error handlers) must not call back into
/// the story that invoked them.
pub struct Story {
    content: Rc<ContainerArena>,
    list_definitions: Rc<ListDefinitionsOrigin>,
    state: StoryState,
    recursive_continue_count: usize,
    async_continue_active: bool,
    async_saving: bool,
    pub(crate) on_error: Option<Rc<RefCell<dyn ErrorHandler>>>,
    pub(crate) state_snapshot_at_last_new_line: Option<StoryState>,
    pub(crate) variable_observers: HashMap<String, Vec<Rc<RefCell<dyn VariableObserver>>>>,
    pub(crate) has_validated_externals: bool,
    pub(crate) allow_external_function_fallbacks: bool,
    pub(crate) strict_lookahead: bool,
    pub(crate) saw_lookahead_unsafe_function_after_new_line: bool,
    pub(crate) unsafe_lookahead_function: Option<String>,
    pub(crate) externals: HashMap<String, ExternalFunctionDef>,
    /// Load-time warning, delivered with the first continue.
    pub(crate) load_warning: Option<String>,
}

mod misc {
    use crate::{
        json::json_read,
        object::RTObject,
        story::{Story, INK_VERSION_CURRENT},
        story_error::StoryError,
        story_state::StoryState,
        value_type::ValueType,
    };
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use std::{collections::HashMap, rc::Rc};
    use tracing::{debug, warn};

    impl Story {
        /// Construct a `Story` out of a JSON string that was compiled with
        /// `inklecate`.
        pub fn new(json_string: &str) -> Result<Self, StoryError> {
            let (version, content, list_definitions) = json_read::load_from_string(json_string)?;

            let content = Rc::new(content);
            let list_definitions = Rc::new(list_definitions);

            let mut story = Story {
                state: StoryState::new(content.clone(), list_definitions.clone()),
                content,
                list_definitions,
                recursive_continue_count: 0,
                async_continue_active: false,
                async_saving: false,
                saw_lookahead_unsafe_function_after_new_line: false,
                unsafe_lookahead_function: None,
                state_snapshot_at_last_new_line: None,
                on_error: None,
                variable_observers: HashMap::with_capacity(0),
                has_validated_externals: false,
                allow_external_function_fallbacks: false,
                strict_lookahead: false,
                externals: HashMap::with_capacity(0),
                load_warning: None,
            };

            story.reset_globals()?;

            if version != INK_VERSION_CURRENT {
                warn!(version, current = INK_VERSION_CURRENT, "story built with a different ink version");
                story.load_warning = Some(format!("WARNING: Version of ink used to build story ({}) doesn't match current version ({}) of engine. Non-critical, but recommend synchronising.", version, INK_VERSION_CURRENT));
            }

            debug!(version, "story loaded");

            Ok(story)
        }

        /// Creates a string representing the hierarchy of objects and
        /// containers in a story, marking the current position.
        pub fn build_string_of_hierarchy(&self) -> String {
            let mut sb = String::new();

            let cp = self.get_state().get_current_pointer();

            self.content
                .build_string_of_hierarchy(&mut sb, self.content.root(), 0, Some(&cp));

            sb
        }

        pub(crate) fn is_truthy(&self, obj: RTObject) -> Result<bool, StoryError> {
            match obj {
                RTObject::Value(val) => val.is_truthy(),
                _ => Ok(false),
            }
        }

        pub(crate) fn if_async_we_cant(&self, activity_str: &str) -> Result<(), StoryError> {
            if self.async_continue_active {
                return Err(StoryError::InvalidStoryState(format!("Can't {}. Story is in the middle of a continue_async(). Make more continue_async() calls or a single cont() call beforehand.", activity_str)));
            }

            Ok(())
        }

        pub(crate) fn pop_int(&mut self, what: &str) -> Result<i32, StoryError> {
            match self.get_state_mut().pop_evaluation_value()? {
                ValueType::Int(i) => Ok(i),
                other => Err(StoryError::InvalidStoryState(format!(
                    "Expected {what} to be an int, found {other}"
                ))),
            }
        }

        pub(crate) fn next_sequence_shuffle_index(&mut self) -> Result<i32, StoryError> {
            let num_elements = self.pop_int("number of elements in sequence for shuffle index")?;

            let seq_container = self.get_state().get_current_pointer().container.ok_or_else(|| {
                StoryError::InvalidStoryState("Shuffle index outside of a container".to_owned())
            })?;

            let seq_count = self.pop_int("sequence count value for shuffle index")?;

            if num_elements <= 0 {
                return Err(StoryError::InvalidStoryState(format!(
                    "Shuffle sequence with {num_elements} elements"
                )));
            }

            let loop_index = seq_count / num_elements;
            let iteration_index = seq_count % num_elements;

            // Generate the same shuffle based on:
            // - The hash of this container, to make sure it's consistent each time the
            //   runtime returns to the sequence
            // - How many times the runtime has looped around this full shuffle
            let seq_path_str = self.content.get(seq_container).get_path().to_string();
            let sequence_hash: i32 = seq_path_str.chars().map(|c| c as i32).sum();
            let random_seed = sequence_hash
                .wrapping_add(loop_index)
                .wrapping_add(self.get_state().story_seed);

            let mut rng = StdRng::seed_from_u64(random_seed as u64);

            let mut unpicked_indices: Vec<i32> = (0..num_elements).collect();

            for i in 0..=iteration_index {
                let chosen = rng.gen_range(0..unpicked_indices.len());
                let chosen_index = unpicked_indices.remove(chosen);

                if i == iteration_index {
                    return Ok(chosen_index);
                }
            }

            Err(StoryError::InvalidStoryState(
                "Should never reach here".to_owned(),
            ))
        }
    }
}

mod choices;
mod control_logic;
pub mod errors;
pub mod external_functions;
mod flow;
mod navigation;
mod progress;
mod state;
mod tags;
pub mod variable_observer;

pub use state::StateCopy;
