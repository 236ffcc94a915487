use crate::{
    container::ContainerId, object::RTObject, path::Path, push_pop::PushPopType, story::Story,
    story_error::StoryError, value_type::ValueType,
};

/// # Navigation
/// Methods to access specific sections of the story.
impl Story {
    /// Change the current position of the story to the given path. From
    /// here you can call [`cont()`](Story::cont) to evaluate the
    /// next line.
    ///
    /// The path string is a dot-separated path as used internally by the
    /// engine. These examples should work:
    ///
    /// ```ink
    ///    myKnot
    ///    myKnot.myStitch
    /// ```
    ///
    /// Note however that this won't necessarily work:
    ///
    /// ```ink
    ///    myKnot.myStitch.myLabelledChoice
    /// ```
    ///
    /// ...because of the way that content is nested within a weave
    /// structure.
    ///
    /// Usually you would reset the callstack beforehand, which means that
    /// any tunnels, threads or functions you were in at the time of
    /// calling will be discarded. This is different from the
    /// behaviour of
    /// [`choose_choice_index`](Story::choose_choice_index), which
    /// will always keep the callstack, since the choices are known to come
    /// from a correct state, and their source thread is known.
    ///
    /// Not resetting the call stack leaves active threads, tunnels or
    /// function calls intact. If you're in the middle of a tunnel, only the
    /// inner-most tunnel is redirected. Doing it from inside a function is
    /// refused.
    ///
    /// `args` are pushed to the evaluation stack, for knots that take
    /// parameters.
    pub fn choose_path_string(
        &mut self,
        path: &str,
        reset_call_stack: bool,
        args: &[ValueType],
    ) -> Result<(), StoryError> {
        self.if_async_we_cant("call choose_path_string right now")?;

        let p = Path::new_with_components_string(path);

        // Refuse paths that don't lead anywhere before touching the state.
        if self.content.pointer_at_path(&p)?.is_null() {
            return Err(StoryError::PathNotFound(path.to_owned()));
        }

        if reset_call_stack {
            self.reset_callstack()?;
        } else {
            // The stack can be in pretty much any state here. Catch one of the
            // worst offenders.
            let current_element = self.get_state().callstack().get_current_element();
            if current_element.push_pop_type == PushPopType::Function {
                let func_detail = current_element
                    .current_pointer
                    .container
                    .map(|c| format!("({})", self.content.get(c).get_path()))
                    .unwrap_or_default();

                return Err(StoryError::InvalidStoryState(format!("Story was running a function {func_detail} when you called choose_path_string({path}) - this is almost certainly not what you want! Full stack trace: \n{}", self.get_state().callstack().get_callstack_trace(&self.content))));
            }
        }

        self.get_state_mut().pass_arguments_to_evaluation_stack(args);
        self.choose_path(&p, true)
    }

    /// Evaluates a function defined in ink, and gathers the (possibly
    /// multi-line) text the function produces while executing. This output
    /// text is any text written as normal content within the function,
    /// as opposed to the ink function's return value, which is specified by
    /// `~ return` in the ink.
    ///
    /// Returns the function's return value, if any, and its text output.
    pub fn evaluate_function(
        &mut self,
        func_name: &str,
        args: &[ValueType],
    ) -> Result<(Option<ValueType>, String), StoryError> {
        self.if_async_we_cant("evaluate a function")?;

        if func_name.trim().is_empty() {
            return Err(StoryError::BadArgument(
                "Function is empty or white space.".to_owned(),
            ));
        }

        // Get the content that we need to run
        let func_container = self
            .content
            .knot_container_with_name(func_name)
            .ok_or_else(|| StoryError::BadArgument(format!("Function doesn't exist: '{func_name}'")))?;

        // A failed evaluation must leave the flow's text and choices as they were
        let checkpoint = self.get_state().flow_checkpoint();

        // Snapshot the output stream
        let output_stream_before = self.get_state().get_output_stream().clone();
        self.get_state_mut().reset_output(None);

        // State will temporarily replace the callstack in order to evaluate
        self.get_state_mut()
            .start_function_evaluation_from_game(func_container, args);

        // Evaluate the function, and collect the string output
        let mut text_output = String::new();
        let evaluated = self
            .run_function_to_end(&mut text_output)
            .and_then(|_| self.get_state_mut().complete_function_evaluation_from_game());

        match evaluated {
            Ok(result) => {
                // Restore the output stream in case this was called
                // during main story evaluation.
                self.get_state_mut()
                    .reset_output(Some(output_stream_before));

                Ok((result, text_output))
            }
            Err(e) => {
                self.get_state_mut().restore_flow_checkpoint(checkpoint);
                Err(e)
            }
        }
    }

    fn run_function_to_end(&mut self, text_output: &mut String) -> Result<(), StoryError> {
        while self.can_continue() {
            text_output.push_str(&self.cont()?);
        }

        Ok(())
    }

    /// `true` if the story has a knot with that name that can be run with
    /// [`evaluate_function`](Story::evaluate_function).
    pub fn has_function(&self, function_name: &str) -> bool {
        self.content.knot_container_with_name(function_name).is_some()
    }

    /// Counts a visit to every container newly entered by a divert, from
    /// the target outwards.
    pub(crate) fn visit_changed_containers_due_to_divert(&mut self) {
        let previous_pointer = self.get_state().get_previous_pointer();
        let pointer = self.get_state().get_current_pointer();

        // Unless we're pointing *directly* at a piece of content, we don't do counting
        // here. Otherwise, the main stepping function will do the counting.
        let Some(pointer_container) = pointer.container else {
            return;
        };
        if pointer.index == -1 {
            return;
        }

        // First, find the previously open set of containers
        let mut prev_containers: Vec<ContainerId> = Vec::new();

        if !previous_pointer.is_null() {
            let mut prev_ancestor = match previous_pointer.resolve(&self.content) {
                Some(RTObject::Container(c)) => Some(c),
                _ => previous_pointer.container,
            };

            while let Some(prev_anc) = prev_ancestor {
                prev_containers.push(prev_anc);
                prev_ancestor = self.content.get(prev_anc).parent;
            }
        }

        // If the new object is a container itself, it will be visited
        // automatically at the next actual content step. However, we need to walk up
        // the new ancestry to see if there are more new containers
        if pointer.resolve(&self.content).is_none() {
            return;
        }

        // The child is known by its position in each ancestor.
        let mut child_index = pointer.index.max(0) as usize;
        let mut current_container_ancestor = Some(pointer_container);
        if self.content.get(pointer_container).content.is_empty() {
            // Pointing at an empty container: that container is the child.
            child_index = match self.content.get(pointer_container).parent {
                Some(parent) => self.index_in_parent(parent, pointer_container).unwrap_or(usize::MAX),
                None => return,
            };
            current_container_ancestor = self.content.get(pointer_container).parent;
        }

        let mut all_children_entered_at_start = true;

        while let Some(current_container) = current_container_ancestor {
            let c = self.content.get(current_container);

            if prev_containers.contains(&current_container) && !c.counting_at_start_only {
                break;
            }

            // Check whether this ancestor container is being entered at the start,
            // by checking whether the child object is the first.
            //
            // Entering somewhere inside a container B that happens to be
            // nested at index 0 of container A doesn't count. It only counts
            // when diverting directly to the first leaf node.
            let entering_at_start =
                !c.content.is_empty() && child_index == 0 && all_children_entered_at_start;

            if !entering_at_start {
                all_children_entered_at_start = false;
            }

            let parent = c.parent;

            // Mark a visit to this container
            self.visit_container(current_container, entering_at_start);

            child_index = match parent {
                Some(p) => self.index_in_parent(p, current_container).unwrap_or(usize::MAX),
                None => usize::MAX,
            };
            current_container_ancestor = parent;
        }
    }

    /// Gets the visit/read count of a particular `Container` at the given
    /// path. For a knot or stitch, that path string will be in the
    /// form:
    ///
    /// ```ink
    ///     knot
    ///     knot.stitch
    /// ```
    pub fn visit_count_at_path_string(&self, path_string: &str) -> Result<i32, StoryError> {
        self.get_state().visit_count_at_path_string(path_string)
    }
}
