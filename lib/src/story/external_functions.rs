use std::{cell::RefCell, collections::BTreeSet, rc::Rc};

use tracing::debug;

use crate::{
    object::RTObject, pointer::Pointer, push_pop::PushPopType, story::Story,
    story_error::StoryError, value_type::ValueType,
};

/// Defines the method callback implementing an external function.
pub trait ExternalFunction {
    fn call(&mut self, func_name: &str, args: Vec<ValueType>) -> Option<ValueType>;
}

pub(crate) struct ExternalFunctionDef {
    function: Rc<RefCell<dyn ExternalFunction>>,
    lookahead_safe: bool,
}

/// # External Functions
/// Methods dealing with external function call handlers that will be called
/// while [`Story`] is processing.
impl Story {
    /// An ink file can provide a fallback function for when when an `EXTERNAL`
    /// has been left unbound by the client, in which case the fallback will
    /// be called instead. Useful when testing a story in play-mode, when
    /// it's not possible to write a client-side external function, but when
    /// you don't want it to completely fail to run.
    pub fn set_allow_external_function_fallbacks(&mut self, v: bool) {
        self.allow_external_function_fallbacks = v;
    }

    /// When set, reaching a function that isn't lookahead safe while the
    /// engine is looking past the end of the current line fails with
    /// [`StoryError::UnsafeExternalDuringLookahead`] instead of quietly
    /// ending the line there.
    pub fn set_strict_lookahead(&mut self, v: bool) {
        self.strict_lookahead = v;
    }

    /// Bind a Rust function to an ink `EXTERNAL` function declaration.
    ///
    /// Arguments:
    /// * `func_name` - The name of the function you're binding the handler to.
    /// * `function` - The handler that will be called whenever Ink runs that
    /// `EXTERNAL` function.
    /// * `lookahead_safe` - The ink engine often evaluates further
    /// than you might expect beyond the current line just in case it sees
    /// glue that will the current line with the next. It's
    /// possible that a function can appear to be called twice,
    /// and earlier than expected. If it's safe for your
    /// function to be called in this way (since the result and side effect
    /// of the function will not change), then you can pass `true`.
    /// If your function might have side effects or return different results
    /// each time it's called, pass `false` to avoid these extra calls,
    /// especially if you want some action to be performed in game code when
    /// this function is called.
    pub fn bind_external_function(
        &mut self,
        func_name: &str,
        function: Rc<RefCell<dyn ExternalFunction>>,
        lookahead_safe: bool,
    ) -> Result<(), StoryError> {
        self.if_async_we_cant("bind an external function")?;

        if self.externals.contains_key(func_name) {
            return Err(StoryError::BadArgument(format!(
                "Function '{func_name}' has already been bound."
            )));
        }

        self.externals.insert(
            func_name.to_owned(),
            ExternalFunctionDef {
                function,
                lookahead_safe,
            },
        );

        Ok(())
    }

    /// Remove the binding for a named EXTERNAL ink function.
    pub fn unbind_external_function(&mut self, func_name: &str) -> Result<(), StoryError> {
        self.if_async_we_cant("unbind an external a function")?;

        if self.externals.remove(func_name).is_none() {
            return Err(StoryError::BadArgument(format!(
                "Function '{func_name}' has not been bound."
            )));
        }

        Ok(())
    }

    pub(crate) fn call_external_function(
        &mut self,
        func_name: &str,
        number_of_arguments: usize,
    ) -> Result<(), StoryError> {
        let func_def = self
            .externals
            .get(func_name)
            .map(|d| (d.function.clone(), d.lookahead_safe));

        let function = match func_def {
            Some((function, lookahead_safe)) => {
                // Should this function break glue? Abort run if we've already seen a newline.
                // Set a bool to tell it to restore the snapshot at the end of this instruction.
                if !lookahead_safe && self.state_snapshot_at_last_new_line.is_some() {
                    // Rewinding only works outside of string generation, so
                    // an unsafe call in the middle of choice text or "{f()}"
                    // can't be postponed.
                    if self.get_state().in_string_evaluation() {
                        return Err(StoryError::InvalidStoryState(format!("External function {} could not be called because 1) it wasn't marked as lookahead safe when bind_external_function was called and 2) the story is in the middle of string generation, either because choice text is being generated, or because you have ink like \"hello {{func()}}\". You can work around this by generating the result of your function into a temporary variable before the string or choice gets generated: ~ temp x = {}()", func_name, func_name)));
                    }

                    self.saw_lookahead_unsafe_function_after_new_line = true;
                    self.unsafe_lookahead_function = Some(func_name.to_owned());
                    return Ok(());
                }

                function
            }
            None => {
                // Try to use fallback function?
                if self.allow_external_function_fallbacks {
                    if let Some(fallback_function_container) =
                        self.content.knot_container_with_name(func_name)
                    {
                        debug!(func_name, "calling ink fallback for unbound external");

                        // Divert direct into fallback function and we're done
                        let output_len = self.get_state().get_output_stream().len() as i32;
                        self.get_state_mut()
                            .callstack_mut()
                            .push(PushPopType::Function, 0, output_len);
                        self.get_state_mut().diverted_pointer =
                            Pointer::start_of(fallback_function_container);
                        return Ok(());
                    }
                }

                return Err(StoryError::MissingExternalBinding(vec![func_name.to_owned()]));
            }
        };

        // Arguments come back in the order they were pushed
        let mut arguments: Vec<ValueType> = Vec::with_capacity(number_of_arguments);
        for popped_obj in self
            .get_state_mut()
            .pop_evaluation_stack_multiple(number_of_arguments)?
        {
            match popped_obj {
                RTObject::Value(v) => arguments.push(v),
                _ => {
                    return Err(StoryError::InvalidStoryState(format!(
                        "Trying to call EXTERNAL function '{}' with arguments which are not values.",
                        func_name
                    )))
                }
            }
        }

        debug!(func_name, args = arguments.len(), "calling external function");

        // Run the function!
        let func_result = function.borrow_mut().call(func_name, arguments);

        // Convert return value (if any) to a type that the ink engine can use
        let return_obj = match func_result {
            Some(func_result) => RTObject::Value(func_result),
            None => RTObject::Void,
        };

        self.get_state_mut().push_evaluation_stack(return_obj);

        Ok(())
    }

    /// Checks that every `EXTERNAL` function called by the story is bound,
    /// or has an ink fallback when fallbacks are allowed. Runs automatically
    /// before the first [`cont`](Story::cont).
    pub fn validate_external_bindings(&mut self) -> Result<(), StoryError> {
        let mut missing_externals: BTreeSet<String> = BTreeSet::new();

        for container in self.content.iter() {
            for obj in &container.content {
                if let RTObject::Divert(divert) = obj {
                    if !divert.is_external {
                        continue;
                    }

                    let name = match &divert.target_path {
                        Some(path) => path.get_components_string(),
                        None => continue,
                    };

                    if self.externals.contains_key(&name) {
                        continue;
                    }

                    let fallback_found = self.allow_external_function_fallbacks
                        && self.content.knot_container_with_name(&name).is_some();
                    if !fallback_found {
                        missing_externals.insert(name);
                    }
                }
            }
        }

        if !missing_externals.is_empty() {
            return Err(StoryError::MissingExternalBinding(
                missing_externals.into_iter().collect(),
            ));
        }

        self.has_validated_externals = true;

        Ok(())
    }
}
