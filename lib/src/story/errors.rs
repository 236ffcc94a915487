use std::{cell::RefCell, rc::Rc};

use tracing::{error, warn};

use crate::story::Story;

/// Defines the method that will be called when an error occurs while executing
/// the story.
pub trait ErrorHandler {
    fn error(&mut self, message: &str, error_type: ErrorType);
}

/// Types of errors an Ink story might throw.
#[derive(PartialEq, Clone, Copy, Debug)]
pub enum ErrorType {
    /// Problem that is not critical, but should be fixed.
    Warning,
    /// Critical error that can't be recovered from.
    Error,
}

/// # Errors
/// Methods to check for errors.
impl Story {
    /// Assign the error handler for all runtime errors in ink -- i.e. problems
    /// with the source ink itself that are only discovered when playing
    /// the story.
    /// Without a handler, [`cont`](Story::cont) fails as soon as an error
    /// has been raised, and warnings are only logged and buffered.
    pub fn set_error_handler(&mut self, err_handler: Rc<RefCell<dyn ErrorHandler>>) {
        self.on_error = Some(err_handler);
    }

    /// Raises an error from game code, as if the ink had raised it. Ends
    /// the current flow.
    pub fn error(&mut self, message: &str) {
        self.add_error(message, false);
    }

    /// Raises a warning from game code, as if the ink had raised it.
    pub fn warning(&mut self, message: &str) {
        self.add_error(message, true);
    }

    pub(crate) fn add_error(&mut self, message: &str, is_warning: bool) {
        let error_type_str = if is_warning { "WARNING" } else { "ERROR" };

        let m = match self
            .get_state()
            .get_current_pointer()
            .get_path(&self.content)
        {
            Some(path) => format!("RUNTIME {}: '{}': {}", error_type_str, path, message),
            None => format!("RUNTIME {}: {}", error_type_str, message),
        };

        if is_warning {
            warn!("{m}");
        } else {
            error!("{m}");
        }

        self.get_state_mut().add_error(m, is_warning);

        if !is_warning {
            self.get_state_mut().force_end();
        }
    }

    /// Clears the buffered errors and warnings.
    pub fn reset_errors(&mut self) {
        self.get_state_mut().reset_errors();
    }

    /// Whether the `current_errors` list contains any errors.
    pub fn has_error(&self) -> bool {
        self.get_state().has_error()
    }

    /// Whether the `current_warnings` list contains any warnings.
    pub fn has_warning(&self) -> bool {
        self.get_state().has_warning()
    }

    /// Any critical errors generated during evaluation of the `Story`.
    pub fn get_current_errors(&self) -> &Vec<String> {
        self.get_state().get_current_errors()
    }

    /// Any warnings generated during evaluation of the `Story`.
    pub fn get_current_warnings(&self) -> &Vec<String> {
        self.get_state().get_current_warnings()
    }
}
