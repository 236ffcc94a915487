//! For setting the variable observer function callbacks that will be called
//! while the [`Story`] is processing.
use std::{cell::RefCell, rc::Rc};

use crate::{story::Story, story_error::StoryError, value_type::ValueType};

/// Defines the method that will be called when an observed global variable
/// changes.
pub trait VariableObserver {
    fn changed(&mut self, variable_name: &str, value: &ValueType);
}

/// # Callbacks
/// Methods dealing with callback handlers.
impl Story {
    /// When the specified global variable changes it's value, the observer will
    /// be called to notify it of the change. Every write made by the ink is
    /// reported, in order, with the value it stored. Writes made while the
    /// engine looks past the end of a line are held back until the line is
    /// settled, and dropped if that part of the story is rewound. Note that
    /// the observer will also be fired if the value of the variable is
    /// changed externally to the ink, by directly setting a value in
    /// [`story.set_variable`](Story::set_variable).
    ///
    /// Registering the same observer twice for a variable has no effect.
    pub fn observe_variable(
        &mut self,
        variable_name: &str,
        observer: Rc<RefCell<dyn VariableObserver>>,
    ) -> Result<(), StoryError> {
        self.if_async_we_cant("observe a new variable")?;

        if !self
            .get_state()
            .variables_state
            .global_variable_exists_with_name(variable_name)
        {
            return Err(StoryError::BadArgument(
                format!("Cannot observe variable '{variable_name}' because it wasn't declared in the ink story.")));
        }

        let observers = self
            .variable_observers
            .entry(variable_name.to_owned())
            .or_default();

        if !observers.iter().any(|o| Rc::ptr_eq(o, &observer)) {
            observers.push(observer);
        }

        Ok(())
    }

    /// Registers one observer for several variables.
    pub fn observe_variables(
        &mut self,
        variable_names: &[&str],
        observer: Rc<RefCell<dyn VariableObserver>>,
    ) -> Result<(), StoryError> {
        for variable_name in variable_names {
            self.observe_variable(variable_name, observer.clone())?;
        }

        Ok(())
    }

    /// Removes a variable observer, to stop getting variable change
    /// notifications.
    ///
    /// * observer and variable: stop that observer for that variable.
    /// * observer only: stop it for every variable it observes.
    /// * variable only: remove every observer of that variable.
    pub fn remove_variable_observer(
        &mut self,
        observer: Option<&Rc<RefCell<dyn VariableObserver>>>,
        specific_variable_name: Option<&str>,
    ) -> Result<(), StoryError> {
        self.if_async_we_cant("remove a variable observer")?;

        match (observer, specific_variable_name) {
            (Some(observer), Some(specific_variable_name)) => {
                if let Some(v) = self.variable_observers.get_mut(specific_variable_name) {
                    v.retain(|x| !Rc::ptr_eq(x, observer));

                    if v.is_empty() {
                        self.variable_observers.remove(specific_variable_name);
                    }
                }
            }
            (Some(observer), None) => {
                for v in self.variable_observers.values_mut() {
                    v.retain(|x| !Rc::ptr_eq(x, observer));
                }

                self.variable_observers.retain(|_, v| !v.is_empty());
            }
            (None, Some(specific_variable_name)) => {
                self.variable_observers.remove(specific_variable_name);
            }
            (None, None) => {}
        }

        Ok(())
    }

    /// Reports the queued ink writes, in the order they happened.
    pub(crate) fn notify_committed_variable_changes(&mut self) {
        let changes = self.state.variables_state.take_pending_changes();

        for (variable_name, value) in changes {
            self.notify_variable_changed(&variable_name, &value);
        }
    }

    pub(crate) fn notify_variable_changed(&self, variable_name: &str, value: &ValueType) {
        if let Some(observers) = self.variable_observers.get(variable_name) {
            for o in observers.iter() {
                o.borrow_mut().changed(variable_name, value);
            }
        }
    }
}
