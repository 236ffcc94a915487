use std::{collections::HashMap, rc::Rc};

use serde_json::Map;

use crate::{
    callstack::CallStack,
    json::{json_read, json_write},
    list_definitions_origin::ListDefinitionsOrigin,
    state_patch::PatchedMap,
    story_error::StoryError,
    value_type::{ValueType, VariablePointerValue},
    variable_assignment::VariableAssignment,
};

/// Global variables of a story. Temporaries live in the callstack, which is
/// passed in by the caller since it belongs to the current flow.
#[derive(Clone, Debug)]
pub(crate) struct VariablesState {
    global_variables: PatchedMap<ValueType>,
    default_global_variables: Rc<HashMap<String, ValueType>>,
    /// Writes made by the ink not yet reported to observers, in order.
    pending_changes: Vec<(String, ValueType)>,
    list_defs_origin: Rc<ListDefinitionsOrigin>,
}

impl VariablesState {
    pub fn new(list_defs_origin: Rc<ListDefinitionsOrigin>) -> VariablesState {
        VariablesState {
            global_variables: PatchedMap::new(),
            default_global_variables: Rc::new(HashMap::new()),
            pending_changes: Vec::new(),
            list_defs_origin,
        }
    }

    /// Takes every global write made by the ink since the last call, with
    /// the value each write stored.
    pub fn take_pending_changes(&mut self) -> Vec<(String, ValueType)> {
        std::mem::take(&mut self.pending_changes)
    }

    pub fn snapshot_default_globals(&mut self) {
        self.default_global_variables = Rc::new(self.global_variables.to_map());
    }

    pub fn start_patching(&mut self) {
        self.global_variables.start_patching();
    }

    pub fn apply_patch(&mut self) {
        self.global_variables.apply_patch();
    }

    /// Runs a `VAR=`/`temp=` instruction. Global writes are queued for
    /// observers.
    pub fn assign(
        &mut self,
        var_ass: &VariableAssignment,
        value: ValueType,
        callstack: &mut CallStack,
    ) -> Result<(), StoryError> {
        let mut name = var_ass.variable_name.clone();
        let mut context_index = -1;

        let mut set_global = if var_ass.is_new_declaration {
            var_ass.is_global
        } else {
            self.global_variable_exists_with_name(&name)
        };

        let mut value = value;

        if var_ass.is_new_declaration {
            // Constructing new variable pointer reference
            if let ValueType::VariablePointer(var_pointer) = &value {
                value = self.resolve_variable_pointer(var_pointer, callstack);
            }
        } else {
            // Assigning through a pointer writes to the variable it points at.
            while let Some(ValueType::VariablePointer(pv)) =
                self.get_raw_variable_with_name(&name, context_index, callstack)
            {
                name = pv.variable_name.clone();
                context_index = pv.context_index;
                set_global = context_index == 0;
            }
        }

        if set_global {
            let stored = self.set_global(&name, value);
            self.pending_changes.push((name, stored));
        } else {
            callstack.set_temporary_variable(name, value, var_ass.is_new_declaration, context_index)?;
        }

        Ok(())
    }

    pub fn global_variable_exists_with_name(&self, name: &str) -> bool {
        self.global_variables.contains_key(name) || self.default_global_variables.contains_key(name)
    }

    /// Given a pointer with just the variable name known, find the exact
    /// instance it refers to: a global, or a temporary at a given depth.
    fn resolve_variable_pointer(
        &self,
        var_pointer: &VariablePointerValue,
        callstack: &CallStack,
    ) -> ValueType {
        let mut context_index = var_pointer.context_index;
        if context_index == -1 {
            context_index = self.get_context_index_of_variable_named(&var_pointer.variable_name, callstack);
        }

        // A pointer to a pointer collapses to the final target.
        if let Some(double_redirection @ ValueType::VariablePointer(_)) =
            self.get_raw_variable_with_name(&var_pointer.variable_name, context_index, callstack)
        {
            return double_redirection;
        }

        ValueType::new_variable_pointer(&var_pointer.variable_name, context_index)
    }

    /// Sets a global from the host. Unknown names are created. Returns the
    /// stored value.
    pub fn set(&mut self, variable_name: &str, value: ValueType) -> ValueType {
        self.set_global(variable_name, value)
    }

    pub fn get(&self, variable_name: &str) -> Option<ValueType> {
        self.global_variables
            .get(variable_name)
            .or_else(|| self.default_global_variables.get(variable_name))
            .cloned()
    }

    fn get_context_index_of_variable_named(&self, var_name: &str, callstack: &CallStack) -> i32 {
        if self.global_variable_exists_with_name(var_name) {
            return 0;
        }

        callstack.get_current_element_index() + 1
    }

    fn get_raw_variable_with_name(
        &self,
        name: &str,
        context_index: i32,
        callstack: &CallStack,
    ) -> Option<ValueType> {
        // 0 context = global
        if context_index == 0 || context_index == -1 {
            if let Some(global) = self.get(name) {
                return Some(global);
            }

            // `VAR x = A_LIST_ITEM` may refer to a list item before globals
            // are set up.
            if let Some(list_item_value) = self.list_defs_origin.find_single_item_list_with_name(name) {
                return Some(list_item_value.clone());
            }
        }

        callstack
            .get_temporary_variable_with_name(name, context_index)
            .cloned()
    }

    fn set_global(&mut self, name: &str, mut value: ValueType) -> ValueType {
        if let Some(old_value) = self.global_variables.get(name) {
            ValueType::retain_list_origins_for_assignment(old_value, &mut value);
        }

        self.global_variables.insert(name.to_owned(), value.clone());

        value
    }

    /// Reads a variable, following variable pointers to their target.
    pub fn get_variable_with_name(
        &self,
        name: &str,
        context_index: i32,
        callstack: &CallStack,
    ) -> Option<ValueType> {
        match self.get_raw_variable_with_name(name, context_index, callstack)? {
            ValueType::VariablePointer(pointer) => {
                self.get_variable_with_name(&pointer.variable_name, pointer.context_index, callstack)
            }
            value => Some(value),
        }
    }

    pub(crate) fn write_json(&self) -> serde_json::Value {
        let mut jobj: Map<String, serde_json::Value> = Map::new();

        for (name, val) in self.global_variables.iter() {
            // Values still at their default are restored from the story itself.
            if let Some(default_val) = self.default_global_variables.get(name) {
                if val_equal(val, default_val) {
                    continue;
                }
            }

            jobj.insert(name.clone(), json_write::write_value(val));
        }

        serde_json::Value::Object(jobj)
    }

    pub(crate) fn load_json(&mut self, jobj: &Map<String, serde_json::Value>) -> Result<(), StoryError> {
        let mut loaded = json_read::jobject_to_hashmap_values(jobj)?;

        for (k, v) in self.default_global_variables.iter() {
            loaded.entry(k.clone()).or_insert_with(|| v.clone());
        }

        self.global_variables = loaded.into();

        Ok(())
    }
}

fn val_equal(val: &ValueType, default_val: &ValueType) -> bool {
    match (val, default_val) {
        (ValueType::Bool(a), ValueType::Bool(b)) => a == b,
        (ValueType::Int(a), ValueType::Int(b)) => a == b,
        (ValueType::Float(a), ValueType::Float(b)) => a == b,
        (ValueType::List(a), ValueType::List(b)) => a == b,
        (ValueType::String(a), ValueType::String(b)) => a.string == b.string,
        (ValueType::DivertTarget(a), ValueType::DivertTarget(b)) => a == b,
        (ValueType::VariablePointer(a), ValueType::VariablePointer(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{container::ContainerId, push_pop::PushPopType};

    fn state() -> (VariablesState, CallStack) {
        let vs = VariablesState::new(Rc::new(ListDefinitionsOrigin::new(Vec::new())));
        (vs, CallStack::new(ContainerId(0)))
    }

    #[test]
    fn every_ink_write_is_queued_in_order() {
        let (mut vs, mut cs) = state();
        vs.set("a", ValueType::Int(0));
        vs.set("b", ValueType::Int(0));
        assert!(vs.take_pending_changes().is_empty());

        let write_a = VariableAssignment::new("a", false, false);
        let write_b = VariableAssignment::new("b", false, false);
        vs.assign(&write_b, ValueType::Int(1), &mut cs).unwrap();
        vs.assign(&write_a, ValueType::Int(2), &mut cs).unwrap();
        vs.assign(&write_b, ValueType::Int(3), &mut cs).unwrap();

        let changed: Vec<(String, Option<i32>)> = vs
            .take_pending_changes()
            .into_iter()
            .map(|(n, v)| (n, v.get::<i32>()))
            .collect();
        assert_eq!(
            vec![
                ("b".to_owned(), Some(1)),
                ("a".to_owned(), Some(2)),
                ("b".to_owned(), Some(3))
            ],
            changed
        );
        assert!(vs.take_pending_changes().is_empty());
    }

    #[test]
    fn assignment_through_pointer_reaches_the_global() {
        let (mut vs, mut cs) = state();
        vs.set("x", ValueType::Int(1));
        vs.snapshot_default_globals();

        cs.push(PushPopType::Function, 0, 0);
        let declare = VariableAssignment::new("r", true, false);
        vs.assign(&declare, ValueType::new_variable_pointer("x", -1), &mut cs)
            .unwrap();

        let write = VariableAssignment::new("r", false, false);
        vs.assign(&write, ValueType::Int(7), &mut cs).unwrap();

        let changed = vs.take_pending_changes();
        assert_eq!(1, changed.len());
        assert_eq!("x", changed[0].0);
        assert_eq!(Some(7), vs.get("x").and_then(|v| v.get::<i32>()));
        assert_eq!(
            Some(7),
            vs.get_variable_with_name("r", -1, &cs).and_then(|v| v.get::<i32>())
        );
    }

    #[test]
    fn only_changed_globals_are_saved() {
        let (mut vs, _) = state();
        vs.set("same", ValueType::Int(1));
        vs.set("changed", ValueType::Int(1));
        vs.snapshot_default_globals();
        vs.set("changed", ValueType::Int(2));

        let json = vs.write_json();
        assert!(json.get("same").is_none());
        assert_eq!(2, json["changed"]);

        let mut restored = vs.clone();
        restored.set("changed", ValueType::Int(5));
        restored.load_json(json.as_object().unwrap()).unwrap();
        assert_eq!(Some(2), restored.get("changed").and_then(|v| v.get::<i32>()));
        assert_eq!(Some(1), restored.get("same").and_then(|v| v.get::<i32>()));
    }
}
