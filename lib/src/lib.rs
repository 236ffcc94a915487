//! Runtime for stories written in inkle's [Ink](https://github.com/inkle/ink), a scripting language for writing interactive narrative.
//!
//! Load a story compiled to JSON by `inklecate` with [`Story::new`](story::Story::new),
//! then alternate between [`cont`](story::Story::cont) and
//! [`choose_choice_index`](story::Story::choose_choice_index).

mod callstack;
pub mod choice;
mod choice_point;
mod container;
mod control_command;
mod divert;
mod flow;
pub mod ink_list;
pub mod ink_list_item;
mod json;
mod list_definition;
mod list_definitions_origin;
mod native_function_call;
mod object;
pub mod path;
mod pointer;
mod push_pop;
pub mod story;
pub mod story_error;
mod state_patch;
mod story_state;
mod value;
pub mod value_type;
mod variable_assignment;
mod variable_reference;
mod variables_state;
