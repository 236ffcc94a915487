use std::{cell::RefCell, rc::Rc};

use inkrt::{
    story::variable_observer::VariableObserver, story_error::StoryError, value_type::ValueType,
};

mod common;

#[derive(Default)]
struct Recorder {
    changes: Vec<(String, i32)>,
}

impl VariableObserver for Recorder {
    fn changed(&mut self, variable_name: &str, value: &ValueType) {
        self.changes
            .push((variable_name.to_owned(), value.get::<i32>().unwrap()));
    }
}

#[test]
fn global_initial_value_test() -> Result<(), StoryError> {
    let story = common::load_story("observer.ink.json");

    assert_eq!(Some(10), story.get_variable("hp").and_then(|v| v.get::<i32>()));
    assert_eq!(None, story.get_variable("mp"));

    Ok(())
}

#[test]
fn observer_notified_for_every_write_test() -> Result<(), StoryError> {
    let mut story = common::load_story("observer.ink.json");
    let recorder = Rc::new(RefCell::new(Recorder::default()));

    story.observe_variable("hp", recorder.clone())?;
    // Registering twice has no effect
    story.observe_variable("hp", recorder.clone())?;

    assert_eq!("Hit.\n", story.cont()?);

    assert_eq!(
        vec![("hp".to_owned(), 5), ("hp".to_owned(), 3)],
        recorder.borrow().changes
    );

    Ok(())
}

#[test]
fn rewound_write_is_reported_once_test() -> Result<(), StoryError> {
    let mut story = common::load_story("observer_lookahead.ink.json");
    let recorder = Rc::new(RefCell::new(Recorder::default()));
    story.observe_variable("hp", recorder.clone())?;

    // The write past the first newline is undone when the line ends there
    assert_eq!("Line one.\n", story.cont()?);
    assert!(recorder.borrow().changes.is_empty());
    assert_eq!(Some(10), story.get_variable("hp").and_then(|v| v.get::<i32>()));

    assert_eq!("Line two.\n", story.cont()?);
    assert_eq!(vec![("hp".to_owned(), 7)], recorder.borrow().changes);

    Ok(())
}

#[test]
fn set_variable_notifies_immediately_test() -> Result<(), StoryError> {
    let mut story = common::load_story("observer.ink.json");
    let recorder = Rc::new(RefCell::new(Recorder::default()));

    story.observe_variables(&["hp"], recorder.clone())?;
    story.set_variable("hp", &ValueType::new(42))?;

    assert_eq!(vec![("hp".to_owned(), 42)], recorder.borrow().changes);
    assert_eq!(Some(42), story.get_variable("hp").and_then(|v| v.get::<i32>()));

    Ok(())
}

#[test]
fn removed_observer_is_not_notified_test() -> Result<(), StoryError> {
    let mut story = common::load_story("observer.ink.json");
    let recorder = Rc::new(RefCell::new(Recorder::default()));
    let observer: Rc<RefCell<dyn VariableObserver>> = recorder.clone();

    story.observe_variable("hp", observer.clone())?;
    story.remove_variable_observer(Some(&observer), Some("hp"))?;

    story.cont()?;

    assert!(recorder.borrow().changes.is_empty());

    Ok(())
}

#[test]
fn observe_undeclared_variable_test() {
    let mut story = common::load_story("observer.ink.json");
    let recorder = Rc::new(RefCell::new(Recorder::default()));

    assert!(matches!(
        story.observe_variable("mp", recorder),
        Err(StoryError::BadArgument(_))
    ));
}

#[test]
fn reset_state_restores_globals_test() -> Result<(), StoryError> {
    let mut story = common::load_story("observer.ink.json");

    story.cont()?;
    assert_eq!(Some(3), story.get_variable("hp").and_then(|v| v.get::<i32>()));

    story.reset_state()?;
    assert_eq!(Some(10), story.get_variable("hp").and_then(|v| v.get::<i32>()));
    assert!(story.can_continue());
    assert_eq!("Hit.\n", story.cont()?);

    Ok(())
}

#[test]
fn divide_by_zero_warns_test() -> Result<(), StoryError> {
    let mut story = common::load_story("divide_by_zero.ink.json");

    assert_eq!("0\n", story.cont()?);
    assert!(story.has_warning());
    assert!(!story.has_error());
    assert_eq!(Some(0), story.get_variable("x").and_then(|v| v.get::<i32>()));

    assert_eq!("After.\n", story.cont()?);

    Ok(())
}
