use std::{cell::RefCell, rc::Rc};

use inkrt::{
    story::{
        errors::{ErrorHandler, ErrorType},
        Story,
    },
    story_error::StoryError,
};

mod common;

#[derive(Default)]
struct Collector {
    messages: Vec<(String, ErrorType)>,
}

impl ErrorHandler for Collector {
    fn error(&mut self, message: &str, error_type: ErrorType) {
        self.messages.push((message.to_owned(), error_type));
    }
}

#[test]
fn unsupported_version_test() {
    let json = common::get_json_string("tests/data/old_version.ink.json").unwrap();

    assert_eq!(
        Some(StoryError::UnsupportedFormatVersion {
            version: 5,
            min: 18,
            max: 21
        }),
        Story::new(&json).err()
    );
}

#[test]
fn bad_json_test() {
    assert!(matches!(Story::new("not json"), Err(StoryError::BadJson(_))));
}

#[test]
fn host_error_ends_flow_test() {
    let mut story = common::load_story("hello.ink.json");

    story.error("something broke");

    assert!(story.has_error());
    assert!(story.get_current_errors()[0].contains("something broke"));
    assert!(!story.can_continue());
}

#[test]
fn host_warning_is_buffered_test() {
    let mut story = common::load_story("hello.ink.json");

    story.warning("careful");

    assert!(story.has_warning());
    assert!(!story.has_error());
    assert!(story.can_continue());
}

#[test]
fn warnings_are_reported_to_handler_test() -> Result<(), StoryError> {
    let mut story = common::load_story("divide_by_zero.ink.json");
    let collector = Rc::new(RefCell::new(Collector::default()));
    story.set_error_handler(collector.clone());

    assert_eq!("0\n", story.cont()?);

    {
        let collected = collector.borrow();
        let messages = &collected.messages;
        assert_eq!(1, messages.len());
        assert_eq!(ErrorType::Warning, messages[0].1);
    }

    // Reported warnings are cleared
    assert!(!story.has_warning());

    Ok(())
}

#[test]
fn reset_errors_test() {
    let mut story = common::load_story("hello.ink.json");

    story.error("oops");
    story.reset_errors();

    assert!(!story.has_error());
    assert!(story.get_current_errors().is_empty());
}

#[test]
fn int_overflow_wraps_test() -> Result<(), StoryError> {
    let mut story = common::load_story("int_overflow.ink.json");

    assert_eq!("-2147483648\n", story.cont()?);
    assert_eq!("-2147483648\n", story.cont()?);
    assert!(!story.has_error());

    Ok(())
}

#[test]
fn version_mismatch_warning_reaches_handler_test() -> Result<(), StoryError> {
    let mut story = common::load_story("hello_v20.ink.json");
    let collector = Rc::new(RefCell::new(Collector::default()));
    story.set_error_handler(collector.clone());

    assert_eq!("Hello\n", story.cont()?);

    let collected = collector.borrow();
    let messages = &collected.messages;
    assert_eq!(1, messages.len());
    assert_eq!(ErrorType::Warning, messages[0].1);
    assert!(messages[0].0.contains("Version of ink used to build story (20)"));

    Ok(())
}

#[test]
fn version_mismatch_warning_without_handler_test() -> Result<(), StoryError> {
    let mut story = common::load_story("hello_v20.ink.json");

    assert_eq!("Hello\n", story.cont()?);

    assert!(story.has_warning());
    assert!(!story.has_error());

    Ok(())
}
