use std::{cell::RefCell, rc::Rc};

use inkrt::{
    story::{external_functions::ExternalFunction, Story},
    story_error::StoryError,
    value_type::ValueType,
};

mod common;

struct Square;

impl ExternalFunction for Square {
    fn call(&mut self, _: &str, args: Vec<ValueType>) -> Option<ValueType> {
        let x = args[0].coerce_to_int().unwrap();
        Some(ValueType::new(x * x))
    }
}

struct SideEffect {
    calls: usize,
}

impl ExternalFunction for SideEffect {
    fn call(&mut self, _: &str, _: Vec<ValueType>) -> Option<ValueType> {
        self.calls += 1;
        None
    }
}

#[test]
fn evaluate_function_with_external_test() -> Result<(), StoryError> {
    let mut story = common::load_story("external_square.ink.json");
    story.bind_external_function("square", Rc::new(RefCell::new(Square)), true)?;

    assert!(story.has_function("useSquare"));

    let (result, text) = story.evaluate_function("useSquare", &[ValueType::new(3)])?;
    assert_eq!(Some(9), result.and_then(|v| v.get::<i32>()));
    assert_eq!("", text);

    Ok(())
}

#[test]
fn evaluate_unknown_function_test() {
    let mut story = common::load_story("external_square.ink.json");

    assert!(!story.has_function("nope"));
    assert!(matches!(
        story.evaluate_function("nope", &[]),
        Err(StoryError::BadArgument(_))
    ));
}

#[test]
fn missing_binding_is_reported_test() {
    let mut story = common::load_story("external_fallback.ink.json");

    assert_eq!(
        Err(StoryError::MissingExternalBinding(vec!["square".to_owned()])),
        story.validate_external_bindings()
    );
    assert!(story.cont().is_err());
}

#[test]
fn ink_fallback_is_used_when_allowed_test() -> Result<(), StoryError> {
    let mut story = common::load_story("external_fallback.ink.json");
    story.set_allow_external_function_fallbacks(true);

    assert_eq!("16\n", story.cont()?);

    Ok(())
}

#[test]
fn bound_function_wins_over_fallback_test() -> Result<(), StoryError> {
    let mut story = common::load_story("external_fallback.ink.json");
    story.set_allow_external_function_fallbacks(true);
    story.bind_external_function("square", Rc::new(RefCell::new(Square)), true)?;

    assert_eq!("16\n", story.cont()?);

    // Binding twice is refused, unbinding an unknown name too
    assert!(story
        .bind_external_function("square", Rc::new(RefCell::new(Square)), true)
        .is_err());
    story.unbind_external_function("square")?;
    assert!(story.unbind_external_function("square").is_err());

    Ok(())
}

fn lookahead_story(strict: bool) -> (Story, Rc<RefCell<SideEffect>>) {
    let mut story = common::load_story("lookahead.ink.json");
    let side_effect = Rc::new(RefCell::new(SideEffect { calls: 0 }));
    story
        .bind_external_function("side_effect", side_effect.clone(), false)
        .unwrap();
    story.set_strict_lookahead(strict);

    (story, side_effect)
}

#[test]
fn unsafe_function_is_not_called_during_lookahead_test() -> Result<(), StoryError> {
    let (mut story, side_effect) = lookahead_story(false);

    assert_eq!("Line one.\n", story.cont()?);
    assert_eq!(0, side_effect.borrow().calls);

    assert_eq!("Line two.\n", story.cont()?);
    assert_eq!(1, side_effect.borrow().calls);

    Ok(())
}

#[test]
fn strict_lookahead_fails_on_unsafe_function_test() -> Result<(), StoryError> {
    let (mut story, side_effect) = lookahead_story(true);

    assert_eq!(
        Err(StoryError::UnsafeExternalDuringLookahead("side_effect".to_owned())),
        story.cont()
    );
    assert_eq!(0, side_effect.borrow().calls);

    // The story was rewound to the end of the first line
    assert!(story.can_continue());
    assert_eq!("Line two.\n", story.cont()?);
    assert_eq!(1, side_effect.borrow().calls);

    Ok(())
}
