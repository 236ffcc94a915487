use inkrt::story_error::StoryError;

mod common;

#[test]
fn function_return_value_test() -> Result<(), StoryError> {
    let mut story = common::load_story("function.ink.json");

    assert_eq!("Result 3.\n", story.cont()?);

    Ok(())
}

#[test]
fn evaluate_function_keeps_current_text_test() -> Result<(), StoryError> {
    let mut story = common::load_story("function.ink.json");
    story.cont()?;

    let (result, _) = story.evaluate_function(
        "add",
        &[inkrt::value_type::ValueType::new(20), inkrt::value_type::ValueType::new(22)],
    )?;

    assert_eq!(Some(42), result.and_then(|v| v.get::<i32>()));
    assert_eq!("Result 3.\n", story.get_current_text()?);

    Ok(())
}

#[test]
fn tunnel_returns_test() -> Result<(), StoryError> {
    let mut story = common::load_story("tunnel.ink.json");

    let mut text = Vec::new();
    common::next_all(&mut story, &mut text)?;

    assert_eq!(vec!["Inside.", "After."], text);

    Ok(())
}

#[test]
fn failed_evaluate_function_keeps_choices_test() -> Result<(), StoryError> {
    let mut story = common::load_story("choice_with_function.ink.json");

    assert_eq!("Start.\n", story.cont()?);
    assert_eq!(1, story.get_current_choices().len());

    // Missing arguments
    assert!(matches!(
        story.evaluate_function("add", &[]),
        Err(StoryError::StackUnderflow)
    ));
    assert!(story.has_error());

    story.reset_errors();

    assert_eq!("Start.\n", story.get_current_text()?);
    assert_eq!(1, story.get_current_choices().len());

    story.choose_choice_index(0)?;
    assert_eq!("The end.\n", story.cont()?);

    Ok(())
}

#[test]
fn evaluate_function_between_choices_test() -> Result<(), StoryError> {
    let mut story = common::load_story("choice_with_function.ink.json");
    story.cont()?;

    let (result, text) = story.evaluate_function(
        "add",
        &[inkrt::value_type::ValueType::new(1), inkrt::value_type::ValueType::new(2)],
    )?;

    assert_eq!(Some(3), result.and_then(|v| v.get::<i32>()));
    assert_eq!("", text);
    assert_eq!("Go", story.get_current_choices()[0].text);

    story.choose_choice_index(0)?;
    assert_eq!("The end.\n", story.cont()?);

    Ok(())
}
