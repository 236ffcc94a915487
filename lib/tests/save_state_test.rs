use inkrt::{story_error::StoryError, value_type::ValueType};

mod common;

#[test]
fn save_and_load_test() -> Result<(), StoryError> {
    let mut story = common::load_story("single_choice.ink.json");

    assert_eq!("Start.\n", story.cont()?);
    let saved = story.save_state()?;

    story.choose_choice_index(0)?;
    assert_eq!("The end.\n", story.cont()?);

    story.load_state(&saved)?;
    assert_eq!("Start.\n", story.get_current_text()?);
    assert_eq!(1, story.get_current_choices().len());
    assert_eq!("Go", story.get_current_choices()[0].text);
    assert_eq!(0, story.visit_count_at_path_string("ending")?);

    story.choose_choice_index(0)?;
    assert_eq!("The end.\n", story.cont()?);
    assert_eq!(1, story.visit_count_at_path_string("ending")?);

    Ok(())
}

#[test]
fn load_into_fresh_story_test() -> Result<(), StoryError> {
    let mut story = common::load_story("single_choice.ink.json");
    story.cont()?;
    let saved = story.save_state()?;

    let mut other = common::load_story("single_choice.ink.json");
    other.load_state(&saved)?;
    other.choose_choice_index(0)?;

    assert_eq!("The end.\n", other.cont()?);

    Ok(())
}

#[test]
fn corrupt_state_leaves_story_untouched_test() -> Result<(), StoryError> {
    let mut story = common::load_story("single_choice.ink.json");
    story.cont()?;

    assert!(matches!(
        story.load_state("junk"),
        Err(StoryError::CorruptState(_))
    ));
    assert!(matches!(
        story.load_state("{}"),
        Err(StoryError::CorruptState(_))
    ));

    assert_eq!(1, story.get_current_choices().len());
    story.choose_choice_index(0)?;
    assert_eq!("The end.\n", story.cont()?);

    Ok(())
}

#[test]
fn thread_choices_survive_save_and_load_test() -> Result<(), StoryError> {
    let mut story = common::load_story("threads.ink.json");
    story.continue_maximally()?;
    let saved = story.save_state()?;

    let mut story = common::load_story("threads.ink.json");
    story.load_state(&saved)?;

    assert_eq!(2, story.get_current_choices().len());
    assert_eq!("Thread choice", story.get_current_choices()[0].text);

    story.choose_choice_index(0)?;
    assert_eq!("Picked thread.\n", story.continue_maximally()?);
    assert!(common::is_ended(&story));

    Ok(())
}

#[test]
fn save_inside_tunnel_test() -> Result<(), StoryError> {
    let mut story = common::load_story("tunnel.ink.json");
    assert_eq!("Inside.\n", story.cont()?);
    let saved = story.save_state()?;

    let mut story = common::load_story("tunnel.ink.json");
    story.load_state(&saved)?;

    assert_eq!("After.\n", story.cont()?);
    assert!(common::is_ended(&story));

    Ok(())
}

#[test]
fn temporaries_survive_save_and_load_test() -> Result<(), StoryError> {
    let mut story = common::load_story("temps.ink.json");
    assert_eq!("Before.\n", story.cont()?);
    let saved = story.save_state()?;

    let mut story = common::load_story("temps.ink.json");
    story.load_state(&saved)?;

    assert_eq!("x is 5\n", story.cont()?);

    Ok(())
}

#[test]
fn evaluation_stack_in_named_flow_survives_save_and_load_test() -> Result<(), StoryError> {
    let mut story = common::load_story("flow_args.ink.json");
    assert_eq!("Main line.\n", story.cont()?);

    // The argument waits on the evaluation stack until the knot runs
    story.switch_flow("visitor")?;
    story.choose_path_string("greet", true, &[ValueType::Int(3)])?;
    let saved = story.save_state()?;

    let mut story = common::load_story("flow_args.ink.json");
    story.load_state(&saved)?;

    assert_eq!("visitor", story.current_flow_name());
    assert_eq!("Hi 3.\n", story.cont()?);

    story.switch_to_default_flow()?;
    assert_eq!("Main line.\n", story.get_current_text()?);

    Ok(())
}

#[test]
fn choices_survive_failed_function_and_save_test() -> Result<(), StoryError> {
    let mut story = common::load_story("choice_with_function.ink.json");
    story.cont()?;

    assert!(story.evaluate_function("add", &[]).is_err());
    story.reset_errors();

    let saved = story.save_state()?;

    let mut story = common::load_story("choice_with_function.ink.json");
    story.load_state(&saved)?;

    assert_eq!(1, story.get_current_choices().len());
    story.choose_choice_index(0)?;
    assert_eq!("The end.\n", story.cont()?);

    Ok(())
}

#[test]
fn background_save_test() -> Result<(), StoryError> {
    let mut story = common::load_story("observer_lookahead.ink.json");

    let copy = story.copy_state_for_background_thread_save()?;
    assert!(story.copy_state_for_background_thread_save().is_err());

    // The story keeps running while the copy is being saved
    assert_eq!("Line one.\n", story.cont()?);
    assert_eq!("Line two.\n", story.cont()?);
    assert_eq!(Some(7), story.get_variable("hp").and_then(|v| v.get::<i32>()));

    let saved_in_background = copy.to_json()?;

    story.background_save_complete();
    assert_eq!(Some(7), story.get_variable("hp").and_then(|v| v.get::<i32>()));

    // The copy still describes the story before it continued
    let mut restored = common::load_story("observer_lookahead.ink.json");
    restored.load_state(&saved_in_background)?;
    assert_eq!(Some(10), restored.get_variable("hp").and_then(|v| v.get::<i32>()));
    assert_eq!("Line one.\n", restored.cont()?);

    // Patched changes are part of later saves
    let saved = story.save_state()?;
    let mut restored = common::load_story("observer_lookahead.ink.json");
    restored.load_state(&saved)?;
    assert_eq!(Some(7), restored.get_variable("hp").and_then(|v| v.get::<i32>()));
    assert!(common::is_ended(&restored));

    // A new background save can start once the last one is complete
    story.copy_state_for_background_thread_save()?;
    story.background_save_complete();

    Ok(())
}
