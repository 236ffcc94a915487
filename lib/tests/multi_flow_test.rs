use inkrt::story_error::StoryError;

mod common;

#[test]
fn basics_test() -> Result<(), StoryError> {
    let mut story = common::load_story("multiflow.ink.json");

    assert!(story.current_flow_is_default_flow());
    assert_eq!("Main line.\n", story.cont()?);

    story.switch_flow("side")?;
    assert_eq!("side", story.current_flow_name());
    assert!(!story.current_flow_is_default_flow());

    story.choose_path_string("side", true, &[])?;
    assert_eq!("Side line.\n", story.cont()?);

    story.switch_to_default_flow()?;
    assert_eq!("Main line.\n", story.get_current_text()?);
    assert_eq!("Second main.\n", story.cont()?);

    story.switch_flow("side")?;
    assert_eq!("Side line.\n", story.get_current_text()?);
    assert_eq!("Side again.\n", story.cont()?);

    Ok(())
}

#[test]
fn alive_flows_test() -> Result<(), StoryError> {
    let mut story = common::load_story("multiflow.ink.json");

    story.switch_flow("one")?;
    story.switch_flow("two")?;
    story.switch_to_default_flow()?;

    assert_eq!(vec!["one", "two"], story.alive_flow_names());

    story.remove_flow("one")?;
    assert_eq!(vec!["two"], story.alive_flow_names());

    // Removing the current flow falls back to the default one
    story.switch_flow("two")?;
    story.remove_flow("two")?;
    assert!(story.current_flow_is_default_flow());
    assert!(story.alive_flow_names().is_empty());

    Ok(())
}

#[test]
fn default_flow_cannot_be_removed_test() {
    let mut story = common::load_story("multiflow.ink.json");

    assert!(matches!(
        story.remove_flow("DEFAULT_FLOW"),
        Err(StoryError::BadArgument(_))
    ));
}

#[test]
fn flows_survive_save_and_load_test() -> Result<(), StoryError> {
    let mut story = common::load_story("multiflow.ink.json");

    story.cont()?;
    story.switch_flow("side")?;
    story.choose_path_string("side", true, &[])?;
    story.cont()?;

    let saved = story.save_state()?;

    let mut story = common::load_story("multiflow.ink.json");
    story.load_state(&saved)?;

    assert_eq!("side", story.current_flow_name());
    assert_eq!("Side again.\n", story.cont()?);

    story.switch_to_default_flow()?;
    assert_eq!("Second main.\n", story.cont()?);

    Ok(())
}
