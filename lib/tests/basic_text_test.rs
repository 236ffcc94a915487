use inkrt::story_error::StoryError;

mod common;

#[test]
fn hello_end_test() -> Result<(), StoryError> {
    let mut story = common::load_story("hello.ink.json");

    assert!(story.can_continue());
    assert_eq!("Hello\n", story.cont()?);
    assert!(!story.can_continue());
    assert!(story.get_current_choices().is_empty());
    assert!(common::is_ended(&story));

    Ok(())
}

#[test]
fn cont_when_finished_returns_empty_test() -> Result<(), StoryError> {
    let mut story = common::load_story("hello.ink.json");

    story.cont()?;
    assert_eq!("", story.cont()?);
    assert!(!story.has_error());

    Ok(())
}

#[test]
fn continue_maximally_matches_successive_cont_test() -> Result<(), StoryError> {
    let mut story = common::load_story("multiflow.ink.json");
    let mut lines = String::new();
    while story.can_continue() {
        lines.push_str(&story.cont()?);
    }

    let mut story = common::load_story("multiflow.ink.json");
    assert_eq!(lines, story.continue_maximally()?);
    assert_eq!("Main line.\nSecond main.\n", lines);

    Ok(())
}

#[test]
fn glue_joins_lines_test() -> Result<(), StoryError> {
    let mut story = common::load_story("glue.ink.json");

    let mut text = Vec::new();
    common::next_all(&mut story, &mut text)?;

    assert_eq!(1, text.len());
    assert_eq!("Hello world", text[0]);

    Ok(())
}

#[test]
fn continue_async_completes_line_test() -> Result<(), StoryError> {
    let mut story = common::load_story("multiflow.ink.json");

    story.continue_async(0.0)?;
    assert!(story.async_continue_complete());
    assert_eq!("Main line.\n", story.get_current_text()?);

    Ok(())
}

#[test]
fn build_string_of_hierarchy_marks_position_test() {
    let story = common::load_story("hello.ink.json");

    let hierarchy = story.build_string_of_hierarchy();
    assert!(hierarchy.contains("Hello"));
}
