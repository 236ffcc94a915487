use inkrt::story_error::StoryError;

mod common;

fn choice_texts(story: &inkrt::story::Story) -> Vec<String> {
    story
        .get_current_choices()
        .into_iter()
        .map(|c| c.text)
        .collect()
}

#[test]
fn thread_choices_are_gathered_test() -> Result<(), StoryError> {
    let mut story = common::load_story("threads.ink.json");

    assert_eq!("Main.\n", story.continue_maximally()?);
    assert_eq!(vec!["Thread choice", "Main choice"], choice_texts(&story));

    Ok(())
}

#[test]
fn choose_thread_choice_test() -> Result<(), StoryError> {
    let mut story = common::load_story("threads.ink.json");

    story.continue_maximally()?;
    story.choose_choice_index(0)?;

    assert_eq!("Picked thread.\n", story.continue_maximally()?);
    assert!(common::is_ended(&story));

    Ok(())
}

#[test]
fn choose_main_choice_test() -> Result<(), StoryError> {
    let mut story = common::load_story("threads.ink.json");

    story.continue_maximally()?;
    story.choose_choice_index(1)?;

    assert_eq!("Picked main.\n", story.continue_maximally()?);
    assert!(common::is_ended(&story));

    Ok(())
}
