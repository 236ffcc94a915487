use inkrt::story_error::StoryError;

mod common;

#[test]
fn single_choice_test() -> Result<(), StoryError> {
    let mut story = common::load_story("single_choice.ink.json");

    assert_eq!("Start.\n", story.continue_maximally()?);

    let choices = story.get_current_choices();
    assert_eq!(1, choices.len());
    assert_eq!("Go", choices[0].text);
    assert_eq!(0, choices[0].index);

    story.choose_choice_index(0)?;
    assert_eq!("The end.\n", story.cont()?);
    assert!(common::is_ended(&story));

    Ok(())
}

#[test]
fn invalid_choice_index_test() -> Result<(), StoryError> {
    let mut story = common::load_story("single_choice.ink.json");
    story.continue_maximally()?;

    let result = story.choose_choice_index(3);
    assert_eq!(
        Err(StoryError::InvalidChoiceIndex { index: 3, count: 1 }),
        result
    );

    // The failed choice left everything untouched
    assert_eq!(1, story.get_current_choices().len());
    story.choose_choice_index(0)?;
    assert_eq!("The end.\n", story.cont()?);

    Ok(())
}

#[test]
fn once_only_choice_counts_visits_test() -> Result<(), StoryError> {
    let mut story = common::load_story("single_choice.ink.json");
    story.continue_maximally()?;
    story.choose_choice_index(0)?;
    story.continue_maximally()?;

    assert_eq!(1, story.visit_count_at_path_string("ending")?);
    assert!(story.visit_count_at_path_string("nowhere").is_err());

    Ok(())
}

#[test]
fn choose_path_string_test() -> Result<(), StoryError> {
    let mut story = common::load_story("single_choice.ink.json");

    story.choose_path_string("ending", true, &[])?;
    assert_eq!("The end.\n", story.cont()?);

    assert!(matches!(
        story.choose_path_string("nowhere", true, &[]),
        Err(StoryError::PathNotFound(_))
    ));

    Ok(())
}
