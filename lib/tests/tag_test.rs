use inkrt::story_error::StoryError;

mod common;

#[test]
fn tags_test() -> Result<(), StoryError> {
    let mut story = common::load_story("tags.ink.json");

    let global_tags = vec!["author: Joe".to_owned()];
    let knot_tags = vec!["knot tag".to_owned()];

    assert_eq!(global_tags, story.global_tags()?);
    assert_eq!(knot_tags, story.tags_for_content_at_path("knot")?);

    assert_eq!("A line\n", story.cont()?);
    assert_eq!(vec!["author: Joe", "tag1"], story.get_current_tags()?);

    assert_eq!("No tags here.\n", story.cont()?);
    assert!(story.get_current_tags()?.is_empty());

    assert_eq!("In knot.\n", story.cont()?);
    assert_eq!(knot_tags, story.get_current_tags()?);

    Ok(())
}

#[test]
fn tags_for_unknown_path_test() {
    let story = common::load_story("tags.ink.json");

    assert_eq!(
        Err(StoryError::PathNotFound("nowhere".to_owned())),
        story.tags_for_content_at_path("nowhere")
    );
}
