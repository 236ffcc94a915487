use inkrt::{ink_list::InkList, story_error::StoryError};

mod common;

#[test]
fn list_operations_test() -> Result<(), StoryError> {
    let mut story = common::load_story("lists.ink.json");

    assert_eq!("green\n", story.cont()?);
    assert_eq!("2\n", story.cont()?);
    assert_eq!("blue\n", story.cont()?);

    let colours = story.get_variable("colours").unwrap();
    let list = colours.get::<&InkList>().unwrap();

    assert_eq!(2, list.len());
    assert!(list.contains_item_named("green"));
    assert!(list.contains_item_named("blue"));
    assert!(!list.contains_item_named("red"));

    Ok(())
}
