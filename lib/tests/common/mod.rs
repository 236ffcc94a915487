#![allow(dead_code)]

use std::{error::Error, fs, path::Path};

use inkrt::{story::Story, story_error::StoryError};

/// Continues until the story stops, collecting the non-empty lines.
pub fn next_all(story: &mut Story, text: &mut Vec<String>) -> Result<(), StoryError> {
    while story.can_continue() {
        let line = story.cont()?;
        print!("{line}");

        if !line.trim().is_empty() {
            text.push(line.trim().to_string());
        }
    }

    if story.has_error() {
        panic!("{}", join_text(story.get_current_errors()));
    }

    Ok(())
}

pub fn join_text(text: &[String]) -> String {
    let mut sb = String::new();

    for s in text {
        sb.push_str(s);
    }

    sb
}

pub fn get_json_string(filename: &str) -> Result<String, Box<dyn Error>> {
    let mut path = Path::new(filename).to_path_buf();

    // Depending on how the tests are launched the current folder is either
    // the crate or the workspace root.
    if !path.exists() {
        path = Path::new("lib").join(path);
    }

    let json = fs::read_to_string(path)?;
    Ok(json)
}

pub fn load_story(filename: &str) -> Story {
    let json = get_json_string(&format!("tests/data/{filename}")).unwrap();
    Story::new(&json).unwrap()
}

pub fn is_ended(story: &Story) -> bool {
    !story.can_continue() && story.get_current_choices().is_empty()
}
