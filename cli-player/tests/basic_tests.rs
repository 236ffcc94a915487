use assert_cmd::prelude::*;
use predicates::prelude::predicate;
use std::io::Write;
use std::process::{Command, Stdio};

fn run_with_input(input: &[u8]) -> Result<(bool, String), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("inkplay")?;

    cmd.arg("tests/data/choices.ink.json");
    cmd.stdin(Stdio::piped());
    cmd.stdout(Stdio::piped());

    let mut child = cmd.spawn()?;
    let mut stdin = child.stdin.take().unwrap();
    stdin.write_all(input)?;
    drop(stdin);

    let output = child.wait_with_output()?;

    Ok((
        output.status.success(),
        String::from_utf8_lossy(&output.stdout).into_owned(),
    ))
}

#[test]
fn basic_story_test() -> Result<(), Box<dyn std::error::Error>> {
    let (success, output_str) = run_with_input(b"2\n")?;

    assert!(success);
    assert!(output_str.starts_with("Pick one."));
    assert!(output_str.contains("1: Red"));
    assert!(output_str.contains("2: Blue"));
    assert!(output_str.ends_with("You chose blue.\n"));

    Ok(())
}

#[test]
fn quit_command_test() -> Result<(), Box<dyn std::error::Error>> {
    let (success, output_str) = run_with_input(b"quit\n")?;

    assert!(success);
    assert!(!output_str.contains("You chose"));

    Ok(())
}

#[test]
fn end_of_input_exits_test() -> Result<(), Box<dyn std::error::Error>> {
    let (success, _) = run_with_input(b"")?;

    assert!(success);

    Ok(())
}

#[test]
fn auto_play_test() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("inkplay")?;

    cmd.arg("tests/data/choices.ink.json").arg("--auto-play");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Pick one."))
        .stdout(predicate::str::contains("You chose"));

    Ok(())
}

#[test]
fn story_not_found_test() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("inkplay")?;

    cmd.arg("nonexistent.ink.json");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("could not read file"));

    Ok(())
}
