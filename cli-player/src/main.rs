//! Console player for compiled `.ink.json` story files written in the
//! **Ink** language.
use std::{cell::RefCell, fs, io, io::Write, path::Path, rc::Rc};

use anyhow::Context;
use clap::Parser;
use inkrt::{
    choice::Choice,
    story::{
        errors::{ErrorHandler, ErrorType},
        Story,
    },
};
use rand::Rng;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The compiled .ink.json file
    pub json_filename: String,

    /// Choose options randomly
    #[arg(short, long, default_value_t = false)]
    pub auto_play: bool,

    /// Forbid external function fallbacks
    #[arg(short = 'e', long, default_value_t = false)]
    pub forbid_external_fallbacks: bool,

    /// Fail when a function not marked as lookahead safe is reached while
    /// looking past the end of a line
    #[arg(long, default_value_t = false)]
    pub strict_lookahead: bool,
}

enum Command {
    Choose(usize),
    Exit,
    Help,
    Load(String),
    Save(String),
    DivertPath(String),
    Flow(String),
}

struct EHandler {
    pub should_terminate: bool,
}

impl EHandler {
    pub fn new() -> Rc<RefCell<EHandler>> {
        Rc::new(RefCell::new(EHandler {
            should_terminate: false,
        }))
    }
}

impl ErrorHandler for EHandler {
    fn error(&mut self, message: &str, error_type: ErrorType) {
        eprintln!("{}", message);

        if error_type == ErrorType::Error {
            self.should_terminate = true;
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    debug!(file = %args.json_filename, auto_play = args.auto_play, "starting player");

    let json_string = get_json_string(&args.json_filename)?;

    // Remove BOM if it exists
    let json_string_without_bom = json_string.strip_prefix('\u{feff}').unwrap_or(&json_string);

    let mut story = Story::new(json_string_without_bom)
        .with_context(|| format!("could not load story `{}`", args.json_filename))?;
    let err_handler = EHandler::new();
    story.set_error_handler(err_handler.clone());
    story.set_allow_external_function_fallbacks(!args.forbid_external_fallbacks);
    story.set_strict_lookahead(args.strict_lookahead);

    let mut end = false;

    while !end && !err_handler.borrow().should_terminate {
        while story.can_continue() {
            let line = story.cont()?;

            print!("{}", line);

            let tags = story.get_current_tags()?;

            if !tags.is_empty() {
                println!("# tags: {}", tags.join(", "));
            }
        }

        let choices = story.get_current_choices();
        if !choices.is_empty() {
            let command = if args.auto_play {
                let i = rand::thread_rng().gen_range(0..choices.len());

                println!();
                print_choices(&choices);
                println!("?> {}", i + 1);

                Command::Choose(i)
            } else {
                read_input(&choices)?
            };

            end = process_command(command, &mut story)?;
        } else {
            end = true;
        }
    }

    Ok(())
}

// Returns true if the program has to stop
fn process_command(command: Command, story: &mut Story) -> anyhow::Result<bool> {
    match command {
        Command::Choose(c) => story.choose_choice_index(c)?,
        Command::Exit => return Ok(true),
        Command::Load(filename) => {
            let saved_string = get_json_string(&filename)?;
            story.load_state(&saved_string)?;
            println!("Ok.")
        }
        Command::Save(filename) => {
            let json_string = story.save_state()?;
            save_json(&filename, &json_string)?;
            println!("Ok.")
        }
        Command::Flow(flow) => {
            if let Err(desc) = story.switch_flow(&flow) {
                println!("<error switching to '{flow}': {desc}>")
            }
        }
        Command::DivertPath(path) => {
            if let Err(desc) = story.choose_path_string(&path, true, &[]) {
                println!("<error diverting to '{path}': {desc}>")
            }
        }
        Command::Help => println!(
            "Commands:\n\tload <filename>\n\tsave <filename>\n\t-> <divert_path>\n\tswitch <flow_name>\n\tquit\n\t"
        ),
    }

    Ok(false)
}

fn print_choices(choices: &[Choice]) {
    for c in choices {
        println!("{}: {}", c.index + 1, c.text);
    }
}

fn read_input(choices: &[Choice]) -> anyhow::Result<Command> {
    let mut line = String::new();

    loop {
        println!();
        print_choices(choices);
        print!("?> ");
        io::stdout().flush()?;

        line.clear();

        // End of input
        if io::stdin().read_line(&mut line)? == 0 {
            return Ok(Command::Exit);
        }

        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        if let Ok(v) = trimmed.parse::<usize>() {
            if v < 1 || v > choices.len() {
                print_error("option out of range");
                continue;
            }

            return Ok(Command::Choose(v - 1));
        }

        let words: Vec<&str> = trimmed.split_whitespace().collect();
        let argument = || (words.len() == 2).then(|| words[1].to_owned());

        match words[0].to_lowercase().as_str() {
            "exit" | "quit" => return Ok(Command::Exit),
            "help" => return Ok(Command::Help),
            "load" => match argument() {
                Some(f) => return Ok(Command::Load(f)),
                None => print_error("incorrect filename"),
            },
            "save" => match argument() {
                Some(f) => return Ok(Command::Save(f)),
                None => print_error("incorrect filename"),
            },
            "switch" => match argument() {
                Some(f) => return Ok(Command::Flow(f)),
                None => print_error("incorrect flow name"),
            },
            "->" => match argument() {
                Some(p) => return Ok(Command::DivertPath(p)),
                None => print_error("incorrect divert"),
            },
            _ => print_error("unrecognized option or command"),
        }
    }
}

fn print_error(error: &str) {
    eprintln!("<{error}>");
}

fn get_json_string(filename: &str) -> anyhow::Result<String> {
    let path = Path::new(filename);
    let json = fs::read_to_string(path)
        .with_context(|| format!("could not read file `{}`", path.to_string_lossy()))?;

    Ok(json)
}

fn save_json(filename: &str, content: &str) -> anyhow::Result<()> {
    let path = Path::new(filename);
    fs::write(path, content)
        .with_context(|| format!("could not write file `{}`", path.to_string_lossy()))?;

    Ok(())
}
