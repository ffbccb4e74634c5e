use crate::environment::Settings;
use crate::interpreter::{self, Session};
use crate::types::Value;
use ansi_term::Colour::Red;
use linefeed::{DefaultTerminal, Interface, ReadResult, Terminal};
use std::path::{Path, PathBuf};
use std::{fmt, fs, io};

#[derive(Debug)]
pub enum Error {
    IO(io::Error),
    Interpreter(interpreter::Error),
    Usage(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::IO(e) => write!(f, "io error: {}", e),
            Error::Interpreter(e) => write!(f, "{}", e),
            Error::Usage(arg) => write!(
                f,
                "unexpected argument {}\nusage: tinylisp [--strict-arity] [FILE]",
                arg
            ),
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::IO(e)
    }
}

impl From<interpreter::Error> for Error {
    fn from(e: interpreter::Error) -> Self {
        Self::Interpreter(e)
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct Options {
    pub settings: Settings,
    pub script: Option<PathBuf>,
}

impl Options {
    /// `args` includes the program name, as `std::env::args` yields it.
    pub fn parse(args: &[String]) -> Result<Self, Error> {
        let mut options = Options::default();
        for arg in args.iter().skip(1) {
            match arg.as_str() {
                "--strict-arity" => options.settings.strict_closure_arity = true,
                flag if flag.starts_with("--") => return Err(Error::Usage(arg.clone())),
                path if options.script.is_none() => options.script = Some(PathBuf::from(path)),
                _ => return Err(Error::Usage(arg.clone())),
            }
        }
        Ok(options)
    }
}

pub fn setup() -> io::Result<Interface<DefaultTerminal>> {
    let interface = linefeed::Interface::new("tinylisp")?;
    interface.set_prompt("user> ")?;
    if let Some(path) = history_path() {
        interface.load_history(path).ok();
    };
    Ok(interface)
}

fn history_path() -> Option<PathBuf> {
    match dirs::data_dir() {
        Some(mut path) => {
            path.push(".tinylisp_history");
            Some(path)
        }
        None => None,
    }
}

pub fn save_history<T: Terminal>(interface: &Interface<T>) -> io::Result<()> {
    match history_path() {
        Some(path) => interface.save_history(path),
        None => Ok(()),
    }
}

/// Faults arrive as `Nop` values; paint them red when printing to a terminal.
pub fn render(value: &Value, colour: bool) -> String {
    let text = interpreter::stringify(value);
    match value.is_nop() && colour {
        true => Red.paint(text).to_string(),
        false => text,
    }
}

pub fn repl<T: Terminal>(interface: &Interface<T>, session: &Session) {
    let colour = atty::is(atty::Stream::Stdout);
    loop {
        match interface.read_line() {
            Ok(ReadResult::Eof) => break,
            Ok(ReadResult::Signal(sig)) => {
                writeln!(interface, "Received signal {:?}", sig).ok();
            }
            Ok(ReadResult::Input(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                interface.add_history_unique(line.clone());
                writeln!(interface, "{}", render(&session.rep(&line), colour)).ok();
            }
            Err(e) => {
                writeln!(interface, "Error: {}", e).ok();
                break;
            }
        }
    }
}

pub fn run_script(path: &Path, session: &Session) -> Result<(), Error> {
    log::info!("running {}", path.display());
    let source = fs::read_to_string(path)?;
    session.run(&source)?;
    Ok(())
}

pub fn launch(args: Vec<String>) -> Result<(), Error> {
    let options = Options::parse(&args)?;
    let session = Session::with_settings(options.settings);
    match &options.script {
        Some(path) => run_script(path, &session),
        None => {
            let interface = setup()?;
            repl(&interface, &session);
            if let Err(e) = save_history(&interface) {
                log::warn!("could not save history: {}", e);
            }
            Ok(())
        }
    }
}
