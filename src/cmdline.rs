use crate::environment::Environment;
use crate::interpreter;
use crate::reader::Reader;
use ansi_term::Colour;
use linefeed::{DefaultTerminal, Interface, ReadResult, Terminal};
use std::fmt;
use std::fs::read_to_string;
use std::path::{Path, PathBuf};

const USAGE: &str = "usage: csxp [-e FILE | -t FILE | -h | -v]

  (no flags)         start the REPL
  -e, --exec FILE    evaluate every form in FILE
  -t, --test FILE    read FILE and print each form without evaluating it
  -h, --help         show this message
  -v, --version      show the version";

#[derive(Debug)]
pub enum Error {
    Usage(String),
    IO(std::io::Error),
    Interpreter(interpreter::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Usage(msg) => write!(f, "{}\n{}", msg, USAGE),
            Error::IO(e) => write!(f, "io error: {}", e),
            Error::Interpreter(e) => write!(f, "{}", e),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::IO(e)
    }
}

impl From<interpreter::Error> for Error {
    fn from(e: interpreter::Error) -> Self {
        Self::Interpreter(e)
    }
}

pub fn launch(args: Vec<String>, env: &mut Environment) -> Result<(), Error> {
    let flags: Vec<&str> = args.iter().skip(1).map(String::as_str).collect();
    match flags.as_slice() {
        [] => {
            let interface = setup()?;
            repl(&interface, env)?;
            save_history(&interface)?;
            Ok(())
        }
        ["-e", path] | ["--exec", path] => {
            interpreter::load_file(Path::new(path), env).map_err(|e| {
                eprintln!("{}", paint_error(&e, atty::Stream::Stderr));
                Error::from(e)
            })?;
            Ok(())
        }
        ["-t", path] | ["--test", path] => dump_forms(Path::new(path)),
        ["-h"] | ["--help"] => {
            println!("{}", USAGE);
            Ok(())
        }
        ["-v"] | ["--version"] => {
            println!("csxp {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        _ => Err(Error::Usage(format!("unrecognised arguments: {}", flags.join(" ")))),
    }
}

/// Prints each top-level form as the reader sees it.
fn dump_forms(path: &Path) -> Result<(), Error> {
    let src = read_to_string(path)?;
    for form in Reader::new(&src, &path.to_string_lossy()) {
        match form {
            Ok(form) => println!("{}", form),
            Err(e) => {
                let e = interpreter::Error::Read(e);
                eprintln!("{}", paint_error(&e, atty::Stream::Stderr));
                return Err(e.into());
            }
        }
    }
    Ok(())
}

fn paint_error(e: &interpreter::Error, stream: atty::Stream) -> String {
    let text = format!("Error: {}", e);
    match atty::is(stream) {
        true => Colour::Red.paint(text).to_string(),
        false => text,
    }
}

pub fn setup() -> std::io::Result<Interface<DefaultTerminal>> {
    let interface = linefeed::Interface::new("csxp")?;
    if let Some(path) = history_path() {
        interface.load_history(path).ok();
    };
    Ok(interface)
}

fn history_path() -> Option<PathBuf> {
    match dirs::data_dir() {
        Some(mut path) => {
            path.push(".csxp_history");
            Some(path)
        }
        None => None,
    }
}

pub fn save_history<T: Terminal>(interface: &Interface<T>) -> std::io::Result<()> {
    match history_path() {
        Some(path) => interface.save_history(path),
        None => Ok(()),
    }
}

fn prompt(env: &Environment, continuing: bool) -> String {
    let ns = env.curr_ns().unwrap_or_else(|| "user".into());
    match continuing {
        false => format!("{}> ", ns),
        true => format!("{}> ", " ".repeat(ns.len())),
    }
}

/// Reads lines until they hold only complete forms, then evaluates those
/// forms and prints each result.
pub fn repl<T: Terminal>(interface: &Interface<T>, env: &mut Environment) -> std::io::Result<()> {
    let mut pending = String::new();
    loop {
        interface.set_prompt(&prompt(env, !pending.is_empty()))?;
        match interface.read_line()? {
            ReadResult::Eof => break,
            ReadResult::Signal(sig) => {
                writeln!(interface, "Received signal {:?}", sig)?;
                pending.clear();
            }
            ReadResult::Input(line) => {
                interface.add_history_unique(line.clone());
                pending.push_str(&line);
                pending.push('\n');
                if rep(interface, &pending, env)? {
                    pending.clear();
                }
            }
        }
    }
    Ok(())
}

/// Returns false when the input ends part way through a form.
fn rep<T: Terminal>(
    interface: &Interface<T>,
    src: &str,
    env: &mut Environment,
) -> std::io::Result<bool> {
    let mut forms = Vec::new();
    let mut read_error = None;
    for form in Reader::new(src, "repl") {
        match form {
            Ok(form) => forms.push(form),
            Err(e) if e.is_incomplete() => return Ok(false),
            Err(e) => {
                read_error = Some(interpreter::Error::Read(e));
                break;
            }
        }
    }
    for form in forms {
        match env.eval(&form) {
            Ok(value) => writeln!(interface, "{}", value)?,
            Err(e) => {
                let e = interpreter::Error::from(e);
                writeln!(interface, "{}", paint_error(&e, atty::Stream::Stdout))?;
                return Ok(true);
            }
        }
    }
    if let Some(e) = read_error {
        writeln!(interface, "{}", paint_error(&e, atty::Stream::Stdout))?;
    }
    Ok(true)
}
