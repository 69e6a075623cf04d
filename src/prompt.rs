//! Interactive console prompts used during bootstrap.
//!
//! [`Prompter`] is the seam the bootstrap talks to; [`Console`] implements it
//! over any reader/writer pair so the wizard can be driven from tests.

use std::io::{self, BufRead, Write};

/// Answers collected by the first-run wizard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProfile {
    pub name: String,
    /// `None` when the user left the password blank.
    pub secret: Option<String>,
}

pub trait Prompter {
    /// Walks the user through profile creation.
    fn first_run(&mut self) -> io::Result<NewProfile>;

    /// Asks for the password of a protected profile. Blocks until a line
    /// is entered.
    fn secret(&mut self) -> io::Result<String>;

    /// Prints a plain message to the user.
    fn notice(&mut self, message: &str) -> io::Result<()>;
}

pub struct Console<R, W> {
    input: R,
    output: W,
}

impl Console<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Prints `label`, then reads one line without its trailing newline.
    ///
    /// End of input is an error: the bootstrap cannot continue without
    /// an answer.
    pub fn ask(&mut self, label: &str) -> io::Result<String> {
        write!(self.output, "{label}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input closed while waiting for an answer",
            ));
        }
        let trimmed = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(trimmed);
        Ok(line)
    }

    /// Next line with surrounding whitespace removed, `None` at end of input.
    ///
    /// Unlike [`ask`](Self::ask), end of input is the normal way out.
    pub fn next_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

impl<R: BufRead, W: Write> Prompter for Console<R, W> {
    fn first_run(&mut self) -> io::Result<NewProfile> {
        writeln!(self.output, "Unable to load Navalii profile. Entering setup mode.")?;
        writeln!(self.output)?;
        writeln!(self.output, "Welcome!")?;
        writeln!(
            self.output,
            "This setup utility will get you ready for browsing on Navalii!"
        )?;
        writeln!(self.output)?;
        writeln!(
            self.output,
            "First, let's set up your account. This is just local and is used to store \
             your favorites and customization."
        )?;
        writeln!(self.output)?;

        let name = loop {
            let name = self.ask("Enter a username: ")?;
            let name = name.trim();
            if !name.is_empty() {
                break name.to_string();
            }
            writeln!(self.output, "The username cannot be empty.")?;
        };
        let secret = self.ask("Enter a password or leave it blank for none: ")?;

        writeln!(self.output)?;
        writeln!(self.output, "{name} is a wonderful name!")?;
        writeln!(self.output, "Give us a second to prepare some files...")?;

        Ok(NewProfile {
            name,
            secret: (!secret.is_empty()).then_some(secret),
        })
    }

    fn secret(&mut self) -> io::Result<String> {
        writeln!(self.output, "This account requires a password to log in.")?;
        self.ask("Please input your password: ")
    }

    fn notice(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.output, "{message}")?;
        self.output.flush()
    }
}
