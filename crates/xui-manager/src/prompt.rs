//! Line-oriented prompts over any reader/writer pair.
//!
//! Every `ask_*` method returns `Ok(None)` once the input is exhausted, which
//! callers treat as a request to quit.

use std::fmt::Display;
use std::io::{self, BufRead, Write};
use std::str::FromStr;

pub struct Prompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Print one line.
    pub fn say(&mut self, text: impl Display) -> io::Result<()> {
        writeln!(self.output, "{text}")
    }

    /// Read one trimmed line after printing `label`.
    pub fn ask_line(&mut self, label: &str) -> io::Result<Option<String>> {
        write!(self.output, "{label}: ")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            writeln!(self.output)?;
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Ask until the answer parses; an empty answer yields `default` when
    /// there is one.
    pub fn ask_parsed<T>(&mut self, label: &str, default: Option<T>) -> io::Result<Option<T>>
    where
        T: FromStr + Display + Copy,
    {
        let label = match default {
            Some(d) => format!("{label} [{d}]"),
            None => label.to_string(),
        };
        loop {
            let Some(answer) = self.ask_line(&label)? else {
                return Ok(None);
            };
            if answer.is_empty()
                && let Some(d) = default
            {
                return Ok(Some(d));
            }
            match answer.parse() {
                Ok(value) => return Ok(Some(value)),
                Err(_) => self.say("Please enter a number.")?,
            }
        }
    }

    /// Ask for a menu option in `0..=max`.
    pub fn ask_choice(&mut self, label: &str, max: usize, default: usize) -> io::Result<Option<usize>> {
        loop {
            let Some(choice) = self.ask_parsed(label, Some(default))? else {
                return Ok(None);
            };
            if choice <= max {
                return Ok(Some(choice));
            }
            self.say(format_args!("Choose between 0 and {max}."))?;
        }
    }

    /// Yes/no question.
    pub fn confirm(&mut self, label: &str, default: bool) -> io::Result<Option<bool>> {
        let hint = if default { "Y/n" } else { "y/N" };
        loop {
            let Some(answer) = self.ask_line(&format!("{label} [{hint}]"))? else {
                return Ok(None);
            };
            match answer.to_lowercase().as_str() {
                "" => return Ok(Some(default)),
                "y" | "yes" => return Ok(Some(true)),
                "n" | "no" => return Ok(Some(false)),
                _ => self.say("Please answer y or n.")?,
            }
        }
    }
}
