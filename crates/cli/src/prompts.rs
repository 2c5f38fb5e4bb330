use std::io::{self, IsTerminal, Write};

use rebuild_lib::env::Prompter;

/// Both ends of the conversation are a terminal.
pub fn is_interactive() -> bool {
  io::stdin().is_terminal() && io::stderr().is_terminal()
}

/// Asks on stderr, reads the answer from stdin. Anything but `y`/`yes` is no.
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
  fn confirm(&mut self, question: &str) -> io::Result<bool> {
    write!(io::stderr(), "{} [y/N] ", question)?;
    io::stderr().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    Ok(matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
  }
}
