//! Command line handling
//!
//! Options use the slash form (`/d`, `/h`), which is why they are matched by
//! hand rather than through an argument parser.

pub const USAGE: &str = "\
Usage: tlink-opc-bridge [/d | /debug] [/h | /help]

  /d, /debug    verbose logging
  /h, /help     print this help and exit

Reads config.json from the working directory.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Run { debug: bool },
    Help,
}

/// Parse arguments (without the program name)
pub fn parse<I, S>(args: I) -> Result<Command, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut debug = false;
    for arg in args {
        match arg.as_ref() {
            "/d" | "/debug" => debug = true,
            "/h" | "/help" => return Ok(Command::Help),
            other => {
                return Err(format!(
                    "unknown option: {}\nuse /h to list the available options",
                    other
                ))
            }
        }
    }
    Ok(Command::Run { debug })
}
