//! Line-oriented operator channel.
//!
//! Reads commands from the foreground input stream concurrently with the
//! scheduler: `set <int>` writes the counter, `get` prints it, `quit`
//! requests shutdown. Anything else, including a malformed integer, is
//! silently ignored — mirrors the source behavior, flagged as a gap rather
//! than fixed here.

use std::io::{BufRead, Write};

use crate::cancel::CancelToken;
use crate::region::SharedRegion;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Set(i64),
    Get,
    Quit,
}

pub fn parse(line: &str) -> Option<Command> {
    let mut parts = line.split_whitespace();
    match parts.next()? {
        "set" => parts.next()?.parse::<i64>().ok().map(Command::Set),
        "get" => Some(Command::Get),
        "quit" => Some(Command::Quit),
        _ => None,
    }
}

/// Drive the channel until `quit`, end of input, or cancellation.
///
/// The read blocks, so a token tripped elsewhere only takes effect once the
/// stream yields a line or closes; stdin may keep this thread parked past
/// shutdown (accepted limitation).
pub fn run<R, W>(
    input: R,
    mut output: W,
    region: &SharedRegion,
    cancel: &CancelToken,
) -> Result<()>
where
    R: BufRead,
    W: Write,
{
    for line in input.lines() {
        if cancel.is_cancelled() {
            break;
        }
        let line = line?;
        match parse(&line) {
            Some(Command::Set(value)) => region.set_counter(value)?,
            Some(Command::Get) => {
                writeln!(output, "{}", region.counter()?)?;
                output.flush()?;
            }
            Some(Command::Quit) => {
                cancel.cancel();
                break;
            }
            None => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::SharedRegion;
    use std::io::Cursor;
    use tempfile::tempdir;

    #[test]
    fn parses_known_commands() {
        assert_eq!(parse("set 42"), Some(Command::Set(42)));
        assert_eq!(parse("set -7"), Some(Command::Set(-7)));
        assert_eq!(parse("  get  "), Some(Command::Get));
        assert_eq!(parse("quit"), Some(Command::Quit));
    }

    #[test]
    fn garbage_is_silently_ignored() {
        assert_eq!(parse(""), None);
        assert_eq!(parse("set"), None);
        assert_eq!(parse("set abc"), None);
        assert_eq!(parse("frobnicate 3"), None);
    }

    #[test]
    fn set_then_get_round_trips() {
        let dir = tempdir().expect("tempdir");
        let region = SharedRegion::attach_or_create(&dir.path().join("counter.region"))
            .expect("attach");
        let cancel = CancelToken::new();

        let input = Cursor::new("set 42\nnoise\nget\nquit\nget\n");
        let mut output = Vec::new();
        run(input, &mut output, &region, &cancel).expect("run");

        assert_eq!(String::from_utf8(output).expect("utf8"), "42\n");
        assert_eq!(region.counter().expect("counter"), 42);
        assert!(cancel.is_cancelled());
    }
}
