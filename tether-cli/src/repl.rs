use anyhow::{Context, Result, bail};
use tether_core::RemoteControlEvent;

pub const HELP: &str =
    "commands: move X Y | down X Y [BTN] | up X Y [BTN] | wheel DX DY | key KEY CODE | quit";

#[derive(Debug, PartialEq)]
pub enum ReplCommand {
    Send(RemoteControlEvent),
    Quit,
}

/// `Ok(None)` for a blank line.
pub fn parse_line(line: &str) -> Result<Option<ReplCommand>> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((&verb, args)) = words.split_first() else {
        return Ok(None);
    };

    let event = match (verb, args) {
        ("quit" | "exit", []) => return Ok(Some(ReplCommand::Quit)),
        ("move", [x, y]) => RemoteControlEvent::mouse_move(number(x)?, number(y)?),
        ("down", [x, y]) => RemoteControlEvent::mouse_down(number(x)?, number(y)?, 0),
        ("down", [x, y, button]) => {
            RemoteControlEvent::mouse_down(number(x)?, number(y)?, number(button)?)
        }
        ("up", [x, y]) => RemoteControlEvent::mouse_up(number(x)?, number(y)?, 0),
        ("up", [x, y, button]) => {
            RemoteControlEvent::mouse_up(number(x)?, number(y)?, number(button)?)
        }
        ("wheel", [dx, dy]) => RemoteControlEvent::wheel(number(dx)?, number(dy)?),
        ("key", [key, code]) => RemoteControlEvent::key_down(*key, *code),
        _ => bail!("unrecognized command `{}`; {}", line.trim(), HELP),
    };
    Ok(Some(ReplCommand::Send(event)))
}

fn number<T: std::str::FromStr>(raw: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse()
        .with_context(|| format!("`{raw}` is not a number"))
}
