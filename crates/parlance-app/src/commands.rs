//! Parsing of interactive input lines.

use parlance_chat::ConversationId;

pub const HELP: &str = "\
Type a message and press Enter to send it.

  /new             start a new conversation
  /list            list conversations (most recent first, * = active)
  /open <id>       switch to a conversation
  /cancel          stop the reply in progress
  /image <prompt>  generate an image and attach it to the conversation
  /images          list generated images
  /help            show this help
  /quit            exit

Ctrl-C stops a reply in progress, or exits when idle.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    New,
    List,
    Open(ConversationId),
    Cancel,
    Image(String),
    Images,
    Help,
    Quit,
    /// Blank input.
    Nothing,
    /// Malformed command, with a usage hint.
    Usage(&'static str),
    Unknown(String),
}

pub fn parse(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Nothing;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Send(line.to_string());
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    match name {
        "new" => Command::New,
        "list" => Command::List,
        "open" => match arg.parse() {
            Ok(id) => Command::Open(id),
            Err(_) => Command::Usage("usage: /open <id>  (ids are shown by /list)"),
        },
        "cancel" => Command::Cancel,
        "image" if arg.is_empty() => Command::Usage("usage: /image <prompt>"),
        "image" => Command::Image(arg.to_string()),
        "images" => Command::Images,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => Command::Unknown(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_sent_trimmed() {
        assert_eq!(parse("  hello there \n"), Command::Send("hello there".into()));
        assert_eq!(parse("   "), Command::Nothing);
    }

    #[test]
    fn simple_commands() {
        assert_eq!(parse("/new"), Command::New);
        assert_eq!(parse("/list"), Command::List);
        assert_eq!(parse("/cancel"), Command::Cancel);
        assert_eq!(parse("/images"), Command::Images);
        assert_eq!(parse("/help"), Command::Help);
        assert_eq!(parse("/quit"), Command::Quit);
        assert_eq!(parse("/exit"), Command::Quit);
    }

    #[test]
    fn open_takes_an_id() {
        assert_eq!(
            parse("/open 1700000000000"),
            Command::Open(ConversationId(1_700_000_000_000))
        );
        assert!(matches!(parse("/open"), Command::Usage(_)));
        assert!(matches!(parse("/open abc"), Command::Usage(_)));
    }

    #[test]
    fn image_keeps_full_prompt() {
        assert_eq!(
            parse("/image  a red fox  in snow "),
            Command::Image("a red fox  in snow".into())
        );
        assert!(matches!(parse("/image"), Command::Usage(_)));
    }

    #[test]
    fn unknown_command() {
        assert_eq!(parse("/frobnicate now"), Command::Unknown("frobnicate".into()));
    }
}
