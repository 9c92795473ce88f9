//! Line-oriented input parsing for the terminal client.

use minichat_core::{ConversationId, SessionCommand, UserId};
use thiserror::Error;

const DEFAULT_SCROLL_ROWS: isize = 5;

pub const HELP: &str = "\
/user <id>     act as another user
/chat <id>     open a conversation
/new <id>      start a conversation with a user
/more          load more conversations
/older         load older messages
/up [n]        scroll the transcript up
/down [n]      scroll the transcript down
/draft <text>  update the composer without sending
/quit          exit
anything else  send as a message";

/// One parsed line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Forward to the session runtime.
    Session(SessionCommand),
    /// Move the transcript viewport by whole rows.
    Scroll(isize),
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown command '/{0}' (try /help)")]
    UnknownCommand(String),
    #[error("/{command} expects {expected}")]
    MissingArgument {
        command: &'static str,
        expected: &'static str,
    },
    #[error("'{0}' is not a valid number")]
    InvalidNumber(String),
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<Input>, ParseError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let Some(rest) = trimmed.strip_prefix('/') else {
        return Ok(Some(Input::Session(SessionCommand::SendMessage {
            body: line.to_owned(),
        })));
    };

    let (name, argument) = match rest.split_once(char::is_whitespace) {
        Some((name, argument)) => (name, argument.trim()),
        None => (rest, ""),
    };

    let input = match name {
        "user" => Input::Session(SessionCommand::SwitchUser {
            user_id: required_id::<UserId>("user", "a user id", argument)?,
        }),
        "chat" => Input::Session(SessionCommand::SelectConversation {
            conversation_id: required_id::<ConversationId>(
                "chat",
                "a conversation id",
                argument,
            )?,
        }),
        "new" => Input::Session(SessionCommand::CreateConversation {
            participant_id: required_id::<UserId>("new", "a user id", argument)?,
        }),
        "more" => Input::Session(SessionCommand::LoadMoreConversations),
        "older" => Input::Session(SessionCommand::LoadOlderMessages),
        "up" => Input::Scroll(-scroll_rows(argument)?),
        "down" => Input::Scroll(scroll_rows(argument)?),
        "draft" => Input::Session(SessionCommand::ComposerChanged {
            text: argument.to_owned(),
        }),
        "help" | "?" => Input::Help,
        "quit" | "exit" | "q" => Input::Quit,
        other => return Err(ParseError::UnknownCommand(other.to_owned())),
    };
    Ok(Some(input))
}

fn required_id<T: std::str::FromStr>(
    command: &'static str,
    expected: &'static str,
    argument: &str,
) -> Result<T, ParseError> {
    if argument.is_empty() {
        return Err(ParseError::MissingArgument { command, expected });
    }
    argument
        .parse()
        .map_err(|_| ParseError::InvalidNumber(argument.to_owned()))
}

/// Row count for `/up` and `/down`; always non-negative, so negating cannot overflow.
fn scroll_rows(argument: &str) -> Result<isize, ParseError> {
    if argument.is_empty() {
        return Ok(DEFAULT_SCROLL_ROWS);
    }
    argument
        .parse::<usize>()
        .ok()
        .and_then(|rows| isize::try_from(rows).ok())
        .ok_or_else(|| ParseError::InvalidNumber(argument.to_owned()))
}
