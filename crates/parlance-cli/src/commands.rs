use parlance_llm::SafetyPreset;
use thiserror::Error;

/// One line of REPL input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Plain text to send
    Message(String),
    New,
    List,
    /// 1-based position in `/list`
    Open(usize),
    Delete(usize),
    Stop,
    Model(String),
    Models,
    /// Empty clears the prompt
    Prompt(String),
    Safety(SafetyPreset),
    /// Empty clears the key
    Key(String),
    Status,
    Help,
    Quit,
    Empty,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("Unknown command /{0} (try /help)")]
    UnknownCommand(String),

    #[error("/{command} needs {what}")]
    MissingArgument {
        command: &'static str,
        what: &'static str,
    },

    #[error("'{0}' is not a chat number from /list")]
    BadIndex(String),

    #[error("{0}")]
    BadPreset(String),
}

pub const HELP: &str = "\
Commands:
  /new              start a new chat
  /list             list chats
  /open <n>         open chat n from /list
  /delete <n>       delete chat n from /list
  /stop             stop the reply in progress
  /model <id>       switch model
  /models           list models available to your key
  /prompt [text]    set the system prompt (empty clears it)
  /safety <preset>  default, strict, balanced, relaxed or off
  /key [key]        set the API key (empty clears it)
  /status           show connection and settings
  /quit             save and exit
Anything else is sent as a message.";

fn index(command: &'static str, arg: &str) -> Result<usize, InputError> {
    if arg.is_empty() {
        return Err(InputError::MissingArgument {
            command,
            what: "a chat number",
        });
    }
    match arg.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(InputError::BadIndex(arg.to_string())),
    }
}

pub fn parse_input(line: &str) -> Result<Input, InputError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Input::Empty);
    }
    let Some(command) = line.strip_prefix('/') else {
        return Ok(Input::Message(line.to_string()));
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };

    match name.to_ascii_lowercase().as_str() {
        "new" => Ok(Input::New),
        "list" | "ls" => Ok(Input::List),
        "open" => index("open", arg).map(Input::Open),
        "delete" | "rm" => index("delete", arg).map(Input::Delete),
        "stop" => Ok(Input::Stop),
        "model" if arg.is_empty() => Err(InputError::MissingArgument {
            command: "model",
            what: "a model id",
        }),
        "model" => Ok(Input::Model(arg.to_string())),
        "models" => Ok(Input::Models),
        "prompt" => Ok(Input::Prompt(arg.to_string())),
        "safety" => arg
            .parse()
            .map(Input::Safety)
            .map_err(InputError::BadPreset),
        "key" => Ok(Input::Key(arg.to_string())),
        "status" => Ok(Input::Status),
        "help" | "?" => Ok(Input::Help),
        "quit" | "exit" | "q" => Ok(Input::Quit),
        other => Err(InputError::UnknownCommand(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_a_message() {
        assert_eq!(
            parse_input("  Hello there \n"),
            Ok(Input::Message("Hello there".to_string()))
        );
        assert_eq!(parse_input("   "), Ok(Input::Empty));
    }

    #[test]
    fn test_commands_with_arguments() {
        assert_eq!(parse_input("/open 2"), Ok(Input::Open(2)));
        assert_eq!(parse_input("/DELETE  3"), Ok(Input::Delete(3)));
        assert_eq!(
            parse_input("/model gemini-2.0-flash"),
            Ok(Input::Model("gemini-2.0-flash".to_string()))
        );
        assert_eq!(
            parse_input("/prompt Answer like a pirate"),
            Ok(Input::Prompt("Answer like a pirate".to_string()))
        );
        assert_eq!(parse_input("/prompt"), Ok(Input::Prompt(String::new())));
        assert_eq!(parse_input("/safety off"), Ok(Input::Safety(SafetyPreset::Off)));
        assert_eq!(parse_input("/quit"), Ok(Input::Quit));
    }

    #[test]
    fn test_bad_arguments() {
        assert_eq!(parse_input("/open 0"), Err(InputError::BadIndex("0".to_string())));
        assert_eq!(parse_input("/open x"), Err(InputError::BadIndex("x".to_string())));
        assert!(matches!(
            parse_input("/open"),
            Err(InputError::MissingArgument { command: "open", .. })
        ));
        assert!(matches!(parse_input("/model"), Err(InputError::MissingArgument { .. })));
        assert!(matches!(parse_input("/safety loud"), Err(InputError::BadPreset(_))));
        assert_eq!(
            parse_input("/frobnicate"),
            Err(InputError::UnknownCommand("frobnicate".to_string()))
        );
    }
}
