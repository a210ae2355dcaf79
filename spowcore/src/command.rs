use crate::jid::{Jid, JidError, parse_recipient};

/// Sentinel first argument that keeps the session open interactively.
pub const LOGIN_SENTINEL: &str = "login";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    PairPhone { phone: String },
    Reconnect,
    Logout,
    ListGroups,
    Send { target: Jid, body: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UsageError {
    #[error("Usage: pair-phone <number>")]
    PairPhone,
    #[error("Usage: send <jid> <text>")]
    Send,
    #[error(transparent)]
    InvalidJid(#[from] JidError),
}

impl Command {
    /// Builds a command from a verb and its arguments.
    ///
    /// The verb is case insensitive. Unknown verbs yield `Ok(None)`; callers
    /// treat them as a no-op.
    pub fn parse<S: AsRef<str>>(verb: &str, args: &[S]) -> Result<Option<Self>, UsageError> {
        let command = match verb.to_lowercase().as_str() {
            "pair-phone" => match args {
                [phone] => Command::PairPhone {
                    phone: phone.as_ref().to_string(),
                },
                _ => return Err(UsageError::PairPhone),
            },
            "reconnect" => Command::Reconnect,
            "logout" => Command::Logout,
            "list" => Command::ListGroups,
            "send" => {
                let [target, words @ ..] = args else {
                    return Err(UsageError::Send);
                };
                if words.is_empty() {
                    return Err(UsageError::Send);
                }
                let body = words
                    .iter()
                    .map(|w| w.as_ref())
                    .collect::<Vec<&str>>()
                    .join(" ");
                Command::Send {
                    target: parse_recipient(target.as_ref())?,
                    body,
                }
            }
            _ => return Ok(None),
        };
        Ok(Some(command))
    }

    pub fn verb(&self) -> &'static str {
        match self {
            Command::PairPhone { .. } => "pair-phone",
            Command::Reconnect => "reconnect",
            Command::Logout => "logout",
            Command::ListGroups => "list",
            Command::Send { .. } => "send",
        }
    }
}

/// What a process invocation asks for, decided from its positional arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Stay connected until interrupted or stdin closes.
    Login,
    /// Run a single verb and exit.
    Command { verb: String, args: Vec<String> },
    /// No arguments: relay the staged message to targets read from stdin.
    Share,
}

impl Invocation {
    pub fn from_args(args: &[String]) -> Self {
        match args {
            [] => Invocation::Share,
            [first, ..] if first == LOGIN_SENTINEL => Invocation::Login,
            [verb, rest @ ..] => Invocation::Command {
                verb: verb.to_lowercase(),
                args: rest.to_vec(),
            },
        }
    }
}
