use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_USER_SERVER: &str = "s.whatsapp.net";
pub const GROUP_SERVER: &str = "g.us";
pub const LEGACY_USER_SERVER: &str = "c.us";
pub const BROADCAST_SERVER: &str = "broadcast";
pub const HIDDEN_USER_SERVER: &str = "lid";
pub const NEWSLETTER_SERVER: &str = "newsletter";

pub type MessageId = String;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JidError {
    #[error("Invalid JID format: {0}")]
    InvalidFormat(String),
    #[error("Invalid JID {0}: no user specified")]
    MissingUser(String),
    #[error("Invalid JID {0}: no server specified")]
    MissingServer(String),
    #[error("Invalid phone number {0}: only digits are allowed")]
    InvalidPhoneNumber(String),
    #[error("Failed to parse component: {0}")]
    Parse(#[from] std::num::ParseIntError),
}

/// Server class of a JID, derived from the domain after `@`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Server {
    #[default]
    User,
    Group,
    Broadcast,
    Legacy,
    Hidden,
    Newsletter,
    Other(String),
}

impl Server {
    pub fn as_str(&self) -> &str {
        match self {
            Server::User => DEFAULT_USER_SERVER,
            Server::Group => GROUP_SERVER,
            Server::Broadcast => BROADCAST_SERVER,
            Server::Legacy => LEGACY_USER_SERVER,
            Server::Hidden => HIDDEN_USER_SERVER,
            Server::Newsletter => NEWSLETTER_SERVER,
            Server::Other(s) => s,
        }
    }
}

impl From<&str> for Server {
    fn from(s: &str) -> Self {
        match s {
            DEFAULT_USER_SERVER => Server::User,
            GROUP_SERVER => Server::Group,
            BROADCAST_SERVER => Server::Broadcast,
            LEGACY_USER_SERVER => Server::Legacy,
            HIDDEN_USER_SERVER => Server::Hidden,
            NEWSLETTER_SERVER => Server::Newsletter,
            other => Server::Other(other.to_string()),
        }
    }
}

impl From<String> for Server {
    fn from(s: String) -> Self {
        Server::from(s.as_str())
    }
}

impl From<Server> for String {
    fn from(server: Server) -> Self {
        server.as_str().to_string()
    }
}

impl fmt::Display for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Jid {
    pub user: String,
    pub server: Server,
    pub agent: u8,
    pub device: u16,
}

impl Jid {
    pub fn new(user: &str, server: Server) -> Self {
        Self {
            user: user.to_string(),
            server,
            ..Default::default()
        }
    }

    pub fn is_group(&self) -> bool {
        self.server == Server::Group
    }
}

impl FromStr for Jid {
    type Err = JidError;

    /// Full parse of `user[.agent][:device]@server`. A string without `@`
    /// is taken as a bare server JID.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (user_part, server) = match s.split_once('@') {
            Some((u, srv)) => (u, srv),
            None => return Ok(Jid::new("", Server::from(s))),
        };

        if server.contains('@') {
            return Err(JidError::InvalidFormat(s.to_string()));
        }

        let server = Server::from(server);
        let mut user = user_part;
        let mut agent = 0;
        let mut device = 0;

        // LID users may contain dots that belong to the identity.
        if server == Server::Hidden {
            if let Some((u, d)) = user_part.rsplit_once(':') {
                user = u;
                device = d.parse()?;
            }
            return Ok(Jid {
                user: user.to_string(),
                server,
                agent,
                device,
            });
        }

        if let Some((u, ad)) = user_part.split_once('.') {
            if ad.contains('.') {
                return Err(JidError::InvalidFormat(s.to_string()));
            }
            user = u;
            match ad.split_once(':') {
                Some((a, d)) => {
                    if d.contains(':') {
                        return Err(JidError::InvalidFormat(s.to_string()));
                    }
                    agent = a.parse()?;
                    device = d.parse()?;
                }
                None => agent = ad.parse()?,
            }
        } else if let Some((u, d)) = user_part.split_once(':') {
            if d.contains(':') {
                return Err(JidError::InvalidFormat(s.to_string()));
            }
            user = u;
            device = d.parse()?;
        }

        Ok(Jid {
            user: user.to_string(),
            server,
            agent,
            device,
        })
    }
}

impl fmt::Display for Jid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.user.is_empty() {
            write!(f, "{}", self.server)
        } else {
            write!(f, "{}", self.user)?;
            if self.agent > 0 {
                write!(f, ".{}", self.agent)?;
            }
            if self.device > 0 {
                write!(f, ":{}", self.device)?;
            }
            write!(f, "@{}", self.server)
        }
    }
}

/// Parses a user-supplied recipient.
///
/// A leading `+` is dropped. Without a domain separator the input must be a
/// phone number and becomes a JID on the default user server. With a
/// separator the input goes through the full parser and must name a user
/// and a server.
pub fn parse_recipient(raw: &str) -> Result<Jid, JidError> {
    let arg = raw.strip_prefix('+').unwrap_or(raw);

    if !arg.contains('@') {
        if arg.is_empty() || !arg.bytes().all(|b| b.is_ascii_digit()) {
            return Err(JidError::InvalidPhoneNumber(raw.to_string()));
        }
        return Ok(Jid::new(arg, Server::User));
    }

    let jid: Jid = arg.parse()?;
    if jid.user.is_empty() {
        return Err(JidError::MissingUser(raw.to_string()));
    }
    if jid.server.as_str().is_empty() {
        return Err(JidError::MissingServer(raw.to_string()));
    }
    Ok(jid)
}
