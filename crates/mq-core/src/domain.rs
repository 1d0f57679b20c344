use std::fmt;

use serde::{Deserialize, Serialize};

/// Telegram user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

/// Telegram chat id (numeric, negative for groups and channels).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatId(pub i64);

/// A chat reference as written in a query: either a numeric id or a username.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChatKey {
    Id(i64),
    Username(String),
}

impl ChatKey {
    /// Integer first, username otherwise. A leading `@` is dropped.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let raw = raw.strip_prefix('@').unwrap_or(raw);
        match raw.parse::<i64>() {
            Ok(id) => Self::Id(id),
            Err(_) => Self::Username(raw.to_string()),
        }
    }

    /// `me` and `self` refer to the current session's own user.
    pub fn is_self_alias(&self) -> bool {
        matches!(self, Self::Username(name) if name == "me" || name == "self")
    }
}

impl fmt::Display for ChatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Username(name) => write!(f, "{name}"),
        }
    }
}

/// What a resolved chat reference points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatKind {
    User,
    Group,
    Channel,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatInfo {
    pub id: ChatId,
    pub kind: ChatKind,
    pub title: Option<String>,
}

/// A chat member as far as the bot knows it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: UserId,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

impl Member {
    pub fn new(id: i64, first_name: &str) -> Self {
        Self {
            id: UserId(id),
            first_name: first_name.to_string(),
            last_name: None,
            username: None,
        }
    }

    pub fn display_name(&self) -> String {
        match (&self.last_name, self.first_name.is_empty()) {
            (Some(last), false) => format!("{} {last}", self.first_name),
            (Some(last), true) => last.clone(),
            (None, false) => self.first_name.clone(),
            (None, true) => "Deleted Account".to_string(),
        }
    }
}
