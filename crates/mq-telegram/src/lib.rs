//! Telegram adapter (teloxide).
//!
//! Implements the `mq-core` MembershipProvider over the Telegram Bot API and
//! serves the `/mquery` and `/mjoin` commands.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;

use teloxide::{prelude::*, types::Recipient, ApiError, RequestError};

pub mod handlers;
pub mod router;

use mq_core::{
    domain::{ChatId, ChatInfo, ChatKey, ChatKind, Member, UserId},
    errors::Error,
    ports::MembershipProvider,
    roster::RosterBook,
    Result,
};

/// Membership provider for one query issued by `requester`.
///
/// The Bot API only lists administrators; they are merged with the members
/// the bot has observed in the chat.
#[derive(Clone)]
pub struct TelegramMembership {
    bot: Bot,
    roster: Arc<RosterBook>,
    requester: Member,
}

impl TelegramMembership {
    pub fn new(bot: Bot, roster: Arc<RosterBook>, requester: Member) -> Self {
        Self {
            bot,
            roster,
            requester,
        }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn recipient(key: &ChatKey) -> Recipient {
        match key {
            ChatKey::Id(id) => Recipient::Id(teloxide::types::ChatId(*id)),
            ChatKey::Username(name) => Recipient::ChannelUsername(format!("@{name}")),
        }
    }
}

pub fn member_from_user(user: &teloxide::types::User) -> Member {
    Member {
        id: UserId(user.id.0 as i64),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        username: user.username.clone(),
    }
}

fn chat_kind(chat: &teloxide::types::Chat) -> ChatKind {
    if chat.is_private() {
        ChatKind::User
    } else if chat.is_channel() {
        ChatKind::Channel
    } else {
        ChatKind::Group
    }
}

fn map_lookup_err(e: RequestError) -> Error {
    match e {
        RequestError::Api(api) => Error::NotFound(api.to_string()),
        other => Error::External(format!("telegram error: {other}")),
    }
}

fn map_listing_err(e: RequestError) -> Error {
    match e {
        RequestError::Api(ApiError::ChatNotFound) => Error::NotFound("chat not found".to_string()),
        RequestError::Api(api) => Error::Forbidden(api.to_string()),
        other => Error::External(format!("telegram error: {other}")),
    }
}

#[async_trait]
impl MembershipProvider for TelegramMembership {
    async fn current_user(&self) -> Result<Member> {
        Ok(self.requester.clone())
    }

    async fn resolve_chat(&self, key: &ChatKey) -> Result<ChatInfo> {
        let chat = self
            .bot
            .get_chat(Self::recipient(key))
            .await
            .map_err(map_lookup_err)?;

        Ok(ChatInfo {
            id: ChatId(chat.id.0),
            kind: chat_kind(&chat),
            title: chat.title().map(str::to_string),
        })
    }

    async fn list_members(&self, chat: &ChatInfo) -> Result<Vec<Member>> {
        let admins = self
            .bot
            .get_chat_administrators(Self::tg_chat(chat.id))
            .await
            .map_err(map_listing_err)?;

        let mut by_id: HashMap<UserId, Member> = self
            .roster
            .members(chat.id)
            .await
            .into_iter()
            .map(|m| (m.id, m))
            .collect();
        for admin in &admins {
            let m = member_from_user(&admin.user);
            by_id.insert(m.id, m);
        }

        tracing::debug!(
            chat_id = chat.id.0,
            admins = admins.len(),
            total = by_id.len(),
            "listed chat members"
        );
        Ok(by_id.into_values().collect())
    }
}
