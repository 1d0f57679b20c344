//! Telegram update handlers.
//!
//! Every group message feeds the observed roster; commands from authorized
//! users are routed to `commands`.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use mq_core::domain::{ChatId, UserId};
use mq_core::security::is_authorized;

use crate::member_from_user;
use crate::router::AppState;

mod commands;

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    observe_members(&msg, &state).await;

    let Some(text) = msg.text() else {
        return Ok(());
    };
    if !text.starts_with('/') {
        return Ok(());
    }

    let user_id = msg.from().map(|u| UserId(u.id.0 as i64));
    if !is_authorized(user_id, &state.cfg.telegram_allowed_users) {
        // Stay quiet in groups; other bots' commands land here too.
        if msg.chat.is_private() {
            let _ = bot
                .send_message(
                    msg.chat.id,
                    "Unauthorized. Contact the bot owner for access.",
                )
                .await;
        }
        return Ok(());
    }

    commands::handle_command(bot, msg, state).await
}

async fn observe_members(msg: &Message, state: &AppState) {
    if msg.chat.is_private() {
        return;
    }
    let chat = ChatId(msg.chat.id.0);

    if let Some(user) = msg.from() {
        state.roster.observe(chat, member_from_user(user)).await;
    }
    if let Some(joined) = msg.new_chat_members() {
        for user in joined {
            state.roster.observe(chat, member_from_user(user)).await;
        }
    }
    if let Some(left) = msg.left_chat_member() {
        state
            .roster
            .forget(chat, UserId(left.id.0 as i64))
            .await;
    }
}
