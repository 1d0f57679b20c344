use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{InputFile, ParseMode},
};

use mq_core::{
    errors::Error,
    executor::MembersQuery,
    formatting::{
        failure_message, format_results, invalid_chat_message, running_message,
        syntax_error_message, timeout_message, QueryReport, NO_ARGS, USAGE,
    },
};

use crate::router::AppState;
use crate::{member_from_user, TelegramMembership};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum QueryMode {
    /// `/mquery`: a full expression.
    Expression,
    /// `/mjoin`: whitespace-separated groups, intersected.
    Conjunction,
}

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

pub async fn handle_command(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let (cmd, args) = parse_command(text);

    match cmd.as_str() {
        "start" | "help" => reply_html(&bot, &msg, USAGE).await,
        "mquery" if args.is_empty() => reply_html(&bot, &msg, USAGE).await,
        "mquery" => run_query(bot, msg, state, QueryMode::Expression, args).await,
        "mjoin" if args.is_empty() => reply_html(&bot, &msg, NO_ARGS).await,
        "mjoin" => run_query(bot, msg, state, QueryMode::Conjunction, args).await,
        _ => Ok(()),
    }
}

async fn reply_html(bot: &Bot, msg: &Message, html: &str) -> ResponseResult<()> {
    bot.send_message(msg.chat.id, html)
        .parse_mode(ParseMode::Html)
        .reply_to_message_id(msg.id)
        .await?;
    Ok(())
}

async fn run_query(
    bot: Bot,
    msg: Message,
    state: Arc<AppState>,
    mode: QueryMode,
    query: String,
) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let requester = member_from_user(user);

    let running = bot
        .send_message(msg.chat.id, running_message(&query))
        .parse_mode(ParseMode::Html)
        .reply_to_message_id(msg.id)
        .await?;

    let provider = Arc::new(TelegramMembership::new(
        bot.clone(),
        state.roster.clone(),
        requester,
    ));
    let mut executor = MembersQuery::new(provider, state.cache.clone());

    tracing::info!(user_id = user.id.0, ?mode, query = %query, "running query");
    let outcome = tokio::time::timeout(state.cfg.query_timeout, async {
        match mode {
            QueryMode::Expression => executor.execute(&query).await,
            QueryMode::Conjunction => {
                let operands: Vec<&str> = query.split_whitespace().collect();
                executor.execute_simplified(&operands).await
            }
        }
    })
    .await;

    let html = match outcome {
        Err(_) => {
            tracing::warn!(query = %query, "query timed out");
            timeout_message(&query)
        }
        Ok(Err(Error::Syntax(detail))) => syntax_error_message(&query, &detail),
        Ok(Err(Error::InvalidChat { key, reason })) => invalid_chat_message(&key, &reason),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, query = %query, "query failed");
            failure_message(&e.to_string())
        }
        Ok(Ok(result)) => {
            let report = format_results(
                &query,
                &result,
                executor.users(),
                state.cfg.inline_results_limit,
            );
            if let Err(e) = deliver_report(&bot, &msg, &running, report).await {
                tracing::warn!(error = %e, query = %query, "failed to deliver results");
                edit_html(&bot, &running, failure_message(&e.to_string())).await?;
            }
            return Ok(());
        }
    };

    edit_html(&bot, &running, html).await
}

/// Replace the running message with the report. Long inline results continue
/// in follow-up messages; file results are sent as a document.
async fn deliver_report(
    bot: &Bot,
    msg: &Message,
    running: &Message,
    report: QueryReport,
) -> ResponseResult<()> {
    let Some(file) = report.attachment else {
        let mut messages = report.messages().into_iter();
        if let Some(first) = messages.next() {
            edit_html(bot, running, first).await?;
        }
        for rest in messages {
            bot.send_message(msg.chat.id, rest)
                .parse_mode(ParseMode::Html)
                .await?;
        }
        return Ok(());
    };

    bot.send_document(
        msg.chat.id,
        InputFile::memory(file.bytes).file_name(file.file_name),
    )
    .caption(report.text)
    .parse_mode(ParseMode::Html)
    .reply_to_message_id(msg.id)
    .await?;
    let _ = bot.delete_message(running.chat.id, running.id).await;
    Ok(())
}

async fn edit_html(bot: &Bot, message: &Message, html: String) -> ResponseResult<()> {
    bot.edit_message_text(message.chat.id, message.id, html)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}
