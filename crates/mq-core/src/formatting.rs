//! Rendering of query results and user-facing messages (Telegram HTML).

use std::collections::HashMap;

use crate::{
    domain::{ChatKey, Member, UserId},
    query::MemberSet,
};

/// Results above this count go into a file instead of the message body.
pub const DEFAULT_INLINE_RESULTS_LIMIT: usize = 30;

/// Telegram's cap on message text.
pub const MESSAGE_LIMIT: usize = 4096;

/// Telegram's cap on a document caption.
pub const CAPTION_LIMIT: usize = 1024;

/// Longest echo of user input, in chars.
const ECHO_LIMIT: usize = 100;

pub const USAGE: &str = "\
📝 <b>Members query syntax</b>

Specify groups as a username (with or without @) or chat ID. Channels are accepted too, \
but only members the bot can see are listed.
Specify yourself as <code>me</code> or <code>self</code>.

Each group is a set of its members. Available operations:
<code>&amp;</code>, <code>and</code> — intersection (members of both groups <b>at the same time</b>)
<code>|</code>, <code>or</code>, <code>+</code> — union (members of A, B or both)
<code>-</code> — difference (members of A that are not in B)
<code>^</code> — symmetric difference (members of A or B, but not both)
<code>~</code>, <code>not</code>, unary <code>-</code> — negation (everybody except members of the group)

<b>Examples</b>:
<code>/mquery @mymusicgroup and @mychessgroup</code> — members of both groups
<code>/mquery @mychannel &amp; ~@mychannelchat</code> — subscribers who didn't join the chat yet
<code>/mquery groupa | groupb | groupc</code> — members of any of these groups
<code>/mquery -1001234567890 - me</code> — members of a private group except yourself
<code>/mjoin groupa groupb</code> — shorthand for <code>groupa &amp; groupb</code>

ℹ️ Member lists are cached for a few minutes.";

pub const NO_ARGS: &str = "❌ <b>Specify at least one group</b>";

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Shorten to at most `max_chars` chars, marking the cut with an ellipsis.
fn clip(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

/// User input as it appears inside our messages.
fn echo(text: &str) -> String {
    escape_html(&clip(text, ECHO_LIMIT))
}

pub fn running_message(query: &str) -> String {
    format!("🕑 <b>Executing query <code>{}</code>...</b>", echo(query))
}

pub fn syntax_error_message(query: &str, detail: &str) -> String {
    format!(
        "❌ <b>You have a syntax error in query <code>{}</code>:</b>\n<code>{}</code>",
        echo(query),
        echo(detail)
    )
}

pub fn invalid_chat_message(key: &ChatKey, reason: &str) -> String {
    format!(
        "❌ <b>Invalid chat ID {}:</b>\n<code>{}</code>",
        echo(&key.to_string()),
        echo(reason)
    )
}

pub fn timeout_message(query: &str) -> String {
    format!("⌛ <b>Query <code>{}</code> timed out</b>", echo(query))
}

pub fn failure_message(detail: &str) -> String {
    format!("❌ <b>Query failed:</b>\n<code>{}</code>", echo(detail))
}

/// Pack whole lines into chunks of at most `limit` bytes.
///
/// Each line must be balanced HTML by itself. A line longer than `limit` is
/// cut at a char boundary.
pub fn split_html_lines(html: &str, limit: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut chunk = String::new();

    for mut line in html.split('\n') {
        while line.len() > limit {
            if !chunk.is_empty() {
                out.push(std::mem::take(&mut chunk));
            }
            let (head, tail) = split_utf8_prefix(line, limit);
            out.push(head.to_string());
            line = tail;
        }

        if !chunk.is_empty() && chunk.len() + 1 + line.len() > limit {
            out.push(std::mem::take(&mut chunk));
        }
        if !chunk.is_empty() {
            chunk.push('\n');
        }
        chunk.push_str(line);
    }

    if !chunk.trim().is_empty() {
        out.push(chunk);
    }
    out
}

fn split_utf8_prefix(s: &str, max_bytes: usize) -> (&str, &str) {
    let mut idx = max_bytes.min(s.len());
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    if idx == 0 {
        idx = s.chars().next().map_or(s.len(), char::len_utf8);
    }
    s.split_at(idx)
}

/// One result line: an HTML link for the message body or a plain line for
/// the attached file.
pub fn format_member(member: &Member, tags: bool) -> String {
    let (link, username) = match &member.username {
        Some(name) => (format!("https://t.me/{name}"), format!("@{name}")),
        None => (format!("tg://user?id={}", member.id.0), String::new()),
    };
    let name = member.display_name();

    if tags {
        return format!(
            "<a href='{link}'>{}</a> (<code>{}</code>)",
            escape_html(&name),
            member.id.0
        );
    }
    format!("{} {name} {username}", member.id.0)
        .trim_end()
        .to_string()
}

/// File sent instead of an over-long message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// A rendered result. With an attachment, `text` is its caption and stays
/// within [`CAPTION_LIMIT`]; inline text may need [`QueryReport::messages`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryReport {
    pub text: String,
    pub attachment: Option<Attachment>,
}

impl QueryReport {
    /// Inline text split into sendable messages.
    pub fn messages(&self) -> Vec<String> {
        split_html_lines(&self.text, MESSAGE_LIMIT)
    }
}

const NEGATED_WARNING: &str = "⚠️ <b>The final set is negated, so the result may be incomplete. \
     Rewrite your query to get accurate results</b>";

const FILE_NOTICE: &str = "📤 <b>The list is too long, so it's sent in a file.</b>";

/// Render a query result.
///
/// A negated result cannot be listed; it is materialized against the users the
/// query has seen and flagged as possibly incomplete.
pub fn format_results(
    query: &str,
    result: &MemberSet,
    users: &HashMap<UserId, Member>,
    inline_limit: usize,
) -> QueryReport {
    let mut ids: Vec<UserId> = result.materialize(users.keys()).into_iter().collect();
    ids.sort();

    if ids.is_empty() {
        return QueryReport {
            text: format!(
                "🚫 <b>No results found</b> for query <code>{}</code>",
                echo(query)
            ),
            attachment: None,
        };
    }

    let mut text = format!(
        "🔍 <b>{} users found</b> for query <code>{}</code>\n\n",
        ids.len(),
        echo(query)
    );

    let use_file = ids.len() > inline_limit;
    let lines: Vec<String> = ids
        .iter()
        .map(|id| match users.get(id) {
            Some(member) => format_member(member, !use_file),
            None => {
                let unknown = Member::new(id.0, "");
                format_member(&unknown, !use_file)
            }
        })
        .collect();

    let attachment = if use_file {
        text.push_str(FILE_NOTICE);
        text.push_str("\n\n");
        Some(Attachment {
            file_name: "result.txt".to_string(),
            bytes: lines.join("\n").into_bytes(),
        })
    } else {
        text.push_str(&lines.join("\n"));
        text.push_str("\n\n");
        None
    };

    if result.is_negated() {
        text.push_str(NEGATED_WARNING);
    }

    QueryReport {
        text: text.trim_end().to_string(),
        attachment,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: i64, first: &str, username: Option<&str>) -> Member {
        Member {
            id: UserId(id),
            first_name: first.to_string(),
            last_name: None,
            username: username.map(str::to_string),
        }
    }

    fn users(list: &[Member]) -> HashMap<UserId, Member> {
        list.iter().map(|m| (m.id, m.clone())).collect()
    }

    fn ids(values: &[i64]) -> MemberSet {
        values.iter().map(|&id| UserId(id)).collect()
    }

    #[test]
    fn formats_members_with_and_without_tags() {
        let m = member(1, "A <b>", Some("ann"));
        assert_eq!(
            format_member(&m, true),
            "<a href='https://t.me/ann'>A &lt;b&gt;</a> (<code>1</code>)"
        );
        assert_eq!(format_member(&m, false), "1 A <b> @ann");

        let deleted = member(2, "", None);
        assert_eq!(
            format_member(&deleted, true),
            "<a href='tg://user?id=2'>Deleted Account</a> (<code>2</code>)"
        );
        assert_eq!(format_member(&deleted, false), "2 Deleted Account");
    }

    #[test]
    fn empty_result() {
        let report = format_results("a & b", &ids(&[]), &HashMap::new(), 30);
        assert!(report.text.starts_with("🚫"));
        assert!(report.text.contains("a &amp; b"));
        assert!(report.attachment.is_none());
    }

    #[test]
    fn inline_results_are_sorted() {
        let known = users(&[member(2, "Bo", None), member(1, "Al", None)]);
        let report = format_results("q", &ids(&[2, 1]), &known, 30);
        assert!(report.text.contains("2 users found"));
        let al = report.text.find("Al").unwrap();
        let bo = report.text.find("Bo").unwrap();
        assert!(al < bo);
        assert!(!report.text.contains("⚠️"));
    }

    #[test]
    fn negated_result_is_materialized_against_known_users() {
        let known = users(&[member(1, "Al", None), member(2, "Bo", None), member(3, "Cy", None)]);
        let report = format_results("~a", &ids(&[1]).negate(), &known, 30);
        assert!(report.text.contains("2 users found"));
        assert!(report.text.contains("Bo"));
        assert!(!report.text.contains("Al"));
        assert!(report.text.ends_with("accurate results</b>"));
    }

    #[test]
    fn long_results_go_to_a_file() {
        let list: Vec<Member> = (1..=5).map(|i| member(i, "X", None)).collect();
        let report = format_results("q", &ids(&[1, 2, 3, 4, 5]), &users(&list), 3);
        let file = report.attachment.expect("attachment");
        assert_eq!(file.file_name, "result.txt");
        let body = String::from_utf8(file.bytes).unwrap();
        assert_eq!(body.lines().count(), 5);
        assert!(body.starts_with("1 X"));
        assert!(report.text.contains("sent in a file"));
    }

    #[test]
    fn long_inline_results_split_on_line_boundaries() {
        let name = "&".repeat(60);
        let list: Vec<Member> = (1..=30).map(|i| member(i, &name, None)).collect();
        let report = format_results("q", &ids(&(1..=30).collect::<Vec<i64>>()), &users(&list), 30);
        assert!(report.attachment.is_none());
        assert!(report.text.len() > MESSAGE_LIMIT);

        let messages = report.messages();
        assert!(messages.len() > 1);
        assert!(messages.iter().all(|m| m.len() <= MESSAGE_LIMIT));
        assert!(messages[0].starts_with("🔍 <b>30 users found</b>"));
        for m in &messages {
            assert_eq!(m.matches("<a ").count(), m.matches("</a>").count());
        }
        let total: usize = messages.iter().map(|m| m.matches("</a>").count()).sum();
        assert_eq!(total, 30);
    }

    #[test]
    fn split_keeps_lines_whole_and_cuts_only_oversized_ones() {
        assert_eq!(split_html_lines("a\nbb\nccc", 5), vec!["a\nbb", "ccc"]);
        assert_eq!(split_html_lines("short", 4096), vec!["short"]);
        assert_eq!(split_html_lines("ééé", 4), vec!["éé", "é"]);
        assert!(split_html_lines("\n\n", 10).is_empty());
    }

    #[test]
    fn long_queries_are_clipped_in_echoes() {
        let query = "a | ".repeat(1000) + "b";
        assert!(running_message(&query).len() < 400);
        assert!(running_message(&query).contains("…"));
        assert!(timeout_message(&query).len() < 400);
        assert!(syntax_error_message(&query, &query).len() < 700);

        let list: Vec<Member> = (1..=5).map(|i| member(i, "X", None)).collect();
        let report = format_results(&query, &ids(&[1, 2, 3, 4, 5]), &users(&list), 3);
        assert!(report.attachment.is_some());
        assert!(report.text.len() <= CAPTION_LIMIT);
    }

    #[test]
    fn worst_case_caption_fits() {
        // Every char of the echo escapes to six bytes.
        let query = "\"".repeat(500);
        let list: Vec<Member> = (1..=5).map(|i| member(i, "X", None)).collect();
        let result = ids(&[1]).negate();
        let report = format_results(&query, &result, &users(&list), 1);
        assert!(report.attachment.is_some());
        assert!(report.text.len() <= CAPTION_LIMIT);
        assert!(report.text.contains("4 users found"));
        assert!(report.text.ends_with("accurate results</b>"));
    }

    #[test]
    fn messages_escape_user_input() {
        assert!(syntax_error_message("<a>", "bad").contains("&lt;a&gt;"));
        assert_eq!(
            invalid_chat_message(&ChatKey::Username("x".into()), "gone"),
            "❌ <b>Invalid chat ID x:</b>\n<code>gone</code>"
        );
    }
}
