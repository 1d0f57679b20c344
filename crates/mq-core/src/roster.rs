//! Members the bot has observed in each chat.
//!
//! The Bot API only lists a chat's administrators, so the bot keeps its own
//! roster from message senders and join/leave events. The roster is persisted
//! as JSON and reloaded on startup.

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::atomic::{AtomicBool, Ordering},
};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::{
    domain::{ChatId, Member, UserId},
    Result,
};

#[derive(Debug, Serialize, Deserialize)]
struct RosterEntry {
    chat_id: ChatId,
    members: Vec<Member>,
}

#[derive(Debug, Default)]
pub struct RosterBook {
    path: Option<PathBuf>,
    chats: RwLock<HashMap<ChatId, HashMap<UserId, Member>>>,
    dirty: AtomicBool,
}

impl RosterBook {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load from `path`; a missing file yields an empty roster.
    pub async fn load(path: PathBuf) -> Result<Self> {
        let chats = match tokio::fs::read_to_string(&path).await {
            Ok(txt) => {
                let entries: Vec<RosterEntry> = serde_json::from_str(&txt)?;
                entries
                    .into_iter()
                    .map(|e| (e.chat_id, e.members.into_iter().map(|m| (m.id, m)).collect()))
                    .collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path: Some(path),
            chats: RwLock::new(chats),
            dirty: AtomicBool::new(false),
        })
    }

    /// Record (or refresh) a member of `chat`.
    pub async fn observe(&self, chat: ChatId, member: Member) {
        let mut chats = self.chats.write().await;
        let members = chats.entry(chat).or_default();
        if members.get(&member.id) != Some(&member) {
            members.insert(member.id, member);
            self.dirty.store(true, Ordering::Relaxed);
        }
    }

    pub async fn forget(&self, chat: ChatId, user: UserId) {
        let mut chats = self.chats.write().await;
        if let Some(members) = chats.get_mut(&chat) {
            if members.remove(&user).is_some() {
                self.dirty.store(true, Ordering::Relaxed);
            }
        }
    }

    pub async fn members(&self, chat: ChatId) -> Vec<Member> {
        let chats = self.chats.read().await;
        chats
            .get(&chat)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Relaxed)
    }

    /// Persist if anything changed since the last save. In-memory rosters are
    /// never written.
    pub async fn save_if_dirty(&self) -> Result<bool> {
        let Some(path) = &self.path else {
            return Ok(false);
        };
        if !self.dirty.swap(false, Ordering::Relaxed) {
            return Ok(false);
        }

        let json = {
            let chats = self.chats.read().await;
            let mut entries: Vec<RosterEntry> = chats
                .iter()
                .map(|(chat_id, members)| RosterEntry {
                    chat_id: *chat_id,
                    members: members.values().cloned().collect(),
                })
                .collect();
            entries.sort_by_key(|e| e.chat_id.0);
            serde_json::to_string(&entries)?
        };

        let tmp = path.with_extension("json.tmp");
        let written = async {
            tokio::fs::write(&tmp, json).await?;
            tokio::fs::rename(&tmp, path).await
        }
        .await;
        if let Err(e) = written {
            self.dirty.store(true, Ordering::Relaxed);
            return Err(e.into());
        }
        Ok(true)
    }
}
