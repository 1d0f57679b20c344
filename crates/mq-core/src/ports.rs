use async_trait::async_trait;

use crate::{
    domain::{ChatInfo, ChatKey, Member},
    Result,
};

/// Hexagonal port for the messenger that owns the member lists.
///
/// Telegram is the only implementation today. Providers report an unknown chat
/// as `Error::NotFound` and a denied member listing as `Error::Forbidden`;
/// anything else is treated as an opaque transport failure.
#[async_trait]
pub trait MembershipProvider: Send + Sync {
    /// The user on whose behalf queries run (`me` / `self`).
    async fn current_user(&self) -> Result<Member>;

    async fn resolve_chat(&self, key: &ChatKey) -> Result<ChatInfo>;

    async fn list_members(&self, chat: &ChatInfo) -> Result<Vec<Member>>;
}
