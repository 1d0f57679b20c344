use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;

use crate::{
    cache::MembersCache,
    domain::{ChatKey, ChatKind, Member, UserId},
    errors::Error,
    ports::MembershipProvider,
    query::{self, MemberSet, SetFetcher},
    Result,
};

/// Evaluates member queries against a messenger.
///
/// One executor serves one query: it accumulates every user it sees so the
/// result can be rendered (and a negated result materialized) afterwards.
pub struct MembersQuery {
    provider: Arc<dyn MembershipProvider>,
    cache: Arc<MembersCache>,
    users: HashMap<UserId, Member>,
}

impl MembersQuery {
    pub fn new(provider: Arc<dyn MembershipProvider>, cache: Arc<MembersCache>) -> Self {
        Self {
            provider,
            cache,
            users: HashMap::new(),
        }
    }

    pub async fn execute(&mut self, query: &str) -> Result<MemberSet> {
        query::evaluate(self, query).await
    }

    /// `/mjoin`: every operand must contain the user.
    pub async fn execute_simplified<S>(&mut self, operands: &[S]) -> Result<MemberSet>
    where
        S: AsRef<str> + Sync,
    {
        query::evaluate_conjunction(self, operands).await
    }

    /// Users seen while evaluating, keyed by id.
    pub fn users(&self) -> &HashMap<UserId, Member> {
        &self.users
    }

    async fn members_of(&self, key: &ChatKey) -> Result<Arc<Vec<Member>>> {
        let chat = self
            .provider
            .resolve_chat(key)
            .await
            .map_err(|e| resolution_error(key, e))?;

        if chat.kind == ChatKind::User {
            return Err(Error::invalid_chat(key.clone(), "chat ID belongs to a user"));
        }

        if let Some(members) = self.cache.get(key).await {
            tracing::debug!(%key, "using cached participants");
            return Ok(members);
        }

        tracing::debug!(
            %key,
            chat_id = chat.id.0,
            title = chat.title.as_deref().unwrap_or(""),
            "fetching participants"
        );
        let members = self
            .provider
            .list_members(&chat)
            .await
            .map_err(|e| match e {
                Error::Forbidden(_) => Error::invalid_chat(
                    key.clone(),
                    "insufficient privileges to view users in chat",
                ),
                other => resolution_error(key, other),
            })?;

        let members = Arc::new(members);
        self.cache.insert(key.clone(), members.clone()).await;
        Ok(members)
    }
}

#[async_trait]
impl SetFetcher for MembersQuery {
    async fn fetch_set(&mut self, key: &ChatKey) -> Result<MemberSet> {
        if key.is_self_alias() {
            let me = self.provider.current_user().await?;
            let id = me.id;
            self.users.insert(id, me);
            return Ok([id].into_iter().collect());
        }

        let members = self.members_of(key).await?;
        self.users.extend(members.iter().map(|m| (m.id, m.clone())));
        Ok(members.iter().map(|m| m.id).collect())
    }
}

fn resolution_error(key: &ChatKey, e: Error) -> Error {
    match e {
        Error::NotFound(reason) | Error::Forbidden(reason) => {
            Error::invalid_chat(key.clone(), reason)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChatId, ChatInfo};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const ME: i64 = 100;

    struct FakeProvider {
        chats: HashMap<String, (ChatKind, Vec<Member>)>,
        list_calls: AtomicUsize,
    }

    impl FakeProvider {
        fn new() -> Self {
            let m = |id: i64| Member::new(id, &format!("user{id}"));
            let chats = [
                ("music", ChatKind::Group, vec![m(1), m(2), m(3)]),
                ("chess", ChatKind::Group, vec![m(2), m(3), m(4)]),
                ("news", ChatKind::Channel, vec![m(5)]),
                ("secret", ChatKind::Channel, vec![]),
                ("durov", ChatKind::User, vec![]),
                ("-1001", ChatKind::Group, vec![m(1), m(ME)]),
            ]
            .into_iter()
            .map(|(k, kind, members)| (k.to_string(), (kind, members)))
            .collect();
            Self {
                chats,
                list_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl MembershipProvider for FakeProvider {
        async fn current_user(&self) -> Result<Member> {
            Ok(Member::new(ME, "Me"))
        }

        async fn resolve_chat(&self, key: &ChatKey) -> Result<ChatInfo> {
            if key == &ChatKey::Username("offline".into()) {
                return Err(Error::External("connection reset".into()));
            }
            let (kind, _) = self
                .chats
                .get(&key.to_string())
                .ok_or_else(|| Error::NotFound(format!("no chat named {key}")))?;
            Ok(ChatInfo {
                id: ChatId(-1),
                kind: *kind,
                title: Some(key.to_string()),
            })
        }

        async fn list_members(&self, chat: &ChatInfo) -> Result<Vec<Member>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            let name = chat.title.clone().unwrap_or_default();
            if name == "secret" {
                return Err(Error::Forbidden("CHAT_ADMIN_REQUIRED".into()));
            }
            Ok(self.chats[&name].1.clone())
        }
    }

    fn setup() -> (Arc<FakeProvider>, Arc<MembersCache>) {
        (
            Arc::new(FakeProvider::new()),
            Arc::new(MembersCache::new(Duration::from_secs(600))),
        )
    }

    fn ids(values: &[i64]) -> MemberSet {
        values.iter().map(|&id| UserId(id)).collect()
    }

    fn expect_invalid(result: Result<MemberSet>) -> (ChatKey, String) {
        match result {
            Err(Error::InvalidChat { key, reason }) => (key, reason),
            other => panic!("expected InvalidChat, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn evaluates_against_provider_and_records_users() {
        let (provider, cache) = setup();
        let mut q = MembersQuery::new(provider, cache);

        let result = q.execute("@music & ~@chess").await.unwrap();
        assert_eq!(result, ids(&[1]));
        let mut seen: Vec<i64> = q.users().keys().map(|u| u.0).collect();
        seen.sort();
        assert_eq!(seen, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn me_resolves_to_current_user() {
        let (provider, cache) = setup();
        let mut q = MembersQuery::new(provider.clone(), cache);

        assert_eq!(q.execute("me").await.unwrap(), ids(&[ME]));
        assert_eq!(q.execute("self").await.unwrap(), ids(&[ME]));
        assert_eq!(q.execute("-1001 - me").await.unwrap(), ids(&[1]));
        assert_eq!(q.users()[&UserId(ME)].first_name, "Me");
    }

    #[tokio::test]
    async fn member_lists_are_served_from_cache() {
        let (provider, cache) = setup();

        let mut first = MembersQuery::new(provider.clone(), cache.clone());
        first.execute("music | music").await.unwrap();
        assert_eq!(provider.list_calls.load(Ordering::SeqCst), 1);

        let mut second = MembersQuery::new(provider.clone(), cache.clone());
        second.execute_simplified(&["music", "chess"]).await.unwrap();
        assert_eq!(provider.list_calls.load(Ordering::SeqCst), 2);
        // Users still recorded for cached lists.
        assert!(second.users().contains_key(&UserId(1)));

        cache.clear().await;
        MembersQuery::new(provider.clone(), cache)
            .execute("music")
            .await
            .unwrap();
        assert_eq!(provider.list_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn user_chats_are_rejected() {
        let (provider, cache) = setup();
        let mut q = MembersQuery::new(provider, cache);

        let (key, reason) = expect_invalid(q.execute("music & durov").await);
        assert_eq!(key, ChatKey::Username("durov".into()));
        assert_eq!(reason, "chat ID belongs to a user");
    }

    #[tokio::test]
    async fn unknown_and_forbidden_chats() {
        let (provider, cache) = setup();
        let mut q = MembersQuery::new(provider, cache.clone());

        let (key, reason) = expect_invalid(q.execute("nowhere").await);
        assert_eq!(key, ChatKey::Username("nowhere".into()));
        assert_eq!(reason, "no chat named nowhere");

        let (key, reason) = expect_invalid(q.execute_simplified(&["music", "secret"]).await);
        assert_eq!(key, ChatKey::Username("secret".into()));
        assert_eq!(reason, "insufficient privileges to view users in chat");
        assert!(!cache.has_valid_entry(&key).await);
    }

    #[tokio::test]
    async fn transport_failures_stay_opaque() {
        let (provider, cache) = setup();
        let mut q = MembersQuery::new(provider, cache);

        assert!(matches!(
            q.execute("offline | music").await,
            Err(Error::External(_))
        ));
    }
}
