//! In-memory guild backend
//!
//! Backs the binary's offline mode and every test. State lives in process;
//! nothing survives a restart. The write counter exists so convergence tests
//! can assert that a reconciliation fixed point issues zero further writes.

use super::{ChannelKind, GuildChannel, GuildDirectory, Principal, VerificationOracle};
use crate::error::{Error, Result};
use async_trait::async_trait;
use rollcall_common::{ChannelId, PermissionSet, RoleId, UserId};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Mutex;

#[derive(Default)]
struct GuildState {
    channels: HashMap<ChannelId, GuildChannel>,
    overwrites: HashMap<ChannelId, HashMap<Principal, PermissionSet>>,
    members: HashSet<UserId>,
    roles: HashSet<RoleId>,
    verified: HashSet<UserId>,
    /// Users whose overwrite writes fail (fault injection for tests)
    failing_users: HashSet<UserId>,
}

/// In-memory implementation of the gateway traits
pub struct MemoryGuild {
    state: Mutex<GuildState>,
    next_id: AtomicI64,
    write_calls: AtomicU64,
}

impl Default for MemoryGuild {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGuild {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GuildState::default()),
            next_id: AtomicI64::new(1000),
            write_calls: AtomicU64::new(0),
        }
    }

    fn alloc_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Number of set/remove overwrite calls issued so far
    pub fn write_call_count(&self) -> u64 {
        self.write_calls.load(Ordering::SeqCst)
    }

    /// Register a guild member
    pub fn add_member(&self, user: UserId) {
        self.state.lock().unwrap().members.insert(user);
    }

    pub fn remove_member(&self, user: UserId) {
        self.state.lock().unwrap().members.remove(&user);
    }

    /// Register a role
    pub fn add_role(&self, role: RoleId) {
        self.state.lock().unwrap().roles.insert(role);
    }

    /// Mark a member as verified
    pub fn set_verified(&self, user: UserId, verified: bool) {
        let mut state = self.state.lock().unwrap();
        if verified {
            state.verified.insert(user);
        } else {
            state.verified.remove(&user);
        }
    }

    /// Make every overwrite write for this user fail (fault injection)
    pub fn fail_writes_for(&self, user: UserId) {
        self.state.lock().unwrap().failing_users.insert(user);
    }

    /// Insert a channel with a fixed id (test setup)
    pub fn insert_channel(&self, id: ChannelId, name: &str, kind: ChannelKind) -> GuildChannel {
        let channel = GuildChannel {
            id,
            name: name.to_string(),
            kind,
            parent_id: None,
        };
        self.state.lock().unwrap().channels.insert(id, channel.clone());
        channel
    }

    /// Directly set an overwrite without counting it as an engine write
    pub fn seed_overwrite(&self, channel: ChannelId, principal: Principal, perms: PermissionSet) {
        self.state
            .lock()
            .unwrap()
            .overwrites
            .entry(channel)
            .or_default()
            .insert(principal, perms);
    }

    fn create_channel(&self, name: &str, kind: ChannelKind) -> GuildChannel {
        let id = ChannelId(self.alloc_id());
        let channel = GuildChannel {
            id,
            name: name.to_string(),
            kind,
            parent_id: None,
        };
        self.state.lock().unwrap().channels.insert(id, channel.clone());
        channel
    }
}

#[async_trait]
impl GuildDirectory for MemoryGuild {
    async fn channel(&self, id: ChannelId) -> Result<Option<GuildChannel>> {
        Ok(self.state.lock().unwrap().channels.get(&id).cloned())
    }

    async fn create_text_channel(&self, name: &str) -> Result<GuildChannel> {
        Ok(self.create_channel(name, ChannelKind::Text))
    }

    async fn create_category_channel(&self, name: &str) -> Result<GuildChannel> {
        Ok(self.create_channel(name, ChannelKind::Category))
    }

    async fn delete_channel(&self, id: ChannelId) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.channels.remove(&id);
        state.overwrites.remove(&id);
        Ok(())
    }

    async fn move_channel_to_category(
        &self,
        channel: ChannelId,
        category: ChannelId,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.channels.contains_key(&category) {
            return Err(Error::Gateway(format!("No such category: {}", category)));
        }
        match state.channels.get_mut(&channel) {
            Some(ch) => {
                ch.parent_id = Some(category);
                Ok(())
            }
            None => Err(Error::Gateway(format!("No such channel: {}", channel))),
        }
    }

    async fn overwrite(
        &self,
        channel: ChannelId,
        principal: Principal,
    ) -> Result<Option<PermissionSet>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .overwrites
            .get(&channel)
            .and_then(|map| map.get(&principal))
            .copied())
    }

    async fn set_overwrite(
        &self,
        channel: ChannelId,
        principal: Principal,
        perms: PermissionSet,
    ) -> Result<()> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        if let Principal::User(user) = principal {
            if state.failing_users.contains(&user) {
                return Err(Error::Gateway(format!("Injected write failure for {}", user)));
            }
        }
        if !state.channels.contains_key(&channel) {
            return Err(Error::Gateway(format!("No such channel: {}", channel)));
        }
        state.overwrites.entry(channel).or_default().insert(principal, perms);
        Ok(())
    }

    async fn remove_overwrite(&self, channel: ChannelId, principal: Principal) -> Result<()> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        if let Principal::User(user) = principal {
            if state.failing_users.contains(&user) {
                return Err(Error::Gateway(format!("Injected write failure for {}", user)));
            }
        }
        if let Some(map) = state.overwrites.get_mut(&channel) {
            map.remove(&principal);
        }
        Ok(())
    }

    async fn user_overwrites(&self, channel: ChannelId) -> Result<Vec<(UserId, PermissionSet)>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .overwrites
            .get(&channel)
            .map(|map| {
                map.iter()
                    .filter_map(|(principal, perms)| match principal {
                        Principal::User(user) => Some((*user, *perms)),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn resolve_user(&self, id: UserId) -> Result<Option<UserId>> {
        let state = self.state.lock().unwrap();
        Ok(state.members.contains(&id).then_some(id))
    }

    async fn resolve_role(&self, id: RoleId) -> Result<Option<RoleId>> {
        let state = self.state.lock().unwrap();
        Ok(state.roles.contains(&id).then_some(id))
    }
}

#[async_trait]
impl VerificationOracle for MemoryGuild {
    async fn is_verified(&self, user: UserId) -> Result<bool> {
        Ok(self.state.lock().unwrap().verified.contains(&user))
    }
}
