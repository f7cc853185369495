//! Group membership table.
//!
//! Groups are descriptors only: id, name, fixed member list, creator. The
//! relay never holds group keys because there are none; group confidentiality
//! comes from pairwise encryption done by the members. Membership is frozen
//! at creation, so every lookup sees the same member set for a given id.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use crate::error::RelayError;

/// A group descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRecord {
    /// Display name.
    pub name: String,
    /// Fixed member session ids, deduplicated, creator included.
    pub member_ids: Vec<String>,
    /// Authenticated creator session id.
    pub creator_id: String,
}

/// Shared group table. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct GroupTable {
    inner: Arc<Mutex<HashMap<String, GroupRecord>>>,
}

impl GroupTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, GroupRecord>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a group. The creator is always a member, whether or not the
    /// submitted list names it. Duplicate member entries collapse.
    ///
    /// # Errors
    ///
    /// `GroupAlreadyExists` if the id is taken; membership never changes
    /// after creation.
    pub fn create(
        &self,
        group_id: &str,
        name: &str,
        member_ids: &[String],
        creator_id: &str,
    ) -> Result<GroupRecord, RelayError> {
        let mut members: Vec<String> = Vec::with_capacity(member_ids.len() + 1);
        for id in member_ids {
            if !members.contains(id) {
                members.push(id.clone());
            }
        }
        if !members.iter().any(|m| m == creator_id) {
            members.push(creator_id.to_string());
        }

        let record = GroupRecord {
            name: name.to_string(),
            member_ids: members,
            creator_id: creator_id.to_string(),
        };

        let mut map = self.lock();
        if map.contains_key(group_id) {
            return Err(RelayError::GroupAlreadyExists { group_id: group_id.to_string() });
        }
        map.insert(group_id.to_string(), record.clone());
        Ok(record)
    }

    /// Look up a group descriptor.
    ///
    /// # Errors
    ///
    /// `UnknownGroup` if the id is not registered.
    pub fn get(&self, group_id: &str) -> Result<GroupRecord, RelayError> {
        self.lock()
            .get(group_id)
            .cloned()
            .ok_or_else(|| RelayError::UnknownGroup { group_id: group_id.to_string() })
    }

    /// Whether a session id belongs to a group.
    ///
    /// # Errors
    ///
    /// `UnknownGroup` if the id is not registered.
    pub fn is_member(&self, group_id: &str, session_id: &str) -> Result<bool, RelayError> {
        Ok(self.get(group_id)?.member_ids.iter().any(|m| m == session_id))
    }
}
