use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use parley_shared::types::UserId;

/// Last known presence of a user.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Presence {
    pub is_online: bool,
    pub last_seen: Option<DateTime<Utc>>,
}

/// Presence keyed by user id.  Entries are only ever overwritten.
#[derive(Debug, Clone, Default)]
pub struct PresenceTracker {
    users: HashMap<UserId, Presence>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a presence change.  Going offline stamps `last_seen` with
    /// `at`; coming online keeps the previous stamp.
    pub fn set_online(&mut self, user: &UserId, online: bool, at: DateTime<Utc>) -> Presence {
        let entry = self.users.entry(user.clone()).or_default();
        entry.is_online = online;
        if !online {
            entry.last_seen = Some(at);
        }
        *entry
    }

    pub fn get(&self, user: &UserId) -> Option<Presence> {
        self.users.get(user).copied()
    }

    pub fn is_online(&self, user: &UserId) -> bool {
        self.users.get(user).map(|p| p.is_online).unwrap_or(false)
    }

    pub fn online_count(&self) -> usize {
        self.users.values().filter(|p| p.is_online).count()
    }

    pub fn clear(&mut self) {
        self.users.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn offline_stamps_last_seen() {
        let mut tracker = PresenceTracker::new();
        let user = UserId::new();
        let went_away = Utc::now();

        tracker.set_online(&user, true, went_away - Duration::minutes(1));
        assert!(tracker.is_online(&user));
        assert!(tracker.get(&user).unwrap().last_seen.is_none());

        let p = tracker.set_online(&user, false, went_away);
        assert!(!p.is_online);
        assert_eq!(p.last_seen, Some(went_away));

        tracker.set_online(&user, true, Utc::now());
        assert_eq!(tracker.get(&user).unwrap().last_seen, Some(went_away));
        assert_eq!(tracker.online_count(), 1);
    }

    #[test]
    fn unknown_user_is_offline() {
        let tracker = PresenceTracker::new();
        assert!(!tracker.is_online(&UserId::new()));
    }
}
