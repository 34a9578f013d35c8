//! Friends, pending friend requests and blocked users.

use chrono::{DateTime, Utc};

use parley_shared::model::{FriendRequest, User};
use parley_shared::types::{FriendRequestId, UserId};

#[derive(Debug, Clone, Default)]
pub struct FriendGraph {
    friends: Vec<User>,
    pending: Vec<FriendRequest>,
    blocked: Vec<User>,
}

impl FriendGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_friends(&mut self, friends: Vec<User>) {
        self.friends = friends;
    }

    pub fn set_pending(&mut self, pending: Vec<FriendRequest>) {
        self.pending = pending;
    }

    pub fn set_blocked(&mut self, blocked: Vec<User>) {
        self.blocked = blocked;
    }

    /// Prepend a request unless its id is already pending.
    pub fn add_pending(&mut self, request: FriendRequest) -> bool {
        if self.pending.iter().any(|r| r.id == request.id) {
            return false;
        }
        self.pending.insert(0, request);
        true
    }

    pub fn remove_pending(&mut self, id: &FriendRequestId) -> Option<FriendRequest> {
        let idx = self.pending.iter().position(|r| &r.id == id)?;
        Some(self.pending.remove(idx))
    }

    pub fn remove_friend(&mut self, id: &UserId) -> Option<User> {
        let idx = self.friends.iter().position(|u| &u.id == id)?;
        Some(self.friends.remove(idx))
    }

    /// Drop the user from friends and list them as blocked.
    pub fn block(&mut self, user: User) {
        self.remove_friend(&user.id);
        if !self.blocked.iter().any(|u| u.id == user.id) {
            self.blocked.push(user);
        }
    }

    pub fn unblock(&mut self, id: &UserId) -> Option<User> {
        let idx = self.blocked.iter().position(|u| &u.id == id)?;
        Some(self.blocked.remove(idx))
    }

    /// Update the friend record for `user`, if any.
    pub fn apply_presence(&mut self, user: &UserId, online: bool, at: DateTime<Utc>) -> bool {
        match self.friends.iter_mut().find(|u| &u.id == user) {
            Some(friend) => {
                friend.set_presence(online, at);
                true
            }
            None => false,
        }
    }

    pub fn friends(&self) -> &[User] {
        &self.friends
    }

    pub fn pending(&self) -> &[FriendRequest] {
        &self.pending
    }

    pub fn blocked(&self) -> &[User] {
        &self.blocked
    }

    pub fn friend(&self, id: &UserId) -> Option<&User> {
        self.friends.iter().find(|u| &u.id == id)
    }

    pub fn is_blocked(&self, id: &UserId) -> bool {
        self.blocked.iter().any(|u| &u.id == id)
    }

    pub fn clear(&mut self) {
        self.friends.clear();
        self.pending.clear();
        self.blocked.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_shared::model::FriendRequestStatus;

    fn request(sender: &User) -> FriendRequest {
        FriendRequest {
            id: FriendRequestId::new(),
            sender: Some(sender.clone()),
            receiver: None,
            status: FriendRequestStatus::Pending,
            created_at: Some(Utc::now()),
        }
    }

    #[test]
    fn pending_requests_dedup_by_id() {
        let mut graph = FriendGraph::new();
        let first = request(&User::new(UserId::new(), "a"));
        let second = request(&User::new(UserId::new(), "b"));

        assert!(graph.add_pending(first.clone()));
        assert!(!graph.add_pending(first.clone()));
        assert!(graph.add_pending(second.clone()));
        assert_eq!(graph.pending()[0].id, second.id);

        assert_eq!(graph.remove_pending(&first.id).map(|r| r.id), Some(first.id));
        assert_eq!(graph.pending().len(), 1);
    }

    #[test]
    fn block_moves_friend_to_blocked() {
        let mut graph = FriendGraph::new();
        let pal = User::new(UserId::new(), "pal");
        graph.set_friends(vec![pal.clone()]);

        graph.block(pal.clone());
        graph.block(pal.clone());
        assert!(graph.friend(&pal.id).is_none());
        assert_eq!(graph.blocked().len(), 1);
        assert!(graph.is_blocked(&pal.id));

        assert!(graph.unblock(&pal.id).is_some());
        assert!(!graph.is_blocked(&pal.id));
    }

    #[test]
    fn presence_updates_friend_record() {
        let mut graph = FriendGraph::new();
        let pal = User::new(UserId::new(), "pal");
        graph.set_friends(vec![pal.clone()]);

        assert!(graph.apply_presence(&pal.id, true, Utc::now()));
        assert!(graph.friend(&pal.id).unwrap().is_online);
        assert!(!graph.apply_presence(&UserId::new(), true, Utc::now()));
    }
}
