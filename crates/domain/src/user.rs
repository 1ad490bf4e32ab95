//! User account records.

use chrono::{DateTime, Utc};
use common::UserId;
use serde::{Deserialize, Serialize};

/// A registered user. Placement checks existence; cancellation checks
/// ownership or the admin flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Creates a regular user with a fresh ID.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: UserId::new(),
            name: name.into(),
            email: email.into(),
            is_admin: false,
            created_at: Utc::now(),
        }
    }

    /// Creates an administrator with a fresh ID.
    pub fn new_admin(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            is_admin: true,
            ..Self::new(name, email)
        }
    }

    /// Returns true if this user may act on the given order owner's behalf.
    pub fn can_act_for(&self, owner: UserId) -> bool {
        self.is_admin || self.id == owner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regular_user_acts_only_for_self() {
        let user = User::new("Ada", "ada@example.com");
        assert!(user.can_act_for(user.id));
        assert!(!user.can_act_for(UserId::new()));
    }

    #[test]
    fn test_admin_acts_for_anyone() {
        let admin = User::new_admin("Root", "root@example.com");
        assert!(admin.is_admin);
        assert!(admin.can_act_for(UserId::new()));
    }
}
