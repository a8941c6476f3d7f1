//! Mock user directory

use serde::{Deserialize, Serialize};
use tracing::debug;

/// A user profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u32,
    pub name: String,
    pub bio: String,
}

impl User {
    pub fn new(id: u32, name: impl Into<String>, bio: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            bio: bio.into(),
        }
    }
}

impl std::fmt::Display for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.bio)
    }
}

/// The fixed directory the demos search
pub fn directory() -> Vec<User> {
    vec![
        User::new(1, "Upasana", "Frontend Dev"),
        User::new(2, "Roshni", "Backend Lead"),
        User::new(3, "Roshan", "ML Enthusiast"),
    ]
}

/// Case-insensitive substring match on name; an empty query matches everyone
pub fn filter_users(users: &[User], query: &str) -> Vec<User> {
    debug!(%query, count = users.len(), "filter_users: called");
    let needle = query.to_lowercase();
    users
        .iter()
        .filter(|user| user.name.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}
