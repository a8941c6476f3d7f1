//! Demo domain driven by the `ss` binary
//!
//! A user directory with a deferred search filter, a slow post list computed
//! as deferred work, and an urgent on/off toggle.

mod posts;
mod scenario;
mod users;

use serde::{Deserialize, Serialize};

pub use posts::slow_posts;
pub use scenario::{
    INPUT_SLOT, POSTS_SLOT, RESULTS_SLOT, TOGGLE_SLOT, Transcript, run_search_scenario, run_toggle_scenario,
};
pub use users::{User, directory, filter_users};

/// Value stored in a demo slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum DemoValue {
    /// On/off switch
    Toggle(bool),
    /// Rendered post titles
    Posts(Vec<String>),
    /// Raw search input
    Query(String),
    /// Filtered search results
    Users(Vec<User>),
}

impl std::fmt::Display for DemoValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Toggle(true) => write!(f, "ON"),
            Self::Toggle(false) => write!(f, "OFF"),
            Self::Posts(posts) => match posts.last() {
                Some(last) => write!(f, "{} posts (last: {})", posts.len(), last),
                None => write!(f, "0 posts"),
            },
            Self::Query(query) => write!(f, "{:?}", query),
            Self::Users(users) => {
                let names: Vec<&str> = users.iter().map(|u| u.name.as_str()).collect();
                write!(f, "[{}]", names.join(", "))
            }
        }
    }
}
