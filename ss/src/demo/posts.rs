//! Artificially slow post list
//!
//! Each post burns a fixed amount of CPU before it is produced, the way an
//! expensive list item would. The producer checks in with the scheduler
//! after every item so urgent work can run and stale lists stop early.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::scheduler::DeferredContext;

/// Build `"Post #1"` through `"Post #count"`, spending `cost` on each
pub async fn slow_posts(cx: DeferredContext, count: usize, cost: Duration) -> eyre::Result<Vec<String>> {
    debug!(slot = %cx.slot(), token = %cx.token(), count, ?cost, "slow_posts: called");
    let mut posts = Vec::with_capacity(count);
    for index in 0..count {
        busy_wait(cost);
        posts.push(format!("Post #{}", index + 1));
        cx.checkpoint().await?;
    }
    debug!(slot = %cx.slot(), count, "slow_posts: finished");
    Ok(posts)
}

fn busy_wait(cost: Duration) {
    let start = Instant::now();
    while start.elapsed() < cost {
        std::hint::spin_loop();
    }
}
