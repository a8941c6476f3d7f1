//! Scripted demo scenarios
//!
//! Each scenario spawns its own scheduler, drives it the way a user would,
//! and returns everything observers saw plus the final slot states.

use std::time::Duration;

use eyre::Result;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::DemoConfig;
use crate::domain::SlotName;
use crate::scheduler::{
    DeferredOutcome, DeferredTicket, PriorityScheduler, SchedulerConfig, SchedulerHandle, SchedulerStats,
    SlotSnapshot, SlotUpdate, UpdateStatus,
};

use super::DemoValue;
use super::posts::slow_posts;
use super::users::{User, directory, filter_users};

/// Slot holding the on/off switch
pub const TOGGLE_SLOT: &str = "toggle";
/// Slot holding the slow post list
pub const POSTS_SLOT: &str = "posts";
/// Slot holding the raw search input
pub const INPUT_SLOT: &str = "input";
/// Slot holding the filtered users
pub const RESULTS_SLOT: &str = "results";

/// Record of one scenario run
#[derive(Debug, Clone, Serialize)]
pub struct Transcript {
    /// Every observer notification, in delivery order
    pub events: Vec<SlotUpdate<DemoValue>>,
    /// How each deferred submission resolved, in submission order
    pub outcomes: Vec<DeferredOutcome>,
    /// Slot states after the scenario settled
    pub finals: Vec<SlotSnapshot<DemoValue>>,
    pub stats: SchedulerStats,
}

impl Transcript {
    /// Final value of a slot, if it was ever written
    pub fn final_value(&self, slot: &str) -> Option<&DemoValue> {
        self.finals
            .iter()
            .find(|snap| snap.slot.as_str() == slot)
            .and_then(|snap| snap.value.as_ref())
    }

    /// Position of the first `Applied` event for `slot`
    pub fn first_applied(&self, slot: &str) -> Option<usize> {
        self.events
            .iter()
            .position(|e| e.slot.as_str() == slot && e.status == UpdateStatus::Applied)
    }
}

/// Slow list loaded as deferred work while urgent toggles keep firing
pub async fn run_toggle_scenario(scheduler: SchedulerConfig, demo: &DemoConfig) -> Result<Transcript> {
    info!(slow_items = demo.slow_items, toggles = demo.toggles, "run_toggle_scenario: called");
    let handle = PriorityScheduler::<DemoValue>::spawn(scheduler);
    let events = handle.watch_all().await?;

    let count = demo.slow_items;
    let cost = Duration::from_micros(demo.item_cost_us);
    let ticket = handle
        .deferred_yielding(POSTS_SLOT, move |cx| async move {
            Ok(DemoValue::Posts(slow_posts(cx, count, cost).await?))
        })
        .await?;

    let mut on = false;
    for _ in 0..demo.toggles {
        on = !on;
        let version = handle.urgent(TOGGLE_SLOT, move || Ok(DemoValue::Toggle(on))).await?;
        debug!(on, version, "run_toggle_scenario: toggled");
        tokio::time::sleep(Duration::from_millis(demo.keystroke_delay_ms)).await;
    }

    let outcomes = settle(vec![ticket]).await;
    finish(handle, events, outcomes, &[TOGGLE_SLOT, POSTS_SLOT]).await
}

/// Type `query` one character at a time with a deferred filter behind it
pub async fn run_search_scenario(scheduler: SchedulerConfig, demo: &DemoConfig, query: &str) -> Result<Transcript> {
    info!(%query, "run_search_scenario: called");
    let handle = PriorityScheduler::<DemoValue>::spawn(scheduler);
    let events = handle.watch_all().await?;
    let users = directory();

    // The empty input renders the whole directory
    let mut tickets = vec![submit_filter(&handle, &users, String::new()).await?];

    let mut typed = String::new();
    for ch in query.chars() {
        typed.push(ch);
        let input = typed.clone();
        handle.urgent(INPUT_SLOT, move || Ok(DemoValue::Query(input))).await?;
        tickets.push(submit_filter(&handle, &users, typed.clone()).await?);
        tokio::time::sleep(Duration::from_millis(demo.keystroke_delay_ms)).await;
    }

    let outcomes = settle(tickets).await;
    finish(handle, events, outcomes, &[INPUT_SLOT, RESULTS_SLOT]).await
}

async fn submit_filter(
    handle: &SchedulerHandle<DemoValue>,
    users: &[User],
    query: String,
) -> Result<DeferredTicket> {
    let users = users.to_vec();
    let ticket = handle
        .deferred_yielding(RESULTS_SLOT, move |cx| async move {
            cx.checkpoint().await?;
            Ok(DemoValue::Users(filter_users(&users, &query)))
        })
        .await?;
    Ok(ticket)
}

async fn settle(tickets: Vec<DeferredTicket>) -> Vec<DeferredOutcome> {
    let mut outcomes = Vec::with_capacity(tickets.len());
    for ticket in tickets {
        outcomes.push(ticket.outcome().await);
    }
    outcomes
}

async fn finish(
    handle: SchedulerHandle<DemoValue>,
    mut events: mpsc::UnboundedReceiver<SlotUpdate<DemoValue>>,
    outcomes: Vec<DeferredOutcome>,
    slots: &[&str],
) -> Result<Transcript> {
    let mut finals = Vec::with_capacity(slots.len());
    for slot in slots {
        if let Some(snap) = handle.snapshot(&SlotName::new(*slot)?).await? {
            finals.push(snap);
        }
    }
    let stats = handle.stats().await?;
    handle.shutdown().await?;

    // Observers run before the actor replies, so everything is buffered already
    let mut collected = Vec::new();
    while let Ok(update) = events.try_recv() {
        collected.push(update);
    }
    debug!(events = collected.len(), "finish: transcript collected");

    Ok(Transcript {
        events: collected,
        outcomes,
        finals,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick_demo() -> DemoConfig {
        DemoConfig {
            slow_items: 20,
            item_cost_us: 50,
            keystroke_delay_ms: 0,
            toggles: 3,
        }
    }

    #[tokio::test]
    async fn test_toggle_scenario_applies_everything() {
        let transcript = run_toggle_scenario(SchedulerConfig::default(), &quick_demo())
            .await
            .unwrap();

        assert_eq!(transcript.final_value(TOGGLE_SLOT), Some(&DemoValue::Toggle(true)));
        match transcript.final_value(POSTS_SLOT) {
            Some(DemoValue::Posts(posts)) => assert_eq!(posts.len(), 20),
            other => panic!("unexpected posts value: {other:?}"),
        }
        assert_eq!(transcript.outcomes, vec![DeferredOutcome::Applied { version: 1 }]);
        assert_eq!(transcript.stats.urgent_applied, 3);

        // Toggles do not wait for the list
        let toggle = transcript.first_applied(TOGGLE_SLOT).unwrap();
        let posts = transcript.first_applied(POSTS_SLOT).unwrap();
        assert!(toggle < posts);
    }

    #[tokio::test]
    async fn test_search_scenario_final_results() {
        let transcript = run_search_scenario(SchedulerConfig::default(), &quick_demo(), "ro")
            .await
            .unwrap();

        assert_eq!(transcript.final_value(INPUT_SLOT), Some(&DemoValue::Query("ro".into())));
        match transcript.final_value(RESULTS_SLOT) {
            Some(DemoValue::Users(users)) => {
                let names: Vec<&str> = users.iter().map(|u| u.name.as_str()).collect();
                assert_eq!(names, vec!["Roshni", "Roshan"]);
            }
            other => panic!("unexpected results value: {other:?}"),
        }

        // Only the last filter is guaranteed to land
        assert_eq!(transcript.outcomes.len(), 3);
        assert!(matches!(transcript.outcomes.last(), Some(DeferredOutcome::Applied { .. })));
        let pending = transcript
            .events
            .iter()
            .filter(|e| e.slot.as_str() == RESULTS_SLOT && e.status == UpdateStatus::Pending)
            .count();
        assert_eq!(pending, 3);
    }

    #[tokio::test]
    async fn test_search_scenario_empty_query() {
        let transcript = run_search_scenario(SchedulerConfig::default(), &quick_demo(), "")
            .await
            .unwrap();
        match transcript.final_value(RESULTS_SLOT) {
            Some(DemoValue::Users(users)) => assert_eq!(users.len(), 3),
            other => panic!("unexpected results value: {other:?}"),
        }
        assert!(transcript.final_value(INPUT_SLOT).is_none());
    }
}
