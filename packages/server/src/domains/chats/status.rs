//! Display status derivation.
//!
//! Status is never stored. It is reduced from the message's event log, from
//! the point of view of one viewer.

use serde::Serialize;
use std::collections::HashMap;

use super::models::{MessageEvent, MessageEventType, USER_RELEVANT_EVENTS};
use crate::common::{MessageId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisplayStatus {
    Pending,
    Sent,
    Delivered,
    Read,
}

/// Whether an event counts for this viewer.
///
/// The sender sees what others did to the message. Everyone else sees their
/// own events plus the system's.
fn is_relevant(event: &MessageEvent, viewer: UserId, sender: Option<UserId>) -> bool {
    if !USER_RELEVANT_EVENTS.contains(&event.event_type) {
        return false;
    }

    if sender == Some(viewer) {
        event.user_id != Some(viewer)
    } else {
        event.user_id.is_none() || event.user_id == Some(viewer)
    }
}

pub fn derive_status(
    events: &[MessageEvent],
    viewer: UserId,
    sender: Option<UserId>,
) -> DisplayStatus {
    let relevant: Vec<MessageEventType> = events
        .iter()
        .filter(|e| is_relevant(e, viewer, sender))
        .map(|e| e.event_type)
        .collect();

    if relevant.contains(&MessageEventType::Read) {
        DisplayStatus::Read
    } else if relevant.contains(&MessageEventType::Delivered) {
        DisplayStatus::Delivered
    } else if relevant.contains(&MessageEventType::Stored) {
        DisplayStatus::Sent
    } else {
        DisplayStatus::Pending
    }
}

pub fn group_by_message(events: Vec<MessageEvent>) -> HashMap<MessageId, Vec<MessageEvent>> {
    let mut grouped: HashMap<MessageId, Vec<MessageEvent>> = HashMap::new();
    for event in events {
        grouped.entry(event.message_id).or_default().push(event);
    }
    grouped
}
