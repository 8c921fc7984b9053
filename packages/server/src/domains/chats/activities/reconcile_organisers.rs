//! Organiser reconciliation - sync a course chat's admins with the declared
//! organiser set.
//!
//! Each per-user change commits on its own, so an interrupted run leaves the
//! chat consistent and the next run picks up where it stopped. Running twice
//! with the same input changes nothing the second time.

use std::collections::HashSet;

use serde::Serialize;
use sqlx::PgConnection;
use tracing::{debug, info, warn};

use super::append_system_message;
use crate::common::{ChatId, UserId};
use crate::domains::chats::errors::ChatResult;
use crate::domains::chats::models::{Chat, ChatPermission, Enrollment, Membership, User};
use crate::domains::chats::payloads::{joined_as_admin, left_the_group, system_text};
use crate::kernel::ServerDeps;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    /// None when the course has no chat
    pub chat_id: Option<ChatId>,
    pub added: Vec<UserId>,
    pub promoted: Vec<UserId>,
    pub downgraded: Vec<UserId>,
    pub removed: Vec<UserId>,
}

impl ReconcileReport {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.promoted.is_empty()
            && self.downgraded.is_empty()
            && self.removed.is_empty()
    }
}

enum Change {
    Added,
    Promoted,
    Downgraded,
    Removed,
    Unchanged,
}

async fn user_name(user_id: UserId, conn: &mut PgConnection) -> anyhow::Result<String> {
    Ok(User::find_by_id_in(user_id, conn)
        .await?
        .map(|u| u.name)
        .unwrap_or_else(|| user_id.to_string()))
}

/// Make one declared organiser an active ADMIN
async fn ensure_admin(chat_id: ChatId, user_id: UserId, deps: &ServerDeps) -> ChatResult<Change> {
    let mut tx = deps.db_pool.begin().await?;

    let change = match Membership::find(chat_id, user_id, &mut *tx).await? {
        None => {
            Membership::insert(chat_id, user_id, ChatPermission::Admin, &mut *tx).await?;
            let name = user_name(user_id, &mut *tx).await?;
            append_system_message(chat_id, &system_text(joined_as_admin(&name)), &mut *tx)
                .await?;
            Change::Added
        }
        Some(m) if m.permission == ChatPermission::Guest || m.has_left => {
            let permission = match m.permission {
                ChatPermission::Owner => ChatPermission::Owner,
                ChatPermission::Admin | ChatPermission::Guest => ChatPermission::Admin,
            };
            Membership::set_permission(chat_id, user_id, permission, &mut *tx).await?;
            Change::Promoted
        }
        Some(_) => Change::Unchanged,
    };

    if !matches!(change, Change::Unchanged) {
        Chat::touch_activity(chat_id, &mut *tx).await?;
    }
    tx.commit().await?;
    Ok(change)
}

/// Downgrade or remove a member that is no longer an organiser
async fn retire(
    chat_id: ChatId,
    user_id: UserId,
    enrolled: bool,
    deps: &ServerDeps,
) -> ChatResult<Change> {
    let mut tx = deps.db_pool.begin().await?;

    let change = match Membership::find(chat_id, user_id, &mut *tx).await? {
        None => Change::Unchanged,
        Some(m) if m.permission == ChatPermission::Owner => Change::Unchanged,
        Some(m) if enrolled => {
            if m.permission == ChatPermission::Admin {
                Membership::set_permission(chat_id, user_id, ChatPermission::Guest, &mut *tx)
                    .await?;
                Change::Downgraded
            } else {
                Change::Unchanged
            }
        }
        Some(_) => {
            let name = user_name(user_id, &mut *tx).await?;
            Membership::delete(chat_id, user_id, &mut *tx).await?;
            append_system_message(chat_id, &system_text(left_the_group(&name)), &mut *tx)
                .await?;
            Change::Removed
        }
    };

    if !matches!(change, Change::Unchanged) {
        Chat::touch_activity(chat_id, &mut *tx).await?;
    }
    tx.commit().await?;
    Ok(change)
}

pub async fn reconcile_organisers(
    course_id: &str,
    organiser_ids: &[UserId],
    deps: &ServerDeps,
) -> ChatResult<ReconcileReport> {
    let Some(chat) = Chat::find_by_course_id(course_id, &deps.db_pool).await? else {
        debug!(course_id = %course_id, "No chat for course, nothing to reconcile");
        return Ok(ReconcileReport::default());
    };

    let mut report = ReconcileReport {
        chat_id: Some(chat.id),
        ..Default::default()
    };

    let memberships = Membership::find_for_chat(chat.id, &deps.db_pool).await?;
    let enrolled = Enrollment::user_ids_for_course(course_id, &deps.db_pool).await?;

    let declared: HashSet<UserId> = organiser_ids.iter().copied().collect();
    let unknown: HashSet<UserId> = User::find_missing(organiser_ids, &deps.db_pool)
        .await?
        .into_iter()
        .collect();

    for &user_id in organiser_ids {
        if unknown.contains(&user_id) {
            warn!(course_id = %course_id, user_id = %user_id, "Skipping unknown organiser");
            continue;
        }
        if report.added.contains(&user_id) || report.promoted.contains(&user_id) {
            continue;
        }
        match ensure_admin(chat.id, user_id, deps).await? {
            Change::Added => report.added.push(user_id),
            Change::Promoted => report.promoted.push(user_id),
            Change::Downgraded | Change::Removed | Change::Unchanged => {}
        }
    }

    for membership in memberships.iter().filter(|m| !declared.contains(&m.user_id)) {
        if membership.permission == ChatPermission::Owner {
            continue;
        }
        let is_enrolled = enrolled.contains(&membership.user_id);
        match retire(chat.id, membership.user_id, is_enrolled, deps).await? {
            Change::Downgraded => report.downgraded.push(membership.user_id),
            Change::Removed => report.removed.push(membership.user_id),
            Change::Added | Change::Promoted | Change::Unchanged => {}
        }
    }

    if !report.is_empty() {
        info!(
            chat_id = %chat.id,
            course_id = %course_id,
            added = report.added.len(),
            promoted = report.promoted.len(),
            downgraded = report.downgraded.len(),
            removed = report.removed.len(),
            "Organisers reconciled"
        );
    }

    Ok(report)
}
