//! Append-only notes and notifications on a referral.
//!
//! Both operations mutate the referral in place and are meant to run inside a repository's
//! atomic update, so the note, its notification and the `updated_at` stamp land together.

use crate::ids::RecordId;
use crate::models::{Note, Notification, Referral};
use chrono::{DateTime, Utc};
use referral_types::NonEmptyText;

pub const NOTE_NOTIFICATION_PREFIX: &str = "New note added by";

/// Appends a note and the notification announcing it.
pub fn append_note(
    referral: &mut Referral,
    content: NonEmptyText,
    author_service_id: RecordId,
    author_name: NonEmptyText,
    now: DateTime<Utc>,
) {
    let message = format!("{NOTE_NOTIFICATION_PREFIX} {author_name}");
    referral.notes.push(Note {
        content,
        author_service_id,
        author_name,
        created_at: now,
    });
    referral.notifications.push(Notification {
        message,
        created_at: now,
        read: false,
    });
    referral.touch(now);
}

/// Marks every notification read and returns how many changed.
///
/// When nothing was unread the referral is left exactly as it was, so calling this twice
/// produces the same state as calling it once.
pub fn mark_all_read(referral: &mut Referral, now: DateTime<Utc>) -> usize {
    let unread = referral.unread_notifications();
    if unread == 0 {
        return 0;
    }
    for notification in referral.notifications.iter_mut() {
        notification.read = true;
    }
    referral.touch(now);
    unread
}
