//! Queued delivery.
//!
//! Queueing only records a [`QueuedMail`] job on a [`Queue`]. A worker later
//! hands the job back to [`crate::MailManager::deliver`], which sends it
//! through the mailer recorded on the job.

use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Mutex;

use crate::error::QueueError;
use crate::message::MailMessage;

/// When a queued mail becomes available to workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delay {
    /// A number of seconds from now.
    Seconds(u64),
    /// A duration from now.
    After(TimeDelta),
    /// A fixed point in time.
    At(DateTime<Utc>),
}

impl Delay {
    /// Returns the time the job becomes available, relative to `now`.
    #[must_use]
    pub fn available_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let offset = match *self {
            Self::Seconds(seconds) => i64::try_from(seconds)
                .ok()
                .and_then(TimeDelta::try_seconds)
                .unwrap_or(TimeDelta::MAX),
            Self::After(duration) => duration,
            Self::At(at) => return at,
        };
        now.checked_add_signed(offset)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

impl From<u64> for Delay {
    fn from(seconds: u64) -> Self {
        Self::Seconds(seconds)
    }
}

impl From<TimeDelta> for Delay {
    fn from(duration: TimeDelta) -> Self {
        Self::After(duration)
    }
}

impl From<DateTime<Utc>> for Delay {
    fn from(at: DateTime<Utc>) -> Self {
        Self::At(at)
    }
}

/// A mail waiting on a queue.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedMail {
    /// The assembled message, including its queue options.
    pub message: MailMessage,
    /// Mailer to send through; the default mailer when `None`.
    pub mailer: Option<String>,
    /// Locale to render in.
    pub locale: Option<String>,
}

/// A queue connection accepting mail jobs.
pub trait Queue: Send + Sync {
    /// Enqueues a job for immediate processing.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue refuses the job.
    fn push(&self, mail: QueuedMail) -> Result<(), QueueError>;

    /// Enqueues a job that becomes available after `delay`.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue refuses the job.
    fn later(&self, delay: Delay, mail: QueuedMail) -> Result<(), QueueError>;
}

/// A job stored on a [`MemoryQueue`].
#[derive(Debug, Clone, PartialEq)]
pub struct QueueEntry {
    /// The queued mail.
    pub mail: QueuedMail,
    /// Delay it was queued with, if any.
    pub delay: Option<Delay>,
    /// When the job becomes available.
    pub available_at: DateTime<Utc>,
}

/// In-process queue.
///
/// Jobs live in a `Vec` behind a mutex and are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryQueue {
    entries: Mutex<Vec<QueueEntry>>,
}

impl MemoryQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, entry: QueueEntry) {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.push(entry);
    }

    /// Returns a snapshot of the queued jobs, oldest first.
    #[must_use]
    pub fn jobs(&self) -> Vec<QueueEntry> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Returns the number of queued jobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Returns true if no job is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes and returns the oldest job available at `now`.
    pub fn pop_due(&self, now: DateTime<Utc>) -> Option<QueuedMail> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let pos = entries.iter().position(|e| e.available_at <= now)?;
        Some(entries.remove(pos).mail)
    }
}

impl Queue for MemoryQueue {
    fn push(&self, mail: QueuedMail) -> Result<(), QueueError> {
        self.insert(QueueEntry {
            mail,
            delay: None,
            available_at: Utc::now(),
        });
        Ok(())
    }

    fn later(&self, delay: Delay, mail: QueuedMail) -> Result<(), QueueError> {
        self.insert(QueueEntry {
            mail,
            delay: Some(delay),
            available_at: delay.available_at(Utc::now()),
        });
        Ok(())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn mail(subject: &str) -> QueuedMail {
        let mut message = MailMessage::default();
        message.envelope.subject = Some(subject.to_string());
        QueuedMail {
            message,
            mailer: None,
            locale: None,
        }
    }

    fn subject(mail: &QueuedMail) -> &str {
        mail.message.envelope.subject.as_deref().unwrap()
    }

    #[test]
    fn test_delay_available_at() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();

        assert_eq!(
            Delay::Seconds(90).available_at(now),
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 1, 30).unwrap()
        );
        assert_eq!(
            Delay::After(TimeDelta::hours(2)).available_at(now),
            Utc.with_ymd_and_hms(2024, 1, 1, 14, 0, 0).unwrap()
        );

        let at = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        assert_eq!(Delay::At(at).available_at(now), at);
    }

    #[test]
    fn test_delay_saturates() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            Delay::Seconds(u64::MAX).available_at(now),
            DateTime::<Utc>::MAX_UTC
        );
    }

    #[test]
    fn test_delay_from() {
        assert_eq!(Delay::from(30_u64), Delay::Seconds(30));
        assert_eq!(
            Delay::from(TimeDelta::minutes(5)),
            Delay::After(TimeDelta::minutes(5))
        );
    }

    #[test]
    fn test_push_and_later() {
        let queue = MemoryQueue::new();
        queue.push(mail("now")).unwrap();
        queue.later(Delay::Seconds(60), mail("later")).unwrap();

        let jobs = queue.jobs();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].delay, None);
        assert_eq!(jobs[1].delay, Some(Delay::Seconds(60)));
        assert!(jobs[1].available_at > jobs[0].available_at);
    }

    #[test]
    fn test_pop_due_respects_availability() {
        let queue = MemoryQueue::new();
        queue.later(Delay::Seconds(3600), mail("later")).unwrap();
        queue.push(mail("first")).unwrap();
        queue.push(mail("second")).unwrap();

        let now = Utc::now();
        assert_eq!(subject(&queue.pop_due(now).unwrap()), "first");
        assert_eq!(subject(&queue.pop_due(now).unwrap()), "second");
        assert!(queue.pop_due(now).is_none());
        assert_eq!(queue.len(), 1);

        let later = now + TimeDelta::hours(2);
        assert_eq!(subject(&queue.pop_due(later).unwrap()), "later");
        assert!(queue.is_empty());
    }
}
