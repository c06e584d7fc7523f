//! Named mailers, queue connections, the renderer and storage disks.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::{MailConfig, QueueDriver, TransportKind};
use crate::error::{DeliveryError, QueueError, RenderError};
use crate::message::MailMessage;
use crate::queue::{Delay, MemoryQueue, Queue, QueuedMail};
use crate::render::{BasicRenderer, Renderer};
use crate::storage::StorageManager;
use crate::transport::{ArrayTransport, LogTransport, Transport};

/// Registry of everything a message needs once it leaves the client.
///
/// A manager is shared between clients behind an `Arc`; all registered
/// collaborators are `Send + Sync`.
#[derive(Clone)]
pub struct MailManager {
    default_mailer: String,
    mailers: BTreeMap<String, Arc<dyn Transport>>,
    renderer: Arc<dyn Renderer>,
    default_queue: String,
    queues: BTreeMap<String, Arc<dyn Queue>>,
    storage: Arc<StorageManager>,
}

impl MailManager {
    /// Creates a manager without mailers or queue connections.
    #[must_use]
    pub fn new(default_mailer: impl Into<String>) -> Self {
        Self {
            default_mailer: default_mailer.into(),
            mailers: BTreeMap::new(),
            renderer: Arc::new(BasicRenderer::new()),
            default_queue: "default".to_string(),
            queues: BTreeMap::new(),
            storage: Arc::new(StorageManager::default()),
        }
    }

    /// Builds the configured mailers, disks and queue connections.
    ///
    /// `log` mailers share `renderer` and the configured disks.
    #[must_use]
    pub fn from_config(config: &MailConfig, renderer: Arc<dyn Renderer>) -> Self {
        let storage = Arc::new(StorageManager::from_config(config));
        let mut manager = Self::new(config.default.clone())
            .with_renderer(Arc::clone(&renderer))
            .with_storage(Arc::clone(&storage))
            .with_default_queue(config.default_queue.clone());

        for (name, mailer) in &config.mailers {
            let transport: Arc<dyn Transport> = match mailer.transport {
                TransportKind::Array => Arc::new(ArrayTransport::new()),
                TransportKind::Log => Arc::new(LogTransport::new(
                    Arc::clone(&renderer),
                    Arc::clone(&storage),
                )),
            };
            manager = manager.with_mailer(name.clone(), transport);
        }

        for (name, queue) in &config.queues {
            let queue: Arc<dyn Queue> = match queue.driver {
                QueueDriver::Memory => Arc::new(MemoryQueue::new()),
            };
            manager = manager.with_queue(name.clone(), queue);
        }

        debug!(
            "Built mail manager with mailers {:?}, default {:?}",
            manager.mailers.keys().collect::<Vec<_>>(),
            manager.default_mailer
        );
        manager
    }

    /// Registers a transport under a mailer name.
    #[must_use]
    pub fn with_mailer(mut self, name: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        self.mailers.insert(name.into(), transport);
        self
    }

    /// Registers a queue connection.
    #[must_use]
    pub fn with_queue(mut self, name: impl Into<String>, queue: Arc<dyn Queue>) -> Self {
        self.queues.insert(name.into(), queue);
        self
    }

    /// Sets the connection used by messages that name none.
    #[must_use]
    pub fn with_default_queue(mut self, name: impl Into<String>) -> Self {
        self.default_queue = name.into();
        self
    }

    /// Replaces the renderer.
    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Replaces the storage disks.
    #[must_use]
    pub fn with_storage(mut self, storage: Arc<StorageManager>) -> Self {
        self.storage = storage;
        self
    }

    /// Name of the mailer used when none is selected.
    #[must_use]
    pub fn default_mailer(&self) -> &str {
        &self.default_mailer
    }

    /// Storage disks attachments are read from.
    #[must_use]
    pub fn storage(&self) -> &StorageManager {
        &self.storage
    }

    /// Returns a handle bound to the named mailer, or the default one.
    ///
    /// The name is resolved when the handle is used, so an unknown mailer
    /// surfaces as the error of that operation.
    #[must_use]
    pub fn mailer(&self, name: Option<&str>) -> PendingMail<'_> {
        PendingMail {
            manager: self,
            mailer: name.map(str::to_string),
            locale: None,
        }
    }

    /// Sends a previously queued mail through its recorded mailer and locale.
    ///
    /// # Errors
    ///
    /// Returns an error if the mailer is unknown or the transport fails.
    pub fn deliver(&self, mail: &QueuedMail) -> Result<(), DeliveryError> {
        let mut pending = self.mailer(mail.mailer.as_deref());
        if let Some(locale) = &mail.locale {
            pending = pending.locale(locale.as_str());
        }
        pending.send(&mail.message)
    }

    fn transport(&self, name: Option<&str>) -> Option<(&str, &Arc<dyn Transport>)> {
        let name = name.unwrap_or(self.default_mailer.as_str());
        match self.mailers.get_key_value(name) {
            Some((name, transport)) => Some((name.as_str(), transport)),
            None => {
                warn!("Mailer [{}] is not defined", name);
                None
            }
        }
    }

    fn queue_connection(&self, name: Option<&str>) -> Result<&Arc<dyn Queue>, QueueError> {
        let name = name.unwrap_or(self.default_queue.as_str());
        self.queues.get(name).ok_or_else(|| {
            warn!("Queue connection [{}] is not defined", name);
            QueueError::UnknownConnection(name.to_string())
        })
    }
}

impl Default for MailManager {
    fn default() -> Self {
        Self::from_config(&MailConfig::default(), Arc::new(BasicRenderer::new()))
    }
}

impl fmt::Debug for MailManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailManager")
            .field("default_mailer", &self.default_mailer)
            .field("mailers", &self.mailers.keys().collect::<Vec<_>>())
            .field("default_queue", &self.default_queue)
            .field("queues", &self.queues.keys().collect::<Vec<_>>())
            .field("storage", &self.storage)
            .finish_non_exhaustive()
    }
}

/// A mailer selected on a [`MailManager`], optionally bound to a locale.
#[derive(Debug, Clone)]
pub struct PendingMail<'a> {
    manager: &'a MailManager,
    mailer: Option<String>,
    locale: Option<String>,
}

impl PendingMail<'_> {
    /// Renders and sends in `locale`.
    #[must_use]
    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    fn unknown_mailer(&self) -> String {
        self.mailer
            .clone()
            .unwrap_or_else(|| self.manager.default_mailer.clone())
    }

    /// Sends `message` synchronously.
    ///
    /// # Errors
    ///
    /// Returns an error if the mailer is unknown or the transport fails.
    pub fn send(&self, message: &MailMessage) -> Result<(), DeliveryError> {
        let (name, transport) = self
            .manager
            .transport(self.mailer.as_deref())
            .ok_or_else(|| DeliveryError::UnknownMailer(self.unknown_mailer()))?;

        debug!(
            "Sending message via mailer {:?} (locale {:?}, {} attachment(s))",
            name,
            self.locale,
            message.attachments.len()
        );
        transport.send(message, self.locale.as_deref())
    }

    /// Renders the HTML body of `message` without sending it.
    ///
    /// # Errors
    ///
    /// Returns an error if the mailer is unknown or rendering fails.
    pub fn render(&self, message: &MailMessage) -> Result<String, RenderError> {
        if self.manager.transport(self.mailer.as_deref()).is_none() {
            return Err(RenderError::UnknownMailer(self.unknown_mailer()));
        }
        self.manager
            .renderer
            .render(message, self.locale.as_deref())
    }

    /// Queues `message` for immediate delivery.
    ///
    /// The connection comes from the message's queue options, falling back
    /// to the manager's default connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the mailer or connection is unknown, or the queue
    /// refuses the job.
    pub fn queue(&self, message: MailMessage) -> Result<(), QueueError> {
        let (queue, mail) = self.prepare(message)?;
        queue.push(mail)
    }

    /// Queues `message` for delivery after `delay`.
    ///
    /// # Errors
    ///
    /// Returns an error under the same conditions as [`PendingMail::queue`].
    pub fn later(&self, delay: Delay, message: MailMessage) -> Result<(), QueueError> {
        let (queue, mail) = self.prepare(message)?;
        queue.later(delay, mail)
    }

    fn prepare(&self, message: MailMessage) -> Result<(&Arc<dyn Queue>, QueuedMail), QueueError> {
        if self.manager.transport(self.mailer.as_deref()).is_none() {
            return Err(QueueError::UnknownMailer(self.unknown_mailer()));
        }
        let queue = self
            .manager
            .queue_connection(message.queue.connection.as_deref())?;

        debug!(
            "Queueing message on connection {:?}, queue {:?} (after commit: {})",
            message.queue.connection,
            message.queue.queue,
            message.queue.after_commit
        );
        Ok((
            queue,
            QueuedMail {
                message,
                mailer: self.mailer.clone(),
                locale: self.locale.clone(),
            },
        ))
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
    use crate::address::Address;
    use chrono::Utc;

    struct Fixture {
        manager: MailManager,
        array: Arc<ArrayTransport>,
        queue: Arc<MemoryQueue>,
        delayed: Arc<MemoryQueue>,
    }

    fn fixture() -> Fixture {
        let array = Arc::new(ArrayTransport::new());
        let queue = Arc::new(MemoryQueue::new());
        let delayed = Arc::new(MemoryQueue::new());
        let renderer = BasicRenderer::new().with_view("welcome", "<h1>Welcome</h1>");

        let manager = MailManager::new("array")
            .with_mailer("array", array.clone())
            .with_queue("default", queue.clone())
            .with_queue("delayed", delayed.clone())
            .with_renderer(Arc::new(renderer));

        Fixture {
            manager,
            array,
            queue,
            delayed,
        }
    }

    fn message() -> MailMessage {
        let mut message = MailMessage::default();
        message.envelope.to = Some(Address::new("b@x.com"));
        message.content.view = Some("welcome".to_string());
        message
    }

    #[test]
    fn test_send_through_default_mailer() {
        let fx = fixture();
        fx.manager.mailer(None).send(&message()).unwrap();
        fx.manager
            .mailer(Some("array"))
            .locale("fr")
            .send(&message())
            .unwrap();

        let sent = fx.array.messages();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].locale.is_none());
        assert_eq!(sent[1].locale.as_deref(), Some("fr"));
    }

    #[test]
    fn test_unknown_mailer_per_operation() {
        let fx = fixture();
        let pending = fx.manager.mailer(Some("ses"));

        assert!(matches!(
            pending.send(&message()),
            Err(DeliveryError::UnknownMailer(name)) if name == "ses"
        ));
        assert!(matches!(
            pending.render(&message()),
            Err(RenderError::UnknownMailer(name)) if name == "ses"
        ));
        assert!(matches!(
            pending.queue(message()),
            Err(QueueError::UnknownMailer(name)) if name == "ses"
        ));
        assert!(fx.array.is_empty());
        assert!(fx.queue.is_empty());
    }

    #[test]
    fn test_render() {
        let fx = fixture();
        let html = fx.manager.mailer(None).render(&message()).unwrap();
        assert_eq!(html, "<h1>Welcome</h1>");
    }

    #[test]
    fn test_queue_uses_message_connection() {
        let fx = fixture();
        let pending = fx.manager.mailer(None).locale("de");

        pending.queue(message()).unwrap();
        pending
            .later(Delay::Seconds(60), message().on_connection("delayed"))
            .unwrap();

        let jobs = fx.queue.jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].mail.locale.as_deref(), Some("de"));
        assert!(jobs[0].delay.is_none());

        let delayed = fx.delayed.jobs();
        assert_eq!(delayed.len(), 1);
        assert_eq!(delayed[0].delay, Some(Delay::Seconds(60)));
    }

    #[test]
    fn test_queue_unknown_connection() {
        let fx = fixture();
        let result = fx
            .manager
            .mailer(None)
            .queue(message().on_connection("sqs"));
        assert!(matches!(
            result,
            Err(QueueError::UnknownConnection(name)) if name == "sqs"
        ));
    }

    #[test]
    fn test_deliver_queued_mail() {
        let fx = fixture();
        fx.manager
            .mailer(Some("array"))
            .locale("es")
            .queue(message())
            .unwrap();

        let job = fx.queue.pop_due(Utc::now()).unwrap();
        fx.manager.deliver(&job).unwrap();

        let sent = fx.array.messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].message, message());
        assert_eq!(sent[0].locale.as_deref(), Some("es"));
    }

    #[test]
    fn test_from_config() {
        let manager = MailManager::default();
        assert_eq!(manager.default_mailer(), "log");
        assert_eq!(manager.storage().default_disk(), "local");

        let mut message = message();
        message.content = crate::content::Content {
            text: Some("hello".to_string()),
            ..crate::content::Content::default()
        };
        message.envelope.from = Some(Address::new("a@x.com"));

        manager.mailer(Some("array")).send(&message).unwrap();
        manager.mailer(None).send(&message).unwrap();
        manager.mailer(None).queue(message).unwrap();
    }
}
