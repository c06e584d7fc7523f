//! Integration tests for the mail client.
//!
//! Collaborators are in-memory fakes registered on a `MailManager`, so every
//! assembled message can be inspected after dispatch.

#![allow(clippy::unwrap_used)]

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{TimeDelta, TimeZone, Utc};
use proptest::prelude::*;
use serde_json::json;

use mailpost::config::{FROM_ADDRESS, FROM_NAME};
use mailpost::{
    Address, ArrayTransport, AttachmentSource, BasicRenderer, Delay, DeliveryError, MailClient,
    MailManager, MailMessage, MemoryDisk, MetadataValue, Queue, QueueError, QueuedMail,
    RenderError, StorageManager, Transport,
};

/// Which queue entry point was invoked, and with what.
#[derive(Debug, Clone, PartialEq)]
enum QueueCall {
    Push(QueuedMail),
    Later(Delay, QueuedMail),
}

#[derive(Debug, Default)]
struct RecordingQueue {
    calls: Mutex<Vec<QueueCall>>,
}

impl RecordingQueue {
    fn calls(&self) -> Vec<QueueCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl Queue for RecordingQueue {
    fn push(&self, mail: QueuedMail) -> Result<(), QueueError> {
        self.calls.lock().unwrap().push(QueueCall::Push(mail));
        Ok(())
    }

    fn later(&self, delay: Delay, mail: QueuedMail) -> Result<(), QueueError> {
        self.calls
            .lock()
            .unwrap()
            .push(QueueCall::Later(delay, mail));
        Ok(())
    }
}

/// Transport that refuses everything.
struct RejectingTransport;

impl Transport for RejectingTransport {
    fn send(&self, _message: &MailMessage, _locale: Option<&str>) -> Result<(), DeliveryError> {
        Err(DeliveryError::Rejected("550 mailbox unavailable".to_string()))
    }
}

/// Queue that refuses everything.
struct FullQueue;

impl Queue for FullQueue {
    fn push(&self, _mail: QueuedMail) -> Result<(), QueueError> {
        Err(QueueError::Rejected("queue full".to_string()))
    }

    fn later(&self, _delay: Delay, _mail: QueuedMail) -> Result<(), QueueError> {
        Err(QueueError::Rejected("queue full".to_string()))
    }
}

struct Harness {
    manager: Arc<MailManager>,
    array: Arc<ArrayTransport>,
    secondary: Arc<ArrayTransport>,
    queue: Arc<RecordingQueue>,
    redis: Arc<RecordingQueue>,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

impl Harness {
    fn new() -> Self {
        init_tracing();

        let array = Arc::new(ArrayTransport::new());
        let secondary = Arc::new(ArrayTransport::new());
        let queue = Arc::new(RecordingQueue::default());
        let redis = Arc::new(RecordingQueue::default());

        let reports = MemoryDisk::new();
        reports.put("q1.csv", "a,b");
        let storage = StorageManager::new("reports").with_disk("reports", reports);

        let renderer = BasicRenderer::new()
            .with_view("welcome", "<h1>Welcome</h1>")
            .with_view("welcome.fr", "<h1>Bienvenue</h1>");

        let manager = MailManager::new("array")
            .with_mailer("array", array.clone())
            .with_mailer("secondary", secondary.clone())
            .with_mailer("rejecting", Arc::new(RejectingTransport))
            .with_queue("default", queue.clone())
            .with_queue("redis", redis.clone())
            .with_queue("full", Arc::new(FullQueue))
            .with_renderer(Arc::new(renderer))
            .with_storage(Arc::new(storage));

        Self {
            manager: Arc::new(manager),
            array,
            secondary,
            queue,
            redis,
        }
    }

    fn client(&self) -> MailClient {
        self.client_with_defaults(Some("noreply@x.com"), Some("Example"))
    }

    fn client_with_defaults(&self, address: Option<&str>, name: Option<&str>) -> MailClient {
        let mut config = HashMap::new();
        if let Some(address) = address {
            config.insert(FROM_ADDRESS.to_string(), address.to_string());
        }
        if let Some(name) = name {
            config.insert(FROM_NAME.to_string(), name.to_string());
        }
        MailClient::new(Arc::clone(&self.manager), Arc::new(config))
    }
}

#[test]
fn test_end_to_end_send() {
    let harness = Harness::new();
    let mut client = harness.client();
    client
        .set_sender_address("a@x.com")
        .set_recipient_address("b@x.com")
        .set_subject("Hi")
        .set_view("welcome")
        .add_attachment_from_path("/tmp/f.pdf", Some("doc.pdf"), None);

    client.send().unwrap();

    let sent = harness.array.messages();
    assert_eq!(sent.len(), 1);
    let message = &sent[0].message;

    assert_eq!(message.envelope.from.as_ref().unwrap().address(), "a@x.com");
    assert_eq!(message.envelope.to, Some(Address::new("b@x.com")));
    assert_eq!(message.envelope.subject.as_deref(), Some("Hi"));
    assert_eq!(message.content.view.as_deref(), Some("welcome"));
    assert_eq!(message.attachments.len(), 1);
    assert_eq!(
        message.attachments[0].source,
        AttachmentSource::Path {
            path: PathBuf::from("/tmp/f.pdf")
        }
    );
    assert_eq!(message.attachments[0].name.as_deref(), Some("doc.pdf"));
    assert!(message.attachments[0].mime.is_none());
}

#[test]
fn test_serialized_message_shape() {
    let harness = Harness::new();
    let mut client = harness.client_with_defaults(None, None);
    client
        .set_sender_address("a@x.com")
        .set_recipient_address("b@x.com")
        .set_subject("Hi")
        .set_view("welcome")
        .add_with("name", "Bob")
        .add_attachment_from_path("/tmp/f.pdf", Some("doc.pdf"), None);

    assert_eq!(
        serde_json::to_value(client.message()).unwrap(),
        json!({
            "envelope": {
                "from": { "address": "a@x.com" },
                "to": { "address": "b@x.com" },
                "subject": "Hi"
            },
            "content": { "view": "welcome", "with": { "name": "Bob" } },
            "attachments": [
                { "source_kind": "path", "path": "/tmp/f.pdf", "name": "doc.pdf" }
            ],
            "headers": {},
            "queue": { "after_commit": false }
        })
    );
}

#[test]
fn test_address_names() {
    let harness = Harness::new();
    let mut client = harness.client();
    client
        .set_recipient_address("b@x.com")
        .set_recipient_name("Bob")
        .add_cc(Address::named("c@x.com", ""))
        .add_cc(Address::named("d@x.com", "Dee"))
        .add_bcc("e@x.com")
        .add_reply_to(Address::named("f@x.com", "Support"));

    let envelope = client.envelope();
    assert_eq!(envelope.to, Some(Address::named("b@x.com", "Bob")));
    assert_eq!(envelope.cc[0].to_string(), "c@x.com");
    assert_eq!(envelope.cc[1].to_string(), "Dee <d@x.com>");
    assert!(envelope.bcc[0].name().is_none());
    assert_eq!(envelope.reply_to[0].name(), Some("Support"));
}

#[test]
fn test_sender_fallback() {
    let harness = Harness::new();
    let mut client = harness.client();
    assert_eq!(client.sender_address().as_deref(), Some("noreply@x.com"));
    assert_eq!(
        client.envelope().from,
        Some(Address::named("noreply@x.com", "Example"))
    );

    client.set_sender_address("a@x.com").set_sender_name("Alice");
    assert_eq!(client.sender_address().as_deref(), Some("a@x.com"));
    assert_eq!(
        client.envelope().from,
        Some(Address::named("a@x.com", "Alice"))
    );
}

#[test]
fn test_no_sender_anywhere() {
    let harness = Harness::new();
    let client = harness.client_with_defaults(None, None);
    assert!(client.sender_address().is_none());
    assert!(client.envelope().from.is_none());
}

#[test]
fn test_missing_recipient_still_sends() {
    let harness = Harness::new();
    let mut client = harness.client();
    client.set_subject("No one");

    client.send().unwrap();

    let sent = harness.array.messages();
    assert!(sent[0].message.envelope.to.is_none());
}

#[test]
fn test_empty_lists_omitted() {
    let harness = Harness::new();
    let client = harness.client_with_defaults(None, None);
    let json = serde_json::to_value(client.message()).unwrap();
    assert_eq!(json["envelope"], json!({}));
    assert_eq!(json["content"], json!({}));
    assert_eq!(json["headers"], json!({}));
}

#[test]
fn test_mixed_attachments_in_call_order() {
    let harness = Harness::new();
    let mut client = harness.client();
    client
        .add_attachment_from_storage("q1.csv", None, Some("text/csv"))
        .add_attachment_from_path("/tmp/a.pdf", Some(""), Some(""))
        .add_attachment_from_data(|| b"generated".to_vec(), Some("gen.txt"), None)
        .add_attachment_from_storage_disk("logo.png", "s3", Some("logo.png"), None);

    let attachments = client.message().attachments;
    assert_eq!(attachments.len(), 4);
    assert!(matches!(
        &attachments[0].source,
        AttachmentSource::Storage { path, disk: None } if path == "q1.csv"
    ));
    assert_eq!(attachments[0].mime.as_deref(), Some("text/csv"));
    assert!(matches!(attachments[1].source, AttachmentSource::Path { .. }));
    assert!(attachments[1].name.is_none());
    assert!(attachments[1].mime.is_none());
    assert!(matches!(attachments[2].source, AttachmentSource::Data { .. }));
    assert!(matches!(
        &attachments[3].source,
        AttachmentSource::Storage { disk: Some(disk), .. } if disk == "s3"
    ));
}

#[test]
fn test_set_attachments_replaces() {
    let harness = Harness::new();
    let mut client = harness.client();
    client
        .add_attachment_from_path("/tmp/a.pdf", None, None)
        .add_attachment_from_path("/tmp/b.pdf", None, None);
    client.set_attachments(vec![mailpost::Attachment::from_storage("q1.csv")]);

    assert_eq!(client.attachments().len(), 1);
    client.add_attachment_from_path("/tmp/c.pdf", None, None);
    assert_eq!(client.attachments().len(), 2);
}

#[test]
fn test_data_producer_not_called_by_client() {
    let harness = Harness::new();
    let calls = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&calls);

    let mut client = harness.client();
    client.add_attachment_from_data(
        move || {
            *counter.lock().unwrap() += 1;
            Vec::new()
        },
        None,
        None,
    );
    client.send().unwrap();
    client.queue(None).unwrap();

    assert_eq!(*calls.lock().unwrap(), 0);
}

#[test]
fn test_queue_now_vs_later() {
    let harness = Harness::new();
    let mut client = harness.client();
    client.set_recipient_address("b@x.com").set_subject("Hi");

    client.queue(None).unwrap();
    client.queue(Some(Delay::Seconds(300))).unwrap();
    let at = Utc.with_ymd_and_hms(2030, 1, 1, 9, 0, 0).unwrap();
    client.queue(Some(Delay::At(at))).unwrap();

    let calls = harness.queue.calls();
    assert_eq!(calls.len(), 3);
    assert!(matches!(&calls[0], QueueCall::Push(_)));
    assert!(matches!(&calls[1], QueueCall::Later(Delay::Seconds(300), _)));
    assert!(matches!(&calls[2], QueueCall::Later(Delay::At(when), _) if *when == at));

    // Both paths carry the same message
    let QueueCall::Push(now) = &calls[0] else {
        panic!("expected push");
    };
    let QueueCall::Later(_, later) = &calls[1] else {
        panic!("expected later");
    };
    assert_eq!(now, later);
}

#[test]
fn test_queue_options_applied() {
    let harness = Harness::new();
    let mut client = harness.client();
    client
        .set_driver("secondary")
        .set_locale("fr")
        .set_queue_connection("redis")
        .set_queue_name("emails")
        .set_after_commit(true);

    client.queue(Some(Delay::After(TimeDelta::minutes(10)))).unwrap();

    assert!(harness.queue.calls().is_empty());
    let calls = harness.redis.calls();
    let QueueCall::Later(delay, mail) = &calls[0] else {
        panic!("expected later");
    };
    assert_eq!(*delay, Delay::After(TimeDelta::minutes(10)));
    assert_eq!(mail.mailer.as_deref(), Some("secondary"));
    assert_eq!(mail.locale.as_deref(), Some("fr"));
    assert_eq!(mail.message.queue.connection.as_deref(), Some("redis"));
    assert_eq!(mail.message.queue.queue.as_deref(), Some("emails"));
    assert!(mail.message.queue.after_commit);
}

#[test]
fn test_queue_options_unset() {
    let harness = Harness::new();
    let mut client = harness.client();
    client.set_after_commit(false);

    client.queue(None).unwrap();

    let calls = harness.queue.calls();
    let QueueCall::Push(mail) = &calls[0] else {
        panic!("expected push");
    };
    assert!(mail.message.queue.connection.is_none());
    assert!(mail.message.queue.queue.is_none());
    assert!(!mail.message.queue.after_commit);
}

#[test]
fn test_queued_mail_delivered_later() {
    let harness = Harness::new();
    let mut client = harness.client();
    client
        .set_driver("secondary")
        .set_locale("fr")
        .set_subject("Queued");
    client.queue(None).unwrap();
    assert!(harness.secondary.is_empty());

    let calls = harness.queue.calls();
    let QueueCall::Push(mail) = &calls[0] else {
        panic!("expected push");
    };
    harness.manager.deliver(mail).unwrap();

    let sent = harness.secondary.messages();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].locale.as_deref(), Some("fr"));
    assert_eq!(sent[0].message.envelope.subject.as_deref(), Some("Queued"));
}

#[test]
fn test_send_twice_sends_identical_messages() {
    let harness = Harness::new();
    let mut client = harness.client();
    client
        .set_recipient_address("b@x.com")
        .set_subject("Twice")
        .add_tag("repeat")
        .add_metadata("user_id", 42);

    client.send().unwrap();
    client.send().unwrap();

    let sent = harness.array.messages();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0], sent[1]);
    assert_eq!(client.subject(), Some("Twice"));
}

#[test]
fn test_driver_and_locale_routing() {
    let harness = Harness::new();
    let mut client = harness.client();
    client.set_driver("secondary").set_locale("de");
    client.send().unwrap();

    assert!(harness.array.is_empty());
    let sent = harness.secondary.messages();
    assert_eq!(sent[0].locale.as_deref(), Some("de"));
}

#[test]
fn test_delivery_error_propagates() {
    let harness = Harness::new();
    let mut client = harness.client();
    client.set_driver("rejecting");
    assert!(matches!(
        client.send(),
        Err(DeliveryError::Rejected(reason)) if reason.starts_with("550")
    ));

    client.set_driver("smtp");
    assert!(matches!(
        client.send(),
        Err(DeliveryError::UnknownMailer(name)) if name == "smtp"
    ));
}

#[test]
fn test_queue_error_propagates() {
    let harness = Harness::new();
    let mut client = harness.client();
    client.set_queue_connection("full");
    assert!(matches!(client.queue(None), Err(QueueError::Rejected(_))));

    client.set_queue_connection("sqs");
    assert!(matches!(
        client.queue(Some(Delay::Seconds(1))),
        Err(QueueError::UnknownConnection(name)) if name == "sqs"
    ));
}

#[test]
fn test_render() {
    let harness = Harness::new();
    let mut client = harness.client();
    client.set_view("welcome");
    assert_eq!(client.render().unwrap(), "<h1>Welcome</h1>");

    client.set_locale("fr");
    assert_eq!(client.render().unwrap(), "<h1>Bienvenue</h1>");

    client.set_html_string("<p>override</p>");
    assert_eq!(client.render().unwrap(), "<p>override</p>");
    assert!(harness.array.is_empty());
}

#[test]
fn test_render_error_propagates() {
    let harness = Harness::new();
    let mut client = harness.client();
    assert!(matches!(client.render(), Err(RenderError::EmptyBody)));

    client.set_view("missing");
    assert!(matches!(
        client.render(),
        Err(RenderError::ViewNotFound(name)) if name == "missing"
    ));
}

#[test]
fn test_all_content_representations_kept() {
    let harness = Harness::new();
    let mut client = harness.client();
    client
        .set_view("welcome")
        .set_html("<p>raw</p>")
        .set_text("plain")
        .set_markdown("# md")
        .set_html_string("<p>string</p>");

    let content = client.content();
    assert_eq!(content.view.as_deref(), Some("welcome"));
    assert_eq!(content.html.as_deref(), Some("<p>raw</p>"));
    assert_eq!(content.text.as_deref(), Some("plain"));
    assert_eq!(content.markdown.as_deref(), Some("# md"));
    assert_eq!(content.html_string.as_deref(), Some("<p>string</p>"));
}

#[test]
fn test_headers() {
    let harness = Harness::new();
    let mut client = harness.client();
    client
        .set_message_id("id-2@x.com")
        .add_reference("id-0@x.com")
        .add_reference("id-1@x.com")
        .add_text_header("X-Campaign", "spring")
        .add_text_header("X-Campaign", "summer");

    let headers = client.headers();
    assert_eq!(headers.message_id.as_deref(), Some("id-2@x.com"));
    assert_eq!(headers.references, vec!["id-0@x.com", "id-1@x.com"]);
    assert_eq!(headers.text["X-Campaign"], "summer");
}

#[test]
fn test_log_mailer_resolves_storage_attachment() {
    let harness = Harness::new();
    let log = mailpost::LogTransport::new(
        Arc::new(BasicRenderer::new()),
        Arc::new(StorageManager::new("reports").with_disk("reports", {
            let disk = MemoryDisk::new();
            disk.put("q1.csv", "a,b");
            disk
        })),
    );
    let mut client = harness.client();
    client
        .set_recipient_address("b@x.com")
        .set_text("report attached")
        .add_attachment_from_storage("q1.csv", Some("report.csv"), None);

    let mime = log.build(&client.message(), None).unwrap().to_string();
    assert!(mime.contains("From: \"Example\" <noreply@x.com>\r\n"));
    assert!(mime.contains("report.csv"));
    assert!(mime.contains("text/csv"));

    log.send(&client.message(), None).unwrap();
}

fn address_strategy() -> impl Strategy<Value = String> {
    "[a-z]{1,8}@[a-z]{1,6}\\.com"
}

proptest! {
    #[test]
    fn prop_lists_preserve_insertion_order(
        cc in prop::collection::vec(address_strategy(), 0..8),
        tags in prop::collection::vec("[a-z]{1,10}", 0..8),
        references in prop::collection::vec("[a-z0-9]{1,10}@x", 0..8),
    ) {
        let harness = Harness::new();
        let mut client = harness.client();
        for address in &cc {
            client.add_cc(address.as_str());
        }
        for tag in &tags {
            client.add_tag(tag.as_str());
        }
        for reference in &references {
            client.add_reference(reference.as_str());
        }

        let message = client.message();
        let assembled_cc: Vec<&str> = message.envelope.cc.iter().map(Address::address).collect();
        prop_assert_eq!(assembled_cc, cc.iter().map(String::as_str).collect::<Vec<_>>());
        prop_assert_eq!(&message.envelope.tags, &tags);
        prop_assert_eq!(&message.headers.references, &references);

        let json = serde_json::to_value(&message).unwrap();
        prop_assert_eq!(json["envelope"].get("cc").is_some(), !cc.is_empty());
        prop_assert_eq!(json["envelope"].get("tags").is_some(), !tags.is_empty());
        prop_assert_eq!(json["headers"].get("references").is_some(), !references.is_empty());
    }

    #[test]
    fn prop_metadata_and_text_headers_last_write_wins(
        writes in prop::collection::vec(("[a-c]", 0i64..100), 0..16),
    ) {
        let harness = Harness::new();
        let mut client = harness.client();
        let mut expected_metadata = BTreeMap::new();
        let mut expected_headers = BTreeMap::new();

        for (key, value) in &writes {
            client.add_metadata(key.as_str(), *value);
            client.add_text_header(format!("X-{key}"), value.to_string());
            expected_metadata.insert(key.clone(), MetadataValue::Int(*value));
            expected_headers.insert(format!("X-{key}"), value.to_string());
        }

        let message = client.message();
        prop_assert_eq!(&message.envelope.metadata, &expected_metadata);
        prop_assert_eq!(&message.headers.text, &expected_headers);

        let json = serde_json::to_value(&message).unwrap();
        prop_assert_eq!(json["envelope"].get("metadata").is_some(), !writes.is_empty());
        prop_assert_eq!(json["headers"].get("text").is_some(), !writes.is_empty());
    }

    #[test]
    fn prop_attachment_count_matches_calls(kinds in prop::collection::vec(0u8..4, 0..12)) {
        let harness = Harness::new();
        let mut client = harness.client();
        for (i, kind) in kinds.iter().enumerate() {
            let name = format!("file-{i}");
            match kind {
                0 => client.add_attachment_from_path(format!("/tmp/{name}"), Some(name.as_str()), None),
                1 => client.add_attachment_from_storage(name.clone(), Some(name.as_str()), None),
                2 => client.add_attachment_from_storage_disk(name.clone(), "s3", Some(name.as_str()), None),
                _ => client.add_attachment_from_data(Vec::new, Some(name.as_str()), None),
            };
        }

        let attachments = client.message().attachments;
        prop_assert_eq!(attachments.len(), kinds.len());
        for (i, attachment) in attachments.iter().enumerate() {
            prop_assert_eq!(attachment.file_name(), format!("file-{i}"));
        }
    }
}
