//! Audit event fan-out.
//!
//! # Responsibility
//! - Name every auditable lifecycle event.
//! - Deliver each recorded event to the subscribers whose scope accepts it.
//!
//! # Invariants
//! - `SubscriberScope::ActorTriggered` subscribers only see events that
//!   carry an actor.
//! - A failing subscriber never blocks delivery to the others.

use crate::model::account::Actor;
use crate::model::ids::UserId;
use crate::model::lifecycle::DependentKind;
use log::{debug, info, warn};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Auditable event names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AuditEventType {
    ProjectCreated,
    ProjectUpdated,
    ProjectDeleted,
    ProjectDeletedTriggered,
    ProjectViewed,
    ProjectBookmarked,
    ProjectUnbookmarked,
    /// Stop requested for one dependent during project deletion.
    StoppedTriggered(DependentKind),
}

impl AuditEventType {
    pub fn name(self) -> String {
        match self {
            Self::ProjectCreated => "project.created".to_string(),
            Self::ProjectUpdated => "project.updated".to_string(),
            Self::ProjectDeleted => "project.deleted".to_string(),
            Self::ProjectDeletedTriggered => "project.deleted_triggered".to_string(),
            Self::ProjectViewed => "project.viewed".to_string(),
            Self::ProjectBookmarked => "project.bookmarked".to_string(),
            Self::ProjectUnbookmarked => "project.unbookmarked".to_string(),
            Self::StoppedTriggered(kind) => format!("{}.stopped_triggered", kind.content_type()),
        }
    }
}

impl Display for AuditEventType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name())
    }
}

/// Addressed object of an audit event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditTarget {
    pub content_type: &'static str,
    pub id: String,
}

impl AuditTarget {
    pub fn new(content_type: &'static str, id: impl ToString) -> Self {
        Self {
            content_type,
            id: id.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActorContext {
    pub user_id: UserId,
    pub username: String,
}

impl From<&Actor> for ActorContext {
    fn from(actor: &Actor) -> Self {
        Self {
            user_id: actor.user_id,
            username: actor.username.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEvent {
    pub event_type: AuditEventType,
    pub target: AuditTarget,
    pub actor: Option<ActorContext>,
    /// Epoch milliseconds at record time.
    pub occurred_at: i64,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType, target: AuditTarget, actor: Option<&Actor>) -> Self {
        Self {
            event_type,
            target,
            actor: actor.map(ActorContext::from),
            occurred_at: now_epoch_ms(),
        }
    }

    pub fn is_actor_triggered(&self) -> bool {
        self.actor.is_some()
    }
}

/// Which events a subscriber receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberScope {
    /// Every recorded event (tracker).
    All,
    /// Only events carrying an actor (activity log).
    ActorTriggered,
}

impl SubscriberScope {
    pub fn accepts(self, event: &AuditEvent) -> bool {
        match self {
            Self::All => true,
            Self::ActorTriggered => event.is_actor_triggered(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditError {
    DuplicateSubscriber(String),
    Delivery { subscriber: String, reason: String },
}

impl Display for AuditError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateSubscriber(name) => {
                write!(f, "audit subscriber already registered: {name}")
            }
            Self::Delivery { subscriber, reason } => {
                write!(f, "audit subscriber `{subscriber}` failed: {reason}")
            }
        }
    }
}

impl Error for AuditError {}

pub trait EventSubscriber: Send + Sync {
    fn name(&self) -> &str;
    fn scope(&self) -> SubscriberScope;
    fn deliver(&self, event: &AuditEvent) -> Result<(), AuditError>;
}

/// Registry of subscribers; records events by fanning them out.
#[derive(Default)]
pub struct Auditor {
    subscribers: Vec<Arc<dyn EventSubscriber>>,
}

impl Auditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, subscriber: Arc<dyn EventSubscriber>) -> Result<(), AuditError> {
        let name = subscriber.name().trim().to_string();
        if self
            .subscribers
            .iter()
            .any(|current| current.name().trim() == name)
        {
            return Err(AuditError::DuplicateSubscriber(name));
        }
        self.subscribers.push(subscriber);
        Ok(())
    }

    pub fn subscriber_names(&self) -> Vec<String> {
        self.subscribers
            .iter()
            .map(|subscriber| subscriber.name().to_string())
            .collect()
    }

    /// Delivers `event` to every accepting subscriber.
    ///
    /// Returns how many subscribers received it successfully.
    pub fn record(&self, event: AuditEvent) -> usize {
        let mut delivered = 0;
        for subscriber in &self.subscribers {
            if !subscriber.scope().accepts(&event) {
                continue;
            }
            match subscriber.deliver(&event) {
                Ok(()) => delivered += 1,
                Err(err) => warn!(
                    "event=audit_record module=auditor status=error type={} subscriber={} error={}",
                    event.event_type,
                    subscriber.name(),
                    err
                ),
            }
        }
        debug!(
            "event=audit_record module=auditor status=ok type={} delivered={}",
            event.event_type, delivered
        );
        delivered
    }
}

/// Subscriber forwarding events onto an in-process channel.
pub struct ChannelSubscriber {
    name: String,
    scope: SubscriberScope,
    tx: Sender<AuditEvent>,
}

impl ChannelSubscriber {
    pub fn new(name: impl Into<String>, scope: SubscriberScope, tx: Sender<AuditEvent>) -> Self {
        Self {
            name: name.into(),
            scope,
            tx,
        }
    }
}

impl EventSubscriber for ChannelSubscriber {
    fn name(&self) -> &str {
        &self.name
    }

    fn scope(&self) -> SubscriberScope {
        self.scope
    }

    fn deliver(&self, event: &AuditEvent) -> Result<(), AuditError> {
        self.tx
            .send(event.clone())
            .map_err(|_| AuditError::Delivery {
                subscriber: self.name.clone(),
                reason: "receiver disconnected".to_string(),
            })
    }
}

/// Subscriber writing one metadata-only log line per event.
pub struct LogSubscriber;

impl EventSubscriber for LogSubscriber {
    fn name(&self) -> &str {
        "log"
    }

    fn scope(&self) -> SubscriberScope {
        SubscriberScope::All
    }

    fn deliver(&self, event: &AuditEvent) -> Result<(), AuditError> {
        info!(
            "event=audit module=auditor status=ok type={} target_type={} \
             target_id={} actor_triggered={}",
            event.event_type,
            event.target.content_type,
            event.target.id,
            event.is_actor_triggered()
        );
        Ok(())
    }
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::{
        AuditError, AuditEvent, AuditEventType, AuditTarget, Auditor, ChannelSubscriber,
        LogSubscriber, SubscriberScope,
    };
    use crate::model::account::Actor;
    use crate::model::ids::UserId;
    use crate::model::lifecycle::DependentKind;
    use std::sync::mpsc::channel;
    use std::sync::Arc;

    fn actor() -> Actor {
        Actor {
            user_id: UserId::new(),
            username: "alice".to_string(),
        }
    }

    #[test]
    fn event_names_are_dotted() {
        assert_eq!(AuditEventType::ProjectViewed.name(), "project.viewed");
        assert_eq!(
            AuditEventType::StoppedTriggered(DependentKind::BuildJob).name(),
            "buildjob.stopped_triggered"
        );
        assert_eq!(AuditEventType::ProjectBookmarked.name(), "project.bookmarked");
        assert_eq!(AuditEventType::ProjectUnbookmarked.name(), "project.unbookmarked");
    }

    #[test]
    fn actor_triggered_events_reach_both_scopes() {
        let (tracker_tx, tracker_rx) = channel();
        let (activity_tx, activity_rx) = channel();
        let mut auditor = Auditor::new();
        auditor
            .register(Arc::new(ChannelSubscriber::new(
                "tracker",
                SubscriberScope::All,
                tracker_tx,
            )))
            .unwrap();
        auditor
            .register(Arc::new(ChannelSubscriber::new(
                "activitylogs",
                SubscriberScope::ActorTriggered,
                activity_tx,
            )))
            .unwrap();

        let actor = actor();
        let delivered = auditor.record(AuditEvent::new(
            AuditEventType::ProjectDeletedTriggered,
            AuditTarget::new("project", "p1"),
            Some(&actor),
        ));
        assert_eq!(delivered, 2);
        assert_eq!(tracker_rx.try_iter().count(), 1);
        assert_eq!(activity_rx.try_iter().count(), 1);

        let delivered = auditor.record(AuditEvent::new(
            AuditEventType::ProjectDeleted,
            AuditTarget::new("project", "p1"),
            None,
        ));
        assert_eq!(delivered, 1);
        assert_eq!(tracker_rx.try_iter().count(), 1);
        assert_eq!(activity_rx.try_iter().count(), 0);
    }

    #[test]
    fn failing_subscriber_does_not_block_others() {
        let (dead_tx, dead_rx) = channel();
        drop(dead_rx);
        let (live_tx, live_rx) = channel();
        let mut auditor = Auditor::new();
        auditor
            .register(Arc::new(ChannelSubscriber::new(
                "dead",
                SubscriberScope::All,
                dead_tx,
            )))
            .unwrap();
        auditor
            .register(Arc::new(ChannelSubscriber::new(
                "live",
                SubscriberScope::All,
                live_tx,
            )))
            .unwrap();
        auditor.register(Arc::new(LogSubscriber)).unwrap();

        let delivered = auditor.record(AuditEvent::new(
            AuditEventType::ProjectCreated,
            AuditTarget::new("project", "p2"),
            None,
        ));
        assert_eq!(delivered, 2);
        assert_eq!(live_rx.try_iter().count(), 1);
    }

    #[test]
    fn duplicate_subscriber_names_are_rejected() {
        let mut auditor = Auditor::new();
        auditor.register(Arc::new(LogSubscriber)).unwrap();
        let err = auditor.register(Arc::new(LogSubscriber)).unwrap_err();
        assert_eq!(err, AuditError::DuplicateSubscriber("log".to_string()));
        assert_eq!(auditor.subscriber_names(), vec!["log".to_string()]);
    }

    #[test]
    fn names_differing_only_in_padding_are_duplicates() {
        let (first_tx, _first_rx) = channel();
        let (second_tx, _second_rx) = channel();
        let (third_tx, _third_rx) = channel();
        let mut auditor = Auditor::new();
        auditor
            .register(Arc::new(ChannelSubscriber::new(
                " tracker",
                SubscriberScope::All,
                first_tx,
            )))
            .unwrap();

        for (name, tx) in [("tracker", second_tx), ("tracker  ", third_tx)] {
            let err = auditor
                .register(Arc::new(ChannelSubscriber::new(name, SubscriberScope::All, tx)))
                .unwrap_err();
            assert_eq!(err, AuditError::DuplicateSubscriber("tracker".to_string()));
        }
        assert_eq!(auditor.subscriber_names().len(), 1);
    }
}
