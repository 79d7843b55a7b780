use std::fmt;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Created,
    Modified,
    Removed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditQualifier {
    /// Content obtained from a remote repository.
    Proxied,
    /// A checksum side-file regenerated locally.
    Repaired,
}

/// One change to a file under a managed repository root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEvent {
    pub repository: String,
    /// Path relative to the repository root.
    pub resource:   String,
    pub action:     AuditAction,
    pub qualifier:  Option<AuditQualifier>,
    pub timestamp:  DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(repository: impl Into<String>, resource: impl Into<String>, action: AuditAction) -> Self {
        Self {
            repository: repository.into(),
            resource: resource.into(),
            action,
            qualifier: None,
            timestamp: Utc::now(),
        }
    }

    pub fn qualified(mut self, qualifier: AuditQualifier) -> Self {
        self.qualifier = Some(qualifier);
        self
    }
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = match self.action {
            AuditAction::Created => "created",
            AuditAction::Modified => "modified",
            AuditAction::Removed => "removed",
        };
        write!(f, "{}:{} {action}", self.repository, self.resource)?;
        match self.qualifier {
            Some(AuditQualifier::Proxied) => write!(f, " (proxied)"),
            Some(AuditQualifier::Repaired) => write!(f, " (repaired)"),
            None => Ok(()),
        }
    }
}

/// Receives one event per file written under a managed repository.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

/// Writes audit events to the `depot::audit` tracing target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) {
        tracing::info!(
            target: "depot::audit",
            repository = %event.repository,
            resource = %event.resource,
            "{event}"
        );
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self { Self::default() }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: AuditEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
