//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use storefront::prelude::*;
use storefront::transaction::EventSubscriber;

// =============================================================================
// Widget aggregate
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Renamed {
    pub from: String,
    pub to: String,
}

impl DomainEvent for Renamed {
    fn name(&self) -> &'static str {
        "widget.renamed"
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restocked {
    pub quantity: u32,
}

impl DomainEvent for Restocked {
    fn name(&self) -> &'static str {
        "widget.restocked"
    }
}

#[derive(Debug, Clone, Default)]
pub struct Widget {
    pub id: u32,
    pub name: String,
    pub stock: u32,
    pub audit: AuditInfo,
    pub events: DomainEvents,
}

impl Widget {
    pub fn new(id: u32, name: &str) -> Self {
        Self {
            id,
            name: name.to_owned(),
            ..Self::default()
        }
    }

    pub fn rename(mut self, name: &str) -> Fin<Self> {
        if name.trim().is_empty() {
            return Err(ErrorInfo::validation("Widget name is required."));
        }
        self.events.raise(Renamed {
            from: self.name.clone(),
            to: name.to_owned(),
        });
        name.clone_into(&mut self.name);
        Ok(self)
    }

    pub fn restock(mut self, quantity: u32) -> Fin<Self> {
        if quantity == 0 {
            return Err(ErrorInfo::invalid_operation("Restock quantity must be positive."));
        }
        self.stock += quantity;
        self.events.raise(Restocked { quantity });
        Ok(self)
    }
}

impl Entity for Widget {
    type Id = u32;
    const NAME: &'static str = "Widget";

    fn id(&self) -> u32 {
        self.id
    }

    fn audit_mut(&mut self) -> Option<&mut AuditInfo> {
        Some(&mut self.audit)
    }

    fn events_mut(&mut self) -> Option<&mut DomainEvents> {
        Some(&mut self.events)
    }
}

pub fn widget_not_found() -> ErrorInfo {
    ErrorInfo::not_found("Widget was not found.")
}

pub fn seeded_store(count: u32) -> MemoryStore {
    let store = MemoryStore::new();
    store.seed((1..=count).map(|id| Widget::new(id, &format!("widget-{id}"))));
    store
}

// =============================================================================
// Event log subscriber
// =============================================================================

#[derive(Clone, Default)]
pub struct EventLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl EventLog {
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }
}

impl EventSubscriber for EventLog {
    fn handle(&self, record: &EventRecord) -> Effect<Fin<()>> {
        let entries = Arc::clone(&self.entries);
        let line = match record.downcast_ref::<Renamed>() {
            Some(renamed) => format!("{}:{}->{}", record.name(), renamed.from, renamed.to),
            None => record.name().to_owned(),
        };
        Effect::lift_sync(move || {
            entries.lock().push(line);
            Ok(())
        })
    }
}

pub fn runner_with_log() -> (TransactionRunner, EventLog) {
    let log = EventLog::default();
    let runner = TransactionRunner::new(PipelineConfig::default()).with_subscriber(log.clone());
    (runner, log)
}
