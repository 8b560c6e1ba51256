//! Live agent/resource instance tracking (spec.md §4.10), grounded on
//! `examples/original_source/dana/registry/instance_registry.py`.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use parking_lot::RwLock;

use crate::types::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceCategory {
    Agent,
    Resource,
}

#[derive(Debug, Clone)]
pub struct InstanceRecord {
    pub id: u64,
    pub type_name: String,
    pub category: InstanceCategory,
    /// Seconds since epoch. The Python original stamps `datetime.utcnow()`;
    /// this keeps the same "when was it created" field without pulling in
    /// a calendar/timezone dependency the rest of the stack doesn't need.
    pub created_at: u64,
    pub owner: Option<String>,
    pub state: String,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct InstanceRegistryStatistics {
    pub agent_count: usize,
    pub resource_count: usize,
    pub registered_total: u64,
    pub unregistered_total: u64,
}

/// Tracks live agent/resource instances with timestamps, owners, and
/// states, and emits registered/unregistered events to any subscriber
/// (spec.md §4.10). Subscribers are plain closures rather than a channel,
/// since this registry lives inside a single process.
#[derive(Debug, Default)]
pub struct InstanceRegistry {
    records: DashMap<u64, InstanceRecord>,
    next_id: std::sync::atomic::AtomicU64,
    registered_total: std::sync::atomic::AtomicU64,
    unregistered_total: std::sync::atomic::AtomicU64,
    listeners: RwLock<Vec<Arc<dyn Fn(&InstanceRecord, bool) + Send + Sync>>>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_event(&self, listener: Arc<dyn Fn(&InstanceRecord, bool) + Send + Sync>) {
        self.listeners.write().push(listener);
    }

    /// Registers a new instance, returning the id assigned to it.
    /// `_value` is accepted (not stored) to keep the call site symmetric
    /// with construction, though only metadata is tracked here.
    pub fn register(&self, type_name: impl Into<String>, category: InstanceCategory, owner: Option<String>, _value: &Value) -> u64 {
        let id = self.next_id.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let created_at = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
        let record = InstanceRecord { id, type_name: type_name.into(), category, created_at, owner, state: "CREATED".into() };
        self.records.insert(id, record.clone());
        self.registered_total.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        for listener in self.listeners.read().iter() {
            listener(&record, true);
        }
        id
    }

    pub fn update_state(&self, id: u64, state: impl Into<String>) {
        if let Some(mut entry) = self.records.get_mut(&id) {
            entry.state = state.into();
        }
    }

    pub fn unregister(&self, id: u64) {
        if let Some((_, record)) = self.records.remove(&id) {
            self.unregistered_total.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            for listener in self.listeners.read().iter() {
                listener(&record, false);
            }
        }
    }

    pub fn get(&self, id: u64) -> Option<InstanceRecord> {
        self.records.get(&id).map(|e| e.value().clone())
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&self) {
        self.records.clear();
    }

    pub fn get_statistics(&self) -> InstanceRegistryStatistics {
        let mut stats = InstanceRegistryStatistics {
            registered_total: self.registered_total.load(std::sync::atomic::Ordering::SeqCst),
            unregistered_total: self.unregistered_total.load(std::sync::atomic::Ordering::SeqCst),
            ..Default::default()
        };
        for entry in self.records.iter() {
            match entry.category {
                InstanceCategory::Agent => stats.agent_count += 1,
                InstanceCategory::Resource => stats.resource_count += 1,
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_registration_and_unregistration_counts() {
        let registry = InstanceRegistry::new();
        let id = registry.register("Greeter", InstanceCategory::Agent, None, &Value::None);
        assert_eq!(registry.count(), 1);
        let stats = registry.get_statistics();
        assert_eq!(stats.agent_count, 1);
        assert_eq!(stats.registered_total, 1);

        registry.unregister(id);
        assert!(registry.is_empty());
        assert_eq!(registry.get_statistics().unregistered_total, 1);
    }
}
