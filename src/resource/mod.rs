//! Resource lifecycle state machine and backend contract (spec.md §5).
//!
//! Grounded on `examples/original_source/dana/core/resource/resource_type.py`
//! / `resource_instance.py`: a resource starts `CREATED`, moves through
//! `INITIALIZED`/`RUNNING` as `start()` runs, and `STOPPED`/`TERMINATED` as
//! `stop()`/cleanup run. `start()`/`stop()` delegate to a struct-defined
//! method when the resource type declares one, and are a no-op success
//! otherwise.

use std::fmt::{self, Display};

use crate::error::{DanaError, DanaException, Location};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    Created,
    Initialized,
    Running,
    Stopped,
    Terminated,
}

impl ResourceState {
    /// Legal forward/backward transitions (spec.md §4.8). `Terminated` is
    /// absorbing except for `cleanup()`'s own idempotence; `Created ->
    /// Running` is `start()` doing an implicit `initialize()` first.
    pub fn can_transition_to(&self, next: ResourceState) -> bool {
        use ResourceState::*;
        matches!(
            (self, next),
            (Created, Initialized)
                | (Initialized, Running)
                | (Created, Running)
                | (Running, Stopped)
                | (Stopped, Running)
                | (Stopped, Terminated)
                | (Created, Terminated)
                | (Initialized, Terminated)
                | (Running, Terminated)
                | (Terminated, Terminated)
        )
    }

    pub fn transition(&mut self, next: ResourceState) -> Result<(), DanaError> {
        if !self.can_transition_to(next) {
            return Err(DanaError::Exception(DanaException::resource(
                format!("cannot transition resource from {self} to {next}"),
                Location::unknown(),
            )));
        }
        *self = next;
        Ok(())
    }
}

impl Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceState::Created => "CREATED",
            ResourceState::Initialized => "INITIALIZED",
            ResourceState::Running => "RUNNING",
            ResourceState::Stopped => "STOPPED",
            ResourceState::Terminated => "TERMINATED",
        };
        write!(f, "{s}")
    }
}

/// A chat/completion/embedding message exchanged with an LLM-backed
/// resource (spec.md §6 "LLM resource contract").
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Usage/latency counters an LLM resource exposes via `get_stats`
/// (spec.md §6).
#[derive(Debug, Clone, Default)]
pub struct ResourceStats {
    pub request_count: u64,
    pub total_tokens: u64,
    pub total_latency_ms: u64,
}

/// The pluggable behavior behind a `resource` instance. Real backends
/// (HTTP clients to an LLM provider, DB handles, ...) are an external
/// collaborator per spec.md §1; this crate ships only `MockLlmBackend`,
/// the deterministic stand-in `DANA_MOCK_LLM=1` selects (spec.md §6).
pub trait ResourceBackend: Send + Sync {
    fn initialize(&mut self) -> Result<(), DanaError> {
        Ok(())
    }

    fn cleanup(&mut self) -> Result<(), DanaError> {
        Ok(())
    }

    fn query(&self, request: &str) -> Result<String, DanaError>;

    fn chat(&self, messages: &[ChatMessage]) -> Result<String, DanaError> {
        self.query(&messages.iter().map(|m| m.content.clone()).collect::<Vec<_>>().join("\n"))
    }

    fn complete(&self, prompt: &str) -> Result<String, DanaError> {
        self.query(prompt)
    }

    fn embed(&self, _text: &str) -> Result<Vec<f32>, DanaError> {
        Err(DanaError::Exception(DanaException::resource(
            "this backend does not support embeddings",
            Location::unknown(),
        )))
    }

    fn stats(&self) -> ResourceStats {
        ResourceStats::default()
    }
}

/// Deterministic backend used when `DANA_MOCK_LLM` is set (spec.md §6),
/// so programs that call `reason()` can run in CI without a live
/// provider. Echoes the request back verbatim behind a `FINAL_ANSWER:`
/// marker, so a caller that wants a specific reply (a bare word for a
/// smart-boolean test, a JSON object for a struct-coercion test) gets it
/// back by putting it straight in the prompt.
#[derive(Debug, Default)]
pub struct MockLlmBackend {
    stats: std::sync::Mutex<ResourceStats>,
}

impl ResourceBackend for MockLlmBackend {
    fn query(&self, request: &str) -> Result<String, DanaError> {
        let mut stats = self.stats.lock().unwrap();
        stats.request_count += 1;
        stats.total_tokens += request.len() as u64;
        Ok(format!("FINAL_ANSWER: {request}"))
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, DanaError> {
        Ok(text.bytes().map(|b| b as f32 / 255.0).collect())
    }

    fn stats(&self) -> ResourceStats {
        self.stats.lock().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legal_transitions_follow_the_lifecycle() {
        let mut s = ResourceState::Created;
        assert!(s.transition(ResourceState::Initialized).is_ok());
        assert!(s.transition(ResourceState::Running).is_ok());
        assert!(s.transition(ResourceState::Stopped).is_ok());
        assert!(s.transition(ResourceState::Running).is_ok());
        assert!(s.transition(ResourceState::Terminated).is_ok());
    }

    #[test]
    fn terminated_is_absorbing() {
        let mut s = ResourceState::Terminated;
        assert!(s.transition(ResourceState::Running).is_err());
    }

    #[test]
    fn mock_backend_echoes_with_final_answer_marker() {
        let backend = MockLlmBackend::default();
        let reply = backend.query("hello").unwrap();
        assert_eq!(reply, "FINAL_ANSWER: hello");
        assert_eq!(backend.stats().request_count, 1);
    }
}
