//! Built-in agent methods (`plan`/`solve`/`remember`/`recall`/`reason`/
//! `chat`) and resource lifecycle methods (`initialize`/`start`/`stop`/
//! `cleanup`/`chat`/`complete`/`embed`/`get_stats`) — spec.md §3/§5/§6.
//!
//! These aren't registered in `MethodRegistry` since they need direct
//! access to instance state (`private_memory`, `ResourceState`) a plain
//! `FunctionValue` closure can't reach; they're dispatched here after a
//! user-registered method lookup misses.

use std::sync::Arc;

use crate::error::{DanaError, DanaException, DanaResult, Location};
use crate::resource::{ChatMessage, MockLlmBackend, ResourceBackend, ResourceState};
use crate::types::Value;

use super::Interpreter;

pub(super) fn agent_builtin(
    interp: &mut Interpreter,
    receiver: Value,
    method: &str,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
    location: &Location,
) -> DanaResult<Value> {
    let Value::Agent(agent) = &receiver else {
        return Err(DanaError::Exception(DanaException::type_error("expected an agent receiver", location.clone())));
    };

    match method {
        "remember" => {
            let (key, value) = two_args(&args, "remember", location)?;
            let key = expect_str(&key, "remember", location)?;
            agent.write().private_memory.insert(key, value);
            Ok(Value::None)
        }
        "recall" => {
            let key = one_arg(&args, "recall", location)?;
            let key = expect_str(&key, "recall", location)?;
            Ok(agent.read().private_memory.get(&key).cloned().unwrap_or(Value::None))
        }
        "chat" => {
            let message = one_arg(&args, "chat", location)?;
            let message = expect_str(&message, "chat", location)?;
            let llm_resource = agent.read().llm_resource.clone().or_else(|| interp.ctx().system_llm_resource.clone());
            let reply = run_llm(interp, &message, llm_resource)?;
            let mut guard = agent.write();
            guard.conversation_memory_mut().push(("user".to_string(), message));
            guard.conversation_memory_mut().push(("assistant".to_string(), reply.clone()));
            Ok(Value::Str(reply))
        }
        "reason" => reason_as(interp, agent, &args, &kwargs),
        "plan" => {
            let goal = one_arg(&args, "plan", location)?;
            let goal = expect_str(&goal, "plan", location)?;
            let prompt = format!("Create a step-by-step plan to achieve: {goal}");
            reason_as(interp, agent, &[Value::Str(prompt)], &[])
        }
        "solve" => {
            let problem = one_arg(&args, "solve", location)?;
            let problem = expect_str(&problem, "solve", location)?;
            let prompt = format!("Solve the following problem: {problem}");
            reason_as(interp, agent, &[Value::Str(prompt)], &[])
        }
        other => Err(DanaError::Exception(DanaException::type_error(format!("agent has no built-in method '{other}'"), location.clone()))),
    }
}

pub(super) fn resource_builtin(
    interp: &mut Interpreter,
    receiver: Value,
    method: &str,
    args: Vec<Value>,
    _kwargs: Vec<(String, Value)>,
    location: &Location,
) -> DanaResult<Value> {
    let Value::Resource(resource) = &receiver else {
        return Err(DanaError::Exception(DanaException::type_error("expected a resource receiver", location.clone())));
    };

    match method {
        "initialize" => {
            let mut guard = resource.write();
            guard.state.transition(ResourceState::Initialized)?;
            sync_state_field(&mut guard);
            if guard.backend.is_none() {
                guard.backend = Some(Arc::new(MockLlmBackend::default()));
            }
            Ok(Value::None)
        }
        "start" => {
            let mut guard = resource.write();
            guard.state.transition(ResourceState::Running)?;
            sync_state_field(&mut guard);
            Ok(Value::None)
        }
        "stop" => {
            let mut guard = resource.write();
            guard.state.transition(ResourceState::Stopped)?;
            sync_state_field(&mut guard);
            Ok(Value::None)
        }
        "cleanup" => {
            let mut guard = resource.write();
            guard.state.transition(ResourceState::Terminated)?;
            sync_state_field(&mut guard);
            Ok(Value::None)
        }
        "chat" | "complete" => {
            let text = one_arg(&args, method, location)?;
            let text = expect_str(&text, method, location)?;
            let backend = backend_of(resource, location)?;
            let result = if method == "chat" {
                backend.chat(&[ChatMessage { role: "user".into(), content: text }])
            } else {
                backend.complete(&text)
            };
            result.map(Value::Str).map_err(|e| resource_error(interp, e))
        }
        "embed" => {
            let text = one_arg(&args, "embed", location)?;
            let text = expect_str(&text, "embed", location)?;
            let backend = backend_of(resource, location)?;
            backend
                .embed(&text)
                .map(|v| Value::list(v.into_iter().map(|f| Value::Float(f as f64)).collect()))
                .map_err(|e| resource_error(interp, e))
        }
        "get_stats" => {
            let backend = backend_of(resource, location)?;
            let stats = backend.stats();
            let mut map = std::collections::HashMap::new();
            map.insert("request_count".to_string(), Value::Int(stats.request_count as i64));
            map.insert("total_tokens".to_string(), Value::Int(stats.total_tokens as i64));
            map.insert("total_latency_ms".to_string(), Value::Int(stats.total_latency_ms as i64));
            Ok(Value::dict(map))
        }
        other => Err(DanaError::Exception(DanaException::type_error(format!("resource has no method '{other}'"), location.clone()))),
    }
}

/// Runs `core_reason` with `agent`'s own `llm_resource` in effect, falling
/// back to the sandbox's system resource when the agent hasn't been given
/// one of its own (spec.md §3 "lazy LLM resource ref").
fn reason_as(
    interp: &mut Interpreter,
    agent: &Arc<parking_lot::RwLock<crate::types::instance::AgentInstance>>,
    args: &[Value],
    kwargs: &[(String, Value)],
) -> DanaResult<Value> {
    let own_resource = agent.read().llm_resource.clone();
    match own_resource {
        None => crate::function::core_builtins::core_reason(interp, args, kwargs),
        Some(resource) => {
            let previous = interp.ctx_mut().system_llm_resource.replace(resource);
            let result = crate::function::core_builtins::core_reason(interp, args, kwargs);
            interp.ctx_mut().system_llm_resource = previous;
            result
        }
    }
}

/// Mirrors the lifecycle state into the instance's own `state` struct
/// field, so `r.state` (ordinary field access) reads the same value
/// `ResourceInstance.state` tracks instead of the `CREATED` default
/// `ResourceType::new` seeds it with.
fn sync_state_field(guard: &mut crate::types::instance::ResourceInstance) {
    let state = guard.state.to_string();
    guard.base.set("state", Value::Str(state));
}

fn backend_of(resource: &Arc<parking_lot::RwLock<crate::types::instance::ResourceInstance>>, location: &Location) -> DanaResult<Arc<dyn ResourceBackend>> {
    resource
        .read()
        .backend
        .clone()
        .ok_or_else(|| DanaError::Exception(DanaException::resource("resource has no backend attached; call initialize() first", location.clone())))
}

fn resource_error(_interp: &mut Interpreter, e: DanaError) -> DanaError {
    match e {
        DanaError::Exception(ex) => DanaError::Exception(ex),
        DanaError::Fatal(f) => DanaError::Exception(DanaException::resource(f.message, Location::unknown())),
    }
}

fn run_llm(interp: &mut Interpreter, message: &str, llm_resource: Option<Value>) -> DanaResult<String> {
    if interp.config().mock_llm || llm_resource.is_none() {
        let backend = MockLlmBackend::default();
        return backend.query(message).map_err(|e| resource_error(interp, e));
    }
    let Some(Value::Resource(r)) = llm_resource else {
        return Err(DanaError::Exception(DanaException::type_error("agent's llm_resource is not a resource instance", Location::unknown())));
    };
    let backend = r
        .read()
        .backend
        .clone()
        .ok_or_else(|| DanaError::Exception(DanaException::resource("agent's llm_resource has no backend attached", Location::unknown())))?;
    backend
        .chat(&[ChatMessage { role: "user".into(), content: message.to_string() }])
        .map_err(|e| resource_error(interp, e))
}

fn one_arg(args: &[Value], method: &str, location: &Location) -> DanaResult<Value> {
    args.first().cloned().ok_or_else(|| DanaError::Exception(DanaException::type_error(format!("{method}() expects 1 argument"), location.clone())))
}

fn two_args(args: &[Value], method: &str, location: &Location) -> DanaResult<(Value, Value)> {
    if args.len() < 2 {
        return Err(DanaError::Exception(DanaException::type_error(format!("{method}() expects 2 arguments"), location.clone())));
    }
    Ok((args[0].clone(), args[1].clone()))
}

fn expect_str(value: &Value, method: &str, location: &Location) -> DanaResult<String> {
    match value {
        Value::Str(s) => Ok(s.clone()),
        other => Err(DanaError::Exception(DanaException::type_error(
            format!("{method}() expects a str argument, got {}", other.type_name()),
            location.clone(),
        ))),
    }
}
