//! Call-expression evaluation: resolving a callee to a function or a
//! struct/agent/resource constructor, binding arguments, and running a
//! `DanaFunction` body in a fresh local frame (spec.md §4.4 "Call").

use std::collections::HashMap;
use std::sync::Arc;

use crate::coercion::{self};
use crate::error::{DanaError, DanaException, DanaResult, Location};
use crate::function::{DanaFunction, FunctionValue};
use crate::parser::ast::{Expression, FunctionCall};
use crate::types::{AgentInstance, FieldDescriptor, ResourceInstance, StructInstance, TypeDescriptor, Value};

use super::Interpreter;

/// Caps recursive `DanaFunction` calls so a runaway recursive program
/// unwinds as a catchable `StateError` instead of blowing the native stack.
const MAX_CALL_DEPTH: usize = 512;

pub(super) fn eval_call(interp: &mut Interpreter, call: &FunctionCall) -> DanaResult<Value> {
    if let Expression::FieldAccess(fa) = call.callee.as_ref() {
        let receiver = interp.eval_and_force(&fa.object)?;
        let args = eval_args(interp, &call.args)?;
        let kwargs = eval_kwargs(interp, &call.kwargs)?;
        return eval_method_call(interp, receiver, &fa.field, args, kwargs, &call.location);
    }

    if let Expression::Identifier(id) = call.callee.as_ref() {
        let name = &id.scoped_name.name;
        if id.scoped_name.scope.is_none() && interp.ctx().get(&id.scoped_name).is_none() {
            if let Some(t) = interp.ctx().registries.structs.get(name) {
                let args = eval_args(interp, &call.args)?;
                let kwargs = eval_kwargs(interp, &call.kwargs)?;
                return construct_struct(interp, &t, args, &kwargs, &call.location);
            }
            if let Some(t) = interp.ctx().registries.agents.get(name) {
                let args = eval_args(interp, &call.args)?;
                let kwargs = eval_kwargs(interp, &call.kwargs)?;
                return construct_agent(interp, &t, args, &kwargs, &call.location);
            }
            if let Some(t) = interp.ctx().registries.resources.get(name) {
                let args = eval_args(interp, &call.args)?;
                let kwargs = eval_kwargs(interp, &call.kwargs)?;
                return construct_resource(interp, &t, args, &kwargs, &call.location);
            }
        }
    }

    let callee_value = match call.callee.as_ref() {
        Expression::Identifier(id) => match interp.ctx().get(&id.scoped_name) {
            Some(v) => v,
            None => Value::Function(
                interp
                    .ctx()
                    .registries
                    .functions
                    .resolve(&id.scoped_name.name)
                    .ok_or_else(|| interp.ctx().name_error(&id.scoped_name, id.location.clone()))?,
            ),
        },
        other => interp.eval_and_force(other)?,
    };
    let args = eval_args(interp, &call.args)?;
    let kwargs = eval_kwargs(interp, &call.kwargs)?;
    interp.call_value(callee_value, args, kwargs, &call.location)
}

fn eval_args(interp: &mut Interpreter, args: &[Expression]) -> DanaResult<Vec<Value>> {
    let mut out = Vec::with_capacity(args.len());
    for a in args {
        out.push(interp.eval_and_force(a)?);
    }
    Ok(out)
}

fn eval_kwargs(interp: &mut Interpreter, kwargs: &[(String, Expression)]) -> DanaResult<Vec<(String, Value)>> {
    let mut out = Vec::with_capacity(kwargs.len());
    for (k, v) in kwargs {
        out.push((k.clone(), interp.eval_and_force(v)?));
    }
    Ok(out)
}

fn eval_method_call(
    interp: &mut Interpreter,
    receiver: Value,
    method: &str,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
    location: &Location,
) -> DanaResult<Value> {
    if let Some(closure) = plain_field(&receiver, method) {
        if let Value::Function(f) = closure {
            return interp.invoke(f, args, kwargs, location);
        }
    }

    let type_name = match &receiver {
        Value::Struct(s) => Some(s.read().type_name.clone()),
        Value::Agent(a) => Some(a.read().base.type_name.clone()),
        Value::Resource(r) => Some(r.read().base.type_name.clone()),
        _ => None,
    };
    if let Some(type_name) = &type_name {
        if let Some(f) = interp.ctx().registries.methods.resolve(type_name, method) {
            let mut full_args = Vec::with_capacity(args.len() + 1);
            full_args.push(receiver);
            full_args.extend(args);
            return interp.invoke(f, full_args, kwargs, location);
        }
    }

    match &receiver {
        Value::Agent(_) if crate::types::AGENT_BUILTIN_METHODS.contains(&method) => {
            super::methods::agent_builtin(interp, receiver, method, args, kwargs, location)
        }
        Value::Resource(_) => super::methods::resource_builtin(interp, receiver, method, args, kwargs, location),
        other => Err(DanaError::Exception(DanaException::type_error(
            format!("'{}' has no method '{method}'", other.type_name()),
            location.clone(),
        ))),
    }
}

fn plain_field(receiver: &Value, field: &str) -> Option<Value> {
    match receiver {
        Value::Struct(s) => s.read().get(field).cloned(),
        Value::Agent(a) => a.read().base.get(field).cloned(),
        Value::Resource(r) => r.read().base.get(field).cloned(),
        Value::Dict(map) => map.read().get(field).cloned(),
        _ => None,
    }
}

fn bind_fields(
    interp: &mut Interpreter,
    fields: &[FieldDescriptor],
    args: Vec<Value>,
    kwargs: &[(String, Value)],
    location: &Location,
) -> DanaResult<HashMap<String, Value>> {
    let mut out = HashMap::with_capacity(fields.len());
    let mut positional = args.into_iter();
    for field in fields {
        let value = if let Some((_, v)) = kwargs.iter().find(|(k, _)| k == &field.name) {
            v.clone()
        } else if let Some(v) = positional.next() {
            v
        } else if let Some(default) = &field.default {
            default.clone()
        } else {
            return Err(DanaError::Exception(DanaException::type_error(
                format!("missing required field '{}'", field.name),
                location.clone(),
            )));
        };
        let coerced = if interp.config().auto_coercion {
            coercion::coerce_value(value, &TypeDescriptor::from_name(&field.type_name), &interp.ctx().registries).map_err(DanaError::Exception)?
        } else {
            value
        };
        out.insert(field.name.clone(), coerced);
    }
    Ok(out)
}

fn construct_struct(interp: &mut Interpreter, t: &crate::types::StructType, args: Vec<Value>, kwargs: &[(String, Value)], location: &Location) -> DanaResult<Value> {
    let fields = bind_fields(interp, &t.fields, args, kwargs, location)?;
    Ok(Value::Struct(Arc::new(parking_lot::RwLock::new(StructInstance::new(t.name.clone(), fields)))))
}

fn construct_agent(interp: &mut Interpreter, t: &crate::types::AgentType, args: Vec<Value>, kwargs: &[(String, Value)], location: &Location) -> DanaResult<Value> {
    let fields = bind_fields(interp, &t.base.fields, args, kwargs, location)?;
    let value = Value::Agent(Arc::new(parking_lot::RwLock::new(AgentInstance::new(t.base.name.clone(), fields))));
    interp.ctx().registries.instances.register(t.base.name.to_string(), crate::registry::InstanceCategory::Agent, None, &value);
    Ok(value)
}

fn construct_resource(interp: &mut Interpreter, t: &crate::types::ResourceType, args: Vec<Value>, kwargs: &[(String, Value)], location: &Location) -> DanaResult<Value> {
    let fields = bind_fields(interp, &t.base.fields, args, kwargs, location)?;
    let value = Value::Resource(Arc::new(parking_lot::RwLock::new(ResourceInstance::new(t.base.name.clone(), fields))));
    interp.ctx().registries.instances.register(t.base.name.to_string(), crate::registry::InstanceCategory::Resource, None, &value);
    Ok(value)
}

impl Interpreter {
    pub(super) fn call_value(&mut self, callee: Value, args: Vec<Value>, kwargs: Vec<(String, Value)>, location: &Location) -> DanaResult<Value> {
        match callee {
            Value::Function(f) => self.invoke(f, args, kwargs, location),
            other => Err(DanaError::Exception(DanaException::type_error(
                format!("{} is not callable", other.type_name()),
                location.clone(),
            ))),
        }
    }

    pub(super) fn invoke(&mut self, f: Arc<FunctionValue>, args: Vec<Value>, kwargs: Vec<(String, Value)>, location: &Location) -> DanaResult<Value> {
        match &*f {
            FunctionValue::Native(native) => (native.callable)(self, &args, &kwargs),
            FunctionValue::Dana(dana_fn) => self.call_dana_function(dana_fn.clone(), args, kwargs, location),
        }
    }

    fn call_dana_function(&mut self, function: DanaFunction, args: Vec<Value>, kwargs: Vec<(String, Value)>, location: &Location) -> DanaResult<Value> {
        if self.call_depth >= MAX_CALL_DEPTH {
            return Err(DanaError::Exception(DanaException::state(
                format!("maximum recursion depth ({MAX_CALL_DEPTH}) exceeded calling '{}'", function.name),
                location.clone(),
            )));
        }

        self.ctx_mut().push_local_frame();
        self.call_depth += 1;
        let result = self.bind_and_run(&function, args, kwargs, location);
        self.call_depth -= 1;
        self.ctx_mut().pop_local_frame();
        result.map_err(|e| match e {
            DanaError::Exception(ex) => DanaError::Exception(ex.push_frame(location.clone())),
            fatal => fatal,
        })
    }

    fn bind_and_run(&mut self, function: &DanaFunction, args: Vec<Value>, kwargs: Vec<(String, Value)>, location: &Location) -> DanaResult<Value> {
        let mut positional = args.into_iter();
        for param in &function.params {
            let value = if let Some((_, v)) = kwargs.iter().find(|(k, _)| k == &param.name) {
                v.clone()
            } else if let Some(v) = positional.next() {
                v
            } else if let Some(default_expr) = &param.default {
                self.eval_and_force(default_expr)?
            } else {
                return Err(DanaError::Exception(DanaException::type_error(
                    format!("'{}' missing required argument '{}'", function.name, param.name),
                    location.clone(),
                )));
            };
            let value = match &param.type_name {
                Some(t) if self.config().auto_coercion => {
                    coercion::coerce_value(value, &TypeDescriptor::from_name(t), &self.ctx().registries).map_err(DanaError::Exception)?
                }
                _ => value,
            };
            self.ctx_mut().assign_with_default(&crate::scope::ScopedName::explicit(crate::scope::Scope::Local, param.name.clone()), value, crate::scope::Scope::Local)?;
        }

        match self.exec_block(&function.body)? {
            super::Flow::Return(v) | super::Flow::Normal(v) => Ok(v),
            super::Flow::Break | super::Flow::Continue => Err(DanaError::Exception(DanaException::state(
                "'break'/'continue' used outside of a loop",
                location.clone(),
            ))),
        }
    }
}
