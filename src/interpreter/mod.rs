//! Tree-walking evaluator (spec.md §4.4).
//!
//! One executor per statement kind, one evaluator per expression kind,
//! dispatching control flow with native Rust loops/`match` rather than a
//! bytecode VM — the same "just walk the AST" shape as the teacher's
//! original (now-retired) interpreter, generalized from Y's handful of
//! node kinds to DANA's full statement/expression set.

mod builtins;
mod call;
mod methods;

use std::collections::HashMap;
use std::sync::Arc;

use crate::coercion::{self, CoercionStrategy};
use crate::context::{RuntimeConfig, SandboxContext};
use crate::error::{DanaError, DanaException, DanaResult, ErrorKind, Location};
use crate::function::{DanaFunction, FunctionValue, Namespace};
use crate::parser::ast::*;
use crate::scope::{Scope, ScopedName};
use crate::types::{TypeDescriptor, Value};

/// What a statement/block produced, used to thread `return`/`break`/
/// `continue` up through nested blocks without unwinding via Rust panics
/// (spec.md §4.4 "Each statement executor returns either a value ... or
/// None").
enum Flow {
    Normal(Value),
    Return(Value),
    Break,
    Continue,
}

/// The tree-walking evaluator. Owns the `SandboxContext` it runs against;
/// `run_source`/the CLI hand it one and get it back via `into_ctx` once
/// the program finishes, so the caller can inspect bound variables
/// afterward (spec.md §8 scenario 1).
pub struct Interpreter {
    ctx: SandboxContext,
    /// Number of `def` call frames currently active. `0` means we're
    /// executing at module top level, which changes the default
    /// assignment scope from `local` to `private` (spec.md §4.3 point 3).
    call_depth: usize,
}

impl Interpreter {
    pub fn new(ctx: SandboxContext) -> Self {
        Self { ctx, call_depth: 0 }
    }

    pub fn ctx(&self) -> &SandboxContext {
        &self.ctx
    }

    pub fn ctx_mut(&mut self) -> &mut SandboxContext {
        &mut self.ctx
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.ctx.config
    }

    pub fn into_ctx(self) -> SandboxContext {
        self.ctx
    }

    fn default_assign_scope(&self) -> Scope {
        if self.call_depth == 0 {
            Scope::Private
        } else {
            Scope::Local
        }
    }

    /// Runs every top-level statement, returning the value of the last
    /// expression statement (or `None`) the way a REPL reports a
    /// program's result (spec.md §8 scenario 1's `y` result).
    pub fn run_program(&mut self, program: &Program) -> DanaResult<Value> {
        let mut last = Value::None;
        for statement in &program.statements {
            match self.exec_statement(statement)? {
                Flow::Normal(v) => last = v,
                Flow::Return(v) => return Ok(v),
                Flow::Break | Flow::Continue => {
                    return Err(DanaError::Exception(DanaException::state(
                        "'break'/'continue' used outside of a loop",
                        statement.location().clone(),
                    )))
                }
            }
        }
        Ok(last)
    }

    fn exec_block(&mut self, statements: &[Statement]) -> DanaResult<Flow> {
        let mut last = Value::None;
        for statement in statements {
            match self.exec_statement(statement)? {
                Flow::Normal(v) => last = v,
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal(last))
    }

    fn exec_statement(&mut self, statement: &Statement) -> DanaResult<Flow> {
        match statement {
            Statement::Assignment(a) => self.exec_assignment(a).map(Flow::Normal),
            Statement::Expression(e) => self.eval_expression(e).map(Flow::Normal),
            Statement::FunctionDefinition(def) => self.exec_function_definition(def).map(Flow::Normal),
            Statement::StructDefinition(def) => self.exec_struct_definition(def).map(Flow::Normal),
            Statement::AgentDefinition(def) => self.exec_agent_definition(def).map(Flow::Normal),
            Statement::ResourceDefinition(def) => self.exec_resource_definition(def).map(Flow::Normal),
            Statement::Conditional(c) => self.exec_conditional(c),
            Statement::WhileLoop(w) => self.exec_while(w),
            Statement::ForLoop(f) => self.exec_for(f),
            Statement::TryExcept(t) => self.exec_try_except(t),
            Statement::Raise(r) => self.exec_raise(r),
            Statement::Return(r) => {
                let value = match &r.value {
                    Some(expr) => self.eval_and_force(expr)?,
                    None => Value::None,
                };
                Ok(Flow::Return(value))
            }
            Statement::Import(i) => self.exec_import(i).map(Flow::Normal),
            Statement::Pass(_) => Ok(Flow::Normal(Value::None)),
            Statement::Break(_) => Ok(Flow::Break),
            Statement::Continue(_) => Ok(Flow::Continue),
        }
    }

    // ---- assignment -----------------------------------------------------

    fn exec_assignment(&mut self, assignment: &Assignment) -> DanaResult<Value> {
        let value = self.eval_expression(&assignment.value)?;
        match &assignment.target {
            Expression::Identifier(id) => {
                let default = self.default_assign_scope();
                self.ctx.assign_with_default(&id.scoped_name, value.clone(), default)?;
            }
            Expression::FieldAccess(fa) => {
                let object = self.eval_and_force(&fa.object)?;
                self.set_field(&object, &fa.field, value.clone(), &fa.location)?;
            }
            Expression::Index(ix) => {
                let object = self.eval_and_force(&ix.object)?;
                let index = self.eval_and_force(&ix.index)?;
                self.set_index(&object, index, value.clone(), &ix.location)?;
            }
            other => {
                return Err(DanaError::Exception(DanaException::type_error(
                    "invalid assignment target",
                    other.location().clone(),
                )))
            }
        }
        Ok(value)
    }

    fn set_field(&mut self, object: &Value, field: &str, value: Value, location: &Location) -> DanaResult<()> {
        let coerced = match object {
            Value::Struct(s) => {
                let type_name = s.read().type_name.clone();
                self.coerce_for_field(&type_name, field, value)?
            }
            Value::Agent(a) => {
                let type_name = a.read().base.type_name.clone();
                self.coerce_for_field(&type_name, field, value)?
            }
            Value::Resource(r) => {
                let type_name = r.read().base.type_name.clone();
                self.coerce_for_field(&type_name, field, value)?
            }
            other => {
                return Err(DanaError::Exception(DanaException::type_error(
                    format!("cannot set field '{field}' on a {}", other.type_name()),
                    location.clone(),
                )))
            }
        };
        match object {
            Value::Struct(s) => s.write().set(field, coerced),
            Value::Agent(a) => a.write().base.set(field, coerced),
            Value::Resource(r) => r.write().base.set(field, coerced),
            _ => unreachable!(),
        }
        Ok(())
    }

    fn coerce_for_field(&self, type_name: &str, field: &str, value: Value) -> DanaResult<Value> {
        let declared = self
            .ctx
            .registries
            .structs
            .get(type_name)
            .and_then(|t| t.field(field).map(|f| f.type_name.clone()))
            .or_else(|| self.ctx.registries.agents.get(type_name).and_then(|t| t.base.field(field).map(|f| f.type_name.clone())))
            .or_else(|| self.ctx.registries.resources.get(type_name).and_then(|t| t.base.field(field).map(|f| f.type_name.clone())));
        match declared {
            Some(type_name) if self.config().auto_coercion && self.config().coercion_strategy != CoercionStrategy::None => {
                coercion::coerce_value(value, &TypeDescriptor::from_name(&type_name), &self.ctx.registries).map_err(DanaError::Exception)
            }
            _ => Ok(value),
        }
    }

    fn set_index(&mut self, object: &Value, index: Value, value: Value, location: &Location) -> DanaResult<()> {
        match object {
            Value::List(items) => {
                let Value::Int(i) = index else {
                    return Err(DanaError::Exception(DanaException::type_error("list index must be an int", location.clone())));
                };
                let mut items = items.write();
                let len = items.len() as i64;
                let idx = if i < 0 { i + len } else { i };
                if idx < 0 || idx >= len {
                    return Err(DanaError::Exception(DanaException::state(format!("list index {i} out of range"), location.clone())));
                }
                items[idx as usize] = value;
                Ok(())
            }
            Value::Dict(map) => {
                map.write().insert(coercion::to_text(&index), value);
                Ok(())
            }
            other => Err(DanaError::Exception(DanaException::type_error(
                format!("cannot index-assign into a {}", other.type_name()),
                location.clone(),
            ))),
        }
    }

    // ---- type definitions -------------------------------------------------

    fn build_field_descriptors(&mut self, fields: &[FieldSpec]) -> DanaResult<Vec<crate::types::FieldDescriptor>> {
        let mut out = Vec::with_capacity(fields.len());
        for field in fields {
            let default = match &field.default {
                Some(expr) => Some(self.eval_and_force(expr)?),
                None => None,
            };
            out.push(crate::types::FieldDescriptor::new(field.name.clone(), field.type_name.clone(), default));
        }
        Ok(out)
    }

    /// Re-registering an identical field set is a no-op; a differing one
    /// is rejected (spec.md §3 invariant, §8 "Laws"). Field identity
    /// compares name/declared-type pairs only — defaults aren't part of a
    /// type's shape.
    fn shape(fields: &[crate::types::FieldDescriptor]) -> Vec<(String, String)> {
        fields.iter().map(|f| (f.name.clone(), f.type_name.clone())).collect()
    }

    fn exec_struct_definition(&mut self, def: &StructDefinition) -> DanaResult<Value> {
        let fields = self.build_field_descriptors(&def.fields)?;
        if let Some(existing) = self.ctx.registries.structs.get(&def.name) {
            if Self::shape(&existing.fields) != Self::shape(&fields) {
                return Err(DanaError::Exception(DanaException::type_error(
                    format!("struct '{}' already declared with a different field set", def.name),
                    def.location.clone(),
                )));
            }
            return Ok(Value::None);
        }
        self.ctx.registries.structs.register(def.name.clone(), crate::types::StructType::new(def.name.clone(), fields));
        Ok(Value::None)
    }

    fn exec_agent_definition(&mut self, def: &AgentDefinition) -> DanaResult<Value> {
        let fields = self.build_field_descriptors(&def.fields)?;
        let agent_type = crate::types::AgentType::new(def.name.clone(), fields);
        if let Some(existing) = self.ctx.registries.agents.get(&def.name) {
            if Self::shape(&existing.base.fields) != Self::shape(&agent_type.base.fields) {
                return Err(DanaError::Exception(DanaException::type_error(
                    format!("agent '{}' already declared with a different field set", def.name),
                    def.location.clone(),
                )));
            }
            return Ok(Value::None);
        }
        self.ctx.registries.agents.register(def.name.clone(), agent_type.clone());
        self.ctx.registries.structs.register(def.name.clone(), agent_type.base);
        Ok(Value::None)
    }

    fn exec_resource_definition(&mut self, def: &ResourceDefinition) -> DanaResult<Value> {
        let fields = self.build_field_descriptors(&def.fields)?;
        let resource_type = crate::types::ResourceType::new(def.name.clone(), fields);
        if let Some(existing) = self.ctx.registries.resources.get(&def.name) {
            if Self::shape(&existing.base.fields) != Self::shape(&resource_type.base.fields) {
                return Err(DanaError::Exception(DanaException::type_error(
                    format!("resource '{}' already declared with a different field set", def.name),
                    def.location.clone(),
                )));
            }
            return Ok(Value::None);
        }
        self.ctx.registries.resources.register(def.name.clone(), resource_type);
        Ok(Value::None)
    }

    fn exec_function_definition(&mut self, def: &FunctionDefinition) -> DanaResult<Value> {
        let function = DanaFunction::from_def(def, None, false);
        let mut value = Value::Function(Arc::new(FunctionValue::Dana(function)));

        // `@d` rewrites the registration to `d(f)`'s result, innermost
        // decorator applied first (spec.md §11.2 "decorators are just
        // higher-order core functions").
        for decorator in def.decorators.iter().rev() {
            let callee = self.eval_and_force(decorator)?;
            value = self.call_value(callee, vec![value], vec![], &def.location)?;
            value = self.force(value)?;
        }

        let Value::Function(fv) = value else {
            return Err(DanaError::Exception(DanaException::type_error(
                format!("decorator on '{}' must return a callable", def.name),
                def.location.clone(),
            )));
        };
        // `def public:name(...)` registers into the shared public namespace
        // (spec.md §4.9); an unqualified `def` defaults to the current
        // module's private namespace.
        let namespace = match def.namespace.as_deref() {
            Some("public") => Namespace::Public,
            Some("private") | None => Namespace::Private,
            Some(other) => {
                return Err(DanaError::Exception(DanaException::name(
                    format!("functions cannot be defined in the '{other}' namespace"),
                    def.location.clone(),
                )));
            }
        };
        self.ctx.registries.functions.register(namespace, (*fv).clone());
        Ok(Value::None)
    }

    // ---- control flow -----------------------------------------------------

    fn exec_conditional(&mut self, conditional: &Conditional) -> DanaResult<Flow> {
        for (condition, body) in &conditional.branches {
            if self.eval_truthy(condition)? {
                return self.exec_block(body);
            }
        }
        match &conditional.else_branch {
            Some(body) => self.exec_block(body),
            None => Ok(Flow::Normal(Value::None)),
        }
    }

    fn exec_while(&mut self, w: &WhileLoop) -> DanaResult<Flow> {
        while self.eval_truthy(&w.condition)? {
            match self.exec_block(&w.body)? {
                Flow::Break => break,
                Flow::Continue | Flow::Normal(_) => {}
                ret @ Flow::Return(_) => return Ok(ret),
            }
        }
        Ok(Flow::Normal(Value::None))
    }

    fn exec_for(&mut self, f: &ForLoop) -> DanaResult<Flow> {
        let iterable = self.eval_and_force(&f.iterable)?;
        let items = self.iterate(&iterable, &f.iterable.location())?;
        let default = self.default_assign_scope();
        for item in items {
            self.ctx.assign_with_default(&ScopedName::implicit(f.variable.clone()), item, default)?;
            match self.exec_block(&f.body)? {
                Flow::Break => break,
                Flow::Continue | Flow::Normal(_) => {}
                ret @ Flow::Return(_) => return Ok(ret),
            }
        }
        Ok(Flow::Normal(Value::None))
    }

    fn iterate(&self, value: &Value, location: &Location) -> DanaResult<Vec<Value>> {
        match value {
            Value::List(items) => Ok(items.read().clone()),
            Value::Str(s) => Ok(s.chars().map(|c| Value::Str(c.to_string())).collect()),
            Value::Dict(map) => Ok(map.read().keys().map(|k| Value::Str(k.clone())).collect()),
            other => Err(DanaError::Exception(DanaException::type_error(
                format!("{} is not iterable", other.type_name()),
                location.clone(),
            ))),
        }
    }

    fn exec_try_except(&mut self, t: &TryExcept) -> DanaResult<Flow> {
        match self.exec_block(&t.try_body) {
            Ok(flow) => Ok(flow),
            Err(DanaError::Fatal(f)) => Err(DanaError::Fatal(f)),
            Err(DanaError::Exception(exception)) => {
                for handler in &t.handlers {
                    let matches = match &handler.exception_type {
                        None => true,
                        Some(name) => name == exception.type_name.as_ref() || name == exception.kind.label(),
                    };
                    if !matches {
                        continue;
                    }
                    if let Some(binding) = &handler.binding {
                        let default = self.default_assign_scope();
                        self.ctx.assign_with_default(
                            &ScopedName::implicit(binding.clone()),
                            builtins::exception_to_value(&exception),
                            default,
                        )?;
                    }
                    return self.exec_block(&handler.body);
                }
                Err(DanaError::Exception(exception))
            }
        }
    }

    fn exec_raise(&mut self, r: &Raise) -> DanaResult<Flow> {
        let message = match &r.message {
            Some(expr) => coercion::to_text(&self.eval_and_force(expr)?),
            None => r.exception_type.clone().unwrap_or_else(|| "an error occurred".to_string()),
        };
        let kind = r
            .exception_type
            .as_deref()
            .map(builtins::kind_for_exception_name)
            .unwrap_or(ErrorKind::Dana);
        let mut exception = DanaException::new(kind, message, r.location.clone());
        if let Some(name) = &r.exception_type {
            exception = exception.with_type_name(name.clone());
        }
        Err(DanaError::Exception(exception))
    }

    fn exec_import(&mut self, import: &ImportStatement) -> DanaResult<Value> {
        let loader = self.ctx.module_loader.clone();
        let loaded = loader.load(&import.module)?;

        let mut module_ctx = SandboxContext::with_search_path(self.ctx.registries.clone(), vec![]);
        module_ctx.module_loader = self.ctx.module_loader.clone();
        module_ctx.config = self.ctx.config.clone();
        module_ctx.limiter = self.ctx.limiter.clone();
        let mut module_interp = Interpreter::new(module_ctx);
        module_interp.run_program(&loaded.program)?;
        let public = module_interp.into_ctx().public_snapshot();

        if import.names.is_empty() {
            let default = self.default_assign_scope();
            let alias = import.alias.clone().unwrap_or_else(|| import.module.clone());
            self.ctx.assign_with_default(&ScopedName::implicit(alias), Value::dict(public), default)?;
        } else {
            let default = self.default_assign_scope();
            for (name, alias) in &import.names {
                let value = public.get(name).cloned().ok_or_else(|| {
                    DanaError::Exception(DanaException::name(
                        format!("module '{}' has no public name '{name}'", import.module),
                        import.location.clone(),
                    ))
                })?;
                self.ctx.assign_with_default(&ScopedName::implicit(alias.clone().unwrap_or_else(|| name.clone())), value, default)?;
            }
        }
        Ok(Value::None)
    }

    // ---- expressions --------------------------------------------------

    fn eval_expression(&mut self, expr: &Expression) -> DanaResult<Value> {
        match expr {
            Expression::Literal(l) => Ok(self.eval_literal(l)),
            Expression::Identifier(id) => self.eval_identifier(id),
            Expression::Binary(b) => self.eval_binary(b),
            Expression::Unary(u) => self.eval_unary(u),
            Expression::FString(f) => self.eval_fstring(f),
            Expression::Call(c) => call::eval_call(self, c),
            Expression::FieldAccess(fa) => self.eval_field_access(fa),
            Expression::Index(ix) => self.eval_index(ix),
            Expression::List(l) => {
                let mut items = Vec::with_capacity(l.items.len());
                for item in &l.items {
                    items.push(self.eval_and_force(item)?);
                }
                Ok(Value::list(items))
            }
            Expression::Dict(d) => {
                let mut map = HashMap::with_capacity(d.entries.len());
                for (k, v) in &d.entries {
                    let key = coercion::to_text(&self.eval_and_force(k)?);
                    map.insert(key, self.eval_and_force(v)?);
                }
                Ok(Value::dict(map))
            }
        }
    }

    /// Evaluate, then immediately force — the shape every call site uses
    /// except the handful of observation points that must see a `Promise`
    /// value pass through untouched (an unconsumed assignment RHS).
    fn eval_and_force(&mut self, expr: &Expression) -> DanaResult<Value> {
        let value = self.eval_expression(expr)?;
        self.force(value)
    }

    /// Forces an unresolved promise (spec.md §4.7 "observation points");
    /// any other value passes through unchanged.
    fn force(&self, value: Value) -> DanaResult<Value> {
        match value {
            Value::Promise(p) => p.force().map_err(DanaError::Exception),
            other => Ok(other),
        }
    }

    fn eval_truthy(&mut self, expr: &Expression) -> DanaResult<bool> {
        let value = self.eval_and_force(expr)?;
        Ok(value.is_truthy())
    }

    fn eval_literal(&self, literal: &LiteralExpression) -> Value {
        match &literal.value {
            Literal::Int(v) => Value::Int(*v),
            Literal::Float(v) => Value::Float(*v),
            Literal::Str(v) => Value::Str(v.clone()),
            Literal::Bool(v) => Value::Bool(*v),
            Literal::None => Value::None,
        }
    }

    fn eval_identifier(&mut self, id: &Identifier) -> DanaResult<Value> {
        self.ctx
            .get(&id.scoped_name)
            .ok_or_else(|| self.ctx.name_error(&id.scoped_name, id.location.clone()))
    }

    fn eval_fstring(&mut self, f: &FStringExpression) -> DanaResult<Value> {
        let mut out = String::new();
        for part in &f.parts {
            match part {
                FStringPart::Literal(text) => out.push_str(text),
                FStringPart::Expr(expr) => out.push_str(&coercion::to_text(&self.eval_and_force(expr)?)),
            }
        }
        Ok(Value::Str(out))
    }

    fn eval_unary(&mut self, u: &UnaryExpression) -> DanaResult<Value> {
        let operand = self.eval_and_force(&u.operand)?;
        match u.op {
            UnaryOp::Not => Ok(Value::Bool(!operand.is_truthy())),
            UnaryOp::Neg => match operand {
                Value::Int(n) => Ok(Value::Int(-n)),
                Value::Float(n) => Ok(Value::Float(-n)),
                other => Err(DanaError::Exception(DanaException::type_error(
                    format!("cannot negate a {}", other.type_name()),
                    u.location.clone(),
                ))),
            },
        }
    }

    fn eval_field_access(&mut self, fa: &FieldAccess) -> DanaResult<Value> {
        let object = self.eval_and_force(&fa.object)?;
        match &object {
            Value::Struct(s) => s
                .read()
                .get(&fa.field)
                .cloned()
                .ok_or_else(|| field_error(&s.read().type_name, &fa.field, &fa.location)),
            Value::Agent(a) => a
                .read()
                .base
                .get(&fa.field)
                .cloned()
                .ok_or_else(|| field_error(&a.read().base.type_name, &fa.field, &fa.location)),
            Value::Resource(r) => {
                let guard = r.read();
                if let Some(v) = guard.base.get(&fa.field) {
                    return Ok(v.clone());
                }
                if fa.field == "state" {
                    return Ok(Value::Str(guard.state.to_string()));
                }
                Err(field_error(&guard.base.type_name, &fa.field, &fa.location))
            }
            Value::Dict(map) => Ok(map.read().get(&fa.field).cloned().unwrap_or(Value::None)),
            other => Err(DanaError::Exception(DanaException::type_error(
                format!("cannot access field '{}' on a {}", fa.field, other.type_name()),
                fa.location.clone(),
            ))),
        }
    }

    fn eval_index(&mut self, ix: &IndexExpression) -> DanaResult<Value> {
        let object = self.eval_and_force(&ix.object)?;
        let index = self.eval_and_force(&ix.index)?;
        match (&object, &index) {
            (Value::List(items), Value::Int(i)) => {
                let items = items.read();
                let len = items.len() as i64;
                let idx = if *i < 0 { i + len } else { *i };
                items.get(idx as usize).cloned().ok_or_else(|| {
                    DanaError::Exception(DanaException::state(format!("list index {i} out of range"), ix.location.clone()))
                })
            }
            (Value::Dict(map), _) => Ok(map.read().get(&coercion::to_text(&index)).cloned().unwrap_or(Value::None)),
            (Value::Str(s), Value::Int(i)) => {
                let chars: Vec<char> = s.chars().collect();
                let len = chars.len() as i64;
                let idx = if *i < 0 { i + len } else { *i };
                chars
                    .get(idx as usize)
                    .map(|c| Value::Str(c.to_string()))
                    .ok_or_else(|| DanaError::Exception(DanaException::state(format!("string index {i} out of range"), ix.location.clone())))
            }
            _ => Err(DanaError::Exception(DanaException::type_error(
                format!("cannot index a {} with a {}", object.type_name(), index.type_name()),
                ix.location.clone(),
            ))),
        }
    }

    fn eval_binary(&mut self, b: &BinaryExpression) -> DanaResult<Value> {
        // `and`/`or` short-circuit, so the right operand is only evaluated
        // (and only then forced) when it's actually needed.
        match b.op {
            BinaryOp::And => {
                let left = self.eval_and_force(&b.left)?;
                return if !left.is_truthy() { Ok(left) } else { self.eval_and_force(&b.right) };
            }
            BinaryOp::Or => {
                let left = self.eval_and_force(&b.left)?;
                return if left.is_truthy() { Ok(left) } else { self.eval_and_force(&b.right) };
            }
            BinaryOp::Pipe => {
                let left = self.eval_and_force(&b.left)?;
                let right = self.eval_and_force(&b.right)?;
                return self.compose_pipeline(left, right, &b.location);
            }
            _ => {}
        }

        let left = self.eval_and_force(&b.left)?;
        let right = self.eval_and_force(&b.right)?;
        let strategy = self.config().coercion_strategy;

        match b.op {
            BinaryOp::Add => self.eval_add(left, right, strategy, &b.location),
            BinaryOp::Sub => self.eval_arith(left, right, strategy, &b.location, |a, b| a - b, |a, b| a - b),
            BinaryOp::Mul => self.eval_arith(left, right, strategy, &b.location, |a, b| a * b, |a, b| a * b),
            BinaryOp::Div => self.eval_div(left, right, strategy, &b.location),
            BinaryOp::Mod => self.eval_mod(left, right, strategy, &b.location),
            BinaryOp::Eq => Ok(Value::Bool(self.values_equal(&left, &right, strategy))),
            BinaryOp::NotEq => Ok(Value::Bool(!self.values_equal(&left, &right, strategy))),
            BinaryOp::Lt => self.compare(left, right, strategy, &b.location, std::cmp::Ordering::Less, false),
            BinaryOp::Gt => self.compare(left, right, strategy, &b.location, std::cmp::Ordering::Greater, false),
            BinaryOp::LtEq => self.compare(left, right, strategy, &b.location, std::cmp::Ordering::Less, true),
            BinaryOp::GtEq => self.compare(left, right, strategy, &b.location, std::cmp::Ordering::Greater, true),
            BinaryOp::In => self.eval_in(left, right, &b.location),
            BinaryOp::And | BinaryOp::Or | BinaryOp::Pipe => unreachable!("handled above"),
        }
    }

    /// `x | pipeline` evaluates `x` first when the left side isn't itself
    /// a function value, then applies the right-hand callable
    /// (spec.md §4.7 "x | pipeline first evaluates x, then applies the
    /// pipeline"); `f | g` composes two callables into one without
    /// invoking either (spec.md §4.6).
    fn compose_pipeline(&mut self, left: Value, right: Value, location: &Location) -> DanaResult<Value> {
        match (left, right) {
            (Value::Function(f), Value::Function(g)) => Ok(Value::Function(Arc::new(FunctionValue::Native(crate::function::PythonFunction {
                name: format!("{}|{}", f.name(), g.name()),
                callable: Arc::new(move |interp, args, kwargs| {
                    let first = interp.call_value(Value::Function(f.clone()), args.to_vec(), kwargs.to_vec(), &Location::unknown())?;
                    let first = interp.force(first)?;
                    interp.call_value(Value::Function(g.clone()), vec![first], vec![], &Location::unknown())
                }),
            }))),
            (value, Value::Function(g)) => self.call_value(Value::Function(g), vec![value], vec![], location),
            (_, other) => Err(DanaError::Exception(DanaException::type_error(
                format!("right side of '|' must be callable, found {}", other.type_name()),
                location.clone(),
            ))),
        }
    }

    fn eval_add(&self, left: Value, right: Value, strategy: CoercionStrategy, location: &Location) -> DanaResult<Value> {
        if strategy != CoercionStrategy::None {
            if let (Value::Str(_), _) | (_, Value::Str(_)) = (&left, &right) {
                if !matches!((&left, &right), (Value::Str(_), Value::Str(_))) {
                    return Ok(Value::Str(format!("{}{}", coercion::to_text(&left), coercion::to_text(&right))));
                }
            }
        }
        match (&left, &right) {
            (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{a}{b}"))),
            (Value::List(a), Value::List(b)) => {
                let mut items = a.read().clone();
                items.extend(b.read().clone());
                Ok(Value::list(items))
            }
            _ => self.eval_arith(left, right, strategy, location, |a, b| a + b, |a, b| a + b),
        }
    }

    fn eval_arith(
        &self,
        left: Value,
        right: Value,
        strategy: CoercionStrategy,
        _location: &Location,
        int_op: fn(i64, i64) -> i64,
        float_op: fn(f64, f64) -> f64,
    ) -> DanaResult<Value> {
        let (pair,) = coercion::numeric_pair(strategy, &left, &right).map_err(DanaError::Exception)?;
        Ok(match pair {
            coercion::NumberPair::Int(a, b) => Value::Int(int_op(a, b)),
            coercion::NumberPair::Float(a, b) => Value::Float(float_op(a, b)),
        })
    }

    fn eval_div(&self, left: Value, right: Value, strategy: CoercionStrategy, location: &Location) -> DanaResult<Value> {
        let (pair,) = coercion::numeric_pair(strategy, &left, &right).map_err(DanaError::Exception)?;
        match pair {
            coercion::NumberPair::Int(a, b) => {
                if b == 0 {
                    return Err(DanaError::Exception(
                        DanaException::state("division by zero", location.clone()).with_type_name("ZeroDivisionError"),
                    ));
                }
                Ok(Value::Float(a as f64 / b as f64))
            }
            coercion::NumberPair::Float(a, b) => {
                if b == 0.0 {
                    return Err(DanaError::Exception(
                        DanaException::state("division by zero", location.clone()).with_type_name("ZeroDivisionError"),
                    ));
                }
                Ok(Value::Float(a / b))
            }
        }
    }

    fn eval_mod(&self, left: Value, right: Value, strategy: CoercionStrategy, location: &Location) -> DanaResult<Value> {
        let (pair,) = coercion::numeric_pair(strategy, &left, &right).map_err(DanaError::Exception)?;
        match pair {
            coercion::NumberPair::Int(a, b) => {
                if b == 0 {
                    return Err(DanaError::Exception(
                        DanaException::state("modulo by zero", location.clone()).with_type_name("ZeroDivisionError"),
                    ));
                }
                Ok(Value::Int(a % b))
            }
            coercion::NumberPair::Float(a, b) => Ok(Value::Float(a % b)),
        }
    }

    /// `"42" == 42` holds under enhanced coercion when one side is a
    /// numeric-looking string; otherwise comparison is strict
    /// (spec.md §4.5 "Comparison across types").
    fn values_equal(&self, left: &Value, right: &Value, strategy: CoercionStrategy) -> bool {
        match (left, right) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::None, Value::None) => true,
            (Value::Str(s), other) | (other, Value::Str(s)) if strategy != CoercionStrategy::None && other.type_name() != "str" => {
                match (s.trim().parse::<f64>(), as_float(other)) {
                    (Ok(a), Some(b)) => a == b,
                    _ => false,
                }
            }
            _ => false,
        }
    }

    fn compare(
        &self,
        left: Value,
        right: Value,
        strategy: CoercionStrategy,
        location: &Location,
        wanted: std::cmp::Ordering,
        or_equal: bool,
    ) -> DanaResult<Value> {
        let ordering = match (&left, &right) {
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            _ => {
                let (pair,) = coercion::numeric_pair(strategy, &left, &right).map_err(DanaError::Exception)?;
                match pair {
                    coercion::NumberPair::Int(a, b) => a.cmp(&b),
                    coercion::NumberPair::Float(a, b) => a.partial_cmp(&b).ok_or_else(|| {
                        DanaError::Exception(DanaException::type_error("NaN is not ordered", location.clone()))
                    })?,
                }
            }
        };
        Ok(Value::Bool(ordering == wanted || (or_equal && ordering == std::cmp::Ordering::Equal)))
    }

    /// Resolved per §9 Open Question: string-in-string is substring
    /// search; anything else searches a list by value or a dict by key.
    fn eval_in(&self, left: Value, right: Value, location: &Location) -> DanaResult<Value> {
        match (&left, &right) {
            (Value::Str(needle), Value::Str(haystack)) => Ok(Value::Bool(haystack.contains(needle.as_str()))),
            (_, Value::List(items)) => Ok(Value::Bool(items.read().iter().any(|v| self.values_equal(&left, v, CoercionStrategy::Enhanced)))),
            (Value::Str(key), Value::Dict(map)) => Ok(Value::Bool(map.read().contains_key(key))),
            _ => Err(DanaError::Exception(DanaException::type_error(
                format!("'in' is not supported between {} and {}", left.type_name(), right.type_name()),
                location.clone(),
            ))),
        }
    }
}

fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Int(n) => Some(*n as f64),
        Value::Float(n) => Some(*n),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn field_error(type_name: &str, field: &str, location: &Location) -> DanaError {
    DanaError::Exception(DanaException::type_error(format!("'{type_name}' has no field '{field}'"), location.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SandboxContext;
    use crate::registry::Registries;

    fn run(src: &str) -> (Value, SandboxContext) {
        let tokens = crate::lexer::Lexer::new(src).lex().unwrap();
        let program = crate::parser::parse(tokens, src).unwrap();
        let mut interp = Interpreter::new(SandboxContext::new(Registries::new()));
        let value = interp.run_program(&program).unwrap();
        (value, interp.into_ctx())
    }

    #[test]
    fn assignment_and_arithmetic() {
        let (value, ctx) = run("x = 5\ny = x + 3.14\ny\n");
        assert!(matches!(value, Value::Float(f) if (f - 8.14).abs() < 1e-9));
        assert!(matches!(ctx.get(&ScopedName::explicit(Scope::Private, "x")), Some(Value::Int(5))));
    }

    #[test]
    fn division_by_zero_raises_state_error() {
        let tokens = crate::lexer::Lexer::new("x = 1 / 0\n").lex().unwrap();
        let program = crate::parser::parse(tokens, "x = 1 / 0\n").unwrap();
        let mut interp = Interpreter::new(SandboxContext::new(Registries::new()));
        let err = interp.run_program(&program).unwrap_err();
        match err {
            DanaError::Exception(e) => assert_eq!(e.kind, ErrorKind::State),
            _ => panic!("expected a catchable exception"),
        }
    }

    #[test]
    fn if_while_and_smart_boolean_string() {
        let (value, _) = run("if \"no\":\n    r = 1\nelse:\n    r = 2\nr\n");
        assert!(matches!(value, Value::Int(2)));
    }

    #[test]
    fn struct_definition_and_field_access() {
        let (value, _) = run("struct Point:\n    x: int\n    y: int = 0\np = Point(x=1, y=2)\np.x + p.y\n");
        assert!(matches!(value, Value::Int(3)));
    }

    #[test]
    fn struct_redefinition_with_same_fields_is_idempotent() {
        let (value, _) = run("struct Point:\n    x: int\nstruct Point:\n    x: int\n1\n");
        assert!(matches!(value, Value::Int(1)));
    }

    #[test]
    fn struct_redefinition_with_different_fields_is_rejected() {
        let tokens = crate::lexer::Lexer::new("struct Point:\n    x: int\nstruct Point:\n    x: int\n    y: int\n").lex().unwrap();
        let program = crate::parser::parse(tokens, "").unwrap();
        let mut interp = Interpreter::new(SandboxContext::new(Registries::new()));
        let err = interp.run_program(&program).unwrap_err();
        match err {
            DanaError::Exception(e) => assert_eq!(e.kind, ErrorKind::Type),
            _ => panic!("expected a TypeError"),
        }
    }

    #[test]
    fn exception_binding_exposes_type_field() {
        let (value, _) = run("try:\n    x = 1/0\nexcept as e:\n    k = e.type\nk\n");
        assert!(matches!(value, Value::Str(s) if s == "ZeroDivisionError"));
    }

    #[test]
    fn for_loop_sums_a_range() {
        let (value, _) = run("total = 0\nfor i in range(1, 4):\n    total = total + i\ntotal\n");
        assert!(matches!(value, Value::Int(6)));
    }

    #[test]
    fn user_function_call_and_return() {
        let (value, _) = run("def add(a: int, b: int) -> int:\n    return a + b\nadd(2, 3)\n");
        assert!(matches!(value, Value::Int(5)));
    }

    #[test]
    fn string_in_string_is_substring_search() {
        let (value, _) = run("\"ell\" in \"hello\"\n");
        assert!(matches!(value, Value::Bool(true)));
    }
}
