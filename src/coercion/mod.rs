//! Type coercion engine (spec.md §4.5).
//!
//! Three strategies control how aggressively values convert to satisfy a
//! binary operator or an assignment's declared type: `None` (no implicit
//! conversion), `Enhanced` (numeric widening + string canonicalization),
//! and `Loose` (additionally accepts JSON-ish strings and LLM free text).

use std::collections::HashMap;

use crate::error::{DanaException, Location};
use crate::registry::Registries;
use crate::types::{AgentInstance, FieldDescriptor, ResourceInstance, StructInstance, TypeDescriptor, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoercionStrategy {
    None,
    Enhanced,
    Loose,
}

impl Default for CoercionStrategy {
    fn default() -> Self {
        CoercionStrategy::Enhanced
    }
}

pub fn coerce_to_int(value: &Value) -> Result<Value, DanaException> {
    match value {
        Value::Int(n) => Ok(Value::Int(*n)),
        Value::Float(n) => Ok(Value::Int(*n as i64)),
        Value::Bool(b) => Ok(Value::Int(if *b { 1 } else { 0 })),
        Value::Str(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| DanaException::coercion(format!("cannot coerce '{s}' to int"), Location::unknown())),
        other => Err(DanaException::coercion(format!("cannot coerce {} to int", other.type_name()), Location::unknown())),
    }
}

pub fn coerce_to_float(value: &Value) -> Result<Value, DanaException> {
    match value {
        Value::Int(n) => Ok(Value::Float(*n as f64)),
        Value::Float(n) => Ok(Value::Float(*n)),
        Value::Bool(b) => Ok(Value::Float(if *b { 1.0 } else { 0.0 })),
        Value::Str(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| DanaException::coercion(format!("cannot coerce '{s}' to float"), Location::unknown())),
        other => Err(DanaException::coercion(format!("cannot coerce {} to float", other.type_name()), Location::unknown())),
    }
}

/// Canonical string form used by f-string interpolation and string-side
/// binary operators (spec.md §4.5 "bool -> `\"true\"/\"false\"`"). Diverges
/// from `Display` only for `bool`: `print()`/`str()` still show Python-style
/// `True`/`False`, but this coercion path is the lowercase one the spec
/// names explicitly.
pub fn to_text(value: &Value) -> String {
    match value {
        Value::Bool(b) => if *b { "true" } else { "false" }.to_string(),
        other => other.to_string(),
    }
}

/// Widens two numeric operands to a common type for `+ - * / %`
/// (spec.md §4.5 "numeric mixing"): `int op int -> int`, anything
/// involving a `float` promotes both sides to `float`.
pub fn numeric_pair(strategy: CoercionStrategy, left: &Value, right: &Value) -> Result<(NumberPair,), DanaException> {
    if strategy == CoercionStrategy::None {
        return match (left, right) {
            (Value::Int(a), Value::Int(b)) => Ok((NumberPair::Int(*a, *b),)),
            (Value::Float(a), Value::Float(b)) => Ok((NumberPair::Float(*a, *b),)),
            _ => Err(DanaException::type_error(
                format!("cannot combine {} and {} under strict typing", left.type_name(), right.type_name()),
                Location::unknown(),
            )),
        };
    }

    let as_number = |v: &Value| -> Option<f64> {
        match v {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Str(s) if strategy == CoercionStrategy::Loose => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    };

    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok((NumberPair::Int(*a, *b),)),
        _ => {
            let a = as_number(left)
                .ok_or_else(|| DanaException::coercion(format!("cannot coerce {} to a number", left.type_name()), Location::unknown()))?;
            let b = as_number(right)
                .ok_or_else(|| DanaException::coercion(format!("cannot coerce {} to a number", right.type_name()), Location::unknown()))?;
            Ok((NumberPair::Float(a, b),))
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum NumberPair {
    Int(i64, i64),
    Float(f64, f64),
}

/// The pipeline an LLM's free-text reply goes through when it must be
/// coerced into a declared result type (spec.md §4.5): strip a markdown
/// code fence, strip a `FINAL_ANSWER:`-style prefix, then parse as the
/// target primitive or as JSON and recursively coerce fields, finally
/// constructing a registered struct type if the target names one.
pub fn coerce_llm_text(raw: &str, target: &TypeDescriptor, registries: &Registries) -> Result<Value, DanaException> {
    let stripped = strip_code_fence(raw);
    let stripped = strip_final_answer_prefix(stripped);

    match target {
        TypeDescriptor::Str => Ok(Value::Str(stripped.to_string())),
        TypeDescriptor::Int => coerce_to_int(&Value::Str(stripped.to_string())),
        TypeDescriptor::Float => coerce_to_float(&Value::Str(stripped.to_string())),
        TypeDescriptor::Bool => Ok(Value::Bool(Value::Str(stripped.to_string()).is_truthy())),
        TypeDescriptor::None => Ok(Value::None),
        TypeDescriptor::List(inner) => {
            let json: serde_json::Value = serde_json::from_str(stripped)
                .map_err(|e| DanaException::coercion(format!("LLM output is not valid JSON: {e}"), Location::unknown()))?;
            let serde_json::Value::Array(items) = json else {
                return Err(DanaException::coercion("LLM output is not a JSON array", Location::unknown()));
            };
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(coerce_json_field(json_to_value(&item)?, inner, registries)?);
            }
            Ok(Value::list(out))
        }
        TypeDescriptor::Dict => {
            let json: serde_json::Value = serde_json::from_str(stripped)
                .map_err(|e| DanaException::coercion(format!("LLM output is not valid JSON: {e}"), Location::unknown()))?;
            json_to_value(&json)
        }
        TypeDescriptor::Named(type_name) => {
            let json: serde_json::Value = serde_json::from_str(stripped)
                .map_err(|e| DanaException::coercion(format!("LLM output is not valid JSON: {e}"), Location::unknown()))?;
            let serde_json::Value::Object(map) = json else {
                return Err(DanaException::coercion(format!("LLM output is not a JSON object for type '{type_name}'"), Location::unknown()));
            };
            let mut fields = HashMap::with_capacity(map.len());
            for (k, v) in &map {
                fields.insert(k.clone(), json_to_value(v)?);
            }
            construct_typed_value(type_name, &fields, registries)
        }
        TypeDescriptor::Any => Ok(Value::Str(stripped.to_string())),
    }
}

/// Builds a `Struct`/`Agent`/`Resource` instance of `type_name` from a flat
/// map of already-parsed field values, validating that every required
/// field is present and no unknown field is supplied, and recursively
/// coercing each field to its declared type (spec.md §4.5 item 3). Checks
/// the three type registries in that order since a bare type name doesn't
/// say which kind it names.
pub fn construct_typed_value(type_name: &str, fields_in: &HashMap<String, Value>, registries: &Registries) -> Result<Value, DanaException> {
    if let Some(t) = registries.structs.get(type_name) {
        let fields = build_fields(&t.fields, fields_in, registries)?;
        return Ok(Value::Struct(std::sync::Arc::new(parking_lot::RwLock::new(StructInstance::new(t.name.clone(), fields)))));
    }
    if let Some(t) = registries.agents.get(type_name) {
        let fields = build_fields(&t.base.fields, fields_in, registries)?;
        return Ok(Value::Agent(std::sync::Arc::new(parking_lot::RwLock::new(AgentInstance::new(t.base.name.clone(), fields)))));
    }
    if let Some(t) = registries.resources.get(type_name) {
        let fields = build_fields(&t.base.fields, fields_in, registries)?;
        return Ok(Value::Resource(std::sync::Arc::new(parking_lot::RwLock::new(ResourceInstance::new(t.base.name.clone(), fields)))));
    }
    Err(DanaException::type_error(format!("unknown type '{type_name}'"), Location::unknown()))
}

fn build_fields(descriptors: &[FieldDescriptor], fields_in: &HashMap<String, Value>, registries: &Registries) -> Result<HashMap<String, Value>, DanaException> {
    let known: std::collections::HashSet<&str> = descriptors.iter().map(|f| f.name.as_str()).collect();
    if let Some(extra) = fields_in.keys().find(|k| !known.contains(k.as_str())) {
        return Err(DanaException::coercion(format!("unexpected field '{extra}'"), Location::unknown()));
    }

    let mut out = HashMap::with_capacity(descriptors.len());
    for field in descriptors {
        let value = match fields_in.get(&field.name) {
            Some(v) => coerce_json_field(v.clone(), &TypeDescriptor::from_name(&field.type_name), registries)?,
            None => field
                .default
                .clone()
                .ok_or_else(|| DanaException::coercion(format!("missing required field '{}'", field.name), Location::unknown()))?,
        };
        out.insert(field.name.clone(), value);
    }
    Ok(out)
}

/// Recursively coerces an already-JSON-parsed `Value` to `target`,
/// descending into nested structs/lists (spec.md §4.5 item 3 "recursively
/// coerce struct fields").
fn coerce_json_field(value: Value, target: &TypeDescriptor, registries: &Registries) -> Result<Value, DanaException> {
    match (target, &value) {
        (TypeDescriptor::Any, _) => Ok(value),
        (TypeDescriptor::Int, Value::Int(_)) | (TypeDescriptor::Float, Value::Float(_)) | (TypeDescriptor::Str, Value::Str(_)) | (TypeDescriptor::Bool, Value::Bool(_)) => {
            Ok(value)
        }
        (TypeDescriptor::Int, _) => coerce_to_int(&value),
        (TypeDescriptor::Float, _) => coerce_to_float(&value),
        (TypeDescriptor::Str, _) => Ok(Value::Str(to_text(&value))),
        (TypeDescriptor::Bool, _) => Ok(Value::Bool(value.is_truthy())),
        (TypeDescriptor::None, _) => Ok(Value::None),
        (TypeDescriptor::Dict, _) => Ok(value),
        (TypeDescriptor::List(inner), Value::List(items)) => {
            let mut out = Vec::new();
            for item in items.read().iter() {
                out.push(coerce_json_field(item.clone(), inner, registries)?);
            }
            Ok(Value::list(out))
        }
        (TypeDescriptor::List(_), _) => Err(DanaException::coercion(format!("expected a list, got {}", value.type_name()), Location::unknown())),
        (TypeDescriptor::Named(type_name), Value::Dict(map)) => construct_typed_value(type_name, &map.read().clone(), registries),
        (TypeDescriptor::Named(type_name), Value::Struct(s)) if s.read().type_name.as_ref() == type_name => Ok(value),
        (TypeDescriptor::Named(type_name), _) => Err(DanaException::coercion(format!("expected an instance of '{type_name}'"), Location::unknown())),
    }
}

/// General (non-LLM-text) coercion applied when a plain value is assigned
/// into a typed struct field or a typed parameter (spec.md §4.4
/// "Assignment"): numeric widening and identity pass-through go through
/// `coerce_json_field`'s same rules; a `Str` source is additionally run
/// through the LLM-text pipeline first, since both sources need the same
/// fence/prefix-insensitive JSON parsing once free text is in play.
pub fn coerce_value(value: Value, target: &TypeDescriptor, registries: &Registries) -> Result<Value, DanaException> {
    if let Value::Str(s) = &value {
        if !matches!(target, TypeDescriptor::Str | TypeDescriptor::Any) {
            return coerce_llm_text(s, target, registries);
        }
    }
    coerce_json_field(value, target, registries)
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        let rest = rest.trim_start_matches(|c: char| c.is_alphanumeric());
        let rest = rest.trim_start();
        rest.strip_suffix("```").unwrap_or(rest).trim()
    } else {
        trimmed
    }
}

fn strip_final_answer_prefix(text: &str) -> &str {
    for prefix in ["FINAL_ANSWER:", "FINAL ANSWER:", "Answer:"] {
        if let Some(rest) = text.strip_prefix(prefix) {
            return rest.trim();
        }
    }
    text
}

fn json_to_value(json: &serde_json::Value) -> Result<Value, DanaException> {
    Ok(match json {
        serde_json::Value::Null => Value::None,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::Float(n.as_f64().unwrap_or(0.0))
            }
        }
        serde_json::Value::String(s) => Value::Str(s.clone()),
        serde_json::Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(json_to_value(item)?);
            }
            Value::list(out)
        }
        serde_json::Value::Object(map) => {
            let mut out = HashMap::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), json_to_value(v)?);
            }
            Value::dict(out)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerces_numeric_string_to_int() {
        assert!(matches!(coerce_to_int(&Value::Str(" 42 ".into())), Ok(Value::Int(42))));
    }

    #[test]
    fn strips_fence_and_prefix_before_parsing_json() {
        let raw = "```json\nFINAL_ANSWER: {\"x\": 1}\n```";
        let value = coerce_llm_text(raw, &TypeDescriptor::Dict, &Registries::default()).unwrap();
        let Value::Dict(map) = value else { panic!("expected dict") };
        assert!(matches!(map.read().get("x"), Some(Value::Int(1))));
    }

    #[test]
    fn constructs_a_registered_struct_from_llm_json() {
        let registries = Registries::default();
        registries.structs.register("Point", crate::types::StructType::new("Point", vec![
            FieldDescriptor::new("x", "int", None),
            FieldDescriptor::new("y", "int", None),
        ]));
        let value = coerce_llm_text("{\"x\": 1, \"y\": 2}", &TypeDescriptor::Named("Point".into()), &registries).unwrap();
        let Value::Struct(s) = value else { panic!("expected struct") };
        assert!(matches!(s.read().get("x"), Some(Value::Int(1))));
    }

    #[test]
    fn rejects_unknown_fields_when_constructing_a_struct() {
        let registries = Registries::default();
        registries.structs.register("Point", crate::types::StructType::new("Point", vec![FieldDescriptor::new("x", "int", None)]));
        let err = coerce_llm_text("{\"x\": 1, \"z\": 2}", &TypeDescriptor::Named("Point".into()), &registries).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Coercion);
    }

    #[test]
    fn coerce_llm_text_bool_uses_the_single_smart_boolean_rule() {
        let registries = Registries::default();
        assert!(matches!(coerce_llm_text("Yes", &TypeDescriptor::Bool, &registries).unwrap(), Value::Bool(true)));
        assert!(matches!(coerce_llm_text("no", &TypeDescriptor::Bool, &registries).unwrap(), Value::Bool(false)));
    }

    #[test]
    fn numeric_pair_promotes_to_float_when_mixed() {
        let (pair,) = numeric_pair(CoercionStrategy::Enhanced, &Value::Int(2), &Value::Float(1.5)).unwrap();
        assert!(matches!(pair, NumberPair::Float(a, b) if a == 2.0 && b == 1.5));
    }
}
