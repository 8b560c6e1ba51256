//! Conversions between the exception model (`error.rs`) and runtime
//! `Value`s, used by `try`/`except ... as e` bindings and `raise` (spec.md
//! §4.4 "Try/except").

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{DanaException, ErrorKind};
use crate::types::{StructInstance, Value};

/// Exposes a caught exception to DANA code as a struct-shaped value with
/// `.type`, `.message`, `.traceback`, and `.original` fields (spec.md
/// §4.4/§7 `DanaException{type, message, traceback[], original}`), rather
/// than a distinct `Value` variant — exceptions-as-values read like any
/// other struct once bound. `raise` in this grammar only ever carries a
/// message expression, not a separate raw payload, so `.original` mirrors
/// `.message`; it exists so user code that reads `e.original` (e.g. after
/// catching a broader exception and re-raising) doesn't hit a
/// field-not-found error.
pub(super) fn exception_to_value(exception: &DanaException) -> Value {
    let mut fields = HashMap::with_capacity(4);
    fields.insert("type".to_string(), Value::Str(exception.type_name.to_string()));
    fields.insert("message".to_string(), Value::Str(exception.message.clone()));
    fields.insert(
        "traceback".to_string(),
        Value::list(exception.traceback.iter().map(|loc| Value::Str(format!("line {}, col {}", loc.line, loc.column))).collect()),
    );
    fields.insert("original".to_string(), Value::Str(exception.message.clone()));
    Value::Struct(Arc::new(RwLock::new(StructInstance::new("Exception", fields))))
}

/// Maps a `raise TypeName, "message"` exception name back to an
/// `ErrorKind` so it's still catchable by kind (`except StateError:`)
/// even though it was raised by name rather than by one of
/// `DanaException`'s typed constructors. Unrecognized/custom names keep
/// the generic `Dana` kind; their distinguishing identity lives in
/// `type_name`, which `except`'s handler match compares directly.
pub(super) fn kind_for_exception_name(name: &str) -> ErrorKind {
    match name {
        "SyntaxError" => ErrorKind::Syntax,
        "NameError" => ErrorKind::Name,
        "TypeError" => ErrorKind::Type,
        "CoercionError" => ErrorKind::Coercion,
        "StateError" | "ZeroDivisionError" => ErrorKind::State,
        "ResourceError" => ErrorKind::Resource,
        "TimeoutError" => ErrorKind::Timeout,
        "CancelledError" => ErrorKind::Cancelled,
        _ => ErrorKind::Dana,
    }
}
