//! Built‑ins installed into the global frame before a program runs.

use chrono::Utc;
use log::debug;

use crate::callable::NativeFn;
use crate::value::Value;

/// The bootstrap list: `(name, arity, implementation)`.
pub fn standard() -> Vec<(&'static str, usize, NativeFn)> {
    vec![
        ("clock", 0, clock as NativeFn),
        ("str", 1, stringify as NativeFn),
    ]
}

/// Seconds since the Unix epoch, with millisecond resolution.
fn clock(_args: &[Value]) -> Result<Value, String> {
    let millis = Utc::now().timestamp_millis();

    debug!("clock() -> {}ms", millis);

    Ok(Value::Number(millis as f64 / 1000.0))
}

/// The `print` rendering of any value, as a string.
fn stringify(args: &[Value]) -> Result<Value, String> {
    match args {
        [value] => Ok(Value::String(value.to_string())),
        _ => Err(format!("expected 1 argument, got {}", args.len())),
    }
}
