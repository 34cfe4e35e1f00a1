//! Human-readable rendering of execution results for the CLI.

use crate::runtime::BatchOutcome;
use cortex_common::protocol::ExecutionResult;
use serde_json::Value;

const SENSITIVE_FIELDS: &[&str] = &[
    "password",
    "passcode",
    "secret",
    "token",
    "cvv",
    "cvc",
    "ssn",
    "social security",
    "card number",
    "credit card",
    "pin",
];

const MASK: &str = "••••••••";

pub fn format_result(result: &ExecutionResult) -> String {
    if !result.ok {
        let tried: Vec<&str> = result.attempted.iter().map(|k| k.as_str()).collect();
        return format!(
            "Error: {} (tried {})",
            result.error.as_deref().unwrap_or("unknown error"),
            tried.join(", ")
        );
    }

    let executor = result.executor.map(|k| k.as_str()).unwrap_or("?");
    let mut output = format!(
        "[{}] {} ({}ms)",
        executor,
        describe(&result.result),
        result.duration_ms
    );

    if result.result.get("repaired").and_then(Value::as_bool) == Some(true) {
        let canonical = result
            .result
            .get("canonicalCommand")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let path = result
            .result
            .get("recoveryPath")
            .and_then(Value::as_str)
            .unwrap_or_default();
        output.push_str(&format!("\nUnderstood as \"{}\" (via {})", canonical, path));
    }
    output
}

pub fn format_batch(batch: &BatchOutcome) -> String {
    match (&batch.failed_at, &batch.error) {
        (Some(index), Some(error)) => format!(
            "Stopped at action {} after {} completed: {}",
            index + 1,
            batch.completed.len(),
            error
        ),
        _ => format!("Completed {} actions.", batch.completed.len()),
    }
}

fn describe(result: &Value) -> String {
    match result.get("action") {
        // first tier: a full action plus the runtime outcome
        Some(Value::Object(_)) => describe_action(result),
        Some(Value::String(kind)) => {
            let mut text = kind.replace('_', " ");
            if let Some(filled) = result.get("filled").and_then(Value::as_array) {
                text.push_str(&format!(": {} fields", filled.len()));
            }
            if let Some(kind) = result.get("kind").and_then(Value::as_str) {
                text.push_str(&format!(" [{}]", kind));
            }
            if let Some(element) = result.get("element") {
                text.push_str(&format!(" #{}", element));
            }
            if let Some(remaining) = result.get("remaining") {
                text.push_str(&format!(", {} remaining", remaining));
            }
            if let Some(no_submit) = result.get("noSubmit").and_then(Value::as_bool) {
                text.push_str(if no_submit { ": submit off" } else { ": submit on" });
            }
            text
        }
        _ => "done".to_string(),
    }
}

fn describe_action(result: &Value) -> String {
    let action = &result["action"];
    let outcome = &result["outcome"];
    let kind = action["type"].as_str().unwrap_or("action");
    let target = action["target"]
        .as_str()
        .or(action["url"].as_str())
        .unwrap_or_default();

    let mut text = if target.is_empty() {
        kind.to_string()
    } else {
        format!("{} {}", kind, target)
    };
    if let Some(value) = outcome["value"].as_str()
        && kind == "type"
    {
        text.push_str(&format!(" = \"{}\"", mask_sensitive(value, target)));
    }
    if let Some(by) = outcome["resolvedBy"].as_str() {
        text.push_str(&format!(" (by {})", by));
    }
    text
}

/// Mask `value` when `field_name` looks like it holds a secret.
pub fn mask_sensitive(value: &str, field_name: &str) -> String {
    let field = field_name.to_lowercase().replace(['_', '-'], " ");
    let is_sensitive = SENSITIVE_FIELDS.iter().any(|f| {
        field == *f
            || field.starts_with(&format!("{} ", f))
            || field.ends_with(&format!(" {}", f))
            || field.contains(&format!(" {} ", f))
            || (f.len() > 3 && field.contains(f))
    });

    if is_sensitive {
        MASK.to_string()
    } else {
        value.to_string()
    }
}
