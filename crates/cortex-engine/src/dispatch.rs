//! Request messages in, JSON values out.

use crate::agent::Agent;
use crate::runtime::RuntimeError;
use cortex_common::protocol::{
    ClickAction, ExecutableAction, Locator, Request, TargetHints, TypeAction,
};
use cortex_parser::{build_action, classify, parse, rewrite_candidates};
use serde_json::{Value, json};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] serde_json::Error),

    #[error("Could not parse command: {0}")]
    Unparsed(String),

    #[error("Request needs a selector or a field, name, label or placeholder")]
    MissingTarget,

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Handle one request. Failures come back as `{ "error": "..." }`.
pub async fn handle_request(agent: &Agent, request: Request) -> Value {
    match dispatch(agent, request).await {
        Ok(value) => value,
        Err(e) => json!({ "error": e.to_string() }),
    }
}

/// Handle one request encoded as JSON text.
pub async fn handle_json(agent: &Agent, message: &str) -> Value {
    match serde_json::from_str::<Request>(message) {
        Ok(request) => handle_request(agent, request).await,
        Err(e) => json!({ "error": DispatchError::from(e).to_string() }),
    }
}

async fn dispatch(agent: &Agent, request: Request) -> Result<Value, DispatchError> {
    match request {
        Request::ExecuteNaturalCommand { command, persona } => {
            let result = agent.run(&command, persona.as_deref()).await;
            Ok(serde_json::to_value(result)?)
        }
        Request::ParseCommand { command } => parse_only(&command),
        Request::ClickElement(req) => {
            let action = ExecutableAction::Click(ClickAction {
                target: None,
                locator: explicit_locator(req.selector, req.hints)?,
                use_context: false,
            });
            let outcome = agent.run_action(&action, None).await?;
            Ok(json!({ "ok": true, "outcome": outcome }))
        }
        Request::TypeText(req) => {
            let action = ExecutableAction::Type(TypeAction {
                target: None,
                locator: explicit_locator(req.selector, req.hints)?,
                value: Some(req.text),
                copy_from: None,
            });
            let outcome = agent.run_action(&action, None).await?;
            Ok(json!({ "ok": true, "outcome": outcome }))
        }
    }
}

fn parse_only(command: &str) -> Result<Value, DispatchError> {
    let (parsed, canonical) = match parse(command) {
        Some(parsed) => (parsed, None),
        None => rewrite_candidates(command)
            .into_iter()
            .find_map(|c| parse(&c).map(|p| (p, Some(c))))
            .ok_or_else(|| DispatchError::Unparsed(command.to_string()))?,
    };
    Ok(json!({
        "parsed": parsed,
        "action": build_action(&parsed),
        "repaired": canonical.is_some(),
        "canonicalCommand": canonical,
        "classification": classify(command),
    }))
}

fn explicit_locator(
    selector: Option<String>,
    hints: TargetHints,
) -> Result<Locator, DispatchError> {
    let selectors: Vec<String> = selector
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .into_iter()
        .collect();
    if selectors.is_empty() && hints.is_empty() {
        return Err(DispatchError::MissingTarget);
    }
    Ok(Locator { selectors, hints })
}
