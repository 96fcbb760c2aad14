//! Parsing the inbound Datastar signals payload off a query string or a
//! JSON request body (spec.md §6 "Signal wire format": "Query or body
//! carries the Datastar signals object (must include `via_ctx`)").
//!
//! The wire object always arrives nested (`{"a":{"b":1}}`); every consumer
//! below flattens it once with [`via_core::signal_value::flatten`] so the
//! rest of `via-web` deals in dotted keys the same way
//! [`via_core::Context::apply_inbound_signals`] does.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde_json::Value;
use via_core::signal_value::flatten;
use via_core::SignalValue;

/// The reserved key carrying the context id (spec.md §6).
pub const CONTEXT_KEY: &str = "via_ctx";

#[derive(Debug, Default)]
pub struct InboundSignals {
    pub context_id: Option<String>,
    pub flat: IndexMap<String, SignalValue>,
}

impl InboundSignals {
    fn from_nested(value: Value) -> Self {
        let flat = flatten(&value);
        let context_id = flat.get(CONTEXT_KEY).and_then(|v| v.as_str()).map(str::to_string);
        Self { context_id, flat }
    }

    /// `GET` requests (the SSE and action-GET forms) carry the signals
    /// object URL-encoded under a `datastar` query parameter, the
    /// convention the client library's wire contract uses for any request
    /// without a body; a bare `via_ctx` parameter is accepted too, since
    /// spec.md only requires that key be present, not how it's nested.
    pub fn from_query_params(params: &HashMap<String, String>) -> Self {
        if let Some(blob) = params.get("datastar") {
            if let Ok(value) = serde_json::from_str::<Value>(blob) {
                return Self::from_nested(value);
            }
        }
        let mut flat = IndexMap::new();
        if let Some(ctx) = params.get(CONTEXT_KEY) {
            flat.insert(CONTEXT_KEY.to_string(), Value::String(ctx.clone()));
        }
        Self {
            context_id: params.get(CONTEXT_KEY).cloned(),
            flat,
        }
    }

    /// `POST` requests (action dispatch) carry the nested signals object as
    /// the raw JSON body.
    pub fn from_body(body: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(body) {
            Ok(value) => Self::from_nested(value),
            Err(_) => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_query_params_reads_bare_via_ctx() {
        let mut params = HashMap::new();
        params.insert(CONTEXT_KEY.to_string(), "ctx-1".to_string());
        let signals = InboundSignals::from_query_params(&params);
        assert_eq!(signals.context_id.as_deref(), Some("ctx-1"));
    }

    #[test]
    fn from_query_params_reads_nested_datastar_blob() {
        let mut params = HashMap::new();
        params.insert("datastar".to_string(), r#"{"via_ctx":"ctx-2","form":{"name":"ok"}}"#.to_string());
        let signals = InboundSignals::from_query_params(&params);
        assert_eq!(signals.context_id.as_deref(), Some("ctx-2"));
        assert_eq!(signals.flat.get("form.name"), Some(&Value::String("ok".to_string())));
    }

    #[test]
    fn from_body_flattens_nested_json() {
        let body = br#"{"via_ctx":"ctx-3","counter":{"value":5}}"#;
        let signals = InboundSignals::from_body(body);
        assert_eq!(signals.context_id.as_deref(), Some("ctx-3"));
        assert_eq!(signals.flat.get("counter.value"), Some(&Value::from(5)));
    }

    #[test]
    fn from_body_tolerates_malformed_json() {
        let signals = InboundSignals::from_body(b"not json");
        assert!(signals.context_id.is_none());
        assert!(signals.flat.is_empty());
    }
}
