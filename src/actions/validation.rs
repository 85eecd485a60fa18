//! Parameter validation and coercion against an action's [`ParamSpec`]s.
//!
//! Model output is loosely typed: the key/value directive form yields only
//! strings, and JSON payloads mix numbers and numeric strings freely. Before
//! dispatch every declared parameter is checked and coerced to a canonical
//! JSON shape so executors can read it without re-parsing:
//!
//! | type          | canonical form                  | accepted input                          |
//! |---------------|---------------------------------|-----------------------------------------|
//! | `string`      | string                          | string, number, boolean                 |
//! | `integer`     | integer                         | integer, numeric string                 |
//! | `boolean`     | boolean                         | boolean, `true/false/yes/no/1/0`        |
//! | `datetime`    | RFC 3339 string (UTC)           | RFC 3339, `YYYY-MM-DDTHH:MM[:SS]`, date |
//! | `string_list` | array of strings                | array, comma/semicolon-separated string |
//!
//! Extra parameters not in the spec are passed through untouched.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;

use super::types::{ActionDescriptor, ActionError, ActionParams, ParamType};

/// Validate `params` against `descriptor` and return the coerced map.
///
/// # Errors
///
/// Returns [`ActionError::InvalidParams`] when a required parameter is
/// missing or blank, or a value cannot be coerced to its declared type.
pub fn validate_params(
    descriptor: &ActionDescriptor,
    params: &ActionParams,
) -> Result<ActionParams, ActionError> {
    let mut out = params.clone();
    for spec in &descriptor.params {
        let present = params.get(&spec.name).filter(|v| !is_blank(v));
        match present {
            None if spec.required => {
                return Err(ActionError::InvalidParams(format!(
                    "action '{}': missing required parameter '{}'",
                    descriptor.name, spec.name
                )));
            }
            None => {
                out.remove(&spec.name);
            }
            Some(value) => {
                let coerced = coerce(spec.ty, value).ok_or_else(|| {
                    ActionError::InvalidParams(format!(
                        "action '{}': parameter '{}' expected {}, got {}",
                        descriptor.name,
                        spec.name,
                        spec.ty,
                        json_type_name(value)
                    ))
                })?;
                out.insert(spec.name.clone(), coerced);
            }
        }
    }
    Ok(out)
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn coerce(ty: ParamType, value: &Value) -> Option<Value> {
    match ty {
        ParamType::String => match value {
            Value::String(s) => Some(Value::String(s.clone())),
            Value::Number(n) => Some(Value::String(n.to_string())),
            Value::Bool(b) => Some(Value::String(b.to_string())),
            _ => None,
        },
        ParamType::Integer => match value {
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(value.clone()),
            Value::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
            _ => None,
        },
        ParamType::Boolean => match value {
            Value::Bool(_) => Some(value.clone()),
            Value::String(s) => parse_bool(s).map(Value::Bool),
            Value::Number(n) => match n.as_i64() {
                Some(0) => Some(Value::Bool(false)),
                Some(1) => Some(Value::Bool(true)),
                _ => None,
            },
            _ => None,
        },
        ParamType::DateTime => value
            .as_str()
            .and_then(parse_datetime)
            .map(|dt| Value::String(dt.to_rfc3339_opts(SecondsFormat::Secs, true))),
        ParamType::StringList => match value {
            Value::Array(items) => items
                .iter()
                .map(|v| match v {
                    Value::String(s) => Some(Value::String(s.trim().to_owned())),
                    _ => None,
                })
                .collect::<Option<Vec<_>>>()
                .map(Value::Array),
            Value::String(s) => Some(Value::Array(
                s.split([',', ';'])
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(|p| Value::String(p.to_owned()))
                    .collect(),
            )),
            _ => None,
        },
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" | "on" => Some(true),
        "false" | "no" | "n" | "0" | "off" => Some(false),
        _ => None,
    }
}

/// Parse the datetime forms accepted from the model. Naive values are UTC.
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                "integer"
            } else {
                "number"
            }
        }
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ─── Typed accessors for executors ───────────────────────────────────────────

/// Required string parameter.
pub fn required_str<'a>(params: &'a ActionParams, name: &str) -> Result<&'a str, ActionError> {
    optional_str(params, name)
        .ok_or_else(|| ActionError::InvalidParams(format!("missing parameter '{name}'")))
}

/// Optional non-blank string parameter.
pub fn optional_str<'a>(params: &'a ActionParams, name: &str) -> Option<&'a str> {
    params
        .get(name)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// String list parameter; absent means empty.
pub fn string_list(params: &ActionParams, name: &str) -> Vec<String> {
    match params.get(name) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_owned)
            .collect(),
        Some(Value::String(s)) => s
            .split([',', ';'])
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_owned)
            .collect(),
        _ => Vec::new(),
    }
}

/// Optional non-negative integer parameter.
pub fn optional_u64(params: &ActionParams, name: &str) -> Option<u64> {
    params.get(name).and_then(Value::as_u64)
}

/// Optional boolean parameter.
pub fn optional_bool(params: &ActionParams, name: &str) -> Option<bool> {
    params.get(name).and_then(Value::as_bool)
}

/// Required datetime parameter.
pub fn required_datetime(params: &ActionParams, name: &str) -> Result<DateTime<Utc>, ActionError> {
    optional_datetime(params, name)
        .ok_or_else(|| ActionError::InvalidParams(format!("missing or invalid datetime '{name}'")))
}

/// Optional datetime parameter.
pub fn optional_datetime(params: &ActionParams, name: &str) -> Option<DateTime<Utc>> {
    optional_str(params, name).and_then(parse_datetime)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::actions::types::{ActionExecutor, ActionOutput, ActionResult, ParamSpec};

    struct Noop;

    #[async_trait]
    impl ActionExecutor for Noop {
        async fn execute(&self, _params: &ActionParams) -> ActionResult {
            Ok(ActionOutput::default())
        }
    }

    fn descriptor() -> ActionDescriptor {
        ActionDescriptor::new("create_event", "Create an event", Arc::new(Noop))
            .param(ParamSpec::required("subject", ParamType::String, ""))
            .param(ParamSpec::required("start", ParamType::DateTime, ""))
            .param(ParamSpec::optional("attendees", ParamType::StringList, ""))
            .param(ParamSpec::optional("reminder", ParamType::Integer, ""))
            .param(ParamSpec::optional("online", ParamType::Boolean, ""))
    }

    fn params(value: Value) -> ActionParams {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn missing_required_parameter_is_rejected() {
        let err = validate_params(&descriptor(), &params(json!({"subject": "Sync"}))).unwrap_err();
        assert!(matches!(err, ActionError::InvalidParams(ref m) if m.contains("'start'")));
    }

    #[test]
    fn blank_required_parameter_counts_as_missing() {
        let p = params(json!({"subject": "  ", "start": "2026-03-01T09:00"}));
        assert!(validate_params(&descriptor(), &p).is_err());
    }

    #[test]
    fn string_values_are_coerced() {
        let p = params(json!({
            "subject": "Sync",
            "start": "2026-03-01T09:00",
            "attendees": "a@x.com, b@x.com",
            "reminder": "15",
            "online": "yes",
            "extra": "kept"
        }));
        let out = validate_params(&descriptor(), &p).unwrap();
        assert_eq!(out["start"], json!("2026-03-01T09:00:00Z"));
        assert_eq!(out["attendees"], json!(["a@x.com", "b@x.com"]));
        assert_eq!(out["reminder"], json!(15));
        assert_eq!(out["online"], json!(true));
        assert_eq!(out["extra"], json!("kept"));
    }

    #[test]
    fn wrong_type_is_rejected_with_type_names() {
        let p = params(json!({"subject": "Sync", "start": "2026-03-01", "reminder": "soon"}));
        let err = validate_params(&descriptor(), &p).unwrap_err();
        assert_eq!(
            err,
            ActionError::InvalidParams(
                "action 'create_event': parameter 'reminder' expected integer, got string"
                    .to_owned()
            )
        );
    }

    #[test]
    fn datetime_accepts_offsets_and_dates() {
        let utc = parse_datetime("2026-03-01T10:00:00+01:00").unwrap();
        assert_eq!(utc.to_rfc3339(), "2026-03-01T09:00:00+00:00");
        assert!(parse_datetime("2026-03-01").is_some());
        assert!(parse_datetime("next tuesday").is_none());
    }

    #[test]
    fn accessors_read_coerced_values() {
        let p = params(json!({"to": ["a@x.com"], "n": 3, "flag": false, "s": " hi "}));
        assert_eq!(string_list(&p, "to"), vec!["a@x.com".to_owned()]);
        assert_eq!(optional_u64(&p, "n"), Some(3));
        assert_eq!(optional_bool(&p, "flag"), Some(false));
        assert_eq!(required_str(&p, "s").unwrap(), "hi");
        assert!(required_str(&p, "missing").is_err());
    }
}
