//! Request bodies: one object or a list of objects
//!
//! Items are checked field by field before deserialising so a client gets
//! every problem of every item in one response.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use ipam_shared_types::{AsnRequest, IpAddressRequest, PrefixRequest, PrefixStatus, VlanRequest};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Map, Value};

use crate::error::ApiError;

#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    Integer { min: i64, max: i64 },
    Text,
    Flag,
    Status,
}

impl FieldKind {
    fn check(&self, value: &Value) -> Result<(), String> {
        match self {
            FieldKind::Integer { min, max } => match value.as_i64() {
                None => Err("A valid integer is required.".to_string()),
                Some(n) if n < *min => Err(format!(
                    "Ensure this value is greater than or equal to {}.",
                    min
                )),
                Some(n) if n > *max => Err(format!(
                    "Ensure this value is less than or equal to {}.",
                    max
                )),
                Some(_) => Ok(()),
            },
            FieldKind::Text if value.is_string() => Ok(()),
            FieldKind::Text => Err("Not a valid string.".to_string()),
            FieldKind::Flag if value.is_boolean() => Ok(()),
            FieldKind::Flag => Err("Must be a valid boolean.".to_string()),
            FieldKind::Status => serde_json::from_value::<PrefixStatus>(value.clone())
                .map(|_| ())
                .map_err(|_| format!("{} is not a valid choice.", value)),
        }
    }
}

/// Shape of one item of a POST body
pub trait RequestBody: DeserializeOwned + Send + Sync {
    const FIELDS: &'static [(&'static str, FieldKind)];
    const REQUIRED: &'static [&'static str] = &[];
}

impl RequestBody for PrefixRequest {
    const FIELDS: &'static [(&'static str, FieldKind)] = &[
        ("prefix_length", FieldKind::Integer { min: 0, max: 128 }),
        ("status", FieldKind::Status),
        ("is_pool", FieldKind::Flag),
        ("tenant", FieldKind::Text),
        ("description", FieldKind::Text),
    ];
    const REQUIRED: &'static [&'static str] = &["prefix_length"];
}

impl RequestBody for IpAddressRequest {
    const FIELDS: &'static [(&'static str, FieldKind)] = &[
        ("tenant", FieldKind::Text),
        ("description", FieldKind::Text),
    ];
}

impl RequestBody for AsnRequest {
    const FIELDS: &'static [(&'static str, FieldKind)] = &[
        ("tenant", FieldKind::Text),
        ("description", FieldKind::Text),
    ];
}

impl RequestBody for VlanRequest {
    const FIELDS: &'static [(&'static str, FieldKind)] = &[
        ("vid", FieldKind::Integer { min: 1, max: 4094 }),
        ("name", FieldKind::Text),
        ("tenant", FieldKind::Text),
        ("description", FieldKind::Text),
    ];
    const REQUIRED: &'static [&'static str] = &["name"];
}

fn field_errors(field: &str, message: impl Into<String>) -> Map<String, Value> {
    let mut errors = Map::new();
    errors.insert(field.to_string(), json!([message.into()]));
    errors
}

fn parse_item<T: RequestBody>(item: Value) -> Result<T, Map<String, Value>> {
    let Value::Object(fields) = &item else {
        return Err(field_errors("non_field_errors", "Expected an object."));
    };

    let mut errors = Map::new();
    for name in T::REQUIRED {
        if fields.get(*name).map_or(true, Value::is_null) {
            errors.insert(name.to_string(), json!(["This field is required."]));
        }
    }
    for (name, kind) in T::FIELDS {
        let Some(value) = fields.get(*name).filter(|value| !value.is_null()) else {
            continue;
        };
        if let Err(message) = kind.check(value) {
            errors.insert(name.to_string(), json!([message]));
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    serde_json::from_value(item).map_err(|err| field_errors("non_field_errors", err.to_string()))
}

/// Parsed POST body, remembering whether a list was sent
#[derive(Debug, Clone, PartialEq)]
pub enum Batch<T> {
    One(T),
    Many(Vec<T>),
}

impl<T: RequestBody> Batch<T> {
    pub fn from_value(body: Value) -> Result<Self, ApiError> {
        match body {
            Value::Array(items) => {
                let mut parsed = Vec::with_capacity(items.len());
                let mut errors = Vec::with_capacity(items.len());
                for item in items {
                    match parse_item::<T>(item) {
                        Ok(request) => {
                            parsed.push(request);
                            errors.push(Map::new());
                        }
                        Err(item_errors) => errors.push(item_errors),
                    }
                }
                if parsed.len() == errors.len() {
                    Ok(Batch::Many(parsed))
                } else {
                    Err(ApiError::Validation(errors))
                }
            }
            item @ Value::Object(_) => parse_item(item)
                .map(Batch::One)
                .map_err(|errors| ApiError::Validation(vec![errors])),
            _ => Err(ApiError::BadRequest(
                "Expected an object or a list of objects".to_string(),
            )),
        }
    }

    pub fn requests(&self) -> &[T] {
        match self {
            Batch::One(request) => std::slice::from_ref(request),
            Batch::Many(requests) => requests,
        }
    }

    /// `201` with an object for an object and a list for a list
    pub fn respond<R: Serialize>(&self, records: Vec<R>) -> Response {
        match self {
            Batch::One(_) => (StatusCode::CREATED, Json(records.into_iter().next())).into_response(),
            Batch::Many(_) => (StatusCode::CREATED, Json(records)).into_response(),
        }
    }
}
