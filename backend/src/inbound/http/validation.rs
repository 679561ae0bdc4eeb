//! Shared validation helpers for inbound HTTP adapters.
//!
//! Extractor failures (malformed JSON, query strings, and path segments) are
//! funnelled through the handlers below so every rejection renders the same
//! `invalid_param` envelope as hand-written validation.

use std::str::FromStr;

use actix_web::error::{JsonPayloadError, PathError, QueryPayloadError};
use actix_web::{HttpRequest, web};
use serde_json::json;

use crate::domain::Error;

/// Validation error codes reported in `details.code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ValidationCode {
    InvalidUuid,
    OutOfRange,
    Malformed,
    InvalidChoice,
}

impl ValidationCode {
    const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidUuid => "invalid_uuid",
            Self::OutOfRange => "out_of_range",
            Self::Malformed => "malformed",
            Self::InvalidChoice => "invalid_choice",
        }
    }
}

/// Newtype wrapper for HTTP field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    const fn as_str(self) -> &'static str {
        self.0
    }
}

pub(crate) fn field_error(
    field: FieldName,
    code: ValidationCode,
    message: impl Into<String>,
) -> Error {
    Error::invalid_param(message).with_details(json!({
        "field": field.as_str(),
        "code": code.as_str(),
    }))
}

pub(crate) fn invalid_uuid_error(field: FieldName, value: &str) -> Error {
    let name = field.as_str();
    Error::invalid_param(format!("{name} must be a valid UUID")).with_details(json!({
        "field": name,
        "value": value,
        "code": ValidationCode::InvalidUuid.as_str(),
    }))
}

/// Parse an identifier newtype, reporting the offending field on failure.
pub(crate) fn parse_id<T: FromStr>(value: &str, field: FieldName) -> Result<T, Error> {
    value.parse().map_err(|_| invalid_uuid_error(field, value))
}

fn malformed(source: &'static str, reason: impl std::fmt::Display) -> Error {
    Error::invalid_param(format!("malformed {source}: {reason}")).with_details(json!({
        "field": source,
        "code": ValidationCode::Malformed.as_str(),
    }))
}

fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    malformed("body", err).into()
}

fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    malformed("query", err).into()
}

fn path_error_handler(err: PathError, _req: &HttpRequest) -> actix_web::Error {
    malformed("path", err).into()
}

/// Extractor configuration mapping malformed input onto `invalid_param`.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(json_error_handler)
}

/// Query string configuration mapping malformed input onto `invalid_param`.
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(query_error_handler)
}

/// Path configuration mapping malformed segments onto `invalid_param`.
pub fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(path_error_handler)
}
