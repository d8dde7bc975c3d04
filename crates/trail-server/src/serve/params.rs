//! Query/body parameter parsing with field-level error collection.
//!
//! Filter parameters arrive as raw strings and are validated here, before
//! anything reaches the core. All problems for one request are collected
//! and reported together as a 422 with per-field messages.

use chrono::DateTime;
use std::str::FromStr;
use trail_core::model::entity::EntityKind;
use trail_core::page::PageRequest;

/// Accumulated field-level validation failures.
#[derive(Debug, Default)]
pub(crate) struct FieldErrors(Vec<(&'static str, String)>);

impl FieldErrors {
    pub(crate) fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push((field, message.into()));
    }

    pub(crate) const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn into_fields(self) -> Vec<(&'static str, String)> {
        self.0
    }
}

pub(crate) fn parse_u32(
    raw: Option<&str>,
    field: &'static str,
    default: u32,
    errors: &mut FieldErrors,
) -> u32 {
    match raw {
        None => default,
        Some(value) => match value.parse::<u32>() {
            Ok(parsed) if parsed > 0 => parsed,
            Ok(_) => {
                errors.push(field, "must be a positive integer");
                default
            }
            Err(_) => {
                errors.push(field, format!("'{value}' is not a positive integer"));
                default
            }
        },
    }
}

pub(crate) fn parse_flag(raw: Option<&str>, field: &'static str, errors: &mut FieldErrors) -> bool {
    match raw {
        None => false,
        Some("true" | "1") => true,
        Some("false" | "0") => false,
        Some(other) => {
            errors.push(field, format!("'{other}' is not a boolean"));
            false
        }
    }
}

/// Parse an RFC 3339 timestamp into epoch microseconds.
pub(crate) fn parse_time(
    raw: Option<&str>,
    field: &'static str,
    errors: &mut FieldErrors,
) -> Option<i64> {
    let value = raw?;
    match DateTime::parse_from_rfc3339(value) {
        Ok(ts) => Some(ts.timestamp_micros()),
        Err(_) => {
            errors.push(field, format!("'{value}' is not an RFC 3339 timestamp"));
            None
        }
    }
}

/// Parse `page`/`per_page`, applying the configured default and ceiling.
pub(crate) fn parse_page(
    page_raw: Option<&str>,
    per_page_raw: Option<&str>,
    default_per_page: u32,
    max_per_page: u32,
    errors: &mut FieldErrors,
) -> PageRequest {
    let page = parse_u32(page_raw, "page", 1, errors);
    let per_page = parse_u32(per_page_raw, "per_page", default_per_page, errors);
    PageRequest::new(page, per_page.min(max_per_page))
}

pub(crate) fn parse_kind(
    raw: Option<&str>,
    field: &'static str,
    errors: &mut FieldErrors,
) -> Option<EntityKind> {
    let value = raw?;
    match EntityKind::from_str(value) {
        Ok(kind) => Some(kind),
        Err(error) => {
            errors.push(field, error.to_string());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FieldErrors, parse_flag, parse_kind, parse_time, parse_u32};
    use trail_core::model::entity::EntityKind;

    #[test]
    fn absent_values_use_defaults_without_errors() {
        let mut errors = FieldErrors::default();
        assert_eq!(parse_u32(None, "per_page", 15, &mut errors), 15);
        assert!(!parse_flag(None, "include_deleted", &mut errors));
        assert_eq!(parse_time(None, "since", &mut errors), None);
        assert_eq!(parse_kind(None, "entity_kind", &mut errors), None);
        assert!(errors.is_empty());
    }

    #[test]
    fn bad_values_collect_field_messages() {
        let mut errors = FieldErrors::default();
        parse_u32(Some("abc"), "per_page", 15, &mut errors);
        parse_u32(Some("0"), "page", 1, &mut errors);
        parse_flag(Some("maybe"), "include_deleted", &mut errors);
        parse_time(Some("yesterday"), "since", &mut errors);
        parse_kind(Some("campaign"), "entity_kind", &mut errors);
        assert_eq!(errors.into_fields().len(), 5);
    }

    #[test]
    fn good_values_parse() {
        let mut errors = FieldErrors::default();
        assert_eq!(parse_u32(Some("25"), "per_page", 15, &mut errors), 25);
        assert!(parse_flag(Some("true"), "include_deleted", &mut errors));
        assert_eq!(
            parse_time(Some("2026-01-02T03:04:05Z"), "since", &mut errors),
            Some(1_767_323_045_000_000)
        );
        assert_eq!(
            parse_kind(Some("briefs"), "entity_kind", &mut errors),
            Some(EntityKind::Brief)
        );
        assert!(errors.is_empty());
    }
}
