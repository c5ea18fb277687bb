//! Recurrence-rule validation/description.
//!
//! Expansion of a recurrence series into concrete occurrences is the
//! Source Provider's job: the provider is assumed to expand recurrences
//! into concrete occurrences. This crate only needs to read a stored
//! `recurrence_rule` string back, to decide whether it is safe to emit
//! as iCalendar export's `RRULE` field, so `rrule` is used here purely
//! to validate/parse, never to generate instances.

use rrule::RRule;
use std::str::FromStr;

/// Whether `rule` (an RFC 5545 `RRULE` value, with or without the
/// leading `RRULE:` tag) is well-formed. An event whose stored
/// `recurrence_rule` fails to parse still exports: the field is simply
/// omitted from the iCalendar output rather than emitting a malformed
/// `RRULE` line.
pub fn is_valid_recurrence_rule(rule: &str) -> bool {
    let trimmed = rule.strip_prefix("RRULE:").unwrap_or(rule);
    RRule::from_str(trimmed).is_ok()
}
