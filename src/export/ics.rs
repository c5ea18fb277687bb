//! iCalendar (RFC 5545) rendering.
//!
//! One `VCALENDAR` containing one `VEVENT` per row. `UID` is the external
//! identifier when available, else the public ID, so an exported file
//! round-trips against a calendar client that already knows the event.

use crate::calendar::recurrence::is_valid_recurrence_rule;
use crate::calendar::types::{Attendee, Event};
use chrono::{TimeZone, Utc};
use icalendar::{Calendar, Component, Event as IcalEvent, EventLike};
use tracing::warn;

/// Renders a single event (with its attendees) as one `VCALENDAR` /
/// `VEVENT` pair.
pub fn export_event_ics(event: &Event, attendees: &[Attendee]) -> String {
    let mut calendar = Calendar::new();
    calendar.push(render_vevent(event, attendees));
    calendar.to_string()
}

/// Renders a batch of events as one `VCALENDAR` with one `VEVENT` per
/// row.
pub fn export_events_ics<'a>(events: impl IntoIterator<Item = (&'a Event, &'a [Attendee])>) -> String {
    let mut calendar = Calendar::new();
    for (event, attendees) in events {
        calendar.push(render_vevent(event, attendees));
    }
    calendar.to_string()
}

fn render_vevent(event: &Event, attendees: &[Attendee]) -> IcalEvent {
    let mut ical_event = IcalEvent::new();

    let uid = event.external_id.clone().unwrap_or_else(|| event.id.clone());
    ical_event.uid(&uid);
    ical_event.summary(&event.summary);
    ical_event.timestamp(Utc::now());

    if event.is_all_day {
        ical_event.add_property("DTSTART;VALUE=DATE", &yyyymmdd(event.start_utc));
        ical_event.add_property("DTEND;VALUE=DATE", &yyyymmdd(event.end_utc));
    } else {
        ical_event.starts(to_utc(event.start_utc));
        ical_event.ends(to_utc(event.end_utc));
    }

    if let Some(description) = &event.description {
        ical_event.description(description);
    }
    if let Some(location) = &event.location {
        ical_event.location(location);
    }
    if let Some(rrule) = &event.recurrence_rule {
        if is_valid_recurrence_rule(rrule) {
            ical_event.add_property("RRULE", rrule);
        } else {
            warn!(event = %event.id, rule = %rrule, "dropping malformed recurrence rule from export");
        }
    }

    let status = match event.status.to_lowercase().as_str() {
        "confirmed" => Some("CONFIRMED"),
        "tentative" => Some("TENTATIVE"),
        "cancelled" | "canceled" => Some("CANCELLED"),
        _ => None,
    };
    if let Some(status) = status {
        ical_event.add_property("STATUS", status);
    }

    if let Some(organizer) = attendees.iter().find(|a| a.is_organizer) {
        if let Some(email) = &organizer.email {
            ical_event.add_property("ORGANIZER", &format!("mailto:{email}"));
        }
    }

    for attendee in attendees.iter().filter(|a| !a.is_organizer) {
        if let Some(email) = &attendee.email {
            let partstat = match attendee.response_status.to_lowercase().as_str() {
                "accepted" => "ACCEPTED",
                "declined" => "DECLINED",
                "tentative" => "TENTATIVE",
                _ => "NEEDS-ACTION",
            };
            ical_event.add_property(
                "ATTENDEE",
                &format!("CN={}:mailto:{email}", attendee.name.as_deref().unwrap_or(email)),
            );
            ical_event.add_property("PARTSTAT", partstat);
        }
    }

    ical_event
}

fn to_utc(seconds: i64) -> chrono::DateTime<Utc> {
    Utc.timestamp_opt(seconds, 0).single().unwrap_or_else(Utc::now)
}

fn yyyymmdd(seconds: i64) -> String {
    to_utc(seconds).format("%Y%m%d").to_string()
}
