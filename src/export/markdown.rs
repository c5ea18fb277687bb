//! Markdown-with-frontmatter rendering.

use super::html::strip_html;
use crate::calendar::types::{Attendee, Event};
use crate::mail::types::MailMessage;
use chrono::{TimeZone, Utc};

/// Renders a mail message as Markdown with YAML frontmatter. Falls back
/// to `body_html` (stripped) when `body_text` is absent; emits an empty
/// body when neither is available (e.g. an `ews:` virtual message whose
/// raw body was never fetched).
pub fn export_message_markdown(message: &MailMessage) -> String {
    let date = iso8601_utc(message.date_sent_utc);
    let from = match (&message.sender_name, &message.sender_email) {
        (Some(name), Some(email)) => format!("{name} <{email}>"),
        (Some(name), None) => name.clone(),
        (None, Some(email)) => email.clone(),
        (None, None) => String::new(),
    };

    let mut frontmatter = String::new();
    frontmatter.push_str("---\n");
    frontmatter.push_str(&format!("id: {}\n", message.id));
    frontmatter.push_str("type: mail\n");
    frontmatter.push_str(&format!("subject: {}\n", yaml_scalar(&message.subject)));
    frontmatter.push_str(&format!("from: {}\n", yaml_scalar(&from)));
    frontmatter.push_str(&format!("date: {date}\n"));
    frontmatter.push_str(&format!("is_read: {}\n", message.is_read));
    frontmatter.push_str(&format!("is_flagged: {}\n", message.is_flagged));
    frontmatter.push_str(&format!("aliases: [{}]\n", message.id));
    frontmatter.push_str("---\n\n");

    let body = message
        .body_text
        .clone()
        .or_else(|| message.body_html.as_deref().map(strip_html))
        .unwrap_or_default();

    format!("{frontmatter}{body}\n")
}

/// Renders an event (plus its attendees) as Markdown with YAML
/// frontmatter.
pub fn export_event_markdown(event: &Event, attendees: &[Attendee]) -> String {
    let start = if event.is_all_day {
        date_only(event.start_utc)
    } else {
        iso8601_utc(event.start_utc)
    };
    let end = if event.is_all_day {
        date_only(event.end_utc)
    } else {
        iso8601_utc(event.end_utc)
    };

    let attendee_list: Vec<String> = attendees
        .iter()
        .map(|a| match (&a.name, &a.email) {
            (Some(name), Some(email)) => format!("{name} <{email}>"),
            (Some(name), None) => name.clone(),
            (None, Some(email)) => email.clone(),
            (None, None) => String::new(),
        })
        .collect();

    let mut frontmatter = String::new();
    frontmatter.push_str("---\n");
    frontmatter.push_str(&format!("id: {}\n", event.id));
    frontmatter.push_str("type: event\n");
    frontmatter.push_str(&format!("title: {}\n", yaml_scalar(&event.summary)));
    frontmatter.push_str(&format!("start: {start}\n"));
    frontmatter.push_str(&format!("end: {end}\n"));
    frontmatter.push_str(&format!("is_all_day: {}\n", event.is_all_day));
    frontmatter.push_str(&format!(
        "attendees: [{}]\n",
        attendee_list
            .iter()
            .map(|a| yaml_scalar(a))
            .collect::<Vec<_>>()
            .join(", ")
    ));
    if let Some(location) = &event.location {
        frontmatter.push_str(&format!("location: {}\n", yaml_scalar(location)));
    }
    frontmatter.push_str(&format!("aliases: [{}]\n", event.id));
    frontmatter.push_str("---\n\n");

    let body = event.description.clone().unwrap_or_default();

    format!("{frontmatter}{body}\n")
}

/// Quotes a YAML scalar only when it contains characters that would
/// otherwise change its meaning (colon, hash, leading/trailing space,
/// or a quote character).
fn yaml_scalar(value: &str) -> String {
    let needs_quoting = value.is_empty()
        || value.contains(':')
        || value.contains('#')
        || value.contains('"')
        || value.starts_with(' ')
        || value.ends_with(' ');
    if needs_quoting {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        value.to_string()
    }
}

fn iso8601_utc(seconds: i64) -> String {
    Utc.timestamp_opt(seconds, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_default()
}

fn date_only(seconds: i64) -> String {
    Utc.timestamp_opt(seconds, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_message() -> MailMessage {
        MailMessage {
            id: "abc123".into(),
            upstream_rowid: 1,
            message_id_header: Some("<a@b>".into()),
            subject: "Q1 budget review".into(),
            sender_name: Some("Alice".into()),
            sender_email: Some("alice@example.com".into()),
            date_sent_utc: 1_700_000_000,
            mailbox_id: "mbox1".into(),
            is_read: true,
            is_flagged: false,
            has_attachments: false,
            body_text: Some("Let's review the numbers.".into()),
            body_html: None,
            source_file_path: Some("/tmp/a.eml".into()),
            export_path: None,
            synced_at: 0,
        }
    }

    #[test]
    fn test_message_frontmatter_round_trips_id_and_subject() {
        let message = sample_message();
        let rendered = export_message_markdown(&message);
        assert!(rendered.starts_with("---\n"));
        assert!(rendered.contains("id: abc123\n"));
        assert!(rendered.contains("subject: Q1 budget review\n"));
        assert!(rendered.contains("Let's review the numbers."));
    }

    #[test]
    fn test_message_falls_back_to_stripped_html_body() {
        let mut message = sample_message();
        message.body_text = None;
        message.body_html = Some("<p>Hello <b>world</b></p>".into());
        let rendered = export_message_markdown(&message);
        assert!(rendered.contains("Hello world"));
    }

    #[test]
    fn test_subject_with_colon_is_quoted() {
        let mut message = sample_message();
        message.subject = "Re: budget".into();
        let rendered = export_message_markdown(&message);
        assert!(rendered.contains("subject: \"Re: budget\"\n"));
    }

    #[test]
    fn test_event_frontmatter_has_all_day_date_only() {
        let event = Event {
            id: "ev1".into(),
            upstream_event_id: None,
            external_id: Some("EXT-1".into()),
            calendar_id: "cal1".into(),
            summary: "Team offsite".into(),
            description: Some("Annual planning.".into()),
            location: Some("HQ".into()),
            url: None,
            start_utc: 1_700_000_000,
            end_utc: 1_700_086_400,
            start_tz: Some("UTC".into()),
            end_tz: Some("UTC".into()),
            is_all_day: true,
            recurrence_rule: None,
            master_event_id: None,
            occurrence_date_utc: None,
            status: "confirmed".into(),
            created_utc: 0,
            updated_utc: 0,
            synced_at: 0,
        };
        let rendered = export_event_markdown(&event, &[]);
        assert!(rendered.contains("title: Team offsite\n"));
        assert!(rendered.contains("is_all_day: true\n"));
        assert!(!rendered.contains("start: 2023-11-14T"));
        assert!(rendered.contains("Annual planning."));
    }
}
