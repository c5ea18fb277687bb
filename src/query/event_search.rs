//! Event query compilation and execution: the event search surface
//! covers subject/description/location, calendar, attendee, and date
//! range.

use super::parser::{parse_date_midnight_utc, split_filter, tokenize};
use super::QueryError;
use crate::calendar::types::Event;
use crate::store::calendar_store::row_to_event;
use sqlx::sqlite::Sqlite;
use sqlx::{QueryBuilder, SqlitePool};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventQuery {
    pub calendar: Option<String>,
    pub attendee: Option<String>,
    pub after_utc: Option<i64>,
    pub before_utc: Option<i64>,
    pub free_text: String,
}

impl EventQuery {
    pub fn is_empty(&self) -> bool {
        self.calendar.is_none()
            && self.attendee.is_none()
            && self.after_utc.is_none()
            && self.before_utc.is_none()
            && self.free_text.trim().is_empty()
    }
}

/// Shares the mail query parser's tokenizer with a different
/// recognized-key table.
pub fn parse_event_query(input: &str) -> Result<EventQuery, QueryError> {
    let mut query = EventQuery::default();
    let mut free_words = Vec::new();

    for token in tokenize(input) {
        let Some(filter) = split_filter(&token) else {
            free_words.push(token);
            continue;
        };

        match filter.key.as_str() {
            "calendar" => query.calendar = Some(filter.value),
            "attendee" => query.attendee = Some(filter.value),
            "after" => {
                query.after_utc = Some(parse_date_midnight_utc(&filter.value).ok_or_else(|| {
                    QueryError::InvalidInput {
                        field: "after".into(),
                        reason: format!("invalid date '{}'", filter.value),
                    }
                })?)
            }
            "before" => {
                let midnight = parse_date_midnight_utc(&filter.value).ok_or_else(|| QueryError::InvalidInput {
                    field: "before".into(),
                    reason: format!("invalid date '{}'", filter.value),
                })?;
                query.before_utc = Some(midnight + 86_400);
            }
            "date" => {
                let midnight = parse_date_midnight_utc(&filter.value).ok_or_else(|| QueryError::InvalidInput {
                    field: "date".into(),
                    reason: format!("invalid date '{}'", filter.value),
                })?;
                query.after_utc = Some(midnight);
                query.before_utc = Some(midnight + 86_400);
            }
            _ => free_words.push(token),
        }
    }

    query.free_text = free_words.join(" ");
    Ok(query)
}

pub async fn search_events(pool: &SqlitePool, query: &EventQuery, limit: i64) -> Result<Vec<Event>, QueryError> {
    let use_fts = !query.free_text.trim().is_empty();

    let mut builder: QueryBuilder<Sqlite> = if use_fts {
        let mut b = QueryBuilder::new(
            "SELECT events.* FROM events_fts
             JOIN events ON events.rowid = events_fts.rowid
             LEFT JOIN calendars ON calendars.id = events.calendar_id
             WHERE events_fts MATCH ",
        );
        b.push_bind(query.free_text.clone());
        b
    } else {
        QueryBuilder::new(
            "SELECT events.* FROM events
             LEFT JOIN calendars ON calendars.id = events.calendar_id
             WHERE 1 = 1",
        )
    };

    if let Some(calendar) = &query.calendar {
        builder.push(" AND LOWER(calendars.title) = ");
        builder.push_bind(calendar.to_lowercase());
    }
    if let Some(attendee) = &query.attendee {
        builder.push(
            " AND EXISTS (SELECT 1 FROM attendees WHERE attendees.event_id = events.id
                AND (LOWER(attendees.name) LIKE ",
        );
        builder.push_bind(like_pattern(attendee));
        builder.push(" OR LOWER(attendees.email) LIKE ");
        builder.push_bind(like_pattern(attendee));
        builder.push("))");
    }
    if let Some(after) = query.after_utc {
        builder.push(" AND events.start_utc >= ");
        builder.push_bind(after);
    }
    if let Some(before) = query.before_utc {
        builder.push(" AND events.start_utc < ");
        builder.push_bind(before);
    }

    if use_fts {
        builder.push(" ORDER BY bm25(events_fts) LIMIT ");
    } else {
        builder.push(" ORDER BY events.start_utc ASC LIMIT ");
    }
    builder.push_bind(limit);

    let rows = builder.build().fetch_all(pool).await.map_err(QueryError::from)?;
    Ok(rows.iter().map(row_to_event).collect())
}

fn like_pattern(value: &str) -> String {
    format!("%{}%", value.to_lowercase())
}
