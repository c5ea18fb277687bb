//! Identity engine.
//!
//! Chooses a stable public ID per entity and reconciles upstream
//! identities that drift between syncs, a known property of upstream
//! calendar stores, which may assign or rewrite their own identifiers
//! post-facto after a server sync. Downstream references (agents,
//! exports, cross-system links) treat the public ID as a foreign key;
//! once chosen it is never rewritten.

use sha2::{Digest, Sha256};

/// The up-to-three identifiers an upstream calendar store can hand back
/// for the same event: its identity triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventIdentity {
    pub local_id: Option<String>,
    pub external_id: Option<String>,
    pub calendar_upstream_id: String,
}

/// Result of comparing a stored identity triple against the identity
/// triple seen on the current sync pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    Match,
    ExternalIdChanged,
    LocalIdChanged,
    BothChanged,
    New,
    NotFound,
}

/// Default tolerance for the content-match fallback.
pub const DEFAULT_CONTENT_MATCH_TOLERANCE_SECS: i64 = 60;

pub struct IdentityEngine;

impl IdentityEngine {
    /// Truncates a SHA-256 digest to 128 bits of lowercase hex (32 chars),
    /// the public-ID format for hash-derived IDs.
    fn hash128(input: &str) -> String {
        let digest = Sha256::digest(input.as_bytes());
        hex::encode(&digest[..16])
    }

    fn normalize(id: &str) -> Option<String> {
        let trimmed = id.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    /// Chooses the public ID for an event.
    ///
    /// Priority: a normalized external identifier wins outright for a
    /// master/non-recurring event; for a recurring instance the external
    /// identifier is combined with `occurrence_utc` so each instance gets
    /// a distinct but deterministic ID. Absent an external identifier,
    /// falls back to a content hash of calendar + summary + start (+
    /// occurrence).
    pub fn event_public_id(
        calendar_id: &str,
        summary: &str,
        start_utc: i64,
        occurrence_utc: Option<i64>,
        external_id: Option<&str>,
    ) -> String {
        if let Some(normalized) = external_id.and_then(Self::normalize) {
            return match occurrence_utc {
                Some(occ) => Self::hash128(&format!("ext:{normalized}|occ:{occ}")),
                None => normalized,
            };
        }

        let mut canonical = format!(
            "cal:{calendar_id}|sum:{}|start:{start_utc}",
            summary.trim()
        );
        if let Some(occ) = occurrence_utc {
            canonical.push_str(&format!("|occ:{occ}"));
        }
        Self::hash128(&canonical)
    }

    /// Chooses the public ID for a mail message: the `Message-Id` header
    /// is the natural stable key; when absent (some upstream stores never
    /// populate it) the mailbox-scoped upstream row ID stands in.
    pub fn mail_message_public_id(
        mailbox_id: &str,
        message_id_header: Option<&str>,
        upstream_rowid: i64,
    ) -> String {
        match message_id_header.and_then(Self::normalize) {
            Some(mid) => Self::hash128(&format!("mbox:{mailbox_id}|mid:{mid}")),
            None => Self::hash128(&format!("mbox:{mailbox_id}|rowid:{upstream_rowid}")),
        }
    }

    /// Chooses the public ID for a reminder: reminders carry a single
    /// stable upstream identifier with no separate local/external split
    ///, so the hash is a direct wrap.
    pub fn reminder_public_id(upstream_id: &str) -> String {
        Self::hash128(&format!("reminder:{upstream_id}"))
    }

    /// Classifies the relationship between a previously stored identity
    /// triple and the one observed on this sync pass.
    pub fn reconcile(stored: Option<&EventIdentity>, current: &EventIdentity) -> Reconciliation {
        let Some(stored) = stored else {
            return Reconciliation::New;
        };

        let external_changed = stored.external_id != current.external_id;
        let local_changed = stored.local_id != current.local_id;

        match (external_changed, local_changed) {
            (false, false) => Reconciliation::Match,
            (true, false) => Reconciliation::ExternalIdChanged,
            (false, true) => Reconciliation::LocalIdChanged,
            (true, true) => Reconciliation::BothChanged,
        }
    }

    /// Content-match fallback used only when no identifier on either side
    /// matches. Protects against the upstream swapping every identifier
    /// at once during first server sync.
    pub fn content_match(
        stored_summary: &str,
        stored_start_utc: i64,
        current_summary: &str,
        current_start_utc: i64,
        tolerance_secs: i64,
    ) -> bool {
        stored_summary.trim().to_lowercase() == current_summary.trim().to_lowercase()
            && (stored_start_utc - current_start_utc).abs() <= tolerance_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_id_deterministic() {
        let a = IdentityEngine::event_public_id("cal1", "Standup", 1000, None, None);
        let b = IdentityEngine::event_public_id("cal1", "Standup", 1000, None, None);
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_external_id_wins_when_present() {
        let id = IdentityEngine::event_public_id("cal1", "Standup", 1000, None, Some("EXT-1"));
        assert_eq!(id, "EXT-1");
    }

    #[test]
    fn test_recurring_instances_distinct_but_deterministic() {
        let a = IdentityEngine::event_public_id("cal1", "Standup", 1000, Some(1000), Some("EXT-1"));
        let b = IdentityEngine::event_public_id("cal1", "Standup", 1000, Some(2000), Some("EXT-1"));
        let a_again = IdentityEngine::event_public_id("cal1", "Standup", 1000, Some(1000), Some("EXT-1"));
        assert_ne!(a, b);
        assert_eq!(a, a_again);
    }

    #[test]
    fn test_reconcile_both_changed() {
        let stored = EventIdentity {
            local_id: Some("L-1".into()),
            external_id: Some("EXT-1".into()),
            calendar_upstream_id: "cal1".into(),
        };
        let current = EventIdentity {
            local_id: Some("L-2".into()),
            external_id: Some("EXT-2".into()),
            calendar_upstream_id: "cal1".into(),
        };
        assert_eq!(
            IdentityEngine::reconcile(Some(&stored), &current),
            Reconciliation::BothChanged
        );
    }

    #[test]
    fn test_reconcile_new_when_no_stored_identity() {
        let current = EventIdentity {
            local_id: Some("L-1".into()),
            external_id: None,
            calendar_upstream_id: "cal1".into(),
        };
        assert_eq!(IdentityEngine::reconcile(None, &current), Reconciliation::New);
    }

    #[test]
    fn test_content_match_tolerance() {
        assert!(IdentityEngine::content_match("Standup", 1000, "standup", 1030, 60));
        assert!(!IdentityEngine::content_match("Standup", 1000, "standup", 1100, 60));
        assert!(!IdentityEngine::content_match("Standup", 1000, "Retro", 1000, 60));
    }

    #[test]
    fn test_mail_message_public_id_falls_back_to_rowid() {
        let with_mid = IdentityEngine::mail_message_public_id("mbox1", Some("<abc@x>"), 42);
        let without_mid = IdentityEngine::mail_message_public_id("mbox1", None, 42);
        assert_ne!(with_mid, without_mid);
        assert_eq!(
            IdentityEngine::mail_message_public_id("mbox1", None, 42),
            IdentityEngine::mail_message_public_id("mbox1", None, 42)
        );
    }

    #[test]
    fn test_reminder_public_id_deterministic() {
        let a = IdentityEngine::reminder_public_id("rem-1");
        let b = IdentityEngine::reminder_public_id("rem-1");
        let c = IdentityEngine::reminder_public_id("rem-2");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 32);
    }
}
