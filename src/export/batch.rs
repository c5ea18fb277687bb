//! Batch export-to-disk: writes a message's rendered Markdown under a
//! flat, idempotent filename and records the path on the mirror row
//!.

use super::{export_filename, markdown::export_message_markdown, ExportError};
use crate::mail::types::MailMessage;
use crate::store::MailStore;
use std::path::{Path, PathBuf};

/// Renders `message` to Markdown, writes it to `exports_dir/<id>.md`,
/// and records the path via `update_export_path`. Re-exporting the same
/// message overwrites the same file (idempotent).
pub async fn export_message_to_disk(
    store: &MailStore,
    exports_dir: &Path,
    message: &MailMessage,
) -> Result<PathBuf, ExportError> {
    tokio::fs::create_dir_all(exports_dir).await?;

    let filename = export_filename(&message.id, "md");
    let path = exports_dir.join(&filename);
    let rendered = export_message_markdown(message);
    tokio::fs::write(&path, rendered).await?;

    let path_str = path.to_string_lossy().to_string();
    store
        .update_export_path(&message.id, &path_str)
        .await
        .map_err(|e| ExportError::NotAvailable {
            id: message.id.clone(),
            reason: e.to_string(),
        })?;

    Ok(path)
}
