//! Line-based record format for the ledger file.
//!
//! Each line is `local_identifier,remote_id`, split on the first comma. A line
//! without a comma is an identifier-only record. Blank lines are ignored so
//! trailing newlines and hand edits do not produce phantom entries.

use super::types::LedgerEntry;

/// Whether an identifier survives a write/read cycle through this format.
pub fn is_valid_identifier(identifier: &str) -> bool {
    !identifier.is_empty() && !identifier.contains([',', '\n', '\r'])
}

/// Parse ledger text into entries in file order. Duplicates are not removed
/// here; [`super::Ledger`] applies the first-wins rule. Lines with an empty
/// identifier are skipped.
pub fn parse(text: &str) -> Vec<LedgerEntry> {
    text.lines()
        .enumerate()
        .map(|(n, line)| (n + 1, line.trim_end_matches('\r')))
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(n, line)| {
            let entry = match line.split_once(',') {
                Some((id, remote)) => LedgerEntry::new(id, remote),
                None => LedgerEntry::new(line, ""),
            };
            if entry.local_identifier.is_empty() {
                tracing::warn!(line = n, "Skipping ledger record with no identifier");
                return None;
            }
            Some(entry)
        })
        .collect()
}

/// Render the full ledger. Always ends with a newline when non-empty.
///
/// Entries with a remote id are written as `id,remote_id`, the rest as `id`.
/// Whether a new entry carries its remote id is decided when it is appended,
/// so ids recorded by earlier runs are never dropped on rewrite.
pub fn serialize(entries: &[LedgerEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&entry.local_identifier);
        if !entry.remote_id.is_empty() {
            out.push(',');
            out.push_str(&entry.remote_id);
        }
        out.push('\n');
    }
    out
}
