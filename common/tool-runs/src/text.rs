//! Output truncation and file previews

use std::path::Path;

use tokio::io::AsyncReadExt;

/// Appended to any text cut at a character limit
pub const TRUNCATION_MARKER: &str = "\n...(truncated)...\n";

/// Cut `text` to at most `max_chars` characters, appending the marker if cut
pub fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((byte_idx, _)) => {
            let mut cut = String::with_capacity(byte_idx + TRUNCATION_MARKER.len());
            cut.push_str(&text[..byte_idx]);
            cut.push_str(TRUNCATION_MARKER);
            cut
        }
    }
}

/// Read a size-bounded text preview of a file's current contents.
///
/// At most `4 * max_chars` bytes (plus slack for one partial character) are
/// read. Read failures are returned inline rather than as errors.
pub async fn read_preview(path: &Path, max_chars: usize) -> String {
    let byte_budget = max_chars.saturating_mul(4).saturating_add(4) as u64;

    let file = match tokio::fs::File::open(path).await {
        Ok(file) => file,
        Err(e) => return format!("(error reading {}: {})", path.display(), e),
    };

    let mut buf = Vec::new();
    if let Err(e) = file.take(byte_budget).read_to_end(&mut buf).await {
        return format!("(error reading {}: {})", path.display(), e);
    }

    truncate(&String::from_utf8_lossy(&buf), max_chars)
}
