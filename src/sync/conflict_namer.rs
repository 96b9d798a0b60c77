use chrono::{DateTime, Utc};

use crate::ext::ModTime;

/// How many names are tried before giving up on a conflict copy.
pub const MAX_ATTEMPTS: usize = 100;

/// Builds names for the two versions of a file changed on both sides.
pub struct ConflictNamer;

impl ConflictNamer {
    /// UTC rendering of a modification time, `YYYY-MM-DD-HH-MM-SS-micros`.
    pub fn timestamp(modified: ModTime) -> String {
        let micros = (modified.into_inner() * 1_000_000.0).round() as i64;
        DateTime::<Utc>::from_timestamp_micros(micros)
            .unwrap_or(DateTime::UNIX_EPOCH)
            .format("%Y-%m-%d-%H-%M-%S-%6f")
            .to_string()
    }

    /// `report.txt` becomes `report_<timestamp>.txt`, and
    /// `report_<timestamp>_<attempt>.txt` on later attempts.
    pub fn generate(original_name: &str, timestamp: &str, attempt: usize) -> String {
        let (stem, extension) = match original_name.rfind('.') {
            Some(dot_pos) if dot_pos > 0 => original_name.split_at(dot_pos),
            _ => (original_name, ""),
        };

        if attempt == 0 {
            format!("{stem}_{timestamp}{extension}")
        } else {
            format!("{stem}_{timestamp}_{attempt}{extension}")
        }
    }

    /// First generated name for which `taken` is false, or `None` once
    /// [`MAX_ATTEMPTS`] names were rejected.
    pub fn generate_unique<F>(original_name: &str, modified: ModTime, mut taken: F) -> Option<String>
    where
        F: FnMut(&str) -> bool,
    {
        let timestamp = Self::timestamp(modified);
        (0..MAX_ATTEMPTS)
            .map(|attempt| Self::generate(original_name, &timestamp, attempt))
            .find(|candidate| !taken(candidate))
    }
}
