//! Naming of exported frame dumps.

use crate::trim::TrimWindow;

/// File extension of a raw panel frame dump.
pub const DUMP_EXTENSION: &str = "bin";

/// `<base>_<start>s-<end>s.bin`, trim bounds with one decimal place.
///
/// `base` is the original file name up to its first `.`, so
/// `clip.final.mp4` becomes `clip`.
pub fn dump_file_name(original_name: &str, trim: &TrimWindow) -> String {
    let file_name = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original_name);
    let base = file_name.split('.').next().unwrap_or(file_name);
    format!(
        "{base}_{:.1}s-{:.1}s.{DUMP_EXTENSION}",
        trim.start(),
        trim.end()
    )
}
