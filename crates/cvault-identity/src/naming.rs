//! Display names for duplicate uploads.

/// Insert ` (sequence)` before the extension of `name`.
///
/// Only the last dot-delimited segment counts as the extension. A leading dot
/// (`.profile`) does not start an extension, and names without one get the
/// suffix appended.
pub fn sequenced_name(name: &str, sequence: u32) -> String {
  let base_start = name.rfind(['/', '\\']).map_or(0, |i| i + 1);
  match name.rfind('.') {
    Some(dot) if dot > base_start => {
      let (stem, ext) = name.split_at(dot);
      format!("{stem} ({sequence}){ext}")
    }
    _ => format!("{name} ({sequence})"),
  }
}
