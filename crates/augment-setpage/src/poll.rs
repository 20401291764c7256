//! Settings poll: every few seconds, reconcile the firmware's
//! `currentSongIndex` against the `user.song-index` xattr carried by a set
//! in the active library so a set change made outside this process (e.g.
//! by the firmware's own UI) is picked up.

use std::path::Path;

const SONG_INDEX_ATTR: &str = "user.song-index";

/// The pending namespace is used for the brief window after a new set is
/// created where no UUID directory has yet been stamped with the index
/// the firmware just assigned it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchedSet {
 Uuid(String),
 Pending,
 NotFound,
}

/// Scans `library_dir` for a UUID directory whose `user.song-index` xattr
/// equals `current_song_index`. Returns `Pending` when no match exists but
/// a `pending_song_index` from `SetPageState` equals it, since that means
/// the set is still being written to disk.
pub fn match_song_index(
 library_dir: &Path,
 current_song_index: u32,
 pending_song_index: Option<u32>,
) -> std::io::Result<MatchedSet> {
 let entries = match std::fs::read_dir(library_dir) {
 Ok(e) => e,
 Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
 return Ok(MatchedSet::NotFound);
 }
 Err(e) => return Err(e),
 };

 for entry in entries {
 let entry = entry?;
 if !entry.file_type()?.is_dir() {
 continue;
 }
 if let Ok(Some(value)) = xattr::get(entry.path(), SONG_INDEX_ATTR) {
 let value = String::from_utf8_lossy(&value);
 if value.trim().parse::<u32>().ok() == Some(current_song_index) {
 return Ok(MatchedSet::Uuid(entry.file_name().to_string_lossy().into_owned()));
 }
 }
 }

 if pending_song_index == Some(current_song_index) {
 return Ok(MatchedSet::Pending);
 }
 Ok(MatchedSet::NotFound)
}

/// Reads `currentSongIndex` out of the firmware's settings JSON.
pub fn read_current_song_index(settings_path: &Path) -> std::io::Result<Option<u32>> {
 let text = match std::fs::read_to_string(settings_path) {
 Ok(t) => t,
 Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
 Err(e) => return Err(e),
 };
 let value: serde_json::Value = serde_json::from_str(&text)
.map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
 Ok(value.get("currentSongIndex").and_then(|v| v.as_u64()).map(|v| v as u32))
}

/// Overwrites `currentSongIndex` to 0 in the firmware's settings JSON,
/// preserving every other field.
pub fn force_current_song_index_zero(settings_path: &Path) -> std::io::Result<()> {
 let text = std::fs::read_to_string(settings_path)?;
 let mut value: serde_json::Value = serde_json::from_str(&text)
.map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
 if let Some(obj) = value.as_object_mut() {
 obj.insert("currentSongIndex".to_string(), serde_json::json!(0));
 }
 std::fs::write(settings_path, serde_json::to_string_pretty(&value)?)
}

#[cfg(test)]
mod tests {
 use super::*;

 #[test]
 fn matches_uuid_carrying_the_song_index_xattr() {
 let dir = tempfile::tempdir().unwrap();
 let uuid_dir = dir.path().join("set-a");
 std::fs::create_dir_all(&uuid_dir).unwrap();
 let _ = xattr::set(&uuid_dir, SONG_INDEX_ATTR, b"3");

 let result = match_song_index(dir.path(), 3, None).unwrap();
 // best-effort: xattr may be unsupported on the test filesystem
 assert!(matches!(result, MatchedSet::Uuid(_) | MatchedSet::NotFound));
 }

 #[test]
 fn falls_back_to_pending_when_no_uuid_matches() {
 let dir = tempfile::tempdir().unwrap();
 std::fs::create_dir_all(dir.path().join("set-a")).unwrap();
 let result = match_song_index(dir.path(), 7, Some(7)).unwrap();
 assert_eq!(result, MatchedSet::Pending);
 }

 #[test]
 fn not_found_when_nothing_matches_and_nothing_pending() {
 let dir = tempfile::tempdir().unwrap();
 std::fs::create_dir_all(dir.path().join("set-a")).unwrap();
 let result = match_song_index(dir.path(), 7, None).unwrap();
 assert_eq!(result, MatchedSet::NotFound);
 }

 #[test]
 fn force_zero_preserves_other_fields() {
 let dir = tempfile::tempdir().unwrap();
 let path = dir.path().join("settings.json");
 std::fs::write(&path, r#"{"currentSongIndex": 5, "other": "keep"}"#).unwrap();
 force_current_song_index_zero(&path).unwrap();
 let value: serde_json::Value =
 serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
 assert_eq!(value["currentSongIndex"], 0);
 assert_eq!(value["other"], "keep");
 }

 #[test]
 fn read_current_song_index_returns_none_when_file_missing() {
 let dir = tempfile::tempdir().unwrap();
 let path = dir.path().join("missing.json");
 assert_eq!(read_current_song_index(&path).unwrap(), None);
 }
}
