//! Copy-on-first-use detection: a newly-seen set named like a duplicate is
//! matched against existing sets by `Song.abl` file size.

use std::fs;
use std::path::Path;

pub fn looks_like_a_copy(display_name: &str) -> bool {
 let lower = display_name.to_lowercase();
 lower.contains("copy") || lower.contains("duplicate")
}

/// Finds the single existing set whose `Song.abl` size matches `target_size`,
/// or `None` if zero or more than one match.
pub fn find_unique_size_match(target_size: u64, tracked: &[(String, u64)]) -> Option<&str> {
 let mut matches = tracked.iter().filter(|(_, size)| *size == target_size);
 let first = matches.next()?;
 if matches.next().is_some() {
 return None;
 }
 Some(first.0.as_str())
}

/// Drops a `copy_source.txt` naming `source_uuid` into the new set's
/// per-set state directory and copies the source's chain config verbatim.
pub fn stamp_copy_source(
 new_set_state_dir: &Path,
 source_uuid: &str,
 source_chain_config_path: &Path,
) -> std::io::Result<()> {
 fs::create_dir_all(new_set_state_dir)?;
 fs::write(new_set_state_dir.join("copy_source.txt"), source_uuid)?;
 if source_chain_config_path.exists() {
 fs::copy(source_chain_config_path, new_set_state_dir.join("chain.json"))?;
 }
 Ok(())
}

#[cfg(test)]
mod tests {
 use super::*;

 #[test]
 fn detects_copy_and_duplicate_case_insensitively() {
 assert!(looks_like_a_copy("Lead Set Copy"));
 assert!(looks_like_a_copy("lead set duplicate"));
 assert!(looks_like_a_copy("COPY of lead"));
 assert!(!looks_like_a_copy("lead set"));
 }

 #[test]
 fn unique_size_match_requires_exactly_one() {
 let tracked = vec![("a".to_string(), 100u64), ("b".to_string(), 200), ("c".to_string(), 300)];
 assert_eq!(find_unique_size_match(200, &tracked), Some("b"));
 assert_eq!(find_unique_size_match(999, &tracked), None);
 }

 #[test]
 fn ambiguous_size_match_returns_none() {
 let tracked = vec![("a".to_string(), 100u64), ("b".to_string(), 100)];
 assert_eq!(find_unique_size_match(100, &tracked), None);
 }

 #[test]
 fn stamp_writes_source_file_and_copies_chain_config() {
 let dir = tempfile::tempdir().unwrap();
 let new_state = dir.path().join("new_set_state");
 let source_chain = dir.path().join("source_chain.json");
 fs::write(&source_chain, "{}").unwrap();
 stamp_copy_source(&new_state, "source-uuid", &source_chain).unwrap();
 assert_eq!(fs::read_to_string(new_state.join("copy_source.txt")).unwrap(), "source-uuid");
 assert_eq!(fs::read_to_string(new_state.join("chain.json")).unwrap(), "{}");
 }
}
