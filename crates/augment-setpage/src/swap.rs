//! Background page-swap orchestration: save the active song,
//! wait for the library to settle, stash outgoing xattrs, shuffle UUID
//! directories between the library and the page stash, restore xattrs,
//! write a manifest, reset the firmware's song index, and persist the new
//! page only once every step has succeeded.

use crate::state::SetPageState;
use crate::xattrs::{restore_xattrs, save_xattrs};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(500);
const MAX_POLL_ATTEMPTS: u32 = 6;

/// Everything the swap needs to reach outside of `SetPageState` itself;
/// kept as trait objects so tests can fake the host RPCs.
pub trait SwapHost {
 fn save_current_song(&self) -> std::io::Result<()>;
 fn sync_library(&self) -> std::io::Result<()>;
 fn library_entry_count(&self, library_dir: &Path) -> std::io::Result<usize>;
 fn force_current_song_index_zero(&self) -> std::io::Result<()>;
 fn save_state(&self) -> std::io::Result<()>;
 fn restart_firmware(&self) -> std::io::Result<()>;
 fn announce(&self, message: &str);
}

pub struct SwapPlan<'a> {
 pub library_dir: PathBuf,
 pub target_page: u8,
 pub host: &'a dyn SwapHost,
}

/// Waits for the library directory's entry count to stop changing, up to
/// `MAX_POLL_ATTEMPTS` ticks of `POLL_INTERVAL`. Returns the last observed
/// count regardless of whether it ever stabilized — a stuck count is not
/// fatal, the swap proceeds with whatever is on disk.
fn wait_for_stable_count(host: &dyn SwapHost, library_dir: &Path) -> std::io::Result<usize> {
 let mut previous = host.library_entry_count(library_dir)?;
 for _ in 0..MAX_POLL_ATTEMPTS {
 thread::sleep(POLL_INTERVAL);
 let current = host.library_entry_count(library_dir)?;
 if current == previous {
 return Ok(current);
 }
 previous = current;
 }
 Ok(previous)
}

/// Moves every UUID directory out of the library into `page_<old>/`,
/// logging and skipping any destination collision rather than failing the
/// whole swap.
fn rename_out(library_dir: &Path, stash_dir: &Path, old_page: u8) -> std::io::Result<()> {
 std::fs::create_dir_all(stash_dir)?;
 let entries = match std::fs::read_dir(library_dir) {
 Ok(e) => e,
 Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
 Err(e) => return Err(e),
 };
 for entry in entries {
 let entry = entry?;
 if !entry.file_type()?.is_dir() {
 continue;
 }
 let dest = stash_dir.join(entry.file_name());
 if dest.exists() {
 tracing::warn!(
 page = old_page,
 dir = %entry.path().display(),
 "skipping rename-out: destination already exists in page stash"
 );
 continue;
 }
 std::fs::rename(entry.path(), dest)?;
 }
 Ok(())
}

/// Moves every UUID directory from `page_<new>/` into the library.
fn rename_in(library_dir: &Path, stash_dir: &Path, new_page: u8) -> std::io::Result<()> {
 std::fs::create_dir_all(library_dir)?;
 let entries = match std::fs::read_dir(stash_dir) {
 Ok(e) => e,
 Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
 Err(e) => return Err(e),
 };
 for entry in entries {
 let entry = entry?;
 if !entry.file_type()?.is_dir() {
 continue;
 }
 let dest = library_dir.join(entry.file_name());
 if dest.exists() {
 tracing::warn!(
 page = new_page,
 dir = %entry.path().display(),
 "skipping rename-in: destination already exists in library"
 );
 continue;
 }
 std::fs::rename(entry.path(), dest)?;
 }
 Ok(())
}

fn write_manifest(stash_dir: &Path, page: u8) -> std::io::Result<()> {
 std::fs::create_dir_all(stash_dir)?;
 std::fs::write(stash_dir.join("manifest.txt"), format!("page={page}\n"))
}

/// Runs the 8-step swap synchronously. Callers that want this off the
/// audio/UI thread spawn it themselves; the steps are ordered so that the
/// pending-page marker (already persisted by `SetPageState::begin_change`
/// before this function is even called) is the only durable state a crash
/// can leave behind until `finish_change` lands.
pub fn run_swap(state: &mut SetPageState, plan: &SwapPlan) -> std::io::Result<()> {
 let old_page = state.current_page;
 let new_page = plan.target_page;

 plan.host.announce("Saving set...");
 plan.host.save_current_song()?;
 plan.host.sync_library()?;
 wait_for_stable_count(plan.host, &plan.library_dir)?;

 let outgoing_stash = SetPageState::page_stash_dir(&plan.library_dir, old_page);
 save_xattrs(&plan.library_dir, &outgoing_stash)?;
 rename_out(&plan.library_dir, &outgoing_stash, old_page)?;
 write_manifest(&outgoing_stash, old_page)?;

 let incoming_stash = SetPageState::page_stash_dir(&plan.library_dir, new_page);
 rename_in(&plan.library_dir, &incoming_stash, new_page)?;
 restore_xattrs(&plan.library_dir, &incoming_stash)?;

 plan.host.force_current_song_index_zero()?;

 state.finish_change(new_page)?;
 plan.host.save_state()?;
 plan.host.restart_firmware()?;
 Ok(())
}

#[cfg(test)]
mod tests {
 use super::*;
 use std::cell::RefCell;
 use std::sync::atomic::{AtomicUsize, Ordering};

 struct FakeHost {
 entry_counts: RefCell<Vec<usize>>,
 force_zero_calls: AtomicUsize,
 restart_calls: AtomicUsize,
 }

 impl SwapHost for FakeHost {
 fn save_current_song(&self) -> std::io::Result<()> {
 Ok(())
 }
 fn sync_library(&self) -> std::io::Result<()> {
 Ok(())
 }
 fn library_entry_count(&self, _library_dir: &Path) -> std::io::Result<usize> {
 let mut counts = self.entry_counts.borrow_mut();
 if counts.len() > 1 {
 Ok(counts.remove(0))
 } else {
 Ok(counts[0])
 }
 }
 fn force_current_song_index_zero(&self) -> std::io::Result<()> {
 self.force_zero_calls.fetch_add(1, Ordering::SeqCst);
 Ok(())
 }
 fn save_state(&self) -> std::io::Result<()> {
 Ok(())
 }
 fn restart_firmware(&self) -> std::io::Result<()> {
 self.restart_calls.fetch_add(1, Ordering::SeqCst);
 Ok(())
 }
 fn announce(&self, _message: &str) {}
 }

 #[test]
 fn swap_moves_sets_between_pages_and_finalizes_state() {
 let dir = tempfile::tempdir().unwrap();
 let library_dir = dir.path().join("library");
 std::fs::create_dir_all(&library_dir).unwrap();
 let uuid_dir = library_dir.join("aaaaaaaa-0000-0000-0000-000000000000");
 std::fs::create_dir_all(&uuid_dir).unwrap();

 let incoming_stash = SetPageState::page_stash_dir(&library_dir, 1);
 std::fs::create_dir_all(&incoming_stash).unwrap();
 let incoming_uuid = incoming_stash.join("bbbbbbbb-0000-0000-0000-000000000000");
 std::fs::create_dir_all(&incoming_uuid).unwrap();

 let mut state = SetPageState::new(dir.path().join("current_page.txt"));
 state.begin_change(1).unwrap();

 let host = FakeHost {
 entry_counts: RefCell::new(vec![1]),
 force_zero_calls: AtomicUsize::new(0),
 restart_calls: AtomicUsize::new(0),
 };
 let plan = SwapPlan { library_dir: library_dir.clone(), target_page: 1, host: &host };

 run_swap(&mut state, &plan).unwrap();

 assert_eq!(state.current_page, 1);
 assert!(!state.is_change_in_flight());
 assert!(!uuid_dir.exists());
 assert!(library_dir.join("bbbbbbbb-0000-0000-0000-000000000000").exists());
 assert_eq!(host.force_zero_calls.load(Ordering::SeqCst), 1);
 assert_eq!(host.restart_calls.load(Ordering::SeqCst), 1);
 }

 #[test]
 fn rename_out_skips_existing_destination_instead_of_failing() {
 let dir = tempfile::tempdir().unwrap();
 let library_dir = dir.path().join("library");
 let stash_dir = dir.path().join("stash");
 std::fs::create_dir_all(library_dir.join("uuid-a")).unwrap();
 std::fs::create_dir_all(stash_dir.join("uuid-a")).unwrap();

 assert!(rename_out(&library_dir, &stash_dir, 0).is_ok());
 assert!(library_dir.join("uuid-a").exists());
 }
}
