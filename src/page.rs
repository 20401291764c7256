//! Wires the otherwise-standalone `augment-setpage` library into
//! `AugmentEngine`: a concrete [`SwapHost`] for the background swap, plus
//! the periodic settings-file poll (spec §4.10 step "Settings poll").

use crate::engine::AugmentEngine;
use crate::error::Result;
use augment_setpage::{run_swap, MatchedSet, SetPageState, SwapHost, SwapPlan};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Talks to the surrounding firmware the way `original_source`'s
/// `shadow_set_pages.c` background thread does: a `dbus-send` call to save
/// the dirty song, a `sync` to flush it to disk, and a shell script to
/// restart the process once the swap has landed.
struct FirmwareSwapHost {
 settings_path: PathBuf,
 restart_script: PathBuf,
}

impl SwapHost for FirmwareSwapHost {
 fn save_current_song(&self) -> std::io::Result<()> {
 Command::new("dbus-send")
 .args([
 "--system",
 "--print-reply",
 "--dest=com.ableton.move",
 "/com/ableton/move/browser",
 "com.ableton.move.Browser.saveSongIfDirty",
 "string:",
 ])
 .status()?;
 Ok(())
 }

 fn sync_library(&self) -> std::io::Result<()> {
 Command::new("sync").status()?;
 Ok(())
 }

 fn library_entry_count(&self, library_dir: &Path) -> std::io::Result<usize> {
 let entries = match std::fs::read_dir(library_dir) {
 Ok(e) => e,
 Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
 Err(e) => return Err(e),
 };
 let mut count = 0;
 for entry in entries {
 if entry?.file_type()?.is_dir() {
 count += 1;
 }
 }
 Ok(count)
 }

 fn force_current_song_index_zero(&self) -> std::io::Result<()> {
 augment_setpage::force_current_song_index_zero(&self.settings_path)
 }

 fn save_state(&self) -> std::io::Result<()> {
 // `SetPageState::finish_change` (called by `run_swap` right before
 // this) already persists the page index that matters for restart
 // recovery; there's no broader shadow state in this crate to flush.
 Ok(())
 }

 fn restart_firmware(&self) -> std::io::Result<()> {
 Command::new(&self.restart_script).status()?;
 Ok(())
 }

 fn announce(&self, _message: &str) {}
}

impl AugmentEngine {
 /// Begins an 8-page library swap (spec §4.10): marks the change
 /// in-flight (persisting the pending target synchronously, so a crash
 /// mid-swap resumes into the intended page), announces it, and hands
 /// the slow rename/restart work to a background thread.
 pub fn change_page(&mut self, target_page: u8) -> Result<()> {
 self.set_page.begin_change(target_page)?;
 self.announce.push("Loading...");

 let state_file = self.config.set_pages_dir.join("current_page.txt");
 let library_dir = self.config.library_dir.clone();
 let settings_path = self.config.settings_path.clone();
 let restart_script = self.config.restart_script.clone();

 thread::spawn(move || {
 // The swap culminates in `restart_firmware`, which replaces this
 // process; a fresh `SetPageState` loaded from the same file (not
 // the engine's live instance) is all the background thread needs.
 let mut state = SetPageState::load(state_file);
 let host = FirmwareSwapHost { settings_path, restart_script };
 let plan = SwapPlan { library_dir, target_page, host: &host };
 if let Err(e) = run_swap(&mut state, &plan) {
 tracing::error!(error = %e, target_page, "set-page swap failed");
 }
 });
 Ok(())
 }

 /// Spawns the §4.10 settings poll: every 5s, checks the firmware
 /// settings JSON's `currentSongIndex` against `last_seen`, and when it
 /// changes, resolves which library UUID (or the transient `Pending`
 /// namespace) now carries it. Returns the handle so a caller can decide
 /// when to stop polling (e.g. on shutdown); this engine does not track
 /// it itself since `AugmentEngine` has no owned background-thread
 /// registry elsewhere.
 pub fn spawn_settings_poll(&self, on_change: impl Fn(u32, MatchedSet) + Send + 'static) -> thread::JoinHandle<()> {
 let settings_path = self.config.settings_path.clone();
 let library_dir = self.config.library_dir.clone();
 let mut last_seen = augment_setpage::read_current_song_index(&settings_path).ok().flatten();
 thread::spawn(move || loop {
 thread::sleep(POLL_INTERVAL);
 let current = match augment_setpage::read_current_song_index(&settings_path) {
 Ok(Some(idx)) => idx,
 Ok(None) => continue,
 Err(e) => {
 tracing::warn!(error = %e, "settings poll: failed to read settings file");
 continue;
 }
 };
 if Some(current) == last_seen {
 continue;
 }
 last_seen = Some(current);
 match augment_setpage::match_song_index(&library_dir, current, None) {
 Ok(matched) => on_change(current, matched),
 Err(e) => tracing::warn!(error = %e, "settings poll: library scan failed"),
 }
 })
 }
}
