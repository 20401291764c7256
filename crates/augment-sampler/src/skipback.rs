//! 30-second rolling skipback capture with atomic write position / full /
//! saving flags. Grounded on the same ring-ownership
//! pattern as `augment-core`'s audio mailbox: a single audio-thread writer,
//! a background reader gated by an atomic flag rather than a lock.

use crate::error::{Result, SamplerError};
use crate::wav::create_writer;
use std::cell::UnsafeCell;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

pub const SKIPBACK_SECONDS: f64 = 30.0;

/// Sent once a background save completes, so the owner can update the
/// overlay-state snapshot and screen-reader queue without those types
/// needing to be shared across threads themselves.
#[derive(Debug, Clone)]
pub enum SaveOutcome {
 Saved(PathBuf),
 Failed(String),
}

/// A 30-second interleaved stereo i16 ring, written only by the audio
/// thread and read only by a background saver while `saving` is set.
///
/// # Safety
/// `capture_block` must never be called concurrently with itself (true by
/// construction: only the audio thread calls it). The background saver
/// only dereferences the buffer after observing `saving == true`, which
/// `capture_block` checks before every write, so the two never overlap.
pub struct SkipbackRecorder {
 buffer: UnsafeCell<Vec<i16>>,
 capacity: usize,
 write_pos: AtomicUsize,
 full: AtomicBool,
 saving: AtomicBool,
}

unsafe impl Sync for SkipbackRecorder {}
unsafe impl Send for SkipbackRecorder {}

impl SkipbackRecorder {
 pub fn new(sample_rate: f64) -> Self {
 let capacity = ((sample_rate * SKIPBACK_SECONDS) as usize * 2).max(2);
 Self {
 buffer: UnsafeCell::new(vec![0i16; capacity]),
 capacity,
 write_pos: AtomicUsize::new(0),
 full: AtomicBool::new(false),
 saving: AtomicBool::new(false),
 }
 }

 pub fn is_saving(&self) -> bool {
 self.saving.load(Ordering::Acquire)
 }

 /// Copies one block's interleaved samples into the ring; a no-op while
 /// a save is in progress.
 pub fn capture_block(&self, interleaved: &[i16]) {
 if self.saving.load(Ordering::Acquire) {
 return;
 }
 let buf = unsafe { &mut *self.buffer.get() };
 let mut pos = self.write_pos.load(Ordering::Relaxed);
 for &sample in interleaved {
 buf[pos] = sample;
 pos += 1;
 if pos >= self.capacity {
 pos = 0;
 self.full.store(true, Ordering::Release);
 }
 }
 self.write_pos.store(pos, Ordering::Release);
 }

 /// Sets `saving`, spawns a writer thread, and returns immediately
 ///. The writer reports its outcome on `done`.
 pub fn trigger_save(
 self: &Arc<Self>,
 path: PathBuf,
 sample_rate: u32,
 done: crossbeam_channel::Sender<SaveOutcome>,
 ) -> Result<()> {
 if self.saving.swap(true, Ordering::AcqRel) {
 return Err(SamplerError::SkipbackBusy);
 }

 let this = Arc::clone(self);
 std::thread::spawn(move || {
 let outcome = this.write_snapshot(&path, sample_rate);
 this.saving.store(false, Ordering::Release);
 let _ = done.send(match outcome {
 Ok(()) => SaveOutcome::Saved(path),
 Err(e) => SaveOutcome::Failed(e.to_string()),
 });
 });

 Ok(())
 }

 fn write_snapshot(&self, path: &PathBuf, sample_rate: u32) -> Result<()> {
 let write_pos = self.write_pos.load(Ordering::Acquire);
 let full = self.full.load(Ordering::Acquire);
 let buf = unsafe { &*self.buffer.get() };

 if let Some(parent) = path.parent() {
 std::fs::create_dir_all(parent)?;
 }
 let mut writer = create_writer(path, sample_rate)?;

 if full {
 crate::wav::write_interleaved(&mut writer, &buf[write_pos..])?;
 crate::wav::write_interleaved(&mut writer, &buf[..write_pos])?;
 } else {
 crate::wav::write_interleaved(&mut writer, &buf[..write_pos])?;
 }

 writer.finalize()?;
 Ok(())
 }
}
