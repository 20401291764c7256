//! Quantized sampler state machine and recording pipeline.
//! Grounded on `tutti-sampler`'s `recording/manager.rs` (arm/record
//! lifecycle) and `butler/capture.rs` + `butler/thread.rs` (ring-buffer
//! producer on the audio thread, detached writer thread draining it).

use crate::error::{Result, SamplerError};
use crate::ring::{stereo_ring, AudioRingProducer};
use crate::tempo::MidiClockTracker;
use crate::wav::create_writer;
use parking_lot::{Condvar, Mutex};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Bar-count options for recording duration; index 3 (4 bars) is default,
/// `0` means "record until user stops".
pub const DURATION_BARS: [u32; 6] = [0, 1, 2, 4, 8, 16];
pub const DEFAULT_DURATION_INDEX: usize = 3;
const PULSES_PER_BAR: u64 = 4 * 24;
const PREROLL_BARS: u64 = 1;
const RING_SECONDS: f64 = 2.0;
const WRITER_DRAIN_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
 Idle,
 Armed,
 Preroll,
 Recording,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleSource {
 Resample,
 Input,
}

struct WriterHandle {
 exit: Arc<(Mutex<bool>, Condvar)>,
 join: Option<JoinHandle<()>>,
}

impl WriterHandle {
 fn stop_and_join(mut self) {
 {
 let (lock, cv) = &*self.exit;
 let mut exit = lock.lock();
 *exit = true;
 cv.notify_one();
 }
 if let Some(handle) = self.join.take() {
 let _ = handle.join();
 }
 }
}

pub struct SamplerEngine {
 phase: Phase,
 source: SampleSource,
 pub duration_index: usize,
 pub menu_cursor: usize,
 pub preroll_enabled: bool,
 clock: MidiClockTracker,
 target_pulses: Option<u64>,
 pulses_elapsed: u64,
 fallback_blocks_remaining: Option<u64>,
 sample_rate: f64,
 frames_per_block: u32,
 recordings_dir: PathBuf,
 producer: Option<AudioRingProducer>,
 writer: Option<WriterHandle>,
 target_path: Option<PathBuf>,
 samples_written: u64,
}

impl SamplerEngine {
 pub fn new(sample_rate: f64, frames_per_block: u32, recordings_dir: PathBuf) -> Self {
 Self {
 phase: Phase::Idle,
 source: SampleSource::Resample,
 duration_index: DEFAULT_DURATION_INDEX,
 menu_cursor: 0,
 preroll_enabled: false,
 clock: MidiClockTracker::new(),
 target_pulses: None,
 pulses_elapsed: 0,
 fallback_blocks_remaining: None,
 sample_rate,
 frames_per_block,
 recordings_dir,
 producer: None,
 writer: None,
 target_path: None,
 samples_written: 0,
 }
 }

 pub fn phase(&self) -> Phase {
 self.phase
 }

 pub fn is_recording(&self) -> bool {
 self.phase == Phase::Recording
 }

 pub fn target_path(&self) -> Option<&PathBuf> {
 self.target_path.as_ref()
 }

 pub fn duration_bars(&self) -> u32 {
 DURATION_BARS[self.duration_index]
 }

 /// Answers the `sampler:KEY` parameter-bus reads: the state machine, armed source, duration index, and
 /// resolved tempo are exposed here rather than over a separate
 /// channel. `resolved_bpm` is whatever the caller's `TempoFallback`
 /// chain currently resolves to.
 pub fn get_param(&self, key: &str, resolved_bpm: f64) -> Option<String> {
 match key {
 "state" => Some(
 match self.phase {
 Phase::Idle => "idle",
 Phase::Armed => "armed",
 Phase::Preroll => "preroll",
 Phase::Recording => "recording",
 }
.to_string(),
 ),
 "source" => Some(
 match self.source {
 SampleSource::Resample => "resample",
 SampleSource::Input => "input",
 }
.to_string(),
 ),
 "duration_index" => Some(self.duration_index.to_string()),
 "bpm" => Some(resolved_bpm.to_string()),
 _ => None,
 }
 }

 pub fn arm(&mut self, source: SampleSource) -> Result<()> {
 if self.phase != Phase::Idle {
 return Err(SamplerError::NotIdle);
 }
 self.source = source;
 self.phase = Phase::Armed;
 Ok(())
 }

 /// MIDI Start (0xFA).
 pub fn handle_midi_start(&mut self, now: Instant, resolved_bpm: f64) {
 self.clock.start(now);
 if self.phase == Phase::Armed {
 if self.preroll_enabled && self.duration_bars() > 0 {
 self.phase = Phase::Preroll;
 self.pulses_elapsed = 0;
 } else {
 self.begin_recording(resolved_bpm);
 }
 }
 }

 /// A second user gesture while already `Armed` starts recording
 /// immediately, skipping preroll — the non-MIDI-clock counterpart to
 /// `handle_midi_start`'s "preroll=off" branch.
 pub fn start_now(&mut self, resolved_bpm: f64) -> Result<()> {
 if self.phase != Phase::Armed {
 return Err(SamplerError::NotArmed);
 }
 self.begin_recording(resolved_bpm);
 Ok(())
 }

 /// MIDI clock tick (0xF8): counts into preroll or the recording's
 /// target pulse count.
 pub fn handle_midi_tick(&mut self, now: Instant, resolved_bpm: f64) {
 self.clock.tick(now);
 match self.phase {
 Phase::Preroll => {
 self.pulses_elapsed += 1;
 if self.pulses_elapsed >= PREROLL_BARS * PULSES_PER_BAR {
 self.begin_recording(resolved_bpm);
 }
 }
 Phase::Recording => {
 self.pulses_elapsed += 1;
 if let Some(target) = self.target_pulses {
 if self.pulses_elapsed >= target {
 let _ = self.stop();
 }
 }
 }
 _ => {}
 }
 }

 /// MIDI Stop (0xFC): aborts preroll or stops an active recording.
 pub fn handle_midi_stop(&mut self) {
 self.clock.stop();
 match self.phase {
 Phase::Preroll => self.phase = Phase::Armed,
 Phase::Recording => {
 let _ = self.stop();
 }
 _ => {}
 }
 }

 fn begin_recording(&mut self, resolved_bpm: f64) {
 let now = chrono::Local::now();
 let date_dir = self.recordings_dir.join(now.format("%Y-%m-%d").to_string());
 if std::fs::create_dir_all(&date_dir).is_err() {
 tracing::warn!(dir = %date_dir.display(), "could not create recordings directory, aborting arm");
 self.phase = Phase::Idle;
 return;
 }

 let filename = format!(
 "sample_{}_{}bpm.wav",
 now.format("%Y%m%d_%H%M%S"),
 resolved_bpm.round() as i64
 );
 let path = date_dir.join(filename);

 let writer = match create_writer(&path, self.sample_rate as u32) {
 Ok(w) => w,
 Err(e) => {
 tracing::warn!(error = %e, "failed to open wav writer, aborting arm");
 self.phase = Phase::Idle;
 return;
 }
 };

 let (producer, mut consumer) = stereo_ring(self.sample_rate, RING_SECONDS);
 let exit = Arc::new((Mutex::new(false), Condvar::new()));
 let thread_exit = exit.clone();
 let join = std::thread::spawn(move || {
 let mut writer = writer;
 let mut scratch = vec![0i16; 4096];
 loop {
 let should_exit = {
 let (lock, cv) = &*thread_exit;
 let mut exit = lock.lock();
 if !*exit {
 cv.wait_for(&mut exit, WRITER_DRAIN_INTERVAL);
 }
 *exit
 };

 loop {
 let read = consumer.pop_slice(&mut scratch);
 if read == 0 {
 break;
 }
 if crate::wav::write_interleaved(&mut writer, &scratch[..read]).is_err() {
 return;
 }
 }

 if should_exit {
 let _ = writer.finalize();
 return;
 }
 }
 });

 self.producer = Some(producer);
 self.writer = Some(WriterHandle { exit, join: Some(join) });
 self.target_path = Some(path);
 self.samples_written = 0;

 let bars = self.duration_bars();
 if bars > 0 {
 self.target_pulses = Some(bars as u64 * PULSES_PER_BAR);
 let seconds_per_bar = 4.0 * 60.0 / resolved_bpm;
 let total_blocks =
 (bars as f64 * seconds_per_bar * self.sample_rate / self.frames_per_block as f64).ceil();
 self.fallback_blocks_remaining = Some(total_blocks as u64);
 } else {
 self.target_pulses = None;
 self.fallback_blocks_remaining = None;
 }
 self.pulses_elapsed = 0;
 self.phase = Phase::Recording;
 }

 /// Feeds one block of mixed output into the ring when recording
 ///.
 pub fn record_block(&mut self, interleaved: &[i16], _frames: u32) {
 if self.phase != Phase::Recording {
 return;
 }
 if let Some(producer) = &mut self.producer {
 let written = producer.push_slice(interleaved);
 self.samples_written += written as u64;
 }

 if !self.clock.is_running() {
 if let Some(remaining) = &mut self.fallback_blocks_remaining {
 if *remaining == 0 {
 let _ = self.stop();
 return;
 }
 *remaining -= 1;
 }
 }
 }

 /// Stops an armed-or-later sampler: tears down the writer thread,
 /// finalizing the WAV header, and returns to `IDLE`.
 pub fn stop(&mut self) -> Result<()> {
 if self.phase == Phase::Idle {
 return Err(SamplerError::AlreadyIdle);
 }
 self.producer = None;
 if let Some(writer) = self.writer.take() {
 writer.stop_and_join();
 }
 self.phase = Phase::Idle;
 Ok(())
 }
}

impl augment_core::AudioSink for SamplerEngine {
 fn push_block(&mut self, interleaved: &[i16], frames: u32) {
 self.record_block(interleaved, frames);
 }
}

#[cfg(test)]
mod tests {
 use super::*;

 #[test]
 fn arm_requires_idle() {
 let mut sampler = SamplerEngine::new(44100.0, 128, std::env::temp_dir());
 assert!(sampler.arm(SampleSource::Resample).is_ok());
 assert!(matches!(sampler.arm(SampleSource::Input), Err(SamplerError::NotIdle)));
 }

 #[test]
 fn start_without_preroll_begins_recording_immediately() {
 let dir = tempfile::tempdir().unwrap();
 let mut sampler = SamplerEngine::new(1000.0, 16, dir.path().to_path_buf());
 sampler.arm(SampleSource::Resample).unwrap();
 sampler.handle_midi_start(Instant::now(), 120.0);
 assert_eq!(sampler.phase(), Phase::Recording);
 assert!(sampler.target_path().is_some());
 sampler.stop().unwrap();
 }

 #[test]
 fn preroll_gates_recording_for_one_bar_of_ticks() {
 let dir = tempfile::tempdir().unwrap();
 let mut sampler = SamplerEngine::new(1000.0, 16, dir.path().to_path_buf());
 sampler.preroll_enabled = true;
 sampler.arm(SampleSource::Resample).unwrap();
 sampler.handle_midi_start(Instant::now(), 120.0);
 assert_eq!(sampler.phase(), Phase::Preroll);
 for _ in 0..(PULSES_PER_BAR - 1) {
 sampler.handle_midi_tick(Instant::now(), 120.0);
 }
 assert_eq!(sampler.phase(), Phase::Preroll);
 sampler.handle_midi_tick(Instant::now(), 120.0);
 assert_eq!(sampler.phase(), Phase::Recording);
 sampler.stop().unwrap();
 }

 #[test]
 fn midi_stop_during_preroll_returns_to_armed() {
 let dir = tempfile::tempdir().unwrap();
 let mut sampler = SamplerEngine::new(1000.0, 16, dir.path().to_path_buf());
 sampler.preroll_enabled = true;
 sampler.arm(SampleSource::Resample).unwrap();
 sampler.handle_midi_start(Instant::now(), 120.0);
 sampler.handle_midi_stop();
 assert_eq!(sampler.phase(), Phase::Armed);
 }

 #[test]
 fn recording_auto_stops_at_target_pulse_count() {
 let dir = tempfile::tempdir().unwrap();
 let mut sampler = SamplerEngine::new(1000.0, 16, dir.path().to_path_buf());
 sampler.duration_index = 1; // 1 bar
 sampler.arm(SampleSource::Resample).unwrap();
 sampler.handle_midi_start(Instant::now(), 120.0);
 assert_eq!(sampler.phase(), Phase::Recording);
 for _ in 0..PULSES_PER_BAR {
 sampler.handle_midi_tick(Instant::now(), 120.0);
 }
 assert_eq!(sampler.phase(), Phase::Idle);
 }

 #[test]
 fn get_param_reports_state_source_duration_and_bpm() {
 let mut sampler = SamplerEngine::new(44100.0, 128, std::env::temp_dir());
 assert_eq!(sampler.get_param("state", 120.0).as_deref(), Some("idle"));
 sampler.arm(SampleSource::Input).unwrap();
 assert_eq!(sampler.get_param("state", 120.0).as_deref(), Some("armed"));
 assert_eq!(sampler.get_param("source", 120.0).as_deref(), Some("input"));
 assert_eq!(sampler.get_param("duration_index", 120.0).as_deref(), Some("3"));
 assert_eq!(sampler.get_param("bpm", 128.0).as_deref(), Some("128"));
 assert_eq!(sampler.get_param("unknown", 120.0), None);
 }

 #[test]
 fn start_now_begins_recording_while_armed() {
 let dir = tempfile::tempdir().unwrap();
 let mut sampler = SamplerEngine::new(1000.0, 16, dir.path().to_path_buf());
 sampler.arm(SampleSource::Resample).unwrap();
 sampler.start_now(120.0).unwrap();
 assert_eq!(sampler.phase(), Phase::Recording);
 sampler.stop().unwrap();
 }

 #[test]
 fn start_now_requires_armed() {
 let mut sampler = SamplerEngine::new(44100.0, 128, std::env::temp_dir());
 assert!(matches!(sampler.start_now(120.0), Err(SamplerError::NotArmed)));
 }

 #[test]
 fn unlimited_duration_has_no_target_pulses() {
 let dir = tempfile::tempdir().unwrap();
 let mut sampler = SamplerEngine::new(1000.0, 16, dir.path().to_path_buf());
 sampler.duration_index = 0;
 sampler.arm(SampleSource::Resample).unwrap();
 sampler.handle_midi_start(Instant::now(), 120.0);
 for _ in 0..(PULSES_PER_BAR * 20) {
 sampler.handle_midi_tick(Instant::now(), 120.0);
 }
 assert_eq!(sampler.phase(), Phase::Recording);
 sampler.stop().unwrap();
 }
}
