//! End-to-end coverage across the patch store, sampler, skipback recorder,
//! and set-page multiplexer wired together through `AugmentEngine`.

use augment::patch::{AudioFxSlot, ChainBody, SaveNameHints, SynthSlot};
use augment::sampler::SampleSource;
use augment::setpage::{run_swap, SetPageState, SwapHost, SwapPlan};
use augment::AugmentEngine;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

fn test_engine(root: &Path) -> AugmentEngine {
 AugmentEngine::builder()
.sample_rate(48000.0)
.frames_per_block(64)
.patches_dir(root.join("patches"))
.master_presets_dir(root.join("master_presets"))
.recordings_dir(root.join("recordings"))
.library_dir(root.join("library"))
.modules_dir(root.join("modules"))
.set_pages_dir(root.join("set_pages"))
.skipback_dir(root.join("skipback"))
.mailbox_path(root.join("mailbox.bin"))
.build()
.expect("default config is valid")
}

#[test]
fn patch_save_reload_and_delete_round_trips_through_the_store() {
 let dir = tempfile::tempdir().unwrap();
 let mut engine = test_engine(dir.path());

 let chain = ChainBody {
 synth: SynthSlot { module: "saw_synth".into(), preset: 3, config: None },
 audio_fx: vec![AudioFxSlot { module: "reverb".into(), params: None }],
 midi_fx: vec![],
 midi_fx_js: vec![],
 midi_source_module: None,
 input: "both".into(),
 knob_mappings: vec![],
 receive_channel: None,
 forward_channel: None,
 };
 engine.save_patch(chain, &SaveNameHints::default()).unwrap();

 let entries = engine.patch_store().scan().unwrap();
 assert_eq!(entries.len(), 1);
 assert_eq!(entries[0].patch.chain.synth.module, "saw_synth");
 assert!(entries[0].patch.name.starts_with("saw_synth 03"));

 engine.patch_store().delete(&entries[0].path).unwrap();
 assert!(engine.patch_store().scan().unwrap().is_empty());
}

#[test]
fn sampler_records_four_bars_and_auto_stops_on_midi_clock() {
 let dir = tempfile::tempdir().unwrap();
 let mut engine = test_engine(dir.path());
 let sampler = engine.sampler();

 sampler.arm(SampleSource::Resample).unwrap();
 let now = std::time::Instant::now();
 sampler.handle_midi_start(now, 120.0);
 assert!(sampler.is_recording());

 // 4 bars at 96 pulses/bar = 384 ticks to auto-stop.
 for _ in 0..384 {
 sampler.handle_midi_tick(now, 120.0);
 let block = vec![100i16; 64 * 2];
 sampler.record_block(&block, 64);
 }

 assert!(!sampler.is_recording());
}

#[test]
fn skipback_save_reports_success_through_the_outcome_channel() {
 let dir = tempfile::tempdir().unwrap();
 let engine = test_engine(dir.path());
 let skipback = engine.skipback();

 let block = vec![7i16; 128];
 skipback.capture_block(&block);

 let (tx, rx) = crossbeam_channel::unbounded();
 skipback
.clone()
.trigger_save(dir.path().join("skip.wav"), 48000, tx)
.unwrap();

 let outcome = rx.recv_timeout(std::time::Duration::from_secs(2)).unwrap();
 match outcome {
 augment::sampler::SaveOutcome::Saved(path) => assert!(path.exists()),
 augment::sampler::SaveOutcome::Failed(reason) => panic!("save failed: {reason}"),
 }
}

#[test]
fn set_page_swap_moves_sets_and_finalizes_only_after_completion() {
 let dir = tempfile::tempdir().unwrap();
 let library_dir = dir.path().join("library");
 std::fs::create_dir_all(library_dir.join("set-a")).unwrap();

 let incoming = SetPageState::page_stash_dir(&library_dir, 2);
 std::fs::create_dir_all(incoming.join("set-b")).unwrap();

 let mut state = SetPageState::new(dir.path().join("current_page.txt"));
 state.begin_change(2).unwrap();
 assert!(state.is_change_in_flight());

 struct FakeHost {
 restarts: AtomicUsize,
 }
 impl SwapHost for FakeHost {
 fn save_current_song(&self) -> std::io::Result<()> {
 Ok(())
 }
 fn sync_library(&self) -> std::io::Result<()> {
 Ok(())
 }
 fn library_entry_count(&self, dir: &Path) -> std::io::Result<usize> {
 Ok(std::fs::read_dir(dir)?.count())
 }
 fn force_current_song_index_zero(&self) -> std::io::Result<()> {
 Ok(())
 }
 fn save_state(&self) -> std::io::Result<()> {
 Ok(())
 }
 fn restart_firmware(&self) -> std::io::Result<()> {
 self.restarts.fetch_add(1, Ordering::SeqCst);
 Ok(())
 }
 fn announce(&self, _message: &str) {}
 }

 let host = FakeHost { restarts: AtomicUsize::new(0) };
 let plan = SwapPlan { library_dir: library_dir.clone(), target_page: 2, host: &host };
 run_swap(&mut state, &plan).unwrap();

 assert_eq!(state.current_page, 2);
 assert!(!state.is_change_in_flight());
 assert!(library_dir.join("set-b").exists());
 assert_eq!(host.restarts.load(Ordering::SeqCst), 1);
}
