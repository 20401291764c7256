//! Raw C ABI surface shared by the three plugin kinds.
//!
//! Every vtable begins with `api_version: u32`, checked strictly by the
//! loader before any other symbol is touched. Function pointer
//! types mirror the plugin ABIs in verbatim; `#[repr(C)]` is load
//! bearing since these structs are filled in by `dlsym`-resolved init
//! symbols in modules built independently of this crate.

use std::os::raw::{c_char, c_int, c_void};

pub const SOUND_GENERATOR_API_VERSION: u32 = 2;
pub const AUDIO_FX_API_VERSION: u32 = 2;
pub const MIDI_FX_API_VERSION: u32 = 1;

/// Queryable MIDI-clock state, handed to plugins through
/// `HostCapabilities::get_clock_status` rather than surfaced as an error
///.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockStatus {
 Stopped = 0,
 Running = 1,
}

pub type LogSinkFn = unsafe extern "C" fn(level: c_int, msg: *const c_char);
pub type MidiSendFn = unsafe extern "C" fn(port: c_int, bytes: *const u8, len: usize);
pub type GetClockStatusFn = unsafe extern "C" fn(bpm_out: *mut f32) -> ClockStatus;

/// Passed by value to every module's init symbol.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct HostCapabilities {
 pub sample_rate: f64,
 pub frames_per_block: u32,
 pub mapped_memory_base: *mut c_void,
 pub audio_in_offset: u32,
 pub audio_out_offset: u32,
 pub log_sink: LogSinkFn,
 pub midi_send: MidiSendFn,
 pub get_clock_status: GetClockStatusFn,
}

pub type CreateInstanceFn =
 unsafe extern "C" fn(module_dir: *const c_char, config_json: *const c_char) -> *mut c_void;
pub type DestroyInstanceFn = unsafe extern "C" fn(inst: *mut c_void);
pub type SetParamFn =
 unsafe extern "C" fn(inst: *mut c_void, key: *const c_char, value: *const c_char);
pub type GetParamFn = unsafe extern "C" fn(
 inst: *mut c_void,
 key: *const c_char,
 buf: *mut c_char,
 buflen: usize,
) -> c_int;

#[repr(C)]
pub struct SoundGeneratorVTable {
 pub api_version: u32,
 pub create_instance: CreateInstanceFn,
 pub destroy_instance: DestroyInstanceFn,
 pub on_midi:
 unsafe extern "C" fn(inst: *mut c_void, bytes: *const u8, len: usize, source: c_int),
 pub set_param: SetParamFn,
 pub get_param: GetParamFn,
 pub render_block: unsafe extern "C" fn(inst: *mut c_void, interleaved: *mut i16, frames: u32),
 pub get_error: Option<unsafe extern "C" fn(inst: *mut c_void, buf: *mut c_char, buflen: usize) -> c_int>,
}

#[repr(C)]
pub struct AudioFxVTable {
 pub api_version: u32,
 pub create_instance: CreateInstanceFn,
 pub destroy_instance: DestroyInstanceFn,
 pub process_block: unsafe extern "C" fn(inst: *mut c_void, interleaved: *mut i16, frames: u32),
 pub set_param: SetParamFn,
 pub get_param: GetParamFn,
}

/// Discovered by symbol-name lookup, not part of the vtable struct; an
/// audio-FX module opts in simply by exporting this symbol.
pub type MoveAudioFxOnMidiFn =
 unsafe extern "C" fn(inst: *mut c_void, bytes: *const u8, len: usize, source: c_int);

#[repr(C)]
pub struct MidiFxVTable {
 pub api_version: u32,
 pub create_instance: CreateInstanceFn,
 pub destroy_instance: DestroyInstanceFn,
 pub process_midi: unsafe extern "C" fn(
 inst: *mut c_void,
 in_msg: *const u8,
 in_len: usize,
 out_msgs: *mut [u8; 3],
 out_lens: *mut u8,
 max_out: usize,
 ) -> usize,
 pub tick: unsafe extern "C" fn(
 inst: *mut c_void,
 frames: u32,
 sample_rate: f64,
 out_msgs: *mut [u8; 3],
 out_lens: *mut u8,
 max_out: usize,
 ) -> usize,
 pub set_param: SetParamFn,
 pub get_param: GetParamFn,
}

pub const SOUND_GENERATOR_INIT_SYMBOL: &[u8] = b"augment_sound_generator_v2_init\0";
pub const AUDIO_FX_INIT_SYMBOL: &[u8] = b"augment_audio_fx_v2_init\0";
pub const MIDI_FX_INIT_SYMBOL: &[u8] = b"augment_midi_fx_v1_init\0";
pub const AUDIO_FX_MIDI_HANDLER_SYMBOL: &[u8] = b"move_audio_fx_on_midi\0";

/// Maximum fan-out of a single MIDI event through one MIDI-FX stage, per
/// and the per-block `tick` harvest in §4.2.
pub const MAX_MIDI_FANOUT: usize = 16;
