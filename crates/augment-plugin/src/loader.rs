//! Module loading: shared-object resolution, init-symbol invocation, and
//! the ABI version guard: resolve the library, resolve the init symbol,
//! check version compatibility before calling into the plugin.

use crate::abi::*;
use crate::descriptor::ModuleDescriptor;
use crate::error::{LoadStage, PluginError, Result};
use libloading::{Library, Symbol};
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::path::{Path, PathBuf};

/// Rejects path-traversal sequences and empty names.
pub fn validate_module_name(name: &str) -> Result<()> {
 if name.is_empty() || name.contains("..") || name.contains('/') || name.contains('\\') {
 return Err(PluginError::InvalidModuleName(name.to_string()));
 }
 Ok(())
}

fn module_library_path(modules_dir: &Path, name: &str) -> PathBuf {
 #[cfg(target_os = "macos")]
 let file_name = format!("lib{name}.dylib");
 #[cfg(target_os = "windows")]
 let file_name = format!("{name}.dll");
 #[cfg(not(any(target_os = "macos", target_os = "windows")))]
 let file_name = format!("lib{name}.so");

 modules_dir.join(name).join(file_name)
}

unsafe extern "C" fn default_log_sink(_level: std::os::raw::c_int, msg: *const c_char) {
 if !msg.is_null() {
 let text = CStr::from_ptr(msg).to_string_lossy();
 tracing::debug!(target: "augment_plugin::module", "{text}");
 }
}

unsafe extern "C" fn default_midi_send(_port: std::os::raw::c_int, _bytes: *const u8, _len: usize) {}

unsafe extern "C" fn default_clock_status(bpm_out: *mut f32) -> ClockStatus {
 if !bpm_out.is_null() {
 *bpm_out = 0.0;
 }
 ClockStatus::Stopped
}

pub fn default_host_capabilities(sample_rate: f64, frames_per_block: u32) -> HostCapabilities {
 HostCapabilities {
 sample_rate,
 frames_per_block,
 mapped_memory_base: std::ptr::null_mut(),
 audio_in_offset: 0,
 audio_out_offset: 0,
 log_sink: default_log_sink,
 midi_send: default_midi_send,
 get_clock_status: default_clock_status,
 }
}

/// Opens `name`'s shared object beneath `modules_dir` and resolves the
/// init symbol named `init_symbol`, returning the raw vtable pointer the
/// init call produced. Generic over the three ABI vtable kinds.
///
/// # Safety
/// `V` must exactly match the `#[repr(C)]` layout the module's init symbol
/// actually returns a pointer to; this is guaranteed only by the loader
/// using the correct `init_symbol` for `V`.
unsafe fn open_and_init<V>(
 modules_dir: &Path,
 name: &str,
 init_symbol: &[u8],
 caps: HostCapabilities,
) -> Result<(Library, *const V)> {
 validate_module_name(name).map_err(|_| PluginError::LoadFailed {
 module: name.to_string(),
 stage: LoadStage::NameValidation,
 reason: "rejected path-traversal or empty name".into(),
 })?;

 let path = module_library_path(modules_dir, name);
 let library = Library::new(&path).map_err(|e| PluginError::LoadFailed {
 module: name.to_string(),
 stage: LoadStage::Opening,
 reason: e.to_string(),
 })?;

 type InitFn = unsafe extern "C" fn(caps: HostCapabilities) -> *const std::os::raw::c_void;
 let init: Symbol<InitFn> =
 library
.get(init_symbol)
.map_err(|e| PluginError::LoadFailed {
 module: name.to_string(),
 stage: LoadStage::SymbolResolution,
 reason: e.to_string(),
 })?;

 let vtable_ptr = init(caps) as *const V;
 if vtable_ptr.is_null() {
 return Err(PluginError::LoadFailed {
 module: name.to_string(),
 stage: LoadStage::Init,
 reason: "init symbol returned a null vtable".into(),
 });
 }

 Ok((library, vtable_ptr))
}

fn check_version(name: &str, expected: u32, actual: u32) -> Result<()> {
 if actual != expected {
 return Err(PluginError::VersionMismatch {
 module: name.to_string(),
 expected,
 actual,
 });
 }
 Ok(())
}

fn to_cstring(s: &str) -> CString {
 CString::new(s).unwrap_or_default()
}

fn read_c_buf(buf: &[u8]) -> String {
 let nul = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
 String::from_utf8_lossy(&buf[..nul]).into_owned()
}

/// Reads and parses `modules_dir/name/module.json`, if present. Missing or
/// unparsable descriptor files are not fatal to loading the module itself
/// (the descriptor only feeds the parameter bus and knob macro engine);
/// failures are logged and treated as "no descriptor".
fn load_sibling_descriptor(modules_dir: &Path, name: &str) -> Option<ModuleDescriptor> {
 let path = modules_dir.join(name).join("module.json");
 let body = std::fs::read_to_string(&path).ok()?;
 match ModuleDescriptor::parse(&body) {
 Ok(descriptor) => Some(descriptor),
 Err(e) => {
 tracing::warn!(module = name, error = %e, "failed to parse module.json, proceeding without a descriptor");
 None
 }
 }
}

/// An owning handle to a loaded sound-generator instance.
pub struct LoadedGenerator {
 _library: Library,
 vtable: *const SoundGeneratorVTable,
 instance: *mut std::os::raw::c_void,
 pub module_name: String,
 pub descriptor: Option<ModuleDescriptor>,
}

unsafe impl Send for LoadedGenerator {}

impl LoadedGenerator {
 pub fn load(
 modules_dir: &Path,
 name: &str,
 config_json: &str,
 caps: HostCapabilities,
 ) -> Result<Self> {
 let (library, vtable) = unsafe {
 open_and_init::<SoundGeneratorVTable>(
 modules_dir,
 name,
 SOUND_GENERATOR_INIT_SYMBOL,
 caps,
 )?
 };
 let vt = unsafe { &*vtable };
 check_version(name, SOUND_GENERATOR_API_VERSION, vt.api_version)?;

 let module_dir_c = to_cstring(&modules_dir.join(name).to_string_lossy());
 let config_c = to_cstring(config_json);
 let instance =
 unsafe { (vt.create_instance)(module_dir_c.as_ptr(), config_c.as_ptr()) };
 if instance.is_null() {
 return Err(PluginError::InstanceCreationFailed {
 module: name.to_string(),
 });
 }

 Ok(Self {
 _library: library,
 vtable,
 instance,
 module_name: name.to_string(),
 descriptor: load_sibling_descriptor(modules_dir, name),
 })
 }

 fn vt(&self) -> &SoundGeneratorVTable {
 unsafe { &*self.vtable }
 }

 pub fn on_midi(&mut self, bytes: &[u8], source: i32) {
 unsafe {
 (self.vt().on_midi)(self.instance, bytes.as_ptr(), bytes.len(), source);
 }
 }

 pub fn set_param(&mut self, key: &str, value: &str) {
 let key_c = to_cstring(key);
 let value_c = to_cstring(value);
 unsafe {
 (self.vt().set_param)(self.instance, key_c.as_ptr(), value_c.as_ptr());
 }
 }

 pub fn get_param(&mut self, key: &str) -> Option<String> {
 let key_c = to_cstring(key);
 let mut buf = [0u8; 512];
 let len = unsafe {
 (self.vt().get_param)(
 self.instance,
 key_c.as_ptr(),
 buf.as_mut_ptr() as *mut c_char,
 buf.len(),
 )
 };
 if len < 0 {
 None
 } else {
 Some(read_c_buf(&buf))
 }
 }

 pub fn render_block(&mut self, interleaved: &mut [i16], frames: u32) {
 unsafe {
 (self.vt().render_block)(self.instance, interleaved.as_mut_ptr(), frames);
 }
 }

 pub fn get_error(&mut self) -> Option<String> {
 let get_error = self.vt().get_error?;
 let mut buf = [0u8; 512];
 let len = unsafe { get_error(self.instance, buf.as_mut_ptr() as *mut c_char, buf.len()) };
 if len <= 0 {
 None
 } else {
 Some(read_c_buf(&buf))
 }
 }
}

impl Drop for LoadedGenerator {
 fn drop(&mut self) {
 unsafe {
 (self.vt().destroy_instance)(self.instance);
 }
 }
}

/// An owning handle to a loaded audio-FX instance.
pub struct LoadedAudioFx {
 library: Library,
 vtable: *const AudioFxVTable,
 instance: *mut std::os::raw::c_void,
 midi_handler: Option<MoveAudioFxOnMidiFn>,
 pub module_name: String,
 pub descriptor: Option<ModuleDescriptor>,
}

unsafe impl Send for LoadedAudioFx {}

impl LoadedAudioFx {
 pub fn load(
 modules_dir: &Path,
 name: &str,
 config_json: &str,
 caps: HostCapabilities,
 ) -> Result<Self> {
 let (library, vtable) =
 unsafe { open_and_init::<AudioFxVTable>(modules_dir, name, AUDIO_FX_INIT_SYMBOL, caps)? };
 let vt = unsafe { &*vtable };
 check_version(name, AUDIO_FX_API_VERSION, vt.api_version)?;

 let module_dir_c = to_cstring(&modules_dir.join(name).to_string_lossy());
 let config_c = to_cstring(config_json);
 let instance =
 unsafe { (vt.create_instance)(module_dir_c.as_ptr(), config_c.as_ptr()) };
 if instance.is_null() {
 return Err(PluginError::InstanceCreationFailed {
 module: name.to_string(),
 });
 }

 let midi_handler = unsafe {
 library
.get::<MoveAudioFxOnMidiFn>(AUDIO_FX_MIDI_HANDLER_SYMBOL)
.ok()
.map(|sym| *sym)
 };

 Ok(Self {
 library,
 vtable,
 instance,
 midi_handler,
 module_name: name.to_string(),
 descriptor: load_sibling_descriptor(modules_dir, name),
 })
 }

 fn vt(&self) -> &AudioFxVTable {
 unsafe { &*self.vtable }
 }

 pub fn process_block(&mut self, interleaved: &mut [i16], frames: u32) {
 unsafe {
 (self.vt().process_block)(self.instance, interleaved.as_mut_ptr(), frames);
 }
 }

 pub fn set_param(&mut self, key: &str, value: &str) {
 let key_c = to_cstring(key);
 let value_c = to_cstring(value);
 unsafe {
 (self.vt().set_param)(self.instance, key_c.as_ptr(), value_c.as_ptr());
 }
 }

 pub fn get_param(&mut self, key: &str) -> Option<String> {
 let key_c = to_cstring(key);
 let mut buf = [0u8; 512];
 let len = unsafe {
 (self.vt().get_param)(
 self.instance,
 key_c.as_ptr(),
 buf.as_mut_ptr() as *mut c_char,
 buf.len(),
 )
 };
 if len < 0 {
 None
 } else {
 Some(read_c_buf(&buf))
 }
 }

 pub fn has_midi_handler(&self) -> bool {
 self.midi_handler.is_some()
 }

 pub fn on_midi(&mut self, bytes: &[u8], source: i32) {
 if let Some(handler) = self.midi_handler {
 unsafe {
 handler(self.instance, bytes.as_ptr(), bytes.len(), source);
 }
 }
 }

 /// Keep the library handle alive while exposing it for re-lookup after
 /// a hot-reload; not used on the steady-state audio path.
 pub fn library(&self) -> &Library {
 &self.library
 }
}

impl Drop for LoadedAudioFx {
 fn drop(&mut self) {
 unsafe {
 (self.vt().destroy_instance)(self.instance);
 }
 }
}

/// An owning handle to a loaded MIDI-FX instance.
pub struct LoadedMidiFx {
 _library: Library,
 vtable: *const MidiFxVTable,
 instance: *mut std::os::raw::c_void,
 pub module_name: String,
 pub descriptor: Option<ModuleDescriptor>,
}

unsafe impl Send for LoadedMidiFx {}

impl LoadedMidiFx {
 pub fn load(
 modules_dir: &Path,
 name: &str,
 config_json: &str,
 caps: HostCapabilities,
 ) -> Result<Self> {
 let (library, vtable) =
 unsafe { open_and_init::<MidiFxVTable>(modules_dir, name, MIDI_FX_INIT_SYMBOL, caps)? };
 let vt = unsafe { &*vtable };
 check_version(name, MIDI_FX_API_VERSION, vt.api_version)?;

 let module_dir_c = to_cstring(&modules_dir.join(name).to_string_lossy());
 let config_c = to_cstring(config_json);
 let instance =
 unsafe { (vt.create_instance)(module_dir_c.as_ptr(), config_c.as_ptr()) };
 if instance.is_null() {
 return Err(PluginError::InstanceCreationFailed {
 module: name.to_string(),
 });
 }

 Ok(Self {
 _library: library,
 vtable,
 instance,
 module_name: name.to_string(),
 descriptor: load_sibling_descriptor(modules_dir, name),
 })
 }

 fn vt(&self) -> &MidiFxVTable {
 unsafe { &*self.vtable }
 }

 /// Feeds one input message, returning up to `MAX_MIDI_FANOUT` output
 /// messages.
 pub fn process_midi(&mut self, in_msg: &[u8]) -> smallvec::SmallVec<[[u8; 3]; MAX_MIDI_FANOUT]> {
 let mut out_msgs = [[0u8; 3]; MAX_MIDI_FANOUT];
 let mut out_lens = [0u8; MAX_MIDI_FANOUT];
 let count = unsafe {
 (self.vt().process_midi)(
 self.instance,
 in_msg.as_ptr(),
 in_msg.len(),
 out_msgs.as_mut_ptr(),
 out_lens.as_mut_ptr(),
 MAX_MIDI_FANOUT,
 )
 }
.min(MAX_MIDI_FANOUT);

 out_msgs[..count].iter().copied().collect()
 }

 /// Per-block tick; generated messages go straight to the synth and are
 /// not re-processed by later MIDI-FX stages.
 pub fn tick(&mut self, frames: u32, sample_rate: f64) -> smallvec::SmallVec<[[u8; 3]; MAX_MIDI_FANOUT]> {
 let mut out_msgs = [[0u8; 3]; MAX_MIDI_FANOUT];
 let mut out_lens = [0u8; MAX_MIDI_FANOUT];
 let count = unsafe {
 (self.vt().tick)(
 self.instance,
 frames,
 sample_rate,
 out_msgs.as_mut_ptr(),
 out_lens.as_mut_ptr(),
 MAX_MIDI_FANOUT,
 )
 }
.min(MAX_MIDI_FANOUT);

 out_msgs[..count].iter().copied().collect()
 }

 pub fn set_param(&mut self, key: &str, value: &str) {
 let key_c = to_cstring(key);
 let value_c = to_cstring(value);
 unsafe {
 (self.vt().set_param)(self.instance, key_c.as_ptr(), value_c.as_ptr());
 }
 }

 pub fn get_param(&mut self, key: &str) -> Option<String> {
 let key_c = to_cstring(key);
 let mut buf = [0u8; 512];
 let len = unsafe {
 (self.vt().get_param)(
 self.instance,
 key_c.as_ptr(),
 buf.as_mut_ptr() as *mut c_char,
 buf.len(),
 )
 };
 if len < 0 {
 None
 } else {
 Some(read_c_buf(&buf))
 }
 }
}

impl Drop for LoadedMidiFx {
 fn drop(&mut self) {
 unsafe {
 (self.vt().destroy_instance)(self.instance);
 }
 }
}

#[cfg(test)]
mod tests {
 use super::*;

 #[test]
 fn rejects_path_traversal() {
 assert!(validate_module_name("../etc/passwd").is_err());
 assert!(validate_module_name("foo/bar").is_err());
 assert!(validate_module_name("").is_err());
 }

 #[test]
 fn accepts_plain_names() {
 assert!(validate_module_name("reverb").is_ok());
 assert!(validate_module_name("my_synth_2").is_ok());
 }

 #[test]
 fn read_c_buf_stops_at_nul() {
 let buf = b"hello\0garbage";
 assert_eq!(read_c_buf(buf), "hello");
 }
}
