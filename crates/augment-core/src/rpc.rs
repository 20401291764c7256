//! The out-of-process parameter RPC (spec §6.7): a single fixed-size
//! shared-memory request/response slot an out-of-process UI uses to drive
//! `set_param`/`get_param` without its own audio-thread access.
//!
//! Grounded on [`crate::mailbox`]'s `AudioMailbox`: same `UnsafeCell`-wrapped
//! `memmap2::MmapMut` over a fixed byte layout, manually packed rather than
//! cast through a `#[repr(C)]` pointer, since the region is written from one
//! side and read from the other and normal aliasing rules do not apply.

use crate::error::{Error, Result};
use memmap2::MmapMut;
use std::cell::UnsafeCell;
use std::fs::OpenOptions;
use std::path::Path;

pub const KEY_BYTES: usize = 128;
pub const VALUE_BYTES: usize = 512;

const OFF_REQUEST_ID: usize = 0;
const OFF_RESPONSE_ID: usize = 4;
const OFF_REQUEST_TYPE: usize = 8;
const OFF_SLOT: usize = 9;
const OFF_KEY: usize = 10;
const OFF_VALUE: usize = OFF_KEY + KEY_BYTES;
const OFF_RESPONSE_READY: usize = OFF_VALUE + VALUE_BYTES;
const OFF_RESULT_LEN: usize = OFF_RESPONSE_READY + 1;
const OFF_ERROR: usize = OFF_RESULT_LEN + 2;
/// Total byte size of the slot: `4+4+1+1+128+512+1+2+1 = 654`.
pub const SLOT_BYTES: usize = OFF_ERROR + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestType {
 Idle,
 Set,
 Get,
}

impl RequestType {
 fn from_byte(b: u8) -> Self {
 match b {
 1 => RequestType::Set,
 2 => RequestType::Get,
 _ => RequestType::Idle,
 }
 }
}

/// The error-code taxonomy from §6.7: 1 invalid slot, 2 no plugin, 3
/// `set_param` missing, 4/5 `get_param` missing (the spec lists both
/// codes under the same description; 5 is reserved here for the
/// "target resolved but returned no value" variant), 6 unknown request,
/// 7..13 master/overtake-specific failure kinds kept as a raw code since
/// the spec doesn't enumerate their individual meanings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcError {
 InvalidSlot,
 NoPlugin,
 SetParamMissing,
 GetParamMissing,
 GetParamReturnedNone,
 UnknownRequest,
 MasterOrOvertake(u8),
}

impl RpcError {
 fn to_byte(self) -> u8 {
 match self {
 RpcError::InvalidSlot => 1,
 RpcError::NoPlugin => 2,
 RpcError::SetParamMissing => 3,
 RpcError::GetParamMissing => 4,
 RpcError::GetParamReturnedNone => 5,
 RpcError::UnknownRequest => 6,
 RpcError::MasterOrOvertake(code) => code,
 }
 }
}

/// A decoded pending request, returned once per distinct `request_id`.
#[derive(Debug, Clone)]
pub struct ParamRpcRequest {
 pub request_id: u32,
 pub request_type: RequestType,
 pub slot: i8,
 pub key: String,
}

pub struct ParamRpcSlot {
 mmap: UnsafeCell<MmapMut>,
}

// Safety: mirrors `AudioMailbox` — the RPC-servicing side is the sole
// responder and the UI side is the sole requester; each touches disjoint
// fields of the same region, never concurrently from two call sites on
// this side.
unsafe impl Send for ParamRpcSlot {}
unsafe impl Sync for ParamRpcSlot {}

impl ParamRpcSlot {
 pub fn open(path: &Path) -> Result<Self> {
 let file = OpenOptions::new()
.read(true)
.write(true)
.create(true)
.open(path)
.map_err(Error::Io)?;
 file.set_len(SLOT_BYTES as u64).map_err(Error::Io)?;
 let mmap = unsafe { MmapMut::map_mut(&file) }
.map_err(|e| Error::Mailbox(format!("mmap failed: {e}")))?;
 Ok(Self { mmap: UnsafeCell::new(mmap) })
 }

 fn bytes(&self) -> &[u8] {
 unsafe { &*self.mmap.get() }
 }

 #[allow(clippy::mut_from_ref)]
 fn bytes_mut(&self) -> &mut [u8] {
 unsafe { &mut *self.mmap.get() }
 }

 fn read_u32(&self, off: usize) -> u32 {
 u32::from_le_bytes(self.bytes()[off..off + 4].try_into().unwrap())
 }

 fn write_u32(&self, off: usize, value: u32) {
 self.bytes_mut()[off..off + 4].copy_from_slice(&value.to_le_bytes());
 }

 fn read_fixed_str(&self, off: usize, len: usize) -> String {
 let raw = &self.bytes()[off..off + len];
 let end = raw.iter().position(|&b| b == 0).unwrap_or(len);
 String::from_utf8_lossy(&raw[..end]).into_owned()
 }

 fn write_fixed_str(&self, off: usize, len: usize, s: &str) -> usize {
 let field = &mut self.bytes_mut()[off..off + len];
 field.fill(0);
 let bytes = s.as_bytes();
 let n = bytes.len().min(len - 1);
 field[..n].copy_from_slice(&bytes[..n]);
 n
 }

 /// Reads a pending request if `request_id` has changed since
 /// `last_seen_request_id` and `request_type` isn't idle. Returns `None`
 /// otherwise — callers poll this once per RPC-thread tick.
 pub fn poll(&self, last_seen_request_id: u32) -> Option<ParamRpcRequest> {
 let request_id = self.read_u32(OFF_REQUEST_ID);
 if request_id == last_seen_request_id {
 return None;
 }
 let request_type = RequestType::from_byte(self.bytes()[OFF_REQUEST_TYPE]);
 if request_type == RequestType::Idle {
 return None;
 }
 let slot = self.bytes()[OFF_SLOT] as i8;
 let key = self.read_fixed_str(OFF_KEY, KEY_BYTES);
 Some(ParamRpcRequest { request_id, request_type, slot, key })
 }

 /// Reads the raw `value` field of the current request (only meaningful
 /// for a `Set` request the caller just got from [`Self::poll`]).
 pub fn request_value(&self) -> String {
 self.read_fixed_str(OFF_VALUE, VALUE_BYTES)
 }

 /// Writes a successful response, truncating `value` to fit the fixed
 /// field. `response_ready` is set last so a half-written response is
 /// never observed as ready.
 pub fn respond_ok(&self, request_id: u32, value: &str) {
 self.write_u32(OFF_RESPONSE_ID, request_id);
 let n = self.write_fixed_str(OFF_VALUE, VALUE_BYTES, value);
 self.bytes_mut()[OFF_RESULT_LEN..OFF_RESULT_LEN + 2].copy_from_slice(&(n as i16).to_le_bytes());
 self.bytes_mut()[OFF_ERROR] = 0;
 self.bytes_mut()[OFF_RESPONSE_READY] = 1;
 }

 /// Writes a failure response: empty value, `result_len` 0, the given
 /// error code.
 pub fn respond_err(&self, request_id: u32, error: RpcError) {
 self.write_u32(OFF_RESPONSE_ID, request_id);
 self.write_fixed_str(OFF_VALUE, VALUE_BYTES, "");
 self.bytes_mut()[OFF_RESULT_LEN..OFF_RESULT_LEN + 2].copy_from_slice(&0i16.to_le_bytes());
 self.bytes_mut()[OFF_ERROR] = error.to_byte();
 self.bytes_mut()[OFF_RESPONSE_READY] = 1;
 }

 pub fn response_ready(&self) -> bool {
 self.bytes()[OFF_RESPONSE_READY] != 0
 }

 /// Files a request: the counterpart to [`Self::respond_ok`]/
 /// [`Self::respond_err`] from the requesting side. Production requests
 /// come from an out-of-process UI writing these same bytes directly;
 /// this lets a same-process test harness drive the protocol without
 /// duplicating the byte layout.
 pub fn file_request(&self, request_id: u32, request_type: RequestType, slot: i8, key: &str, value: &str) {
 self.write_fixed_str(OFF_KEY, KEY_BYTES, key);
 self.write_fixed_str(OFF_VALUE, VALUE_BYTES, value);
 self.bytes_mut()[OFF_SLOT] = slot as u8;
 self.bytes_mut()[OFF_REQUEST_TYPE] = match request_type {
 RequestType::Idle => 0,
 RequestType::Set => 1,
 RequestType::Get => 2,
 };
 self.bytes_mut()[OFF_RESPONSE_READY] = 0;
 self.write_u32(OFF_REQUEST_ID, request_id);
 }
}

#[cfg(test)]
mod tests {
 use super::*;

 fn slot() -> (tempfile::TempDir, ParamRpcSlot) {
 let dir = tempfile::tempdir().unwrap();
 let path = dir.path().join("rpc.bin");
 let slot = ParamRpcSlot::open(&path).unwrap();
 (dir, slot)
 }

 #[test]
 fn poll_ignores_unchanged_request_id() {
 let (_dir, slot) = slot();
 slot.file_request(1, RequestType::Get, 0, "slot:volume", "");
 let first = slot.poll(0).unwrap();
 assert_eq!(first.key, "slot:volume");
 assert!(slot.poll(1).is_none());
 }

 #[test]
 fn poll_ignores_idle_request_type() {
 let (_dir, slot) = slot();
 slot.file_request(7, RequestType::Idle, 0, "", "");
 assert!(slot.poll(0).is_none());
 }

 #[test]
 fn respond_ok_sets_ready_last_and_clears_error() {
 let (_dir, slot) = slot();
 slot.respond_ok(3, "0.5");
 assert!(slot.response_ready());
 assert_eq!(slot.read_u32(OFF_RESPONSE_ID), 3);
 assert_eq!(slot.bytes()[OFF_ERROR], 0);
 let len = i16::from_le_bytes(slot.bytes()[OFF_RESULT_LEN..OFF_RESULT_LEN + 2].try_into().unwrap());
 assert_eq!(len, 3);
 }

 #[test]
 fn respond_err_encodes_the_taxonomy_code() {
 let (_dir, slot) = slot();
 slot.respond_err(4, RpcError::NoPlugin);
 assert_eq!(slot.bytes()[OFF_ERROR], 2);
 assert!(slot.response_ready());
 }

 #[test]
 fn value_field_round_trips_through_set_param_request() {
 let (_dir, slot) = slot();
 slot.file_request(1, RequestType::Set, 0, "slot:volume", "0.75");
 assert_eq!(slot.request_value(), "0.75");
 }
}
