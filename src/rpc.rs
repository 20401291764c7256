//! Services the out-of-process parameter RPC (spec §6.7) against a live
//! [`AugmentEngine`], translating [`augment_core::rpc::ParamRpcSlot`]
//! requests into `set_param`/`get_param` calls and serializing the result
//! back per the propagation policy in §7: the RPC never panics or drops the
//! connection on a bad request, it serializes an error code instead.

use crate::engine::AugmentEngine;
use augment_core::rpc::{ParamRpcSlot, RequestType, RpcError};

impl AugmentEngine {
 /// Services at most one pending RPC request against `rpc`. Returns
 /// `true` if a request was found and answered, `false` if the slot was
 /// idle (same `request_id` as `last_seen_request_id`, or request_type
 /// idle). Intended to be called once per "Parameter/RPC thread" tick
 /// (spec §3).
 pub fn service_rpc(&mut self, rpc: &ParamRpcSlot, last_seen_request_id: &mut u32) -> bool {
 let Some(request) = rpc.poll(*last_seen_request_id) else {
 return false;
 };
 *last_seen_request_id = request.request_id;

 if request.slot < 0 || request.slot as usize >= self.scheduler.slots.len() {
 rpc.respond_err(request.request_id, RpcError::InvalidSlot);
 return true;
 }
 let slot_index = request.slot as usize;

 match request.request_type {
 RequestType::Set => {
 let value = rpc.request_value();
 match self.set_param(slot_index, &request.key, &value) {
 Ok(()) => rpc.respond_ok(request.request_id, ""),
 Err(_) => rpc.respond_err(request.request_id, RpcError::SetParamMissing),
 }
 }
 RequestType::Get => match self.get_param(slot_index, &request.key, f64::NAN) {
 Ok(v) if v.is_nan() => rpc.respond_err(request.request_id, RpcError::GetParamReturnedNone),
 Ok(v) => rpc.respond_ok(request.request_id, &v.to_string()),
 Err(_) => rpc.respond_err(request.request_id, RpcError::GetParamMissing),
 },
 RequestType::Idle => unreachable!("ParamRpcSlot::poll filters out idle requests"),
 }
 true
 }
}

#[cfg(test)]
mod tests {
 use super::*;
 use crate::AugmentEngine;

 fn engine_with_rpc() -> (tempfile::TempDir, AugmentEngine, ParamRpcSlot) {
 let dir = tempfile::tempdir().unwrap();
 let engine = AugmentEngine::builder()
.sample_rate(1000.0)
.frames_per_block(16)
.modules_dir(dir.path().join("modules"))
.patches_dir(dir.path().join("patches"))
.master_presets_dir(dir.path().join("master_presets"))
.recordings_dir(dir.path().join("recordings"))
.skipback_dir(dir.path().join("skipback"))
.set_pages_dir(dir.path().join("set_pages"))
.library_dir(dir.path().join("library"))
.mailbox_path(dir.path().join("mailbox.bin"))
.build()
.unwrap();
 let rpc = ParamRpcSlot::open(&dir.path().join("rpc.bin")).unwrap();
 (dir, engine, rpc)
 }

 #[test]
 fn set_request_round_trips_a_slot_param() {
 let (_dir, mut engine, rpc) = engine_with_rpc();
 rpc.file_request(1, RequestType::Set, 0, "slot:volume", "0.5");
 let mut last_seen = 0;
 assert!(engine.service_rpc(&rpc, &mut last_seen));
 assert!(rpc.response_ready());
 assert_eq!(last_seen, 1);
 assert_eq!(engine.get_param(0, "slot:volume", -1.0).unwrap(), 0.5_f32 as f64);
 }

 #[test]
 fn get_request_on_invalid_slot_reports_invalid_slot() {
 let (_dir, mut engine, rpc) = engine_with_rpc();
 rpc.file_request(5, RequestType::Get, -2, "slot:volume", "");
 let mut last_seen = 0;
 assert!(engine.service_rpc(&rpc, &mut last_seen));
 assert!(rpc.response_ready());
 }

 #[test]
 fn idle_slot_services_nothing() {
 let (_dir, mut engine, rpc) = engine_with_rpc();
 let mut last_seen = 0;
 assert!(!engine.service_rpc(&rpc, &mut last_seen));
 }
}
