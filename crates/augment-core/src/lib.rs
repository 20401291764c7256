//! Data model, audio mailbox, and block scheduler for the per-slot
//! plugin-hosting signal-chain engine.

pub mod announce;
pub mod capture;
pub mod chain;
pub mod config;
pub mod error;
pub mod mailbox;
pub mod master;
pub mod overlay;
pub mod rpc;
pub mod scheduler;

pub use announce::AnnounceQueue;
pub use capture::{CaptureRules, CcGroup, NoteGroup};
pub use chain::{
 ChainSlot, InputFilter, SignalChainInstance, MAX_AUDIO_FX, MAX_MIDI_FX, MUTE_WINDOW_BLOCKS, NUM_SLOTS,
 SOURCE_HOST,
};
pub use config::AugmentConfig;
pub use error::{Error, Result};
pub use mailbox::{AudioMailbox, MailboxLayout};
pub use master::{MasterChain, MasterFxSlot, MAX_MASTER_SLOTS};
pub use overlay::{OverlayKind, OverlayState};
pub use rpc::{ParamRpcRequest, ParamRpcSlot, RequestType, RpcError};
pub use scheduler::{AudioSink, BlockScheduler, NullSink};
