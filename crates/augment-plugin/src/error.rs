//! Error types for plugin loading and routing.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStage {
 NameValidation,
 Opening,
 SymbolResolution,
 VersionCheck,
 Init,
 CreateInstance,
}

impl std::fmt::Display for LoadStage {
 fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
 match self {
 LoadStage::NameValidation => write!(f, "validating module name"),
 LoadStage::Opening => write!(f, "opening shared object"),
 LoadStage::SymbolResolution => write!(f, "resolving init symbol"),
 LoadStage::VersionCheck => write!(f, "checking ABI version"),
 LoadStage::Init => write!(f, "calling init symbol"),
 LoadStage::CreateInstance => write!(f, "creating instance"),
 }
 }
}

#[derive(Error, Debug)]
pub enum PluginError {
 #[error("invalid module name: {0}")]
 InvalidModuleName(String),

 #[error("module load failed at {stage} stage for '{module}': {reason}")]
 LoadFailed {
 module: String,
 stage: LoadStage,
 reason: String,
 },

 #[error("ABI version mismatch for '{module}': expected {expected}, got {actual}")]
 VersionMismatch {
 module: String,
 expected: u32,
 actual: u32,
 },

 #[error("create_instance returned null for '{module}'")]
 InstanceCreationFailed { module: String },

 #[error("no such slot: {0}")]
 NoSuchSlot(i32),

 #[error("no live plugin for target")]
 NoLivePlugin,

 #[error("set_param not supported by this plugin")]
 SetParamUnsupported,

 #[error("get_param not supported by this plugin")]
 GetParamUnsupported,

 #[error("unknown parameter key: {0}")]
 UnknownKey(String),

 #[error("duplicate parameter key '{0}' in module descriptor")]
 DuplicateKey(String),

 #[error("malformed module descriptor: {0}")]
 MalformedDescriptor(String),

 #[error("io error: {0}")]
 Io(#[from] std::io::Error),

 #[error("json error: {0}")]
 Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PluginError>;

#[cfg(test)]
mod tests {
 use super::*;

 #[test]
 fn load_stage_display_is_human_readable() {
 assert_eq!(LoadStage::Opening.to_string(), "opening shared object");
 assert_eq!(LoadStage::VersionCheck.to_string(), "checking ABI version");
 }

 #[test]
 fn version_mismatch_formats_both_versions() {
 let err = PluginError::VersionMismatch {
 module: "reverb".into(),
 expected: 2,
 actual: 1,
 };
 let msg = err.to_string();
 assert!(msg.contains("reverb"));
 assert!(msg.contains("expected 2"));
 assert!(msg.contains("got 1"));
 }
}
