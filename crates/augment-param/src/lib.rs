//! Parameter bus, smoothing pipeline, and knob macro engine.

pub mod bus;
pub mod error;
pub mod knob;
pub mod smooth;

pub use bus::{dsp_value_to_float, parse_numeric_target, route, ParamTarget};
pub use error::{ParamError, Result};
pub use knob::{acceleration, direction_for_cc_value, KnobMapping, KNOB_CC_MAX, KNOB_CC_MIN};
pub use smooth::{SmoothedParam, SmoothingState};
