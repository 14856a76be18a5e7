//! Session machinery
//!
//! Owns the privileged side of the property layer: binding configurations
//! into sessions and publishing results and cancellations.

mod binding;
mod result;

pub use binding::{RecognitionMode, Session};
pub use result::{CancellationInfo, CancellationReason, RecognitionResult};
