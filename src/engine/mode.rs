//! Rate control selection.
//!
//! Anything longer than [`CRF_THRESHOLD_SECONDS`] gets a single constant-quality
//! pass. Two-pass bitrate encoding is kept for very short clips on the software
//! backend; real content essentially never reaches it.

use serde::Serialize;

use super::types::{Backend, RateControl};

/// Sources longer than this are encoded in CRF mode
pub const CRF_THRESHOLD_SECONDS: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModeSelection {
    pub mode: RateControl,
    /// Set when the backend overrode the duration-based choice
    pub diagnostic: Option<String>,
}

pub fn select_mode(duration_seconds: f64, backend: Backend) -> ModeSelection {
    let by_duration = if duration_seconds > CRF_THRESHOLD_SECONDS {
        RateControl::Crf
    } else {
        RateControl::TwoPass
    };

    match (backend, by_duration) {
        // NVENC multipass does not use the passlogfile scheme pass 2 depends on
        (Backend::Hardware, RateControl::TwoPass) => ModeSelection {
            mode: RateControl::Crf,
            diagnostic: Some(format!(
                "hardware backend does not support passlogfile two-pass; \
                 forcing crf for a {duration_seconds}s source"
            )),
        },
        (_, mode) => ModeSelection {
            mode,
            diagnostic: None,
        },
    }
}
