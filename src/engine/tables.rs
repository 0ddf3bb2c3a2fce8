//! Static rate and quality tables.
//!
//! Bitrates are in kbps and keyed by target height. Sources at or below 30 fps use
//! the standard column, faster sources use the high-framerate column, which only
//! covers 720p and up.

use super::types::{Codec, Rational};

/// Heights the planner knows how to encode, lowest first
pub const SUPPORTED_RESOLUTIONS: [u32; 8] = [144, 240, 360, 480, 720, 1080, 1440, 2160];

/// Framerate bucket used to pick a bitrate column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramerateClass {
    /// At most 30 fps
    Standard,
    /// Above 30 fps
    High,
}

impl FramerateClass {
    pub fn of(fps: Rational) -> Self {
        if fps.le_integer(30) {
            FramerateClass::Standard
        } else {
            FramerateClass::High
        }
    }
}

fn standard_bitrate(codec: Codec, height: u32) -> Option<u32> {
    let kbps = match (codec, height) {
        (Codec::H264, 144) => 150,
        (Codec::H264, 240) => 300,
        (Codec::H264, 360) => 500,
        (Codec::H264, 480) => 1000,
        (Codec::H264, 720) => 2500,
        (Codec::H264, 1080) => 4500,
        (Codec::H264, 1440) => 9000,
        (Codec::H264, 2160) => 18000,
        // H.265 and VP9 share one ladder
        (Codec::H265 | Codec::Vp9, 144) => 75,
        (Codec::H265 | Codec::Vp9, 240) => 150,
        (Codec::H265 | Codec::Vp9, 360) => 275,
        (Codec::H265 | Codec::Vp9, 480) => 500,
        (Codec::H265 | Codec::Vp9, 720) => 1024,
        (Codec::H265 | Codec::Vp9, 1080) => 1800,
        (Codec::H265 | Codec::Vp9, 1440) => 4500,
        (Codec::H265 | Codec::Vp9, 2160) => 10000,
        _ => return None,
    };
    Some(kbps)
}

fn high_framerate_bitrate(codec: Codec, height: u32) -> Option<u32> {
    let kbps = match (codec, height) {
        (Codec::H264, 720) => 3500,
        (Codec::H264, 1080) => 7500,
        (Codec::H264, 1440) => 18000,
        (Codec::H264, 2160) => 40000,
        (Codec::H265 | Codec::Vp9, 720) => 1800,
        (Codec::H265 | Codec::Vp9, 1080) => 3000,
        (Codec::H265 | Codec::Vp9, 1440) => 8000,
        (Codec::H265 | Codec::Vp9, 2160) => 18000,
        _ => return None,
    };
    Some(kbps)
}

/// Exact table lookup, no fallback between columns
pub fn bitrate_kbps(codec: Codec, class: FramerateClass, height: u32) -> Option<u32> {
    match class {
        FramerateClass::Standard => standard_bitrate(codec, height),
        FramerateClass::High => high_framerate_bitrate(codec, height),
    }
}

/// Target bitrate for an encode. A high-framerate source whose height has no
/// high-framerate entry uses the standard column.
pub fn target_bitrate_kbps(codec: Codec, fps: Rational, height: u32) -> Option<u32> {
    bitrate_kbps(codec, FramerateClass::of(fps), height)
        .or_else(|| standard_bitrate(codec, height))
}

/// Default constant-quality value per codec
pub fn default_crf(codec: Codec) -> u32 {
    match codec {
        Codec::H264 => 23,
        Codec::H265 => 28,
        Codec::Vp9 => 32,
    }
}

/// Inclusive CRF range an operator override must fall in
pub fn crf_range(codec: Codec) -> (u32, u32) {
    match codec {
        Codec::H264 => (18, 28),
        Codec::H265 => (20, 32),
        Codec::Vp9 => (24, 40),
    }
}

/// Audio encoder the container expects when no policy override applies
pub fn audio_encoder(codec: Codec) -> &'static str {
    match codec {
        Codec::H264 | Codec::H265 => "aac",
        Codec::Vp9 => "libopus",
    }
}

pub fn audio_bitrate_kbps(codec: Codec) -> u32 {
    match codec {
        Codec::H264 | Codec::H265 => 128,
        Codec::Vp9 => 96,
    }
}

/// Output container extension
pub fn extension(codec: Codec) -> &'static str {
    match codec {
        Codec::H264 | Codec::H265 => "mp4",
        Codec::Vp9 => "webm",
    }
}

/// Encoder profile, VP9 has none
pub fn video_profile(codec: Codec) -> Option<&'static str> {
    match codec {
        Codec::H264 | Codec::H265 => Some("main"),
        Codec::Vp9 => None,
    }
}

/// Codec level for profiles that carry one
pub fn level_for_height(height: u32) -> &'static str {
    if height <= 1080 { "4.2" } else { "5.2" }
}
