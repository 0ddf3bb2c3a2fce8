// Media probe record and ffprobe JSON parsing

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::types::Rational;

/// Container formats ffprobe reports for still images and raw streams
const STILL_IMAGE_FORMATS: [&str; 6] = ["tty", "image2", "image2pipe", "bin", "png_pipe", "gif"];

/// What the planner needs to know about a source file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaProbe {
    pub duration_seconds: f64,
    #[serde(default)]
    pub frame_rate: Option<Rational>,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub has_audio: bool,
    #[serde(default)]
    pub interlaced: bool,
    #[serde(default)]
    pub video_codec: String,
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Failed to parse ffprobe JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No streams found in ffprobe output")]
    NoStreams,

    #[error("No video stream found")]
    NoVideoStream,

    #[error("Input is a still image or raw stream (format '{0}')")]
    StillImage(String),

    #[error("Could not determine video duration")]
    MissingDuration,
}

/// Parse the output of
/// `ffprobe -loglevel error -show_streams -show_format -of json <file>`.
pub fn parse_ffprobe_json(json: &str) -> Result<MediaProbe, ProbeError> {
    let json: Value = serde_json::from_str(json)?;

    let streams = json["streams"].as_array().ok_or(ProbeError::NoStreams)?;

    let video = streams
        .iter()
        .find(|s| s["codec_type"].as_str() == Some("video"))
        .ok_or(ProbeError::NoVideoStream)?;
    let has_audio = streams
        .iter()
        .any(|s| s["codec_type"].as_str() == Some("audio"));

    if let Some(format_name) = json["format"]["format_name"].as_str() {
        if STILL_IMAGE_FORMATS.contains(&format_name) {
            return Err(ProbeError::StillImage(format_name.to_string()));
        }
    }

    let duration_seconds = stream_duration(video)
        .or_else(|| json["format"]["duration"].as_str().and_then(|d| d.parse().ok()))
        .ok_or(ProbeError::MissingDuration)?;

    // r_frame_rate first (exact stream rate), avg_frame_rate as fallback.
    // "0/0" means unknown and parses to None.
    let frame_rate = video["r_frame_rate"]
        .as_str()
        .and_then(|r| r.parse::<Rational>().ok())
        .filter(|r| !r.is_zero())
        .or_else(|| {
            video["avg_frame_rate"]
                .as_str()
                .and_then(|r| r.parse::<Rational>().ok())
                .filter(|r| !r.is_zero())
        });

    let interlaced = matches!(
        video["field_order"].as_str(),
        Some("tt" | "tb" | "bt" | "bb")
    );

    Ok(MediaProbe {
        duration_seconds,
        frame_rate,
        width: dimension(&video["width"]),
        height: dimension(&video["height"]),
        has_audio,
        interlaced,
        video_codec: video["codec_name"].as_str().unwrap_or_default().to_string(),
    })
}

/// Out-of-range sizes read as 0, the same as a missing field
fn dimension(value: &Value) -> u32 {
    value
        .as_u64()
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(0)
}

/// Stream-level duration, either the `duration` field or a Matroska-style
/// `DURATION` tag (`HH:MM:SS.fraction`)
fn stream_duration(stream: &Value) -> Option<f64> {
    if let Some(d) = stream["duration"].as_str().and_then(|d| d.parse().ok()) {
        return Some(d);
    }
    stream["tags"]["DURATION"].as_str().and_then(parse_tag_duration)
}

fn parse_tag_duration(tag: &str) -> Option<f64> {
    let (hms, frac) = tag
        .split_once('.')
        .or_else(|| tag.split_once(','))
        .unwrap_or((tag, "0"));

    let mut seconds = 0u64;
    for part in hms.split(':') {
        let part = part.trim().parse::<u64>().ok()?;
        seconds = seconds.checked_mul(60)?.checked_add(part)?;
    }
    let frac: f64 = format!("0.{}", frac.trim()).parse().ok()?;
    Some(seconds as f64 + frac)
}
