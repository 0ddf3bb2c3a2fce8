//! Operator policy resolution.
//!
//! Raw key/value settings (environment or config file) are checked one by one
//! against their accepted domain. Anything out of domain is replaced by the
//! documented default and reported as a [`Warning`]; resolution never fails.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::tables::{self, SUPPORTED_RESOLUTIONS};
use super::types::{AudioCodec, Backend, Codec, H264Profile, HardwarePreset, Preset};

pub const KEY_DO_NOT_TRANSCODE: &str = "DO_NOT_TRANSCODE_VIDEO";
pub const KEY_RESOLUTIONS: &str = "MINIMUM_RESOLUTIONS_TO_ENCODE";
pub const KEY_PRESET: &str = "FFMPEG_DEFAULT_PRESET";
pub const KEY_H264_PROFILE: &str = "FFMPEG_H264_PROFILE";
pub const KEY_CRF_H264: &str = "FFMPEG_CRF_H264";
pub const KEY_CRF_H265: &str = "FFMPEG_CRF_H265";
pub const KEY_CRF_VP9: &str = "FFMPEG_CRF_VP9";
pub const KEY_AUDIO_CODEC: &str = "FFMPEG_AUDIO_CODEC";
pub const KEY_AUDIO_BITRATE: &str = "FFMPEG_AUDIO_BITRATE";
pub const KEY_BACKEND: &str = "ENCODING_BACKEND";
pub const KEY_GPU_PRESET: &str = "ENCODING_GPU_PRESET";
pub const KEY_HLS_ENABLE: &str = "HLS_ENABLE";
pub const KEY_HLS_TIME: &str = "HLS_TIME";
pub const KEY_FFMPEG_COMMAND: &str = "FFMPEG_COMMAND";

/// Every key the resolver reads
pub const KNOWN_KEYS: [&str; 14] = [
    KEY_DO_NOT_TRANSCODE,
    KEY_RESOLUTIONS,
    KEY_PRESET,
    KEY_H264_PROFILE,
    KEY_CRF_H264,
    KEY_CRF_H265,
    KEY_CRF_VP9,
    KEY_AUDIO_CODEC,
    KEY_AUDIO_BITRATE,
    KEY_BACKEND,
    KEY_GPU_PRESET,
    KEY_HLS_ENABLE,
    KEY_HLS_TIME,
    KEY_FFMPEG_COMMAND,
];

pub const DEFAULT_AUDIO_BITRATE_KBPS: u32 = 128;
pub const DEFAULT_HLS_SEGMENT_SECONDS: u32 = 6;
pub const HLS_SEGMENT_RANGE: (u32, u32) = (2, 10);
pub const DEFAULT_FFMPEG_COMMAND: &str = "ffmpeg";

/// Record of a setting that was replaced by its default
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub key: String,
    pub value: String,
    pub accepted: String,
    pub substituted: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}={:?} is not {}; using {}",
            self.key, self.value, self.accepted, self.substituted
        )
    }
}

/// Unvalidated settings, keyed by their environment-style name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPolicy(BTreeMap<String, String>);

impl RawPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Blank values read as unset
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Values from `other` replace values already present. Blank values in
    /// `other` are unset and leave the existing value alone.
    pub fn overlay(&mut self, other: &RawPolicy) {
        for (key, value) in &other.0 {
            if !value.trim().is_empty() {
                self.0.insert(key.clone(), value.clone());
            }
        }
    }

    /// Read the known keys from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut raw = Self::new();
        for key in KNOWN_KEYS {
            if let Some(value) = lookup(key) {
                raw.set(key, value);
            }
        }
        raw
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawPolicy {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Validated, immutable encoding policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodingPolicy {
    pub transcode_enabled: bool,
    /// Heights that may be produced by upscaling
    pub resolutions_enabled: BTreeSet<u32>,
    pub preset: Preset,
    pub h264_profile: H264Profile,
    pub crf: BTreeMap<Codec, u32>,
    pub audio_codec: AudioCodec,
    pub audio_bitrate_kbps: u32,
    pub backend: Backend,
    pub hardware_preset: HardwarePreset,
    pub hls_enabled: bool,
    pub hls_segment_seconds: u32,
    pub ffmpeg_command: String,
}

impl Default for EncodingPolicy {
    fn default() -> Self {
        resolve(&RawPolicy::new()).policy
    }
}

impl EncodingPolicy {
    /// Quality value for a codec, falling back to the table default
    pub fn crf(&self, codec: Codec) -> u32 {
        self.crf
            .get(&codec)
            .copied()
            .unwrap_or_else(|| tables::default_crf(codec))
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_resolutions(mut self, resolutions: impl IntoIterator<Item = u32>) -> Self {
        self.resolutions_enabled = resolutions.into_iter().collect();
        self
    }
}

/// Resolver output: the policy and every correction made to reach it
#[derive(Debug, Clone)]
pub struct Resolved {
    pub policy: EncodingPolicy,
    pub warnings: Vec<Warning>,
}

/// Check one raw setting.
///
/// `parse` both converts and validates; returning `None` means the value is out
/// of domain and `default` is used instead. An unset key yields the default with
/// no warning.
pub fn validate<T: fmt::Display>(
    key: &str,
    raw: Option<&str>,
    parse: impl FnOnce(&str) -> Option<T>,
    default: T,
    accepted: &str,
) -> (T, Option<Warning>) {
    let Some(raw) = raw else {
        return (default, None);
    };
    match parse(raw) {
        Some(value) => (value, None),
        None => {
            let warning = Warning {
                key: key.to_string(),
                value: raw.to_string(),
                accepted: accepted.to_string(),
                substituted: default.to_string(),
            };
            (default, Some(warning))
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_in_range(raw: &str, min: u32, max: u32) -> Option<u32> {
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|v| (min..=max).contains(v))
}

fn parse_audio_bitrate(raw: &str) -> Option<u32> {
    raw.trim()
        .strip_suffix('k')
        .and_then(|n| n.parse::<u32>().ok())
        .filter(|n| *n > 0)
}

fn join_names<T: fmt::Display>(items: impl IntoIterator<Item = T>) -> String {
    let names: Vec<String> = items.into_iter().map(|i| i.to_string()).collect();
    format!("one of {}", names.join("|"))
}

/// Resolve the resolution list. Unknown entries are dropped one by one; an
/// empty result falls back to the whole supported ladder.
fn resolve_resolutions(raw: Option<&str>, warnings: &mut Vec<Warning>) -> BTreeSet<u32> {
    let full_ladder: BTreeSet<u32> = SUPPORTED_RESOLUTIONS.into_iter().collect();
    let Some(raw) = raw else {
        return full_ladder;
    };

    let accepted = format!(
        "a supported resolution ({})",
        SUPPORTED_RESOLUTIONS.map(|r| r.to_string()).join(",")
    );
    let list = raw.trim().trim_start_matches('[').trim_end_matches(']');

    let mut enabled = BTreeSet::new();
    for entry in list.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let parsed = entry
            .parse::<u32>()
            .ok()
            .filter(|h| SUPPORTED_RESOLUTIONS.contains(h));
        match parsed {
            Some(height) => {
                enabled.insert(height);
            }
            None => warnings.push(Warning {
                key: KEY_RESOLUTIONS.to_string(),
                value: entry.to_string(),
                accepted: accepted.clone(),
                substituted: "nothing (entry dropped)".to_string(),
            }),
        }
    }

    if enabled.is_empty() {
        warnings.push(Warning {
            key: KEY_RESOLUTIONS.to_string(),
            value: raw.to_string(),
            accepted: "a list with at least one supported resolution".to_string(),
            substituted: "the full ladder".to_string(),
        });
        return full_ladder;
    }
    enabled
}

/// Collects warnings while unwrapping `validate` results
struct Corrections(Vec<Warning>);

impl Corrections {
    fn take<T>(&mut self, (value, warning): (T, Option<Warning>)) -> T {
        self.0.extend(warning);
        value
    }
}

/// Resolve raw settings into a policy. Pure: corrections are returned, not logged.
pub fn resolve(raw: &RawPolicy) -> Resolved {
    let mut found = Corrections(Vec::new());

    let do_not_transcode: bool = found.take(validate(
        KEY_DO_NOT_TRANSCODE,
        raw.get(KEY_DO_NOT_TRANSCODE),
        parse_bool,
        false,
        "a boolean",
    ));

    let preset = found.take(validate(
        KEY_PRESET,
        raw.get(KEY_PRESET),
        Preset::parse,
        Preset::default(),
        &join_names(Preset::ALL),
    ));

    let h264_profile = found.take(validate(
        KEY_H264_PROFILE,
        raw.get(KEY_H264_PROFILE),
        H264Profile::parse,
        H264Profile::default(),
        &join_names(H264Profile::ALL),
    ));

    let mut crf = BTreeMap::new();
    for (codec, key) in [
        (Codec::H264, KEY_CRF_H264),
        (Codec::H265, KEY_CRF_H265),
        (Codec::Vp9, KEY_CRF_VP9),
    ] {
        let (min, max) = tables::crf_range(codec);
        let value = found.take(validate(
            key,
            raw.get(key),
            |v| parse_in_range(v, min, max),
            tables::default_crf(codec),
            &format!("an integer in {min}-{max}"),
        ));
        crf.insert(codec, value);
    }

    let audio_codec = found.take(validate(
        KEY_AUDIO_CODEC,
        raw.get(KEY_AUDIO_CODEC),
        AudioCodec::parse,
        AudioCodec::default(),
        &join_names(AudioCodec::ALL),
    ));

    let audio_bitrate_kbps = found.take(validate(
        KEY_AUDIO_BITRATE,
        raw.get(KEY_AUDIO_BITRATE),
        parse_audio_bitrate,
        DEFAULT_AUDIO_BITRATE_KBPS,
        "a positive bitrate ending in 'k'",
    ));

    let backend = found.take(validate(
        KEY_BACKEND,
        raw.get(KEY_BACKEND),
        Backend::parse,
        Backend::default(),
        "one of cpu|gpu",
    ));

    let hardware_preset = found.take(validate(
        KEY_GPU_PRESET,
        raw.get(KEY_GPU_PRESET),
        HardwarePreset::parse,
        HardwarePreset::default(),
        &join_names(HardwarePreset::ALL),
    ));

    let hls_enabled = found.take(validate(
        KEY_HLS_ENABLE,
        raw.get(KEY_HLS_ENABLE),
        parse_bool,
        true,
        "a boolean",
    ));

    let (hls_min, hls_max) = HLS_SEGMENT_RANGE;
    let hls_segment_seconds = found.take(validate(
        KEY_HLS_TIME,
        raw.get(KEY_HLS_TIME),
        |v| parse_in_range(v, hls_min, hls_max),
        DEFAULT_HLS_SEGMENT_SECONDS,
        &format!("an integer in {hls_min}-{hls_max}"),
    ));

    // Blank values already read as unset, so any remaining value is usable
    let ffmpeg_command = found.take(validate(
        KEY_FFMPEG_COMMAND,
        raw.get(KEY_FFMPEG_COMMAND),
        |v| Some(v.to_string()),
        DEFAULT_FFMPEG_COMMAND.to_string(),
        "a program name or path",
    ));

    let resolutions_enabled = resolve_resolutions(raw.get(KEY_RESOLUTIONS), &mut found.0);

    Resolved {
        policy: EncodingPolicy {
            transcode_enabled: !do_not_transcode,
            resolutions_enabled,
            preset,
            h264_profile,
            crf,
            audio_codec,
            audio_bitrate_kbps,
            backend,
            hardware_preset,
            hls_enabled,
            hls_segment_seconds,
            ffmpeg_command,
        },
        warnings: found.0,
    }
}
