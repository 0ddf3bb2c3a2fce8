//! Closed vocabularies shared by the policy resolver and the command synthesizer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Target video codec family
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    H264,
    H265,
    Vp9,
}

impl Codec {
    pub const ALL: [Codec; 3] = [Codec::H264, Codec::H265, Codec::Vp9];

    /// Parse a codec name as operators and callers write it.
    /// `hevc` is accepted as an alias for `h265`.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "h264" => Some(Codec::H264),
            "h265" | "hevc" => Some(Codec::H265),
            "vp9" => Some(Codec::Vp9),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Codec::H264 => "h264",
            Codec::H265 => "h265",
            Codec::Vp9 => "vp9",
        }
    }
}

/// Where video encoding runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Software,
    Hardware,
}

impl Backend {
    /// Accepts the deployment spelling (`cpu`/`gpu`) as well as the long form.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "cpu" | "software" => Some(Backend::Software),
            "gpu" | "hardware" => Some(Backend::Hardware),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Software => "cpu",
            Backend::Hardware => "gpu",
        }
    }
}

/// x264/x265 speed preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Ultrafast,
    Superfast,
    Veryfast,
    Faster,
    Fast,
    #[default]
    Medium,
    Slow,
    Slower,
    Veryslow,
}

impl Preset {
    pub const ALL: [Preset; 9] = [
        Preset::Ultrafast,
        Preset::Superfast,
        Preset::Veryfast,
        Preset::Faster,
        Preset::Fast,
        Preset::Medium,
        Preset::Slow,
        Preset::Slower,
        Preset::Veryslow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Ultrafast => "ultrafast",
            Preset::Superfast => "superfast",
            Preset::Veryfast => "veryfast",
            Preset::Faster => "faster",
            Preset::Fast => "fast",
            Preset::Medium => "medium",
            Preset::Slow => "slow",
            Preset::Slower => "slower",
            Preset::Veryslow => "veryslow",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|p| p.as_str() == raw)
    }
}

/// H.264 profile emitted with `-profile:v`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum H264Profile {
    Baseline,
    #[default]
    Main,
    High,
}

impl H264Profile {
    pub const ALL: [H264Profile; 3] = [H264Profile::Baseline, H264Profile::Main, H264Profile::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            H264Profile::Baseline => "baseline",
            H264Profile::Main => "main",
            H264Profile::High => "high",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|p| p.as_str() == raw)
    }
}

/// Audio codec for MP4-family outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioCodec {
    #[default]
    Aac,
    Opus,
    Mp3,
}

impl AudioCodec {
    pub const ALL: [AudioCodec; 3] = [AudioCodec::Aac, AudioCodec::Opus, AudioCodec::Mp3];

    pub fn as_str(&self) -> &'static str {
        match self {
            AudioCodec::Aac => "aac",
            AudioCodec::Opus => "opus",
            AudioCodec::Mp3 => "mp3",
        }
    }

    /// FFmpeg encoder name for `-c:a`
    pub fn encoder(&self) -> &'static str {
        match self {
            AudioCodec::Aac => "aac",
            AudioCodec::Opus => "libopus",
            AudioCodec::Mp3 => "libmp3lame",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|c| c.as_str() == raw)
    }
}

/// NVENC preset, p1 (fastest) to p7 (best quality)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HardwarePreset {
    P1,
    P2,
    P3,
    #[default]
    P4,
    P5,
    P6,
    P7,
}

impl HardwarePreset {
    pub const ALL: [HardwarePreset; 7] = [
        HardwarePreset::P1,
        HardwarePreset::P2,
        HardwarePreset::P3,
        HardwarePreset::P4,
        HardwarePreset::P5,
        HardwarePreset::P6,
        HardwarePreset::P7,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HardwarePreset::P1 => "p1",
            HardwarePreset::P2 => "p2",
            HardwarePreset::P3 => "p3",
            HardwarePreset::P4 => "p4",
            HardwarePreset::P5 => "p5",
            HardwarePreset::P6 => "p6",
            HardwarePreset::P7 => "p7",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|p| p.as_str() == raw)
    }
}

macro_rules! display_as_str {
    ($($ty:ty),* $(,)?) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )*
    };
}

display_as_str!(Codec, Backend, Preset, H264Profile, AudioCodec, HardwarePreset);

/// Rate control strategy for one (codec, resolution) encode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateControl {
    /// Constant quality, single pass
    Crf,
    /// Average bitrate with an analysis pass
    TwoPass,
}

impl fmt::Display for RateControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateControl::Crf => f.write_str("crf"),
            RateControl::TwoPass => f.write_str("twopass"),
        }
    }
}

/// The encoder that will actually run. Each variant owns a distinct flag grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EncoderId {
    SoftwareH264,
    HardwareH264,
    SoftwareH265,
    SoftwareVp9,
}

impl EncoderId {
    /// Pick the encoder for a codec. Only H.264 has a hardware path.
    pub fn select(codec: Codec, backend: Backend) -> Self {
        match (codec, backend) {
            (Codec::H264, Backend::Hardware) => EncoderId::HardwareH264,
            (Codec::H264, Backend::Software) => EncoderId::SoftwareH264,
            (Codec::H265, _) => EncoderId::SoftwareH265,
            (Codec::Vp9, _) => EncoderId::SoftwareVp9,
        }
    }

    /// Name passed to `-c:v`
    pub fn ffmpeg_name(&self) -> &'static str {
        match self {
            EncoderId::SoftwareH264 => "libx264",
            EncoderId::HardwareH264 => "h264_nvenc",
            EncoderId::SoftwareH265 => "libx265",
            EncoderId::SoftwareVp9 => "libvpx-vp9",
        }
    }

    pub fn is_hardware(&self) -> bool {
        matches!(self, EncoderId::HardwareH264)
    }

    pub fn supports_two_pass(&self) -> bool {
        !self.is_hardware()
    }
}

impl fmt::Display for EncoderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ffmpeg_name())
    }
}

/// An exact, always-reduced frame rate such as `30000/1001`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rational {
    num: u64,
    den: u64,
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

impl Rational {
    pub const ONE: Rational = Rational { num: 1, den: 1 };

    /// Returns `None` when the denominator is zero.
    pub fn new(num: u64, den: u64) -> Option<Self> {
        if den == 0 {
            return None;
        }
        let g = gcd(num, den).max(1);
        Some(Self {
            num: num / g,
            den: den / g,
        })
    }

    pub fn from_integer(num: u64) -> Self {
        Self { num, den: 1 }
    }

    pub fn numer(&self) -> u64 {
        self.num
    }

    pub fn denom(&self) -> u64 {
        self.den
    }

    pub fn is_zero(&self) -> bool {
        self.num == 0
    }

    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }

    fn cmp_integer(&self, value: u64) -> std::cmp::Ordering {
        (self.num as u128).cmp(&(value as u128 * self.den as u128))
    }

    pub fn gt_integer(&self, value: u64) -> bool {
        self.cmp_integer(value).is_gt()
    }

    pub fn le_integer(&self, value: u64) -> bool {
        !self.gt_integer(value)
    }

    pub fn lt_integer(&self, value: u64) -> bool {
        self.cmp_integer(value).is_lt()
    }

    pub fn halved(&self) -> Self {
        if self.num % 2 == 0 {
            Self {
                num: self.num / 2,
                den: self.den,
            }
        } else {
            Self {
                num: self.num,
                den: self.den.saturating_mul(2),
            }
        }
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid frame rate '{0}'")]
pub struct ParseRationalError(pub String);

impl FromStr for Rational {
    type Err = ParseRationalError;

    /// Accepts `n/d` (ffprobe's `r_frame_rate`) or a bare integer.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseRationalError(s.to_string());
        let s = s.trim();
        let (num, den) = match s.split_once('/') {
            Some((n, d)) => (n.trim(), d.trim()),
            None => (s, "1"),
        };
        let num: u64 = num.parse().map_err(|_| err())?;
        let den: u64 = den.parse().map_err(|_| err())?;
        Rational::new(num, den).ok_or_else(err)
    }
}

impl TryFrom<String> for Rational {
    type Error = ParseRationalError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rational> for String {
    fn from(value: Rational) -> Self {
        value.to_string()
    }
}
