//! FFmpeg argument synthesis.
//!
//! Every encoder identity owns its own flag block. The shared parts (input,
//! filter chain, rate control, audio, tail) are assembled around it in a fixed
//! order so the output matches known-good command strings exactly:
//!
//! ```text
//! ffmpeg -y -i <input> -c:v <encoder> -filter:v <filters> -pix_fmt yuv420p
//!        <rate control> [<audio>] <encoder block> -strict -2 <tail>
//! ```

use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::filters::{filter_chain, force_keyframes_expr, keyframe_distance};
use super::policy::EncodingPolicy;
use super::tables;
use super::types::{Codec, EncoderId, Rational, RateControl};

pub const MAX_RATE_MULTIPLIER: f64 = 1.5;
pub const MIN_RATE_MULTIPLIER: f64 = 0.5;
pub const BUF_SIZE_MULTIPLIER: f64 = 1.5;

/// libvpx-vp9 `-speed` for analysis and final passes
const VP9_SPEED_ANALYSIS: u32 = 4;
const VP9_SPEED: u32 = 2;

/// Containers that get `-movflags +faststart` on chunked output
const MP4_FAMILY: [&str; 3] = ["mp4", "m4v", "mov"];

fn null_output_target() -> &'static str {
    if cfg!(windows) { "NUL" } else { "/dev/null" }
}

/// One command-line option, e.g. `-crf 23` or the bare `-an`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flag {
    pub key: String,
    pub value: Option<String>,
}

impl Flag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
        }
    }

    pub fn switch(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
        }
    }
}

/// Where a pass writes its video
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputTarget {
    File(PathBuf),
    /// Analysis pass: output goes to the null device
    Discard,
}

impl OutputTarget {
    fn as_os_string(&self) -> OsString {
        match self {
            OutputTarget::File(path) => path.clone().into_os_string(),
            OutputTarget::Discard => OsString::from(null_output_target()),
        }
    }
}

/// Position of a pass within its plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Pass {
    /// The only pass of a CRF encode
    Single,
    /// Two-pass analysis
    First,
    /// Two-pass final encode
    Second,
}

impl Pass {
    /// ffmpeg pass number; a CRF pass writes the real output, like pass 2
    pub fn number(&self) -> u8 {
        match self {
            Pass::First => 1,
            Pass::Single | Pass::Second => 2,
        }
    }

    pub fn is_analysis(&self) -> bool {
        matches!(self, Pass::First)
    }
}

/// A single encoder invocation, ready for an executor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassPlan {
    pub pass: Pass,
    pub encoder: EncoderId,
    pub rate_control: RateControl,
    pub program: String,
    pub input: PathBuf,
    pub flags: Vec<Flag>,
    pub output: OutputTarget,
}

impl PassPlan {
    pub fn pass_number(&self) -> u8 {
        self.pass.number()
    }

    fn os_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-y".into(), "-i".into(), self.input.clone().into()];
        for flag in &self.flags {
            args.push(flag.key.clone().into());
            if let Some(value) = &flag.value {
                args.push(value.clone().into());
            }
        }
        args.push(self.output.as_os_string());
        args
    }

    /// Arguments after the program name, paths converted lossily
    pub fn args(&self) -> Vec<String> {
        self.os_args()
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    /// Program followed by its arguments
    pub fn argv(&self) -> Vec<String> {
        let mut argv = vec![self.program.clone()];
        argv.extend(self.args());
        argv
    }

    /// Build the process command without spawning it
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.os_args());
        cmd
    }

    /// Value of the first occurrence of `key`
    pub fn flag_value(&self, key: &str) -> Option<&str> {
        self.flags
            .iter()
            .find(|f| f.key == key)
            .and_then(|f| f.value.as_deref())
    }

    pub fn has_flag(&self, key: &str) -> bool {
        self.flags.iter().any(|f| f.key == key)
    }
}

/// Everything the synthesizer needs for one (codec, resolution) encode.
/// Built by the plan assembler after all skip checks have passed.
#[derive(Debug, Clone)]
pub(crate) struct EncodeJob<'a> {
    pub codec: Codec,
    pub encoder: EncoderId,
    pub rate_control: RateControl,
    pub target_height: u32,
    pub target_kbps: u32,
    /// Already normalized
    pub fps: Rational,
    pub interlaced: bool,
    pub has_audio: bool,
    pub policy: &'a EncodingPolicy,
    pub input: &'a Path,
    pub output: &'a Path,
    pub pass_log: &'a Path,
    pub chunk: bool,
}

impl EncodeJob<'_> {
    fn keyframe_distance(&self) -> u32 {
        keyframe_distance(self.fps)
    }

    fn maxrate(&self) -> u32 {
        (self.target_kbps as f64 * MAX_RATE_MULTIPLIER) as u32
    }

    fn minrate(&self) -> u32 {
        (self.target_kbps as f64 * MIN_RATE_MULTIPLIER) as u32
    }

    fn bufsize(&self) -> u32 {
        (self.target_kbps as f64 * BUF_SIZE_MULTIPLIER) as u32
    }

    fn crf(&self) -> u32 {
        self.policy.crf(self.codec)
    }

    fn profile(&self) -> &'static str {
        match self.codec {
            Codec::H264 => self.policy.h264_profile.as_str(),
            codec => tables::video_profile(codec).unwrap_or("main"),
        }
    }

    fn level(&self) -> &'static str {
        tables::level_for_height(self.target_height)
    }

    fn pass_log(&self) -> String {
        self.pass_log.to_string_lossy().into_owned()
    }

    fn passes(&self) -> Vec<Pass> {
        match self.rate_control {
            RateControl::TwoPass if self.encoder.supports_two_pass() => {
                vec![Pass::First, Pass::Second]
            }
            _ => vec![Pass::Single],
        }
    }
}

#[derive(Default)]
struct Flags(Vec<Flag>);

impl Flags {
    fn push(&mut self, key: &str, value: impl Into<String>) {
        self.0.push(Flag::new(key, value));
    }

    fn switch(&mut self, key: &str) {
        self.0.push(Flag::switch(key));
    }
}

fn kbps(value: u32) -> String {
    format!("{}k", value)
}

/// Build every pass for an encode, in execution order
pub(crate) fn synthesize(job: &EncodeJob<'_>) -> Vec<PassPlan> {
    job.passes()
        .into_iter()
        .map(|pass| build_pass(job, pass))
        .collect()
}

fn build_pass(job: &EncodeJob<'_>, pass: Pass) -> PassPlan {
    let mut flags = Flags::default();

    flags.push("-c:v", job.encoder.ffmpeg_name());
    flags.push(
        "-filter:v",
        filter_chain(job.target_height, job.fps, job.interlaced),
    );
    flags.push("-pix_fmt", "yuv420p");

    apply_rate_control(&mut flags, job);

    if job.has_audio {
        apply_audio(&mut flags, job);
    }

    match job.encoder {
        EncoderId::SoftwareH264 => apply_x264(&mut flags, job, pass),
        EncoderId::HardwareH264 => apply_nvenc(&mut flags, job),
        EncoderId::SoftwareH265 => apply_x265(&mut flags, job, pass),
        EncoderId::SoftwareVp9 => apply_vp9(&mut flags, job, pass),
    }

    flags.push("-strict", "-2");

    let output = match pass {
        Pass::First => {
            flags.switch("-an");
            flags.push("-f", "null");
            OutputTarget::Discard
        }
        Pass::Single | Pass::Second => {
            if job.chunk && is_mp4_family(job.output) {
                flags.push("-movflags", "+faststart");
            }
            OutputTarget::File(job.output.to_path_buf())
        }
    };

    PassPlan {
        pass,
        encoder: job.encoder,
        rate_control: job.rate_control,
        program: job.policy.ffmpeg_command.clone(),
        input: job.input.to_path_buf(),
        flags: flags.0,
        output,
    }
}

fn is_mp4_family(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| MP4_FAMILY.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn apply_rate_control(flags: &mut Flags, job: &EncodeJob<'_>) {
    match (job.rate_control, job.encoder) {
        (RateControl::TwoPass, _) => flags.push("-b:v", kbps(job.target_kbps)),
        // NVENC takes the same numeric quality through -cq
        (RateControl::Crf, EncoderId::HardwareH264) => flags.push("-cq", job.crf().to_string()),
        // libvpx needs a bitrate ceiling alongside -crf
        (RateControl::Crf, EncoderId::SoftwareVp9) => {
            flags.push("-crf", job.crf().to_string());
            flags.push("-b:v", kbps(job.target_kbps));
        }
        (RateControl::Crf, EncoderId::SoftwareH264 | EncoderId::SoftwareH265) => {
            flags.push("-crf", job.crf().to_string())
        }
    }
}

/// WebM can only carry the table's Opus track; MP4-family outputs follow the policy
fn apply_audio(flags: &mut Flags, job: &EncodeJob<'_>) {
    let (encoder, bitrate) = match job.codec {
        Codec::Vp9 => (
            tables::audio_encoder(job.codec),
            tables::audio_bitrate_kbps(job.codec),
        ),
        Codec::H264 | Codec::H265 => (
            job.policy.audio_codec.encoder(),
            job.policy.audio_bitrate_kbps,
        ),
    };
    flags.push("-c:a", encoder);
    flags.push("-b:a", kbps(bitrate));
    flags.push("-ac", "2");
}

fn apply_two_pass_log(flags: &mut Flags, job: &EncodeJob<'_>, pass: Pass) {
    if job.rate_control == RateControl::TwoPass {
        flags.push("-passlogfile", job.pass_log());
        flags.push("-pass", pass.number().to_string());
    }
}

fn apply_x264(flags: &mut Flags, job: &EncodeJob<'_>, pass: Pass) {
    let kd = job.keyframe_distance();
    let x264_params = [format!("keyint={}", kd * 2), format!("keyint_min={}", kd)];

    flags.push("-maxrate", kbps(job.maxrate()));
    flags.push("-bufsize", kbps(job.bufsize()));
    flags.push("-force_key_frames", force_keyframes_expr());
    flags.push("-x264-params", x264_params.join(":"));
    flags.push("-preset", job.policy.preset.as_str());
    flags.push("-profile:v", job.profile());
    flags.push("-level", job.level());

    apply_two_pass_log(flags, job, pass);
}

/// h264_nvenc rejects `-x264-params` outright, so GOP bounds go through the
/// generic `-g`/`-keyint_min` options. No pass-log flags: the mode is always CRF.
fn apply_nvenc(flags: &mut Flags, job: &EncodeJob<'_>) {
    let kd = job.keyframe_distance();

    flags.push("-maxrate", kbps(job.maxrate()));
    flags.push("-bufsize", kbps(job.bufsize()));
    flags.push("-force_key_frames", force_keyframes_expr());
    flags.push("-g", (kd * 2).to_string());
    flags.push("-keyint_min", kd.to_string());
    flags.push("-preset", job.policy.hardware_preset.as_str());
    flags.push("-profile:v", job.profile());
    flags.push("-level", job.level());
}

fn apply_x265(flags: &mut Flags, job: &EncodeJob<'_>, pass: Pass) {
    let kd = job.keyframe_distance();
    let mut x265_params = vec![
        format!("vbv-maxrate={}", job.maxrate()),
        format!("vbv-bufsize={}", job.bufsize()),
        format!("keyint={}", kd * 2),
        format!("keyint_min={}", kd),
    ];
    if job.rate_control == RateControl::TwoPass {
        x265_params.push(format!("stats={}", job.pass_log()));
        x265_params.push(format!("pass={}", pass.number()));
    }

    flags.push("-force_key_frames", force_keyframes_expr());
    flags.push("-x265-params", x265_params.join(":"));
    flags.push("-preset", job.policy.preset.as_str());
    flags.push("-profile:v", job.profile());
    flags.push("-level", job.level());
}

fn apply_vp9(flags: &mut Flags, job: &EncodeJob<'_>, pass: Pass) {
    let kd = job.keyframe_distance();
    let speed = match pass {
        Pass::First => VP9_SPEED_ANALYSIS,
        Pass::Single | Pass::Second => VP9_SPEED,
    };

    flags.push("-g", kd.to_string());
    flags.push("-keyint_min", kd.to_string());
    flags.push("-maxrate", kbps(job.maxrate()));
    flags.push("-minrate", kbps(job.minrate()));
    flags.push("-bufsize", kbps(job.bufsize()));
    flags.push("-speed", speed.to_string());

    apply_two_pass_log(flags, job, pass);
}
