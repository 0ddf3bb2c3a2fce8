//! Plan assembly: probe + policy + request in, ordered ffmpeg passes out.

use serde::Serialize;
use shlex::QuoteError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::command::{self, EncodeJob, PassPlan};
use super::filters::normalize_frame_rate;
use super::ladder::should_encode;
use super::mode::select_mode;
use super::policy::EncodingPolicy;
use super::probe::MediaProbe;
use super::tables::{self, SUPPORTED_RESOLUTIONS};
use super::types::{Backend, Codec, EncoderId, Rational, RateControl};

/// Probe preconditions the planner cannot work around
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error("Probe reports no video height")]
    MissingHeight,

    #[error("Probe reports no usable frame rate")]
    MissingFrameRate,

    #[error("Probe duration {0} is not a finite, non-negative number of seconds")]
    InvalidDuration(f64),
}

/// Why a (codec, resolution) combination produced no plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    UnsupportedCodec { codec: String },
    NoBitrate { codec: Codec, resolution: u32 },
    Upscale { source_height: u32, resolution: u32 },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnsupportedCodec { codec } => write!(f, "unsupported codec '{}'", codec),
            SkipReason::NoBitrate { codec, resolution } => {
                write!(f, "no {} bitrate for {}p", codec, resolution)
            }
            SkipReason::Upscale {
                source_height,
                resolution,
            } => write!(
                f,
                "{}p source would be upscaled to {}p, which is not enabled",
                source_height, resolution
            ),
        }
    }
}

/// One requested output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanRequest {
    pub input: PathBuf,
    /// Codec name as configured; unknown names are skipped, not rejected
    pub codec: String,
    pub resolution: u32,
    pub output: PathBuf,
    /// Two-pass stats prefix
    pub pass_log: PathBuf,
    /// Output is a segment of a larger stream
    pub chunk: bool,
}

impl PlanRequest {
    /// Request with the pass log next to the output (`<output>.passlog`)
    pub fn new(
        input: impl Into<PathBuf>,
        codec: impl Into<String>,
        resolution: u32,
        output: impl Into<PathBuf>,
    ) -> Self {
        let output = output.into();
        Self {
            input: input.into(),
            codec: codec.into(),
            resolution,
            pass_log: append_suffix(&output, ".passlog"),
            output,
            chunk: false,
        }
    }

    pub fn with_pass_log(mut self, pass_log: impl Into<PathBuf>) -> Self {
        self.pass_log = pass_log.into();
        self
    }

    pub fn chunked(mut self, chunk: bool) -> Self {
        self.chunk = chunk;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodingPlan {
    pub codec: Codec,
    pub resolution: u32,
    pub encoder: EncoderId,
    pub rate_control: RateControl,
    /// In execution order; an analysis pass always precedes its final pass
    pub passes: Vec<PassPlan>,
    pub diagnostics: Vec<String>,
}

impl EncodingPlan {
    /// Un-spawned commands, one per pass
    pub fn commands(&self) -> Vec<Command> {
        self.passes.iter().map(PassPlan::to_command).collect()
    }

    pub fn argvs(&self) -> Vec<Vec<String>> {
        self.passes.iter().map(PassPlan::argv).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "lowercase")]
pub enum PlanOutcome {
    Ready(EncodingPlan),
    Skipped(SkipReason),
}

impl PlanOutcome {
    pub fn plan(&self) -> Option<&EncodingPlan> {
        match self {
            PlanOutcome::Ready(plan) => Some(plan),
            PlanOutcome::Skipped(_) => None,
        }
    }

    pub fn into_plan(self) -> Option<EncodingPlan> {
        match self {
            PlanOutcome::Ready(plan) => Some(plan),
            PlanOutcome::Skipped(_) => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, PlanOutcome::Skipped(_))
    }
}

fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Probe facts after precondition checks
struct Source {
    height: u32,
    fps: Rational,
    duration_seconds: f64,
}

impl Source {
    fn check(probe: &MediaProbe) -> Result<Self, PlanError> {
        if probe.height == 0 {
            return Err(PlanError::MissingHeight);
        }
        let fps = probe
            .frame_rate
            .filter(|r| !r.is_zero())
            .ok_or(PlanError::MissingFrameRate)?;
        let duration_seconds = probe.duration_seconds;
        if !duration_seconds.is_finite() || duration_seconds < 0.0 {
            return Err(PlanError::InvalidDuration(duration_seconds));
        }
        Ok(Self {
            height: probe.height,
            fps,
            duration_seconds,
        })
    }
}

/// Plan a single (codec, resolution) output.
///
/// Checks run in a fixed order: probe preconditions, codec, rate table, ladder,
/// mode. The first failing check decides the outcome.
pub fn build_plan(
    probe: &MediaProbe,
    policy: &EncodingPolicy,
    request: &PlanRequest,
) -> Result<PlanOutcome, PlanError> {
    let source = Source::check(probe)?;

    let Some(codec) = Codec::parse(&request.codec) else {
        debug!(codec = %request.codec, "Skipping unsupported codec");
        return Ok(PlanOutcome::Skipped(SkipReason::UnsupportedCodec {
            codec: request.codec.clone(),
        }));
    };

    // Rate table class comes from the source rate, not the normalized one
    let Some(target_kbps) = tables::target_bitrate_kbps(codec, source.fps, request.resolution)
    else {
        debug!(%codec, resolution = request.resolution, "No bitrate entry");
        return Ok(PlanOutcome::Skipped(SkipReason::NoBitrate {
            codec,
            resolution: request.resolution,
        }));
    };

    if !should_encode(source.height, request.resolution, &policy.resolutions_enabled) {
        debug!(
            source_height = source.height,
            resolution = request.resolution,
            "Skipping upscale"
        );
        return Ok(PlanOutcome::Skipped(SkipReason::Upscale {
            source_height: source.height,
            resolution: request.resolution,
        }));
    }

    let encoder = EncoderId::select(codec, policy.backend);
    debug!(%codec, %encoder, backend = %policy.backend, "Selected encoder");

    // Only the encoder actually on hardware constrains the mode, so the
    // backend setting cannot change vp9 or h265 output.
    let effective_backend = if encoder.is_hardware() {
        Backend::Hardware
    } else {
        Backend::Software
    };
    let selection = select_mode(source.duration_seconds, effective_backend);

    let mut diagnostics = Vec::new();
    if let Some(diagnostic) = selection.diagnostic {
        warn!(%encoder, "{}", diagnostic);
        diagnostics.push(diagnostic);
    }

    let fps = normalize_frame_rate(source.fps);
    if fps != source.fps {
        debug!(source_fps = %source.fps, output_fps = %fps, "Normalized frame rate");
    }

    if encoder.is_hardware() {
        info!(
            "GPU encode: {} preset={} resolution={}p cq={}",
            encoder,
            policy.hardware_preset,
            request.resolution,
            policy.crf(codec)
        );
    }

    let job = EncodeJob {
        codec,
        encoder,
        rate_control: selection.mode,
        target_height: request.resolution,
        target_kbps,
        fps,
        interlaced: probe.interlaced,
        has_audio: probe.has_audio,
        policy,
        input: &request.input,
        output: &request.output,
        pass_log: &request.pass_log,
        chunk: request.chunk,
    };

    Ok(PlanOutcome::Ready(EncodingPlan {
        codec,
        resolution: request.resolution,
        encoder,
        rate_control: selection.mode,
        passes: command::synthesize(&job),
        diagnostics,
    }))
}

/// `<output_dir>/<stem>.<height>p.<ext>`
pub fn derive_output_path(input: &Path, output_dir: &Path, resolution: u32, codec: Codec) -> PathBuf {
    output_dir.join(format!(
        "{}.{}p.{}",
        file_stem(input),
        resolution,
        tables::extension(codec)
    ))
}

/// `<output_dir>/<stem>.<height>p.<codec>`
pub fn derive_pass_log(input: &Path, output_dir: &Path, resolution: u32, codec: Codec) -> PathBuf {
    output_dir.join(format!("{}.{}p.{}", file_stem(input), resolution, codec))
}

fn file_stem(input: &Path) -> String {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string())
}

/// Plan every supported rung for one codec, highest first. Skipped rungs are
/// left out.
pub fn plan_ladder(
    probe: &MediaProbe,
    policy: &EncodingPolicy,
    codec: Codec,
    input: &Path,
    output_dir: &Path,
) -> Result<Vec<EncodingPlan>, PlanError> {
    let mut plans = Vec::new();
    for &resolution in SUPPORTED_RESOLUTIONS.iter().rev() {
        let request = PlanRequest::new(
            input,
            codec.as_str(),
            resolution,
            derive_output_path(input, output_dir, resolution, codec),
        )
        .with_pass_log(derive_pass_log(input, output_dir, resolution, codec));

        match build_plan(probe, policy, &request)? {
            PlanOutcome::Ready(plan) => plans.push(plan),
            PlanOutcome::Skipped(reason) => {
                debug!(%codec, resolution, %reason, "Rung skipped");
            }
        }
    }
    Ok(plans)
}

/// Render one pass as a shell-safe line. Fails when an argument cannot be
/// quoted, e.g. a path containing a NUL byte.
pub fn format_pass(pass: &PassPlan) -> Result<String, QuoteError> {
    let argv = pass.argv();
    shlex::try_join(argv.iter().map(String::as_str))
}

/// Shell-safe script for a whole plan, passes chained with `&&`
pub fn format_plan(plan: &EncodingPlan) -> Result<String, QuoteError> {
    let lines = plan
        .passes
        .iter()
        .map(format_pass)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(lines.join("\n&& \\\n"))
}
