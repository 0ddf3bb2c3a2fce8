#![allow(dead_code)]

use ffplan::engine::{
    Codec, EncodingPlan, EncodingPolicy, MediaProbe, PlanOutcome, PlanRequest, Rational,
    build_plan, derive_output_path, derive_pass_log,
};
use std::path::Path;
use std::process::Command;

/// Convert a Command to a string for testing/assertions
pub fn cmd_to_string(cmd: &Command) -> String {
    let program = cmd.get_program().to_string_lossy();
    let args: Vec<String> = cmd
        .get_args()
        .map(|arg| arg.to_string_lossy().to_string())
        .collect();

    format!("{} {}", program, args.join(" "))
}

/// Progressive source with audio
pub fn probe(height: u32, fps: Rational, duration_seconds: f64) -> MediaProbe {
    MediaProbe {
        duration_seconds,
        frame_rate: Some(fps),
        width: height * 16 / 9,
        height,
        has_audio: true,
        interlaced: false,
        video_codec: "h264".to_string(),
    }
}

/// 1080p, 30 fps, two minutes
pub fn probe_1080p() -> MediaProbe {
    probe(1080, Rational::from_integer(30), 120.0)
}

/// Request with outputs derived the same way `plan_ladder` does
pub fn request(codec: Codec, resolution: u32) -> PlanRequest {
    let input = Path::new("/media/input.mp4");
    let dir = Path::new("/media/out");
    PlanRequest::new(
        input,
        codec.as_str(),
        resolution,
        derive_output_path(input, dir, resolution, codec),
    )
    .with_pass_log(derive_pass_log(input, dir, resolution, codec))
}

pub fn outcome(probe: &MediaProbe, policy: &EncodingPolicy, codec: Codec, resolution: u32) -> PlanOutcome {
    build_plan(probe, policy, &request(codec, resolution)).expect("probe should be valid")
}

pub fn ready(probe: &MediaProbe, policy: &EncodingPolicy, codec: Codec, resolution: u32) -> EncodingPlan {
    outcome(probe, policy, codec, resolution)
        .into_plan()
        .expect("combination should be planned")
}

/// All passes rendered, one per line
pub fn plan_to_string(plan: &EncodingPlan) -> String {
    plan.commands()
        .iter()
        .map(cmd_to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
