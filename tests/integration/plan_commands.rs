/// Plan assembly tests: known scenarios and pass layout
use ffplan::engine::{
    Backend, Codec, EncoderId, EncodingPolicy, OutputTarget, Pass, PlanError, PlanOutcome,
    Rational, RateControl, SkipReason, build_plan, format_plan, plan_ladder,
};
use std::path::{Path, PathBuf};

use crate::common::assertions::{
    assert_argv_has_flag_value, assert_cmd_contains, assert_cmd_not_contains, assert_flag_once,
};
use crate::common::helpers::{outcome, plan_to_string, probe, probe_1080p, ready, request};

#[test]
fn test_1080p_source_to_720p_software() {
    let policy = EncodingPolicy::default().with_resolutions([480, 720, 1080]);
    let plan = ready(&probe_1080p(), &policy, Codec::H264, 720);

    assert_eq!(plan.passes.len(), 1);
    assert_eq!(plan.passes[0].pass_number(), 2);
    assert_eq!(plan.rate_control, RateControl::Crf);
    assert_eq!(plan.encoder, EncoderId::SoftwareH264);
    assert!(plan.diagnostics.is_empty());

    let argv = plan.passes[0].argv();
    assert_argv_has_flag_value(&argv, "-profile:v", "main");
    assert_argv_has_flag_value(&argv, "-level", "4.2");
    assert_argv_has_flag_value(&argv, "-c:v", "libx264");
    assert_argv_has_flag_value(&argv, "-crf", "23");
    assert_eq!(
        argv.last().map(String::as_str),
        Some("/media/out/input.720p.mp4")
    );
}

#[test]
fn test_1080p_source_to_720p_hardware() {
    let policy = EncodingPolicy::default()
        .with_resolutions([480, 720, 1080])
        .with_backend(Backend::Hardware);
    let plan = ready(&probe_1080p(), &policy, Codec::H264, 720);

    assert_eq!(plan.encoder, EncoderId::HardwareH264);
    let cmd = plan_to_string(&plan);
    assert_cmd_contains(&cmd, "-cq 23");
    assert_cmd_not_contains(&cmd, "-crf");
    assert_cmd_not_contains(&cmd, "-x264-params");
    assert_cmd_not_contains(&cmd, "-passlogfile");
}

#[test]
fn test_upscale_without_opt_in_is_skipped() {
    let policy = EncodingPolicy::default().with_resolutions([480, 720]);
    let source = probe(480, Rational::from_integer(30), 120.0);

    assert_eq!(
        outcome(&source, &policy, Codec::H264, 1080),
        PlanOutcome::Skipped(SkipReason::Upscale {
            source_height: 480,
            resolution: 1080
        })
    );
    assert!(!outcome(&source, &policy, Codec::H264, 720).is_skipped());
}

#[test]
fn test_vp9_ignores_hardware_backend() {
    let hardware = EncodingPolicy::default().with_backend(Backend::Hardware);
    let plan = ready(&probe_1080p(), &hardware, Codec::Vp9, 720);
    assert_eq!(plan.encoder, EncoderId::SoftwareVp9);
    assert_eq!(plan.passes[0].flag_value("-c:v"), Some("libvpx-vp9"));
}

#[test]
fn test_plans_are_deterministic() {
    let policy = EncodingPolicy::default();
    let source = probe(1080, Rational::new(24000, 1001).unwrap(), 1.0);
    for codec in Codec::ALL {
        let first = ready(&source, &policy, codec, 720);
        let second = ready(&source, &policy, codec, 720);
        assert_eq!(first, second);
        assert_eq!(first.argvs(), second.argvs());
        assert_eq!(format_plan(&first).unwrap(), format_plan(&second).unwrap());
    }
}

#[test]
fn test_short_clip_runs_analysis_pass_first() {
    let policy = EncodingPolicy::default();
    let source = probe(1080, Rational::from_integer(30), 2.0);

    for codec in [Codec::H264, Codec::Vp9] {
        let plan = ready(&source, &policy, codec, 720);
        assert_eq!(plan.rate_control, RateControl::TwoPass);

        let passes: Vec<Pass> = plan.passes.iter().map(|p| p.pass).collect();
        assert_eq!(passes, vec![Pass::First, Pass::Second]);
        assert_eq!(plan.passes[0].output, OutputTarget::Discard);
        assert!(matches!(plan.passes[1].output, OutputTarget::File(_)));

        let log = plan.passes[0].flag_value("-passlogfile");
        assert_eq!(log, plan.passes[1].flag_value("-passlogfile"));
        assert!(log.is_some_and(|l| l.ends_with(&format!("input.720p.{}", codec))));
    }
}

#[test]
fn test_flags_appear_once_per_pass() {
    let policy = EncodingPolicy::default();
    let source = probe(1080, Rational::from_integer(30), 1.0);
    for codec in Codec::ALL {
        for pass in ready(&source, &policy, codec, 480).passes {
            let argv = pass.argv();
            for flag in ["-y", "-i", "-c:v", "-filter:v", "-pix_fmt", "-strict"] {
                assert_flag_once(&argv, flag);
            }
        }
    }
}

#[test]
fn test_no_audio_source_has_no_audio_flags() {
    let mut silent = probe_1080p();
    silent.has_audio = false;
    let policy = EncodingPolicy::default();
    for codec in Codec::ALL {
        let cmd = plan_to_string(&ready(&silent, &policy, codec, 720));
        assert_cmd_not_contains(&cmd, "-c:a");
        assert_cmd_not_contains(&cmd, "-b:a");
    }
}

#[test]
fn test_high_framerate_source_is_halved() {
    let source = probe(2160, Rational::new(120000, 1001).unwrap(), 60.0);
    let plan = ready(&source, &EncodingPolicy::default(), Codec::H264, 2160);

    let filters = plan.passes[0].flag_value("-filter:v").unwrap();
    assert!(filters.ends_with("fps=fps=60000/1001"), "{filters}");
    // 40000k high-framerate column
    assert_eq!(plan.passes[0].flag_value("-maxrate"), Some("60000k"));
    assert_eq!(plan.passes[0].flag_value("-level"), Some("5.2"));
    assert_eq!(
        plan.passes[0].flag_value("-x264-params"),
        Some("keyint=480:keyint_min=240")
    );
}

#[test]
fn test_missing_frame_rate_is_an_error() {
    let mut source = probe_1080p();
    source.frame_rate = None;
    let result = build_plan(&source, &EncodingPolicy::default(), &request(Codec::H264, 720));
    assert_eq!(result, Err(PlanError::MissingFrameRate));
}

#[test]
fn test_policy_drives_x264_flags() {
    let mut policy = EncodingPolicy::default();
    policy.preset = ffplan::engine::Preset::Slow;
    policy.h264_profile = ffplan::engine::H264Profile::High;
    policy.crf.insert(Codec::H264, 20);
    policy.ffmpeg_command = "/opt/ffmpeg/bin/ffmpeg".to_string();

    let plan = ready(&probe_1080p(), &policy, Codec::H264, 1080);
    let argv = plan.passes[0].argv();
    assert_eq!(argv[0], "/opt/ffmpeg/bin/ffmpeg");
    assert_argv_has_flag_value(&argv, "-preset", "slow");
    assert_argv_has_flag_value(&argv, "-profile:v", "high");
    assert_argv_has_flag_value(&argv, "-crf", "20");
}

#[test]
fn test_h265_profile_is_fixed() {
    let mut policy = EncodingPolicy::default();
    policy.h264_profile = ffplan::engine::H264Profile::Baseline;
    let plan = ready(&probe_1080p(), &policy, Codec::H265, 720);
    assert_eq!(plan.passes[0].flag_value("-profile:v"), Some("main"));
}

#[test]
fn test_ladder_for_1080p_source() {
    let policy = EncodingPolicy::default().with_resolutions([480, 720]);
    let plans = plan_ladder(
        &probe_1080p(),
        &policy,
        Codec::Vp9,
        Path::new("/media/input.mp4"),
        Path::new("/media/out"),
    )
    .unwrap();

    let heights: Vec<u32> = plans.iter().map(|p| p.resolution).collect();
    assert_eq!(heights, vec![1080, 720, 480, 360, 240, 144]);
    for plan in &plans {
        let expected = PathBuf::from(format!("/media/out/input.{}p.webm", plan.resolution));
        assert_eq!(
            plan.passes.last().map(|p| &p.output),
            Some(&OutputTarget::File(expected))
        );
    }
}

#[test]
fn test_ladder_propagates_probe_errors() {
    let mut source = probe_1080p();
    source.height = 0;
    let result = plan_ladder(
        &source,
        &EncodingPolicy::default(),
        Codec::H264,
        Path::new("in.mp4"),
        Path::new("."),
    );
    assert_eq!(result, Err(PlanError::MissingHeight));
}
