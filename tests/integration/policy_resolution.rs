/// Policy resolution end to end: raw settings in, plans out
use ffplan::engine::policy::{
    KEY_AUDIO_BITRATE, KEY_AUDIO_CODEC, KEY_BACKEND, KEY_CRF_H265, KEY_GPU_PRESET, KEY_RESOLUTIONS,
};
use ffplan::engine::{Codec, EncoderId, RawPolicy, resolve};

use crate::common::assertions::{assert_argv_has_flag_value, assert_cmd_contains};
use crate::common::helpers::{plan_to_string, probe_1080p, ready};

fn raw(pairs: &[(&str, &str)]) -> RawPolicy {
    pairs.iter().copied().collect()
}

#[test]
fn test_corrected_crf_reaches_the_command() {
    let resolved = resolve(&raw(&[(KEY_CRF_H265, "99")]));
    assert_eq!(resolved.warnings.len(), 1);

    let plan = ready(&probe_1080p(), &resolved.policy, Codec::H265, 720);
    assert_argv_has_flag_value(&plan.passes[0].argv(), "-crf", "28");
}

#[test]
fn test_gpu_settings_from_raw_values() {
    let resolved = resolve(&raw(&[(KEY_BACKEND, "hardware"), (KEY_GPU_PRESET, "p7")]));
    assert!(resolved.warnings.is_empty());

    let plan = ready(&probe_1080p(), &resolved.policy, Codec::H264, 1080);
    assert_eq!(plan.encoder, EncoderId::HardwareH264);
    assert_argv_has_flag_value(&plan.passes[0].argv(), "-preset", "p7");
}

#[test]
fn test_audio_policy_applies_to_mp4_outputs_only() {
    let resolved = resolve(&raw(&[(KEY_AUDIO_CODEC, "opus"), (KEY_AUDIO_BITRATE, "160k")]));
    let policy = resolved.policy;

    let h264 = plan_to_string(&ready(&probe_1080p(), &policy, Codec::H264, 720));
    assert_cmd_contains(&h264, "-c:a libopus -b:a 160k -ac 2");

    let vp9 = plan_to_string(&ready(&probe_1080p(), &policy, Codec::Vp9, 720));
    assert_cmd_contains(&vp9, "-c:a libopus -b:a 96k -ac 2");
}

#[test]
fn test_every_bad_value_gets_its_own_warning() {
    let resolved = resolve(&raw(&[
        (KEY_BACKEND, "quantum"),
        (KEY_GPU_PRESET, "p0"),
        (KEY_RESOLUTIONS, "720,721"),
        (KEY_AUDIO_BITRATE, "loud"),
    ]));
    let keys: Vec<&str> = resolved.warnings.iter().map(|w| w.key.as_str()).collect();
    assert_eq!(keys.len(), 4);
    for key in [KEY_BACKEND, KEY_GPU_PRESET, KEY_RESOLUTIONS, KEY_AUDIO_BITRATE] {
        assert_eq!(keys.iter().filter(|k| **k == key).count(), 1, "{key}");
    }

    // The valid part of the list survives
    assert!(resolved.policy.resolutions_enabled.contains(&720));
    assert_eq!(resolved.policy.resolutions_enabled.len(), 1);
}

#[test]
fn test_warning_message_names_value_and_default() {
    let resolved = resolve(&raw(&[(KEY_GPU_PRESET, "p9")]));
    let message = resolved.warnings[0].to_string();
    assert!(message.starts_with("ENCODING_GPU_PRESET=\"p9\""), "{message}");
    assert!(message.ends_with("using p4"), "{message}");
}
