/// Config file loading and layering with environment values
use ffplan::config::Config;
use ffplan::engine::policy::{KEY_BACKEND, KEY_PRESET};
use ffplan::engine::{Backend, Codec, Preset, RawPolicy, resolve};
use std::fs;

#[test]
fn test_written_file_feeds_the_resolver() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
[policy]
FFMPEG_DEFAULT_PRESET = "fast"
FFMPEG_CRF_VP9 = 36
MINIMUM_RESOLUTIONS_TO_ENCODE = [720, 1080]
ENCODING_BACKEND = "gpu"
"#,
    )
    .unwrap();

    let config = Config::load_from(&path).unwrap();
    let env: RawPolicy = [(KEY_BACKEND, "cpu"), (KEY_PRESET, "")].into_iter().collect();
    let resolved = resolve(&config.raw_policy_with(&env));

    assert!(resolved.warnings.is_empty(), "{:?}", resolved.warnings);
    let policy = resolved.policy;
    // environment wins for the backend
    assert_eq!(policy.backend, Backend::Software);
    // a blank environment value leaves the file value in place
    assert_eq!(policy.preset, Preset::Fast);
    assert_eq!(policy.crf(Codec::Vp9), 36);
    assert_eq!(policy.resolutions_enabled.len(), 2);
}

#[test]
fn test_bad_file_values_are_corrected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[policy]\nFFMPEG_CRF_VP9 = 99\nHLS_TIME = true\n").unwrap();

    let resolved = resolve(&Config::load_from(&path).unwrap().to_raw());
    assert_eq!(resolved.warnings.len(), 2);
    assert_eq!(resolved.policy.crf(Codec::Vp9), 32);
    assert_eq!(resolved.policy.hls_segment_seconds, 6);
}

#[test]
fn test_default_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ffplan").join("config.toml");
    Config::default().save_to(&path).unwrap();

    let contents = fs::read_to_string(&path).unwrap();
    assert!(contents.contains("FFMPEG_CRF_H264 = 23"));

    let loaded = Config::load_from(&path).unwrap();
    assert_eq!(loaded, Config::default());
}

#[test]
fn test_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::load_from(&dir.path().join("absent.toml")).unwrap_err();
    assert!(format!("{err:#}").contains("Failed to read config file"));
}
