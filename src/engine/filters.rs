//! Video filter chain and frame timing shared by every encoder.

use super::types::Rational;

/// Highest output frame rate the planner will configure
pub const MAX_OUTPUT_FPS: u64 = 60;

/// Seconds between forced keyframes
pub const KEYFRAME_SECONDS: u32 = 4;

/// Bring a source frame rate into a sane output range: halve until it is at most
/// 60, then floor at 1. 119.88 becomes 59.94, 240 becomes 60.
pub fn normalize_frame_rate(fps: Rational) -> Rational {
    let mut fps = fps;
    while fps.gt_integer(MAX_OUTPUT_FPS) {
        fps = fps.halved();
    }
    if fps.lt_integer(1) {
        fps = Rational::ONE;
    }
    fps
}

/// Keyframe spacing in frames at an already-normalized frame rate
pub fn keyframe_distance(fps: Rational) -> u32 {
    let frames = (fps.as_f64() * KEYFRAME_SECONDS as f64).round() as u32;
    frames.max(1)
}

/// `-force_key_frames` expression matching [`KEYFRAME_SECONDS`]
pub fn force_keyframes_expr() -> String {
    format!("expr:gte(t,n_forced*{})", KEYFRAME_SECONDS)
}

/// 16:9 width for a target height
pub fn target_width(target_height: u32) -> u32 {
    (target_height as f64 * 16.0 / 9.0).round() as u32
}

/// Aspect-preserving scale filter. The target height is applied to the short
/// side, so portrait sources are bounded by width instead.
pub fn scale_filter(target_height: u32) -> String {
    let width = target_width(target_height);
    let opts = [
        format!("if(lt(iw\\,ih)\\,{target_height}\\,{width})"),
        format!("if(lt(iw\\,ih)\\,{width}\\,{target_height})"),
        "force_original_aspect_ratio=decrease".to_string(),
        "force_divisible_by=2".to_string(),
        "flags=lanczos".to_string(),
    ];
    format!("scale={}", opts.join(":"))
}

/// Full `-filter:v` chain: optional deinterlace, scale, then fps
pub fn filter_chain(target_height: u32, fps: Rational, interlaced: bool) -> String {
    let mut filters = Vec::with_capacity(3);
    if interlaced {
        filters.push("yadif".to_string());
    }
    filters.push(scale_filter(target_height));
    filters.push(format!("fps=fps={}", fps));
    filters.join(",")
}
