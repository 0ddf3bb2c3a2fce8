// Planning engine - pure, no process spawning

pub mod command;
pub mod filters;
pub mod ladder;
pub mod mode;
pub mod plan;
pub mod policy;
pub mod probe;
pub mod tables;
pub mod types;

pub use command::{Flag, OutputTarget, Pass, PassPlan};
pub use ladder::should_encode;
pub use mode::{ModeSelection, select_mode};
pub use plan::{
    EncodingPlan, PlanError, PlanOutcome, PlanRequest, SkipReason, build_plan,
    derive_output_path, derive_pass_log, format_pass, format_plan, plan_ladder,
};
pub use policy::{EncodingPolicy, RawPolicy, Resolved, Warning, resolve, validate};
pub use probe::{MediaProbe, ProbeError, parse_ffprobe_json};
pub use types::{
    AudioCodec, Backend, Codec, EncoderId, H264Profile, HardwarePreset, Preset, Rational,
    RateControl,
};
