mod cli;

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use cli::{Commands, SourceArgs};
use ffplan::config::Config;
use ffplan::engine::policy::KEY_DO_NOT_TRANSCODE;
use ffplan::engine::{
    Codec, EncodingPolicy, MediaProbe, PlanOutcome, PlanRequest, RawPolicy, build_plan,
    format_plan, parse_ffprobe_json, plan_ladder, resolve,
};

fn main() -> Result<()> {
    let cli = cli::parse();

    // RUST_LOG wins over --verbose
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "ffplan=debug".to_string()
        } else {
            "ffplan=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Plan {
            source,
            input,
            codec,
            resolution,
            output,
            pass_log,
            chunk,
            json,
        } => {
            let policy = load_policy(config_path)?;
            let probe = load_source(&source)?;

            let mut request = PlanRequest::new(input, codec, resolution, output).chunked(chunk);
            if let Some(pass_log) = pass_log {
                request = request.with_pass_log(pass_log);
            }

            let outcome = build_plan(&probe, &policy, &request)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
                return Ok(());
            }
            match outcome {
                PlanOutcome::Ready(plan) => println!("{}", format_plan(&plan)?),
                PlanOutcome::Skipped(reason) => warn!("Nothing to do: {}", reason),
            }
        }

        Commands::Ladder {
            source,
            input,
            codec,
            output_dir,
            json,
        } => {
            let policy = load_policy(config_path)?;
            let probe = load_source(&source)?;
            let codec = Codec::parse(&codec)
                .with_context(|| format!("Unsupported codec '{}' (expected h264, h265 or vp9)", codec))?;

            let plans = plan_ladder(&probe, &policy, codec, &input, &output_dir)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&plans)?);
                return Ok(());
            }
            for plan in &plans {
                println!(
                    "# {}p {} ({})",
                    plan.resolution, plan.encoder, plan.rate_control
                );
                println!("{}\n", format_plan(plan)?);
            }
            info!("{} rung(s) planned for {}", plans.len(), codec);
        }

        Commands::Policy { json } => {
            let policy = load_policy(config_path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&policy)?);
            } else {
                print_policy(&policy);
            }
        }

        Commands::InitConfig => init_config(config_path)?,
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

/// Config file, then environment, then the resolver. Corrections are logged here.
fn load_policy(config_path: Option<&Path>) -> Result<EncodingPolicy> {
    let config = load_config(config_path)?;
    for key in config.unknown_keys() {
        warn!("Ignoring unknown policy key {}", key);
    }

    let resolved = resolve(&config.raw_policy_with(&RawPolicy::from_env()));
    for warning in &resolved.warnings {
        warn!("{}", warning);
    }

    if !resolved.policy.transcode_enabled {
        info!(
            "{} is set; plans are still printed but callers should skip video",
            KEY_DO_NOT_TRANSCODE
        );
    }
    Ok(resolved.policy)
}

fn load_source(source: &SourceArgs) -> Result<MediaProbe> {
    if let Some(path) = &source.probe {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read probe file: {}", path.display()))?;
        return serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse probe record: {}", path.display()));
    }

    let path = source
        .ffprobe
        .as_ref()
        .context("Either --probe or --ffprobe is required")?;
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read ffprobe output: {}", path.display()))?;
    parse_ffprobe_json(&contents)
        .with_context(|| format!("Failed to interpret ffprobe output: {}", path.display()))
}

fn print_policy(policy: &EncodingPolicy) {
    let resolutions: Vec<String> = policy
        .resolutions_enabled
        .iter()
        .map(|h| h.to_string())
        .collect();

    println!("transcode enabled:  {}", policy.transcode_enabled);
    println!("upscale targets:    {}", resolutions.join(", "));
    println!("preset:             {}", policy.preset);
    println!("h264 profile:       {}", policy.h264_profile);
    for codec in Codec::ALL {
        println!("crf {:<15} {}", format!("{}:", codec), policy.crf(codec));
    }
    println!(
        "audio:              {} @ {}k",
        policy.audio_codec, policy.audio_bitrate_kbps
    );
    println!("backend:            {}", policy.backend);
    println!("gpu preset:         {}", policy.hardware_preset);
    println!(
        "hls:                {} ({}s segments)",
        policy.hls_enabled, policy.hls_segment_seconds
    );
    println!("ffmpeg:             {}", policy.ffmpeg_command);
}

fn init_config(custom_path: Option<&Path>) -> Result<()> {
    let path = match custom_path {
        Some(path) => path.to_path_buf(),
        None => Config::config_path()?,
    };

    if path.exists() {
        println!("Config file exists at: {}", path.display());
        return Ok(());
    }

    match custom_path {
        Some(path) => Config::default().save_to(path)?,
        None => Config::ensure_default()?,
    }
    println!("Created default config at: {}", path.display());
    Ok(())
}
