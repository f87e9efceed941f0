//! Run the closed loop against a simulated participant.
//!
//! # Usage
//!
//! ```bash
//! # Three short rounds
//! cargo run --bin closed_loop_sim -- --preset quick
//!
//! # Seven rounds, four pooled chains, JSON report
//! cargo run --bin closed_loop_sim -- --rounds 7 --chains 4 --json rounds.json
//!
//! # Settings from a file, sampler logging
//! RUST_LOG=closed_loop_design=debug cargo run --bin closed_loop_sim -- --config loop.json
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use closed_loop_design::output::{format_round, to_json_pretty};
use closed_loop_design::simulation::{simulated_lab, CounterbalancedSynthesizer, SimulatedParticipant};
use closed_loop_design::{LoopConfig, LoopController, LoopState};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Preset {
    Quick,
    Default,
    Thorough,
}

/// Closed-loop Stroop design against a synthetic participant
#[derive(Parser, Debug)]
#[command(name = "closed_loop_sim")]
#[command(version)]
struct Args {
    /// Base configuration
    #[arg(short, long, value_enum, default_value = "default")]
    preset: Preset,

    /// JSON configuration file (overrides the preset)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of rounds
    #[arg(short, long)]
    rounds: Option<usize>,

    /// MCMC iterations per chain
    #[arg(long)]
    samples: Option<usize>,

    /// Independent chains per fit
    #[arg(long)]
    chains: Option<usize>,

    /// Base seed for the sampler and the simulation
    #[arg(long)]
    seed: Option<u64>,

    /// Simulated time between administration and available responses (ms)
    #[arg(long, default_value = "200")]
    delay_ms: u64,

    /// Participant's congruency cost (ms)
    #[arg(long, default_value = "80")]
    congruency_cost: f64,

    /// Participant's switch cost (ms)
    #[arg(long, default_value = "40")]
    switch_cost: f64,

    /// Write round reports as JSON to this file
    #[arg(long)]
    json: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match args.config {
        Some(ref path) => LoopConfig::from_json_file(path)?,
        None => match args.preset {
            Preset::Quick => LoopConfig::quick(),
            Preset::Default => LoopConfig::default(),
            Preset::Thorough => LoopConfig::thorough(),
        },
    };
    apply_overrides(&mut config, &args);
    config.validate()?;

    let participant = SimulatedParticipant {
        congruency_cost: args.congruency_cost,
        switch_cost: args.switch_cost,
        ..SimulatedParticipant::default()
    };
    let (front_end, reader) = simulated_lab(
        participant,
        config.seed,
        Duration::from_millis(args.delay_ms),
        config.response_defaults.clone(),
    );

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling");
            let _ = cancel_tx.send(true);
        }
    });

    let rounds = config.rounds;
    let mut controller = LoopController::new(
        config.clone(),
        CounterbalancedSynthesizer::new(config.seed),
        front_end,
        reader,
    )?
    .with_cancellation(cancel_rx);

    let mut reports = Vec::with_capacity(rounds);
    let mut state = LoopState::default();
    for round in 0..rounds {
        let report = controller.run_round(round, &state).await?;
        println!("{}", format_round(&report));
        state = state.advance(report.posterior.clone());
        reports.push(report);
    }

    if let Some(path) = args.json {
        std::fs::write(&path, to_json_pretty(&reports)?)?;
        tracing::info!(path = %path.display(), "wrote round reports");
    }
    Ok(())
}

/// Command-line overrides, assigned directly; `validate` reports bad values.
fn apply_overrides(config: &mut LoopConfig, args: &Args) {
    if let Some(rounds) = args.rounds {
        config.rounds = rounds;
    }
    if let Some(n) = args.samples {
        config.sampler.n_samples = n;
    }
    if let Some(chains) = args.chains {
        config.sampler.chains = chains;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overridden(argv: &[&str]) -> LoopConfig {
        let argv = std::iter::once("closed_loop_sim").chain(argv.iter().copied());
        let args = Args::try_parse_from(argv).unwrap();
        let mut config = LoopConfig::default();
        apply_overrides(&mut config, &args);
        config
    }

    #[test]
    fn test_overrides_apply() {
        let config = overridden(&["--rounds", "7", "--chains", "4", "--samples", "100", "--seed", "9"]);
        assert_eq!(config.rounds, 7);
        assert_eq!(config.sampler.chains, 4);
        assert_eq!(config.sampler.n_samples, 100);
        assert_eq!(config.seed, 9);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_overrides_fail_validation() {
        assert_eq!(
            overridden(&["--rounds", "0"]).validate(),
            Err("rounds must be positive".to_string())
        );
        assert_eq!(
            overridden(&["--chains", "0"]).validate(),
            Err("chains must be positive".to_string())
        );
        assert_eq!(
            overridden(&["--samples", "0"]).validate(),
            Err("n_samples must be positive".to_string())
        );
    }
}
