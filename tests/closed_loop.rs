//! End-to-end tests of the loop controller against simulated and scripted collaborators.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use closed_loop_design::collaborators::{
    DesignSynthesizer, ExperimentFrontEnd, ResponseDefaults, ResponseReader, ResponseRecord,
};
use closed_loop_design::experimentalist::{best_match, select_max_uncertainty};
use closed_loop_design::simulation::{
    simulated_lab, CounterbalancedSynthesizer, SimulatedFrontEnd, SimulatedParticipant,
    SimulatedReader,
};
use closed_loop_design::{
    CandidatePool, FitMode, LoopConfig, LoopController, LoopError, LoopState, RoundPhase,
    SynthesisMode, TrialSequence,
};

fn config(rounds: usize) -> LoopConfig {
    LoopConfig::quick()
        .rounds(rounds)
        .n_samples(300)
        .seed(2024)
        .observation_timeout(Duration::from_secs(5))
        .poll_interval(Duration::from_millis(50))
}

type SimulatedController =
    LoopController<CounterbalancedSynthesizer, SimulatedFrontEnd, SimulatedReader>;

fn simulated_with(config: LoopConfig, participant: SimulatedParticipant) -> SimulatedController {
    let (front_end, reader) = simulated_lab(
        participant,
        7,
        Duration::from_millis(200),
        config.response_defaults.clone(),
    );
    LoopController::new(config, CounterbalancedSynthesizer::new(11), front_end, reader).unwrap()
}

fn simulated(rounds: usize) -> SimulatedController {
    simulated_with(config(rounds), SimulatedParticipant::default())
}

// =============================================================================
// FULL LOOP
// =============================================================================

#[tokio::test(start_paused = true)]
async fn phases_follow_bootstrap_confirm_explore() {
    let mut controller = simulated(5);
    let reports = controller.run().await.unwrap();

    let phases: Vec<RoundPhase> = reports.iter().map(|r| r.phase).collect();
    assert_eq!(
        phases,
        vec![
            RoundPhase::Bootstrap,
            RoundPhase::Confirm,
            RoundPhase::Explore,
            RoundPhase::Explore,
            RoundPhase::Explore
        ]
    );

    assert_eq!(reports[0].posterior.mode, FitMode::Bootstrap);
    for report in &reports[1..] {
        assert_eq!(report.posterior.mode, FitMode::Refine);
        assert!(report.kl_divergence.is_some());
    }
    assert!(reports[0].kl_divergence.is_none());
}

#[tokio::test(start_paused = true)]
async fn explore_rounds_target_the_widest_band_and_administer_its_best_match() {
    let mut controller = simulated(4);
    let reports = controller.run().await.unwrap();

    assert!(reports[0].target.is_none());
    assert!(reports[1].target.is_none());

    // Same seed: the initial pool is fixed and update pools come in call order
    let mut replay = CounterbalancedSynthesizer::new(11);
    let initial = replay.synthesize(SynthesisMode::Initial).unwrap();
    let candidates = initial.first().unwrap();

    for round in 2..reports.len() {
        let report = &reports[round];
        let previous = &reports[round - 1].posterior;
        let target = report.target.as_ref().unwrap();

        let (index, score) =
            select_max_uncertainty(controller.encoder(), candidates.trials(), &previous.beta_samples)
                .unwrap();
        assert_eq!(target.candidate_index, index, "round {}", round);
        assert_eq!(target.score, score);
        assert_eq!(target.condition, candidates.trials()[index].condition);

        let update = replay.synthesize(SynthesisMode::Update).unwrap();
        let (pool_index, best) = best_match(&target.condition, &update).unwrap();
        assert_eq!(report.pool_index, pool_index, "round {}", round);
        assert_eq!(
            report.sequence.conditions().collect::<Vec<_>>(),
            best.conditions().collect::<Vec<_>>()
        );
    }
}

#[tokio::test(start_paused = true)]
async fn missed_trials_use_configured_defaults() {
    let mut config = config(1);
    config.response_defaults = ResponseDefaults {
        reaction_time: 1234.0,
        response: "x".into(),
    };
    let participant = SimulatedParticipant {
        miss_rate: 1.0,
        ..SimulatedParticipant::default()
    };

    let reports = simulated_with(config, participant).run().await.unwrap();
    for trial in reports[0].sequence.trials() {
        let outcome = trial.outcome.as_ref().unwrap();
        assert_eq!(outcome.reaction_time, 1234.0);
        assert_eq!(outcome.response, "x");
    }
}

#[tokio::test(start_paused = true)]
async fn administered_sequences_are_observed_and_reported() {
    let mut controller = simulated(3);
    let reports = controller.run().await.unwrap();
    let (_, front_end, _) = controller.into_parts();

    assert_eq!(front_end.administered().len(), 3);
    for (report, administered) in reports.iter().zip(front_end.administered()) {
        assert!(report.sequence.is_observed());
        assert_eq!(
            report.sequence.conditions().collect::<Vec<_>>(),
            administered.conditions().collect::<Vec<_>>()
        );
        assert_eq!(report.posterior.n_params(), 4);
        assert_eq!(report.posterior.n_samples(), 300);
        assert_eq!(
            report.posterior.columns,
            vec![
                "word_red",
                "color_red",
                "response_transition_repeat",
                "response_transition_switch"
            ]
        );
    }

    // Bootstrap and confirm both administer the first initial-pool sequence
    assert_eq!(front_end.administered()[0], front_end.administered()[1]);
}

#[tokio::test(start_paused = true)]
async fn same_seeds_reproduce_the_run() {
    let a = simulated(4).run().await.unwrap();
    let b = simulated(4).run().await.unwrap();

    for (ra, rb) in a.iter().zip(&b) {
        assert_eq!(ra.seed, rb.seed);
        assert_eq!(ra.sequence, rb.sequence);
        assert_eq!(ra.posterior.beta_samples, rb.posterior.beta_samples);
        assert_eq!(ra.posterior.sigma2_samples, rb.posterior.sigma2_samples);
    }
}

#[tokio::test(start_paused = true)]
async fn round_by_round_matches_run() {
    let all = simulated(3).run().await.unwrap();

    let mut controller = simulated(3);
    let mut state = LoopState::default();
    for expected in &all {
        let report = controller.run_round(expected.round, &state).await.unwrap();
        assert_eq!(report.posterior.beta_samples, expected.posterior.beta_samples);
        state = state.advance(report.posterior);
    }
    assert_eq!(state.phase(), RoundPhase::Explore);
}

// =============================================================================
// FAILURES
// =============================================================================

struct EmptySynthesizer;

impl DesignSynthesizer for EmptySynthesizer {
    fn synthesize(&mut self, mode: SynthesisMode) -> closed_loop_design::Result<CandidatePool> {
        Ok(CandidatePool::new(mode, vec![]))
    }
}

struct NoopFrontEnd;

#[async_trait]
impl ExperimentFrontEnd for NoopFrontEnd {
    async fn administer(&mut self, _sequence: &TrialSequence) -> closed_loop_design::Result<()> {
        Ok(())
    }
}

/// Reports `rows` responses, or never reports when `rows` is `None`.
struct ScriptedReader {
    rows: Option<usize>,
}

#[async_trait]
impl ResponseReader for ScriptedReader {
    async fn clear(&mut self) -> closed_loop_design::Result<()> {
        Ok(())
    }

    async fn read_latest_responses(
        &mut self,
    ) -> closed_loop_design::Result<Option<Vec<ResponseRecord>>> {
        let defaults = ResponseDefaults::default();
        Ok(self
            .rows
            .map(|n| (0..n).map(|_| defaults.fill(None, None, ">red</div>")).collect()))
    }
}

#[tokio::test(start_paused = true)]
async fn empty_pool_halts_the_loop() {
    let mut controller = LoopController::new(
        config(3),
        EmptySynthesizer,
        NoopFrontEnd,
        ScriptedReader { rows: Some(9) },
    )
    .unwrap();
    let err = controller.run().await.unwrap_err();
    assert!(matches!(
        err,
        LoopError::EmptyPool {
            mode: SynthesisMode::Initial
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn silent_reader_times_out() {
    let mut controller = LoopController::new(
        config(3),
        CounterbalancedSynthesizer::new(1),
        NoopFrontEnd,
        ScriptedReader { rows: None },
    )
    .unwrap();
    match controller.run().await.unwrap_err() {
        LoopError::ObservationTimeout { waited } => assert_eq!(waited, Duration::from_secs(5)),
        other => panic!("expected timeout, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn short_response_log_is_a_mismatch() {
    let mut controller = LoopController::new(
        config(3),
        CounterbalancedSynthesizer::new(1),
        NoopFrontEnd,
        ScriptedReader { rows: Some(4) },
    )
    .unwrap();
    assert!(matches!(
        controller.run().await.unwrap_err(),
        LoopError::ObservationMismatch { expected: 9, got: 4 }
    ));
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_the_wait() {
    let (tx, rx) = watch::channel(false);
    let mut controller = LoopController::new(
        config(3).observation_timeout(Duration::from_secs(600)),
        CounterbalancedSynthesizer::new(1),
        NoopFrontEnd,
        ScriptedReader { rows: None },
    )
    .unwrap()
    .with_cancellation(rx);

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(3)).await;
        let _ = tx.send(true);
    });

    assert!(matches!(controller.run().await.unwrap_err(), LoopError::Cancelled));
}

#[tokio::test(start_paused = true)]
async fn defaulted_responses_still_fit() {
    // Every trial missed: all reaction times sit at the ceiling
    let mut controller = LoopController::new(
        config(2),
        CounterbalancedSynthesizer::new(1),
        NoopFrontEnd,
        ScriptedReader { rows: Some(9) },
    )
    .unwrap();
    let reports = controller.run().await.unwrap();
    for trial in reports[0].sequence.trials() {
        let outcome = trial.outcome.as_ref().unwrap();
        assert_eq!(outcome.reaction_time, 3000.0);
        assert_eq!(outcome.response, "j");
    }
    assert!(reports[1].posterior.posterior_mean.iter().all(|m| m.is_finite()));
}

#[test]
fn invalid_config_is_rejected_at_construction() {
    let mut zero_samples = config(3);
    zero_samples.sampler.n_samples = 0;
    let mut zero_poll = config(3);
    zero_poll.poll_interval = Duration::ZERO;

    for (config, message) in [
        (zero_samples, "n_samples must be positive"),
        (zero_poll, "poll_interval must be non-zero"),
    ] {
        let err = LoopController::new(
            config,
            CounterbalancedSynthesizer::new(1),
            NoopFrontEnd,
            ScriptedReader { rows: Some(9) },
        )
        .err();
        match err {
            Some(LoopError::Config(msg)) => assert_eq!(msg, message),
            other => panic!("expected config error, got {:?}", other),
        }
    }
}
