//! Detection engine
//!
//! Owns every piece of per-host state and runs one detection cycle per
//! sample: history, baseline learning, outlier scoring, launch
//! attribution, hybrid classification and alert dispatch.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::anomaly::{
    AlertDispatcher, AlertPayload, AppTracker, Baseline, BaselineLearner, Classification,
    DispatchOutcome, HybridClassifier, ScoreBand, TrendReport, LEARNING_PERIOD,
};
use crate::error::Result;
use crate::history::{BoundedHistory, HISTORY_CAPACITY};
use crate::models::{KnownApp, Sample};
use crate::predictor::OutlierScorer;

/// Default time between two cycles, measurement window excluded
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

/// What a cycle concluded about its sample
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Learning { collected: usize, required: usize },
    Normal,
    Anomaly,
    LaunchAttributed {
        app: String,
        cpu_impact: f64,
        ram_impact: f64,
    },
}

/// Result of one detection cycle
#[derive(Debug, Clone, Serialize)]
pub struct CycleOutcome {
    pub timestamp: DateTime<Local>,
    pub cpu_percent: f64,
    pub ram_percent: f64,
    #[serde(flatten)]
    pub verdict: Verdict,
    pub score: Option<f64>,
    pub band: Option<ScoreBand>,
    pub classification: Option<Classification>,
    pub alert: Option<DispatchOutcome>,
    /// Set on the cycle that completed the learning phase
    #[serde(skip)]
    pub learned_baseline: Option<Baseline>,
}

impl CycleOutcome {
    fn new(sample: &Sample, verdict: Verdict) -> Self {
        Self {
            timestamp: sample.timestamp,
            cpu_percent: sample.cpu_percent,
            ram_percent: sample.ram_percent,
            verdict,
            score: None,
            band: None,
            classification: None,
            alert: None,
            learned_baseline: None,
        }
    }

    pub fn is_anomaly(&self) -> bool {
        self.verdict == Verdict::Anomaly
    }
}

/// Outlier score with its display band
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ScoredValue {
    pub score: f64,
    pub band: ScoreBand,
}

/// Read-only view of the engine for status reporting
#[derive(Debug, Clone, Serialize)]
pub struct EngineSnapshot {
    pub learning: bool,
    pub learning_collected: usize,
    pub learning_required: usize,
    pub baseline: Option<Baseline>,
    pub known_apps: BTreeMap<String, KnownApp>,
    pub recent_scores: Vec<ScoredValue>,
    pub trend: TrendReport,
    pub history_len: usize,
    pub last_sample: Option<Sample>,
}

/// Adaptive anomaly detection engine for one host
pub struct Engine {
    history: BoundedHistory<Sample>,
    learner: BaselineLearner,
    tracker: AppTracker,
    scorer: Box<dyn OutlierScorer>,
    classifier: HybridClassifier,
    dispatcher: AlertDispatcher,
    scores: BoundedHistory<f64>,
    interval: Duration,
}

impl Engine {
    /// Create an engine in the learning state
    pub fn new(scorer: Box<dyn OutlierScorer>, dispatcher: AlertDispatcher) -> Self {
        Self {
            history: BoundedHistory::new(HISTORY_CAPACITY),
            learner: BaselineLearner::new(),
            tracker: AppTracker::new(),
            scorer,
            classifier: HybridClassifier::new(),
            dispatcher,
            scores: BoundedHistory::new(HISTORY_CAPACITY),
            interval: DEFAULT_INTERVAL,
        }
    }

    /// Set the cycle interval used for trend windows
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run one detection cycle
    ///
    /// `now` is the monotonic time used for the alert cooldown. Scoring
    /// errors are returned as-is and leave the sample recorded.
    pub fn cycle(&mut self, sample: Sample, now: Instant) -> Result<CycleOutcome> {
        self.history.record(sample.clone());
        let learned_baseline = self.learner.observe(&sample);

        let Some(baseline) = self.learner.baseline().copied() else {
            return Ok(CycleOutcome::new(
                &sample,
                Verdict::Learning {
                    collected: self.learner.collected(),
                    required: LEARNING_PERIOD,
                },
            ));
        };

        let score = self
            .scorer
            .score(sample.cpu_percent, sample.ram_percent)?
            .value;
        self.scores.record(score);

        let mut outcome = CycleOutcome::new(&sample, Verdict::Normal);
        outcome.learned_baseline = learned_baseline;
        outcome.score = Some(score);
        outcome.band = Some(ScoreBand::from_score(score));

        // A significant launch is expected load, never an anomaly
        if let Some(attribution) = self.tracker.attribute(&self.history, Local::now()) {
            outcome.verdict = Verdict::LaunchAttributed {
                app: attribution.app,
                cpu_impact: attribution.cpu_impact,
                ram_impact: attribution.ram_impact,
            };
            return Ok(outcome);
        }

        let classification = self.classifier.classify(
            sample.cpu_percent,
            sample.ram_percent,
            score,
            Some(&baseline),
        );
        outcome.classification = Some(classification);

        if classification.is_anomaly {
            outcome.verdict = Verdict::Anomaly;
            let payload = AlertPayload::new(&sample, score, self.trend());
            outcome.alert = Some(self.dispatcher.dispatch(&payload, now));
        }

        Ok(outcome)
    }

    pub fn is_learning(&self) -> bool {
        self.learner.is_learning()
    }

    pub fn baseline(&self) -> Option<&Baseline> {
        self.learner.baseline()
    }

    pub fn known_apps(&self) -> &std::collections::HashMap<String, KnownApp> {
        self.tracker.known_apps()
    }

    pub fn history(&self) -> &BoundedHistory<Sample> {
        &self.history
    }

    /// Diagnostic scores, oldest first
    pub fn recent_scores(&self) -> Vec<f64> {
        self.scores.to_vec()
    }

    pub fn trend(&self) -> TrendReport {
        TrendReport::from_history(&self.history, self.interval)
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            learning: self.is_learning(),
            learning_collected: self.learner.collected(),
            learning_required: LEARNING_PERIOD,
            baseline: self.baseline().copied(),
            known_apps: self
                .known_apps()
                .iter()
                .map(|(name, app)| (name.clone(), app.clone()))
                .collect(),
            recent_scores: self
                .scores
                .iter()
                .map(|&score| ScoredValue {
                    score,
                    band: ScoreBand::from_score(score),
                })
                .collect(),
            trend: self.trend(),
            history_len: self.history.len(),
            last_sample: self.history.newest().cloned(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::anomaly::RecordingSink;
    use crate::error::MonitorError;
    use crate::models::ProcessSnapshot;
    use crate::predictor::OutlierScore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Scorer returning a settable value and counting its calls
    #[derive(Clone, Default)]
    pub(crate) struct StubScorer {
        pub value: Arc<Mutex<f64>>,
        pub calls: Arc<AtomicUsize>,
        pub fail: bool,
    }

    impl StubScorer {
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        pub fn set(&self, value: f64) {
            *self.value.lock().unwrap() = value;
        }
    }

    impl OutlierScorer for StubScorer {
        fn score(&self, _cpu: f64, _ram: f64) -> Result<OutlierScore> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(MonitorError::Scoring("model exploded".into()));
            }
            Ok(OutlierScore::new(*self.value.lock().unwrap()))
        }
    }

    fn engine(scorer: &StubScorer, sink: &RecordingSink) -> Engine {
        Engine::new(
            Box::new(scorer.clone()),
            AlertDispatcher::new(Box::new(sink.clone())),
        )
    }

    fn sample(cpu: f64, ram: f64) -> Sample {
        Sample::new(Local::now(), cpu, ram)
    }

    /// Feed the learning set: cpu alternating 18/22, ram 30
    fn learn(engine: &mut Engine, t0: Instant) {
        for i in 0..LEARNING_PERIOD {
            let cpu = if i % 2 == 0 { 18.0 } else { 22.0 };
            engine.cycle(sample(cpu, 30.0), t0).unwrap();
        }
    }

    #[test]
    fn test_learning_never_scores_or_alerts() {
        let scorer = StubScorer::default();
        scorer.set(-1.0);
        let sink = RecordingSink::default();
        let mut engine = engine(&scorer, &sink);

        for i in 1..LEARNING_PERIOD {
            let outcome = engine.cycle(sample(100.0, 100.0), Instant::now()).unwrap();
            assert_eq!(
                outcome.verdict,
                Verdict::Learning {
                    collected: i,
                    required: LEARNING_PERIOD
                }
            );
            assert!(outcome.score.is_none());
        }

        assert!(engine.is_learning());
        assert_eq!(scorer.calls.load(Ordering::SeqCst), 0);
        assert!(sink.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_tenth_sample_completes_learning_and_is_scored() {
        let scorer = StubScorer::default();
        let sink = RecordingSink::default();
        let mut engine = engine(&scorer, &sink);
        let t0 = Instant::now();

        for _ in 0..LEARNING_PERIOD - 1 {
            engine.cycle(sample(20.0, 30.0), t0).unwrap();
        }
        let outcome = engine.cycle(sample(20.0, 30.0), t0).unwrap();

        assert!(!engine.is_learning());
        assert!(outcome.learned_baseline.is_some());
        assert_eq!(outcome.verdict, Verdict::Normal);
        assert_eq!(scorer.calls.load(Ordering::SeqCst), 1);

        let next = engine.cycle(sample(20.0, 30.0), t0).unwrap();
        assert!(next.learned_baseline.is_none());
    }

    #[test]
    fn test_anomaly_dispatch_and_cooldown() {
        let scorer = StubScorer::default();
        let sink = RecordingSink::default();
        let mut engine = engine(&scorer, &sink);
        let t0 = Instant::now();
        learn(&mut engine, t0);

        scorer.set(-0.5);
        let outcome = engine.cycle(sample(90.0, 31.0), t0).unwrap();
        assert_eq!(outcome.verdict, Verdict::Anomaly);
        assert_eq!(outcome.band, Some(ScoreBand::ExtremelyAbnormal));
        assert_eq!(outcome.alert, Some(DispatchOutcome::Dispatched));
        let classification = outcome.classification.unwrap();
        assert!(classification.is_cpu_high && classification.is_cpu_spike);
        assert!(!classification.is_ram_high);

        let suppressed = engine
            .cycle(sample(90.0, 31.0), t0 + Duration::from_secs(30))
            .unwrap();
        assert_eq!(suppressed.alert, Some(DispatchOutcome::SuppressedByCooldown));

        let again = engine
            .cycle(sample(90.0, 31.0), t0 + Duration::from_secs(65))
            .unwrap();
        assert_eq!(again.alert, Some(DispatchOutcome::Dispatched));

        assert_eq!(sink.sent.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_both_gates_required() {
        let scorer = StubScorer::default();
        let sink = RecordingSink::default();
        let mut engine = engine(&scorer, &sink);
        let t0 = Instant::now();
        learn(&mut engine, t0);

        // Low score but ordinary readings
        scorer.set(-0.9);
        let outcome = engine.cycle(sample(21.0, 30.0), t0).unwrap();
        assert_eq!(outcome.verdict, Verdict::Normal);
        assert!(outcome.classification.unwrap().score_below_threshold);

        // Extreme readings but an unremarkable score
        scorer.set(-0.05);
        let outcome = engine.cycle(sample(95.0, 95.0), t0).unwrap();
        assert_eq!(outcome.verdict, Verdict::Normal);
        assert!(outcome.alert.is_none());
        assert!(sink.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_launch_attribution_overrides_classification() {
        let scorer = StubScorer::default();
        let sink = RecordingSink::default();
        let mut engine = engine(&scorer, &sink);
        let t0 = Instant::now();
        learn(&mut engine, t0);

        scorer.set(-1.0);
        engine.cycle(sample(20.0, 30.0), t0).unwrap();
        let launch = sample(32.0, 31.0).with_processes(vec![ProcessSnapshot {
            pid: 4242,
            name: "blender".into(),
            cpu_percent: 15.0,
            ram_percent: 2.0,
        }]);
        let outcome = engine.cycle(launch, t0).unwrap();

        match outcome.verdict {
            Verdict::LaunchAttributed {
                ref app,
                cpu_impact,
                ..
            } => {
                assert_eq!(app, "blender");
                assert!((cpu_impact - 12.0).abs() < 1e-9);
            }
            ref other => panic!("unexpected verdict {other:?}"),
        }
        assert!(outcome.classification.is_none());
        assert_eq!(outcome.score, Some(-1.0));
        assert!(engine.known_apps().contains_key("blender"));
        assert!(sink.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_scoring_error_is_returned() {
        let scorer = StubScorer::failing();
        let sink = RecordingSink::default();
        let mut engine = engine(&scorer, &sink);
        let t0 = Instant::now();

        for _ in 0..LEARNING_PERIOD - 1 {
            engine.cycle(sample(20.0, 30.0), t0).unwrap();
        }
        let err = engine.cycle(sample(20.0, 30.0), t0).unwrap_err();
        assert!(matches!(err, MonitorError::Scoring(_)));
    }

    #[test]
    fn test_snapshot_reflects_state() {
        let scorer = StubScorer::default();
        let sink = RecordingSink::default();
        let mut engine = engine(&scorer, &sink).with_interval(Duration::from_secs(2));
        let t0 = Instant::now();

        let snapshot = engine.snapshot();
        assert!(snapshot.learning);
        assert!(snapshot.last_sample.is_none());
        assert_eq!(snapshot.trend, TrendReport::InsufficientData);

        learn(&mut engine, t0);
        scorer.set(-0.2);
        engine.cycle(sample(20.0, 30.0), t0).unwrap();

        let snapshot = engine.snapshot();
        assert!(!snapshot.learning);
        assert_eq!(snapshot.learning_collected, LEARNING_PERIOD);
        assert_eq!(snapshot.history_len, LEARNING_PERIOD + 1);
        // Scored: the 10th sample (0.0) and the last one
        assert_eq!(snapshot.recent_scores.len(), 2);
        assert_eq!(snapshot.recent_scores[1].band, ScoreBand::Unusual);
        assert!(matches!(
            snapshot.trend,
            TrendReport::Window { window, .. } if window == Duration::from_secs(22)
        ));

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["learning"], false);
        assert!(json["baseline"]["anomaly_threshold"].is_number());
    }

    #[test]
    fn test_scores_are_bounded() {
        let scorer = StubScorer::default();
        let sink = RecordingSink::default();
        let mut engine = engine(&scorer, &sink);
        let t0 = Instant::now();
        learn(&mut engine, t0);

        for _ in 0..30 {
            engine.cycle(sample(20.0, 30.0), t0).unwrap();
        }
        assert_eq!(engine.recent_scores().len(), HISTORY_CAPACITY);
        assert_eq!(engine.history().len(), HISTORY_CAPACITY);
    }
}
