//! Request routing and per-target dispatch.
//!
//! The [`Orchestrator`] is the only entry point callers need: it classifies a
//! free-form request, resolves the target, runs the matching capability, and
//! returns a serializable [`OrchestratorResponse`].

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use guardian_audit::{event_types, AuditEntry, AuditSeverity, AuditSummary, AuditTrail};
use guardian_observe::{
    AnomalyRecord, AnomalyScorer, AnomalySeverity, BaselineProvider, HealthCheckResult,
    HealthEvaluator, HealthReport, HealthStatus, MetricCheck, MetricObservation, MetricsSource,
    PredictiveAlert, ReliabilityScore, ReliabilityScorer, SlaCompliance, TraceAnalysis,
    TracePatternDetector, TraceSource,
};
use guardian_recovery::{
    BreakerSnapshot, CancellationFlag, CollaboratorError, CollaboratorResult, DeploymentService,
    HealthVerifier, IncidentSeverity, Notifier, PlanAction, RecoveryCollaborators,
    RecoveryPipeline, RecoveryRun, StateStore, TrafficGuard,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{GuardianConfig, MetricSpec, ERROR_RATE_PERCENT, RESPONSE_TIME_MS, UPTIME_PERCENT};
use crate::error::{GuardianError, Result};
use crate::intent::{Intent, IntentClassifier};
use crate::registry::TargetRegistry;
use crate::target::{ResolvedTarget, TargetExtractor};

/// Actor recorded on audit entries written by the orchestrator.
pub const ORCHESTRATOR_ACTOR: &str = "orchestrator";

/// Collaborators that supply observations.
#[derive(Debug, Clone)]
pub struct ObservationSources {
    /// Metric observations per target.
    pub metrics: Arc<dyn MetricsSource>,
    /// Learned baselines.
    pub baselines: Arc<dyn BaselineProvider>,
    /// Request traces per target.
    pub traces: Arc<dyn TraceSource>,
}

/// Collaborators that act on targets during recovery.
///
/// Health verification is not listed: the orchestrator verifies with its own
/// thresholds through [`EvaluatorHealthVerifier`].
#[derive(Debug, Clone)]
pub struct RecoveryServices {
    /// Traffic isolation.
    pub traffic: Arc<dyn TrafficGuard>,
    /// Rollback and redeploy.
    pub deployments: Arc<dyn DeploymentService>,
    /// Checkpoint restore.
    pub state: Arc<dyn StateStore>,
    /// Team notifications.
    pub notifier: Arc<dyn Notifier>,
}

/// Verifies a target by classifying its latest observations.
///
/// Passes when at least one monitored metric has an observation and the
/// aggregate status is not critical.
#[derive(Debug, Clone)]
pub struct EvaluatorHealthVerifier {
    metrics: Arc<dyn MetricsSource>,
    specs: Vec<MetricSpec>,
    lookback: Duration,
    evaluator: HealthEvaluator,
}

impl EvaluatorHealthVerifier {
    /// Creates a verifier over `specs`.
    #[must_use]
    pub fn new(metrics: Arc<dyn MetricsSource>, specs: Vec<MetricSpec>, lookback: Duration) -> Self {
        Self {
            metrics,
            specs,
            lookback,
            evaluator: HealthEvaluator::new(),
        }
    }
}

impl HealthVerifier for EvaluatorHealthVerifier {
    fn verify(&self, target: &str) -> CollaboratorResult<bool> {
        let mut results = Vec::with_capacity(self.specs.len());
        for spec in &self.specs {
            let observations = self
                .metrics
                .get_recent_observations(target, &spec.name, self.lookback)
                .map_err(|e| CollaboratorError::unavailable(e.to_string()))?;
            if let Some(latest) = observations.last() {
                results.push(self.evaluator.check(&MetricCheck::new(
                    spec.name.clone(),
                    latest.value,
                    spec.threshold,
                    spec.kind,
                )));
            }
        }

        if results.is_empty() {
            debug!(target_name = target, "no observations to verify against");
            return Ok(false);
        }
        let report = HealthReport::from_results(results);
        Ok(report.overall_status != HealthStatus::Critical)
    }
}

/// A metric whose source failed during a monitor request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnavailableMetric {
    /// Metric name.
    pub metric: String,
    /// Source error.
    pub reason: String,
}

/// Result of a monitor request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorResult {
    /// Health of every metric with observations.
    pub health: HealthReport,
    /// Metrics deviating from their baseline.
    pub anomalies: Vec<AnomalyRecord>,
    /// Forward-looking alerts.
    pub predictive_alerts: Vec<PredictiveAlert>,
    /// Monitored metrics with no observations in the lookback window.
    pub missing_metrics: Vec<String>,
    /// Monitored metrics whose source failed.
    pub unavailable_metrics: Vec<UnavailableMetric>,
    /// Worst of the health status and the anomaly severities.
    pub incident_severity: IncidentSeverity,
    /// Actions recommended for `incident_severity`.
    pub recommended_plan: Vec<PlanAction>,
    /// The target's breaker after the request.
    pub breaker: BreakerSnapshot,
    /// Recovery run started because the target was critical.
    pub auto_recovery: Option<RecoveryRun>,
}

/// Result of a report request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportResult {
    /// Score, absent if any input metric is missing.
    pub reliability: Option<ReliabilityScore>,
    /// SLA compliance, absent if uptime is missing.
    pub sla: Option<SlaCompliance>,
    /// Downtime implied by the achieved uptime over one SLA period.
    pub downtime_hours: Option<f64>,
    /// Score inputs that had no observations or whose source failed.
    pub missing_metrics: Vec<String>,
    /// Recent audit activity.
    pub audit_summary: AuditSummary,
    /// The target's breaker.
    pub breaker: BreakerSnapshot,
}

/// Result of a recover request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoverResult {
    /// The finished run.
    pub run: RecoveryRun,
    /// The target's breaker after the run.
    pub breaker: BreakerSnapshot,
}

/// Result of an analyze request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeResult {
    /// Detected trace patterns.
    pub analysis: TraceAnalysis,
}

/// One supported command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandHelp {
    /// Intent the command maps to.
    pub intent: Intent,
    /// Sample request.
    pub example: String,
    /// What the command returns.
    pub description: String,
}

/// Result of a help request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelpResult {
    /// Supported commands.
    pub commands: Vec<CommandHelp>,
    /// Capabilities.
    pub features: Vec<String>,
}

impl HelpResult {
    fn listing() -> Self {
        let command = |intent, example: &str, description: &str| CommandHelp {
            intent,
            example: example.to_string(),
            description: description.to_string(),
        };
        Self {
            commands: vec![
                command(
                    Intent::Monitor,
                    "Monitor PaymentAgent for reliability issues",
                    "Health checks, anomalies, and predictive alerts",
                ),
                command(
                    Intent::Report,
                    "Generate SLA report for PaymentAgent",
                    "Reliability score, grade, and SLA compliance",
                ),
                command(
                    Intent::Recover,
                    "Recover PaymentAgent",
                    "Isolate, roll back, restore, verify, and notify",
                ),
                command(
                    Intent::Analyze,
                    "Analyze traces for PaymentAgent",
                    "Recurring failure patterns in recent traces",
                ),
            ],
            features: [
                "Threshold health checks",
                "Baseline anomaly detection",
                "Predictive failure alerts",
                "Circuit-breaker-gated recovery",
                "Trace pattern detection",
                "Append-only audit trail",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// Capability-specific part of a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IntentResult {
    /// See [`MonitorResult`].
    Monitor(MonitorResult),
    /// See [`ReportResult`].
    Report(ReportResult),
    /// See [`RecoverResult`].
    Recover(RecoverResult),
    /// See [`AnalyzeResult`].
    Analyze(AnalyzeResult),
    /// See [`HelpResult`].
    Help(HelpResult),
}

/// Response to one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorResponse {
    /// Classified intent.
    pub intent: Intent,
    /// Resolved target name.
    pub target: String,
    /// When the response was produced.
    pub timestamp: DateTime<Utc>,
    /// Capability result.
    pub result: IntentResult,
}

impl OrchestratorResponse {
    /// Serializes the response as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`GuardianError::Serialization`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Outcome of one monitor worker.
enum MetricOutcome {
    Observed {
        check: HealthCheckResult,
        record: Option<AnomalyRecord>,
        observations: Vec<MetricObservation>,
    },
    Missing(String),
    Unavailable(UnavailableMetric),
}

/// Routes requests to the reliability capabilities.
#[derive(Debug)]
pub struct Orchestrator {
    config: GuardianConfig,
    classifier: IntentClassifier,
    extractor: TargetExtractor,
    evaluator: HealthEvaluator,
    scorer: AnomalyScorer,
    reliability: ReliabilityScorer,
    detector: TracePatternDetector,
    pipeline: RecoveryPipeline,
    registry: TargetRegistry,
    sources: ObservationSources,
    audit: AuditTrail,
}

impl Orchestrator {
    /// Creates an orchestrator from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GuardianError::Configuration`] if the configuration is rejected.
    pub fn new(
        config: GuardianConfig,
        sources: ObservationSources,
        services: RecoveryServices,
        audit: AuditTrail,
    ) -> Result<Self> {
        config.validate()?;

        let scorer = AnomalyScorer::with_config(config.anomaly.clone())
            .map_err(crate::error::ConfigError::from)?;
        let detector = TracePatternDetector::with_config(config.patterns.clone(), scorer.clone())
            .map_err(crate::error::ConfigError::from)?;

        let verifier = EvaluatorHealthVerifier::new(
            Arc::clone(&sources.metrics),
            config.monitoring.metric_specs(),
            Duration::seconds(config.monitoring.lookback_secs),
        );
        let collaborators = RecoveryCollaborators::new(
            services.traffic,
            services.deployments,
            services.state,
            Arc::new(verifier),
            services.notifier,
        );
        let pipeline =
            RecoveryPipeline::with_options(collaborators, config.recovery.pipeline.clone(), audit.clone())?;
        let registry = TargetRegistry::new(
            config.recovery.breaker()?,
            config.monitoring.observation_window,
        );

        info!(
            metrics = config.monitoring.metric_specs().len(),
            auto_recover = config.recovery.auto_recover,
            "orchestrator ready"
        );

        Ok(Self {
            classifier: IntentClassifier::new(),
            extractor: TargetExtractor::new(config.extraction.clone()),
            evaluator: HealthEvaluator::new(),
            scorer,
            reliability: ReliabilityScorer::new(),
            detector,
            pipeline,
            registry,
            sources,
            audit,
            config,
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &GuardianConfig {
        &self.config
    }

    /// Returns the target registry.
    #[must_use]
    pub const fn registry(&self) -> &TargetRegistry {
        &self.registry
    }

    /// Returns the audit trail handle.
    #[must_use]
    pub const fn audit(&self) -> &AuditTrail {
        &self.audit
    }

    /// Returns a snapshot of the audit trail, oldest first.
    #[must_use]
    pub fn get_audit_entries(&self) -> Vec<AuditEntry> {
        self.audit.entries()
    }

    /// Classifies `raw`, resolves its target, and runs the matching capability.
    ///
    /// # Errors
    ///
    /// Returns [`GuardianError::InvariantViolation`] if a recovery run breaks step
    /// ordering and [`GuardianError::Source`] if an analyze request cannot read
    /// traces. Collaborator failures during recovery are reported in the result.
    pub fn handle_request(&self, raw: &str) -> Result<OrchestratorResponse> {
        let intent = self.classifier.classify(raw);
        let target = self.resolve_target(raw);
        info!(%intent, target_name = %target, "dispatching request");

        let result = match intent {
            Intent::Monitor => IntentResult::Monitor(self.monitor(&target)?),
            Intent::Report => IntentResult::Report(self.report(&target)),
            Intent::Recover => IntentResult::Recover(self.recover(&target)?),
            Intent::Analyze => IntentResult::Analyze(self.analyze(&target)?),
            Intent::Help => IntentResult::Help(HelpResult::listing()),
        };

        Ok(OrchestratorResponse {
            intent,
            target,
            timestamp: Utc::now(),
            result,
        })
    }

    /// Runs the recovery pipeline for `target`.
    ///
    /// The target's lock is held for the whole run.
    ///
    /// # Errors
    ///
    /// Returns [`GuardianError::InvariantViolation`] if step ordering breaks.
    pub fn recover(&self, target: &str) -> Result<RecoverResult> {
        self.recover_with_cancellation(target, &CancellationFlag::new())
    }

    /// Runs the recovery pipeline for `target`, stopping at the next step
    /// boundary once `cancel` is set.
    ///
    /// # Errors
    ///
    /// Returns [`GuardianError::InvariantViolation`] if step ordering breaks.
    pub fn recover_with_cancellation(
        &self,
        target: &str,
        cancel: &CancellationFlag,
    ) -> Result<RecoverResult> {
        let handle = self.registry.get_or_create(target);
        let mut state = handle.lock();
        let run = self
            .pipeline
            .execute_with_cancellation(target, &mut state.breaker, cancel)?;
        Ok(RecoverResult {
            run,
            breaker: state.breaker.snapshot(),
        })
    }

    /// Checks health and anomalies over the target's latest observations.
    ///
    /// # Errors
    ///
    /// Returns [`GuardianError::InvariantViolation`] if a metric worker dies or an
    /// automatic recovery run breaks step ordering.
    pub fn monitor(&self, target: &str) -> Result<MonitorResult> {
        let specs = self.config.monitoring.metric_specs();
        let lookback = self.lookback();

        let outcomes = std::thread::scope(|scope| {
            let workers: Vec<_> = specs
                .iter()
                .map(|spec| (spec.name.as_str(), scope.spawn(move || self.observe_metric(target, spec, lookback))))
                .collect();
            workers
                .into_iter()
                .map(|(metric, worker)| {
                    worker.join().map_err(|_| {
                        GuardianError::InvariantViolation(format!("monitor worker for {metric} panicked"))
                    })
                })
                .collect::<Result<Vec<_>>>()
        })?;

        let mut checks = Vec::new();
        let mut records = Vec::new();
        let mut observed = Vec::new();
        let mut missing_metrics = Vec::new();
        let mut unavailable_metrics = Vec::new();
        for outcome in outcomes {
            match outcome {
                MetricOutcome::Observed {
                    check,
                    record,
                    observations,
                } => {
                    checks.push(check);
                    records.extend(record);
                    observed.push(observations);
                }
                MetricOutcome::Missing(metric) => missing_metrics.push(metric),
                MetricOutcome::Unavailable(unavailable) => unavailable_metrics.push(unavailable),
            }
        }

        let health = HealthReport::from_results(checks);

        let (histories, mut breaker) = {
            let handle = self.registry.get_or_create(target);
            let mut state = handle.lock();
            for observations in &observed {
                state.window.extend(observations);
            }
            (state.window.all_histories(), state.breaker.snapshot())
        };

        let predictive_alerts = self.scorer.predictive_alerts(&records, &histories);
        let anomalies: Vec<AnomalyRecord> = records
            .into_iter()
            .filter(|r| self.scorer.is_anomalous(r))
            .collect();

        self.audit.log_with_severity(
            event_types::HEALTH_CHECK,
            ORCHESTRATOR_ACTOR,
            format!(
                "target {target}: {} across {} checks ({} warning, {} critical)",
                health.overall_status, health.total_checks, health.warning_checks, health.critical_checks
            ),
            match health.overall_status {
                HealthStatus::Healthy => AuditSeverity::Info,
                HealthStatus::Warning => AuditSeverity::Warning,
                HealthStatus::Critical => AuditSeverity::Critical,
            },
        );
        for anomaly in &anomalies {
            self.audit.log_with_severity(
                event_types::ANOMALY_DETECTED,
                ORCHESTRATOR_ACTOR,
                format!(
                    "target {target}: {} at {} is {:.2} sigma from {} ({})",
                    anomaly.metric,
                    anomaly.current_value,
                    anomaly.std_deviations,
                    anomaly.baseline_mean,
                    anomaly.severity.as_str()
                ),
                match anomaly.severity {
                    AnomalySeverity::Critical => AuditSeverity::Critical,
                    AnomalySeverity::High => AuditSeverity::Warning,
                    _ => AuditSeverity::Info,
                },
            );
        }

        let incident_severity = incident_severity(&health, &anomalies);
        debug!(target_name = target, severity = %incident_severity, "incident classified");

        let auto_recovery =
            if self.config.recovery.auto_recover && health.overall_status == HealthStatus::Critical {
                warn!(target_name = target, "target critical, starting automatic recovery");
                let recovered = self.recover(target)?;
                breaker = recovered.breaker;
                Some(recovered.run)
            } else {
                None
            };

        Ok(MonitorResult {
            health,
            anomalies,
            predictive_alerts,
            missing_metrics,
            unavailable_metrics,
            incident_severity,
            recommended_plan: incident_severity.recovery_plan(),
            breaker,
            auto_recovery,
        })
    }

    /// Scores reliability and SLA compliance from window means.
    pub fn report(&self, target: &str) -> ReportResult {
        let mut missing_metrics = Vec::new();
        let mut mean_of = |metric: &str| {
            let mean = self.window_mean(target, metric);
            if mean.is_none() {
                missing_metrics.push(metric.to_string());
            }
            mean
        };
        let error_rate = mean_of(ERROR_RATE_PERCENT);
        let uptime = mean_of(UPTIME_PERCENT);
        let response_time = mean_of(RESPONSE_TIME_MS);

        let compliance = &self.config.compliance;
        let reliability = match (error_rate, uptime, response_time) {
            (Some(e), Some(u), Some(r)) => {
                Some(self.reliability.score(e, u, r, compliance.response_time_target_ms))
            }
            _ => None,
        };
        let sla = uptime.map(|u| self.reliability.sla_compliance(u, compliance.sla_target_percent));
        let downtime_hours = uptime.map(|u| {
            let hours = (100.0 - u).max(0.0) / 100.0 * compliance.sla_period_hours;
            (hours * 100.0).round() / 100.0
        });

        let audit_summary = self.audit.summary(compliance.audit_summary_size);
        let breaker = self.registry.get_or_create(target).lock().breaker.snapshot();

        self.audit.log(
            event_types::REPORT_GENERATED,
            ORCHESTRATOR_ACTOR,
            match (&reliability, &sla) {
                (Some(score), Some(sla)) => format!(
                    "target {target}: score {} grade {}, sla {}",
                    score.score,
                    score.grade,
                    if sla.compliant { "met" } else { "missed" }
                ),
                _ => format!("target {target}: incomplete, missing {}", missing_metrics.join(", ")),
            },
        );

        ReportResult {
            reliability,
            sla,
            downtime_hours,
            missing_metrics,
            audit_summary,
            breaker,
        }
    }

    /// Detects failure patterns in the target's recent traces.
    ///
    /// # Errors
    ///
    /// Returns [`GuardianError::Source`] if the trace source fails.
    pub fn analyze(&self, target: &str) -> Result<AnalyzeResult> {
        let traces = self.sources.traces.get_recent_traces(target, self.lookback())?;
        let analysis = self.detector.analyze(&traces);

        self.audit.log_with_severity(
            event_types::TRACE_ANALYSIS,
            ORCHESTRATOR_ACTOR,
            format!(
                "target {target}: {} traces, {} patterns ({} critical, {} high)",
                analysis.traces_analyzed,
                analysis.patterns_detected.len(),
                analysis.critical_patterns,
                analysis.high_patterns
            ),
            if analysis.critical_patterns > 0 {
                AuditSeverity::Warning
            } else {
                AuditSeverity::Info
            },
        );

        Ok(AnalyzeResult { analysis })
    }

    fn resolve_target(&self, raw: &str) -> String {
        let fallback = match self.extractor.resolve(raw) {
            ResolvedTarget::Named(target) => return target,
            ResolvedTarget::Fallback(fallback) => fallback,
        };
        warn!(target_name = %fallback, "no target named in request");
        self.audit.log_with_severity(
            event_types::TARGET_UNRESOLVED,
            ORCHESTRATOR_ACTOR,
            format!("no target named in {raw:?}, using {fallback}"),
            AuditSeverity::Warning,
        );
        fallback
    }

    fn lookback(&self) -> Duration {
        Duration::seconds(self.config.monitoring.lookback_secs)
    }

    fn observe_metric(&self, target: &str, spec: &MetricSpec, lookback: Duration) -> MetricOutcome {
        let observations = match self
            .sources
            .metrics
            .get_recent_observations(target, &spec.name, lookback)
        {
            Ok(observations) => observations,
            Err(e) => {
                warn!(target_name = target, metric = %spec.name, error = %e, "metric source failed");
                return MetricOutcome::Unavailable(UnavailableMetric {
                    metric: spec.name.clone(),
                    reason: e.to_string(),
                });
            }
        };
        let Some(latest) = observations.last() else {
            return MetricOutcome::Missing(spec.name.clone());
        };

        let value = latest.value;
        let check = self
            .evaluator
            .check(&MetricCheck::new(spec.name.clone(), value, spec.threshold, spec.kind));
        let record = self
            .sources
            .baselines
            .get_baseline(&spec.name)
            .map(|baseline| self.scorer.build_anomaly_record(&spec.name, value, &baseline));
        self.sources.baselines.record_observation(&spec.name, value);

        MetricOutcome::Observed {
            check,
            record,
            observations,
        }
    }

    fn window_mean(&self, target: &str, metric: &str) -> Option<f64> {
        match self
            .sources
            .metrics
            .get_recent_observations(target, metric, self.lookback())
        {
            Ok(observations) if !observations.is_empty() => {
                Some(observations.iter().map(|o| o.value).sum::<f64>() / observations.len() as f64)
            }
            Ok(_) => None,
            Err(e) => {
                warn!(target_name = target, metric, error = %e, "metric source failed");
                None
            }
        }
    }
}

/// Critical health counts as high; only a critical anomaly escalates further.
fn incident_severity(health: &HealthReport, anomalies: &[AnomalyRecord]) -> IncidentSeverity {
    let from_health = match health.overall_status {
        HealthStatus::Healthy => IncidentSeverity::Low,
        HealthStatus::Warning => IncidentSeverity::Medium,
        HealthStatus::Critical => IncidentSeverity::High,
    };
    anomalies
        .iter()
        .map(|a| match a.severity {
            AnomalySeverity::Low => IncidentSeverity::Low,
            AnomalySeverity::Medium => IncidentSeverity::Medium,
            AnomalySeverity::High => IncidentSeverity::High,
            AnomalySeverity::Critical => IncidentSeverity::Critical,
        })
        .fold(from_health, IncidentSeverity::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use guardian_observe::ObserveError;
    use std::collections::HashMap;
    use test_case::test_case;

    #[derive(Debug, Default)]
    struct Metrics {
        series: HashMap<String, Vec<f64>>,
        failing: Vec<String>,
    }

    impl MetricsSource for Metrics {
        fn get_recent_observations(
            &self,
            _target: &str,
            metric: &str,
            _window: Duration,
        ) -> guardian_observe::Result<Vec<MetricObservation>> {
            if self.failing.iter().any(|m| m == metric) {
                return Err(ObserveError::source_unavailable("store offline"));
            }
            let start = DateTime::<Utc>::UNIX_EPOCH;
            Ok(self
                .series
                .get(metric)
                .map(|values| {
                    values
                        .iter()
                        .enumerate()
                        .map(|(i, v)| MetricObservation::new(metric, *v, start + Duration::seconds(i as i64)))
                        .collect()
                })
                .unwrap_or_default())
        }
    }

    fn verifier(series: &[(&str, f64)], failing: &[&str]) -> EvaluatorHealthVerifier {
        let metrics = Metrics {
            series: series.iter().map(|(m, v)| ((*m).to_string(), vec![*v])).collect(),
            failing: failing.iter().map(|m| (*m).to_string()).collect(),
        };
        EvaluatorHealthVerifier::new(
            Arc::new(metrics),
            crate::config::MonitoringConfig::default().metric_specs(),
            Duration::seconds(300),
        )
    }

    #[test]
    fn verifier_passes_warning_but_not_critical() {
        let warning = verifier(&[(RESPONSE_TIME_MS, 1200.0)], &[]);
        assert!(matches!(warning.verify("Paymentagent"), Ok(true)));

        let critical = verifier(&[(RESPONSE_TIME_MS, 1800.0)], &[]);
        assert!(matches!(critical.verify("Paymentagent"), Ok(false)));
    }

    #[test]
    fn verifier_fails_without_observations() {
        assert!(matches!(verifier(&[], &[]).verify("Paymentagent"), Ok(false)));
    }

    #[test]
    fn verifier_reports_unavailable_source() {
        let result = verifier(&[], &[ERROR_RATE_PERCENT]).verify("Paymentagent");
        assert!(matches!(result, Err(CollaboratorError::Unavailable { .. })));
    }

    fn latency_report(value: f64) -> HealthReport {
        let spec = crate::config::MonitoringConfig::default()
            .metric_specs()
            .into_iter()
            .find(|s| s.name == RESPONSE_TIME_MS)
            .unwrap_or_else(|| panic!("latency is monitored"));
        HealthReport::from_results(vec![HealthEvaluator::new().check(&MetricCheck::new(
            spec.name,
            value,
            spec.threshold,
            spec.kind,
        ))])
    }

    fn latency_anomaly(value: f64) -> AnomalyRecord {
        let baseline = guardian_observe::BaselineStats::new(RESPONSE_TIME_MS, 287.0, 52.0);
        AnomalyScorer::new().build_anomaly_record(RESPONSE_TIME_MS, value, &baseline)
    }

    #[test_case(300.0, None, IncidentSeverity::Low ; "healthy")]
    #[test_case(1200.0, None, IncidentSeverity::Medium ; "warning")]
    #[test_case(1800.0, None, IncidentSeverity::High ; "critical health")]
    #[test_case(1200.0, Some(1200.0), IncidentSeverity::Critical ; "critical anomaly escalates")]
    #[test_case(1800.0, Some(300.0), IncidentSeverity::High ; "mild anomaly does not lower")]
    fn incident_severity_takes_the_worst_signal(
        health: f64,
        anomaly: Option<f64>,
        expected: IncidentSeverity,
    ) {
        let anomalies: Vec<AnomalyRecord> = anomaly.into_iter().map(latency_anomaly).collect();
        assert_eq!(incident_severity(&latency_report(health), &anomalies), expected);
    }

    #[test]
    fn help_lists_every_routed_intent() {
        let help = HelpResult::listing();
        let intents: Vec<Intent> = help.commands.iter().map(|c| c.intent).collect();
        assert_eq!(intents, vec![Intent::Monitor, Intent::Report, Intent::Recover, Intent::Analyze]);
        assert!(!help.features.is_empty());
    }

    #[test]
    fn intent_result_is_tagged() {
        let json = serde_json::to_value(IntentResult::Help(HelpResult::listing()))
            .unwrap_or_else(|e| panic!("serializable: {e}"));
        assert_eq!(json["type"], "help");
        assert!(json["commands"].is_array());
    }
}
