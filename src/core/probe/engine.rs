/*!
Probe engine: drives one candidate plan to a connectivity report.

## Flow

1. Validate the descriptor (the only way an invocation can fail)
2. Build the candidate plan; an unconfigured service or an unusable base
   origin returns a report immediately
3. Execute candidates **sequentially**, one Prober attempt each
4. After every outcome, ask the classifier whether to stop
5. Assemble the report from the aggregator

## Deadlines

With an overall deadline, each attempt gets `min(timeout, remaining)`. When
the deadline fires mid-attempt the late result is discarded, the attempt is
recorded as `cancelled`, and the plan ends with whatever was collected.

## Concurrency

Every invocation builds its own plan, prober, aggregator and classifier.
`probe_all` runs different services concurrently; nothing is shared between
them except the read-only transport and clock.
*/

use futures::future::join_all;
use std::sync::Arc;

use crate::core::probe::classifier::ReachabilityClassifier;
use crate::core::probe::client::ProbeClient;
use crate::core::probe::clock::{Clock, SystemClock};
use crate::core::probe::debug_logger::get_debug_logger;
use crate::core::probe::plan::CandidatePlan;
use crate::core::probe::prober::{AttemptBudget, Prober};
use crate::core::probe::report::{ConnectivityReport, DiagnosticsAggregator};
use crate::core::probe::secret::{presence_flags, EnvSource};
use crate::core::probe::types::{AttemptErrorKind, ProbeError, ServiceDescriptor};
use crate::core::probe::url::validate_base_url;

pub struct ProbeEngine {
    client: Arc<dyn ProbeClient>,
    clock: Arc<dyn Clock>,
}

impl ProbeEngine {
    pub fn new(client: Arc<dyn ProbeClient>) -> Self {
        Self {
            client,
            clock: Arc::new(SystemClock),
        }
    }

    /// Configure the engine with a custom clock (for testing)
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Probe one service
    ///
    /// # Errors
    ///
    /// Returns `ProbeError` only for an invalid descriptor. Unreachable,
    /// misconfigured or slow targets always produce `Ok(report)`.
    pub async fn probe(
        &self,
        descriptor: &ServiceDescriptor,
        env: &dyn EnvSource,
    ) -> Result<ConnectivityReport, ProbeError> {
        let logger = get_debug_logger();
        if let Err(err) = descriptor.validate() {
            logger.error("ProbeEngine", &format!("rejected descriptor: {}", err));
            return Err(err);
        }

        let correlation_id = format!("probe_{}", uuid::Uuid::new_v4());
        let started = self.clock.now();
        let env_flags = presence_flags(descriptor, env);

        let plan = CandidatePlan::build(descriptor, env);
        let base_url = match plan.base_url() {
            Some(url) => url.to_string(),
            None => {
                logger.debug(
                    "ProbeEngine",
                    &format!("{} not configured, skipping network I/O", descriptor.name),
                );
                let elapsed = self.clock.now().saturating_duration_since(started);
                return Ok(ConnectivityReport::not_configured(descriptor, env_flags, elapsed));
            }
        };
        if let Err(problem) = validate_base_url(&base_url) {
            logger.debug(
                "ProbeEngine",
                &format!("{} has an unusable base URL: {}", descriptor.name, problem),
            );
            let elapsed = self.clock.now().saturating_duration_since(started);
            return Ok(ConnectivityReport::invalid_config(
                descriptor, &problem, env_flags, elapsed,
            ));
        }

        logger.plan_built(&descriptor.name, plan.len(), plan.skipped().len(), &correlation_id);

        let mut aggregator = DiagnosticsAggregator::new(&descriptor.name, started);
        for skipped in plan.skipped() {
            logger.candidate_skipped(
                &descriptor.name,
                &skipped.label(),
                &skipped.missing,
                &correlation_id,
            );
            aggregator.record_skipped(skipped);
        }

        let prober = Prober::new(self.client.clone(), self.clock.clone());
        let classifier = ReachabilityClassifier::new(&base_url);
        let deadline = descriptor.deadline.map(|budget| started + budget);

        let mut outcomes = Vec::with_capacity(plan.len());
        let mut assessment = classifier.assess(&outcomes);

        for (index, candidate) in plan.candidates().iter().enumerate() {
            let budget = match deadline {
                Some(at) => {
                    let remaining = at.saturating_duration_since(self.clock.now());
                    if remaining.is_zero() {
                        aggregator.record_error(
                            "plan",
                            format!(
                                "overall deadline exceeded; {} candidate(s) not attempted",
                                plan.len() - index
                            ),
                        );
                        break;
                    }
                    if remaining < descriptor.timeout {
                        AttemptBudget::deadline(remaining)
                    } else {
                        AttemptBudget::attempt(descriptor.timeout)
                    }
                }
                None => AttemptBudget::attempt(descriptor.timeout),
            };

            let outcome = prober
                .probe(&base_url, candidate, env, budget, &logger, &correlation_id)
                .await;
            aggregator.record(&outcome);
            let cancelled = outcome.error_kind() == Some(AttemptErrorKind::Cancelled);
            outcomes.push(outcome);
            assessment = classifier.assess(&outcomes);

            if cancelled {
                aggregator.record_error(
                    "plan",
                    format!(
                        "overall deadline exceeded; {} candidate(s) not attempted",
                        plan.len() - index - 1
                    ),
                );
                break;
            }
            if let Some(reason) = assessment.stop {
                logger.debug(
                    "ProbeEngine",
                    &format!(
                        "{} stopping after attempt {} of {}: {:?}",
                        descriptor.name,
                        index + 1,
                        plan.len(),
                        reason
                    ),
                );
                break;
            }
        }

        let attempts = aggregator.attempts();
        let report = aggregator.finish(&assessment, env_flags, self.clock.now());
        logger.probe_complete(
            &descriptor.name,
            report.verdict().as_str(),
            attempts,
            report.duration_ms(),
            &correlation_id,
        );
        Ok(report)
    }

    /// Probe several services concurrently; results keep input order
    pub async fn probe_all(
        &self,
        descriptors: &[ServiceDescriptor],
        env: &dyn EnvSource,
    ) -> Vec<Result<ConnectivityReport, ProbeError>> {
        let started = self.clock.now();
        let results = join_all(descriptors.iter().map(|descriptor| self.probe(descriptor, env))).await;
        get_debug_logger().performance(
            "ProbeEngine",
            &format!("probe_all ({} services)", descriptors.len()),
            self.clock.now().saturating_duration_since(started).as_millis() as u64,
        );
        results
    }
}
