//! Single-attempt prober
//!
//! Executes exactly one HTTP call for one candidate. The call races a
//! `tokio::time` deadline; whichever loses is dropped, so the Prober yields
//! control no later than its budget plus scheduler jitter. No retries happen
//! here: the plan itself provides fallbacks.
//!
//! Every path returns an `AttemptOutcome`. Error text is scrubbed of the
//! credential used for the attempt before it is stored.

use base64::Engine as _;
use std::sync::Arc;
use std::time::Duration;

use crate::core::probe::client::{ProbeClient, ProbeRequest, TransportError};
use crate::core::probe::clock::Clock;
use crate::core::probe::debug_logger::DebugLogger;
use crate::core::probe::rate_limit::extract_rate_limit;
use crate::core::probe::secret::{scrub_secrets, EnvSource, Secret};
use crate::core::probe::types::{
    AttemptError, AttemptErrorKind, AttemptOutcome, AuthStrategy, Candidate, SecretRef,
};
use crate::core::probe::url::{append_query, join_endpoint};

/// Time allowed for one attempt and what bounds it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptBudget {
    pub duration: Duration,
    /// The overall deadline, not the per-attempt timeout, is the binding limit
    pub bound_by_deadline: bool,
}

impl AttemptBudget {
    pub fn attempt(timeout: Duration) -> Self {
        Self {
            duration: timeout,
            bound_by_deadline: false,
        }
    }

    pub fn deadline(remaining: Duration) -> Self {
        Self {
            duration: remaining,
            bound_by_deadline: true,
        }
    }
}

pub struct Prober {
    client: Arc<dyn ProbeClient>,
    clock: Arc<dyn Clock>,
}

impl Prober {
    pub fn new(client: Arc<dyn ProbeClient>, clock: Arc<dyn Clock>) -> Self {
        Self { client, clock }
    }

    /// Execute one attempt
    ///
    /// # Arguments
    /// * `base_url` - Service origin from the plan
    /// * `candidate` - Endpoint and auth strategy to use
    /// * `env` - Source the credential is resolved from, right now
    /// * `budget` - Upper bound on how long this call may take
    /// * `logger` / `correlation_id` - Lifecycle logging for this invocation
    pub async fn probe(
        &self,
        base_url: &str,
        candidate: &Candidate,
        env: &dyn EnvSource,
        budget: AttemptBudget,
        logger: &DebugLogger,
        correlation_id: &str,
    ) -> AttemptOutcome {
        let start = self.clock.now();
        let label = candidate.label();
        logger.attempt_start(
            base_url,
            &label,
            budget.duration.as_millis() as u64,
            correlation_id,
        );

        let mut fragments = Vec::new();
        let outcome = match build_request(base_url, candidate, env, budget.duration, &mut fragments) {
            Ok(request) => self.execute(candidate, request, budget, start).await,
            Err(error) => self.failed(candidate, error, start),
        };
        let outcome = scrub_outcome(outcome, &fragments);

        logger.attempt_end(
            &label,
            outcome.status,
            outcome.error_kind().map(|k| k.as_str()),
            outcome.elapsed.as_millis() as u64,
            correlation_id,
        );
        outcome
    }

    async fn execute(
        &self,
        candidate: &Candidate,
        request: ProbeRequest,
        budget: AttemptBudget,
        start: std::time::Instant,
    ) -> AttemptOutcome {
        match tokio::time::timeout(budget.duration, self.client.send(request)).await {
            Ok(Ok(response)) => {
                let snapshot = extract_rate_limit(&response.headers, self.clock.epoch_seconds());
                AttemptOutcome {
                    sequence: candidate.sequence,
                    endpoint: candidate.endpoint.clone(),
                    auth_mode: candidate.auth.mode(),
                    ordinal: candidate.ordinal,
                    status: Some(response.status_code),
                    error: None,
                    elapsed: self.clock.now().saturating_duration_since(start),
                    rate_limit: snapshot.has_signal().then_some(snapshot),
                }
            }
            Ok(Err(transport)) => self.failed(candidate, transport_error(transport), start),
            Err(_) => {
                let millis = budget.duration.as_millis();
                let error = if budget.bound_by_deadline {
                    AttemptError {
                        kind: AttemptErrorKind::Cancelled,
                        message: format!("overall deadline reached after {}ms in flight", millis),
                    }
                } else {
                    AttemptError {
                        kind: AttemptErrorKind::Timeout,
                        message: format!("timed out after {}ms", millis),
                    }
                };
                self.failed(candidate, error, start)
            }
        }
    }

    fn failed(&self, candidate: &Candidate, error: AttemptError, start: std::time::Instant) -> AttemptOutcome {
        AttemptOutcome {
            sequence: candidate.sequence,
            endpoint: candidate.endpoint.clone(),
            auth_mode: candidate.auth.mode(),
            ordinal: candidate.ordinal,
            status: None,
            error: Some(error),
            elapsed: self.clock.now().saturating_duration_since(start),
            rate_limit: None,
        }
    }
}

fn transport_error(error: TransportError) -> AttemptError {
    let kind = match &error {
        TransportError::Timeout(_) => AttemptErrorKind::Timeout,
        TransportError::Network(_) => AttemptErrorKind::Network,
        TransportError::InvalidRequest(_) => AttemptErrorKind::InvalidRequest,
    };
    AttemptError {
        kind,
        message: error.to_string(),
    }
}

/// Build the outgoing request, applying the auth strategy to it only
///
/// Every secret-derived string is pushed onto `fragments` for scrubbing.
fn build_request(
    base_url: &str,
    candidate: &Candidate,
    env: &dyn EnvSource,
    timeout: Duration,
    fragments: &mut Vec<String>,
) -> Result<ProbeRequest, AttemptError> {
    let invalid = |e: crate::core::probe::url::UrlError| AttemptError {
        kind: AttemptErrorKind::InvalidRequest,
        message: e.to_string(),
    };

    let mut url = join_endpoint(base_url, &candidate.endpoint.path).map_err(invalid)?;
    let mut headers = Vec::new();

    let secret = match candidate.auth.secret_ref() {
        Some(secret_ref) => {
            let secret = resolve(secret_ref, env)?;
            fragments.extend(secret.fragments());
            Some(secret)
        }
        None => None,
    };

    match (&candidate.auth, secret) {
        (AuthStrategy::None, _) => {}
        (AuthStrategy::Basic { credential }, Some(secret)) => {
            let encoded = match credential {
                SecretRef::Env(_) => secret.expose().to_string(),
                SecretRef::Pair { .. } => {
                    base64::engine::general_purpose::STANDARD.encode(secret.expose())
                }
            };
            fragments.push(encoded.clone());
            headers.push(("Authorization".to_string(), format!("Basic {}", encoded)));
        }
        (AuthStrategy::Bearer { .. }, Some(secret)) => {
            headers.push((
                "Authorization".to_string(),
                format!("Bearer {}", secret.expose()),
            ));
        }
        (AuthStrategy::ApiKeyHeader { name, .. }, Some(secret)) => {
            headers.push((name.clone(), secret.expose().to_string()));
        }
        (AuthStrategy::ApiKeyQuery { name, .. }, Some(secret)) => {
            url = append_query(&url, name, secret.expose()).map_err(invalid)?;
            fragments.extend(url_encoded_forms(secret.expose()));
        }
        (_, None) => {
            return Err(AttemptError {
                kind: AttemptErrorKind::CredentialUnavailable,
                message: "credential not resolvable".to_string(),
            })
        }
    }

    Ok(ProbeRequest {
        url,
        headers,
        timeout,
    })
}

fn resolve(secret_ref: &SecretRef, env: &dyn EnvSource) -> Result<Secret, AttemptError> {
    secret_ref.resolve(env).ok_or_else(|| AttemptError {
        kind: AttemptErrorKind::CredentialUnavailable,
        message: format!(
            "{} not set at request time",
            secret_ref.env_names().join(" + ")
        ),
    })
}

fn url_encoded_forms(value: &str) -> Vec<String> {
    let encoded: String = url::form_urlencoded::byte_serialize(value.as_bytes()).collect();
    if encoded == value {
        Vec::new()
    } else {
        vec![encoded]
    }
}

fn scrub_outcome(mut outcome: AttemptOutcome, fragments: &[String]) -> AttemptOutcome {
    if let Some(error) = outcome.error.as_mut() {
        error.message = scrub_secrets(&error.message, fragments);
    }
    if let Some(snapshot) = outcome.rate_limit.as_mut() {
        for value in snapshot.raw.values_mut().flatten() {
            *value = scrub_secrets(value, fragments);
        }
    }
    outcome
}
