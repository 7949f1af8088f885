//! Candidate plan construction
//!
//! Turns a `ServiceDescriptor` into the ordered list of attempts the engine
//! will execute. Ordering rules:
//!
//! 1. No base origin → empty plan, no network I/O at all
//! 2. The root-presence endpoint is always attempt #1, probed without auth
//! 3. Remaining endpoints keep declaration order; for each one, token
//!    strategies (bearer / API key) come before basic, basic before none
//! 4. Strategies whose credential is not configured are skipped and recorded
//! 5. A mode declared twice (e.g. two basic credentials) gets an ordinal so
//!    each attempt keeps its own label
//!
//! The builder is deterministic: the same descriptor and the same variable
//! presence always produce the same plan.

use crate::core::probe::secret::EnvSource;
use crate::core::probe::types::{
    AuthStrategy, Candidate, EndpointSpec, ServiceDescriptor, SkippedCandidate,
};

#[derive(Debug, Clone, PartialEq)]
pub struct CandidatePlan {
    base_url: Option<String>,
    candidates: Vec<Candidate>,
    skipped: Vec<SkippedCandidate>,
}

impl CandidatePlan {
    pub fn build(descriptor: &ServiceDescriptor, env: &dyn EnvSource) -> Self {
        let base_url = match descriptor.base_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => url.to_string(),
            _ => {
                return Self {
                    base_url: None,
                    candidates: Vec::new(),
                    skipped: Vec::new(),
                }
            }
        };

        let root = descriptor
            .endpoints
            .iter()
            .find(|e| e.is_root())
            .cloned()
            .unwrap_or_else(|| EndpointSpec::root("/"));

        let mut candidates = vec![Candidate {
            sequence: 0,
            endpoint: root,
            auth: AuthStrategy::None,
            ordinal: 1,
        }];
        let mut skipped = Vec::new();

        // Stable sort keeps declaration order within a rank
        let mut strategies: Vec<&AuthStrategy> = descriptor.auth.iter().collect();
        strategies.sort_by_key(|s| s.mode().rank());

        // Ordinals depend on the descriptor only, so a label names the same
        // strategy whichever credentials happen to be present
        let ordinals: Vec<usize> = strategies
            .iter()
            .enumerate()
            .map(|(i, s)| 1 + strategies[..i].iter().filter(|p| p.mode() == s.mode()).count())
            .collect();

        for endpoint in descriptor.endpoints.iter().filter(|e| !e.is_root()) {
            for (strategy, &ordinal) in strategies.iter().zip(&ordinals) {
                if let Some(secret_ref) = strategy.secret_ref() {
                    let missing = secret_ref.missing(env);
                    if !missing.is_empty() {
                        skipped.push(SkippedCandidate {
                            endpoint: endpoint.path.clone(),
                            auth_mode: strategy.mode(),
                            missing,
                            ordinal,
                        });
                        continue;
                    }
                }
                candidates.push(Candidate {
                    sequence: candidates.len(),
                    endpoint: endpoint.clone(),
                    auth: (*strategy).clone(),
                    ordinal,
                });
            }
        }

        Self {
            base_url: Some(base_url),
            candidates,
            skipped,
        }
    }

    /// `false` when the base origin is missing and nothing will be attempted
    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn skipped(&self) -> &[SkippedCandidate] {
        &self.skipped
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}
