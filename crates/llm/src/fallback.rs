//! Fallback chain over multiple LLM providers
//!
//! Tries providers in configured order and moves on when one fails
//! persistently. Each provider carries a circuit breaker: after a run of
//! consecutive failures the provider is skipped until a cooldown passes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use omnilex_config::constants::llm;

use crate::backend::{GenerationRequest, LlmBackend};
use crate::LlmError;

/// Per-provider circuit breaker
pub struct CircuitBreaker {
    failure_threshold: u32,
    cooldown: Duration,
    state: Mutex<BreakerState>,
}

#[derive(Default)]
struct BreakerState {
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            failure_threshold,
            cooldown,
            state: Mutex::new(BreakerState::default()),
        }
    }

    /// Whether a request may pass. An open breaker lets one probe through
    /// after the cooldown elapses.
    pub fn allow(&self) -> bool {
        let mut state = self.state.lock();
        match state.opened_at {
            None => true,
            Some(opened) => {
                if opened.elapsed() >= self.cooldown {
                    // Half-open: allow a probe, keep the failure count
                    state.opened_at = None;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut state = self.state.lock();
        state.consecutive_failures = 0;
        state.opened_at = None;
    }

    pub fn record_failure(&self) {
        let mut state = self.state.lock();
        state.consecutive_failures += 1;
        if state.consecutive_failures >= self.failure_threshold {
            state.opened_at = Some(Instant::now());
        }
    }

    pub fn is_open(&self) -> bool {
        let state = self.state.lock();
        matches!(state.opened_at, Some(opened) if opened.elapsed() < self.cooldown)
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(
            llm::CIRCUIT_FAILURE_THRESHOLD,
            Duration::from_secs(llm::CIRCUIT_COOLDOWN_SECS),
        )
    }
}

struct Provider {
    name: String,
    backend: Arc<dyn LlmBackend>,
    breaker: CircuitBreaker,
}

/// Ordered chain of LLM providers with failover
pub struct FallbackChain {
    providers: Vec<Provider>,
}

impl FallbackChain {
    /// Build a chain from (name, backend) pairs in priority order.
    pub fn new(providers: Vec<(String, Arc<dyn LlmBackend>)>) -> Result<Self, LlmError> {
        if providers.is_empty() {
            return Err(LlmError::Configuration(
                "fallback chain needs at least one provider".to_string(),
            ));
        }
        tracing::info!(
            count = providers.len(),
            names = ?providers.iter().map(|(n, _)| n.clone()).collect::<Vec<_>>(),
            "Fallback chain created"
        );
        Ok(Self {
            providers: providers
                .into_iter()
                .map(|(name, backend)| Provider {
                    name,
                    backend,
                    breaker: CircuitBreaker::default(),
                })
                .collect(),
        })
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name.as_str()).collect()
    }
}

#[async_trait]
impl LlmBackend for FallbackChain {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        let mut errors = Vec::new();

        for provider in &self.providers {
            if !provider.breaker.allow() {
                tracing::debug!(provider = %provider.name, "Circuit open, skipping provider");
                continue;
            }

            match provider.backend.generate(request).await {
                Ok(text) => {
                    provider.breaker.record_success();
                    return Ok(text);
                }
                Err(e) => {
                    provider.breaker.record_failure();
                    tracing::warn!(provider = %provider.name, error = %e,
                        "Provider failed, trying next in chain");
                    errors.push(format!("{}: {}", provider.name, e));
                }
            }
        }

        Err(LlmError::AllProvidersFailed(errors.join("; ")))
    }

    async fn generate_stream(
        &self,
        request: &GenerationRequest,
        tx: mpsc::Sender<String>,
    ) -> Result<(), LlmError> {
        let mut errors = Vec::new();

        for provider in &self.providers {
            if !provider.breaker.allow() {
                continue;
            }

            match provider.backend.generate_stream(request, tx.clone()).await {
                Ok(()) => {
                    provider.breaker.record_success();
                    return Ok(());
                }
                Err(e) => {
                    provider.breaker.record_failure();
                    tracing::warn!(provider = %provider.name, error = %e,
                        "Provider streaming failed, trying next in chain");
                    errors.push(format!("{}: {}", provider.name, e));
                }
            }
        }

        Err(LlmError::AllProvidersFailed(errors.join("; ")))
    }

    fn provider_name(&self) -> &str {
        self.providers
            .first()
            .map(|p| p.name.as_str())
            .unwrap_or("fallback")
    }

    fn model_name(&self) -> &str {
        self.providers
            .first()
            .map(|p| p.backend.model_name())
            .unwrap_or("unknown")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyBackend {
        name: String,
        fail_first: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl LlmBackend for FlakyBackend {
        async fn generate(&self, _request: &GenerationRequest) -> Result<String, LlmError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                Err(LlmError::Network("boom".to_string()))
            } else {
                Ok(format!("ok from {}", self.name))
            }
        }

        async fn generate_stream(
            &self,
            request: &GenerationRequest,
            tx: mpsc::Sender<String>,
        ) -> Result<(), LlmError> {
            let text = self.generate(request).await?;
            let _ = tx.send(text).await;
            Ok(())
        }

        fn provider_name(&self) -> &str {
            &self.name
        }

        fn model_name(&self) -> &str {
            "flaky"
        }
    }

    fn flaky(name: &str, fail_first: u32) -> Arc<dyn LlmBackend> {
        Arc::new(FlakyBackend {
            name: name.to_string(),
            fail_first,
            calls: AtomicU32::new(0),
        })
    }

    #[tokio::test]
    async fn test_chain_falls_through_to_working_provider() {
        let chain = FallbackChain::new(vec![
            ("broken".to_string(), flaky("broken", u32::MAX)),
            ("healthy".to_string(), flaky("healthy", 0)),
        ])
        .unwrap();

        let result = chain
            .generate(&GenerationRequest::new("halo"))
            .await
            .unwrap();
        assert_eq!(result, "ok from healthy");
    }

    #[tokio::test]
    async fn test_chain_all_failed() {
        let chain =
            FallbackChain::new(vec![("broken".to_string(), flaky("broken", u32::MAX))]).unwrap();
        let err = chain.generate(&GenerationRequest::new("halo")).await;
        assert!(matches!(err, Err(LlmError::AllProvidersFailed(_))));
    }

    #[tokio::test]
    async fn test_empty_chain_rejected() {
        assert!(FallbackChain::new(vec![]).is_err());
    }

    #[test]
    fn test_circuit_breaker_opens_and_cools_down() {
        let breaker = CircuitBreaker::new(2, Duration::from_millis(20));
        assert!(breaker.allow());

        breaker.record_failure();
        assert!(breaker.allow());
        breaker.record_failure();
        assert!(breaker.is_open());
        assert!(!breaker.allow());

        std::thread::sleep(Duration::from_millis(25));
        // Half-open probe allowed after cooldown
        assert!(breaker.allow());
        breaker.record_success();
        assert!(!breaker.is_open());
    }
}
