use anyhow::Result;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct TokenMetrics {
    registry: Registry,
    issuance: IntCounterVec,
    verifications: IntCounterVec,
}

impl TokenMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let issuance = IntCounterVec::new(
            Opts::new(
                "token_issuance_total",
                "Count of sign-in callbacks grouped by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(issuance.clone()))?;

        let verifications = IntCounterVec::new(
            Opts::new(
                "token_verifications_total",
                "Count of token verifications grouped by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(verifications.clone()))?;

        Ok(Self {
            registry,
            issuance,
            verifications,
        })
    }

    pub fn issuance(&self, outcome: &str) {
        self.issuance.with_label_values(&[outcome]).inc();
    }

    pub fn verification(&self, outcome: &str) {
        self.verifications.with_label_values(&[outcome]).inc();
    }

    /// Current counter values in the prometheus text exposition format.
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
