use crate::error::PipelineError;
use crate::pipeline::authenticators::extractors::{AuthData, ExtractStrategy};
use crate::pipeline::context::Context;

/// Tries each strategy in order; the first one that finds a credential wins.
#[derive(Debug)]
pub struct CompositeExtractStrategy {
    strategies: Vec<Box<dyn ExtractStrategy>>,
}

impl CompositeExtractStrategy {
    pub fn new(strategies: Vec<Box<dyn ExtractStrategy>>) -> Result<Self, PipelineError> {
        if strategies.is_empty() {
            return Err(PipelineError::Configuration(
                "at least one authentication data source is required".into(),
            ));
        }
        Ok(Self { strategies })
    }
}

impl ExtractStrategy for CompositeExtractStrategy {
    fn get_auth_data(&self, ctx: &dyn Context) -> Result<AuthData, PipelineError> {
        let mut last_err = None;
        for strategy in &self.strategies {
            match strategy.get_auth_data(ctx) {
                Ok(data) => return Ok(data),
                Err(e) => {
                    tracing::trace!(strategy = ?strategy, error = %e, "Extraction strategy found nothing");
                    last_err = Some(e);
                }
            }
        }
        // new() guarantees at least one strategy ran
        Err(last_err.unwrap_or_else(|| PipelineError::Argument("no authentication data present".into())))
    }
}
