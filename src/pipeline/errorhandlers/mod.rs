//! Error handlers.
//!
//! A handler inspects the error that ended a pipeline and either declines
//! (`Ok(false)`), handles it by recording the error the boundary must render
//! via [`Context::set_pipeline_error`] (`Ok(true)`), or fails while acting
//! (`Err`), which aborts the chain.

mod composite;
mod default;
mod redirect;
mod www_authenticate;

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::PipelineError;
use crate::pipeline::config::MechanismConfig;
use crate::pipeline::context::Context;

pub use composite::CompositeErrorHandler;
pub use default::DefaultErrorHandler;
pub use redirect::RedirectErrorHandler;
pub use www_authenticate::WwwAuthenticateErrorHandler;

#[async_trait]
pub trait ErrorHandler: Send + Sync + Debug {
    async fn execute(&self, ctx: &dyn Context, cause: &PipelineError) -> Result<bool, PipelineError>;

    fn with_config(
        self: Arc<Self>,
        config: &MechanismConfig,
    ) -> Result<Arc<dyn ErrorHandler>, PipelineError>;
}
