use crate::error::PipelineError;
use crate::pipeline::authenticators::extractors::{AuthData, AuthDataSource, ExtractStrategy};
use crate::pipeline::context::Context;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParameterExtractStrategy {
    pub name: String,
}

impl ExtractStrategy for QueryParameterExtractStrategy {
    fn get_auth_data(&self, ctx: &dyn Context) -> Result<AuthData, PipelineError> {
        let value = ctx.request_query_parameter(&self.name).ok_or_else(|| {
            PipelineError::Argument(format!("no '{}' query parameter present", self.name))
        })?;

        Ok(AuthData::new(
            AuthDataSource::QueryParameter(self.name.clone()),
            value.clone(),
            value.trim(),
        ))
    }
}
