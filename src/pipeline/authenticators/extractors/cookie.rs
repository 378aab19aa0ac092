use crate::error::PipelineError;
use crate::pipeline::authenticators::extractors::{AuthData, AuthDataSource, ExtractStrategy};
use crate::pipeline::context::Context;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieValueExtractStrategy {
    pub name: String,
}

impl ExtractStrategy for CookieValueExtractStrategy {
    fn get_auth_data(&self, ctx: &dyn Context) -> Result<AuthData, PipelineError> {
        let value = ctx.request_cookie(&self.name).ok_or_else(|| {
            PipelineError::Argument(format!("no '{}' cookie present", self.name))
        })?;

        Ok(AuthData::new(
            AuthDataSource::Cookie(self.name.clone()),
            value.clone(),
            value.trim(),
        ))
    }
}
