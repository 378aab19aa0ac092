use crate::error::PipelineError;
use crate::pipeline::authenticators::extractors::{AuthData, AuthDataSource, ExtractStrategy};
use crate::pipeline::context::Context;

/// Reads the credential from a request header, optionally requiring a schema
/// token such as `Bearer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderValueExtractStrategy {
    pub name: String,
    pub schema: Option<String>,
}

impl ExtractStrategy for HeaderValueExtractStrategy {
    fn get_auth_data(&self, ctx: &dyn Context) -> Result<AuthData, PipelineError> {
        let raw = ctx.request_header(&self.name).ok_or_else(|| {
            PipelineError::Argument(format!("no '{}' header present", self.name))
        })?;

        let value = match self.schema.as_deref().filter(|s| !s.is_empty()) {
            Some(schema) => raw
                .strip_prefix(schema)
                .and_then(|rest| rest.strip_prefix(' '))
                .ok_or_else(|| {
                    PipelineError::Argument(format!(
                        "'{}' header present, but without required '{}' schema",
                        self.name, schema
                    ))
                })?
                .trim()
                .to_string(),
            None => raw.trim().to_string(),
        };

        Ok(AuthData::new(AuthDataSource::Header(self.name.clone()), raw, value))
    }
}
