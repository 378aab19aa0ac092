use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::PipelineError;
use crate::pipeline::config::MechanismConfig;
use crate::pipeline::context::Context;
use crate::pipeline::keys::KeyMaterial;
use crate::pipeline::mutators::Mutator;
use crate::pipeline::subject::Subject;
use crate::pipeline::template::Template;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CookieConfig {
    cookies: BTreeMap<String, Template>,
}

/// Whether `b` may appear unquoted in a cookie value (RFC 6265 cookie-octet).
pub(crate) fn is_cookie_octet(b: u8) -> bool {
    matches!(b, 0x21 | 0x23..=0x2B | 0x2D..=0x3A | 0x3C..=0x5B | 0x5D..=0x7E)
}

/// Percent-encode every byte that is not a cookie-octet, and `%` itself.
pub(crate) fn encode_cookie_value(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for b in value.bytes() {
        if is_cookie_octet(b) && b != b'%' {
            encoded.push(b as char);
        } else {
            encoded.push_str(&format!("%{:02X}", b));
        }
    }
    encoded
}

/// Sets templated cookies on the response.
///
/// Cookies are rendered in name order. The first render failure aborts;
/// cookies written before it stay written. Rendered values are
/// percent-encoded so attributes cannot leak into the cookie.
#[derive(Debug)]
pub struct CookieMutator {
    cookies: BTreeMap<String, Template>,
    config: MechanismConfig,
}

impl CookieMutator {
    pub fn new(config: &MechanismConfig) -> Result<Self, PipelineError> {
        let conf: CookieConfig = config.decode("cookie mutator")?;
        if conf.cookies.is_empty() {
            return Err(PipelineError::Configuration(
                "cookie mutator requires at least one cookie".into(),
            ));
        }
        if let Some(name) = conf
            .cookies
            .keys()
            .find(|name| name.is_empty() || name.contains(|c: char| c == '=' || c == ';' || c.is_whitespace()))
        {
            return Err(PipelineError::Configuration(format!(
                "invalid cookie name '{}'",
                name
            )));
        }

        Ok(Self {
            cookies: conf.cookies,
            config: config.clone(),
        })
    }
}

#[async_trait]
impl Mutator for CookieMutator {
    async fn mutate(
        &self,
        ctx: &dyn Context,
        sub: &Subject,
        _key: Option<&KeyMaterial>,
    ) -> Result<(), PipelineError> {
        tracing::debug!("Mutating using cookie mutator");

        for (name, template) in &self.cookies {
            let value = encode_cookie_value(&template.render(sub)?);
            ctx.add_response_cookie(name, &value);
        }
        Ok(())
    }

    fn with_config(
        self: Arc<Self>,
        config: &MechanismConfig,
    ) -> Result<Arc<dyn Mutator>, PipelineError> {
        if config.is_empty() {
            return Ok(self);
        }
        Ok(Arc::new(Self::new(&self.config.merged(config))?))
    }
}
