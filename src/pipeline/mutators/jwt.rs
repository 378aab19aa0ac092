use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use sha2::Sha256;

use crate::error::PipelineError;
use crate::pipeline::config::MechanismConfig;
use crate::pipeline::context::Context;
use crate::pipeline::keys::KeyMaterial;
use crate::pipeline::mutators::Mutator;
use crate::pipeline::subject::Subject;
use crate::pipeline::template::Template;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct JwtConfig {
    #[serde(default = "default_ttl")]
    ttl_secs: u64,
    #[serde(default)]
    issuer: Option<String>,
    #[serde(default)]
    claims: BTreeMap<String, Template>,
    #[serde(default = "default_header")]
    header: String,
    #[serde(default = "default_schema")]
    schema: String,
}

fn default_ttl() -> u64 {
    300
}

fn default_header() -> String {
    "Authorization".to_string()
}

fn default_schema() -> String {
    "Bearer".to_string()
}

/// Issues an HS256 token for the subject and passes it upstream.
#[derive(Debug)]
pub struct JwtMutator {
    conf: JwtConfig,
    config: MechanismConfig,
}

impl JwtMutator {
    pub fn new(config: &MechanismConfig) -> Result<Self, PipelineError> {
        let conf: JwtConfig = config.decode("jwt mutator")?;
        if conf.ttl_secs == 0 {
            return Err(PipelineError::Configuration(
                "jwt mutator ttl_secs must be greater than zero".into(),
            ));
        }
        Ok(Self {
            conf,
            config: config.clone(),
        })
    }

    fn claims(&self, sub: &Subject, now: u64) -> Result<Map<String, Value>, PipelineError> {
        let mut claims = Map::new();
        for (name, template) in &self.conf.claims {
            claims.insert(name.clone(), Value::String(template.render(sub)?));
        }

        claims.insert("sub".into(), json!(sub.id));
        claims.insert("iat".into(), json!(now));
        claims.insert("nbf".into(), json!(now));
        claims.insert("exp".into(), json!(now.saturating_add(self.conf.ttl_secs)));
        claims.insert("jti".into(), json!(uuid::Uuid::new_v4().to_string()));
        if let Some(issuer) = &self.conf.issuer {
            claims.insert("iss".into(), json!(issuer));
        }
        Ok(claims)
    }

    fn sign(&self, claims: &Map<String, Value>, key: &KeyMaterial) -> Result<String, PipelineError> {
        let header = json!({"alg": "HS256", "typ": "JWT", "kid": key.key_id()});
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header.to_string()),
            URL_SAFE_NO_PAD.encode(Value::Object(claims.clone()).to_string())
        );

        let mut mac = HmacSha256::new_from_slice(key.secret())
            .map_err(|e| PipelineError::Internal(format!("failed to initialize signer: {}", e)))?;
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{}.{}", signing_input, signature))
    }
}

#[async_trait]
impl Mutator for JwtMutator {
    async fn mutate(
        &self,
        ctx: &dyn Context,
        sub: &Subject,
        key: Option<&KeyMaterial>,
    ) -> Result<(), PipelineError> {
        tracing::debug!("Mutating using jwt mutator");

        let key = key.ok_or_else(|| {
            PipelineError::Internal("jwt mutator requires signing key material".into())
        })?;
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| PipelineError::Internal(format!("system clock error: {}", e)))?
            .as_secs();

        let token = self.sign(&self.claims(sub, now)?, key)?;
        ctx.add_upstream_header(&self.conf.header, &format!("{} {}", self.conf.schema, token));
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
