

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use super::error::Result;


#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoachConfig {

    pub helix_host: String,
    pub helix_port: u16,
    pub max_retries: u32,


    pub s3_bucket: String,
    pub s3_region: String,
    pub s3_endpoint: Option<String>,


    pub blob_delete_concurrency: usize,
    pub retain_teacher_on_partial_failure: bool,


    pub otp_ttl_secs: u64,
    pub otp_capacity: usize,
}

impl CoachConfig {

    pub fn new(host: &str, port: u16) -> Self {
        Self {
            helix_host: host.to_string(),
            helix_port: port,
            max_retries: 3,

            s3_bucket: "coachhub-files".to_string(),
            s3_region: "ap-south-1".to_string(),
            s3_endpoint: None,

            blob_delete_concurrency: 4,
            retain_teacher_on_partial_failure: true,

            otp_ttl_secs: crate::DEFAULT_OTP_TTL,
            otp_capacity: crate::DEFAULT_OTP_CAPACITY,
        }
    }


    pub fn helix_url(&self) -> String {
        format!("http://{}:{}", self.helix_host, self.helix_port)
    }

    /// Never below one, so a misconfigured zero still makes progress.
    pub fn blob_concurrency(&self) -> usize {
        self.blob_delete_concurrency.max(1)
    }


    /// HelixDB endpoint from `HELIX_HOST`/`HELIX_PORT`; everything else at its default.
    pub fn from_env() -> Self {
        Self::new(
            &std::env::var("HELIX_HOST").unwrap_or_else(|_| "localhost".to_string()),
            std::env::var("HELIX_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(crate::DEFAULT_HELIX_PORT),
        )
    }

    /// Defaults, then `coachhub.toml` (optional), then `COACHHUB_*` variables.
    pub fn load() -> Result<Self> {
        Self::load_from("coachhub")
    }


    pub fn load_from(file_stem: &str) -> Result<Self> {
        let defaults = Self::from_env();

        let settings = Config::builder()
            .set_default("helix_host", defaults.helix_host.as_str())?
            .set_default("helix_port", i64::from(defaults.helix_port))?
            .set_default("max_retries", i64::from(defaults.max_retries))?
            .set_default("s3_bucket", defaults.s3_bucket.as_str())?
            .set_default("s3_region", defaults.s3_region.as_str())?
            .set_default("blob_delete_concurrency", defaults.blob_delete_concurrency as i64)?
            .set_default(
                "retain_teacher_on_partial_failure",
                defaults.retain_teacher_on_partial_failure,
            )?
            .set_default("otp_ttl_secs", defaults.otp_ttl_secs as i64)?
            .set_default("otp_capacity", defaults.otp_capacity as i64)?
            .add_source(File::with_name(file_stem).required(false))
            .add_source(Environment::with_prefix("COACHHUB").try_parsing(true))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self::new("localhost", crate::DEFAULT_HELIX_PORT)
    }
}
