use common::{Environment, env_or};
use inference::InferenceConfig;

pub const ADDR_VAR: &str = "DETECTOR_ADDR";
pub const MODEL_CACHE_VAR: &str = "DETECTOR_MODEL_CACHE";
pub const BODY_LIMIT_VAR: &str = "DETECTOR_BODY_LIMIT_BYTES";

const DEFAULT_ADDR: &str = "0.0.0.0:5000";
/// 16 MiB; axum's own default of 2 MiB is too small for camera photos
const DEFAULT_BODY_LIMIT_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub environment: Environment,
    pub addr: String,
    pub body_limit_bytes: usize,
    /// Keep one model per category in memory instead of reloading per request
    pub model_cache: bool,
    pub inference: InferenceConfig,
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        Self {
            environment: Environment::from_env(),
            addr: env_or(ADDR_VAR, DEFAULT_ADDR.to_string()),
            body_limit_bytes: env_or(BODY_LIMIT_VAR, DEFAULT_BODY_LIMIT_BYTES),
            model_cache: env_or(MODEL_CACHE_VAR, false),
            inference: InferenceConfig::from_env(),
        }
    }
}
