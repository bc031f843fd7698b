pub mod config;
pub mod encode;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod render;
pub mod response;
pub mod server;
pub mod state;

pub use config::GatewayConfig;
pub use error::ApiError;
pub use pipeline::Pipeline;
pub use response::{PredictResponse, Prediction};
pub use server::{router, run_server};
pub use state::AppState;
