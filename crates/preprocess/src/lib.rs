pub mod channels;
pub mod config;
pub mod processor;
pub mod tensor;

pub use channels::{BgrImage, decode_rgb};
pub use config::INPUT_SIZE;
pub use processor::{PreProcessor, PreparedImage};
pub use tensor::to_input_tensor;
