use serde::{Deserialize, Serialize};

/// One labelled detection in 640x640 model-input pixel space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    #[serde(rename = "class")]
    pub class_name: String,
    pub confidence: f32,
    /// `[x1, y1, x2, y2]`, truncated toward zero
    #[serde(rename = "box")]
    pub bbox: [i32; 4],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub predictions: Vec<Prediction>,
    /// Base64 (standard alphabet, padded) JPEG of the annotated image
    pub image: String,
}
