use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use gateway::{AppState, Pipeline, PredictResponse, render::OverlayRenderer, router};
use image::{GenericImageView, Rgb, RgbImage};
use inference::{
    BackendOptions, Category, ClassNames, Detector, FsModelLoader, InferenceBackend,
    InferenceOutput, LoadError, ModelLoader, PostProcessor, RawDetection,
};
use ndarray::{Array, IxDyn};
use preprocess::PreProcessor;
use serde_json::Value;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tower::util::ServiceExt;

const BOUNDARY: &str = "detector-test-boundary";

/// Detector that returns a fixed set of detections and records input sizes
struct FakeDetector {
    detections: Vec<RawDetection>,
    labels: ClassNames,
    seen_sizes: Mutex<Vec<(u32, u32)>>,
}

impl Detector for FakeDetector {
    fn detect(&self, image: &RgbImage) -> anyhow::Result<Vec<RawDetection>> {
        self.seen_sizes.lock().unwrap().push(image.dimensions());
        Ok(self.detections.clone())
    }

    fn labels(&self) -> &ClassNames {
        &self.labels
    }
}

struct FakeLoader {
    detector: Arc<FakeDetector>,
    calls: AtomicUsize,
}

impl ModelLoader for FakeLoader {
    fn load(&self, _category: Category) -> Result<Arc<dyn Detector>, LoadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.detector.clone())
    }
}

fn fake_loader(detections: Vec<RawDetection>) -> Arc<FakeLoader> {
    let labels = ClassNames::new(HashMap::from([
        (0, "cat".to_string()),
        (1, "dog".to_string()),
    ]));
    Arc::new(FakeLoader {
        detector: Arc::new(FakeDetector {
            detections,
            labels,
            seen_sizes: Mutex::new(Vec::new()),
        }),
        calls: AtomicUsize::new(0),
    })
}

fn two_detections() -> Vec<RawDetection> {
    vec![
        RawDetection {
            bbox: [100.7, 120.2, 340.9, 400.5],
            confidence: 0.91,
            class_id: 0,
        },
        RawDetection {
            bbox: [0.0, 300.0, 640.0, 640.0],
            confidence: 0.42,
            class_id: 1,
        },
    ]
}

fn app(loader: Arc<dyn ModelLoader>) -> Router {
    let pipeline = Pipeline::new(PreProcessor::default(), OverlayRenderer::new().unwrap());
    router(AppState::new(loader, pipeline), 16 * 1024 * 1024)
}

/// Encode a gradient test image in the given format
fn test_image(width: u32, height: u32, format: image::ImageFormat) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), format).unwrap();
    bytes
}

struct Part<'a> {
    name: &'a str,
    filename: Option<&'a str>,
    data: &'a [u8],
}

fn file_part(data: &[u8]) -> Part<'_> {
    Part {
        name: "file",
        filename: Some("upload.png"),
        data,
    }
}

fn multipart_body(parts: &[Part]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        let disposition = match part.filename {
            Some(filename) => format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                part.name, filename
            ),
            None => format!("Content-Disposition: form-data; name=\"{}\"\r\n", part.name),
        };
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn predict_request(animal_type: &str, parts: &[Part]) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(format!("/predict/{}", animal_type))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// Test: happy path returns labelled, truncated boxes and a 640x640 JPEG
#[tokio::test]
async fn test_predict_returns_predictions_and_annotated_image() {
    let loader = fake_loader(two_detections());
    let upload = test_image(320, 240, image::ImageFormat::Png);

    let (status, body) = send(app(loader.clone()), predict_request("cat", &[file_part(&upload)])).await;

    assert_eq!(status, StatusCode::OK, "body: {}", body);
    let response: PredictResponse = serde_json::from_value(body.clone()).unwrap();

    assert_eq!(response.predictions.len(), 2);
    assert_eq!(body["predictions"][0]["class"], "cat");
    assert_eq!(body["predictions"][0]["box"], serde_json::json!([100, 120, 340, 400]));
    assert_eq!(body["predictions"][1]["class"], "dog");

    for prediction in &response.predictions {
        assert!((0.0..=1.0).contains(&prediction.confidence));
        for v in prediction.bbox {
            assert!((0..=640).contains(&v), "Coordinate {} outside 640x640", v);
        }
    }

    let jpeg = STANDARD.decode(&response.image).unwrap();
    let decoded = image::load_from_memory_with_format(&jpeg, image::ImageFormat::Jpeg).unwrap();
    assert_eq!(decoded.dimensions(), (640, 640));

    let seen = loader.detector.seen_sizes.lock().unwrap().clone();
    assert_eq!(seen, vec![(640, 640)], "Model sees the resized image");
}

/// Test: rectangle colour in the returned image is green
#[tokio::test]
async fn test_overlay_is_green() {
    let loader = fake_loader(vec![RawDetection {
        bbox: [100.0, 100.0, 500.0, 500.0],
        confidence: 0.8,
        class_id: 1,
    }]);
    let mut upload = Vec::new();
    RgbImage::from_pixel(640, 640, Rgb([0, 0, 0]))
        .write_to(&mut Cursor::new(&mut upload), image::ImageFormat::Png)
        .unwrap();

    let (status, body) = send(app(loader), predict_request("dog", &[file_part(&upload)])).await;

    assert_eq!(status, StatusCode::OK);
    let jpeg = STANDARD.decode(body["image"].as_str().unwrap()).unwrap();
    let decoded = image::load_from_memory(&jpeg).unwrap().to_rgb8();
    let edge = decoded.get_pixel(100, 300).0;
    assert!(
        edge[1] > edge[0].saturating_add(60) && edge[1] > edge[2].saturating_add(60),
        "Box edge should be green, got {:?}",
        edge
    );
}

/// Test: unsupported category is rejected before any model is loaded
#[tokio::test]
async fn test_invalid_animal_type() {
    let loader = fake_loader(two_detections());
    let upload = test_image(64, 64, image::ImageFormat::Png);

    let (status, body) = send(app(loader.clone()), predict_request("bird", &[file_part(&upload)])).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid animal type");
    assert_eq!(loader.calls.load(Ordering::SeqCst), 0, "Loader must not be called");
}

/// Test: category matching is case-sensitive
#[tokio::test]
async fn test_capitalized_animal_type_is_invalid() {
    let loader = fake_loader(two_detections());

    let (status, body) = send(app(loader), predict_request("Cat", &[])).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid animal type");
}

#[tokio::test]
async fn test_missing_file_field() {
    let loader = fake_loader(two_detections());
    let upload = test_image(64, 64, image::ImageFormat::Png);
    let parts = [Part {
        name: "image",
        filename: Some("upload.png"),
        data: &upload,
    }];

    let (status, body) = send(app(loader.clone()), predict_request("cat", &parts)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file part");
    assert_eq!(loader.calls.load(Ordering::SeqCst), 0);
}

/// Test: a plain form field named `file` is not an upload
#[tokio::test]
async fn test_file_field_without_filename() {
    let loader = fake_loader(two_detections());
    let parts = [Part {
        name: "file",
        filename: None,
        data: b"not a file",
    }];

    let (status, body) = send(app(loader), predict_request("cat", &parts)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file part");
}

#[tokio::test]
async fn test_non_multipart_body() {
    let loader = fake_loader(two_detections());
    let request = Request::builder()
        .method(Method::POST)
        .uri("/predict/dog")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"file": "cat.png"}"#))
        .unwrap();

    let (status, body) = send(app(loader), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file part");
}

#[tokio::test]
async fn test_empty_filename() {
    let loader = fake_loader(two_detections());
    let parts = [Part {
        name: "file",
        filename: Some(""),
        data: b"",
    }];

    let (status, body) = send(app(loader.clone()), predict_request("cat", &parts)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No selected file");
    assert_eq!(loader.calls.load(Ordering::SeqCst), 0);
}

/// Test: undecodable upload surfaces as a server error with a message
#[tokio::test]
async fn test_corrupt_image() {
    let loader = fake_loader(two_detections());
    let garbage = b"definitely not an image".to_vec();

    let (status, body) = send(app(loader), predict_request("cat", &[file_part(&garbage)])).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body["error"].as_str().unwrap().is_empty());
}

/// Test: identical requests produce identical predictions
#[tokio::test]
async fn test_repeated_request_is_deterministic() {
    let loader = fake_loader(two_detections());
    let upload = test_image(500, 375, image::ImageFormat::Jpeg);
    let router = app(loader.clone());

    let (_, first) = send(router.clone(), predict_request("dog", &[file_part(&upload)])).await;
    let (_, second) = send(router, predict_request("dog", &[file_part(&upload)])).await;

    assert_eq!(first["predictions"], second["predictions"]);
    assert_eq!(first["image"], second["image"]);
    assert_eq!(loader.calls.load(Ordering::SeqCst), 2, "Model is loaded per request");
}

/// Test: a label-less class index is an inference error
#[tokio::test]
async fn test_unknown_class_index() {
    let loader = fake_loader(vec![RawDetection {
        bbox: [1.0, 1.0, 10.0, 10.0],
        confidence: 0.5,
        class_id: 12,
    }]);
    let upload = test_image(64, 64, image::ImageFormat::Png);

    let (status, body) = send(app(loader), predict_request("cat", &[file_part(&upload)])).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("12"));
}

/// Backend that is never expected to get past the file check
struct UnreachableBackend;

impl InferenceBackend for UnreachableBackend {
    fn load_model(_path: &Path, _options: &BackendOptions) -> anyhow::Result<Self> {
        anyhow::bail!("model parsing should not be reached")
    }

    fn infer(&mut self, _images: &Array<f32, IxDyn>) -> anyhow::Result<InferenceOutput> {
        anyhow::bail!("inference should not be reached")
    }
}

/// Test: missing model artifact names the expected path
#[tokio::test]
async fn test_missing_model_artifact() {
    let model_dir = tempfile::TempDir::new().unwrap();
    let loader = FsModelLoader::<UnreachableBackend>::new(
        model_dir.path(),
        BackendOptions::default(),
        PostProcessor::new(0.25, 0.7, 300, (640, 640)),
    );
    let upload = test_image(64, 64, image::ImageFormat::Png);

    let (status, body) = send(app(Arc::new(loader)), predict_request("dog", &[file_part(&upload)])).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let error = body["error"].as_str().unwrap();
    assert!(error.contains("dog.onnx"), "Error should name the path, got: {}", error);
}

/// Test: uploads above axum's 2 MiB default are accepted
#[tokio::test]
async fn test_large_upload_is_accepted() {
    let loader = fake_loader(Vec::new());
    // Noise compresses poorly, keeping the PNG above 2 MiB
    let mut state = 0x2545_F491u32;
    let noisy = RgbImage::from_fn(1200, 900, |_, _| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let [r, g, b, _] = state.to_le_bytes();
        Rgb([r, g, b])
    });
    let mut upload = Vec::new();
    noisy
        .write_to(&mut Cursor::new(&mut upload), image::ImageFormat::Png)
        .unwrap();
    assert!(upload.len() > 2 * 1024 * 1024);

    let (status, body) = send(app(loader), predict_request("cat", &[file_part(&upload)])).await;

    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert_eq!(body["predictions"], serde_json::json!([]));
}

#[tokio::test]
async fn test_health() {
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(app(fake_loader(Vec::new())), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({ "status": "ok" }));
}

/// Test: any origin is allowed
#[tokio::test]
async fn test_cors_allows_any_origin() {
    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "http://example.com")
        .body(Body::empty())
        .unwrap();

    let response = app(fake_loader(Vec::new())).oneshot(request).await.unwrap();

    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );
}
