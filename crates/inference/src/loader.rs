use crate::backend::{BackendOptions, InferenceBackend};
use crate::detector::{Detector, YoloDetector};
use crate::labels::{ClassNames, LabelError};
use crate::processing::post::PostProcessor;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// ONNX custom metadata key YOLO exporters write the class table to.
pub const NAMES_METADATA_KEY: &str = "names";

/// Animal categories a model can be requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Cat,
    Dog,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Cat, Category::Dog];

    /// Route and file stem form, e.g. `cat`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Cat => "cat",
            Category::Dog => "dog",
        }
    }

    /// Capitalized form used in log lines, e.g. `Cat`.
    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Cat => "Cat",
            Category::Dog => "Dog",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    /// Exact, case-sensitive match.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("{} is not a supported animal type", s))
    }
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Model file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to load model {}: {message}", path.display())]
    Invalid { path: PathBuf, message: String },

    #[error("No class names for model {}: no `names` metadata and no sidecar file", .0.display())]
    MissingLabels(PathBuf),

    #[error("Invalid class names for model {}", path.display())]
    Labels {
        path: PathBuf,
        #[source]
        source: LabelError,
    },
}

/// Resolves a category to a ready-to-run detector.
pub trait ModelLoader: Send + Sync {
    fn load(&self, category: Category) -> Result<Arc<dyn Detector>, LoadError>;
}

/// Reads `<model_dir>/<category>.onnx` from disk on every call.
pub struct FsModelLoader<B> {
    model_dir: PathBuf,
    options: BackendOptions,
    post: PostProcessor,
    _backend: PhantomData<fn() -> B>,
}

impl<B> FsModelLoader<B> {
    pub fn new(model_dir: impl Into<PathBuf>, options: BackendOptions, post: PostProcessor) -> Self {
        Self {
            model_dir: model_dir.into(),
            options,
            post,
            _backend: PhantomData,
        }
    }

    pub fn model_path(&self, category: Category) -> PathBuf {
        self.model_dir.join(format!("{}.onnx", category.as_str()))
    }

    pub fn names_path(&self, category: Category) -> PathBuf {
        self.model_dir.join(format!("{}.names", category.as_str()))
    }
}

impl<B: InferenceBackend + Send + 'static> FsModelLoader<B> {
    fn load_detector(&self, category: Category) -> Result<YoloDetector<B>, LoadError> {
        let path = self.model_path(category);
        if !path.is_file() {
            return Err(LoadError::NotFound(path));
        }

        let backend = B::load_model(&path, &self.options).map_err(|e| LoadError::Invalid {
            path: path.clone(),
            message: format!("{e:#}"),
        })?;

        let labels = self.resolve_labels(category, &path, &backend)?;
        tracing::debug!(category = %category, classes = labels.len(), "Resolved class names");

        Ok(YoloDetector::new(backend, labels, self.post.clone()))
    }

    /// Metadata first, then the sidecar file.
    fn resolve_labels(
        &self,
        category: Category,
        model_path: &Path,
        backend: &B,
    ) -> Result<ClassNames, LoadError> {
        let metadata = backend
            .metadata(NAMES_METADATA_KEY)
            .map_err(|e| LoadError::Invalid {
                path: model_path.to_path_buf(),
                message: format!("{e:#}"),
            })?;

        let labels = match metadata {
            Some(literal) => ClassNames::from_metadata(&literal),
            None => {
                let names_path = self.names_path(category);
                if !names_path.is_file() {
                    return Err(LoadError::MissingLabels(model_path.to_path_buf()));
                }
                ClassNames::from_file(&names_path)
            }
        };

        labels.map_err(|source| LoadError::Labels {
            path: model_path.to_path_buf(),
            source,
        })
    }
}

impl<B: InferenceBackend + Send + 'static> ModelLoader for FsModelLoader<B> {
    #[tracing::instrument(level = "debug", skip_all, fields(category = %category))]
    fn load(&self, category: Category) -> Result<Arc<dyn Detector>, LoadError> {
        match self.load_detector(category) {
            Ok(detector) => {
                tracing::info!("{} model loaded successfully", category.display_name());
                Ok(Arc::new(detector))
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load {} model", category.display_name());
                Err(e)
            }
        }
    }
}

/// Keeps one detector per category for the life of the process.
pub struct CachingModelLoader<L> {
    inner: L,
    cache: RwLock<HashMap<Category, Arc<dyn Detector>>>,
}

impl<L: ModelLoader> CachingModelLoader<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn cached(&self, category: Category) -> Option<Arc<dyn Detector>> {
        let cache = match self.cache.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        cache.get(&category).cloned()
    }
}

impl<L: ModelLoader> ModelLoader for CachingModelLoader<L> {
    fn load(&self, category: Category) -> Result<Arc<dyn Detector>, LoadError> {
        if let Some(detector) = self.cached(category) {
            return Ok(detector);
        }

        // Concurrent misses may both load; first insert wins
        let detector = self.inner.load(category)?;
        let mut cache = match self.cache.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Ok(Arc::clone(cache.entry(category).or_insert(detector)))
    }
}
