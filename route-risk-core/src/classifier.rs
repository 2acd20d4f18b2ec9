use std::{fmt::Debug, path::Path, sync::Arc};

use crate::features::FeatureVector;

pub mod tree;

pub use tree::TreeEnsemble;

/// A trained severity model.
///
/// Implementations are loaded once and shared read-only across requests.
pub trait Classifier: Send + Sync + Debug {
    /// Predict the severity class for a schema-aligned feature vector.
    fn predict(&self, features: &FeatureVector) -> anyhow::Result<i64>;
}

/// Load the default classifier implementation from a model artifact.
pub fn load_classifier(path: &Path) -> anyhow::Result<Arc<dyn Classifier>> {
    let model = TreeEnsemble::load(path)?;
    Ok(Arc::new(model))
}
