//! Process-wide model handle

use crate::config::AppConfig;
use crate::models::loader::ModelLoader;
use crate::models::FraudModel;
use anyhow::Result;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::info;

/// Global model instance, loaded on first use and kept until exit
static MODEL: OnceCell<Arc<dyn FraudModel>> = OnceCell::new();

/// Get the shared model, loading it from `config` on first call.
///
/// Later calls return the already-loaded model and ignore `config`.
pub fn shared_model(config: &AppConfig) -> Result<Arc<dyn FraudModel>> {
    cached_or(|| {
        let loader = ModelLoader::with_threads(config.model.onnx_threads);
        Ok(Arc::new(loader.load(config)?))
    })
}

fn cached_or<F>(load: F) -> Result<Arc<dyn FraudModel>>
where
    F: FnOnce() -> Result<Arc<dyn FraudModel>>,
{
    MODEL
        .get_or_try_init(|| {
            let model = load()?;
            info!(model = %model.name(), "Model cached for process lifetime");
            Ok(model)
        })
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::stub::StubModel;

    // Single test touches the global so ordering between tests cannot matter
    #[test]
    fn test_first_model_wins() {
        // A failed load leaves the cache empty for the next caller
        assert!(cached_or(|| anyhow::bail!("artifact unavailable")).is_err());

        let first = cached_or(|| Ok(Arc::new(StubModel::new(&["a", "b"])))).unwrap();
        assert_eq!(first.feature_names(), ["a", "b"]);

        let mut config = AppConfig::default();
        config.model.path = "does/not/exist.onnx".to_string();

        // Cached handle is returned without touching the missing artifact
        let model = shared_model(&config).unwrap();
        assert_eq!(model.name(), "stub");
        assert!(Arc::ptr_eq(&first, &model));
    }
}
