//! Schema inference and the per-resource schema store.

mod inferencer;
mod store;

pub use inferencer::{InferenceConfig, TypeInferencer, DEFAULT_SAMPLE_LIMIT};
pub use store::SchemaStore;

pub(crate) use inferencer::{conforms, typed_value};
