//! Features Module - feature layout and vectors
//!
//! The layout is the contract between the dataset, the scaler and the
//! classifier. Nothing else in the crate hard-codes feature positions.

pub mod layout;
pub mod vector;

pub use layout::{
    FEATURE_COUNT, FEATURE_LAYOUT, FEATURE_VERSION, OCCUPANCY_FEATURE,
    LayoutInfo, LayoutMismatchError, feature_index, layout_hash,
};
pub use vector::{FeatureVector, FeatureVectorBuilder, ShapeMismatch};
