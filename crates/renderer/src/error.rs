//! Asset loading errors.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to import glTF {path}: {source}")]
    Gltf {
        path: PathBuf,
        #[source]
        source: gltf::Error,
    },
    #[error("{0} contains no triangle geometry")]
    NoGeometry(PathBuf),
    #[error("failed to decode image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("unsupported image format {format:?} in {path}")]
    UnsupportedPixels {
        path: PathBuf,
        format: gltf::image::Format,
    },
}
