//! Utility functions for the rectification pipeline.
//!
//! This module provides image I/O helpers, tensor shape helpers and logging
//! setup.

pub mod image;
pub mod tensor;

pub use self::image::{JPEG_QUALITY, dynamic_to_rgb, encode_jpeg, load_image, save_jpeg};
pub use tensor::{argmax, flatten_to_2d, softmax};

/// Initializes the tracing subscriber for logging.
///
/// This function sets up the tracing subscriber with environment filter and formatting layer.
/// It's typically called at the start of an application to enable logging.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();
}
