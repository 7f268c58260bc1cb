//! Declarative pod volume specifications, and the code that turns them into
//! Kubernetes `Volume` objects.

#![warn(missing_docs)]

pub use k8s_openapi;
pub use serde_json;
pub use serde_yaml;

pub mod config;
pub mod errors;
pub mod tracing_support;
pub mod volumes;

/// Common imports used by many modules.
pub mod prelude {
    pub use anyhow::{format_err, Context};
    pub use serde::{Deserialize, Serialize};
    pub use std::{
        fmt,
        path::{Path, PathBuf},
    };
    pub use tracing::{debug, error, info, trace, warn};

    pub use super::config::VolumesConfig;
    pub use super::errors::VolumeError;
    pub use super::volumes::{BuildVolume, PodVolume, SecretVolume, VolumeKind};
    pub use super::{Error, Result};
}

/// Error type for this crate's functions.
pub use anyhow::Error;

/// Result type for this crate's functions.
pub use anyhow::Result;

