//! Warehouse connection profiles.
//!
//! Connection parameters are resolved from a dbt-style `profiles.yml`,
//! addressed by profile name and target:
//!
//! ```yaml
//! marketflow:
//!   target: dev
//!   outputs:
//!     dev:
//!       database: data/warehouse.db
//!       schema: raw
//! ```
//!
//! The loader only ever sees the resolved [`WarehouseParams`]; it never parses
//! profile files itself.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors resolving a connection profile. Fatal at startup.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("failed to read profiles file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse profiles file {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },

    #[error("profile '{0}' not found in profiles file")]
    ProfileNotFound(String),

    #[error("profile '{profile}' has no output named '{target}'")]
    TargetNotFound { profile: String, target: String },
}

/// Resolved warehouse connection parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct WarehouseParams {
    /// Path to the warehouse database file.
    pub database: PathBuf,
    /// Schema prefix for the raw layer (e.g. `raw`).
    pub schema: String,
}

#[derive(Debug, Deserialize)]
struct Profile {
    target: String,
    outputs: HashMap<String, WarehouseParams>,
}

/// Resolve connection parameters for `profile_name` from a profiles file.
pub fn read_profiles(path: &Path, profile_name: &str) -> Result<WarehouseParams, ProfileError> {
    let content = std::fs::read_to_string(path).map_err(|source| ProfileError::Read {
        path: path.display().to_string(),
        source,
    })?;
    resolve(&content, profile_name).map_err(|e| match e {
        ProfileError::Parse { source, .. } => ProfileError::Parse {
            path: path.display().to_string(),
            source,
        },
        other => other,
    })
}

fn resolve(content: &str, profile_name: &str) -> Result<WarehouseParams, ProfileError> {
    let profiles: HashMap<String, Profile> =
        serde_yaml::from_str(content).map_err(|source| ProfileError::Parse {
            path: String::new(),
            source,
        })?;

    let profile = profiles
        .get(profile_name)
        .ok_or_else(|| ProfileError::ProfileNotFound(profile_name.to_string()))?;

    profile
        .outputs
        .get(&profile.target)
        .cloned()
        .ok_or_else(|| ProfileError::TargetNotFound {
            profile: profile_name.to_string(),
            target: profile.target.clone(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILES: &str = r#"
marketflow:
  target: dev
  outputs:
    dev:
      database: data/warehouse.db
      schema: raw
    prod:
      database: /var/lib/marketflow/warehouse.db
      schema: raw
"#;

    #[test]
    fn resolves_default_target() {
        let params = resolve(PROFILES, "marketflow").unwrap();
        assert_eq!(params.database, PathBuf::from("data/warehouse.db"));
        assert_eq!(params.schema, "raw");
    }

    #[test]
    fn unknown_profile_is_an_error() {
        let err = resolve(PROFILES, "nope").unwrap_err();
        assert!(matches!(err, ProfileError::ProfileNotFound(_)));
    }

    #[test]
    fn missing_target_is_an_error() {
        let content = r#"
marketflow:
  target: staging
  outputs:
    dev:
      database: data/warehouse.db
      schema: raw
"#;
        let err = resolve(content, "marketflow").unwrap_err();
        assert!(matches!(err, ProfileError::TargetNotFound { .. }));
    }
}
