//! Loading and saving volume configuration.
//!
//! A configuration document looks like:
//!
//! ```yaml
//! volumes:
//!   - kind: secretVolume
//!     mountPath: /etc/secret
//!     secretName: db-creds
//!     defaultMode: "0400"
//!     subPath: password
//! ```
//!
//! JSON works too, because YAML is a superset of JSON.

use std::fs::read_to_string;

use crate::prelude::*;

/// A set of configured volumes, in the order the user listed them.
///
/// Always construct this using [`VolumesConfig::from_str`] or
/// [`VolumesConfig::load`], which normalize the volumes after parsing.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VolumesConfig {
    /// Our volumes.
    #[serde(default)]
    pub volumes: Vec<PodVolume>,
}

impl VolumesConfig {
    /// Parse a YAML or JSON configuration document.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(config: &str) -> Result<VolumesConfig> {
        let mut parsed: VolumesConfig = serde_yaml::from_str(config)
            .context("could not parse volume configuration")?;
        parsed.normalize();
        Ok(parsed)
    }

    /// Load a configuration document from `path`.
    pub fn load(path: &Path) -> Result<VolumesConfig> {
        debug!("loading volume configuration from {}", path.display());
        let config = read_to_string(path)
            .with_context(|| format!("could not read {}", path.display()))?;
        Self::from_str(&config)
            .with_context(|| format!("could not load {}", path.display()))
    }

    /// Serialize this configuration as YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("could not serialize volume configuration")
    }

    /// Restore any invariants which don't hold for freshly-parsed data.
    fn normalize(&mut self) {
        for volume in &mut self.volumes {
            volume.normalize();
        }
        trace!("normalized {} volumes", self.volumes.len());
    }
}

#[test]
fn parse_example_config() {
    let yaml = include_str!("example_volumes.yml");
    let config = VolumesConfig::from_str(yaml).expect("parse error");
    assert_eq!(config.volumes.len(), 3);

    let PodVolume::Secret(first) = &config.volumes[0];
    assert_eq!(first.mount_path(), "/etc/secret");
    assert_eq!(first.secret_name(), "db-creds");
    assert_eq!(first.default_mode(), None);
    assert_eq!(first.sub_path(), None);
    assert_eq!(first.optional(), None);

    let PodVolume::Secret(second) = &config.volumes[1];
    assert_eq!(second.default_mode(), Some("0400"));
    assert_eq!(second.sub_path(), Some("password"));
    assert_eq!(second.optional(), Some(false));

    // Written as `subPath: ""` by an older tool.
    let PodVolume::Secret(third) = &config.volumes[2];
    assert_eq!(third.sub_path(), None);
    assert_eq!(third.default_mode(), Some("256"));
    assert_eq!(third.optional(), Some(true));
}

#[test]
fn parse_json_config() {
    let json = r#"
{
  "volumes": [
    {
      "kind": "secretVolume",
      "mountPath": "/etc/tls",
      "secretName": "tls",
      "subPath": "  "
    }
  ]
}"#;
    let config = VolumesConfig::from_str(json).expect("parse error");
    assert_eq!(
        config.volumes,
        vec![PodVolume::from(SecretVolume::new(
            "/etc/tls", "tls", None, None, None
        ))],
    );
}

#[test]
fn round_trip_restores_sub_path_invariant() {
    // Written by an older tool which stored blank strings.
    let stale = "volumes:\n  - kind: secretVolume\n    mountPath: /etc/secret\n    secretName: db-creds\n    subPath: ''\n";
    let restored = VolumesConfig::from_str(stale).expect("parse error");
    let PodVolume::Secret(secret) = &restored.volumes[0];
    assert_eq!(secret.sub_path(), None);

    // Normalized data survives another round trip unchanged.
    let yaml = restored.to_yaml().expect("serialize error");
    assert!(!yaml.contains("subPath"));
    assert_eq!(VolumesConfig::from_str(&yaml).expect("parse error"), restored);
}

#[test]
fn plain_deserialize_keeps_sub_path_invariant() {
    // Callers who skip `from_str` still never see a blank `subPath`.
    let yaml = "volumes:\n  - kind: secretVolume\n    mountPath: /etc/secret\n    secretName: db-creds\n    subPath: '  '\n";
    let config: VolumesConfig = serde_yaml::from_str(yaml).expect("parse error");
    let PodVolume::Secret(secret) = &config.volumes[0];
    assert_eq!(secret.sub_path(), None);
}

#[test]
fn unquoted_numeric_modes_are_rejected() {
    // YAML would read these as 511, 256 and a float, not as the text the
    // user wrote, so they must be quoted.
    for &mode in &["0x1ff", "0o400", "1.5", "1e3", "400"] {
        let yaml = format!(
            "volumes:\n  - kind: secretVolume\n    mountPath: /etc/secret\n    secretName: db-creds\n    defaultMode: {}\n",
            mode,
        );
        assert!(VolumesConfig::from_str(&yaml).is_err(), "accepted {}", mode);
    }
}

#[test]
fn quoted_modes_are_checked_when_building() {
    for &(mode, expected) in &[("'0x1ff'", None), ("'1.5'", None), ("'0400'", Some(400))] {
        let yaml = format!(
            "volumes:\n  - kind: secretVolume\n    mountPath: /etc/secret\n    secretName: db-creds\n    defaultMode: {}\n",
            mode,
        );
        let config = VolumesConfig::from_str(&yaml).expect("parse error");
        let built = config.volumes[0].build_volume("vol-0");
        match expected {
            Some(bits) => assert_eq!(
                built.expect("build error").secret.and_then(|s| s.default_mode),
                Some(bits),
            ),
            None => match built {
                Err(VolumeError::InvalidDefaultMode { .. }) => {}
                other => panic!("expected InvalidDefaultMode for {}, got {:?}", mode, other),
            },
        }
    }
}

#[test]
fn reject_bad_configs() {
    let examples = &[
        // Unknown kind.
        "volumes:\n  - kind: hostPathVolume\n    mountPath: /data\n",
        // Missing secret name.
        "volumes:\n  - kind: secretVolume\n    mountPath: /etc/secret\n",
        // Unknown field.
        "volumes:\n  - kind: secretVolume\n    mountPath: /etc/secret\n    secretName: s\n    items: []\n",
        // Unknown top-level field.
        "volumes: []\nvolume_count: 0\n",
    ];
    for &yaml in examples {
        assert!(VolumesConfig::from_str(yaml).is_err(), "accepted {:?}", yaml);
    }
}

#[test]
fn load_reports_missing_file() {
    let err = VolumesConfig::load(Path::new("/nonexistent/volumes.yml"))
        .expect_err("loaded a missing file");
    assert!(err.to_string().contains("/nonexistent/volumes.yml"));
}
