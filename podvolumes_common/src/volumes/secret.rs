//! Kubernetes secrets mounted as volumes.

use k8s_openapi::api::core::v1::{KeyToPath, SecretVolumeSource, Volume};

use super::{BuildVolume, VolumeKind};
use crate::prelude::*;

/// A Kubernetes secret which should be mounted into a container as a
/// directory of files, one per key. We only ever refer to the secret by name;
/// its contents never pass through our hands.
///
/// Note that this is used directly as part of the `VolumesConfig` format, so
/// the serialized field names can't be changed.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SecretVolume {
    /// The directory path to mount it as.
    mount_path: String,

    /// The name of the Kubernetes secret to use.
    secret_name: String,

    /// Permission bits for the files created from the secret, as a base-10
    /// string. We don't check this until we build the volume. Only strings
    /// are accepted, because a YAML parser would read a bare `0x1ff` or
    /// `0o400` as some other number before we ever saw it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_mode: Option<String>,

    /// A single key to mount instead of the whole secret.
    #[serde(
        default,
        deserialize_with = "blank_as_none::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    sub_path: Option<String>,

    /// May the secret be missing when the pod starts? Passed through to
    /// Kubernetes exactly as given, so `None` and `Some(false)` stay distinct.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    optional: Option<bool>,
}

impl SecretVolume {
    /// Registry metadata for secret volumes.
    pub const KIND: VolumeKind = VolumeKind {
        symbol: "secretVolume",
        display_name: "Secret Volume",
    };

    /// Create a new secret volume. A blank `sub_path` is treated as no
    /// `sub_path` at all.
    pub fn new(
        mount_path: impl Into<String>,
        secret_name: impl Into<String>,
        default_mode: Option<String>,
        sub_path: Option<String>,
        optional: Option<bool>,
    ) -> Self {
        SecretVolume {
            mount_path: mount_path.into(),
            secret_name: secret_name.into(),
            default_mode,
            sub_path: fix_blank(sub_path),
            optional,
        }
    }

    /// The name of the Kubernetes secret to mount.
    pub fn secret_name(&self) -> &str {
        &self.secret_name
    }

    /// The unparsed file mode, if any.
    pub fn default_mode(&self) -> Option<&str> {
        self.default_mode.as_deref()
    }

    /// The single secret key to mount, if any. Never blank.
    pub fn sub_path(&self) -> Option<&str> {
        self.sub_path.as_deref()
    }

    /// Whether the secret may be missing.
    pub fn optional(&self) -> Option<bool> {
        self.optional
    }

    /// Set the single secret key to mount. Always normalizes: blank or
    /// whitespace-only input is stored as `None`.
    pub fn set_sub_path(&mut self, sub_path: Option<String>) {
        self.sub_path = fix_blank(sub_path);
    }

    /// Re-apply the `sub_path` normalization to freshly-loaded data. Older
    /// configuration files may contain `subPath: ""`.
    pub fn normalize(&mut self) {
        self.sub_path = fix_blank(self.sub_path.take());
    }

    /// Parse `default_mode`, if it's present and non-blank.
    fn parsed_default_mode(&self) -> Result<Option<i32>, VolumeError> {
        match non_blank(self.default_mode.as_deref()) {
            None => Ok(None),
            // Leading zeros don't make this octal: "0400" is 400.
            Some(mode) => mode.parse::<i32>().map(Some).map_err(|source| {
                VolumeError::InvalidDefaultMode {
                    secret_name: self.secret_name.clone(),
                    value: mode.to_owned(),
                    source,
                }
            }),
        }
    }
}

impl BuildVolume for SecretVolume {
    fn build_volume(&self, volume_name: &str) -> Result<Volume, VolumeError> {
        trace!(
            "building volume {} for secret {}",
            volume_name,
            self.secret_name
        );

        let mut source = SecretVolumeSource {
            secret_name: Some(self.secret_name.clone()),
            optional: self.optional,
            ..SecretVolumeSource::default()
        };
        source.default_mode = self.parsed_default_mode()?;

        // Mount just one key, with a file name matching the key.
        if let Some(key) = non_blank(self.sub_path.as_deref()) {
            source.items = Some(vec![KeyToPath {
                key: key.to_owned(),
                path: key.to_owned(),
                ..KeyToPath::default()
            }]);
        }

        Ok(Volume {
            name: volume_name.to_owned(),
            secret: Some(source),
            ..Volume::default()
        })
    }

    fn mount_path(&self) -> &str {
        &self.mount_path
    }
}

impl fmt::Display for SecretVolume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SecretVolume [mountPath={}, secretName={}, defaultMode={}, optional={}, subPath={}]",
            self.mount_path,
            self.secret_name,
            self.default_mode.as_deref().unwrap_or("null"),
            self.optional
                .map(|optional| optional.to_string())
                .as_deref()
                .unwrap_or("null"),
            self.sub_path.as_deref().unwrap_or("null"),
        )
    }
}

/// Return `s` unless it's missing or consists only of whitespace.
fn non_blank(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}

/// Replace blank strings with `None`.
fn fix_blank(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.trim().is_empty())
}

/// Custom `serde` deserialization which treats blank strings as missing.
/// Use with `#[serde(deserialize_with = "blank_as_none::deserialize")]`.
mod blank_as_none {
    use serde::{Deserialize, Deserializer};
    use std::result;

    /// Deserialize an optional string, replacing blank values with `None`.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> result::Result<Option<String>, D::Error> {
        Ok(super::fix_blank(Option::<String>::deserialize(deserializer)?))
    }
}

#[cfg(test)]
fn db_creds(default_mode: Option<&str>, sub_path: Option<&str>) -> SecretVolume {
    SecretVolume::new(
        "/etc/secret",
        "db-creds",
        default_mode.map(str::to_owned),
        sub_path.map(str::to_owned),
        None,
    )
}

#[test]
fn whole_secret_mount() {
    let volume = db_creds(None, None).build_volume("vol-0").unwrap();
    assert_eq!(volume.name, "vol-0");
    let source = volume.secret.expect("should be a secret volume");
    assert_eq!(source.secret_name.as_deref(), Some("db-creds"));
    assert_eq!(source.optional, None);
    assert_eq!(source.default_mode, None);
    assert_eq!(source.items, None);
    assert!(volume.config_map.is_none());
    assert!(volume.empty_dir.is_none());
}

#[test]
fn single_key_mount_with_mode() {
    let volume = db_creds(Some("0400"), Some("password"))
        .build_volume("vol-1")
        .unwrap();
    assert_eq!(volume.name, "vol-1");
    let source = volume.secret.expect("should be a secret volume");
    assert_eq!(source.default_mode, Some(400));
    let items = source.items.expect("should have items");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].key, "password");
    assert_eq!(items[0].path, "password");
    assert_eq!(items[0].mode, None);
}

#[test]
fn non_numeric_mode_fails_at_build_time() {
    // Constructing and setting fields never checks the mode.
    let mut secret = db_creds(Some("abc"), None);
    secret.set_sub_path(Some("password".to_owned()));

    match secret.build_volume("vol-2") {
        Err(VolumeError::InvalidDefaultMode { secret_name, value, .. }) => {
            assert_eq!(secret_name, "db-creds");
            assert_eq!(value, "abc");
        }
        other => panic!("expected InvalidDefaultMode, got {:?}", other),
    }
}

#[test]
fn numeric_modes_parse_as_decimal() {
    let examples = &[
        ("420", 420),
        ("0644", 644),
        ("0", 0),
        ("+256", 256),
        ("-1", -1),
        ("2147483647", i32::MAX),
    ];
    for &(input, expected) in examples {
        let source = db_creds(Some(input), None)
            .build_volume("vol")
            .unwrap()
            .secret
            .unwrap();
        assert_eq!(source.default_mode, Some(expected), "parsing {:?}", input);
    }
}

#[test]
fn malformed_modes_are_rejected() {
    for &input in &["abc", "0x1ff", "4OO", " 400", "400 ", "1e3", "2147483648"] {
        assert!(
            db_creds(Some(input), None).build_volume("vol").is_err(),
            "accepted {:?}",
            input
        );
    }
}

#[test]
fn blank_modes_are_ignored() {
    for &input in &["", " ", "\t\n"] {
        let source = db_creds(Some(input), None)
            .build_volume("vol")
            .unwrap()
            .secret
            .unwrap();
        assert_eq!(source.default_mode, None, "parsing {:?}", input);
    }
}

#[test]
fn blank_sub_paths_mount_whole_secret() {
    for &input in &[None, Some(""), Some("   "), Some("\t")] {
        let secret = db_creds(None, input);
        assert_eq!(secret.sub_path(), None);
        let source = secret.build_volume("vol").unwrap().secret.unwrap();
        assert_eq!(source.items, None, "sub_path {:?}", input);
    }
}

#[test]
fn set_sub_path_normalizes() {
    let mut secret = db_creds(None, None);
    secret.set_sub_path(Some("  \t ".to_owned()));
    assert_eq!(secret.sub_path(), None);
    secret.set_sub_path(Some("token".to_owned()));
    assert_eq!(secret.sub_path(), Some("token"));
    secret.set_sub_path(Some(String::new()));
    assert_eq!(secret.sub_path(), None);
    secret.set_sub_path(Some("token".to_owned()));
    secret.set_sub_path(None);
    assert_eq!(secret.sub_path(), None);
}

#[test]
fn non_blank_sub_path_is_kept_verbatim() {
    let secret = db_creds(None, Some(" ca.crt"));
    assert_eq!(secret.sub_path(), Some(" ca.crt"));
    let items = secret
        .build_volume("vol")
        .unwrap()
        .secret
        .unwrap()
        .items
        .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].key, " ca.crt");
}

#[test]
fn optional_is_passed_through() {
    for &optional in &[None, Some(false), Some(true)] {
        let secret = SecretVolume::new("/etc/secret", "db-creds", None, None, optional);
        assert_eq!(secret.optional(), optional);
        let source = secret.build_volume("vol").unwrap().secret.unwrap();
        assert_eq!(source.optional, optional);
    }
}

#[test]
fn each_build_returns_a_fresh_volume() {
    let mut secret = db_creds(None, Some("password"));
    let first = secret.build_volume("vol-a").unwrap();
    secret.set_sub_path(None);
    let second = secret.build_volume("vol-b").unwrap();
    assert_eq!(first.secret.unwrap().items.unwrap()[0].key, "password");
    assert_eq!(second.name, "vol-b");
    assert_eq!(second.secret.unwrap().items, None);
}

#[test]
fn deserialize_fills_in_missing_fields() {
    // Older configuration only had the two required fields.
    let mut secret: SecretVolume = serde_json::from_str(
        r#"{ "mountPath": "/etc/secret", "secretName": "db-creds" }"#,
    )
    .expect("parse error");
    assert_eq!(secret.default_mode(), None);
    assert_eq!(secret.sub_path(), None);
    assert_eq!(secret.optional(), None);
    secret.normalize();
    assert_eq!(secret.sub_path(), None);
    assert_eq!(secret.mount_path(), "/etc/secret");
    assert_eq!(secret.secret_name(), "db-creds");
}

#[test]
fn deserialize_never_stores_blank_sub_path() {
    for &sub_path in &["\"\"", "\"  \"", "\"\\t\\n\"", "null"] {
        let json = format!(
            r#"{{ "mountPath": "/etc/secret", "secretName": "db-creds", "subPath": {} }}"#,
            sub_path,
        );
        let secret: SecretVolume = serde_json::from_str(&json).expect("parse error");
        assert_eq!(secret.sub_path(), None, "subPath {}", sub_path);
    }

    let secret: SecretVolume = serde_json::from_str(
        r#"{ "mountPath": "/etc/secret", "secretName": "db-creds", "subPath": " ca.crt" }"#,
    )
    .expect("parse error");
    assert_eq!(secret.sub_path(), Some(" ca.crt"));
}

#[test]
fn default_mode_must_be_a_string() {
    for &mode in &["256", "1.5", "true"] {
        let json = format!(
            r#"{{ "mountPath": "/etc/secret", "secretName": "db-creds", "defaultMode": {} }}"#,
            mode,
        );
        assert!(
            serde_json::from_str::<SecretVolume>(&json).is_err(),
            "accepted defaultMode {}",
            mode,
        );
    }

    let secret: SecretVolume = serde_json::from_str(
        r#"{ "mountPath": "/etc/secret", "secretName": "db-creds", "defaultMode": null }"#,
    )
    .expect("parse error");
    assert_eq!(secret.default_mode(), None);
}

#[test]
fn unknown_fields_are_rejected() {
    let result = serde_json::from_str::<SecretVolume>(
        r#"{ "mountPath": "/etc/secret", "secretName": "db-creds", "mode": "0400" }"#,
    );
    assert!(result.is_err());
}

#[test]
fn display_matches_log_format() {
    let secret = SecretVolume::new(
        "/etc/secret",
        "db-creds",
        Some("0400".to_owned()),
        None,
        Some(true),
    );
    assert_eq!(
        secret.to_string(),
        "SecretVolume [mountPath=/etc/secret, secretName=db-creds, \
         defaultMode=0400, optional=true, subPath=null]",
    );
}
