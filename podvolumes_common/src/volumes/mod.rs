//! Volumes which can be mounted into a pod.
//!
//! Each kind of volume knows how to describe itself as a Kubernetes
//! [`Volume`]. Whoever assembles the pod is responsible for picking a unique
//! name for each volume and merging the results into the pod spec.

use k8s_openapi::api::core::v1::Volume;

use crate::prelude::*;

pub mod secret;

pub use self::secret::SecretVolume;

/// Something which can be turned into a Kubernetes `Volume` and mounted into
/// a container.
pub trait BuildVolume {
    /// Build a new Kubernetes `Volume` named `volume_name`. The caller must
    /// make sure that `volume_name` is unique within the pod.
    fn build_volume(&self, volume_name: &str) -> Result<Volume, VolumeError>;

    /// Where should this volume be mounted inside the container?
    fn mount_path(&self) -> &str;
}

/// Registry metadata for a kind of volume.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct VolumeKind {
    /// The short symbolic name used in configuration files and pipeline
    /// scripts. This is also the `kind` tag of the serialized volume.
    pub symbol: &'static str,
    /// A human-readable label for pickers.
    pub display_name: &'static str,
}

/// Every kind of volume we know how to mount.
///
/// Note that this is used directly as part of the `VolumesConfig` format, so
/// it can't be changed without breaking a user-facing file format.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum PodVolume {
    /// A Kubernetes secret, mounted as a directory of files.
    #[serde(rename = "secretVolume")]
    Secret(SecretVolume),
}

impl PodVolume {
    /// All the kinds of volume we know about, in the order they should be
    /// offered to users.
    pub fn kinds() -> &'static [VolumeKind] {
        &[SecretVolume::KIND]
    }

    /// Look up a kind using its symbolic name.
    pub fn kind_for_symbol(symbol: &str) -> Option<&'static VolumeKind> {
        Self::kinds().iter().find(|kind| kind.symbol == symbol)
    }

    /// What kind of volume is this?
    pub fn kind(&self) -> &'static VolumeKind {
        match self {
            PodVolume::Secret(_) => &SecretVolume::KIND,
        }
    }

    /// Restore any invariants which may not hold for freshly-deserialized
    /// data. Must be called after loading a volume from storage.
    pub fn normalize(&mut self) {
        match self {
            PodVolume::Secret(secret) => secret.normalize(),
        }
    }
}

impl BuildVolume for PodVolume {
    fn build_volume(&self, volume_name: &str) -> Result<Volume, VolumeError> {
        match self {
            PodVolume::Secret(secret) => secret.build_volume(volume_name),
        }
    }

    fn mount_path(&self) -> &str {
        match self {
            PodVolume::Secret(secret) => secret.mount_path(),
        }
    }
}

impl From<SecretVolume> for PodVolume {
    fn from(secret: SecretVolume) -> Self {
        PodVolume::Secret(secret)
    }
}

impl fmt::Display for PodVolume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PodVolume::Secret(secret) => fmt::Display::fmt(secret, f),
        }
    }
}

#[test]
fn every_kind_has_a_unique_symbol() {
    let kinds = PodVolume::kinds();
    for (i, kind) in kinds.iter().enumerate() {
        assert!(!kind.symbol.is_empty());
        assert!(!kind.display_name.is_empty());
        assert!(kinds[i + 1..].iter().all(|other| other.symbol != kind.symbol));
    }
}

#[test]
fn kind_tag_matches_registered_symbol() {
    let volume = PodVolume::from(SecretVolume::new(
        "/etc/secret",
        "db-creds",
        None,
        None,
        None,
    ));
    let json = serde_json::to_value(&volume).expect("could not serialize");
    assert_eq!(json["kind"], volume.kind().symbol);
    assert_eq!(
        PodVolume::kind_for_symbol("secretVolume"),
        Some(&SecretVolume::KIND)
    );
    assert_eq!(PodVolume::kind_for_symbol("hostPathVolume"), None);
}

#[test]
fn pod_volume_dispatches_to_variant() {
    let volume = PodVolume::from(SecretVolume::new(
        "/etc/secret",
        "db-creds",
        Some("0400".to_owned()),
        None,
        None,
    ));
    assert_eq!(volume.mount_path(), "/etc/secret");
    let built = volume.build_volume("vol-0").expect("could not build");
    assert_eq!(built.name, "vol-0");
    assert_eq!(built.secret.and_then(|s| s.default_mode), Some(400));
}
