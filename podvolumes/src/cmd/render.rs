//! The `render` subcommand.

use lazy_static::lazy_static;
use podvolumes_common::{k8s_openapi::api::core::v1::Volume, prelude::*};
use regex::Regex;

/// Kubernetes limits volume names to one DNS label.
const MAX_VOLUME_NAME_LEN: usize = 63;

/// Build every configured volume and print them as a YAML list.
pub fn run(config_path: &Path, name_prefix: &str) -> Result<()> {
    let config = VolumesConfig::load(config_path)?;
    let volumes = build_volumes(&config, name_prefix)?;
    info!("rendered {} volumes", volumes.len());
    print!(
        "{}",
        serde_yaml::to_string(&volumes).context("could not serialize volumes")?
    );
    Ok(())
}

/// Build a Kubernetes `Volume` for each entry in `config`, stopping at the
/// first one which fails.
fn build_volumes(config: &VolumesConfig, name_prefix: &str) -> Result<Vec<Volume>> {
    config
        .volumes
        .iter()
        .enumerate()
        .map(|(index, volume)| {
            let volume_name = volume_name(name_prefix, index)?;
            debug!("building {} as {}", volume, volume_name);
            volume
                .build_volume(&volume_name)
                .with_context(|| format!("could not build volume {} ({})", index, volume))
        })
        .collect()
}

/// Generate the name for volume number `index`, converting `_` to `-` and
/// lowercasing. Fails unless the result is a legal DNS label, which is what
/// Kubernetes requires.
fn volume_name(name_prefix: &str, index: usize) -> Result<String> {
    lazy_static! {
        static ref RE: Regex = Regex::new("^[a-z0-9]([-a-z0-9]*[a-z0-9])?$")
            .expect("couldn't parse built-in regex");
    }

    let name = format!("{}-{}", name_prefix, index)
        .replace('_', "-")
        .to_lowercase();
    if name.len() > MAX_VOLUME_NAME_LEN || !RE.is_match(&name) {
        return Err(format_err!(
            "volume name {:?} is not a valid DNS label (check --name-prefix)",
            name
        ));
    }
    Ok(name)
}

#[test]
fn volume_names_are_dns_labels() {
    assert_eq!(volume_name("volume", 0).unwrap(), "volume-0");
    assert_eq!(volume_name("Secret_Vol", 12).unwrap(), "secret-vol-12");
    assert_eq!(volume_name(&"a".repeat(61), 0).unwrap().len(), 63);
}

#[test]
fn invalid_volume_names_are_rejected() {
    let too_long = "a".repeat(62);
    for &prefix in &["a.b", "", "-vol", "vol/x", "vol ume", "v\u{e9}", too_long.as_str()] {
        assert!(volume_name(prefix, 0).is_err(), "accepted prefix {:?}", prefix);
    }
}

#[test]
fn bad_prefix_fails_before_building() {
    let yaml = include_str!("../../../podvolumes_common/src/example_volumes.yml");
    let config = VolumesConfig::from_str(yaml).expect("parse error");
    let err = build_volumes(&config, "my.volumes").expect_err("accepted bad prefix");
    assert!(err.to_string().contains("my.volumes-0"));
}

#[test]
fn render_example_config() {
    use podvolumes_common::serde_json;

    let yaml = include_str!("../../../podvolumes_common/src/example_volumes.yml");
    let config = VolumesConfig::from_str(yaml).expect("parse error");
    let volumes = build_volumes(&config, "volume").expect("build error");
    let rendered = serde_yaml::to_string(&volumes).expect("serialize error");
    print!("{}", rendered);

    let parsed: serde_json::Value =
        serde_yaml::from_str(&rendered).expect("rendered invalid YAML");
    assert_eq!(parsed[0]["name"], "volume-0");
    assert_eq!(parsed[0]["secret"]["secretName"], "db-creds");
    assert!(parsed[0]["secret"].get("items").is_none());
    assert_eq!(parsed[1]["secret"]["defaultMode"], 400);
    assert_eq!(parsed[1]["secret"]["optional"], false);
    assert_eq!(parsed[1]["secret"]["items"][0]["key"], "password");
    assert_eq!(parsed[1]["secret"]["items"][0]["path"], "password");
    assert_eq!(parsed[2]["secret"]["defaultMode"], 256);
    assert!(parsed[2]["secret"].get("items").is_none());
}

#[test]
fn build_errors_name_the_volume() {
    let config = VolumesConfig::from_str(
        "volumes:\n  - kind: secretVolume\n    mountPath: /etc/secret\n    secretName: db-creds\n    defaultMode: abc\n",
    )
    .expect("parse error");
    let err = build_volumes(&config, "volume").expect_err("built a bad volume");
    assert!(err.to_string().starts_with("could not build volume 0"));
    assert!(err.downcast_ref::<VolumeError>().is_some());
}
