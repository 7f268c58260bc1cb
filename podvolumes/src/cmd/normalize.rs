//! The `normalize` subcommand.

use podvolumes_common::prelude::*;

/// Load a configuration file and print it back out in normalized form.
pub fn run(config_path: &Path) -> Result<()> {
    let config = VolumesConfig::load(config_path)?;
    print!("{}", config.to_yaml()?);
    Ok(())
}
