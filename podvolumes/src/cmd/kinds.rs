//! The `kinds` subcommand.

use podvolumes_common::prelude::*;

/// List every registered volume kind, one per line.
pub fn run() -> Result<()> {
    print!("{}", kinds_table());
    Ok(())
}

/// Format our registered kinds as tab-separated `symbol`, `display name`
/// lines.
fn kinds_table() -> String {
    PodVolume::kinds()
        .iter()
        .map(|kind| format!("{}\t{}\n", kind.symbol, kind.display_name))
        .collect()
}

#[test]
fn lists_secret_volume() {
    assert!(kinds_table()
        .lines()
        .any(|line| line == "secretVolume\tSecret Volume"));
}
