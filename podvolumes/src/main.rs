//! A tool for turning volume configuration into Kubernetes `Volume` objects.

use podvolumes_common::{prelude::*, quick_main, tracing_support::initialize_tracing};
use structopt::StructOpt;

mod cmd;

/// Command-line options, parsed using `structopt`.
#[derive(Debug, StructOpt)]
#[structopt(about = "Render pod volume configuration as Kubernetes volumes.")]
enum Opt {
    /// List the kinds of volume which may appear in a configuration file.
    #[structopt(name = "kinds")]
    Kinds,

    /// Print a configuration file with blank fields cleaned up.
    #[structopt(name = "normalize")]
    Normalize {
        /// Path to a YAML or JSON volume configuration file.
        #[structopt(parse(from_os_str))]
        config: PathBuf,
    },

    /// Print the Kubernetes volumes described by a configuration file.
    #[structopt(name = "render")]
    Render {
        /// Path to a YAML or JSON volume configuration file.
        #[structopt(parse(from_os_str))]
        config: PathBuf,

        /// Volumes will be named `<prefix>-0`, `<prefix>-1`, etc.
        #[structopt(long = "name-prefix", default_value = "volume")]
        name_prefix: String,
    },
}

quick_main!(run);

fn run() -> Result<()> {
    initialize_tracing();
    let opt = Opt::from_args();
    debug!("Args: {:?}", opt);

    match opt {
        Opt::Kinds => cmd::kinds::run(),
        Opt::Normalize { ref config } => cmd::normalize::run(config),
        Opt::Render {
            ref config,
            ref name_prefix,
        } => cmd::render::run(config, name_prefix),
    }
}
