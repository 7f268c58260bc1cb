//! Error-handling code.

use std::{fmt, num::ParseIntError};

use thiserror::Error;

/// Errors which can occur while turning a volume specification into a
/// Kubernetes `Volume`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VolumeError {
    /// `defaultMode` was set, but it isn't a base-10 integer.
    #[error("invalid defaultMode {value:?} for secret {secret_name:?}")]
    InvalidDefaultMode {
        /// The secret referenced by the volume.
        secret_name: String,
        /// The text we tried to parse.
        value: String,
        /// Why parsing failed.
        #[source]
        source: ParseIntError,
    },
}

/// Support for displaying an error with a complete list of causes, and an
/// optional backtrace.
pub trait DisplayCausesAndBacktraceExt {
    /// Display the error and its causes, plus a backtrace (if available).
    fn display_causes_and_backtrace(&self) -> DisplayCauses<'_>;

    /// Display the error and its causes.
    fn display_causes_without_backtrace(&self) -> DisplayCauses<'_>;
}

impl DisplayCausesAndBacktraceExt for anyhow::Error {
    fn display_causes_and_backtrace(&self) -> DisplayCauses<'_> {
        DisplayCauses {
            err: self,
            show_backtrace: true,
        }
    }

    fn display_causes_without_backtrace(&self) -> DisplayCauses<'_> {
        DisplayCauses {
            err: self,
            show_backtrace: false,
        }
    }
}

/// Helper type used to display errors.
pub struct DisplayCauses<'a> {
    /// The error to display.
    err: &'a anyhow::Error,

    /// Should we show the backtrace?
    show_backtrace: bool,
}

impl fmt::Display for DisplayCauses<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ERROR: {}", self.err)?;
        for cause in self.err.chain().skip(1) {
            writeln!(f, "  caused by: {}", cause)?;
        }

        if self.show_backtrace {
            write!(f, "{}", self.err.backtrace())?;
        }
        Ok(())
    }
}

/// Generate a `main` function which calls the specified function. If the
/// function returns `Result::Err(_)`, then `main` will print the error and exit
/// with a non-zero status code.
#[macro_export]
macro_rules! quick_main {
    ($wrapped:ident) => {
        fn main() {
            if let Err(err) = $wrapped() {
                use ::std::io::Write;
                use $crate::errors::DisplayCausesAndBacktraceExt;
                let stderr = ::std::io::stderr();
                write!(&mut stderr.lock(), "{}", err.display_causes_and_backtrace())
                    .expect("Error occurred while trying to display error");
                ::std::process::exit(1);
            }
        }
    };
}

#[test]
fn causes_are_listed_after_the_error() {
    use anyhow::Context as _;

    let source = "abc".parse::<i32>().unwrap_err();
    let err = Err::<(), _>(VolumeError::InvalidDefaultMode {
        secret_name: "db-creds".to_owned(),
        value: "abc".to_owned(),
        source,
    })
    .context("could not build volume-0")
    .unwrap_err();

    let displayed = err.display_causes_without_backtrace().to_string();
    let lines = displayed.lines().collect::<Vec<_>>();
    assert_eq!(lines[0], "ERROR: could not build volume-0");
    assert_eq!(
        lines[1],
        "  caused by: invalid defaultMode \"abc\" for secret \"db-creds\""
    );
    assert_eq!(lines[2], "  caused by: invalid digit found in string");
    assert_eq!(lines.len(), 3);
}
