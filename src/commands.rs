//! One `impl App` block per subcommand.

mod check_snapshots;
mod comment;
mod release_pr;
mod snapshot;
mod status;

pub use release_pr::VERSION_PACKAGE_LABEL;
