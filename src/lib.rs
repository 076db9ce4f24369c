pub mod changelog;
pub mod classify;
pub mod clients;
pub mod compose;
pub mod error;
pub mod logging;
pub mod objects;
pub mod outputs;
pub mod packages;
pub mod reconcile;
pub mod workspace;

mod app;
pub mod commands;
pub mod config;

// Re-export App and Config from modules
pub use app::App;
pub use app::Publication;
pub use config::Config;

// Disable colors for all tests to get clean output
#[cfg(test)]
#[ctor::ctor]
fn init_tests() {
    colored::control::set_override(false);
}
