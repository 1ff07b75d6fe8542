pub mod headless;
pub mod terminal;
pub mod viewport;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Draw the scene in the terminal with live frame colors
    #[default]
    Preview,
    /// Receive frames and log statistics only
    Headless,
    /// Send a test pattern to the configured target
    Pattern,
}
