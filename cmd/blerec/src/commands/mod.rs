//! CLI commands module.

mod generate;
mod inspect;
mod profile;
mod replay;
mod util;

pub use generate::GenerateCommand;
pub use inspect::InspectCommand;
pub use profile::print_profile;
pub use replay::ReplayCommand;

pub(crate) use util::*;
