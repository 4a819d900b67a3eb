//! Device profile command.

use blerec_recorder::DeviceProfile;

use super::output_result;
use crate::Cli;

/// Prints the GATT identifiers and audio format of the device.
pub fn print_profile(cli: &Cli) -> anyhow::Result<()> {
    output_result(&DeviceProfile::recorder(), cli.json)
}
