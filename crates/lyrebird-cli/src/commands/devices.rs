//! Capture device listing command.

use clap::Args;
use lyrebird_io::capture::input_devices;

#[derive(Args)]
pub struct DevicesArgs {}

pub fn run(_args: DevicesArgs) -> anyhow::Result<()> {
    let devices = input_devices()?;

    if devices.is_empty() {
        println!("No audio capture devices found");
    } else {
        println!("Audio capture devices:");
        for (i, name) in devices.iter().enumerate() {
            println!("  [{i}] {name}");
        }
    }

    Ok(())
}
