//! List serial ports.

use panelfeed_stream_engine::list_ports;

pub fn run() -> anyhow::Result<()> {
    let ports = list_ports()?;
    if ports.is_empty() {
        println!("No serial ports found.");
        return Ok(());
    }

    println!("Serial ports:");
    for port in &ports {
        println!("  {:<24} {}", port.name, port.description);
    }
    Ok(())
}
