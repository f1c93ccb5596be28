//! LIN Master Example
//!
//! This example drives a LIN master against the in-memory simulated bus,
//! so it runs without any transceiver attached.
//!
//! Run with: `RUST_LOG=debug cargo run --example simulated_bus`

use core::time::Duration;

use lin_master::{EchoStatus, LinConfig, LinMaster, SimulatedBus, Transport};

fn main() -> lin_master::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    println!("=== LIN Master Example ===\n");

    // Example 1: Request frames from slaves
    request_frames()?;

    // Example 2: Send frames and check the echo
    send_frames()?;

    // Example 3: Noise and a silent bus
    bus_faults()?;

    println!("\n=== All examples completed successfully! ===");
    Ok(())
}

fn body_bus() -> SimulatedBus {
    let mut bus = SimulatedBus::new(19_200);

    // Sensor frame (ID 0x22)
    bus.add_slave_response(0x22, &[0xAB, 0x84, 0x1E, 0xF4, 0x2E, 0x84, 0x7A, 0x55]);
    // Window position (ID 0x10)
    bus.add_slave_response(0x10, &[0x64]);
    // Diagnostic slave response (ID 0x3D, classic checksum)
    bus.add_slave_response(0x3D, &[0x7F, 0x06, 0xF2, 0x00, 0xFF, 0xFF, 0xFF, 0xFF]);
    bus
}

/// Request frames published by slaves
fn request_frames() -> lin_master::Result<()> {
    println!("--- Example 1: Requesting Frames ---");

    let mut master = LinMaster::new(body_bus(), LinConfig::default())?;

    for id in [0x22, 0x10, 0x3D, 0x11] {
        let frame = master.request_frame(id)?;
        if frame.flags.has_no_response() {
            println!("  ID 0x{:02X}: no response", id);
        } else {
            println!(
                "  ID 0x{:02X} (PID 0x{:02X}): {:02X?} checksum 0x{:02X} {}",
                frame.id,
                frame.pid,
                frame.data(),
                frame.checksum,
                if frame.checksum_valid() { "ok" } else { "FAILED" }
            );
        }
    }

    Ok(())
}

/// Send frames as master and inspect the echo
fn send_frames() -> lin_master::Result<()> {
    println!("\n--- Example 2: Sending Frames ---");

    let mut master = LinMaster::new(SimulatedBus::new(19_200), LinConfig::default())?;

    let status = master.send_frame(0x20, &[0x00, 0x50, 0x00, 0x00])?;
    println!("  Enhanced frame 0x20: echo {:?}", status);

    let status = master.send_frame_classic(0x21, &[0x05, 0x06])?;
    println!("  Classic frame 0x21: echo {:?}", status);

    // A transceiver that flips a bit on the way back
    master.transport_mut().set_echo_fault(3, 0x04);
    match master.send_frame(0x20, &[0x00, 0x50, 0x00, 0x00])? {
        EchoStatus::Mismatch {
            sent,
            echoed,
            recomputed,
        } => println!(
            "  Corrupted echo: sent 0x{:02X}, echoed 0x{:02X}, recomputed 0x{:02X}",
            sent, echoed, recomputed
        ),
        other => println!("  Unexpected echo status: {:?}", other),
    }

    Ok(())
}

/// Bus faults are reported in the frame, not as errors
fn bus_faults() -> lin_master::Result<()> {
    println!("\n--- Example 3: Bus Faults ---");

    let mut bus = body_bus();
    bus.inject(&[0x13, 0x37, 0x00, 0x42]);
    bus.sleep(Duration::from_millis(5));

    let config = LinConfig::default().with_timeout(Duration::from_millis(100));
    let mut master = LinMaster::new(bus, config)?;

    let frame = master.request_frame(0x22)?;
    println!(
        "  After noise: {} data bytes, checksum {}",
        frame.len(),
        if frame.checksum_valid() { "ok" } else { "FAILED" }
    );

    let bus = master.transport_mut();
    bus.set_echo(false);
    bus.remove_slave(0x22);
    let frame = master.request_frame(0x22)?;
    println!(
        "  Silent bus: {} data bytes, no response = {}",
        frame.len(),
        frame.flags.has_no_response()
    );

    Ok(())
}
