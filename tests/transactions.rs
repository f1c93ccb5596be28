//! End-to-end LIN transactions against the simulated bus.

#![cfg(feature = "alloc")]

use core::time::Duration;

use lin_master::{
    EchoStatus, LinConfig, LinMaster, Result, SimulatedBus, Transport, checksum, protected_id,
};

const PAYLOAD: [u8; 8] = [0xAB, 0x84, 0x1E, 0xF4, 0x2E, 0x84, 0x7A, 0x55];

fn master_with(bus: SimulatedBus) -> LinMaster<SimulatedBus> {
    LinMaster::new(bus, LinConfig::default()).unwrap()
}

#[test]
fn request_full_frame() -> Result<()> {
    let mut bus = SimulatedBus::new(19_200);
    bus.add_slave_response(0x22, &PAYLOAD);
    let mut master = master_with(bus);

    let frame = master.request_frame(0x22)?;
    assert_eq!(frame.id, 0x22);
    assert_eq!(frame.pid, protected_id(0x22));
    assert_eq!(frame.data(), &PAYLOAD);
    assert!(frame.checksum_valid());
    assert!(!frame.flags.has_error());
    assert_eq!(master.transport().pending(), 0);
    Ok(())
}

#[test]
fn request_short_frame() -> Result<()> {
    let mut bus = SimulatedBus::new(19_200);
    bus.add_slave_response(0x05, &[0x42]);
    let mut master = master_with(bus);

    let frame = master.request_frame(0x05)?;
    assert_eq!(frame.data(), &[0x42]);
    assert!(frame.checksum_valid());
    Ok(())
}

#[test]
fn request_times_out_without_any_byte() -> Result<()> {
    let mut bus = SimulatedBus::new(19_200);
    bus.set_echo(false);
    let mut master = master_with(bus);

    let start = master.transport().now();
    let frame = master.request_frame(0x22)?;
    let elapsed = master.transport().now() - start;

    assert!(frame.is_empty());
    assert!(!frame.checksum_valid());
    assert!(frame.flags.has_no_response());
    assert_eq!(frame.id, 0);
    assert!(elapsed >= Duration::from_millis(500));
    assert!(elapsed < Duration::from_millis(510));
    Ok(())
}

#[test]
fn request_honours_configured_timeout() -> Result<()> {
    let mut bus = SimulatedBus::new(19_200);
    bus.set_echo(false);
    let config = LinConfig::default().with_timeout(Duration::from_millis(50));
    let mut master = LinMaster::new(bus, config)?;

    let start = master.transport().now();
    let frame = master.request_frame(0x22)?;
    assert!(frame.is_empty());
    assert!(master.transport().now() - start < Duration::from_millis(60));
    Ok(())
}

#[test]
fn request_without_slave_reports_no_response() -> Result<()> {
    // The header echoes back but nobody answers
    let mut master = master_with(SimulatedBus::new(19_200));

    let frame = master.request_frame(0x10)?;
    assert!(frame.is_empty());
    assert!(!frame.checksum_valid());
    assert!(frame.flags.has_no_response());
    assert_eq!(frame.id, 0x10);
    Ok(())
}

#[test]
fn request_resyncs_after_noise() -> Result<()> {
    let mut bus = SimulatedBus::new(19_200);
    bus.add_slave_response(0x22, &PAYLOAD);
    bus.inject(&[0x12, 0x55, 0xFF, 0x00, 0x13, 0x00]);
    // Noise settles in the receive buffer before the header goes out
    bus.sleep(Duration::from_millis(5));
    let mut master = master_with(bus);

    let frame = master.request_frame(0x22)?;
    assert_eq!(frame.id, 0x22);
    assert_eq!(frame.data(), &PAYLOAD);
    assert!(frame.checksum_valid());
    Ok(())
}

#[test]
fn request_overflow_is_truncated_and_drained() -> Result<()> {
    let mut bus = SimulatedBus::new(19_200);
    let mut response = PAYLOAD.to_vec();
    response.push(checksum(protected_id(0x22), &PAYLOAD));
    response.extend_from_slice(&[0xDE, 0xAD, 0xBE]);
    assert_eq!(response.len(), 12);
    bus.add_raw_response(0x22, &response);
    bus.add_slave_response(0x23, &[0x01, 0x02]);
    let mut master = master_with(bus);

    let frame = master.request_frame(0x22)?;
    assert_eq!(frame.data(), &PAYLOAD);
    assert!(frame.checksum_valid());
    assert!(frame.flags.has_overflow());
    assert_eq!(master.transport().pending(), 0);

    // The discarded bytes must not leak into the next transaction
    let next = master.request_frame(0x23)?;
    assert_eq!(next.data(), &[0x01, 0x02]);
    assert!(next.checksum_valid());
    assert!(!next.flags.has_overflow());
    Ok(())
}

#[test]
fn request_bad_checksum_returns_payload() -> Result<()> {
    let mut bus = SimulatedBus::new(19_200);
    bus.add_raw_response(0x22, &[0x01, 0x02, 0x03, 0x00]);
    let mut master = master_with(bus);

    let frame = master.request_frame(0x22)?;
    assert_eq!(frame.data(), &[0x01, 0x02, 0x03]);
    assert_eq!(frame.checksum, 0x00);
    assert!(!frame.checksum_valid());
    Ok(())
}

#[test]
fn request_diagnostic_response_uses_classic() -> Result<()> {
    let data = [0x7F, 0x06, 0xB2, 0x00, 0xFF, 0xFF, 0xFF, 0xFF];
    let mut bus = SimulatedBus::new(19_200);
    bus.add_slave_response(0x3D, &data);
    let mut master = master_with(bus);

    let frame = master.request_frame(0x3D)?;
    assert!(frame.checksum_valid());
    assert!(!frame.flags.uses_enhanced_checksum());
    assert_eq!(frame.checksum, checksum(0, &data));
    Ok(())
}

#[test]
fn late_response_beyond_gap_is_no_response() -> Result<()> {
    let mut bus = SimulatedBus::new(19_200);
    bus.add_slave_response(0x22, &PAYLOAD);
    bus.set_response_delay(Duration::from_millis(5));
    let mut master = master_with(bus);

    let frame = master.request_frame(0x22)?;
    assert!(frame.flags.has_no_response());
    assert!(frame.is_empty());
    Ok(())
}

#[test]
fn wider_gap_accepts_slow_slave() -> Result<()> {
    let mut bus = SimulatedBus::new(19_200);
    bus.add_slave_response(0x22, &PAYLOAD);
    bus.set_response_delay(Duration::from_millis(5));
    let config = LinConfig::default().with_inter_byte_gap(Duration::from_millis(8));
    let mut master = LinMaster::new(bus, config)?;

    let frame = master.request_frame(0x22)?;
    assert_eq!(frame.data(), &PAYLOAD);
    assert!(frame.checksum_valid());
    Ok(())
}

#[test]
fn request_at_low_baud_rate_keeps_whole_response() -> Result<()> {
    // One byte lasts about 4.2 ms at 2400 bit/s, longer than the default gap
    let mut bus = SimulatedBus::new(2_400);
    bus.add_slave_response(0x22, &PAYLOAD);
    bus.add_slave_response(0x23, &[0x01, 0x02]);
    let mut master = LinMaster::new(bus, LinConfig::new(2_400))?;

    let frame = master.request_frame(0x22)?;
    assert_eq!(frame.data(), &PAYLOAD);
    assert!(frame.checksum_valid());
    assert!(!frame.flags.has_overflow());
    assert_eq!(master.transport().pending(), 0);

    let frame = master.request_frame(0x22)?;
    assert_eq!(frame.id, 0x22);
    assert_eq!(frame.data(), &PAYLOAD);
    assert!(frame.checksum_valid());

    let short = master.request_frame(0x23)?;
    assert_eq!(short.data(), &[0x01, 0x02]);
    assert!(short.checksum_valid());

    assert_eq!(master.send_frame(0x10, &[0x0A, 0x0B])?, EchoStatus::Matched);
    Ok(())
}

#[test]
fn send_frame_echo_matches() -> Result<()> {
    let mut master = master_with(SimulatedBus::new(19_200));
    assert_eq!(master.send_frame(0x22, &PAYLOAD)?, EchoStatus::Matched);
    assert_eq!(master.send_frame(0x01, &[])?, EchoStatus::Matched);
    assert_eq!(master.send_frame_classic(0x22, &PAYLOAD)?, EchoStatus::Matched);
    assert_eq!(master.transport().pending(), 0);
    Ok(())
}

#[test]
fn send_frame_echo_mismatch_is_not_fatal() -> Result<()> {
    let mut bus = SimulatedBus::new(19_200);
    // break, sync, pid, data[0] -> corrupt the first data byte
    bus.set_echo_fault(3, 0x01);
    let mut master = master_with(bus);

    let sent = checksum(protected_id(0x22), &PAYLOAD);
    let status = master.send_frame(0x22, &PAYLOAD)?;
    match status {
        EchoStatus::Mismatch {
            sent: s,
            echoed,
            recomputed,
        } => {
            assert_eq!(s, sent);
            assert_eq!(echoed, sent);
            assert_ne!(recomputed, sent);
        }
        other => panic!("expected mismatch, got {other:?}"),
    }

    // The bus stays usable
    master.transport_mut().clear_echo_fault();
    assert_eq!(master.send_frame(0x22, &PAYLOAD)?, EchoStatus::Matched);
    Ok(())
}

#[test]
fn send_then_request_on_same_bus() -> Result<()> {
    let mut bus = SimulatedBus::new(19_200);
    bus.add_slave_response(0x31, &[0x10, 0x20]);
    let mut master = master_with(bus);

    master.send_frame(0x30, &[0x01])?;
    let frame = master.request_frame(0x31)?;
    assert_eq!(frame.data(), &[0x10, 0x20]);
    assert!(frame.checksum_valid());
    Ok(())
}

#[test]
fn listen_picks_up_foreign_frame() -> Result<()> {
    let pid = protected_id(0x15);
    let data = [0x0A, 0x0B];
    let mut bus = SimulatedBus::new(19_200);
    bus.inject_after(
        Duration::from_millis(20),
        &[0x00, 0x55, pid, 0x0A, 0x0B, checksum(pid, &data)],
    );
    let mut master = master_with(bus);

    let frame = master.listen()?;
    assert_eq!(frame.id, 0x15);
    assert_eq!(frame.data(), &data);
    assert!(frame.checksum_valid());
    assert!(master.transport().written_bytes().is_empty());
    Ok(())
}

#[test]
fn transport_by_mutable_reference() -> Result<()> {
    let mut bus = SimulatedBus::new(19_200);
    bus.add_slave_response(0x22, &PAYLOAD);
    {
        let mut master = LinMaster::new(&mut bus, LinConfig::default())?;
        assert!(master.request_frame(0x22)?.checksum_valid());
    }
    assert!(!bus.events().is_empty());
    Ok(())
}
