//! Command-line tests against the built binary.

use std::io::Write;
use std::process::Command;

use etherparse::PacketBuilder;
use tempfile::NamedTempFile;

fn udp(src_port: u16, payload: &[u8]) -> Vec<u8> {
    let builder = PacketBuilder::ethernet2([0x02; 6], [0x04; 6])
        .ipv4([10, 1, 1, 1], [10, 1, 1, 2], 64)
        .udp(src_port, 514);
    let mut frame = Vec::new();
    builder.write(&mut frame, payload).unwrap();
    frame
}

fn tcp(from_client: bool, seq: u32, fin: bool, payload: &[u8]) -> Vec<u8> {
    let (src, dst, sport, dport) = if from_client {
        ([10, 1, 1, 1], [10, 1, 1, 2], 33000, 22)
    } else {
        ([10, 1, 1, 2], [10, 1, 1, 1], 22, 33000)
    };
    let mut builder = PacketBuilder::ethernet2([0x02; 6], [0x04; 6])
        .ipv4(src, dst, 64)
        .tcp(sport, dport, seq, 4096)
        .ack(1);
    if fin {
        builder = builder.fin();
    }
    let mut frame = Vec::new();
    builder.write(&mut frame, payload).unwrap();
    frame
}

fn capture(frames: &[Vec<u8>]) -> NamedTempFile {
    let mut out = Vec::new();
    out.extend_from_slice(&0xa1b2c3d4u32.to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes());
    out.extend_from_slice(&4u16.to_le_bytes());
    out.extend_from_slice(&[0; 8]);
    out.extend_from_slice(&65535u32.to_le_bytes());
    out.extend_from_slice(&1u32.to_le_bytes());
    for (i, frame) in frames.iter().enumerate() {
        out.extend_from_slice(&(1_600_000_000 + i as u32).to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&(frame.len() as u32).to_le_bytes());
        out.extend_from_slice(&(frame.len() as u32).to_le_bytes());
        out.extend_from_slice(frame);
    }
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&out).unwrap();
    file
}

fn pcapstream() -> Command {
    Command::new(env!("CARGO_BIN_EXE_pcapstream"))
}

fn sample() -> NamedTempFile {
    capture(&[
        tcp(true, 1, false, b"SSH-2.0-client\r\n"),
        tcp(false, 1, false, b"SSH-2.0-server\r\n"),
        udp(40001, b"<13>syslog line"),
        tcp(true, 17, true, b""),
        tcp(false, 17, true, b""),
    ])
}

// Test 1: text summary of a small capture
#[test]
fn test_text_summary() {
    let file = sample();
    let output = pcapstream().arg(file.path()).output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("10.1.1.1:33000 -> 10.1.1.2:22 [finished] 4 packets, 32 bytes"));
    assert!(stdout.contains("udp 10.1.1.1:40001 <-> 10.1.1.2:514 [flushed] 1 packets"));
    assert!(stdout.contains("Frames:              5"));
}

// Test 2: CSV output with reassembly disabled lists every packet
#[test]
fn test_csv_pass_through() {
    let file = sample();
    let output = pcapstream()
        .args(["--format", "csv", "--no-stream", "--no-datagram", "--packets"])
        .arg(file.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines[0], "kind,first_frame,last_frame,flow,reason,packets,bytes,discarded");
    assert_eq!(lines.len(), 6);
    assert!(lines[3].starts_with("packet,3,3,ethernet/ipv4/udp/data,"));
}

// Test 3: a missing file is reported with context
#[test]
fn test_missing_file() {
    let output = pcapstream().arg("/nonexistent/trace.pcap").output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Failed to replay capture"));
}

// Test 4: no input at all
#[test]
fn test_no_input() {
    let output = pcapstream().output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Capture file required"));
}
