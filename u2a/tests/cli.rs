//! Binary entry points: exit codes and stream discipline.

use std::net::UdpSocket;
use std::process::Command;
use std::time::Duration;

#[test]
fn producer_rejects_address_without_port() {
    let output = Command::new(env!("CARGO_BIN_EXE_udp_producer"))
        .arg("udp://127.0.0.1")
        .env_remove("RUST_LOG")
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("[ERROR] : "), "{stderr}");
}

#[test]
fn bounded_producer_exits_zero_after_sending() {
    let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
    receiver
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    let port = receiver.local_addr().unwrap().port();

    let output = Command::new(env!("CARGO_BIN_EXE_udp_producer"))
        .args([&format!("udp://127.0.0.1:{port}"), "-n", "3", "-w", "1"])
        .env_remove("RUST_LOG")
        .output()
        .unwrap();

    assert!(output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("[INFO] : sending data to udp://127.0.0.1:"), "{stderr}");

    let mut buf = [0_u8; 1024];
    for expected in 0..3_u64 {
        let len = receiver.recv(&mut buf).unwrap();
        let event: serde_json::Value = serde_json::from_slice(&buf[..len]).unwrap();
        assert_eq!(event["index"].as_u64(), Some(expected));
    }
}

#[test]
fn producer_debug_flag_logs_payloads() {
    let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
    let port = receiver.local_addr().unwrap().port();

    let output = Command::new(env!("CARGO_BIN_EXE_udp_producer"))
        .args([&format!("127.0.0.1:{port}"), "-n", "1", "-d"])
        .env_remove("RUST_LOG")
        .output()
        .unwrap();

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("[DEBUG] : sending data: {\"event_time\":"), "{stderr}");
}

#[cfg(unix)]
#[test]
fn unbounded_producer_exits_zero_on_sigint() {
    use std::process::Stdio;

    let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
    receiver
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    let port = receiver.local_addr().unwrap().port();

    let child = Command::new(env!("CARGO_BIN_EXE_udp_producer"))
        .args([&format!("udp://127.0.0.1:{port}"), "-n", "0", "-w", "5"])
        .env_remove("RUST_LOG")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    // A few sends in, the signal watcher is listening.
    let mut buf = [0_u8; 1024];
    for _ in 0..3 {
        receiver.recv(&mut buf).unwrap();
    }

    let status = Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());

    let output = child.wait_with_output().unwrap();
    assert!(output.status.success(), "{:?}", output.status);
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("[INFO] : interrupted"), "{stderr}");
}
