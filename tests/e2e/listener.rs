//! Trigger listener tests over real TCP connections.

use respin::listener::{await_trigger, bind, TriggerOutcome};
use std::io::Write;
use std::net::{Shutdown, TcpListener, TcpStream};
use std::sync::atomic::AtomicBool;
use std::thread;
use std::time::{Duration, Instant};

/// Bind on an ephemeral loopback port and return the listener and port.
fn bind_ephemeral() -> (TcpListener, u16) {
    let listener = bind("127.0.0.1", 0).expect("Should bind an ephemeral port");
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

fn connect(port: u16) -> TcpStream {
    TcpStream::connect(("127.0.0.1", port)).expect("Should connect to the listener")
}

#[test]
fn exact_token_triggers_while_connection_stays_open() {
    let (listener, port) = bind_ephemeral();

    let client = thread::spawn(move || {
        let mut stream = connect(port);
        stream.write_all(b"reset").unwrap();
        // Keep the connection open: the listener must return on the match
        // alone, not on EOF.
        thread::sleep(Duration::from_millis(500));
    });

    let shutdown = AtomicBool::new(false);
    let started = Instant::now();
    let outcome = await_trigger(&listener, "reset", &shutdown).unwrap();

    assert_eq!(outcome, TriggerOutcome::Triggered);
    assert!(started.elapsed() < Duration::from_millis(400));

    client.join().unwrap();
}

#[test]
fn other_payload_then_close_is_not_a_trigger() {
    let (listener, port) = bind_ephemeral();

    let client = thread::spawn(move || {
        let mut stream = connect(port);
        stream.write_all(b"ping").unwrap();
        stream.shutdown(Shutdown::Both).ok();
    });

    let shutdown = AtomicBool::new(false);
    let outcome = await_trigger(&listener, "reset", &shutdown).unwrap();

    assert_eq!(outcome, TriggerOutcome::Disconnected);
    client.join().unwrap();
}

#[test]
fn token_with_trailing_bytes_in_one_chunk_is_not_a_trigger() {
    let (listener, port) = bind_ephemeral();

    let client = thread::spawn(move || {
        let mut stream = connect(port);
        // The payload must equal the token exactly; a trailing newline
        // does not count.
        stream.write_all(b"reset\n").unwrap();
        stream.shutdown(Shutdown::Both).ok();
    });

    let shutdown = AtomicBool::new(false);
    let outcome = await_trigger(&listener, "reset", &shutdown).unwrap();

    assert_eq!(outcome, TriggerOutcome::Disconnected);
    client.join().unwrap();
}

#[test]
fn non_matching_chunk_keeps_listening_until_token_arrives() {
    let (listener, port) = bind_ephemeral();

    let client = thread::spawn(move || {
        let mut stream = connect(port);
        stream.write_all(b"ping").unwrap();
        // Let the listener consume the first chunk before the token
        // arrives as a second one.
        thread::sleep(Duration::from_millis(200));
        stream.write_all(b"reset").unwrap();
    });

    let shutdown = AtomicBool::new(false);
    let outcome = await_trigger(&listener, "reset", &shutdown).unwrap();

    assert_eq!(outcome, TriggerOutcome::Triggered);
    client.join().unwrap();
}

#[test]
fn close_without_payload_is_not_a_trigger() {
    let (listener, port) = bind_ephemeral();

    let client = thread::spawn(move || {
        let stream = connect(port);
        stream.shutdown(Shutdown::Both).ok();
    });

    let shutdown = AtomicBool::new(false);
    let outcome = await_trigger(&listener, "reset", &shutdown).unwrap();

    assert_eq!(outcome, TriggerOutcome::Disconnected);
    client.join().unwrap();
}

#[test]
fn port_can_be_rebound_after_a_cycle() {
    let (listener, port) = bind_ephemeral();

    let client = thread::spawn(move || {
        let mut stream = connect(port);
        stream.write_all(b"ping").unwrap();
    });

    let shutdown = AtomicBool::new(false);
    assert_eq!(
        await_trigger(&listener, "reset", &shutdown).unwrap(),
        TriggerOutcome::Disconnected
    );
    client.join().unwrap();

    // The control loop drops the socket and binds the same port again.
    drop(listener);
    assert!(bind("127.0.0.1", port).is_ok());
}

#[test]
fn bind_fails_when_port_is_taken() {
    let (listener, port) = bind_ephemeral();
    // The port is held by an active listener, not a TIME_WAIT remnant, so
    // SO_REUSEADDR does not help and the second bind must fail.
    assert!(bind("127.0.0.1", port).is_err());
    drop(listener);
}

#[test]
fn shutdown_flag_ends_the_wait_without_a_client() {
    let (listener, _port) = bind_ephemeral();
    let shutdown = AtomicBool::new(true);
    assert_eq!(
        await_trigger(&listener, "reset", &shutdown).unwrap(),
        TriggerOutcome::ShuttingDown
    );
}
