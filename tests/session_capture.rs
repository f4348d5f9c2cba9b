//! End-to-end capture-to-transcript tests: raw datagrams in, decoded
//! records out.

use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use etherparse::PacketBuilder;

use flowsift::{
    ChannelSink, DecodePool, DecoderRegistry, Engine, EngineConfig, InlineDecode, MemorySink,
    Sweeper, TelnetDecoder,
};

const IAC: u8 = 255;
const WILL: u8 = 251;
const ECHO: u8 = 1;

fn telnet_frame(src: [u8; 4], sport: u16, dst: [u8; 4], dport: u16, payload: &[u8]) -> Vec<u8> {
    let builder = PacketBuilder::ipv4(src, dst, 64).tcp(sport, dport, 1000, 8192);
    let mut out = Vec::new();
    builder.write(&mut out, payload).unwrap();
    out
}

fn inline_engine(config: EngineConfig) -> (Engine, Arc<MemorySink>) {
    let mut registry = DecoderRegistry::new();
    registry.register(TelnetDecoder::from_config(&config));
    let sink = Arc::new(MemorySink::new());
    let flush = Arc::new(InlineDecode::new(registry, sink.clone()));
    (Engine::new(config, flush), sink)
}

// A Telnet session split across two packets: negotiation bytes in the first,
// credentials split over both. After the sweep, the decoder returns the
// transcript with the IAC sequence stripped.
#[test]
fn telnet_session_reassembled_and_decoded() {
    let (mut engine, sink) = inline_engine(EngineConfig::default());

    let mut first = vec![IAC, WILL, ECHO];
    first.extend_from_slice(b"login: root\r\n");
    let second = b"password: hunter2\r\n";

    // Server-to-client direction: source port is the Telnet service port.
    let f1 = telnet_frame([1, 2, 3, 4], 23, [5, 6, 7, 8], 4000, &first);
    let f2 = telnet_frame([1, 2, 3, 4], 23, [5, 6, 7, 8], 4000, second);

    engine.ingest_datagram(&f1, 1_000_000).unwrap();
    engine.ingest_datagram(&f2, 1_100_000).unwrap();
    assert_eq!(engine.active_flows(), 1);

    let expired = engine.sweep(1_100_000 + engine.config().idle_timeout_us + 1);
    assert_eq!(expired, 1);

    let records = sink.take();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].text, b"login: root\r\npassword: hunter2\r\n");
    assert_eq!(records[0].protocol, "telnet");
    assert_eq!(records[0].len(), 32);
    assert_eq!(records[0].key.to_string(), "1.2.3.4:23 -> 5.6.7.8:4000");
}

// Request and response directions stay separate flows and produce separate
// records that a higher layer can correlate via reversed keys.
#[test]
fn half_duplex_directions_decode_independently() {
    let (mut engine, sink) = inline_engine(EngineConfig::default());

    let client = telnet_frame([5, 6, 7, 8], 4000, [1, 2, 3, 4], 23, b"root\r\nhunter2\r\n");
    let server = telnet_frame([1, 2, 3, 4], 23, [5, 6, 7, 8], 4000, b"login: \r\npassword: \r\n");

    engine.ingest_datagram(&client, 0).unwrap();
    engine.ingest_datagram(&server, 0).unwrap();
    assert_eq!(engine.active_flows(), 2);

    engine.sweep(engine.config().idle_timeout_us + 1);

    let records = sink.take();
    assert_eq!(records.len(), 2);
    let keys: Vec<_> = records.iter().map(|r| r.key).collect();
    assert_eq!(keys[0], keys[1].reversed());
}

// Binary traffic on the Telnet port is rejected rather than logged as garbage.
#[test]
fn binary_flow_rejected() {
    let (mut engine, sink) = inline_engine(EngineConfig::default());

    let frame = telnet_frame(
        [5, 6, 7, 8],
        4000,
        [1, 2, 3, 4],
        23,
        b"\x01\x02\x03\r\n\x04\x05\r\n",
    );
    engine.ingest_datagram(&frame, 0).unwrap();
    engine.sweep(engine.config().idle_timeout_us + 1);

    assert!(sink.take().is_empty());
}

// A flow on a port with no registered decoder is dropped silently.
#[test]
fn unregistered_port_dropped() {
    let (mut engine, sink) = inline_engine(EngineConfig::default());

    let frame = telnet_frame([5, 6, 7, 8], 4000, [1, 2, 3, 4], 8080, b"GET / HTTP/1.0\r\n\r\n");
    engine.ingest_datagram(&frame, 0).unwrap();
    engine.sweep(engine.config().idle_timeout_us + 1);

    assert!(sink.take().is_empty());
}

// Decode limits set on the engine config reach the decoder: with a one-line
// minimum, a single-line banner is interesting enough to log.
#[test]
fn config_decode_limits_are_honored() {
    let (mut engine, sink) = inline_engine(EngineConfig {
        min_interesting_lines: 1,
        max_output_bytes: 16,
        ..Default::default()
    });

    let frame = telnet_frame([1, 2, 3, 4], 23, [5, 6, 7, 8], 4000, b"FreeBSD/i386 (example) (ttyp0)\r\n");
    engine.ingest_datagram(&frame, 0).unwrap();
    engine.sweep(engine.config().idle_timeout_us + 1);

    let records = sink.take();
    assert_eq!(records.len(), 1);
    // Output respects the configured bound, not the decoder default.
    assert_eq!(records[0].text, b"FreeBSD/i386 (ex");
}

// Full concurrent wiring: shared engine, background sweeper, decode pool,
// records arriving over a channel.
#[test]
fn pooled_pipeline_with_background_sweeper() {
    let config = EngineConfig {
        idle_timeout_us: 20_000, // 20 ms
        sweep_interval: Duration::from_millis(10),
        ..Default::default()
    };

    let mut registry = DecoderRegistry::new();
    registry.register(TelnetDecoder::from_config(&config));

    let (tx, rx) = mpsc::channel();
    let pool = Arc::new(DecodePool::new(
        2,
        32,
        Arc::new(registry),
        Arc::new(ChannelSink::new(tx)),
    ));

    let engine = Arc::new(Mutex::new(Engine::new(config, pool.clone())));
    let sweeper = Sweeper::spawn(engine.clone());

    for n in 0..4u8 {
        let frame = telnet_frame(
            [10, 0, 0, n],
            4000,
            [10, 0, 0, 200],
            23,
            b"whoami\r\nroot\r\n",
        );
        let now = flowsift::now_micros();
        engine.lock().unwrap().ingest_datagram(&frame, now).unwrap();
    }

    let mut records = Vec::new();
    while records.len() < 4 {
        match rx.recv_timeout(Duration::from_secs(5)) {
            Ok(record) => records.push(record),
            Err(_) => break,
        }
    }

    sweeper.stop();
    pool.shutdown();

    assert_eq!(records.len(), 4);
    assert!(records.iter().all(|r| r.text == b"whoami\r\nroot\r\n"));
    assert_eq!(engine.lock().unwrap().active_flows(), 0);
}

// Shutdown drain pushes whatever is left through the decode pipeline.
#[test]
fn flush_all_drains_through_decoder() {
    let (mut engine, sink) = inline_engine(EngineConfig::default());

    let frame = telnet_frame([5, 6, 7, 8], 4000, [1, 2, 3, 4], 23, b"a\r\nb\r\n");
    engine.ingest_datagram(&frame, 0).unwrap();

    engine.flush_all();
    assert_eq!(engine.active_flows(), 0);
    assert_eq!(sink.take().len(), 1);
}
