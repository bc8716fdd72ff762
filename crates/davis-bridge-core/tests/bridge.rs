mod common;

use std::time::Duration;

use common::{loop_reply, sample_payload, LogCapture};
use davis_bridge_core::bridge::{BridgeContext, Clock};
use davis_bridge_core::channel::{ServerCommand, REALTIME_TAG};
use davis_bridge_core::config::BridgeConfig;
use davis_bridge_core::testing::{RecordingLog, ScriptedSerial, Step};
use pretty_assertions::assert_eq;
use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};

const START: u64 = 1_700_000_000;

type Bridge = BridgeContext<ScriptedSerial, DuplexStream, RecordingLog>;

fn bridge(
    config: &BridgeConfig,
    serial: ScriptedSerial,
    stream: Option<DuplexStream>,
    log: RecordingLog,
) -> Bridge {
    BridgeContext::with_clock(config, serial, stream, log, Clock::starting_at(START))
}

/// Station that wakes and answers one `LOOP 1`
fn answering_station() -> ScriptedSerial {
    let mut serial = ScriptedSerial::new(vec![]);
    serial.on_command("\n", vec![Step::bytes(b"\n\r")]);
    serial.on_command("LOOP 1\n", vec![Step::bytes(&loop_reply(&sample_payload()))]);
    serial
}

async fn read_frame(server: &mut DuplexStream) -> Vec<u8> {
    let len = server.read_u16().await.unwrap() as usize;
    let mut body = vec![0u8; len];
    server.read_exact(&mut body).await.unwrap();
    body
}

async fn send_frame(server: &mut DuplexStream, text: &[u8]) {
    server.write_u16(text.len() as u16).await.unwrap();
    server.write_all(text).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_dispatch_exit_stops() {
    let config = BridgeConfig::default();
    let mut bridge = bridge(&config, ScriptedSerial::new(vec![]), None, RecordingLog::default());
    assert!(!bridge.dispatch(ServerCommand::parse(b"EXIT")).await);
    assert!(bridge.dispatch(ServerCommand::parse(b"ok")).await);
}

#[tokio::test(start_paused = true)]
async fn test_dispatch_interval() {
    let logs = LogCapture::install();
    let config = BridgeConfig::default();
    let mut bridge = bridge(&config, ScriptedSerial::new(vec![]), None, RecordingLog::default());
    assert_eq!(bridge.state().poll_interval, 300);

    assert!(bridge.dispatch(ServerCommand::parse(b"interval 45")).await);
    assert_eq!(bridge.state().poll_interval, 45);

    assert!(bridge.dispatch(ServerCommand::parse(b"Interval 0")).await);
    assert_eq!(bridge.state().poll_interval, 600);

    assert_eq!(logs.count("Interval set to 45 seconds"), 1);
    assert_eq!(logs.count("Interval set to 600 seconds"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_dispatch_unknown_is_logged_verbatim() {
    let logs = LogCapture::install();
    let config = BridgeConfig::default();
    let mut bridge = bridge(&config, ScriptedSerial::new(vec![]), None, RecordingLog::default());

    assert!(bridge.dispatch(ServerCommand::parse(b"frobnicate\0junk")).await);
    assert_eq!(logs.count("Unknown message from server: frobnicate"), 1);
    assert!(!logs.text().contains("junk"));
    assert!(bridge.link().transport().written().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_dispatch_debug_and_truncate() {
    let logs = LogCapture::install();
    let config = BridgeConfig::default();
    let log = RecordingLog {
        file_open: true,
        ..RecordingLog::default()
    };
    let mut bridge = bridge(&config, ScriptedSerial::new(vec![]), None, log);

    bridge.dispatch(ServerCommand::parse(b"debug 1")).await;
    assert_eq!(bridge.log().verbose, Some(true));
    bridge.dispatch(ServerCommand::parse(b"DEBUG 0")).await;
    assert_eq!(bridge.log().verbose, Some(false));

    bridge.dispatch(ServerCommand::parse(b"truncate")).await;
    assert_eq!(bridge.log().truncations, 1);
    assert_eq!(logs.count("Truncated log file"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_truncate_without_log_file() {
    let logs = LogCapture::install();
    let config = BridgeConfig::default();
    let mut bridge = bridge(&config, ScriptedSerial::new(vec![]), None, RecordingLog::default());

    assert!(bridge.dispatch(ServerCommand::Truncate).await);
    assert_eq!(bridge.log().truncations, 0);
    assert_eq!(logs.count("not truncated as it is not open"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_run_forwards_realtime_then_exits() {
    let logs = LogCapture::install();
    let config = BridgeConfig::default();
    let (client, mut server) = duplex(4096);
    let mut bridge = bridge(&config, answering_station(), Some(client), RecordingLog::default());

    let server_side = async {
        let body = read_frame(&mut server).await;
        send_frame(&mut server, b"exit").await;
        body
    };
    let ((), body) = tokio::join!(bridge.run(), server_side);

    assert_eq!(body.len(), 112);
    assert_eq!(&body[..REALTIME_TAG.len()], REALTIME_TAG);
    assert_eq!(&body[REALTIME_TAG.len()..], &sample_payload()[..]);
    assert_eq!(bridge.link().transport().written(), b"\nLOOP 1\n");
    assert_eq!(bridge.link().transport().close_calls(), 1);
    assert_eq!(logs.count("Shutdown requested"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_truncated_frame_is_discarded() {
    let logs = LogCapture::install();
    let config = BridgeConfig::default();
    let (client, mut server) = duplex(4096);
    let mut bridge = bridge(&config, answering_station(), Some(client), RecordingLog::default());

    let server_side = async {
        read_frame(&mut server).await;
        // Announce 50 bytes, deliver 10
        server.write_u16(50).await.unwrap();
        server.write_all(b"interval 1").await.unwrap();
        tokio::time::sleep(Duration::from_secs(20)).await;
        send_frame(&mut server, b"exit").await;
    };
    tokio::join!(bridge.run(), server_side);

    assert_eq!(logs.count("Timed out reading from server"), 1);
    assert_eq!(bridge.state().poll_interval, 300);
    assert_eq!(logs.count("Shutdown requested"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_server_hangup_keeps_polling() {
    let logs = LogCapture::install();
    let config = BridgeConfig::default();
    let (client, server) = duplex(64);
    let serial = ScriptedSerial::new(vec![]);
    let mut bridge = bridge(&config, serial, Some(client), RecordingLog::default());
    drop(server);

    // The bridge outlives the server; stop it after the first boundary
    let _ = tokio::time::timeout(Duration::from_secs(200), bridge.run()).await;

    assert!(!bridge.has_channel());
    assert_eq!(logs.count("Server closed the connection"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_offline_warning_once_then_back_online() {
    let logs = LogCapture::install();
    let config = BridgeConfig::default();
    let mut serial = ScriptedSerial::new(vec![]);
    serial.on_command("LOOP 1\n", vec![]);
    serial.on_command("LOOP 1\n", vec![]);
    serial.on_command("LOOP 1\n", vec![Step::bytes(&loop_reply(&sample_payload()))]);
    let mut bridge = bridge(&config, serial, None, RecordingLog::default());

    bridge.poll().await;
    assert!(!bridge.state().online);
    // Going offline raises exactly one warning of any kind
    assert_eq!(logs.warnings(), 1);
    bridge.poll().await;
    assert!(!bridge.state().online);
    bridge.poll().await;
    assert!(bridge.state().online);

    assert_eq!(logs.warnings(), 1);
    assert_eq!(logs.count("No data for last period"), 1);
    assert_eq!(logs.count("Station back online"), 1);
    assert_eq!(bridge.link().transport().reopen_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_missing_wakeup_echo_is_not_an_alarm() {
    let logs = LogCapture::install();
    let config = BridgeConfig::default();
    let mut serial = ScriptedSerial::new(vec![]);
    for _ in 0..5 {
        serial.on_command("LOOP 1\n", vec![Step::bytes(&loop_reply(&sample_payload()))]);
    }
    let mut bridge = bridge(&config, serial, None, RecordingLog::default());

    for _ in 0..5 {
        bridge.poll().await;
        assert!(bridge.state().online);
    }

    assert_eq!(logs.warnings(), 0);
    assert_eq!(bridge.link().transport().reopen_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_hilow_dump_written() {
    let logs = LogCapture::install();
    let dir = tempfile::tempdir().unwrap();
    let config = BridgeConfig {
        dump_file: dir.path().join("davis.dat"),
        ..BridgeConfig::default()
    };
    let mut serial = ScriptedSerial::new(vec![]);
    serial.on_command("HILOWS\n", vec![Step::bytes(&[0x5A; 438])]);
    let mut bridge = bridge(&config, serial, None, RecordingLog::default());

    assert!(bridge.dispatch(ServerCommand::parse(b"hilow")).await);

    let dump = std::fs::read_to_string(&config.dump_file).unwrap();
    let flat = dump.lines().next().unwrap();
    assert_eq!(flat.matches("5a ").count(), 436);
    assert!(dump.contains("\n432: 5a(090) "));
    assert!(!dump.contains("\n440: "));
    assert_eq!(logs.count("hilow: written file"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_incomplete_graph_not_dumped() {
    let dir = tempfile::tempdir().unwrap();
    let config = BridgeConfig {
        dump_file: dir.path().join("davis.dat"),
        ..BridgeConfig::default()
    };
    let mut serial = ScriptedSerial::new(vec![]);
    serial.on_command("GETEE\n", vec![Step::bytes(&[1; 100])]);
    let mut bridge = bridge(&config, serial, None, RecordingLog::default());

    assert!(bridge.dispatch(ServerCommand::Graph).await);
    assert!(!config.dump_file.exists());
}

#[tokio::test(start_paused = true)]
async fn test_loop_command_logs_summary_and_dumps() {
    let logs = LogCapture::install();
    let dir = tempfile::tempdir().unwrap();
    let config = BridgeConfig {
        dump_file: dir.path().join("davis.dat"),
        ..BridgeConfig::default()
    };
    let mut bridge = bridge(&config, answering_station(), None, RecordingLog::default());

    assert!(bridge.dispatch(ServerCommand::Loop).await);

    assert_eq!(logs.count("Data LOO0x14 Hg29.92"), 1);
    let dump = std::fs::read_to_string(&config.dump_file).unwrap();
    assert!(dump.starts_with("4c 4f 4f 14 "));
    assert_eq!(dump.lines().next().unwrap().matches(' ').count(), 99);
}

#[tokio::test(start_paused = true)]
async fn test_loop_command_dumps_frame_with_bad_crc() {
    let logs = LogCapture::install();
    let dir = tempfile::tempdir().unwrap();
    let config = BridgeConfig {
        dump_file: dir.path().join("davis.dat"),
        ..BridgeConfig::default()
    };
    let mut reply = loop_reply(&sample_payload());
    reply[20] ^= 0xFF;
    let mut serial = ScriptedSerial::new(vec![]);
    serial.on_command("LOOP 1\n", vec![Step::bytes(&reply)]);
    let mut bridge = bridge(&config, serial, None, RecordingLog::default());

    assert!(bridge.dispatch(ServerCommand::Loop).await);

    assert_eq!(logs.count("loop: CRC mismatch"), 1);
    assert_eq!(logs.count("Data LOO"), 0);
    let dump = std::fs::read_to_string(&config.dump_file).unwrap();
    assert_eq!(dump.lines().next().unwrap().matches(' ').count(), 99);
}

#[tokio::test(start_paused = true)]
async fn test_loop_command_without_ack_not_dumped() {
    let dir = tempfile::tempdir().unwrap();
    let config = BridgeConfig {
        dump_file: dir.path().join("davis.dat"),
        ..BridgeConfig::default()
    };
    let mut reply = loop_reply(&sample_payload());
    reply[0] = 0x21;
    let mut serial = ScriptedSerial::new(vec![]);
    serial.on_command("LOOP 1\n", vec![Step::bytes(&reply)]);
    let mut bridge = bridge(&config, serial, None, RecordingLog::default());

    assert!(bridge.dispatch(ServerCommand::Loop).await);
    assert!(!config.dump_file.exists());
}
