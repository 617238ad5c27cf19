//! Adapter behavior: upload gating, protocol transparency, unsupported
//! rejection, edge-triggered telemetry, and thumbnail fallback.

mod support;

use forgekit_core::{EventBus, MachineState, Temperature};
use forgekit_printer::{
    Command, CommandDisposition, CommandOutput, ConnectOptions, PrinterClientAdapter,
    StaticSettings,
};
use std::sync::Arc;
use support::{wait_for, EventLog, MockFactory, MockLegacyClient, MockModernClient};

fn legacy_options() -> ConnectOptions {
    ConnectOptions::new("10.0.0.5", "MOCKSN", "Mock AD4").legacy()
}

fn modern_options() -> ConnectOptions {
    ConnectOptions::new("10.0.0.6", "MOCK5M", "Mock 5M").with_check_code("e5c2")
}

async fn legacy_adapter(
    custom_leds: bool,
) -> (Arc<PrinterClientAdapter>, Arc<MockLegacyClient>, EventLog) {
    let client = MockLegacyClient::new();
    let bus = Arc::new(EventBus::new());
    let log = EventLog::attach(&bus);
    let adapter = Arc::new(PrinterClientAdapter::new(
        MockFactory::with_legacy(client.clone()),
        Arc::new(StaticSettings {
            force_legacy_api: false,
            custom_leds,
        }),
        bus,
    ));
    assert!(adapter.connect(legacy_options()).await);
    (adapter, client, log)
}

async fn modern_adapter(
    custom_leds: bool,
) -> (Arc<PrinterClientAdapter>, Arc<MockModernClient>, EventLog) {
    let client = MockModernClient::new();
    let bus = Arc::new(EventBus::new());
    let log = EventLog::attach(&bus);
    let adapter = Arc::new(PrinterClientAdapter::new(
        MockFactory::with_modern(client.clone()),
        Arc::new(StaticSettings {
            force_legacy_api: false,
            custom_leds,
        }),
        bus,
    ));
    assert!(adapter.connect(modern_options()).await);
    (adapter, client, log)
}

// P1: while an upload holds the connection, gated commands and telemetry
// short-circuit without touching the transport.
#[tokio::test]
async fn upload_blocks_commands_and_polls() {
    let (adapter, client, log) = legacy_adapter(false).await;
    client.hold_uploads();

    let uploader = {
        let adapter = adapter.clone();
        tokio::spawn(async move { adapter.upload_file("/tmp/benchy.gcode", true, false).await })
    };
    wait_for(|| adapter.is_upload_in_progress(), "upload to start").await;
    let calls_before = client.call_names().len();

    // Gated command: refused, not queued
    let disposition = adapter
        .execute_command_with_handling(&Command::HomeAxes)
        .await;
    assert_eq!(disposition, CommandDisposition::Blocked);

    // Telemetry: synthetic snapshot, no fan-out
    let info = adapter.printer_info().await.expect("placeholder snapshot");
    assert_eq!(info.machine_state, MachineState::Uploading);
    assert_eq!(info.status_text, "Uploading File");

    assert_eq!(
        client.call_names().len(),
        calls_before,
        "no transport traffic while the upload lock is held"
    );
    assert_eq!(log.count("command-blocked"), 1);
    assert_eq!(client.call_count("home_axes"), 0);

    client.release_upload();
    assert!(uploader.await.unwrap());

    // Once the upload settles, the same command succeeds normally
    let disposition = adapter
        .execute_command_with_handling(&Command::HomeAxes)
        .await;
    assert!(disposition.is_executed());
    assert_eq!(client.call_count("home_axes"), 1);
}

// P2: concurrent uploads queue FIFO; neither is dropped and the second
// does not start its transfer until the first has released the lock.
#[tokio::test]
async fn concurrent_uploads_run_sequentially() {
    let (adapter, client, log) = legacy_adapter(false).await;
    client.hold_uploads();

    let first = {
        let adapter = adapter.clone();
        tokio::spawn(async move { adapter.upload_file("/tmp/first.gcode", false, false).await })
    };
    wait_for(
        || client.call_count("upload_file:start:first.gcode") == 1,
        "first upload to start",
    )
    .await;

    let second = {
        let adapter = adapter.clone();
        tokio::spawn(async move { adapter.upload_file("/tmp/second.gcode", false, false).await })
    };
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(
        client.call_count("upload_file:start:second.gcode"),
        0,
        "second upload must wait for the first's lock release"
    );

    client.release_upload();
    assert!(first.await.unwrap());

    wait_for(
        || client.call_count("upload_file:start:second.gcode") == 1,
        "second upload to start",
    )
    .await;
    client.release_upload();
    assert!(second.await.unwrap());

    let calls = client.call_names();
    let order: Vec<&str> = calls
        .iter()
        .filter(|c| c.starts_with("upload_file:"))
        .map(String::as_str)
        .collect();
    assert_eq!(
        order,
        vec![
            "upload_file:start:first.gcode",
            "upload_file:end:first.gcode",
            "upload_file:start:second.gcode",
            "upload_file:end:second.gcode",
        ]
    );
    assert_eq!(log.count("upload-started"), 2);
    assert_eq!(log.count("upload-completed"), 2);
    assert_eq!(log.count("upload-lock-released"), 2);
}

// P3: a command mapped on both variants produces the same event sequence
// on either, differing only in which sub-client was invoked.
#[tokio::test]
async fn protocol_transparent_dispatch() {
    let (legacy, legacy_client, legacy_log) = legacy_adapter(false).await;
    let (modern, modern_client, modern_log) = modern_adapter(false).await;
    legacy_log.clear();
    modern_log.clear();

    let on_legacy = legacy
        .execute_command_with_handling(&Command::PauseJob)
        .await;
    let on_modern = modern
        .execute_command_with_handling(&Command::PauseJob)
        .await;

    assert!(on_legacy.is_executed());
    assert!(on_modern.is_executed());
    assert_eq!(legacy_log.names(), modern_log.names());
    assert_eq!(legacy_client.call_count("pause_job"), 1);
    assert_eq!(modern_client.call_count("job_control.pause_job"), 1);
}

// P4: a legacySupported:false command on a legacy connection fails with
// the unsupported message and never reaches the generic error stream.
#[tokio::test]
async fn unsupported_on_legacy_is_quiet() {
    let (adapter, client, log) = legacy_adapter(false).await;
    log.clear();

    let error = adapter
        .execute_command(&Command::SetExternalFiltrationOn)
        .await
        .unwrap_err();
    assert!(error.is_unsupported());
    assert_eq!(
        error.to_string(),
        "Filtration control requires the modern printer API"
    );

    let disposition = adapter
        .execute_command_with_handling(&Command::SetExternalFiltrationOn)
        .await;
    assert_eq!(disposition, CommandDisposition::Unsupported);

    assert_eq!(log.count("command-failed"), 1);
    assert_eq!(log.count("error"), 0, "unsupported must not raise the error event");
    assert_eq!(client.call_count("set_filtration"), 0);

    // Clear platform and material upload follow the same rule
    for command in [
        Command::ClearPlatform,
        Command::SetInternalFiltrationOn,
        Command::SetFiltrationOff,
    ] {
        assert_eq!(
            adapter.execute_command_with_handling(&command).await,
            CommandDisposition::Unsupported
        );
    }
    assert_eq!(log.count("error"), 0);
}

// P5: repeated identical telemetry refreshes the snapshot every time but
// edge-triggers each change event exactly once.
#[tokio::test]
async fn telemetry_changes_are_edge_triggered() {
    let (adapter, client, log) = legacy_adapter(false).await;
    log.clear();

    adapter.printer_info().await.expect("first poll");
    adapter.printer_info().await.expect("second poll");

    assert_eq!(log.count("printer-info-updated"), 2);
    // First observation edges from "never seen"; the identical second
    // poll adds nothing.
    assert_eq!(log.count("machine-state-changed"), 1);
    assert_eq!(log.count("bed-temperature-changed"), 1);
    assert_eq!(log.count("extruder-temperature-changed"), 1);

    // A real change edges again
    client.temps.lock().bed = Temperature::new(60.0, 60.0);
    adapter.printer_info().await.expect("third poll");
    assert_eq!(log.count("bed-temperature-changed"), 2);
    assert_eq!(log.count("machine-state-changed"), 1);
    assert_eq!(log.count("printer-info-updated"), 3);
}

// P7: the legacy thumbnail lookup walks name, then name + ".gx", and
// returns the first hit.
#[tokio::test]
async fn legacy_thumbnail_variant_fallback() {
    let (adapter, client, log) = legacy_adapter(false).await;
    client
        .thumbnails
        .lock()
        .insert("benchy.gx".to_string(), vec![0x89, 0x50, 0x4E, 0x47]);

    let bytes = adapter.legacy_thumbnail("benchy").await;
    assert_eq!(bytes, Some(vec![0x89, 0x50, 0x4E, 0x47]));

    let lookups: Vec<String> = client
        .call_names()
        .into_iter()
        .filter(|c| c.starts_with("get_thumbnail:"))
        .collect();
    assert_eq!(lookups, vec!["get_thumbnail:benchy", "get_thumbnail:benchy.gx"]);
    assert_eq!(log.count("thumbnail-retrieved"), 1);

    // A name with no stored image exhausts every variant and yields None
    client.calls.lock().clear();
    let missing = adapter.legacy_thumbnail("ghost.gx").await;
    assert_eq!(missing, None);
    let lookups: Vec<String> = client
        .call_names()
        .into_iter()
        .filter(|c| c.starts_with("get_thumbnail:"))
        .collect();
    assert_eq!(
        lookups,
        vec![
            "get_thumbnail:ghost.gx",
            "get_thumbnail:ghost.gx.gx",
            "get_thumbnail:ghost"
        ]
    );
}

// Scenario: LED routing respects client type and the custom-LED flag.
#[tokio::test]
async fn led_routing_follows_config_and_client_type() {
    // Legacy connection, custom LEDs off: root-client ledOn
    let (adapter, client, _log) = legacy_adapter(false).await;
    assert!(adapter
        .execute_command_with_handling(&Command::LedOn)
        .await
        .is_executed());
    assert_eq!(client.call_count("led_on"), 1);

    // Modern connection, custom LEDs on: the TCP bypass, not the control
    // channel
    let (adapter, client, _log) = modern_adapter(true).await;
    assert!(adapter
        .execute_command_with_handling(&Command::LedOn)
        .await
        .is_executed());
    assert_eq!(client.call_count("tcp.led_on"), 1);
    assert_eq!(client.call_count("control.set_led:true"), 0);

    // Modern connection, custom LEDs off: the control channel
    let (adapter, client, _log) = modern_adapter(false).await;
    assert!(adapter
        .execute_command_with_handling(&Command::LedOff)
        .await
        .is_executed());
    assert_eq!(client.call_count("control.set_led:false"), 1);
    assert_eq!(client.call_count("tcp.led_off"), 0);

    // The fallback never hijacks non-LED commands
    let (adapter, client, _log) = modern_adapter(true).await;
    assert!(adapter
        .execute_command_with_handling(&Command::HomeAxes)
        .await
        .is_executed());
    assert_eq!(client.call_count("control.home_axes"), 1);
}

// connect() emits connecting then exactly one terminal event, and the
// modern handshake fails fast without a check code.
#[tokio::test]
async fn connect_event_sequences() {
    // Modern without a check code: no client is even constructed
    let client = MockModernClient::new();
    let factory = MockFactory::with_modern(client.clone());
    let bus = Arc::new(EventBus::new());
    let log = EventLog::attach(&bus);
    let adapter =
        PrinterClientAdapter::new(factory.clone(), Arc::new(StaticSettings::default()), bus);

    let connected = adapter
        .connect(ConnectOptions::new("10.0.0.6", "SN", "NoCode"))
        .await;
    assert!(!connected);
    assert_eq!(log.names(), vec!["connecting", "connection-failed"]);
    assert_eq!(
        factory
            .modern_creates
            .load(std::sync::atomic::Ordering::SeqCst),
        0
    );

    // Legacy with a failing handshake
    let client = MockLegacyClient::new();
    client.fail_on("init_control");
    let bus = Arc::new(EventBus::new());
    let log = EventLog::attach(&bus);
    let adapter = PrinterClientAdapter::new(
        MockFactory::with_legacy(client),
        Arc::new(StaticSettings::default()),
        bus,
    );
    assert!(!adapter.connect(legacy_options()).await);
    assert_eq!(log.names(), vec!["connecting", "connection-failed"]);

    // Happy path
    let (_adapter, _client, log) = legacy_adapter(false).await;
    assert_eq!(log.names(), vec!["connecting", "connected"]);
}

#[tokio::test]
async fn dispose_is_idempotent() {
    let (adapter, _client, log) = legacy_adapter(false).await;
    log.clear();

    adapter.dispose();
    assert!(!adapter.is_connected());
    assert_eq!(log.count("disconnected"), 1);

    adapter.dispose();
    assert_eq!(log.count("disconnected"), 1, "second dispose is a no-op");

    // Commands after dispose fail as transport errors, not panics
    let error = adapter.execute_command(&Command::HomeAxes).await.unwrap_err();
    assert!(error.is_transport());
}

// sendRawCmd: reply text on success, empty string plus events on any
// failure, blocked while uploading.
#[tokio::test]
async fn send_raw_cmd_contract() {
    let (adapter, client, log) = legacy_adapter(false).await;
    log.clear();

    let reply = adapter.send_raw_cmd("~M119").await;
    assert!(reply.contains("ok"));
    assert_eq!(log.count("command-executed"), 1);

    client.fail_on("send_raw");
    let reply = adapter.send_raw_cmd("~M119").await;
    assert_eq!(reply, "");
    assert_eq!(log.count("command-failed"), 1);
    assert_eq!(log.count("error"), 1);

    // While an upload holds the lock the raw path is refused too
    let (adapter, client, log) = legacy_adapter(false).await;
    client.hold_uploads();
    let uploader = {
        let adapter = adapter.clone();
        tokio::spawn(async move { adapter.upload_file("/tmp/a.gcode", false, false).await })
    };
    wait_for(|| adapter.is_upload_in_progress(), "upload to start").await;
    log.clear();
    assert_eq!(adapter.send_raw_cmd("~M119").await, "");
    assert_eq!(log.count("command-blocked"), 1);
    client.release_upload();
    assert!(uploader.await.unwrap());
}

// Legacy recent-file listings are cut to their first ten entries; local
// listings are not.
#[tokio::test]
async fn legacy_recent_files_are_truncated() {
    let (adapter, client, log) = legacy_adapter(false).await;
    *client.files.lock() = (0..25).map(|i| format!("print-{:02}.gx", i)).collect();
    log.clear();

    let recent = adapter
        .execute_command_with_handling(&Command::ListRecentFiles)
        .await
        .into_output()
        .and_then(CommandOutput::into_files)
        .expect("recent listing");
    assert_eq!(recent.len(), 10);
    assert_eq!(recent[0], "print-00.gx");

    let local = adapter
        .execute_command_with_handling(&Command::ListLocalFiles)
        .await
        .into_output()
        .and_then(CommandOutput::into_files)
        .expect("local listing");
    assert_eq!(local.len(), 25);

    assert_eq!(log.count("files-listed"), 2);
}

// A failing upload still releases the lock and reports through the
// upload events.
#[tokio::test]
async fn failed_upload_releases_lock() {
    let (adapter, client, log) = legacy_adapter(false).await;
    client.fail_on("upload_file");
    log.clear();

    assert!(!adapter.upload_file("/tmp/bad.gcode", false, false).await);
    assert_eq!(
        log.names(),
        vec!["upload-started", "upload-failed", "error", "upload-lock-released"]
    );
    assert!(!adapter.is_upload_in_progress());

    // The connection is usable again immediately
    assert!(adapter
        .execute_command_with_handling(&Command::HomeAxes)
        .await
        .is_executed());
}

// The legacy four-call fan-out reassembles the normalized snapshot.
#[tokio::test]
async fn legacy_fanout_reassembles_snapshot() {
    let (adapter, client, _log) = legacy_adapter(false).await;
    {
        let mut status = client.status.lock();
        status.machine_status = forgekit_core::LegacyMachineStatus::BuildingFromSd;
        status.move_mode = forgekit_core::LegacyMoveMode::Moving;
        status.current_file = Some("benchy.gx".to_string());
        status.led_on = true;
    }
    client.temps.lock().extruder = Temperature::new(210.0, 210.0);

    let info = adapter.printer_info().await.expect("snapshot");
    assert_eq!(info.machine_state, MachineState::Printing);
    assert_eq!(info.name, "Mock AD4");
    assert_eq!(info.model, "Flashforge Adventurer 4");
    assert_eq!(info.current_file.as_deref(), Some("benchy.gx"));
    assert_eq!(info.led_on, Some(true));
    assert_eq!(info.extruder_temperature.target, 210.0);

    // All four legacy calls happened exactly once
    for call in [
        "get_printer_info",
        "get_temp_info",
        "get_print_status",
        "get_endstop_info",
    ] {
        assert_eq!(client.call_count(call), 1, "{} fan-out call", call);
    }
}
