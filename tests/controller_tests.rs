mod common;

use anyhow::Result;
use common::{device_form, Call, Harness};
use tokio::runtime::Handle;

use osdp_console::{
    core::{CustomCommandKind, DeviceSetting, QueryKind, Settings, UpsertOutcome},
    engine::{LocalStatus, Nak, NakErrorCode, TransportConfig},
};

fn settings_with(devices: &[(u8, &str)]) -> Settings {
    let mut settings = Settings::default();
    for (address, name) in devices {
        settings
            .devices
            .upsert(DeviceSetting::new(*address, *name), |_| true);
    }
    settings
}

#[tokio::test]
async fn test_start_always_shuts_down_first() -> Result<()> {
    let mut harness = Harness::new(Handle::current(), Settings::default());

    harness
        .controller
        .start_serial_connection("/dev/ttyS1", "19200")?;

    assert_eq!(
        harness.engine.calls(),
        vec![
            Call::Shutdown,
            Call::StartConnection(TransportConfig::Serial {
                port_name: "/dev/ttyS1".to_string(),
                baud_rate: 19200,
            }),
        ]
    );
    assert!(harness.controller.session().is_some());
    Ok(())
}

#[tokio::test]
async fn test_start_replays_registry_in_order() -> Result<()> {
    let mut harness = Harness::new(
        Handle::current(),
        settings_with(&[(5, "Lobby"), (1, "Garage"), (3, "Office")]),
    );

    let session = harness
        .controller
        .start_tcp_server_connection("4900", "115200")?;

    let added: Vec<u8> = harness
        .engine
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            Call::AddDevice(id, spec) => {
                assert_eq!(id, session);
                Some(spec.address)
            }
            _ => None,
        })
        .collect();
    assert_eq!(added, vec![5, 1, 3]);
    Ok(())
}

#[tokio::test]
async fn test_restart_replaces_session() -> Result<()> {
    let mut harness = Harness::new(Handle::current(), settings_with(&[(2, "Door")]));

    let first = harness.controller.start_serial_connection("COM3", "9600")?;
    harness.engine.clear_calls();
    let second = harness
        .controller
        .start_tcp_server_connection("4901", "9600")?;

    assert_ne!(first, second);
    assert_eq!(harness.engine.calls()[0], Call::Shutdown);
    assert_eq!(harness.engine.count(|c| matches!(c, Call::AddDevice(..))), 1);
    assert_eq!(
        harness.controller.settings().tcp_server_connection_settings.port_number,
        4901
    );
    Ok(())
}

#[tokio::test]
async fn test_rejected_device_does_not_abort_replay() -> Result<()> {
    let mut harness = Harness::new(
        Handle::current(),
        settings_with(&[(1, "A"), (2, "B"), (3, "C")]),
    );
    harness.engine.reject_device(2);

    harness.controller.start_serial_connection("COM1", "9600")?;

    assert_eq!(harness.engine.count(|c| matches!(c, Call::AddDevice(..))), 3);
    assert!(harness.controller.session().is_some());
    Ok(())
}

#[tokio::test]
async fn test_failed_start_leaves_no_session() {
    let mut harness = Harness::new(Handle::current(), settings_with(&[(1, "A")]));
    harness.engine.fail_next_start();

    let err = harness
        .controller
        .start_serial_connection("COM9", "9600")
        .unwrap_err();

    assert!(format!("{err:#}").contains("Unable to open"));
    assert!(harness.controller.session().is_none());
    assert_eq!(harness.engine.count(|c| matches!(c, Call::AddDevice(..))), 0);
}

#[tokio::test]
async fn test_invalid_baud_rate_never_reaches_engine() {
    let mut harness = Harness::new(Handle::current(), Settings::default());

    let err = harness
        .controller
        .start_serial_connection("COM1", "fast")
        .unwrap_err();

    assert_eq!(err.to_string(), "Invalid baud rate entered!");
    assert!(harness.engine.calls().is_empty());
    assert_eq!(
        harness.controller.settings().serial_connection_settings.baud_rate,
        9600
    );
}

#[tokio::test]
async fn test_declined_overwrite_calls_engine_once() -> Result<()> {
    let mut harness = Harness::new(Handle::current(), Settings::default());
    harness.controller.start_serial_connection("COM1", "9600")?;
    harness.engine.clear_calls();

    harness
        .controller
        .add_device(&device_form("10", "Front"), |_| true)?;
    let outcome = harness
        .controller
        .add_device(&device_form("10", "Back"), |_| false)?;

    assert_eq!(outcome, UpsertOutcome::Declined);
    assert_eq!(harness.engine.count(|c| matches!(c, Call::AddDevice(..))), 1);
    assert_eq!(harness.controller.registry().len(), 1);
    assert_eq!(harness.controller.registry().get(10).map(|d| d.name.as_str()), Some("Front"));
    Ok(())
}

#[tokio::test]
async fn test_accepted_overwrite_keeps_one_entry() -> Result<()> {
    let mut harness = Harness::new(Handle::current(), Settings::default());

    harness
        .controller
        .add_device(&device_form("10", "Front"), |_| true)?;
    let outcome = harness
        .controller
        .add_device(&device_form("10", "Back"), |existing| existing.name == "Front")?;

    assert!(matches!(outcome, UpsertOutcome::Replaced(ref prev) if prev.name == "Front"));
    let entries = harness.controller.registry().list();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "Back");
    // No session, so the engine was never involved.
    assert!(harness.engine.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_engine_rejection_keeps_registry_entry() -> Result<()> {
    let mut harness = Harness::new(Handle::current(), Settings::default());
    harness.controller.start_serial_connection("COM1", "9600")?;
    harness.engine.reject_device(4);

    let result = harness
        .controller
        .add_device(&device_form("4", "Turnstile"), |_| true);

    assert!(result.is_err());
    assert!(harness.controller.registry().contains(4));
    Ok(())
}

#[tokio::test]
async fn test_remove_absent_address_is_noop() -> Result<()> {
    let mut harness = Harness::new(Handle::current(), settings_with(&[(1, "A")]));

    let removed = harness.controller.remove_device(42)?;

    assert!(removed.is_none());
    assert_eq!(harness.controller.registry().len(), 1);
    assert!(harness.engine.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_remove_with_session_notifies_engine() -> Result<()> {
    let mut harness = Harness::new(Handle::current(), settings_with(&[(1, "A"), (2, "B")]));
    let session = harness.controller.start_serial_connection("COM1", "9600")?;

    let removed = harness.controller.remove_device(2)?;

    assert_eq!(removed.map(|d| d.name), Some("B".to_string()));
    assert!(harness
        .engine
        .calls()
        .contains(&Call::RemoveDevice(session, 2)));
    assert_eq!(harness.controller.registry().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_query_result_is_displayed() -> Result<()> {
    let mut harness = Harness::new(Handle::current(), settings_with(&[(7, "Reader")]));
    harness.controller.start_serial_connection("COM1", "9600")?;

    let handle = harness
        .controller
        .send_query(QueryKind::IdReport, 7)
        .expect("session is open");
    assert_eq!(handle.address(), 7);
    handle.join().await?;

    let notices = harness.drain_notices();
    assert_eq!(notices.len(), 1);
    assert!(!notices[0].is_error());
    assert_eq!(notices[0].title(), "ID report for address 7");
    assert!(notices[0].body().contains("Serial Number: 12345678"));
    Ok(())
}

#[tokio::test]
async fn test_query_timeout_reports_error_and_changes_nothing() -> Result<()> {
    let mut harness = Harness::new(Handle::current(), settings_with(&[(9, "Gate")]));
    let session = harness.controller.start_serial_connection("COM1", "9600")?;
    harness.engine.set_unresponsive(9);
    let before = harness.controller.registry().clone();

    harness
        .controller
        .send_query(QueryKind::LocalStatus, 9)
        .expect("session is open")
        .join()
        .await?;

    let notices = harness.drain_notices();
    assert_eq!(notices.len(), 1);
    assert!(notices[0].is_error());
    assert_eq!(notices[0].title(), "Error on address 9: Local status");
    assert!(notices[0].body().contains("Timeout waiting for reply from address 9"));
    assert_eq!(harness.controller.registry(), &before);
    assert_eq!(harness.controller.session(), Some(session));
    Ok(())
}

#[tokio::test]
async fn test_queries_run_concurrently() -> Result<()> {
    let mut harness = Harness::new(Handle::current(), settings_with(&[(1, "A"), (2, "B")]));
    harness.controller.start_serial_connection("COM1", "9600")?;

    let handles: Vec<_> = [1u8, 2]
        .into_iter()
        .flat_map(|address| {
            [QueryKind::InputStatus, QueryKind::OutputStatus]
                .into_iter()
                .filter_map(|kind| harness.controller.send_query(kind, address))
                .collect::<Vec<_>>()
        })
        .collect();
    assert_eq!(handles.len(), 4);
    for handle in handles {
        handle.join().await?;
    }

    assert_eq!(harness.drain_notices().len(), 4);
    Ok(())
}

#[tokio::test]
async fn test_query_without_session_reports_error() {
    let harness = Harness::new(Handle::current(), settings_with(&[(1, "A")]));

    assert!(harness
        .controller
        .send_query(QueryKind::DeviceCapabilities, 1)
        .is_none());

    let notices = harness.drain_notices();
    assert_eq!(notices.len(), 1);
    assert!(notices[0].is_error());
    assert!(harness.engine.calls().is_empty());
}

#[tokio::test]
async fn test_bad_checksum_command_is_silent_on_success() -> Result<()> {
    let mut harness = Harness::new(Handle::current(), settings_with(&[(3, "A")]));
    harness.controller.start_serial_connection("COM1", "9600")?;

    harness
        .controller
        .send_custom_command(CustomCommandKind::BadChecksum, 3)
        .expect("session is open")
        .join()
        .await?;

    assert!(harness.drain_notices().is_empty());
    let sent = harness
        .engine
        .calls()
        .into_iter()
        .find_map(|call| match call {
            Call::Custom(command) => Some(command),
            _ => None,
        })
        .expect("custom command recorded");
    assert_eq!(sent.address, 3);
    assert!(sent.has_bad_checksum());
    Ok(())
}

#[tokio::test]
async fn test_nak_dedup_through_controller() {
    let mut harness = Harness::new(Handle::current(), Settings::default());
    let nak = || Nak::new(NakErrorCode::from(6));

    harness.publisher.nak(7, nak());
    harness.publisher.nak(7, nak());
    assert_eq!(harness.controller.pump_events(), 1);

    harness.publisher.nak(8, nak());
    harness.publisher.nak(7, nak());
    assert_eq!(harness.controller.pump_events(), 2);

    let titles: Vec<String> = harness
        .drain_notices()
        .iter()
        .map(|notice| notice.title().to_string())
        .collect();
    assert_eq!(
        titles,
        vec![
            "!!! Received NAK reply for address 7 !!!",
            "!!! Received NAK reply for address 8 !!!",
            "!!! Received NAK reply for address 7 !!!",
        ]
    );
}

#[tokio::test]
async fn test_stop_connections_without_session_still_shuts_down() {
    let mut harness = Harness::new(Handle::current(), Settings::default());

    harness.controller.stop_connections();
    harness.controller.stop_connections();

    assert_eq!(harness.engine.calls(), vec![Call::Shutdown, Call::Shutdown]);
}

#[tokio::test]
async fn test_engine_panic_becomes_error_notice() -> Result<()> {
    let mut harness = Harness::new(Handle::current(), settings_with(&[(9, "Gate")]));
    let session = harness.controller.start_serial_connection("COM1", "9600")?;
    harness.engine.set_faulty(9);

    harness
        .controller
        .send_query(QueryKind::LocalStatus, 9)
        .expect("session is open")
        .join()
        .await?;

    let notices = harness.drain_notices();
    assert_eq!(notices.len(), 1);
    assert!(notices[0].is_error());
    assert_eq!(notices[0].title(), "Error on address 9: Local status");
    assert!(notices[0].body().contains("engine fault on address 9"));
    assert_eq!(harness.controller.session(), Some(session));
    Ok(())
}

#[tokio::test]
async fn test_custom_command_panic_becomes_error_notice() -> Result<()> {
    let mut harness = Harness::new(Handle::current(), settings_with(&[(4, "Side")]));
    harness.controller.start_serial_connection("COM1", "9600")?;
    harness.engine.set_faulty(4);

    harness
        .controller
        .send_custom_command(CustomCommandKind::BadChecksum, 4)
        .expect("session is open")
        .join()
        .await?;

    let notices = harness.drain_notices();
    assert_eq!(notices.len(), 1);
    assert!(notices[0].is_error());
    assert_eq!(notices[0].title(), "Error on address 4: Bad CRC/Checksum");
    Ok(())
}

#[tokio::test]
async fn test_pending_query_leaves_controller_usable() -> Result<()> {
    let mut harness = Harness::new(Handle::current(), settings_with(&[(9, "Gate")]));
    harness.controller.start_serial_connection("COM1", "9600")?;
    harness.engine.hold_replies(9);
    harness.engine.set_unresponsive(9);

    let handle = harness
        .controller
        .send_query(QueryKind::LocalStatus, 9)
        .expect("session is open");
    tokio::task::yield_now().await;
    assert!(!handle.is_finished());

    harness.publisher.local_status(9, LocalStatus::default());
    assert_eq!(harness.controller.pump_events(), 1);
    harness
        .controller
        .add_device(&device_form("10", "Side"), |_| true)?;
    assert!(harness.controller.registry().contains(10));

    let early = harness.drain_notices();
    assert_eq!(early.len(), 1);
    assert!(!early[0].is_error());
    assert!(!handle.is_finished());

    harness.engine.release_one();
    handle.join().await?;

    let notices = harness.drain_notices();
    assert_eq!(notices.len(), 1);
    assert!(notices[0].is_error());
    assert_eq!(notices[0].title(), "Error on address 9: Local status");
    Ok(())
}
