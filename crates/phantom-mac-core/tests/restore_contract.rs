//! Contract Test: Restore
//!
//! This test verifies that restores put the recorded original back and
//! only then forget it.
//!
//! Constraints verified:
//! - Restore reloads records written by an earlier run
//! - No record or a declined confirmation means no interface calls
//! - The record is removed only after a successful restore
//! - A failed `down` is reported without a recovery `up`
//! - The gateway is read after the interface is back up
//!
//! If this test fails, operators can lose their original address.

mod common;

use common::*;
use phantom_mac_core::traits::BackupStore;
use phantom_mac_core::{
    ChangeOrchestrator, Error, FileBackupStore, MemoryBackupStore, OrchestratorState,
};
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn change_then_restore_round_trip() {
    let controller = RecordingController::new("aa:bb:cc:dd:ee:ff");
    let store = MemoryBackupStore::new();
    let confirmation = ScriptedConfirmation::new(true);

    let (orchestrator, _events) = ChangeOrchestrator::new(
        Box::new(controller.clone()),
        Box::new(store.clone()),
        Box::new(confirmation.clone()),
        minimal_config(),
    )
    .unwrap();

    orchestrator
        .change_address("eth0", Some("00:11:22:33:44:55"))
        .await
        .unwrap();
    controller.clear_calls();

    let report = assert_ok!(orchestrator.restore_address("eth0").await);

    assert_eq!(report.restored, mac("aa:bb:cc:dd:ee:ff"));
    assert!(report.warnings.is_empty());
    assert_eq!(controller.address(), Some(mac("aa:bb:cc:dd:ee:ff")));
    assert_eq!(store.original("eth0").await, None);
    assert!(store.is_empty().await);

    assert_eq!(
        controller.interface_calls(),
        vec![
            Call::SetUp("eth0".to_string(), false),
            Call::SetAddress("eth0".to_string(), mac("aa:bb:cc:dd:ee:ff")),
            Call::SetUp("eth0".to_string(), true),
        ]
    );

    let prompts = confirmation.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("eth0"));
    assert!(prompts[0].contains("aa:bb:cc:dd:ee:ff"));
}

#[tokio::test]
async fn restore_without_record_fails_cleanly() {
    let controller = RecordingController::new("aa:bb:cc:dd:ee:ff");
    let confirmation = ScriptedConfirmation::new(true);
    let (orchestrator, _events) = ChangeOrchestrator::new(
        Box::new(controller.clone()),
        Box::new(MemoryBackupStore::new()),
        Box::new(confirmation.clone()),
        minimal_config(),
    )
    .unwrap();

    let err = assert_err!(orchestrator.restore_address("eth0").await);

    assert!(matches!(err, Error::NoBackupFound { ref interface } if interface == "eth0"));
    assert!(controller.interface_calls().is_empty());
    assert!(confirmation.prompts().is_empty());
}

#[tokio::test]
async fn declined_confirmation_keeps_everything() {
    let controller = RecordingController::new("00:11:22:33:44:55");
    let store = MemoryBackupStore::new();
    store
        .ensure_backed("eth0", mac("aa:bb:cc:dd:ee:ff"))
        .await
        .unwrap();

    let (orchestrator, mut events) = ChangeOrchestrator::new(
        Box::new(controller.clone()),
        Box::new(store.clone()),
        Box::new(ScriptedConfirmation::new(false)),
        minimal_config(),
    )
    .unwrap();

    let err = orchestrator.restore_address("eth0").await.unwrap_err();

    assert!(matches!(err, Error::CancelledByUser { .. }));
    assert!(controller.interface_calls().is_empty());
    assert_eq!(controller.address(), Some(mac("00:11:22:33:44:55")));
    assert_eq!(store.original("eth0").await, Some(mac("aa:bb:cc:dd:ee:ff")));
    assert_eq!(
        drain_states(&mut events),
        vec![OrchestratorState::Confirming, OrchestratorState::Failed]
    );
}

#[tokio::test]
async fn failed_restore_keeps_record() {
    let controller = RecordingController::new("00:11:22:33:44:55").failing_set();
    let store = MemoryBackupStore::new();
    store
        .ensure_backed("eth0", mac("aa:bb:cc:dd:ee:ff"))
        .await
        .unwrap();

    let (orchestrator, _events) = ChangeOrchestrator::new(
        Box::new(controller.clone()),
        Box::new(store.clone()),
        Box::new(ScriptedConfirmation::new(true)),
        minimal_config(),
    )
    .unwrap();

    let err = orchestrator.restore_address("eth0").await.unwrap_err();

    assert!(matches!(err, Error::AddressMutationFailed { .. }));
    assert_eq!(store.original("eth0").await, Some(mac("aa:bb:cc:dd:ee:ff")));
    assert_eq!(
        controller.interface_calls().last(),
        Some(&Call::SetUp("eth0".to_string(), true))
    );
}

#[tokio::test]
async fn restore_down_failure_is_not_rolled_back() {
    let controller = RecordingController::new("00:11:22:33:44:55").failing_down();
    let store = MemoryBackupStore::new();
    store
        .ensure_backed("eth0", mac("aa:bb:cc:dd:ee:ff"))
        .await
        .unwrap();

    let (orchestrator, _events) = ChangeOrchestrator::new(
        Box::new(controller.clone()),
        Box::new(store.clone()),
        Box::new(ScriptedConfirmation::new(true)),
        minimal_config(),
    )
    .unwrap();

    let err = orchestrator.restore_address("eth0").await.unwrap_err();

    assert!(matches!(err, Error::InterfaceDownFailed { .. }));
    assert_eq!(
        controller.interface_calls(),
        vec![Call::SetUp("eth0".to_string(), false)]
    );
    assert_eq!(store.original("eth0").await, Some(mac("aa:bb:cc:dd:ee:ff")));
}

#[tokio::test]
async fn restore_reads_gateway_after_interface_is_up() {
    let controller = RecordingController::new("00:11:22:33:44:55");
    let store = MemoryBackupStore::new();
    store
        .ensure_backed("eth0", mac("aa:bb:cc:dd:ee:ff"))
        .await
        .unwrap();

    let (orchestrator, mut events) = ChangeOrchestrator::new(
        Box::new(controller.clone()),
        Box::new(store),
        Box::new(ScriptedConfirmation::new(true)),
        minimal_config(),
    )
    .unwrap();

    orchestrator.restore_address("eth0").await.unwrap();

    let calls = controller.calls();
    let up = calls
        .iter()
        .position(|c| *c == Call::SetUp("eth0".to_string(), true))
        .unwrap();
    let gateway = calls.iter().position(|c| *c == Call::DefaultGateway).unwrap();
    assert!(gateway > up);

    assert_eq!(
        drain_states(&mut events),
        vec![
            OrchestratorState::Confirming,
            OrchestratorState::InterfaceDown,
            OrchestratorState::Mutating,
            OrchestratorState::InterfaceUp,
            OrchestratorState::Verifying,
            OrchestratorState::RecordCleared,
            OrchestratorState::Done,
        ]
    );
}

#[tokio::test]
async fn restore_sees_records_from_an_earlier_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("backup.json");

    // Opened before anything is written, like a second invocation racing ahead
    let later_store = FileBackupStore::open(&path).await;
    assert!(later_store.records().await.is_empty());

    let controller = RecordingController::new("aa:bb:cc:dd:ee:ff");
    {
        let (orchestrator, _events) = ChangeOrchestrator::new(
            Box::new(controller.clone()),
            Box::new(FileBackupStore::open(&path).await),
            Box::new(ScriptedConfirmation::new(true)),
            minimal_config(),
        )
        .unwrap();
        orchestrator
            .change_address("eth0", Some("00:11:22:33:44:55"))
            .await
            .unwrap();
    }

    let (orchestrator, _events) = ChangeOrchestrator::new(
        Box::new(controller.clone()),
        Box::new(later_store),
        Box::new(ScriptedConfirmation::new(true)),
        minimal_config(),
    )
    .unwrap();

    let report = orchestrator.restore_address("eth0").await.unwrap();
    assert_eq!(report.restored, mac("aa:bb:cc:dd:ee:ff"));
    assert_eq!(controller.address(), Some(mac("aa:bb:cc:dd:ee:ff")));

    let reopened = FileBackupStore::open(&path).await;
    assert_eq!(reopened.original("eth0").await, None);
}
