use core::sync::atomic::{AtomicU32, Ordering};

use anabios_hal::{BootError, LinkEvent, Namespace, RetainedBlock, StoreError, StoreKey};
use embassy_futures::block_on;

use super::*;
use crate::config::ConfigError;
use crate::network::{NetworkError, NetworkState};
use crate::scratch::COUNTER_TAG;
use crate::settings::SettingsError;
use crate::testing::{
    mark, ports, take_timeline, AccessoryCall, BootCall, FakeAccessory, FakeRetained, MemoryStore,
    RadioCall, StoreOp, TestPlatform,
};

type TestLifecycle = Lifecycle<TestPlatform, FakeAccessory>;

fn lifecycle(ports: Ports<TestPlatform>) -> TestLifecycle {
    Lifecycle::new(LifecycleConfig::default(), ports, FakeAccessory::default()).unwrap()
}

/// Warm reboot: everything but the lifecycle instance survives
fn reboot(lifecycle: TestLifecycle) -> TestLifecycle {
    let (ports, accessory) = lifecycle.release();
    Lifecycle::new(LifecycleConfig::default(), ports, accessory).unwrap()
}

/// Power cycle: the retained block is lost
fn power_cycle(lifecycle: TestLifecycle) -> TestLifecycle {
    let (mut ports, accessory) = lifecycle.release();
    ports.retained = FakeRetained::default();
    Lifecycle::new(LifecycleConfig::default(), ports, accessory).unwrap()
}

fn provisioned(lifecycle: &mut TestLifecycle, ssid: &str, password: &str) {
    block_on(lifecycle.settings().store_credentials(ssid, password)).unwrap();
}

#[test]
fn test_new_rejects_invalid_config() {
    let config = LifecycleConfig {
        restart_debounce_ms: 0,
        ..Default::default()
    };
    let result = Lifecycle::new(config, ports(), FakeAccessory::default());
    assert!(matches!(
        result,
        Err(LifecycleError::Config(ConfigError::ZeroDebounce))
    ));
}

#[test]
fn test_init_store_recovers_incompatible_layout() {
    let mut ports = ports();
    ports.store.init_failure = Some(StoreError::NewVersionFound);
    let mut lc = lifecycle(ports);

    assert_eq!(block_on(lc.init_store()), Ok(()));
    assert_eq!(block_on(lc.init_store()), Ok(()));
    let (ports, _) = lc.release();
    assert_eq!(ports.store.partition_erases, 1);
    assert_eq!(ports.store.init_calls, 2);
}

#[test]
fn test_fresh_boot_counts_one() {
    let mut lc = lifecycle(ports());
    let report = block_on(lc.boot());

    assert_eq!(
        report,
        BootReport {
            restart_count: 1,
            reason: PostResetReason::None,
            factory_reset_triggered: false,
        }
    );
    let (ports, _) = lc.release();
    assert_eq!(ports.timer.armed, Some(5000));
}

#[test]
fn test_debounce_expiry_clears_both_tiers() {
    let mut lc = lifecycle(ports());
    block_on(lc.boot());
    let mut lc = reboot(lc);
    assert_eq!(block_on(lc.boot()).restart_count, 2);

    assert_eq!(block_on(lc.on_restart_debounce_expired()), Ok(()));

    assert_eq!(lc.scratch().restart_count(), Some(0));
    assert_eq!(block_on(lc.settings().load_restart_count()), Ok(0));

    let mut lc = reboot(lc);
    assert_eq!(block_on(lc.boot()).restart_count, 1);
}

#[test]
fn test_warm_reboot_prefers_fresher_scratch() {
    let mut seeded = Settings::new(MemoryStore::new());
    block_on(seeded.save_restart_count(2)).unwrap();

    let mut ports = ports();
    ports.store = seeded.into_store();
    ports.retained = FakeRetained::with_block(RetainedBlock {
        tag: COUNTER_TAG,
        reason: 0,
        restart_count: 5,
    });

    let mut lc = lifecycle(ports);
    assert_eq!(block_on(lc.boot()).restart_count, 6);
    assert_eq!(block_on(lc.settings().load_restart_count()), Ok(6));
}

#[test]
fn test_power_loss_recovers_durable_count() {
    let mut lc = lifecycle(ports());
    for _ in 0..3 {
        block_on(lc.boot());
        lc = reboot(lc);
    }

    let mut lc = power_cycle(lc);
    assert_eq!(lc.scratch().restart_count(), None);
    assert_eq!(block_on(lc.boot()).restart_count, 4);
}

#[test]
fn test_timer_failure_does_not_abort_boot() {
    let mut ports = ports();
    ports.timer.fail_arm = true;
    let mut lc = lifecycle(ports);

    assert_eq!(block_on(lc.boot()).restart_count, 1);
}

#[test]
fn test_crash_loop_triggers_exactly_one_factory_reset() {
    let mut lc = lifecycle(ports());
    let mut triggered = 0;

    for boot in 1..=12u32 {
        let report = block_on(lc.boot());
        if report.factory_reset_triggered {
            triggered += 1;
            assert_eq!(boot, 10);
            assert_eq!(report.restart_count, 0);
            assert_eq!(lc.scratch().restart_count(), Some(0));
            assert_eq!(block_on(lc.settings().load_restart_count()), Ok(0));
        }
        lc = reboot(lc);
    }
    assert_eq!(triggered, 1);

    let (ports, _) = lc.release();
    assert_eq!(ports.restart.restarts, 1);
    let countdown = ports.delay.delays.iter().filter(|&&ms| ms == 1000).count();
    assert_eq!(countdown, 10);
}

#[test]
fn test_factory_reset_reason_reported_after_crash_loop() {
    let mut lc = lifecycle(ports());
    for _ in 0..10 {
        block_on(lc.boot());
        lc = reboot(lc);
    }

    let report = block_on(lc.boot());
    assert_eq!(report.restart_count, 1);
    assert_eq!(report.reason, PostResetReason::FactoryReset);
}

#[test]
fn test_update_reason_round_trip() {
    let mut lc = lifecycle(ports());
    assert_eq!(block_on(lc.request_update_and_reboot()), Ok(()));
    assert_eq!(block_on(lc.settings().update_requested()), Ok(true));

    let mut lc = reboot(lc);
    assert_eq!(block_on(lc.boot()).reason, PostResetReason::Update);

    let mut lc = reboot(lc);
    assert_eq!(block_on(lc.boot()).reason, PostResetReason::None);

    let (ports, _) = lc.release();
    assert_eq!(ports.restart.restarts, 1);
    assert_eq!(ports.boot.calls, [BootCall::SetBoot("factory")]);
}

#[test]
fn test_update_without_factory_slot_records_no_reason() {
    let mut ports = ports();
    ports.boot.has_factory = false;
    let mut lc = lifecycle(ports);

    assert_eq!(
        block_on(lc.request_update_and_reboot()),
        Err(LifecycleError::Boot(BootError::SlotNotFound))
    );
    assert_eq!(lc.scratch().reason(), PostResetReason::None);

    let (ports, _) = lc.release();
    assert_eq!(ports.restart.restarts, 1);
}

#[test]
fn test_update_keeps_identity() {
    let mut lc = lifecycle(ports());
    block_on(lc.request_update_and_reboot()).unwrap();

    assert_eq!(
        lc.accessory().calls,
        [AccessoryCall::Stop, AccessoryCall::WithdrawAdvertisement]
    );
    let (ports, _) = lc.release();
    // Session grace window, then the flush delay before reset
    assert_eq!(ports.delay.delays, [100, 100]);
}

#[test]
fn test_identity_reset_keeps_credentials() {
    let mut lc = lifecycle(ports());
    provisioned(&mut lc, "Home", "secret123");

    assert_eq!(block_on(lc.reset_identity_and_reboot()), Ok(()));
    assert_eq!(
        lc.accessory().calls,
        [
            AccessoryCall::Stop,
            AccessoryCall::WithdrawAdvertisement,
            AccessoryCall::ResetPairings
        ]
    );
    assert!(block_on(lc.settings().load_credentials()).is_ok());

    let mut lc = reboot(lc);
    assert_eq!(block_on(lc.boot()).reason, PostResetReason::IdentityReset);

    let (ports, _) = lc.release();
    assert_eq!(ports.boot.calls, [BootCall::SetBoot("ota_0")]);
    assert_eq!(ports.restart.restarts, 1);
}

#[test]
fn test_factory_reset_erases_everything() {
    let mut lc = lifecycle(ports());
    provisioned(&mut lc, "Home", "secret123");
    block_on(lc.settings().store_installed_version("1.2.0")).unwrap();
    block_on(lc.start_network(|| {})).unwrap();

    assert_eq!(block_on(lc.factory_reset_and_reboot()), Ok(()));

    assert_eq!(lc.scratch().reason(), PostResetReason::FactoryReset);
    assert_eq!(lc.network_state(), NetworkState::Stopped);
    assert_eq!(
        lc.accessory().calls,
        [
            AccessoryCall::ResetPairings,
            AccessoryCall::Stop,
            AccessoryCall::WithdrawAdvertisement
        ]
    );
    assert_eq!(
        block_on(lc.settings().load_credentials()),
        Err(SettingsError::NotProvisioned)
    );
    assert_eq!(block_on(lc.settings().load_installed_version()), Ok(None));

    let (ports, _) = lc.release();
    assert_eq!(
        ports.boot.calls,
        [
            BootCall::SetBoot("factory"),
            BootCall::EraseMetadata,
            BootCall::Erase("ota_1"),
            BootCall::Erase("ota_0")
        ]
    );
    assert_eq!(ports.store.partition_erases, 1);
    assert_eq!(ports.restart.restarts, 1);

    let release = ports.radio.calls.iter().position(|c| *c == RadioCall::Release);
    let restore = ports.radio.calls.iter().position(|c| *c == RadioCall::RestoreDefaults);
    assert!(release.is_some());
    assert!(restore > release);
}

#[test]
fn test_factory_reset_cancels_debounce_timer() {
    let mut lc = lifecycle(ports());
    block_on(lc.boot());

    assert_eq!(block_on(lc.factory_reset_and_reboot()), Ok(()));

    let (ports, _) = lc.release();
    assert_eq!(ports.timer.armed, None);
    assert_eq!(ports.restart.restarts, 1);
}

#[test]
fn test_factory_reset_erases_in_order() {
    let mut lc = lifecycle(ports());
    provisioned(&mut lc, "Home", "secret123");
    block_on(lc.start_network(|| {})).unwrap();
    take_timeline();

    assert_eq!(block_on(lc.factory_reset_and_reboot()), Ok(()));

    assert_eq!(
        take_timeline(),
        [
            "set_boot",
            "reset_pairings",
            "stop_accessory",
            "stop_network",
            "erase_key",
            "erase_key",
            "erase_namespace",
            "erase_namespace",
            "erase_metadata",
            "erase_slot",
            "erase_slot",
            "erase_store",
        ]
    );

    let (ports, _) = lc.release();
    assert_eq!(
        ports.store.ops,
        [
            StoreOp::EraseKey(StoreKey::Ssid),
            StoreOp::EraseKey(StoreKey::Password),
            StoreOp::EraseNamespace(Namespace::Firmware),
            StoreOp::EraseNamespace(Namespace::Lifecycle),
            StoreOp::Deinit,
            StoreOp::ErasePartition,
        ]
    );
}

#[test]
fn test_sequences_succeed_with_idle_accessory_server() {
    let accessory = FakeAccessory {
        idle: true,
        ..Default::default()
    };
    let mut lc = Lifecycle::new(LifecycleConfig::default(), ports(), accessory).unwrap();

    assert_eq!(block_on(lc.request_update_and_reboot()), Ok(()));
    assert_eq!(block_on(lc.reset_identity_and_reboot()), Ok(()));
    assert_eq!(block_on(lc.factory_reset_and_reboot()), Ok(()));

    let (ports, _) = lc.release();
    assert_eq!(ports.restart.restarts, 3);
}

#[test]
fn test_factory_reset_with_failing_storage_still_reboots_once() {
    let mut ports = ports();
    ports.store.fail_erase = true;
    ports.store.fail_commit = true;
    ports.boot.fail_erase = true;
    ports.boot.fail_set_boot = true;
    ports.radio.fail_stop = true;
    let mut accessory = FakeAccessory::default();
    accessory.fail_all = true;
    let mut lc = Lifecycle::new(LifecycleConfig::default(), ports, accessory).unwrap();

    let result = block_on(lc.factory_reset_and_reboot());
    assert!(matches!(result, Err(LifecycleError::Settings(_))));

    let (ports, _) = lc.release();
    assert_eq!(ports.restart.restarts, 1);
}

#[test]
fn test_provisioning_hook_runs_on_shutdown() {
    static STOPPED: AtomicU32 = AtomicU32::new(0);

    let mut lc = lifecycle(ports());
    lc.register_provisioning_shutdown(|| {
        STOPPED.fetch_add(1, Ordering::SeqCst);
    });
    block_on(lc.reset_identity_and_reboot()).unwrap();

    assert_eq!(STOPPED.load(Ordering::SeqCst), 1);
}

#[test]
fn test_provisioning_stops_before_network() {
    let mut lc = lifecycle(ports());
    provisioned(&mut lc, "Home", "");
    block_on(lc.start_network(|| {})).unwrap();
    lc.register_provisioning_shutdown(|| mark("stop_provisioning"));
    take_timeline();

    block_on(lc.request_update_and_reboot()).unwrap();

    assert_eq!(
        take_timeline(),
        ["set_boot", "stop_accessory", "stop_provisioning", "stop_network"]
    );
}

#[test]
fn test_missing_provisioning_hook_is_fine() {
    let mut lc = lifecycle(ports());
    assert_eq!(block_on(lc.reset_identity_and_reboot()), Ok(()));
}

#[test]
fn test_start_network_not_provisioned() {
    let mut lc = lifecycle(ports());
    assert_eq!(
        block_on(lc.start_network(|| {})),
        Err(LifecycleError::Network(NetworkError::NotProvisioned))
    );

    let (ports, _) = lc.release();
    assert!(ports.radio.calls.is_empty());
    assert!(!ports.radio.handlers_registered);
}

#[test]
fn test_link_events_reach_network() {
    static READY: AtomicU32 = AtomicU32::new(0);

    let mut lc = lifecycle(ports());
    provisioned(&mut lc, "Home", "");
    block_on(lc.start_network(|| {
        READY.fetch_add(1, Ordering::SeqCst);
    }))
    .unwrap();

    block_on(lc.handle_link_event(LinkEvent::Started));
    block_on(lc.handle_link_event(LinkEvent::AddressAcquired { address: [10, 0, 0, 7] }));
    assert_eq!(lc.network_state(), NetworkState::Connected);
    assert_eq!(READY.load(Ordering::SeqCst), 1);

    assert_eq!(block_on(lc.stop_network()), Ok(()));
    assert_eq!(lc.network_state(), NetworkState::Stopped);
}

#[test]
fn test_firmware_revision_rejects_empty_fallback() {
    let mut lc = lifecycle(ports());
    assert_eq!(
        block_on(lc.init_firmware_revision("1.4.0", "")),
        Err(LifecycleError::InvalidArgument)
    );
    assert_eq!(block_on(lc.settings().load_installed_version()), Ok(None));
}

#[test]
fn test_firmware_revision_records_running_version() {
    let mut lc = lifecycle(ports());
    assert_eq!(lc.firmware_revision(), "0.0.1");

    assert_eq!(block_on(lc.init_firmware_revision("1.4.0", "0.0.1")), Ok(()));
    assert_eq!(lc.firmware_revision(), "1.4.0");
    assert_eq!(
        block_on(lc.settings().load_installed_version())
            .unwrap()
            .as_deref(),
        Some("1.4.0")
    );
}

#[test]
fn test_firmware_revision_prefers_stored_value() {
    let mut lc = lifecycle(ports());
    block_on(lc.settings().store_installed_version("1.3.0")).unwrap();

    assert_eq!(block_on(lc.init_firmware_revision("1.4.0", "0.0.1")), Ok(()));
    assert_eq!(lc.firmware_revision(), "1.3.0");
}

#[test]
fn test_firmware_revision_uses_fallback() {
    let mut lc = lifecycle(ports());
    assert_eq!(block_on(lc.init_firmware_revision("", "0.9.0")), Ok(()));
    assert_eq!(lc.firmware_revision(), "0.9.0");
}

#[test]
fn test_firmware_revision_store_failure_still_cached() {
    let mut ports = ports();
    ports.store.fail_commit = true;
    let mut lc = lifecycle(ports);

    assert_eq!(
        block_on(lc.init_firmware_revision("1.4.0", "0.0.1")),
        Err(LifecycleError::Settings(SettingsError::Store(StoreError::Flash)))
    );
    assert_eq!(lc.firmware_revision(), "1.4.0");
}

#[test]
fn test_update_trigger_always_resets() {
    let mut lc = lifecycle(ports());
    assert_eq!(block_on(lc.handle_update_trigger(false)), Ok(()));
    assert_eq!(lc.accessory().calls, [AccessoryCall::ClearUpdateTrigger]);

    assert_eq!(block_on(lc.handle_update_trigger(true)), Ok(()));
    assert_eq!(lc.accessory().calls[1], AccessoryCall::ClearUpdateTrigger);
    assert_eq!(lc.scratch().reason(), PostResetReason::Update);

    let (ports, _) = lc.release();
    assert_eq!(ports.restart.restarts, 1);
}
