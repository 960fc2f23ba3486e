//! In-memory port fakes for host tests
//!
//! Every fake records the calls it receives and has switches to inject
//! failures.

use std::cell::RefCell;
use std::vec::Vec;

use anabios_hal::{
    BootError, BootSelector, BootSlot, Namespace, OneShotTimer, PersistentStore, RadioError, Restart,
    RetainedBlock, RetainedMemory, SlotKind, StationConfig, StationRadio, StoreError, StoreKey, TimerError,
};
use embedded_hal_async::delay::DelayNs;

use crate::accessory::{Accessory, AccessoryError};
use crate::platform::{Platform, Ports};

std::thread_local! {
    static TIMELINE: RefCell<Vec<&'static str>> = const { RefCell::new(Vec::new()) };
}

/// Append a step to this thread's cross-port timeline
pub fn mark(step: &'static str) {
    TIMELINE.with(|timeline| timeline.borrow_mut().push(step));
}

/// Drain this thread's timeline
pub fn take_timeline() -> Vec<&'static str> {
    TIMELINE.with(|timeline| timeline.take())
}

/// Destructive store operations, in call order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    EraseKey(StoreKey),
    EraseNamespace(Namespace),
    Deinit,
    ErasePartition,
}

/// Key/value store held in RAM
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Vec<(StoreKey, Vec<u8>)>,
    initialized: bool,
    /// Error returned by the next `init` call
    pub init_failure: Option<StoreError>,
    /// Make every erase fail
    pub fail_erase: bool,
    /// Make every commit fail
    pub fail_commit: bool,
    pub init_calls: u32,
    pub partition_erases: u32,
    pub commits: Vec<Namespace>,
    pub ops: Vec<StoreOp>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw stored value
    pub fn raw(&self, key: StoreKey) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_slice())
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.initialized {
            Ok(())
        } else {
            Err(StoreError::NotInitialized)
        }
    }
}

impl PersistentStore for MemoryStore {
    async fn init(&mut self) -> Result<(), StoreError> {
        self.init_calls += 1;
        if let Some(e) = self.init_failure.take() {
            return Err(e);
        }
        self.initialized = true;
        Ok(())
    }

    async fn deinit(&mut self) -> Result<(), StoreError> {
        self.ops.push(StoreOp::Deinit);
        self.check()?;
        self.initialized = false;
        Ok(())
    }

    async fn erase_partition(&mut self) -> Result<(), StoreError> {
        self.partition_erases += 1;
        self.ops.push(StoreOp::ErasePartition);
        mark("erase_store");
        if self.fail_erase {
            return Err(StoreError::Flash);
        }
        self.entries.clear();
        Ok(())
    }

    async fn read(&mut self, key: StoreKey, buffer: &mut [u8]) -> Result<usize, StoreError> {
        self.check()?;
        let value = self.raw(key).ok_or(StoreError::NotFound)?;
        if value.len() > buffer.len() {
            return Err(StoreError::BufferTooSmall);
        }
        buffer[..value.len()].copy_from_slice(value);
        Ok(value.len())
    }

    async fn write(&mut self, key: StoreKey, data: &[u8]) -> Result<(), StoreError> {
        self.check()?;
        self.entries.retain(|(k, _)| *k != key);
        self.entries.push((key, data.to_vec()));
        Ok(())
    }

    async fn erase_key(&mut self, key: StoreKey) -> Result<(), StoreError> {
        self.check()?;
        self.ops.push(StoreOp::EraseKey(key));
        mark("erase_key");
        if self.fail_erase {
            return Err(StoreError::Flash);
        }
        let before = self.entries.len();
        self.entries.retain(|(k, _)| *k != key);
        if self.entries.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn erase_namespace(&mut self, namespace: Namespace) -> Result<(), StoreError> {
        self.check()?;
        self.ops.push(StoreOp::EraseNamespace(namespace));
        mark("erase_namespace");
        if self.fail_erase {
            return Err(StoreError::Flash);
        }
        self.entries.retain(|(k, _)| k.namespace() != namespace);
        Ok(())
    }

    async fn commit(&mut self, namespace: Namespace) -> Result<(), StoreError> {
        self.check()?;
        if self.fail_commit {
            return Err(StoreError::Flash);
        }
        self.commits.push(namespace);
        Ok(())
    }
}

/// Retained block held in a plain field
#[derive(Debug, Default)]
pub struct FakeRetained {
    block: RetainedBlock,
}

impl FakeRetained {
    pub fn with_block(block: RetainedBlock) -> Self {
        Self { block }
    }

    pub fn block(&self) -> RetainedBlock {
        self.block
    }
}

impl RetainedMemory for FakeRetained {
    fn load(&self) -> RetainedBlock {
        self.block
    }

    fn store(&mut self, block: RetainedBlock) {
        self.block = block;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootCall {
    SetBoot(&'static str),
    Erase(&'static str),
    EraseMetadata,
}

const FACTORY: BootSlot = BootSlot {
    label: "factory",
    kind: SlotKind::Factory,
    offset: 0x1_0000,
    size: 0x6_0000,
};

const OTA_0: BootSlot = BootSlot {
    label: "ota_0",
    kind: SlotKind::Updatable,
    offset: 0x7_0000,
    size: 0x6_0000,
};

const OTA_1: BootSlot = BootSlot {
    label: "ota_1",
    kind: SlotKind::Updatable,
    offset: 0xD_0000,
    size: 0x6_0000,
};

/// Partition table with factory, ota_0 and ota_1, running from ota_0
#[derive(Debug)]
pub struct FakeBoot {
    pub has_factory: bool,
    pub fail_set_boot: bool,
    pub fail_erase: bool,
    pub calls: Vec<BootCall>,
}

impl FakeBoot {
    pub fn new() -> Self {
        Self {
            has_factory: true,
            fail_set_boot: false,
            fail_erase: false,
            calls: Vec::new(),
        }
    }

    fn slots(&self) -> impl Iterator<Item = BootSlot> + '_ {
        [FACTORY, OTA_0, OTA_1]
            .into_iter()
            .filter(|slot| self.has_factory || !slot.is_factory())
    }
}

impl BootSelector for FakeBoot {
    fn factory_slot(&self) -> Option<BootSlot> {
        self.slots().find(|slot| slot.is_factory())
    }

    fn running_slot(&self) -> Option<BootSlot> {
        Some(OTA_0)
    }

    fn find_slot(&self, label: &str) -> Option<BootSlot> {
        self.slots().find(|slot| slot.label == label)
    }

    async fn set_boot_slot(&mut self, slot: BootSlot) -> Result<(), BootError> {
        if self.fail_set_boot {
            return Err(BootError::Flash);
        }
        self.calls.push(BootCall::SetBoot(slot.label));
        mark("set_boot");
        Ok(())
    }

    async fn erase_slot(&mut self, slot: BootSlot) -> Result<(), BootError> {
        if slot.is_factory() {
            return Err(BootError::NotUpdatable);
        }
        if self.fail_erase {
            return Err(BootError::Flash);
        }
        self.calls.push(BootCall::Erase(slot.label));
        mark("erase_slot");
        Ok(())
    }

    async fn erase_metadata(&mut self) -> Result<(), BootError> {
        if self.fail_erase {
            return Err(BootError::Flash);
        }
        self.calls.push(BootCall::EraseMetadata);
        mark("erase_metadata");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioCall {
    InitStack,
    RegisterHandlers,
    UnregisterHandlers,
    Configure,
    Start,
    Connect,
    Disconnect,
    Stop,
    Release,
    RestoreDefaults,
}

/// Radio recording every call
#[derive(Debug, Default)]
pub struct FakeRadio {
    pub calls: Vec<RadioCall>,
    pub config: Option<StationConfig>,
    pub handlers_registered: bool,
    pub stack_initialized: bool,
    pub fail_start: bool,
    pub fail_stop: bool,
    pub fail_release: bool,
}

impl StationRadio for FakeRadio {
    async fn init_stack(&mut self) -> Result<(), RadioError> {
        self.calls.push(RadioCall::InitStack);
        if self.stack_initialized {
            return Err(RadioError::AlreadyInitialized);
        }
        self.stack_initialized = true;
        Ok(())
    }

    fn register_handlers(&mut self) -> Result<(), RadioError> {
        self.calls.push(RadioCall::RegisterHandlers);
        self.handlers_registered = true;
        Ok(())
    }

    fn unregister_handlers(&mut self) -> Result<(), RadioError> {
        self.calls.push(RadioCall::UnregisterHandlers);
        self.handlers_registered = false;
        Ok(())
    }

    async fn configure(&mut self, config: &StationConfig) -> Result<(), RadioError> {
        self.calls.push(RadioCall::Configure);
        self.config = Some(config.clone());
        Ok(())
    }

    async fn start(&mut self) -> Result<(), RadioError> {
        self.calls.push(RadioCall::Start);
        if self.fail_start {
            return Err(RadioError::Driver);
        }
        Ok(())
    }

    async fn connect(&mut self) -> Result<(), RadioError> {
        self.calls.push(RadioCall::Connect);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), RadioError> {
        self.calls.push(RadioCall::Disconnect);
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), RadioError> {
        self.calls.push(RadioCall::Stop);
        mark("stop_network");
        if self.fail_stop {
            return Err(RadioError::Driver);
        }
        Ok(())
    }

    async fn release(&mut self) -> Result<(), RadioError> {
        self.calls.push(RadioCall::Release);
        if self.fail_release {
            return Err(RadioError::InvalidState);
        }
        self.stack_initialized = false;
        Ok(())
    }

    async fn restore_defaults(&mut self) -> Result<(), RadioError> {
        self.calls.push(RadioCall::RestoreDefaults);
        Ok(())
    }
}

/// Timer remembering its armed timeout
#[derive(Debug, Default)]
pub struct FakeTimer {
    pub armed: Option<u32>,
    pub arm_calls: u32,
    pub fail_arm: bool,
}

impl OneShotTimer for FakeTimer {
    fn arm(&mut self, timeout_ms: u32) -> Result<(), TimerError> {
        self.arm_calls += 1;
        if self.fail_arm {
            return Err(TimerError::Create);
        }
        self.armed = Some(timeout_ms);
        Ok(())
    }

    fn cancel(&mut self) -> Result<(), TimerError> {
        self.armed = None;
        Ok(())
    }
}

/// Delay that only adds up the requested time
#[derive(Debug, Default)]
pub struct FakeDelay {
    pub elapsed_ms: u64,
    pub delays: Vec<u32>,
}

impl DelayNs for FakeDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ms += u64::from(ns / 1_000_000);
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.elapsed_ms += u64::from(ms);
        self.delays.push(ms);
    }
}

/// Reset that only counts
#[derive(Debug, Default)]
pub struct FakeRestart {
    pub restarts: u32,
}

impl Restart for FakeRestart {
    fn restart(&mut self) {
        self.restarts += 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessoryCall {
    Stop,
    WithdrawAdvertisement,
    ResetPairings,
    ClearUpdateTrigger,
}

/// Accessory collaborator recording every call
#[derive(Debug, Default)]
pub struct FakeAccessory {
    pub calls: Vec<AccessoryCall>,
    pub fail_all: bool,
    /// Server never started: stop and withdraw find nothing to do
    pub idle: bool,
}

impl FakeAccessory {
    fn outcome(&self) -> Result<(), AccessoryError> {
        if self.fail_all {
            Err(AccessoryError::Failed)
        } else {
            Ok(())
        }
    }
}

impl Accessory for FakeAccessory {
    async fn stop(&mut self) -> Result<(), AccessoryError> {
        self.calls.push(AccessoryCall::Stop);
        mark("stop_accessory");
        if self.idle {
            return Err(AccessoryError::NotRunning);
        }
        self.outcome()
    }

    async fn withdraw_advertisement(&mut self) -> Result<(), AccessoryError> {
        self.calls.push(AccessoryCall::WithdrawAdvertisement);
        if self.idle {
            return Err(AccessoryError::NotFound);
        }
        self.outcome()
    }

    async fn reset_pairings(&mut self) -> Result<(), AccessoryError> {
        self.calls.push(AccessoryCall::ResetPairings);
        mark("reset_pairings");
        self.outcome()
    }

    fn clear_update_trigger(&mut self) {
        self.calls.push(AccessoryCall::ClearUpdateTrigger);
    }
}

/// Platform made of the fakes above
pub struct TestPlatform;

impl Platform for TestPlatform {
    type Store = MemoryStore;
    type Retained = FakeRetained;
    type Boot = FakeBoot;
    type Radio = FakeRadio;
    type Timer = FakeTimer;
    type Delay = FakeDelay;
    type Restart = FakeRestart;
}

/// Fresh set of fake ports
pub fn ports() -> Ports<TestPlatform> {
    Ports {
        store: MemoryStore::new(),
        retained: FakeRetained::default(),
        boot: FakeBoot::new(),
        radio: FakeRadio::default(),
        timer: FakeTimer::default(),
        delay: FakeDelay::default(),
        restart: FakeRestart::default(),
    }
}
