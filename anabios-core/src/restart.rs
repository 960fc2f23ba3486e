//! Restart counter protocol
//!
//! The counter lives in two tiers: the scratch block (fast, lost on power
//! loss) and the persistent store (durable). Boots reconcile the tiers by
//! taking the larger value, increment it, and write it back to both.

use anabios_hal::{PersistentStore, RetainedMemory};

use crate::scratch::ScratchState;
use crate::settings::{Settings, SettingsError};

/// Effective starting value from the two tiers
///
/// The scratch value only wins when it is strictly fresher.
pub fn reconcile(scratch: Option<u32>, durable: u32) -> u32 {
    match scratch {
        Some(count) if count > durable => count,
        _ => durable,
    }
}

/// Next counter value; `u32::MAX` wraps to zero before the increment
pub fn next_count(count: u32) -> u32 {
    let count = if count == u32::MAX { 0 } else { count };
    count + 1
}

/// Whether a counter value means the device is crash looping
pub fn is_crash_loop(count: u32, threshold: u32) -> bool {
    count >= threshold
}

/// Count this boot in both tiers and return the new value
///
/// Durable read failures count as zero and durable write failures are
/// logged; neither aborts the boot.
pub async fn record_boot<R, S>(scratch: &mut ScratchState<R>, settings: &mut Settings<S>) -> u32
where
    R: RetainedMemory,
    S: PersistentStore,
{
    let durable = match settings.load_restart_count().await {
        Ok(count) => count,
        Err(e) => {
            warn!("[lifecycle] failed to read restart counter: {:?}", e);
            0
        }
    };

    let count = next_count(reconcile(scratch.restart_count(), durable));
    // Best effort; logged inside
    let _ = persist(scratch, settings, count).await;
    count
}

/// Clear the counter in both tiers
pub async fn reset<R, S>(scratch: &mut ScratchState<R>, settings: &mut Settings<S>) -> Result<(), SettingsError>
where
    R: RetainedMemory,
    S: PersistentStore,
{
    info!("[lifecycle] restart counter reset");
    persist(scratch, settings, 0).await
}

async fn persist<R, S>(scratch: &mut ScratchState<R>, settings: &mut Settings<S>, count: u32) -> Result<(), SettingsError>
where
    R: RetainedMemory,
    S: PersistentStore,
{
    scratch.set_restart_count(count);
    settings.save_restart_count(count).await.map_err(|e| {
        warn!("[lifecycle] failed to persist restart counter {}: {:?}", count, e);
        e
    })
}
