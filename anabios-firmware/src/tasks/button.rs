//! User button
//!
//! A 10 s press requests a factory reset. Shorter gestures belong to the
//! actuator layer and are ignored here.

use defmt::*;
use embassy_futures::select::{select, Either};
use embassy_rp::gpio::Input;
use embassy_time::Timer;

use crate::channels::{LifecycleRequest, LIFECYCLE_REQUESTS};

/// Hold time that triggers a factory reset
pub const FACTORY_RESET_HOLD_MS: u64 = 10_000;

#[embassy_executor::task]
pub async fn button_task(mut button: Input<'static>) {
    info!("Button task started");

    loop {
        // Active low with pull-up
        button.wait_for_low().await;

        match select(button.wait_for_high(), Timer::after_millis(FACTORY_RESET_HOLD_MS)).await {
            Either::First(()) => {}
            Either::Second(()) => {
                warn!("Button held for {} ms, requesting factory reset", FACTORY_RESET_HOLD_MS);
                LIFECYCLE_REQUESTS.send(LifecycleRequest::FactoryReset).await;
                button.wait_for_high().await;
            }
        }
    }
}
