//! Restart debounce timer
//!
//! Implements the one-shot timer behind [`EmbassyTimer`](crate::platform::EmbassyTimer).
//! A new command while armed replaces the pending one.

use defmt::*;
use embassy_futures::select::{select, Either};
use embassy_time::Timer;

use crate::channels::{DebounceCommand, DEBOUNCE_CMD, DEBOUNCE_EXPIRED};

#[embassy_executor::task]
pub async fn debounce_task() {
    info!("Debounce task started");

    let mut command = DEBOUNCE_CMD.wait().await;
    loop {
        command = match command {
            DebounceCommand::Arm(ms) => {
                match select(Timer::after_millis(ms as u64), DEBOUNCE_CMD.wait()).await {
                    Either::First(()) => {
                        debug!("Debounce timer expired after {} ms", ms);
                        DEBOUNCE_EXPIRED.signal(());
                        DEBOUNCE_CMD.wait().await
                    }
                    Either::Second(next) => next,
                }
            }
            DebounceCommand::Cancel => DEBOUNCE_CMD.wait().await,
        };
    }
}
