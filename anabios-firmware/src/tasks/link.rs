//! IP stack watcher
//!
//! Turns embassy-net configuration changes into link events. Events are
//! dropped by the queue while the network manager has no handlers
//! registered.

use defmt::*;
use embassy_net::Stack;

use anabios_hal::LinkEvent;

use crate::channels::LINK_EVENTS;

/// Reason code reported when DHCP loses the address
const REASON_CONFIG_LOST: u16 = 0;

#[embassy_executor::task]
pub async fn link_task(stack: Stack<'static>) {
    info!("Link task started");

    loop {
        stack.wait_config_up().await;

        let address = match stack.config_v4() {
            Some(config) => config.address.address().octets(),
            None => continue,
        };
        info!("IP address acquired: {}", address);
        LINK_EVENTS.publish(LinkEvent::AddressAcquired { address });

        stack.wait_config_down().await;
        warn!("IP configuration lost");
        LINK_EVENTS.publish(LinkEvent::Disconnected {
            reason: REASON_CONFIG_LOST,
        });
    }
}
