//! Anabios - accessory lifecycle firmware
//!
//! Main firmware binary for the Raspberry Pi Pico W. Wires the RP2040 ports
//! into the lifecycle orchestrator and spawns the tasks that drive it.
//!
//! Named after the Greek "anabiosis" (ἀναβίωσις), a return to life.

#![no_std]
#![no_main]

use cyw43_pio::{PioSpi, DEFAULT_CLOCK_DIVIDER};
use defmt::*;
use embassy_executor::Spawner;
use embassy_net::{Config as NetConfig, StackResources};
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::peripherals::PIO0;
use embassy_rp::pio::{InterruptHandler as PioInterruptHandler, Pio};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use anabios_core::{LifecycleConfig, Ports};
use anabios_hal_rp2040::{
    shared_flash, Rp2040BootSelector, Rp2040Radio, Rp2040Restart, Rp2040Retained, Rp2040Store,
    SharedFlash,
};

use crate::accessory::AccessoryBridge;
use crate::channels::LINK_EVENTS;
use crate::platform::{EmbassyTimer, FirmwareLifecycle, PicoW};

mod accessory;
mod channels;
mod platform;
mod tasks;

bind_interrupts!(struct Irqs {
    PIO0_IRQ_0 => PioInterruptHandler<PIO0>;
});

/// Debounce window compiled in from lifecycle.toml
const RESTART_DEBOUNCE_MS: &str = env!("ANABIOS_RESTART_DEBOUNCE_MS");

/// Crash-loop threshold compiled in from lifecycle.toml
const CRASH_LOOP_THRESHOLD: &str = env!("ANABIOS_CRASH_LOOP_THRESHOLD");

/// embassy-net socket slots
const NET_SOCKETS: usize = 5;

/// embassy-net random seed (TCP sequence numbers, DHCP xid)
const NET_SEED: u64 = 0x7c8f_3a2e_9d14_6b5a;

// Static cells (must live forever for task references)
static FLASH: StaticCell<SharedFlash> = StaticCell::new();
static CYW43_STATE: StaticCell<cyw43::State> = StaticCell::new();
static NET_RESOURCES: StaticCell<StackResources<NET_SOCKETS>> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Anabios firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    // Settings store and boot selector share the flash driver
    let flash: &'static SharedFlash = FLASH.init(shared_flash(p.FLASH, p.DMA_CH1));

    // CYW43 over PIO SPI (Pico W wiring: PWR=23, CS=25, DIO=24, CLK=29)
    let fw = cyw43_firmware::CYW43_43439A0;
    let clm = cyw43_firmware::CYW43_43439A0_CLM;

    let pwr = Output::new(p.PIN_23, Level::Low);
    let cs = Output::new(p.PIN_25, Level::High);
    let mut pio = Pio::new(p.PIO0, Irqs);
    let spi = PioSpi::new(
        &mut pio.common,
        pio.sm0,
        DEFAULT_CLOCK_DIVIDER,
        pio.irq0,
        cs,
        p.PIN_24,
        p.PIN_29,
        p.DMA_CH0,
    );

    let state = CYW43_STATE.init(cyw43::State::new());
    let (net_device, control, runner) = cyw43::new(state, pwr, spi, fw).await;
    spawner.spawn(unwrap!(tasks::wifi_task(runner)));
    info!("CYW43 initialized");

    let (stack, runner) = embassy_net::new(
        net_device,
        NetConfig::dhcpv4(Default::default()),
        NET_RESOURCES.init(StackResources::new()),
        NET_SEED,
    );
    spawner.spawn(unwrap!(tasks::net_task(runner)));
    spawner.spawn(unwrap!(tasks::link_task(stack)));

    spawner.spawn(unwrap!(tasks::debounce_task()));

    // User button on GPIO15, active low
    let button = Input::new(p.PIN_15, Pull::Up);
    spawner.spawn(unwrap!(tasks::button_task(button)));

    let ports: Ports<PicoW> = Ports {
        store: Rp2040Store::new(flash),
        retained: unwrap!(Rp2040Retained::take()),
        boot: Rp2040BootSelector::new(flash),
        radio: Rp2040Radio::new(control, clm, &LINK_EVENTS),
        timer: EmbassyTimer,
        delay: embassy_time::Delay,
        restart: Rp2040Restart,
    };

    let lifecycle = match FirmwareLifecycle::new(lifecycle_config(), ports, AccessoryBridge) {
        Ok(lifecycle) => lifecycle,
        Err(e) => {
            error!("Invalid lifecycle configuration: {:?}", e);
            return;
        }
    };
    spawner.spawn(unwrap!(tasks::lifecycle_task(lifecycle)));

    info!("All tasks spawned");
}

/// Lifecycle configuration from the build-time values
fn lifecycle_config() -> LifecycleConfig {
    let defaults = LifecycleConfig::default();
    LifecycleConfig {
        restart_debounce_ms: parse_u32(RESTART_DEBOUNCE_MS).unwrap_or(defaults.restart_debounce_ms),
        crash_loop_threshold: parse_u32(CRASH_LOOP_THRESHOLD).unwrap_or(defaults.crash_loop_threshold),
        ..defaults
    }
}

fn parse_u32(value: &str) -> Option<u32> {
    value.parse().ok()
}
