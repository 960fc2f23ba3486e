//! Build script for anabios-firmware
//!
//! - Validates lifecycle.toml at compile time
//! - Exports the lifecycle values as `ANABIOS_*` compile-time env vars
//! - Generates memory.x for the image slot the build targets

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Image slots; must match the layout in anabios-hal-rp2040's flash module
const SLOTS: &[(&str, u32)] = &[
    ("factory", 0x0001_0000),
    ("ota_0", 0x0007_0000),
    ("ota_1", 0x000D_0000),
    ("ota_2", 0x0013_0000),
];

/// Size of every image slot
const IMAGE_SIZE: u32 = 384 * 1024;

/// Start of the XIP window
const XIP_BASE: u32 = 0x1000_0000;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let config = validate_config();
    export_lifecycle(&config);
    setup_linker(&config);
}

/// Validate lifecycle.toml and return its parsed contents
fn validate_config() -> toml::Value {
    println!("cargo:rerun-if-changed=lifecycle.toml");

    let config_path = Path::new("lifecycle.toml");
    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: lifecycle.toml not found!                                ║\n\
            ║                                                                  ║\n\
            ║  The firmware requires a lifecycle.toml configuration file       ║\n\
            ║  in the anabios-firmware directory.                              ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => fail("Failed to read lifecycle.toml", &[e.to_string()]),
    };

    let config: toml::Value = match toml::from_str(&content) {
        Ok(value) => value,
        Err(e) => fail(
            "Invalid TOML syntax in lifecycle.toml",
            &e.to_string().lines().map(str::to_string).collect::<Vec<_>>(),
        ),
    };

    let mut errors = Vec::new();

    match config.get("lifecycle") {
        Some(toml::Value::Table(lifecycle)) => {
            match lifecycle.get("restart_debounce_ms") {
                Some(toml::Value::Integer(ms)) if *ms > 0 && *ms <= u32::MAX as i64 => {}
                Some(_) => errors.push("[lifecycle] restart_debounce_ms must be 1-4294967295".into()),
                None => errors.push("[lifecycle] missing 'restart_debounce_ms'".into()),
            }
            match lifecycle.get("crash_loop_threshold") {
                Some(toml::Value::Integer(n)) if *n > 0 && *n <= 1000 => {}
                Some(_) => errors.push("[lifecycle] crash_loop_threshold must be 1-1000".into()),
                None => errors.push("[lifecycle] missing 'crash_loop_threshold'".into()),
            }
        }
        _ => errors.push("Missing [lifecycle] section".into()),
    }

    match config.get("firmware").and_then(|f| f.get("version")) {
        Some(toml::Value::String(version)) if !version.is_empty() && version.len() <= 32 => {}
        Some(_) => errors.push("[firmware] version must be a 1-32 character string".into()),
        None => errors.push("Missing [firmware] version".into()),
    }

    match config.get("image").and_then(|i| i.get("slot")) {
        Some(toml::Value::String(slot)) if SLOTS.iter().any(|(label, _)| label == slot) => {}
        Some(_) => errors.push("[image] slot must be factory, ota_0, ota_1 or ota_2".into()),
        None => errors.push("Missing [image] slot".into()),
    }

    if !errors.is_empty() {
        fail("Invalid lifecycle configuration", &errors);
    }

    println!("cargo:warning=lifecycle.toml validated successfully");
    config
}

/// Export validated values to the firmware
fn export_lifecycle(config: &toml::Value) {
    let lifecycle = &config["lifecycle"];
    println!(
        "cargo:rustc-env=ANABIOS_RESTART_DEBOUNCE_MS={}",
        lifecycle["restart_debounce_ms"]
    );
    println!(
        "cargo:rustc-env=ANABIOS_CRASH_LOOP_THRESHOLD={}",
        lifecycle["crash_loop_threshold"]
    );
    if let Some(version) = config["firmware"]["version"].as_str() {
        println!("cargo:rustc-env=ANABIOS_FIRMWARE_VERSION={}", version);
    }
}

/// Write memory.x for the configured slot and add it to the linker path
fn setup_linker(config: &toml::Value) {
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR not set"));

    let slot = config["image"]["slot"].as_str().unwrap_or("factory");
    let offset = SLOTS
        .iter()
        .find(|(label, _)| *label == slot)
        .map(|(_, offset)| *offset)
        .unwrap_or(SLOTS[0].1);

    // The image starts from the loader, not boot2. BOOT2 stays declared
    // because link-rp.x places the boot2 stage; it is the same stage the
    // loader carries at that address.
    let memory_x = format!(
        "MEMORY {{\n    \
            BOOT2 : ORIGIN = 0x{:08X}, LENGTH = 0x100\n    \
            FLASH : ORIGIN = 0x{:08X}, LENGTH = 0x{:X}\n    \
            RAM   : ORIGIN = 0x20000000, LENGTH = 256K\n\
        }}\n",
        XIP_BASE,
        XIP_BASE + offset,
        IMAGE_SIZE,
    );

    let mut f = File::create(out_dir.join("memory.x")).expect("create memory.x");
    f.write_all(memory_x.as_bytes()).expect("write memory.x");

    println!("cargo:rustc-link-search={}", out_dir.display());
    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tlink-rp.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
}

/// Abort the build with a boxed error listing
fn fail(title: &str, lines: &[String]) -> ! {
    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<56} ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title,
        lines
            .iter()
            .map(|e| format!("║  • {:<62} ║", e))
            .collect::<Vec<_>>()
            .join("\n")
    );
}
