//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `morpheus_core` linkage without the Flutter runtime.
//! - Preview the next trigger for an optional `HH:MM` argument.

use chrono::Local;
use morpheus_core::db::migrations::latest_version;
use morpheus_core::{compute_next_trigger, core_version, ping};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("morpheus_core ping={}", ping());
    println!("morpheus_core version={}", core_version());
    println!("morpheus_core schema_version={}", latest_version());

    let Some(arg) = std::env::args().nth(1) else {
        return ExitCode::SUCCESS;
    };
    let Some((hour_of_day, minute)) = parse_wall_clock(&arg) else {
        eprintln!("expected HH:MM, got `{arg}`");
        return ExitCode::from(2);
    };

    match compute_next_trigger(hour_of_day, minute, &Local::now()) {
        Ok(trigger) => {
            println!("next_trigger={}", trigger.to_rfc3339());
            println!("next_trigger_ms={}", trigger.timestamp_millis());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(2)
        }
    }
}

fn parse_wall_clock(raw: &str) -> Option<(u8, u8)> {
    let (hour, minute) = raw.trim().split_once(':')?;
    Some((hour.parse().ok()?, minute.parse().ok()?))
}
