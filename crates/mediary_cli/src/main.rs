//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `mediary_core` linkage without the Flutter/FFI runtime.
//! - Apply one tap to a preferences file and print the resulting widget
//!   labels, for checking what the home-screen widget would show.
//!
//! Usage: `mediary_cli [inc|dec|show] [prefs-db-path]`

use mediary_core::{
    resolve_day_key, CounterSyncService, MemoryCounterStore, SqliteCounterStore, TapDirection,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("mediary_core ping={}", mediary_core::ping());
    println!("mediary_core version={}", mediary_core::core_version());

    let mut args = std::env::args().skip(1);
    let command = args.next().unwrap_or_else(|| "show".to_string());
    let direction = match command.as_str() {
        "inc" => Some(TapDirection::Increment),
        "dec" => Some(TapDirection::Decrement),
        "show" => None,
        other => {
            eprintln!("unknown command `{other}`; expected inc|dec|show");
            return ExitCode::from(2);
        }
    };

    let result = match args.next() {
        Some(path) => match SqliteCounterStore::open(&path) {
            Ok(store) => run(CounterSyncService::new(store), direction),
            Err(err) => Err(format!("failed to open `{path}`: {err}")),
        },
        None => run(CounterSyncService::new(MemoryCounterStore::new()), direction),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run<S: mediary_core::CounterStore>(
    service: CounterSyncService<S>,
    direction: Option<TapDirection>,
) -> Result<(), String> {
    let today = service.today();
    println!("key={}", resolve_day_key(today));

    if let Some(direction) = direction {
        let value = service
            .apply(direction, today)
            .map_err(|err| err.to_string())?;
        println!("applied={} value={value}", direction.label());
    }

    let views = service.refresh_all(&[0]).map_err(|err| err.to_string())?;
    for view in views {
        println!("instance={} label={}", view.instance, view.label);
    }
    Ok(())
}
