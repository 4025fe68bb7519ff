//! Implementation of the `jobgate lock` subcommands.

use super::{default_runtime_dir, load_config};
use crate::cli::{LockClearArgs, TargetArgs};
use crate::error::{JobgateError, Result};
use crate::exit_codes;
use crate::lock::{SlotStatus, clear_lock_file, inspect_lock};

pub(super) fn cmd_lock_status(args: TargetArgs) -> Result<i32> {
    let config = load_config(&args, &args.overrides())?;
    let settings = config.lock_settings(&default_runtime_dir());

    let status = inspect_lock(&config.instance_name, &settings)?;

    println!("Instance: {}", status.name);
    println!("  Mutex:      {}", status.mutex);
    println!("  Lock file:  {}", status.file);

    if status.file.stale {
        println!();
        println!(
            "Note: the lock file exceeds the {} min stale threshold. \
             If its holder is gone, run `jobgate lock clear --name {} --force`.",
            config.stale_lock_minutes, status.name
        );
    }

    Ok(if status.is_held() {
        exit_codes::LOCK_NOT_ACQUIRED
    } else {
        exit_codes::SUCCESS
    })
}

pub(super) fn cmd_lock_clear(args: LockClearArgs) -> Result<i32> {
    let config = load_config(&args.target, &args.target.overrides())?;

    if !args.force {
        return Err(JobgateError::Config(format!(
            "refusing to clear lock without --force.\n\n\
             Clearing a lock file while its holder is still running lets a second \
             instance start. Only clear it if the holder has crashed.\n\n\
             To clear the lock, run:\n  jobgate lock clear --name {} --force",
            config.instance_name
        )));
    }

    let settings = config.lock_settings(&default_runtime_dir());
    match clear_lock_file(&config.instance_name, &settings)? {
        Some(cleared) => print_cleared(&cleared),
        None => println!(
            "No lock file for '{}' at {}",
            config.instance_name,
            settings.lock_file_path(&config.instance_name).display()
        ),
    }

    Ok(exit_codes::SUCCESS)
}

fn print_cleared(cleared: &SlotStatus) {
    println!("Cleared lock file: {}", cleared.path.display());
    if let Some(holder) = &cleared.holder {
        println!("  Owner:      {}", holder.owner);
        println!("  PID:        {}", holder.pid);
        println!(
            "  Acquired:   {}",
            holder.acquired_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        println!("  Age:        {}", holder.age_string());
    }
    if cleared.stale {
        println!("  Status:     was STALE");
    }
}
