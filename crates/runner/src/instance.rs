/// Single-instance detection.
///
/// Two running copies would both write the same wallpaper file on their own
/// schedules, so a second launch exits early.
use sysinfo::System;

/// True if another process runs the same executable as this one
pub fn another_instance_running() -> bool {
    let Some(exe_name) = std::env::current_exe()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
    else {
        return false;
    };
    let current_pid = sysinfo::get_current_pid().ok();

    let mut system = System::new();
    system.refresh_processes();

    system
        .processes()
        .iter()
        .any(|(pid, process)| {
            // On Linux our own threads are listed as tasks parented to us
            Some(*pid) != current_pid
                && process.parent() != current_pid
                && same_executable(process.name(), &exe_name)
        })
}

/// Compare process names the way the platform does
fn same_executable(process_name: &str, exe_name: &str) -> bool {
    if cfg!(windows) {
        process_name.eq_ignore_ascii_case(exe_name)
    } else {
        process_name == exe_name
    }
}
