//! Platform detection utilities

use std::fs;
use std::path::Path;

/// Socket WSLg exposes for its PulseAudio server
const WSLG_PULSE_PATH: &str = "/mnt/wslg/PulseServer";

/// Detect if running in WSL (Windows Subsystem for Linux)
///
/// Checks /proc/version first, then the variable WSL sets for every
/// distribution.
pub fn is_wsl() -> bool {
    fs::read_to_string("/proc/version")
        .map(|contents| is_wsl_kernel(&contents))
        .unwrap_or(false)
        || std::env::var("WSL_DISTRO_NAME").is_ok()
}

fn is_wsl_kernel(version: &str) -> bool {
    let lower = version.to_lowercase();
    lower.contains("microsoft") || lower.contains("wsl")
}

/// PulseAudio server path under WSLg, when present
pub fn wslg_pulse_server() -> Option<&'static str> {
    Path::new(WSLG_PULSE_PATH)
        .exists()
        .then_some(WSLG_PULSE_PATH)
}
