// /////////////////////////////////////////////////////////////////////////////
// Lifo
// SPDX-License-Identifier: MIT
// /////////////////////////////////////////////////////////////////////////////

//! Exit-code mapping (SPEC_FULL.md §A "exit-code mapping"): translates the
//! shell's own `$?` convention (spec §4.J "Exit statuses") and bootstrap-
//! level failures into the process's `std::process::ExitCode`.

use std::process::ExitCode;

/// `$?` is already a POSIX-shaped byte (0-255, with 126/127/128+n carrying
/// their usual meaning per spec §7); clamp defensively since nothing in the
/// executor should ever produce a value outside that range.
pub fn from_shell_status(status: i32) -> ExitCode {
    ExitCode::from(clamp_to_byte(status))
}

fn clamp_to_byte(status: i32) -> u8 {
    status.clamp(0, 255) as u8
}

/// A bootstrap-phase failure (bad CLI arguments, unreadable script file,
/// config load failure) that never reached the shell: conventionally 2,
/// distinct from any in-shell exit status.
pub fn from_bootstrap_error(err: &anyhow::Error) -> ExitCode {
    tracing::error!("bootstrap error: {err:#}");
    ExitCode::from(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_status_clamps_to_the_byte_range() {
        assert_eq!(clamp_to_byte(0), 0);
        assert_eq!(clamp_to_byte(127), 127);
        assert_eq!(clamp_to_byte(300), 255);
        assert_eq!(clamp_to_byte(-1), 0);
    }
}
