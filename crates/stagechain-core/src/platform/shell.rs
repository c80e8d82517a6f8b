//! Opening an executable with the native "open" action.
//!
//! # Platform Behavior
//! - **Windows**: `ShellExecuteW` with the `open` verb, which lets binaries
//!   that demand administrator rights trigger the UAC prompt
//! - **Linux/macOS**: a detached spawn in its own session; there is no
//!   elevation passthrough

use crate::error::LaunchError;
use std::path::Path;
use tracing::debug;

/// Native status codes above this value mean success.
pub const SHELL_SUCCESS_THRESHOLD: isize = 32;

/// Map a native shell status code to a launch result.
pub fn status_code_to_result(code: isize) -> Result<(), LaunchError> {
    if code > SHELL_SUCCESS_THRESHOLD {
        Ok(())
    } else {
        Err(LaunchError::ShellExecuteFailure { code })
    }
}

/// Open `path` with `working_dir` as its current directory.
///
/// Returns as soon as the OS has accepted the request; never waits for the
/// launched program.
pub fn shell_open(path: &Path, working_dir: &Path) -> Result<(), LaunchError> {
    #[cfg(windows)]
    {
        shell_open_windows(path, working_dir)
    }

    #[cfg(not(windows))]
    {
        spawn_detached(path, working_dir)
    }
}

#[cfg(windows)]
#[allow(unsafe_code)]
fn shell_open_windows(path: &Path, working_dir: &Path) -> Result<(), LaunchError> {
    use std::ffi::OsStr;
    use std::os::windows::ffi::OsStrExt;
    use windows_sys::Win32::UI::Shell::ShellExecuteW;
    use windows_sys::Win32::UI::WindowsAndMessaging::SW_SHOWNORMAL;

    fn wide(s: &OsStr) -> Vec<u16> {
        s.encode_wide().chain(std::iter::once(0)).collect()
    }

    let operation = wide(OsStr::new("open"));
    let file = wide(path.as_os_str());
    let directory = wide(working_dir.as_os_str());

    // SAFETY: every string pointer refers to a NUL-terminated UTF-16 buffer
    // that outlives the call. ShellExecuteW accepts a null owner window and
    // null parameters.
    let instance = unsafe {
        ShellExecuteW(
            std::ptr::null_mut(),
            operation.as_ptr(),
            file.as_ptr(),
            std::ptr::null(),
            directory.as_ptr(),
            SW_SHOWNORMAL,
        )
    };

    let code = instance as isize;
    debug!("ShellExecuteW({}) returned {}", path.display(), code);
    status_code_to_result(code)
}

#[cfg(not(windows))]
#[allow(unsafe_code)]
fn spawn_detached(path: &Path, working_dir: &Path) -> Result<(), LaunchError> {
    use std::process::{Command, Stdio};

    let mut cmd = Command::new(path);
    cmd.current_dir(working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;

        // SAFETY: setsid() is async-signal-safe and creates a new session, so
        // the child does not receive our terminal's signals.
        unsafe {
            cmd.pre_exec(|| {
                if libc::setsid() == -1 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }
    }

    let mut child = cmd.spawn().map_err(|e| LaunchError::Unexpected {
        message: e.to_string(),
    })?;
    let pid = child.id();
    debug!("Spawned {} as pid {}", path.display(), pid);

    // Reap the child so it does not linger as a zombie in the process table.
    if let Err(e) = std::thread::Builder::new()
        .name(format!("reap-{}", pid))
        .spawn(move || {
            let _ = child.wait();
        })
    {
        debug!("Could not start reaper for pid {}: {}", pid, e);
    }

    Ok(())
}
