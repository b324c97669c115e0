//! Subprocess lifetime management for untrusted program runs.

/// RAII guard that kills a child process (and its process group on Unix) on
/// drop.
///
/// Wrap a spawned `tokio::process::Child` immediately after `spawn()` so that
/// a timeout or a cancelled future can never leak a runaway interpreter.
/// Call `disarm()` after the process exits normally to prevent the kill.
pub struct ChildGuard {
    child: Option<tokio::process::Child>,
}

impl ChildGuard {
    #[must_use]
    pub fn new(child: tokio::process::Child) -> Self {
        Self { child: Some(child) }
    }

    pub fn child_mut(&mut self) -> &mut tokio::process::Child {
        self.child.as_mut().expect("child present")
    }

    pub fn disarm(&mut self) {
        self.child = None;
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        let Some(child) = self.child.as_mut() else {
            return;
        };
        #[cfg(unix)]
        {
            if let Some(pid) = child.id() {
                unsafe {
                    if libc::killpg(pid as i32, libc::SIGKILL) == -1 {
                        let _ = child.start_kill();
                    }
                }
            }
            let _ = child.try_wait();
        }
        #[cfg(not(unix))]
        {
            let _ = child.start_kill();
            let _ = child.try_wait();
        }
    }
}

/// Put the child process in its own session (Unix only) so the entire
/// process group can be killed via `killpg` in `ChildGuard::drop` — an
/// untrusted program that forks cannot outlive its timeout.
#[cfg(unix)]
pub fn set_new_session(cmd: &mut tokio::process::Command) {
    use std::os::unix::process::CommandExt;
    unsafe {
        cmd.as_std_mut().pre_exec(|| {
            if libc::setsid() == -1 {
                return Err(std::io::Error::last_os_error());
            }
            // Linux-only: ensure the child dies if the verifier dies.
            #[cfg(target_os = "linux")]
            if libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGKILL) == -1 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }
}

#[cfg(not(unix))]
pub fn set_new_session(_cmd: &mut tokio::process::Command) {}
