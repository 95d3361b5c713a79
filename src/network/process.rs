use std::{
    fs::File,
    path::Path,
    process::{Child, Command, ExitStatus, Stdio},
    thread,
    time::{Duration, Instant},
};

use tracing::{debug, warn};

/// How long a node gets to exit after SIGTERM before it is killed.
const GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Owns a spawned node process; the process is stopped when the guard drops.
#[derive(Debug)]
pub struct ProcessGuard {
    name: String,
    child: Option<Child>,
}

impl ProcessGuard {
    /// Spawns `cmd` with stdout and stderr appended to `log`.
    pub fn spawn(
        name: impl Into<String>,
        mut cmd: Command,
        log: &Path,
    ) -> std::io::Result<Self> {
        let out = File::create(log)?;
        let err = out.try_clone()?;

        let child = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::from(out))
            .stderr(Stdio::from(err))
            .spawn()?;

        let name = name.into();
        debug!(%name, pid = child.id(), "spawned process");

        Ok(Self {
            name,
            child: Some(child),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    /// `Some(status)` once the process is gone.
    pub fn try_exited(&mut self) -> std::io::Result<Option<ExitStatus>> {
        match self.child.as_mut() {
            Some(child) => child.try_wait(),
            None => Ok(None),
        }
    }

    fn terminate(child: &mut Child, name: &str) {
        let pid = nix::unistd::Pid::from_raw(child.id() as i32);

        if let Err(err) = nix::sys::signal::kill(pid, nix::sys::signal::Signal::SIGTERM) {
            // ESRCH means the process has already exited
            if err != nix::Error::ESRCH {
                warn!(%name, %pid, %err, "could not SIGTERM process");
            }
        }

        let started = Instant::now();

        while started.elapsed() < GRACE_PERIOD {
            match child.try_wait() {
                Ok(Some(status)) => {
                    debug!(%name, %status, "process exited");
                    return;
                }
                Ok(None) => thread::sleep(Duration::from_millis(100)),
                Err(err) => {
                    warn!(%name, %err, "error waiting for process");
                    return;
                }
            }
        }

        warn!(%name, %pid, "process ignored SIGTERM, killing");

        if let Err(err) = child.kill().and_then(|_| child.wait()) {
            warn!(%name, %err, "could not kill process");
        }
    }

    pub fn stop(mut self) {
        if let Some(mut child) = self.child.take() {
            Self::terminate(&mut child, &self.name);
        }
    }
}

impl Drop for ProcessGuard {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            Self::terminate(&mut child, &self.name);
        }
    }
}
