//! Demangler backed by an external toolchain binary.

use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use swiftsrv_core::demangle::Demangler;
use swiftsrv_core::error::{Result, SwiftSrvError};

use crate::config::DemanglerSection;

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Runs `<program> <args...> <name>` and returns its trimmed stdout.
#[derive(Debug, Clone)]
pub struct CommandDemangler {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandDemangler {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    pub fn from_config(cfg: &DemanglerSection) -> Self {
        Self::new(cfg.program.clone(), cfg.args.clone(), cfg.timeout())
    }
}

impl Demangler for CommandDemangler {
    fn demangle(&self, name: &[u8]) -> Result<String> {
        let name = std::str::from_utf8(name)
            .map_err(|e| SwiftSrvError::Demangle(format!("name is not utf-8: {e}")))?;
        // The name is attacker-controlled; it must never be read as a flag.
        if name.starts_with('-') {
            return Err(SwiftSrvError::Demangle("name must not start with '-'".into()));
        }

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(name)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| SwiftSrvError::Demangle(format!("spawn {}: {e}", self.program)))?;

        // Drain stdout while the child runs; a full pipe would stall it.
        let reader = child.stdout.take().map(|mut stdout| {
            thread::spawn(move || {
                let mut out = Vec::new();
                stdout.read_to_end(&mut out).map(|_| out)
            })
        });

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                // Not joined: a grandchild may still hold the pipe open. The
                // reader exits on its own once the last writer is gone.
                drop(reader);
                return Err(SwiftSrvError::Demangle(format!(
                    "{} did not finish within {:?}",
                    self.program, self.timeout
                )));
            }
            thread::sleep(POLL_INTERVAL);
        };

        let out = match reader {
            Some(reader) => reader
                .join()
                .map_err(|_| SwiftSrvError::Demangle("stdout reader panicked".into()))??,
            None => Vec::new(),
        };

        if !status.success() {
            return Err(SwiftSrvError::Demangle(format!("{} exited with {status}", self.program)));
        }

        let text = String::from_utf8_lossy(&out);
        Ok(text.trim_end_matches(['\r', '\n']).to_string())
    }
}
