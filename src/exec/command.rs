// src/exec/command.rs

use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context, Result};
use tracing::{debug, info};

/// Run `command` through the platform shell in `cwd`, blocking until it
/// exits. Output is logged at debug level; a non-zero exit is an error
/// carrying the command's stderr.
pub fn run_shell(command: &str, cwd: &Path) -> Result<()> {
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(command);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(command);
        c
    };
    cmd.current_dir(cwd);

    info!(cmd = %command, "running external command");
    let output = cmd
        .output()
        .with_context(|| format!("spawning `{command}`"))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    for line in stdout.lines() {
        debug!("stdout: {}", line);
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    for line in stderr.lines() {
        debug!("stderr: {}", line);
    }

    if !output.status.success() {
        let code = output
            .status
            .code()
            .map_or_else(|| "signal".to_string(), |c| c.to_string());
        bail!("`{command}` exited with {code}: {}", stderr.trim());
    }

    Ok(())
}
