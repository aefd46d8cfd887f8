use std::path::Path;

use async_trait::async_trait;
use log::{debug, error, trace};
use tokio::process::Command;

use bindery_backend::{CommandOutput, CommandRunner, LifecycleError};

/// Runs external commands through `tokio::process`, capturing output and
/// exit status. Spawn failures are errors; non-zero exits are reported in
/// the returned output for the caller to judge.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioCommandRunner;

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        cwd: &Path,
    ) -> Result<CommandOutput, LifecycleError> {
        debug!("executing `{program} {}' in {}", args.join(" "), cwd.display());

        let output = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .output()
            .await
            .map_err(|err| {
                error!("failed to spawn `{program}': {err}");
                LifecycleError::from(err)
            })?;

        trace!("stdout: {}", String::from_utf8_lossy(&output.stdout));
        if !output.stderr.is_empty() {
            trace!("stderr: {}", String::from_utf8_lossy(&output.stderr));
        }

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}
