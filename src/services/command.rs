use std::process::{Command, Stdio};

use crate::ports::command::{
    CommandError, CommandInvocation, CommandOutput, CommandRunner, Verbosity,
};

/// Runs invocations as real child processes.
///
/// Output goes to the terminal when the invocation's threshold is met,
/// otherwise stdout is captured and stderr only surfaces in debug logs when
/// the tool fails.
pub struct SystemCommandRunner {
    verbosity: Verbosity,
}

impl SystemCommandRunner {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }
}

impl CommandRunner for SystemCommandRunner {
    fn run(&self, invocation: &CommandInvocation) -> Result<CommandOutput, CommandError> {
        let program =
            which::which(&invocation.program).map_err(|source| CommandError::NotFound {
                program: invocation.program.clone(),
                source,
            })?;

        let mut command = Command::new(&program);
        command.args(&invocation.args).stdin(Stdio::null());
        if let Some(dir) = &invocation.current_dir {
            command.current_dir(dir);
        }

        log::debug!(
            "Running {} {:?}{}",
            program.display(),
            invocation.args,
            invocation
                .current_dir
                .as_ref()
                .map(|d| format!(" in {}", d.display()))
                .unwrap_or_default()
        );

        let launch_err = |source| CommandError::Launch {
            program: invocation.program.clone(),
            source,
        };

        if invocation.is_shown(self.verbosity) {
            let status = command.status().map_err(launch_err)?;
            return Ok(CommandOutput {
                code: status.code(),
                stdout: String::new(),
            });
        }

        let output = command.stderr(Stdio::piped()).output().map_err(launch_err)?;
        if !output.status.success() {
            log::debug!(
                "`{}` exited with {:?}: {}",
                invocation.program,
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_program_is_not_found() {
        let runner = SystemCommandRunner::new(Verbosity::NORMAL);
        let result = runner.run(&CommandInvocation::new(
            "tunekeep-definitely-not-a-real-program",
        ));
        assert!(matches!(result, Err(CommandError::NotFound { .. })));
    }
}
