// src/system/executor.rs

use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::process::{Command as StdCommand, Stdio};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Command could not be parsed: {0}")]
    CommandParse(String),
    #[error("No command specified to run.")]
    EmptyCommand,
    #[error("Command '{0}' could not be executed: {1}")]
    CommandFailed(String, std::io::Error),
    #[error("Command '{command}' exited with {}.", describe_code(.code))]
    NonZeroExitStatus { command: String, code: Option<i32> },
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {code}"),
        None => "no exit code (terminated by a signal)".to_string(),
    }
}

/// Renders a command as `program arg1 arg2` for logs and error messages.
pub fn describe(command: &StdCommand) -> String {
    std::iter::once(command.get_program())
        .chain(command.get_args())
        .map(|part| part.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs a fully configured command and blocks until it exits.
///
/// Spawn failures and non-zero exits are both errors. There is no
/// cancellation: once spawned the child runs to its own completion.
pub fn run_to_completion(command: &mut StdCommand) -> Result<(), ExecutionError> {
    let line = describe(command);
    log::debug!("Spawning '{}'", line);

    let status = command
        .status()
        .map_err(|e| ExecutionError::CommandFailed(line.clone(), e))?;

    if !status.success() {
        return Err(ExecutionError::NonZeroExitStatus {
            command: line,
            code: status.code(),
        });
    }
    Ok(())
}

/// Parses a shell-like command line and runs it in `cwd` with extra
/// environment variables, streaming its output to the user's terminal.
pub fn execute_command(
    command_line: &str,
    cwd: &Path,
    env_vars: &HashMap<String, String>,
) -> Result<(), ExecutionError> {
    let parts = shlex::split(command_line.trim())
        .ok_or_else(|| ExecutionError::CommandParse(command_line.to_string()))?;
    let (program, args) = parts.split_first().ok_or(ExecutionError::EmptyCommand)?;

    let mut command = StdCommand::new(program);
    command
        .args(args)
        .current_dir(dunce::simplified(cwd))
        .envs(env_vars)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    run_to_completion(&mut command)
}

/// Returns true when `program` can be found in one of the `PATH` directories.
pub fn is_executable_in_path(program: &str) -> bool {
    if Path::new(program).is_absolute() {
        return Path::new(program).is_file();
    }
    let candidates: Vec<String> = if cfg!(target_os = "windows") {
        vec![program.to_string(), format!("{program}.exe")]
    } else {
        vec![program.to_string()]
    };

    match env::var_os("PATH") {
        Some(path_var) => env::split_paths(&path_var)
            .any(|dir| candidates.iter().any(|name| dir.join(name).is_file())),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_command_line_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = execute_command("   ", dir.path(), &HashMap::new()).unwrap_err();
        assert!(matches!(err, ExecutionError::EmptyCommand));
    }

    #[test]
    fn test_unbalanced_quotes_fail_to_parse() {
        let dir = tempfile::tempdir().unwrap();
        let err = execute_command("echo \"oops", dir.path(), &HashMap::new()).unwrap_err();
        assert!(matches!(err, ExecutionError::CommandParse(_)));
    }

    #[test]
    fn test_missing_program_fails_to_spawn() {
        let dir = tempfile::tempdir().unwrap();
        let err =
            execute_command("definitely-not-a-real-program-42", dir.path(), &HashMap::new())
                .unwrap_err();
        assert!(matches!(err, ExecutionError::CommandFailed(..)));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = execute_command("sh -c 'exit 3'", dir.path(), &HashMap::new()).unwrap_err();
        match err {
            ExecutionError::NonZeroExitStatus { code, .. } => assert_eq!(code, Some(3)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_describe_joins_program_and_args() {
        let mut command = StdCommand::new("docker");
        command.args(["run", "--rm"]);
        assert_eq!(describe(&command), "docker run --rm");
    }
}
