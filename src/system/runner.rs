// src/system/runner.rs

//! Runs a formula through its three phases: prepare, run, finalize.

use crate::constants::{CTX_ENV, PWD_ENV};
use crate::models::{Definition, InputStrategy};
use crate::system::context::{ContextError, ContextFinder};
use crate::system::executor::{self, ExecutionError};
use crate::system::inputs::{InputError, InputRunner, Invocation};
use crate::system::postrun::{FinalizeError, PostRunner};
use crate::system::prerun::{PrepareError, PreRunner, SandboxMode, Setup};
use std::fmt;
use std::fs::OpenOptions;
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::{Command as StdCommand, Stdio};
use thiserror::Error;

/// The phase a formula invocation is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Preparing,
    Running,
    Finalizing,
    Failed,
}

#[derive(Error, Debug)]
pub enum ExecutionFailure {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("Could not resolve the current context: {0}")]
    Context(#[from] ContextError),
    #[error("Could not write env file '{path}': {source}")]
    EnvFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Process(#[from] ExecutionError),
}

#[derive(Error, Debug)]
pub enum RunError {
    #[error("Formula '{formula}' could not be prepared: {source}")]
    PrepareFailed {
        formula: String,
        #[source]
        source: PrepareError,
    },
    #[error("Formula '{formula}' failed: {source}")]
    ExecutionFailed {
        formula: String,
        #[source]
        source: ExecutionFailure,
    },
    #[error("Formula '{formula}' ran but could not be cleaned up: {source}")]
    FinalizeFailed {
        formula: String,
        #[source]
        source: FinalizeError,
    },
}

impl RunError {
    /// The phase that failed.
    pub fn phase(&self) -> RunPhase {
        match self {
            Self::PrepareFailed { .. } => RunPhase::Preparing,
            Self::ExecutionFailed { .. } => RunPhase::Running,
            Self::FinalizeFailed { .. } => RunPhase::Finalizing,
        }
    }
}

/// How the formula was executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub mode: SandboxMode,
}

/// Where and how sandboxed formulas are started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxSettings {
    pub runtime: String,
    pub app_path: String,
}

pub struct FormulaRunner {
    pre_runner: Box<dyn PreRunner>,
    input_runner: Box<dyn InputRunner>,
    post_runner: Box<dyn PostRunner>,
    context: Box<dyn ContextFinder>,
    sandbox: SandboxSettings,
}

impl fmt::Debug for FormulaRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormulaRunner")
            .field("sandbox", &self.sandbox)
            .finish_non_exhaustive()
    }
}

fn transition(phase: &mut RunPhase, next: RunPhase, formula: &str) {
    log::debug!("[{}] {:?} -> {:?}", formula, phase, next);
    *phase = next;
}

impl FormulaRunner {
    pub fn new(
        pre_runner: Box<dyn PreRunner>,
        input_runner: Box<dyn InputRunner>,
        post_runner: Box<dyn PostRunner>,
        context: Box<dyn ContextFinder>,
        sandbox: SandboxSettings,
    ) -> Self {
        Self {
            pre_runner,
            input_runner,
            post_runner,
            context,
            sandbox,
        }
    }

    /// Prepares, runs and finalizes one formula invocation.
    ///
    /// Finalizing only happens after a successful run. When preparing or
    /// running fails, the scratch directory is removed as the setup drops.
    pub fn run(
        &self,
        def: &Definition,
        strategy: InputStrategy,
        sandbox: bool,
    ) -> Result<RunReport, RunError> {
        let formula = def.path.clone();
        let mut phase = RunPhase::Idle;

        transition(&mut phase, RunPhase::Preparing, &formula);
        let setup = match self.pre_runner.pre_run(def, sandbox) {
            Ok(setup) => setup,
            Err(source) => {
                transition(&mut phase, RunPhase::Failed, &formula);
                return Err(RunError::PrepareFailed { formula, source });
            }
        };

        transition(&mut phase, RunPhase::Running, &formula);
        if let Err(source) = self.execute(&setup, strategy) {
            transition(&mut phase, RunPhase::Failed, &formula);
            return Err(RunError::ExecutionFailed { formula, source });
        }

        transition(&mut phase, RunPhase::Finalizing, &formula);
        let mode = setup.sandbox.clone();
        if let Err(source) = self.post_runner.post_run(setup) {
            transition(&mut phase, RunPhase::Failed, &formula);
            return Err(RunError::FinalizeFailed { formula, source });
        }

        transition(&mut phase, RunPhase::Idle, &formula);
        Ok(RunReport { mode })
    }

    fn execute(&self, setup: &Setup, strategy: InputStrategy) -> Result<(), ExecutionFailure> {
        let mut invocation = Invocation::default();
        self.input_runner.inputs(&mut invocation, setup, strategy)?;
        let context = self.context.find()?;

        match &setup.sandbox {
            SandboxMode::Sandboxed { container_id } => {
                invocation.push_env(PWD_ENV, self.sandbox.app_path.clone());
                invocation.push_env(CTX_ENV, context.current_context);

                let env_file = setup.env_file();
                write_env_file(&env_file, &invocation)?;
                let mut command = sandbox_command(
                    &self.sandbox,
                    container_id,
                    &env_file,
                    &setup.pwd,
                    std::io::stdout().is_terminal(),
                );
                executor::run_to_completion(&mut command)?;
            }
            SandboxMode::Local | SandboxMode::FallbackToLocal { .. } => {
                invocation.push_env(PWD_ENV, setup.pwd.to_string_lossy());
                invocation.push_env(CTX_ENV, context.current_context);

                let mut command = local_command(setup, &invocation);
                executor::run_to_completion(&mut command)?;
            }
        }
        Ok(())
    }
}

// --- Command Assembly ---

/// The staged binary, started in the user's directory with the host
/// environment plus the invocation's variables.
pub fn local_command(setup: &Setup, invocation: &Invocation) -> StdCommand {
    let mut command = StdCommand::new(setup.bin_file());
    command
        .current_dir(dunce::simplified(&setup.pwd))
        .envs(invocation.envs().iter().map(|(k, v)| (k, v)))
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    command
}

/// `<runtime> run --rm [-it] --env-file <file> -v <pwd>:<app> --name <id> <id>`
pub fn sandbox_command(
    settings: &SandboxSettings,
    container_id: &str,
    env_file: &Path,
    pwd: &Path,
    interactive: bool,
) -> StdCommand {
    let mut command = StdCommand::new(&settings.runtime);
    command.args(["run", "--rm"]);
    if interactive {
        command.arg("-it");
    }
    command
        .arg("--env-file")
        .arg(env_file)
        .arg("-v")
        .arg(format!("{}:{}", pwd.display(), settings.app_path))
        .args(["--name", container_id, container_id])
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    command
}

/// Appends every variable of the invocation to `path` as `KEY=VALUE`.
pub fn write_env_file(path: &Path, invocation: &Invocation) -> Result<(), ExecutionFailure> {
    let env_error = |source| ExecutionFailure::EnvFile {
        path: path.to_path_buf(),
        source,
    };
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(env_error)?;
    for (key, value) in invocation.envs() {
        writeln!(file, "{key}={value}").map_err(env_error)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FormulaConfig;
    use crate::system::context::FixedContext;
    use std::cell::RefCell;
    use std::fs;
    use std::rc::Rc;

    fn sandbox_settings() -> SandboxSettings {
        SandboxSettings {
            runtime: "docker".to_string(),
            app_path: "/app".to_string(),
        }
    }

    fn args(command: &StdCommand) -> Vec<String> {
        command
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_sandbox_command_line() {
        let command = sandbox_command(
            &sandbox_settings(),
            "abc",
            Path::new("/tmp/x/.env"),
            Path::new("/home/me/project"),
            false,
        );
        assert_eq!(command.get_program(), "docker");
        assert_eq!(
            args(&command),
            vec![
                "run", "--rm", "--env-file", "/tmp/x/.env", "-v", "/home/me/project:/app",
                "--name", "abc", "abc",
            ]
        );

        let interactive = sandbox_command(
            &sandbox_settings(),
            "abc",
            Path::new("/tmp/x/.env"),
            Path::new("/p"),
            true,
        );
        assert_eq!(args(&interactive).get(2).map(String::as_str), Some("-it"));
    }

    #[test]
    fn test_env_file_is_appended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        fs::write(&path, "EXISTING=1\n").unwrap();

        let mut invocation = Invocation::default();
        invocation.push_env("NAME", "Dennis");
        invocation.push_env("PWD", "/app");
        write_env_file(&path, &invocation).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "EXISTING=1\nNAME=Dennis\nPWD=/app\n"
        );
    }

    // --- Fakes ---

    struct StagedPreRunner {
        script: &'static str,
        mode: SandboxMode,
        pwd: PathBuf,
    }

    impl PreRunner for StagedPreRunner {
        fn pre_run(&self, _def: &Definition, _sandbox: bool) -> Result<Setup, PrepareError> {
            let scratch = tempfile::tempdir().unwrap();
            let bin = scratch.path().join("run.sh");
            fs::write(&bin, self.script).unwrap();
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(&bin, fs::Permissions::from_mode(0o755)).unwrap();
            }
            Ok(Setup::new(
                self.pwd.clone(),
                scratch,
                "run.sh".to_string(),
                FormulaConfig::default(),
                self.mode.clone(),
            ))
        }
    }

    struct FixedInputs;

    impl InputRunner for FixedInputs {
        fn inputs(
            &self,
            invocation: &mut Invocation,
            _setup: &Setup,
            _strategy: InputStrategy,
        ) -> Result<(), InputError> {
            invocation.push_env("NAME", "Dennis");
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct RecordingPostRunner {
        finalized: Rc<RefCell<Vec<PathBuf>>>,
    }

    impl PostRunner for RecordingPostRunner {
        fn post_run(&self, setup: Setup) -> Result<(), FinalizeError> {
            self.finalized.borrow_mut().push(setup.tmp_dir().to_path_buf());
            setup.release().map_err(|source| FinalizeError::Scratch {
                path: PathBuf::new(),
                source,
            })
        }
    }

    fn runner(pre: StagedPreRunner, post: RecordingPostRunner) -> FormulaRunner {
        FormulaRunner::new(
            Box::new(pre),
            Box::new(FixedInputs),
            Box::new(post),
            Box::new(FixedContext("dev".to_string())),
            sandbox_settings(),
        )
    }

    fn definition() -> Definition {
        Definition {
            path: "hello/world".to_string(),
            bin: "run.sh".to_string(),
            ..Default::default()
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_fallback_to_local_runs_the_binary() {
        let pwd = tempfile::tempdir().unwrap();
        let pre = StagedPreRunner {
            script: "#!/bin/sh\necho \"$NAME|$CONTEXT|$PWD\" > out.txt\n",
            mode: SandboxMode::FallbackToLocal {
                reason: "no Dockerfile".to_string(),
            },
            pwd: pwd.path().to_path_buf(),
        };
        let post = RecordingPostRunner::default();

        let report = runner(pre, post.clone())
            .run(&definition(), InputStrategy::Prompt, true)
            .unwrap();

        assert!(!report.mode.is_sandboxed());
        let out = fs::read_to_string(pwd.path().join("out.txt")).unwrap();
        assert_eq!(out.trim(), format!("Dennis|dev|{}", pwd.path().display()));
        assert_eq!(post.finalized.borrow().len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_formula_skips_finalize() {
        let pwd = tempfile::tempdir().unwrap();
        let pre = StagedPreRunner {
            script: "#!/bin/sh\nexit 4\n",
            mode: SandboxMode::Local,
            pwd: pwd.path().to_path_buf(),
        };
        let post = RecordingPostRunner::default();

        let err = runner(pre, post.clone())
            .run(&definition(), InputStrategy::Prompt, false)
            .unwrap_err();

        assert_eq!(err.phase(), RunPhase::Running);
        assert!(matches!(
            err,
            RunError::ExecutionFailed {
                source: ExecutionFailure::Process(ExecutionError::NonZeroExitStatus {
                    code: Some(4),
                    ..
                }),
                ..
            }
        ));
        assert!(post.finalized.borrow().is_empty());
    }

    #[test]
    fn test_prepare_failure_is_reported_with_its_phase() {
        struct Missing;
        impl PreRunner for Missing {
            fn pre_run(&self, def: &Definition, _: bool) -> Result<Setup, PrepareError> {
                Err(PrepareError::BinaryNotFound {
                    path: PathBuf::from(&def.bin),
                })
            }
        }

        let runner = FormulaRunner::new(
            Box::new(Missing),
            Box::new(FixedInputs),
            Box::new(RecordingPostRunner::default()),
            Box::new(FixedContext::default()),
            sandbox_settings(),
        );
        let err = runner
            .run(&definition(), InputStrategy::Prompt, false)
            .unwrap_err();
        assert_eq!(err.phase(), RunPhase::Preparing);
        assert!(err.to_string().contains("hello/world"));
    }
}
