// src/interpreter/mod.rs
//
// Executes the statements an agent writes inside scratchpad regions.
//
// Code is Python, run on an embedded RustPython VM: every line but the last
// is executed for its effect, the last line is evaluated and `str()` of its
// value becomes the result. Each call starts from a fresh scope. Failures
// never escape: they come back as `ERROR: <message>` text.

mod errors;

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use rustpython_compiler::Mode;
use rustpython_vm::builtins::PyBaseExceptionRef;
use rustpython_vm::{AsObject, VirtualMachine};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub use errors::ExecError;

/// Prefix of the text fed back to the agent when execution fails.
pub const ERROR_PREFIX: &str = "ERROR: ";

/// Name the final expression is bound to before it is read back.
const RESULT_NAME: &str = "__result__";

/// Stack of the worker thread. Compiling deeply nested expressions recurses
/// once per level.
const WORKER_STACK_BYTES: usize = 256 * 1024 * 1024;

/// Bounds on the work a single execution may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecLimits {
    pub max_code_bytes: usize,
    /// Non-blank lines.
    pub max_statements: usize,
    /// Bracket nesting.
    pub max_depth: usize,
    /// Wall clock budget for one execution, VM start-up included.
    pub timeout_ms: u64,
}

impl ExecLimits {
    /// Largest accepted `max_depth`; CPython's parser refuses deeper nesting.
    pub const DEPTH_CAP: usize = 200;
    /// Largest accepted `max_code_bytes`.
    pub const CODE_BYTES_CAP: usize = 16 * 1024;

    pub fn validate(&self) -> Result<(), String> {
        if self.max_depth > Self::DEPTH_CAP {
            return Err(format!(
                "exec.max_depth must be at most {}, got {}",
                Self::DEPTH_CAP,
                self.max_depth
            ));
        }
        if self.max_code_bytes > Self::CODE_BYTES_CAP {
            return Err(format!(
                "exec.max_code_bytes must be at most {}, got {}",
                Self::CODE_BYTES_CAP,
                self.max_code_bytes
            ));
        }
        if self.timeout_ms == 0 {
            return Err("exec.timeout_ms must be positive".to_string());
        }
        Ok(())
    }
}

impl Default for ExecLimits {
    fn default() -> Self {
        Self {
            max_code_bytes: 4096,
            max_statements: 256,
            max_depth: 64,
            timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub text: String,
    pub is_error: bool,
}

impl ExecutionResult {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(err: &ExecError) -> Self {
        Self {
            text: format!("{ERROR_PREFIX}{err}"),
            is_error: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Interpreter {
    limits: ExecLimits,
}

impl Interpreter {
    pub fn new(limits: ExecLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &ExecLimits {
        &self.limits
    }

    /// Runs `code` and renders the value of its final line. Never fails;
    /// errors are returned as `ERROR: ...` text with `is_error` set.
    pub fn execute(&self, code: &str) -> ExecutionResult {
        let result = match self.evaluate(code) {
            Ok(text) => ExecutionResult::ok(text),
            Err(err) => ExecutionResult::error(&err),
        };
        debug!(code, result = %result.text, is_error = result.is_error, "executed scratchpad code");
        result
    }

    /// Runs `code` and returns `str()` of the value of its final line.
    pub fn evaluate(&self, code: &str) -> Result<String, ExecError> {
        self.check(code)?;

        let (prior, last) = code.rsplit_once('\n').unwrap_or(("", code));
        // A final assignment is valid on the right of another one, so it
        // yields the assigned value; a final augmented assignment is not.
        let program = format!("{prior}\n{RESULT_NAME} = {last}");

        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("scratchpad".to_string())
            .stack_size(WORKER_STACK_BYTES)
            .spawn(move || {
                let _ = tx.send(run_python(&program));
            })
            .map_err(|err| ExecError::Worker(err.to_string()))?;

        match rx.recv_timeout(Duration::from_millis(self.limits.timeout_ms)) {
            Ok(result) => result,
            // TODO: interrupt the VM through its signal channel instead of
            // leaving the worker running detached.
            Err(RecvTimeoutError::Timeout) => {
                warn!(timeout_ms = self.limits.timeout_ms, "scratchpad code timed out");
                Err(ExecError::Timeout(self.limits.timeout_ms))
            }
            Err(RecvTimeoutError::Disconnected) => Err(ExecError::Worker(
                "worker exited without a result".to_string(),
            )),
        }
    }

    /// Rejects code that is empty or over the configured limits before a VM
    /// is started.
    fn check(&self, code: &str) -> Result<(), ExecError> {
        if code.len() > self.limits.max_code_bytes {
            return Err(ExecError::LimitExceeded(format!(
                "code exceeds {} bytes",
                self.limits.max_code_bytes
            )));
        }
        if code.trim().is_empty() {
            return Err(ExecError::Empty);
        }

        let statements = code.lines().filter(|line| !line.trim().is_empty()).count();
        if statements > self.limits.max_statements {
            return Err(ExecError::LimitExceeded(format!(
                "more than {} statements",
                self.limits.max_statements
            )));
        }

        let max_depth = self.limits.max_depth.min(ExecLimits::DEPTH_CAP);
        if nesting_depth(code) > max_depth {
            return Err(ExecError::LimitExceeded(format!(
                "nesting deeper than {max_depth}"
            )));
        }
        Ok(())
    }
}

/// Deepest bracket nesting in `code`. Brackets inside string literals count
/// too.
fn nesting_depth(code: &str) -> usize {
    let mut depth = 0usize;
    let mut deepest = 0;
    for c in code.chars() {
        match c {
            '(' | '[' | '{' => {
                depth += 1;
                deepest = deepest.max(depth);
            }
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    deepest
}

fn run_python(program: &str) -> Result<String, ExecError> {
    let interpreter = rustpython_vm::Interpreter::without_stdlib(Default::default());
    interpreter.enter(|vm| {
        let scope = vm.new_scope_with_builtins();
        let code = vm
            .compile(program, Mode::Exec, "<scratchpad>".to_string())
            .map_err(|err| ExecError::Syntax(err.to_string()))?;
        vm.run_code_obj(code, scope.clone())
            .map_err(|exc| ExecError::Python(exception_message(vm, &exc)))?;

        let value = scope
            .globals
            .get_item(RESULT_NAME, vm)
            .map_err(|exc| ExecError::Python(exception_message(vm, &exc)))?;
        let text = value
            .str(vm)
            .map_err(|exc| ExecError::Python(exception_message(vm, &exc)))?;
        Ok(text.as_str().to_owned())
    })
}

/// `str(exc)`, or the exception's type name when that is empty.
fn exception_message(vm: &VirtualMachine, exc: &PyBaseExceptionRef) -> String {
    match exc.as_object().str(vm) {
        Ok(message) if !message.as_str().is_empty() => message.as_str().to_owned(),
        _ => exc.as_object().class().name().to_string(),
    }
}

/// Runs `code` with the default limits.
pub fn execute(code: &str) -> ExecutionResult {
    Interpreter::default().execute(code)
}
