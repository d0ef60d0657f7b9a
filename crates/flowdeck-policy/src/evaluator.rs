//! Wasmtime sandbox for evaluating policy scripts.
//!
//! # Flow
//!
//! 1. The script text is checked against the contract and assembled with the
//!    harness into a guest program (`contract` module)
//! 2. The guest is compiled to `wasm32-wasip1` via a scratch cargo crate
//! 3. The `.wasm` binary is cached by SHA-256 of the assembled source
//! 4. Each evaluation runs the module in a fresh Wasmtime store with WASI
//!    memory pipes: envelope JSON in via stdin, verdict JSON out via stdout
//! 5. Fuel metering plus a wall-clock timeout bound the run
//!
//! Every failure mode folds into [`EvaluationOutcome`] before leaving this
//! module; callers never observe a panic or a raw error for script-origin
//! failures.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};
use wasmtime::{Config, Engine, Linker, Module, Store};
use wasmtime_wasi::WasiCtxBuilder;
use wasmtime_wasi::p1::WasiP1Ctx;
use wasmtime_wasi::p2::pipe::{MemoryInputPipe, MemoryOutputPipe};

use crate::contract::{GUEST_MANIFEST, assemble_guest_source, check_contract};
use crate::error::PolicyError;
use crate::verdict::{EvaluationInput, EvaluationOutcome, Verdict};

/// Default execution budget per evaluation.
pub const DEFAULT_BUDGET: Duration = Duration::from_millis(5000);

/// Rough fuel-per-second conversion (≈33M instructions/sec).
const FUEL_PER_SEC: u64 = 33_000_000;

/// Configuration for the policy evaluator.
#[derive(Debug, Clone)]
pub struct EvaluatorConfig {
    /// Directory for the scratch build crate and compiled `.wasm` cache.
    pub cache_dir: PathBuf,

    /// Execution budget per evaluation.
    pub budget: Duration,
}

impl EvaluatorConfig {
    /// Config with the default budget.
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            budget: DEFAULT_BUDGET,
        }
    }

    /// Override the execution budget.
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }
}

/// Compiles and executes policy scripts in a Wasmtime sandbox.
///
/// Cheap to share behind an `Arc`; concurrent evaluations share only the
/// compiled-module cache and otherwise run in disposable stores.
pub struct PolicyEvaluator {
    /// Wasmtime engine (shared across all evaluations).
    engine: Engine,
    /// Directory holding `<hash>.wasm` artifacts and the scratch crate.
    cache_dir: PathBuf,
    /// In-memory cache: SHA-256 hex → precompiled Module.
    module_cache: Arc<RwLock<HashMap<String, Module>>>,
    /// Serializes cargo invocations into the shared scratch crate.
    build_lock: Arc<Mutex<()>>,
    /// Execution budget per evaluation.
    budget: Duration,
}

/// Raw output of one sandboxed run.
#[derive(Debug)]
struct RunOutput {
    stdout: String,
    stderr: String,
    exit_code: i32,
    elapsed: Duration,
}

impl PolicyEvaluator {
    /// Create a new evaluator.
    pub fn new(config: EvaluatorConfig) -> Result<Self, PolicyError> {
        let mut engine_config = Config::new();
        engine_config.consume_fuel(true);

        let engine = Engine::new(&engine_config).map_err(|e| {
            PolicyError::Execution(format!("Failed to create Wasmtime engine: {e}"))
        })?;

        std::fs::create_dir_all(&config.cache_dir)
            .map_err(|e| PolicyError::Execution(format!("Failed to create cache dir: {e}")))?;

        Ok(Self {
            engine,
            cache_dir: config.cache_dir,
            module_cache: Arc::new(RwLock::new(HashMap::new())),
            build_lock: Arc::new(Mutex::new(())),
            budget: config.budget,
        })
    }

    /// Evaluate a policy script against one scenario.
    ///
    /// This is the crate's trust boundary: whatever happens inside — contract
    /// violation, compile failure, guest crash, timeout, or a clean verdict —
    /// comes back as a structured [`EvaluationOutcome`]. One attempt per
    /// call; callers may re-invoke manually.
    pub async fn evaluate(&self, input: &EvaluationInput) -> EvaluationOutcome {
        match self.try_evaluate(input).await {
            Ok(verdict) => EvaluationOutcome::Success(verdict),
            Err(e) => {
                debug!(error = %e, "policy evaluation failed");
                EvaluationOutcome::Failure(e.to_string())
            }
        }
    }

    async fn try_evaluate(&self, input: &EvaluationInput) -> Result<Verdict, PolicyError> {
        check_contract(&input.code)?;

        let source = assemble_guest_source(&input.code);
        let hash = self.compile(&source).await?;

        let envelope = serde_json::json!({
            "user": input.user,
            "action": input.action,
            "context": input.context,
        })
        .to_string();

        self.run(&hash, &envelope).await
    }

    /// Compile an assembled guest program to WASM, returning its source hash.
    ///
    /// Uses a two-level cache (in-memory `Module`, on-disk `.wasm`) keyed by
    /// SHA-256 of the assembled source, so re-testing an unchanged script
    /// never recompiles.
    async fn compile(&self, source: &str) -> Result<String, PolicyError> {
        let hash = sha256_hex(source);

        if self.module_cache.read().await.contains_key(&hash) {
            debug!(hash = %hash, "module cache hit");
            return Ok(hash);
        }

        let wasm_path = self.cache_dir.join(format!("{hash}.wasm"));
        if wasm_path.exists() {
            let module = Module::from_file(&self.engine, &wasm_path).map_err(|e| {
                PolicyError::Execution(format!("Failed to load cached WASM: {e}"))
            })?;
            self.module_cache.write().await.insert(hash.clone(), module);
            debug!(hash = %hash, "disk cache hit");
            return Ok(hash);
        }

        Self::check_wasm_target().await?;

        // One builder at a time: the scratch crate is shared so consecutive
        // compiles reuse the dependency build.
        let _guard = self.build_lock.lock().await;

        if !wasm_path.exists() {
            self.build_guest(source, &wasm_path).await?;
        }

        let module = Module::from_file(&self.engine, &wasm_path)
            .map_err(|e| PolicyError::Execution(format!("Failed to load compiled WASM: {e}")))?;
        self.module_cache.write().await.insert(hash.clone(), module);

        Ok(hash)
    }

    /// Write the scratch crate and run `cargo build --target wasm32-wasip1`.
    async fn build_guest(
        &self,
        source: &str,
        wasm_path: &std::path::Path,
    ) -> Result<(), PolicyError> {
        let build_dir = self.cache_dir.join("build");
        let src_dir = build_dir.join("src");
        tokio::fs::create_dir_all(&src_dir)
            .await
            .map_err(|e| PolicyError::CompileFailed(format!("Failed to create build dir: {e}")))?;

        let manifest_path = build_dir.join("Cargo.toml");
        if !manifest_path.exists() {
            tokio::fs::write(&manifest_path, GUEST_MANIFEST)
                .await
                .map_err(|e| {
                    PolicyError::CompileFailed(format!("Failed to write guest manifest: {e}"))
                })?;
        }
        tokio::fs::write(src_dir.join("main.rs"), source)
            .await
            .map_err(|e| PolicyError::CompileFailed(format!("Failed to write guest source: {e}")))?;

        let start = Instant::now();
        let output = tokio::process::Command::new("cargo")
            .arg("build")
            .arg("--target")
            .arg("wasm32-wasip1")
            .arg("--release")
            .arg("--manifest-path")
            .arg(&manifest_path)
            .output()
            .await
            .map_err(|e| PolicyError::CompileFailed(format!("Failed to invoke cargo: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(PolicyError::CompileFailed(stderr));
        }

        let artifact = build_dir.join("target/wasm32-wasip1/release/policy-guest.wasm");
        tokio::fs::copy(&artifact, wasm_path).await.map_err(|e| {
            PolicyError::CompileFailed(format!(
                "Compiled artifact missing at {}: {e}",
                artifact.display()
            ))
        })?;

        debug!(elapsed = ?start.elapsed(), wasm = %wasm_path.display(), "compiled policy guest");
        Ok(())
    }

    /// Execute a compiled guest and parse its verdict.
    async fn run(&self, hash: &str, envelope: &str) -> Result<Verdict, PolicyError> {
        let module = {
            let cache = self.module_cache.read().await;
            cache.get(hash).cloned().ok_or_else(|| {
                PolicyError::Execution(format!("No compiled module for hash {hash}"))
            })?
        };

        let engine = self.engine.clone();
        let envelope = envelope.to_string();
        let budget = self.budget;
        let budget_ms = budget.as_millis() as u64;

        // The Wasmtime run is synchronous, so it goes to the blocking pool.
        // The outer wall-clock timeout is the caller-facing guarantee; fuel
        // exhaustion inside the store guarantees the detached run terminates
        // shortly after even when the timeout fires first.
        let handle = tokio::task::spawn_blocking(move || {
            Self::execute_sync(&engine, &module, &envelope, budget)
        });

        let output = match tokio::time::timeout(budget, handle).await {
            Ok(joined) => joined
                .map_err(|e| PolicyError::Execution(format!("Sandbox task failed: {e}")))??,
            Err(_) => return Err(PolicyError::Timeout(budget_ms)),
        };

        debug!(elapsed = ?output.elapsed, exit_code = output.exit_code, "policy script finished");

        if output.exit_code != 0 {
            let stderr = output.stderr.trim();
            return Err(PolicyError::Execution(format!(
                "Script exited with code {}: {}",
                output.exit_code,
                if stderr.is_empty() { "<no stderr>" } else { stderr }
            )));
        }

        parse_verdict(&output.stdout)
    }

    /// Synchronous WASM execution with a disposable store and WASI pipes.
    ///
    /// The guest sees only the three pipes: no preopened directories, no
    /// network, no environment. Nothing survives the call.
    fn execute_sync(
        engine: &Engine,
        module: &Module,
        envelope: &str,
        budget: Duration,
    ) -> Result<RunOutput, PolicyError> {
        let start = Instant::now();
        let budget_ms = budget.as_millis() as u64;

        let stdin_pipe = MemoryInputPipe::new(envelope.as_bytes().to_vec());
        let stdout_pipe = MemoryOutputPipe::new(256 * 1024);
        let stderr_pipe = MemoryOutputPipe::new(64 * 1024);

        let mut wasi_builder = WasiCtxBuilder::new();
        wasi_builder
            .stdin(stdin_pipe)
            .stdout(stdout_pipe.clone())
            .stderr(stderr_pipe.clone());
        let wasi_ctx = wasi_builder.build_p1();

        let mut store = Store::new(engine, wasi_ctx);

        let fuel = FUEL_PER_SEC * budget.as_secs().max(1);
        store
            .set_fuel(fuel)
            .map_err(|e| PolicyError::Execution(format!("Failed to set fuel: {e}")))?;

        let mut linker = Linker::new(engine);
        wasmtime_wasi::p1::add_to_linker_sync(&mut linker, |ctx: &mut WasiP1Ctx| ctx)
            .map_err(|e| PolicyError::Execution(format!("Failed to link WASI: {e}")))?;

        let instance = linker
            .instantiate(&mut store, module)
            .map_err(|e| PolicyError::Execution(format!("Failed to instantiate module: {e}")))?;

        let start_fn = instance
            .get_typed_func::<(), ()>(&mut store, "_start")
            .map_err(|e| PolicyError::Execution(format!("No _start entry point: {e}")))?;

        let exit_code = match start_fn.call(&mut store, ()) {
            Ok(()) => 0,
            Err(e) => {
                if let Some(exit) = e.downcast_ref::<wasmtime_wasi::I32Exit>() {
                    exit.0
                } else if e.to_string().contains("fuel") {
                    return Err(PolicyError::Timeout(budget_ms));
                } else {
                    // Guest trap (panic, unreachable). A crash is a mechanism
                    // failure, distinct from the script's Err channel.
                    let stderr = String::from_utf8_lossy(&stderr_pipe.contents()).to_string();
                    let stderr = stderr.trim();
                    return Err(PolicyError::Execution(if stderr.is_empty() {
                        format!("Script trapped: {e}")
                    } else {
                        format!("Script trapped: {stderr}")
                    }));
                }
            }
        };

        let elapsed = start.elapsed();

        let stdout = String::from_utf8(stdout_pipe.contents().to_vec())
            .unwrap_or_else(|_| String::from("<non-utf8 output>"));
        let stderr = String::from_utf8(stderr_pipe.contents().to_vec())
            .unwrap_or_else(|_| String::from("<non-utf8 stderr>"));

        if !stderr.trim().is_empty() {
            warn!(stderr = %stderr.trim(), "policy script wrote to stderr");
        }

        Ok(RunOutput {
            stdout,
            stderr,
            exit_code,
            elapsed,
        })
    }

    /// Check the `wasm32-wasip1` target is installed.
    async fn check_wasm_target() -> Result<(), PolicyError> {
        let output = tokio::process::Command::new("rustup")
            .args(["target", "list", "--installed"])
            .output()
            .await
            .map_err(|e| PolicyError::CompileFailed(format!("Failed to invoke rustup: {e}")))?;

        let installed = String::from_utf8_lossy(&output.stdout);
        if !installed.contains("wasm32-wasip1") {
            return Err(PolicyError::CompileFailed(
                "The wasm32-wasip1 target is not installed. \
                 Install it with: rustup target add wasm32-wasip1"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// Parse the verdict from guest stdout.
///
/// The harness writes the verdict as the final line; anything a script
/// printed earlier is ignored.
fn parse_verdict(stdout: &str) -> Result<Verdict, PolicyError> {
    let line = stdout
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| PolicyError::Execution("Script produced no verdict output".into()))?;

    serde_json::from_str(line.trim()).map_err(|e| {
        PolicyError::Execution(format!("Script produced invalid verdict output: {e}"))
    })
}

/// Compute SHA-256 hex digest of a string.
fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}
