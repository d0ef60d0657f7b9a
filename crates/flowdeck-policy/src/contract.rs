//! The policy script contract and guest-program assembly.
//!
//! A policy script must define:
//!
//! ```ignore
//! fn validateSOD(user: &Value, action: &Value, context: &Value) -> Result<Verdict, String>
//! ```
//!
//! `Ok(verdict)` is the policy's answer; `Err(reason)` is its error channel
//! and maps to a rejecting verdict with that reason. The evaluator wraps the
//! script with a fixed prelude (the `Verdict` type) and a `main` that reads
//! the evaluation envelope from stdin, calls `validateSOD`, and writes the
//! verdict JSON to stdout. The assembled program is what actually gets
//! compiled to `wasm32-wasip1`.

use crate::error::PolicyError;

/// Name of the function every policy script must define.
pub const ENTRY_POINT: &str = "validateSOD";

/// Manifest for the generated guest crate.
///
/// The empty `[workspace]` table keeps cargo from attaching the scratch
/// crate to any enclosing workspace.
pub const GUEST_MANIFEST: &str = r#"[package]
name = "policy-guest"
version = "0.0.0"
edition = "2021"

[[bin]]
name = "policy-guest"
path = "src/main.rs"

[dependencies]
serde_json = "1.0"

[profile.release]
opt-level = "s"
strip = true

[workspace]
"#;

const GUEST_PRELUDE: &str = r#"#![allow(non_snake_case, dead_code)]
// Generated policy guest. Assembled by the host; not user-editable.

/// Verdict returned by `validateSOD`.
pub struct Verdict {
    pub valid: bool,
    pub reason: Option<String>,
}

impl Verdict {
    pub fn approve() -> Self {
        Verdict { valid: true, reason: None }
    }

    pub fn reject<R: Into<String>>(reason: R) -> Self {
        Verdict { valid: false, reason: Some(reason.into()) }
    }
}
"#;

const GUEST_HARNESS: &str = r#"
fn main() {
    use std::io::Read;

    let mut raw = String::new();
    if std::io::stdin().read_to_string(&mut raw).is_err() {
        eprintln!("policy-guest: failed to read evaluation envelope");
        std::process::exit(2);
    }
    let envelope: serde_json::Value = match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(err) => {
            eprintln!("policy-guest: invalid evaluation envelope: {err}");
            std::process::exit(2);
        }
    };

    let user = envelope.get("user").cloned().unwrap_or(serde_json::Value::Null);
    let action = envelope.get("action").cloned().unwrap_or(serde_json::Value::Null);
    let context = envelope
        .get("context")
        .cloned()
        .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new()));

    let verdict = match validateSOD(&user, &action, &context) {
        Ok(verdict) => verdict,
        Err(reason) => Verdict { valid: false, reason: Some(reason) },
    };

    let mut out = serde_json::Map::new();
    out.insert("valid".to_string(), serde_json::Value::Bool(verdict.valid));
    if let Some(reason) = verdict.reason {
        out.insert("reason".to_string(), serde_json::Value::String(reason));
    }
    println!("{}", serde_json::Value::Object(out));
}
"#;

/// Check that script text satisfies the policy contract.
///
/// This is a cheap pre-compile check: the script must be non-empty and must
/// define `validateSOD`. Everything else (types, syntax) is the compiler's
/// job and surfaces as a compile failure.
pub fn check_contract(code: &str) -> Result<(), PolicyError> {
    if code.trim().is_empty() {
        return Err(PolicyError::Contract("script is empty".into()));
    }
    if !code.contains(&format!("fn {ENTRY_POINT}")) {
        return Err(PolicyError::Contract(format!(
            "script must define `fn {ENTRY_POINT}(user, action, context)`"
        )));
    }
    Ok(())
}

/// Assemble the complete guest program: prelude + user script + harness.
pub fn assemble_guest_source(code: &str) -> String {
    let mut source = String::with_capacity(GUEST_PRELUDE.len() + code.len() + GUEST_HARNESS.len() + 2);
    source.push_str(GUEST_PRELUDE);
    source.push('\n');
    source.push_str(code);
    source.push('\n');
    source.push_str(GUEST_HARNESS);
    source
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = r#"
use serde_json::Value;

fn validateSOD(user: &Value, action: &Value, _context: &Value) -> Result<Verdict, String> {
    if action["amount"].as_f64() > user["approvalLimit"].as_f64() {
        return Ok(Verdict::reject("over limit"));
    }
    Ok(Verdict::approve())
}
"#;

    #[test]
    fn test_contract_accepts_well_formed_script() {
        check_contract(SCRIPT).unwrap();
    }

    #[test]
    fn test_contract_rejects_empty_script() {
        let err = check_contract("   \n\t ").unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_contract_rejects_missing_entry_point() {
        let err = check_contract("fn something_else() {}").unwrap_err();
        assert!(err.to_string().contains("validateSOD"));
    }

    #[test]
    fn test_assembled_source_contains_script_and_harness() {
        let source = assemble_guest_source(SCRIPT);
        assert!(source.starts_with("#![allow(non_snake_case"));
        assert!(source.contains("fn validateSOD"));
        assert!(source.contains("fn main()"));
        assert!(source.contains("pub struct Verdict"));
    }

    #[test]
    fn test_assembly_is_deterministic() {
        assert_eq!(assemble_guest_source(SCRIPT), assemble_guest_source(SCRIPT));
    }

    #[test]
    fn test_manifest_is_standalone() {
        assert!(GUEST_MANIFEST.contains("[workspace]"));
        assert!(GUEST_MANIFEST.contains("serde_json"));
    }
}
