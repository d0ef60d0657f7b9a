//! Wire types for policy evaluation.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// The result of judging one scenario against a policy.
///
/// `valid == false` should carry a human-readable `reason`; `valid == true`
/// may omit it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// Whether the policy allows the action.
    pub valid: bool,

    /// Why the policy rejected the action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Verdict {
    /// A passing verdict with no reason.
    pub fn approve() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    /// A rejecting verdict with the given reason.
    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
        }
    }
}

/// One evaluation request: script text plus the three scenario inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationInput {
    /// Policy script source.
    pub code: String,

    /// The acting user.
    pub user: Value,

    /// The action being attempted.
    pub action: Value,

    /// Additional scenario context. Defaults to an empty object.
    #[serde(default = "empty_object")]
    pub context: Value,
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

impl EvaluationInput {
    /// Create an input with an empty context.
    pub fn new(code: impl Into<String>, user: Value, action: Value) -> Self {
        Self {
            code: code.into(),
            user,
            action,
            context: empty_object(),
        }
    }

    /// Replace the scenario context.
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }
}

/// Discriminated result of one evaluator invocation.
///
/// Exactly one of the two shapes is produced per call:
/// `{"success": true, "result": {…}}` when the mechanism ran the script to a
/// verdict (including a rejecting one), or `{"success": false, "error": "…"}`
/// when the mechanism itself failed (contract violation, compile error,
/// timeout, crash).
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationOutcome {
    /// The script produced a verdict.
    Success(Verdict),
    /// The mechanism failed before a verdict existed.
    Failure(String),
}

impl EvaluationOutcome {
    /// Returns the verdict if the evaluation succeeded.
    pub fn verdict(&self) -> Option<&Verdict> {
        match self {
            Self::Success(verdict) => Some(verdict),
            Self::Failure(_) => None,
        }
    }

    /// Returns true for the `Success` shape.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

#[derive(Serialize)]
struct OutcomeWire<'a> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<&'a Verdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

#[derive(Deserialize)]
struct OutcomeWireOwned {
    success: bool,
    #[serde(default)]
    result: Option<Verdict>,
    #[serde(default)]
    error: Option<String>,
}

impl Serialize for EvaluationOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let wire = match self {
            Self::Success(verdict) => OutcomeWire {
                success: true,
                result: Some(verdict),
                error: None,
            },
            Self::Failure(error) => OutcomeWire {
                success: false,
                result: None,
                error: Some(error),
            },
        };
        wire.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for EvaluationOutcome {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = OutcomeWireOwned::deserialize(deserializer)?;
        match (wire.success, wire.result, wire.error) {
            (true, Some(verdict), None) => Ok(Self::Success(verdict)),
            (false, None, Some(error)) => Ok(Self::Failure(error)),
            _ => Err(D::Error::custom(
                "outcome must be {success:true, result} or {success:false, error}",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_verdict_constructors() {
        assert_eq!(
            Verdict::approve(),
            Verdict {
                valid: true,
                reason: None
            }
        );
        assert_eq!(
            Verdict::reject("over limit"),
            Verdict {
                valid: false,
                reason: Some("over limit".into())
            }
        );
    }

    #[test]
    fn test_verdict_omits_absent_reason() {
        let json = serde_json::to_value(Verdict::approve()).unwrap();
        assert_eq!(json, json!({ "valid": true }));
    }

    #[test]
    fn test_outcome_success_wire_shape() {
        let outcome = EvaluationOutcome::Success(Verdict::reject("no"));
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            json,
            json!({ "success": true, "result": { "valid": false, "reason": "no" } })
        );
    }

    #[test]
    fn test_outcome_failure_wire_shape() {
        let outcome = EvaluationOutcome::Failure("boom".into());
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json, json!({ "success": false, "error": "boom" }));
    }

    #[test]
    fn test_outcome_roundtrip() {
        for outcome in [
            EvaluationOutcome::Success(Verdict::approve()),
            EvaluationOutcome::Failure("timed out".into()),
        ] {
            let json = serde_json::to_string(&outcome).unwrap();
            let back: EvaluationOutcome = serde_json::from_str(&json).unwrap();
            assert_eq!(outcome, back);
        }
    }

    #[test]
    fn test_outcome_rejects_mixed_shape() {
        let mixed = json!({ "success": true, "error": "confused" });
        assert!(serde_json::from_value::<EvaluationOutcome>(mixed).is_err());
    }

    #[test]
    fn test_input_context_defaults_to_empty_object() {
        let input: EvaluationInput = serde_json::from_value(json!({
            "code": "fn validateSOD() {}",
            "user": { "id": 1 },
            "action": { "kind": "approve" }
        }))
        .unwrap();
        assert_eq!(input.context, json!({}));
    }
}
