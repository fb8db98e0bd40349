//! LLM-as-judge evaluators.

use std::collections::BTreeMap;

use packdock_core::event::ResourceAction;
use packdock_core::names;
use packdock_core::pack::EvalDef;
use packdock_core::state::{ResourceKind, ResourceState, ResourceStatus};

use crate::orchestrate::{ApplyCx, PhaseResult};
use crate::platform::{EvalLevel, EvaluatorSpec, RatingLevel};
use crate::progress::{percent, Band};

pub(crate) const DEFAULT_MODEL: &str = "anthropic.claude-sonnet-4-20250514-v1:0";

const DEFAULT_INSTRUCTIONS: &str =
    "Evaluate the assistant's answer for accuracy, helpfulness, and adherence to the task.";

/// Appended when the instructions reference none of the trace
/// placeholders — an evaluator that never sees the conversation is
/// useless.
const DEFAULT_TAIL: &str = "\n\nConversation context:\n{context}\n\nUser input:\n{user_input}\n\nAssistant turn:\n{assistant_turn}";

const PLACEHOLDERS: [&str; 3] = ["{context}", "{assistant_turn}", "{user_input}"];

/// Compile an eval definition into the platform evaluator payload.
pub(crate) fn compile(def: &EvalDef) -> EvaluatorSpec {
    let level = match def.trigger.as_deref() {
        Some("OnSessionComplete") | Some("SampleSessions") => EvalLevel::Session,
        _ => EvalLevel::Trace,
    };

    let mut instructions = def
        .params
        .instructions
        .clone()
        .unwrap_or_else(|| DEFAULT_INSTRUCTIONS.to_string());
    if !PLACEHOLDERS.iter().any(|p| instructions.contains(p)) {
        instructions.push_str(DEFAULT_TAIL);
    }

    let model = def
        .params
        .model
        .clone()
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());

    let scale_size = def.params.rating_scale_size.unwrap_or(5).max(2);
    let rating_scale = (1..=scale_size)
        .map(|i| RatingLevel {
            value: i,
            label: format!("Score {i}"),
            definition: format!("Rating level {i} of {scale_size}"),
        })
        .collect();

    EvaluatorSpec {
        level,
        instructions,
        model,
        rating_scale,
    }
}

pub(crate) async fn run(cx: &mut ApplyCx<'_, '_>) -> PhaseResult {
    let mut result = PhaseResult::default();
    let evals: Vec<EvalDef> = cx.pack.judge_evals().cloned().collect();
    let total = evals.len();

    for (i, eval) in evals.iter().enumerate() {
        let kind = ResourceKind::Evaluator;
        let name = names::evaluator_name(&eval.id);

        if let Err(abort) =
            cx.emit_progress("Creating", &kind, &name, percent(Band::Evaluators, i, total))
        {
            result.aborted = Some(abort);
            return result;
        }

        let spec = compile(eval);
        let level = spec.level.clone();
        let model = spec.model.clone();

        match cx.client.ensure_evaluator(cx.ctx, &name, spec).await {
            Ok(created) => {
                let mut metadata = BTreeMap::new();
                metadata.insert("id".to_string(), created.id);
                metadata.insert("eval_id".to_string(), eval.id.clone());
                metadata.insert(
                    "level".to_string(),
                    match level {
                        EvalLevel::Session => "SESSION".to_string(),
                        EvalLevel::Trace => "TRACE".to_string(),
                    },
                );
                metadata.insert("model".to_string(), model);
                result.record(
                    cx,
                    ResourceState {
                        kind,
                        name,
                        arn: created.arn,
                        status: ResourceStatus::Created,
                        metadata,
                    },
                    ResourceAction::Create,
                );
            }
            Err(e) => result.record_failure(cx, "create", &kind, &name, &e),
        }

        if result.aborted.is_some() || result.cancelled {
            return result;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use packdock_core::pack::EvalParams;

    fn def(trigger: Option<&str>, params: EvalParams) -> EvalDef {
        EvalDef {
            id: "quality".into(),
            eval_type: "llm_as_judge".into(),
            trigger: trigger.map(str::to_string),
            params,
        }
    }

    #[test]
    fn session_triggers_map_to_session_level() {
        assert_eq!(
            compile(&def(Some("OnSessionComplete"), EvalParams::default())).level,
            EvalLevel::Session
        );
        assert_eq!(
            compile(&def(Some("SampleSessions"), EvalParams::default())).level,
            EvalLevel::Session
        );
        assert_eq!(
            compile(&def(Some("OnToolCall"), EvalParams::default())).level,
            EvalLevel::Trace
        );
        assert_eq!(compile(&def(None, EvalParams::default())).level, EvalLevel::Trace);
    }

    #[test]
    fn instructions_without_placeholders_get_the_tail() {
        let spec = compile(&def(
            None,
            EvalParams {
                instructions: Some("Rate politeness from 1 to 5.".into()),
                ..Default::default()
            },
        ));
        assert!(spec.instructions.starts_with("Rate politeness"));
        assert!(spec.instructions.contains("{assistant_turn}"));
    }

    #[test]
    fn instructions_with_a_placeholder_stay_untouched() {
        let spec = compile(&def(
            None,
            EvalParams {
                instructions: Some("Score {assistant_turn} for clarity.".into()),
                ..Default::default()
            },
        ));
        assert_eq!(spec.instructions, "Score {assistant_turn} for clarity.");
    }

    #[test]
    fn rating_scale_defaults_and_floor() {
        let spec = compile(&def(None, EvalParams::default()));
        assert_eq!(spec.rating_scale.len(), 5);
        assert_eq!(spec.rating_scale[0].label, "Score 1");
        assert_eq!(spec.rating_scale[4].definition, "Rating level 5 of 5");
        assert_eq!(spec.model, DEFAULT_MODEL);

        let spec = compile(&def(
            None,
            EvalParams {
                rating_scale_size: Some(1),
                ..Default::default()
            },
        ));
        assert_eq!(spec.rating_scale.len(), 2);
    }
}
