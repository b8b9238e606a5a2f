//! Context summarizer
//!
//! 턴이 많아지고 추정 토큰이 임계값을 넘으면 오래된 턴들을 LLM 요약 하나로 바꿉니다.
//!
//! ```text
//! before: [system, t1, t2, ..., tN-k, | recent k turns]
//! after:  [system, summary, plan data?, | recent k turns]
//! ```
//!
//! - 0번 턴(시스템 프롬프트)은 항상 그대로 유지
//! - 최근 `2 * keep_recent_pairs`개 턴은 그대로 유지
//! - 계획 JSON 조각은 요약과 별도로 원문 보존
//! - 요약 호출이 실패하면 잘라내기만 함 (오류를 올려보내지 않음)

use crate::prompts::{render, PLAN_DATA_MARKER, SUMMARIZE_TEMPLATE, SUMMARY_MARKER};
use crate::turn::{estimate_tokens, Turn, TurnKind};
use lingo_foundation::CompactionSettings;
use lingo_provider::{CompletionRequest, GenerationConfig, Provider, TokenUsage};
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, warn};

/// 중첩 한 단계까지의 `{...}` 후보
static OBJECT_CANDIDATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{(?:[^{}]|\{[^{}]*\})*\}").expect("object candidate regex")
});

static PLAN_KEYS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""(?:plan|plan_id|goal|steps)"\s*:"#).expect("plan keys regex")
});

static STEP_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""step"\s*:"#).expect("step key regex"));

static STEP_STATE_KEYS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""(?:status|progress)"\s*:"#).expect("step state regex"));

/// Result of one compaction
#[derive(Debug, Clone)]
pub struct Compaction {
    pub turns: Vec<Turn>,
    /// LLM 요약이 들어갔는지 (false면 잘라내기만 함)
    pub summarized: bool,
    pub plan_fragments: usize,
    /// 요약 호출 토큰 사용량
    pub usage: Option<TokenUsage>,
}

/// Decides when to compact and performs it
pub struct ContextSummarizer {
    provider: Arc<dyn Provider>,
    settings: CompactionSettings,
    template: String,
    max_output_tokens: u32,
}

impl ContextSummarizer {
    pub fn new(provider: Arc<dyn Provider>, settings: CompactionSettings) -> Self {
        Self {
            provider,
            settings,
            template: SUMMARIZE_TEMPLATE.to_string(),
            max_output_tokens: 4096,
        }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = tokens;
        self
    }

    pub fn settings(&self) -> &CompactionSettings {
        &self.settings
    }

    /// 압축 대상인지
    ///
    /// 최소 턴 수는 `effective_min_turns()`를 쓰므로 압축 직후의 결과는
    /// 다시 대상이 되지 않습니다.
    pub fn should_compact(&self, turns: &[Turn]) -> bool {
        let non_system = turns.len().saturating_sub(1);
        non_system >= self.settings.effective_min_turns()
            && estimate_tokens(turns) > self.settings.token_threshold
    }

    /// 압축 수행. 실패하지 않음
    pub async fn compact(&self, turns: &[Turn]) -> Compaction {
        let keep = self.settings.keep_recent_turns();
        if turns.len() <= keep + 1 {
            return Compaction {
                turns: turns.to_vec(),
                summarized: false,
                plan_fragments: 0,
                usage: None,
            };
        }

        let split = turns.len() - keep;
        let middle = &turns[1..split];
        let suffix = &turns[split..];

        let fragments = extract_plan_fragments(&turns[1..]);
        debug!(
            middle = middle.len(),
            kept = suffix.len(),
            fragments = fragments.len(),
            "Compacting context"
        );

        let mut out = vec![turns[0].clone()];
        let (summarized, usage) = match self.summarize(middle).await {
            Ok((summary, usage)) => {
                out.push(Turn::new(
                    TurnKind::Summary,
                    format!("{}\n{}", SUMMARY_MARKER, summary),
                ));
                if !fragments.is_empty() {
                    out.push(Turn::new(
                        TurnKind::PlanData,
                        format!("{}\n{}", PLAN_DATA_MARKER, fragments.join("\n")),
                    ));
                }
                (true, Some(usage))
            }
            Err(reason) => {
                warn!(error = %reason, "Context summarization failed, truncating instead");
                (false, None)
            }
        };
        out.extend_from_slice(suffix);

        info!(
            before = turns.len(),
            after = out.len(),
            summarized,
            "Context compacted"
        );
        Compaction {
            turns: out,
            summarized,
            plan_fragments: if summarized { fragments.len() } else { 0 },
            usage,
        }
    }

    async fn summarize(&self, middle: &[Turn]) -> Result<(String, TokenUsage), String> {
        let block = format_for_summary(middle, self.settings.max_turn_chars);
        let original_chars = block.chars().count();
        let ratio = self.settings.target_ratio.clamp(0.05, 1.0);
        let target_chars = ((original_chars as f32) * ratio) as usize;

        let prompt = render(
            &self.template,
            &[
                ("turns", block),
                ("target_percent", format!("{:.0}", ratio * 100.0)),
                ("target_chars", target_chars.to_string()),
            ],
        );
        let request = CompletionRequest::new(prompt).with_config(GenerationConfig {
            temperature: 0.2,
            max_output_tokens: self.max_output_tokens,
        });

        let response = self
            .provider
            .complete(&request)
            .await
            .map_err(|e| e.to_string())?;

        let summary = response.text.trim();
        if summary.is_empty() {
            return Err("empty summary".to_string());
        }
        Ok((summary.to_string(), response.usage))
    }
}

/// 요약 입력 블록. 각 턴은 `max_chars`에서 자름
fn format_for_summary(turns: &[Turn], max_chars: usize) -> String {
    turns
        .iter()
        .map(|turn| {
            let label = match turn.kind {
                TurnKind::System => "system",
                TurnKind::Response => "agent",
                TurnKind::Observation => "observation",
                TurnKind::Reflection => "reflection",
                TurnKind::Summary => "earlier summary",
                TurnKind::PlanData => "plan data",
            };
            let text = if turn.char_len() > max_chars {
                let head: String = turn.text.chars().take(max_chars).collect();
                format!("{} [...truncated]", head)
            } else {
                turn.text.clone()
            };
            format!("[{}]\n{}", label, text)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// 계획 모양의 JSON 조각 (중첩 깊이를 따지지 않는 패턴 추출, 중복 제거)
pub fn extract_plan_fragments(turns: &[Turn]) -> Vec<String> {
    let mut fragments: Vec<String> = Vec::new();
    for turn in turns {
        for candidate in OBJECT_CANDIDATE.find_iter(&turn.text) {
            let text = candidate.as_str();
            let plan_shaped = PLAN_KEYS.is_match(text)
                || (STEP_KEY.is_match(text) && STEP_STATE_KEYS.is_match(text));
            if plan_shaped && !fragments.iter().any(|f| f == text) {
                fragments.push(text.to_string());
            }
        }
    }
    fragments
}

#[cfg(test)]
mod tests {
    use super::*;
    use lingo_provider::{ProviderError, ScriptStep, ScriptedProvider};

    fn settings() -> CompactionSettings {
        CompactionSettings {
            min_turns: 4,
            token_threshold: 100,
            keep_recent_pairs: 1,
            max_turn_chars: 50,
            target_ratio: 0.3,
        }
    }

    fn long_history(n: usize) -> Vec<Turn> {
        let mut turns = vec![Turn::system("SYSTEM PROMPT")];
        for i in 0..n {
            turns.push(Turn::response(format!("Thought: step {} {}", i, "x".repeat(200))));
        }
        turns
    }

    #[test]
    fn test_should_compact_requires_both_thresholds() {
        let provider = Arc::new(ScriptedProvider::new(Vec::<String>::new()));
        let summarizer = ContextSummarizer::new(provider, settings());

        // 턴 수 부족 (effective min = max(4, 2*1+3) = 5)
        assert!(!summarizer.should_compact(&long_history(4)));
        assert!(summarizer.should_compact(&long_history(6)));

        // 토큰 부족
        let short: Vec<Turn> = (0..10).map(|_| Turn::response("hi")).collect();
        assert!(!summarizer.should_compact(&short));
    }

    #[tokio::test]
    async fn test_compact_keeps_system_and_suffix() {
        let provider = ScriptedProvider::new(["Read lesson 1 and added two words."]);
        let summarizer = ContextSummarizer::new(Arc::new(provider.clone()), settings());
        let turns = long_history(8);

        let result = summarizer.compact(&turns).await;
        assert!(result.summarized);
        assert_eq!(result.turns[0], turns[0]);
        assert_eq!(result.turns[1].kind, TurnKind::Summary);
        assert!(result.turns[1].text.contains("added two words"));
        assert_eq!(&result.turns[result.turns.len() - 2..], &turns[turns.len() - 2..]);
        assert!(!summarizer.should_compact(&result.turns));

        // 각 턴은 max_turn_chars에서 잘림
        let prompt = &provider.prompts()[0];
        assert!(prompt.contains("[...truncated]"));
        assert!(prompt.contains("30%"));
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_truncation() {
        let provider = ScriptedProvider::new(Vec::<String>::new());
        provider.push(ScriptStep::Fail(ProviderError::Network("offline".into())));
        let summarizer = ContextSummarizer::new(Arc::new(provider), settings());
        let turns = long_history(8);

        let result = summarizer.compact(&turns).await;
        assert!(!result.summarized);
        assert_eq!(result.turns.len(), 3);
        assert_eq!(result.turns[0], turns[0]);
        assert_eq!(result.turns[1], turns[7]);
        assert!(!summarizer.should_compact(&result.turns));
    }

    #[tokio::test]
    async fn test_plan_fragments_preserved() {
        let provider = ScriptedProvider::new(["summary"]);
        let summarizer = ContextSummarizer::new(Arc::new(provider), settings());
        let mut turns = long_history(6);
        turns.insert(
            2,
            Turn::observation(
                r#"Observation: {"success": true, "metadata": {"plan": {"plan_id": "plan_1", "goal": "Add words", "steps": [{"step": 1, "description": "Read", "status": "complete"}]}}}"#,
            ),
        );

        let result = summarizer.compact(&turns).await;
        assert_eq!(result.plan_fragments, 1);
        let plan_turn = &result.turns[2];
        assert_eq!(plan_turn.kind, TurnKind::PlanData);
        assert!(plan_turn.text.contains(r#""plan_id": "plan_1""#));
        assert!(plan_turn.text.contains(r#""status": "complete""#));
    }

    #[tokio::test]
    async fn test_short_history_unchanged() {
        let provider = ScriptedProvider::new(Vec::<String>::new());
        let summarizer = ContextSummarizer::new(Arc::new(provider.clone()), settings());
        let turns = long_history(2);
        let result = summarizer.compact(&turns).await;
        assert_eq!(result.turns, turns);
        assert_eq!(provider.call_count(), 0);
    }

    #[test]
    fn test_extract_step_fragments() {
        let turns = vec![Turn::response(
            r#"I updated {"step": 2, "status": "in_progress"} and {"word": "hola"}"#,
        )];
        let fragments = extract_plan_fragments(&turns);
        assert_eq!(fragments, vec![r#"{"step": 2, "status": "in_progress"}"#]);
    }
}
