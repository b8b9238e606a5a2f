//! Conversation turns

use serde::{Deserialize, Serialize};

/// What produced a turn (bookkeeping only, the prompt is plain text)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnKind {
    System,
    Response,
    Observation,
    Reflection,
    Summary,
    PlanData,
}

/// One opaque unit of conversation history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub kind: TurnKind,
    pub text: String,
}

impl Turn {
    pub fn new(kind: TurnKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(TurnKind::System, text)
    }

    pub fn response(text: impl Into<String>) -> Self {
        Self::new(TurnKind::Response, text)
    }

    pub fn observation(text: impl Into<String>) -> Self {
        Self::new(TurnKind::Observation, text)
    }

    pub fn reflection(text: impl Into<String>) -> Self {
        Self::new(TurnKind::Reflection, text)
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// 턴 목록의 추정 토큰 수 (문자 수 / 4)
pub fn estimate_tokens(turns: &[Turn]) -> usize {
    turns.iter().map(Turn::char_len).sum::<usize>() / 4
}

/// LLM 프롬프트: 모든 턴을 빈 줄로 이어 붙이고 반복 표시를 덧붙임
pub fn render_prompt(turns: &[Turn], iteration: u32, max_iterations: u32) -> String {
    let mut prompt = turns
        .iter()
        .map(|t| t.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    prompt.push_str(&format!("\n\n[Iteration {}/{}]", iteration, max_iterations));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_tokens() {
        let turns = vec![Turn::system("a".repeat(400)), Turn::response("b".repeat(400))];
        assert_eq!(estimate_tokens(&turns), 200);
    }

    #[test]
    fn test_render_prompt() {
        let turns = vec![Turn::system("sys"), Turn::response("Thought: x")];
        assert_eq!(
            render_prompt(&turns, 2, 30),
            "sys\n\nThought: x\n\n[Iteration 2/30]"
        );
    }
}
