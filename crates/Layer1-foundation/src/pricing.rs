//! Pricing - 모델별 토큰 비용 계산
//!
//! 가격은 모두 1M 토큰당 USD 입니다. 일부 모델은 프롬프트 길이에 따라
//! 단가가 달라지므로 (예: Gemini 2.5 Pro는 200k 토큰 초과 시 인상) 구간별
//! 가격을 지원합니다.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

const TOKENS_PER_UNIT: f64 = 1_000_000.0;

// ============================================================================
// Rate / ModelPricing
// ============================================================================

/// 입력/출력 단가 한 쌍
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRate {
    /// 입력 토큰 가격 (1M 토큰당 USD)
    pub input_per_1m: f64,
    /// 출력 토큰 가격 (1M 토큰당 USD)
    pub output_per_1m: f64,
}

impl TokenRate {
    pub fn new(input_per_1m: f64, output_per_1m: f64) -> Self {
        Self {
            input_per_1m,
            output_per_1m,
        }
    }

    fn cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        (input_tokens as f64 / TOKENS_PER_UNIT) * self.input_per_1m
            + (output_tokens as f64 / TOKENS_PER_UNIT) * self.output_per_1m
    }
}

/// 모델 가격 정보
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ModelPricing {
    /// 단일 단가
    #[serde(rename_all = "camelCase")]
    Flat { input_per_1m: f64, output_per_1m: f64 },

    /// 프롬프트 토큰 수가 `threshold_tokens`를 넘으면 `above` 단가 적용
    #[serde(rename_all = "camelCase")]
    Tiered {
        threshold_tokens: u64,
        base: TokenRate,
        above: TokenRate,
    },
}

impl ModelPricing {
    pub fn flat(input_per_1m: f64, output_per_1m: f64) -> Self {
        Self::Flat {
            input_per_1m,
            output_per_1m,
        }
    }

    pub fn tiered(threshold_tokens: u64, base: TokenRate, above: TokenRate) -> Self {
        Self::Tiered {
            threshold_tokens,
            base,
            above,
        }
    }

    /// 호출 한 번의 비용 계산
    pub fn calculate_cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        self.rate_for(input_tokens).cost(input_tokens, output_tokens)
    }

    /// 프롬프트 길이에 맞는 단가
    pub fn rate_for(&self, input_tokens: u64) -> TokenRate {
        match *self {
            Self::Flat {
                input_per_1m,
                output_per_1m,
            } => TokenRate::new(input_per_1m, output_per_1m),
            Self::Tiered {
                threshold_tokens,
                base,
                above,
            } => {
                if input_tokens > threshold_tokens {
                    above
                } else {
                    base
                }
            }
        }
    }
}

// ============================================================================
// PricingTable
// ============================================================================

/// 모델 ID → 가격 테이블
#[derive(Debug, Clone)]
pub struct PricingTable {
    entries: HashMap<String, ModelPricing>,
}

impl PricingTable {
    /// 빈 테이블
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// 가격 추가/교체
    pub fn insert(&mut self, model: impl Into<String>, pricing: ModelPricing) {
        self.entries.insert(model.into(), pricing);
    }

    /// 설정에서 읽은 항목으로 덮어쓰기
    pub fn with_overrides(mut self, overrides: &HashMap<String, ModelPricing>) -> Self {
        for (model, pricing) in overrides {
            self.entries.insert(model.clone(), *pricing);
        }
        self
    }

    /// 모델 가격 조회
    ///
    /// 정확히 일치하는 항목이 없으면 가장 긴 접두사 항목을 사용합니다
    /// (`gemini-2.5-flash-preview-05-20` → `gemini-2.5-flash`).
    pub fn get(&self, model: &str) -> Option<&ModelPricing> {
        if let Some(pricing) = self.entries.get(model) {
            return Some(pricing);
        }

        self.entries
            .iter()
            .filter(|(id, _)| model.starts_with(id.as_str()))
            .max_by_key(|(id, _)| id.len())
            .map(|(_, pricing)| pricing)
    }

    /// 비용 계산. 모르는 모델은 0
    pub fn cost(&self, model: &str, input_tokens: u64, output_tokens: u64) -> f64 {
        match self.get(model) {
            Some(pricing) => pricing.calculate_cost(input_tokens, output_tokens),
            None => {
                warn!(model, "No pricing entry for model, cost recorded as 0");
                0.0
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 기본 모델 가격표
impl Default for PricingTable {
    fn default() -> Self {
        let mut table = Self::empty();

        // Google Gemini
        table.insert(
            "gemini-2.5-pro",
            ModelPricing::tiered(
                200_000,
                TokenRate::new(1.25, 10.0),
                TokenRate::new(2.50, 15.0),
            ),
        );
        table.insert("gemini-2.5-flash", ModelPricing::flat(0.30, 2.50));
        table.insert("gemini-2.5-flash-lite", ModelPricing::flat(0.10, 0.40));
        table.insert("gemini-2.0-flash", ModelPricing::flat(0.10, 0.40));
        table.insert("gemini-2.0-flash-lite", ModelPricing::flat(0.075, 0.30));

        // OpenAI
        table.insert("gpt-4o", ModelPricing::flat(2.50, 10.0));
        table.insert("gpt-4o-mini", ModelPricing::flat(0.15, 0.60));
        table.insert("gpt-4.1", ModelPricing::flat(2.00, 8.00));
        table.insert("gpt-4.1-mini", ModelPricing::flat(0.40, 1.60));

        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_flat_pricing() {
        let pricing = ModelPricing::flat(0.30, 2.50);
        assert!(approx(pricing.calculate_cost(1_000_000, 500_000), 1.55));
    }

    #[test]
    fn test_tiered_pricing_switches_above_threshold() {
        let pricing = ModelPricing::tiered(
            200_000,
            TokenRate::new(1.25, 10.0),
            TokenRate::new(2.50, 15.0),
        );
        // 200k 이하: 기본 단가
        assert!(approx(pricing.calculate_cost(200_000, 0), 0.25));
        // 200k 초과: 호출 전체에 상위 단가
        assert!(approx(pricing.calculate_cost(400_000, 100_000), 1.0 + 1.5));
    }

    #[test]
    fn test_table_prefix_lookup() {
        let table = PricingTable::default();
        let cost = table.cost("gemini-2.5-flash", 1_000_000, 500_000);
        assert!(approx(cost, 1.55));

        // 더 긴 접두사가 우선
        let lite = table.get("gemini-2.5-flash-lite-preview").unwrap();
        assert_eq!(*lite, ModelPricing::flat(0.10, 0.40));
    }

    #[test]
    fn test_unknown_model_is_free() {
        let table = PricingTable::default();
        assert_eq!(table.cost("mystery-model", 10_000, 10_000), 0.0);
    }

    #[test]
    fn test_overrides() {
        let mut overrides = HashMap::new();
        overrides.insert("gpt-4o".to_string(), ModelPricing::flat(1.0, 1.0));
        let table = PricingTable::default().with_overrides(&overrides);
        assert!(approx(table.cost("gpt-4o", 1_000_000, 1_000_000), 2.0));
    }

    #[test]
    fn test_pricing_serde_shape() {
        let json = serde_json::json!({"kind": "flat", "inputPer1m": 0.3, "outputPer1m": 2.5});
        let pricing: ModelPricing = serde_json::from_value(json).unwrap();
        assert_eq!(pricing, ModelPricing::flat(0.3, 2.5));
    }
}
