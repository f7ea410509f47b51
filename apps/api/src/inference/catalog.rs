//! Default backend catalog, in priority order.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use super::{CostProfile, ModelBackend, ModelFamily, ModelTransport};

/// Static description of a backend before a transport is attached.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub id: Cow<'static, str>,
    pub name: Cow<'static, str>,
    pub input_per_million: f64,
    pub output_per_million: f64,
    pub max_tokens: u32,
}

/// Resume optimization chain: DeepSeek R1 first, then Claude 3.5 Sonnet, then Claude 3
/// Haiku. Overridable with `MODEL_CHAIN`.
pub const OPTIMIZATION_MODELS: &[CatalogEntry] = &[
    CatalogEntry {
        id: Cow::Borrowed("us.deepseek.r1-v1:0"),
        name: Cow::Borrowed("DeepSeek R1"),
        input_per_million: 0.55,
        output_per_million: 2.19,
        max_tokens: 4000,
    },
    CatalogEntry {
        id: Cow::Borrowed("anthropic.claude-3-5-sonnet-20240620-v1:0"),
        name: Cow::Borrowed("Claude 3.5 Sonnet"),
        input_per_million: 3.00,
        output_per_million: 15.00,
        max_tokens: 4000,
    },
    CatalogEntry {
        id: Cow::Borrowed("anthropic.claude-3-haiku-20240307-v1:0"),
        name: Cow::Borrowed("Claude 3 Haiku"),
        input_per_million: 0.25,
        output_per_million: 1.25,
        max_tokens: 4000,
    },
];

/// ATS scoring chain.
pub const SCORING_MODELS: &[CatalogEntry] = &[
    CatalogEntry {
        id: Cow::Borrowed("anthropic.claude-3-sonnet-20240229-v1:0"),
        name: Cow::Borrowed("Claude 3 Sonnet"),
        input_per_million: 3.00,
        output_per_million: 15.00,
        max_tokens: 4096,
    },
    CatalogEntry {
        id: Cow::Borrowed("anthropic.claude-3-haiku-20240307-v1:0"),
        name: Cow::Borrowed("Claude 3 Haiku"),
        input_per_million: 0.25,
        output_per_million: 1.25,
        max_tokens: 4096,
    },
];

/// Direct Anthropic API backend appended when an API key is configured.
pub const ANTHROPIC_API_MODEL: CatalogEntry = CatalogEntry {
    id: Cow::Borrowed("claude-sonnet-4-5"),
    name: Cow::Borrowed("Claude Sonnet 4.5 (Anthropic API)"),
    input_per_million: 3.00,
    output_per_million: 15.00,
    max_tokens: 4096,
};

impl CatalogEntry {
    pub fn into_backend(self, transport: Arc<dyn ModelTransport>, timeout: Duration) -> ModelBackend {
        ModelBackend {
            family: ModelFamily::from_model_id(&self.id),
            id: self.id.into_owned(),
            name: self.name.into_owned(),
            cost: CostProfile {
                input_per_million: self.input_per_million,
                output_per_million: self.output_per_million,
            },
            max_tokens: self.max_tokens,
            timeout,
            transport,
        }
    }
}

/// Applies a `MODEL_CHAIN` selection. Ids not in the catalog are treated as Bedrock
/// model ids with a family inferred from the name and no cost data.
pub fn select(entries: &[CatalogEntry], selection: Option<&[String]>) -> Vec<CatalogEntry> {
    let Some(ids) = selection else {
        return entries.to_vec();
    };
    ids.iter()
        .map(|id| {
            entries
                .iter()
                .find(|e| e.id == id.as_str())
                .cloned()
                .unwrap_or_else(|| CatalogEntry {
                    id: Cow::Owned(id.clone()),
                    name: Cow::Owned(id.clone()),
                    input_per_million: 0.0,
                    output_per_million: 0.0,
                    max_tokens: 4000,
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_order() {
        let ids: Vec<String> = select(OPTIMIZATION_MODELS, None).iter().map(|e| e.id.to_string()).collect();
        assert_eq!(
            ids,
            vec![
                "us.deepseek.r1-v1:0",
                "anthropic.claude-3-5-sonnet-20240620-v1:0",
                "anthropic.claude-3-haiku-20240307-v1:0"
            ]
        );
    }

    #[test]
    fn test_selection_reorders_and_accepts_unknown_ids() {
        let selection = vec![
            "anthropic.claude-3-haiku-20240307-v1:0".to_string(),
            "amazon.nova-pro-v1:0".to_string(),
        ];
        let entries = select(OPTIMIZATION_MODELS, Some(&selection));
        assert_eq!(entries[0].name, "Claude 3 Haiku");
        assert_eq!(entries[1].id, "amazon.nova-pro-v1:0");
        assert_eq!(ModelFamily::from_model_id(&entries[1].id), ModelFamily::Nova);
    }
}
