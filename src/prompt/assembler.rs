use serde_json::Value;

use crate::{
    context::AssembledContext,
    models::FormConfiguration,
    prompt::{
        builder::{build_context_block, build_output_contract, build_system_prompt, build_task_prompt},
        schema::activities_schema,
    },
    utils::char_len,
};

const PART_SEPARATOR: &str = "\n\n";

/// Everything sent to the model for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledPrompt {
    /// Persona and grounding rule
    pub system: String,
    /// Optional context block, task instruction and output contract
    pub user: String,
    /// Machine-checked form of the output contract
    pub schema: Value,
    pub quantity: u8,
    pub grounded: bool,
}

impl AssembledPrompt {
    /// Single-message rendering for backends without a system role.
    pub fn full_text(&self) -> String {
        format!("{}{PART_SEPARATOR}{}", self.system, self.user)
    }

    pub fn char_len(&self) -> usize {
        char_len(&self.system) + char_len(PART_SEPARATOR) + char_len(&self.user)
    }
}

/// Builds prompts under a fixed ceiling on total prompt characters.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    safe_char_limit: usize,
}

impl PromptAssembler {
    pub fn new(safe_char_limit: usize) -> Self {
        Self { safe_char_limit }
    }

    pub fn safe_char_limit(&self) -> usize {
        self.safe_char_limit
    }

    /// Characters left for retrieved context once the fixed prompt parts are
    /// accounted for. Zero when the fixed parts alone reach the limit.
    pub fn context_budget(&self, form: &FormConfiguration, has_documents: bool) -> usize {
        let fixed = char_len(&build_system_prompt())
            + char_len(PART_SEPARATOR)
            + char_len(&build_task_prompt(form))
            + char_len(PART_SEPARATOR)
            + char_len(&build_output_contract(form.quantity, has_documents));
        let wrapper = if has_documents {
            char_len(&build_context_block(""))
        } else {
            0
        };
        self.safe_char_limit.saturating_sub(fixed + wrapper)
    }

    pub fn assemble(&self, form: &FormConfiguration, context: &AssembledContext) -> AssembledPrompt {
        let grounded = !context.is_empty();
        let task = build_task_prompt(form);
        let contract = build_output_contract(form.quantity, grounded);

        let user = if grounded {
            format!(
                "{}{task}{PART_SEPARATOR}{contract}",
                build_context_block(context.as_str())
            )
        } else {
            format!("{task}{PART_SEPARATOR}{contract}")
        };

        AssembledPrompt {
            system: build_system_prompt(),
            user,
            schema: activities_schema(form.quantity),
            quantity: form.quantity,
            grounded,
        }
    }
}

impl Default for PromptAssembler {
    fn default() -> Self {
        Self::new(crate::shared::config::DEFAULT_SAFE_CHAR_LIMIT)
    }
}
