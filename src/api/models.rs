//! Built-in catalog of models the relay accepts.

use super::ModelInfo;

pub struct ModelEntry {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

pub const AVAILABLE_MODELS: [ModelEntry; 4] = [
    ModelEntry {
        id: "gemini-1.5-pro",
        name: "Gemini 1.5 Pro",
        description: "Most capable model for complex tasks",
    },
    ModelEntry {
        id: "gemini-1.5-flash",
        name: "Gemini 1.5 Flash",
        description: "Fast and versatile performance",
    },
    ModelEntry {
        id: "gemini-2.5-flash",
        name: "Gemini 2.5 Flash",
        description: "Best for fast responses",
    },
    ModelEntry {
        id: "gemini-2.5-pro",
        name: "Gemini 2.5 Pro",
        description: "Best for complex challenges",
    },
];

pub fn available_models() -> Vec<ModelInfo> {
    AVAILABLE_MODELS
        .iter()
        .map(|entry| ModelInfo {
            id: entry.id.to_string(),
            name: entry.name.to_string(),
            description: entry.description.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_lists_the_default_model_first() {
        let models = available_models();
        assert_eq!(models[0].id, crate::core::config::DEFAULT_MODEL);
        assert_eq!(models.len(), AVAILABLE_MODELS.len());
    }
}
