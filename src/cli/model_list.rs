//! `models` command: print the built-in model catalog.

use crate::api::models::AVAILABLE_MODELS;
use crate::core::config::DEFAULT_MODEL;

pub fn list_models() {
    println!("Supported models:");
    println!();
    for model in &AVAILABLE_MODELS {
        let marker = if model.id == DEFAULT_MODEL {
            " (default)"
        } else {
            ""
        };
        println!("  {:<18} {}{}", model.id, model.description, marker);
    }
}
