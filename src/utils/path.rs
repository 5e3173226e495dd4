use std::env;

use log::error;

/// Current directory for the prompt; empty when it cannot be determined
/// (for example after the directory was removed).
pub fn current_dir() -> String {
    let current_dir = match env::current_dir() {
        Ok(x) => x,
        Err(e) => {
            error!("quash: PROMPT: env current_dir error: {}", e);
            return String::new();
        }
    };
    match current_dir.to_str() {
        Some(x) => x.to_string(),
        None => current_dir.to_string_lossy().into_owned(),
    }
}
