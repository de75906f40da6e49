//! Prompt: a named, user-owned template with `{placeholder}` variables.
//!
//! Identity is `(category, name, user_id)`. Arguments are not stored separately — they
//! are derived by scanning the body, so renaming a placeholder in the text is the only
//! edit needed to change a prompt's argument list.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::context::UserId;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PromptKey {
    pub category: String,
    pub name: String,
    pub user_id: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompt {
    pub key: PromptKey,
    pub body: String,
}

impl Prompt {
    pub fn new(category: impl Into<String>, name: impl Into<String>, user_id: UserId, body: impl Into<String>) -> Self {
        Self {
            key: PromptKey {
                category: category.into(),
                name: name.into(),
                user_id,
            },
            body: body.into(),
        }
    }

    /// Scans `{name}` placeholders in the body. There is no `{{escaped}}` form: a doubled
    /// brace still yields a placeholder match for the inner name. Order follows first
    /// appearance; duplicates are collapsed.
    pub fn arguments(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for cap in PLACEHOLDER.captures_iter(&self.body) {
            let name = cap[1].to_string();
            if seen.insert(name.clone()) {
                out.push(name);
            }
        }
        out
    }

    pub fn rename(&mut self, new_name: impl Into<String>) {
        self.key.name = new_name.into();
    }
}
