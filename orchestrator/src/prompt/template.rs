//! Template variable values and the one-pass `{name}` renderer.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap());

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TemplateValue {
    String(String),
    Number(f64),
    List(Vec<String>),
    Map(HashMap<String, String>),
}

impl TemplateValue {
    fn render(&self) -> String {
        match self {
            TemplateValue::String(s) => s.clone(),
            TemplateValue::Number(n) => n.to_string(),
            TemplateValue::List(items) => items.join(", "),
            TemplateValue::Map(map) => {
                let mut entries: Vec<_> = map.iter().collect();
                entries.sort_by_key(|(k, _)| k.clone());
                entries.into_iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join(", ")
            }
        }
    }
}

impl From<&str> for TemplateValue {
    fn from(s: &str) -> Self {
        TemplateValue::String(s.to_string())
    }
}

impl From<String> for TemplateValue {
    fn from(s: String) -> Self {
        TemplateValue::String(s)
    }
}

pub type TemplateVars = HashMap<String, TemplateValue>;

/// Renders `body`, substituting every `{name}` placeholder found in `vars`. Placeholders
/// absent from `vars` are left literal — a caller inspects the result (or
/// [`crate::domain::Prompt::arguments`] beforehand) to know whether anything was missed.
/// There is no `{{escaped}}` form: a doubled brace still yields a placeholder match for
/// the inner name.
pub fn render(body: &str, vars: &TemplateVars) -> String {
    PLACEHOLDER
        .replace_all(body, |caps: &regex::Captures| {
            let name = &caps[1];
            match vars.get(name) {
                Some(value) => value.render(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}
