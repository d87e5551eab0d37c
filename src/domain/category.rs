use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A POI category: display label plus the provider's type code.
///
/// Categories are independent namespaces; candidates are never compared
/// across them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub label: String,
    pub code: String,
}

impl Category {
    pub fn new(label: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            code: code.into(),
        }
    }

    /// Built-in category set used when no configuration overrides it.
    pub fn defaults() -> Vec<Category> {
        vec![
            Category::new("地铁站", "150500"),
            Category::new("三甲医院", "090101"),
            Category::new("图书馆", "140500"),
            Category::new("博物馆", "140200"),
            Category::new("公园", "110101"),
            Category::new("美术馆", "140300"),
        ]
    }
}

impl FromStr for Category {
    type Err = String;

    /// Parses the CLI form `LABEL=CODE`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (label, code) = s
            .split_once('=')
            .ok_or_else(|| format!("expected LABEL=CODE, got '{}'", s))?;
        let (label, code) = (label.trim(), code.trim());
        if label.is_empty() || code.is_empty() {
            return Err(format!("category label and code must be non-empty: '{}'", s));
        }
        Ok(Category::new(label, code))
    }
}
