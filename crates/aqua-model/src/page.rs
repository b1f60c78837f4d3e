//! Page references.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const NS_MAIN: i32 = 0;
pub const NS_FILE: i32 = 6;
pub const NS_TEMPLATE: i32 = 10;
pub const NS_CATEGORY: i32 = 14;

const NAMESPACE_PREFIXES: &[(&str, i32)] = &[
    ("File", NS_FILE),
    ("Image", NS_FILE),
    ("Media", NS_FILE),
    ("Template", NS_TEMPLATE),
    ("Category", NS_CATEGORY),
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PageRefError {
    #[error("page title is empty")]
    Empty,

    #[error("page title contains illegal character {0:?}")]
    IllegalCharacter(char),
}

/// A namespaced page, identified by its database key.
///
/// The database key uses underscores for spaces and an upper-cased first
/// letter, so `"main page"` and `"Main_page"` refer to the same page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageRef {
    #[serde(rename = "ns")]
    pub namespace: i32,
    pub dbkey: String,
}

impl PageRef {
    pub fn new(namespace: i32, dbkey: &str) -> Result<Self, PageRefError> {
        let dbkey = normalize_dbkey(dbkey)?;
        Ok(Self { namespace, dbkey })
    }

    /// Parse a human-readable title such as `"Template:Infobox city"`.
    ///
    /// Known namespace prefixes are matched case-insensitively; anything else
    /// is a main-namespace page whose key keeps the colon.
    pub fn parse(title: &str) -> Result<Self, PageRefError> {
        let title = title.trim().trim_start_matches(':');
        if let Some((prefix, rest)) = title.split_once(':') {
            let prefix = prefix.trim();
            if let Some((_, ns)) = NAMESPACE_PREFIXES
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(prefix))
            {
                return Self::new(*ns, rest);
            }
        }
        Self::new(NS_MAIN, title)
    }

    pub fn main(dbkey: &str) -> Result<Self, PageRefError> {
        Self::new(NS_MAIN, dbkey)
    }

    /// Canonical prefixed title, e.g. `File:Logo.png`.
    pub fn prefixed_dbkey(&self) -> String {
        match namespace_name(self.namespace) {
            Some(name) => format!("{name}:{}", self.dbkey),
            None if self.namespace == NS_MAIN => self.dbkey.clone(),
            None => format!("{}:{}", self.namespace, self.dbkey),
        }
    }

    pub fn is_file(&self) -> bool {
        self.namespace == NS_FILE
    }
}

impl fmt::Display for PageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.prefixed_dbkey().replace('_', " "))
    }
}

fn namespace_name(ns: i32) -> Option<&'static str> {
    match ns {
        NS_FILE => Some("File"),
        NS_TEMPLATE => Some("Template"),
        NS_CATEGORY => Some("Category"),
        _ => None,
    }
}

fn normalize_dbkey(raw: &str) -> Result<String, PageRefError> {
    let collapsed = raw
        .split(|c: char| c == ' ' || c == '_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    if collapsed.is_empty() {
        return Err(PageRefError::Empty);
    }
    if let Some(bad) = collapsed
        .chars()
        .find(|c| matches!(c, '[' | ']' | '{' | '}' | '|' | '#' | '<' | '>'))
    {
        return Err(PageRefError::IllegalCharacter(bad));
    }
    let mut chars = collapsed.chars();
    let first = chars.next().map(|c| c.to_uppercase().collect::<String>());
    Ok(first.unwrap_or_default() + chars.as_str())
}
