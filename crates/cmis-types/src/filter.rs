//! Property and rendition filter expressions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::content::Rendition;
use crate::error::TypeError;

/// Which properties a read must return.
///
/// Serializes as its wire expression.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PropertyFilter {
    /// Every property (`*`).
    All,
    /// The listed query names only.
    Names(Vec<String>),
}

impl PropertyFilter {
    /// Parse a comma-separated list of query names, or `*`.
    pub fn parse(expression: &str) -> Result<Self, TypeError> {
        let expression = expression.trim();
        if expression == "*" {
            return Ok(Self::All);
        }
        let names = split_terms(expression)?;
        if names.iter().any(|n| n == "*") {
            return Err(invalid(expression, "'*' cannot be combined with names"));
        }
        Ok(Self::Names(names))
    }

    /// Whether the property with the given id is selected.
    pub fn selects(&self, property_id: &str) -> bool {
        match self {
            Self::All => true,
            Self::Names(names) => names.iter().any(|n| n == property_id),
        }
    }

    /// The filter expression in wire form.
    pub fn expression(&self) -> String {
        match self {
            Self::All => "*".into(),
            Self::Names(names) => names.join(","),
        }
    }
}

impl fmt::Display for PropertyFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression())
    }
}

impl FromStr for PropertyFilter {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PropertyFilter {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PropertyFilter> for String {
    fn from(filter: PropertyFilter) -> Self {
        filter.expression()
    }
}

/// Which renditions a read must return.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RenditionFilter {
    /// No renditions (`cmis:none`).
    #[default]
    None,
    /// Every rendition (`*`).
    All,
    /// Renditions whose kind or mime type matches one of the terms. Mime
    /// terms may use a `type/*` wildcard.
    Terms(Vec<String>),
}

impl RenditionFilter {
    pub const NONE_EXPRESSION: &'static str = "cmis:none";

    pub fn parse(expression: &str) -> Result<Self, TypeError> {
        let expression = expression.trim();
        match expression {
            Self::NONE_EXPRESSION => return Ok(Self::None),
            "*" => return Ok(Self::All),
            _ => {}
        }
        let terms = split_terms(expression)?;
        if terms.iter().any(|t| t == "*" || t == Self::NONE_EXPRESSION) {
            return Err(invalid(
                expression,
                "'*' and 'cmis:none' cannot be combined with other terms",
            ));
        }
        Ok(Self::Terms(terms))
    }

    pub fn matches(&self, rendition: &Rendition) -> bool {
        match self {
            Self::None => false,
            Self::All => true,
            Self::Terms(terms) => terms
                .iter()
                .any(|t| *t == rendition.kind || mime_matches(t, &rendition.mime_type)),
        }
    }

    pub fn expression(&self) -> String {
        match self {
            Self::None => Self::NONE_EXPRESSION.into(),
            Self::All => "*".into(),
            Self::Terms(terms) => terms.join(","),
        }
    }
}

impl fmt::Display for RenditionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression())
    }
}

impl FromStr for RenditionFilter {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RenditionFilter {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RenditionFilter> for String {
    fn from(filter: RenditionFilter) -> Self {
        filter.expression()
    }
}

fn mime_matches(term: &str, mime_type: &str) -> bool {
    match term.strip_suffix("/*") {
        Some(major) => mime_type
            .split_once('/')
            .is_some_and(|(m, _)| m.eq_ignore_ascii_case(major)),
        None => term.eq_ignore_ascii_case(mime_type),
    }
}

fn split_terms(expression: &str) -> Result<Vec<String>, TypeError> {
    if expression.is_empty() {
        return Err(invalid(expression, "empty expression"));
    }
    expression
        .split(',')
        .map(|raw| {
            let term = raw.trim();
            if term.is_empty() {
                Err(invalid(expression, "empty term"))
            } else if term.chars().any(char::is_whitespace) {
                Err(invalid(expression, "whitespace inside a term"))
            } else {
                Ok(term.to_string())
            }
        })
        .collect()
}

fn invalid(expression: &str, reason: &str) -> TypeError {
    TypeError::InvalidFilter {
        filter: expression.to_string(),
        reason: reason.to_string(),
    }
}
