//! Ad-hoc unit classification

use regex::Regex;

use crate::model::UnitId;

/// Marker carried by the identifiers of synthetic command-line units.
pub const COMMAND_LINE_ARGUMENTS: &str = "command-line-arguments";

/// Decides whether a unit is a synthetic ad-hoc unit, i.e. a placeholder for
/// files the build system could not assign to a real unit.
pub trait AdHocClassifier: Send + Sync {
    fn is_ad_hoc(&self, id: &UnitId) -> bool;
}

impl<F> AdHocClassifier for F
where
    F: Fn(&UnitId) -> bool + Send + Sync,
{
    fn is_ad_hoc(&self, id: &UnitId) -> bool {
        self(id)
    }
}

/// Treats any identifier containing [`COMMAND_LINE_ARGUMENTS`] as ad-hoc.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandLineArguments;

impl AdHocClassifier for CommandLineArguments {
    fn is_ad_hoc(&self, id: &UnitId) -> bool {
        id.as_str().contains(COMMAND_LINE_ARGUMENTS)
    }
}

/// Treats identifiers matching a regular expression as ad-hoc.
#[derive(Debug, Clone)]
pub struct PatternClassifier {
    pattern: Regex,
}

impl PatternClassifier {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }
}

impl AdHocClassifier for PatternClassifier {
    fn is_ad_hoc(&self, id: &UnitId) -> bool {
        self.pattern.is_match(id.as_str())
    }
}
