// Released under MIT License.
// Copyright (c) 2023-2025 Ladislav Bartos

//! Implementation of the Name enum for the selection language.

use regex::Regex;
use std::fmt;

use crate::errors::SelectError;

/// Atom or residue name used in a selection query.
/// Either a literal string or a regular expression written as `r'...'`.
#[derive(Debug, Clone)]
pub enum Name {
    String(String),
    Regex(Regex),
}

impl Name {
    /// Create new `Name` enum. `Name` enum contains either a String or a Regex.
    pub fn new(string: &str) -> Result<Self, SelectError> {
        if string.starts_with("r'") && string.ends_with('\'') && string.len() >= 3 {
            let regex = Regex::new(&string[2..string.len() - 1])
                .map_err(|_| SelectError::InvalidRegex(string.to_owned()))?;

            Ok(Name::Regex(regex))
        } else {
            Ok(Name::String(string.to_owned()))
        }
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Name::String(s) => write!(f, "{}", s),
            Name::Regex(r) => write!(f, "r'{}'", r),
        }
    }
}

impl PartialEq<Name> for Name {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Name::String(s), Name::String(t)) => s == t,
            (Name::Regex(s), Name::Regex(t)) => s.as_str() == t.as_str(),
            _ => false,
        }
    }
}

impl PartialEq<str> for Name {
    /// Check whether the name matches the provided string.
    /// Regular expressions match if they are found anywhere in the string.
    fn eq(&self, other: &str) -> bool {
        match self {
            Name::String(s) => s == other,
            Name::Regex(r) => r.is_match(other),
        }
    }
}

/******************************/
/*         UNIT TESTS         */
/******************************/
