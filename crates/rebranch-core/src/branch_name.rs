//! Branch name validation and newtype.
//!
//! Names handed to rebranch end up as arguments to `git`, so besides git's
//! own ref-format rules they must not look like options or carry shell
//! metacharacters.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

/// A validated local branch name.
///
/// # Examples
///
/// ```
/// use rebranch_core::BranchName;
///
/// assert!(BranchName::new("feature/auth").is_ok());
/// assert!(BranchName::new("--force").is_err());
/// assert!(BranchName::new("branch..name").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BranchName(String);

/// Characters git refuses in ref names.
const GIT_FORBIDDEN: &[char] = &[' ', '~', '^', ':', '?', '*', '['];

/// Characters with meaning to a shell.
const SHELL_META: &[char] = &[
    '$', ';', '|', '&', '>', '<', '`', '\\', '"', '\'', '(', ')', '{', '}', '!',
];

/// Substrings git refuses anywhere in a ref name.
const FORBIDDEN_SEQUENCES: &[(&str, &str)] = &[
    ("..", "branch name cannot contain '..'"),
    ("//", "branch name cannot contain '//'"),
    ("@{", "branch name cannot contain '@{'"),
    ("/.", "branch name component cannot start with '.'"),
];

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBranchName`] if the name violates git's
    /// branch naming rules or could be misread as an option.
    pub fn new(name: impl Into<String>) -> Result<Self, Error> {
        let name = name.into();
        match invalid_reason(&name) {
            Some(reason) => Err(Error::InvalidBranchName {
                name,
                reason: reason.into_owned(),
            }),
            None => Ok(Self(name)),
        }
    }

    /// Get the branch name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the `BranchName` and return the inner `String`.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

fn invalid_reason(name: &str) -> Option<std::borrow::Cow<'static, str>> {
    use std::borrow::Cow;

    if name.is_empty() {
        return Some(Cow::Borrowed("branch name cannot be empty"));
    }
    if name == "@" {
        return Some(Cow::Borrowed("branch name cannot be '@'"));
    }
    if let Some(first) = name.chars().next().filter(|c| matches!(c, '.' | '-' | '/')) {
        return Some(Cow::Owned(format!("branch name cannot start with '{first}'")));
    }
    if let Some(last) = name.chars().last().filter(|c| matches!(c, '.' | '/')) {
        return Some(Cow::Owned(format!("branch name cannot end with '{last}'")));
    }
    #[allow(clippy::case_sensitive_file_extension_comparisons)]
    if name.ends_with(".lock") {
        return Some(Cow::Borrowed("branch name cannot end with '.lock'"));
    }
    if name.chars().any(|c| c.is_ascii_control()) {
        return Some(Cow::Borrowed("branch name cannot contain control characters"));
    }
    if let Some(c) = name.chars().find(|c| GIT_FORBIDDEN.contains(c)) {
        return Some(Cow::Owned(format!("branch name cannot contain '{c}'")));
    }
    if let Some(c) = name.chars().find(|c| SHELL_META.contains(c)) {
        return Some(Cow::Owned(format!(
            "branch name cannot contain shell metacharacter '{c}'"
        )));
    }
    FORBIDDEN_SEQUENCES
        .iter()
        .find(|(seq, _)| name.contains(seq))
        .map(|(_, reason)| Cow::Borrowed(*reason))
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::ops::Deref for BranchName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::borrow::Borrow<str> for BranchName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for BranchName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for BranchName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Serialize for BranchName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for BranchName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}
