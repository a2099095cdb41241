//! Repository URL parsing.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a configured repository URL cannot be used.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("The repository URL is not set.")]
    Empty,

    #[error("The repository URL '{0}' is not of the form 'https://github.com/<owner>/<name>'.")]
    Malformed(String),
}

/// The repository under verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoTarget {
    /// URL as configured
    pub url: String,
    pub owner: String,
    pub name: String,
}

impl RepoTarget {
    /// Parse `https://host/<owner>/<name>[.git][/]`.
    pub fn parse(url: &str) -> Result<Self, TargetError> {
        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Err(TargetError::Empty);
        }
        let malformed = || TargetError::Malformed(trimmed.to_string());

        let rest = trimmed
            .strip_prefix("https://")
            .or_else(|| trimmed.strip_prefix("http://"))
            .ok_or_else(malformed)?;
        let rest = rest.trim_end_matches('/');
        let rest = rest.strip_suffix(".git").unwrap_or(rest);

        let segments: Vec<&str> = rest.split('/').collect();
        match segments.as_slice() {
            [host, owner, name]
                if !host.is_empty() && !owner.is_empty() && !name.is_empty() =>
            {
                Ok(RepoTarget {
                    url: trimmed.to_string(),
                    owner: owner.to_string(),
                    name: name.to_string(),
                })
            }
            _ => Err(malformed()),
        }
    }

    /// `owner/name`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for RepoTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_and_git_suffix() {
        for url in [
            "https://github.com/octo/autocoder",
            "https://github.com/octo/autocoder.git",
            "https://github.com/octo/autocoder/",
            "  https://github.com/octo/autocoder.git\n",
        ] {
            let target = RepoTarget::parse(url).unwrap();
            assert_eq!(target.full_name(), "octo/autocoder", "{url}");
        }
    }

    #[test]
    fn test_empty_url() {
        assert_eq!(RepoTarget::parse(""), Err(TargetError::Empty));
        assert_eq!(RepoTarget::parse("   "), Err(TargetError::Empty));
        assert_eq!(
            TargetError::Empty.to_string(),
            "The repository URL is not set."
        );
    }

    #[test]
    fn test_malformed_urls() {
        for url in [
            "github.com/octo/autocoder",
            "https://github.com/octo",
            "https://github.com/octo/autocoder/tree/main",
            "https://github.com//autocoder",
        ] {
            assert!(
                matches!(RepoTarget::parse(url), Err(TargetError::Malformed(_))),
                "{url}"
            );
        }
    }
}
