//! Wildcard matching for `fetch`.

use regex::Regex;

use crate::error::{Error, Result};

/// A shell-style pattern where `*` matches any run of characters, possibly
/// empty. Every other character matches itself.
#[derive(Debug, Clone)]
pub struct WildcardPattern {
  source: String,
  regex: Regex,
}

impl WildcardPattern {
  /// Fails with [`Error::InvalidPattern`] when the pattern has no `*`.
  pub fn new(pattern: &str) -> Result<Self> {
    if !pattern.contains('*') {
      return Err(Error::InvalidPattern {
        pattern: pattern.to_owned(),
      });
    }
    let body = pattern
      .split('*')
      .map(regex::escape)
      .collect::<Vec<_>>()
      .join(".*");
    let regex = Regex::new(&format!("^{body}$")).map_err(|err| Error::InvalidPattern {
      pattern: format!("{pattern} ({err})"),
    })?;
    Ok(Self {
      source: pattern.to_owned(),
      regex,
    })
  }

  pub fn matches(&self, candidate: &str) -> bool {
    self.regex.is_match(candidate)
  }

  pub fn as_str(&self) -> &str {
    &self.source
  }
}
