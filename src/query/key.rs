//! Structural identity of a cacheable read.

use std::fmt;

/// One component of a query key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyPart {
  /// A parameter that was not supplied
  Unset,
  Bool(bool),
  Int(i64),
  Str(String),
}

impl From<&str> for KeyPart {
  fn from(value: &str) -> Self {
    KeyPart::Str(value.to_string())
  }
}

impl From<String> for KeyPart {
  fn from(value: String) -> Self {
    KeyPart::Str(value)
  }
}

impl From<bool> for KeyPart {
  fn from(value: bool) -> Self {
    KeyPart::Bool(value)
  }
}

impl From<u32> for KeyPart {
  fn from(value: u32) -> Self {
    KeyPart::Int(i64::from(value))
  }
}

impl From<i64> for KeyPart {
  fn from(value: i64) -> Self {
    KeyPart::Int(value)
  }
}

impl<T: Into<KeyPart>> From<Option<T>> for KeyPart {
  fn from(value: Option<T>) -> Self {
    value.map(Into::into).unwrap_or(KeyPart::Unset)
  }
}

impl fmt::Display for KeyPart {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      KeyPart::Unset => f.write_str("-"),
      KeyPart::Bool(b) => write!(f, "{}", b),
      KeyPart::Int(i) => write!(f, "{}", i),
      KeyPart::Str(s) => f.write_str(s),
    }
  }
}

/// Ordered tuple `(resource, parameters...)` identifying one cache slot.
///
/// Structurally equal keys share a slot. A shorter key also acts as a prefix
/// when invalidating, so `["metrics"]` covers every metrics sub-resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
  parts: Vec<KeyPart>,
}

impl QueryKey {
  /// Start a key for the given resource name.
  pub fn new(resource: &str) -> Self {
    Self {
      parts: vec![KeyPart::from(resource)],
    }
  }

  /// Append a parameter.
  pub fn with(mut self, part: impl Into<KeyPart>) -> Self {
    self.parts.push(part.into());
    self
  }

  /// True if every component of `prefix` equals the corresponding component here.
  pub fn starts_with(&self, prefix: &QueryKey) -> bool {
    self.parts.starts_with(&prefix.parts)
  }
}

impl fmt::Display for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, part) in self.parts.iter().enumerate() {
      if i > 0 {
        f.write_str("/")?;
      }
      write!(f, "{}", part)?;
    }
    Ok(())
  }
}
