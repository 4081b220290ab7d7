//! Identifier newtypes and the role set captured on booking.

use std::{collections::BTreeSet, fmt};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The confined subject's external identity (a chat-platform member id).
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SubjectId(pub u64);

impl fmt::Display for SubjectId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

/// An external role identifier.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoleId(pub u64);

impl fmt::Display for RoleId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

/// Opaque warrant identifier.
///
/// Fresh ids are hyphenated UUIDs, but any string is accepted so ids carried
/// over from older records keep resolving.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WarrantId(String);

impl WarrantId {
  pub fn generate() -> Self { Self(Uuid::new_v4().hyphenated().to_string()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl From<String> for WarrantId {
  fn from(s: String) -> Self { Self(s) }
}

impl From<&str> for WarrantId {
  fn from(s: &str) -> Self { Self(s.to_owned()) }
}

impl fmt::Display for WarrantId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// The set of roles a subject held immediately before confinement.
///
/// Never contains the confinement marker role itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<RoleId>);

impl RoleSet {
  pub fn new() -> Self { Self::default() }

  pub fn contains(&self, role: RoleId) -> bool { self.0.contains(&role) }

  pub fn insert(&mut self, role: RoleId) -> bool { self.0.insert(role) }

  pub fn remove(&mut self, role: RoleId) -> bool { self.0.remove(&role) }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn iter(&self) -> impl Iterator<Item = RoleId> + '_ {
    self.0.iter().copied()
  }

  pub fn to_vec(&self) -> Vec<RoleId> { self.iter().collect() }
}

impl FromIterator<RoleId> for RoleSet {
  fn from_iter<I: IntoIterator<Item = RoleId>>(iter: I) -> Self {
    Self(iter.into_iter().collect())
  }
}
