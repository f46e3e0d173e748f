use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use super::value_objects::{SessionId, UserId, ValueObjectError};

/// Role a staff member holds in the hospital
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
  Administrator,
  Physician,
  Nurse,
  Pharmacist,
  BillingClerk,
  InventoryClerk,
}

impl StaffRole {
  pub fn as_str(&self) -> &'static str {
    match self {
      StaffRole::Administrator => "administrator",
      StaffRole::Physician => "physician",
      StaffRole::Nurse => "nurse",
      StaffRole::Pharmacist => "pharmacist",
      StaffRole::BillingClerk => "billing_clerk",
      StaffRole::InventoryClerk => "inventory_clerk",
    }
  }
}

impl FromStr for StaffRole {
  type Err = ValueObjectError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "administrator" => Ok(StaffRole::Administrator),
      "physician" => Ok(StaffRole::Physician),
      "nurse" => Ok(StaffRole::Nurse),
      "pharmacist" => Ok(StaffRole::Pharmacist),
      "billing_clerk" => Ok(StaffRole::BillingClerk),
      "inventory_clerk" => Ok(StaffRole::InventoryClerk),
      other => Err(ValueObjectError::InvalidRole(other.to_string())),
    }
  }
}

impl fmt::Display for StaffRole {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Authenticated staff member.
///
/// This is the record stashed in the session under `auth.user`, so it
/// deliberately carries no password or token material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
  /// Unique identifier for the user
  pub id: UserId,
  /// Staff email address (unique, lowercase)
  pub email: String,
  /// Display name
  pub full_name: String,
  /// Hospital role
  pub role: StaffRole,
  /// Timestamp when the account was created
  pub created_at: DateTime<Utc>,
}

impl User {
  pub fn new(id: UserId, email: String, full_name: String, role: StaffRole) -> Self {
    Self {
      id,
      email,
      full_name,
      role,
      created_at: Utc::now(),
    }
  }

  /// Creates a user from database fields (for reconstruction)
  pub fn from_db(
    id: UserId,
    email: String,
    full_name: String,
    role: StaffRole,
    created_at: DateTime<Utc>,
  ) -> Self {
    Self {
      id,
      email,
      full_name,
      role,
      created_at,
    }
  }
}

/// Persisted snapshot of a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
  pub id: SessionId,
  pub attributes: Map<String, Value>,
  pub last_activity: DateTime<Utc>,
}

impl SessionRecord {
  pub fn new(id: SessionId, attributes: Map<String, Value>) -> Self {
    Self {
      id,
      attributes,
      last_activity: Utc::now(),
    }
  }
}
