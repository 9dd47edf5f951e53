use serde::{Deserialize, Serialize};

/// The single schedulable resource of a salon branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    /// IANA zone name; every wall-clock reading for this location uses it.
    pub time_zone: String,
    pub is_active: bool,
}
