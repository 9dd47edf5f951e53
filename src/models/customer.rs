use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}
