use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Access role. Drives which dashboard and routes a user gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Warehouse,
    Pharmacist,
    Driver,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Warehouse => "warehouse",
            Role::Pharmacist => "pharmacist",
            Role::Driver => "driver",
        }
    }

    /// Roles allowed to manage inventory and request movements.
    pub const STAFF: [Role; 3] = [Role::Admin, Role::Warehouse, Role::Pharmacist];
    /// Roles allowed to approve or dispatch movements.
    pub const LOGISTICS: [Role; 2] = [Role::Admin, Role::Warehouse];
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "warehouse" => Ok(Role::Warehouse),
            "pharmacist" => Ok(Role::Pharmacist),
            "driver" => Ok(Role::Driver),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub phone: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default, with = "crate::util::timestamp::option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::util::timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: ObjectId,
    pub role: Role,
}

impl Actor {
    pub fn new(id: ObjectId, role: Role) -> Self {
        Actor { id, role }
    }

    pub fn has_role(&self, roles: &[Role]) -> bool {
        roles.contains(&self.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing_is_case_insensitive() {
        assert_eq!("Warehouse".parse::<Role>(), Ok(Role::Warehouse));
        assert!("nurse".parse::<Role>().is_err());
    }

    #[test]
    fn test_actor_role_membership() {
        let driver = Actor::new(ObjectId::new(), Role::Driver);
        assert!(!driver.has_role(&Role::STAFF));
        assert!(Actor::new(ObjectId::new(), Role::Pharmacist).has_role(&Role::STAFF));
        assert!(!Actor::new(ObjectId::new(), Role::Pharmacist).has_role(&Role::LOGISTICS));
    }

    #[test]
    fn test_user_defaults_to_active() {
        let user: User = serde_json::from_value(serde_json::json!({
            "name": "Ana", "email": "ana@example.org", "passwordHash": "x", "role": "driver",
            "phone": null, "createdAt": null, "updatedAt": null
        }))
        .unwrap();
        assert!(user.is_active);
    }
}
