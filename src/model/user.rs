use serde::Serialize;
use utoipa::ToSchema;

use crate::model::role::Role;

/// Login account. `password` holds the argon2 PHC string.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: u64,
    pub email: String,
    pub password: String,
    pub name: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: Role,
}

/// Public projection returned by the auth endpoints.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserProfile {
    pub id: u64,
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
        }
    }
}
