use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::repo::User;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

/// Returned by register and login: the user plus their one live token.
#[derive(Debug, Serialize)]
pub struct AuthData {
    pub user: PublicUser,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct TokenData {
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    #[test]
    fn public_user_hides_password_hash() {
        let user = User {
            id: Uuid::new_v4(),
            name: "Jane".into(),
            email: "jane@x.com".into(),
            password_hash: "$argon2id$v=19$secret".into(),
            created_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_string(&PublicUser::from(&user)).unwrap();
        assert!(json.contains("jane@x.com"));
        assert!(!json.contains("argon2id"));
    }
}
