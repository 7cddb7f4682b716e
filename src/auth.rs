use std::collections::HashMap;

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Driver,
    Admin,
}

impl Role {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "customer" => Some(Role::Customer),
            "driver" => Some(Role::Driver),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Driver => "driver",
            Role::Admin => "admin",
        }
    }
}

/// Verified caller. The identity system lives outside this service; the
/// core trusts whatever the verifier resolved from the bearer token.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: Uuid,
    pub role: Role,
    pub admin_role: Option<String>,
}

pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Option<Identity>;
}

/// Verifier backed by a static token table from the environment.
///
/// `AUTH_TOKENS` is a comma-separated list of entries in the form
/// `token:role:user_id` with an optional `:admin_role` tail, e.g.
/// `s3cret:driver:6f9c...,boss:admin:11ab...:super`.
pub struct StaticTokenVerifier {
    tokens: HashMap<String, Identity>,
}

impl StaticTokenVerifier {
    pub fn from_env_value(raw: &str) -> Result<Self, AppError> {
        let mut tokens = HashMap::new();

        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let mut parts = entry.split(':');

            let token = parts.next().unwrap_or_default();
            let role_raw = parts.next().unwrap_or_default();
            let user_raw = parts.next().unwrap_or_default();
            let admin_role = parts.next().map(str::to_string);

            if token.is_empty() {
                return Err(AppError::Internal(format!(
                    "invalid AUTH_TOKENS entry: {entry}"
                )));
            }

            let role = Role::parse(role_raw).ok_or_else(|| {
                AppError::Internal(format!("invalid AUTH_TOKENS role: {role_raw}"))
            })?;

            let user_id = user_raw.parse::<Uuid>().map_err(|err| {
                AppError::Internal(format!("invalid AUTH_TOKENS user id {user_raw}: {err}"))
            })?;

            tokens.insert(
                token.to_string(),
                Identity {
                    user_id,
                    role,
                    admin_role,
                },
            );
        }

        Ok(Self { tokens })
    }
}

impl TokenVerifier for StaticTokenVerifier {
    fn verify(&self, token: &str) -> Option<Identity> {
        self.tokens.get(token).cloned()
    }
}

/// Resolves the bearer token without any role check. Handlers that gate on
/// ownership rather than role go through this.
pub fn authenticate(
    verifier: &dyn TokenVerifier,
    headers: &HeaderMap,
) -> Result<Identity, AppError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("missing authorization header".to_string()))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("expected bearer token".to_string()))?;

    verifier.verify(token).ok_or(AppError::InvalidToken)
}

/// Resolves the bearer token and checks the caller holds the given role.
pub fn authorize(
    verifier: &dyn TokenVerifier,
    headers: &HeaderMap,
    role: Role,
) -> Result<Identity, AppError> {
    let identity = authenticate(verifier, headers)?;

    if identity.role != role {
        return Err(AppError::Forbidden(format!(
            "requires {} role",
            role.as_str()
        )));
    }

    Ok(identity)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderMap;
    use uuid::Uuid;

    use super::{authorize, Role, StaticTokenVerifier};
    use crate::error::AppError;

    fn verifier() -> StaticTokenVerifier {
        let driver = Uuid::from_u128(1);
        let admin = Uuid::from_u128(2);
        let raw = format!("drv:driver:{driver},boss:admin:{admin}:super");
        StaticTokenVerifier::from_env_value(&raw).unwrap()
    }

    fn headers(value: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert("authorization", value.parse().unwrap());
        map
    }

    #[test]
    fn parses_entries_with_admin_role() {
        let v = verifier();
        let identity = super::TokenVerifier::verify(&v, "boss").unwrap();
        assert_eq!(identity.role, Role::Admin);
        assert_eq!(identity.admin_role.as_deref(), Some("super"));
    }

    #[test]
    fn rejects_malformed_entries() {
        assert!(StaticTokenVerifier::from_env_value("drv:driver:not-a-uuid").is_err());
        assert!(StaticTokenVerifier::from_env_value("drv:owner:00000000-0000-0000-0000-000000000001").is_err());
    }

    #[test]
    fn empty_value_verifies_nothing() {
        let v = StaticTokenVerifier::from_env_value("").unwrap();
        assert!(super::TokenVerifier::verify(&v, "anything").is_none());
    }

    #[test]
    fn missing_header_is_unauthorized() {
        let v = verifier();
        let err = authorize(&v, &HeaderMap::new(), Role::Driver).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn unknown_token_is_invalid() {
        let v = verifier();
        let err = authorize(&v, &headers("Bearer nope"), Role::Driver).unwrap_err();
        assert!(matches!(err, AppError::InvalidToken));
    }

    #[test]
    fn wrong_role_is_forbidden() {
        let v = verifier();
        let err = authorize(&v, &headers("Bearer drv"), Role::Admin).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn matching_role_passes() {
        let v = verifier();
        let identity = authorize(&v, &headers("Bearer drv"), Role::Driver).unwrap();
        assert_eq!(identity.user_id, Uuid::from_u128(1));
    }
}
