use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// Backend user identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
    From, Into,
)]
#[serde(transparent)]
pub struct UserId(pub i64);

/// Anti-forgery (CSRF) token.
///
/// Opaque to the client. `Debug` never prints the value so tokens do not
/// leak into logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, From, Into)]
#[serde(transparent)]
pub struct CsrfToken(String);

impl CsrfToken {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for CsrfToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CsrfToken(***)")
    }
}

/// Account role as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Customer,
}

/// The authenticated principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Principal {
    pub id: UserId,
    pub username: String,
    pub role: Role,
}

impl Principal {
    #[must_use]
    pub fn new(id: UserId, username: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            username: username.into(),
            role,
        }
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Raw identity probe payload (`GET /api/auth/me`).
///
/// Every field is optional: the endpoint may answer with an error body such as
/// `{ "message": "..." }` and that must read as "no session", not as a failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityProbe {
    #[serde(default)]
    pub id: Option<UserId>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

impl IdentityProbe {
    /// A principal exists only when both the identifier and the role are present.
    #[must_use]
    pub fn into_principal(self) -> Option<Principal> {
        let id = self.id?;
        let role = self.role?;
        Some(Principal {
            id,
            username: self.username.unwrap_or_default(),
            role,
        })
    }
}

impl From<Principal> for IdentityProbe {
    fn from(p: Principal) -> Self {
        Self {
            id: Some(p.id),
            username: Some(p.username),
            role: Some(p.role),
        }
    }
}

/// Login form body.
#[derive(Clone, Serialize)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Where the presentation layer should navigate after an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Public landing page; used after the account is removed.
    Landing,
    /// Login entry point, optionally carrying the page to come back to.
    Login { next: Option<String> },
}

impl Route {
    #[must_use]
    pub fn login() -> Self {
        Self::Login { next: None }
    }

    #[must_use]
    pub fn login_then(next: impl Into<String>) -> Self {
        Self::Login {
            next: Some(next.into()),
        }
    }

    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Landing => "/".to_string(),
            Self::Login { next: None } => "/login".to_string(),
            Self::Login { next: Some(next) } => {
                format!("/login?next={}", urlencoding::encode(next))
            }
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path())
    }
}
