use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{TypeError, TypeResult};

/// Provider id assigned when a sign-in handler does not name one.
pub const DEFAULT_PROVIDER_ID: &str = "custom";

/// Raw profile returned by a sign-in handler.
///
/// Only `uid` is required; the remaining fields are optional profile data.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserInfo {
    pub uid: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub email_verified: bool,
    pub photo_url: Option<String>,
    pub provider_id: Option<String>,
    pub is_anonymous: bool,
}

impl UserInfo {
    /// A profile carrying only a uid.
    pub fn with_uid(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            ..Self::default()
        }
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn provider_id(mut self, provider: impl Into<String>) -> Self {
        self.provider_id = Some(provider.into());
        self
    }
}

/// The currently signed-in identity.
///
/// A `User` is read-only once built. Its presence or absence is all the data
/// engine cares about; rule expressions see it through [`User::auth_context`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    uid: String,
    display_name: Option<String>,
    email: Option<String>,
    email_verified: bool,
    photo_url: Option<String>,
    provider_id: String,
    is_anonymous: bool,
}

impl User {
    /// Build a user from a handler's profile. The uid must be non-blank.
    pub fn from_info(info: UserInfo) -> TypeResult<Self> {
        if info.uid.trim().is_empty() {
            return Err(TypeError::InvalidUser("uid must not be empty".into()));
        }
        Ok(Self {
            uid: info.uid,
            display_name: info.display_name,
            email: info.email,
            email_verified: info.email_verified,
            photo_url: info.photo_url,
            provider_id: info
                .provider_id
                .unwrap_or_else(|| DEFAULT_PROVIDER_ID.to_string()),
            is_anonymous: info.is_anonymous,
        })
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn email_verified(&self) -> bool {
        self.email_verified
    }

    pub fn photo_url(&self) -> Option<&str> {
        self.photo_url.as_deref()
    }

    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    pub fn is_anonymous(&self) -> bool {
        self.is_anonymous
    }

    /// The value bound to `auth` in rule expressions.
    pub fn auth_context(&self) -> Value {
        json!({
            "uid": self.uid,
            "provider": self.provider_id,
            "token": {
                "sub": self.uid,
                "email": self.email,
                "email_verified": self.email_verified,
                "name": self.display_name,
                "picture": self.photo_url,
                "firebase": { "sign_in_provider": self.provider_id },
            },
        })
    }
}

impl TryFrom<UserInfo> for User {
    type Error = TypeError;

    fn try_from(info: UserInfo) -> Result<Self, Self::Error> {
        Self::from_info(info)
    }
}
