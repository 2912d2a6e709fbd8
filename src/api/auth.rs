use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::{UserId, UserRole};

use super::error::ApiError;

/// 上流の認証層が付与する利用者IDヘッダ
pub const USER_ID_HEADER: &str = "x-user-id";
/// 上流の認証層が付与する役割ヘッダ
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// リクエストの呼び出し元
///
/// トークンの検証は上流で済んでいる前提で、ヘッダから利用者IDと役割を取り出す。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: UserId,
    pub role: UserRole,
}

impl Caller {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Administrator
    }

    /// 管理者のみ
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::Forbidden(
                "Operation reserved to administrators".to_string(),
            ))
        }
    }

    /// 管理者、または対象の利用者本人
    pub fn require_self_or_admin(&self, user_id: UserId) -> Result<(), ApiError> {
        if self.is_admin() || self.user_id == user_id {
            Ok(())
        } else {
            Err(ApiError::Forbidden(
                "Operation not allowed on another user's data".to_string(),
            ))
        }
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, ApiError> {
    parts
        .headers
        .get(name)
        .ok_or_else(|| ApiError::Unauthorized(format!("Missing {} header", name)))?
        .to_str()
        .map_err(|_| ApiError::Unauthorized(format!("Malformed {} header", name)))
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = Uuid::parse_str(header(parts, USER_ID_HEADER)?)
            .map_err(|_| ApiError::Unauthorized(format!("Malformed {} header", USER_ID_HEADER)))?;
        let role = UserRole::from_str(header(parts, USER_ROLE_HEADER)?)
            .map_err(ApiError::Unauthorized)?;

        Ok(Self {
            user_id: UserId::from_uuid(user_id),
            role,
        })
    }
}
