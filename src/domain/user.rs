use serde::{Deserialize, Serialize};

use super::{EntityToken, UserId};

/// 利用者の役割
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    Citizen,
    Administrator,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Citizen => "CITIZEN",
            UserRole::Administrator => "ADMINISTRATOR",
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CITIZEN" => Ok(UserRole::Citizen),
            "ADMINISTRATOR" => Ok(UserRole::Administrator),
            _ => Err(format!("Invalid user role: {}", s)),
        }
    }
}

/// 利用者のプロフィール
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub address: Option<String>,
    pub telephone_number: String,
}

/// User集約
///
/// 予約・貸出への参照は持たない（逆方向は検索で引く）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_id: UserId,
    pub token: EntityToken,
    #[serde(flatten)]
    pub profile: UserProfile,
    pub role: UserRole,
}

impl PartialEq for User {
    fn eq(&self, other: &Self) -> bool {
        self.token == other.token
    }
}

impl Eq for User {}

/// 純粋関数：利用者を登録する（役割は常にCITIZEN）
pub fn register_user(profile: UserProfile) -> User {
    User {
        user_id: UserId::new(),
        token: EntityToken::new(),
        profile,
        role: UserRole::Citizen,
    }
}

/// 純粋関数：プロフィールを更新する（役割は変更しない）
pub fn update_profile(user: &User, profile: UserProfile) -> User {
    User {
        profile,
        ..user.clone()
    }
}
