//! 用户目录
//!
//! 平台侧的用户身份服务：按 ID 或用户名查找用户，读取角色、系统管理员标记和显示名格式。
//! 服务层只依赖 `UserDirectory` trait，进程内实现 `StaticUserDirectory` 用于测试和命令行工具。

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BadgeError, Result};
use crate::permission::Actor;

/// 无法解析用户时使用的显示名
pub const UNKNOWN_DISPLAY_NAME: &str = "unknown";

/// 显示名格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayNameFormat {
    #[default]
    Username,
    NicknameFullName,
    FullName,
}

/// 平台用户
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub is_system_admin: bool,
}

impl User {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            ..Self::default()
        }
    }

    pub fn full_name(&self) -> String {
        match (self.first_name.is_empty(), self.last_name.is_empty()) {
            (false, false) => format!("{} {}", self.first_name, self.last_name),
            (false, true) => self.first_name.clone(),
            (true, false) => self.last_name.clone(),
            (true, true) => String::new(),
        }
    }

    /// 按格式取显示名，首选部分为空时退回用户名
    pub fn display_name(&self, format: DisplayNameFormat) -> String {
        let preferred = match format {
            DisplayNameFormat::Username => String::new(),
            DisplayNameFormat::NicknameFullName if !self.nickname.is_empty() => {
                self.nickname.clone()
            }
            DisplayNameFormat::NicknameFullName | DisplayNameFormat::FullName => self.full_name(),
        };
        if preferred.is_empty() {
            self.username.clone()
        } else {
            preferred
        }
    }

    /// 以该用户身份构造操作者
    pub fn to_actor(&self) -> Actor {
        Actor {
            id: self.id.clone(),
            roles: self.roles.clone(),
            is_system_admin: self.is_system_admin,
            ..Actor::default()
        }
    }
}

/// 用户目录接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>>;

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;

    fn display_name_format(&self) -> DisplayNameFormat;
}

/// 按 ID 解析操作者
pub async fn resolve_actor(directory: &dyn UserDirectory, user_id: &str) -> Result<Actor> {
    directory
        .get_user(user_id)
        .await?
        .map(|user| user.to_actor())
        .ok_or_else(|| BadgeError::UserNotFound(user_id.to_string()))
}

/// 解析显示名，用户不存在或查询失败时返回 `unknown`
pub async fn display_name_or_unknown(directory: &dyn UserDirectory, user_id: &str) -> String {
    match directory.get_user(user_id).await {
        Ok(Some(user)) => user.display_name(directory.display_name_format()),
        Ok(None) => UNKNOWN_DISPLAY_NAME.to_string(),
        Err(e) => {
            debug!(user_id, error = %e, "查询用户显示名失败");
            UNKNOWN_DISPLAY_NAME.to_string()
        }
    }
}

/// 把逗号分隔的用户名解析为允许名单（用户 ID -> true）
///
/// 忽略空白项和前导 `@`，任一用户名无法解析时整体失败
pub async fn parse_allow_list(
    directory: &dyn UserDirectory,
    usernames: &str,
) -> Result<BTreeMap<String, bool>> {
    let mut allow_list = BTreeMap::new();
    for raw in usernames.split(',') {
        let username = raw.trim().trim_start_matches('@');
        if username.is_empty() {
            continue;
        }
        let user = directory
            .get_user_by_username(username)
            .await?
            .ok_or_else(|| BadgeError::UserNotFound(username.to_string()))?;
        allow_list.insert(user.id, true);
    }
    Ok(allow_list)
}

/// 进程内用户目录
#[derive(Debug, Clone, Default)]
pub struct StaticUserDirectory {
    users: Arc<DashMap<String, User>>,
    format: DisplayNameFormat,
}

impl StaticUserDirectory {
    pub fn new(format: DisplayNameFormat) -> Self {
        Self {
            users: Arc::new(DashMap::new()),
            format,
        }
    }

    pub fn with_users(format: DisplayNameFormat, users: impl IntoIterator<Item = User>) -> Self {
        let directory = Self::new(format);
        for user in users {
            directory.insert(user);
        }
        directory
    }

    pub fn insert(&self, user: User) {
        self.users.insert(user.id.clone(), user);
    }
}

#[async_trait]
impl UserDirectory for StaticUserDirectory {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        Ok(self.users.get(user_id).map(|u| u.value().clone()))
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|entry| entry.value().username == username)
            .map(|entry| entry.value().clone()))
    }

    fn display_name_format(&self) -> DisplayNameFormat {
        self.format
    }
}
