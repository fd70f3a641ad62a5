//! 徽章相关实体定义
//!
//! 包含两层结构：BadgeTypeDefinition（类型）-> Badge（徽章），
//! 每个类型各自携带“谁能创建”“谁能发放”两套权限方案

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::enums::ImageType;

/// 徽章名称最大字符数
pub const NAME_MAX_LENGTH: usize = 20;
/// 徽章描述最大字符数
pub const DESCRIPTION_MAX_LENGTH: usize = 120;

/// 徽章定义
///
/// 长度按字符计数；`id` 与 `created_by` 由服务端在写入时填充
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Badge {
    #[serde(default)]
    pub id: String,
    #[validate(length(max = 20, message = "徽章名称不能超过 20 个字符"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 120, message = "徽章描述不能超过 120 个字符"))]
    pub description: String,
    /// 图片引用，含义由 `image_type` 决定
    #[validate(length(min = 1, message = "徽章图片不能为空"))]
    pub image: String,
    #[serde(default)]
    pub image_type: ImageType,
    /// 同一用户是否可以多次获得
    #[serde(default)]
    pub multiple: bool,
    /// 所属类型 ID
    #[serde(rename = "type")]
    pub type_id: String,
    #[serde(default)]
    pub created_by: String,
}

/// 权限方案
///
/// 角色、允许名单、屏蔽名单都以 `名称 -> bool` 存储，只有值为 true 的条目生效
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionScheme {
    #[serde(default)]
    pub everyone: bool,
    #[serde(default)]
    pub roles: BTreeMap<String, bool>,
    #[serde(default)]
    pub allow_list: BTreeMap<String, bool>,
    #[serde(default)]
    pub block_list: BTreeMap<String, bool>,
}

impl PermissionScheme {
    /// 所有人可用的方案
    pub fn everyone() -> Self {
        Self {
            everyone: true,
            ..Self::default()
        }
    }

    pub fn is_blocked(&self, user_id: &str) -> bool {
        self.block_list.get(user_id).copied().unwrap_or(false)
    }

    pub fn is_allowed(&self, user_id: &str) -> bool {
        self.allow_list.get(user_id).copied().unwrap_or(false)
    }

    /// 用户角色中是否有任一角色被允许
    pub fn allows_any_role<'a>(&self, roles: impl IntoIterator<Item = &'a String>) -> bool {
        roles
            .into_iter()
            .any(|role| self.roles.get(role).copied().unwrap_or(false))
    }
}

/// 徽章类型定义
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeTypeDefinition {
    #[serde(default)]
    pub id: String,
    pub name: String,
    /// 可选的展示边框
    #[serde(default)]
    pub frame: String,
    #[serde(default)]
    pub created_by: String,
    /// 谁可以发放该类型的徽章
    #[serde(default)]
    pub can_grant: PermissionScheme,
    /// 谁可以在该类型下创建徽章
    #[serde(default)]
    pub can_create: PermissionScheme,
}
