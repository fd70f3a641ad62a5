//! 发放通知
//!
//! 发放成功后：私信获得者，在订阅了该类型的每个频道公告；
//! 请求了“在当前频道公告”时，发放者有发帖权限则公告，否则给发放者发一条临时提示。
//! 所有发送失败只记录日志。

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, instrument, warn};

use super::sender::MessageSink;
use super::template::{
    NO_CHANNEL_PERMISSION_NOTICE, attachment_title, channel_text, direct_text,
};
use super::types::{Attachment, GrantEvent, Post};
use crate::directory::{User, UserDirectory};
use crate::repository::BadgeRepository;

/// 发放通知器
pub struct GrantNotifier {
    repo: BadgeRepository,
    directory: Arc<dyn UserDirectory>,
    sink: Arc<dyn MessageSink>,
    bot_user_id: String,
}

impl GrantNotifier {
    pub fn new(
        repo: BadgeRepository,
        directory: Arc<dyn UserDirectory>,
        sink: Arc<dyn MessageSink>,
        bot_user_id: impl Into<String>,
    ) -> Self {
        Self {
            repo,
            directory,
            sink,
            bot_user_id: bot_user_id.into(),
        }
    }

    /// 发送发放通知
    #[instrument(skip(self, event), fields(badge_id = %event.badge.id, grantee = %event.grantee_id))]
    pub async fn notify_grant(&self, event: &GrantEvent) {
        let Some(granter) = self.lookup(&event.granter_id).await else {
            return;
        };
        let Some(grantee) = self.lookup(&event.grantee_id).await else {
            return;
        };

        let badge = &event.badge;
        let title = attachment_title(badge);

        let dm = Post {
            user_id: self.bot_user_id.clone(),
            attachment: Some(Attachment {
                title: title.clone(),
                text: direct_text(&granter.username, badge, &event.reason),
            }),
            ..Post::default()
        };
        if let Err(e) = self
            .sink
            .send_direct(&self.bot_user_id, &grantee.id, dm)
            .await
        {
            warn!(error = %e, "发送发放私信失败");
        }

        let announcement = Post {
            user_id: self.bot_user_id.clone(),
            attachment: Some(Attachment {
                title,
                text: channel_text(&granter.username, &grantee.username, badge, &event.reason),
            }),
            ..Post::default()
        };

        let channels = match self.repo.list_subscriptions().await {
            Ok(subs) => subs
                .into_iter()
                .filter(|s| s.type_id == badge.type_id)
                .map(|s| s.channel_id)
                .collect::<Vec<_>>(),
            Err(e) => {
                warn!(error = %e, "读取订阅失败，跳过频道公告");
                Vec::new()
            }
        };

        let results = join_all(channels.iter().map(|channel_id| {
            self.sink
                .create_post(announcement.clone().in_channel(channel_id.as_str()))
        }))
        .await;
        for (channel_id, result) in channels.iter().zip(results) {
            if let Err(e) = result {
                warn!(channel_id = %channel_id, error = %e, "订阅频道公告失败");
            }
        }

        if let Some(channel_id) = &event.notify_channel_id {
            self.notify_here(&granter, channel_id, announcement).await;
        }

        info!(subscribed_channels = channels.len(), "发放通知已发送");
    }

    async fn notify_here(&self, granter: &User, channel_id: &str, announcement: Post) {
        let allowed = match self.sink.can_post(&granter.id, channel_id).await {
            Ok(allowed) => allowed,
            Err(e) => {
                warn!(channel_id, error = %e, "查询发帖权限失败");
                false
            }
        };

        let result = if allowed {
            self.sink
                .create_post(announcement.in_channel(channel_id))
                .await
        } else {
            let notice = Post {
                user_id: self.bot_user_id.clone(),
                channel_id: channel_id.to_string(),
                message: NO_CHANNEL_PERMISSION_NOTICE.to_string(),
                attachment: None,
            };
            self.sink.send_ephemeral(&granter.id, notice).await
        };

        if let Err(e) = result {
            warn!(channel_id, error = %e, "当前频道公告失败");
        }
    }

    async fn lookup(&self, user_id: &str) -> Option<User> {
        match self.directory.get_user(user_id).await {
            Ok(Some(user)) => Some(user),
            Ok(None) => {
                debug!(user_id, "用户不存在，跳过通知");
                None
            }
            Err(e) => {
                debug!(user_id, error = %e, "查询用户失败，跳过通知");
                None
            }
        }
    }
}
