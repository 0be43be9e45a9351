use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde_json::json;
use uuid::Uuid;

use syndicate_common::{PageStatSnapshot, SiteStatSnapshot, Source, SourceStatSnapshot};
use syndicate_store::PostWithMetrics;

use crate::traits::OutgoingRecord;

/// Remote column carrying the round-tripped local id. Create responses are
/// matched back to local rows through it, so it must appear verbatim in
/// every pushed record.
pub const NATURAL_KEY_FIELD: &str = "sx_id";

/// Site and page stats keep receiving late corrections from the analytics
/// platform for this many trailing days.
pub const SITE_PAGE_WINDOW_DAYS: i64 = 9;

/// Profile stats settle faster.
pub const PROFILE_WINDOW_DAYS: i64 = 2;

/// One local row plus the facts the partitioner needs to decide whether an
/// already-mapped row is worth re-sending.
#[derive(Debug, Clone)]
pub struct LocalRow {
    pub record: OutgoingRecord,
    /// Owning source, present on child kinds only. Used for linking and the
    /// detach cascade.
    pub source_id: Option<Uuid>,
    /// Last local modification, when the kind tracks one (posts).
    pub modified_at: Option<DateTime<Utc>>,
    /// Whether an update is allowed at all this pass.
    pub window_eligible: bool,
}

pub fn map_source(source: &Source) -> LocalRow {
    LocalRow {
        record: OutgoingRecord {
            local_id: source.id,
            natural_key: source.id.to_string(),
            fields: json!({
                NATURAL_KEY_FIELD: source.id.to_string(),
                "platform": source.platform,
                "handle": source.handle,
                "active": source.active,
            }),
        },
        source_id: None,
        modified_at: None,
        // Source rows are created and deleted, never updated in place.
        window_eligible: false,
    }
}

pub fn map_post(post: &PostWithMetrics) -> LocalRow {
    LocalRow {
        record: OutgoingRecord {
            local_id: post.id,
            natural_key: post.id.to_string(),
            fields: json!({
                NATURAL_KEY_FIELD: post.id.to_string(),
                "platform": post.platform,
                "platform_internal_id": post.platform_internal_id,
                "created_at": post.created_at.to_rfc3339(),
                "author": post.author,
                "type": post.post_type,
                "content": post.content,
                "archived": post.archived,
                "likes": post.likes,
                "reposts": post.reposts,
                "views": post.views,
            }),
        },
        source_id: Some(post.source_id),
        modified_at: Some(post.last_synced_at),
        window_eligible: true,
    }
}

pub fn map_site_stat(stat: &SiteStatSnapshot, today: NaiveDate) -> LocalRow {
    LocalRow {
        record: OutgoingRecord {
            local_id: stat.id,
            natural_key: stat.id.to_string(),
            fields: json!({
                NATURAL_KEY_FIELD: stat.id.to_string(),
                "date": stat.date.to_string(),
                "visitors": stat.visitors,
                "avg_session_duration": stat.avg_session_duration,
            }),
        },
        source_id: Some(stat.source_id),
        modified_at: None,
        window_eligible: in_window(stat.date, today, SITE_PAGE_WINDOW_DAYS),
    }
}

pub fn map_page_stat(stat: &PageStatSnapshot, today: NaiveDate) -> LocalRow {
    LocalRow {
        record: OutgoingRecord {
            local_id: stat.id,
            natural_key: stat.id.to_string(),
            fields: json!({
                NATURAL_KEY_FIELD: stat.id.to_string(),
                "date": stat.date.to_string(),
                "path": stat.path,
                "views": stat.views,
            }),
        },
        source_id: Some(stat.source_id),
        modified_at: None,
        window_eligible: in_window(stat.date, today, SITE_PAGE_WINDOW_DAYS),
    }
}

pub fn map_source_stat(stat: &SourceStatSnapshot, today: NaiveDate) -> LocalRow {
    LocalRow {
        record: OutgoingRecord {
            local_id: stat.id,
            natural_key: stat.id.to_string(),
            fields: json!({
                NATURAL_KEY_FIELD: stat.id.to_string(),
                "date": stat.date.to_string(),
                "followers": stat.followers,
                "following": stat.following,
                "posts_count": stat.posts_count,
                "avg_likes": stat.avg_likes,
                "avg_reposts": stat.avg_reposts,
                "avg_views": stat.avg_views,
            }),
        },
        source_id: Some(stat.source_id),
        modified_at: None,
        window_eligible: in_window(stat.date, today, PROFILE_WINDOW_DAYS),
    }
}

fn in_window(date: NaiveDate, today: NaiveDate, days: i64) -> bool {
    date >= today - Duration::days(days)
}
