use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use syndicate_common::Result;

use crate::traits::LocalSnapshot;

/// Degenerate flat-file target: every export writes fresh timestamped files,
/// no diffing and no mapping rows. An empty corpus still produces the files,
/// header row only.
pub struct CsvExporter {
    export_dir: PathBuf,
}

impl CsvExporter {
    pub fn new(export_dir: impl Into<PathBuf>) -> Self {
        Self {
            export_dir: export_dir.into(),
        }
    }

    /// Dump one owner's posts, site stats and page stats. Returns the
    /// written file paths, the run's artifacts.
    pub async fn export(
        &self,
        snapshot: &dyn LocalSnapshot,
        owner_id: Uuid,
    ) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(&self.export_dir)
            .with_context(|| format!("creating export dir {}", self.export_dir.display()))?;

        let stamp = Utc::now().format("%Y%m%dT%H%M%SZ");
        let sources = snapshot.sources(owner_id).await?;

        let posts_path = self.export_dir.join(format!("posts-{stamp}.csv"));
        let mut writer = open(&posts_path)?;
        writer
            .write_record([
                "id",
                "source_id",
                "platform",
                "platform_internal_id",
                "created_at",
                "author",
                "type",
                "content",
                "archived",
                "likes",
                "reposts",
                "views",
            ])
            .context("writing posts header")?;
        for post in snapshot.posts(owner_id).await? {
            writer
                .write_record([
                    post.id.to_string(),
                    post.source_id.to_string(),
                    post.platform.clone(),
                    post.platform_internal_id.clone(),
                    post.created_at.to_rfc3339(),
                    post.author.clone(),
                    post.post_type.clone(),
                    post.content.clone().unwrap_or_default(),
                    post.archived.to_string(),
                    opt(post.likes),
                    opt(post.reposts),
                    opt(post.views),
                ])
                .context("writing post row")?;
        }
        writer.flush().context("flushing posts file")?;

        let site_path = self.export_dir.join(format!("site_stats-{stamp}.csv"));
        let mut writer = open(&site_path)?;
        writer
            .write_record(["source_id", "date", "visitors", "avg_session_duration"])
            .context("writing site stats header")?;
        for source in &sources {
            for stat in snapshot.site_stats(source.id).await? {
                writer
                    .write_record([
                        stat.source_id.to_string(),
                        stat.date.to_string(),
                        stat.visitors.to_string(),
                        stat.avg_session_duration.to_string(),
                    ])
                    .context("writing site stat row")?;
            }
        }
        writer.flush().context("flushing site stats file")?;

        let page_path = self.export_dir.join(format!("page_stats-{stamp}.csv"));
        let mut writer = open(&page_path)?;
        writer
            .write_record(["source_id", "date", "path", "views"])
            .context("writing page stats header")?;
        for source in &sources {
            for stat in snapshot.page_stats(source.id).await? {
                writer
                    .write_record([
                        stat.source_id.to_string(),
                        stat.date.to_string(),
                        stat.path.clone(),
                        stat.views.to_string(),
                    ])
                    .context("writing page stat row")?;
            }
        }
        writer.flush().context("flushing page stats file")?;

        info!(
            %owner_id,
            dir = %self.export_dir.display(),
            "Wrote CSV export"
        );
        Ok(vec![posts_path, site_path, page_path])
    }
}

fn open(path: &Path) -> Result<csv::Writer<std::fs::File>> {
    Ok(csv::Writer::from_path(path)
        .with_context(|| format!("opening {}", path.display()))?)
}

fn opt(value: Option<i32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
