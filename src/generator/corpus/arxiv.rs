use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::PaperSource;

pub const ARXIV_API_URL: &str = "http://export.arxiv.org/api/query";

const ATOM_NS: &str = "http://www.w3.org/2005/Atom";

/// arXiv Atom feed中的一条论文记录
#[derive(Debug, Clone, PartialEq)]
pub struct ArxivEntry {
    pub id: String,
    pub title: String,
    pub pdf_url: String,
    pub published: Option<DateTime<Utc>>,
}

impl ArxivEntry {
    /// 以arXiv编号作为本地文件名，旧式编号中的 `/` 被替换
    pub fn file_name(&self) -> String {
        let short_id = self
            .id
            .split("/abs/")
            .last()
            .unwrap_or(&self.id)
            .replace('/', "_");
        format!("{}.pdf", short_id)
    }
}

/// 解析arXiv API返回的Atom feed
pub fn parse_feed(xml: &str) -> Result<Vec<ArxivEntry>> {
    let doc = roxmltree::Document::parse(xml).context("arXiv返回的feed不是合法的XML")?;

    let entries = doc
        .root_element()
        .children()
        .filter(|n| n.has_tag_name((ATOM_NS, "entry")))
        .filter_map(|entry| {
            let child_text = |name: &str| {
                entry
                    .children()
                    .find(|n| n.has_tag_name((ATOM_NS, name)))
                    .and_then(|n| n.text())
                    .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
            };

            let id = child_text("id")?;
            let title = child_text("title").unwrap_or_default();
            let published = child_text("published")
                .and_then(|p| DateTime::parse_from_rfc3339(&p).ok())
                .map(|p| p.with_timezone(&Utc));
            let pdf_url = entry
                .children()
                .filter(|n| n.has_tag_name((ATOM_NS, "link")))
                .find(|n| n.attribute("title") == Some("pdf"))
                .and_then(|n| n.attribute("href"))
                .map(str::to_string)
                .unwrap_or_else(|| id.replacen("/abs/", "/pdf/", 1));

            Some(ArxivEntry {
                id,
                title,
                pdf_url,
                published,
            })
        })
        .collect();

    Ok(entries)
}

/// 列出目录下的全部PDF文件，按文件名排序
pub fn list_pdf_files(directory: &Path) -> Result<Vec<PathBuf>> {
    let pattern = directory.join("*.pdf");
    let pattern = pattern
        .to_str()
        .ok_or_else(|| anyhow!("下载目录路径不是合法的UTF-8: {}", directory.display()))?;

    let mut files: Vec<PathBuf> = glob::glob(pattern)
        .with_context(|| format!("无效的PDF匹配模式: {}", pattern))?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("⚠️ 无法读取文件: {}", e);
                None
            }
        })
        .collect();
    files.sort();
    Ok(files)
}

/// 从arXiv按提交时间检索并下载最新论文
pub struct ArxivSource {
    client: reqwest::Client,
    api_url: String,
    download_dir: PathBuf,
}

impl ArxivSource {
    pub fn new(download_dir: impl Into<PathBuf>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: ARXIV_API_URL.to_string(),
            download_dir: download_dir.into(),
        }
    }

    pub async fn search(&self, topic: &str, max_results: usize) -> Result<Vec<ArxivEntry>> {
        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("search_query", format!("all:{}", topic)),
                ("start", "0".to_string()),
                ("max_results", max_results.to_string()),
                ("sortBy", "submittedDate".to_string()),
                ("sortOrder", "descending".to_string()),
            ])
            .send()
            .await
            .with_context(|| format!("arXiv检索请求失败: {}", topic))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("arXiv API error ({}): {}", status, text));
        }

        let feed = response.text().await?;
        parse_feed(&feed)
    }

    async fn download_entry(&self, entry: &ArxivEntry) -> Result<PathBuf> {
        let target = self.download_dir.join(entry.file_name());
        if tokio::fs::try_exists(&target).await.unwrap_or(false) {
            debug!("   已存在，跳过下载: {}", target.display());
            return Ok(target);
        }

        let bytes = self
            .client
            .get(&entry.pdf_url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        tokio::fs::write(&target, &bytes)
            .await
            .with_context(|| format!("写入PDF失败: {}", target.display()))?;

        info!("   ⬇️ {} ({})", entry.title, target.display());
        Ok(target)
    }
}

#[async_trait]
impl PaperSource for ArxivSource {
    async fn download(&self, topics: &[String], per_topic: usize) -> Result<Vec<PathBuf>> {
        tokio::fs::create_dir_all(&self.download_dir)
            .await
            .with_context(|| format!("无法创建下载目录: {}", self.download_dir.display()))?;

        for topic in topics {
            let entries = self.search(topic, per_topic).await?;
            info!("🔎 主题 '{}' 检索到{}篇论文", topic, entries.len());
            for entry in &entries {
                self.download_entry(entry).await?;
            }
        }

        // 目录中之前下载的PDF同样参与解析
        list_pdf_files(&self.download_dir)
    }
}
