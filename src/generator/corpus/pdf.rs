use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::DocumentParser;
use crate::types::document::Document;
use crate::utils::threads::do_parallel_with_limit;

/// 逐页提取PDF文本
pub fn extract_pages(path: &Path) -> Result<Document> {
    let pdf = lopdf::Document::load(path)
        .with_context(|| format!("无法加载PDF: {}", path.display()))?;

    let mut pages = Vec::new();
    for page_num in pdf.get_pages().keys() {
        match pdf.extract_text(&[*page_num]) {
            Ok(text) => pages.push(text),
            Err(e) => warn!("⚠️ {} 第{}页文本提取失败: {}", path.display(), page_num, e),
        }
    }

    Ok(Document {
        source: path.to_path_buf(),
        pages,
    })
}

/// 基于lopdf的PDF解析器，解析在阻塞线程池中进行
pub struct PdfTextParser {
    workers: usize,
}

impl PdfTextParser {
    pub fn new(workers: usize) -> Self {
        Self { workers }
    }
}

impl Default for PdfTextParser {
    fn default() -> Self {
        Self::new(4)
    }
}

#[async_trait]
impl DocumentParser for PdfTextParser {
    /// 无法解析或没有文本的文件会被跳过
    async fn parse(&self, paths: &[PathBuf]) -> Result<Vec<Document>> {
        let total = paths.len();
        let parse_futures: Vec<_> = paths
            .iter()
            .enumerate()
            .map(|(index, path)| {
                let path = path.clone();
                Box::pin(async move {
                    info!("   处理文件 {}/{}: {}", index + 1, total, path.display());
                    let task_path = path.clone();
                    let result = tokio::task::spawn_blocking(move || extract_pages(&task_path))
                        .await
                        .context("PDF解析任务异常退出")
                        .and_then(|r| r);
                    (path, result)
                })
            })
            .collect();

        let mut documents = Vec::new();
        for (path, result) in do_parallel_with_limit(parse_futures, self.workers).await {
            match result {
                Ok(document) if !document.is_empty() => documents.push(document),
                Ok(_) => warn!("⚠️ {} 中没有可提取的文本，已跳过", path.display()),
                Err(e) => warn!("⚠️ 跳过无法解析的文件 {}: {:#}", path.display(), e),
            }
        }

        Ok(documents)
    }
}
