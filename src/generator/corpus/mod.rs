//! 论文语料的获取、解析与索引构建

use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::llm::oracle::RetrievalOracle;
use crate::types::document::Document;

pub mod arxiv;
pub mod index;
pub mod pdf;

pub use arxiv::ArxivSource;
pub use index::{ManagedIndexBuilder, ManagedIndexClient};
pub use pdf::PdfTextParser;

/// 论文来源
#[async_trait]
pub trait PaperSource: Send + Sync {
    /// 按主题下载论文，返回可供解析的PDF路径
    async fn download(&self, topics: &[String], per_topic: usize) -> Result<Vec<PathBuf>>;
}

/// 文档解析器
#[async_trait]
pub trait DocumentParser: Send + Sync {
    async fn parse(&self, paths: &[PathBuf]) -> Result<Vec<Document>>;
}

/// 检索索引的构建者
#[async_trait]
pub trait IndexBuilder: Send + Sync {
    /// 创建（或更新）索引并写入文档
    async fn build_index(&self, documents: &[Document]) -> Result<IndexHandle>;

    /// 打开已存在的索引，不写入任何文档
    async fn open_index(&self) -> Result<IndexHandle>;
}

/// 已就绪的索引
#[derive(Clone)]
pub struct IndexHandle {
    pub index_id: String,
    retrieval: Arc<dyn RetrievalOracle>,
}

impl IndexHandle {
    pub fn new(index_id: impl Into<String>, retrieval: Arc<dyn RetrievalOracle>) -> Self {
        Self {
            index_id: index_id.into(),
            retrieval,
        }
    }

    pub fn retrieval(&self) -> Arc<dyn RetrievalOracle> {
        self.retrieval.clone()
    }
}

/// 语料阶段：下载 -> 解析 -> 建索引
pub struct CorpusStage<'a> {
    source: &'a dyn PaperSource,
    parser: &'a dyn DocumentParser,
    builder: &'a dyn IndexBuilder,
}

impl<'a> CorpusStage<'a> {
    pub fn new(
        source: &'a dyn PaperSource,
        parser: &'a dyn DocumentParser,
        builder: &'a dyn IndexBuilder,
    ) -> Self {
        Self {
            source,
            parser,
            builder,
        }
    }

    pub async fn execute(
        &self,
        topics: &[String],
        per_topic: usize,
        skip_ingestion: bool,
    ) -> Result<IndexHandle> {
        if skip_ingestion {
            info!("⏭️ 跳过论文下载与入库，直接使用已有索引");
            return self.builder.open_index().await;
        }

        info!("📥 下载论文: {:?} (每个主题{}篇)", topics, per_topic);
        let pdf_files = self.source.download(topics, per_topic).await?;
        info!("   共找到{}个PDF文件", pdf_files.len());

        info!("📄 解析PDF文件...");
        let documents = self.parser.parse(&pdf_files).await?;
        info!("   成功解析{}篇文档", documents.len());
        if documents.is_empty() {
            warn!("⚠️ 没有可用的文档，索引中仅包含已有数据");
        }

        info!("🗂️ 构建检索索引...");
        let handle = self.builder.build_index(&documents).await?;
        info!("✓ 索引就绪: {}", handle.index_id);
        Ok(handle)
    }
}
