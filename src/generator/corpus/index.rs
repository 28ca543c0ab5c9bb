//! 托管检索索引（LlamaCloud pipeline REST接口）

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{IndexBuilder, IndexHandle};
use crate::config::IndexConfig;
use crate::llm::LLMClient;
use crate::llm::oracle::{CompletionOracle, RetrievalOracle};
use crate::types::document::{Document, PaperMetadata};
use crate::utils::threads::do_parallel_with_limit;

/// 元数据抽取时使用的前几页
const METADATA_PAGES: usize = 3;
/// 检索结果为空时的回答
pub const EMPTY_RESPONSE: &str = "Empty Response";

/// 论文元数据抽取
#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    async fn extract_metadata(&self, text: &str) -> Result<PaperMetadata>;
}

#[async_trait]
impl MetadataExtractor for LLMClient {
    async fn extract_metadata(&self, text: &str) -> Result<PaperMetadata> {
        let user_prompt = format!(
            r#"Generate authors names, authors companies, and general top 3 AI tags for the given research paper.

Research Paper:
{text}

Respond with a JSON that includes:
- author_names: List of author names
- author_companies: List of author companies
- ai_tags: List of 3 AI-related tags"#
        );
        self.extract::<PaperMetadata>(
            "You extract bibliographic metadata from research papers.",
            &user_prompt,
        )
        .await
    }
}

/// 上传到索引的文档
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CloudDocument {
    pub text: String,
    pub metadata: PaperMetadata,
}

#[derive(Debug, Deserialize)]
struct PipelineRecord {
    id: String,
}

#[derive(Debug, Deserialize)]
pub struct RetrieveResponse {
    #[serde(default)]
    pub retrieval_nodes: Vec<ScoredNode>,
}

#[derive(Debug, Deserialize)]
pub struct ScoredNode {
    pub node: TextNode,
    #[serde(default)]
    pub score: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct TextNode {
    #[serde(default)]
    pub text: String,
}

/// 托管索引的HTTP客户端
#[derive(Clone)]
pub struct ManagedIndexClient {
    http: reqwest::Client,
    config: IndexConfig,
    /// 嵌入模型使用LLM的密钥
    embedding_api_key: String,
}

impl ManagedIndexClient {
    pub fn new(config: IndexConfig, embedding_api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            embedding_api_key: embedding_api_key.into(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/api/v1/{}",
            self.config.api_base_url.trim_end_matches('/'),
            path
        )
    }

    /// 创建或更新pipeline时提交的配置
    pub fn pipeline_request(&self) -> serde_json::Value {
        json!({
            "name": self.config.pipeline_name,
            "embedding_config": {
                "type": "OPENAI_EMBEDDING",
                "component": {
                    "api_key": self.embedding_api_key,
                    "model_name": self.config.embedding_model,
                }
            },
            "transform_config": {
                "mode": "auto",
                "config": {
                    "chunk_size": self.config.chunk_size,
                    "chunk_overlap": self.config.chunk_overlap,
                }
            },
            "data_sink_id": null,
        })
    }

    /// 混合检索参数
    pub fn retrieve_request(&self, query: &str) -> serde_json::Value {
        json!({
            "query": query,
            "dense_similarity_top_k": self.config.dense_similarity_top_k,
            "sparse_similarity_top_k": self.config.sparse_similarity_top_k,
            "alpha": self.config.alpha,
            "enable_reranking": self.config.enable_reranking,
            "rerank_top_n": self.config.rerank_top_n,
            "retrieval_mode": self.config.retrieval_mode,
        })
    }

    async fn send_json(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = request
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .context("索引服务请求失败")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Index API error ({}): {}", status, text));
        }
        Ok(response)
    }

    pub async fn upsert_pipeline(&self) -> Result<String> {
        let response = self
            .send_json(
                self.http
                    .put(self.endpoint("pipelines"))
                    .json(&self.pipeline_request()),
            )
            .await?;
        let pipeline: PipelineRecord = response.json().await.context("无法解析pipeline响应")?;
        Ok(pipeline.id)
    }

    pub async fn find_pipeline(&self) -> Result<String> {
        let response = self
            .send_json(
                self.http
                    .get(self.endpoint("pipelines"))
                    .query(&[("pipeline_name", self.config.pipeline_name.as_str())]),
            )
            .await?;
        let pipelines: Vec<PipelineRecord> =
            response.json().await.context("无法解析pipeline列表")?;
        pipelines
            .into_iter()
            .next()
            .map(|p| p.id)
            .ok_or_else(|| anyhow!("索引不存在: {}", self.config.pipeline_name))
    }

    pub async fn upload_documents(&self, pipeline_id: &str, documents: &[CloudDocument]) -> Result<()> {
        self.send_json(
            self.http
                .post(self.endpoint(&format!("pipelines/{}/documents", pipeline_id)))
                .json(documents),
        )
        .await?;
        Ok(())
    }

    pub async fn retrieve(&self, pipeline_id: &str, query: &str) -> Result<Vec<ScoredNode>> {
        let response = self
            .send_json(
                self.http
                    .post(self.endpoint(&format!("pipelines/{}/retrieve", pipeline_id)))
                    .json(&self.retrieve_request(query)),
            )
            .await?;
        let body: RetrieveResponse = response.json().await.context("无法解析检索结果")?;
        Ok(body.retrieval_nodes)
    }
}

/// 把检索到的片段组织成问答prompt
pub fn synthesis_prompt(nodes: &[ScoredNode], query: &str) -> String {
    let context = nodes
        .iter()
        .map(|n| n.node.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Context information is below.\n---------------------\n{context}\n---------------------\nGiven the context information and not prior knowledge, answer the query.\nQuery: {query}\nAnswer: "
    )
}

/// 检索 + 生成的查询引擎
pub struct IndexQueryEngine {
    client: ManagedIndexClient,
    pipeline_id: String,
    synthesizer: Arc<dyn CompletionOracle>,
}

impl IndexQueryEngine {
    pub fn new(client: ManagedIndexClient, pipeline_id: String, synthesizer: Arc<dyn CompletionOracle>) -> Self {
        Self {
            client,
            pipeline_id,
            synthesizer,
        }
    }
}

#[async_trait]
impl RetrievalOracle for IndexQueryEngine {
    async fn query(&self, text: &str) -> Result<String> {
        let nodes = self.client.retrieve(&self.pipeline_id, text).await?;
        debug!("   检索到{}个片段", nodes.len());
        if nodes.is_empty() {
            return Ok(EMPTY_RESPONSE.to_string());
        }
        self.synthesizer.complete(&synthesis_prompt(&nodes, text)).await
    }
}

/// 准备上传文档，元数据抽取失败时使用空元数据
pub async fn prepare_document(extractor: &dyn MetadataExtractor, document: &Document) -> CloudDocument {
    let metadata = match extractor
        .extract_metadata(&document.leading_text(METADATA_PAGES))
        .await
    {
        Ok(metadata) => metadata,
        Err(e) => {
            warn!("⚠️ 元数据解析失败 {}: {}", document.source.display(), e);
            PaperMetadata::default()
        }
    };

    CloudDocument {
        text: document.full_text(),
        metadata,
    }
}

/// 基于托管索引的构建者
pub struct ManagedIndexBuilder {
    client: ManagedIndexClient,
    extractor: Arc<dyn MetadataExtractor>,
    synthesizer: Arc<dyn CompletionOracle>,
    workers: usize,
}

impl ManagedIndexBuilder {
    pub fn new(
        client: ManagedIndexClient,
        extractor: Arc<dyn MetadataExtractor>,
        synthesizer: Arc<dyn CompletionOracle>,
        workers: usize,
    ) -> Self {
        Self {
            client,
            extractor,
            synthesizer,
            workers,
        }
    }

    fn handle(&self, pipeline_id: String) -> IndexHandle {
        let engine = IndexQueryEngine::new(
            self.client.clone(),
            pipeline_id.clone(),
            self.synthesizer.clone(),
        );
        IndexHandle::new(pipeline_id, Arc::new(engine))
    }
}

#[async_trait]
impl IndexBuilder for ManagedIndexBuilder {
    async fn build_index(&self, documents: &[Document]) -> Result<IndexHandle> {
        let pipeline_id = self.client.upsert_pipeline().await?;
        info!("   pipeline已就绪: {}", pipeline_id);

        let extractor = self.extractor.as_ref();
        let upload_futures: Vec<_> = documents
            .iter()
            .map(|document| Box::pin(prepare_document(extractor, document)))
            .collect();
        let uploads = do_parallel_with_limit(upload_futures, self.workers).await;

        if !uploads.is_empty() {
            info!("   上传{}篇文档到索引...", uploads.len());
            self.client.upload_documents(&pipeline_id, &uploads).await?;
        }

        Ok(self.handle(pipeline_id))
    }

    async fn open_index(&self) -> Result<IndexHandle> {
        let pipeline_id = self.client.find_pipeline().await?;
        Ok(self.handle(pipeline_id))
    }
}
