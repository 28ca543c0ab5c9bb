//! 报告生成流程所依赖的两类外部能力：文本补全与文档检索

use anyhow::Result;
use async_trait::async_trait;

/// 文本补全服务：输入prompt，返回自由文本
#[async_trait]
pub trait CompletionOracle: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// 检索服务：基于已入库的文档回答查询
#[async_trait]
pub trait RetrievalOracle: Send + Sync {
    async fn query(&self, text: &str) -> Result<String>;
}
