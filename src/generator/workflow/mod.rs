use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config::PipelineConfig;
use crate::generator::assembler::ReportAssembler;
use crate::generator::content::ContentGenerator;
use crate::generator::outline::parse;
use crate::generator::planner::QueryPlanner;
use crate::llm::oracle::{CompletionOracle, RetrievalOracle};

#[derive(Debug, Error, PartialEq)]
pub enum WorkflowError {
    #[error("Report workflow timed out after {0} seconds")]
    Timeout(u64),
}

/// 单次报告生成的运行参数
#[derive(Debug, Clone)]
pub struct WorkflowOptions {
    pub max_parallels: usize,
    pub min_content_chars: usize,
    pub timeout: Duration,
}

impl From<&PipelineConfig> for WorkflowOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            max_parallels: config.max_parallels,
            min_content_chars: config.min_content_chars,
            timeout: config.workflow_timeout(),
        }
    }
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowOutput {
    pub response: String,
}

/// 根据大纲生成一份报告
#[async_trait]
pub trait ReportRunner: Send + Sync {
    async fn run(&self, outline: &str) -> Result<WorkflowOutput>;
}

/// 规划 -> 生成 -> 组装
pub struct ReportWorkflow {
    completion: Arc<dyn CompletionOracle>,
    retrieval: Arc<dyn RetrievalOracle>,
    options: WorkflowOptions,
}

impl ReportWorkflow {
    pub fn new(
        completion: Arc<dyn CompletionOracle>,
        retrieval: Arc<dyn RetrievalOracle>,
        options: WorkflowOptions,
    ) -> Self {
        Self {
            completion,
            retrieval,
            options,
        }
    }

    async fn execute(&self, outline: &str) -> Result<WorkflowOutput> {
        let report = parse(outline);
        info!("🚀 开始报告生成流程: {}", report.title);

        let queries = QueryPlanner::new(self.completion.as_ref(), self.options.max_parallels)
            .plan(&report)
            .await?;

        let contents = ContentGenerator::new(
            self.completion.as_ref(),
            self.retrieval.as_ref(),
            self.options.max_parallels,
        )
        .with_min_content_chars(self.options.min_content_chars)
        .generate(&queries)
        .await;

        let response = ReportAssembler::new(self.completion.as_ref())
            .assemble(&contents, &report.title, &report)
            .await?;

        info!("✓ 报告生成流程完成");
        Ok(WorkflowOutput { response })
    }
}

#[async_trait]
impl ReportRunner for ReportWorkflow {
    async fn run(&self, outline: &str) -> Result<WorkflowOutput> {
        match tokio::time::timeout(self.options.timeout, self.execute(outline)).await {
            Ok(result) => result,
            Err(_) => Err(WorkflowError::Timeout(self.options.timeout.as_secs()).into()),
        }
    }
}
