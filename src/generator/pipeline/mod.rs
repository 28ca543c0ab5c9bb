use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::{Config, PipelineConfig};
use crate::generator::context::GeneratorContext;
use crate::generator::corpus::{
    ArxivSource, CorpusStage, ManagedIndexBuilder, ManagedIndexClient, PdfTextParser,
};
use crate::generator::outline::parser::block_heading;
use crate::generator::outline::{
    extract_section_content, extract_title, generate_outline, prepare_custom_outline, split_blocks,
};
use crate::generator::workflow::{ReportRunner, ReportWorkflow, WorkflowOptions};
use crate::llm::oracle::CompletionOracle;

/// 完整报告必须包含的标记
pub const COMPLETION_MARKER: &str = "Conclusion";
/// 逐段生成失败时的占位正文
pub const INCOMPLETE_SECTION_STUB: &str = "Content generation incomplete for this section.";

/// 时间跟踪作用域
pub struct TimingScope {
    start_time: Instant,
    phase_start_times: HashMap<String, Instant>,
    phase_durations: Vec<(String, Duration)>,
}

impl Default for TimingScope {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingScope {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            phase_start_times: HashMap::new(),
            phase_durations: Vec::new(),
        }
    }

    /// 开始一个新的阶段计时
    pub fn start_phase(&mut self, phase_name: &str) {
        self.phase_start_times
            .insert(phase_name.to_string(), Instant::now());
    }

    /// 结束一个阶段的计时
    pub fn end_phase(&mut self, phase_name: &str) -> Option<Duration> {
        let duration = self.phase_start_times.remove(phase_name)?.elapsed();
        self.phase_durations
            .push((phase_name.to_string(), duration));
        Some(duration)
    }

    /// 获取所有阶段的执行时间，按结束顺序排列
    pub fn get_phase_durations(&self) -> &[(String, Duration)] {
        &self.phase_durations
    }

    /// 获取格式化的执行时间报告
    pub fn generate_timing_report(&self) -> String {
        let mut report = format!(
            "总执行时间: {:.2}秒\n",
            self.start_time.elapsed().as_secs_f64()
        );

        if !self.phase_durations.is_empty() {
            report.push_str("\n各阶段执行时间:\n");
            for (phase, duration) in &self.phase_durations {
                report.push_str(&format!("- {}: {:.3}秒\n", phase, duration.as_secs_f64()));
            }
        }

        report
    }
}

/// 时间跟踪常量
pub struct TimingKeys;

impl TimingKeys {
    pub const OUTLINE: &'static str = "outline";
    pub const CORPUS: &'static str = "corpus";
    pub const GENERATION: &'static str = "generation";
}

/// 整体重试策略
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    /// 报告不完整后的等待时间
    pub incomplete_delay: Duration,
    /// 生成出错后的等待时间
    pub error_delay: Duration,
}

impl From<&PipelineConfig> for RetryPolicy {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            incomplete_delay: config.incomplete_retry_delay(),
            error_delay: config.error_retry_delay(),
        }
    }
}

/// 一次报告生成请求
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchRequest {
    pub query: String,
    /// 覆盖配置中的模型
    pub model: Option<String>,
    /// 覆盖配置中的最大尝试次数
    pub max_retries: Option<u32>,
    /// 提供时跳过大纲生成
    pub custom_outline: Option<String>,
}

impl ResearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutput {
    pub response: String,
    pub outline: String,
    pub success: bool,
}

fn is_complete(response: &str) -> bool {
    !response.trim().is_empty() && response.contains(COMPLETION_MARKER)
}

fn section_stub(block: &str) -> String {
    format!("## {}\n\n{}", block_heading(block), INCOMPLETE_SECTION_STUB)
}

/// 整体生成 + 逐段兜底
pub struct ResearchPipeline<'a> {
    runner: &'a dyn ReportRunner,
    policy: RetryPolicy,
}

impl<'a> ResearchPipeline<'a> {
    pub fn new(runner: &'a dyn ReportRunner, policy: RetryPolicy) -> Self {
        Self { runner, policy }
    }

    pub async fn generate(&self, outline: &str) -> Result<PipelineOutput> {
        let attempts = self.policy.max_retries;

        for attempt in 1..=attempts {
            info!("📝 生成报告 (第 {}/{} 次尝试)...", attempt, attempts);

            let delay = match self.runner.run(outline).await {
                Ok(output) if is_complete(&output.response) => {
                    info!("✓ 报告生成成功");
                    return Ok(PipelineOutput {
                        response: output.response,
                        outline: outline.to_string(),
                        success: true,
                    });
                }
                Ok(_) => {
                    warn!("⚠️ 生成的报告不完整，准备重试");
                    self.policy.incomplete_delay
                }
                Err(e) => {
                    warn!("❌ 第{}次生成失败: {:#}", attempt, e);
                    self.policy.error_delay
                }
            };

            if attempt < attempts {
                tokio::time::sleep(delay).await;
            }
        }

        info!("🔁 整体生成未成功，改为按章节逐段生成...");
        let response = self.generate_by_sections(outline).await?;
        Ok(PipelineOutput {
            response,
            outline: outline.to_string(),
            success: true,
        })
    }

    /// 标题与第一个章节一起生成，失败即终止；其余章节各自独立生成，失败时使用占位内容
    async fn generate_by_sections(&self, outline: &str) -> Result<String> {
        let blocks = split_blocks(outline);
        let Some((first, rest)) = blocks.split_first() else {
            bail!("大纲为空，无法按章节生成");
        };

        let (intro_outline, remaining) = match rest.split_first() {
            Some((second, others)) => (format!("{}\n{}", first, second), others),
            None => (first.clone(), rest),
        };

        let mut parts = Vec::new();

        let intro = self
            .runner
            .run(&intro_outline)
            .await
            .context("引言部分生成失败")?;
        if !intro.response.trim().is_empty() {
            parts.push(intro.response);
        }

        let title_line = format!("# {}", extract_title(outline));
        for (index, block) in remaining.iter().enumerate() {
            let block_outline = format!("{}\n\n{}", title_line, block);
            debug!("   逐段生成第{}块: {}", index + 1, block_heading(block));

            match self.runner.run(&block_outline).await {
                Ok(output) => {
                    let content = extract_section_content(&output.response);
                    if content.trim().is_empty() {
                        warn!("⚠️ 章节 {} 生成结果为空，已跳过", block_heading(block));
                    } else {
                        parts.push(content);
                    }
                }
                Err(e) => {
                    warn!("❌ 章节 {} 生成失败: {:#}", block_heading(block), e);
                    parts.push(section_stub(block));
                }
            }
        }

        Ok(parts.join("\n\n"))
    }
}

/// 生成大纲 -> 准备语料与索引 -> 生成报告
pub async fn initialize_research_pipeline(
    config: &Config,
    request: &ResearchRequest,
) -> Result<PipelineOutput> {
    let mut config = config.clone();
    if let Some(model) = &request.model {
        config.llm.model = model.clone();
    }
    if let Some(max_retries) = request.max_retries {
        config.pipeline.max_retries = max_retries;
    }

    config.validate_credentials()?;

    let context = GeneratorContext::new(config)?;
    let config = &context.config;
    info!("🤖 使用模型: {} ({})", context.llm_client.model(), config.llm.provider);
    context.llm_client.check_connection().await?;

    let completion: Arc<dyn CompletionOracle> = Arc::new(context.llm_client.clone());
    let mut timing = TimingScope::new();

    timing.start_phase(TimingKeys::OUTLINE);
    let outline = match &request.custom_outline {
        Some(outline) => {
            info!("📝 使用自定义大纲");
            prepare_custom_outline(&request.query, outline)
        }
        None => generate_outline(completion.as_ref(), &request.query).await?,
    };
    info!("大纲:\n{}", outline);
    timing.end_phase(TimingKeys::OUTLINE);

    timing.start_phase(TimingKeys::CORPUS);
    let source = ArxivSource::new(config.corpus.download_dir.clone());
    let parser = PdfTextParser::default();
    let builder = ManagedIndexBuilder::new(
        ManagedIndexClient::new(config.index.clone(), config.llm.api_key.clone()),
        Arc::new(context.llm_client.clone()),
        completion.clone(),
        config.corpus.metadata_workers,
    );
    let index = CorpusStage::new(&source, &parser, &builder)
        .execute(
            &config.research_topics(&request.query),
            config.corpus.papers_per_topic,
            config.skip_ingestion,
        )
        .await?;
    timing.end_phase(TimingKeys::CORPUS);

    timing.start_phase(TimingKeys::GENERATION);
    let workflow = ReportWorkflow::new(
        completion,
        index.retrieval(),
        WorkflowOptions::from(&config.pipeline),
    );
    let output = ResearchPipeline::new(&workflow, RetryPolicy::from(&config.pipeline))
        .generate(&outline)
        .await?;
    timing.end_phase(TimingKeys::GENERATION);

    debug!("{}", timing.generate_timing_report());
    Ok(output)
}

/// 生成报告并保存到输出路径
pub async fn launch(config: &Config, request: &ResearchRequest) -> Result<PipelineOutput> {
    info!("🚀 开始生成研究报告: {}", request.query);

    let output = initialize_research_pipeline(config, request).await?;
    if output.response.trim().is_empty() {
        bail!("生成的报告为空");
    }

    crate::generator::outlet::save(config, &output.response).await?;
    Ok(output)
}

// Include tests
#[cfg(test)]
mod tests;
