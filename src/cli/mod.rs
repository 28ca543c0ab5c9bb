use crate::config::{Config, LLMProvider};
use crate::generator::pipeline::ResearchRequest;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::warn;

/// 未指定配置文件时尝试加载的默认配置
pub const DEFAULT_CONFIG_FILE: &str = "research-report.toml";

/// research-report - 由大模型驱动的研究论文报告生成器
#[derive(Parser, Debug)]
#[command(name = "research-report")]
#[command(
    about = "LLM-driven research paper report generator. It plans an outline from a topic, indexes recent arXiv papers, and assembles a complete markdown report."
)]
#[command(version)]
pub struct Args {
    /// 研究主题，未提供时从标准输入读取
    #[arg(short, long)]
    pub query: Option<String>,

    /// 自定义大纲文件，提供时跳过大纲生成
    #[arg(long)]
    pub outline: Option<PathBuf>,

    /// 报告输出路径
    #[arg(short, long)]
    pub output_path: Option<PathBuf>,

    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 模型名称
    #[arg(short, long)]
    pub model: Option<String>,

    /// LLM Provider (openai, deepseek, anthropic, ollama)
    #[arg(long)]
    pub llm_provider: Option<String>,

    /// LLM API基地址
    #[arg(long)]
    pub llm_api_base_url: Option<String>,

    /// LLM API KEY
    #[arg(long)]
    pub llm_api_key: Option<String>,

    /// 托管索引 API KEY
    #[arg(long)]
    pub index_api_key: Option<String>,

    /// 最大tokens数
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// 温度参数
    #[arg(long)]
    pub temperature: Option<f64>,

    /// 整体生成的最大尝试次数
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// 并发调用上限
    #[arg(long)]
    pub max_parallels: Option<usize>,

    /// 论文检索主题，逗号分隔
    #[arg(long, value_delimiter = ',')]
    pub topics: Vec<String>,

    /// 每个主题下载的论文数
    #[arg(long)]
    pub papers_per_topic: Option<usize>,

    /// 论文下载目录
    #[arg(long)]
    pub download_dir: Option<PathBuf>,

    /// 跳过论文下载与入库，直接使用已有索引
    #[arg(long)]
    pub skip_ingestion: bool,

    /// 是否启用详细日志
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// 将CLI参数转换为配置
    pub fn into_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            // 显式指定的配置文件必须可读
            Some(config_path) => Config::from_file(config_path)?,
            None => {
                let default_config_path = std::env::current_dir()
                    .unwrap_or_else(|_| PathBuf::from("."))
                    .join(DEFAULT_CONFIG_FILE);

                if default_config_path.exists() {
                    Config::from_file(&default_config_path)?
                } else {
                    Config::default()
                }
            }
        };

        if let Some(output_path) = &self.output_path {
            config.output_path = output_path.clone();
        }

        // 覆盖LLM配置
        if let Some(provider_str) = &self.llm_provider {
            match provider_str.parse::<LLMProvider>() {
                Ok(provider) => config.llm.provider = provider,
                Err(_) => warn!(
                    "⚠️ 警告: 未知的provider: {}，使用{}",
                    provider_str, config.llm.provider
                ),
            }
        }
        if let Some(llm_api_base_url) = &self.llm_api_base_url {
            config.llm.api_base_url = llm_api_base_url.clone();
        }
        if let Some(llm_api_key) = &self.llm_api_key {
            config.llm.api_key = llm_api_key.clone();
        }
        if let Some(model) = &self.model {
            config.llm.model = model.clone();
        }
        if let Some(max_tokens) = self.max_tokens {
            config.llm.max_tokens = max_tokens;
        }
        if let Some(temperature) = self.temperature {
            config.llm.temperature = temperature;
        }

        // 索引与语料配置
        if let Some(index_api_key) = &self.index_api_key {
            config.index.api_key = index_api_key.clone();
        }
        if !self.topics.is_empty() {
            config.corpus.topics = self.topics.clone();
        }
        if let Some(papers_per_topic) = self.papers_per_topic {
            config.corpus.papers_per_topic = papers_per_topic;
        }
        if let Some(download_dir) = &self.download_dir {
            config.corpus.download_dir = download_dir.clone();
        }

        // 流程配置
        if let Some(max_retries) = self.max_retries {
            config.pipeline.max_retries = max_retries;
        }
        if let Some(max_parallels) = self.max_parallels {
            config.pipeline.max_parallels = max_parallels;
        }

        config.skip_ingestion = config.skip_ingestion || self.skip_ingestion;
        config.verbose = config.verbose || self.verbose;

        Ok(config)
    }

    /// 构造生成请求，读取自定义大纲文件
    pub fn research_request(&self, query: String) -> Result<ResearchRequest> {
        let custom_outline = match &self.outline {
            Some(path) => Some(
                std::fs::read_to_string(path)
                    .with_context(|| format!("无法读取大纲文件: {:?}", path))?,
            ),
            None => None,
        };

        Ok(ResearchRequest {
            query,
            custom_outline,
            ..Default::default()
        })
    }
}
