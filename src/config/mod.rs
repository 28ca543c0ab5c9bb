use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

/// 大模型凭据所使用的环境变量
pub const LLM_API_KEY_ENV: &str = "OPENAI_API_KEY";
/// 托管索引凭据所使用的环境变量
pub const INDEX_API_KEY_ENV: &str = "LLAMA_CLOUD_API_KEY";

/// 配置错误
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing API keys: {0}. Please set them in the config file or environment.")]
    MissingCredentials(String),
}

/// LLM Provider类型
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub enum LLMProvider {
    #[serde(rename = "openai")]
    #[default]
    OpenAI,
    #[serde(rename = "deepseek")]
    DeepSeek,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "ollama")]
    Ollama,
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMProvider::OpenAI => write!(f, "openai"),
            LLMProvider::DeepSeek => write!(f, "deepseek"),
            LLMProvider::Anthropic => write!(f, "anthropic"),
            LLMProvider::Ollama => write!(f, "ollama"),
        }
    }
}

impl std::str::FromStr for LLMProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(LLMProvider::OpenAI),
            "deepseek" => Ok(LLMProvider::DeepSeek),
            "anthropic" => Ok(LLMProvider::Anthropic),
            "ollama" => Ok(LLMProvider::Ollama),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

/// 应用程序配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct Config {
    /// 报告输出路径
    pub output_path: PathBuf,

    /// LLM模型配置
    pub llm: LLMConfig,

    /// 托管索引配置
    pub index: IndexConfig,

    /// 论文语料配置
    pub corpus: CorpusConfig,

    /// 报告生成流程配置
    pub pipeline: PipelineConfig,

    /// 跳过论文下载与入库，直接复用已有索引
    pub skip_ingestion: bool,

    /// 是否启用详细日志
    pub verbose: bool,
}

/// LLM模型配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LLMConfig {
    /// LLM Provider类型
    pub provider: LLMProvider,

    /// LLM API KEY
    pub api_key: String,

    /// LLM API基地址
    pub api_base_url: String,

    /// 生成所用的模型
    pub model: String,

    /// 最大tokens
    pub max_tokens: u32,

    /// 温度
    pub temperature: f64,

    /// 单次调用的重试次数
    pub retry_attempts: u32,

    /// 重试间隔（毫秒）
    pub retry_delay_ms: u64,

    /// 超时时间（秒）
    pub timeout_seconds: u64,
}

/// 托管索引（检索服务）配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct IndexConfig {
    /// 索引服务 API KEY
    pub api_key: String,

    /// 索引服务基地址
    pub api_base_url: String,

    /// 索引流水线名称
    pub pipeline_name: String,

    /// 向量化模型
    pub embedding_model: String,

    pub chunk_size: usize,

    pub chunk_overlap: usize,

    pub dense_similarity_top_k: usize,

    pub sparse_similarity_top_k: usize,

    /// 稠密与稀疏检索的混合权重
    pub alpha: f64,

    pub enable_reranking: bool,

    pub rerank_top_n: usize,

    pub retrieval_mode: String,
}

/// 论文语料配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct CorpusConfig {
    /// 检索主题，为空时使用用户查询本身
    pub topics: Vec<String>,

    /// 每个主题下载的论文数量
    pub papers_per_topic: usize,

    /// PDF下载目录
    pub download_dir: PathBuf,

    /// 元数据抽取的并发数
    pub metadata_workers: usize,
}

/// 报告生成流程配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct PipelineConfig {
    /// 整篇报告生成的最大尝试次数
    pub max_retries: u32,

    /// 报告不完整时的重试等待（毫秒）
    pub incomplete_retry_delay_ms: u64,

    /// 生成出错时的重试等待（毫秒）
    pub error_retry_delay_ms: u64,

    /// 单次工作流执行的超时时间（秒）
    pub workflow_timeout_seconds: u64,

    /// 查询规划与内容生成的最大并发数
    pub max_parallels: usize,

    /// 低于该字符数的回答视为低质量
    pub min_content_chars: usize,
}

impl PipelineConfig {
    pub fn incomplete_retry_delay(&self) -> Duration {
        Duration::from_millis(self.incomplete_retry_delay_ms)
    }

    pub fn error_retry_delay(&self) -> Duration {
        Duration::from_millis(self.error_retry_delay_ms)
    }

    pub fn workflow_timeout(&self) -> Duration {
        Duration::from_secs(self.workflow_timeout_seconds)
    }
}

impl Config {
    /// 从文件加载配置
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let mut file =
            File::open(path).context(format!("Failed to open config file: {:?}", path))?;
        let mut content = String::new();
        file.read_to_string(&mut content)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// 检查必需的凭据是否齐全
    pub fn validate_credentials(&self) -> Result<(), ConfigError> {
        let mut missing = Vec::new();
        // 本地 Ollama 不需要 API KEY
        if self.llm.api_key.trim().is_empty() && self.llm.provider != LLMProvider::Ollama {
            missing.push(LLM_API_KEY_ENV);
        }
        if self.index.api_key.trim().is_empty() {
            missing.push(INDEX_API_KEY_ENV);
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingCredentials(missing.join(", ")))
        }
    }

    /// 语料检索主题，未配置时退化为用户查询
    pub fn research_topics(&self, query: &str) -> Vec<String> {
        let topics: Vec<String> = self
            .corpus
            .topics
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if topics.is_empty() {
            vec![query.trim().to_string()]
        } else {
            topics
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("./research_paper.md"),
            llm: LLMConfig::default(),
            index: IndexConfig::default(),
            corpus: CorpusConfig::default(),
            pipeline: PipelineConfig::default(),
            skip_ingestion: false,
            verbose: false,
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::default(),
            api_key: std::env::var(LLM_API_KEY_ENV).unwrap_or_default(),
            api_base_url: String::from("https://api.openai.com/v1"),
            model: String::from("gpt-3.5-turbo"),
            max_tokens: 4000,
            temperature: 0.3,
            retry_attempts: 3,
            retry_delay_ms: 2000,
            timeout_seconds: 300,
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var(INDEX_API_KEY_ENV).unwrap_or_default(),
            api_base_url: String::from("https://api.cloud.llamaindex.ai"),
            pipeline_name: String::from("report_generation"),
            embedding_model: String::from("text-embedding-ada-002"),
            chunk_size: 1024,
            chunk_overlap: 20,
            dense_similarity_top_k: 10,
            sparse_similarity_top_k: 10,
            alpha: 0.5,
            enable_reranking: true,
            rerank_top_n: 5,
            retrieval_mode: String::from("chunks"),
        }
    }
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            topics: vec![],
            papers_per_topic: 3,
            download_dir: PathBuf::from("./papers"),
            metadata_workers: 4,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            incomplete_retry_delay_ms: 5000,
            error_retry_delay_ms: 10000,
            workflow_timeout_seconds: 2400,
            max_parallels: 4,
            min_content_chars: 50,
        }
    }
}
