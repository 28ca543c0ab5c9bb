use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 解析后的论文文本
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// 来源PDF路径
    pub source: PathBuf,
    /// 按页提取的文本
    pub pages: Vec<String>,
}

impl Document {
    pub fn full_text(&self) -> String {
        self.pages.join("\n\n")
    }

    /// 前几页文本，用于元数据抽取
    pub fn leading_text(&self, pages: usize) -> String {
        self.pages
            .iter()
            .take(pages)
            .cloned()
            .collect::<Vec<_>>()
            .join("")
    }

    pub fn is_empty(&self) -> bool {
        self.pages.iter().all(|page| page.trim().is_empty())
    }
}

/// 由大模型从论文中抽取的元数据
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PaperMetadata {
    /// List of author names
    #[serde(default)]
    pub author_names: Vec<String>,
    /// List of author companies
    #[serde(default)]
    pub author_companies: Vec<String>,
    /// AI-related tags, at most three
    #[serde(default)]
    pub ai_tags: Vec<String>,
}
