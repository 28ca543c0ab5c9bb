use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// 没有子章节的章节所使用的合成子章节键
pub const GENERAL_SUBSECTION_KEY: &str = "General";
/// 合成子章节的标题
pub const GENERAL_SUBSECTION_TITLE: &str = "General overview";

/// 查询的信息来源分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    /// 通用知识，直接由大模型回答
    #[serde(rename = "LLM")]
    Llm,
    /// 需要检索外部索引
    #[serde(rename = "INDEX")]
    Index,
}

impl Classification {
    /// 解析模型给出的分类结论，除 `LLM` 与 `INDEX` 之外的任何输出都归为 `INDEX`
    pub fn from_verdict(verdict: &str) -> Self {
        match verdict.trim().to_uppercase().as_str() {
            "LLM" => Classification::Llm,
            _ => Classification::Index,
        }
    }
}

impl Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Classification::Llm => write!(f, "LLM"),
            Classification::Index => write!(f, "INDEX"),
        }
    }
}

/// 单个大纲叶子节点对应的查询记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRecord {
    pub section_key: String,
    pub subsection_key: String,
    pub query_text: String,
    pub classification: Classification,
}

/// 按大纲顺序排列的查询记录集合
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryMap {
    records: Vec<QueryRecord>,
}

impl QueryMap {
    pub fn new(records: Vec<QueryRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[QueryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, section_key: &str, subsection_key: &str) -> Option<&QueryRecord> {
        self.records
            .iter()
            .find(|r| r.section_key == section_key && r.subsection_key == subsection_key)
    }
}
