use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 生成内容映射：章节键 -> 子章节键 -> 正文
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentMap {
    sections: HashMap<String, HashMap<String, String>>,
}

impl ContentMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入内容，已存在的键会被覆盖
    pub fn insert(
        &mut self,
        section_key: impl Into<String>,
        subsection_key: impl Into<String>,
        content: impl Into<String>,
    ) {
        self.sections
            .entry(section_key.into())
            .or_default()
            .insert(subsection_key.into(), content.into());
    }

    pub fn get(&self, section_key: &str, subsection_key: &str) -> Option<&str> {
        self.sections
            .get(section_key)
            .and_then(|subsections| subsections.get(subsection_key))
            .map(String::as_str)
    }

    pub fn contains_section(&self, section_key: &str) -> bool {
        self.sections.contains_key(section_key)
    }

    /// 内容条目总数
    pub fn len(&self) -> usize {
        self.sections.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
