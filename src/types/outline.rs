use serde::{Deserialize, Serialize};

/// 章节在报告中的角色，解析时一次性确定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SectionRole {
    Introduction,
    Conclusion,
    Body,
}

impl SectionRole {
    /// 根据章节标题判定角色：标题以 introduction / conclusion 开头时才视为引言 / 结论
    pub fn from_title(title: &str) -> Self {
        let normalized = title
            .trim()
            .trim_start_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();

        if normalized.starts_with("introduction") {
            SectionRole::Introduction
        } else if normalized.starts_with("conclusion") {
            SectionRole::Conclusion
        } else {
            SectionRole::Body
        }
    }
}

/// 子章节
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subsection {
    /// 形如 `2.1.` 的编号
    pub number: String,
    pub title: String,
}

impl Subsection {
    /// 查询与内容映射中使用的键，形如 `2.1. History`
    pub fn key(&self) -> String {
        format!("{} {}", self.number, self.title)
    }
}

/// 一级章节
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// 形如 `2.` 的编号，未编号的章节会被分配顺序编号
    pub number: String,
    pub title: String,
    pub role: SectionRole,
    pub subsections: Vec<Subsection>,
}

impl Section {
    pub fn new(number: impl Into<String>, title: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            number: number.into(),
            role: SectionRole::from_title(&title),
            title,
            subsections: Vec::new(),
        }
    }

    /// 查询与内容映射中使用的键，形如 `2. Background`
    pub fn key(&self) -> String {
        format!("{} {}", self.number, self.title)
    }

    pub fn has_subsections(&self) -> bool {
        !self.subsections.is_empty()
    }
}

/// 解析后的大纲树
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub title: String,
    pub sections: Vec<Section>,
}

impl Report {
    /// 除指定角色以外的章节
    pub fn sections_excluding<'a>(
        &'a self,
        roles: &'a [SectionRole],
    ) -> impl Iterator<Item = &'a Section> + 'a {
        self.sections
            .iter()
            .filter(move |section| !roles.contains(&section.role))
    }
}
