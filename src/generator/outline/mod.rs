use anyhow::Result;
use tracing::{debug, info};

use crate::llm::oracle::CompletionOracle;
use crate::types::outline::SectionRole;

pub mod parser;

pub use parser::{extract_section_content, extract_title, parse, split_blocks};

const TITLE_PREFIX: &str = "# Research Paper";
const CONCLUSION_MARKERS: [&str; 2] = ["## Conclusion", "## 4. Conclusion"];

fn outline_prompt(query: &str) -> String {
    format!(
        r#"Generate a detailed research paper outline for the following topic: "{query}"

The outline should follow this format exactly:

# Research Paper Report on [Topic]

## 1. Introduction

## 2. [Background/Fundamentals Section]
2.1. [Subsection]
2.2. [Subsection]

## 3. Latest Papers:
3.1. [Specific Research Area or Paper Topic]
3.2. [Specific Research Area or Paper Topic]
3.3. [Specific Research Area or Paper Topic]

## 4. Conclusion

Replace the bracketed text with relevant content for the query topic.
Ensure the outline is comprehensive, logical, and focused on the query topic."#
    )
}

/// 补齐标题行与结论章节
pub fn normalize_outline(query: &str, outline: &str) -> String {
    let mut outline = outline.trim().to_string();

    if !outline.starts_with(TITLE_PREFIX) {
        outline = format!("# Research Paper Report on {}\n\n{}", query, outline);
    }

    if !CONCLUSION_MARKERS
        .iter()
        .any(|marker| outline.contains(marker))
    {
        outline.push_str("\n\n## 4. Conclusion");
    }

    outline
}

/// 整理用户提供的大纲：缺少 `# ` 标题行时补上报告标题，没有结论章节时按顺序追加一个
pub fn prepare_custom_outline(query: &str, outline: &str) -> String {
    let mut outline = outline.trim().to_string();

    if !outline.starts_with("# ") {
        outline = format!("# Research Paper Report on {}\n\n{}", query, outline);
    }

    let report = parse(&outline);
    if !report
        .sections
        .iter()
        .any(|section| section.role == SectionRole::Conclusion)
    {
        outline.push_str(&format!("\n\n## {}. Conclusion", report.sections.len() + 1));
    }

    outline
}

/// 根据用户查询生成报告大纲
pub async fn generate_outline(oracle: &dyn CompletionOracle, query: &str) -> Result<String> {
    info!("📝 根据查询生成大纲: '{}'", query);
    let response = oracle.complete(&outline_prompt(query)).await?;
    let outline = normalize_outline(query, &response);
    debug!("生成的大纲:\n{}", outline);
    Ok(outline)
}
