use regex::Regex;
use std::sync::LazyLock;

use crate::types::outline::{Report, Section, Subsection};

static SECTION_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+\.)\s*(.*)$").expect("valid section regex"));
static SUBSECTION_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\d+(\.|\s)").expect("valid subsection regex"));
static SUBSECTION_PARTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+\.\d+)\.?\s*(.*)$").expect("valid subsection regex"));

const SECTION_PREFIX: &str = "## ";
const TITLE_PREFIX: &str = "# ";

fn strip_heading_marks(line: &str) -> &str {
    line.trim_matches(|c: char| c == '#' || c == ' ').trim()
}

/// 大纲第一行去掉 `#` 与空白后即为报告标题
pub fn extract_title(outline: &str) -> String {
    let first_line = outline.trim().lines().next().unwrap_or_default();
    strip_heading_marks(first_line).to_string()
}

/// 将markdown大纲解析为章节树
///
/// - `## <num>. <title>` 开启新章节，未编号时按顺序补编号
/// - `<num>.<num>. <title>` 或 `<num>.<num> <title>` 追加到当前章节
/// - 其他行忽略；出现在任何章节之前的子章节行被丢弃
/// - 编号的连续性不做校验
pub fn parse(outline: &str) -> Report {
    let title = extract_title(outline);
    let mut sections: Vec<Section> = Vec::new();

    for raw_line in outline.trim().lines().skip(1) {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        if line.starts_with(SECTION_PREFIX) {
            let section_text = strip_heading_marks(line);
            let section = match SECTION_NUMBER.captures(section_text) {
                Some(caps) => Section::new(&caps[1], caps[2].trim()),
                None => Section::new(format!("{}.", sections.len() + 1), section_text),
            };
            sections.push(section);
        } else if SUBSECTION_LINE.is_match(line) {
            let Some(current) = sections.last_mut() else {
                continue;
            };
            if let Some(caps) = SUBSECTION_PARTS.captures(line) {
                current.subsections.push(Subsection {
                    number: format!("{}.", &caps[1]),
                    title: caps[2].trim().to_string(),
                });
            }
        }
    }

    Report { title, sections }
}

/// 按 `## ` 标题行把大纲切分为块，第一块包含标题及首个章节之前的内容
pub fn split_blocks(outline: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in outline.trim().lines() {
        if line.starts_with(SECTION_PREFIX) {
            if !current.is_empty() {
                blocks.push(current.join("\n"));
            }
            current = vec![line];
        } else {
            current.push(line);
        }
    }

    if !current.is_empty() {
        blocks.push(current.join("\n"));
    }

    blocks
}

/// 块的标题行（去掉 `#` 标记），用于生成失败时的占位内容
pub fn block_heading(block: &str) -> String {
    strip_heading_marks(block.trim().lines().next().unwrap_or_default()).to_string()
}

/// 截取从首个 `## ` 标题开始的内容，去掉重复的报告标题
///
/// 没有 `## ` 标题时跳过开头的 `# ` 标题行与空行，只剩标题时返回空串
pub fn extract_section_content(report: &str) -> String {
    let lines: Vec<&str> = report.trim().lines().collect();
    let start = lines
        .iter()
        .position(|line| line.starts_with(SECTION_PREFIX))
        .or_else(|| {
            lines
                .iter()
                .position(|line| !line.trim().is_empty() && !line.starts_with(TITLE_PREFIX))
        })
        .unwrap_or(lines.len());
    lines[start..].join("\n")
}
