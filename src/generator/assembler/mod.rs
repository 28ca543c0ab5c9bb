use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::llm::oracle::CompletionOracle;
use crate::types::content::ContentMap;
use crate::types::outline::{Report, Section, SectionRole};
use crate::types::query::GENERAL_SUBSECTION_KEY;

const INTRO_SNIPPETS_PER_SECTION: usize = 2;
const CONCLUSION_SNIPPETS_PER_SECTION: usize = 1;
const MAX_SNIPPETS: usize = 5;
const OVERVIEW_SAMPLES: usize = 3;
const OVERVIEW_SAMPLE_CHARS: usize = 200;

/// 章节在内容映射中的子章节键，按大纲顺序排列
fn leaf_keys(section: &Section) -> Vec<String> {
    if section.has_subsections() {
        section.subsections.iter().map(|s| s.key()).collect()
    } else {
        vec![GENERAL_SUBSECTION_KEY.to_string()]
    }
}

/// 从给定章节中按大纲顺序抽取内容片段
fn collect_snippets<'c, 's>(
    contents: &'c ContentMap,
    sections: impl Iterator<Item = &'s Section>,
    per_section: usize,
) -> Vec<&'c str> {
    sections
        .flat_map(|section| {
            let section_key = section.key();
            leaf_keys(section)
                .into_iter()
                .filter_map(|leaf| contents.get(&section_key, &leaf))
                .take(per_section)
                .collect::<Vec<_>>()
        })
        .take(MAX_SNIPPETS)
        .collect()
}

fn topic_list<'r>(contents: &ContentMap, sections: impl Iterator<Item = &'r Section>) -> String {
    sections
        .filter(|section| contents.contains_section(&section.key()))
        .map(|section| section.title.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn introduction_prompt(title: &str, topics: &str, context: &str) -> String {
    format!(
        r#"Write a thorough introduction for a research paper titled "{title}".

The paper covers the following topics:
{topics}

Based on these topics and the following content samples:
{context}

Write an engaging introduction that:
1. Introduces the topic and its importance
2. Outlines the scope of the paper
3. Provides context for the reader
4. Sets up the structure of the following sections

Keep the introduction comprehensive yet concise."#
    )
}

fn conclusion_prompt(title: &str, topics: &str, context: &str) -> String {
    format!(
        r#"Write a thorough conclusion for a research paper titled "{title}".

The paper covered the following topics:
{topics}

Based on these topics and the following content samples:
{context}

Write a comprehensive conclusion that:
1. Summarizes the key findings and insights
2. Discusses the implications of the research
3. Suggests potential areas for future research
4. Ends with a meaningful closing statement

The conclusion should be thorough and thoughtful."#
    )
}

fn overview_prompt(section_title: &str, subsection_titles: &str, samples: &str) -> String {
    format!(
        r#"Write a brief overview paragraph for the section "{section_title}" of a research paper.

The section contains the following subsections:
{subsection_titles}

Based on these subsection samples:
{samples}

Write a concise paragraph that introduces this section and ties together the subsections that follow.
The paragraph should be no more than 3-5 sentences."#
    )
}

fn subsection_placeholder_prompt(report_title: &str, section_title: &str, subsection_title: &str) -> String {
    format!(
        r#"Generate content for the subsection "{subsection_title}" under the section "{section_title}" for a research paper titled "{report_title}".

The content should be informative, well-structured, and around 200-300 words. Focus on providing accurate and useful information related to the subsection topic."#
    )
}

fn section_placeholder_prompt(report_title: &str, section_title: &str) -> String {
    format!(
        r#"Generate content for the section "{section_title}" for a research paper titled "{report_title}".

The content should be informative, well-structured, and around 300-400 words. Provide a comprehensive overview of the topic covered by this section."#
    )
}

/// 把生成的内容按大纲组装成完整报告，并重新生成引言、结论与章节概述
pub struct ReportAssembler<'a> {
    oracle: &'a dyn CompletionOracle,
}

impl<'a> ReportAssembler<'a> {
    pub fn new(oracle: &'a dyn CompletionOracle) -> Self {
        Self { oracle }
    }

    pub async fn assemble(&self, contents: &ContentMap, title: &str, report: &Report) -> Result<String> {
        info!("📑 组装报告: {} ({}个章节)", title, report.sections.len());

        let mut output = format!("# {}\n\n", title);

        for section in &report.sections {
            let section_key = section.key();
            debug!("   处理章节: {}", section_key);

            let body = match section.role {
                SectionRole::Introduction => self.introduction(title, contents, report).await?,
                SectionRole::Conclusion => self.conclusion(title, contents, report).await?,
                SectionRole::Body => {
                    if contents.contains_section(&section_key) {
                        self.body_section(title, contents, section).await?
                    } else {
                        warn!("⚠️ 章节 {} 没有内容，生成占位内容", section_key);
                        self.complete(&section_placeholder_prompt(title, &section.title))
                            .await?
                    }
                }
            };

            output.push_str(&format!("## {}\n\n{}\n\n", section_key, body));
        }

        info!("✓ 报告组装完成，共{}个字符", output.len());
        Ok(output)
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        self.oracle.complete(prompt).await
    }

    async fn introduction(&self, title: &str, contents: &ContentMap, report: &Report) -> Result<String> {
        let excluded = [SectionRole::Introduction];
        let snippets = collect_snippets(
            contents,
            report.sections_excluding(&excluded),
            INTRO_SNIPPETS_PER_SECTION,
        );
        let topics = topic_list(contents, report.sections_excluding(&excluded));

        self.complete(&introduction_prompt(title, &topics, &snippets.join("\n")))
            .await
            .context("生成引言失败")
    }

    async fn conclusion(&self, title: &str, contents: &ContentMap, report: &Report) -> Result<String> {
        let excluded = [SectionRole::Introduction, SectionRole::Conclusion];
        let snippets = collect_snippets(
            contents,
            report.sections_excluding(&excluded),
            CONCLUSION_SNIPPETS_PER_SECTION,
        );
        let topics = topic_list(contents, report.sections_excluding(&excluded));

        self.complete(&conclusion_prompt(title, &topics, &snippets.join("\n")))
            .await
            .context("生成结论失败")
    }

    /// 正文章节：概述段落 + 各子章节；没有子章节时直接输出General内容
    async fn body_section(&self, title: &str, contents: &ContentMap, section: &Section) -> Result<String> {
        let section_key = section.key();

        if !section.has_subsections() {
            return match contents.get(&section_key, GENERAL_SUBSECTION_KEY) {
                Some(content) => Ok(content.to_string()),
                None => self.complete(&section_placeholder_prompt(title, &section.title)).await,
            };
        }

        let mut parts = vec![self.overview(contents, section).await?];

        for subsection in &section.subsections {
            let subsection_key = subsection.key();
            let content = match contents.get(&section_key, &subsection_key) {
                Some(content) => content.to_string(),
                None => {
                    warn!("⚠️ 子章节 {} 没有内容，生成占位内容", subsection_key);
                    self.complete(&subsection_placeholder_prompt(
                        title,
                        &section.title,
                        &subsection.title,
                    ))
                    .await?
                }
            };
            parts.push(format!("### {}\n\n{}", subsection_key, content));
        }

        Ok(parts.join("\n\n"))
    }

    async fn overview(&self, contents: &ContentMap, section: &Section) -> Result<String> {
        let section_key = section.key();
        let present: Vec<_> = section
            .subsections
            .iter()
            .filter_map(|sub| contents.get(&section_key, &sub.key()).map(|c| (sub, c)))
            .collect();

        let subsection_titles = present
            .iter()
            .map(|(sub, _)| sub.title.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let samples = present
            .iter()
            .take(OVERVIEW_SAMPLES)
            .map(|(sub, content)| {
                let sample: String = content.chars().take(OVERVIEW_SAMPLE_CHARS).collect();
                format!("{}: {}...", sub.key(), sample)
            })
            .collect::<Vec<_>>()
            .join("\n");

        self.complete(&overview_prompt(&section.title, &subsection_titles, &samples))
            .await
            .with_context(|| format!("生成章节概述失败: {}", section_key))
    }
}
