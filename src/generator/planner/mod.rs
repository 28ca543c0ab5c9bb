use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::llm::oracle::CompletionOracle;
use crate::types::outline::Report;
use crate::types::query::{
    Classification, GENERAL_SUBSECTION_KEY, GENERAL_SUBSECTION_TITLE, QueryMap, QueryRecord,
};
use crate::utils::threads::do_parallel_with_limit;

/// 大纲中的一个叶子节点
#[derive(Debug, Clone)]
struct Leaf {
    section_key: String,
    subsection_key: String,
    /// 写入查询prompt中的子章节描述
    label: String,
}

fn collect_leaves(report: &Report) -> Vec<Leaf> {
    let mut leaves = Vec::new();

    for section in &report.sections {
        let section_key = section.key();
        if section.has_subsections() {
            for subsection in &section.subsections {
                let subsection_key = subsection.key();
                leaves.push(Leaf {
                    section_key: section_key.clone(),
                    label: subsection_key.clone(),
                    subsection_key,
                });
            }
        } else {
            leaves.push(Leaf {
                section_key: section_key.clone(),
                subsection_key: GENERAL_SUBSECTION_KEY.to_string(),
                label: GENERAL_SUBSECTION_TITLE.to_string(),
            });
        }
    }

    leaves
}

fn query_prompt(title: &str, section_key: &str, label: &str) -> String {
    format!(
        "Generate a research query for a report on {title}. \
The query should be for the subsection '{label}' under the main section '{section_key}'. \
The query should guide the research to gather relevant information for this part of the report. \
The query should be clear, short and concise. "
    )
}

fn classification_prompt(query: &str) -> String {
    format!(
        r#"Classify the following query as either "LLM" if it can be answered directly by a large language model with general knowledge, or "INDEX" if it likely requires querying an external index or database for specific or up-to-date information.

Query: "{query}"

Consider the following:
1. If the query asks for general knowledge, concepts, or explanations, classify as "LLM".
2. If the query asks for specific facts, recent events, or detailed information that might not be in the LLM's training data, classify as "INDEX".
3. If unsure, err on the side of "INDEX".

Classification:"#
    )
}

/// 为大纲的每个叶子节点生成研究查询并判定信息来源
pub struct QueryPlanner<'a> {
    oracle: &'a dyn CompletionOracle,
    max_parallels: usize,
}

impl<'a> QueryPlanner<'a> {
    pub fn new(oracle: &'a dyn CompletionOracle, max_parallels: usize) -> Self {
        Self {
            oracle,
            max_parallels,
        }
    }

    /// 生成查询映射，记录顺序与大纲顺序一致；任何一次调用失败都会使整个规划失败
    pub async fn plan(&self, report: &Report) -> Result<QueryMap> {
        let leaves = collect_leaves(report);
        info!(
            "🧭 为{}个章节规划{}条研究查询...",
            report.sections.len(),
            leaves.len()
        );

        let title = report.title.as_str();
        let plan_futures: Vec<_> = leaves
            .into_iter()
            .map(|leaf| Box::pin(self.plan_leaf(title, leaf)))
            .collect();

        let results = do_parallel_with_limit(plan_futures, self.max_parallels).await;
        let records = results.into_iter().collect::<Result<Vec<_>>>()?;

        info!("✓ 查询规划完成，共{}条", records.len());
        Ok(QueryMap::new(records))
    }

    async fn plan_leaf(&self, title: &str, leaf: Leaf) -> Result<QueryRecord> {
        let query_text = self
            .oracle
            .complete(&query_prompt(title, &leaf.section_key, &leaf.label))
            .await
            .with_context(|| format!("生成查询失败: {} / {}", leaf.section_key, leaf.label))?
            .trim()
            .to_string();

        let verdict = self
            .oracle
            .complete(&classification_prompt(&query_text))
            .await
            .with_context(|| format!("查询分类失败: {}", query_text))?;
        let classification = Classification::from_verdict(&verdict);

        debug!(
            "   [{}] {} / {} -> {}",
            classification, leaf.section_key, leaf.subsection_key, query_text
        );

        Ok(QueryRecord {
            section_key: leaf.section_key,
            subsection_key: leaf.subsection_key,
            query_text,
            classification,
        })
    }
}

// Include tests
#[cfg(test)]
mod tests;
