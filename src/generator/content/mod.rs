use anyhow::Result;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::llm::oracle::{CompletionOracle, RetrievalOracle};
use crate::types::content::ContentMap;
use crate::types::query::{Classification, QueryMap, QueryRecord};
use crate::utils::threads::do_parallel_with_limit;

pub const DEFAULT_MIN_CONTENT_CHARS: usize = 50;

fn expanded_llm_prompt(query: &str) -> String {
    format!(
        r#"Based on the query: "{query}"

Provide a comprehensive response that would be suitable for a subsection of a research paper.
The response should be well-structured, informative, and around 300-500 words.
Include relevant facts, concepts, and examples where appropriate.
Ensure the content is cohesive and flows well as part of a larger document."#
    )
}

fn index_query(query: &str) -> String {
    format!(
        "Query: {query}\n\nPlease provide a comprehensive response suitable for a research paper subsection.\nInclude specific details, facts, and references where possible."
    )
}

fn fallback_prompt(record: &QueryRecord) -> String {
    format!(
        "Provide informative content about {} for a research paper on {}",
        record.subsection_key, record.section_key
    )
}

fn error_content(error: &anyhow::Error) -> String {
    format!(
        "Content could not be generated for this subsection due to an error: {}",
        error
    )
}

/// 按查询分类调用对应的服务生成各子章节正文
pub struct ContentGenerator<'a> {
    completion: &'a dyn CompletionOracle,
    retrieval: &'a dyn RetrievalOracle,
    max_parallels: usize,
    min_content_chars: usize,
}

impl<'a> ContentGenerator<'a> {
    pub fn new(
        completion: &'a dyn CompletionOracle,
        retrieval: &'a dyn RetrievalOracle,
        max_parallels: usize,
    ) -> Self {
        Self {
            completion,
            retrieval,
            max_parallels,
            min_content_chars: DEFAULT_MIN_CONTENT_CHARS,
        }
    }

    pub fn with_min_content_chars(mut self, min_content_chars: usize) -> Self {
        self.min_content_chars = min_content_chars;
        self
    }

    /// 为每条查询记录生成内容；单条记录的失败只影响该记录
    pub async fn generate(&self, queries: &QueryMap) -> ContentMap {
        info!("✍️ 开始生成{}个子章节的内容...", queries.len());

        let content_map = Arc::new(Mutex::new(ContentMap::new()));

        let generation_futures: Vec<_> = queries
            .records()
            .iter()
            .map(|record| {
                let content_map = content_map.clone();
                Box::pin(async move {
                    let content = match self.generate_record(record).await {
                        Ok(content) => content,
                        Err(e) => {
                            warn!(
                                "❌ 子章节内容生成失败 {} / {}: {}",
                                record.section_key, record.subsection_key, e
                            );
                            error_content(&e)
                        }
                    };

                    debug!(
                        "   {} / {} 生成{}个字符",
                        record.section_key,
                        record.subsection_key,
                        content.len()
                    );

                    content_map.lock().await.insert(
                        record.section_key.as_str(),
                        record.subsection_key.as_str(),
                        content,
                    );
                })
            })
            .collect();

        do_parallel_with_limit(generation_futures, self.max_parallels).await;

        let content_map = content_map.lock().await.clone();
        info!("✓ 内容生成完成，共{}条", content_map.len());
        content_map
    }

    async fn generate_record(&self, record: &QueryRecord) -> Result<String> {
        let answer = match record.classification {
            Classification::Llm => {
                self.completion
                    .complete(&expanded_llm_prompt(&record.query_text))
                    .await?
            }
            Classification::Index => self.retrieval.query(&index_query(&record.query_text)).await?,
        };

        if answer.trim().chars().count() < self.min_content_chars {
            warn!(
                "⚠️ {} / {} 的回答过短，使用大模型补充内容",
                record.section_key, record.subsection_key
            );
            // 补充内容不再做质量检查
            return self.completion.complete(&fallback_prompt(record)).await;
        }

        Ok(answer)
    }
}
