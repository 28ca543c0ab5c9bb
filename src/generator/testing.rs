//! 测试用的脚本化补全/检索服务

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

use crate::llm::oracle::{CompletionOracle, RetrievalOracle};

enum Reply {
    Text(String),
    Fail(String),
}

/// 按prompt中包含的片段返回预设回复，第一条匹配的规则生效
pub struct ScriptedOracle {
    rules: Vec<(String, Reply)>,
    default_reply: String,
    calls: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    pub fn new(default_reply: &str) -> Self {
        Self {
            rules: Vec::new(),
            default_reply: default_reply.to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn reply_when(mut self, needle: &str, reply: &str) -> Self {
        self.rules
            .push((needle.to_string(), Reply::Text(reply.to_string())));
        self
    }

    pub fn fail_when(mut self, needle: &str, message: &str) -> Self {
        self.rules
            .push((needle.to_string(), Reply::Fail(message.to_string())));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_containing(&self, needle: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|prompt| prompt.contains(needle))
            .count()
    }

    fn respond(&self, prompt: &str) -> Result<String> {
        self.calls.lock().unwrap().push(prompt.to_string());
        for (needle, reply) in &self.rules {
            if prompt.contains(needle.as_str()) {
                return match reply {
                    Reply::Text(text) => Ok(text.clone()),
                    Reply::Fail(message) => Err(anyhow!(message.clone())),
                };
            }
        }
        Ok(self.default_reply.clone())
    }
}

#[async_trait]
impl CompletionOracle for ScriptedOracle {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.respond(prompt)
    }
}

#[async_trait]
impl RetrievalOracle for ScriptedOracle {
    async fn query(&self, text: &str) -> Result<String> {
        self.respond(text)
    }
}

/// 按prompt中的标记延迟作答，用于制造乱序完成；回复为该标记的 [`long_text`]
pub struct StaggeredOracle {
    delays: Vec<(String, Duration)>,
    finished: Mutex<Vec<String>>,
}

impl StaggeredOracle {
    pub fn new(delays: &[(&str, u64)]) -> Self {
        Self {
            delays: delays
                .iter()
                .map(|(marker, millis)| (marker.to_string(), Duration::from_millis(*millis)))
                .collect(),
            finished: Mutex::new(Vec::new()),
        }
    }

    /// 按完成先后排列的标记
    pub fn finished(&self) -> Vec<String> {
        self.finished.lock().unwrap().clone()
    }

    async fn respond(&self, prompt: &str) -> Result<String> {
        let Some((marker, delay)) = self
            .delays
            .iter()
            .find(|(marker, _)| prompt.contains(marker.as_str()))
        else {
            return Err(anyhow!("no delay scripted for prompt: {}", prompt));
        };

        tokio::time::sleep(*delay).await;
        self.finished.lock().unwrap().push(marker.clone());
        Ok(long_text(marker))
    }
}

#[async_trait]
impl CompletionOracle for StaggeredOracle {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.respond(prompt).await
    }
}

#[async_trait]
impl RetrievalOracle for StaggeredOracle {
    async fn query(&self, text: &str) -> Result<String> {
        self.respond(text).await
    }
}

/// 一段足够长、能通过质量检查的正文
pub fn long_text(topic: &str) -> String {
    format!(
        "{} is discussed here in enough depth to pass the quality gate of the content generator.",
        topic
    )
}

pub const SAMPLE_OUTLINE: &str = "# Research Paper Report on X\n\n## 1. Introduction\n\n## 2. Background\n2.1. History\n\n## 3. Latest Papers:\n3.1. Recent Work\n\n## 4. Conclusion";
