use anyhow::{Context, Result, anyhow};
use markdown::mdast::Node;
use markdown::{ParseOptions, to_mdast};
use std::path::PathBuf;
use tracing::info;

use crate::config::Config;

/// 保存报告并输出结构预览
pub async fn save(config: &Config, report: &str) -> Result<()> {
    let outlet = DiskOutlet::new(config.output_path.clone());
    outlet.save(report).await?;

    info!("📊 报告中共有{}个主要章节标记", count_major_sections(report));
    info!("📋 报告结构预览:");
    for heading in heading_preview(report)? {
        info!("   {}", heading);
    }
    Ok(())
}

pub trait Outlet {
    async fn save(&self, report: &str) -> Result<()>;
}

pub struct DiskOutlet {
    output_path: PathBuf,
}

impl DiskOutlet {
    pub fn new(output_path: PathBuf) -> Self {
        Self { output_path }
    }
}

impl Outlet for DiskOutlet {
    async fn save(&self, report: &str) -> Result<()> {
        info!("🖊️ 报告存储中...");

        if let Some(parent_dir) = self.output_path.parent() {
            if !parent_dir.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent_dir)
                    .await
                    .with_context(|| format!("无法创建输出目录: {}", parent_dir.display()))?;
            }
        }

        tokio::fs::write(&self.output_path, report)
            .await
            .with_context(|| format!("写入报告失败: {}", self.output_path.display()))?;

        info!("💾 报告已保存: {}", self.output_path.display());
        Ok(())
    }
}

/// `##` 出现的次数
pub fn count_major_sections(report: &str) -> usize {
    report.matches("##").count()
}

/// 报告中的标题列表，保留原有的层级标记
pub fn heading_preview(report: &str) -> Result<Vec<String>> {
    let tree = to_mdast(report, &ParseOptions::default())
        .map_err(|e| anyhow!("无法解析报告markdown: {}", e))?;

    let headings = tree
        .children()
        .map(|children| {
            children
                .iter()
                .filter_map(|node| match node {
                    Node::Heading(heading) => Some(format!(
                        "{} {}",
                        "#".repeat(heading.depth as usize),
                        node.to_string()
                    )),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(headings)
}

// Include tests
#[cfg(test)]
mod tests;
