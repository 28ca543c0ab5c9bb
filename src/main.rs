use crate::generator::pipeline::launch;
use anyhow::{Result, bail};
use clap::Parser;
use std::io::Write;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod config;
mod generator;
mod llm;
mod types;
mod utils;

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "research_report=debug"
    } else {
        "research_report=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// 交互式读取研究主题
fn prompt_for_query() -> Result<String> {
    print!("Enter your research topic query (e.g., 'quantum computing applications in cybersecurity'): ");
    std::io::stdout().flush()?;

    let mut query = String::new();
    std::io::stdin().read_line(&mut query)?;
    Ok(query.trim().to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();
    // 先初始化日志，配置加载过程中的警告才能输出
    init_tracing(args.verbose);
    let config = args.into_config()?;

    let query = match &args.query {
        Some(query) => query.trim().to_string(),
        None => prompt_for_query()?,
    };
    if query.is_empty() {
        bail!("研究主题不能为空");
    }

    let request = args.research_request(query)?;
    info!("📚 研究主题: {}", request.query);
    info!("🤖 使用模型: {}", config.llm.model);

    match launch(&config, &request).await {
        Ok(_) => {
            info!("🎉 报告生成成功: {}", config.output_path.display());
            Ok(())
        }
        Err(e) => {
            error!("❌ 报告生成失败: {:#}", e);
            Err(e)
        }
    }
}
