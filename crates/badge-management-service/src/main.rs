//! 徽章数据维护工具入口

use anyhow::Result;
use clap::Parser;
use tracing::info;

use badge_management::cli::{Cli, CommandRunner};
use badge_shared::{config::AppConfig, observability};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. 加载配置：config/*.toml + BADGE_ 环境变量
    let config = AppConfig::load(&cli.service_name)?;

    // 2. 初始化日志与指标
    let _guard = observability::init(&config.service_name, &config.observability)?;
    info!(
        environment = %config.environment,
        backend = ?config.store.backend,
        "Configuration loaded"
    );

    // 3. 连接存储并执行命令
    let runner = CommandRunner::from_config(&config).await?;
    let output = runner.run(&cli.command).await?;
    println!("{}", output);

    Ok(())
}
