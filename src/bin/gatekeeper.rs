//! # 内部网关
//!
//! `gatekeeper serve` 运行准入代理，`gatekeeper rules` 输出边界主机的 nginx 配置。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use dashboard_relay::{
    AppConfig,
    config::ConfigManager,
    gatekeeper::{render_nginx_rules, run_gatekeeper},
    logging,
};

#[derive(Debug, Parser)]
#[command(name = "gatekeeper", version, about = "Token gate in front of the internal metrics service")]
struct Cli {
    /// 配置文件路径，缺省时按 DASHBOARD_RELAY_CONFIG / RUST_ENV 查找
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 运行准入代理
    Serve,
    /// 打印 nginx 站点配置
    Rules,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // rules 的输出是 stdout 上的配置文件，不能混入日志
    if matches!(cli.command, Command::Serve) {
        logging::init_logging(None);
    }

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Rules => {
            print!("{}", render_nginx_rules(&config));
        }
        Command::Serve => {
            run_gatekeeper(config).await?;
        }
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> dashboard_relay::Result<Arc<AppConfig>> {
    let manager = match path {
        Some(path) => ConfigManager::from_file(path)?,
        None => ConfigManager::load()?,
    };
    Ok(manager.config())
}
