// ==========================================
// 学生批量导入系统 - 命令行入口
// ==========================================
// 子命令: preview / import / template
// ==========================================

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use student_bulk_import::api::ImportApi;
use student_bulk_import::db::{get_default_db_path, DB_PATH_ENV};
use student_bulk_import::domain::student::PartitionHint;
use student_bulk_import::domain::types::RunState;
use student_bulk_import::importer::template::write_template_file;
use student_bulk_import::importer::PrepareOptions;
use student_bulk_import::logging;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// 学生批量导入
#[derive(Parser, Debug)]
#[clap(name = "student-bulk-import", version)]
#[clap(about = "表格解析 / 表头推断 / 校验 / 账号开通 / 分批落库")]
struct Cli {
    /// 数据库文件路径
    #[clap(long, global = true, env = DB_PATH_ENV)]
    db: Option<PathBuf>,

    /// 以 JSON 格式输出日志
    #[clap(long, global = true)]
    json_log: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 解析并校验文件，输出预览（不落库）
    Preview {
        file: PathBuf,

        /// 解析全部工作表（默认只解析第一个）
        #[clap(long)]
        all_sheets: bool,
    },

    /// 执行导入
    Import {
        file: PathBuf,

        /// 院系
        #[clap(long)]
        department: Option<String>,

        /// 年级
        #[clap(long)]
        year: Option<String>,

        /// 班级
        #[clap(long)]
        section: Option<String>,

        /// 按记录自身的分区值导入（命令行分区仅用于补齐缺失维度）
        #[clap(long)]
        per_record: bool,

        /// 解析全部工作表
        #[clap(long)]
        all_sheets: bool,
    },

    /// 输出示例模板 CSV
    Template { out: PathBuf },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.json_log {
        logging::init_json();
    } else {
        logging::init();
    }

    let db_path = cli
        .db
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(get_default_db_path);

    match cli.command {
        Command::Template { out } => {
            write_template_file(&out)
                .with_context(|| format!("写入模板失败: {}", out.display()))?;
            info!(path = %out.display(), "模板已生成");
        }

        Command::Preview { file, all_sheets } => {
            info!(db = %db_path, "使用数据库");
            let api = ImportApi::open(&db_path).await?;
            let options = PrepareOptions {
                all_sheets,
                ..Default::default()
            };
            let preview = api.preview(&file, &options)?;
            println!("{}", serde_json::to_string_pretty(&preview)?);
        }

        Command::Import {
            file,
            department,
            year,
            section,
            per_record,
            all_sheets,
        } => {
            info!(db = %db_path, "使用数据库");
            let api = ImportApi::open(&db_path).await?;
            let options = PrepareOptions {
                all_sheets,
                ..Default::default()
            };

            let prepared = api.prepare(&file, &options)?;
            if prepared.eligible_count() == 0 {
                bail!("没有可导入的记录（有效 0 条，问题 {} 条）", prepared.invalid_count());
            }

            // 未指定的维度使用探测到的默认值
            let suggested = prepared.partitions.suggest_default();
            let selection = PartitionHint {
                department: department.or(suggested.department),
                year: year.or(suggested.year),
                section: section.or(suggested.section),
            };
            let strategy = api.build_strategy(&selection, per_record)?;

            let cancel = CancellationToken::new();
            let ctrl_c_token = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("收到中断信号，当前记录处理完成后停止");
                    ctrl_c_token.cancel();
                }
            });

            let source_file = file.file_name().map(|n| n.to_string_lossy().to_string());
            let response = api
                .run_import(&prepared, strategy, source_file.as_deref(), cancel)
                .await?;
            println!("{}", serde_json::to_string_pretty(&response)?);

            if response.report.run.state == RunState::Aborted {
                std::process::exit(2);
            }
        }
    }

    Ok(())
}
