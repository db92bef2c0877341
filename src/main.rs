// ==========================================
// 集装箱堆场计划系统 - 命令行入口
// ==========================================
// 用法:
//   yard-planner <schedule-file> <stock-file> [YYYY-MM-DD]
//
// 导入两份文件，标准输出打印 JSON（报表 + 堆场概况），日志写 stderr
// ==========================================

use anyhow::{bail, Context};
use chrono::{Local, NaiveDate};
use serde_json::json;
use yard_planner::config::get_default_db_path;
use yard_planner::{logging, YardApi, APP_NAME, VERSION};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let mut args = std::env::args().skip(1);
    let (Some(schedule_path), Some(stock_path)) = (args.next(), args.next()) else {
        bail!("用法: yard-planner <schedule-file> <stock-file> [YYYY-MM-DD]");
    };
    let date = args
        .next()
        .map(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d"))
        .transpose()
        .context("日期格式错误，应为 YYYY-MM-DD")?;

    tracing::info!("{} v{}", APP_NAME, VERSION);

    let db_path = get_default_db_path();
    tracing::info!(db_path = %db_path, "使用数据库");

    let api = YardApi::new(&db_path).context("初始化失败")?;
    let (schedule_batch, stock) = api
        .load_feeds(&schedule_path, &stock_path)
        .await
        .context("导入失败")?;

    let now = Local::now().naive_local();
    let output = json!({
        "schedule_batch": schedule_batch,
        "stock": stock,
        "scheduled_dates": api.scheduled_dates()?,
        "report": api.report(date, now)?,
        "yard": api.yard_summary()?,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
