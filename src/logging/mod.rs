pub mod auction_log;
pub mod logger;
pub mod runtime_logger;

use chrono::{FixedOffset, Utc};
use std::io::Write;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::fmt::MakeWriter;

/// 后台写日志任务接收的指令
pub(crate) enum LogCommand<T> {
    Write(T),
    /// 写完缓冲区后应答
    Flush(oneshot::Sender<()>),
}

/// 东八区 RFC 3339 时间戳
pub(crate) fn local_timestamp() -> String {
    match FixedOffset::east_opt(8 * 3600) {
        Some(tz) => Utc::now().with_timezone(&tz).to_rfc3339(),
        None => Utc::now().to_rfc3339(),
    }
}

/// 在阻塞线程池中把一批日志写入滚动文件
pub(crate) async fn write_batch(file: Arc<RollingFileAppender>, buffer: &mut Vec<String>) {
    if buffer.is_empty() {
        return;
    }
    let content = buffer.join("\n") + "\n";
    buffer.clear();

    let written = task::spawn_blocking(move || {
        let mut writer = file.make_writer();
        writer.write_all(content.as_bytes())
    })
    .await;

    match written {
        Ok(Ok(())) => {}
        Ok(Err(e)) => eprintln!("Failed to write logs to file: {}", e),
        Err(e) => eprintln!("Log writer task failed: {}", e),
    }
}
