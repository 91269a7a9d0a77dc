// src/logging/runtime_logger.rs

use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::sync::oneshot;
use tokio::time::{self, Duration};
use tracing_appender::rolling;
use tracing_appender::rolling::RollingFileAppender;

use crate::logging::{local_timestamp, write_batch, LogCommand};

const LEVELS: [&str; 5] = ["TRACE", "DEBUG", "INFO", "WARN", "ERROR"];
const RETENTION_HOURS: u64 = 72;

/// 单条日志消息
pub struct LogEntry {
    pub level: String,
    pub content: String,
}

/// 运行日志管理器（RuntimeLogger）
/// 将服务生命周期日志按级别分流到不同的滚动文件中（runtime_info.json 等）。
pub struct RuntimeLogger {
    sender: Sender<LogCommand<LogEntry>>,
}

impl RuntimeLogger {
    /// 创建一个新的 RuntimeLogger
    ///
    /// - `log_dir`: 日志文件存放目录
    /// - `file_prefix`: 文件前缀，例如 "runtime"
    /// - `buffer_size`: mpsc 通道缓冲区大小
    /// - `batch_size`: 每个日志级别批量写入的日志条数
    /// - `flush_interval`: 定时刷新日志的时间间隔（毫秒）
    pub fn new(
        log_dir: &str,
        file_prefix: &str,
        buffer_size: usize,
        batch_size: usize,
        flush_interval: u64,
    ) -> Arc<Self> {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let log_files: HashMap<String, Arc<RollingFileAppender>> = LEVELS
            .iter()
            .map(|level| {
                let file_name = format!("{}_{}.json", file_prefix, level.to_lowercase());
                (level.to_string(), Arc::new(rolling::hourly(log_dir, file_name)))
            })
            .collect();

        tokio::spawn(Self::background_log_writer(log_files, receiver, batch_size, flush_interval));

        // 每小时清理一次过期日志
        let log_dir = log_dir.to_string();
        tokio::spawn(async move {
            let mut interval = time::interval(Duration::from_secs(3600));
            loop {
                interval.tick().await;
                cleanup_old_logs(&log_dir, RETENTION_HOURS).await;
            }
        });

        Arc::new(Self { sender })
    }

    /// 记录运行日志
    pub async fn log(&self, level: &str, message: &str) {
        let content = json!({
            "timestamp": local_timestamp(),
            "level": level,
            "message": message
        })
        .to_string();

        let entry = LogEntry {
            level: level.to_uppercase(),
            content,
        };
        if let Err(e) = self.sender.send(LogCommand::Write(entry)).await {
            eprintln!("Failed to send runtime log message: {}", e);
        }
    }

    async fn background_log_writer(
        log_files: HashMap<String, Arc<RollingFileAppender>>,
        mut receiver: Receiver<LogCommand<LogEntry>>,
        batch_size: usize,
        flush_interval: u64,
    ) {
        let mut buffers: HashMap<String, Vec<String>> = HashMap::new();
        let mut interval = time::interval(Duration::from_millis(flush_interval));
        loop {
            tokio::select! {
                command = receiver.recv() => match command {
                    Some(LogCommand::Write(entry)) => {
                        // 未知级别归入 INFO
                        let level = if log_files.contains_key(&entry.level) { entry.level } else { "INFO".to_string() };
                        let buffer = buffers.entry(level.clone()).or_default();
                        buffer.push(entry.content);
                        if buffer.len() >= batch_size {
                            if let Some(appender) = log_files.get(&level) {
                                write_batch(appender.clone(), buffer).await;
                            }
                        }
                    }
                    Some(LogCommand::Flush(done)) => {
                        Self::flush_all(&log_files, &mut buffers).await;
                        let _ = done.send(());
                    }
                    None => {
                        Self::flush_all(&log_files, &mut buffers).await;
                        break;
                    }
                },
                _ = interval.tick() => {
                    Self::flush_all(&log_files, &mut buffers).await;
                }
            }
        }
    }

    async fn flush_all(
        log_files: &HashMap<String, Arc<RollingFileAppender>>,
        buffers: &mut HashMap<String, Vec<String>>,
    ) {
        for (level, buffer) in buffers.iter_mut() {
            if let Some(appender) = log_files.get(level) {
                write_batch(appender.clone(), buffer).await;
            }
        }
    }

    /// 把所有已排队的日志写入磁盘
    pub async fn shutdown(&self) {
        let (done, flushed) = oneshot::channel();
        if self.sender.send(LogCommand::Flush(done)).await.is_ok() {
            let _ = flushed.await;
        }
    }
}

async fn cleanup_old_logs(log_dir: &str, retention_hours: u64) {
    let retention = Duration::from_secs(retention_hours * 3600);
    let now = SystemTime::now();
    let mut dir = match tokio::fs::read_dir(log_dir).await {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("Failed to read log directory {}: {}", log_dir, e);
            return;
        }
    };
    while let Ok(Some(entry)) = dir.next_entry().await {
        let path = entry.path();
        let expired = match entry.metadata().await.and_then(|m| m.modified()) {
            Ok(modified) => now.duration_since(modified).unwrap_or_default() > retention,
            Err(_) => false,
        };
        if expired {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                eprintln!("Failed to delete old log file {:?}: {}", path, e);
            }
        }
    }
}
