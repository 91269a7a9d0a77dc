use std::sync::Arc;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::sync::oneshot;
use tokio::time::{self, Duration};
use tracing::warn;
use tracing_appender::rolling;
use tracing_appender::rolling::RollingFileAppender;

use crate::logging::auction_log::AuctionLog;
use crate::logging::{write_batch, LogCommand};

/// 竞价日志管理器：批量写入 auction_log.json
pub struct LogManager {
    sender: Sender<LogCommand<String>>,
}

impl LogManager {
    pub fn new(log_dir: &str, buffer_size: usize, batch_size: usize, flush_interval: u64) -> Arc<Self> {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let log_file = Arc::new(rolling::hourly(log_dir, "auction_log.json"));

        tokio::spawn(Self::background_log_writer(log_file, receiver, batch_size, flush_interval));

        Arc::new(Self { sender })
    }

    /// 发送一条原始日志
    pub async fn log(&self, message: String) {
        if let Err(e) = self.sender.send(LogCommand::Write(message)).await {
            eprintln!("Failed to send log message: {}", e);
        }
    }

    pub async fn log_auction(&self, auction_log: &AuctionLog) {
        match serde_json::to_string(auction_log) {
            Ok(line) => self.log(line).await,
            Err(e) => warn!("Failed to serialize auction log for tid {}: {}", auction_log.tid, e),
        }
    }

    async fn background_log_writer(
        log_file: Arc<RollingFileAppender>,
        mut receiver: Receiver<LogCommand<String>>,
        batch_size: usize,
        flush_interval: u64,
    ) {
        let mut buffer = Vec::new();
        let mut interval = time::interval(Duration::from_millis(flush_interval));

        loop {
            tokio::select! {
                command = receiver.recv() => match command {
                    Some(LogCommand::Write(line)) => {
                        buffer.push(line);
                        if buffer.len() >= batch_size {
                            write_batch(log_file.clone(), &mut buffer).await;
                        }
                    }
                    Some(LogCommand::Flush(done)) => {
                        write_batch(log_file.clone(), &mut buffer).await;
                        let _ = done.send(());
                    }
                    None => {
                        write_batch(log_file.clone(), &mut buffer).await;
                        break;
                    }
                },
                _ = interval.tick() => {
                    write_batch(log_file.clone(), &mut buffer).await;
                }
            }
        }
    }

    /// 停止前把缓冲区写入磁盘
    pub async fn shutdown(&self) {
        let (done, flushed) = oneshot::channel();
        if self.sender.send(LogCommand::Flush(done)).await.is_ok() {
            let _ = flushed.await;
        }
    }
}
