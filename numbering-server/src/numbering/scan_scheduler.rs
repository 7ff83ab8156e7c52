//! 重号定时扫描
//!
//! 按固定间隔运行只读扫描并记录结果，从不修改数据。修复由运维通过
//! `numbering repair` 或 `/api/numbering/repair` 显式触发。

use super::scanner::DuplicateScanner;
use futures::TryStreamExt;
use shared::models::ScopeFilter;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub struct ScanScheduler {
    scanner: DuplicateScanner,
    interval: Duration,
    shutdown: CancellationToken,
}

impl ScanScheduler {
    pub fn new(scanner: DuplicateScanner, interval: Duration, shutdown: CancellationToken) -> Self {
        Self {
            scanner,
            interval,
            shutdown,
        }
    }

    /// 主循环：立即扫描一次，之后按间隔触发，直到收到 shutdown
    pub async fn run(self) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "Duplicate scan scheduler started"
        );

        loop {
            self.scan_once().await;

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = self.shutdown.cancelled() => break,
            }
        }

        tracing::info!("Duplicate scan scheduler stopped");
    }

    async fn scan_once(&self) {
        let mut stream = self.scanner.scan(ScopeFilter::default());
        let (mut groups, mut documents) = (0usize, 0usize);
        loop {
            match stream.try_next().await {
                Ok(Some(group)) => {
                    groups += 1;
                    documents += group.members.len();
                    tracing::debug!(
                        scope_key = %group.scope_key,
                        document_number = %group.document_number,
                        members = group.members.len(),
                        "Duplicate group found"
                    );
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(error = %e, "Duplicate scan failed");
                    return;
                }
            }
        }

        if groups == 0 {
            tracing::debug!("Duplicate scan: no duplicate document numbers");
        } else {
            tracing::warn!(
                groups,
                documents,
                "Duplicate scan: duplicate document numbers present, run a repair"
            );
        }
    }
}
