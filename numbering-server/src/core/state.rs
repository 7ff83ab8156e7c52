use std::sync::Arc;

use sqlx::SqlitePool;

use crate::core::Config;
use crate::core::tasks::BackgroundTasks;
use crate::db::{DbService, SqliteNumberingStore};
use crate::numbering::scan_scheduler::ScanScheduler;
use crate::numbering::{Allocator, DuplicateScanner, NumberingStore, Reconciler, RepairRun};
use crate::utils::AppError;

/// 服务器状态 - 持有所有服务的共享引用
///
/// 使用 Arc 实现浅拷贝，所有权成本极低。
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Arc<Config> | 配置项 (不可变) |
/// | pool | SqlitePool | 数据库连接池 |
/// | store | Arc<dyn NumberingStore> | 编号存储 |
/// | allocator | Allocator | 编号分配 |
/// | scanner | DuplicateScanner | 重号扫描 |
/// | repair | RepairRun | 重号修复 |
#[derive(Clone)]
pub struct ServerState {
    pub config: Arc<Config>,
    pub pool: SqlitePool,
    pub store: Arc<dyn NumberingStore>,
    pub allocator: Allocator,
    pub scanner: DuplicateScanner,
    pub repair: RepairRun,
}

impl ServerState {
    /// 打开数据库并组装所有服务
    pub async fn initialize(config: &Config) -> Result<Self, AppError> {
        if let Some(parent) = std::path::Path::new(&config.database_path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::internal(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }
        let db = DbService::new(&config.database_path).await?;
        Self::with_pool(config.clone(), db.pool)
    }

    /// 基于已打开的连接池组装服务（测试与 CLI 共用）
    pub fn with_pool(config: Config, pool: SqlitePool) -> Result<Self, AppError> {
        let format = config.number_format()?;
        let store: Arc<dyn NumberingStore> = Arc::new(SqliteNumberingStore::new(pool.clone()));
        let allocator = Allocator::new(Arc::clone(&store), format, config.allocator_config());
        let scanner = DuplicateScanner::new(Arc::clone(&store), config.scan_page_size);
        let reconciler = Reconciler::new(Arc::clone(&store), allocator.clone());
        let repair = RepairRun::new(Arc::clone(&store), scanner.clone(), reconciler);

        Ok(Self {
            config: Arc::new(config),
            pool,
            store,
            allocator,
            scanner,
            repair,
        })
    }

    /// 启动后台任务（定时重号扫描）
    pub fn start_background_tasks(&self) -> BackgroundTasks {
        let mut tasks = BackgroundTasks::new();

        match self.config.duplicate_scan_interval() {
            Some(interval) => {
                let scheduler =
                    ScanScheduler::new(self.scanner.clone(), interval, tasks.shutdown_token());
                tasks.spawn("duplicate_scan", scheduler.run());
            }
            None => tracing::info!("Scheduled duplicate scan disabled"),
        }

        tracing::info!("Background tasks registered: {}", tasks.len());
        tasks
    }
}
