//! Numbering Server - 单据编号服务
//!
//! # 架构概述
//!
//! 为采购单 / 采购退货单分配按范围连续的单据编号，并提供重号的
//! 检查与修复：
//!
//! - **编号** (`numbering`): 格式化、分配、重号扫描、修复
//! - **数据库** (`db`): SQLite 存储与唯一索引守卫
//! - **HTTP API** (`api`): 单据创建与编号运维接口
//! - **CLI** (`cli`): `numbering check` / `numbering repair`
//!
//! # 模块结构
//!
//! ```text
//! numbering-server/src/
//! ├── core/          # 配置、状态、后台任务
//! ├── numbering/     # 编号领域逻辑
//! ├── db/            # 仓储、守卫索引
//! ├── api/           # HTTP 路由和处理器
//! ├── cli.rs         # 运维命令行
//! └── utils/         # 错误、日志
//! ```

pub mod api;
pub mod cli;
pub mod core;
pub mod db;
pub mod numbering;
pub mod utils;

// Re-export 公共类型
pub use core::{Config, Server, ServerState};
pub use numbering::{Allocator, DuplicateScanner, NumberFormat, Reconciler, RepairRun};
pub use utils::{AppError, AppResult};

// Re-export unified error types from shared
pub use utils::{ApiResponse, ErrorCategory, ErrorCode};

pub use utils::logger::init_logger;

/// 加载 .env 并初始化日志，返回配置
///
/// 日志先于其余配置初始化，配置解析告警才能输出
pub fn setup_environment(file_prefix: &str) -> Config {
    dotenv::dotenv().ok();
    let (log_level, log_dir) = Config::log_settings(&|key| std::env::var(key).ok());
    init_logger(&log_level, log_dir.as_deref(), file_prefix);
    Config::from_env()
}

pub fn print_banner() {
    println!(
        r#"
    _   __                __              _
   / | / /_  ______ ___  / /_  ___  _____(_)___  ____ _
  /  |/ / / / / __ `__ \/ __ \/ _ \/ ___/ / __ \/ __ `/
 / /|  / /_/ / / / / / / /_/ /  __/ /  / / / / / /_/ /
/_/ |_/\__,_/_/ /_/ /_/_.___/\___/_/  /_/_/ /_/\__, /
                                              /____/
    "#
    );
}
