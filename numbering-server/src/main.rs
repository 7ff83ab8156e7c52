use numbering_server::{Server, print_banner, setup_environment};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. 设置环境 (dotenv, 日志, 配置)
    let config = setup_environment("numbering-server");

    print_banner();

    tracing::info!(
        environment = %config.environment,
        database = %config.database_path,
        "Numbering server starting..."
    );

    // 2. 启动 HTTP 服务器 (Server::run 会初始化状态并启动后台任务)
    let server = Server::new(config);

    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
