use rally_server::{Config, Server, ServerState, init_logger_with_file, print_banner};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. 加载环境变量
    dotenv::dotenv().ok();

    // 2. 加载配置
    let config = Config::from_env();

    // 3. 初始化日志 (文件目录存在时写滚动日志)
    std::fs::create_dir_all(config.log_dir())?;
    let log_dir = config.log_dir();
    init_logger_with_file(Some(&config.log_level), None, log_dir.to_str());

    print_banner();
    tracing::info!(
        "🏐 Rally Server starting (env: {}, port: {})",
        config.environment,
        config.http_port
    );

    // 4. 初始化服务器状态
    let state = ServerState::initialize(&config)?;

    // 5. 启动 HTTP 服务器 (Server::run 会自动启动后台任务)
    let server = Server::with_state(config, state);

    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
