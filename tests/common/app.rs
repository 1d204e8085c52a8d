use std::sync::Arc;

use axum::Router;
use tempfile::TempDir;
use tokio::sync::broadcast;

use adaptive_mastery::config::{Config, LearningEnvConfig};
use adaptive_mastery::learning::{LearningConfig, LearningManager};
use adaptive_mastery::routes::build_router;
use adaptive_mastery::state::AppState;
use adaptive_mastery::store::Store;

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub config: Config,
    _temp_dir: TempDir,
}

fn test_config(sled_path: String, adjust_every: u32) -> Config {
    // 直接构造 Config，避免使用 set_var 造成多线程测试环境变量竞态
    Config {
        host: std::net::IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
        port: 3000,
        log_level: "info".to_string(),
        enable_file_logs: false,
        log_dir: "./logs".to_string(),
        sled_path,
        cors_origin: "http://localhost:5173".to_string(),
        event_channel_capacity: 64,
        learning: LearningEnvConfig {
            adjust_every,
            difficulty_window: 20,
            default_batch_size: 20,
        },
    }
}

async fn spawn_with_adjust_every(adjust_every: u32) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let sled_path = temp_dir.path().join("mastery-test.sled");
    let config = test_config(sled_path.to_string_lossy().to_string(), adjust_every);

    let store = Arc::new(Store::open(&config.sled_path).expect("open store"));
    store.run_migrations().expect("run migrations");

    let manager = Arc::new(
        LearningManager::new(LearningConfig::from_env(&config.learning), store.clone())
            .expect("learning manager"),
    );
    let (shutdown_tx, _) = broadcast::channel::<()>(8);

    let state = AppState::new(store, manager, &config, shutdown_tx);
    let app = build_router(state.clone());

    TestApp {
        app,
        state,
        config,
        _temp_dir: temp_dir,
    }
}

pub async fn spawn_test_server() -> TestApp {
    spawn_with_adjust_every(10).await
}

pub async fn spawn_test_server_with_adjust_every(adjust_every: u32) -> TestApp {
    spawn_with_adjust_every(adjust_every).await
}
