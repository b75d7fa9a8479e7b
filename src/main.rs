mod activity;
mod api;
mod auth;
mod catalog;
mod config;
mod db;
mod hero;
mod logger;
mod media;
mod store;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::{web, App, HttpServer};
use dotenv::dotenv;
use sqlx::postgres::PgPoolOptions;
use std::fs;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use activity::ActivityLog;
use auth::{AuthManager, FileSlot, KeyValueSlot, MemorySlot, PostgresIdentity};
use catalog::{Catalog, ProductAdmin};
use config::AppConfig;
use hero::{HeroCarousel, HeroManager};
use log::{error, info, warn};
use media::LocalStorage;
use store::PostgresStore;

/// 原始请求体上限，略大于图片上限，超出部分由上传校验报错
const PAYLOAD_LIMIT: usize = 6 * 1024 * 1024;
const TOKEN_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

// 应用状态
pub struct AppState {
    pub auth_manager: AuthManager,
    pub hero_manager: HeroManager,
    pub carousel: Mutex<HeroCarousel>,
    pub catalog: Catalog,
    pub product_admin: ProductAdmin,
    pub activity: ActivityLog,
}

fn io_error(context: &str, e: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, e))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // 加载 .env
    dotenv().ok();

    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("配置错误: {}", e);
        io_error("配置错误", e)
    })?;

    // 初始化日志系统
    let level = logger::parse_level(&config.log_level);
    let log_path = config.log_dir.join("app.log");
    if let Err(e) = logger::Logger::init(&log_path, level) {
        eprintln!("初始化日志系统失败: {}", e);
        logger::Logger::init_fallback(level);
    }

    info!("应用程序启动");

    // 连接数据库
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .map_err(|e| io_error("数据库连接错误", e))?;

    // 初始化数据库
    let admin = config
        .admin_email
        .as_deref()
        .zip(config.admin_password.as_deref());
    db::initialize_db(pool.clone(), admin)
        .await
        .map_err(|e| io_error("数据库初始化错误", e))?;

    fs::create_dir_all(&config.upload_dir)?;

    let store = Arc::new(PostgresStore::new(pool.clone()));
    let storage = Arc::new(LocalStorage::new(
        config.upload_dir.clone(),
        &config.public_media_url,
    ));
    let identity = Arc::new(PostgresIdentity::new(pool, &config.jwt_secret));

    let slots: Arc<dyn KeyValueSlot> = match &config.throttle_state_dir {
        Some(dir) => match FileSlot::new(dir) {
            Ok(slot) => Arc::new(slot),
            Err(e) => {
                warn!("登录计数目录不可用，改用内存保存: {}", e);
                Arc::new(MemorySlot::new())
            }
        },
        None => Arc::new(MemorySlot::new()),
    };

    let app_state = web::Data::new(AppState {
        auth_manager: AuthManager::new(identity.clone(), slots),
        hero_manager: HeroManager::new(store.clone(), storage.clone()),
        carousel: Mutex::new(HeroCarousel::new()),
        catalog: Catalog::new(store.clone()),
        product_admin: ProductAdmin::new(store.clone(), storage),
        activity: ActivityLog::new(store),
    });

    if let Err(e) = api::refresh_carousel(&app_state).await {
        error!("加载轮播失败，先显示占位图: {}", e);
    }

    // 启动 token 黑名单清理任务
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(TOKEN_CLEANUP_INTERVAL);
        loop {
            ticker.tick().await;
            identity.cleanup_expired_tokens();
        }
    });

    let bind = (config.bind_addr.clone(), config.port);
    info!("服务器启动在 http://{}:{}", bind.0, bind.1);

    let upload_dir = config.upload_dir.clone();
    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .app_data(web::PayloadConfig::new(PAYLOAD_LIMIT))
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .configure(|cfg| api::configure(cfg, &app_state))
            .service(Files::new("/media", upload_dir.clone()))
    })
    .bind(bind)?
    .run()
    .await
}
