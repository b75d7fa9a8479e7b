use crate::auth::PostgresIdentity;
use crate::store::StoreError;
use log::{error, info, warn};
use sqlx::PgPool;

/// 默认分类：(name, display_name)，受保护不可删除
const DEFAULT_CATEGORIES: [(&str, &str); 3] = [("bag", "Bag"), ("pouch", "Pouch"), ("decor", "Decor")];

pub struct DbInitializer {
    pool: PgPool,
}

impl DbInitializer {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn execute(&self, sql: &str, what: &str) -> Result<(), StoreError> {
        sqlx::query(sql)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Query(format!("{}失败: {}", what, e)))?;
        Ok(())
    }

    /// 初始化管理员表
    pub async fn init_admin_tables(&self) -> Result<(), StoreError> {
        self.execute(
            r#"
            CREATE TABLE IF NOT EXISTS admin_users (
                id VARCHAR PRIMARY KEY DEFAULT gen_random_uuid()::text,
                email VARCHAR UNIQUE NOT NULL,
                password_hash VARCHAR NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            "创建管理员表",
        )
        .await
    }

    /// 初始化轮播相关表，并保证设置表有且只有一行
    pub async fn init_hero_tables(&self) -> Result<(), StoreError> {
        self.execute(
            r#"
            CREATE TABLE IF NOT EXISTS hero_images (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                image_url TEXT NOT NULL,
                display_order INTEGER NOT NULL DEFAULT 0,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            "创建轮播图片表",
        )
        .await?;

        // active_image_id 不加外键：图片删除后由选择逻辑回退
        self.execute(
            r#"
            CREATE TABLE IF NOT EXISTS hero_settings (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                carousel_enabled BOOLEAN NOT NULL DEFAULT FALSE,
                active_image_id UUID,
                transition_duration INTEGER NOT NULL DEFAULT 5000 CHECK (transition_duration > 0),
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            "创建轮播设置表",
        )
        .await?;

        let settings_exist: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM hero_settings)")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| StoreError::Query(format!("检查轮播设置失败: {}", e)))?;
        if !settings_exist {
            self.execute(
                "INSERT INTO hero_settings (carousel_enabled, transition_duration) VALUES (FALSE, 5000)",
                "写入默认轮播设置",
            )
            .await?;
        }
        Ok(())
    }

    /// 初始化商品、分类表
    pub async fn init_catalog_tables(&self) -> Result<(), StoreError> {
        self.execute(
            r#"
            CREATE TABLE IF NOT EXISTS categories (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                name VARCHAR UNIQUE NOT NULL,
                display_name VARCHAR NOT NULL,
                is_protected BOOLEAN NOT NULL DEFAULT FALSE,
                is_default BOOLEAN NOT NULL DEFAULT FALSE,
                display_order INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            "创建分类表",
        )
        .await?;

        for (order, (name, display_name)) in DEFAULT_CATEGORIES.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO categories (name, display_name, is_protected, is_default, display_order)
                VALUES ($1, $2, TRUE, TRUE, $3)
                ON CONFLICT (name) DO NOTHING
                "#,
            )
            .bind(name)
            .bind(display_name)
            .bind(order as i32)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Query(format!("写入默认分类 {} 失败: {}", name, e)))?;
        }

        self.execute(
            r#"
            CREATE TABLE IF NOT EXISTS products (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                name VARCHAR NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                material VARCHAR NOT NULL DEFAULT '',
                size VARCHAR,
                image_url TEXT NOT NULL DEFAULT '',
                category VARCHAR NOT NULL,
                display_order INTEGER NOT NULL DEFAULT 0,
                is_visible BOOLEAN NOT NULL DEFAULT TRUE,
                is_featured BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            "创建商品表",
        )
        .await?;

        // 旧库的商品表没有推荐标记
        self.execute(
            "ALTER TABLE products ADD COLUMN IF NOT EXISTS is_featured BOOLEAN NOT NULL DEFAULT FALSE",
            "补充商品推荐列",
        )
        .await?;

        self.execute(
            "CREATE INDEX IF NOT EXISTS idx_products_category ON products(category)",
            "创建商品索引",
        )
        .await
    }

    /// 初始化留言表
    pub async fn init_contact_tables(&self) -> Result<(), StoreError> {
        self.execute(
            r#"
            CREATE TABLE IF NOT EXISTS contact_messages (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                name VARCHAR(100) NOT NULL,
                email VARCHAR NOT NULL,
                message TEXT NOT NULL,
                status VARCHAR NOT NULL DEFAULT 'unread' CHECK (status IN ('unread', 'read', 'archived')),
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            "创建留言表",
        )
        .await
    }

    /// 初始化管理操作记录表
    pub async fn init_activity_tables(&self) -> Result<(), StoreError> {
        self.execute(
            r#"
            CREATE TABLE IF NOT EXISTS admin_activity_log (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                user_email VARCHAR,
                action VARCHAR NOT NULL CHECK (action IN ('create', 'update', 'delete', 'login', 'logout')),
                table_name VARCHAR,
                record_id VARCHAR,
                record_name VARCHAR,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            "创建管理操作记录表",
        )
        .await?;

        self.execute(
            "CREATE INDEX IF NOT EXISTS idx_admin_activity_created ON admin_activity_log(created_at DESC)",
            "创建管理操作记录索引",
        )
        .await
    }

    /// 写入初始管理员；已存在时不覆盖密码
    pub async fn seed_admin(&self, email: &str, password: &str) -> Result<(), StoreError> {
        let password_hash = PostgresIdentity::hash_password(password).map_err(StoreError::Query)?;
        let result = sqlx::query(
            "INSERT INTO admin_users (email, password_hash) VALUES ($1, $2) ON CONFLICT (email) DO NOTHING",
        )
        .bind(email)
        .bind(password_hash)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Query(format!("写入管理员失败: {}", e)))?;

        if result.rows_affected() > 0 {
            info!("已创建管理员账号: {}", email);
        }
        Ok(())
    }
}

/// 初始化所有数据库表
pub async fn initialize_db(
    pool: PgPool,
    admin: Option<(&str, &str)>,
) -> Result<(), StoreError> {
    info!("开始初始化数据库...");

    let initializer = DbInitializer::new(pool);

    initializer.init_admin_tables().await.map_err(|e| {
        error!("管理员表初始化失败: {:?}", e);
        e
    })?;

    initializer.init_hero_tables().await.map_err(|e| {
        error!("轮播表初始化失败: {:?}", e);
        e
    })?;

    initializer.init_catalog_tables().await.map_err(|e| {
        error!("商品表初始化失败: {:?}", e);
        e
    })?;

    initializer.init_contact_tables().await.map_err(|e| {
        error!("留言表初始化失败: {:?}", e);
        e
    })?;

    initializer.init_activity_tables().await.map_err(|e| {
        error!("管理操作记录表初始化失败: {:?}", e);
        e
    })?;

    match admin {
        Some((email, password)) => initializer.seed_admin(email, password).await?,
        None => warn!("未配置 ADMIN_EMAIL/ADMIN_PASSWORD，跳过管理员初始化"),
    }

    info!("数据库初始化完成");
    Ok(())
}
