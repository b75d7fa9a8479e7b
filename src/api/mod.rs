use actix_web::{http::StatusCode, web, HttpMessage, HttpRequest, HttpResponse};
use log::error;
use serde::Serialize;
use serde_json::Value;

use crate::activity::{Activity, ActivityAction};
use crate::auth::{AdminGuard, AdminUser};
use crate::catalog::CatalogError;
use crate::hero::HeroError;
use crate::AppState;

mod activity_handlers;
mod auth_handlers;
mod catalog_handlers;
mod hero_handlers;
mod product_handlers;

pub use hero_handlers::refresh_carousel;

// 统一响应结构体
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    pub message: String,
    pub data: Option<Value>,
}

impl ApiResponse {
    pub fn ok(message: impl Into<String>, data: impl Serialize) -> HttpResponse {
        let data = match serde_json::to_value(data) {
            Ok(Value::Null) => None,
            Ok(v) => Some(v),
            Err(e) => {
                error!("响应序列化失败: {}", e);
                return Self::fail(StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong");
            }
        };
        HttpResponse::Ok().json(ApiResponse {
            success: true,
            message: message.into(),
            data,
        })
    }

    pub fn fail(status: StatusCode, message: impl Into<String>) -> HttpResponse {
        Self::fail_with(status, message, Value::Null)
    }

    pub fn fail_with(status: StatusCode, message: impl Into<String>, data: Value) -> HttpResponse {
        HttpResponse::build(status).json(ApiResponse {
            success: false,
            message: message.into(),
            data: (!data.is_null()).then_some(data),
        })
    }
}

pub(crate) fn hero_error(e: HeroError) -> HttpResponse {
    let status = match &e {
        e if e.is_validation() => StatusCode::BAD_REQUEST,
        HeroError::NotFound => StatusCode::NOT_FOUND,
        _ => {
            error!("轮播操作失败: {:?}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    ApiResponse::fail(status, e.to_string())
}

pub(crate) fn catalog_error(e: CatalogError) -> HttpResponse {
    let status = match &e {
        CatalogError::NotFound => StatusCode::NOT_FOUND,
        CatalogError::AlreadyExists => StatusCode::CONFLICT,
        CatalogError::Store(inner) => {
            error!("目录操作失败: {}", inner);
            StatusCode::INTERNAL_SERVER_ERROR
        }
        CatalogError::Upload(inner) => {
            error!("商品图片上传失败: {}", inner);
            StatusCode::INTERNAL_SERVER_ERROR
        }
        _ => StatusCode::BAD_REQUEST,
    };
    ApiResponse::fail(status, e.to_string())
}

/// 守卫放进请求扩展里的当前管理员
pub(crate) fn acting_admin(req: &HttpRequest) -> Option<String> {
    req.extensions().get::<AdminUser>().map(|u| u.email.clone())
}

/// 以当前管理员的名义记录一次操作
pub(crate) async fn record_activity(
    data: &AppState,
    req: &HttpRequest,
    action: ActivityAction,
    target: Activity<'_>,
) {
    let email = acting_admin(req);
    data.activity.record(email.as_deref(), action, target).await;
}

/// 注册所有路由。登录相关的路由在管理后台守卫之外。
pub fn configure(cfg: &mut web::ServiceConfig, state: &web::Data<AppState>) {
    let guard = AdminGuard::new(state.auth_manager.identity());

    cfg.service(
        web::scope("/api")
            .route("/hero", web::get().to(hero_handlers::public_hero))
            .route("/products", web::get().to(catalog_handlers::list_products))
            .route("/products/{id}", web::get().to(catalog_handlers::get_product))
            .route("/categories", web::get().to(catalog_handlers::list_categories))
            .route("/contact", web::post().to(catalog_handlers::submit_contact))
            .route("/keepalive", web::get().to(catalog_handlers::keepalive))
            .route("/admin/login", web::post().to(auth_handlers::login))
            .route("/admin/login/status", web::get().to(auth_handlers::login_status))
            .service(
                web::scope("/admin")
                    .wrap(guard)
                    .route("/logout", web::post().to(auth_handlers::logout))
                    .route("/me", web::get().to(auth_handlers::me))
                    .route("/hero", web::get().to(hero_handlers::admin_hero))
                    .route("/hero/images", web::post().to(hero_handlers::upload_image))
                    .route(
                        "/hero/images/{id}",
                        web::delete().to(hero_handlers::delete_image),
                    )
                    .route(
                        "/hero/settings/toggle",
                        web::post().to(hero_handlers::toggle_rotation),
                    )
                    .route(
                        "/hero/settings/active/{id}",
                        web::put().to(hero_handlers::set_active),
                    )
                    .route(
                        "/hero/settings/interval",
                        web::put().to(hero_handlers::set_interval),
                    )
                    .route("/categories", web::post().to(catalog_handlers::add_category))
                    .route(
                        "/categories/{id}",
                        web::delete().to(catalog_handlers::delete_category),
                    )
                    .route("/messages", web::get().to(catalog_handlers::list_messages))
                    .route(
                        "/messages/{id}/status",
                        web::put().to(catalog_handlers::set_message_status),
                    )
                    .route("/products", web::get().to(product_handlers::list_products))
                    .route("/products", web::post().to(product_handlers::create_product))
                    .route(
                        "/products/images",
                        web::post().to(product_handlers::upload_image),
                    )
                    .route("/products/{id}", web::put().to(product_handlers::update_product))
                    .route(
                        "/products/{id}",
                        web::delete().to(product_handlers::delete_product),
                    )
                    .route(
                        "/products/{id}/visibility",
                        web::post().to(product_handlers::toggle_visibility),
                    )
                    .route(
                        "/products/{id}/featured",
                        web::post().to(product_handlers::toggle_featured),
                    )
                    .route("/activity", web::get().to(activity_handlers::recent_activity)),
            ),
    );
}
