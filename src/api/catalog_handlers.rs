use actix_web::{http::StatusCode, web, HttpRequest, Responder};
use log::error;
use serde::Deserialize;
use serde_json::json;

use super::{catalog_error, record_activity, ApiResponse};
use crate::activity::{Activity, ActivityAction};
use crate::catalog::{ContactForm, MessageStatus, NewCategory, ProductQuery};
use crate::store::Table;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: MessageStatus,
}

pub async fn list_products(
    query: web::Query<ProductQuery>,
    data: web::Data<AppState>,
) -> impl Responder {
    match data.catalog.list_products(&query).await {
        Ok(page) => ApiResponse::ok("OK", page),
        Err(e) => catalog_error(e),
    }
}

pub async fn get_product(path: web::Path<String>, data: web::Data<AppState>) -> impl Responder {
    match data.catalog.product(&path).await {
        Ok(product) => ApiResponse::ok("OK", product),
        Err(e) => catalog_error(e),
    }
}

pub async fn list_categories(data: web::Data<AppState>) -> impl Responder {
    match data.catalog.categories().await {
        Ok(categories) => ApiResponse::ok("OK", categories),
        Err(e) => catalog_error(e),
    }
}

pub async fn submit_contact(
    form: web::Json<ContactForm>,
    data: web::Data<AppState>,
) -> impl Responder {
    match data.catalog.submit_contact(&form).await {
        Ok(_) => ApiResponse::ok("Thank you! Your message has been sent.", ()),
        Err(e) => catalog_error(e),
    }
}

/// 数据库保活
pub async fn keepalive(data: web::Data<AppState>) -> impl Responder {
    match data.catalog.keepalive().await {
        Ok(count) => ApiResponse::ok("Database is alive", json!({ "products": count })),
        Err(e) => {
            error!("保活查询失败: {}", e);
            ApiResponse::fail(StatusCode::SERVICE_UNAVAILABLE, "Database unavailable")
        }
    }
}

pub async fn add_category(
    req: HttpRequest,
    body: web::Json<NewCategory>,
    data: web::Data<AppState>,
) -> impl Responder {
    match data.catalog.add_category(&body).await {
        Ok(category) => {
            record_activity(
                &data,
                &req,
                ActivityAction::Create,
                Activity::on(
                    Table::Categories,
                    &category.id,
                    Some(category.display_name.as_str()),
                ),
            )
            .await;
            ApiResponse::ok("Category added", category)
        }
        Err(e) => catalog_error(e),
    }
}

pub async fn delete_category(
    req: HttpRequest,
    path: web::Path<String>,
    data: web::Data<AppState>,
) -> impl Responder {
    match data.catalog.delete_category(&path).await {
        Ok(()) => {
            record_activity(
                &data,
                &req,
                ActivityAction::Delete,
                Activity::on(Table::Categories, &path, None),
            )
            .await;
            ApiResponse::ok("Category deleted", ())
        }
        Err(e) => catalog_error(e),
    }
}

pub async fn list_messages(data: web::Data<AppState>) -> impl Responder {
    match data.catalog.messages().await {
        Ok(messages) => ApiResponse::ok("OK", messages),
        Err(e) => catalog_error(e),
    }
}

pub async fn set_message_status(
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<StatusBody>,
    data: web::Data<AppState>,
) -> impl Responder {
    match data.catalog.set_message_status(&path, body.status).await {
        Ok(()) => {
            record_activity(
                &data,
                &req,
                ActivityAction::Update,
                Activity::on(Table::ContactMessages, &path, Some(body.status.as_str())),
            )
            .await;
            ApiResponse::ok("Status updated", json!({ "status": body.status }))
        }
        Err(e) => catalog_error(e),
    }
}
