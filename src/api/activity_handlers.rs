use actix_web::{http::StatusCode, web, Responder};
use log::error;

use super::ApiResponse;
use crate::AppState;

pub async fn recent_activity(data: web::Data<AppState>) -> impl Responder {
    match data.activity.recent().await {
        Ok(entries) => ApiResponse::ok("OK", entries),
        Err(e) => {
            error!("读取管理操作记录失败: {}", e);
            ApiResponse::fail(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load activity")
        }
    }
}
