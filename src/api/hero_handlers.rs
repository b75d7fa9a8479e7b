use actix_web::{web, HttpRequest, Responder};
use log::{error, info};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{hero_error, record_activity, ApiResponse};
use crate::activity::{Activity, ActivityAction};
use crate::hero::{HeroError, UploadCandidate};
use crate::store::Table;
use crate::AppState;

#[derive(Debug, Serialize)]
struct PublicHero {
    image_url: String,
    rotation_enabled: bool,
    rotating: bool,
    transition_interval_ms: u64,
    index: usize,
}

#[derive(Debug, Deserialize)]
pub struct IntervalBody {
    pub transition_interval_ms: u64,
}

/// 从存储重新加载设置和图片，重新配置共享轮播
pub async fn refresh_carousel(state: &AppState) -> Result<(), HeroError> {
    let (settings, images) = state.hero_manager.snapshot().await?;
    let mut carousel = state.carousel.lock().unwrap_or_else(|e| e.into_inner());
    carousel.configure(settings, images);
    Ok(())
}

/// 变更成功后刷新轮播；刷新失败只记录日志，不影响这次变更的结果
async fn after_mutation(state: &AppState) {
    if let Err(e) = refresh_carousel(state).await {
        error!("刷新轮播失败: {}", e);
    }
}

async fn settings_changed(state: &AppState, req: &HttpRequest) {
    record_activity(
        state,
        req,
        ActivityAction::Update,
        Activity::table(Table::HeroSettings),
    )
    .await;
}

pub async fn public_hero(data: web::Data<AppState>) -> impl Responder {
    let hero = {
        let carousel = data.carousel.lock().unwrap_or_else(|e| e.into_inner());
        PublicHero {
            image_url: carousel.current_image().to_string(),
            rotation_enabled: carousel.settings().rotation_enabled,
            rotating: carousel.is_rotating(),
            transition_interval_ms: carousel.settings().transition_interval_ms,
            index: carousel.rotation_index(),
        }
    };
    ApiResponse::ok("OK", hero)
}

pub async fn admin_hero(data: web::Data<AppState>) -> impl Responder {
    match data.hero_manager.snapshot().await {
        Ok((settings, images)) => {
            ApiResponse::ok("OK", json!({ "settings": settings, "images": images }))
        }
        Err(e) => hero_error(e),
    }
}

pub async fn upload_image(
    req: HttpRequest,
    body: web::Bytes,
    data: web::Data<AppState>,
) -> impl Responder {
    let headers = req.headers();
    let content_type = headers
        .get("Content-Type")
        .and_then(|v| v.to_str().ok());
    let file_name = headers
        .get("X-File-Name")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("upload");

    let candidate = UploadCandidate {
        file_name,
        content_type,
        data: &body,
    };
    info!("收到轮播图片上传: {} ({} 字节)", file_name, body.len());

    match data.hero_manager.upload(&candidate).await {
        Ok(image) => {
            after_mutation(&data).await;
            record_activity(
                &data,
                &req,
                ActivityAction::Create,
                Activity::on(Table::HeroImages, &image.id, Some(file_name)),
            )
            .await;
            ApiResponse::ok("Image uploaded", image)
        }
        Err(e) => hero_error(e),
    }
}

pub async fn delete_image(
    req: HttpRequest,
    path: web::Path<String>,
    data: web::Data<AppState>,
) -> impl Responder {
    match data.hero_manager.delete(&path).await {
        Ok(()) => {
            after_mutation(&data).await;
            record_activity(
                &data,
                &req,
                ActivityAction::Delete,
                Activity::on(Table::HeroImages, &path, None),
            )
            .await;
            ApiResponse::ok("Image deleted", ())
        }
        Err(e) => hero_error(e),
    }
}

pub async fn toggle_rotation(req: HttpRequest, data: web::Data<AppState>) -> impl Responder {
    match data.hero_manager.toggle_rotation().await {
        Ok(settings) => {
            after_mutation(&data).await;
            settings_changed(&data, &req).await;
            let message = if settings.rotation_enabled {
                "Carousel enabled"
            } else {
                "Carousel disabled"
            };
            ApiResponse::ok(message, settings)
        }
        Err(e) => hero_error(e),
    }
}

pub async fn set_active(
    req: HttpRequest,
    path: web::Path<String>,
    data: web::Data<AppState>,
) -> impl Responder {
    match data.hero_manager.set_active(&path).await {
        Ok(settings) => {
            after_mutation(&data).await;
            settings_changed(&data, &req).await;
            ApiResponse::ok("Active image updated", settings)
        }
        Err(e) => hero_error(e),
    }
}

pub async fn set_interval(
    req: HttpRequest,
    body: web::Json<IntervalBody>,
    data: web::Data<AppState>,
) -> impl Responder {
    match data
        .hero_manager
        .set_interval(body.transition_interval_ms)
        .await
    {
        Ok(settings) => {
            after_mutation(&data).await;
            settings_changed(&data, &req).await;
            ApiResponse::ok("Transition interval updated", settings)
        }
        Err(e) => hero_error(e),
    }
}
