use actix_web::{web, HttpRequest, Responder};
use log::info;
use serde_json::json;

use super::{catalog_error, record_activity, ApiResponse};
use crate::activity::{Activity, ActivityAction};
use crate::catalog::ProductForm;
use crate::hero::UploadCandidate;
use crate::store::Table;
use crate::AppState;

/// 管理后台商品列表，包含隐藏商品
pub async fn list_products(data: web::Data<AppState>) -> impl Responder {
    match data.product_admin.products().await {
        Ok(products) => ApiResponse::ok("OK", products),
        Err(e) => catalog_error(e),
    }
}

pub async fn create_product(
    req: HttpRequest,
    body: web::Json<ProductForm>,
    data: web::Data<AppState>,
) -> impl Responder {
    match data.product_admin.create(&body).await {
        Ok(product) => {
            record_activity(
                &data,
                &req,
                ActivityAction::Create,
                Activity::on(Table::Products, &product.id, Some(product.name.as_str())),
            )
            .await;
            ApiResponse::ok("Product created", product)
        }
        Err(e) => catalog_error(e),
    }
}

pub async fn update_product(
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<ProductForm>,
    data: web::Data<AppState>,
) -> impl Responder {
    match data.product_admin.update(&path, &body).await {
        Ok(product) => {
            record_activity(
                &data,
                &req,
                ActivityAction::Update,
                Activity::on(Table::Products, &product.id, Some(product.name.as_str())),
            )
            .await;
            ApiResponse::ok("Product updated", product)
        }
        Err(e) => catalog_error(e),
    }
}

pub async fn delete_product(
    req: HttpRequest,
    path: web::Path<String>,
    data: web::Data<AppState>,
) -> impl Responder {
    match data.product_admin.delete(&path).await {
        Ok(product) => {
            record_activity(
                &data,
                &req,
                ActivityAction::Delete,
                Activity::on(Table::Products, &product.id, Some(product.name.as_str())),
            )
            .await;
            ApiResponse::ok("Product deleted", ())
        }
        Err(e) => catalog_error(e),
    }
}

pub async fn toggle_visibility(
    req: HttpRequest,
    path: web::Path<String>,
    data: web::Data<AppState>,
) -> impl Responder {
    match data.product_admin.toggle_visibility(&path).await {
        Ok(product) => {
            record_activity(
                &data,
                &req,
                ActivityAction::Update,
                Activity::on(Table::Products, &product.id, Some(product.name.as_str())),
            )
            .await;
            let message = if product.is_visible {
                "Product is now visible"
            } else {
                "Product is now hidden"
            };
            ApiResponse::ok(message, product)
        }
        Err(e) => catalog_error(e),
    }
}

pub async fn toggle_featured(
    req: HttpRequest,
    path: web::Path<String>,
    data: web::Data<AppState>,
) -> impl Responder {
    match data.product_admin.toggle_featured(&path).await {
        Ok(product) => {
            record_activity(
                &data,
                &req,
                ActivityAction::Update,
                Activity::on(Table::Products, &product.id, Some(product.name.as_str())),
            )
            .await;
            let message = if product.is_featured {
                "Product featured"
            } else {
                "Product no longer featured"
            };
            ApiResponse::ok(message, product)
        }
        Err(e) => catalog_error(e),
    }
}

/// 原始请求体上传，和轮播图片上传同样的头部约定
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
    info!("收到商品图片上传: {} ({} 字节)", file_name, body.len());

    match data.product_admin.upload_image(&candidate).await {
        Ok(url) => ApiResponse::ok("Image uploaded", json!({ "image_url": url })),
        Err(e) => catalog_error(e),
    }
}

#[cfg(test)]
mod tests {
    use crate::api::{configure, testing};
    use crate::auth::MockIdentityProvider;
    use crate::catalog::product_admin::PRODUCT_BUCKET;
    use crate::media::MockStorageService;
    use crate::store::{MemoryStore, Table};
    use actix_web::{http::StatusCode, test, App};
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store.seed(
            Table::Categories,
            json!({ "name": "bag", "display_name": "Bag", "display_order": 0 }),
        );
        store
    }

    #[actix_web::test]
    async fn hidden_product_is_managed_but_not_public() {
        let store = store();
        let mut storage = MockStorageService::new();
        storage
            .expect_upload()
            .times(1)
            .returning(|bucket, key, _| Ok(format!("/media/{}/{}", bucket, key)));
        let state = testing::state(
            Arc::new(testing::admin_identity()),
            store.clone(),
            Arc::new(storage),
        );
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(|cfg| configure(cfg, &state)),
        )
        .await;

        let uploaded: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::post()
                .uri("/api/admin/products/images")
                .insert_header(("Authorization", "Bearer token"))
                .insert_header(("Content-Type", "image/jpeg"))
                .insert_header(("X-File-Name", "tote.jpg"))
                .set_payload(vec![0u8; 128])
                .to_request(),
        )
        .await;
        let image_url = uploaded["data"]["image_url"].as_str().unwrap().to_string();
        assert!(image_url.starts_with(&format!("/media/{}/", PRODUCT_BUCKET)));

        let created: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::post()
                .uri("/api/admin/products")
                .insert_header(("Authorization", "Bearer token"))
                .set_json(json!({
                    "name": "Tas Tote",
                    "category": "bag",
                    "image_url": image_url,
                    "is_visible": false
                }))
                .to_request(),
        )
        .await;
        assert_eq!(created["success"], true);
        let id = created["data"]["id"].as_str().unwrap().to_string();

        let public = test::call_service(
            &app,
            test::TestRequest::get()
                .uri(&format!("/api/products/{}", id))
                .to_request(),
        )
        .await;
        assert_eq!(public.status(), StatusCode::NOT_FOUND);

        let admin_list: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get()
                .uri("/api/admin/products")
                .insert_header(("Authorization", "Bearer token"))
                .to_request(),
        )
        .await;
        assert_eq!(admin_list["data"].as_array().unwrap().len(), 1);

        let featured: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::post()
                .uri(&format!("/api/admin/products/{}/featured", id))
                .insert_header(("Authorization", "Bearer token"))
                .to_request(),
        )
        .await;
        assert_eq!(featured["data"]["is_featured"], true);

        let actions: Vec<String> = store
            .rows(Table::AdminActivityLog)
            .iter()
            .map(|r| r["action"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(actions, vec!["create", "update"]);
    }

    #[actix_web::test]
    async fn invalid_form_is_rejected_without_activity() {
        let store = store();
        let state = testing::state(
            Arc::new(testing::admin_identity()),
            store.clone(),
            Arc::new(MockStorageService::new()),
        );
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(|cfg| configure(cfg, &state)),
        )
        .await;

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/admin/products")
                .insert_header(("Authorization", "Bearer token"))
                .set_json(json!({ "name": "Tas", "category": "bag" }))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Please upload a product image");
        assert!(store.rows(Table::Products).is_empty());
        assert!(store.rows(Table::AdminActivityLog).is_empty());
    }

    #[actix_web::test]
    async fn product_admin_requires_token() {
        let mut identity = MockIdentityProvider::new();
        identity.expect_current_user().returning(|_| Ok(None));
        let state = testing::state(
            Arc::new(identity),
            store(),
            Arc::new(MockStorageService::new()),
        );
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(|cfg| configure(cfg, &state)),
        )
        .await;

        let resp = test::try_call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/admin/products")
                .insert_header(("Authorization", "Bearer stale"))
                .to_request(),
        )
        .await;
        let status = match resp {
            Ok(r) => r.status(),
            Err(e) => e.error_response().status(),
        };
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
