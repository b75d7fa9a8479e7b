use actix_web::{
    cookie::{Cookie, SameSite},
    http::StatusCode,
    web, HttpMessage, HttpRequest, HttpResponse, Responder,
};
use log::{error, info};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::{record_activity, ApiResponse};
use crate::activity::{Activity, ActivityAction};
use crate::auth::{bearer_token, AdminUser, LoginFailure};
use crate::AppState;

pub const CLIENT_COOKIE: &str = "patchtern_client";

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// 登录节流按客户端区分；没有或格式不对的 cookie 会换一个新的
fn client_id(req: &HttpRequest) -> (String, bool) {
    match req
        .cookie(CLIENT_COOKIE)
        .and_then(|c| Uuid::parse_str(c.value()).ok())
    {
        Some(id) => (id.to_string(), false),
        None => (Uuid::new_v4().to_string(), true),
    }
}

fn with_client_cookie(mut resp: HttpResponse, id: &str, issued: bool) -> HttpResponse {
    if issued {
        let cookie = Cookie::build(CLIENT_COOKIE, id.to_string())
            .path("/")
            .http_only(true)
            .same_site(SameSite::Strict)
            .finish();
        if let Err(e) = resp.add_cookie(&cookie) {
            error!("设置客户端 cookie 失败: {}", e);
        }
    }
    resp
}

pub async fn login(
    req: HttpRequest,
    body: web::Json<LoginRequest>,
    data: web::Data<AppState>,
) -> impl Responder {
    let (client, issued) = client_id(&req);

    let resp = match data
        .auth_manager
        .login(&client, &body.email, &body.password)
        .await
    {
        Ok(session) => {
            data.activity
                .record(
                    Some(session.user.email.as_str()),
                    ActivityAction::Login,
                    Activity::none(),
                )
                .await;
            ApiResponse::ok("Login successful", session)
        }
        Err(failure) => {
            let message = failure.message().to_string();
            match failure {
                LoginFailure::Invalid { .. } => {
                    ApiResponse::fail(StatusCode::BAD_REQUEST, message)
                }
                LoginFailure::Locked { retry_after_ms, .. } => ApiResponse::fail_with(
                    StatusCode::TOO_MANY_REQUESTS,
                    message,
                    json!({ "retry_after_ms": retry_after_ms }),
                ),
                LoginFailure::Rejected {
                    warning, locked, ..
                } => ApiResponse::fail_with(
                    StatusCode::UNAUTHORIZED,
                    message,
                    json!({ "warning": warning, "locked": locked }),
                ),
            }
        }
    };
    with_client_cookie(resp, &client, issued)
}

pub async fn login_status(req: HttpRequest, data: web::Data<AppState>) -> impl Responder {
    let (client, issued) = client_id(&req);
    let status = data.auth_manager.lock_status(&client);
    with_client_cookie(ApiResponse::ok("OK", status), &client, issued)
}

pub async fn logout(req: HttpRequest, data: web::Data<AppState>) -> impl Responder {
    let Some(token) = bearer_token(&req) else {
        return ApiResponse::fail(StatusCode::UNAUTHORIZED, "Missing bearer token");
    };
    match data.auth_manager.logout(&token).await {
        Ok(()) => {
            info!("管理员已退出登录");
            record_activity(&data, &req, ActivityAction::Logout, Activity::none()).await;
            ApiResponse::ok("Logged out", ())
        }
        Err(e) => {
            error!("退出登录失败: {}", e);
            ApiResponse::fail(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
    }
}

pub async fn me(req: HttpRequest) -> impl Responder {
    match req.extensions().get::<AdminUser>() {
        Some(user) => ApiResponse::ok("OK", user),
        None => ApiResponse::fail(StatusCode::UNAUTHORIZED, "Not authenticated"),
    }
}
