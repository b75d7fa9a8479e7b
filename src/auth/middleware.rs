use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    error::{ErrorServiceUnavailable, ErrorUnauthorized},
    Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use log::{debug, error, warn};
use std::rc::Rc;
use std::sync::Arc;

use crate::auth::IdentityProvider;

pub fn bearer_token(req: &actix_web::HttpRequest) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// 管理后台路由守卫：通过身份提供方校验 Bearer token，
/// 成功后把 AdminUser 放进请求扩展
#[derive(Clone)]
pub struct AdminGuard {
    identity: Arc<dyn IdentityProvider>,
}

impl AdminGuard {
    pub fn new(identity: Arc<dyn IdentityProvider>) -> Self {
        Self { identity }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdminGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AdminGuardService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AdminGuardService {
            service: Rc::new(service),
            identity: self.identity.clone(),
        }))
    }
}

pub struct AdminGuardService<S> {
    service: Rc<S>,
    identity: Arc<dyn IdentityProvider>,
}

impl<S, B> Service<ServiceRequest> for AdminGuardService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let identity = self.identity.clone();
        let service = self.service.clone();

        Box::pin(async move {
            let Some(token) = bearer_token(req.request()) else {
                warn!("未提供认证 token");
                return Err(ErrorUnauthorized("Missing bearer token"));
            };

            match identity.current_user(&token).await {
                Ok(Some(user)) => {
                    debug!("管理员 {} 认证成功", user.email);
                    req.extensions_mut().insert(user);
                    service.call(req).await
                }
                Ok(None) => {
                    warn!("Token 无效或已失效");
                    Err(ErrorUnauthorized("Invalid or expired token"))
                }
                Err(e) => {
                    error!("身份校验失败: {}", e);
                    Err(ErrorServiceUnavailable("Authentication service unavailable"))
                }
            }
        })
    }
}
