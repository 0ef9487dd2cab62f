use std::sync::Arc;

use tonic::{Request, Response, Status};

use paygate_common::requests::{LoginRequest, RegisterRequest};
use paygate_services::AuthService;

use super::convert;
use super::pb;
use super::pb::auth_server::Auth;

pub struct AuthRpc {
    service: Arc<AuthService>,
}

impl AuthRpc {
    pub fn new(service: Arc<AuthService>) -> Self {
        Self { service }
    }
}

#[tonic::async_trait]
impl Auth for AuthRpc {
    async fn register(
        &self,
        request: Request<pb::RegisterRequest>,
    ) -> Result<Response<pb::UserReply>, Status> {
        let req = request.into_inner();
        let user = self
            .service
            .register(RegisterRequest {
                firstname: req.firstname,
                lastname: req.lastname,
                email: req.email,
                password: req.password,
            })
            .await?;
        Ok(Response::new(convert::user(&user)))
    }

    async fn login(
        &self,
        request: Request<pb::LoginRequest>,
    ) -> Result<Response<pb::LoginReply>, Status> {
        let req = request.into_inner();
        let (user, access_token) = self
            .service
            .login(LoginRequest {
                email: req.email,
                password: req.password,
            })
            .await?;
        Ok(Response::new(pb::LoginReply {
            user: Some(convert::user(&user)),
            access_token,
        }))
    }

    async fn validate(
        &self,
        request: Request<pb::TokenRequest>,
    ) -> Result<Response<pb::ClaimsReply>, Status> {
        let req = request.into_inner();
        let claims = self.service.validate(&req.token).await?;
        Ok(Response::new(pb::ClaimsReply {
            user_id: claims.sub,
            email: claims.email,
            expires_at: claims.exp,
        }))
    }
}
