//! User registration handler.

use std::sync::Arc;

use serde::Deserialize;

use crate::api::to_json;
use crate::domain::User;
use crate::error::AppError;
use crate::request::Request;
use crate::response::Response;
use crate::status::Status;
use crate::store::UserStore;

#[derive(Deserialize)]
struct RegisterUser {
    name: String,
}

pub struct UserApi {
    store: Arc<dyn UserStore>,
}

impl UserApi {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// `POST /users` → `201`; a duplicate name is `409`.
    pub async fn register(&self, req: Request) -> Result<Response, AppError> {
        let input: RegisterUser = req.json()?;
        let user = User::new(input.name)?;
        let user = self.store.create(user).await?;
        Ok(Response::builder()
            .status(Status::Created)
            .header("location", &format!("/users/{}", user.id))
            .json(to_json(&user)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryUserStore;
    use serde_json::Value;

    fn register_req(name: &str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/users")
            .body(format!(r#"{{"name":"{name}"}}"#).into_bytes())
            .build()
    }

    #[tokio::test]
    async fn registration_returns_the_created_user() {
        let api = UserApi::new(Arc::new(MemoryUserStore::new()));
        let resp = api.register(register_req("tecchu")).await.unwrap();

        assert_eq!(resp.status_code(), 201);
        let body: Value = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body["name"], "tecchu");
        assert!(body["id"].as_str().is_some());
    }

    #[tokio::test]
    async fn duplicate_names_conflict() {
        let api = UserApi::new(Arc::new(MemoryUserStore::new()));
        api.register(register_req("tecchu")).await.unwrap();

        let err = api.register(register_req("tecchu")).await.unwrap_err();
        assert_eq!(err.status(), 409);
    }

    #[tokio::test]
    async fn malformed_body_is_a_validation_error() {
        let api = UserApi::new(Arc::new(MemoryUserStore::new()));
        let req = Request::builder()
            .method("POST")
            .uri("/users")
            .body(&b"not json"[..])
            .build();

        let err = api.register(req).await.unwrap_err();
        assert_eq!(err.status(), 400);
    }
}
