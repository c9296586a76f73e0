//! Task CRUD handlers.

use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;

use crate::api::to_json;
use crate::domain::Task;
use crate::error::AppError;
use crate::request::Request;
use crate::response::Response;
use crate::status::Status;
use crate::store::TaskStore;

#[derive(Deserialize)]
struct CreateTask {
    title: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Deserialize)]
struct UpdateTask {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    done: Option<bool>,
}

pub struct TaskApi {
    store: Arc<dyn TaskStore>,
}

impl TaskApi {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    /// `POST /tasks` → `201` with a `location` header.
    pub async fn create(&self, req: Request) -> Result<Response, AppError> {
        let input: CreateTask = req.json()?;
        let task = Task::new(input.title, input.description)?;
        let task = self.store.create(task).await?;
        Ok(Response::builder()
            .status(Status::Created)
            .header("location", &format!("/tasks/{}", task.id))
            .json(to_json(&task)?))
    }

    /// `GET /tasks/{id}` → `200`.
    pub async fn get(&self, req: Request) -> Result<Response, AppError> {
        let task = self.store.find_by_id(task_id(&req)?).await?;
        Ok(Response::json(to_json(&task)?))
    }

    /// `GET /tasks` → `200`, ordered by creation time.
    pub async fn list(&self, _req: Request) -> Result<Response, AppError> {
        let tasks = self.store.list().await?;
        Ok(Response::json(to_json(&tasks)?))
    }

    /// `PUT /tasks/{id}` → `200`. Absent fields keep their value.
    pub async fn update(&self, req: Request) -> Result<Response, AppError> {
        let id = task_id(&req)?;
        let input: UpdateTask = req.json()?;
        let task = self.store.find_by_id(id).await?;
        let task = task.apply(input.title, input.description, input.done)?;
        let task = self.store.update(task).await?;
        Ok(Response::json(to_json(&task)?))
    }

    /// `DELETE /tasks/{id}` → `204`.
    pub async fn delete(&self, req: Request) -> Result<Response, AppError> {
        self.store.delete(task_id(&req)?).await?;
        Ok(Response::status(Status::NoContent))
    }
}

/// The `{id}` path parameter as a UUID. A missing parameter is a wiring bug
/// (route registered without `{id}`); a malformed one is the client's `400`.
fn task_id(req: &Request) -> Result<Uuid, AppError> {
    let raw = req
        .param("id")
        .ok_or_else(|| AppError::internal("task route registered without an {id} parameter"))?;
    raw.parse().map_err(|e| {
        AppError::new(format!("malformed task id {raw}: {e}"), "task id must be a UUID")
            .with_status(Status::BadRequest)
            .with_cause(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryTaskStore;
    use serde_json::Value;
    use std::collections::HashMap;

    fn api() -> TaskApi {
        TaskApi::new(Arc::new(MemoryTaskStore::new()))
    }

    fn with_id(req: Request, id: &str) -> Request {
        let mut req = req;
        req.set_params(HashMap::from([("id".to_owned(), id.to_owned())]));
        req
    }

    #[tokio::test]
    async fn create_returns_201_with_location() {
        let api = api();
        let req = Request::builder()
            .method("POST")
            .uri("/tasks")
            .body(&br#"{"title":"ship it","description":"eventually"}"#[..])
            .build();

        let resp = api.create(req).await.unwrap();
        assert_eq!(resp.status_code(), 201);

        let body: Value = serde_json::from_slice(resp.body()).unwrap();
        let id = body["id"].as_str().unwrap();
        assert_eq!(resp.header("location").unwrap(), format!("/tasks/{id}"));
        assert_eq!(body["title"], "ship it");
        assert_eq!(body["done"], false);
    }

    #[tokio::test]
    async fn create_rejects_an_empty_title() {
        let api = api();
        let req = Request::builder()
            .method("POST")
            .uri("/tasks")
            .body(&br#"{"title":"  "}"#[..])
            .build();

        let err = api.create(req).await.unwrap_err();
        assert_eq!(err.status(), 400);
        assert_eq!(err.client_message(), "title must not be empty");
    }

    #[tokio::test]
    async fn update_flips_done_and_keeps_the_title() {
        let api = api();
        let created = api
            .create(
                Request::builder()
                    .method("POST")
                    .uri("/tasks")
                    .body(&br#"{"title":"persistent"}"#[..])
                    .build(),
            )
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(created.body()).unwrap();
        let id = body["id"].as_str().unwrap().to_owned();

        let req = with_id(
            Request::builder()
                .method("PUT")
                .uri(&format!("/tasks/{id}"))
                .body(&br#"{"done":true}"#[..])
                .build(),
            &id,
        );
        let resp = api.update(req).await.unwrap();
        let body: Value = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body["title"], "persistent");
        assert_eq!(body["done"], true);
    }

    #[tokio::test]
    async fn get_of_a_malformed_id_is_400_not_404() {
        let api = api();
        let req = with_id(
            Request::builder().method("GET").uri("/tasks/banana").build(),
            "banana",
        );
        let err = api.get(req).await.unwrap_err();
        assert_eq!(err.status(), 400);
        assert_eq!(err.client_message(), "task id must be a UUID");
    }

    #[tokio::test]
    async fn delete_then_get_is_404() {
        let api = api();
        let created = api
            .create(
                Request::builder()
                    .method("POST")
                    .uri("/tasks")
                    .body(&br#"{"title":"short lived"}"#[..])
                    .build(),
            )
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(created.body()).unwrap();
        let id = body["id"].as_str().unwrap().to_owned();

        let resp = api
            .delete(with_id(Request::builder().method("DELETE").uri("/x").build(), &id))
            .await
            .unwrap();
        assert_eq!(resp.status_code(), 204);

        let err = api
            .get(with_id(Request::builder().method("GET").uri("/x").build(), &id))
            .await
            .unwrap_err();
        assert_eq!(err.status(), 404);
    }
}
