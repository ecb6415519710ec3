//! Task CRUD and ownership. Needs PostgreSQL: `DATABASE_URL=... cargo test -- --ignored`.

#[macro_use]
mod common;

use actix_web::{http::StatusCode, test};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use taskmate::models::Task;

#[ignore = "requires DATABASE_URL"]
#[actix_rt::test]
async fn test_task_crud_flow() {
    let pool = common::db_pool().await;
    let app = init_app!(pool.clone()).await;
    let email = common::unique_email("crud");
    let user = common::register_user(&app, "Crud", &email).await;

    // Create; owner fields in the body are ignored
    let req = test::TestRequest::post()
        .uri("/api/tasks")
        .append_header(common::bearer(&user.token))
        .set_json(json!({
            "description": "  Buy milk ",
            "owner_id": "00000000-0000-0000-0000-000000000000"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Task = test::read_body_json(resp).await;
    assert_eq!(created.description, "Buy milk");
    assert!(!created.completed);
    assert_eq!(created.owner_id, user.id);

    // Read
    let req = test::TestRequest::get()
        .uri(&format!("/api/tasks/{}", created.id))
        .append_header(common::bearer(&user.token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let fetched: Task = test::read_body_json(resp).await;
    assert_eq!(fetched.id, created.id);

    // Partial update keeps the description
    let req = test::TestRequest::patch()
        .uri(&format!("/api/tasks/{}", created.id))
        .append_header(common::bearer(&user.token))
        .set_json(json!({ "completed": true }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Task = test::read_body_json(resp).await;
    assert!(updated.completed);
    assert_eq!(updated.description, "Buy milk");
    assert!(updated.updated_at >= created.updated_at);

    // Disallowed key leaves the task untouched
    let req = test::TestRequest::patch()
        .uri(&format!("/api/tasks/{}", created.id))
        .append_header(common::bearer(&user.token))
        .set_json(json!({ "description": "Sell milk", "owner_id": user.id }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    // Delete returns the deleted task
    let req = test::TestRequest::delete()
        .uri(&format!("/api/tasks/{}", created.id))
        .append_header(common::bearer(&user.token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let deleted: Task = test::read_body_json(resp).await;
    assert_eq!(deleted.description, "Buy milk");

    let req = test::TestRequest::get()
        .uri(&format!("/api/tasks/{}", created.id))
        .append_header(common::bearer(&user.token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    // Malformed ids are not found either
    let req = test::TestRequest::get()
        .uri("/api/tasks/not-a-uuid")
        .append_header(common::bearer(&user.token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    common::cleanup_user(&pool, &email).await;
}

#[ignore = "requires DATABASE_URL"]
#[actix_rt::test]
async fn test_task_listing_filters_and_pagination() {
    let pool = common::db_pool().await;
    let app = init_app!(pool.clone()).await;
    let email = common::unique_email("list");
    let user = common::register_user(&app, "Lister", &email).await;

    let seed = [("alpha", true), ("bravo", false), ("charlie", true), ("delta", false)];
    for (description, completed) in seed {
        let req = test::TestRequest::post()
            .uri("/api/tasks")
            .append_header(common::bearer(&user.token))
            .set_json(json!({ "description": description, "completed": completed }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
    }

    let list = |query: &'static str| {
        test::TestRequest::get()
            .uri(&format!("/api/tasks{}", query))
            .append_header(common::bearer(&user.token))
            .to_request()
    };

    let all: Vec<Task> = test::call_and_read_body_json(&app, list("")).await;
    assert_eq!(all.len(), 4);

    let done: Vec<Task> = test::call_and_read_body_json(&app, list("?completed=true")).await;
    assert_eq!(done.len(), 2);
    assert!(done.iter().all(|t| t.completed));

    let open: Vec<Task> = test::call_and_read_body_json(&app, list("?completed=false")).await;
    assert_eq!(open.len(), 2);
    assert!(open.iter().all(|t| !t.completed));

    let sorted: Vec<Task> =
        test::call_and_read_body_json(&app, list("?sortBy=description_desc")).await;
    let names: Vec<&str> = sorted.iter().map(|t| t.description.as_str()).collect();
    assert_eq!(names, vec!["delta", "charlie", "bravo", "alpha"]);

    let page: Vec<Task> =
        test::call_and_read_body_json(&app, list("?sortBy=description_asc&limit=2&skip=1")).await;
    let names: Vec<&str> = page.iter().map(|t| t.description.as_str()).collect();
    assert_eq!(names, vec!["bravo", "charlie"]);

    let unpaged: Vec<Task> = test::call_and_read_body_json(&app, list("?limit=lots")).await;
    assert_eq!(unpaged.len(), 4);

    common::cleanup_user(&pool, &email).await;
}

#[ignore = "requires DATABASE_URL"]
#[actix_rt::test]
async fn test_task_ownership_and_authorization() {
    let pool = common::db_pool().await;
    let app = init_app!(pool.clone()).await;
    let email_a = common::unique_email("owner-a");
    let email_b = common::unique_email("other-b");
    let user_a = common::register_user(&app, "Owner A", &email_a).await;
    let user_b = common::register_user(&app, "Other B", &email_b).await;

    let req = test::TestRequest::post()
        .uri("/api/tasks")
        .append_header(common::bearer(&user_a.token))
        .set_json(json!({ "description": "A's task" }))
        .to_request();
    let task_a: Task = test::call_and_read_body_json(&app, req).await;

    // B's list does not contain A's task
    let req = test::TestRequest::get()
        .uri("/api/tasks")
        .append_header(common::bearer(&user_b.token))
        .to_request();
    let tasks_for_b: Vec<Task> = test::call_and_read_body_json(&app, req).await;
    assert!(!tasks_for_b.iter().any(|t| t.id == task_a.id));

    // B cannot read, update or delete it
    let req = test::TestRequest::get()
        .uri(&format!("/api/tasks/{}", task_a.id))
        .append_header(common::bearer(&user_b.token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::patch()
        .uri(&format!("/api/tasks/{}", task_a.id))
        .append_header(common::bearer(&user_b.token))
        .set_json(json!({ "completed": true }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/tasks/{}", task_a.id))
        .append_header(common::bearer(&user_b.token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    // A still sees it unchanged
    let req = test::TestRequest::get()
        .uri(&format!("/api/tasks/{}", task_a.id))
        .append_header(common::bearer(&user_a.token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["completed"], false);

    common::cleanup_user(&pool, &email_a).await;
    common::cleanup_user(&pool, &email_b).await;
}
