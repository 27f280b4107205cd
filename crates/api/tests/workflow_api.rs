//! End-to-end approval workflow through the HTTP API against a real
//! database.
//!
//! Requires `DATABASE_URL`; compiled only with `--features integration-tests`.
#![cfg(feature = "integration-tests")]

mod common;

use std::time::Duration;

use assert_matches::assert_matches;
use axum::http::{Method, StatusCode};
use axum::Router;
use ctrack_core::capability::{Capability, CapabilitySet};
use ctrack_core::roles::Role;
use serde_json::{json, Value};
use sqlx::PgPool;

use common::{build_test_app, caps, send, test_state, token};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Staff member who may add, edit and delete but not approve.
fn staff() -> String {
    token(
        10,
        Role::Staff,
        caps(&[Capability::Add, Capability::Edit, Capability::Delete]),
    )
}

/// Department head holding every capability.
fn approver() -> String {
    token(20, Role::DepartmentHead, CapabilitySet::all())
}

fn category(name: &str) -> Value {
    json!({
        "type": "category",
        "name": name,
        "allocatedUnit": "Điện lực Hoàn Kiếm",
        "location": "Hàng Bài",
        "scale": "2 km cáp ngầm",
    })
}

async fn create(app: &Router, body: Value) -> Value {
    let (status, json) = send(app, Method::POST, "/api/projects", Some(&staff()), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    json
}

async fn get(app: &Router, id: i64) -> (StatusCode, Value) {
    send(app, Method::GET, &format!("/api/projects/{id}"), Some(&staff()), None).await
}

async fn transition(app: &Router, id: i64, action: &str, token: &str) -> (StatusCode, Value) {
    send(
        app,
        Method::PATCH,
        &format!("/api/projects/{id}/{action}"),
        Some(token),
        None,
    )
    .await
}

async fn approved(app: &Router, name: &str) -> i64 {
    let id = create(app, category(name)).await["id"].as_i64().unwrap();
    let (status, _) = transition(app, id, "approve", &approver()).await;
    assert_eq!(status, StatusCode::OK);
    id
}

// ---------------------------------------------------------------------------
// Create and serials
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_assigns_per_type_serials_and_starts_pending(pool: PgPool) {
    let app = build_test_app(test_state(pool));

    let a = create(&app, category("A")).await;
    let b = create(&app, category("B")).await;
    let r = create(
        &app,
        json!({
            "type": "minor_repair",
            "name": "R",
            "allocatedUnit": "Điện lực Đống Đa",
            "location": "Khâm Thiên",
        }),
    )
    .await;

    assert_eq!(a["categorySerialNumber"], 1);
    assert_eq!(b["categorySerialNumber"], 2);
    assert_eq!(r["minorRepairSerialNumber"], 1);
    assert!(r["categorySerialNumber"].is_null());
    assert_eq!(a["status"], "Chờ duyệt");
    assert_eq!(a["enteredBy"], "user10");
    assert_eq!(a["pendingDelete"], false);
    assert!(a["pendingEdit"].is_null());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_validates_the_type_dependent_scale(pool: PgPool) {
    let app = build_test_app(test_state(pool));
    let mut body = category("A");
    body.as_object_mut().unwrap().remove("scale");

    let (status, json) = send(&app, Method::POST, "/api/projects", Some(&staff()), Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_without_add_is_forbidden_and_writes_nothing(pool: PgPool) {
    let app = build_test_app(test_state(pool));
    let viewer = token(30, Role::Viewer, CapabilitySet::empty());

    let (status, _) = send(&app, Method::POST, "/api/projects", Some(&viewer), Some(category("A"))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, page) = send(&app, Method::GET, "/api/projects", Some(&viewer), None).await;
    assert_eq!(page["total"], 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn deleting_a_project_renumbers_its_type(pool: PgPool) {
    let app = build_test_app(test_state(pool));
    let a = create(&app, category("A")).await["id"].as_i64().unwrap();
    let b = create(&app, category("B")).await["id"].as_i64().unwrap();

    let (status, json) = send(&app, Method::DELETE, &format!("/api/projects/{a}"), Some(&staff()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["renumbered"], 1);

    let (status, _) = get(&app, a).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, project) = get(&app, b).await;
    assert_eq!(project["categorySerialNumber"], 1);

    let c = create(&app, category("C")).await;
    assert_eq!(c["categorySerialNumber"], 2);
}

// ---------------------------------------------------------------------------
// Staged edits
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn non_approver_edit_of_approved_project_is_staged_then_applied(pool: PgPool) {
    let app = build_test_app(test_state(pool));
    let id = approved(&app, "A").await;

    let (status, staged) = send(
        &app,
        Method::PATCH,
        &format!("/api/projects/{id}"),
        Some(&staff()),
        Some(json!({"location": "Tràng Tiền"})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(staged["location"], "Hàng Bài");
    assert_eq!(staged["pendingEdit"], json!({"location": "Tràng Tiền"}));

    let (status, applied) = transition(&app, id, "approve-edit", &approver()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(applied["location"], "Tràng Tiền");
    assert!(applied["pendingEdit"].is_null());
    assert_eq!(applied["status"], "Đã duyệt");

    let (_, notifications) = send(
        &app,
        Method::GET,
        "/api/notifications?status=pending",
        Some(&staff()),
        None,
    )
    .await;
    let open_edits = notifications
        .as_array()
        .unwrap()
        .iter()
        .filter(|n| n["type"] == "edit")
        .count();
    assert_eq!(open_edits, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn a_second_staged_edit_replaces_the_first(pool: PgPool) {
    let app = build_test_app(test_state(pool));
    let id = approved(&app, "A").await;
    let uri = format!("/api/projects/{id}");

    send(&app, Method::PATCH, &uri, Some(&staff()), Some(json!({"location": "X"}))).await;
    let (status, staged) =
        send(&app, Method::PATCH, &uri, Some(&staff()), Some(json!({"notes": "Y"}))).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(staged["pendingEdit"], json!({"notes": "Y"}));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn approver_edits_apply_directly(pool: PgPool) {
    let app = build_test_app(test_state(pool));
    let id = approved(&app, "A").await;

    let (status, json) = send(
        &app,
        Method::PATCH,
        &format!("/api/projects/{id}"),
        Some(&approver()),
        Some(json!({"name": "A2"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "A2");
    assert!(json["pendingEdit"].is_null());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn changing_the_type_is_rejected(pool: PgPool) {
    let app = build_test_app(test_state(pool));
    let id = create(&app, category("A")).await["id"].as_i64().unwrap();

    let (status, json) = send(
        &app,
        Method::PATCH,
        &format!("/api/projects/{id}"),
        Some(&staff()),
        Some(json!({"type": "minor_repair", "name": "B"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
    let (_, project) = get(&app, id).await;
    assert_eq!(project["name"], "A");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn approve_edit_without_a_stage_is_a_client_error(pool: PgPool) {
    let app = build_test_app(test_state(pool));
    let id = approved(&app, "A").await;

    let (status, _) = transition(&app, id, "approve-edit", &approver()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn rejected_edit_is_discarded_and_its_notification_closed(pool: PgPool) {
    let app = build_test_app(test_state(pool));
    let id = approved(&app, "A").await;

    let (status, _) = send(
        &app,
        Method::PATCH,
        &format!("/api/projects/{id}"),
        Some(&staff()),
        Some(json!({"location": "Tràng Tiền"})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, rejected) = transition(&app, id, "reject-edit", &approver()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(rejected["pendingEdit"].is_null());
    assert_eq!(rejected["location"], "Hàng Bài");
    assert_eq!(rejected["status"], "Đã duyệt");

    let (_, project) = get(&app, id).await;
    assert!(project["pendingEdit"].is_null());
    assert_eq!(project["location"], "Hàng Bài");

    let (_, notifications) = send(
        &app,
        Method::GET,
        "/api/notifications?status=pending",
        Some(&staff()),
        None,
    )
    .await;
    let open_edits = notifications
        .as_array()
        .unwrap()
        .iter()
        .filter(|n| n["type"] == "edit" && n["projectId"] == id)
        .count();
    assert_eq!(open_edits, 0);

    // Nothing left to discard.
    let (status, again) = transition(&app, id, "reject-edit", &approver()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(again["pendingEdit"].is_null());
    assert_eq!(again["location"], "Hàng Bài");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn edited_text_is_trimmed(pool: PgPool) {
    let app = build_test_app(test_state(pool));
    let id = create(&app, category("A")).await["id"].as_i64().unwrap();

    let (status, json) = send(
        &app,
        Method::PATCH,
        &format!("/api/projects/{id}"),
        Some(&staff()),
        Some(json!({"name": "  A2 ", "location": " Tràng Tiền"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["name"], "A2");
    assert_eq!(json["location"], "Tràng Tiền");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn a_blank_name_is_rejected_on_edit(pool: PgPool) {
    let app = build_test_app(test_state(pool));
    let id = create(&app, category("A")).await["id"].as_i64().unwrap();

    let (status, json) = send(
        &app,
        Method::PATCH,
        &format!("/api/projects/{id}"),
        Some(&staff()),
        Some(json!({"name": "   "})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
    let (_, project) = get(&app, id).await;
    assert_eq!(project["name"], "A");
}

// ---------------------------------------------------------------------------
// Staged deletes
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn rejected_delete_keeps_the_project(pool: PgPool) {
    let app = build_test_app(test_state(pool));
    let id = approved(&app, "A").await;

    let (status, staged) =
        send(&app, Method::DELETE, &format!("/api/projects/{id}"), Some(&staff()), None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(staged["pendingDelete"], true);

    let (status, json) = transition(&app, id, "reject-delete", &approver()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["pendingDelete"], false);

    let (status, _) = get(&app, id).await;
    assert_eq!(status, StatusCode::OK);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn approved_delete_removes_and_renumbers(pool: PgPool) {
    let app = build_test_app(test_state(pool));
    let a = approved(&app, "A").await;
    let b = approved(&app, "B").await;

    send(&app, Method::DELETE, &format!("/api/projects/{a}"), Some(&staff()), None).await;
    let (status, json) = transition(&app, a, "approve-delete", &approver()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["renumbered"], 1);

    let (_, project) = get(&app, b).await;
    assert_eq!(project["categorySerialNumber"], 1);

    let (_, pending) = send(
        &app,
        Method::GET,
        "/api/notifications?status=pending",
        Some(&staff()),
        None,
    )
    .await;
    assert!(pending
        .as_array()
        .unwrap()
        .iter()
        .all(|n| n["projectId"] != a));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn staging_an_edit_over_a_pending_delete_conflicts(pool: PgPool) {
    let app = build_test_app(test_state(pool));
    let id = approved(&app, "A").await;
    send(&app, Method::DELETE, &format!("/api/projects/{id}"), Some(&staff()), None).await;

    let (status, json) = send(
        &app,
        Method::PATCH,
        &format!("/api/projects/{id}"),
        Some(&staff()),
        Some(json!({"notes": "x"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "CONFLICT");
    let (_, project) = get(&app, id).await;
    assert_eq!(project["pendingDelete"], true);
    assert!(project["pendingEdit"].is_null());
}

// ---------------------------------------------------------------------------
// Status, allocation, listing, notifications
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn non_approver_cannot_approve(pool: PgPool) {
    let app = build_test_app(test_state(pool));
    let id = create(&app, category("A")).await["id"].as_i64().unwrap();

    let (status, _) = transition(&app, id, "approve", &staff()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, project) = get(&app, id).await;
    assert_eq!(project["status"], "Chờ duyệt");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn reject_then_approve_is_allowed_by_default(pool: PgPool) {
    let app = build_test_app(test_state(pool));
    let id = create(&app, category("A")).await["id"].as_i64().unwrap();

    let (_, rejected) = transition(&app, id, "reject", &approver()).await;
    assert_eq!(rejected["status"], "Từ chối");
    let (status, json) = transition(&app, id, "approve", &approver()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "Đã duyệt");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn allocate_and_assign_need_their_own_capability(pool: PgPool) {
    let app = build_test_app(test_state(pool));
    let id = create(&app, category("A")).await["id"].as_i64().unwrap();
    let allocator = token(40, Role::TeamLeader, caps(&[Capability::Allocate]));

    let (status, json) = send(
        &app,
        Method::PATCH,
        &format!("/api/projects/{id}/allocate"),
        Some(&allocator),
        Some(json!({"allocationWave": "Đợt 3"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["allocationWave"], "Đợt 3");

    let (status, _) = send(
        &app,
        Method::PATCH,
        &format!("/api/projects/{id}/assign"),
        Some(&allocator),
        Some(json!({"assignedTo": "kysu01"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn listing_is_paginated_and_filtered(pool: PgPool) {
    let app = build_test_app(test_state(pool));
    for name in ["A", "B", "C"] {
        create(&app, category(name)).await;
    }
    create(
        &app,
        json!({
            "type": "minor_repair",
            "name": "R",
            "allocatedUnit": "Điện lực Tây Hồ",
            "location": "Nhật Tân",
        }),
    )
    .await;

    let (status, page) = send(
        &app,
        Method::GET,
        "/api/projects?type=category&page=2&limit=2",
        Some(&staff()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 3);
    assert_eq!(page["page"], 2);
    assert_eq!(page["pages"], 2);
    let projects = page["projects"].as_array().unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0]["categorySerialNumber"], 3);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn notifications_are_listed_and_processed_once(pool: PgPool) {
    let app = build_test_app(test_state(pool));
    let project = create(&app, category("A")).await;

    let (_, list) = send(&app, Method::GET, "/api/notifications", Some(&staff()), None).await;
    let first = &list.as_array().unwrap()[0];
    assert_eq!(first["type"], "new");
    assert_eq!(first["projectId"], project["id"]);
    assert_eq!(first["status"], "pending");
    let nid = first["id"].as_i64().unwrap();

    let uri = format!("/api/notifications/{nid}");
    let body = json!({"status": "processed"});
    let (status, processed) = send(&app, Method::PATCH, &uri, Some(&staff()), Some(body.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(processed["status"], "processed");
    let (status, again) = send(&app, Method::PATCH, &uri, Some(&staff()), Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["processedAt"], processed["processedAt"]);

    let (status, _) = send(
        &app,
        Method::PATCH,
        "/api/notifications/999999",
        Some(&staff()),
        Some(json!({"status": "processed"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn committed_notifications_reach_the_event_bus(pool: PgPool) {
    let state = test_state(pool);
    let mut events = state.event_bus.subscribe();
    let app = build_test_app(state);

    let project = create(&app, category("A")).await;

    let event = tokio::time::timeout(Duration::from_secs(2), events.recv())
        .await
        .expect("timed out waiting for the notification event");
    let event = assert_matches!(event, Ok(event) => event);
    assert_eq!(event.event, "notification");
    assert_eq!(event.data["type"], "new");
    assert_eq!(event.project_id, project["id"].as_i64());
    assert_eq!(event.actor_user_id, Some(10));
}

// ---------------------------------------------------------------------------
// Users and reference data
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn admins_manage_users_and_logins_work(pool: PgPool) {
    let app = build_test_app(test_state(pool));
    let admin = token(1, Role::Admin, CapabilitySet::empty());

    let (status, created) = send(
        &app,
        Method::POST,
        "/api/users",
        Some(&admin),
        Some(json!({
            "username": "nhanvien01",
            "password": "mat-khau-123",
            "role": "staff",
            "permissions": {"add": true},
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(created.get("passwordHash").is_none());
    let user_id = created["id"].as_i64().unwrap();

    let (status, login) = send(
        &app,
        Method::POST,
        "/api/login",
        None,
        Some(json!({"username": "nhanvien01", "password": "mat-khau-123"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(login["user"]["permissions"]["add"], true);
    let issued = login["token"].as_str().unwrap().to_string();
    let (status, me) = send(&app, Method::GET, "/api/me", Some(&issued), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], user_id);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/login",
        None,
        Some(json!({"username": "nhanvien01", "password": "wrong-password"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, patched) = send(
        &app,
        Method::PATCH,
        &format!("/api/users/{user_id}"),
        Some(&admin),
        Some(json!({"permissions": {"approve": true}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["permissions"]["add"], true);
    assert_eq!(patched["permissions"]["approve"], true);

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/users/{user_id}"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn admin_accounts_cannot_be_deleted(pool: PgPool) {
    let app = build_test_app(test_state(pool));
    let admin = token(1, Role::Admin, CapabilitySet::empty());
    let (_, other) = send(
        &app,
        Method::POST,
        "/api/users",
        Some(&admin),
        Some(json!({"username": "quantri2", "password": "mat-khau-123", "role": "admin"})),
    )
    .await;

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/users/{}", other["id"]),
        Some(&admin),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn reference_names_are_unique_per_vocabulary(pool: PgPool) {
    let app = build_test_app(test_state(pool));
    let body = json!({"name": "  Đợt 1 "});

    let (status, wave) = send(&app, Method::POST, "/api/allocation-waves", Some(&staff()), Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(wave["name"], "Đợt 1");

    let (status, json) = send(&app, Method::POST, "/api/allocation-waves", Some(&staff()), Some(body.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "DUPLICATE");

    // Same name in a different vocabulary is fine.
    let (status, _) = send(&app, Method::POST, "/api/allocated-units", Some(&staff()), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/allocation-waves/{}", wave["id"]),
        Some(&staff()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, list) = send(&app, Method::GET, "/api/allocation-waves", Some(&staff()), None).await;
    assert_eq!(list, json!([]));
}
