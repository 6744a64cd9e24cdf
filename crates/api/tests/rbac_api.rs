//! Integration tests for the permission gate and the role, permission and
//! user administration routes.

mod common;

use std::collections::BTreeSet;

use axum::http::StatusCode;
use common::{
    body_json, build_test_app, create_user, delete_auth, delete_json_auth, get_auth, grant,
    make_super_admin, permission_id, post_json_auth, put_json_auth, user_with_token,
};
use serde_json::json;
use sqlx::PgPool;
use workhub_api::rbac::service::{
    CreatePermissionRequest, CreateRoleRequest, PermissionIdsRequest, UpdateRoleRequest,
};
use workhub_api::rbac::AuthorizationService;
use workhub_core::types::DbId;

async fn create_permission(service: &AuthorizationService, code: &str) -> DbId {
    service
        .create_permission(&CreatePermissionRequest {
            name: format!("Permission {code}"),
            code: code.to_string(),
            action: "read".to_string(),
            description: None,
        })
        .await
        .unwrap()
        .id
}

async fn create_role(service: &AuthorizationService, code: &str, permissions: Vec<DbId>) -> DbId {
    let role = service
        .create_role(&CreateRoleRequest {
            name: format!("Role {code}"),
            code: code.to_string(),
            description: None,
            is_active: None,
        })
        .await
        .unwrap();
    service
        .assign_permissions_to_role(
            role.id,
            &PermissionIdsRequest {
                permission_ids: permissions,
            },
        )
        .await
        .unwrap();
    role.id
}

async fn codes(service: &AuthorizationService, user_id: DbId) -> BTreeSet<String> {
    service
        .get_user_permissions(user_id)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.code)
        .collect()
}

// ---------------------------------------------------------------------------
// Permission gate
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn gate_names_the_missing_permission(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let (admin, admin_token) = user_with_token(&pool, app.clone(), "admin").await;
    make_super_admin(&pool, admin.id).await;
    let (user, token) = user_with_token(&pool, app.clone(), "alice").await;

    let target = post_json_auth(
        app.clone(),
        "/api/v1/roles",
        json!({ "name": "Doomed", "code": "doomed" }),
        &admin_token,
    )
    .await;
    assert_eq!(target.status(), StatusCode::CREATED);
    let target_id = body_json(target).await["data"]["id"].as_str().unwrap().to_string();
    let uri = format!("/api/v1/roles/{target_id}");

    // No role.delete yet.
    let response = delete_auth(app.clone(), &uri, &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_json(response).await;
    assert_eq!(json["code"], "FORBIDDEN");
    assert!(json["error"].as_str().unwrap().contains("role.delete"));

    // Grant it through the admin API.
    let deleter = post_json_auth(
        app.clone(),
        "/api/v1/roles",
        json!({ "name": "Deleter", "code": "deleter" }),
        &admin_token,
    )
    .await;
    let deleter_id = body_json(deleter).await["data"]["id"].as_str().unwrap().to_string();
    let role_delete = permission_id(&pool, "role.delete").await;
    let response = post_json_auth(
        app.clone(),
        &format!("/api/v1/roles/{deleter_id}/permissions"),
        json!({ "permission_ids": [role_delete] }),
        &admin_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = post_json_auth(
        app.clone(),
        &format!("/api/v1/users/{}/roles", user.id),
        json!({ "role_ids": [deleter_id] }),
        &admin_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Same token, new permissions.
    let response = delete_auth(app.clone(), &uri, &token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = get_auth(app, &uri, &admin_token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn gate_runs_after_authentication(pool: PgPool) {
    let app = build_test_app(pool);

    let response = common::get(app, "/api/v1/roles").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn gate_fails_closed_when_store_is_unreachable(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let (user, token) = user_with_token(&pool, app.clone(), "alice").await;
    grant(&pool, user.id, "reader", &["role.read"]).await;

    pool.close().await;
    let response = get_auth(app, "/api/v1/roles", &token).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "An internal error occurred");
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn user_permissions_are_the_union_of_role_permissions(pool: PgPool) {
    let service = AuthorizationService::new(pool.clone());
    let user = create_user(&pool, "alice").await;
    let a = create_permission(&service, "report.a").await;
    let b = create_permission(&service, "report.b").await;
    let c = create_permission(&service, "report.c").await;
    let r1 = create_role(&service, "r1", vec![a, b]).await;
    let r2 = create_role(&service, "r2", vec![b, c]).await;
    workhub_db::repositories::RbacRepo::assign_roles_to_user(&pool, user.id, &[r1, r2])
        .await
        .unwrap();

    let expected: BTreeSet<String> = ["report.a", "report.b", "report.c"]
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(codes(&service, user.id).await, expected);
    assert_eq!(service.get_user_permissions(user.id).await.unwrap().len(), 3);
    assert!(service.user_has_permission(user.id, "report.b").await.unwrap());
    assert!(!service.user_has_permission(user.id, "report.d").await.unwrap());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn user_without_roles_has_no_permissions(pool: PgPool) {
    let service = AuthorizationService::new(pool.clone());
    let user = create_user(&pool, "alice").await;

    assert!(service.get_user_permissions(user.id).await.unwrap().is_empty());
    assert!(!service.user_has_permission(user.id, "role.read").await.unwrap());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn inactive_role_contributes_nothing(pool: PgPool) {
    let service = AuthorizationService::new(pool.clone());
    let user = create_user(&pool, "alice").await;
    let a = create_permission(&service, "report.a").await;
    let b = create_permission(&service, "report.b").await;
    let r1 = create_role(&service, "r1", vec![a]).await;
    let r2 = create_role(&service, "r2", vec![b]).await;
    workhub_db::repositories::RbacRepo::assign_roles_to_user(&pool, user.id, &[r1, r2])
        .await
        .unwrap();

    service
        .update_role(
            r1,
            &UpdateRoleRequest {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let expected: BTreeSet<String> = ["report.b".to_string()].into_iter().collect();
    assert_eq!(codes(&service, user.id).await, expected);
    assert!(!service.user_has_permission(user.id, "report.a").await.unwrap());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn deleted_permission_is_not_granted(pool: PgPool) {
    let service = AuthorizationService::new(pool.clone());
    let user = create_user(&pool, "alice").await;
    let a = create_permission(&service, "report.a").await;
    let r1 = create_role(&service, "r1", vec![a]).await;
    workhub_db::repositories::RbacRepo::assign_roles_to_user(&pool, user.id, &[r1])
        .await
        .unwrap();

    service.delete_permission(a).await.unwrap();

    assert!(!service.user_has_permission(user.id, "report.a").await.unwrap());
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn duplicate_role_code_is_rejected(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let (admin, token) = user_with_token(&pool, app.clone(), "admin").await;
    make_super_admin(&pool, admin.id).await;

    let first = post_json_auth(
        app.clone(),
        "/api/v1/roles",
        json!({ "name": "Editor", "code": "editor" }),
        &token,
    )
    .await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = post_json_auth(
        app,
        "/api/v1/roles",
        json!({ "name": "Editor two", "code": "editor" }),
        &token,
    )
    .await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(second).await["error"], "code is already taken");

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM roles WHERE code = 'editor'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn role_crud_round(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let (admin, token) = user_with_token(&pool, app.clone(), "admin").await;
    make_super_admin(&pool, admin.id).await;

    let created = post_json_auth(
        app.clone(),
        "/api/v1/roles",
        json!({ "name": "Editor", "code": "editor", "description": "Edits things" }),
        &token,
    )
    .await;
    let json = body_json(created).await;
    assert_eq!(json["data"]["is_active"], true);
    let id = json["data"]["id"].as_str().unwrap().to_string();
    let uri = format!("/api/v1/roles/{id}");

    let updated = put_json_auth(
        app.clone(),
        &uri,
        json!({ "name": "Senior editor" }),
        &token,
    )
    .await;
    assert_eq!(updated.status(), StatusCode::OK);
    let json = body_json(updated).await;
    assert_eq!(json["data"]["name"], "Senior editor");
    assert_eq!(json["data"]["code"], "editor");
    assert_eq!(json["data"]["description"], "Edits things");

    let fetched = get_auth(app.clone(), &uri, &token).await;
    assert_eq!(body_json(fetched).await["data"]["name"], "Senior editor");

    let missing = get_auth(
        app,
        &format!("/api/v1/roles/{}", uuid::Uuid::new_v4()),
        &token,
    )
    .await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn soft_deleted_role_disappears_but_keeps_rows(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let (admin, token) = user_with_token(&pool, app.clone(), "admin").await;
    make_super_admin(&pool, admin.id).await;
    let user = create_user(&pool, "alice").await;
    let role_id = grant(&pool, user.id, "reader", &["user.read"]).await;

    let response = delete_auth(app.clone(), &format!("/api/v1/roles/{role_id}"), &token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let list = get_auth(app.clone(), "/api/v1/roles?search=reader", &token).await;
    assert_eq!(body_json(list).await["total_items"], 0);

    let service = AuthorizationService::new(pool.clone());
    assert!(service.get_user_permissions(user.id).await.unwrap().is_empty());

    let (deleted, links): (bool, i64) = sqlx::query_as(
        "SELECT r.deleted_at IS NOT NULL, \
         (SELECT COUNT(*) FROM user_roles ur WHERE ur.role_id = r.id) \
         FROM roles r WHERE r.id = $1",
    )
    .bind(role_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert!(deleted);
    assert_eq!(links, 1);

    let again = delete_auth(app, &format!("/api/v1/roles/{role_id}"), &token).await;
    assert_eq!(again.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn role_listing_is_paginated_and_searchable(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let (admin, token) = user_with_token(&pool, app.clone(), "admin").await;
    make_super_admin(&pool, admin.id).await;
    for i in 0..3 {
        let response = post_json_auth(
            app.clone(),
            "/api/v1/roles",
            json!({ "name": format!("Team {i}"), "code": format!("team_{i}") }),
            &token,
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    // Three teams plus the seeded super_admin.
    let response = get_auth(app.clone(), "/api/v1/roles?page=2&page_size=3", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["total_items"], 4);
    assert_eq!(json["total_pages"], 2);
    assert_eq!(json["current_page"], 2);
    assert_eq!(json["page_size"], 3);
    assert_eq!(json["items"].as_array().unwrap().len(), 1);

    let response = get_auth(app, "/api/v1/roles?search=team", &token).await;
    let json = body_json(response).await;
    assert_eq!(json["total_items"], 3);
    assert_eq!(json["current_page"], 1);
    assert_eq!(json["page_size"], 10);
}

// ---------------------------------------------------------------------------
// Role <-> permission
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn assigning_permissions_is_idempotent(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let (admin, token) = user_with_token(&pool, app.clone(), "admin").await;
    make_super_admin(&pool, admin.id).await;
    let service = AuthorizationService::new(pool.clone());
    let role_id = create_role(&service, "editor", vec![]).await;
    let read = permission_id(&pool, "role.read").await;
    let uri = format!("/api/v1/roles/{role_id}/permissions");

    for _ in 0..2 {
        let response = post_json_auth(
            app.clone(),
            &uri,
            json!({ "permission_ids": [read, read] }),
            &token,
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    let response = get_auth(app.clone(), &uri, &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["code"], "editor");
    assert_eq!(json["data"]["permissions"]["total_items"], 1);
    assert_eq!(json["data"]["permissions"]["items"][0]["code"], "role.read");

    let response = delete_json_auth(
        app.clone(),
        &uri,
        json!({ "permission_ids": [read] }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = get_auth(app, &uri, &token).await;
    assert_eq!(body_json(response).await["data"]["permissions"]["total_items"], 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn assigning_unknown_permission_changes_nothing(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let (admin, token) = user_with_token(&pool, app.clone(), "admin").await;
    make_super_admin(&pool, admin.id).await;
    let service = AuthorizationService::new(pool.clone());
    let role_id = create_role(&service, "editor", vec![]).await;
    let read = permission_id(&pool, "role.read").await;

    let response = post_json_auth(
        app,
        &format!("/api/v1/roles/{role_id}/permissions"),
        json!({ "permission_ids": [read, uuid::Uuid::new_v4()] }),
        &token,
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM role_permissions WHERE role_id = $1")
            .bind(role_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(count, 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn empty_id_list_is_a_validation_error(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let (admin, token) = user_with_token(&pool, app.clone(), "admin").await;
    make_super_admin(&pool, admin.id).await;
    let service = AuthorizationService::new(pool.clone());
    let role_id = create_role(&service, "editor", vec![]).await;

    let response = post_json_auth(
        app.clone(),
        &format!("/api/v1/roles/{role_id}/permissions"),
        json!({ "permission_ids": [] }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json_auth(
        app,
        &format!("/api/v1/users/{}/roles", admin.id),
        json!({ "role_ids": [] }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

// ---------------------------------------------------------------------------
// Permissions
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn permission_code_must_be_well_formed(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let (admin, token) = user_with_token(&pool, app.clone(), "admin").await;
    make_super_admin(&pool, admin.id).await;

    let response = post_json_auth(
        app.clone(),
        "/api/v1/permissions",
        json!({ "name": "Bad", "code": "Report Read", "action": "read" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json_auth(
        app.clone(),
        "/api/v1/permissions",
        json!({ "name": "Read reports", "code": "report.read", "action": "read" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = post_json_auth(
        app,
        "/api/v1/permissions",
        json!({ "name": "Read reports again", "code": "report.read", "action": "read" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn permission_listing_includes_seeded_codes(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let (admin, token) = user_with_token(&pool, app.clone(), "admin").await;
    make_super_admin(&pool, admin.id).await;

    let response = get_auth(app.clone(), "/api/v1/permissions?page_size=100", &token).await;
    let json = body_json(response).await;
    assert_eq!(
        json["total_items"],
        workhub_core::permissions::ALL.len() as i64
    );

    let response = get_auth(app, "/api/v1/permissions?search=role.", &token).await;
    assert_eq!(body_json(response).await["total_items"], 5);
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn user_roles_and_permissions_are_visible(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let (admin, token) = user_with_token(&pool, app.clone(), "admin").await;
    make_super_admin(&pool, admin.id).await;
    let user = create_user(&pool, "alice").await;
    let role_id = grant(&pool, user.id, "reader", &["role.read"]).await;

    let response = get_auth(app.clone(), &format!("/api/v1/users/{}/roles", user.id), &token).await;
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
    assert_eq!(json["data"][0]["id"], role_id.to_string());

    let response = get_auth(
        app.clone(),
        &format!("/api/v1/users/{}/permissions", user.id),
        &token,
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["data"][0]["code"], "role.read");

    let response = delete_json_auth(
        app.clone(),
        &format!("/api/v1/users/{}/roles", user.id),
        json!({ "role_ids": [role_id] }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = get_auth(app.clone(), "/api/v1/users?search=alice", &token).await;
    let json = body_json(response).await;
    assert_eq!(json["total_items"], 1);
    assert!(json["items"][0].get("password_hash").is_none());

    let response = get_auth(
        app,
        &format!("/api/v1/users/{}/roles", uuid::Uuid::new_v4()),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
