//! Router tests over the in-memory store

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use core_kernel::FixedClock;
use domain_leave::ports::mock::InMemoryLeaveStore;
use domain_leave::{Employee, LeaveService};
use interface_api::auth::{create_token, roles};
use interface_api::config::ApiConfig;
use interface_api::{create_router, AppState};
use test_utils::{DateFixtures, EmployeeBuilder, TEST_POLICY};

struct TestApp {
    router: Router,
    config: ApiConfig,
}

impl TestApp {
    async fn new(employees: Vec<Employee>) -> Self {
        let store = Arc::new(InMemoryLeaveStore::with_employees(employees).await);
        let clock = Arc::new(FixedClock::on_local_date(DateFixtures::weekday(), &TEST_POLICY.timezone));
        let service = LeaveService::bootstrap(store.clone(), store.clone(), store.clone(), clock, TEST_POLICY.clone())
            .await
            .unwrap();
        let config = ApiConfig {
            jwt_secret: "router-test-secret".to_string(),
            ..ApiConfig::default()
        };
        let router = create_router(AppState::new(Arc::new(service), store, config.clone()));
        Self { router, config }
    }

    fn token(&self, employee: &Employee, role_tags: &[&str]) -> String {
        create_token(
            employee.id,
            &employee.department,
            role_tags.iter().map(|r| r.to_string()).collect(),
            &self.config.jwt_secret,
            300,
        )
        .unwrap()
    }

    async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }
}

fn full_day(date: chrono::NaiveDate) -> Value {
    json!({ "category": "full_day", "start": date })
}

mod health_tests {
    use super::*;

    #[tokio::test]
    async fn test_health_is_public() {
        let app = TestApp::new(vec![]).await;
        let (status, body) = app.send(Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");

        let (status, _) = app.send(Method::GET, "/health/ready", None, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_api_requires_token() {
        let app = TestApp::new(vec![]).await;
        let (status, _) = app.send(Method::GET, "/api/v1/departments", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = app
            .send(Method::GET, "/api/v1/departments", Some("not-a-jwt"), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

mod leave_tests {
    use super::*;

    #[tokio::test]
    async fn test_admin_submission_returns_created_and_balances() {
        let admin = EmployeeBuilder::new().with_balances(0, 15).build();
        let app = TestApp::new(vec![admin.clone()]).await;
        let token = app.token(&admin, &[roles::ADMIN]);

        let (status, body) = app
            .send(Method::POST, "/api/v1/leave", Some(&token), Some(full_day(DateFixtures::weekday())))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["event"]["state"], "approved");
        assert_eq!(body["balances"]["entitled"], "14");
    }

    #[tokio::test]
    async fn test_error_kinds_map_to_status_codes() {
        let staff = EmployeeBuilder::new().build();
        let app = TestApp::new(vec![staff.clone()]).await;
        let token = app.token(&staff, &[]);
        let date = DateFixtures::weekday();

        let (status, body) = app
            .send(Method::POST, "/api/v1/leave", Some(&token), Some(full_day(date)))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let event_id = body["event"]["id"].as_str().unwrap().to_string();

        let (status, body) = app
            .send(Method::POST, "/api/v1/leave", Some(&token), Some(full_day(date)))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "conflict");

        let (status, _) = app
            .send(
                Method::POST,
                "/api/v1/leave",
                Some(&token),
                Some(json!({ "category": "half_day_morning", "start": date, "end": date.succ_opt() })),
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = app
            .send(Method::POST, &format!("/api/v1/leave/{}/approve", event_id), Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = app
            .send(
                Method::POST,
                &format!("/api/v1/leave/{}/approve", uuid::Uuid::new_v4()),
                Some(&token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_approve_then_cancel_round_trip() {
        let staff = EmployeeBuilder::new().with_balances(0, 10).build();
        let admin = EmployeeBuilder::new().build();
        let app = TestApp::new(vec![staff.clone(), admin.clone()]).await;
        let staff_token = app.token(&staff, &[]);
        let admin_token = app.token(&admin, &[roles::ADMIN]);

        let (_, body) = app
            .send(Method::POST, "/api/v1/leave", Some(&staff_token), Some(full_day(DateFixtures::weekday())))
            .await;
        let event_id = body["event"]["id"].as_str().unwrap().to_string();

        let (status, queue) = app
            .send(Method::GET, "/api/v1/leave/pending", Some(&admin_token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(queue.as_array().unwrap().len(), 1);

        let (status, body) = app
            .send(Method::POST, &format!("/api/v1/leave/{}/approve", event_id), Some(&admin_token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["balances"]["entitled"], "9");

        let (status, body) = app
            .send(Method::DELETE, &format!("/api/v1/leave/{}", event_id), Some(&staff_token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["was_approved"], true);
        assert_eq!(body["balances"]["entitled"], "10");
    }
}

mod month_tests {
    use super::*;

    #[tokio::test]
    async fn test_month_status_and_invalid_month() {
        let staff = EmployeeBuilder::new().build();
        let app = TestApp::new(vec![staff.clone()]).await;
        let token = app.token(&staff, &[]);

        let (status, body) = app
            .send(Method::GET, "/api/v1/months/ward/2024/3", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["locked"], false);
        assert_eq!(body["can_confirm"], false);

        let (status, _) = app
            .send(Method::GET, "/api/v1/months/ward/2024/13", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_export_requires_admin() {
        let staff = EmployeeBuilder::new().build();
        let admin = EmployeeBuilder::new().build();
        let app = TestApp::new(vec![staff.clone(), admin.clone()]).await;

        let (status, _) = app
            .send(Method::GET, "/api/v1/months/ward/2024/3/export", Some(&app.token(&staff, &[])), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = app
            .send(
                Method::GET,
                "/api/v1/months/ward/2024/3/export",
                Some(&app.token(&admin, &[roles::ADMIN])),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["events"].as_array().unwrap().is_empty());
    }
}

mod grant_tests {
    use super::*;

    #[tokio::test]
    async fn test_grant_validation_and_authorization() {
        let root = EmployeeBuilder::new().with_department("management").build();
        let nurse = EmployeeBuilder::new().build();
        let app = TestApp::new(vec![root.clone(), nurse.clone()]).await;
        let root_token = app.token(&root, &[roles::SUPERADMIN]);

        let (status, _) = app
            .send(
                Method::POST,
                "/api/v1/grants",
                Some(&root_token),
                Some(json!({ "employee_ids": [nurse.id], "days": "1", "reason": "" })),
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = app
            .send(
                Method::POST,
                "/api/v1/grants",
                Some(&app.token(&nurse, &[roles::ADMIN])),
                Some(json!({ "employee_ids": [nurse.id], "days": "1", "reason": "night shift" })),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = app
            .send(
                Method::POST,
                "/api/v1/grants",
                Some(&root_token),
                Some(json!({
                    "employee_ids": [nurse.id],
                    "days": "79228162514264337593543950335",
                    "reason": "night shift"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, body) = app
            .send(
                Method::POST,
                "/api/v1/grants",
                Some(&root_token),
                Some(json!({ "employee_ids": [nurse.id], "days": "1.5", "reason": "night shift" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["balances"][0]["balances"]["supplemental"], "1.5");

        let (status, history) = app
            .send(Method::GET, "/api/v1/grants", Some(&app.token(&nurse, &[])), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(history.as_array().unwrap().len(), 1);
    }
}

mod view_tests {
    use super::*;

    #[tokio::test]
    async fn test_calendar_and_departments() {
        let staff = EmployeeBuilder::new().build();
        let app = TestApp::new(vec![staff.clone()]).await;
        let token = app.token(&staff, &[]);

        app.send(Method::POST, "/api/v1/leave", Some(&token), Some(full_day(DateFixtures::weekday())))
            .await;

        let (status, events) = app
            .send(Method::GET, "/api/v1/calendar?year=2024&month=3&mine_only=true", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(events.as_array().unwrap().len(), 1);

        let (status, body) = app
            .send(Method::GET, "/api/v1/departments", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["default_view"], "ward");
    }

    #[tokio::test]
    async fn test_summary_of_self() {
        let staff = EmployeeBuilder::new().build();
        let app = TestApp::new(vec![staff.clone()]).await;

        let (status, body) = app
            .send(
                Method::GET,
                &format!("/api/v1/employees/{}/summary", staff.id.as_uuid()),
                Some(&app.token(&staff, &[])),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], staff.name.as_str());
        assert_eq!(body["approved_usage"], "0");
    }
}
