use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::AppState;

/// Build the application router with all routes
pub fn build(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(handlers::healthcheck))
        // Switch routes
        .route("/api/switches", get(handlers::switches::list_switches))
        .route("/api/switches", post(handlers::switches::create_switch))
        .route("/api/switches/:id", get(handlers::switches::get_switch))
        .route("/api/switches/:id", put(handlers::switches::update_switch))
        .route("/api/switches/:id", delete(handlers::switches::delete_switch))
        .route("/api/switches/:id/ports", get(handlers::switches::list_ports))
        .route("/api/switches/:id/ports/recreate", post(handlers::switches::recreate_ports))
        .route("/api/switches/:id/ports/add", post(handlers::switches::add_ports))
        .route("/api/switch-ports/:id/disconnect", post(handlers::switches::disconnect_port))
        // Direct connection routes
        .route("/api/connections", get(handlers::connections::list_connections))
        .route("/api/connections", post(handlers::connections::create_connection))
        .route("/api/connections/:id", delete(handlers::connections::remove_connection))
        // Patch panel routes
        .route("/api/patch-panels", get(handlers::patch_panels::list_panels))
        .route("/api/patch-panels", post(handlers::patch_panels::create_panel))
        .route("/api/patch-panels/:id", get(handlers::patch_panels::get_panel))
        .route("/api/patch-panels/:id", put(handlers::patch_panels::update_panel))
        .route("/api/patch-panels/:id", delete(handlers::patch_panels::delete_panel))
        .route("/api/patch-panels/:id/ports", get(handlers::patch_panels::list_ports))
        .route("/api/patch-ports/:id/mapping", put(handlers::patch_panels::map_port))
        .route("/api/patch-ports/:id/equipment", post(handlers::patch_panels::connect_equipment))
        .route("/api/patch-ports/:id/equipment", delete(handlers::patch_panels::disconnect_equipment))
        // Room routes
        .route("/api/rooms", get(handlers::rooms::list_rooms))
        .route("/api/rooms", post(handlers::rooms::create_room))
        .route("/api/rooms/:id", get(handlers::rooms::get_room))
        .route("/api/rooms/:id", put(handlers::rooms::update_room))
        .route("/api/rooms/:id", delete(handlers::rooms::delete_room))
        .route("/api/rooms/:id/switches", get(handlers::rooms::list_switches))
        .route("/api/rooms/:id/equipment", put(handlers::rooms::reassign_equipment))
        .route("/api/rooms/:id/cable-connections", get(handlers::rooms::list_cable_connections))
        // Equipment routes
        .route("/api/equipment", get(handlers::equipment::list_equipment))
        .route("/api/equipment", post(handlers::equipment::create_equipment))
        .route("/api/equipment/:id", get(handlers::equipment::get_equipment))
        .route("/api/equipment/:id", put(handlers::equipment::update_equipment))
        .route("/api/equipment/:id", delete(handlers::equipment::delete_equipment))
        .route("/api/equipment/:id/room", put(handlers::equipment::assign_room))
        .route("/api/equipment/:id/room", delete(handlers::equipment::unlink_room))
        .route("/api/equipment/:id/defective", put(handlers::equipment::mark_defective))
        .route("/api/equipment/:id/patch-info", get(handlers::equipment::patch_info))
        // Cable inventory routes
        .route("/api/cables", get(handlers::cables::list_cables))
        .route("/api/cables", post(handlers::cables::register_cable))
        .route("/api/cables/:id", get(handlers::cables::get_cable))
        .route("/api/cables/:id", put(handlers::cables::update_cable))
        .route("/api/cables/:id", delete(handlers::cables::delete_cable))
        .route("/api/cables/:id/defective", post(handlers::cables::mark_defective))
        .route("/api/cables/:id/repair", post(handlers::cables::repair))
        .route("/api/cable-connections", get(handlers::cables::list_open_connections))
        .route("/api/cable-connections", post(handlers::cables::create_connection))
        .route("/api/cable-connections/:id", delete(handlers::cables::close_connection))
        // Reachability routes
        .route("/api/reachability/sweep", post(handlers::reachability::sweep))
        .route("/api/reachability/logs", get(handlers::reachability::list_logs))
        .route("/api/reachability/logs", delete(handlers::reachability::clear_logs))
        // Consistency audit
        .route("/api/consistency", get(handlers::consistency::check))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::stores;
    use crate::status::PingProber;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    async fn send(app: &Router, method: &str, uri: &str, body: Option<serde_json::Value>) -> (StatusCode, serde_json::Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => request
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn test_routes_map_errors_to_status_codes() {
        let (_dir, stores) = stores().await;
        let (_, store) = stores.into_iter().next().unwrap();
        let app = build(Arc::new(AppState {
            store,
            prober: Arc::new(PingProber::new(1)),
        }));

        let (status, body) = send(&app, "GET", "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "patchbay");

        let (status, switch) = send(
            &app,
            "POST",
            "/api/switches",
            Some(serde_json::json!({"name": "SW-01", "brand": "Acme", "model": "X", "port_count": 8})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let switch_id = switch["id"].as_i64().unwrap();

        let (status, ports) = send(&app, "GET", &format!("/api/switches/{}/ports", switch_id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ports.as_array().unwrap().len(), 8);
        assert_eq!(ports[0]["status"], "free");

        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/switches/{}/ports/add", switch_id),
            Some(serde_json::json!({"extra_count": i32::MAX})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&app, "GET", "/api/switches/424242", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "switch not found: 424242");

        let (status, _) = send(
            &app,
            "POST",
            "/api/rooms",
            Some(serde_json::json!({"name": "  "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, report) = send(&app, "GET", "/api/consistency", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(report["violations"].as_array().unwrap().is_empty());
    }
}
