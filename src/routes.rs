// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, college, student, test_session},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Public: auth.
/// * Authenticated: test session, results, student profile, colleges.
/// * Admin: question bank, question generation, college catalogue and directory import.
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let test_routes = Router::new()
        .route(
            "/session",
            post(test_session::open_session).get(test_session::get_session),
        )
        .route("/session/start", post(test_session::start_session))
        .route("/session/answer", put(test_session::record_answer))
        .route("/session/navigate", put(test_session::navigate))
        .route("/session/submit", post(test_session::submit))
        .route("/session/persist", post(test_session::retry_persist))
        .route("/result", get(test_session::get_result))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let student_routes = Router::new()
        .route("/me", get(student::get_me).put(student::update_me))
        .route("/me/preferences", put(student::update_preferences))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let college_routes = Router::new()
        .route("/", get(college::list_colleges))
        .route("/{id}", get(college::get_college))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let admin_routes = Router::new()
        .route(
            "/questions",
            get(admin::list_questions).post(admin::create_question),
        )
        .route(
            "/questions/{id}",
            put(admin::update_question).delete(admin::delete_question),
        )
        .route("/questions/generate", post(admin::generate_questions))
        .route("/questions/batch", post(admin::save_question_batch))
        .route("/colleges", post(admin::create_college))
        .route("/colleges/search", get(admin::search_colleges))
        .route("/colleges/import", post(admin::import_colleges))
        .route(
            "/colleges/{id}",
            put(admin::update_college).delete(admin::delete_college),
        )
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/test", test_routes)
        .nest("/api/students", student_routes)
        .nest("/api/colleges", college_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (outermost first)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
