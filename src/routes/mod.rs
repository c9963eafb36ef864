use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use crate::{
    handlers::{admin, auth, blog, comment, user},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

pub fn create_routes(state: AppState) -> Router {
    // 1. Rutas públicas (todo el mundo)
    let public_routes = Router::new()
        .route("/api/auth/register", post(auth::register_handler))
        .route("/api/auth/login", post(auth::login_handler))
        .route("/api/blogs", get(blog::list_blogs_handler))
        .route("/api/blogs/:id", get(blog::get_blog_handler))
        .route("/api/blogs/:id/view", put(blog::increment_views_handler))
        // En comments el :id de la ruta GET es el id del blog
        .route("/api/comments/:id", get(comment::list_comments_handler))
        .route("/api/users/:id", get(user::get_user_profile_handler));

    // 2. Rutas autenticadas (cualquier usuario con token válido)
    let protected_routes = Router::new()
        .route("/api/auth/me", get(auth::me_handler))
        .route("/api/auth/profile", put(auth::update_profile_handler))
        .route("/api/blogs", post(blog::create_blog_handler))
        .route("/api/blogs/my-blogs", get(blog::my_blogs_handler))
        .route(
            "/api/blogs/:id",
            put(blog::update_blog_handler).delete(blog::delete_blog_handler),
        )
        .route("/api/blogs/:id/like", put(blog::like_blog_handler))
        .route("/api/comments", post(comment::create_comment_handler))
        .route(
            "/api/comments/:id",
            put(comment::update_comment_handler).delete(comment::delete_comment_handler),
        )
        .route("/api/comments/:id/like", put(comment::like_comment_handler))
        .route("/api/comments/:id/reply", post(comment::reply_handler))
        .route_layer(middleware::from_fn(auth_middleware));

    // 3. Rutas de ADMIN (moderación)
    let admin_routes = Router::new()
        .route("/api/admin/stats", get(admin::stats_handler))
        .route("/api/admin/blogs", get(admin::list_blogs_handler))
        .route("/api/admin/users", get(admin::list_users_handler))
        .route("/api/admin/blogs/:id", delete(admin::delete_blog_handler))
        .route(
            "/api/admin/users/:id/toggle-status",
            put(admin::toggle_user_status_handler),
        )
        .route_layer(middleware::from_fn(admin_middleware));

    // Fusionamos todo
    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(admin_routes)
        .with_state(state)
}
