use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::{
    handlers::{
        blog::{attach_responses, destroy_blog, fetch_blog_record, total_pages, BLOG_SELECT},
        internal_error, not_found,
    },
    models::blog::{BlogRow, FilterOptions},
    models::user::User,
    state::AppState,
};

// GET /api/admin/stats - números globales + últimos 5 + 5 más populares
pub async fn stats_handler(State(state): State<AppState>) -> Response {
    let counts = sqlx::query_as::<_, (i64, i64, i64, i64)>(
        "SELECT (SELECT COUNT(*) FROM users), \
                (SELECT COUNT(*) FROM blogs), \
                (SELECT COUNT(*) FROM comments), \
                (SELECT COUNT(*) FROM users WHERE is_active = TRUE)",
    )
    .fetch_one(&state.pool)
    .await;

    let (total_users, total_blogs, total_comments, active_users) = match counts {
        Ok(counts) => counts,
        Err(e) => {
            tracing::error!("Error calculando estadísticas globales: {:?}", e);
            return internal_error();
        }
    };

    let recent = sqlx::query_as::<_, BlogRow>(&format!(
        "{BLOG_SELECT} ORDER BY b.created_at DESC LIMIT 5"
    ))
    .fetch_all(&state.pool)
    .await;

    let recent = match recent {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!("Error buscando blogs recientes: {:?}", e);
            return internal_error();
        }
    };

    // Popularidad: primero vistas, con los likes como desempate
    let popular = sqlx::query_as::<_, BlogRow>(&format!(
        "{BLOG_SELECT} ORDER BY b.views DESC, like_count DESC LIMIT 5"
    ))
    .fetch_all(&state.pool)
    .await;

    let popular = match popular {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!("Error buscando blogs populares: {:?}", e);
            return internal_error();
        }
    };

    let recent_blogs = match attach_responses(&state.pool, recent, true).await {
        Ok(blogs) => blogs,
        Err(e) => {
            tracing::error!("Error adjuntando comentarios: {:?}", e);
            return internal_error();
        }
    };

    let popular_blogs = match attach_responses(&state.pool, popular, true).await {
        Ok(blogs) => blogs,
        Err(e) => {
            tracing::error!("Error adjuntando comentarios: {:?}", e);
            return internal_error();
        }
    };

    Json(json!({
        "success": true,
        "stats": {
            "totalUsers": total_users,
            "totalBlogs": total_blogs,
            "totalComments": total_comments,
            "activeUsers": active_users,
        },
        "recentBlogs": recent_blogs,
        "popularBlogs": popular_blogs,
    }))
    .into_response()
}

// GET /api/admin/blogs - a diferencia del listado público, entra todo:
// borradores incluidos, sin filtro de categoría
pub async fn list_blogs_handler(
    opts: Option<Query<FilterOptions>>,
    State(state): State<AppState>,
) -> Response {
    let opts = opts.map(|Query(o)| o).unwrap_or_default();

    let page = opts.page.unwrap_or(1).max(1);
    let limit = opts.limit.unwrap_or(10).clamp(1, 50);
    let offset = (page - 1) * limit;
    let search = opts.search.filter(|s| !s.trim().is_empty());

    const FILTER: &str = " WHERE ($1::TEXT IS NULL \
        OR b.title ILIKE '%' || $1 || '%' \
        OR b.content ILIKE '%' || $1 || '%')";

    let sql = format!("{BLOG_SELECT}{FILTER} ORDER BY b.created_at DESC LIMIT $2 OFFSET $3");

    let rows = sqlx::query_as::<_, BlogRow>(&sql)
        .bind(&search)
        .bind(limit)
        .bind(offset)
        .fetch_all(&state.pool)
        .await;

    let rows = match rows {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!("Error listando blogs para admin: {:?}", e);
            return internal_error();
        }
    };

    let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM blogs b{FILTER}"))
        .bind(&search)
        .fetch_one(&state.pool)
        .await;

    let total = match total {
        Ok(total) => total,
        Err(e) => {
            tracing::error!("Error contando blogs para admin: {:?}", e);
            return internal_error();
        }
    };

    let blogs = match attach_responses(&state.pool, rows, true).await {
        Ok(blogs) => blogs,
        Err(e) => {
            tracing::error!("Error adjuntando comentarios: {:?}", e);
            return internal_error();
        }
    };

    Json(json!({
        "success": true,
        "blogs": blogs,
        "totalPages": total_pages(total, limit),
        "currentPage": page,
        "total": total,
    }))
    .into_response()
}

// GET /api/admin/users - listado con los títulos de sus blogs adjuntos
pub async fn list_users_handler(
    opts: Option<Query<FilterOptions>>,
    State(state): State<AppState>,
) -> Response {
    let opts = opts.map(|Query(o)| o).unwrap_or_default();

    let page = opts.page.unwrap_or(1).max(1);
    let limit = opts.limit.unwrap_or(10).clamp(1, 50);
    let offset = (page - 1) * limit;
    let search = opts.search.filter(|s| !s.trim().is_empty());

    const FILTER: &str = " WHERE ($1::TEXT IS NULL \
        OR name ILIKE '%' || $1 || '%' \
        OR email ILIKE '%' || $1 || '%')";

    let users = sqlx::query_as::<_, User>(&format!(
        "SELECT id, name, email, password_hash, role, avatar, bio, is_active, created_at, updated_at \
         FROM users{FILTER} ORDER BY created_at DESC LIMIT $2 OFFSET $3"
    ))
    .bind(&search)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await;

    let users = match users {
        Ok(users) => users,
        Err(e) => {
            tracing::error!("Error listando usuarios: {:?}", e);
            return internal_error();
        }
    };

    let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM users{FILTER}"))
        .bind(&search)
        .fetch_one(&state.pool)
        .await;

    let total = match total {
        Ok(total) => total,
        Err(e) => {
            tracing::error!("Error contando usuarios: {:?}", e);
            return internal_error();
        }
    };

    // Títulos de los blogs de toda la página en una sola consulta
    let ids: Vec<i64> = users.iter().map(|user| user.id).collect();
    let titles = sqlx::query_as::<_, (i64, String, i64)>(
        "SELECT id, title, author_id FROM blogs WHERE author_id = ANY($1) ORDER BY created_at DESC",
    )
    .bind(ids)
    .fetch_all(&state.pool)
    .await;

    let titles = match titles {
        Ok(titles) => titles,
        Err(e) => {
            tracing::error!("Error buscando títulos de blogs: {:?}", e);
            return internal_error();
        }
    };

    let users: Vec<serde_json::Value> = users
        .into_iter()
        .map(|user| {
            let blogs: Vec<serde_json::Value> = titles
                .iter()
                .filter(|(_, _, author_id)| *author_id == user.id)
                .map(|(blog_id, title, _)| json!({ "id": blog_id, "title": title }))
                .collect();

            let mut value = json!(user);
            if let Some(object) = value.as_object_mut() {
                object.insert("blogs".to_string(), json!(blogs));
            }
            value
        })
        .collect();

    Json(json!({
        "success": true,
        "users": users,
        "totalPages": total_pages(total, limit),
        "currentPage": page,
        "total": total,
    }))
    .into_response()
}

// DELETE /api/admin/blogs/:id - misma cascada que el borrado del dueño,
// sin chequeo de propiedad: esta ruta ya exige rol admin
pub async fn delete_blog_handler(Path(id): Path<i64>, State(state): State<AppState>) -> Response {
    let existing = match fetch_blog_record(&state.pool, id).await {
        Ok(Some(blog)) => blog,
        Ok(None) => return not_found("Blog no encontrado"),
        Err(e) => {
            tracing::error!("Error buscando blog {}: {:?}", id, e);
            return internal_error();
        }
    };

    match destroy_blog(&state, &existing).await {
        Ok(()) => Json(json!({ "success": true, "message": "Blog eliminado correctamente" }))
            .into_response(),
        Err(_) => internal_error(),
    }
}

// PUT /api/admin/users/:id/toggle-status - activar/desactivar la cuenta.
// No hay borrado de usuarios: esto es el soft-delete de la plataforma.
pub async fn toggle_user_status_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Response {
    let result = sqlx::query_as::<_, (i64, String, String, bool)>(
        "UPDATE users SET is_active = NOT is_active, updated_at = NOW() \
         WHERE id = $1 \
         RETURNING id, name, email, is_active",
    )
    .bind(id)
    .fetch_optional(&state.pool)
    .await;

    match result {
        Ok(Some((user_id, name, email, is_active))) => {
            let message = if is_active {
                "Usuario activado correctamente"
            } else {
                "Usuario desactivado correctamente"
            };

            Json(json!({
                "success": true,
                "message": message,
                "user": { "id": user_id, "name": name, "email": email, "isActive": is_active },
            }))
            .into_response()
        }
        Ok(None) => not_found("Usuario no encontrado"),
        Err(e) => {
            tracing::error!("Error cambiando estado del usuario {}: {:?}", id, e);
            internal_error()
        }
    }
}
