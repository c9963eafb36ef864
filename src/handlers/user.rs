use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::{
    handlers::{internal_error, not_found},
    models::blog::{BlogSummary, BlogSummaryRow},
    models::user::User,
    state::AppState,
};

// GET /api/users/:id - perfil público con sus blogs y estadísticas.
// Las estadísticas solo cuentan lo publicado; la lista incluye borradores
// porque es la misma que ve el dueño en su panel.
pub async fn get_user_profile_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Response {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, name, email, password_hash, role, avatar, bio, is_active, created_at, updated_at \
         FROM users WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&state.pool)
    .await;

    let user = match user {
        Ok(Some(user)) => user,
        Ok(None) => return not_found("Usuario no encontrado"),
        Err(e) => {
            tracing::error!("Error buscando usuario {}: {:?}", id, e);
            return internal_error();
        }
    };

    let blogs = sqlx::query_as::<_, BlogSummaryRow>(
        "SELECT b.id, b.title, b.excerpt, b.category, b.views, b.created_at, \
                COALESCE(l.user_ids, ARRAY[]::BIGINT[]) AS liked_by \
         FROM blogs b \
         LEFT JOIN (SELECT blog_id, ARRAY_AGG(user_id) AS user_ids \
                    FROM blog_likes GROUP BY blog_id) l ON l.blog_id = b.id \
         WHERE b.author_id = $1 \
         ORDER BY b.created_at DESC",
    )
    .bind(id)
    .fetch_all(&state.pool)
    .await;

    let blogs: Vec<BlogSummary> = match blogs {
        Ok(rows) => rows.into_iter().map(BlogSummary::from).collect(),
        Err(e) => {
            tracing::error!("Error listando blogs del usuario {}: {:?}", id, e);
            return internal_error();
        }
    };

    let stats = sqlx::query_as::<_, (i64, i64, i64)>(
        "SELECT COUNT(*), \
                COALESCE(SUM(views), 0)::BIGINT, \
                COALESCE((SELECT COUNT(*) FROM blog_likes bl \
                          JOIN blogs pb ON pb.id = bl.blog_id \
                          WHERE pb.author_id = $1 AND pb.is_published = TRUE), 0)::BIGINT \
         FROM blogs WHERE author_id = $1 AND is_published = TRUE",
    )
    .bind(id)
    .fetch_one(&state.pool)
    .await;

    let (blog_count, total_views, total_likes) = match stats {
        Ok(stats) => stats,
        Err(e) => {
            tracing::error!("Error calculando estadísticas del usuario {}: {:?}", id, e);
            return internal_error();
        }
    };

    let mut user_json = json!(user);
    if let Some(object) = user_json.as_object_mut() {
        object.insert("blogs".to_string(), json!(blogs));
        object.insert(
            "stats".to_string(),
            json!({
                "blogCount": blog_count,
                "totalViews": total_views,
                "totalLikes": total_likes,
            }),
        );
    }

    Json(json!({ "success": true, "user": user_json })).into_response()
}
