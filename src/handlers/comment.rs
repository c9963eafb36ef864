use std::collections::HashMap;

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension,
};
use chrono::Utc;
use serde_json::json;
use sqlx::types::Json as SqlJson;

use crate::{
    db::DbPool,
    handlers::{bad_request, blog::toggle_like, forbidden, internal_error, not_found},
    models::comment::{
        CommentResponse, CommentRow, CreateCommentSchema, Reply, ReplySchema, UpdateCommentSchema,
    },
    models::user::Claims,
    state::AppState,
    utils::jwt::can_mutate,
};

const COMMENT_SELECT: &str =
    "SELECT c.id, c.content, c.author_id, c.blog_id, c.is_edited, c.replies, \
            c.created_at, c.updated_at, \
            u.name AS author_name, u.avatar AS author_avatar, \
            COALESCE(l.user_ids, ARRAY[]::BIGINT[]) AS liked_by \
     FROM comments c \
     JOIN users u ON u.id = c.author_id \
     LEFT JOIN (SELECT comment_id, ARRAY_AGG(user_id) AS user_ids \
                FROM comment_likes GROUP BY comment_id) l ON l.comment_id = c.id";

// GET /api/comments/:id - el :id aquí es el id del BLOG; devuelve todos
// sus comentarios, de más nuevo a más viejo
pub async fn list_comments_handler(Path(blog_id): Path<i64>, State(state): State<AppState>) -> Response {
    match comments_for_blogs(&state.pool, &[blog_id]).await {
        Ok(mut map) => {
            let comments = map.remove(&blog_id).unwrap_or_default();
            Json(json!({ "success": true, "comments": comments })).into_response()
        }
        Err(e) => {
            tracing::error!("Error listando comentarios del blog {}: {:?}", blog_id, e);
            internal_error()
        }
    }
}

// POST /api/comments
pub async fn create_comment_handler(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<CreateCommentSchema>,
) -> Response {
    if body.content.trim().is_empty() {
        return bad_request("El comentario no puede estar vacío");
    }

    // El blog tiene que existir; el conjunto de comentarios del blog
    // es la consulta por blog_id, no hay arreglo espejo que mantener
    let blog = sqlx::query_scalar::<_, i64>("SELECT id FROM blogs WHERE id = $1")
        .bind(body.blog_id)
        .fetch_optional(&state.pool)
        .await;

    match blog {
        Ok(Some(_)) => {}
        Ok(None) => return not_found("Blog no encontrado"),
        Err(e) => {
            tracing::error!("Error buscando blog {}: {:?}", body.blog_id, e);
            return internal_error();
        }
    }

    let created = sqlx::query_scalar::<_, i64>(
        "INSERT INTO comments (content, author_id, blog_id) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(body.content.trim())
    .bind(claims.user_id)
    .bind(body.blog_id)
    .fetch_one(&state.pool)
    .await;

    match created {
        Ok(id) => respond_with_comment(&state.pool, id, StatusCode::CREATED).await,
        Err(e) => {
            tracing::error!("Error creando comentario: {:?}", e);
            internal_error()
        }
    }
}

// PUT /api/comments/:id - editar contenido; isEdited queda en true para siempre
pub async fn update_comment_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<UpdateCommentSchema>,
) -> Response {
    let author_id = match fetch_comment_author(&state.pool, id).await {
        Ok(Some(author_id)) => author_id,
        Ok(None) => return not_found("Comentario no encontrado"),
        Err(e) => {
            tracing::error!("Error buscando comentario {}: {:?}", id, e);
            return internal_error();
        }
    };

    if !can_mutate(&claims, author_id) {
        return forbidden("No puedes editar comentarios de otros");
    }

    if body.content.trim().is_empty() {
        return bad_request("El comentario no puede estar vacío");
    }

    let result = sqlx::query(
        "UPDATE comments SET content = $1, is_edited = TRUE, updated_at = NOW() WHERE id = $2",
    )
    .bind(body.content.trim())
    .bind(id)
    .execute(&state.pool)
    .await;

    match result {
        Ok(_) => respond_with_comment(&state.pool, id, StatusCode::OK).await,
        Err(e) => {
            tracing::error!("Error actualizando comentario {}: {:?}", id, e);
            internal_error()
        }
    }
}

// DELETE /api/comments/:id - dueño o admin; quita primero los likes
pub async fn delete_comment_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Response {
    let author_id = match fetch_comment_author(&state.pool, id).await {
        Ok(Some(author_id)) => author_id,
        Ok(None) => return not_found("Comentario no encontrado"),
        Err(e) => {
            tracing::error!("Error buscando comentario {}: {:?}", id, e);
            return internal_error();
        }
    };

    if !can_mutate(&claims, author_id) {
        return forbidden("No puedes borrar comentarios de otros");
    }

    let steps = [
        ("comment_likes", "DELETE FROM comment_likes WHERE comment_id = $1"),
        ("comments", "DELETE FROM comments WHERE id = $1"),
    ];

    for (step, sql) in steps {
        if let Err(e) = sqlx::query(sql).bind(id).execute(&state.pool).await {
            tracing::error!(
                "Borrado del comentario {} incompleto en el paso '{}': {:?}",
                id,
                step,
                e
            );
            return internal_error();
        }
    }

    Json(json!({ "success": true, "message": "Comentario eliminado correctamente" })).into_response()
}

// PUT /api/comments/:id/like - mismo toggle que los blogs, sobre comment_likes
pub async fn like_comment_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Response {
    let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM comments WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await;

    match exists {
        Ok(Some(_)) => {}
        Ok(None) => return not_found("Comentario no encontrado"),
        Err(e) => {
            tracing::error!("Error buscando comentario {}: {:?}", id, e);
            return internal_error();
        }
    }

    toggle_like(
        &state.pool,
        "DELETE FROM comment_likes WHERE comment_id = $1 AND user_id = $2",
        "INSERT INTO comment_likes (comment_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        "SELECT COUNT(*) FROM comment_likes WHERE comment_id = $1",
        id,
        claims.user_id,
    )
    .await
}

// POST /api/comments/:id/reply - agrega una respuesta embebida. Basta
// con estar autenticado: responder es como comentar, no hay dueño.
pub async fn reply_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<ReplySchema>,
) -> Response {
    if body.content.trim().is_empty() {
        return bad_request("La respuesta no puede estar vacía");
    }

    let reply = Reply {
        content: body.content.trim().to_string(),
        author: claims.user_id,
        created_at: Utc::now(),
    };

    // '[]'::jsonb || objeto = append al final de la lista de respuestas
    let result = sqlx::query(
        "UPDATE comments SET replies = replies || $1::JSONB, updated_at = NOW() WHERE id = $2",
    )
    .bind(SqlJson(&reply))
    .bind(id)
    .execute(&state.pool)
    .await;

    match result {
        Ok(updated) if updated.rows_affected() > 0 => {
            respond_with_comment(&state.pool, id, StatusCode::OK).await
        }
        Ok(_) => not_found("Comentario no encontrado"),
        Err(e) => {
            tracing::error!("Error agregando respuesta al comentario {}: {:?}", id, e);
            internal_error()
        }
    }
}

// Comentarios de varios blogs en una sola pasada, agrupados por blog,
// con autores y autores-de-respuestas ya resueltos
pub(crate) async fn comments_for_blogs(
    pool: &DbPool,
    blog_ids: &[i64],
) -> Result<HashMap<i64, Vec<CommentResponse>>, sqlx::Error> {
    if blog_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<_, CommentRow>(&format!(
        "{COMMENT_SELECT} WHERE c.blog_id = ANY($1) ORDER BY c.created_at DESC"
    ))
    .bind(blog_ids.to_vec())
    .fetch_all(pool)
    .await?;

    let authors = reply_authors(pool, &rows).await?;

    let mut grouped: HashMap<i64, Vec<CommentResponse>> = HashMap::new();
    for row in rows {
        grouped
            .entry(row.blog_id)
            .or_default()
            .push(row.into_response(&authors));
    }

    Ok(grouped)
}

async fn fetch_comment_author(pool: &DbPool, id: i64) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT author_id FROM comments WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

// Resuelve en lote los autores citados dentro de las respuestas embebidas
async fn reply_authors(
    pool: &DbPool,
    rows: &[CommentRow],
) -> Result<HashMap<i64, (String, String)>, sqlx::Error> {
    let mut ids: Vec<i64> = rows
        .iter()
        .flat_map(|row| row.replies.0.iter().map(|reply| reply.author))
        .collect();
    ids.sort_unstable();
    ids.dedup();

    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let users =
        sqlx::query_as::<_, (i64, String, String)>("SELECT id, name, avatar FROM users WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(pool)
            .await?;

    Ok(users
        .into_iter()
        .map(|(id, name, avatar)| (id, (name, avatar)))
        .collect())
}

// Respuesta {success, comment} con todo adjunto
async fn respond_with_comment(pool: &DbPool, id: i64, status: StatusCode) -> Response {
    let row = sqlx::query_as::<_, CommentRow>(&format!("{COMMENT_SELECT} WHERE c.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await;

    let row = match row {
        Ok(Some(row)) => row,
        Ok(None) => return not_found("Comentario no encontrado"),
        Err(e) => {
            tracing::error!("Error buscando comentario {}: {:?}", id, e);
            return internal_error();
        }
    };

    let authors = match reply_authors(pool, std::slice::from_ref(&row)).await {
        Ok(authors) => authors,
        Err(e) => {
            tracing::error!("Error buscando autores de respuestas: {:?}", e);
            return internal_error();
        }
    };

    (
        status,
        Json(json!({ "success": true, "comment": row.into_response(&authors) })),
    )
        .into_response()
}
