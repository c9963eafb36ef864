use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension,
};
use serde_json::json;

use crate::{
    db::DbPool,
    handlers::{bad_request, comment::comments_for_blogs, forbidden, internal_error, not_found},
    models::blog::{
        estimate_read_time, is_valid_category, parse_tags, BlogRecord, BlogResponse, BlogRow,
        CreateBlogSchema, FilterOptions, UpdateBlogSchema,
    },
    models::user::Claims,
    state::AppState,
    utils::{jwt::can_mutate, media::MEDIA_FOLDER},
};

// La consulta grande: blog + autor + likes agregados en una sola pasada.
// like_count solo existe para poder ordenar por popularidad.
pub(crate) const BLOG_SELECT: &str =
    "SELECT b.id, b.title, b.content, b.excerpt, b.category, b.tags, b.image, b.author_id, \
            b.views, b.is_published, b.read_time, b.created_at, b.updated_at, \
            u.name AS author_name, u.email AS author_email, u.avatar AS author_avatar, u.bio AS author_bio, \
            COALESCE(l.user_ids, ARRAY[]::BIGINT[]) AS liked_by, COALESCE(l.like_count, 0) AS like_count \
     FROM blogs b \
     JOIN users u ON u.id = b.author_id \
     LEFT JOIN (SELECT blog_id, ARRAY_AGG(user_id) AS user_ids, COUNT(*) AS like_count \
                FROM blog_likes GROUP BY blog_id) l ON l.blog_id = b.id";

const BLOG_RECORD_SELECT: &str =
    "SELECT id, title, content, excerpt, category, tags, image, author_id, views, \
            is_published, read_time, created_at, updated_at \
     FROM blogs WHERE id = $1";

// GET /api/blogs (?category=&search=&tags=&author=&sortBy=&page=&limit=)
pub async fn list_blogs_handler(
    opts: Option<Query<FilterOptions>>,
    State(state): State<AppState>,
) -> Response {
    let opts = opts.map(|Query(o)| o).unwrap_or_default();

    let page = opts.page.unwrap_or(1).max(1);
    let limit = opts.limit.unwrap_or(6).clamp(1, 50);
    let offset = (page - 1) * limit;

    let category = opts.category.filter(|c| c != "All");
    let search = opts.search.filter(|s| !s.trim().is_empty());
    let tags = opts
        .tags
        .as_deref()
        .map(|csv| parse_tags(Some(csv)))
        .filter(|t| !t.is_empty());
    let author = opts.author;
    let (sort_column, sort_dir) = parse_sort(opts.sort_by.as_deref());

    // Filtros dinámicos dentro del SQL: cada ($n IS NULL OR ...) se apaga
    // cuando el parámetro no viene. El listado público solo ve publicados.
    const FILTER: &str = " WHERE b.is_published = TRUE \
          AND ($1::TEXT IS NULL OR b.category = $1) \
          AND ($2::TEXT IS NULL OR b.title ILIKE '%' || $2 || '%' \
               OR b.content ILIKE '%' || $2 || '%' \
               OR EXISTS (SELECT 1 FROM UNNEST(b.tags) AS t WHERE t ILIKE '%' || $2 || '%')) \
          AND ($3::TEXT[] IS NULL OR b.tags && $3) \
          AND ($4::BIGINT IS NULL OR b.author_id = $4)";

    let sql = format!("{BLOG_SELECT}{FILTER} ORDER BY {sort_column} {sort_dir} LIMIT $5 OFFSET $6");

    let rows = sqlx::query_as::<_, BlogRow>(&sql)
        .bind(&category)
        .bind(&search)
        .bind(&tags)
        .bind(author)
        .bind(limit)
        .bind(offset)
        .fetch_all(&state.pool)
        .await;

    let rows = match rows {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!("Error listando blogs: {:?}", e);
            return internal_error();
        }
    };

    let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM blogs b{FILTER}"))
        .bind(&category)
        .bind(&search)
        .bind(&tags)
        .bind(author)
        .fetch_one(&state.pool)
        .await;

    let total = match total {
        Ok(total) => total,
        Err(e) => {
            tracing::error!("Error contando blogs: {:?}", e);
            return internal_error();
        }
    };

    let blogs = match attach_responses(&state.pool, rows, false).await {
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

// GET /api/blogs/my-blogs - los del que llama, borradores incluidos
pub async fn my_blogs_handler(
    opts: Option<Query<FilterOptions>>,
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Response {
    let opts = opts.map(|Query(o)| o).unwrap_or_default();

    let page = opts.page.unwrap_or(1).max(1);
    let limit = opts.limit.unwrap_or(10).clamp(1, 50);
    let offset = (page - 1) * limit;

    let sql = format!(
        "{BLOG_SELECT} WHERE b.author_id = $1 ORDER BY b.created_at DESC LIMIT $2 OFFSET $3"
    );

    let rows = sqlx::query_as::<_, BlogRow>(&sql)
        .bind(claims.user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&state.pool)
        .await;

    let rows = match rows {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!("Error listando blogs propios: {:?}", e);
            return internal_error();
        }
    };

    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM blogs WHERE author_id = $1")
        .bind(claims.user_id)
        .fetch_one(&state.pool)
        .await;

    let total = match total {
        Ok(total) => total,
        Err(e) => {
            tracing::error!("Error contando blogs propios: {:?}", e);
            return internal_error();
        }
    };

    let blogs = match attach_responses(&state.pool, rows, false).await {
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

// GET /api/blogs/:id - lectura pura, NO suma vistas (eso va por /view,
// así los prefetch del cliente no inflan el contador)
pub async fn get_blog_handler(Path(id): Path<i64>, State(state): State<AppState>) -> Response {
    respond_with_blog(&state, id, StatusCode::OK).await
}

// PUT /api/blogs/:id/view - incremento atómico del contador
pub async fn increment_views_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Response {
    let result =
        sqlx::query_scalar::<_, i64>("UPDATE blogs SET views = views + 1 WHERE id = $1 RETURNING views")
            .bind(id)
            .fetch_optional(&state.pool)
            .await;

    match result {
        Ok(Some(views)) => Json(json!({ "success": true, "views": views })).into_response(),
        Ok(None) => not_found("Blog no encontrado"),
        Err(e) => {
            tracing::error!("Error incrementando vistas del blog {}: {:?}", id, e);
            internal_error()
        }
    }
}

// POST /api/blogs
pub async fn create_blog_handler(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<CreateBlogSchema>,
) -> Response {
    let title = body.title.trim();

    if title.is_empty() {
        return bad_request("El título es obligatorio");
    }
    if title.chars().count() > 200 {
        return bad_request("El título no puede superar los 200 caracteres");
    }
    if body.content.trim().is_empty() {
        return bad_request("El contenido es obligatorio");
    }
    if !is_valid_category(&body.category) {
        return bad_request("Categoría inválida");
    }
    if let Some(excerpt) = &body.excerpt {
        if excerpt.chars().count() > 300 {
            return bad_request("El extracto no puede superar los 300 caracteres");
        }
    }

    // La portada se sube antes de tocar la base; si el servicio de
    // imágenes falla, la creación entera falla
    let image = match &body.image {
        Some(data) if !data.is_empty() => {
            match state.media.upload(data, MEDIA_FOLDER).await {
                Ok(url) => url,
                Err(e) => {
                    tracing::error!("Error subiendo la portada: {:?}", e);
                    return internal_error();
                }
            }
        }
        _ => String::new(),
    };

    let tags = parse_tags(body.tags.as_deref());
    let read_time = estimate_read_time(&body.content);

    let created = sqlx::query_scalar::<_, i64>(
        "INSERT INTO blogs (title, content, excerpt, category, tags, image, author_id, read_time) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING id",
    )
    .bind(title)
    .bind(&body.content)
    .bind(&body.excerpt)
    .bind(&body.category)
    .bind(&tags)
    .bind(&image)
    .bind(claims.user_id)
    .bind(read_time)
    .fetch_one(&state.pool)
    .await;

    match created {
        Ok(id) => respond_with_blog(&state, id, StatusCode::CREATED).await,
        Err(e) => {
            tracing::error!("Error al crear el blog: {:?}", e);
            internal_error()
        }
    }
}

// PUT /api/blogs/:id - edición parcial por dueño o admin
pub async fn update_blog_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<UpdateBlogSchema>,
) -> Response {
    let existing = match fetch_blog_record(&state.pool, id).await {
        Ok(Some(blog)) => blog,
        Ok(None) => return not_found("Blog no encontrado"),
        Err(e) => {
            tracing::error!("Error buscando blog {}: {:?}", id, e);
            return internal_error();
        }
    };

    if !can_mutate(&claims, existing.author_id) {
        return forbidden("No puedes editar blogs de otros");
    }

    if let Some(title) = &body.title {
        if title.trim().is_empty() {
            return bad_request("El título no puede quedar vacío");
        }
        if title.trim().chars().count() > 200 {
            return bad_request("El título no puede superar los 200 caracteres");
        }
    }
    if let Some(category) = &body.category {
        if !is_valid_category(category) {
            return bad_request("Categoría inválida");
        }
    }
    if let Some(excerpt) = &body.excerpt {
        if excerpt.chars().count() > 300 {
            return bad_request("El extracto no puede superar los 300 caracteres");
        }
    }

    // Portada: si llega una distinta a la guardada, borramos la vieja
    // (best-effort) y subimos la nueva. Solo el fallo de subida es fatal.
    let image = match &body.image {
        Some(data) if !data.is_empty() && *data != existing.image => {
            if !existing.image.is_empty() {
                state.media.delete_by_url(&existing.image).await;
            }

            match state.media.upload(data, MEDIA_FOLDER).await {
                Ok(url) => url,
                Err(e) => {
                    tracing::error!("Error subiendo la portada: {:?}", e);
                    return internal_error();
                }
            }
        }
        _ => existing.image,
    };

    // Mezcla en memoria: lo que no venga conserva su valor anterior.
    // El tiempo de lectura solo se recalcula si cambió el contenido.
    let content_changed = body.content.is_some();
    let title = body
        .title
        .map(|t| t.trim().to_string())
        .unwrap_or(existing.title);
    let content = body.content.unwrap_or(existing.content);
    let excerpt = body.excerpt.or(existing.excerpt);
    let category = body.category.unwrap_or(existing.category);
    let tags = match body.tags.as_deref() {
        Some(csv) => parse_tags(Some(csv)),
        None => existing.tags,
    };
    let read_time = if content_changed {
        estimate_read_time(&content)
    } else {
        existing.read_time
    };

    let result = sqlx::query(
        "UPDATE blogs SET title = $1, content = $2, excerpt = $3, category = $4, \
            tags = $5, image = $6, read_time = $7, updated_at = NOW() \
         WHERE id = $8",
    )
    .bind(&title)
    .bind(&content)
    .bind(&excerpt)
    .bind(&category)
    .bind(&tags)
    .bind(&image)
    .bind(read_time)
    .bind(id)
    .execute(&state.pool)
    .await;

    match result {
        Ok(_) => respond_with_blog(&state, id, StatusCode::OK).await,
        Err(e) => {
            tracing::error!("Error actualizando blog {}: {:?}", id, e);
            internal_error()
        }
    }
}

// DELETE /api/blogs/:id - dueño o admin; dispara la cascada completa
pub async fn delete_blog_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Response {
    let existing = match fetch_blog_record(&state.pool, id).await {
        Ok(Some(blog)) => blog,
        Ok(None) => return not_found("Blog no encontrado"),
        Err(e) => {
            tracing::error!("Error buscando blog {}: {:?}", id, e);
            return internal_error();
        }
    };

    if !can_mutate(&claims, existing.author_id) {
        return forbidden("No puedes borrar blogs de otros");
    }

    match destroy_blog(&state, &existing).await {
        Ok(()) => Json(json!({ "success": true, "message": "Blog eliminado correctamente" }))
            .into_response(),
        Err(_) => internal_error(),
    }
}

// PUT /api/blogs/:id/like - toggle; cualquier usuario autenticado
pub async fn like_blog_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Response {
    let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM blogs WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await;

    match exists {
        Ok(Some(_)) => {}
        Ok(None) => return not_found("Blog no encontrado"),
        Err(e) => {
            tracing::error!("Error buscando blog {}: {:?}", id, e);
            return internal_error();
        }
    }

    toggle_like(
        &state.pool,
        "DELETE FROM blog_likes WHERE blog_id = $1 AND user_id = $2",
        "INSERT INTO blog_likes (blog_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        "SELECT COUNT(*) FROM blog_likes WHERE blog_id = $1",
        id,
        claims.user_id,
    )
    .await
}

// Toggle de like compartido entre blogs y comentarios: quitar si estaba,
// poner si no. Dos toggles seguidos del mismo usuario vuelven al estado
// original.
pub(crate) async fn toggle_like(
    pool: &DbPool,
    delete_sql: &str,
    insert_sql: &str,
    count_sql: &str,
    resource_id: i64,
    user_id: i64,
) -> Response {
    let removed = match sqlx::query(delete_sql)
        .bind(resource_id)
        .bind(user_id)
        .execute(pool)
        .await
    {
        Ok(result) => result.rows_affected(),
        Err(e) => {
            tracing::error!("Error quitando like: {:?}", e);
            return internal_error();
        }
    };

    let is_liked = removed == 0;

    if is_liked {
        if let Err(e) = sqlx::query(insert_sql)
            .bind(resource_id)
            .bind(user_id)
            .execute(pool)
            .await
        {
            tracing::error!("Error registrando like: {:?}", e);
            return internal_error();
        }
    }

    match sqlx::query_scalar::<_, i64>(count_sql)
        .bind(resource_id)
        .fetch_one(pool)
        .await
    {
        Ok(likes) => Json(json!({ "success": true, "likes": likes, "isLiked": is_liked }))
            .into_response(),
        Err(e) => {
            tracing::error!("Error contando likes: {:?}", e);
            internal_error()
        }
    }
}

pub(crate) async fn fetch_blog_record(
    pool: &DbPool,
    id: i64,
) -> Result<Option<BlogRecord>, sqlx::Error> {
    sqlx::query_as::<_, BlogRecord>(BLOG_RECORD_SELECT)
        .bind(id)
        .fetch_optional(pool)
        .await
}

// Cascada de borrado: pasos idempotentes en orden fijo. Si un paso falla
// a mitad de camino queda registrado cuál, para distinguir un fallo
// parcial de uno total. No hay rollback compensatorio.
pub(crate) async fn destroy_blog(state: &AppState, blog: &BlogRecord) -> Result<(), sqlx::Error> {
    if !blog.image.is_empty() {
        state.media.delete_by_url(&blog.image).await;
    }

    let steps = [
        (
            "comment_likes",
            "DELETE FROM comment_likes WHERE comment_id IN (SELECT id FROM comments WHERE blog_id = $1)",
        ),
        ("comments", "DELETE FROM comments WHERE blog_id = $1"),
        ("blog_likes", "DELETE FROM blog_likes WHERE blog_id = $1"),
        ("blogs", "DELETE FROM blogs WHERE id = $1"),
    ];

    for (step, sql) in steps {
        sqlx::query(sql)
            .bind(blog.id)
            .execute(&state.pool)
            .await
            .map_err(|e| {
                tracing::error!(
                    "Cascada de borrado del blog {} incompleta en el paso '{}': {:?}",
                    blog.id,
                    step,
                    e
                );
                e
            })?;
    }

    Ok(())
}

// Adjunta los comentarios de cada blog y arma las respuestas finales
pub(crate) async fn attach_responses(
    pool: &DbPool,
    rows: Vec<BlogRow>,
    include_email: bool,
) -> Result<Vec<BlogResponse>, sqlx::Error> {
    let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
    let mut comments = comments_for_blogs(pool, &ids).await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let blog_comments = comments.remove(&row.id).unwrap_or_default();
            row.into_response(blog_comments, include_email)
        })
        .collect())
}

// Respuesta {success, blog} con autor y comentarios adjuntos
async fn respond_with_blog(state: &AppState, id: i64, status: StatusCode) -> Response {
    let row = sqlx::query_as::<_, BlogRow>(&format!("{BLOG_SELECT} WHERE b.id = $1"))
        .bind(id)
        .fetch_optional(&state.pool)
        .await;

    let row = match row {
        Ok(Some(row)) => row,
        Ok(None) => return not_found("Blog no encontrado"),
        Err(e) => {
            tracing::error!("Error buscando blog {}: {:?}", id, e);
            return internal_error();
        }
    };

    let comments = match comments_for_blogs(&state.pool, &[id]).await {
        Ok(mut map) => map.remove(&id).unwrap_or_default(),
        Err(e) => {
            tracing::error!("Error buscando comentarios del blog {}: {:?}", id, e);
            return internal_error();
        }
    };

    (
        status,
        Json(json!({ "success": true, "blog": row.into_response(comments, false) })),
    )
        .into_response()
}

pub(crate) fn total_pages(total: i64, limit: i64) -> i64 {
    (total + limit - 1) / limit
}

// Orden permitido: lista blanca de columnas; cualquier otra cosa cae al
// orden por fecha. La dirección por defecto es descendente.
fn parse_sort(sort_by: Option<&str>) -> (&'static str, &'static str) {
    let (field, direction) = match sort_by {
        Some(raw) => match raw.split_once(':') {
            Some((field, direction)) => (field, direction),
            None => (raw, "desc"),
        },
        None => ("createdAt", "desc"),
    };

    let column = match field {
        "createdAt" => "b.created_at",
        "updatedAt" => "b.updated_at",
        "views" => "b.views",
        "likes" => "like_count",
        "readTime" => "b.read_time",
        "title" => "b.title",
        _ => "b.created_at",
    };

    let direction = if direction == "asc" { "ASC" } else { "DESC" };

    (column, direction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orden_por_defecto() {
        assert_eq!(parse_sort(None), ("b.created_at", "DESC"));
        assert_eq!(parse_sort(Some("createdAt:desc")), ("b.created_at", "DESC"));
    }

    #[test]
    fn orden_explicito() {
        assert_eq!(parse_sort(Some("views:asc")), ("b.views", "ASC"));
        assert_eq!(parse_sort(Some("likes:desc")), ("like_count", "DESC"));
        assert_eq!(parse_sort(Some("title")), ("b.title", "DESC"));
    }

    #[test]
    fn orden_fuera_de_la_lista_blanca() {
        // Nada de colar columnas arbitrarias en el ORDER BY
        assert_eq!(parse_sort(Some("password_hash:asc")), ("b.created_at", "ASC"));
        assert_eq!(
            parse_sort(Some("1; DROP TABLE blogs")),
            ("b.created_at", "DESC")
        );
    }

    #[test]
    fn paginas_totales() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(10, 10), 1);
        // 15 publicados con página de 10: la segunda trae 5
        assert_eq!(total_pages(15, 10), 2);
        assert_eq!(total_pages(21, 10), 3);
    }
}
