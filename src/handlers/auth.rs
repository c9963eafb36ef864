use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension,
};
use serde_json::json;

use crate::{
    handlers::{bad_request, error_message, internal_error, not_found},
    models::user::{Claims, LoginPayload, RegisterPayload, UpdateProfilePayload, User},
    state::AppState,
    utils::{
        jwt::create_token,
        security::{hash_password, verify_password},
    },
};

const USER_COLUMNS: &str =
    "id, name, email, password_hash, role, avatar, bio, is_active, created_at, updated_at";

// POST /api/auth/register
pub async fn register_handler(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Response {
    // Validaciones de entrada, mismas reglas que aplica el cliente
    if payload.name.trim().is_empty() {
        return bad_request("El nombre es obligatorio");
    }
    if !is_valid_email(&payload.email) {
        return bad_request("El email no es válido");
    }
    if payload.password.chars().count() < 6 {
        return bad_request("La contraseña debe tener al menos 6 caracteres");
    }

    // El email es la clave de acceso: único, sensible a mayúsculas
    let taken = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE email = $1")
        .bind(&payload.email)
        .fetch_one(&state.pool)
        .await;

    match taken {
        Ok(n) if n > 0 => return bad_request("El email ya está registrado"),
        Ok(_) => {}
        Err(e) => {
            tracing::error!("Error consultando usuarios: {:?}", e);
            return internal_error();
        }
    }

    // Hashear la contraseña: el texto plano no toca la base jamás
    let hashed_password = match hash_password(&payload.password) {
        Ok(h) => h,
        Err(_) => return internal_error(),
    };

    let result = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (name, email, password_hash) VALUES ($1, $2, $3) RETURNING {}",
        USER_COLUMNS
    ))
    .bind(payload.name.trim())
    .bind(&payload.email)
    .bind(&hashed_password)
    .fetch_one(&state.pool)
    .await;

    let user = match result {
        Ok(u) => u,
        Err(e) => {
            // Carrera contra otro registro simultáneo con el mismo email
            if let sqlx::Error::Database(db) = &e {
                if db.is_unique_violation() {
                    return bad_request("El email ya está registrado");
                }
            }
            tracing::error!("Error creando usuario: {:?}", e);
            return internal_error();
        }
    };

    match create_token(user.id, &user.email, &user.role) {
        Ok(token) => (
            StatusCode::CREATED,
            Json(json!({ "success": true, "user": user, "token": token })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Error generando token: {:?}", e);
            internal_error()
        }
    }
}

// POST /api/auth/login
pub async fn login_handler(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Response {
    let result = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE email = $1",
        USER_COLUMNS
    ))
    .bind(&payload.email)
    .fetch_optional(&state.pool)
    .await;

    let user = match result {
        Ok(Some(u)) => u,
        // Mismo mensaje para email desconocido y contraseña errada:
        // no revelamos qué cuentas existen
        Ok(None) => return error_message(StatusCode::UNAUTHORIZED, "Email o contraseña incorrectos"),
        Err(e) => {
            tracing::error!("Error buscando usuario: {:?}", e);
            return internal_error();
        }
    };

    if !verify_password(&payload.password, &user.password_hash) {
        return error_message(StatusCode::UNAUTHORIZED, "Email o contraseña incorrectos");
    }

    // La desactivación bloquea logins nuevos; los tokens ya emitidos
    // siguen vivos hasta su expiración
    if !user.is_active {
        return error_message(StatusCode::UNAUTHORIZED, "La cuenta está desactivada");
    }

    match create_token(user.id, &user.email, &user.role) {
        Ok(token) => Json(json!({ "success": true, "user": user, "token": token })).into_response(),
        Err(e) => {
            tracing::error!("Error generando token: {:?}", e);
            internal_error()
        }
    }
}

// GET /api/auth/me
pub async fn me_handler(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Response {
    let result = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE id = $1",
        USER_COLUMNS
    ))
    .bind(claims.user_id)
    .fetch_optional(&state.pool)
    .await;

    match result {
        Ok(Some(user)) => Json(json!({ "success": true, "user": user })).into_response(),
        Ok(None) => not_found("Usuario no encontrado"),
        Err(e) => {
            tracing::error!("Error buscando usuario {}: {:?}", claims.user_id, e);
            internal_error()
        }
    }
}

// PUT /api/auth/profile - edición parcial del propio perfil
pub async fn update_profile_handler(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateProfilePayload>,
) -> Response {
    if let Some(name) = &payload.name {
        if name.trim().is_empty() {
            return bad_request("El nombre no puede quedar vacío");
        }
    }

    // COALESCE($n, columna): lo que no venga conserva su valor anterior
    let result = sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET \
            name = COALESCE($1, name), \
            bio = COALESCE($2, bio), \
            avatar = COALESCE($3, avatar), \
            updated_at = NOW() \
         WHERE id = $4 \
         RETURNING {}",
        USER_COLUMNS
    ))
    .bind(payload.name.as_deref().map(str::trim))
    .bind(&payload.bio)
    .bind(&payload.avatar)
    .bind(claims.user_id)
    .fetch_optional(&state.pool)
    .await;

    match result {
        Ok(Some(user)) => Json(json!({ "success": true, "user": user })).into_response(),
        Ok(None) => not_found("Usuario no encontrado"),
        Err(e) => {
            tracing::error!("Error actualizando perfil {}: {:?}", claims.user_id, e);
            internal_error()
        }
    }
}

// Suficiente para frenar typos evidentes; la verificación real del
// buzón no es problema de este servicio
fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !email.contains(' ')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_validos_e_invalidos() {
        assert!(is_valid_email("ana@example.com"));
        assert!(is_valid_email("ana.perez+blog@sub.example.com"));

        assert!(!is_valid_email(""));
        assert!(!is_valid_email("ana"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("ana@sindominio"));
        assert!(!is_valid_email("ana@.com"));
        assert!(!is_valid_email("ana@example.com."));
        assert!(!is_valid_email("ana con espacios@example.com"));
    }
}
