use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde_json::json;

use crate::models::user::Claims;

const TOKEN_HOURS: i64 = 24;

fn secret() -> String {
    std::env::var("JWT_SECRET").expect("JWT_SECRET debe estar en .env")
}

// Token firmado, atado a un solo usuario, con expiración de 24 horas.
pub fn create_token(
    user_id: i64,
    email: &str,
    role: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let expiration = now
        .checked_add_signed(Duration::hours(TOKEN_HOURS))
        .expect("Fecha inválida")
        .timestamp() as usize;

    let claims = Claims {
        sub: email.to_string(),
        exp: expiration,
        iat: now.timestamp() as usize,
        user_id,
        role: role.to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret().as_bytes()),
    )
}

pub fn decode_token(token: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret().as_bytes()),
        &Validation::default(),
    )
    .ok()
    .map(|data| data.claims)
}

// Regla única de autorización sobre blogs y comentarios:
// el dueño del recurso o un admin.
pub fn can_mutate(claims: &Claims, owner_id: i64) -> bool {
    claims.user_id == owner_id || claims.role == "admin"
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": "No autenticado" })),
    )
        .into_response()
}

// Se ejecuta ANTES de cada handler protegido: valida el token y deja
// los Claims en las extensions para que el handler sepa quién llama.
pub async fn auth_middleware(
    auth: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(TypedHeader(auth)) = auth else {
        return unauthorized();
    };

    match decode_token(auth.token()) {
        Some(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        // Token falso, expirado o manipulado
        None => unauthorized(),
    }
}

// Igual que auth_middleware pero además exige rol admin.
pub async fn admin_middleware(
    auth: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(TypedHeader(auth)) = auth else {
        return unauthorized();
    };

    match decode_token(auth.token()) {
        Some(claims) if claims.role == "admin" => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Some(_) => (
            StatusCode::FORBIDDEN,
            Json(json!({ "message": "Se requiere rol de administrador" })),
        )
            .into_response(),
        None => unauthorized(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_secret() {
        std::env::set_var("JWT_SECRET", "secreto-de-pruebas");
    }

    #[test]
    fn token_ida_y_vuelta() {
        setup_secret();

        let token = create_token(7, "ana@example.com", "user").unwrap();
        let claims = decode_token(&token).expect("el token recién emitido debe ser válido");

        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.sub, "ana@example.com");
        assert_eq!(claims.role, "user");
    }

    #[test]
    fn token_manipulado_se_rechaza() {
        setup_secret();

        let mut token = create_token(7, "ana@example.com", "user").unwrap();
        token.push('x');

        assert!(decode_token(&token).is_none());
    }

    #[test]
    fn token_expirado_se_rechaza() {
        setup_secret();

        let vencido = Utc::now() - Duration::hours(1);
        let claims = Claims {
            sub: "ana@example.com".to_string(),
            exp: vencido.timestamp() as usize,
            iat: (vencido - Duration::hours(24)).timestamp() as usize,
            user_id: 7,
            role: "user".to_string(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret().as_bytes()),
        )
        .unwrap();

        assert!(decode_token(&token).is_none());
    }

    #[test]
    fn politica_de_mutacion() {
        let dueno = Claims {
            sub: "ana@example.com".to_string(),
            exp: 0,
            iat: 0,
            user_id: 7,
            role: "user".to_string(),
        };
        let admin = Claims {
            user_id: 99,
            role: "admin".to_string(),
            ..dueno.clone()
        };
        let otro = Claims {
            user_id: 8,
            ..dueno.clone()
        };

        assert!(can_mutate(&dueno, 7));
        assert!(can_mutate(&admin, 7));
        assert!(!can_mutate(&otro, 7));
    }
}
