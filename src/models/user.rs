use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// Fila completa de la tabla users. Se serializa tal cual como perfil
// público: el hash de la contraseña se excluye siempre del JSON.
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip)] // ¡Jamás envíes el hash de la contraseña en el JSON!
    pub password_hash: String,
    pub role: String,
    pub avatar: String,
    pub bio: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Lo que recibimos para Registrar un usuario
#[derive(Debug, Deserialize)]
pub struct RegisterPayload {
    pub name: String,
    pub email: String,
    pub password: String,
}

// Lo que recibimos para hacer Login
#[derive(Debug, Deserialize)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
}

// Edición parcial del propio perfil: solo cambia lo que venga
#[derive(Debug, Deserialize)]
pub struct UpdateProfilePayload {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
}

// Lo que viaja DENTRO del token firmado
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // email del usuario
    pub exp: usize,
    pub iat: usize,
    pub user_id: i64,
    pub role: String,
}

// Autor adjunto a blogs y comentarios. Según el contexto se exponen
// distintos campos: las vistas públicas nunca llevan email.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorInfo {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn el_hash_no_sale_en_el_json() {
        let user = User {
            id: 1,
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            password_hash: "$argon2id$...".to_string(),
            role: "user".to_string(),
            avatar: String::new(),
            bio: String::new(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(&user).unwrap();

        assert!(json.get("passwordHash").is_none());
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["isActive"], true);
        assert_eq!(json["email"], "ana@example.com");
    }

    #[test]
    fn autor_publico_sin_email() {
        let author = AuthorInfo {
            id: 3,
            name: "Ana".to_string(),
            avatar: Some("a.png".to_string()),
            bio: None,
            email: None,
        };

        let json = serde_json::to_value(&author).unwrap();

        assert!(json.get("email").is_none());
        assert!(json.get("bio").is_none());
        assert_eq!(json["avatar"], "a.png");
    }
}
