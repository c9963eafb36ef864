use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

// Hash irreversible de la contraseña. El texto plano muere aquí:
// nunca se guarda ni se devuelve por ningún endpoint.
pub fn hash_password(password: &str) -> Result<String, String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| "Error al encriptar contraseña".to_string())
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(password_hash) else {
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_y_verificacion() {
        let hash = hash_password("secreto123").unwrap();

        assert_ne!(hash, "secreto123");
        assert!(verify_password("secreto123", &hash));
        assert!(!verify_password("otra-cosa", &hash));
    }

    #[test]
    fn hashes_distintos_por_salt() {
        let a = hash_password("secreto123").unwrap();
        let b = hash_password("secreto123").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn hash_corrupto_no_verifica() {
        assert!(!verify_password("secreto123", "no-es-un-hash"));
    }
}
