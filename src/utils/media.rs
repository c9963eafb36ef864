use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

// Carpeta fija donde el servicio externo guarda las portadas
pub const MEDIA_FOLDER: &str = "blog-images";

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("error de red con el servicio de imágenes: {0}")]
    Http(#[from] reqwest::Error),
    #[error("respuesta inválida del servicio de imágenes")]
    BadResponse,
}

// Contrato con el servicio externo de imágenes. Los handlers solo conocen
// este trait; en producción lo implementa HttpMedia y en pruebas un mock.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Sube la imagen (data URI en base64) y devuelve la URL pública.
    async fn upload(&self, data: &str, folder: &str) -> Result<String, MediaError>;

    /// Borra una imagen por su public id.
    async fn delete(&self, public_id: &str) -> Result<(), MediaError>;

    /// Borrado best-effort a partir de la URL guardada: los fallos se
    /// registran y se tragan, nunca bloquean la mutación del blog.
    async fn delete_by_url(&self, url: &str) {
        let Some(public_id) = public_id_from_url(url) else {
            tracing::warn!("URL de imagen sin public id reconocible: {}", url);
            return;
        };

        if let Err(e) = self.delete(&public_id).await {
            tracing::error!("No se pudo borrar la imagen {}: {:?}", public_id, e);
        }
    }
}

// "https://cdn.example.com/xyz/blog-images/abc123.jpg" -> "blog-images/abc123"
pub fn public_id_from_url(url: &str) -> Option<String> {
    let stem = url.rsplit('/').next()?.split('.').next()?;

    if stem.is_empty() {
        return None;
    }

    Some(format!("{}/{}", MEDIA_FOLDER, stem))
}

// Cliente HTTP real contra MEDIA_API_URL
pub struct HttpMedia {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpMedia {
    pub fn from_env() -> Self {
        let base_url = std::env::var("MEDIA_API_URL").expect("MEDIA_API_URL debe estar en .env");
        let api_key = std::env::var("MEDIA_API_KEY").expect("MEDIA_API_KEY debe estar en .env");

        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: String,
}

#[async_trait]
impl MediaStore for HttpMedia {
    async fn upload(&self, data: &str, folder: &str) -> Result<String, MediaError> {
        // Perfil fijo de transformación para portadas: 800x450 recortada,
        // calidad y formato a criterio del servicio
        let body = json!({
            "file": data,
            "folder": folder,
            "transformation": {
                "width": 800,
                "height": 450,
                "crop": "fill",
                "quality": "auto",
                "format": "auto",
            },
        });

        let response = self
            .http
            .post(format!("{}/upload", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MediaError::BadResponse);
        }

        let parsed: UploadResponse = response.json().await.map_err(|_| MediaError::BadResponse)?;
        Ok(parsed.url)
    }

    async fn delete(&self, public_id: &str) -> Result<(), MediaError> {
        let response = self
            .http
            .delete(format!("{}/images/{}", self.base_url, public_id))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MediaError::BadResponse);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn public_id_desde_url() {
        assert_eq!(
            public_id_from_url("https://cdn.example.com/v1/blog-images/abc123.jpg").as_deref(),
            Some("blog-images/abc123")
        );
        assert_eq!(
            public_id_from_url("https://cdn.example.com/foto.con.puntos.png").as_deref(),
            Some("blog-images/foto")
        );
        assert_eq!(public_id_from_url(""), None);
        assert_eq!(public_id_from_url("https://cdn.example.com/"), None);
    }

    struct FailingMedia {
        deletes: AtomicUsize,
    }

    #[async_trait]
    impl MediaStore for FailingMedia {
        async fn upload(&self, _data: &str, _folder: &str) -> Result<String, MediaError> {
            Err(MediaError::BadResponse)
        }

        async fn delete(&self, _public_id: &str) -> Result<(), MediaError> {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            Err(MediaError::BadResponse)
        }
    }

    #[tokio::test]
    async fn delete_by_url_traga_los_fallos() {
        let media = FailingMedia {
            deletes: AtomicUsize::new(0),
        };

        // No debe propagar el error ni entrar en pánico
        media
            .delete_by_url("https://cdn.example.com/blog-images/abc.jpg")
            .await;
        assert_eq!(media.deletes.load(Ordering::SeqCst), 1);

        // URL sin public id: ni siquiera se intenta el borrado
        media.delete_by_url("").await;
        assert_eq!(media.deletes.load(Ordering::SeqCst), 1);
    }
}
