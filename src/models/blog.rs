use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::comment::CommentResponse;
use crate::models::user::AuthorInfo;

// Categorías fijas de la plataforma
pub const CATEGORIES: [&str; 10] = [
    "Technology",
    "Lifestyle",
    "Travel",
    "Food",
    "Health",
    "Business",
    "Education",
    "Entertainment",
    "Sports",
    "Other",
];

pub fn is_valid_category(category: &str) -> bool {
    CATEGORIES.contains(&category)
}

// Tiempo de lectura estimado: ~200 palabras por minuto, mínimo 1.
// Se recalcula en cada escritura del contenido.
pub fn estimate_read_time(content: &str) -> i32 {
    let words = content.split_whitespace().count();
    words.div_ceil(200).max(1) as i32
}

// "rust, web , api" -> ["rust", "web", "api"]
pub fn parse_tags(csv: Option<&str>) -> Vec<String> {
    match csv {
        Some(raw) => raw
            .split(',')
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect(),
        None => Vec::new(),
    }
}

// Fila de blogs sin joins, para chequeos de existencia/autorización
// y para las mutaciones que parten del estado guardado
#[derive(Debug, FromRow)]
pub struct BlogRecord {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub category: String,
    pub tags: Vec<String>,
    pub image: String,
    pub author_id: i64,
    pub views: i64,
    pub is_published: bool,
    pub read_time: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Fila de la consulta grande: blog + autor + likes agregados
#[derive(Debug, FromRow)]
pub struct BlogRow {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub category: String,
    pub tags: Vec<String>,
    pub image: String,
    pub author_id: i64,
    pub views: i64,
    pub is_published: bool,
    pub read_time: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author_name: String,
    pub author_email: String,
    pub author_avatar: String,
    pub author_bio: String,
    pub liked_by: Vec<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogResponse {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub category: String,
    pub tags: Vec<String>,
    pub image: String,
    pub author: AuthorInfo,
    pub likes: Vec<i64>,
    pub comments: Vec<CommentResponse>,
    pub views: i64,
    pub is_published: bool,
    pub read_time: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BlogRow {
    // include_email: solo las vistas de administración exponen el email del autor
    pub fn into_response(self, comments: Vec<CommentResponse>, include_email: bool) -> BlogResponse {
        BlogResponse {
            id: self.id,
            title: self.title,
            content: self.content,
            excerpt: self.excerpt,
            category: self.category,
            tags: self.tags,
            image: self.image,
            author: AuthorInfo {
                id: self.author_id,
                name: self.author_name,
                avatar: Some(self.author_avatar),
                bio: Some(self.author_bio),
                email: include_email.then_some(self.author_email),
            },
            likes: self.liked_by,
            comments,
            views: self.views,
            is_published: self.is_published,
            read_time: self.read_time,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

// Lo que recibimos del cliente al crear un blog. La imagen viaja como
// data URI en base64 y se sube al servicio externo antes del INSERT.
#[derive(Debug, Deserialize)]
pub struct CreateBlogSchema {
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub category: String,
    pub tags: Option<String>, // CSV: "rust, web"
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBlogSchema {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub category: Option<String>,
    pub tags: Option<String>,
    pub image: Option<String>,
}

// Filtros del listado público (?category=...&search=...&sortBy=views:desc)
#[derive(Debug, Default, Deserialize)]
pub struct FilterOptions {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub tags: Option<String>,
    pub author: Option<i64>,
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
}

// Resumen de blog para el perfil público de un usuario
#[derive(Debug, FromRow)]
pub struct BlogSummaryRow {
    pub id: i64,
    pub title: String,
    pub excerpt: Option<String>,
    pub category: String,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub liked_by: Vec<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogSummary {
    pub id: i64,
    pub title: String,
    pub excerpt: Option<String>,
    pub category: String,
    pub views: i64,
    pub likes: Vec<i64>,
    pub created_at: DateTime<Utc>,
}

impl From<BlogSummaryRow> for BlogSummary {
    fn from(row: BlogSummaryRow) -> Self {
        BlogSummary {
            id: row.id,
            title: row.title,
            excerpt: row.excerpt,
            category: row.category,
            views: row.views,
            likes: row.liked_by,
            created_at: row.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiempo_de_lectura() {
        // Mínimo 1 incluso sin contenido real
        assert_eq!(estimate_read_time(""), 1);
        assert_eq!(estimate_read_time("hola"), 1);

        let palabras = |n: usize| vec!["palabra"; n].join(" ");

        assert_eq!(estimate_read_time(&palabras(200)), 1);
        assert_eq!(estimate_read_time(&palabras(201)), 2);
        // Un artículo de 400 palabras se lee en 2 minutos
        assert_eq!(estimate_read_time(&palabras(400)), 2);
        assert_eq!(estimate_read_time(&palabras(1000)), 5);
    }

    #[test]
    fn parseo_de_tags() {
        assert_eq!(parse_tags(None), Vec::<String>::new());
        assert_eq!(parse_tags(Some("")), Vec::<String>::new());
        assert_eq!(
            parse_tags(Some("rust, web , api")),
            vec!["rust", "web", "api"]
        );
        // Comas dobles y espacios sueltos no generan tags vacíos
        assert_eq!(parse_tags(Some("rust,,  ,web")), vec!["rust", "web"]);
    }

    #[test]
    fn categorias_validas() {
        assert!(is_valid_category("Technology"));
        assert!(is_valid_category("Other"));
        assert!(!is_valid_category("technology"));
        assert!(!is_valid_category("Política"));
    }
}
