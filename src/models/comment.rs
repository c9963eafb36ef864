use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

use crate::models::user::AuthorInfo;

// Respuesta embebida dentro del comentario, tal cual se guarda en el
// JSONB: un solo nivel, sin id propio, sin likes y sin edición.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub content: String,
    pub author: i64,
    pub created_at: DateTime<Utc>,
}

// Fila de comments con autor y likes agregados
#[derive(Debug, FromRow)]
pub struct CommentRow {
    pub id: i64,
    pub content: String,
    pub author_id: i64,
    pub blog_id: i64,
    pub is_edited: bool,
    pub replies: Json<Vec<Reply>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author_name: String,
    pub author_avatar: String,
    pub liked_by: Vec<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyResponse {
    pub content: String,
    pub author: AuthorInfo,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: i64,
    pub content: String,
    pub author: AuthorInfo,
    pub blog_id: i64,
    pub likes: Vec<i64>,
    pub is_edited: bool,
    pub replies: Vec<ReplyResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CommentRow {
    // reply_authors: id de usuario -> (nombre, avatar), resuelto en lote
    // por el handler para no consultar usuario por usuario
    pub fn into_response(self, reply_authors: &HashMap<i64, (String, String)>) -> CommentResponse {
        let replies = self
            .replies
            .0
            .into_iter()
            .map(|reply| {
                let (name, avatar) = reply_authors
                    .get(&reply.author)
                    .cloned()
                    .unwrap_or_default();

                ReplyResponse {
                    content: reply.content,
                    author: AuthorInfo {
                        id: reply.author,
                        name,
                        avatar: Some(avatar),
                        bio: None,
                        email: None,
                    },
                    created_at: reply.created_at,
                }
            })
            .collect();

        CommentResponse {
            id: self.id,
            content: self.content,
            author: AuthorInfo {
                id: self.author_id,
                name: self.author_name,
                avatar: Some(self.author_avatar),
                bio: None,
                email: None,
            },
            blog_id: self.blog_id,
            likes: self.liked_by,
            is_edited: self.is_edited,
            replies,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

// Cuerpo de POST /api/comments
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentSchema {
    pub content: String,
    pub blog_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCommentSchema {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ReplySchema {
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_serializa_en_camel_case() {
        let reply = Reply {
            content: "¡Gracias!".to_string(),
            author: 7,
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&reply).unwrap();

        assert!(json.get("createdAt").is_some());
        assert_eq!(json["author"], 7);

        let back: Reply = serde_json::from_value(json).unwrap();
        assert_eq!(back.content, "¡Gracias!");
    }

    #[test]
    fn comentario_adjunta_autores_de_respuestas() {
        let row = CommentRow {
            id: 1,
            content: "Buen artículo".to_string(),
            author_id: 2,
            blog_id: 10,
            is_edited: false,
            replies: Json(vec![Reply {
                content: "¡Gracias!".to_string(),
                author: 5,
                created_at: Utc::now(),
            }]),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            author_name: "Berta".to_string(),
            author_avatar: "b.png".to_string(),
            liked_by: vec![5, 9],
        };

        let mut authors = HashMap::new();
        authors.insert(5, ("Ana".to_string(), "a.png".to_string()));

        let response = row.into_response(&authors);

        assert_eq!(response.author.name, "Berta");
        assert_eq!(response.likes, vec![5, 9]);
        assert_eq!(response.replies.len(), 1);
        assert_eq!(response.replies[0].author.name, "Ana");
        assert!(!response.is_edited);
    }
}
