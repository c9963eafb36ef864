use std::sync::Arc;

use crate::{db::DbPool, utils::media::MediaStore};

// Estado compartido de la aplicación: el pool de Postgres y el cliente
// del servicio externo de imágenes. Se inyecta en los handlers con State.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub media: Arc<dyn MediaStore>,
}
