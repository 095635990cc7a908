use utoipa::OpenApi;

use crate::routes::{admin, chat, health, presence};

#[derive(OpenApi)]
#[openapi(info(
    title = "frontdesk-server",
    description = "frontdesk-server API",
    version = "0.1.0",
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(health::HealthApi::openapi());
    root.merge(presence::PresenceApi::openapi());
    root.merge(chat::ChatApi::openapi());
    root.merge(admin::api_docs());
    root
}
