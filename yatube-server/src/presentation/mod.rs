use std::sync::Arc;

use crate::application::post_service::PostService;
use crate::data::group_repository::GroupRepository;
use crate::data::post_repository::PostRepository;
use crate::data::user_repository::UserRepository;
use crate::infrastructure::jwt::JwtService;

pub(crate) mod http;

/// Post service over type-erased repositories, so any store can back the router.
pub(crate) type SharedPostService =
    PostService<Arc<dyn PostRepository>, Arc<dyn GroupRepository>, Arc<dyn UserRepository>>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) post_service: Arc<SharedPostService>,
    pub(crate) jwt: Arc<JwtService>,
    pub(crate) login_url: Arc<str>,
}

impl AppState {
    pub(crate) fn new(
        post_service: Arc<SharedPostService>,
        jwt: Arc<JwtService>,
        login_url: &str,
    ) -> Self {
        Self {
            post_service,
            jwt,
            login_url: Arc::from(login_url),
        }
    }
}
