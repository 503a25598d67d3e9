//! Shared application state threaded through every handler

use sqlx::PgPool;

use crate::jwt::JwtService;
use crate::oauth::{GoogleOAuthClient, OAuthStateStore};
use crate::repositories::CategoryRepository;
use crate::repositories::post::PostRepository;
use crate::repositories::stats::StatsRepository;
use crate::repositories::user::UserRepository;

/// Everything the handlers need, constructed once at startup
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub users: UserRepository,
    pub posts: PostRepository,
    pub categories: CategoryRepository,
    pub stats: StatsRepository,
    pub oauth_states: OAuthStateStore,
    pub jwt: JwtService,
    /// `None` when Google sign-in is not configured for this deployment
    pub oauth_client: Option<GoogleOAuthClient>,
    pub frontend_url: String,
}

impl AppState {
    /// Wire up the repositories over one shared pool
    pub fn new(
        pool: PgPool,
        jwt: JwtService,
        oauth_client: Option<GoogleOAuthClient>,
        frontend_url: String,
    ) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            posts: PostRepository::new(pool.clone()),
            categories: CategoryRepository::new(pool.clone()),
            stats: StatsRepository::new(pool.clone()),
            oauth_states: OAuthStateStore::new(pool.clone()),
            db_pool: pool,
            jwt,
            oauth_client,
            frontend_url,
        }
    }
}
