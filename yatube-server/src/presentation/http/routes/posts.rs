use axum::Router;
use axum::middleware;
use axum::routing::get;

use crate::presentation::AppState;
use crate::presentation::http::handlers::posts::{
    create_post, create_post_form, edit_post, edit_post_form, group_posts, index, post_detail,
    profile,
};
use crate::presentation::http::middleware::auth::login_required;

pub(crate) fn router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/", get(index))
        .route("/group/{slug}/", get(group_posts))
        .route("/profile/{username}/", get(profile))
        .route("/posts/{id}/", get(post_detail));

    let protected = Router::new()
        .route("/create/", get(create_post_form).post(create_post))
        .route("/posts/{id}/edit/", get(edit_post_form).post(edit_post))
        .route_layer(middleware::from_fn_with_state(state, login_required));

    public.merge(protected)
}
