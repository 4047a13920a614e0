use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::presentation::http::handlers::posts::{
    AuthorDto, GroupDto, GroupPageDto, GroupRefDto, PageMetaDto, PostDetailDto, PostDto,
    PostFormDto, PostFormViewDto, PostListDto, ProfilePageDto,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::presentation::http::handlers::posts::index,
        crate::presentation::http::handlers::posts::group_posts,
        crate::presentation::http::handlers::posts::profile,
        crate::presentation::http::handlers::posts::post_detail,
        crate::presentation::http::handlers::posts::create_post_form,
        crate::presentation::http::handlers::posts::create_post,
        crate::presentation::http::handlers::posts::edit_post_form,
        crate::presentation::http::handlers::posts::edit_post
    ),
    components(
        schemas(
            AuthorDto,
            GroupRefDto,
            GroupDto,
            PostDto,
            PageMetaDto,
            PostListDto,
            GroupPageDto,
            ProfilePageDto,
            PostDetailDto,
            PostFormDto,
            PostFormViewDto
        )
    ),
    tags(
        (name = "posts", description = "Feeds, post pages and the post form")
    ),
    modifiers(&SecurityAddon)
)]
pub(crate) struct ApiDoc;

pub(crate) struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let mut components = openapi.components.take().unwrap_or_default();
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
        openapi.components = Some(components);
    }
}

#[cfg(test)]
mod tests {
    use utoipa::OpenApi;

    use super::ApiDoc;

    #[test]
    fn document_lists_page_routes() {
        let doc = ApiDoc::openapi();
        for path in [
            "/",
            "/group/{slug}/",
            "/profile/{username}/",
            "/posts/{id}/",
            "/create/",
            "/posts/{id}/edit/",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
