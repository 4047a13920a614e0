use std::collections::BTreeMap;

use axum::{
    Form, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::application::post_service::{EditAccess, EditOutcome, GroupPage, PostDetail, ProfilePage};
use crate::domain::error::DomainError;
use crate::domain::group::Group;
use crate::domain::pagination::Page;
use crate::domain::post::{Author, GroupRef, Post, PostForm};
use crate::presentation::AppState;
use crate::presentation::http::app_error::{AppError, AppResult};
use crate::presentation::http::middleware::auth::{AuthenticatedUser, login_redirect_url};

#[derive(Debug, Deserialize)]
pub(crate) struct PageQuery {
    pub(crate) page: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub(crate) struct PostFormDto {
    #[serde(default)]
    pub(crate) text: String,
    /// Group id; empty means no group.
    #[serde(default)]
    pub(crate) group: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct AuthorDto {
    pub(crate) id: i64,
    pub(crate) username: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct GroupRefDto {
    pub(crate) id: i64,
    pub(crate) slug: String,
    pub(crate) title: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct GroupDto {
    pub(crate) id: i64,
    pub(crate) title: String,
    pub(crate) slug: String,
    pub(crate) description: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct PostDto {
    pub(crate) id: i64,
    pub(crate) text: String,
    pub(crate) author: AuthorDto,
    pub(crate) group: Option<GroupRefDto>,
    pub(crate) created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct PageMetaDto {
    pub(crate) number: u32,
    pub(crate) num_pages: u32,
    pub(crate) per_page: u32,
    pub(crate) count: i64,
    pub(crate) has_next: bool,
    pub(crate) has_previous: bool,
    pub(crate) next_page_number: Option<u32>,
    pub(crate) previous_page_number: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct PostListDto {
    pub(crate) posts: Vec<PostDto>,
    pub(crate) page: PageMetaDto,
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct GroupPageDto {
    pub(crate) group: GroupDto,
    pub(crate) posts: Vec<PostDto>,
    pub(crate) page: PageMetaDto,
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct ProfilePageDto {
    pub(crate) author: AuthorDto,
    pub(crate) number_of_posts: i64,
    pub(crate) posts: Vec<PostDto>,
    pub(crate) page: PageMetaDto,
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct PostDetailDto {
    pub(crate) post: PostDto,
    pub(crate) title: String,
    pub(crate) number_of_posts: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct PostFormViewDto {
    pub(crate) is_edit: bool,
    pub(crate) post_id: Option<i64>,
    pub(crate) form: PostFormDto,
    pub(crate) errors: BTreeMap<String, String>,
    pub(crate) groups: Vec<GroupDto>,
}

impl From<Author> for AuthorDto {
    fn from(author: Author) -> Self {
        Self {
            id: author.id,
            username: author.username,
        }
    }
}

impl From<GroupRef> for GroupRefDto {
    fn from(group: GroupRef) -> Self {
        Self {
            id: group.id,
            slug: group.slug,
            title: group.title,
        }
    }
}

impl From<Group> for GroupDto {
    fn from(group: Group) -> Self {
        Self {
            id: group.id,
            title: group.title,
            slug: group.slug,
            description: group.description,
        }
    }
}

impl From<Post> for PostDto {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            text: post.text,
            author: post.author.into(),
            group: post.group.map(GroupRefDto::from),
            created_at: post.created_at,
        }
    }
}

impl From<PostFormDto> for PostForm {
    fn from(dto: PostFormDto) -> Self {
        Self {
            text: dto.text,
            group: dto.group,
        }
    }
}

impl From<PostForm> for PostFormDto {
    fn from(form: PostForm) -> Self {
        Self {
            text: form.text,
            group: form.group,
        }
    }
}

impl<T> From<&Page<T>> for PageMetaDto {
    fn from(page: &Page<T>) -> Self {
        Self {
            number: page.number,
            num_pages: page.num_pages,
            per_page: page.per_page,
            count: page.total,
            has_next: page.has_next(),
            has_previous: page.has_previous(),
            next_page_number: page.next_page_number(),
            previous_page_number: page.previous_page_number(),
        }
    }
}

fn split_page(page: Page<Post>) -> (Vec<PostDto>, PageMetaDto) {
    let meta = PageMetaDto::from(&page);
    let posts = page.items.into_iter().map(PostDto::from).collect();
    (posts, meta)
}

impl From<Page<Post>> for PostListDto {
    fn from(page: Page<Post>) -> Self {
        let (posts, page) = split_page(page);
        Self { posts, page }
    }
}

impl From<GroupPage> for GroupPageDto {
    fn from(result: GroupPage) -> Self {
        let (posts, page) = split_page(result.page);
        Self {
            group: result.group.into(),
            posts,
            page,
        }
    }
}

impl From<ProfilePage> for ProfilePageDto {
    fn from(result: ProfilePage) -> Self {
        let author = Author {
            id: result.author.id,
            username: result.author.username,
        };
        let (posts, page) = split_page(result.page);
        Self {
            author: author.into(),
            number_of_posts: result.post_count,
            posts,
            page,
        }
    }
}

impl From<PostDetail> for PostDetailDto {
    fn from(detail: PostDetail) -> Self {
        Self {
            title: detail.post.title(),
            number_of_posts: detail.author_post_count,
            post: detail.post.into(),
        }
    }
}

pub(crate) fn profile_path(username: &str) -> String {
    format!("/profile/{}/", urlencoding::encode(username))
}

pub(crate) fn post_detail_path(post_id: i64) -> String {
    format!("/posts/{post_id}/")
}

/// Turns a field validation failure into form errors; anything else stays an error.
fn form_errors(err: DomainError) -> AppResult<BTreeMap<String, String>> {
    match err {
        DomainError::Validation { field, message } => {
            Ok(BTreeMap::from([(field.to_string(), message.to_string())]))
        }
        other => Err(AppError::from(other)),
    }
}

async fn render_form(
    state: &AppState,
    form: PostForm,
    errors: BTreeMap<String, String>,
    post_id: Option<i64>,
) -> AppResult<Response> {
    let groups = state.post_service.group_choices().await?;
    let view = PostFormViewDto {
        is_edit: post_id.is_some(),
        post_id,
        form: form.into(),
        errors,
        groups: groups.into_iter().map(GroupDto::from).collect(),
    };
    Ok((StatusCode::OK, Json(view)).into_response())
}

#[utoipa::path(
    get,
    path = "/",
    tag = "posts",
    params(
        ("page" = Option<String>, Query, description = "1-based page number")
    ),
    responses(
        (status = 200, description = "Latest posts", body = PostListDto),
        (status = 500, description = "Internal error")
    )
)]
pub(crate) async fn index(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<(StatusCode, Json<PostListDto>)> {
    let page = state.post_service.index(query.page.as_deref()).await?;
    Ok((StatusCode::OK, Json(PostListDto::from(page))))
}

#[utoipa::path(
    get,
    path = "/group/{slug}/",
    tag = "posts",
    params(
        ("slug" = String, Path, description = "Group slug"),
        ("page" = Option<String>, Query, description = "1-based page number")
    ),
    responses(
        (status = 200, description = "Posts of the group", body = GroupPageDto),
        (status = 404, description = "Group not found"),
        (status = 500, description = "Internal error")
    )
)]
pub(crate) async fn group_posts(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<(StatusCode, Json<GroupPageDto>)> {
    let result = state
        .post_service
        .group_posts(&slug, query.page.as_deref())
        .await?;
    Ok((StatusCode::OK, Json(GroupPageDto::from(result))))
}

#[utoipa::path(
    get,
    path = "/profile/{username}/",
    tag = "posts",
    params(
        ("username" = String, Path, description = "Author username"),
        ("page" = Option<String>, Query, description = "1-based page number")
    ),
    responses(
        (status = 200, description = "Posts of the author", body = ProfilePageDto),
        (status = 404, description = "User not found"),
        (status = 500, description = "Internal error")
    )
)]
pub(crate) async fn profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<(StatusCode, Json<ProfilePageDto>)> {
    let result = state
        .post_service
        .profile(&username, query.page.as_deref())
        .await?;
    Ok((StatusCode::OK, Json(ProfilePageDto::from(result))))
}

#[utoipa::path(
    get,
    path = "/posts/{id}/",
    tag = "posts",
    params(
        ("id" = i64, Path, description = "Post id")
    ),
    responses(
        (status = 200, description = "Post found", body = PostDetailDto),
        (status = 404, description = "Post not found"),
        (status = 500, description = "Internal error")
    )
)]
pub(crate) async fn post_detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<(StatusCode, Json<PostDetailDto>)> {
    let detail = state.post_service.post_detail(id).await?;
    Ok((StatusCode::OK, Json(PostDetailDto::from(detail))))
}

#[utoipa::path(
    get,
    path = "/create/",
    tag = "posts",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Empty post form", body = PostFormViewDto),
        (status = 303, description = "Redirect to login")
    )
)]
pub(crate) async fn create_post_form(State(state): State<AppState>) -> AppResult<Response> {
    render_form(&state, PostForm::default(), BTreeMap::new(), None).await
}

#[utoipa::path(
    post,
    path = "/create/",
    tag = "posts",
    security(
        ("bearer_auth" = [])
    ),
    request_body(content = PostFormDto, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Created; redirect to the author's profile, or to login"),
        (status = 200, description = "Form with validation errors", body = PostFormViewDto),
        (status = 500, description = "Internal error")
    )
)]
pub(crate) async fn create_post(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Form(dto): Form<PostFormDto>,
) -> AppResult<Response> {
    let form = PostForm::from(dto);

    match state.post_service.create_post(auth.user_id, &form).await {
        Ok(post) => Ok(Redirect::to(&profile_path(&post.author.username)).into_response()),
        Err(DomainError::UnknownAuthor(_)) => {
            let target = login_redirect_url(&state.login_url, "/create/");
            Ok(Redirect::to(&target).into_response())
        }
        Err(err) => render_form(&state, form, form_errors(err)?, None).await,
    }
}

#[utoipa::path(
    get,
    path = "/posts/{id}/edit/",
    tag = "posts",
    security(
        ("bearer_auth" = [])
    ),
    params(
        ("id" = i64, Path, description = "Post id")
    ),
    responses(
        (status = 200, description = "Form bound to the post", body = PostFormViewDto),
        (status = 303, description = "Not the author (to detail) or anonymous (to login)"),
        (status = 404, description = "Post not found"),
        (status = 500, description = "Internal error")
    )
)]
pub(crate) async fn edit_post_form(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    match state.post_service.edit_access(auth.user_id, id).await? {
        EditAccess::Author(post) => {
            render_form(&state, PostForm::from_post(&post), BTreeMap::new(), Some(id)).await
        }
        EditAccess::NotAuthor => Ok(Redirect::to(&post_detail_path(id)).into_response()),
    }
}

#[utoipa::path(
    post,
    path = "/posts/{id}/edit/",
    tag = "posts",
    security(
        ("bearer_auth" = [])
    ),
    params(
        ("id" = i64, Path, description = "Post id")
    ),
    request_body(content = PostFormDto, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Redirect to the post (saved, or not the author) or to login"),
        (status = 200, description = "Form with validation errors", body = PostFormViewDto),
        (status = 404, description = "Post not found"),
        (status = 500, description = "Internal error")
    )
)]
pub(crate) async fn edit_post(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(id): Path<i64>,
    Form(dto): Form<PostFormDto>,
) -> AppResult<Response> {
    let form = PostForm::from(dto);

    match state.post_service.update_post(auth.user_id, id, &form).await {
        Ok(EditOutcome::Updated(_) | EditOutcome::NotAuthor) => {
            Ok(Redirect::to(&post_detail_path(id)).into_response())
        }
        Err(err) => render_form(&state, form, form_errors(err)?, Some(id)).await,
    }
}
