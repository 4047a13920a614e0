use tracing::{debug, info, warn};

use crate::data::group_repository::GroupRepository;
use crate::data::post_repository::{NewPost, PostFilter, PostPatch, PostRepository};
use crate::data::user_repository::UserRepository;
use crate::domain::error::DomainError;
use crate::domain::group::Group;
use crate::domain::pagination::{Page, Paginator};
use crate::domain::post::{Post, PostForm, ValidPost};
use crate::domain::user::User;

#[derive(Debug, Clone)]
pub(crate) struct GroupPage {
    pub(crate) group: Group,
    pub(crate) page: Page<Post>,
}

#[derive(Debug, Clone)]
pub(crate) struct ProfilePage {
    pub(crate) author: User,
    pub(crate) page: Page<Post>,
    pub(crate) post_count: i64,
}

#[derive(Debug, Clone)]
pub(crate) struct PostDetail {
    pub(crate) post: Post,
    pub(crate) author_post_count: i64,
}

/// Result of opening a post for editing.
#[derive(Debug, Clone)]
pub(crate) enum EditAccess {
    Author(Post),
    NotAuthor,
}

#[derive(Debug, Clone)]
pub(crate) enum EditOutcome {
    Updated(Post),
    NotAuthor,
}

pub(crate) struct PostService<P, G, U>
where
    P: PostRepository,
    G: GroupRepository,
    U: UserRepository,
{
    posts: P,
    groups: G,
    users: U,
    paginator: Paginator,
}

impl<P, G, U> PostService<P, G, U>
where
    P: PostRepository,
    G: GroupRepository,
    U: UserRepository,
{
    pub(crate) fn new(posts: P, groups: G, users: U, paginator: Paginator) -> Self {
        Self {
            posts,
            groups,
            users,
            paginator,
        }
    }

    pub(crate) async fn index(&self, page: Option<&str>) -> Result<Page<Post>, DomainError> {
        self.paginate(PostFilter::All, page).await
    }

    pub(crate) async fn group_posts(
        &self,
        slug: &str,
        page: Option<&str>,
    ) -> Result<GroupPage, DomainError> {
        let group = self
            .groups
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("group slug: {slug}")))?;

        let page = self.paginate(PostFilter::Group(group.id), page).await?;
        Ok(GroupPage { group, page })
    }

    pub(crate) async fn profile(
        &self,
        username: &str,
        page: Option<&str>,
    ) -> Result<ProfilePage, DomainError> {
        let author = self
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("username: {username}")))?;

        let page = self.paginate(PostFilter::Author(author.id), page).await?;
        let post_count = page.total;
        Ok(ProfilePage {
            author,
            page,
            post_count,
        })
    }

    pub(crate) async fn post_detail(&self, post_id: i64) -> Result<PostDetail, DomainError> {
        let post = self.get_post(post_id).await?;
        let author_post_count = self
            .posts
            .count_posts(PostFilter::Author(post.author.id))
            .await?;

        Ok(PostDetail {
            post,
            author_post_count,
        })
    }

    pub(crate) async fn group_choices(&self) -> Result<Vec<Group>, DomainError> {
        self.groups.list_groups().await
    }

    pub(crate) async fn create_post(
        &self,
        author_id: i64,
        form: &PostForm,
    ) -> Result<Post, DomainError> {
        let valid = self.validate_form(form).await?;

        let new_post = NewPost {
            text: valid.text,
            author_id,
            group_id: valid.group_id,
        };
        let post = self.posts.create_post(new_post).await?;
        info!(post_id = post.id, author_id, "post created");
        Ok(post)
    }

    pub(crate) async fn edit_access(
        &self,
        actor_user_id: i64,
        post_id: i64,
    ) -> Result<EditAccess, DomainError> {
        let post = self.get_post(post_id).await?;
        if post.author.id != actor_user_id {
            warn!(post_id, actor_user_id, "edit attempt by non-author");
            return Ok(EditAccess::NotAuthor);
        }
        Ok(EditAccess::Author(post))
    }

    pub(crate) async fn update_post(
        &self,
        actor_user_id: i64,
        post_id: i64,
        form: &PostForm,
    ) -> Result<EditOutcome, DomainError> {
        if let EditAccess::NotAuthor = self.edit_access(actor_user_id, post_id).await? {
            return Ok(EditOutcome::NotAuthor);
        }

        let valid = self.validate_form(form).await?;
        let patch = PostPatch {
            text: valid.text,
            group_id: valid.group_id,
        };
        let post = self
            .posts
            .update_post_owned(post_id, actor_user_id, patch)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("post id: {post_id}")))?;

        info!(post_id, actor_user_id, "post updated");
        Ok(EditOutcome::Updated(post))
    }

    async fn get_post(&self, post_id: i64) -> Result<Post, DomainError> {
        self.posts
            .get_post(post_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("post id: {post_id}")))
    }

    async fn paginate(
        &self,
        filter: PostFilter,
        page: Option<&str>,
    ) -> Result<Page<Post>, DomainError> {
        let total = self.posts.count_posts(filter).await?;
        let pagination = self.paginator.locate(page, total);
        debug!(?filter, page = pagination.page, total, "listing posts");

        let posts = self.posts.list_posts(filter, pagination).await?;
        Ok(self.paginator.page(posts, pagination, total))
    }

    async fn validate_form(&self, form: &PostForm) -> Result<ValidPost, DomainError> {
        let valid = form.validate()?;
        if let Some(group_id) = valid.group_id
            && self.groups.get_group(group_id).await?.is_none()
        {
            return Err(DomainError::Validation {
                field: "group",
                message: "select a valid choice",
            });
        }
        Ok(valid)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use super::{EditAccess, EditOutcome, PostService};
    use crate::data::group_repository::{GroupRepository, NewGroup};
    use crate::data::post_repository::{NewPost, PostFilter, PostPatch, PostRepository};
    use crate::data::user_repository::UserRepository;
    use crate::domain::error::DomainError;
    use crate::domain::group::Group;
    use crate::domain::pagination::{Pagination, Paginator};
    use crate::domain::post::{Author, GroupRef, Post, PostForm};
    use crate::domain::user::User;

    #[derive(Default)]
    struct FakeState {
        users: Vec<User>,
        groups: Vec<Group>,
        posts: Vec<Post>,
        pinned_created_at: Option<DateTime<Utc>>,
    }

    /// In-memory store ordering and filtering posts the way the SQL queries do.
    #[derive(Clone, Default)]
    pub(crate) struct FakeStore {
        state: Arc<Mutex<FakeState>>,
    }

    impl FakeStore {
        pub(crate) fn add_user(&self, username: &str) -> User {
            let mut state = self.state.lock().expect("state mutex poisoned");
            let user = User::new(state.users.len() as i64 + 1, username, base_time())
                .expect("user must be valid");
            state.users.push(user.clone());
            user
        }

        pub(crate) fn add_group(&self, slug: &str, title: &str) -> Group {
            let mut state = self.state.lock().expect("state mutex poisoned");
            let group = Group {
                id: state.groups.len() as i64 + 1,
                title: title.to_string(),
                slug: slug.to_string(),
                description: String::new(),
            };
            state.groups.push(group.clone());
            group
        }

        /// Stamps every post created from now on with the same time.
        pub(crate) fn pin_created_at(&self, at: DateTime<Utc>) {
            self.state.lock().expect("state mutex poisoned").pinned_created_at = Some(at);
        }

        pub(crate) fn snapshot(&self, post_id: i64) -> Option<Post> {
            self.state
                .lock()
                .expect("state mutex poisoned")
                .posts
                .iter()
                .find(|post| post.id == post_id)
                .cloned()
        }

        pub(crate) fn post_count(&self) -> usize {
            self.state.lock().expect("state mutex poisoned").posts.len()
        }
    }

    pub(crate) fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn group_ref(state: &FakeState, group_id: Option<i64>) -> Result<Option<GroupRef>, DomainError> {
        group_id
            .map(|id| {
                state
                    .groups
                    .iter()
                    .find(|group| group.id == id)
                    .map(|group| GroupRef {
                        id: group.id,
                        slug: group.slug.clone(),
                        title: group.title.clone(),
                    })
                    .ok_or_else(|| DomainError::NotFound("group".to_string()))
            })
            .transpose()
    }

    fn matches(filter: PostFilter, post: &Post) -> bool {
        match filter {
            PostFilter::All => true,
            PostFilter::Group(id) => post.group_id() == Some(id),
            PostFilter::Author(id) => post.author.id == id,
        }
    }

    #[async_trait]
    impl PostRepository for FakeStore {
        async fn create_post(&self, input: NewPost) -> Result<Post, DomainError> {
            let mut state = self.state.lock().expect("state mutex poisoned");
            let author = state
                .users
                .iter()
                .find(|user| user.id == input.author_id)
                .map(|user| Author {
                    id: user.id,
                    username: user.username.clone(),
                })
                .ok_or(DomainError::UnknownAuthor(input.author_id))?;
            let group = group_ref(&state, input.group_id)?;
            let id = state.posts.len() as i64 + 1;
            let created_at = state
                .pinned_created_at
                .unwrap_or_else(|| base_time() + Duration::seconds(id));

            let post = Post::new(id, input.text, author, group, created_at)?;
            state.posts.push(post.clone());
            Ok(post)
        }

        async fn get_post(&self, id: i64) -> Result<Option<Post>, DomainError> {
            Ok(self.snapshot(id))
        }

        async fn update_post_owned(
            &self,
            post_id: i64,
            owner_id: i64,
            patch: PostPatch,
        ) -> Result<Option<Post>, DomainError> {
            let mut state = self.state.lock().expect("state mutex poisoned");
            let group = group_ref(&state, patch.group_id)?;
            let Some(post) = state
                .posts
                .iter_mut()
                .find(|post| post.id == post_id && post.author.id == owner_id)
            else {
                return Ok(None);
            };
            post.text = patch.text;
            post.group = group;
            Ok(Some(post.clone()))
        }

        async fn list_posts(
            &self,
            filter: PostFilter,
            pagination: Pagination,
        ) -> Result<Vec<Post>, DomainError> {
            let state = self.state.lock().expect("state mutex poisoned");
            let mut posts: Vec<Post> = state
                .posts
                .iter()
                .filter(|post| matches(filter, post))
                .cloned()
                .collect();
            posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

            Ok(posts
                .into_iter()
                .skip(pagination.offset() as usize)
                .take(pagination.limit() as usize)
                .collect())
        }

        async fn count_posts(&self, filter: PostFilter) -> Result<i64, DomainError> {
            let state = self.state.lock().expect("state mutex poisoned");
            Ok(state.posts.iter().filter(|post| matches(filter, post)).count() as i64)
        }
    }

    #[async_trait]
    impl GroupRepository for FakeStore {
        async fn create_group(&self, input: NewGroup) -> Result<Group, DomainError> {
            Ok(self.add_group(&input.slug, &input.title))
        }

        async fn get_group(&self, id: i64) -> Result<Option<Group>, DomainError> {
            let state = self.state.lock().expect("state mutex poisoned");
            Ok(state.groups.iter().find(|group| group.id == id).cloned())
        }

        async fn find_by_slug(&self, slug: &str) -> Result<Option<Group>, DomainError> {
            let state = self.state.lock().expect("state mutex poisoned");
            Ok(state.groups.iter().find(|group| group.slug == slug).cloned())
        }

        async fn list_groups(&self) -> Result<Vec<Group>, DomainError> {
            Ok(self.state.lock().expect("state mutex poisoned").groups.clone())
        }
    }

    #[async_trait]
    impl UserRepository for FakeStore {
        async fn create_user(&self, username: &str) -> Result<User, DomainError> {
            Ok(self.add_user(username))
        }

        async fn find_by_username(&self, username: &str) -> Result<Option<User>, DomainError> {
            let state = self.state.lock().expect("state mutex poisoned");
            Ok(state
                .users
                .iter()
                .find(|user| user.username == username)
                .cloned())
        }
    }

    type TestService = PostService<FakeStore, FakeStore, FakeStore>;

    fn service(store: &FakeStore) -> TestService {
        PostService::new(store.clone(), store.clone(), store.clone(), Paginator::new(10))
    }

    fn form(text: &str, group: Option<i64>) -> PostForm {
        PostForm {
            text: text.to_string(),
            group: group.map(|id| id.to_string()),
        }
    }

    async fn seed_posts(service: &TestService, author: &User, group: Option<&Group>, n: usize) {
        for _ in 0..n {
            service
                .create_post(author.id, &form(&"Тест.".repeat(20), group.map(|g| g.id)))
                .await
                .expect("seed post must be created");
        }
    }

    #[tokio::test]
    async fn fifteen_posts_split_into_ten_and_five_on_every_listing() {
        let store = FakeStore::default();
        let author = store.add_user("auth");
        let group = store.add_group("test-slug", "Тестовая группа");
        let service = service(&store);
        seed_posts(&service, &author, Some(&group), 15).await;

        let first = service.index(None).await.expect("index must succeed");
        let second = service.index(Some("2")).await.expect("index must succeed");
        assert_eq!(first.items.len(), 10);
        assert_eq!(second.items.len(), 5);
        assert_eq!(first.num_pages, 2);

        let first = service
            .group_posts("test-slug", None)
            .await
            .expect("group listing must succeed");
        let second = service
            .group_posts("test-slug", Some("2"))
            .await
            .expect("group listing must succeed");
        assert_eq!(first.page.items.len(), 10);
        assert_eq!(second.page.items.len(), 5);

        let first = service
            .profile("auth", None)
            .await
            .expect("profile must succeed");
        let second = service
            .profile("auth", Some("2"))
            .await
            .expect("profile must succeed");
        assert_eq!(first.page.items.len(), 10);
        assert_eq!(second.page.items.len(), 5);
        assert_eq!(first.post_count, 15);
    }

    #[tokio::test]
    async fn out_of_range_page_serves_last_page() {
        let store = FakeStore::default();
        let author = store.add_user("auth");
        let service = service(&store);
        seed_posts(&service, &author, None, 15).await;

        let page = service.index(Some("42")).await.expect("index must succeed");
        assert_eq!(page.number, 2);
        assert_eq!(page.items.len(), 5);

        let page = service.index(Some("abc")).await.expect("index must succeed");
        assert_eq!(page.number, 1);
        assert_eq!(page.items.len(), 10);
    }

    #[tokio::test]
    async fn listings_are_filtered_by_group_and_ordered_newest_first() {
        let store = FakeStore::default();
        let author = store.add_user("auth");
        let group_1 = store.add_group("test-slug_1", "Тестовая группа 1");
        let group_2 = store.add_group("test-slug_2", "Тестовая группа 2");
        let service = service(&store);

        let post_1 = service
            .create_post(author.id, &form("Тест.", Some(group_1.id)))
            .await
            .expect("post must be created");
        let post_2 = service
            .create_post(author.id, &form("Тест.Тест.", Some(group_1.id)))
            .await
            .expect("post must be created");
        let post_3 = service
            .create_post(author.id, &form("Тест.Тест.Тест.", Some(group_2.id)))
            .await
            .expect("post must be created");

        let group_1_page = service
            .group_posts("test-slug_1", None)
            .await
            .expect("group listing must succeed");
        let ids: Vec<i64> = group_1_page.page.items.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![post_2.id, post_1.id]);
        assert!(
            group_1_page
                .page
                .items
                .iter()
                .all(|p| p.group_id() == Some(group_1.id))
        );

        let group_2_page = service
            .group_posts("test-slug_2", None)
            .await
            .expect("group listing must succeed");
        assert_eq!(group_2_page.page.items.len(), 1);

        let index = service.index(None).await.expect("index must succeed");
        assert_eq!(index.items.len(), 3);
        assert_eq!(index.items[0].id, post_3.id);
        assert_eq!(index.items[0].text, "Тест.Тест.Тест.");
        assert_eq!(index.items[0].author, post_3.author);
    }

    #[tokio::test]
    async fn unknown_slug_and_username_are_not_found() {
        let store = FakeStore::default();
        let service = service(&store);

        let err = service
            .group_posts("missing", None)
            .await
            .expect_err("group must be missing");
        assert!(matches!(err, DomainError::NotFound(_)));

        let err = service
            .profile("ghost", None)
            .await
            .expect_err("user must be missing");
        assert!(matches!(err, DomainError::NotFound(_)));

        let err = service
            .post_detail(404)
            .await
            .expect_err("post must be missing");
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn post_detail_counts_author_posts() {
        let store = FakeStore::default();
        let author = store.add_user("auth");
        let other = store.add_user("other");
        let service = service(&store);
        seed_posts(&service, &author, None, 3).await;
        seed_posts(&service, &other, None, 2).await;

        let detail = service.post_detail(1).await.expect("detail must succeed");
        assert_eq!(detail.post.id, 1);
        assert_eq!(detail.author_post_count, 3);
    }

    #[tokio::test]
    async fn create_post_sets_requester_as_author() {
        let store = FakeStore::default();
        let author = store.add_user("auth");
        let service = service(&store);

        let created = service
            .create_post(author.id, &form("  ТестТест  ", None))
            .await
            .expect("create must succeed");

        assert_eq!(created.text, "ТестТест");
        assert_eq!(created.author.id, author.id);
        assert_eq!(created.author.username, "auth");
        assert_eq!(store.post_count(), 1);
    }

    #[tokio::test]
    async fn create_post_with_blank_text_persists_nothing() {
        let store = FakeStore::default();
        let author = store.add_user("auth");
        let service = service(&store);

        let err = service
            .create_post(author.id, &form("   ", None))
            .await
            .expect_err("blank text must be rejected");
        assert!(matches!(err, DomainError::Validation { field: "text", .. }));
        assert_eq!(store.post_count(), 0);
    }

    #[tokio::test]
    async fn create_post_rejects_unknown_group_choice() {
        let store = FakeStore::default();
        let author = store.add_user("auth");
        let service = service(&store);

        let err = service
            .create_post(author.id, &form("text", Some(99)))
            .await
            .expect_err("unknown group must be rejected");
        assert!(matches!(err, DomainError::Validation { field: "group", .. }));
        assert_eq!(store.post_count(), 0);
    }

    #[tokio::test]
    async fn author_edit_keeps_identity_and_updates_text() {
        let store = FakeStore::default();
        let author = store.add_user("auth");
        let group = store.add_group("test-slug", "Тестовая группа");
        let service = service(&store);
        let post = service
            .create_post(author.id, &form("Тест.", Some(group.id)))
            .await
            .expect("post must be created");

        let outcome = service
            .update_post(author.id, post.id, &form("ТестТестТест", None))
            .await
            .expect("update must succeed");

        let EditOutcome::Updated(updated) = outcome else {
            panic!("expected EditOutcome::Updated");
        };
        assert_eq!(updated.id, post.id);
        assert_eq!(updated.author, post.author);
        assert_eq!(updated.text, "ТестТестТест");
        assert_eq!(updated.group, None);
        assert_eq!(updated.created_at, post.created_at);
        assert_eq!(store.post_count(), 1);
    }

    #[tokio::test]
    async fn non_author_edit_changes_nothing() {
        let store = FakeStore::default();
        let author = store.add_user("auth");
        let intruder = store.add_user("test");
        let service = service(&store);
        let post = service
            .create_post(author.id, &form("Тест.", None))
            .await
            .expect("post must be created");

        let access = service
            .edit_access(intruder.id, post.id)
            .await
            .expect("edit_access must succeed");
        assert!(matches!(access, EditAccess::NotAuthor));

        let outcome = service
            .update_post(intruder.id, post.id, &form("hacked", None))
            .await
            .expect("update must not fail");
        assert!(matches!(outcome, EditOutcome::NotAuthor));

        let stored = store.snapshot(post.id).expect("post must still exist");
        assert_eq!(stored.text, "Тест.");
        assert_eq!(stored.author.id, author.id);
    }

    #[tokio::test]
    async fn author_edit_with_blank_text_is_rejected() {
        let store = FakeStore::default();
        let author = store.add_user("auth");
        let service = service(&store);
        let post = service
            .create_post(author.id, &form("Тест.", None))
            .await
            .expect("post must be created");

        let access = service
            .edit_access(author.id, post.id)
            .await
            .expect("edit_access must succeed");
        assert!(matches!(access, EditAccess::Author(ref p) if p.id == post.id));

        let err = service
            .update_post(author.id, post.id, &form("", None))
            .await
            .expect_err("blank text must be rejected");
        assert!(matches!(err, DomainError::Validation { field: "text", .. }));
        assert_eq!(store.snapshot(post.id).expect("post exists").text, "Тест.");
    }

    #[tokio::test]
    async fn editing_missing_post_is_not_found() {
        let store = FakeStore::default();
        let author = store.add_user("auth");
        let service = service(&store);

        let err = service
            .update_post(author.id, 7, &form("text", None))
            .await
            .expect_err("post must be missing");
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn posts_created_at_same_instant_list_by_id_descending() {
        let store = FakeStore::default();
        let author = store.add_user("auth");
        let group = store.add_group("test-slug", "Тестовая группа");
        store.pin_created_at(base_time());
        let service = service(&store);
        seed_posts(&service, &author, Some(&group), 3).await;

        let index = service.index(None).await.expect("index must succeed");
        assert!(index.items.iter().all(|p| p.created_at == base_time()));
        let ids: Vec<i64> = index.items.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);

        let listing = service
            .group_posts("test-slug", None)
            .await
            .expect("group listing must succeed");
        let ids: Vec<i64> = listing.page.items.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);

        let profile = service
            .profile("auth", None)
            .await
            .expect("profile must succeed");
        let ids: Vec<i64> = profile.page.items.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn create_post_for_deleted_author_is_unknown_author() {
        let store = FakeStore::default();
        let service = service(&store);

        let err = service
            .create_post(42, &form("Тест.", None))
            .await
            .expect_err("author must be missing");
        assert!(matches!(err, DomainError::UnknownAuthor(42)));
        assert_eq!(store.post_count(), 0);
    }
}
