use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{Request, StatusCode};
use sqlx::PgPool;
use tower::ServiceExt;

use calamus::application::auth::{AuthPrincipal, AuthService, JwtConfig, RegisterCommand};
use calamus::application::comments::{CommentError, CommentService, CreateCommentCommand};
use calamus::application::feed::FeedService;
use calamus::application::pagination::PageRequest;
use calamus::application::posts::{CreatePostCommand, PostError, PostService, UpdatePostCommand};
use calamus::application::repos::{
    CommentsRepo, EngagementRepo, FeedRepo, FollowsRepo, PostQueryFilter, PostsRepo,
    PostsWriteRepo, SearchFilter, SearchRepo, TagsRepo, UsersRepo,
};
use calamus::application::search::{SearchError, SearchService};
use calamus::application::tags::TagService;
use calamus::application::users::{UserError, UserService};
use calamus::domain::types::{PostSort, PostStatus, Rating, SearchKind, SearchSort, SortOrder};
use calamus::infra::db::PostgresRepositories;
use calamus::infra::http::api::middleware::{Fingerprint, OptionalAuth, RequireAuth};
use calamus::infra::http::api::models::PostCreateRequest;
use calamus::infra::http::api::rate_limit::ApiRateLimiter;
use calamus::infra::http::api::state::ApiState;
use calamus::infra::http::api::handlers;

const VIEW_DEDUP_WINDOW: Duration = Duration::from_secs(3600);

fn build_state(pool: PgPool) -> ApiState {
    let repos = Arc::new(PostgresRepositories::new(pool));

    let users_repo: Arc<dyn UsersRepo> = repos.clone();
    let follows_repo: Arc<dyn FollowsRepo> = repos.clone();
    let posts_repo: Arc<dyn PostsRepo> = repos.clone();
    let posts_write_repo: Arc<dyn PostsWriteRepo> = repos.clone();
    let engagement_repo: Arc<dyn EngagementRepo> = repos.clone();
    let comments_repo: Arc<dyn CommentsRepo> = repos.clone();
    let tags_repo: Arc<dyn TagsRepo> = repos.clone();
    let feed_repo: Arc<dyn FeedRepo> = repos.clone();
    let search_repo: Arc<dyn SearchRepo> = repos.clone();

    let jwt = JwtConfig {
        issuer: "calamus".to_string(),
        audience: "calamus-web".to_string(),
        secret: "integration-test-secret-0123456789abcdef".to_string(),
        ttl_seconds: 3600,
    };

    ApiState {
        auth: Arc::new(AuthService::new(users_repo.clone(), jwt)),
        users: Arc::new(UserService::new(users_repo, follows_repo)),
        posts: Arc::new(PostService::new(
            posts_repo.clone(),
            posts_write_repo,
            engagement_repo.clone(),
            VIEW_DEDUP_WINDOW,
        )),
        comments: Arc::new(CommentService::new(
            comments_repo,
            posts_repo,
            engagement_repo,
        )),
        tags: Arc::new(TagService::new(tags_repo)),
        feed: Arc::new(FeedService::new(feed_repo, 30, 10)),
        search: Arc::new(SearchService::new(search_repo)),
        db: repos,
        rate_limiter: Arc::new(ApiRateLimiter::new(Duration::from_secs(60), 1000)),
    }
}

async fn register_user(state: &ApiState, handle: &str) -> AuthPrincipal {
    let registered = state
        .auth
        .register(RegisterCommand {
            email: format!("{handle}@example.com"),
            username: handle.to_string(),
            name: handle.to_string(),
            password: "correct horse battery".to_string(),
        })
        .await
        .expect("register user");

    AuthPrincipal {
        user_id: registered.user.id,
    }
}

fn draft(title: &str) -> CreatePostCommand {
    CreatePostCommand {
        title: title.to_string(),
        content: format!("{title} content"),
        rating: Rating::Teen,
        status: PostStatus::Draft,
        tags: Vec::new(),
    }
}

fn published(title: &str, tags: &[&str]) -> CreatePostCommand {
    CreatePostCommand {
        title: title.to_string(),
        content: format!("{title} content"),
        rating: Rating::Teen,
        status: PostStatus::Published,
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

// ============ Auth ============

#[sqlx::test(migrations = "./migrations")]
async fn register_login_and_token_round_trip(pool: PgPool) {
    let state = build_state(pool);

    let registered = state
        .auth
        .register(RegisterCommand {
            email: "astrid@example.com".to_string(),
            username: "astrid".to_string(),
            name: "Astrid".to_string(),
            password: "correct horse battery".to_string(),
        })
        .await
        .expect("register");

    let principal = state
        .auth
        .verify_token(&registered.access_token)
        .expect("verify token");
    assert_eq!(principal.user_id, registered.user.id);

    let logged_in = state
        .auth
        .login("astrid@example.com", "correct horse battery")
        .await
        .expect("login");
    assert_eq!(logged_in.user.id, registered.user.id);

    let wrong = state.auth.login("astrid@example.com", "not the password").await;
    assert!(wrong.is_err());

    let duplicate = state
        .auth
        .register(RegisterCommand {
            email: "astrid@example.com".to_string(),
            username: "astrid2".to_string(),
            name: "Other".to_string(),
            password: "correct horse battery".to_string(),
        })
        .await;
    assert!(duplicate.is_err());
}

#[sqlx::test(migrations = "./migrations")]
async fn me_handler_returns_account(pool: PgPool) {
    let state = build_state(pool);
    let principal = register_user(&state, "astrid").await;

    let _response = handlers::me(State(state.clone()), RequireAuth(principal))
        .await
        .expect("me via handler");
}

// ============ Posts ============

#[sqlx::test(migrations = "./migrations")]
async fn drafts_are_visible_only_to_their_author(pool: PgPool) {
    let state = build_state(pool);
    let author = register_user(&state, "astrid").await;
    let other = register_user(&state, "bruno").await;

    let detail = state
        .posts
        .create_post(author.user_id, draft("Hidden Draft"))
        .await
        .expect("create draft");

    let as_author = state
        .posts
        .get_post(Some(author.user_id), detail.post.id)
        .await;
    assert!(as_author.is_ok());

    let as_other = state.posts.get_post(Some(other.user_id), detail.post.id).await;
    assert!(matches!(as_other, Err(PostError::NotFound)));

    let anonymous = state.posts.get_post(None, detail.post.id).await;
    assert!(matches!(anonymous, Err(PostError::NotFound)));
}

#[sqlx::test(migrations = "./migrations")]
async fn publishing_stamps_published_at_once(pool: PgPool) {
    let state = build_state(pool);
    let author = register_user(&state, "astrid").await;

    let detail = state
        .posts
        .create_post(author.user_id, draft("Workflow"))
        .await
        .expect("create draft");
    assert!(detail.post.published_at.is_none());

    let published = state
        .posts
        .update_post(
            author.user_id,
            detail.post.id,
            UpdatePostCommand {
                status: Some(PostStatus::Published),
                ..UpdatePostCommand::default()
            },
        )
        .await
        .expect("publish");
    let first_published_at = published.post.published_at.expect("published_at stamped");

    let archived = state
        .posts
        .update_post(
            author.user_id,
            detail.post.id,
            UpdatePostCommand {
                status: Some(PostStatus::Archived),
                ..UpdatePostCommand::default()
            },
        )
        .await
        .expect("archive");
    assert_eq!(archived.post.published_at, Some(first_published_at));

    let republished = state
        .posts
        .update_post(
            author.user_id,
            detail.post.id,
            UpdatePostCommand {
                status: Some(PostStatus::Published),
                ..UpdatePostCommand::default()
            },
        )
        .await
        .expect("republish");
    assert_eq!(republished.post.published_at, Some(first_published_at));
}

#[sqlx::test(migrations = "./migrations")]
async fn only_the_author_may_modify_a_post(pool: PgPool) {
    let state = build_state(pool);
    let author = register_user(&state, "astrid").await;
    let other = register_user(&state, "bruno").await;

    let detail = state
        .posts
        .create_post(author.user_id, published("Guarded", &[]))
        .await
        .expect("create post");

    let update = state
        .posts
        .update_post(
            other.user_id,
            detail.post.id,
            UpdatePostCommand {
                title: Some("Taken Over".to_string()),
                ..UpdatePostCommand::default()
            },
        )
        .await;
    assert!(matches!(update, Err(PostError::Forbidden)));

    let delete = state.posts.delete_post(other.user_id, detail.post.id).await;
    assert!(matches!(delete, Err(PostError::Forbidden)));
}

#[sqlx::test(migrations = "./migrations")]
async fn listing_filters_by_tag_and_search(pool: PgPool) {
    let state = build_state(pool);
    let author = register_user(&state, "astrid").await;

    state
        .posts
        .create_post(author.user_id, published("Moonlit Harbor", &["fantasy"]))
        .await
        .expect("post one");
    state
        .posts
        .create_post(author.user_id, published("Iron Orchard", &["sci-fi"]))
        .await
        .expect("post two");
    state
        .posts
        .create_post(author.user_id, draft("Unfinished"))
        .await
        .expect("draft");

    let all = state
        .posts
        .list_public(&PostQueryFilter::default(), PageRequest::default())
        .await
        .expect("list all");
    assert_eq!(all.total, 2);

    let tagged = state
        .posts
        .list_public(
            &PostQueryFilter {
                tag: Some("Fantasy".to_string()),
                ..PostQueryFilter::default()
            },
            PageRequest::default(),
        )
        .await
        .expect("list tagged");
    assert_eq!(tagged.total, 1);
    assert_eq!(tagged.items[0].title, "Moonlit Harbor");

    let searched = state
        .posts
        .list_public(
            &PostQueryFilter {
                search: Some("orchard".to_string()),
                ..PostQueryFilter::default()
            },
            PageRequest::default(),
        )
        .await
        .expect("list searched");
    assert_eq!(searched.total, 1);
    assert_eq!(searched.items[0].title, "Iron Orchard");
}

#[sqlx::test(migrations = "./migrations")]
async fn author_listing_includes_drafts_only_for_the_author(pool: PgPool) {
    let state = build_state(pool);
    let author = register_user(&state, "astrid").await;

    state
        .posts
        .create_post(author.user_id, published("Public Work", &[]))
        .await
        .expect("published");
    state
        .posts
        .create_post(author.user_id, draft("Private Draft"))
        .await
        .expect("draft");

    let own_view = state
        .posts
        .list_by_author(Some(author.user_id), author.user_id, PageRequest::default())
        .await
        .expect("own listing");
    assert_eq!(own_view.total, 2);

    let public_view = state
        .posts
        .list_by_author(None, author.user_id, PageRequest::default())
        .await
        .expect("public listing");
    assert_eq!(public_view.total, 1);
    assert_eq!(public_view.items[0].title, "Public Work");
}

#[sqlx::test(migrations = "./migrations")]
async fn likes_and_collections_are_idempotent(pool: PgPool) {
    let state = build_state(pool);
    let author = register_user(&state, "astrid").await;
    let reader = register_user(&state, "bruno").await;

    let detail = state
        .posts
        .create_post(author.user_id, published("Likeable", &[]))
        .await
        .expect("create post");
    let post_id = detail.post.id;

    let first = state
        .posts
        .set_like(reader.user_id, post_id, true)
        .await
        .expect("like");
    assert!(first.liked);
    assert_eq!(first.like_count, 1);

    let second = state
        .posts
        .set_like(reader.user_id, post_id, true)
        .await
        .expect("like again");
    assert_eq!(second.like_count, 1);

    let unliked = state
        .posts
        .set_like(reader.user_id, post_id, false)
        .await
        .expect("unlike");
    assert_eq!(unliked.like_count, 0);

    let collected = state
        .posts
        .set_collection(reader.user_id, post_id, true)
        .await
        .expect("collect");
    assert_eq!(collected.collection_count, 1);

    let saved = state
        .posts
        .list_collected_by(reader.user_id, PageRequest::default())
        .await
        .expect("collected listing");
    assert_eq!(saved.total, 1);
    assert_eq!(saved.items[0].id, post_id);
}

#[sqlx::test(migrations = "./migrations")]
async fn view_counting_deduplicates_within_the_window(pool: PgPool) {
    let state = build_state(pool);
    let author = register_user(&state, "astrid").await;

    let detail = state
        .posts
        .create_post(author.user_id, published("Viewed", &[]))
        .await
        .expect("create post");
    let post_id = detail.post.id;

    let first = state
        .posts
        .record_view(post_id, "ip:203.0.113.7")
        .await
        .expect("first view");
    assert!(first.counted);
    assert_eq!(first.view_count, 1);

    let repeat = state
        .posts
        .record_view(post_id, "ip:203.0.113.7")
        .await
        .expect("repeat view");
    assert!(!repeat.counted);
    assert_eq!(repeat.view_count, 1);

    let other_viewer = state
        .posts
        .record_view(post_id, "user:different")
        .await
        .expect("other view");
    assert!(other_viewer.counted);
    assert_eq!(other_viewer.view_count, 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn views_on_drafts_are_rejected(pool: PgPool) {
    let state = build_state(pool);
    let author = register_user(&state, "astrid").await;

    let detail = state
        .posts
        .create_post(author.user_id, draft("Not Yet"))
        .await
        .expect("create draft");

    let view = state.posts.record_view(detail.post.id, "ip:203.0.113.7").await;
    assert!(matches!(view, Err(PostError::NotFound)));
}

#[sqlx::test(migrations = "./migrations")]
async fn post_handlers_wire_up(pool: PgPool) {
    let state = build_state(pool);
    let author = register_user(&state, "astrid").await;

    let _created = handlers::create_post(
        State(state.clone()),
        RequireAuth(author),
        Json(PostCreateRequest {
            title: "handler-post".to_string(),
            content: "body".to_string(),
            rating: Rating::General,
            status: PostStatus::Published,
            tags: vec!["handlers".to_string()],
        }),
    )
    .await
    .expect("create post via handler");

    let listed = state
        .posts
        .list_public(&PostQueryFilter::default(), PageRequest::default())
        .await
        .expect("list");
    assert_eq!(listed.total, 1);
    let post_id = listed.items[0].id;

    let _detail = handlers::get_post(
        State(state.clone()),
        OptionalAuth(None),
        Path(post_id),
    )
    .await
    .expect("get post via handler");

    let _receipt = handlers::record_view(
        State(state.clone()),
        Fingerprint("ip:198.51.100.4".to_string()),
        Path(post_id),
    )
    .await
    .expect("record view via handler");

    let _list = handlers::list_posts(
        State(state.clone()),
        Query(handlers::PostListQuery {
            author: None,
            tag: Some("handlers".to_string()),
            search: None,
            page: None,
            limit: Some(10),
        }),
    )
    .await
    .expect("list posts via handler");
}

// ============ Comments ============

#[sqlx::test(migrations = "./migrations")]
async fn comment_threads_preview_replies(pool: PgPool) {
    let state = build_state(pool);
    let author = register_user(&state, "astrid").await;
    let reader = register_user(&state, "bruno").await;

    let detail = state
        .posts
        .create_post(author.user_id, published("Discussed", &[]))
        .await
        .expect("create post");
    let post_id = detail.post.id;

    let top = state
        .comments
        .create(
            reader.user_id,
            post_id,
            CreateCommentCommand {
                content: "first!".to_string(),
                parent_id: None,
            },
        )
        .await
        .expect("top-level comment");

    for i in 0..7 {
        state
            .comments
            .create(
                author.user_id,
                post_id,
                CreateCommentCommand {
                    content: format!("reply {i}"),
                    parent_id: Some(top.id),
                },
            )
            .await
            .expect("reply");
    }

    let threads = state
        .comments
        .list_for_post(post_id, PageRequest::default())
        .await
        .expect("list threads");
    assert_eq!(threads.total, 1);
    let thread = &threads.items[0];
    assert_eq!(thread.comment.reply_count, 7);
    assert_eq!(thread.replies.len(), 5);
    assert_eq!(thread.replies[0].content, "reply 0");

    let replies = state
        .comments
        .list_replies(top.id, PageRequest::new(Some(2), Some(5)))
        .await
        .expect("list replies");
    assert_eq!(replies.total, 7);
    assert_eq!(replies.items.len(), 2);
    assert_eq!(replies.items[0].content, "reply 5");
}

#[sqlx::test(migrations = "./migrations")]
async fn replies_must_stay_under_the_same_post(pool: PgPool) {
    let state = build_state(pool);
    let author = register_user(&state, "astrid").await;

    let first = state
        .posts
        .create_post(author.user_id, published("First", &[]))
        .await
        .expect("first post");
    let second = state
        .posts
        .create_post(author.user_id, published("Second", &[]))
        .await
        .expect("second post");

    let comment = state
        .comments
        .create(
            author.user_id,
            first.post.id,
            CreateCommentCommand {
                content: "on the first post".to_string(),
                parent_id: None,
            },
        )
        .await
        .expect("comment");

    let mismatched = state
        .comments
        .create(
            author.user_id,
            second.post.id,
            CreateCommentCommand {
                content: "reply in the wrong place".to_string(),
                parent_id: Some(comment.id),
            },
        )
        .await;
    assert!(matches!(mismatched, Err(CommentError::ParentMismatch)));
}

#[sqlx::test(migrations = "./migrations")]
async fn comments_are_author_editable_only(pool: PgPool) {
    let state = build_state(pool);
    let author = register_user(&state, "astrid").await;
    let other = register_user(&state, "bruno").await;

    let detail = state
        .posts
        .create_post(author.user_id, published("Discussed", &[]))
        .await
        .expect("create post");

    let comment = state
        .comments
        .create(
            author.user_id,
            detail.post.id,
            CreateCommentCommand {
                content: "mine".to_string(),
                parent_id: None,
            },
        )
        .await
        .expect("comment");

    let foreign_edit = state
        .comments
        .update(other.user_id, comment.id, "hijacked".to_string())
        .await;
    assert!(matches!(foreign_edit, Err(CommentError::Forbidden)));

    let like = state
        .comments
        .set_like(other.user_id, comment.id, true)
        .await
        .expect("comment like");
    assert_eq!(like.like_count, 1);

    state
        .comments
        .delete(author.user_id, comment.id)
        .await
        .expect("own delete");
}

// ============ Follows & feed ============

#[sqlx::test(migrations = "./migrations")]
async fn follow_graph_feeds_recent_posts(pool: PgPool) {
    let state = build_state(pool);
    let reader = register_user(&state, "astrid").await;
    let writer = register_user(&state, "bruno").await;

    let self_follow = state.users.follow(reader.user_id, reader.user_id).await;
    assert!(matches!(self_follow, Err(UserError::SelfFollow)));

    let status = state
        .users
        .follow(reader.user_id, writer.user_id)
        .await
        .expect("follow");
    assert!(status.following);
    assert!(!status.followed_by);

    state
        .posts
        .create_post(writer.user_id, published("Fresh Chapter", &[]))
        .await
        .expect("publish");
    state
        .posts
        .create_post(writer.user_id, draft("Unpublished"))
        .await
        .expect("draft");

    let feed = state
        .feed
        .subscription_feed(reader.user_id, PageRequest::default())
        .await
        .expect("feed");
    assert_eq!(feed.total, 1);
    assert_eq!(feed.items[0].title, "Fresh Chapter");

    let writers_feed = state
        .feed
        .subscription_feed(writer.user_id, PageRequest::default())
        .await
        .expect("writer feed");
    assert_eq!(writers_feed.total, 0);

    state
        .users
        .unfollow(reader.user_id, writer.user_id)
        .await
        .expect("unfollow");
    let after = state
        .feed
        .subscription_feed(reader.user_id, PageRequest::default())
        .await
        .expect("feed after unfollow");
    assert_eq!(after.total, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn follower_listings_and_removal(pool: PgPool) {
    let state = build_state(pool);
    let a = register_user(&state, "astrid").await;
    let b = register_user(&state, "bruno").await;

    state.users.follow(b.user_id, a.user_id).await.expect("b follows a");

    let followers = state
        .users
        .list_followers(a.user_id, PageRequest::default())
        .await
        .expect("followers");
    assert_eq!(followers.total, 1);
    assert_eq!(followers.items[0].username, "bruno");

    let following = state
        .users
        .list_following(b.user_id, PageRequest::default())
        .await
        .expect("following");
    assert_eq!(following.total, 1);

    state
        .users
        .remove_follower(a.user_id, b.user_id)
        .await
        .expect("remove follower");

    let followers_after = state
        .users
        .list_followers(a.user_id, PageRequest::default())
        .await
        .expect("followers after removal");
    assert_eq!(followers_after.total, 0);

    let missing = state.users.remove_follower(a.user_id, b.user_id).await;
    assert!(matches!(missing, Err(UserError::NotFound)));
}

// ============ Tags ============

#[sqlx::test(migrations = "./migrations")]
async fn tag_detail_sorts_and_counts(pool: PgPool) {
    let state = build_state(pool);
    let author = register_user(&state, "astrid").await;
    let reader = register_user(&state, "bruno").await;

    let first = state
        .posts
        .create_post(author.user_id, published("Quiet Tide", &["fantasy"]))
        .await
        .expect("first");
    let _second = state
        .posts
        .create_post(author.user_id, published("Ashen Crown", &["fantasy"]))
        .await
        .expect("second");

    state
        .posts
        .set_like(reader.user_id, first.post.id, true)
        .await
        .expect("like first");

    let tag = state.tags.by_name("Fantasy").await.expect("tag by name");

    let detail = state
        .tags
        .detail(tag.id, PostSort::Likes, SortOrder::Desc, PageRequest::default())
        .await
        .expect("tag detail");
    assert_eq!(detail.post_count, 2);
    assert_eq!(detail.posts.items[0].title, "Quiet Tide");

    let subscription = state
        .tags
        .set_subscription(reader.user_id, tag.id, true)
        .await
        .expect("subscribe");
    assert!(subscription.subscribed);

    let detail_after = state
        .tags
        .detail(tag.id, PostSort::Date, SortOrder::Desc, PageRequest::default())
        .await
        .expect("detail after subscribe");
    assert_eq!(detail_after.subscriber_count, 1);

    let all = state.tags.list_all().await.expect("list all tags");
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].post_count, 2);
}

// ============ Router wiring ============

#[sqlx::test(migrations = "./migrations")]
async fn router_enforces_bearer_auth(pool: PgPool) {
    let state = build_state(pool);
    let app = calamus::infra::http::build_router(state);

    let unauthenticated = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/posts")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"title":"x","content":"y"}"#))
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(unauthenticated.status(), StatusCode::UNAUTHORIZED);

    let bad_token = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/posts")
                .header("authorization", "Bearer not-a-token")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(bad_token.status(), StatusCode::UNAUTHORIZED);

    let public_listing = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/posts")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(public_listing.status(), StatusCode::OK);

    let health = app
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(health.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "./migrations")]
async fn router_registers_and_serves_tokens(pool: PgPool) {
    let state = build_state(pool);
    let app = calamus::infra::http::build_router(state.clone());

    let registered = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/auth/register")
                .header("content-type", "application/json")
                .body(Body::from(
                    r#"{"email":"astrid@example.com","username":"astrid","name":"Astrid","password":"correct horse battery"}"#,
                ))
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(registered.status(), StatusCode::CREATED);

    let login = state
        .auth
        .login("astrid@example.com", "correct horse battery")
        .await
        .expect("login after router registration");
    assert!(state.auth.verify_token(&login.access_token).is_ok());
}

// ============ Search ============

#[sqlx::test(migrations = "./migrations")]
async fn search_spans_posts_users_and_tags(pool: PgPool) {
    let state = build_state(pool);
    let author = register_user(&state, "moonwriter").await;

    state
        .posts
        .create_post(author.user_id, published("Moonlit Harbor", &["moody"]))
        .await
        .expect("post");
    state
        .posts
        .create_post(author.user_id, draft("Moonlit Draft"))
        .await
        .expect("draft");

    let filter = SearchFilter {
        query: "moon".to_string(),
        date_from: None,
        date_to: None,
        sort: SearchSort::Relevance,
        order: SortOrder::Desc,
    };

    let results = state
        .search
        .search(SearchKind::All, &filter, PageRequest::default())
        .await
        .expect("search all");

    let posts = results.posts.expect("posts section");
    assert_eq!(posts.total, 1);
    assert_eq!(posts.items[0].title, "Moonlit Harbor");

    let users = results.users.expect("users section");
    assert_eq!(users.total, 1);
    assert_eq!(users.items[0].user.username, "moonwriter");
    assert_eq!(users.items[0].latest_posts.len(), 1);

    let tags = results.tags.expect("tags section");
    assert_eq!(tags.total, 1);
    assert_eq!(tags.items[0].name, "moody");

    let scoped = state
        .search
        .search(SearchKind::Tags, &filter, PageRequest::default())
        .await
        .expect("tags only");
    assert!(scoped.posts.is_none());
    assert!(scoped.users.is_none());

    let empty = state
        .search
        .search(
            SearchKind::All,
            &SearchFilter {
                query: "   ".to_string(),
                date_from: None,
                date_to: None,
                sort: SearchSort::Relevance,
                order: SortOrder::Desc,
            },
            PageRequest::default(),
        )
        .await;
    assert!(matches!(empty, Err(SearchError::EmptyQuery)));
}
