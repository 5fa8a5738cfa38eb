use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::content::site::{find_category, get_menu, subtree_paths};
use crate::content::{changes, Paged};
use crate::db::collection::RecordCollection;
use crate::db::models::{decode_all, from_record, to_record, Post, PostStatus, Record};
use crate::db::query::{Query, SortDirection};
use crate::error::StoreError;
use crate::store::DocumentStore;

const POSTS: RecordCollection = RecordCollection::Posts;

/// Cover image used when a post has none and its content embeds no image.
pub const PLACEHOLDER_IMAGE: &str = "https://placehold.co/600x400.png";

fn published() -> Query {
    Query::new().where_eq("status", PostStatus::Published.as_str())
}

fn newest_first(query: Query) -> Query {
    query.order_by("date", SortDirection::Desc)
}

async fn load(store: &DocumentStore, query: &Query) -> Vec<Post> {
    decode_all(POSTS.as_str(), store.get_many(POSTS, query).await)
}

/// The newest published posts.
pub async fn latest_published(store: &DocumentStore, limit: usize) -> Vec<Post> {
    load(store, &newest_first(published()).limit(limit)).await
}

/// One page of published posts, newest first.
pub async fn published_page(
    store: &DocumentStore,
    page: usize,
    page_size: usize,
) -> Result<Paged<Post>, StoreError> {
    let page = store
        .get_page(POSTS, page, page_size, &newest_first(published()))
        .await?;
    Ok(Paged::decode(POSTS.as_str(), page))
}

/// Every post regardless of status, newest first.
pub async fn all_posts(store: &DocumentStore) -> Vec<Post> {
    load(store, &newest_first(Query::new())).await
}

/// The published post with that slug.
pub async fn find_by_slug(store: &DocumentStore, slug: &str) -> Option<Post> {
    load(store, &published().where_eq("slug", slug).limit(1))
        .await
        .into_iter()
        .next()
}

/// A post by id, whatever its status.
pub async fn find_by_id(store: &DocumentStore, id: &str) -> Option<Post> {
    let record = store.get_one(POSTS, id).await?;
    match from_record(record) {
        Ok(post) => Some(post),
        Err(e) => {
            tracing::warn!("Skipping malformed post '{}': {}", id, e);
            None
        }
    }
}

/// URL-safe slug from a title: lowercase ASCII alphanumerics joined by `-`.
pub fn slugify(title: &str) -> String {
    title
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// `src` of the first `<img>` in HTML content.
pub fn first_image(html: &str) -> Option<&str> {
    let start = html.find("<img src=\"")? + "<img src=\"".len();
    let rest = &html[start..];
    let end = rest.find('"')?;
    Some(&rest[..end]).filter(|src| !src.is_empty())
}

/// Fill derived fields and check the required ones before a save.
fn prepare(post: &mut Post) -> Result<(), StoreError> {
    if post.title.trim().is_empty() {
        return Err(StoreError::InvalidArgument("Post title cannot be empty".into()));
    }
    if post.category.trim().is_empty() {
        return Err(StoreError::InvalidArgument("Post category cannot be empty".into()));
    }
    if post.status == PostStatus::Scheduled && post.scheduled_at.is_none() {
        return Err(StoreError::InvalidArgument(
            "Scheduled posts need a scheduledAt timestamp".into(),
        ));
    }

    if post.slug.trim().is_empty() {
        post.slug = slugify(&post.title);
    }
    if post.image_url.is_empty() {
        post.image_url = first_image(&post.content)
            .unwrap_or(PLACEHOLDER_IMAGE)
            .to_string();
    }
    if post.status != PostStatus::Scheduled {
        post.scheduled_at = None;
    }
    Ok(())
}

/// Create a post and return its id.
///
/// The date is set to now and the view count reset to zero.
pub async fn create_post(store: &DocumentStore, mut post: Post) -> Result<String, StoreError> {
    prepare(&mut post)?;
    post.id.clear();
    post.date = Utc::now().to_rfc3339();
    post.views = 0;

    let id = store.add_one(POSTS, to_record(&post)?).await?;
    tracing::info!("Created post '{}' ({}) as {}", post.slug, id, post.status.as_str());
    Ok(id)
}

/// Overwrite the editable fields of an existing post.
pub async fn update_post(store: &DocumentStore, id: &str, mut post: Post) -> Result<(), StoreError> {
    prepare(&mut post)?;
    if post.date.is_empty() {
        post.date = Utc::now().to_rfc3339();
    }

    let mut record = changes(&post)?;
    // Absent optionals must clear what was stored.
    record.entry("scheduledAt").or_insert(Value::Null);
    store.update_one(POSTS, id, record).await
}

pub async fn delete_post(store: &DocumentStore, id: &str) -> Result<bool, StoreError> {
    store.delete_one(POSTS, id).await
}

/// Published posts filed under a category or any of its subcategories.
pub async fn by_category(store: &DocumentStore, href: &str) -> Vec<Post> {
    let menu = get_menu(store).await;
    let paths = find_category(&menu, href)
        .map(subtree_paths)
        .unwrap_or_else(|| vec![href.to_string()]);

    load(store, &newest_first(published().where_in("category", paths))).await
}

/// The `n` most viewed posts, ties keeping their input order.
pub fn top_posts(posts: &[Post], n: usize) -> Vec<Post> {
    let mut ranked = posts.to_vec();
    ranked.sort_by(|a, b| b.views.cmp(&a.views));
    ranked.truncate(n);
    ranked
}

/// Published posts carrying a tag, compared case-insensitively.
pub async fn by_tag(store: &DocumentStore, tag: &str) -> Vec<Post> {
    let tag = tag.trim().to_lowercase();
    if tag.is_empty() {
        return Vec::new();
    }

    load(store, &newest_first(published()))
        .await
        .into_iter()
        .filter(|post| post.tags.iter().any(|t| t.to_lowercase() == tag))
        .collect()
}

/// Published posts whose title, tags or content contain `text`
/// (case-insensitive).
pub async fn search(store: &DocumentStore, text: &str) -> Vec<Post> {
    let needle = text.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    load(store, &newest_first(published()))
        .await
        .into_iter()
        .filter(|post| {
            post.title.to_lowercase().contains(&needle)
                || post.tags.iter().any(|t| t.to_lowercase().contains(&needle))
                || post.content.to_lowercase().contains(&needle)
        })
        .collect()
}

/// Up to `n` other published posts from the same category.
pub async fn related(store: &DocumentStore, post: &Post, n: usize) -> Vec<Post> {
    let query = newest_first(published().where_eq("category", post.category.as_str()));
    load(store, &query)
        .await
        .into_iter()
        .filter(|other| other.id != post.id)
        .take(n)
        .collect()
}

/// Increment a post's view count and return the new count.
///
/// Read-then-write: concurrent views of the same post may be lost.
pub async fn record_view(store: &DocumentStore, id: &str) -> Result<u64, StoreError> {
    let post = find_by_id(store, id)
        .await
        .ok_or_else(|| StoreError::not_found(POSTS.as_str(), id))?;
    let views = post.views + 1;

    let mut partial = Record::new();
    partial.insert("views".to_string(), json!(views));
    store.update_one(POSTS, id, partial).await?;
    Ok(views)
}

/// Publish every scheduled post whose `scheduledAt` is not after `now`.
///
/// The publication date becomes the scheduled time. Returns the ids that
/// were published; the first failed write aborts the run.
pub async fn publish_due(store: &DocumentStore, now: DateTime<Utc>) -> Result<Vec<String>, StoreError> {
    let scheduled = load(
        store,
        &Query::new().where_eq("status", PostStatus::Scheduled.as_str()),
    )
    .await;

    let mut published_ids = Vec::new();
    for post in scheduled {
        let Some(at) = post.scheduled_at.as_deref() else {
            continue;
        };
        let due = match DateTime::parse_from_rfc3339(at) {
            Ok(due) => due.with_timezone(&Utc),
            Err(e) => {
                tracing::warn!("Post '{}' has an invalid scheduledAt '{}': {}", post.id, at, e);
                continue;
            }
        };
        if due > now {
            continue;
        }

        let mut partial = Record::new();
        partial.insert("status".to_string(), json!(PostStatus::Published.as_str()));
        partial.insert("date".to_string(), json!(due.to_rfc3339()));
        partial.insert("scheduledAt".to_string(), Value::Null);
        store.update_one(POSTS, &post.id, partial).await?;

        tracing::info!("Published scheduled post '{}' ({})", post.slug, post.id);
        published_ids.push(post.id);
    }

    Ok(published_ids)
}

/// Distinct tags over all published posts, in first-seen order.
pub async fn all_tags(store: &DocumentStore) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for post in load(store, &newest_first(published())).await {
        for tag in post.tags {
            if !tags.iter().any(|seen| seen.eq_ignore_ascii_case(&tag)) {
                tags.push(tag);
            }
        }
    }
    tags
}
