//! Meme service.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use museum_common::{AppError, AppResult, IdGenerator, config::ListingConfig};
use museum_db::{
    entities::{meme, tag, user},
    repositories::{
        CommentRepository, MemeFilter, MemeRepository, MemeSort, MemeSortKey, SortOrder,
        TagRepository, UserRepository, VoteCounts,
    },
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use url::Url;
use validator::Validate;

use crate::pagination::{PageRequest, Pagination};

/// Longest accepted tag name.
pub const MAX_TAG_LENGTH: usize = 50;

/// Raw query parameters of `GET /api/memes`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMemesParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Comma separated tag names.
    pub tags: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub author_id: Option<String>,
    pub username: Option<String>,
    pub title: Option<String>,
}

impl ListMemesParams {
    /// Turn the raw parameters into a filter and a sort.
    ///
    /// Unknown sort keys fall back to the upload date and any order other
    /// than `ASC` means descending. Blank parameters are ignored.
    pub fn to_filter_and_sort(&self) -> AppResult<(MemeFilter, MemeSort)> {
        let filter = MemeFilter {
            uploaded_from: non_blank(self.start_date.as_deref())
                .map(|raw| parse_date_param("startDate", raw))
                .transpose()?,
            uploaded_until: non_blank(self.end_date.as_deref())
                .map(|raw| parse_date_param("endDate", raw))
                .transpose()?,
            author_id: non_blank(self.author_id.as_deref()).map(str::to_string),
            username: non_blank(self.username.as_deref()).map(str::to_string),
            title: non_blank(self.title.as_deref()).map(str::to_string),
            tags: self
                .tags
                .as_deref()
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        };

        let key = match self.sort_by.as_deref().map(str::trim) {
            Some("score") => MemeSortKey::Score,
            Some("upvotes") => MemeSortKey::Upvotes,
            Some("downvotes") => MemeSortKey::Downvotes,
            _ => MemeSortKey::UploadDate,
        };
        let order = match self.order.as_deref() {
            Some(order) if order.trim().eq_ignore_ascii_case("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        };

        Ok((filter, MemeSort { key, order }))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Parse an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
fn parse_date_param(name: &str, raw: &str) -> AppResult<DateTime<chrono::FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc).fixed_offset());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN).and_utc().fixed_offset())
        .map_err(|_| AppError::Validation(format!("{name} must be a date or RFC 3339 timestamp")))
}

/// Input for uploading a meme.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMemeInput {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(url)]
    pub image_url: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Uploader as shown in listings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorSummary {
    pub id: String,
    pub username: String,
}

/// Uploader as shown on the detail page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorDetail {
    pub id: String,
    pub username: String,
    pub name: String,
    pub surname: String,
}

impl From<user::Model> for AuthorDetail {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            username: u.username,
            name: u.name,
            surname: u.surname,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagSummary {
    pub id: String,
    pub name: String,
    pub color: String,
}

impl From<tag::Model> for TagSummary {
    fn from(t: tag::Model) -> Self {
        Self {
            id: t.id,
            name: t.name,
            color: t.color,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagDetail {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
}

impl From<tag::Model> for TagDetail {
    fn from(t: tag::Model) -> Self {
        Self {
            id: t.id,
            name: t.name,
            description: t.description,
            color: t.color,
        }
    }
}

/// Vote totals block of the detail view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoteTotals {
    pub upvotes: i32,
    pub downvotes: i32,
    pub score: i32,
    pub total: i32,
}

impl From<VoteCounts> for VoteTotals {
    fn from(c: VoteCounts) -> Self {
        Self {
            upvotes: c.upvotes,
            downvotes: c.downvotes,
            score: c.score(),
            total: c.total(),
        }
    }
}

/// A meme as listed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemeSummary {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub image_url: String,
    pub upvotes: i32,
    pub downvotes: i32,
    pub score: i32,
    pub views: i32,
    pub likes: i32,
    pub download_count: i32,
    pub is_public: bool,
    pub uploaded_at: String,
    pub author: Option<AuthorSummary>,
    pub tags: Vec<TagSummary>,
    pub comment_count: u64,
}

/// One page of memes.
#[derive(Debug, Clone, Serialize)]
pub struct MemePage {
    pub memes: Vec<MemeSummary>,
    pub pagination: Pagination,
}

/// A meme with everything the detail page shows.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemeDetail {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub image_url: String,
    pub views: i32,
    pub likes: i32,
    pub download_count: i32,
    pub is_public: bool,
    pub uploaded_at: String,
    pub updated_at: Option<String>,
    pub author: Option<AuthorDetail>,
    pub tags: Vec<TagDetail>,
    pub votes: VoteTotals,
}

/// Meme service for business logic.
#[derive(Clone)]
pub struct MemeService {
    meme_repo: MemeRepository,
    tag_repo: TagRepository,
    user_repo: UserRepository,
    comment_repo: CommentRepository,
    listing: ListingConfig,
    id_gen: IdGenerator,
}

impl MemeService {
    /// Create a new meme service.
    #[must_use]
    pub const fn new(
        meme_repo: MemeRepository,
        tag_repo: TagRepository,
        user_repo: UserRepository,
        comment_repo: CommentRepository,
        listing: ListingConfig,
    ) -> Self {
        Self {
            meme_repo,
            tag_repo,
            user_repo,
            comment_repo,
            listing,
            id_gen: IdGenerator::new(),
        }
    }

    /// List memes with filters, sort and pagination.
    pub async fn list(&self, params: &ListMemesParams) -> AppResult<MemePage> {
        let page = PageRequest::resolve(
            params.page,
            params.limit,
            self.listing.default_page_size,
            self.listing.max_page_size,
        )?;
        let (filter, sort) = params.to_filter_and_sort()?;

        let total = self.meme_repo.count(&filter).await?;
        let memes = self
            .meme_repo
            .list(&filter, sort, page.limit, page.offset())
            .await?;

        Ok(MemePage {
            memes: self.summarize(memes).await?,
            pagination: page.meta(total),
        })
    }

    /// Get an active meme, counting the view.
    pub async fn view(&self, id: &str) -> AppResult<MemeDetail> {
        if self.meme_repo.find_active_by_id(id).await?.is_none() {
            return Err(AppError::MemeNotFound(id.to_string()));
        }

        self.meme_repo.increment_views(id).await?;
        let meme = self.meme_repo.get_by_id(id).await?;

        let author = self.user_repo.find_by_id(&meme.user_id).await?;
        let tags = self
            .tag_repo
            .find_by_meme_ids(std::slice::from_ref(&meme.id))
            .await?
            .remove(&meme.id)
            .unwrap_or_default();

        let votes = VoteCounts {
            upvotes: meme.upvotes,
            downvotes: meme.downvotes,
        };

        Ok(MemeDetail {
            id: meme.id,
            title: meme.title,
            description: meme.description,
            image_url: meme.image_url,
            views: meme.views,
            likes: meme.likes,
            download_count: meme.download_count,
            is_public: meme.is_public,
            uploaded_at: meme.uploaded_at.to_rfc3339(),
            updated_at: meme.updated_at.map(|t| t.to_rfc3339()),
            author: author.map(AuthorDetail::from),
            tags: tags.into_iter().map(TagDetail::from).collect(),
            votes: votes.into(),
        })
    }

    /// Upload a meme and link its tags, creating missing tags.
    pub async fn create(&self, user_id: &str, input: CreateMemeInput) -> AppResult<MemeSummary> {
        let input = CreateMemeInput {
            title: input.title.trim().to_string(),
            description: input
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            image_url: input.image_url.trim().to_string(),
            tags: normalize_tags(input.tags)?,
        };
        input.validate()?;
        check_image_url(&input.image_url)?;

        let txn = self.meme_repo.begin().await?;

        let model = meme::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id.to_string()),
            title: Set(input.title),
            description: Set(input.description),
            image_url: Set(input.image_url),
            upvotes: Set(0),
            downvotes: Set(0),
            likes: Set(0),
            views: Set(0),
            download_count: Set(0),
            is_public: Set(true),
            is_active: Set(true),
            uploaded_at: Set(Utc::now().fixed_offset()),
            updated_at: Set(None),
        };
        let meme = self.meme_repo.create(&txn, model).await?;

        for name in &input.tags {
            let tag = self.tag_repo.get_or_create(&txn, name).await?;
            self.tag_repo.attach(&txn, &meme.id, &tag.id).await?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::info!(meme_id = %meme.id, user_id = %user_id, tags = input.tags.len(), "Meme created");

        self.summarize(vec![meme])
            .await?
            .pop()
            .ok_or_else(|| AppError::Internal("created meme vanished".to_string()))
    }

    /// Delete a meme. Only the uploader may do so.
    pub async fn delete(&self, user_id: &str, id: &str) -> AppResult<()> {
        let meme = self.meme_repo.get_by_id(id).await?;
        if meme.user_id != user_id {
            return Err(AppError::Forbidden(
                "You can only delete your own memes".to_string(),
            ));
        }

        self.meme_repo.delete(id).await?;
        tracing::info!(meme_id = %id, user_id = %user_id, "Meme deleted");
        Ok(())
    }

    /// Meme of the day in server local time.
    pub async fn meme_of_the_day(&self) -> AppResult<Option<MemeSummary>> {
        self.meme_of_the_day_at(&Local::now()).await
    }

    /// Best meme uploaded on the calendar day containing `reference`, or the
    /// best meme of all time when that day has none.
    pub async fn meme_of_the_day_at<Tz: TimeZone>(
        &self,
        reference: &DateTime<Tz>,
    ) -> AppResult<Option<MemeSummary>> {
        let (start, end) = day_bounds(reference);

        let best = match self
            .meme_repo
            .find_best_uploaded_between(start.fixed_offset(), end.fixed_offset())
            .await?
        {
            Some(meme) => Some(meme),
            None => {
                tracing::debug!(%start, %end, "No memes uploaded today, using all-time best");
                self.meme_repo.find_best().await?
            }
        };

        match best {
            Some(meme) => Ok(self.summarize(vec![meme]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Attach authors, tags and comment counts to a batch of memes.
    async fn summarize(&self, memes: Vec<meme::Model>) -> AppResult<Vec<MemeSummary>> {
        let meme_ids: Vec<String> = memes.iter().map(|m| m.id.clone()).collect();
        let author_ids: Vec<String> = memes
            .iter()
            .map(|m| m.user_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let authors: HashMap<String, user::Model> = self
            .user_repo
            .find_by_ids(&author_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();
        let mut tags = self.tag_repo.find_by_meme_ids(&meme_ids).await?;
        let comment_counts = self.comment_repo.count_by_memes(&meme_ids).await?;

        Ok(memes
            .into_iter()
            .map(|m| MemeSummary {
                author: authors.get(&m.user_id).map(|u| AuthorSummary {
                    id: u.id.clone(),
                    username: u.username.clone(),
                }),
                tags: tags
                    .remove(&m.id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(TagSummary::from)
                    .collect(),
                comment_count: comment_counts.get(&m.id).copied().unwrap_or(0),
                score: m.score(),
                id: m.id,
                title: m.title,
                description: m.description,
                image_url: m.image_url,
                upvotes: m.upvotes,
                downvotes: m.downvotes,
                views: m.views,
                likes: m.likes,
                download_count: m.download_count,
                is_public: m.is_public,
                uploaded_at: m.uploaded_at.to_rfc3339(),
            })
            .collect())
    }
}

/// Trim tag names, drop empty ones and collapse duplicates, keeping the
/// first occurrence's position.
fn normalize_tags(raw: Vec<String>) -> AppResult<Vec<String>> {
    let mut seen = HashSet::new();
    let mut tags = Vec::new();

    for name in raw {
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        if name.chars().count() > MAX_TAG_LENGTH {
            return Err(AppError::Validation(format!(
                "tag names must be at most {MAX_TAG_LENGTH} characters"
            )));
        }
        if seen.insert(name.to_string()) {
            tags.push(name.to_string());
        }
    }

    Ok(tags)
}

fn check_image_url(raw: &str) -> AppResult<()> {
    let url = Url::parse(raw)
        .map_err(|_| AppError::Validation("imageUrl must be a valid URL".to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(AppError::Validation(format!(
            "imageUrl must use http or https, not {other}"
        ))),
    }
}

/// `[start, end)` of the calendar day containing `reference`, in the
/// reference's time zone, as UTC instants.
pub fn day_bounds<Tz: TimeZone>(reference: &DateTime<Tz>) -> (DateTime<Utc>, DateTime<Utc>) {
    let tz = reference.timezone();
    let date = reference.date_naive();
    let start = local_midnight(&tz, date);
    let end = date
        .succ_opt()
        .map_or_else(|| start + Duration::days(1), |next| local_midnight(&tz, next));
    (start, end)
}

fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    // Midnight can fall into a DST gap; fall back to reading it as UTC.
    tz.from_local_datetime(&midnight)
        .earliest()
        .map_or_else(|| midnight.and_utc(), |dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn service(db: MockDatabase) -> MemeService {
        let db = Arc::new(db.into_connection());
        MemeService::new(
            MemeRepository::new(db.clone()),
            TagRepository::new(db.clone()),
            UserRepository::new(db.clone()),
            CommentRepository::new(db),
            ListingConfig::default(),
        )
    }

    fn create_test_meme(id: &str, owner: &str) -> meme::Model {
        meme::Model {
            id: id.to_string(),
            user_id: owner.to_string(),
            title: "title".to_string(),
            description: None,
            image_url: "https://example.com/a.png".to_string(),
            upvotes: 0,
            downvotes: 0,
            likes: 0,
            views: 0,
            download_count: 0,
            is_public: true,
            is_active: true,
            uploaded_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[test]
    fn test_normalize_tags() {
        let tags = normalize_tags(vec![
            " funny ".to_string(),
            String::new(),
            "cats".to_string(),
            "funny".to_string(),
            "   ".to_string(),
        ])
        .unwrap();
        assert_eq!(tags, ["funny", "cats"]);
    }

    #[test]
    fn test_normalize_tags_rejects_long_names() {
        let result = normalize_tags(vec!["x".repeat(MAX_TAG_LENGTH + 1)]);
        assert!(matches!(result, Err(AppError::Validation(_))));

        assert!(normalize_tags(vec!["x".repeat(MAX_TAG_LENGTH)]).is_ok());
    }

    #[test]
    fn test_check_image_url() {
        assert!(check_image_url("https://example.com/a.png").is_ok());
        assert!(check_image_url("http://example.com/a.png").is_ok());
        assert!(check_image_url("ftp://example.com/a.png").is_err());
        assert!(check_image_url("not a url").is_err());
    }

    #[test]
    fn test_params_defaults() {
        let (filter, sort) = ListMemesParams::default().to_filter_and_sort().unwrap();
        assert_eq!(filter, MemeFilter::default());
        assert_eq!(sort, MemeSort::default());
    }

    #[test]
    fn test_params_parsing() {
        let params = ListMemesParams {
            tags: Some("funny, cats,,".to_string()),
            sort_by: Some("score".to_string()),
            order: Some("asc".to_string()),
            start_date: Some("2025-03-01".to_string()),
            end_date: Some("2025-03-31T23:59:59+02:00".to_string()),
            title: Some("  ".to_string()),
            ..Default::default()
        };
        let (filter, sort) = params.to_filter_and_sort().unwrap();

        assert_eq!(filter.tags, ["funny", "cats"]);
        assert_eq!(filter.title, None);
        assert_eq!(
            filter.uploaded_from.unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            filter.uploaded_until.unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 31, 21, 59, 59).unwrap()
        );
        assert_eq!(
            sort,
            MemeSort {
                key: MemeSortKey::Score,
                order: SortOrder::Asc
            }
        );
    }

    #[test]
    fn test_params_unknown_sort_falls_back() {
        let params = ListMemesParams {
            sort_by: Some("popularity".to_string()),
            order: Some("sideways".to_string()),
            ..Default::default()
        };
        let (_, sort) = params.to_filter_and_sort().unwrap();
        assert_eq!(sort, MemeSort::default());
    }

    #[test]
    fn test_params_bad_date() {
        let params = ListMemesParams {
            start_date: Some("last tuesday".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            params.to_filter_and_sort(),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_day_bounds_in_offset_zone() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let reference = tz.with_ymd_and_hms(2025, 6, 1, 0, 30, 0).unwrap();

        let (start, end) = day_bounds(&reference);

        assert_eq!(start, Utc.with_ymd_and_hms(2025, 5, 31, 22, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 6, 1, 22, 0, 0).unwrap());
    }

    #[test]
    fn test_day_bounds_utc() {
        let reference = Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 59).unwrap();
        let (start, end) = day_bounds(&reference);

        assert_eq!(start, Utc.with_ymd_and_hms(2025, 12, 31, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn test_create_rejects_non_http_url() {
        let result = service(MockDatabase::new(DatabaseBackend::Postgres))
            .create(
                "user1",
                CreateMemeInput {
                    title: "A meme".to_string(),
                    description: None,
                    image_url: "ftp://example.com/a.png".to_string(),
                    tags: vec![],
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_blank_title() {
        let result = service(MockDatabase::new(DatabaseBackend::Postgres))
            .create(
                "user1",
                CreateMemeInput {
                    title: "   ".to_string(),
                    description: None,
                    image_url: "https://example.com/a.png".to_string(),
                    tags: vec![],
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_delete_by_other_user_forbidden() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_meme("m1", "owner")]]);

        let result = service(db).delete("intruder", "m1").await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_view_inactive_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<meme::Model>::new()]);

        let result = service(db).view("m1").await;

        assert!(matches!(result, Err(AppError::MemeNotFound(_))));
    }

    #[tokio::test]
    async fn test_list_rejects_oversized_page() {
        let params = ListMemesParams {
            limit: Some(101),
            ..Default::default()
        };
        let result = service(MockDatabase::new(DatabaseBackend::Postgres))
            .list(&params)
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
