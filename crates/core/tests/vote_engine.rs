//! Vote engine and meme of the day against a migrated SQLite database.

#![allow(clippy::unwrap_used)]

use chrono::{Duration, TimeZone, Utc};
use museum_common::config::ListingConfig;
use museum_core::{MemeService, VoteAction, VoteService};
use museum_db::entities::{Comment, Meme, VoteDirection};
use museum_db::repositories::{
    CommentRepository, MemeRepository, TagRepository, UserRepository, VoteRepository,
    VoteTargetKind,
};
use museum_db::test_utils::{MemeFixture, TestDatabase};
use sea_orm::EntityTrait;

use VoteDirection::{Downvote, Upvote};

fn vote_service(db: &TestDatabase, forbid_self_vote: bool) -> VoteService {
    VoteService::new(VoteRepository::new(db.connection()), forbid_self_vote)
}

fn meme_service(db: &TestDatabase) -> MemeService {
    let conn = db.connection();
    MemeService::new(
        MemeRepository::new(conn.clone()),
        TagRepository::new(conn.clone()),
        UserRepository::new(conn.clone()),
        CommentRepository::new(conn),
        ListingConfig::default(),
    )
}

async fn stored_meme_counts(db: &TestDatabase, id: &str) -> (i32, i32) {
    let meme = Meme::find_by_id(id)
        .one(db.connection().as_ref())
        .await
        .unwrap()
        .unwrap();
    (meme.upvotes, meme.downvotes)
}

#[tokio::test]
async fn test_same_direction_twice_toggles_off() {
    let db = TestDatabase::new().await.unwrap();
    let author = db.insert_user("author").await.unwrap();
    let voter = db.insert_user("voter").await.unwrap();
    let meme = db
        .insert_meme(&author.id, MemeFixture::default())
        .await
        .unwrap();
    let votes = vote_service(&db, false);

    let first = votes
        .apply_vote(&voter.id, VoteTargetKind::Meme, &meme.id, Upvote)
        .await
        .unwrap();
    assert_eq!(first.action, VoteAction::Created);
    assert_eq!((first.counts.upvotes, first.counts.downvotes), (1, 0));

    let second = votes
        .apply_vote(&voter.id, VoteTargetKind::Meme, &meme.id, Upvote)
        .await
        .unwrap();
    assert_eq!(second.action, VoteAction::Removed);
    assert_eq!(second.direction, None);
    assert_eq!((second.counts.upvotes, second.counts.downvotes), (0, 0));

    let status = votes
        .status(&voter.id, VoteTargetKind::Meme, &meme.id)
        .await
        .unwrap();
    assert!(!status.has_voted);
    assert_eq!(stored_meme_counts(&db, &meme.id).await, (0, 0));
}

#[tokio::test]
async fn test_opposite_direction_flips_in_place() {
    let db = TestDatabase::new().await.unwrap();
    let author = db.insert_user("author").await.unwrap();
    let voter = db.insert_user("voter").await.unwrap();
    let meme = db
        .insert_meme(&author.id, MemeFixture::default())
        .await
        .unwrap();
    let votes = vote_service(&db, false);

    votes
        .apply_vote(&voter.id, VoteTargetKind::Meme, &meme.id, Upvote)
        .await
        .unwrap();
    let flipped = votes
        .apply_vote(&voter.id, VoteTargetKind::Meme, &meme.id, Downvote)
        .await
        .unwrap();

    assert_eq!(flipped.action, VoteAction::Updated);
    assert_eq!(flipped.direction, Some(Downvote));
    assert_eq!((flipped.counts.upvotes, flipped.counts.downvotes), (0, 1));
    assert_eq!(stored_meme_counts(&db, &meme.id).await, (0, 1));

    let status = votes
        .status(&voter.id, VoteTargetKind::Meme, &meme.id)
        .await
        .unwrap();
    assert_eq!(status.is_upvote, Some(false));
}

#[tokio::test]
async fn test_counters_match_votes_after_mixed_sequence() {
    let db = TestDatabase::new().await.unwrap();
    let author = db.insert_user("author").await.unwrap();
    let mut voters = Vec::new();
    for i in 0..4 {
        voters.push(db.insert_user(&format!("voter{i}")).await.unwrap());
    }
    let meme = db
        .insert_meme(&author.id, MemeFixture::default())
        .await
        .unwrap();
    let votes = vote_service(&db, false);

    let sequence = [
        (0, Upvote),
        (1, Upvote),
        (2, Downvote),
        (3, Upvote),
        (1, Downvote),
        (0, Upvote),
        (3, Upvote),
        (2, Upvote),
        (0, Downvote),
    ];
    for (voter, direction) in sequence {
        votes
            .apply_vote(&voters[voter].id, VoteTargetKind::Meme, &meme.id, direction)
            .await
            .unwrap();
    }

    // voter0: down, voter1: down, voter2: up, voter3: none
    let mut expected = (0, 0);
    for voter in &voters {
        let status = votes
            .status(&voter.id, VoteTargetKind::Meme, &meme.id)
            .await
            .unwrap();
        match status.is_upvote {
            Some(true) => expected.0 += 1,
            Some(false) => expected.1 += 1,
            None => {}
        }
    }

    assert_eq!(expected, (1, 2));
    assert_eq!(stored_meme_counts(&db, &meme.id).await, expected);
}

#[tokio::test]
async fn test_comment_votes_update_comment_counters() {
    let db = TestDatabase::new().await.unwrap();
    let author = db.insert_user("author").await.unwrap();
    let voter = db.insert_user("voter").await.unwrap();
    let meme = db
        .insert_meme(&author.id, MemeFixture::default())
        .await
        .unwrap();
    let comment = db
        .insert_comment(&meme.id, &author.id, "first")
        .await
        .unwrap();
    let votes = vote_service(&db, false);

    let outcome = votes
        .apply_vote(&voter.id, VoteTargetKind::Comment, &comment.id, Downvote)
        .await
        .unwrap();
    assert_eq!(outcome.action, VoteAction::Created);

    let stored = Comment::find_by_id(comment.id.as_str())
        .one(db.connection().as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!((stored.upvotes, stored.downvotes), (0, 1));
    // Meme counters are untouched by comment votes.
    assert_eq!(stored_meme_counts(&db, &meme.id).await, (0, 0));
}

#[tokio::test]
async fn test_vote_on_missing_target() {
    let db = TestDatabase::new().await.unwrap();
    let voter = db.insert_user("voter").await.unwrap();

    let result = vote_service(&db, false)
        .apply_vote(&voter.id, VoteTargetKind::Comment, "missing", Upvote)
        .await;

    assert!(matches!(
        result,
        Err(museum_common::AppError::CommentNotFound(_))
    ));
}

#[tokio::test]
async fn test_self_vote_switch() {
    let db = TestDatabase::new().await.unwrap();
    let author = db.insert_user("author").await.unwrap();
    let meme = db
        .insert_meme(&author.id, MemeFixture::default())
        .await
        .unwrap();

    let forbidden = vote_service(&db, true)
        .apply_vote(&author.id, VoteTargetKind::Meme, &meme.id, Upvote)
        .await;
    assert!(matches!(
        forbidden,
        Err(museum_common::AppError::Forbidden(_))
    ));
    assert_eq!(stored_meme_counts(&db, &meme.id).await, (0, 0));

    let allowed = vote_service(&db, false)
        .apply_vote(&author.id, VoteTargetKind::Meme, &meme.id, Upvote)
        .await
        .unwrap();
    assert_eq!(allowed.action, VoteAction::Created);
}

#[tokio::test]
async fn test_meme_of_the_day_picks_lowest_id_on_tie() {
    let db = TestDatabase::new().await.unwrap();
    let author = db.insert_user("author").await.unwrap();
    let day = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();

    for (id, upvotes, hour) in [("m1", 5, 9), ("m2", 3, 10), ("m3", 5, 8)] {
        db.insert_meme(
            &author.id,
            MemeFixture {
                id: Some(id.to_string()),
                upvotes,
                uploaded_at: Some(day + Duration::hours(hour)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    }

    let best = meme_service(&db)
        .meme_of_the_day_at(&(day + Duration::hours(18)))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(best.id, "m1");
    assert_eq!(best.author.unwrap().username, "author");
}

#[tokio::test]
async fn test_meme_of_the_day_falls_back_to_all_time() {
    let db = TestDatabase::new().await.unwrap();
    let author = db.insert_user("author").await.unwrap();
    let day = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();

    for (id, upvotes, days_ago) in [("old1", 2, 10), ("old2", 7, 20)] {
        db.insert_meme(
            &author.id,
            MemeFixture {
                id: Some(id.to_string()),
                upvotes,
                uploaded_at: Some(day - Duration::days(days_ago)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    }

    let best = meme_service(&db)
        .meme_of_the_day_at(&day)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(best.id, "old2");
}

#[tokio::test]
async fn test_meme_of_the_day_empty() {
    let db = TestDatabase::new().await.unwrap();

    let best = meme_service(&db)
        .meme_of_the_day_at(&Utc::now())
        .await
        .unwrap();
    assert!(best.is_none());
}

#[tokio::test]
async fn test_listing_pages_and_tags() {
    let db = TestDatabase::new().await.unwrap();
    let author = db.insert_user("author").await.unwrap();
    for i in 0..25 {
        let meme = db
            .insert_meme(
                &author.id,
                MemeFixture {
                    id: Some(format!("m{i:02}")),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        if i % 5 == 0 {
            db.tag_meme(&meme.id, "funny").await.unwrap();
        }
    }
    let service = meme_service(&db);

    let page = service
        .list(&museum_core::ListMemesParams {
            page: Some(3),
            limit: Some(10),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.pagination.total_pages, 3);
    assert_eq!(page.pagination.total_items, 25);
    assert_eq!(page.memes.len(), 5);

    let funny = service
        .list(&museum_core::ListMemesParams {
            tags: Some("funny".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(funny.pagination.total_items, 5);
    assert!(
        funny
            .memes
            .iter()
            .all(|m| m.tags.iter().any(|t| t.name == "funny"))
    );
}

#[tokio::test]
async fn test_create_meme_links_tags_and_view_counts() {
    let db = TestDatabase::new().await.unwrap();
    let author = db.insert_user("author").await.unwrap();
    let service = meme_service(&db);

    let created = service
        .create(
            &author.id,
            museum_core::CreateMemeInput {
                title: "  Distracted boyfriend ".to_string(),
                description: Some("classic".to_string()),
                image_url: "https://example.com/db.png".to_string(),
                tags: vec!["classic".to_string(), " classic ".to_string(), "funny".to_string()],
            },
        )
        .await
        .unwrap();

    assert_eq!(created.title, "Distracted boyfriend");
    let mut names: Vec<_> = created.tags.iter().map(|t| t.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, ["classic", "funny"]);

    let detail = service.view(&created.id).await.unwrap();
    assert_eq!(detail.views, 1);
    let detail = service.view(&created.id).await.unwrap();
    assert_eq!(detail.views, 2);
    assert_eq!(detail.votes.total, 0);
    assert_eq!(detail.author.unwrap().name, "Test");
}
