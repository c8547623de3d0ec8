//! Service tests against a live PostgreSQL. Run with
//! `DATABASE_URL=postgres://... cargo test --test postgres -- --ignored`.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::io::{Cursor, Write};
use uuid::Uuid;
use unihub::models::*;
use unihub::service::catalog::read_bundle;
use unihub::service::{
    ApplicationService, AuthService, CatalogService, ConnectService, Passwords, UniversityService, Viewer,
    WishlistService,
};
use unihub::{apply_migrations, AppError};
use zip::write::SimpleFileOptions;

async fn pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a scratch database");
    let pool = PgPoolOptions::new().max_connections(5).connect(&url).await.unwrap();
    apply_migrations(&pool).await.unwrap();
    pool
}

fn tag() -> String {
    Uuid::new_v4().simple().to_string()[..10].to_string()
}

async fn student(pool: &PgPool, tag: &str, name: &str, country: &str, interests: &[&str]) -> UserRow {
    let req = RegisterRequest {
        name: name.to_string(),
        email: format!("{}-{}@example.com", name.to_lowercase(), tag),
        password: "correct horse 1".to_string(),
        country: Some(country.to_string()),
        interests: interests.iter().map(|i| i.to_string()).collect(),
    };
    AuthService::register(pool, &Passwords::with_params(4096, 1, 1).unwrap(), &req).await.unwrap()
}

async fn university(pool: &PgPool, name: &str) -> University {
    let input = UniversityInput {
        name: name.to_string(),
        country: "Netherlands".to_string(),
        ..Default::default()
    };
    UniversityService::create(pool, &input).await.unwrap()
}

fn statement() -> String {
    "I want to study here because the programme matches my research interests closely.".to_string()
}

fn apply_to(university_id: Uuid) -> ApplicationInput {
    ApplicationInput {
        university_id,
        course_id: None,
        statement: statement(),
        document_urls: Vec::new(),
    }
}

fn status(status: ApplicationStatus) -> StatusUpdate {
    StatusUpdate { status, admin_note: None }
}

#[tokio::test]
#[ignore = "requires PostgreSQL; set DATABASE_URL"]
async fn application_lifecycle() {
    let pool = pool().await;
    let t = tag();
    let ada = student(&pool, &t, "Ada", "Norway", &[]).await;
    let uni = university(&pool, &format!("Lifecycle University {t}")).await;

    let app = ApplicationService::submit(&pool, ada.id, &apply_to(uni.id)).await.unwrap();
    assert_eq!(app.status, ApplicationStatus::Pending);
    assert!(matches!(
        ApplicationService::submit(&pool, ada.id, &apply_to(uni.id)).await,
        Err(AppError::Conflict(_))
    ));

    let other = student(&pool, &t, "Grace", "Norway", &[]).await;
    let stranger = Viewer { user_id: other.id, is_admin: false };
    assert!(matches!(ApplicationService::get(&pool, stranger, app.id).await, Err(AppError::NotFound(_))));

    let accepted = ApplicationService::set_status(&pool, app.id, &status(ApplicationStatus::Accepted)).await.unwrap();
    assert_eq!(accepted.status, ApplicationStatus::Accepted);
    assert!(matches!(
        ApplicationService::set_status(&pool, app.id, &status(ApplicationStatus::UnderReview)).await,
        Err(AppError::Conflict(_))
    ));
    assert!(matches!(ApplicationService::withdraw(&pool, ada.id, app.id).await, Err(AppError::Conflict(_))));

    let second = university(&pool, &format!("Withdraw University {t}")).await;
    let app = ApplicationService::submit(&pool, ada.id, &apply_to(second.id)).await.unwrap();
    let withdrawn = ApplicationService::withdraw(&pool, ada.id, app.id).await.unwrap();
    assert_eq!(withdrawn.status, ApplicationStatus::Withdrawn);
    let again = ApplicationService::submit(&pool, ada.id, &apply_to(second.id)).await.unwrap();
    assert_ne!(again.id, app.id);
}

#[tokio::test]
#[ignore = "requires PostgreSQL; set DATABASE_URL"]
async fn wishlist_add_is_idempotent() {
    let pool = pool().await;
    let t = tag();
    let ada = student(&pool, &t, "Ada", "Norway", &[]).await;
    let uni = university(&pool, &format!("Wishlist University {t}")).await;

    assert!(WishlistService::add(&pool, ada.id, uni.id).await.unwrap());
    assert!(!WishlistService::add(&pool, ada.id, uni.id).await.unwrap());
    assert_eq!(WishlistService::list(&pool, ada.id).await.unwrap().len(), 1);
    assert!(matches!(
        WishlistService::add(&pool, ada.id, Uuid::new_v4()).await,
        Err(AppError::NotFound(_))
    ));
    WishlistService::remove(&pool, ada.id, uni.id).await.unwrap();
    WishlistService::remove(&pool, ada.id, uni.id).await.unwrap();
    assert!(WishlistService::list(&pool, ada.id).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "requires PostgreSQL; set DATABASE_URL"]
async fn suggestions_rank_by_affinity_and_skip_admins() {
    let pool = pool().await;
    let t = tag();
    let topic = format!("robotics-{t}");
    let country = format!("Norway {t}");
    let me = student(&pool, &t, "Ada", &country, &[topic.as_str(), "music"]).await;
    let close = student(&pool, &t, "Grace", &country, &[topic.as_str()]).await;
    let admin = student(&pool, &t, "Root", &country, &[topic.as_str()]).await;
    sqlx::query("UPDATE users SET role = 'admin' WHERE id = $1").bind(admin.id).execute(&pool).await.unwrap();

    let uni = university(&pool, &format!("Shared University {t}")).await;
    WishlistService::add(&pool, me.id, uni.id).await.unwrap();
    WishlistService::add(&pool, close.id, uni.id).await.unwrap();

    let page = PageQuery { limit: Some(100), cursor: None };
    let (rows, _) = ConnectService::suggestions(&pool, me.id, &page).await.unwrap();
    assert_eq!(rows[0].user.id, close.id);
    assert_eq!(rows[0].score, 3 + 2 + 1);
    assert_eq!(rows[0].shared_interests, vec![topic.clone()]);
    assert!(rows.iter().all(|s| s.user.id != admin.id && s.user.id != me.id));

    ConnectService::follow(&pool, me.id, close.id).await.unwrap();
    ConnectService::follow(&pool, me.id, close.id).await.unwrap();
    let (rows, _) = ConnectService::suggestions(&pool, me.id, &page).await.unwrap();
    assert!(rows.iter().all(|s| s.user.id != close.id));
    assert_eq!(ConnectService::following(&pool, me.id).await.unwrap().len(), 1);
    assert!(matches!(ConnectService::follow(&pool, me.id, me.id).await, Err(AppError::BadRequest(_))));
}

#[tokio::test]
#[ignore = "requires PostgreSQL; set DATABASE_URL"]
async fn refresh_rotates_a_token_once() {
    let pool = pool().await;
    let t = tag();
    let ada = student(&pool, &t, "Ada", "Norway", &[]).await;
    let token = AuthService::open_session(&pool, ada.id, 3600).await.unwrap();

    let (a, b) = tokio::join!(
        AuthService::rotate_session(&pool, &token, 3600),
        AuthService::rotate_session(&pool, &token, 3600)
    );
    let rotated: Vec<_> = [a.unwrap(), b.unwrap()].into_iter().flatten().collect();
    assert_eq!(rotated.len(), 1);
    let (user, fresh) = &rotated[0];
    assert_eq!(user.id, ada.id);
    assert!(AuthService::session_user(&pool, &token).await.unwrap().is_none());
    assert!(AuthService::session_user(&pool, fresh).await.unwrap().is_some());
}

fn zip_of(entries: &[(&str, String)]) -> Vec<u8> {
    let mut w = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, body) in entries {
        w.start_file(*name, SimpleFileOptions::default()).unwrap();
        w.write_all(body.as_bytes()).unwrap();
    }
    w.finish().unwrap().into_inner()
}

#[tokio::test]
#[ignore = "requires PostgreSQL; set DATABASE_URL"]
async fn catalog_import_is_all_or_nothing() {
    let pool = pool().await;
    let t = tag();
    let slug = format!("import-university-{t}");
    let universities = format!(r#"[{{"name":"Import University {t}","slug":"{slug}","country":"Finland","world_ranking":120}}]"#);

    let broken = zip_of(&[
        ("universities.json", universities.clone()),
        (
            "courses.json",
            format!(r#"[{{"universitySlug":"missing-{t}","name":"Data Science","level":"master","field":"Computing","durationMonths":24}}]"#),
        ),
    ]);
    let bundle = read_bundle(broken).unwrap();
    assert!(matches!(CatalogService::import(&pool, &bundle).await, Err(AppError::Validation(_))));
    assert!(matches!(UniversityService::find(&pool, &slug).await, Err(AppError::NotFound(_))));

    let good = zip_of(&[
        ("universities.json", universities),
        (
            "courses.json",
            format!(r#"[{{"university_slug":"{slug}","name":"Data Science","level":"master","field":"Computing","duration_months":24}}]"#),
        ),
    ]);
    let bundle = read_bundle(good).unwrap();
    let summary = CatalogService::import(&pool, &bundle).await.unwrap();
    assert_eq!((summary.universities, summary.courses, summary.faqs), (1, 1, 0));
    let again = CatalogService::import(&pool, &bundle).await.unwrap();
    assert_eq!(again.universities, 1);

    let detail = UniversityService::detail(&pool, &slug).await.unwrap();
    assert_eq!(detail.university.world_ranking, Some(120));
    assert_eq!(detail.course_count, 1);
}
