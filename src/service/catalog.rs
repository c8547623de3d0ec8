//! Catalog import from a zip bundle and admin statistics.
//!
//! A bundle holds up to three JSON arrays: `universities.json`, `courses.json` and
//! `faqs.json`. Entries may sit at the archive root or inside a single top-level folder.
//! Kinds are applied in dependency order inside one transaction, so a bad record
//! leaves the catalog untouched.

use crate::error::{AppError, FieldErrors};
use crate::models::*;
use crate::service::universities::slugify;
use crate::service::validation::Validate;
use serde::de::DeserializeOwned;
use sqlx::{PgConnection, PgPool};
use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Read, Seek};
use uuid::Uuid;
use zip::ZipArchive;

const KINDS: &[&str] = &["faqs", "courses", "universities"];

/// Largest decompressed size accepted for a single JSON entry.
pub const ENTRY_MAX_BYTES: u64 = 64 * 1024 * 1024;

/// Kinds that must be applied before `kind`.
fn dependencies(kind: &str) -> &'static [&'static str] {
    match kind {
        "courses" => &["universities"],
        _ => &[],
    }
}

/// Topological order over `KINDS`: every kind comes after its dependencies.
fn apply_order() -> Vec<&'static str> {
    let mut order = Vec::with_capacity(KINDS.len());
    let mut done: HashSet<&'static str> = HashSet::new();
    while order.len() < KINDS.len() {
        let mut progressed = false;
        for &kind in KINDS {
            if !done.contains(kind) && dependencies(kind).iter().all(|d| done.contains(d)) {
                order.push(kind);
                done.insert(kind);
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }
    order
}

/// Parsed and validated contents of an import archive.
#[derive(Debug, Default)]
pub struct CatalogBundle {
    pub universities: Vec<UniversityInput>,
    pub courses: Vec<CourseImport>,
    pub faqs: Vec<FaqInput>,
}

impl CatalogBundle {
    pub fn is_empty(&self) -> bool {
        self.universities.is_empty() && self.courses.is_empty() && self.faqs.is_empty()
    }
}

fn find_entry<R: Read + Seek>(archive: &ZipArchive<R>, file: &str) -> Option<String> {
    let nested = format!("/{}", file);
    archive
        .file_names()
        .find(|n| *n == file || (n.ends_with(&nested) && n.matches('/').count() == 1))
        .map(String::from)
}

fn read_array<R: Read + Seek, T: DeserializeOwned>(
    archive: &mut ZipArchive<R>,
    file: &str,
    max_bytes: u64,
) -> Result<Vec<T>, AppError> {
    let Some(name) = find_entry(archive, file) else {
        return Ok(Vec::new());
    };
    let entry = archive.by_name(&name).map_err(|e| AppError::BadRequest(e.to_string()))?;
    let mut buf = String::new();
    entry
        .take(max_bytes + 1)
        .read_to_string(&mut buf)
        .map_err(|e| AppError::BadRequest(format!("{}: {}", file, e)))?;
    if buf.len() as u64 > max_bytes {
        return Err(AppError::PayloadTooLarge(format!("{} expands past {} bytes", file, max_bytes)));
    }
    serde_json::from_str(&buf).map_err(|e| AppError::BadRequest(format!("invalid {}: {}", file, e)))
}

/// Prefix each field key with `file[index].` and merge into `into`.
fn collect_errors(into: &mut FieldErrors, file: &str, index: usize, result: Result<(), AppError>) -> Result<(), AppError> {
    match result {
        Ok(()) => Ok(()),
        Err(AppError::Validation(fields)) => {
            for (field, messages) in fields {
                into.entry(format!("{}[{}].{}", file, index, field)).or_default().extend(messages);
            }
            Ok(())
        }
        Err(other) => Err(other),
    }
}

/// Read and validate a bundle without touching the database.
pub fn read_bundle(zip_bytes: Vec<u8>) -> Result<CatalogBundle, AppError> {
    read_bundle_limited(zip_bytes, ENTRY_MAX_BYTES)
}

fn read_bundle_limited(zip_bytes: Vec<u8>, max_entry_bytes: u64) -> Result<CatalogBundle, AppError> {
    let mut archive =
        ZipArchive::new(Cursor::new(zip_bytes)).map_err(|e| AppError::BadRequest(format!("invalid zip: {}", e)))?;
    let bundle = CatalogBundle {
        universities: read_array(&mut archive, "universities.json", max_entry_bytes)?,
        courses: read_array(&mut archive, "courses.json", max_entry_bytes)?,
        faqs: read_array(&mut archive, "faqs.json", max_entry_bytes)?,
    };
    if bundle.is_empty() {
        return Err(AppError::BadRequest(
            "archive contains none of universities.json, courses.json, faqs.json".into(),
        ));
    }

    let mut errors = FieldErrors::new();
    let mut slugs = HashSet::new();
    for (i, u) in bundle.universities.iter().enumerate() {
        collect_errors(&mut errors, "universities", i, u.validate())?;
        let slug = u.slug.clone().unwrap_or_else(|| slugify(&u.name));
        if !slugs.insert(slug.clone()) {
            errors
                .entry(format!("universities[{}].slug", i))
                .or_default()
                .push(format!("duplicate slug '{}' in archive", slug));
        }
    }
    for (i, c) in bundle.courses.iter().enumerate() {
        collect_errors(&mut errors, "courses", i, c.to_input(Uuid::nil()).validate())?;
    }
    for (i, f) in bundle.faqs.iter().enumerate() {
        collect_errors(&mut errors, "faqs", i, f.validate())?;
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }
    Ok(bundle)
}

async fn upsert_universities(conn: &mut PgConnection, rows: &[UniversityInput], ids: &mut HashMap<String, Uuid>) -> Result<u64, AppError> {
    for u in rows {
        let slug = u.slug.clone().unwrap_or_else(|| slugify(&u.name));
        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO universities (slug, name, country, city, description, website, logo_url, world_ranking, \
             tuition_fee_min, tuition_fee_max, acceptance_rate, student_count, featured) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             ON CONFLICT (slug) DO UPDATE SET name = EXCLUDED.name, country = EXCLUDED.country, city = EXCLUDED.city, \
             description = EXCLUDED.description, website = EXCLUDED.website, logo_url = EXCLUDED.logo_url, \
             world_ranking = EXCLUDED.world_ranking, tuition_fee_min = EXCLUDED.tuition_fee_min, \
             tuition_fee_max = EXCLUDED.tuition_fee_max, acceptance_rate = EXCLUDED.acceptance_rate, \
             student_count = EXCLUDED.student_count, featured = EXCLUDED.featured, updated_at = NOW() \
             RETURNING id",
        )
        .bind(&slug)
        .bind(u.name.trim())
        .bind(u.country.trim())
        .bind(u.city.as_deref())
        .bind(u.description.as_deref())
        .bind(u.website.as_deref())
        .bind(u.logo_url.as_deref())
        .bind(u.world_ranking)
        .bind(u.tuition_fee_min)
        .bind(u.tuition_fee_max)
        .bind(u.acceptance_rate)
        .bind(u.student_count)
        .bind(u.featured)
        .fetch_one(&mut *conn)
        .await?;
        ids.insert(slug, id);
    }
    Ok(rows.len() as u64)
}

async fn upsert_courses(conn: &mut PgConnection, rows: &[CourseImport], ids: &mut HashMap<String, Uuid>) -> Result<u64, AppError> {
    for (i, c) in rows.iter().enumerate() {
        let slug = c.university_slug.trim().to_lowercase();
        let university_id = match ids.get(&slug) {
            Some(id) => *id,
            None => {
                let found: Option<Uuid> = sqlx::query_scalar("SELECT id FROM universities WHERE slug = $1")
                    .bind(&slug)
                    .fetch_optional(&mut *conn)
                    .await?;
                let id = found.ok_or_else(|| {
                    AppError::field(&format!("courses[{}].universitySlug", i), format!("unknown university '{}'", slug))
                })?;
                ids.insert(slug, id);
                id
            }
        };
        sqlx::query(
            "INSERT INTO courses (university_id, name, level, field, duration_months, tuition_fee, language, intake, description) \
             VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, 'English'), $8, $9) \
             ON CONFLICT (university_id, name, level) DO UPDATE SET field = EXCLUDED.field, \
             duration_months = EXCLUDED.duration_months, tuition_fee = EXCLUDED.tuition_fee, \
             language = EXCLUDED.language, intake = EXCLUDED.intake, description = EXCLUDED.description, updated_at = NOW()",
        )
        .bind(university_id)
        .bind(c.name.trim())
        .bind(c.level)
        .bind(c.field.trim())
        .bind(c.duration_months)
        .bind(c.tuition_fee)
        .bind(c.language.as_deref())
        .bind(c.intake.as_deref())
        .bind(c.description.as_deref())
        .execute(&mut *conn)
        .await?;
    }
    Ok(rows.len() as u64)
}

async fn insert_faqs(conn: &mut PgConnection, rows: &[FaqInput]) -> Result<u64, AppError> {
    for f in rows {
        sqlx::query(
            "INSERT INTO faqs (question, answer, category, position, published) \
             VALUES ($1, $2, COALESCE($3, 'general'), COALESCE($4, 0), COALESCE($5, TRUE))",
        )
        .bind(f.question.trim())
        .bind(f.answer.trim())
        .bind(f.category.as_deref().map(str::trim))
        .bind(f.position)
        .bind(f.published)
        .execute(&mut *conn)
        .await?;
    }
    Ok(rows.len() as u64)
}

pub struct CatalogService;

impl CatalogService {
    pub async fn import(pool: &PgPool, bundle: &CatalogBundle) -> Result<ImportSummary, AppError> {
        let mut tx = pool.begin().await?;
        let mut ids: HashMap<String, Uuid> = HashMap::new();
        let mut summary = ImportSummary::default();
        for kind in apply_order() {
            match kind {
                "universities" => summary.universities = upsert_universities(&mut *tx, &bundle.universities, &mut ids).await?,
                "courses" => summary.courses = upsert_courses(&mut *tx, &bundle.courses, &mut ids).await?,
                "faqs" => summary.faqs = insert_faqs(&mut *tx, &bundle.faqs).await?,
                _ => {}
            }
        }
        tx.commit().await?;
        tracing::info!(
            universities = summary.universities,
            courses = summary.courses,
            faqs = summary.faqs,
            "catalog imported"
        );
        Ok(summary)
    }

    pub async fn stats(pool: &PgPool) -> Result<CatalogStats, AppError> {
        let (users, universities, courses): (i64, i64, i64) = sqlx::query_as(
            "SELECT (SELECT COUNT(*) FROM users), (SELECT COUNT(*) FROM universities), (SELECT COUNT(*) FROM courses)",
        )
        .fetch_one(pool)
        .await?;
        let applications = crate::service::applications::ApplicationService::status_counts(pool)
            .await?
            .into_iter()
            .map(|(status, n)| (status.as_str().to_string(), n))
            .collect();
        Ok(CatalogStats {
            users,
            universities,
            courses,
            applications,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn zip_of(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut w = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, body) in entries {
            w.start_file(*name, SimpleFileOptions::default()).unwrap();
            w.write_all(body.as_bytes()).unwrap();
        }
        w.finish().unwrap().into_inner()
    }

    #[test]
    fn universities_are_applied_before_courses() {
        let order = apply_order();
        assert_eq!(order.len(), KINDS.len());
        let pos = |k: &str| order.iter().position(|x| *x == k).unwrap();
        assert!(pos("universities") < pos("courses"));
    }

    #[test]
    fn reads_root_and_nested_entries() {
        let bytes = zip_of(&[
            ("catalog/universities.json", r#"[{"name":"Delft University of Technology","country":"Netherlands"}]"#),
            (
                "catalog/courses.json",
                r#"[{"university_slug":"delft-university-of-technology","name":"Aerospace Engineering","level":"master","field":"Engineering","duration_months":24}]"#,
            ),
        ]);
        let bundle = read_bundle(bytes).unwrap();
        assert_eq!(bundle.universities.len(), 1);
        assert_eq!(bundle.courses[0].university_slug, "delft-university-of-technology");
        assert!(bundle.faqs.is_empty());
    }

    #[test]
    fn snake_case_university_keys_are_kept() {
        let bytes = zip_of(&[(
            "universities.json",
            r#"[{"name":"Delft University","country":"Netherlands","world_ranking":47,"tuition_fee_min":2000,"tuition_fee_max":18000,"logo_url":"https://x/y.png"}]"#,
        )]);
        let bundle = read_bundle(bytes).unwrap();
        let u = &bundle.universities[0];
        assert_eq!(u.world_ranking, Some(47));
        assert_eq!(u.tuition_fee_min, Some(2000));
        assert_eq!(u.tuition_fee_max, Some(18000));
        assert_eq!(u.logo_url.as_deref(), Some("https://x/y.png"));
    }

    #[test]
    fn entries_that_expand_too_far_are_rejected() {
        let faqs = format!(r#"[{{"question":"How do I apply?","answer":"{}"}}]"#, "x".repeat(4096));
        let bytes = zip_of(&[("faqs.json", faqs.as_str())]);
        assert!(matches!(read_bundle_limited(bytes.clone(), 1024), Err(AppError::PayloadTooLarge(_))));
        assert!(read_bundle_limited(bytes, 8192).is_ok());
    }

    #[test]
    fn invalid_records_are_reported_by_position() {
        let bytes = zip_of(&[(
            "faqs.json",
            r#"[{"question":"How do I apply?","answer":"Online."},{"question":"?","answer":""}]"#,
        )]);
        match read_bundle(bytes) {
            Err(AppError::Validation(fields)) => {
                assert!(fields.contains_key("faqs[1].question"));
                assert!(fields.contains_key("faqs[1].answer"));
                assert!(!fields.keys().any(|k| k.starts_with("faqs[0]")));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_slugs_are_rejected() {
        let bytes = zip_of(&[(
            "universities.json",
            r#"[{"name":"Uni One","country":"Spain","slug":"uni"},{"name":"Uni Two","country":"Spain","slug":"uni"}]"#,
        )]);
        assert!(matches!(read_bundle(bytes), Err(AppError::Validation(f)) if f.contains_key("universities[1].slug")));
    }

    #[test]
    fn archive_without_known_files_is_rejected() {
        let bytes = zip_of(&[("readme.txt", "hello")]);
        assert!(matches!(read_bundle(bytes), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn garbage_is_not_a_zip() {
        assert!(matches!(read_bundle(b"not a zip".to_vec()), Err(AppError::BadRequest(_))));
    }
}
