//! Schema DDL applied at startup. Each step runs once, in order, and is recorded in
//! `_sys_migrations` so restarts only apply what is new.

use crate::error::AppError;
use sqlx::PgPool;

/// Ordered schema steps: (version, description, statements).
pub const MIGRATIONS: &[(i64, &str, &[&str])] = &[
    (
        1,
        "enums",
        &[
            "DO $$ BEGIN CREATE TYPE user_role AS ENUM ('student', 'admin'); \
             EXCEPTION WHEN duplicate_object THEN NULL; END $$",
            "DO $$ BEGIN CREATE TYPE course_level AS ENUM ('diploma', 'bachelor', 'master', 'phd'); \
             EXCEPTION WHEN duplicate_object THEN NULL; END $$",
            "DO $$ BEGIN CREATE TYPE application_status AS ENUM \
             ('pending', 'under_review', 'accepted', 'rejected', 'withdrawn'); \
             EXCEPTION WHEN duplicate_object THEN NULL; END $$",
        ],
    ),
    (
        2,
        "users and sessions",
        &[
            r#"CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                role user_role NOT NULL DEFAULT 'student',
                country TEXT,
                interests TEXT[] NOT NULL DEFAULT '{}',
                avatar_url TEXT,
                bio TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"#,
            r#"CREATE TABLE IF NOT EXISTS sessions (
                token_hash TEXT PRIMARY KEY,
                user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                expires_at TIMESTAMPTZ NOT NULL
            )"#,
            "CREATE INDEX IF NOT EXISTS sessions_user_idx ON sessions (user_id)",
        ],
    ),
    (
        3,
        "catalog",
        &[
            r#"CREATE TABLE IF NOT EXISTS universities (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                slug TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                country TEXT NOT NULL,
                city TEXT,
                description TEXT,
                website TEXT,
                logo_url TEXT,
                world_ranking INT CHECK (world_ranking >= 1),
                tuition_fee_min BIGINT CHECK (tuition_fee_min >= 0),
                tuition_fee_max BIGINT CHECK (tuition_fee_max >= 0),
                acceptance_rate DOUBLE PRECISION CHECK (acceptance_rate BETWEEN 0 AND 100),
                student_count INT CHECK (student_count >= 0),
                featured BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                CHECK (tuition_fee_min IS NULL OR tuition_fee_max IS NULL OR tuition_fee_min <= tuition_fee_max)
            )"#,
            "CREATE INDEX IF NOT EXISTS universities_name_idx ON universities (lower(name), id)",
            "CREATE INDEX IF NOT EXISTS universities_country_idx ON universities (country)",
            r#"CREATE TABLE IF NOT EXISTS courses (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                university_id UUID NOT NULL REFERENCES universities(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                level course_level NOT NULL,
                field TEXT NOT NULL,
                duration_months INT NOT NULL CHECK (duration_months > 0),
                tuition_fee BIGINT CHECK (tuition_fee >= 0),
                language TEXT NOT NULL DEFAULT 'English',
                intake TEXT,
                description TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                UNIQUE (university_id, name, level)
            )"#,
            "CREATE INDEX IF NOT EXISTS courses_university_idx ON courses (university_id)",
            r#"CREATE TABLE IF NOT EXISTS career_outcomes (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                university_id UUID NOT NULL REFERENCES universities(id) ON DELETE CASCADE,
                employment_rate DOUBLE PRECISION NOT NULL CHECK (employment_rate BETWEEN 0 AND 100),
                median_salary BIGINT CHECK (median_salary >= 0),
                top_employers TEXT[] NOT NULL DEFAULT '{}',
                year INT NOT NULL,
                UNIQUE (university_id, year)
            )"#,
            r#"CREATE TABLE IF NOT EXISTS faqs (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                question TEXT NOT NULL,
                answer TEXT NOT NULL,
                category TEXT NOT NULL DEFAULT 'general',
                position INT NOT NULL DEFAULT 0,
                published BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"#,
        ],
    ),
    (
        4,
        "applications, wishlist, follows",
        &[
            r#"CREATE TABLE IF NOT EXISTS applications (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                university_id UUID NOT NULL REFERENCES universities(id) ON DELETE CASCADE,
                course_id UUID REFERENCES courses(id) ON DELETE SET NULL,
                status application_status NOT NULL DEFAULT 'pending',
                statement TEXT NOT NULL,
                document_urls TEXT[] NOT NULL DEFAULT '{}',
                admin_note TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"#,
            // One live application per user/university/course; withdrawn and rejected rows may repeat.
            r#"CREATE UNIQUE INDEX IF NOT EXISTS applications_active_uniq
                ON applications (user_id, university_id, COALESCE(course_id, '00000000-0000-0000-0000-000000000000'::uuid))
                WHERE status NOT IN ('withdrawn', 'rejected')"#,
            "CREATE INDEX IF NOT EXISTS applications_created_idx ON applications (created_at DESC, id DESC)",
            r#"CREATE TABLE IF NOT EXISTS wishlist (
                user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                university_id UUID NOT NULL REFERENCES universities(id) ON DELETE CASCADE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (user_id, university_id)
            )"#,
            r#"CREATE TABLE IF NOT EXISTS follows (
                follower_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                followee_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (follower_id, followee_id),
                CHECK (follower_id <> followee_id)
            )"#,
        ],
    ),
];

/// Apply every migration newer than the recorded version. Each step commits atomically.
pub async fn apply_migrations(pool: &PgPool) -> Result<(), AppError> {
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS _sys_migrations (
            version BIGINT PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )"#,
    )
    .execute(pool)
    .await?;

    let current: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM _sys_migrations")
        .fetch_one(pool)
        .await?;
    let current = current.unwrap_or(0);

    for (version, description, statements) in pending(current) {
        tracing::info!(version, description, "applying migration");
        let mut tx = pool.begin().await?;
        for stmt in statements.iter() {
            sqlx::query(stmt).execute(&mut *tx).await?;
        }
        sqlx::query("INSERT INTO _sys_migrations (version, description) VALUES ($1, $2)")
            .bind(version)
            .bind(description)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
    }
    Ok(())
}

fn pending(current: i64) -> impl Iterator<Item = (i64, &'static str, &'static [&'static str])> {
    MIGRATIONS
        .iter()
        .filter(move |(v, _, _)| *v > current)
        .map(|(v, d, s)| (*v, *d, *s))
}
