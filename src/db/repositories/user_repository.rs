use chrono::Utc;
use rusqlite::{named_params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::repositories::format_timestamp;
use crate::error::AppResult;
use crate::models::insights::UserProfile;

pub struct UserRepository;

impl UserRepository {
    pub fn upsert_user(conn: &Connection, user_id: &str, name: Option<&str>) -> AppResult<()> {
        let name = name.map(str::trim).filter(|value| !value.is_empty());

        conn.execute(
            r#"
                INSERT INTO users (id, name, created_at)
                VALUES (:id, :name, :created_at)
                ON CONFLICT(id) DO UPDATE SET name = excluded.name
            "#,
            named_params! {
                ":id": user_id,
                ":name": name,
                ":created_at": format_timestamp(&Utc::now()),
            },
        )?;

        Ok(())
    }

    pub fn add_habit(conn: &Connection, user_id: &str, name: &str) -> AppResult<String> {
        let id = Uuid::new_v4().to_string();

        conn.execute(
            r#"
                INSERT INTO habits (id, user_id, name, is_active, created_at)
                VALUES (:id, :user_id, :name, 1, :created_at)
            "#,
            named_params! {
                ":id": &id,
                ":user_id": user_id,
                ":name": name.trim(),
                ":created_at": format_timestamp(&Utc::now()),
            },
        )?;

        Ok(id)
    }

    pub fn find_profile(conn: &Connection, user_id: &str) -> AppResult<Option<UserProfile>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT
                    u.id,
                    u.name,
                    (SELECT COUNT(*) FROM habits h WHERE h.user_id = u.id AND h.is_active = 1) AS active_habits
                FROM users u
                WHERE u.id = :user_id
            "#,
        )?;

        let profile = stmt
            .query_row(named_params! {":user_id": user_id}, |row| {
                Ok(UserProfile {
                    id: row.get("id")?,
                    name: row.get("name")?,
                    active_habits: row.get("active_habits")?,
                })
            })
            .optional()?;

        Ok(profile)
    }
}
