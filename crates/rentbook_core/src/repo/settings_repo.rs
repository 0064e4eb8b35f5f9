//! Settings singleton persistence.

use crate::model::settings::Settings;
use crate::repo::{parse_decimal, RepoError, RepoResult, SqliteRepository};
use rusqlite::{params, OptionalExtension};

const SETTINGS_ROW_ID: i64 = 1;

pub trait SettingsRepository {
    fn get_settings(&self) -> RepoResult<Settings>;
    fn save_settings(&self, settings: &Settings) -> RepoResult<()>;
}

impl SettingsRepository for SqliteRepository<'_> {
    fn get_settings(&self) -> RepoResult<Settings> {
        let row = self
            .conn
            .query_row(
                "SELECT rent_amount, billing_day, active_year FROM settings WHERE id = ?1;",
                [SETTINGS_ROW_ID],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, u32>(1)?,
                        row.get::<_, i32>(2)?,
                    ))
                },
            )
            .optional()?;

        let (rent_text, billing_day, active_year) = row.ok_or(RepoError::NotFound {
            entity: "settings",
            key: SETTINGS_ROW_ID.to_string(),
        })?;

        Ok(Settings {
            rent_amount: parse_decimal(&rent_text, "settings.rent_amount")?,
            billing_day,
            active_year,
        })
    }

    fn save_settings(&self, settings: &Settings) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO settings (id, rent_amount, billing_day, active_year)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (id) DO UPDATE SET
                rent_amount = excluded.rent_amount,
                billing_day = excluded.billing_day,
                active_year = excluded.active_year;",
            params![
                SETTINGS_ROW_ID,
                settings.rent_amount.to_string(),
                settings.billing_day,
                settings.active_year,
            ],
        )?;
        Ok(())
    }
}
