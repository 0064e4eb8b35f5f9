//! Utility type persistence.
//!
//! # Invariants
//! - `code` is unique; inserting a taken code yields `RepoError::Duplicate`.
//! - Rows are never deleted, only toggled via `is_active`.

use crate::model::utility_type::{UtilityType, UtilityTypeId};
use crate::repo::{
    bool_to_int, int_to_bool, is_unique_violation, RepoError, RepoResult, SqliteRepository,
};
use rusqlite::{params, Row};

const UTILITY_TYPE_SELECT_SQL: &str = "SELECT id, code, name, is_active FROM utility_types";

pub trait UtilityTypeRepository {
    /// Lists types ordered by display name.
    fn list_utility_types(&self, include_inactive: bool) -> RepoResult<Vec<UtilityType>>;
    fn find_utility_type_by_code(&self, code: &str) -> RepoResult<Option<UtilityType>>;
    fn create_utility_type(&self, code: &str, name: &str) -> RepoResult<UtilityType>;
    fn set_utility_type_active(&self, id: UtilityTypeId, is_active: bool) -> RepoResult<()>;
}

impl UtilityTypeRepository for SqliteRepository<'_> {
    fn list_utility_types(&self, include_inactive: bool) -> RepoResult<Vec<UtilityType>> {
        let mut stmt = self.conn.prepare(&format!(
            "{UTILITY_TYPE_SELECT_SQL}
             WHERE (?1 = 1 OR is_active = 1)
             ORDER BY name ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([bool_to_int(include_inactive)])?;
        let mut types = Vec::new();
        while let Some(row) = rows.next()? {
            types.push(parse_utility_type_row(row)?);
        }
        Ok(types)
    }

    fn find_utility_type_by_code(&self, code: &str) -> RepoResult<Option<UtilityType>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{UTILITY_TYPE_SELECT_SQL} WHERE code = ?1;"))?;
        let mut rows = stmt.query([code])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_utility_type_row(row)?)),
            None => Ok(None),
        }
    }

    fn create_utility_type(&self, code: &str, name: &str) -> RepoResult<UtilityType> {
        let inserted = self.conn.execute(
            "INSERT INTO utility_types (code, name, is_active) VALUES (?1, ?2, 1);",
            params![code, name],
        );
        match inserted {
            Ok(_) => {}
            Err(err) if is_unique_violation(&err) => {
                return Err(RepoError::Duplicate {
                    entity: "utility type",
                    key: code.to_string(),
                });
            }
            Err(err) => return Err(err.into()),
        }

        Ok(UtilityType {
            id: self.conn.last_insert_rowid(),
            code: code.to_string(),
            name: name.to_string(),
            is_active: true,
        })
    }

    fn set_utility_type_active(&self, id: UtilityTypeId, is_active: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE utility_types SET is_active = ?2 WHERE id = ?1;",
            params![id, bool_to_int(is_active)],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "utility type",
                key: id.to_string(),
            });
        }
        Ok(())
    }
}

fn parse_utility_type_row(row: &Row<'_>) -> RepoResult<UtilityType> {
    Ok(UtilityType {
        id: row.get("id")?,
        code: row.get("code")?,
        name: row.get("name")?,
        is_active: int_to_bool(row.get("is_active")?, "utility_types.is_active")?,
    })
}
