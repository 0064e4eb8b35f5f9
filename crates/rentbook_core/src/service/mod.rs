//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Parse and validate raw user input before it reaches storage.
//! - Keep the HTTP layer decoupled from storage details.

use crate::model::utility_type::UtilityType;
use crate::repo::utility_type_repo::UtilityTypeRepository;
use crate::repo::RepoResult;
use std::collections::HashMap;

pub mod bill_service;
pub mod dashboard_service;
pub mod expected_service;
pub mod month_service;
pub mod settings_service;

/// Maps utility codes to display names, including inactive types.
pub(crate) fn utility_names<R: UtilityTypeRepository>(
    repo: &R,
) -> RepoResult<HashMap<String, String>> {
    Ok(repo
        .list_utility_types(true)?
        .into_iter()
        .map(|UtilityType { code, name, .. }| (code, name))
        .collect())
}

/// Display name for `code`, falling back to the code itself.
pub(crate) fn display_name(names: &HashMap<String, String>, code: &str) -> String {
    names.get(code).cloned().unwrap_or_else(|| code.to_string())
}
