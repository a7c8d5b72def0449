//! Resolving a free-text query to a single work feature.

use impact_map_analytics_models::MatchPolicy;
use impact_map_geography_models::{Feature, FeatureCollection};

use crate::AnalysisError;

/// Finds the work whose `name_attribute` contains `query`,
/// case-insensitively.
///
/// A blank query matches nothing. Works with a missing, null or non-text
/// name never match. With [`MatchPolicy::First`] the first match in
/// collection order wins, even if a later work is a closer match.
///
/// # Errors
///
/// * [`AnalysisError::NotFound`] if no work matches
/// * [`AnalysisError::AmbiguousMatch`] under [`MatchPolicy::RequireUnique`]
///   when several works match and none equals the query
pub fn locate<'a>(
    works: &'a FeatureCollection,
    query: &str,
    name_attribute: &str,
    policy: MatchPolicy,
) -> Result<&'a Feature, AnalysisError> {
    let needle = query.trim().to_lowercase();
    let not_found = || AnalysisError::NotFound {
        query: query.to_string(),
    };

    if needle.is_empty() {
        return Err(not_found());
    }

    let mut matches = works.iter().filter_map(|feature| {
        let name = feature.text_property(name_attribute)?;
        name.to_lowercase()
            .contains(&needle)
            .then_some((feature, name))
    });

    match policy {
        MatchPolicy::First => matches.next().map(|(feature, _)| feature).ok_or_else(not_found),
        MatchPolicy::RequireUnique => {
            let candidates: Vec<(&Feature, &str)> = matches.collect();
            match candidates.as_slice() {
                [] => Err(not_found()),
                [(feature, _)] => Ok(*feature),
                _ => candidates
                    .iter()
                    .find(|(_, name)| name.to_lowercase() == needle)
                    .map(|(feature, _)| *feature)
                    .ok_or_else(|| AnalysisError::AmbiguousMatch {
                        query: query.to_string(),
                        candidates: candidates
                            .iter()
                            .map(|(_, name)| (*name).to_string())
                            .collect(),
                    }),
            }
        }
    }
}

/// Names of every work, in collection order. Works without a text name
/// are skipped.
#[must_use]
pub fn work_names(works: &FeatureCollection, name_attribute: &str) -> Vec<String> {
    works
        .iter()
        .filter_map(|f| f.text_property(name_attribute))
        .map(str::to_string)
        .collect()
}
