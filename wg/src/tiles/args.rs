//! Query Argument Builder - tile state to wire parameters
//!
//! Pure and deterministic: no clock, no network, no hidden state. The test
//! suite leans on that.

use serde::{Deserialize, Serialize};

use crate::actions::QueryOverride;

/// Configured query parameters of one tile
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TileQuery {
    pub corpus_name: String,
    /// Concordance the tile computes its distribution from
    pub conc_id: String,
    pub criterion: Vec<String>,
    pub limit: u64,
    pub sort_key: String,
    pub page: u64,
    pub include_empty: bool,
}

impl Default for TileQuery {
    fn default() -> Self {
        Self {
            corpus_name: String::new(),
            conc_id: String::new(),
            criterion: Vec::new(),
            limit: 100,
            sort_key: "freq".to_string(),
            page: 1,
            include_empty: false,
        }
    }
}

/// Wire-level arguments for a frequency-distribution endpoint
///
/// Numbers travel as strings and booleans as `'1'`/`'0'`; that is what the
/// remote end expects, not a serialization accident.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryArgs {
    pub corpus_name: String,
    pub q: String,
    pub criterion: Vec<String>,
    pub limit: String,
    pub sort_key: String,
    pub page: String,
    pub include_empty: String,
    pub format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub srch_range: Option<String>,
}

impl QueryArgs {
    /// Flat key/value pairs for an HTTP query string, in stable order
    pub fn as_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("corpusName", self.corpus_name.clone()),
            ("q", self.q.clone()),
        ];
        for crit in &self.criterion {
            pairs.push(("criterion", crit.clone()));
        }
        pairs.push(("limit", self.limit.clone()));
        pairs.push(("sortKey", self.sort_key.clone()));
        pairs.push(("page", self.page.clone()));
        pairs.push(("includeEmpty", self.include_empty.clone()));
        pairs.push(("format", self.format.clone()));
        if let Some(range) = &self.srch_range {
            pairs.push(("srchRange", range.clone()));
        }
        pairs
    }
}

/// Map a tile's query plus optional injected overrides onto wire arguments
///
/// Injected values win over the tile's own: an overridden concordance id
/// replaces the configured one inside `q`, an overridden limit replaces the
/// configured limit.
pub fn build_query_args(query: &TileQuery, overrides: Option<&QueryOverride>) -> QueryArgs {
    let conc_id = overrides
        .and_then(|o| o.conc_id.as_deref())
        .unwrap_or(&query.conc_id);
    let limit = overrides.and_then(|o| o.limit).unwrap_or(query.limit);
    let srch_range = overrides
        .and_then(|o| o.srch_range)
        .map(|r| format!("{},{}", r.min, r.max));

    QueryArgs {
        corpus_name: query.corpus_name.clone(),
        q: format!("~{conc_id}"),
        criterion: query.criterion.clone(),
        limit: limit.to_string(),
        sort_key: query.sort_key.clone(),
        page: query.page.to_string(),
        include_empty: if query.include_empty { "1" } else { "0" }.to_string(),
        format: "json".to_string(),
        srch_range,
    }
}
