//! Node search.
//!
//! Three query shapes, mirroring what the front end sends:
//! - `@123` looks up nodes by snapshot object id;
//! - `"exact name"` (quoted) matches node names exactly;
//! - anything else is a substring match, or a regular expression when the
//!   config says so, honoring case sensitivity.
//!
//! Results are node indexes in ordinal order, restricted by an optional
//! node filter.

use regex::RegexBuilder;

use super::errors::QueryError;
use super::graph::HeapGraph;

/// Search request from the caller.
#[derive(Clone, Debug)]
pub struct SearchConfig {
    pub query: String,
    pub case_sensitive: bool,
    pub is_regex: bool,
}

/// Runs a search over node names and ids.
pub fn search(
    graph: &HeapGraph,
    config: &SearchConfig,
    filter: Option<&dyn Fn(usize) -> bool>,
) -> Result<Vec<u32>, QueryError> {
    let nf = graph.meta().node_field_count;
    let query = config.query.trim();

    // Id queries bypass name matching entirely.
    if let Some(id_text) = query.strip_prefix('@') {
        let id: u32 = id_text
            .trim()
            .parse()
            .map_err(|_| QueryError::BadSearchQuery {
                detail: format!("invalid object id: {id_text:?}"),
            })?;
        let mut result = Vec::new();
        for ordinal in 0..graph.node_count() {
            if graph.node_id(ordinal) == id && passes(filter, ordinal) {
                result.push((ordinal * nf) as u32);
            }
        }
        return Ok(result);
    }

    let exact = query.len() >= 2 && query.starts_with('"') && query.ends_with('"');
    let matcher: Matcher = if exact {
        Matcher::Exact(query[1..query.len() - 1].to_owned())
    } else {
        let pattern = if config.is_regex {
            query.to_owned()
        } else {
            regex::escape(query)
        };
        let re = RegexBuilder::new(&pattern)
            .case_insensitive(!config.case_sensitive)
            .build()
            .map_err(|err| QueryError::BadSearchQuery {
                detail: err.to_string(),
            })?;
        Matcher::Regex(re)
    };

    let mut result = Vec::new();
    for ordinal in 0..graph.node_count() {
        if !passes(filter, ordinal) {
            continue;
        }
        let name = graph.node_name(ordinal);
        let hit = match &matcher {
            Matcher::Exact(wanted) => name == wanted,
            Matcher::Regex(re) => re.is_match(name),
        };
        if hit {
            result.push((ordinal * nf) as u32);
        }
    }
    Ok(result)
}

enum Matcher {
    Exact(String),
    Regex(regex::Regex),
}

#[inline]
fn passes(filter: Option<&dyn Fn(usize) -> bool>, ordinal: usize) -> bool {
    filter.map_or(true, |f| f(ordinal))
}
