//! Shareable configuration links.
//!
//! The current configuration rides in a `config` query parameter. Consuming
//! a link applies the decoded state and rewrites the address without the
//! parameter (no reload), so the token is not re-applied on navigation.

use tracing::{debug, warn};
use url::Url;

use crate::codec;
use crate::param::ConfigState;

/// Query parameter carrying the configuration token.
pub const CONFIG_QUERY_PARAM: &str = "config";

/// Build a shareable URL for `state` on top of `base`, replacing any
/// existing `config` parameter and preserving the rest of the query.
pub fn share_url(base: &Url, state: &ConfigState) -> Url {
    let token = codec::encode(state);
    let others: Vec<(String, String)> = base
        .query_pairs()
        .filter(|(k, _)| k != CONFIG_QUERY_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut url = base.clone();
    url.set_query(None);
    {
        let mut pairs = url.query_pairs_mut();
        for (k, v) in &others {
            pairs.append_pair(k, v);
        }
        pairs.append_pair(CONFIG_QUERY_PARAM, &token);
    }
    url
}

/// Extract and decode the `config` parameter from an incoming URL.
///
/// Returns the decoded state together with the URL to show in the address
/// bar (the original minus the `config` parameter). Returns `None` when the
/// URL carries no token, or a malformed one -- a bad share link must never
/// block the viewer, so it is logged and ignored.
pub fn consume_share_url(url: &Url) -> Option<(ConfigState, Url)> {
    let token = url
        .query_pairs()
        .find(|(k, _)| k == CONFIG_QUERY_PARAM)
        .map(|(_, v)| v.into_owned())?;

    let state = match codec::decode(&token) {
        Ok(state) => state,
        Err(e) => {
            warn!("Ignoring malformed share token: {}", e);
            return None;
        }
    };

    debug!(entries = state.len(), "Loaded configuration from share link");
    Some((state, without_config_param(url)))
}

fn without_config_param(url: &Url) -> Url {
    let remaining: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != CONFIG_QUERY_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut cleaned = url.clone();
    cleaned.set_query(None);
    if !remaining.is_empty() {
        let mut pairs = cleaned.query_pairs_mut();
        for (k, v) in &remaining {
            pairs.append_pair(k, v);
        }
    }
    cleaned
}
