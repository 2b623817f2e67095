//! Link normalization.
//!
//! Watch links pasted from a browser carry tracking and playlist parameters
//! (`list`, `index`, `t`, `si`, ...). Only `v` identifies the item, so
//! everything else is dropped before the link reaches the extractor.

use url::Url;

const ID_PARAM: &str = "v";

/// Whether the link points at a playlist rather than a single item.
pub fn is_collection(link: &Url) -> bool {
    link.path_segments()
        .map(|mut segments| segments.any(|segment| segment == "playlist"))
        .unwrap_or(false)
}

/// Returns the canonical form of `link`.
///
/// Playlist links are returned unchanged. Anything else keeps only its `v`
/// parameter and loses its fragment; a link without `v` ends up with an empty
/// `v=` so that resolution, not normalization, reports the problem.
pub fn normalize(link: &str) -> String {
    let link = link.trim();
    let Ok(mut parsed) = Url::parse(link) else {
        return link.to_string();
    };

    if is_collection(&parsed) {
        return link.to_string();
    }

    let ids: Vec<String> = parsed
        .query_pairs()
        .filter(|(key, _)| key == ID_PARAM)
        .map(|(_, value)| value.into_owned())
        .collect();

    parsed.set_fragment(None);
    parsed.set_query(None);
    {
        let mut query = parsed.query_pairs_mut();
        if ids.is_empty() {
            query.append_pair(ID_PARAM, "");
        }
        for id in &ids {
            query.append_pair(ID_PARAM, id);
        }
    }

    parsed.to_string()
}
