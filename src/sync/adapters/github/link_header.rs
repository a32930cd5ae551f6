//! `Link` response header parsing for page navigation.

use url::Url;

/// Returns the `page` query value of the `rel="next"` target, if any.
pub(super) fn next_page(header: &str) -> Option<u32> {
    header
        .split('<')
        .filter_map(|entry| {
            let (target, params) = entry.split_once('>')?;
            let is_next = params
                .split([';', ','])
                .any(|param| param.trim().replace(' ', "") == r#"rel="next""#);
            is_next.then_some(target)
        })
        .find_map(|target| {
            let url = Url::parse(target).ok()?;
            url.query_pairs()
                .find(|(name, _)| name == "page")
                .and_then(|(_, value)| value.parse().ok())
        })
}
