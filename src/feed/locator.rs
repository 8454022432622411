use super::FeedEntry;

/// Returns the first entry whose title equals `title` exactly.
///
/// Matching is case-sensitive with no trimming or normalisation. Absence is
/// a normal outcome; callers decide whether it is an error.
pub fn locate<'a>(entries: &'a [FeedEntry], title: &str) -> Option<&'a FeedEntry> {
    let found = entries.iter().find(|entry| entry.title == title);
    if found.is_none() {
        tracing::debug!(title = %title, scanned = entries.len(), "No feed entry with matching title");
    }
    found
}
