use quick_xml::events::Event;
use quick_xml::Reader;

use super::FetchError;

const CDATA_OPEN: &str = "<![CDATA[";
const CDATA_CLOSE: &str = "]]>";

/// One `<item>` of an RSS feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: String,
    /// `<category>` values in document order.
    pub tags: Vec<String>,
    /// Raw HTML from `<content:encoded>`.
    pub body: String,
    /// The `<guid>` value, used as the article's canonical URL.
    pub link: String,
}

/// Entries recovered from a feed, plus the number dropped for missing fields.
#[derive(Debug, Default)]
pub struct ParseOutcome {
    pub entries: Vec<FeedEntry>,
    pub skipped: usize,
}

/// Fields collected while inside an `<item>`.
#[derive(Default)]
struct PartialEntry {
    title: Option<String>,
    tags: Vec<String>,
    body: Option<String>,
    link: Option<String>,
}

impl PartialEntry {
    fn finish(self) -> Result<FeedEntry, &'static str> {
        Ok(FeedEntry {
            title: self.title.ok_or("title")?,
            tags: self.tags,
            body: self.body.ok_or("content:encoded")?,
            link: self.link.ok_or("guid")?,
        })
    }
}

#[derive(Clone, Copy)]
enum Field {
    Title,
    Category,
    Guid,
}

/// Parses RSS markup into feed entries.
///
/// Every `<item>` becomes one [`FeedEntry`], in document order. Channel-level
/// elements are ignored. The body is taken verbatim from the source between
/// `<content:encoded>` and its closing tag, so HTML survives whether it was
/// wrapped in CDATA, entity-escaped, or embedded raw.
///
/// Items without a title, guid or encoded body are skipped and counted in
/// [`ParseOutcome::skipped`]. A feed with no items parses to an empty outcome.
///
/// # Errors
///
/// [`FetchError::Parse`] when the markup is not well-formed enough to walk.
pub fn parse_feed(content: &str) -> Result<ParseOutcome, FetchError> {
    // SEC-002: quick-xml (0.37) never expands <!ENTITY> declarations; only the
    // five XML builtins are resolved by `unescape()`.
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);
    // Raw HTML inside <content:encoded> is rarely balanced XML.
    reader.config_mut().check_end_names = false;

    let mut outcome = ParseOutcome::default();
    let mut current: Option<PartialEntry> = None;
    let mut field: Option<(Field, String)> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| FetchError::Parse(e.to_string()))?;

        match event {
            Event::Start(e) => match e.name().as_ref() {
                b"item" => current = Some(PartialEntry::default()),
                b"content:encoded" if current.is_some() => {
                    let start = reader.buffer_position() as usize;
                    let body = read_raw_body(&mut reader, content, start)?;
                    if let Some(entry) = current.as_mut() {
                        entry.body = Some(body);
                    }
                }
                b"title" if current.is_some() => field = Some((Field::Title, String::new())),
                b"category" if current.is_some() => {
                    field = Some((Field::Category, String::new()))
                }
                b"guid" if current.is_some() => field = Some((Field::Guid, String::new())),
                _ => {}
            },
            Event::Text(e) => {
                if let Some((_, text)) = field.as_mut() {
                    match e.unescape() {
                        Ok(unescaped) => text.push_str(&unescaped),
                        // Stray `&` or HTML-only entities: keep the source text.
                        Err(_) => text.push_str(&String::from_utf8_lossy(&e)),
                    }
                }
            }
            Event::CData(e) => {
                if let Some((_, text)) = field.as_mut() {
                    text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"item" => {
                    if let Some(partial) = current.take() {
                        match partial.finish() {
                            Ok(entry) => outcome.entries.push(entry),
                            Err(missing) => {
                                tracing::warn!(
                                    index = outcome.entries.len() + outcome.skipped,
                                    field = missing,
                                    "Skipping feed item with missing field"
                                );
                                outcome.skipped += 1;
                            }
                        }
                    }
                    field = None;
                }
                b"title" | b"category" | b"guid" => {
                    if let (Some((kind, text)), Some(entry)) = (field.take(), current.as_mut()) {
                        let text = text.trim().to_string();
                        match kind {
                            Field::Title => entry.title = Some(text),
                            Field::Category => entry.tags.push(text),
                            Field::Guid => entry.link = Some(text),
                        }
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(outcome)
}

/// Consumes events up to `</content:encoded>` and returns the source text in
/// between, with CDATA wrappers stripped.
fn read_raw_body(
    reader: &mut Reader<&[u8]>,
    content: &str,
    start: usize,
) -> Result<String, FetchError> {
    loop {
        // Position before the event so the closing tag itself is excluded.
        let before = reader.buffer_position() as usize;
        match reader
            .read_event()
            .map_err(|e| FetchError::Parse(e.to_string()))?
        {
            Event::End(e) if e.name().as_ref() == b"content:encoded" => {
                let raw = content.get(start..before).unwrap_or_default();
                return Ok(clean_body(raw));
            }
            Event::Eof => {
                return Err(FetchError::Parse(
                    "unexpected end of feed inside <content:encoded>".to_string(),
                ))
            }
            _ => {}
        }
    }
}

fn clean_body(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.contains(CDATA_OPEN) {
        return trimmed
            .replace(CDATA_OPEN, "")
            .replace(CDATA_CLOSE, "")
            .trim()
            .to_string();
    }

    // Entity-escaped HTML (`&lt;p&gt;`) is unescaped once; anything that fails
    // to unescape is already raw markup.
    match quick_xml::escape::unescape(trimmed) {
        Ok(unescaped) => unescaped.trim().to_string(),
        Err(_) => trimmed.to_string(),
    }
}
