use htmlescape::decode_html;
use rss::{Channel, Item};

use super::types::{ParsedFeed, ParsedFeedEntry};
use super::FetchError;

pub fn parse_feed(xml: &[u8]) -> Result<ParsedFeed, FetchError> {
    let ch = Channel::read_from(xml)?;
    Ok(ParsedFeed {
        title: decode_entities(ch.title()),
        link: ch.link().to_string(),
        description: decode_entities(ch.description()),
        entries: ch.items().iter().map(to_entry).collect(),
    })
}

fn to_entry(item: &Item) -> ParsedFeedEntry {
    ParsedFeedEntry {
        title: decode_entities(item.title().unwrap_or_default()),
        link: item.link().unwrap_or_default().trim().to_string(),
        description: decode_entities(item.description().unwrap_or_default()),
        pub_date: item.pub_date().unwrap_or_default().trim().to_string(),
    }
}

// Longest entity name worth trying, `&` and `;` included.
const MAX_ENTITY_LEN: usize = 32;

// Feeds often double-encode entities (`&amp;amp;`), leaving `&amp;` after XML
// decoding. Each `&name;` run is decoded on its own; a bare `&` or an unknown
// entity stays literal without blocking the rest of the text.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        match entity_run(tail).and_then(|run| decode_html(run).ok().map(|txt| (run.len(), txt))) {
            Some((len, txt)) => {
                out.push_str(&txt);
                rest = &tail[len..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

// `&name;`, `&#39;` or `&#x27;` at the start of `s`.
fn entity_run(s: &str) -> Option<&str> {
    let body = &s[1..];
    let end = body
        .char_indices()
        .take_while(|&(i, c)| i < MAX_ENTITY_LEN && (c.is_ascii_alphanumeric() || c == '#'))
        .last()
        .map(|(i, c)| i + c.len_utf8())?;
    body[end..].starts_with(';').then(|| &s[..end + 2])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Lane&amp;#39;s Blog</title>
    <link>https://blog.example.test/</link>
    <description>Notes &amp;amp; essays</description>
    <item>
      <title>Hello &amp;quot;World&amp;quot;</title>
      <link> https://blog.example.test/hello </link>
      <description>&lt;p&gt;First post&lt;/p&gt;</description>
      <pubDate>Mon, 02 Jan 2006 15:04:05 -0700</pubDate>
    </item>
    <item>
      <title>No date here</title>
      <link>https://blog.example.test/nodate</link>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn parses_channel_and_items_in_order() {
        let feed = parse_feed(SAMPLE.as_bytes()).unwrap();
        assert_eq!(feed.link, "https://blog.example.test/");
        assert_eq!(feed.entries.len(), 2);
        assert_eq!(feed.entries[0].link, "https://blog.example.test/hello");
        assert_eq!(feed.entries[0].pub_date, "Mon, 02 Jan 2006 15:04:05 -0700");
        assert_eq!(feed.entries[1].title, "No date here");
        assert_eq!(feed.entries[1].description, "");
        assert_eq!(feed.entries[1].pub_date, "");
    }

    #[test]
    fn decodes_double_encoded_entities_at_both_levels() {
        let feed = parse_feed(SAMPLE.as_bytes()).unwrap();
        assert_eq!(feed.title, "Lane's Blog");
        assert_eq!(feed.description, "Notes & essays");
        assert_eq!(feed.entries[0].title, "Hello \"World\"");
        assert_eq!(feed.entries[0].description, "<p>First post</p>");
    }

    #[test]
    fn bare_ampersand_survives_decoding() {
        assert_eq!(decode_entities("Tom & Jerry"), "Tom & Jerry");
        assert_eq!(decode_entities("plain"), "plain");
        assert_eq!(decode_entities("caf&eacute;"), "café");
    }

    #[test]
    fn literal_ampersand_does_not_block_other_entities() {
        assert_eq!(decode_entities("Q&A: Tom &amp; Jerry"), "Q&A: Tom & Jerry");
        assert_eq!(decode_entities("R&D &#39;24 &amp; beyond"), "R&D '24 & beyond");
        assert_eq!(decode_entities("fish &chips; &amp;"), "fish &chips; &");
        assert_eq!(decode_entities("trailing &"), "trailing &");
        assert_eq!(decode_entities("&;"), "&;");
    }

    #[test]
    fn malformed_document_is_a_parse_error() {
        let err = parse_feed(b"<html><body>not a feed</body></html>").unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));

        let err = parse_feed(b"<rss><channel><title>cut off").unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }
}
