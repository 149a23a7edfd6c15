/// Channel metadata plus items in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedFeed {
    pub title: String,
    pub link: String,
    pub description: String,
    pub entries: Vec<ParsedFeedEntry>,
}

/// One `<item>`; missing fields are empty strings. `pub_date` is kept raw.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedFeedEntry {
    pub title: String,
    pub link: String,
    pub description: String,
    pub pub_date: String,
}
