//! Builder for Collection+JSON workshop feeds.

use serde_json::{Value, json};

/// Builds feed documents in the shape the catalog ingests.
///
/// # Example
///
/// ```
/// use confreg_testing::FeedBuilder;
///
/// let feed = FeedBuilder::new()
///     .workshop("java-intro", "Intro to Java")
///     .draft("secret", "Not yet")
///     .build();
///
/// assert!(String::from_utf8(feed).unwrap().contains("java-intro"));
/// ```
#[derive(Clone, Debug, Default)]
pub struct FeedBuilder {
    items: Vec<Value>,
}

impl FeedBuilder {
    /// Start an empty feed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a published, unscheduled workshop.
    #[must_use]
    pub fn workshop(self, slug: &str, title: &str) -> Self {
        self.item(item_data(slug, title, true, "workshop"), Vec::new())
    }

    /// Add a published workshop with a summary.
    #[must_use]
    pub fn workshop_with_summary(self, slug: &str, title: &str, summary: &str) -> Self {
        let mut data = item_data(slug, title, true, "workshop");
        data.push(json!({"name": "summary", "value": summary}));
        self.item(data, Vec::new())
    }

    /// Add a published workshop in a program slot (`start`/`end` as RFC 3339).
    #[must_use]
    pub fn scheduled(self, slug: &str, title: &str, start: &str, end: &str) -> Self {
        let link = json!({
            "rel": "slot item",
            "href": format!("https://feed.example.org/slots/{slug}"),
            "prompt": format!("{start}+{end}"),
        });
        self.item(item_data(slug, title, true, "workshop"), vec![link])
    }

    /// Add an unpublished workshop.
    #[must_use]
    pub fn draft(self, slug: &str, title: &str) -> Self {
        self.item(item_data(slug, title, false, "workshop"), Vec::new())
    }

    /// Add a published item of another format (e.g. `"presentation"`).
    #[must_use]
    pub fn talk(self, slug: &str, title: &str, format: &str) -> Self {
        self.item(item_data(slug, title, true, format), Vec::new())
    }

    /// Add an arbitrary item.
    #[must_use]
    pub fn item(mut self, data: Vec<Value>, links: Vec<Value>) -> Self {
        self.items.push(json!({"data": data, "links": links}));
        self
    }

    /// The document as a JSON value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        json!({"collection": {"version": "1.0", "items": self.items}})
    }

    /// The document as bytes.
    #[must_use]
    pub fn build(&self) -> Vec<u8> {
        self.to_value().to_string().into_bytes()
    }
}

fn item_data(slug: &str, title: &str, published: bool, format: &str) -> Vec<Value> {
    vec![
        json!({"name": "slug", "value": slug}),
        json!({"name": "title", "value": title}),
        json!({"name": "published", "value": published}),
        json!({"name": "format", "value": format}),
    ]
}
