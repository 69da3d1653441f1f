use crate::queue::IngestQueue;
use crate::types::{QueueItem, SourceKind, SubmitContext};

/// One raw image input: the original filename plus the file bytes.
#[derive(Debug, Clone)]
pub struct ImageSource {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ImageSource {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}

/// Register one `Processing` item per image, synchronously and in
/// submission order, before any network activity begins. Returns the
/// local item ids.
///
/// Files must be non-empty; an empty file rejects the whole batch before
/// anything is registered. Submitting the same file twice yields two
/// independent items — the queue has no content identity.
pub fn register_images(
    queue: &IngestQueue,
    images: &[ImageSource],
    context: &SubmitContext,
) -> anyhow::Result<Vec<String>> {
    for image in images {
        if image.bytes.is_empty() {
            anyhow::bail!("empty file: {}", image.file_name);
        }
    }

    let mut ids = Vec::with_capacity(images.len());
    for image in images {
        let item = QueueItem::new(
            SourceKind::Image,
            title_from_file_name(&image.file_name),
            context.clone(),
        );
        ids.push(item.id.clone());
        queue.register(item)?;
    }
    Ok(ids)
}

/// Register one `Processing` item for a URL source. The string must be
/// non-empty; no format validation is applied — a malformed URL is
/// allowed to fail downstream at the relay.
pub fn register_url(
    queue: &IngestQueue,
    url: &str,
    context: &SubmitContext,
) -> anyhow::Result<String> {
    let url = url.trim();
    if url.is_empty() {
        anyhow::bail!("empty URL");
    }

    let item = QueueItem::new(SourceKind::Url, title_from_url(url), context.clone());
    let id = item.id.clone();
    queue.register(item)?;
    Ok(id)
}

/// Provisional display title from a filename: stem with separators
/// spaced out, so the item renders something readable immediately.
fn title_from_file_name(name: &str) -> String {
    let stem = name.rsplit_once('.').map(|(s, _)| s).unwrap_or(name);
    let cleaned = stem.replace(['_', '-'], " ").trim().to_string();
    if cleaned.is_empty() {
        "Untitled recipe".to_string()
    } else {
        cleaned
    }
}

/// Provisional display title from a URL: scheme stripped, trailing
/// slashes trimmed.
fn title_from_url(url: &str) -> String {
    let stripped = url.split("://").last().unwrap_or(url);
    let stripped = stripped.trim_end_matches('/');
    if stripped.is_empty() {
        url.to_string()
    } else {
        stripped.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ItemStatus;

    #[test]
    fn registers_one_item_per_image_in_order() {
        let queue = IngestQueue::new();
        let images = vec![
            ImageSource::new("tomato_soup.jpg", vec![1]),
            ImageSource::new("beef-stew.png", vec![2]),
            ImageSource::new("pie.webp", vec![3]),
        ];

        let ids = register_images(&queue, &images, &SubmitContext::default()).unwrap();
        assert_eq!(ids.len(), 3);

        let items = queue.list();
        assert_eq!(items.len(), 3);
        assert!(items.iter().all(|i| i.status == ItemStatus::Processing));
        assert_eq!(items[0].title, "tomato soup");
        assert_eq!(items[1].title, "beef stew");
        assert_eq!(items[2].title, "pie");
        let listed: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(listed, ids.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn empty_file_rejects_batch_before_registration() {
        let queue = IngestQueue::new();
        let images = vec![
            ImageSource::new("good.jpg", vec![1]),
            ImageSource::new("bad.jpg", vec![]),
        ];

        assert!(register_images(&queue, &images, &SubmitContext::default()).is_err());
        assert!(queue.list().is_empty());
    }

    #[test]
    fn empty_url_is_rejected() {
        let queue = IngestQueue::new();
        assert!(register_url(&queue, "   ", &SubmitContext::default()).is_err());
        assert!(queue.list().is_empty());
    }

    #[test]
    fn url_item_gets_readable_title_without_validation() {
        let queue = IngestQueue::new();
        let id = register_url(
            &queue,
            "https://example.com/recipes/pasta-bake/",
            &SubmitContext::default(),
        )
        .unwrap();
        let item = queue.get(&id).unwrap();
        assert_eq!(item.title, "example.com/recipes/pasta-bake");

        // Not a URL at all: still registered, fails downstream instead.
        let id = register_url(&queue, "not a url", &SubmitContext::default()).unwrap();
        assert!(queue.get(&id).is_some());
    }

    #[test]
    fn context_is_captured_at_submission() {
        let queue = IngestQueue::new();
        let context = SubmitContext {
            collection_id: Some("weeknight".to_string()),
        };
        let ids =
            register_images(&queue, &[ImageSource::new("a.jpg", vec![1])], &context).unwrap();
        let item = queue.get(&ids[0]).unwrap();
        assert_eq!(item.context.collection_id.as_deref(), Some("weeknight"));
    }
}
