/*!
 * # Report PDF rendering
 *
 * A report becomes an A4 document in three steps: photos are fetched and
 * decoded, [`layout::ReportLayout`] places every block, and [`render`] draws
 * the result with printpdf. Photos that cannot be fetched or decoded are
 * logged and left out; they never fail the document.
 */

pub mod layout;
pub mod render;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use image::{imageops::FilterType, DynamicImage};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::errors::ServiceError;
use layout::{ReportLayout, SectionInput};

const MAX_CONCURRENT_FETCHES: usize = 4;
/// Longest edge kept after decoding; larger photos are downscaled.
const MAX_PHOTO_EDGE_PX: u32 = 1600;

#[derive(Debug, Clone, PartialEq)]
pub struct ReportSection {
    pub title: String,
    pub description: Option<String>,
    pub photo_urls: Vec<String>,
}

/// Everything the renderer needs, detached from the database rows.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportDocument {
    pub title: String,
    pub type_label: String,
    pub project_code: String,
    pub project_name: String,
    pub published_on: Option<String>,
    /// In display order.
    pub sections: Vec<ReportSection>,
}

#[async_trait]
pub trait PhotoFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ServiceError>;
}

pub struct HttpPhotoFetcher {
    client: reqwest::Client,
}

impl HttpPhotoFetcher {
    pub fn new(timeout: Duration) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::InternalError(format!("http client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PhotoFetcher for HttpPhotoFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ServiceError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(e.to_string()))?;
        if !response.status().is_success() {
            return Err(ServiceError::ExternalServiceError(format!(
                "photo fetch returned {}",
                response.status()
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Decodes and normalises a photo to RGB8, shrinking oversized images.
pub fn decode_photo(bytes: &[u8]) -> Result<DynamicImage, image::ImageError> {
    let img = image::load_from_memory(bytes)?;
    let img = if img.width().max(img.height()) > MAX_PHOTO_EDGE_PX {
        img.resize(MAX_PHOTO_EDGE_PX, MAX_PHOTO_EDGE_PX, FilterType::Triangle)
    } else {
        img
    };
    Ok(DynamicImage::ImageRgb8(img.to_rgb8()))
}

#[derive(Clone)]
pub struct ReportRenderer {
    fetcher: Arc<dyn PhotoFetcher>,
}

impl ReportRenderer {
    pub fn new(fetcher: Arc<dyn PhotoFetcher>) -> Self {
        Self { fetcher }
    }

    async fn load_photo(&self, url: &str) -> Option<DynamicImage> {
        let bytes = match self.fetcher.fetch(url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(url, error = %e, "skipping photo that could not be fetched");
                return None;
            }
        };
        match decode_photo(&bytes) {
            Ok(img) => Some(img),
            Err(e) => {
                warn!(url, error = %e, "skipping photo that could not be decoded");
                None
            }
        }
    }

    #[instrument(skip(self, doc), fields(title = %doc.title, sections = doc.sections.len()))]
    pub async fn render(&self, doc: ReportDocument) -> Result<Vec<u8>, ServiceError> {
        let mut photos: Vec<Vec<DynamicImage>> = Vec::with_capacity(doc.sections.len());
        for section in &doc.sections {
            let loaded: Vec<Option<DynamicImage>> = stream::iter(section.photo_urls.clone())
                .map(|url| async move { self.load_photo(&url).await })
                .buffered(MAX_CONCURRENT_FETCHES)
                .collect()
                .await;
            photos.push(loaded.into_iter().flatten().collect());
        }

        let inputs: Vec<SectionInput> = doc
            .sections
            .iter()
            .zip(&photos)
            .map(|(section, imgs)| SectionInput {
                title: section.title.clone(),
                description: section.description.clone(),
                photos: imgs.iter().map(|i| (i.width(), i.height())).collect(),
            })
            .collect();

        tokio::task::spawn_blocking(move || {
            let layout = ReportLayout::compute(&inputs);
            debug!(pages = layout.page_count(), "report laid out");
            render::draw(&doc, &layout, &photos)
        })
        .await
        .map_err(|e| ServiceError::InternalError(format!("render task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageOutputFormat, Rgb, RgbImage};
    use std::collections::HashMap;
    use std::io::Cursor;

    struct StaticFetcher {
        files: HashMap<String, Vec<u8>>,
    }

    #[async_trait]
    impl PhotoFetcher for StaticFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>, ServiceError> {
            self.files
                .get(url)
                .cloned()
                .ok_or_else(|| ServiceError::ExternalServiceError(format!("404 {}", url)))
        }
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([180, 120, 60])));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageOutputFormat::Png).unwrap();
        out.into_inner()
    }

    fn document(urls: Vec<&str>) -> ReportDocument {
        ReportDocument {
            title: "Week 12 progress".into(),
            type_label: "Weekly Report".into(),
            project_code: "HTL-204".into(),
            project_name: "Harbour Hotel fit-out".into(),
            published_on: Some("2024-03-22".into()),
            sections: vec![ReportSection {
                title: "Guest room wardrobes".into(),
                description: Some("Carcasses assembled, doors awaiting lacquer.".into()),
                photo_urls: urls.into_iter().map(String::from).collect(),
            }],
        }
    }

    #[test]
    fn oversized_photos_are_downscaled() {
        let img = decode_photo(&png(3200, 800)).unwrap();
        assert_eq!(img.width(), MAX_PHOTO_EDGE_PX);
        assert!(matches!(img, DynamicImage::ImageRgb8(_)));
    }

    #[tokio::test]
    async fn renders_pdf_and_skips_broken_photos() {
        let mut files = HashMap::new();
        files.insert("https://cdn/ok.png".to_string(), png(64, 48));
        files.insert("https://cdn/garbage.png".to_string(), b"not an image".to_vec());
        let renderer = ReportRenderer::new(Arc::new(StaticFetcher { files }));

        let bytes = renderer
            .render(document(vec![
                "https://cdn/ok.png",
                "https://cdn/garbage.png",
                "https://cdn/missing.png",
            ]))
            .await
            .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn render_future_can_be_spawned() {
        fn assert_send<T: Send>(t: T) -> T {
            t
        }
        let mut files = HashMap::new();
        files.insert("https://cdn/a.png".to_string(), png(32, 32));
        files.insert("https://cdn/b.png".to_string(), png(16, 24));
        let renderer = ReportRenderer::new(Arc::new(StaticFetcher { files }));

        let doc = document(vec!["https://cdn/a.png", "https://cdn/b.png"]);
        let handle = tokio::spawn(async move { assert_send(renderer.render(doc)).await });
        let bytes = handle.await.unwrap().unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
