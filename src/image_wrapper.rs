use markup5ever_rcdom::{Handle, RcDom};
use url::Url;

use crate::dom;
use crate::error::ScriptError;
use crate::page::{Behavior, Page};

/// Positional tag of each anchor, kept apart from styling classes.
pub const POSITION_ATTR: &str = "data-index";

/// Wraps every image below `container` in a link to its own source, tagging
/// the link with the image's zero-based position. Images are snapshotted
/// before any mutation. Returns the number of wrapped images.
pub fn wrap_images(dom: &RcDom, container: &Handle, base_url: Option<&Url>) -> usize {
    let images = dom::elements_by_tag(container, "img");
    let mut wrapped = 0;

    for (position, image) in images.iter().enumerate() {
        let src = dom::attr(image, "src").unwrap_or_default();
        let href = resolve_source(&src, base_url);
        let position = position.to_string();
        let anchor = dom::create_element(
            dom,
            "a",
            &[("href", href.as_str()), (POSITION_ATTR, position.as_str())],
        );

        if !dom::replace_with(dom, image, anchor.clone()) {
            log::warn!("image {} has no parent, leaving it unwrapped", src);
            continue;
        }
        dom::append_child(dom, &anchor, image.clone());
        wrapped += 1;
    }

    log::debug!("wrapped {} of {} images", wrapped, images.len());
    wrapped
}

/// Full url of an image source. Relative sources stay as written when no
/// base is known or they cannot be joined.
pub fn resolve_source(src: &str, base_url: Option<&Url>) -> String {
    match base_url {
        Some(base) => match base.join(src) {
            Ok(url) => url.to_string(),
            Err(e) => {
                log::warn!("cannot resolve image source {:?} against {}: {}", src, base, e);
                src.to_string()
            }
        },
        None => src.to_string(),
    }
}

/// Click-to-enlarge support for article images.
pub struct ImageWrapper {
    container_id: String,
    base_url: Option<Url>,
}

impl ImageWrapper {
    pub fn new(container_id: impl Into<String>) -> Self {
        Self {
            container_id: container_id.into(),
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }
}

impl Behavior for ImageWrapper {
    fn name(&self) -> &'static str {
        "image-wrapper"
    }

    fn on_load(&self, page: &Page) -> Result<(), ScriptError> {
        let container = page
            .element_by_id(&self.container_id)
            .ok_or_else(|| ScriptError::MissingElement(format!("#{}", self.container_id)))?;
        wrap_images(page.dom(), &container, self.base_url.as_ref());
        Ok(())
    }
}
