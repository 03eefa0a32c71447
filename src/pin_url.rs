//! Pinterest "create pin" link generation.
//!
//! Builds the destination URL for a product (custom domain or store URL
//! with fallbacks), derives a plain-text description from the product
//! copy, and assembles the pre-filled pin-create link the operator opens
//! in Pinterest.

use crate::shopify::types::AdminProduct;

/// Pinterest pin-create endpoint.
const PIN_CREATE_BASE: &str = "https://www.pinterest.com/pin/create/button/";

/// Descriptions are capped below Pinterest's 500-char limit.
const DESCRIPTION_MAX_CHARS: usize = 490;

const DEFAULT_DESCRIPTION: &str = "Check out this product!";

/// How the destination URL is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlMode {
    /// Use the product's online-store URL (with fallbacks onto the shop
    /// domain).
    StoreUrl,
    /// Use an operator-supplied base domain.
    Custom,
}

/// Resolve the URL a pin should link back to.
///
/// Custom mode trims a trailing slash from the domain and appends
/// `/products/{handle}` when the product has a handle. Store mode prefers
/// `onlineStoreUrl`, then `https://{shop}/products/{handle}`, then the
/// bare shop domain.
#[must_use]
pub fn destination_url(
    product: &AdminProduct,
    shop: &str,
    mode: UrlMode,
    custom_domain: Option<&str>,
) -> String {
    if mode == UrlMode::Custom
        && let Some(domain) = custom_domain.filter(|d| !d.is_empty())
    {
        let domain = domain.trim_end_matches('/');
        if product.handle.is_empty() {
            return domain.to_string();
        }
        return format!("{domain}/products/{}", product.handle);
    }

    if let Some(url) = product
        .online_store_url
        .as_ref()
        .filter(|u| !u.is_empty())
    {
        return url.clone();
    }
    if !product.handle.is_empty() {
        return format!("https://{shop}/products/{}", product.handle);
    }
    format!("https://{shop}")
}

/// Derive the pin description: HTML-stripped product description, falling
/// back to the title, then a fixed default; truncated to 490 characters.
#[must_use]
pub fn pin_description(product: &AdminProduct) -> String {
    let stripped = product
        .description_html
        .as_deref()
        .map(strip_html)
        .unwrap_or_default();

    let text = if stripped.is_empty() {
        if product.title.is_empty() {
            DEFAULT_DESCRIPTION.to_string()
        } else {
            product.title.clone()
        }
    } else {
        stripped
    };

    text.chars().take(DESCRIPTION_MAX_CHARS).collect()
}

/// Assemble the pre-filled pin-create link.
#[must_use]
pub fn pin_create_url(destination: &str, media_url: &str, description: &str) -> String {
    format!(
        "{PIN_CREATE_BASE}?url={}&media={}&description={}",
        urlencoding::encode(destination),
        urlencoding::encode(media_url),
        urlencoding::encode(description)
    )
}

/// Remove HTML tags and collapse the remainder.
fn strip_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product() -> AdminProduct {
        AdminProduct {
            id: "gid://shopify/Product/1".to_string(),
            title: "Sandalwood Mala".to_string(),
            handle: "sandalwood-mala".to_string(),
            description_html: Some("<p>Hand-carved <b>sandalwood</b> beads.</p>".to_string()),
            online_store_url: Some("https://shop.example/products/sandalwood-mala".to_string()),
            tags: vec![],
            images: vec![],
        }
    }

    #[test]
    fn custom_domain_trims_trailing_slash_and_appends_handle() {
        let url = destination_url(
            &product(),
            "test.myshopify.com",
            UrlMode::Custom,
            Some("https://www.gifts.example/"),
        );
        assert_eq!(url, "https://www.gifts.example/products/sandalwood-mala");
    }

    #[test]
    fn custom_mode_without_domain_falls_back_to_store_url() {
        let url = destination_url(&product(), "test.myshopify.com", UrlMode::Custom, None);
        assert_eq!(url, "https://shop.example/products/sandalwood-mala");
    }

    #[test]
    fn store_mode_falls_back_to_shop_domain_and_handle() {
        let mut p = product();
        p.online_store_url = None;
        let url = destination_url(&p, "test.myshopify.com", UrlMode::StoreUrl, None);
        assert_eq!(url, "https://test.myshopify.com/products/sandalwood-mala");

        p.handle = String::new();
        let url = destination_url(&p, "test.myshopify.com", UrlMode::StoreUrl, None);
        assert_eq!(url, "https://test.myshopify.com");
    }

    #[test]
    fn description_strips_html_and_falls_back_to_title() {
        assert_eq!(pin_description(&product()), "Hand-carved sandalwood beads.");

        let mut p = product();
        p.description_html = None;
        assert_eq!(pin_description(&p), "Sandalwood Mala");

        p.title = String::new();
        assert_eq!(pin_description(&p), DEFAULT_DESCRIPTION);
    }

    #[test]
    fn description_is_truncated_to_the_cap() {
        let mut p = product();
        p.description_html = Some("x".repeat(2000));
        assert_eq!(pin_description(&p).chars().count(), DESCRIPTION_MAX_CHARS);
    }

    #[test]
    fn pin_create_url_percent_encodes_components() {
        let url = pin_create_url(
            "https://shop.example/products/mala",
            "https://cdn.example/a b.jpg",
            "100% natural",
        );
        assert!(url.starts_with(PIN_CREATE_BASE));
        assert!(url.contains("media=https%3A%2F%2Fcdn.example%2Fa%20b.jpg"));
        assert!(url.contains("description=100%25%20natural"));
        assert!(!url.contains(' '));
    }
}
