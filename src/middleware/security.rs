//! Security headers added to every response.

use axum::http::{HeaderName, HeaderValue, header};
use tower_http::set_header::SetResponseHeaderLayer;

pub const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; script-src 'self' 'unsafe-inline'; style-src 'self' 'unsafe-inline'; img-src 'self' data:";
pub const STRICT_TRANSPORT_SECURITY: &str = "max-age=31536000; includeSubDomains";

fn header_layer(name: HeaderName, value: &'static str) -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(name, HeaderValue::from_static(value))
}

/// Layers in the order they should be applied.
pub fn security_header_layers() -> [SetResponseHeaderLayer<HeaderValue>; 4] {
    [
        header_layer(header::CONTENT_SECURITY_POLICY, CONTENT_SECURITY_POLICY),
        header_layer(header::X_FRAME_OPTIONS, "DENY"),
        header_layer(header::X_XSS_PROTECTION, "1; mode=block"),
        header_layer(header::STRICT_TRANSPORT_SECURITY, STRICT_TRANSPORT_SECURITY),
    ]
}
