//! Per-run settings injected by the caller

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

/// Login values used by `login`, `enter phone` and `enter otp` when the step line
/// does not carry them. Nothing is defaulted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub country_code: Option<String>,
    pub phone: Option<String>,
    pub otp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Upper bound for `wait for "<text>"`.
    pub wait_for_ms: u64,
    /// Upper bound for the whole run.
    pub run_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            wait_for_ms: 30_000,
            run_ms: 600_000,
        }
    }
}

/// Site pages the workflow handlers navigate to, relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SitePaths {
    pub cart: String,
    pub create_listing: String,
    pub vendors: String,
    pub groups: String,
    pub missing_product: String,
}

impl Default for SitePaths {
    fn default() -> Self {
        Self {
            cart: "/cart".into(),
            create_listing: "/create-listing".into(),
            vendors: "/garage-sale/vendor".into(),
            groups: "/garage-sale/groups".into(),
            missing_product: "/garage-sale/marketplace/product/invalid-999999".into(),
        }
    }
}

/// Endpoints the API probe steps request, relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiEndpoints {
    pub listings: String,
    pub marketplace_search: String,
    pub vendor_comments: String,
    pub groups: String,
    pub user_profile: String,
    pub latency: String,
    pub invalid: String,
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self {
            listings: "/api/listings".into(),
            marketplace_search: "/api/marketplace?query=test".into(),
            vendor_comments: "/api/vendors/1/comments".into(),
            groups: "/api/groups".into(),
            user_profile: "/api/user/profile".into(),
            latency: "/api/marketplace".into(),
            invalid: "/api/invalid-endpoint".into(),
        }
    }
}

/// Values typed into forms by the workflow handlers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestData {
    pub listing_details: String,
    pub comment: String,
    pub invalid_email: String,
    pub price_filter: String,
    pub negative_price: String,
    /// JSON body posted by `listing creation`.
    pub listing_payload: serde_json::Value,
    pub paths: SitePaths,
    pub endpoints: ApiEndpoints,
}

impl Default for TestData {
    fn default() -> Self {
        Self {
            listing_details: "Test listing item for automated testing".into(),
            comment: "Test comment from automated testing".into(),
            invalid_email: "invalid-email-format".into(),
            price_filter: "100".into(),
            negative_price: "-100".into(),
            listing_payload: serde_json::json!({
                "title": "Test Item",
                "description": "Test Description",
                "price": 99.99
            }),
            paths: SitePaths::default(),
            endpoints: ApiEndpoints::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// Target for `open homepage` and the base of every relative path.
    pub base_url: Option<Url>,
    pub credentials: Credentials,
    pub timeouts: Timeouts,
    pub screenshots_dir: PathBuf,
    /// Multiplier for the settle pauses between UI actions; 0 disables them.
    pub pacing_scale: f64,
    pub test_data: TestData,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            credentials: Credentials::default(),
            timeouts: Timeouts::default(),
            screenshots_dir: PathBuf::from("screenshots"),
            pacing_scale: 1.0,
            test_data: TestData::default(),
        }
    }
}

impl RunSettings {
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    pub fn with_pacing_scale(mut self, scale: f64) -> Self {
        self.pacing_scale = scale.max(0.0);
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let settings: RunSettings = serde_json::from_value(serde_json::json!({
            "base_url": "https://shop.test/",
            "timeouts": { "wait_for_ms": 500 },
            "test_data": { "paths": { "cart": "/basket" } }
        }))
        .unwrap();
        assert_eq!(settings.timeouts.wait_for_ms, 500);
        assert_eq!(settings.timeouts.run_ms, 600_000);
        assert_eq!(settings.test_data.paths.cart, "/basket");
        assert_eq!(settings.test_data.paths.vendors, "/garage-sale/vendor");
        assert!(settings.credentials.otp.is_none());
    }

    #[test]
    fn negative_pacing_clamps_to_zero() {
        assert_eq!(RunSettings::default().with_pacing_scale(-2.0).pacing_scale, 0.0);
    }
}
