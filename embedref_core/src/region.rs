//! S3 region to endpoint table.

/// Region used when none (or an unknown one) is given.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Known regions and their S3 endpoints.
pub const S3_ENDPOINTS: &[(&str, &str)] = &[
    ("us-east-1", "s3.amazonaws.com"),
    ("us-east-2", "s3-us-east-2.amazonaws.com"),
    ("us-west-1", "s3-us-west-1.amazonaws.com"),
    ("us-west-2", "s3-us-west-2.amazonaws.com"),
    ("ca-central-1", "s3.ca-central-1.amazonaws.com"),
    ("eu-west-1", "s3-eu-west-1.amazonaws.com"),
    ("eu-west-2", "s3-eu-west-2.amazonaws.com"),
    ("sa-east-1", "s3-sa-east-1.amazonaws.com"),
    ("eu-central-1", "s3-eu-central-1.amazonaws.com"),
    ("eu-central-2", "s3-eu-central-2.amazonaws.com"),
    ("ap-south-1", "s3-ap-south-1.amazonaws.com"),
    ("ap-southeast-1", "s3-ap-southeast-1.amazonaws.com"),
    ("ap-southeast-2", "s3-ap-southeast-2.amazonaws.com"),
    ("ap-northeast-1", "s3-ap-northeast-1.amazonaws.com"),
    ("cn-north-1", "s3.cn-north-1.amazonaws.com.cn"),
    ("af-south-1", "s3.af-south-1.amazonaws.com"),
    ("ap-east-1", "s3.ap-east-1.amazonaws.com"),
    ("ap-southeast-3", "s3.ap-southeast-3.amazonaws.com"),
    ("ap-northeast-3", "s3.ap-northeast-3.amazonaws.com"),
    ("ap-northeast-2", "s3.ap-northeast-2.amazonaws.com"),
    ("eu-south-1", "s3.eu-south-1.amazonaws.com"),
    ("eu-west-3", "s3.eu-west-3.amazonaws.com"),
    ("eu-north-1", "s3.eu-north-1.amazonaws.com"),
    ("me-south-1", "s3.me-south-1.amazonaws.com"),
    ("us-gov-east-1", "s3.us-gov-east-1.amazonaws.com"),
    ("us-gov-west-1", "s3.us-gov-west-1.amazonaws.com"),
];

/// Endpoint of the default region.
pub const DEFAULT_ENDPOINT: &str = "s3.amazonaws.com";

/// Look up the S3 endpoint for a region.
///
/// Unknown or absent regions map to the default region's endpoint.
pub fn s3_endpoint(region: Option<&str>) -> &'static str {
    region
        .and_then(|region| {
            S3_ENDPOINTS
                .iter()
                .find(|(name, _)| *name == region)
                .map(|(_, endpoint)| *endpoint)
        })
        .unwrap_or(DEFAULT_ENDPOINT)
}

/// Iterate over the known region identifiers.
pub fn known_regions() -> impl Iterator<Item = &'static str> {
    S3_ENDPOINTS.iter().map(|(name, _)| *name)
}
