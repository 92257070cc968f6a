// # Cloudflare Zone Provider
//
// ZoneProvider implementation backed by the Cloudflare API v4.
//
// ## Behaviour
//
// - ✅ Paginated zone and record listing
// - ✅ Record sets grouped by (name, type), TXT values returned verbatim
// - ✅ Alias A records written as CNAME records pointing at the alias target
// - ✅ One atomic `dns_records/batch` request per zone change set
// - ✅ HTTP timeout configured (30 seconds)
// - ✅ Specific error handling for HTTP status codes (401/403, 404, 429, 5xx)
// - ✅ Dry-run mode for safe testing
// - ❌ NO retry logic (the next reconciliation pass retries)
// - ❌ NO caching between calls
//
// ## Security Requirements
//
// - API token NEVER appears in logs or Debug output
// - Provider MUST fail fast if token is empty
//
// ## API Reference
//
// - List Zones: GET `/zones?page=..&per_page=..`
// - List DNS Records: GET `/zones/:zone_id/dns_records?page=..&per_page=..`
// - Batch DNS Records: POST `/zones/:zone_id/dns_records/batch`

use async_trait::async_trait;
use mate_core::config::ProviderConfig;
use mate_core::traits::{ZoneProvider, ZoneProviderFactory};
use mate_core::types::{ChangeBatch, HostedZone, Record, RecordType, sanitize_dns_name};
use mate_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// Cloudflare API base URL
const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const ZONES_PER_PAGE: u32 = 50;
const RECORDS_PER_PAGE: u32 = 100;

/// Cloudflare's "automatic" TTL
const AUTO_TTL: u32 = 1;

const PROVIDER_NAME: &str = "cloudflare";

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
    result_info: Option<ResultInfo>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResultInfo {
    #[serde(default)]
    total_pages: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct CfZone {
    id: String,
    name: String,
}

/// A single DNS record as Cloudflare lists it
#[derive(Debug, Clone, Deserialize)]
struct CfRecord {
    id: String,
    #[serde(rename = "type")]
    record_type: String,
    name: String,
    content: String,
    #[serde(default)]
    ttl: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct RecordRef {
    id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct RecordBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(rename = "type")]
    record_type: String,
    name: String,
    content: String,
    ttl: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    proxied: Option<bool>,
}

/// Body of `POST /zones/:zone_id/dns_records/batch`
///
/// Cloudflare applies deletes, then puts, then posts, all or nothing.
#[derive(Debug, Default, PartialEq, Eq, Serialize)]
struct BatchRequest {
    deletes: Vec<RecordRef>,
    puts: Vec<RecordBody>,
    posts: Vec<RecordBody>,
}

impl BatchRequest {
    fn is_empty(&self) -> bool {
        self.deletes.is_empty() && self.puts.is_empty() && self.posts.is_empty()
    }
}

/// Cloudflare zone provider
///
/// # Trust Level: Untrusted
///
/// Stateless and single-shot: every call re-reads what it needs from the
/// API. Retries belong to the next reconciliation pass.
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform all GET requests (zone and record listing)
/// - Log the batch payload it would submit
/// - **NOT** actually modify DNS records
pub struct CloudflareProvider {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// Account ID (optional, narrows zone listing)
    account_id: Option<String>,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, list but never submit batches
    dry_run: bool,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_token", &"<REDACTED>")
            .field("account_id", &self.account_id)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `api_token`: Cloudflare API token with Zone:Read and DNS:Edit permissions
    /// - `account_id`: Optional account ID to restrict zone listing
    /// - `dry_run`: If true, perform GET requests but skip batch submission
    ///
    /// # Returns
    ///
    /// - `Err(Error::Config)`: the token is empty
    /// - `Err(Error::Http)`: the HTTP client could not be built
    pub fn new(
        api_token: impl Into<String>,
        account_id: Option<String>,
        dry_run: bool,
    ) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_token,
            account_id,
            client,
            dry_run,
        })
    }

    /// Create a new Cloudflare provider (production/live mode)
    pub fn new_live(api_token: impl Into<String>, account_id: Option<String>) -> Result<Self> {
        Self::new(api_token, account_id, false)
    }

    /// Create a new Cloudflare provider (dry-run mode)
    pub fn new_dry_run(api_token: impl Into<String>, account_id: Option<String>) -> Result<Self> {
        Self::new(api_token, account_id, true)
    }

    /// GET every page of a list endpoint
    async fn get_all<T: DeserializeOwned>(
        &self,
        path: &str,
        per_page: u32,
        filters: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let url = format!("{}{}", CLOUDFLARE_API_BASE, path);
        let mut items = Vec::new();
        let mut page = 1;

        loop {
            let mut query: Vec<(&str, String)> = vec![
                ("page", page.to_string()),
                ("per_page", per_page.to_string()),
            ];
            query.extend(filters.iter().cloned());

            let response = self
                .client
                .get(&url)
                .bearer_auth(&self.api_token)
                .header("Content-Type", "application/json")
                .query(&query)
                .send()
                .await
                .map_err(|e| Error::provider(PROVIDER_NAME, format!("HTTP request failed: {}", e)))?;

            let body: ApiResponse<Vec<T>> = parse_response(response, path).await?;
            let total_pages = body.result_info.map(|info| info.total_pages).unwrap_or(1);
            items.extend(body.result.unwrap_or_default());

            if page >= total_pages {
                break;
            }
            page += 1;
        }

        Ok(items)
    }

    async fn list_cf_records(&self, zone_id: &str) -> Result<Vec<CfRecord>> {
        self.get_all(&format!("/zones/{}/dns_records", zone_id), RECORDS_PER_PAGE, &[])
            .await
    }
}

/// Check the HTTP status and the `success` flag of an API response
async fn parse_response<T: DeserializeOwned>(
    response: reqwest::Response,
    context: &str,
) -> Result<ApiResponse<T>> {
    let status = response.status();
    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());
        return Err(status_error(status.as_u16(), &error_text, context));
    }

    let body: ApiResponse<T> = response
        .json()
        .await
        .map_err(|e| Error::provider(PROVIDER_NAME, format!("Failed to parse response: {}", e)))?;

    if !body.success {
        return Err(Error::provider(
            PROVIDER_NAME,
            format!("{} failed: {}", context, describe_errors(&body.errors)),
        ));
    }

    Ok(body)
}

/// Map an HTTP status code to a specific error
fn status_error(status: u16, error_text: &str, context: &str) -> Error {
    match status {
        401 | 403 => Error::auth(format!(
            "Invalid API token or insufficient permissions. Status: {}",
            status
        )),
        404 => Error::not_found(format!("{} ({})", context, error_text)),
        429 => Error::rate_limited(format!(
            "Cloudflare rate limit exceeded. Status: {}",
            status
        )),
        500..=599 => Error::provider(
            PROVIDER_NAME,
            format!("Cloudflare server error (transient): {} - {}", status, error_text),
        ),
        _ => Error::provider(
            PROVIDER_NAME,
            format!("{} failed: {} - {}", context, status, error_text),
        ),
    }
}

fn describe_errors(errors: &[ApiMessage]) -> String {
    if errors.is_empty() {
        return "unknown error".to_string();
    }
    errors
        .iter()
        .map(|e| format!("{} ({})", e.message, e.code))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Cloudflare record type a record is written as
fn cf_type(record: &Record) -> String {
    if record.alias_target.is_some() {
        "CNAME".to_string()
    } else {
        record.record_type.to_string()
    }
}

/// API bodies for a record, one per value
fn record_bodies(record: &Record) -> Vec<RecordBody> {
    let record_type = cf_type(record);
    let name = record.name.trim_end_matches('.').to_string();
    let ttl = record.ttl.unwrap_or(AUTO_TTL);
    let proxied = match record.record_type {
        RecordType::Txt => None,
        _ => Some(false),
    };

    let contents: Vec<String> = match &record.alias_target {
        Some(alias) => vec![alias.dns_name.trim_end_matches('.').to_string()],
        None => record.values.clone(),
    };

    contents
        .into_iter()
        .map(|content| RecordBody {
            id: None,
            record_type: record_type.clone(),
            name: name.clone(),
            content,
            ttl,
            proxied,
        })
        .collect()
}

/// Group Cloudflare's per-value records into record sets
fn to_record_sets(cf_records: &[CfRecord]) -> Vec<Record> {
    let mut sets: Vec<Record> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for cf in cf_records {
        let name = sanitize_dns_name(&cf.name);
        let key = (name.clone(), cf.record_type.clone());

        match index.get(&key) {
            Some(&position) => sets[position].values.push(cf.content.clone()),
            None => {
                index.insert(key, sets.len());
                let mut record = Record::new(
                    RecordType::parse(&cf.record_type),
                    name,
                    vec![cf.content.clone()],
                );
                record.ttl = cf.ttl;
                sets.push(record);
            }
        }
    }

    sets
}

fn key_of(name: &str, record_type: &str) -> (String, String) {
    (sanitize_dns_name(name), record_type.to_string())
}

/// Queue deletes for records not already claimed by another change
fn delete_all<'a>(
    request: &mut BatchRequest,
    claimed: &mut HashSet<&'a str>,
    records: &[&'a CfRecord],
) {
    for cf in records {
        if claimed.insert(cf.id.as_str()) {
            request.deletes.push(RecordRef { id: cf.id.clone() });
        }
    }
}

/// Translate a change batch into one Cloudflare batch request against the
/// zone's current records
fn build_batch(batch: &ChangeBatch, existing: &[CfRecord]) -> BatchRequest {
    let mut index: HashMap<(String, String), Vec<&CfRecord>> = HashMap::new();
    for cf in existing {
        index
            .entry(key_of(&cf.name, &cf.record_type))
            .or_default()
            .push(cf);
    }

    let mut request = BatchRequest::default();
    let mut claimed: HashSet<&str> = HashSet::new();

    for record in &batch.deletes {
        match index.get(&key_of(&record.name, &cf_type(record))) {
            Some(current) => delete_all(&mut request, &mut claimed, current),
            None => tracing::debug!("{} is already gone", record.name),
        }
    }

    for record in &batch.creates {
        request.posts.extend(record_bodies(record));
    }

    for record in &batch.upserts {
        let record_type = cf_type(record);

        // A data record switching between A and CNAME replaces the old one
        if !record.is_txt() {
            let other = if record_type == "CNAME" { "A" } else { "CNAME" };
            if let Some(stale) = index.get(&key_of(&record.name, other)) {
                delete_all(&mut request, &mut claimed, stale);
            }
        }

        let current: Vec<&CfRecord> = index
            .get(&key_of(&record.name, &record_type))
            .map(|records| {
                records
                    .iter()
                    .copied()
                    .filter(|cf| !claimed.contains(cf.id.as_str()))
                    .collect()
            })
            .unwrap_or_default();

        let bodies = record_bodies(record);
        let used = bodies.len().min(current.len());
        for (position, mut body) in bodies.into_iter().enumerate() {
            match current.get(position) {
                Some(cf) => {
                    claimed.insert(cf.id.as_str());
                    body.id = Some(cf.id.clone());
                    request.puts.push(body);
                }
                None => request.posts.push(body),
            }
        }
        delete_all(&mut request, &mut claimed, &current[used..]);
    }

    request
}

#[async_trait]
impl ZoneProvider for CloudflareProvider {
    async fn list_hosted_zones(&self) -> Result<Vec<HostedZone>> {
        let filters: Vec<(&str, String)> = self
            .account_id
            .iter()
            .map(|account| ("account.id", account.clone()))
            .collect();

        let zones: Vec<CfZone> = self.get_all("/zones", ZONES_PER_PAGE, &filters).await?;
        tracing::debug!("Listed {} Cloudflare zones", zones.len());

        Ok(zones
            .into_iter()
            .map(|zone| HostedZone::new(zone.id, zone.name))
            .collect())
    }

    async fn list_record_sets(&self, zone_id: &str) -> Result<Vec<Record>> {
        let cf_records = self.list_cf_records(zone_id).await?;
        Ok(to_record_sets(&cf_records))
    }

    /// Submit a zone's changes as one batch request
    ///
    /// Record IDs are resolved from a fresh listing, so deletes of records
    /// that are already gone are dropped rather than failing the batch.
    async fn change_record_sets(&self, zone_id: &str, batch: &ChangeBatch) -> Result<()> {
        let existing = self.list_cf_records(zone_id).await?;
        let request = build_batch(batch, &existing);

        if request.is_empty() {
            tracing::debug!("Nothing to submit for zone {}", zone_id);
            return Ok(());
        }

        let path = format!("/zones/{}/dns_records/batch", zone_id);
        let url = format!("{}{}", CLOUDFLARE_API_BASE, path);

        tracing::info!(
            "{} zone {}: {} deletes, {} puts, {} posts",
            if self.dry_run { "[DRY-RUN] Would submit to" } else { "Submitting to" },
            zone_id,
            request.deletes.len(),
            request.puts.len(),
            request.posts.len()
        );

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send POST request to {} with payload: {}",
                url,
                serde_json::to_string(&request)?
            );
            return Ok(());
        }

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_token)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::provider(PROVIDER_NAME, format!("HTTP request failed: {}", e)))?;

        parse_response::<serde_json::Value>(response, &path).await?;
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}

/// Factory for creating Cloudflare providers
///
/// `MATE_MODE=dry-run` in the environment turns on dry-run mode.
pub struct CloudflareFactory;

impl ZoneProviderFactory for CloudflareFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn ZoneProvider>> {
        match config {
            ProviderConfig::Cloudflare {
                api_token,
                account_id,
            } => {
                if api_token.is_empty() {
                    return Err(Error::config("Cloudflare API token is required"));
                }

                let dry_run = std::env::var("MATE_MODE")
                    .unwrap_or_default()
                    .eq_ignore_ascii_case("dry-run");

                if dry_run {
                    tracing::warn!("Cloudflare provider running in DRY-RUN mode - no changes will be made");
                }

                Ok(Box::new(CloudflareProvider::new(
                    api_token.clone(),
                    account_id.clone(),
                    dry_run,
                )?))
            }
            _ => Err(Error::config("Invalid config for Cloudflare provider")),
        }
    }
}

/// Register the Cloudflare provider with a registry
///
/// # Example
///
/// ```rust
/// use mate_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::new();
/// mate_provider_cloudflare::register(&registry);
/// assert!(registry.has_provider("cloudflare"));
/// ```
pub fn register(registry: &mate_core::ProviderRegistry) {
    registry.register_provider(PROVIDER_NAME, Box::new(CloudflareFactory));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cf(id: &str, record_type: &str, name: &str, content: &str) -> CfRecord {
        CfRecord {
            id: id.to_string(),
            record_type: record_type.to_string(),
            name: name.to_string(),
            content: content.to_string(),
            ttl: Some(300),
        }
    }

    fn txt(name: &str, value: &str) -> Record {
        Record::new(RecordType::Txt, name, vec![value.to_string()]).with_ttl(300)
    }

    #[test]
    fn test_factory_creation() {
        let config = ProviderConfig::Cloudflare {
            api_token: "test_token".to_string(),
            account_id: None,
        };

        assert!(CloudflareFactory.create(&config).is_ok());
    }

    #[test]
    fn test_factory_missing_token() {
        let config = ProviderConfig::Cloudflare {
            api_token: "".to_string(),
            account_id: None,
        };

        assert!(CloudflareFactory.create(&config).is_err());
    }

    #[test]
    fn test_factory_rejects_other_config() {
        let config = ProviderConfig::Memory { zones: vec![] };
        assert!(CloudflareFactory.create(&config).is_err());
    }

    #[test]
    fn test_empty_token_is_error() {
        let err = CloudflareProvider::new("", None, false).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_dry_run_mode() {
        let provider_dry = CloudflareProvider::new_dry_run("token", None).unwrap();
        let provider_live = CloudflareProvider::new_live("token", None).unwrap();

        assert!(provider_dry.dry_run, "Dry-run provider should have dry_run=true");
        assert!(!provider_live.dry_run, "Live provider should have dry_run=false");
        assert_eq!(provider_live.provider_name(), "cloudflare");
    }

    #[test]
    fn test_api_token_not_exposed_in_debug() {
        let provider = CloudflareProvider::new("secret_token_12345", None, false).unwrap();

        let debug_str = format!("{:?}", provider);
        assert!(!debug_str.contains("secret_token"));
        assert!(debug_str.contains("CloudflareProvider"));
    }

    #[test]
    fn test_register() {
        let registry = mate_core::ProviderRegistry::new();
        register(&registry);
        assert!(registry.has_provider("cloudflare"));
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(status_error(401, "", "x"), Error::Authentication(_)));
        assert!(matches!(status_error(403, "", "x"), Error::Authentication(_)));
        assert!(matches!(status_error(404, "", "x"), Error::NotFound(_)));
        assert!(matches!(status_error(429, "", "x"), Error::RateLimited(_)));
        assert!(matches!(status_error(502, "", "x"), Error::Provider { .. }));
    }

    #[test]
    fn test_alias_written_as_cname() {
        let record = Record::alias("app.example.com.", "lb.elb.com.", "zone");
        let bodies = record_bodies(&record);

        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0].record_type, "CNAME");
        assert_eq!(bodies[0].name, "app.example.com");
        assert_eq!(bodies[0].content, "lb.elb.com");
        assert_eq!(bodies[0].ttl, AUTO_TTL);
        assert_eq!(bodies[0].proxied, Some(false));
    }

    #[test]
    fn test_txt_value_kept_verbatim() {
        let bodies = record_bodies(&txt("app.example.com.", "\"mate:g\""));
        assert_eq!(bodies[0].content, "\"mate:g\"");
        assert_eq!(bodies[0].ttl, 300);
        assert_eq!(bodies[0].proxied, None);
    }

    #[test]
    fn test_listing_groups_by_name_and_type() {
        let sets = to_record_sets(&[
            cf("1", "A", "multi.example.com", "10.0.0.1"),
            cf("2", "A", "multi.example.com", "10.0.0.2"),
            cf("3", "TXT", "multi.example.com", "\"mate:g\""),
            cf("4", "CNAME", "app.example.com", "lb.elb.com"),
        ]);

        assert_eq!(sets.len(), 3);
        assert_eq!(sets[0].name, "multi.example.com.");
        assert_eq!(sets[0].values, vec!["10.0.0.1".to_string(), "10.0.0.2".to_string()]);
        assert_eq!(sets[1], txt("multi.example.com.", "\"mate:g\""));
        assert_eq!(sets[2].record_type, RecordType::Cname);
    }

    #[test]
    fn test_batch_upsert_reuses_ids() {
        let existing = vec![
            cf("a1", "CNAME", "app.example.com", "old.elb.com"),
            cf("t1", "TXT", "app.example.com", "\"mate:g\""),
        ];
        let batch = ChangeBatch {
            upserts: vec![
                Record::alias("app.example.com.", "new.elb.com.", "zone"),
                txt("app.example.com.", "\"mate:g\""),
            ],
            ..ChangeBatch::default()
        };

        let request = build_batch(&batch, &existing);
        assert!(request.deletes.is_empty());
        assert!(request.posts.is_empty());
        assert_eq!(request.puts.len(), 2);
        assert_eq!(request.puts[0].id.as_deref(), Some("a1"));
        assert_eq!(request.puts[0].content, "new.elb.com");
        assert_eq!(request.puts[1].id.as_deref(), Some("t1"));
    }

    #[test]
    fn test_batch_upsert_switching_type_replaces_record() {
        let existing = vec![cf("a1", "A", "app.example.com", "10.0.0.1")];
        let batch = ChangeBatch {
            upserts: vec![
                Record::alias("app.example.com.", "lb.elb.com.", "zone"),
                txt("app.example.com.", "\"mate:g\""),
            ],
            ..ChangeBatch::default()
        };

        let request = build_batch(&batch, &existing);
        assert_eq!(request.deletes, vec![RecordRef { id: "a1".to_string() }]);
        assert!(request.puts.is_empty());
        assert_eq!(request.posts.len(), 2);
        assert_eq!(request.posts[0].record_type, "CNAME");
    }

    #[test]
    fn test_batch_deletes_and_creates() {
        let existing = vec![
            cf("a1", "A", "old.example.com", "10.0.0.1"),
            cf("t1", "TXT", "old.example.com", "\"mate:g\""),
        ];
        let batch = ChangeBatch {
            creates: vec![
                Record::new(RecordType::A, "new.example.com.", vec!["10.0.0.2".to_string()])
                    .with_ttl(300),
            ],
            deletes: vec![
                Record::new(RecordType::A, "old.example.com.", vec!["10.0.0.1".to_string()]),
                txt("old.example.com.", "\"mate:g\""),
                txt("gone.example.com.", "\"mate:g\""),
            ],
            ..ChangeBatch::default()
        };

        let request = build_batch(&batch, &existing);
        assert_eq!(
            request.deletes,
            vec![
                RecordRef { id: "a1".to_string() },
                RecordRef { id: "t1".to_string() },
            ]
        );
        assert_eq!(request.posts.len(), 1);
        assert_eq!(request.posts[0].name, "new.example.com");

        let payload = serde_json::to_value(&request).unwrap();
        assert_eq!(payload["deletes"][0]["id"], "a1");
        assert!(payload["posts"][0].get("id").is_none());
    }

    #[test]
    fn test_empty_batch_is_empty_request() {
        assert!(build_batch(&ChangeBatch::default(), &[]).is_empty());
    }
}
