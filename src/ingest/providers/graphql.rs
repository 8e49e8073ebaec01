use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::error::{HeraldError, Result};
use crate::ingest::types::{CampaignQuery, RawCampaign};

pub const CAMPAIGNS_QUERY: &str = r#"
query GetCampaigns($page: Int, $pageSize: Int) {
  campaigns(page: $page, pageSize: $pageSize) {
    identifier
    name
    description
    picture
    starting
    ending
    creator {
      address
    }
  }
}
"#;

#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    data: Option<CampaignsData>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
struct CampaignsData {
    campaigns: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

/// Campaign feed served over GraphQL-on-HTTP.
pub struct GraphqlCampaignQuery {
    endpoint: String,
    client: reqwest::Client,
}

impl GraphqlCampaignQuery {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }

    /// Decode a response body into raw campaigns. Records that do not decode
    /// (for instance without an identifier) are dropped one by one.
    pub fn parse_page(body: &str) -> Result<Vec<RawCampaign>> {
        let resp: GraphqlResponse = serde_json::from_str(body)?;

        let Some(data) = resp.data else {
            let msgs: Vec<_> = resp.errors.into_iter().map(|e| e.message).collect();
            return Err(HeraldError::Decode(if msgs.is_empty() {
                "graphql response has no data".to_string()
            } else {
                format!("graphql errors: {}", msgs.join("; "))
            }));
        };
        if !resp.errors.is_empty() {
            tracing::warn!(errors = resp.errors.len(), "graphql returned partial data");
        }

        let items = data.campaigns.unwrap_or_default();
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            match serde_json::from_value::<RawCampaign>(item) {
                Ok(c) => out.push(c),
                Err(e) => tracing::warn!(error = %e, "skipping undecodable campaign record"),
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl CampaignQuery for GraphqlCampaignQuery {
    async fn fetch_page(&self, page: u32, page_size: u32) -> Result<Vec<RawCampaign>> {
        let body = json!({
            "query": CAMPAIGNS_QUERY,
            "variables": { "page": page, "pageSize": page_size },
        });

        let resp = self.client.post(&self.endpoint).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(HeraldError::Transport(format!(
                "graphql endpoint returned HTTP {status}"
            )));
        }
        let text = resp.text().await?;
        Self::parse_page(&text)
    }

    fn name(&self) -> &'static str {
        "graphql"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_campaigns_and_skips_broken_records() {
        let body = r#"{"data":{"campaigns":[
            {"identifier":"c1","name":"One","description":"d","picture":"https://x/p.png",
             "starting":1700000000,"ending":1700100000,"creator":{"address":"0xabc"}},
            {"name":"no id"},
            {"identifier":"c2","starting":null,"creator":null}
        ]}}"#;
        let out = GraphqlCampaignQuery::parse_page(body).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].identifier, "c1");
        assert_eq!(out[0].creator_address(), "0xabc");
        assert_eq!(out[1].identifier, "c2");
        assert!(out[1].starting.is_none());
        assert_eq!(out[1].creator_address(), "N/A");
    }

    #[test]
    fn null_campaigns_is_an_empty_page() {
        let out = GraphqlCampaignQuery::parse_page(r#"{"data":{"campaigns":null}}"#).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn errors_without_data_are_decode_errors() {
        let err = GraphqlCampaignQuery::parse_page(r#"{"errors":[{"message":"boom"}]}"#)
            .unwrap_err();
        assert!(matches!(err, HeraldError::Decode(ref m) if m.contains("boom")));
        assert!(GraphqlCampaignQuery::parse_page("<html>").is_err());
    }
}
