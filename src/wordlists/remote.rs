use super::{Candidates, SourceDescriptor, SourceOrigin, WordlistSource, clean_line};
use crate::core::errors::SourceError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Shared wordlist catalogue served by a JSON key-value store:
/// `wordlists/<name>/passwords` holds the entries, `wordlists/<name>/count`
/// their number.
pub struct RemoteCatalogue {
    client: Client,
    base: Url,
    api_key: Option<String>,
}

impl RemoteCatalogue {
    pub fn new(base: Url, api_key: Option<String>, timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base, api_key))
    }

    pub fn with_client(client: Client, base: Url, api_key: Option<String>) -> Self {
        Self { client, base, api_key }
    }

    fn endpoint(&self, segments: &[&str], shallow: bool) -> Result<Url, SourceError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| SourceError::unavailable(self.base.to_string(), "base url cannot hold a path"))?
            .pop_if_empty()
            .extend(segments);
        {
            let mut query = url.query_pairs_mut();
            if shallow {
                query.append_pair("shallow", "true");
            }
            if let Some(key) = &self.api_key {
                query.append_pair("auth", key);
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        Ok(url)
    }

    async fn get_json(&self, url: Url, what: &str) -> Result<Value, SourceError> {
        tracing::debug!("Catalogue request: {}", url.path());
        let response = self.client.get(url).send().await?;
        match response.status() {
            StatusCode::OK => Ok(response.json::<Value>().await?),
            status => Err(SourceError::unavailable(what, format!("catalogue answered {}", status))),
        }
    }

    /// Names of every catalogue, sorted
    pub async fn list_catalogues(&self) -> Result<Vec<String>, SourceError> {
        let url = self.endpoint(&["wordlists.json"], true)?;
        let value = self.get_json(url, "catalogue index").await?;
        let mut names: Vec<String> = match value {
            Value::Object(map) => map.keys().cloned().collect(),
            Value::Null => Vec::new(),
            other => {
                return Err(SourceError::unavailable(
                    "catalogue index",
                    format!("unexpected index shape: {}", kind_of(&other)),
                ));
            }
        };
        names.sort();
        Ok(names)
    }

    /// Every entry of one catalogue, in stored order
    pub async fn fetch(&self, name: &str) -> Result<Vec<String>, SourceError> {
        let url = self.endpoint(&["wordlists", name, "passwords.json"], false)?;
        let value = self.get_json(url, name).await?;
        Ok(entries_from(value))
    }

    pub async fn entry_count(&self, name: &str) -> Result<u64, SourceError> {
        let url = self.endpoint(&["wordlists", name, "count.json"], false)?;
        match self.get_json(url, name).await? {
            Value::Number(n) => Ok(n.as_u64().unwrap_or(0)),
            _ => Ok(0),
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Sparse arrays come back as index-keyed objects; order those by index.
fn entries_from(value: Value) -> Vec<String> {
    let raw: Vec<Value> = match value {
        Value::Array(items) => items,
        Value::Object(map) => {
            let mut indexed: Vec<(u64, Value)> = map
                .into_iter()
                .filter_map(|(k, v)| k.parse::<u64>().ok().map(|idx| (idx, v)))
                .collect();
            indexed.sort_by_key(|(idx, _)| *idx);
            indexed.into_iter().map(|(_, v)| v).collect()
        }
        _ => Vec::new(),
    };
    raw.into_iter()
        .filter_map(|v| match v {
            Value::String(s) => clean_line(&s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect()
}

#[async_trait]
impl WordlistSource for RemoteCatalogue {
    fn origin(&self) -> SourceOrigin {
        SourceOrigin::Remote
    }

    async fn sources(&self) -> Result<Vec<SourceDescriptor>, SourceError> {
        let names = self.list_catalogues().await?;
        Ok(names
            .into_iter()
            .map(|name| SourceDescriptor {
                origin: SourceOrigin::Remote,
                location: name.clone(),
                name,
                size_bytes: None,
            })
            .collect())
    }

    async fn load(&self, descriptor: &SourceDescriptor) -> Result<Candidates, SourceError> {
        let entries = self.fetch(&descriptor.location).await?;
        tracing::info!("Loaded catalogue '{}' ({} entries)", descriptor.name, entries.len());
        Ok(Box::new(entries.into_iter()))
    }

    async fn count(&self, descriptor: &SourceDescriptor) -> Option<u64> {
        self.entry_count(&descriptor.location).await.ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn catalogue(server: &MockServer, key: Option<&str>) -> RemoteCatalogue {
        RemoteCatalogue::new(
            Url::parse(&server.uri()).unwrap(),
            key.map(str::to_string),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_list_catalogues_sorted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wordlists.json"))
            .and(query_param("shallow", "true"))
            .and(query_param("auth", "k3y"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rockyou": true, "common": true})))
            .mount(&server)
            .await;

        let names = catalogue(&server, Some("k3y")).list_catalogues().await.unwrap();
        assert_eq!(names, vec!["common", "rockyou"]);
    }

    #[tokio::test]
    async fn test_empty_index_yields_no_sources() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wordlists.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("null"))
            .mount(&server)
            .await;

        let sources = catalogue(&server, None).sources().await.unwrap();
        assert!(sources.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_array_and_sparse_object() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wordlists/common/passwords.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(["p1", " p2 ", "", null, 1234])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/wordlists/sparse/passwords.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"10": "late", "2": "early"})))
            .mount(&server)
            .await;

        let remote = catalogue(&server, None);
        assert_eq!(remote.fetch("common").await.unwrap(), vec!["p1", "p2", "1234"]);
        assert_eq!(remote.fetch("sparse").await.unwrap(), vec!["early", "late"]);
    }

    #[tokio::test]
    async fn test_missing_catalogue_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = catalogue(&server, None).fetch("ghost").await.unwrap_err();
        assert!(matches!(err, SourceError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn test_entry_count() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wordlists/common/count.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(42)))
            .mount(&server)
            .await;

        assert_eq!(catalogue(&server, None).entry_count("common").await.unwrap(), 42);
    }
}
