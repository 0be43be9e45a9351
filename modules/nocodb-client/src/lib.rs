pub mod error;
pub mod types;

pub use error::{NocoError, Result};
pub use types::{CreatedRecord, DeleteRecord, FieldInfo, NewRecord, TableInfo, UpdateRecord};

use serde::Serialize;
use serde_json::Value;
use types::ListResponse;

/// Hard NocoDB API limit on records per data request.
pub const MAX_BATCH: usize = 10;

pub struct NocoClient {
    client: reqwest::Client,
    host: String,
    base_id: String,
    token: String,
}

impl NocoClient {
    pub fn new(host: impl Into<String>, base_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            host: host.into().trim_end_matches('/').to_string(),
            base_id: base_id.into(),
            token: token.into(),
        }
    }

    fn data_url(&self, table_id: &str) -> String {
        format!("{}/api/v3/data/{}/{}/records", self.host, self.base_id, table_id)
    }

    /// Create a batch of records. Returns the created rows with their remote
    /// ids; response order need not match submission order.
    pub async fn create_records(
        &self,
        table_id: &str,
        records: &[NewRecord],
    ) -> Result<Vec<CreatedRecord>> {
        check_batch(records.len())?;

        let body = self
            .send(reqwest::Method::POST, &self.data_url(table_id), records)
            .await?;
        parse_created(&body)
    }

    /// Update a batch of records addressed by remote id.
    pub async fn update_records(&self, table_id: &str, records: &[UpdateRecord]) -> Result<()> {
        check_batch(records.len())?;

        self.send(reqwest::Method::PATCH, &self.data_url(table_id), records)
            .await?;
        Ok(())
    }

    /// Delete a batch of records addressed by remote id.
    pub async fn delete_records(&self, table_id: &str, records: &[DeleteRecord]) -> Result<()> {
        check_batch(records.len())?;

        self.send(reqwest::Method::DELETE, &self.data_url(table_id), records)
            .await?;
        Ok(())
    }

    /// Attach child records to a parent row through a link field.
    pub async fn link_records(
        &self,
        table_id: &str,
        link_field_id: &str,
        parent_record_id: i64,
        child_record_ids: &[i64],
    ) -> Result<()> {
        check_batch(child_record_ids.len())?;

        #[derive(Serialize)]
        struct LinkRecord {
            id: i64,
        }

        let records: Vec<LinkRecord> = child_record_ids.iter().map(|&id| LinkRecord { id }).collect();
        let url = format!(
            "{}/api/v3/data/{}/{}/links/{}/{}",
            self.host, self.base_id, table_id, link_field_id, parent_record_id
        );

        self.send(reqwest::Method::POST, &url, &records).await?;
        Ok(())
    }

    /// List the tables of the base.
    pub async fn list_tables(&self) -> Result<Vec<TableInfo>> {
        let url = format!("{}/api/v3/meta/bases/{}/tables", self.host, self.base_id);
        let body = self.get(&url).await?;
        parse_list(&body)
    }

    /// Resolve a table id by its title.
    pub async fn table_id_by_title(&self, title: &str) -> Result<String> {
        let tables = self.list_tables().await?;
        tables
            .into_iter()
            .find(|t| t.title.eq_ignore_ascii_case(title))
            .map(|t| t.id)
            .ok_or_else(|| NocoError::TableNotFound(title.to_string()))
    }

    /// List the fields of a table.
    pub async fn list_fields(&self, table_id: &str) -> Result<Vec<FieldInfo>> {
        let url = format!(
            "{}/api/v3/meta/bases/{}/tables/{}/fields",
            self.host, self.base_id, table_id
        );
        let body = self.get(&url).await?;
        parse_list(&body)
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: reqwest::Method,
        url: &str,
        body: &B,
    ) -> Result<Value> {
        let resp = self
            .client
            .request(method.clone(), url)
            .header("xc-auth", &self.token)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            tracing::warn!(%method, url, status = status.as_u16(), "NocoDB request failed");
            return Err(NocoError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let text = resp.text().await?;
        if text.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn get(&self, url: &str) -> Result<Value> {
        let resp = self
            .client
            .get(url)
            .header("xc-auth", &self.token)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(NocoError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.json().await?)
    }
}

fn check_batch(len: usize) -> Result<()> {
    if len > MAX_BATCH {
        return Err(NocoError::BatchTooLarge(len));
    }
    Ok(())
}

/// Created rows come back either bare (`[{...}]`) or wrapped
/// (`{"records": [{...}]}`) depending on server version; the id key casing
/// also varies.
fn parse_created(body: &Value) -> Result<Vec<CreatedRecord>> {
    let rows = match body {
        Value::Array(rows) => rows.as_slice(),
        Value::Object(map) => match map.get("records") {
            Some(Value::Array(rows)) => rows.as_slice(),
            _ => return Err(NocoError::Parse(format!("unexpected create response: {body}"))),
        },
        _ => return Err(NocoError::Parse(format!("unexpected create response: {body}"))),
    };

    let mut created = Vec::with_capacity(rows.len());
    for row in rows {
        let id = row
            .get("id")
            .or_else(|| row.get("Id"))
            .and_then(Value::as_i64)
            .ok_or_else(|| NocoError::Parse(format!("created record missing id: {row}")))?;
        let fields = row.get("fields").cloned().unwrap_or(Value::Null);
        created.push(CreatedRecord { id, fields });
    }
    Ok(created)
}

fn parse_list<T: serde::de::DeserializeOwned>(body: &Value) -> Result<Vec<T>> {
    if let Value::Array(_) = body {
        return Ok(serde_json::from_value(body.clone())?);
    }
    let wrapper: ListResponse<T> = serde_json::from_value(body.clone())?;
    Ok(wrapper.list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_bare_array_create_response() {
        let body = json!([
            {"id": 12, "fields": {"sx_id": "a"}},
            {"Id": 13, "fields": {"sx_id": "b"}}
        ]);
        let created = parse_created(&body).unwrap();
        assert_eq!(created.len(), 2);
        assert_eq!(created[0].id, 12);
        assert_eq!(created[1].id, 13);
    }

    #[test]
    fn parses_wrapped_create_response() {
        let body = json!({"records": [{"id": 7, "fields": {"sx_id": "x"}}]});
        let created = parse_created(&body).unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].id, 7);
        assert_eq!(created[0].fields["sx_id"], "x");
    }

    #[test]
    fn create_response_without_id_is_a_parse_error() {
        let body = json!([{"fields": {}}]);
        assert!(matches!(parse_created(&body), Err(NocoError::Parse(_))));
    }

    #[test]
    fn oversized_batch_is_rejected_locally() {
        assert!(matches!(check_batch(11), Err(NocoError::BatchTooLarge(11))));
        assert!(check_batch(10).is_ok());
    }
}
