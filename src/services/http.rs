use reqwest::{Client, RequestBuilder, header, multipart};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use super::{
    AdminApi, ConsoleError, ConsoleResult, ListQuery, PreferencesRecord, StagedFile, UploadedFile,
};
use crate::envelope::ListEnvelope;

/// [`AdminApi`] over the live marketplace HTTP API.
///
/// The bearer credential is supplied by the host's auth collaborator at
/// construction; this client never reads or refreshes tokens itself. Note
/// the backend's mixed update verbs: accounts take PUT, listings and
/// complexes take PATCH.
#[derive(Clone)]
pub struct HttpApi {
    base_url: String,
    client: Client,
}

impl HttpApi {
    pub fn new(base_url: &str, bearer_token: &str) -> ConsoleResult<Self> {
        let mut headers = header::HeaderMap::new();
        let value = header::HeaderValue::from_str(&format!("Bearer {bearer_token}"))
            .map_err(|err| ConsoleError::Internal(format!("bad bearer token: {err}")))?;
        headers.insert(header::AUTHORIZATION, value);
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|err| ConsoleError::Internal(format!("client init failed: {err}")))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> ConsoleResult<T> {
        let response = request
            .send()
            .await
            .map_err(|err| ConsoleError::Network(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<Value>()
                .await
                .ok()
                .and_then(|body| body.get("message").and_then(Value::as_str).map(str::to_string));
            return Err(ConsoleError::Api {
                status: status.as_u16(),
                message,
            });
        }
        response.json::<T>().await.map_err(|err| ConsoleError::Api {
            status: status.as_u16(),
            message: Some(format!("malformed response body: {err}")),
        })
    }

    async fn send_unit(&self, request: RequestBuilder) -> ConsoleResult<()> {
        let response = request
            .send()
            .await
            .map_err(|err| ConsoleError::Network(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<Value>()
                .await
                .ok()
                .and_then(|body| body.get("message").and_then(Value::as_str).map(str::to_string));
            return Err(ConsoleError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, query), err)]
    async fn list(&self, endpoint: &str, query: &ListQuery) -> ConsoleResult<ListEnvelope> {
        self.send(
            self.client
                .get(self.url(endpoint))
                .query(&list_params(query)),
        )
        .await
    }

    #[tracing::instrument(skip(self, file), err)]
    async fn upload_single(&self, kind: &str, file: &StagedFile) -> ConsoleResult<UploadedFile> {
        let form = multipart::Form::new().part("file", file_part(file)?);
        self.send(
            self.client
                .post(self.url(&format!("/upload/{kind}")))
                .multipart(form),
        )
        .await
    }

    #[tracing::instrument(skip(self, files), err)]
    async fn upload_batch(
        &self,
        kind: &str,
        files: &[StagedFile],
    ) -> ConsoleResult<Vec<UploadedFile>> {
        let mut form = multipart::Form::new();
        for file in files {
            form = form.part("files", file_part(file)?);
        }
        self.send(
            self.client
                .post(self.url(&format!("/upload/{kind}")))
                .multipart(form),
        )
        .await
    }
}

fn file_part(file: &StagedFile) -> ConsoleResult<multipart::Part> {
    multipart::Part::bytes(file.data.clone())
        .file_name(file.name.clone())
        .mime_str(&file.content_type)
        .map_err(|err| ConsoleError::Internal(format!("bad content type: {err}")))
}

fn list_params(query: &ListQuery) -> Vec<(String, String)> {
    let mut params = vec![
        ("page".to_string(), query.page.to_string()),
        ("limit".to_string(), query.limit.to_string()),
    ];
    if let Some(search) = &query.search {
        params.push(("search".into(), search.clone()));
    }
    if let Some(field) = &query.sort_by {
        params.push(("sortBy".into(), field.clone()));
    }
    if let Some(order) = &query.order {
        params.push(("order".into(), order.clone()));
    }
    params.extend(query.filters.iter().cloned());
    params
}

impl AdminApi for HttpApi {
    async fn list_accounts(&self, query: &ListQuery) -> ConsoleResult<ListEnvelope> {
        self.list("/users", query).await
    }

    async fn list_listings(&self, query: &ListQuery) -> ConsoleResult<ListEnvelope> {
        self.list("/properties", query).await
    }

    async fn list_operators(&self, query: &ListQuery) -> ConsoleResult<ListEnvelope> {
        self.list("/admins", query).await
    }

    async fn list_complexes(&self, query: &ListQuery) -> ConsoleResult<ListEnvelope> {
        self.list("/complexes", query).await
    }

    async fn create_account(&self, payload: &Value) -> ConsoleResult<Value> {
        self.send(self.client.post(self.url("/users")).json(payload))
            .await
    }

    async fn update_account(&self, id: &str, payload: &Value) -> ConsoleResult<Value> {
        self.send(
            self.client
                .put(self.url(&format!("/users/{id}")))
                .json(payload),
        )
        .await
    }

    async fn delete_account(&self, id: &str) -> ConsoleResult<()> {
        self.send_unit(self.client.delete(self.url(&format!("/users/{id}"))))
            .await
    }

    async fn change_account_role(&self, id: &str, role: &str) -> ConsoleResult<Value> {
        self.send(
            self.client
                .put(self.url(&format!("/users/{id}/role")))
                .json(&json!({ "role": role })),
        )
        .await
    }

    async fn create_listing(&self, payload: &Value) -> ConsoleResult<Value> {
        self.send(self.client.post(self.url("/properties")).json(payload))
            .await
    }

    async fn update_listing(&self, id: &str, payload: &Value) -> ConsoleResult<Value> {
        self.send(
            self.client
                .patch(self.url(&format!("/properties/{id}")))
                .json(payload),
        )
        .await
    }

    async fn delete_listing(&self, id: &str) -> ConsoleResult<()> {
        self.send_unit(self.client.delete(self.url(&format!("/properties/{id}"))))
            .await
    }

    async fn create_complex(&self, payload: &Value) -> ConsoleResult<Value> {
        self.send(self.client.post(self.url("/complexes")).json(payload))
            .await
    }

    async fn update_complex(&self, id: &str, payload: &Value) -> ConsoleResult<Value> {
        self.send(
            self.client
                .patch(self.url(&format!("/complexes/{id}")))
                .json(payload),
        )
        .await
    }

    async fn delete_complex(&self, id: &str) -> ConsoleResult<()> {
        self.send_unit(self.client.delete(self.url(&format!("/complexes/{id}"))))
            .await
    }

    async fn get_preferences(&self, account_id: &str) -> ConsoleResult<PreferencesRecord> {
        let data: Value = self
            .send(
                self.client
                    .get(self.url(&format!("/users/{account_id}/preferences"))),
            )
            .await?;
        Ok(PreferencesRecord {
            account_id: account_id.to_string(),
            data,
        })
    }

    async fn create_preferences(
        &self,
        account_id: &str,
        payload: &Value,
    ) -> ConsoleResult<PreferencesRecord> {
        let data: Value = self
            .send(
                self.client
                    .post(self.url(&format!("/users/{account_id}/preferences")))
                    .json(payload),
            )
            .await?;
        Ok(PreferencesRecord {
            account_id: account_id.to_string(),
            data,
        })
    }

    async fn update_preferences(
        &self,
        account_id: &str,
        payload: &Value,
    ) -> ConsoleResult<PreferencesRecord> {
        let data: Value = self
            .send(
                self.client
                    .put(self.url(&format!("/users/{account_id}/preferences")))
                    .json(payload),
            )
            .await?;
        Ok(PreferencesRecord {
            account_id: account_id.to_string(),
            data,
        })
    }

    async fn delete_preferences(&self, account_id: &str) -> ConsoleResult<()> {
        self.send_unit(
            self.client
                .delete(self.url(&format!("/users/{account_id}/preferences"))),
        )
        .await
    }

    async fn upload_logo(&self, file: &StagedFile) -> ConsoleResult<UploadedFile> {
        self.upload_single("logo", file).await
    }

    async fn upload_video(&self, file: &StagedFile) -> ConsoleResult<UploadedFile> {
        self.upload_single("video", file).await
    }

    async fn upload_photos(&self, files: &[StagedFile]) -> ConsoleResult<Vec<UploadedFile>> {
        self.upload_batch("photos", files).await
    }

    async fn upload_documents(&self, files: &[StagedFile]) -> ConsoleResult<Vec<UploadedFile>> {
        self.upload_batch("documents", files).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_params_cover_the_whole_query() {
        let query = ListQuery {
            page: 2,
            limit: 25,
            search: Some("maple".into()),
            sort_by: Some("price".into()),
            order: Some("DESC".into()),
            filters: vec![("role".into(), "tenant".into())],
        };
        let params = list_params(&query);
        assert_eq!(
            params,
            vec![
                ("page".to_string(), "2".to_string()),
                ("limit".to_string(), "25".to_string()),
                ("search".to_string(), "maple".to_string()),
                ("sortBy".to_string(), "price".to_string()),
                ("order".to_string(), "DESC".to_string()),
                ("role".to_string(), "tenant".to_string()),
            ]
        );
    }

    #[test]
    fn empty_query_sends_only_pagination() {
        let params = list_params(&ListQuery {
            page: 1,
            limit: 10,
            ..ListQuery::default()
        });
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn base_url_has_no_trailing_slash() {
        let api = HttpApi::new("https://api.rentdesk.test/", "token").unwrap();
        assert_eq!(api.url("/users"), "https://api.rentdesk.test/users");
    }
}
