use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::TaskProvider;
use crate::model::task::{NewTask, Task, TaskUpdate};

pub const DEFAULT_BASE_URL: &str = "https://app.asana.com/api/1.0";

const PAGE_SIZE: &str = "100";

const TASK_FIELDS: &str = "name,assignee,completed,custom_fields,\
memberships.project.gid,memberships.section.gid";

pub struct AsanaProvider {
    token: String,
    base_url: String,
    client: reqwest::Client,
}

impl AsanaProvider {
    pub fn new(token: String, base_url: Option<String>) -> Self {
        let base_url = base_url
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            token,
            base_url,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[derive(Serialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Serialize)]
struct CreateBody<'a> {
    workspace: &'a str,
    #[serde(flatten)]
    task: &'a NewTask,
}

#[derive(Deserialize)]
struct DataResponse<T> {
    data: T,
}

#[derive(Deserialize)]
struct PageResponse {
    data: Vec<Task>,
    next_page: Option<NextPage>,
}

#[derive(Deserialize)]
struct NextPage {
    offset: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    errors: Vec<ApiError>,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

/// Turn a non-2xx response into an error carrying the service's messages.
async fn check(resp: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorResponse>(&body)
        .ok()
        .map(|e| {
            e.errors
                .into_iter()
                .map(|err| err.message)
                .collect::<Vec<_>>()
                .join("; ")
        })
        .filter(|d| !d.is_empty())
        .unwrap_or(body);
    bail!("Asana {what} failed ({status}): {detail}")
}

#[async_trait]
impl TaskProvider for AsanaProvider {
    fn name(&self) -> &str {
        "Asana"
    }

    async fn list_section_tasks(&self, section_gid: &str) -> Result<Vec<Task>> {
        let mut tasks = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(self.url("/tasks"))
                .bearer_auth(&self.token)
                .query(&[
                    ("section", section_gid),
                    ("opt_fields", TASK_FIELDS),
                    ("limit", PAGE_SIZE),
                ]);
            if let Some(offset) = &offset {
                request = request.query(&[("offset", offset.as_str())]);
            }

            let resp = request
                .send()
                .await
                .with_context(|| format!("Asana task listing for section {section_gid} failed"))?;
            let page: PageResponse = check(resp, "task listing")
                .await?
                .json()
                .await
                .context("Failed to parse Asana task listing")?;

            tasks.extend(page.data);
            match page.next_page {
                Some(next) => {
                    tracing::debug!(section = %section_gid, fetched = tasks.len(), "fetching next page");
                    offset = Some(next.offset);
                }
                None => break,
            }
        }

        Ok(tasks)
    }

    async fn create_task(&self, workspace_gid: &str, task: &NewTask) -> Result<Task> {
        let body = Envelope {
            data: CreateBody {
                workspace: workspace_gid,
                task,
            },
        };
        let resp = self
            .client
            .post(self.url("/tasks"))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Asana create of \"{}\" failed", task.name))?;
        let created: DataResponse<Task> = check(resp, "task create")
            .await?
            .json()
            .await
            .context("Failed to parse Asana create response")?;
        Ok(created.data)
    }

    async fn delete_task(&self, task_gid: &str) -> Result<()> {
        let resp = self
            .client
            .delete(self.url(&format!("/tasks/{task_gid}")))
            .bearer_auth(&self.token)
            .send()
            .await
            .with_context(|| format!("Asana delete of task {task_gid} failed"))?;
        check(resp, "task delete").await?;
        Ok(())
    }

    async fn update_task(&self, task_gid: &str, update: &TaskUpdate) -> Result<()> {
        let resp = self
            .client
            .put(self.url(&format!("/tasks/{task_gid}")))
            .bearer_auth(&self.token)
            .json(&Envelope { data: update })
            .send()
            .await
            .with_context(|| format!("Asana update of task {task_gid} failed"))?;
        check(resp, "task update").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::{FieldValue, Membership};
    use std::collections::BTreeMap;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// Read one HTTP/1.1 request, headers and body.
    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    /// Answer one connection per canned response, in order. Yields the raw requests.
    async fn serve(responses: Vec<(u16, &'static str)>) -> (String, tokio::task::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let mut seen = Vec::new();
            for (status, body) in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                seen.push(read_request(&mut socket).await);
                let reply = format!(
                    "HTTP/1.1 {status} Canned\r\ncontent-type: application/json\r\n\
                     content-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                socket.write_all(reply.as_bytes()).await.unwrap();
                socket.shutdown().await.ok();
            }
            seen
        });
        (base, handle)
    }

    fn local_provider(base: &str) -> AsanaProvider {
        AsanaProvider {
            token: "tok".into(),
            base_url: base.to_string(),
            client: reqwest::Client::builder().no_proxy().build().unwrap(),
        }
    }

    #[tokio::test]
    async fn listing_follows_every_page() {
        let (base, server) = serve(vec![
            (
                200,
                r#"{"data":[{"gid":"1","name":"A"},{"gid":"2","name":"B"}],
                    "next_page":{"offset":"page2","path":"/tasks?offset=page2","uri":"x"}}"#,
            ),
            (200, r#"{"data":[{"gid":"3","name":"C"}],"next_page":null}"#),
        ])
        .await;

        let tasks = local_provider(&base).list_section_tasks("s1").await.unwrap();
        let gids: Vec<_> = tasks.iter().map(|t| t.gid.as_str()).collect();
        assert_eq!(gids, vec!["1", "2", "3"]);

        let seen = server.await.unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].starts_with("GET /tasks?"));
        assert!(seen[0].contains("section=s1"));
        assert!(seen[0].contains("limit=100"));
        assert!(!seen[0].contains("offset="));
        assert!(seen[1].contains("section=s1"));
        assert!(seen[1].contains("offset=page2"));
        assert!(seen[1].to_lowercase().contains("authorization: bearer tok"));
    }

    #[tokio::test]
    async fn error_carries_status_and_service_messages() {
        let (base, server) = serve(vec![(
            400,
            r#"{"errors":[{"message":"section: Not a recognized ID"},{"message":"try again"}]}"#,
        )])
        .await;

        let err = local_provider(&base).list_section_tasks("bogus").await.unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("task listing failed"));
        assert!(message.contains("400"));
        assert!(message.contains("section: Not a recognized ID; try again"));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn error_without_json_body_keeps_raw_text() {
        let (base, server) = serve(vec![(503, "upstream down")]).await;
        let err = local_provider(&base).delete_task("t1").await.unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("task delete failed"));
        assert!(message.contains("503"));
        assert!(message.contains("upstream down"));
        let seen = server.await.unwrap();
        assert!(seen[0].starts_with("DELETE /tasks/t1 "));
    }

    #[tokio::test]
    async fn create_posts_workspace_and_returns_created_task() {
        let (base, server) = serve(vec![(201, r#"{"data":{"gid":"new1","name":"[1] A"}}"#)]).await;
        let task = NewTask {
            name: "[1] A".into(),
            assignee: None,
            memberships: vec![Membership::new("p", "backlog")],
            custom_fields: BTreeMap::new(),
        };

        let created = local_provider(&base).create_task("ws", &task).await.unwrap();
        assert_eq!(created.gid, "new1");

        let seen = server.await.unwrap();
        assert!(seen[0].starts_with("POST /tasks "));
        assert!(seen[0].contains(r#""workspace":"ws""#));
        assert!(seen[0].contains(r#""section":"backlog""#));
    }

    #[tokio::test]
    async fn update_puts_partial_fields() {
        let (base, server) = serve(vec![(200, r#"{"data":{"gid":"t1"}}"#)]).await;
        local_provider(&base)
            .update_task("t1", &TaskUpdate::complete())
            .await
            .unwrap();
        let seen = server.await.unwrap();
        assert!(seen[0].starts_with("PUT /tasks/t1 "));
        assert!(seen[0].ends_with(r#"{"data":{"completed":true}}"#));
    }

    #[test]
    fn base_url_defaults_and_trims() {
        let provider = AsanaProvider::new("t".into(), None);
        assert_eq!(provider.url("/tasks"), "https://app.asana.com/api/1.0/tasks");

        let provider = AsanaProvider::new("t".into(), Some("http://localhost:8080/api/".into()));
        assert_eq!(provider.url("/tasks/1"), "http://localhost:8080/api/tasks/1");
    }

    #[test]
    fn create_body_embeds_workspace() {
        let mut custom_fields = BTreeMap::new();
        custom_fields.insert("E".to_string(), FieldValue::Number(Some(1.0)));
        let task = NewTask {
            name: "[1] A".into(),
            assignee: Some("u1".into()),
            memberships: vec![Membership::new("p", "s")],
            custom_fields,
        };
        let body = Envelope {
            data: CreateBody {
                workspace: "ws",
                task: &task,
            },
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["data"]["workspace"], "ws");
        assert_eq!(value["data"]["name"], "[1] A");
        assert_eq!(value["data"]["assignee"], "u1");
        assert_eq!(value["data"]["memberships"][0]["section"], "s");
        assert_eq!(value["data"]["custom_fields"]["E"], 1.0);
    }

    #[test]
    fn page_response_parses_next_offset() {
        let json = r#"{
            "data": [{ "gid": "1", "name": "A" }],
            "next_page": { "offset": "eyJ0", "path": "/tasks?offset=eyJ0", "uri": "x" }
        }"#;
        let page: PageResponse = serde_json::from_str(json).unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.next_page.unwrap().offset, "eyJ0");

        let last: PageResponse =
            serde_json::from_str(r#"{ "data": [], "next_page": null }"#).unwrap();
        assert!(last.next_page.is_none());
    }
}
