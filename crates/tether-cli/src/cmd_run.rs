//! `tether run`: the hook loop.
//!
//! One JSON request per stdin line, one JSON response per stdout line,
//! processed strictly in order under a single session. The agent host sends
//! `pre` before executing a tool and `post` after; approval prompts go to the
//! terminal, never to stdout.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use tether_core::{TetherConfig, TetherPaths};
use tether_hooks::approval::gate_from_config;
use tether_hooks::{
    Authorized, HookPipeline, Payload, PostOutcome, PostState, Rejection, RejectionKind, Session,
    ToolCall,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt};

#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum Request {
    Pre {
        id: String,
        tool_name: String,
        #[serde(default)]
        args: serde_json::Value,
        #[serde(default)]
        payload: Payload,
    },
    Post {
        id: String,
        success: bool,
        #[serde(default)]
        content: Option<String>,
    },
    Reset,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum Response {
    Allowed {
        id: String,
        payload: Payload,
        /// Set when tether carried out the tool itself (`record_lesson`).
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        handled: bool,
    },
    Rejected {
        id: String,
        kind: RejectionKind,
        message: String,
    },
    Recorded {
        id: String,
        trace_id: String,
    },
    Skipped {
        id: String,
        reason: &'static str,
    },
    Reset,
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        message: String,
    },
}

impl Response {
    fn rejected(id: String, r: Rejection) -> Self {
        Response::Rejected {
            id,
            kind: r.kind,
            message: r.message,
        }
    }
}

/// Authorizations kept for hosts that never send `post`.
const MAX_PENDING: usize = 256;

/// Authorized calls waiting for their `post`, oldest evicted first.
#[derive(Default)]
struct Pending {
    by_id: HashMap<String, Authorized>,
    order: VecDeque<String>,
}

impl Pending {
    fn insert(&mut self, id: String, auth: Authorized) {
        if self.by_id.insert(id.clone(), auth).is_none() {
            self.order.push_back(id);
        }
        while self.by_id.len() > MAX_PENDING {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.by_id.remove(&oldest);
            tracing::warn!(id = %oldest, "dropping authorization never followed by post");
        }
    }

    fn remove(&mut self, id: &str) -> Option<Authorized> {
        let auth = self.by_id.remove(id)?;
        self.order.retain(|k| k != id);
        Some(auth)
    }

    fn clear(&mut self) {
        self.by_id.clear();
        self.order.clear();
    }

    fn len(&self) -> usize {
        self.by_id.len()
    }
}

struct RunState {
    pipeline: HookPipeline,
    session: Session,
    pending: Pending,
    lessons_md: PathBuf,
}

impl RunState {
    async fn handle(&mut self, req: Request) -> anyhow::Result<Response> {
        match req {
            Request::Pre {
                id,
                tool_name,
                args,
                payload,
            } => {
                let auth = match self
                    .pipeline
                    .pre_hook_raw(&mut self.session, &tool_name, args, payload)
                    .await
                {
                    Ok(auth) => auth,
                    Err(r) => return Ok(Response::rejected(id, r)),
                };
                if let ToolCall::RecordLesson { lesson, category } = &auth.call {
                    if let Err(e) = tether_trace::append_lesson(&self.lessons_md, lesson, *category) {
                        return Ok(Response::rejected(id, Rejection::hook_failure(&e)));
                    }
                    let payload = auth.payload.clone();
                    self.pending.insert(id.clone(), auth);
                    return Ok(Response::Allowed {
                        id,
                        payload,
                        handled: true,
                    });
                }
                let payload = auth.payload.clone();
                self.pending.insert(id.clone(), auth);
                Ok(Response::Allowed {
                    id,
                    payload,
                    handled: false,
                })
            }
            Request::Post {
                id,
                success,
                content,
            } => {
                let Some(auth) = self.pending.remove(&id) else {
                    return Ok(Response::Error {
                        message: format!("no pending authorization for request {id}"),
                        id: Some(id),
                    });
                };
                let state = PostState { success, content };
                // An audit failure ends the loop.
                match self.pipeline.post_hook(&self.session, &auth, &state)? {
                    PostOutcome::Recorded(entry) => Ok(Response::Recorded {
                        id,
                        trace_id: entry.id,
                    }),
                    PostOutcome::Skipped(reason) => Ok(Response::Skipped { id, reason }),
                }
            }
            Request::Reset => {
                self.session.reset();
                self.pending.clear();
                tracing::info!(session = self.session.id(), "session reset");
                Ok(Response::Reset)
            }
        }
    }
}

pub async fn execute(repo_root: &Path) -> anyhow::Result<()> {
    let paths = TetherPaths::discover(repo_root);
    let config = TetherConfig::load(&paths.config_json)?;
    let gate = gate_from_config(&config)?;
    let mut state = RunState {
        pipeline: HookPipeline::new(&paths, &config, gate)?,
        session: Session::new(),
        pending: Pending::default(),
        lessons_md: paths.lessons_md.clone(),
    };
    tracing::info!(
        session = state.session.id(),
        root = %repo_root.display(),
        "hook loop started"
    );

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<Request>(&line) {
            Ok(req) => state.handle(req).await?,
            Err(e) => Response::Error {
                id: None,
                message: format!("invalid request: {e}"),
            },
        };
        let mut out = serde_json::to_string(&response)?;
        out.push('\n');
        stdout.write_all(out.as_bytes()).await?;
        stdout.flush().await?;
    }
    Ok(())
}
