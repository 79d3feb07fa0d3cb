//! Test transports: a scripted one that replays canned responses and an
//! in-memory one that behaves like a small Redis behind the REST API.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use hyper::{Request, Response, StatusCode};
use percent_encoding::percent_decode_str;
use serde_json::{json, Value as Json};

use kv_rest_client::{BoxError, Client, ClientConfig, HttpTransport};

pub const TOKEN: &str = "test-token";
pub const PRIMARY: &str = "https://primary.test";
pub const EDGE: &str = "https://edge.test";

/// A request as seen by a test transport
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub uri: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl Recorded {
    fn from_request(request: &Request<Bytes>) -> Self {
        let header = |name: &str| {
            request
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        Self {
            method: request.method().to_string(),
            uri: request.uri().to_string(),
            authorization: header("authorization"),
            content_type: header("content-type"),
            body: request.body().to_vec(),
        }
    }

    /// The JSON command array sent on the write path
    pub fn command(&self) -> Vec<String> {
        serde_json::from_slice(&self.body).expect("body is a JSON string array")
    }
}

/// Replays queued `(status, body)` pairs in order.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<std::result::Result<(StatusCode, String), String>>>,
    seen: Mutex<Vec<Recorded>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a 200 reply wrapping `result` in an envelope
    pub fn ok(&self, result: Json) -> &Self {
        self.reply(StatusCode::OK, json!({ "result": result }).to_string())
    }

    pub fn reply(&self, status: StatusCode, body: impl Into<String>) -> &Self {
        self.replies.lock().unwrap().push_back(Ok((status, body.into())));
        self
    }

    /// Queue a transport-level failure
    pub fn fail(&self, message: &str) -> &Self {
        self.replies.lock().unwrap().push_back(Err(message.to_string()));
        self
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.seen.lock().unwrap().clone()
    }

    pub fn last(&self) -> Recorded {
        self.seen.lock().unwrap().last().cloned().expect("a request was sent")
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: Request<Bytes>) -> Result<Response<Bytes>, BoxError> {
        self.seen.lock().unwrap().push(Recorded::from_request(&request));
        let next = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or("no scripted reply left")?;
        let (status, body) = next?;
        Ok(Response::builder().status(status).body(Bytes::from(body))?)
    }
}

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

/// An in-memory Redis subset answering the REST wire format.
///
/// Errors are answered the way the hosted service does: HTTP 400 with
/// `{"error": "..."}`.
#[derive(Default)]
pub struct MemoryTransport {
    data: Mutex<HashMap<String, Entry>>,
    seen: Mutex<Vec<Recorded>>,
}

type Reply = std::result::Result<Json, String>;

const NOT_AN_INTEGER: &str = "ERR value is not an integer or out of range";

impl MemoryTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.seen.lock().unwrap().clone()
    }

    fn parse_command(request: &Request<Bytes>) -> std::result::Result<Vec<String>, String> {
        if request.method() == hyper::Method::GET {
            Ok(request
                .uri()
                .path()
                .trim_start_matches('/')
                .split('/')
                .map(|s| percent_decode_str(s).decode_utf8_lossy().into_owned())
                .collect())
        } else {
            serde_json::from_slice(request.body()).map_err(|e| format!("ERR bad body: {}", e))
        }
    }

    fn live<'a>(data: &'a mut HashMap<String, Entry>, key: &str) -> Option<&'a mut Entry> {
        let expired = data
            .get(key)
            .and_then(|e| e.expires_at)
            .map_or(false, |at| at <= Instant::now());
        if expired {
            data.remove(key);
        }
        data.get_mut(key)
    }

    fn get(data: &mut HashMap<String, Entry>, key: &str) -> Option<String> {
        Self::live(data, key).map(|e| e.value.clone())
    }

    fn put(data: &mut HashMap<String, Entry>, key: &str, value: String, ttl: Option<Duration>) {
        data.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: ttl.map(|d| Instant::now() + d),
            },
        );
    }

    fn incr_by(data: &mut HashMap<String, Entry>, key: &str, by: i64) -> Reply {
        let current = match Self::get(data, key) {
            Some(v) => v.parse::<i64>().map_err(|_| NOT_AN_INTEGER.to_string())?,
            None => 0,
        };
        let next = current.checked_add(by).ok_or(NOT_AN_INTEGER)?;
        match Self::live(data, key) {
            Some(entry) => entry.value = next.to_string(),
            None => Self::put(data, key, next.to_string(), None),
        }
        Ok(json!(next))
    }

    fn int_arg(args: &[String], i: usize) -> std::result::Result<i64, String> {
        args.get(i)
            .ok_or_else(|| "ERR wrong number of arguments".to_string())?
            .parse()
            .map_err(|_| NOT_AN_INTEGER.to_string())
    }

    fn arg(args: &[String], i: usize) -> std::result::Result<&str, String> {
        args.get(i)
            .map(String::as_str)
            .ok_or_else(|| "ERR wrong number of arguments".to_string())
    }

    fn unix_deadline(at: Duration) -> Duration {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();
        at.saturating_sub(now)
    }

    fn execute(&self, cmd: &[String]) -> Reply {
        let name = cmd.first().map(|s| s.to_lowercase()).unwrap_or_default();
        let args = &cmd[1.min(cmd.len())..];
        let mut data = self.data.lock().unwrap();
        let data = &mut *data;

        match name.as_str() {
            "ping" => Ok(json!("PONG")),
            "flushall" => {
                data.clear();
                Ok(json!("OK"))
            }
            "get" => Ok(json!(Self::get(data, Self::arg(args, 0)?))),
            "getdel" => {
                let key = Self::arg(args, 0)?;
                let value = Self::get(data, key);
                data.remove(key);
                Ok(json!(value))
            }
            "getex" => {
                let key = Self::arg(args, 0)?;
                let Some(entry) = Self::live(data, key) else {
                    return Ok(Json::Null);
                };
                match args.get(1).map(|s| s.to_lowercase()).as_deref() {
                    Some("ex") => {
                        let secs = Self::int_arg(args, 2)? as u64;
                        entry.expires_at = Some(Instant::now() + Duration::from_secs(secs));
                    }
                    Some("px") => {
                        let ms = Self::int_arg(args, 2)? as u64;
                        entry.expires_at = Some(Instant::now() + Duration::from_millis(ms));
                    }
                    Some("persist") => entry.expires_at = None,
                    _ => {}
                }
                Ok(json!(entry.value.clone()))
            }
            "getrange" => {
                let value = Self::get(data, Self::arg(args, 0)?).unwrap_or_default();
                let bytes = value.as_bytes();
                let len = bytes.len() as i64;
                let mut start = Self::int_arg(args, 1)?;
                let mut end = Self::int_arg(args, 2)?;
                if start < 0 {
                    start += len;
                }
                if end < 0 {
                    end += len;
                }
                let start = start.max(0);
                let end = end.min(len - 1);
                if len == 0 || start > end {
                    return Ok(json!(""));
                }
                Ok(json!(String::from_utf8_lossy(&bytes[start as usize..=end as usize])))
            }
            "getset" => {
                let key = Self::arg(args, 0)?;
                let old = Self::get(data, key);
                Self::put(data, key, Self::arg(args, 1)?.to_string(), None);
                Ok(json!(old))
            }
            "set" => self.set(data, args),
            "setex" | "psetex" => {
                let key = Self::arg(args, 0)?;
                let amount = Self::int_arg(args, 1)?;
                if amount <= 0 {
                    return Err(format!("ERR invalid expire time in '{}' command", name));
                }
                let ttl = if name == "setex" {
                    Duration::from_secs(amount as u64)
                } else {
                    Duration::from_millis(amount as u64)
                };
                Self::put(data, key, Self::arg(args, 2)?.to_string(), Some(ttl));
                Ok(json!("OK"))
            }
            "setnx" => {
                let key = Self::arg(args, 0)?;
                if Self::live(data, key).is_some() {
                    return Ok(json!(0));
                }
                Self::put(data, key, Self::arg(args, 1)?.to_string(), None);
                Ok(json!(1))
            }
            "setrange" => {
                let key = Self::arg(args, 0)?;
                let offset = Self::int_arg(args, 1)? as usize;
                let patch = Self::arg(args, 2)?.as_bytes().to_vec();
                let mut bytes = Self::get(data, key).unwrap_or_default().into_bytes();
                if bytes.len() < offset + patch.len() {
                    bytes.resize(offset + patch.len(), 0);
                }
                bytes[offset..offset + patch.len()].copy_from_slice(&patch);
                let len = bytes.len();
                let value = String::from_utf8_lossy(&bytes).into_owned();
                match Self::live(data, key) {
                    Some(entry) => entry.value = value,
                    None => Self::put(data, key, value, None),
                }
                Ok(json!(len))
            }
            "append" => {
                let key = Self::arg(args, 0)?;
                let suffix = Self::arg(args, 1)?;
                let len = match Self::live(data, key) {
                    Some(entry) => {
                        entry.value.push_str(suffix);
                        entry.value.len()
                    }
                    None => {
                        Self::put(data, key, suffix.to_string(), None);
                        suffix.len()
                    }
                };
                Ok(json!(len))
            }
            "strlen" => Ok(json!(Self::get(data, Self::arg(args, 0)?).map_or(0, |v| v.len()))),
            "incr" => Self::incr_by(data, Self::arg(args, 0)?, 1),
            "decr" => Self::incr_by(data, Self::arg(args, 0)?, -1),
            "incrby" => Self::incr_by(data, Self::arg(args, 0)?, Self::int_arg(args, 1)?),
            "decrby" => Self::incr_by(data, Self::arg(args, 0)?, -Self::int_arg(args, 1)?),
            "incrbyfloat" => {
                let key = Self::arg(args, 0)?;
                let by: f64 = Self::arg(args, 1)?
                    .parse()
                    .map_err(|_| "ERR value is not a valid float".to_string())?;
                let current: f64 = match Self::get(data, key) {
                    Some(v) => v.parse().map_err(|_| "ERR value is not a valid float".to_string())?,
                    None => 0.0,
                };
                let next = (current + by).to_string();
                match Self::live(data, key) {
                    Some(entry) => entry.value = next.clone(),
                    None => Self::put(data, key, next.clone(), None),
                }
                // floats come back as strings
                Ok(json!(next))
            }
            "mget" => Ok(Json::Array(
                args.iter().map(|k| json!(Self::get(data, k))).collect(),
            )),
            "mset" | "msetnx" => {
                if args.is_empty() || args.len() % 2 != 0 {
                    return Err(format!("ERR wrong number of arguments for '{}' command", name));
                }
                if name == "msetnx" && args.chunks(2).any(|kv| Self::live(data, &kv[0]).is_some()) {
                    return Ok(json!(0));
                }
                for kv in args.chunks(2) {
                    Self::put(data, &kv[0], kv[1].clone(), None);
                }
                Ok(if name == "mset" { json!("OK") } else { json!(1) })
            }
            "del" => {
                let mut removed = 0;
                for key in args {
                    if Self::live(data, key).is_some() {
                        data.remove(key);
                        removed += 1;
                    }
                }
                Ok(json!(removed))
            }
            "exists" => Ok(json!(args
                .iter()
                .filter(|k| Self::live(data, k).is_some())
                .count())),
            other => Err(format!("ERR unknown command '{}'", other)),
        }
    }

    fn set(&self, data: &mut HashMap<String, Entry>, args: &[String]) -> Reply {
        let key = Self::arg(args, 0)?;
        let value = Self::arg(args, 1)?.to_string();

        let mut ttl = None;
        let mut keep_ttl = false;
        let (mut nx, mut xx, mut get) = (false, false, false);
        let mut i = 2;
        while i < args.len() {
            match args[i].to_lowercase().as_str() {
                "ex" => {
                    ttl = Some(Duration::from_secs(Self::int_arg(args, i + 1)? as u64));
                    i += 1;
                }
                "px" => {
                    ttl = Some(Duration::from_millis(Self::int_arg(args, i + 1)? as u64));
                    i += 1;
                }
                "exat" => {
                    let at = Duration::from_secs(Self::int_arg(args, i + 1)? as u64);
                    ttl = Some(Self::unix_deadline(at));
                    i += 1;
                }
                "pxat" => {
                    let at = Duration::from_millis(Self::int_arg(args, i + 1)? as u64);
                    ttl = Some(Self::unix_deadline(at));
                    i += 1;
                }
                "keepttl" => keep_ttl = true,
                "nx" => nx = true,
                "xx" => xx = true,
                "get" => get = true,
                other => return Err(format!("ERR syntax error near '{}'", other)),
            }
            i += 1;
        }

        let existing = Self::live(data, key).map(|e| (e.value.clone(), e.expires_at));
        let reply_old = json!(existing.as_ref().map(|(v, _)| v.clone()));

        if (nx && existing.is_some()) || (xx && existing.is_none()) {
            return Ok(if get { reply_old } else { Json::Null });
        }

        let expires_at = match (ttl, keep_ttl) {
            (Some(d), _) => Some(Instant::now() + d),
            (None, true) => existing.and_then(|(_, at)| at),
            (None, false) => None,
        };
        data.insert(key.to_string(), Entry { value, expires_at });

        Ok(if get { reply_old } else { json!("OK") })
    }
}

#[async_trait]
impl HttpTransport for MemoryTransport {
    async fn send(&self, request: Request<Bytes>) -> Result<Response<Bytes>, BoxError> {
        self.seen.lock().unwrap().push(Recorded::from_request(&request));

        let authorized = request
            .headers()
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map_or(false, |v| v == format!("Bearer {}", TOKEN));

        let (status, body) = if !authorized {
            (StatusCode::UNAUTHORIZED, json!({ "error": "Unauthorized" }))
        } else {
            match Self::parse_command(&request).and_then(|cmd| self.execute(&cmd)) {
                Ok(result) => (StatusCode::OK, json!({ "result": result })),
                Err(error) => (StatusCode::BAD_REQUEST, json!({ "error": error })),
            }
        };

        Ok(Response::builder()
            .status(status)
            .body(Bytes::from(body.to_string()))?)
    }
}

pub fn config(edge: Option<&str>) -> ClientConfig {
    ClientConfig {
        endpoint: PRIMARY.to_string(),
        edge_endpoint: edge.map(str::to_string),
        token: TOKEN.to_string(),
        ..Default::default()
    }
}

pub fn client_with(transport: Arc<dyn HttpTransport>, edge: Option<&str>) -> Client {
    Client::with_transport(config(edge), transport).expect("valid test config")
}
