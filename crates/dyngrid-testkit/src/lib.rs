// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use dyngrid_app::{FieldConfig, FieldType, GridColumn, GridPage, Record};
use serde_json::{Value, json};
use std::io::Read;
use std::path::PathBuf;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use time::macros::format_description;
use time::{Date, Month};
use tiny_http::{Header, Response, Server};

const FIRST_NAMES: [&str; 16] = [
    "Avery", "Jordan", "Taylor", "Riley", "Morgan", "Casey", "Alex", "Quinn", "Parker", "Drew",
    "Kai", "Elliot", "Robin", "Cameron", "Hayden", "Rowan",
];
const LAST_NAMES: [&str; 12] = [
    "Walker", "Martin", "Hill", "Evans", "Lopez", "Gray", "Ward", "Young", "Diaz", "Reed",
    "Campbell", "Turner",
];
const JOBS: [&str; 10] = [
    "Pilot",
    "Copilot",
    "Chef",
    "Engineer",
    "Nurse",
    "Pharmacist",
    "Plumber",
    "Architect",
    "Librarian",
    "Carpenter",
];
const MONTHS: [Month; 12] = [
    Month::January,
    Month::February,
    Month::March,
    Month::April,
    Month::May,
    Month::June,
    Month::July,
    Month::August,
    Month::September,
    Month::October,
    Month::November,
    Month::December,
];

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

/// Seeded generator of people rows for the sample `customers` table.
#[derive(Debug, Clone)]
pub struct GridFaker {
    rng: DeterministicRng,
}

impl GridFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
        }
    }

    pub fn person(&mut self, id: i64) -> Record {
        let name = format!(
            "{} {}",
            self.pick(&FIRST_NAMES),
            self.pick(&LAST_NAMES)
        );
        let age = 18 + self.rng.int_n(60) as i64;
        let birthday = self.birthday();
        let job = self.pick(&JOBS);
        Record::new(id)
            .with("name", name)
            .with("age", age)
            .with("birthday", birthday)
            .with("job", job)
    }

    pub fn people(&mut self, count: usize) -> Vec<Record> {
        (1..=count as i64).map(|id| self.person(id)).collect()
    }

    fn birthday(&mut self) -> String {
        let year = 1950 + self.rng.int_n(55) as i32;
        let month = MONTHS[self.rng.int_n(MONTHS.len())];
        let day = 1 + self.rng.int_n(28) as u8;
        Date::from_calendar_date(year, month, day)
            .ok()
            .and_then(|date| date.format(&format_description!("[year]-[month]-[day]")).ok())
            .unwrap_or_else(|| "2000-01-01".to_owned())
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }
}

pub fn jobs() -> &'static [&'static str] {
    &JOBS
}

/// Field config of the sample `customers` table.
pub fn sample_fields() -> Vec<FieldConfig> {
    vec![
        FieldConfig::new("id", "ID", FieldType::Number),
        FieldConfig::new("name", "Name", FieldType::Text)
            .mandatory()
            .with_operators("Contains,Equals,GSearch"),
        FieldConfig::new("age", "Age", FieldType::Number).with_operators("Equals,Greater,Less"),
        FieldConfig::new("birthday", "Birthday", FieldType::Date)
            .mandatory()
            .with_operators("Equals,Before,After"),
        FieldConfig::new("job", "Job", FieldType::Text).with_operators("Contains,Equals"),
    ]
}

pub fn sample_columns() -> Vec<GridColumn> {
    vec![
        GridColumn::new("ID", "id"),
        GridColumn::new("Name", "name"),
        GridColumn::new("Age", "age"),
        GridColumn::new("Birthday", "birthday"),
        GridColumn::new("Job", "job"),
    ]
}

pub fn sample_page(rows: usize) -> GridPage {
    GridPage {
        columns: sample_columns(),
        rows: GridFaker::new(7).people(rows),
        total_count: Some(rows as u64),
    }
}

/// `{fields: [...]}` as the backend sends it.
pub fn fields_json(fields: &[FieldConfig]) -> Value {
    json!({ "fields": fields })
}

/// `{columns, data, total_count}` as the backend sends it.
pub fn page_json(page: &GridPage) -> Value {
    let columns: Vec<Value> = page
        .columns
        .iter()
        .map(|column| json!([column.label, column.field]))
        .collect();
    let mut body = json!({ "columns": columns, "data": page.rows });
    if let Some(total) = page.total_count {
        body["total_count"] = json!(total);
    }
    body
}

pub fn temp_db_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let db_path = dir.path().join("dyngrid.db");
    Ok((dir, db_path))
}

/// One scripted request/response pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub method: String,
    pub url: String,
    pub status: u16,
    pub body: String,
}

impl Exchange {
    pub fn new(method: &str, url: &str, body: Value) -> Self {
        Self {
            method: method.to_owned(),
            url: url.to_owned(),
            status: 200,
            body: body.to_string(),
        }
    }

    pub fn get(url: &str, body: Value) -> Self {
        Self::new("GET", url, body)
    }

    pub fn post(url: &str, body: Value) -> Self {
        Self::new("POST", url, body)
    }

    pub fn delete(url: &str, body: Value) -> Self {
        Self::new("DELETE", url, body)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_raw_body(mut self, body: &str) -> Self {
        self.body = body.to_owned();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub url: String,
    pub body: String,
}

impl RecordedRequest {
    pub fn json(&self) -> Result<Value> {
        serde_json::from_str(&self.body)
            .with_context(|| format!("decode body of {} {}", self.method, self.url))
    }
}

/// Backend that answers a fixed script in order, then stops.
pub struct MockBackend {
    base_url: String,
    handle: JoinHandle<Result<Vec<RecordedRequest>>>,
}

impl MockBackend {
    pub fn start(script: Vec<Exchange>) -> Result<Self> {
        let server =
            Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
        let base_url = format!("http://{}", server.server_addr());
        let handle = thread::spawn(move || serve_script(&server, script));
        Ok(Self { base_url, handle })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Waits for the script to complete and returns what was received.
    pub fn finish(self) -> Result<Vec<RecordedRequest>> {
        self.handle
            .join()
            .map_err(|_| anyhow!("mock backend thread panicked"))?
    }
}

fn serve_script(server: &Server, script: Vec<Exchange>) -> Result<Vec<RecordedRequest>> {
    let mut recorded = Vec::with_capacity(script.len());
    for exchange in script {
        let Some(mut request) = server
            .recv_timeout(Duration::from_secs(5))
            .context("receive request")?
        else {
            bail!("expected {} {}, got no request", exchange.method, exchange.url);
        };

        let method = request.method().to_string();
        let url = request.url().to_owned();
        let mut body = String::new();
        request
            .as_reader()
            .read_to_string(&mut body)
            .context("read request body")?;

        if method != exchange.method || url != exchange.url {
            let _ = request.respond(Response::from_string("unexpected request").with_status_code(500));
            bail!(
                "expected {} {}, got {method} {url}",
                exchange.method,
                exchange.url
            );
        }

        let header = Header::from_bytes("Content-Type", "application/json")
            .map_err(|_| anyhow!("build content type header"))?;
        let response = Response::from_string(exchange.body)
            .with_status_code(exchange.status)
            .with_header(header);
        request.respond(response).context("send mock response")?;
        recorded.push(RecordedRequest { method, url, body });
    }
    Ok(recorded)
}
