use std::sync::{Arc, OnceLock};

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request},
    Router,
};
use rust_xlsxwriter::Workbook;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::api;
use crate::core::{config::Settings, state::AppState};
use crate::services::result_store::ResultStore;

const MULTIPART_BOUNDARY: &str = "marksheet-test-boundary";
const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub(crate) const STUDENT_HEADERS: &[&str] = &["HallTicket", "StudentName", "CollegeName", "Course"];
pub(crate) const MARK_HEADERS: &[&str] = &[
    "HallTicket",
    "SubjectCode",
    "SubjectName",
    "ExtMarks",
    "ExtFlag",
    "IntMarks",
    "IntFlag",
    "Result",
];

pub(crate) struct TestContext {
    pub(crate) state: AppState,
    pub(crate) app: Router,
    _guard: OwnedMutexGuard<()>,
}

pub(crate) async fn env_lock() -> OwnedMutexGuard<()> {
    static LOCK: OnceLock<Arc<Mutex<()>>> = OnceLock::new();
    let lock = LOCK.get_or_init(|| Arc::new(Mutex::new(()))).clone();
    lock.lock_owned().await
}

pub(crate) fn set_test_env() {
    std::env::set_var("MARKSHEET_ENV", "test");
    std::env::set_var("PROMETHEUS_ENABLED", "0");
    for key in [
        "MARKSHEET_HOST",
        "MARKSHEET_PORT",
        "PROJECT_NAME",
        "VERSION",
        "BACKEND_CORS_ORIGINS",
        "MAX_UPLOAD_SIZE_MB",
        "ALLOWED_WORKBOOK_EXTENSIONS",
    ] {
        std::env::remove_var(key);
    }
}

pub(crate) async fn setup_test_context() -> TestContext {
    setup_test_context_with_env(&[]).await
}

pub(crate) async fn setup_test_context_with_env(overrides: &[(&str, &str)]) -> TestContext {
    let guard = env_lock().await;
    set_test_env();
    for (key, value) in overrides {
        std::env::set_var(key, value);
    }

    let settings = Settings::load().expect("settings");
    let state = AppState::new(settings, ResultStore::new());
    let app = api::router::router(state.clone());

    TestContext { state, app, _guard: guard }
}

pub(crate) fn upload_request(filename: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = Vec::with_capacity(bytes.len() + 256);
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {XLSX_CONTENT_TYPE}\r\n\r\n").as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri("/students/upload")
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"))
        .body(Body::from(body))
        .expect("request body")
}

pub(crate) fn get_request(uri: &str) -> Request<Body> {
    Request::builder().method(Method::GET).uri(uri).body(Body::empty()).expect("request body")
}

pub(crate) async fn read_json(response: axum::response::Response<Body>) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("response body");
    serde_json::from_slice(&body).unwrap_or_else(|err| {
        let body_text = String::from_utf8_lossy(&body);
        panic!("json parse: {err}; body: {body_text}");
    })
}

/// A cell written into a fixture workbook. Empty text is left blank.
#[derive(Debug, Clone)]
pub(crate) enum FixtureCell {
    Text(String),
    Number(f64),
}

impl From<&str> for FixtureCell {
    fn from(value: &str) -> Self {
        FixtureCell::Text(value.to_string())
    }
}

impl From<f64> for FixtureCell {
    fn from(value: f64) -> Self {
        FixtureCell::Number(value)
    }
}

/// Builds `.xlsx` bytes in memory for workbook and upload tests.
#[derive(Default)]
pub(crate) struct WorkbookBuilder {
    sheets: Vec<(String, Vec<String>, Vec<Vec<FixtureCell>>)>,
}

impl WorkbookBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn sheet(
        mut self,
        name: &str,
        headers: &[&str],
        rows: Vec<Vec<FixtureCell>>,
    ) -> Self {
        let headers = headers.iter().map(|header| header.to_string()).collect();
        self.sheets.push((name.to_string(), headers, rows));
        self
    }

    pub(crate) fn build(self) -> Vec<u8> {
        let mut workbook = Workbook::new();
        for (name, headers, rows) in self.sheets {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(&name).expect("sheet name");
            for (col, header) in headers.iter().enumerate() {
                worksheet.write_string(0, col as u16, header).expect("write header");
            }
            for (row_idx, row) in rows.iter().enumerate() {
                let row_num = row_idx as u32 + 1;
                for (col, cell) in row.iter().enumerate() {
                    match cell {
                        FixtureCell::Text(text) if text.is_empty() => {}
                        FixtureCell::Text(text) => {
                            worksheet.write_string(row_num, col as u16, text).expect("write cell");
                        }
                        FixtureCell::Number(n) => {
                            worksheet.write_number(row_num, col as u16, *n).expect("write cell");
                        }
                    }
                }
            }
        }
        workbook.save_to_buffer().expect("save workbook")
    }
}

/// Student rows are `(hall ticket, name)`; mark rows are
/// `(hall ticket, subject code, ext flag, int flag)`.
pub(crate) fn results_workbook(students: &[(&str, &str)], marks: &[(&str, &str, &str, &str)]) -> Vec<u8> {
    let student_rows = students
        .iter()
        .map(|(ticket, name)| {
            vec![(*ticket).into(), (*name).into(), "City College".into(), "BSc".into()]
        })
        .collect();
    let mark_rows = marks
        .iter()
        .map(|(ticket, code, ext_flag, int_flag)| {
            vec![
                (*ticket).into(),
                (*code).into(),
                format!("Subject {code}").as_str().into(),
                62.0.into(),
                (*ext_flag).into(),
                21.0.into(),
                (*int_flag).into(),
                "PASS".into(),
            ]
        })
        .collect();

    WorkbookBuilder::new()
        .sheet("Student", STUDENT_HEADERS, student_rows)
        .sheet("Marks", MARK_HEADERS, mark_rows)
        .build()
}
