//! Scripted PDF engine shared by the integration tests.
//!
//! A "document" is UTF-8 text: a `%FAKE` header line followed by one line
//! per page. Each page line is a `;`-separated list of directives and text:
//!
//! | Directive  | Effect when the page is loaded                 |
//! |------------|------------------------------------------------|
//! | `SLEEP=ms` | block the worker for `ms` milliseconds         |
//! | `FAIL`     | return an engine error                         |
//! | `PANIC`    | panic inside the engine                        |
//! | `TABLE`    | report one ruled table above the text block    |
//!
//! Anything else is the page's body text.

#![allow(dead_code)]

use pdf2md_server::{
    AppState, EngineError, PdfDocument, PdfEngine, PdfPage, Rect, ServiceConfig, TableRegion,
    TableStrategy, TextBlock, WorkerPool,
};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

const HEADER: &str = "%FAKE";

/// Build a fake document with one page per entry.
pub fn fake_pdf(pages: &[&str]) -> Vec<u8> {
    let mut out = String::from(HEADER);
    for page in pages {
        out.push('\n');
        out.push_str(page);
    }
    out.into_bytes()
}

/// Engine double with call counters.
#[derive(Debug, Default)]
pub struct FakeEngine {
    pub opens: AtomicUsize,
    pub page_loads: AtomicUsize,
    pub extracts: AtomicUsize,
}

impl FakeEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn page_loads(&self) -> usize {
        self.page_loads.load(Ordering::SeqCst)
    }

    pub fn extracts(&self) -> usize {
        self.extracts.load(Ordering::SeqCst)
    }
}

impl PdfEngine for FakeEngine {
    type Document<'a> = FakeDocument<'a>;

    fn open<'a>(&'a self, bytes: &'a [u8]) -> Result<FakeDocument<'a>, EngineError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let text = std::str::from_utf8(bytes).map_err(|e| EngineError::Open(e.to_string()))?;
        let mut lines = text.split('\n');
        if lines.next() != Some(HEADER) {
            return Err(EngineError::Open("missing %FAKE header".into()));
        }
        Ok(FakeDocument {
            engine: self,
            pages: lines.collect(),
        })
    }
}

pub struct FakeDocument<'a> {
    engine: &'a FakeEngine,
    pages: Vec<&'a str>,
}

impl PdfDocument for FakeDocument<'_> {
    type Page<'p>
        = FakePage
    where
        Self: 'p;

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page(&self, index: usize) -> Result<FakePage, EngineError> {
        self.engine.page_loads.fetch_add(1, Ordering::SeqCst);
        let spec = self.pages.get(index).ok_or_else(|| EngineError::Page {
            page: index + 1,
            detail: "no such page".into(),
        })?;

        let mut page = FakePage::default();
        let mut text = Vec::new();
        for token in spec.split(';').map(str::trim).filter(|t| !t.is_empty()) {
            if let Some(ms) = token.strip_prefix("SLEEP=") {
                let ms = ms.parse().unwrap_or(0);
                std::thread::sleep(Duration::from_millis(ms));
            } else if token == "FAIL" {
                return Err(EngineError::Page {
                    page: index + 1,
                    detail: "scripted failure".into(),
                });
            } else if token == "PANIC" {
                panic!("scripted panic");
            } else if token == "TABLE" {
                page.table = true;
            } else {
                text.push(token);
            }
        }
        page.text = text.join(" ");
        Ok(page)
    }

    fn extract_page(&self, index: usize) -> Result<Vec<u8>, EngineError> {
        self.engine.extracts.fetch_add(1, Ordering::SeqCst);
        let spec = self.pages.get(index).ok_or_else(|| EngineError::Extract {
            page: index + 1,
            detail: "no such page".into(),
        })?;
        Ok(fake_pdf(&[*spec]))
    }
}

#[derive(Debug, Default)]
pub struct FakePage {
    table: bool,
    text: String,
}

pub const TABLE_BBOX: Rect = Rect {
    x0: 50.0,
    y0: 100.0,
    x1: 500.0,
    y1: 200.0,
};

impl PdfPage for FakePage {
    fn rect(&self) -> Rect {
        Rect::new(0.0, 0.0, 612.0, 792.0)
    }

    fn find_tables(
        &self,
        _region: &Rect,
        strategy: TableStrategy,
    ) -> Result<Vec<TableRegion>, EngineError> {
        if !self.table || !matches!(strategy, TableStrategy::Lines { .. }) {
            return Ok(Vec::new());
        }
        Ok(vec![TableRegion {
            bbox: TABLE_BBOX,
            cells: vec![
                vec![Some("Year".into()), None, Some("Revenue".into())],
                vec![Some("2023".into()), None, Some("1,234,567".into())],
            ],
        }])
    }

    fn text_blocks(&self, _region: &Rect) -> Result<Vec<TextBlock>, EngineError> {
        let mut blocks = Vec::new();
        if self.table {
            // Text pdfium would also report inside the table grid.
            blocks.push(TextBlock {
                bbox: Rect::new(55.0, 110.0, 300.0, 130.0),
                text: "Year Revenue 2023 1,234,567".into(),
            });
        }
        if !self.text.is_empty() {
            blocks.push(TextBlock {
                bbox: Rect::new(50.0, 300.0, 560.0, 340.0),
                text: self.text.clone(),
            });
        }
        Ok(blocks)
    }
}

/// Config with tight limits for tests.
pub fn test_config() -> ServiceConfig {
    ServiceConfig::builder()
        .max_workers(4)
        .max_pages(5)
        .rate_limit("100/minute")
        .build()
        .unwrap()
}

/// Start a server on an ephemeral port and return its address.
pub async fn spawn_server(config: ServiceConfig, engine: Arc<FakeEngine>) -> SocketAddr {
    let pool = Arc::new(WorkerPool::new(config.max_workers).unwrap());
    let state = AppState::new(&config, engine, pool);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        pdf2md_server::serve(listener, state, std::future::pending())
            .await
            .unwrap();
    });
    addr
}
