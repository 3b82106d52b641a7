//! End-to-end pipeline, cache and export scenarios with stub providers

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use tempfile::TempDir;

use trendradar::cache::{FetchResult, ManualClock};
use trendradar::config::CacheTtls;
use trendradar::data::{
    ArticleViews, Credentials, Headline, Post, SeriesPoint, SignalSource, SourceError, SourceId,
    TimeSeries,
};
use trendradar::export::{self, csv, ReportBuilder, Section};
use trendradar::pipeline::{Pipeline, Sources};

/// How a stub provider answers
#[derive(Clone)]
enum Reply<T> {
    Data(T),
    Nothing,
    Error,
    Panic,
}

/// Stub provider that counts its calls
struct Stub<T> {
    id: SourceId,
    reply: Reply<T>,
    calls: AtomicUsize,
}

impl<T> Stub<T> {
    fn new(id: SourceId, reply: Reply<T>) -> Arc<Self> {
        Arc::new(Self {
            id,
            reply,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<T: Clone + Send + Sync + 'static> SignalSource for Stub<T> {
    type Output = T;

    fn id(&self) -> SourceId {
        self.id
    }

    async fn fetch(
        &self,
        topic: &str,
        _credentials: Option<&Credentials>,
    ) -> Result<Option<T>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Reply::Data(data) => Ok(Some(data.clone())),
            Reply::Nothing => Ok(None),
            Reply::Error => Err(SourceError::Status(503)),
            Reply::Panic => panic!("provider exploded for {}", topic),
        }
    }
}

struct Harness {
    pipeline: Pipeline,
    clock: Arc<ManualClock>,
    trends: Arc<Stub<TimeSeries>>,
    news: Arc<Stub<Vec<Headline>>>,
    pageviews: Arc<Stub<ArticleViews>>,
    social: Arc<Stub<Vec<Post>>>,
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
}

fn bitcoin_series() -> TimeSeries {
    TimeSeries::new(vec![
        SeriesPoint { date: day(1), value: 40 },
        SeriesPoint { date: day(2), value: 55 },
        SeriesPoint { date: day(3), value: 60 },
    ])
}

fn harness(
    trends: Reply<TimeSeries>,
    news: Reply<Vec<Headline>>,
    pageviews: Reply<ArticleViews>,
    social: Reply<Vec<Post>>,
    ttls: CacheTtls,
) -> Harness {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 1, 4, 9, 0, 0).unwrap(),
    ));
    let trends = Stub::new(SourceId::SearchInterest, trends);
    let news = Stub::new(SourceId::News, news);
    let pageviews = Stub::new(SourceId::Pageviews, pageviews);
    let social = Stub::new(SourceId::Social, social);

    let sources = Sources {
        trends: trends.clone(),
        news: news.clone(),
        pageviews: pageviews.clone(),
        social: social.clone(),
    };
    let pipeline = Pipeline::from_sources(
        sources,
        ttls,
        clock.clone(),
        Some(Duration::from_secs(5)),
    );

    Harness {
        pipeline,
        clock,
        trends,
        news,
        pageviews,
        social,
    }
}

/// Every source cached for an hour
fn hour_ttls() -> CacheTtls {
    CacheTtls {
        trends: 3600,
        news: 3600,
        pageviews: 3600,
        social: 3600,
    }
}

fn posts() -> Vec<Post> {
    vec![Post {
        author: "bob.bsky.social".to_string(),
        text: "Bitcoin steigt".to_string(),
    }]
}

fn headlines() -> Vec<Headline> {
    vec![Headline {
        title: "Bitcoin klettert".to_string(),
        link: "https://example.com/1".to_string(),
        published_at: Some("Wed, 03 Jan 2024 10:00:00 GMT".to_string()),
    }]
}

fn views() -> ArticleViews {
    ArticleViews {
        article: "Bitcoin".to_string(),
        series: TimeSeries::new(vec![SeriesPoint { date: day(1), value: 1200 }]),
    }
}

#[tokio::test]
async fn test_repeat_within_ttl_returns_same_payload_for_every_source() {
    let h = harness(
        Reply::Data(bitcoin_series()),
        Reply::Data(headlines()),
        Reply::Data(views()),
        Reply::Data(posts()),
        hour_ttls(),
    );
    let creds = Credentials::new("alice.bsky.social", "pw");

    let first = h.pipeline.run("Bitcoin", Some(&creds)).await;
    h.clock.advance(Duration::from_secs(60));
    let second = h.pipeline.run("Bitcoin", Some(&creds)).await;

    match (&first.trends, &second.trends) {
        (FetchResult::Data(a), FetchResult::Data(b)) => assert!(Arc::ptr_eq(a, b)),
        _ => panic!("expected search interest data"),
    }
    match (&first.news, &second.news) {
        (FetchResult::Data(a), FetchResult::Data(b)) => assert!(Arc::ptr_eq(a, b)),
        _ => panic!("expected headlines"),
    }
    match (&first.pageviews, &second.pageviews) {
        (FetchResult::Data(a), FetchResult::Data(b)) => assert!(Arc::ptr_eq(a, b)),
        _ => panic!("expected pageviews"),
    }
    match (&first.social, &second.social) {
        (FetchResult::Data(a), FetchResult::Data(b)) => assert!(Arc::ptr_eq(a, b)),
        _ => panic!("expected posts"),
    }

    assert_eq!(h.trends.calls(), 1);
    assert_eq!(h.news.calls(), 1);
    assert_eq!(h.pageviews.calls(), 1);
    assert_eq!(h.social.calls(), 1);
}

#[tokio::test]
async fn test_fetch_after_ttl_calls_provider_again() {
    let h = harness(
        Reply::Data(bitcoin_series()),
        Reply::Data(headlines()),
        Reply::Data(views()),
        Reply::Data(posts()),
        hour_ttls(),
    );
    let creds = Credentials::new("alice.bsky.social", "pw");

    let first = h.pipeline.run("Bitcoin", Some(&creds)).await;
    h.clock.advance(Duration::from_secs(3600));
    let second = h.pipeline.run("Bitcoin", Some(&creds)).await;

    assert_eq!(h.trends.calls(), 2);
    assert_eq!(h.news.calls(), 2);
    assert_eq!(h.pageviews.calls(), 2);
    assert_eq!(h.social.calls(), 2);

    // The new payload replaced the old entry
    match (&first.trends, &second.trends) {
        (FetchResult::Data(a), FetchResult::Data(b)) => assert!(!Arc::ptr_eq(a, b)),
        _ => panic!("expected search interest data"),
    }
    let third = h.pipeline.search_interest("Bitcoin").await;
    match (&second.trends, &third) {
        (FetchResult::Data(a), FetchResult::Data(b)) => assert!(Arc::ptr_eq(a, b)),
        _ => panic!("expected search interest data"),
    }
    assert_eq!(h.trends.calls(), 2);
}

#[tokio::test]
async fn test_failures_are_never_cached() {
    let h = harness(
        Reply::Error,
        Reply::Error,
        Reply::Panic,
        Reply::Error,
        hour_ttls(),
    );
    let creds = Credentials::new("alice.bsky.social", "pw");

    for _ in 0..2 {
        let snapshot = h.pipeline.run("Bitcoin", Some(&creds)).await;
        assert!(snapshot.trends.is_failed());
        assert!(snapshot.news.is_failed());
        assert!(snapshot.pageviews.is_failed());
        assert!(snapshot.social.is_failed());
    }

    assert_eq!(h.trends.calls(), 2);
    assert_eq!(h.news.calls(), 2);
    assert_eq!(h.pageviews.calls(), 2);
    assert_eq!(h.social.calls(), 2);
}

#[tokio::test]
async fn test_empty_results_are_cached() {
    let h = harness(
        Reply::Nothing,
        Reply::Nothing,
        Reply::Nothing,
        Reply::Nothing,
        hour_ttls(),
    );
    let creds = Credentials::new("alice.bsky.social", "pw");

    let first = h.pipeline.run("zzzz", Some(&creds)).await;
    let second = h.pipeline.run("zzzz", Some(&creds)).await;

    assert!(first.trends.is_empty() && second.trends.is_empty());
    assert!(second.news.is_empty());
    assert!(second.pageviews.is_empty());
    assert!(second.social.is_empty());
    assert_eq!(h.trends.calls(), 1);
    assert_eq!(h.news.calls(), 1);
    assert_eq!(h.pageviews.calls(), 1);
    assert_eq!(h.social.calls(), 1);
}

#[tokio::test]
async fn test_missing_social_credentials_never_reach_the_provider() {
    let h = harness(
        Reply::Nothing,
        Reply::Nothing,
        Reply::Nothing,
        Reply::Data(posts()),
        hour_ttls(),
    );

    for topic in ["Bitcoin", "", "   ", "Angela Merkel", "#KI", "💥"] {
        let result = h.pipeline.social_posts(topic, None).await;
        assert!(result.is_empty(), "topic {:?} should be empty", topic);
    }
    h.pipeline.run("Bitcoin", None).await;

    assert_eq!(h.social.calls(), 0);
}

#[tokio::test]
async fn test_report_with_one_populated_source_has_one_section() {
    let h = harness(
        Reply::Data(bitcoin_series()),
        Reply::Nothing,
        Reply::Error,
        Reply::Nothing,
        hour_ttls(),
    );

    let snapshot = h.pipeline.run("Bitcoin", None).await;
    let report = ReportBuilder::from_snapshot(&snapshot, None).build();

    assert_eq!(report.topic, "Bitcoin");
    assert_eq!(report.sections.len(), 1);
    assert!(matches!(report.sections[0], Section::SearchInterest { .. }));
    let pdf = export::pdf::render(&report).expect("render should succeed");
    assert!(pdf.starts_with(b"%PDF"));
}

#[tokio::test]
async fn test_bitcoin_search_interest_scenario() {
    let h = harness(
        Reply::Data(bitcoin_series()),
        Reply::Nothing,
        Reply::Nothing,
        Reply::Nothing,
        CacheTtls::default(),
    );

    let first = h.pipeline.search_interest("Bitcoin").await;
    let series = first.data().expect("search interest should be Ok");
    assert_eq!(series, &bitcoin_series());

    let mut snapshot = h.pipeline.run("Bitcoin", None).await;
    snapshot.trends = first.clone();
    let table = csv::to_bytes(&snapshot, SourceId::SearchInterest)
        .unwrap()
        .expect("search interest CSV should be offered");
    let text = String::from_utf8(table).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "date,value");
    assert_eq!(lines[3], "2024-01-03,60");

    h.clock.advance(Duration::from_secs(10));
    let again = h.pipeline.search_interest("Bitcoin").await;
    match (&first, &again) {
        (FetchResult::Data(a), FetchResult::Data(b)) => assert!(Arc::ptr_eq(a, b)),
        _ => panic!("expected cached data"),
    }
    assert_eq!(h.trends.calls(), 1);
}

#[tokio::test]
async fn test_failing_pageviews_scenario() {
    let h = harness(
        Reply::Nothing,
        Reply::Data(headlines()),
        Reply::Panic,
        Reply::Nothing,
        CacheTtls::default(),
    );

    let snapshot = h.pipeline.run("Quantum Foo", None).await;

    assert!(snapshot.pageviews.is_failed());
    assert!(snapshot.failure(SourceId::Pageviews).is_some());

    let report = ReportBuilder::from_snapshot(&snapshot, None).build();
    assert!(report
        .sections
        .iter()
        .all(|s| !matches!(s, Section::Pageviews { .. })));

    let offered = csv::csv_sources(&snapshot);
    assert!(!offered.contains(&SourceId::Pageviews));
    assert_eq!(offered, vec![SourceId::News]);
}

#[tokio::test]
async fn test_export_all_writes_offered_files() {
    let h = harness(
        Reply::Data(bitcoin_series()),
        Reply::Data(headlines()),
        Reply::Error,
        Reply::Nothing,
        CacheTtls::default(),
    );
    let dir = TempDir::new().expect("Failed to create temp directory");

    let snapshot = h.pipeline.run("Bitcoin", None).await;
    let outcome = export::export_all(dir.path(), &snapshot, Some("**Lage**: ruhig"))
        .expect("export should succeed");

    assert!(outcome.is_complete());
    assert_eq!(outcome.written.len(), 3);
    assert!(dir.path().join("trends_Bitcoin.csv").exists());
    assert!(dir.path().join("news_Bitcoin.csv").exists());
    assert!(dir.path().join("report_Bitcoin.pdf").exists());
    assert!(!dir.path().join("wikipedia_Bitcoin.csv").exists());
}

#[tokio::test]
async fn test_zero_ttl_always_refetches() {
    let h = harness(
        Reply::Nothing,
        Reply::Data(headlines()),
        Reply::Nothing,
        Reply::Nothing,
        CacheTtls::default(),
    );

    h.pipeline.news_headlines("Bitcoin").await;
    h.pipeline.news_headlines("Bitcoin").await;

    assert_eq!(h.news.calls(), 2);
}
