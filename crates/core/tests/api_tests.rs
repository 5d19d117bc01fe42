//! Library API integration tests
use std::time::Duration;

use gleaner_core::urls::{domain_of, resolve};
use gleaner_core::*;
use rstest::rstest;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn get_fixture_path(name: &str) -> String {
    format!("../../tests/fixtures/{}", name)
}

fn catalogue_html() -> String {
    std::fs::read_to_string(get_fixture_path("catalogue.html")).unwrap()
}

fn fast_config() -> ScrapeConfig {
    ScrapeConfig::builder()
        .retry(RetryPolicy {
            backoff_factor: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
            ..RetryPolicy::default()
        })
        .build()
}

/// Builds one record per `.product` block in the catalogue fixture.
fn product_records(html: &str) -> Vec<Record> {
    let doc = Document::parse(html).expect("should parse");
    doc.select(".product")
        .unwrap()
        .iter()
        .map(|product| {
            let field = |selector: &str| product.select(selector).unwrap().first().map(Element::clean_text);
            Record::new()
                .with("sku", product.attr("data-sku"))
                .with("name", field(".name"))
                .with("price", field(".price").as_deref().and_then(clean_price))
                .with("category", field(".category"))
        })
        .collect()
}

#[test]
fn test_extract_text_from_fixture() {
    let html = catalogue_html();
    let extraction =
        extract_items(&html, "https://shop.example.com/", ".product .name", None, &ExtractConfig::default())
            .expect("should extract");

    let names: Vec<_> = extraction.items.iter().filter_map(ExtractedItem::text_value).collect();
    assert_eq!(names, ["Hex Bolt", "Lock Nut", "Cordless Drill"]);
    assert_eq!(extraction.skipped, 0);
}

#[test]
fn test_extract_images_skips_missing_src() {
    let html = catalogue_html();
    let base = "https://shop.example.com/catalogue";
    let extraction =
        extract_items(&html, base, ".product img", Some("src"), &ExtractConfig::default()).expect("should extract");

    let srcs: Vec<_> = extraction.items.iter().filter_map(ExtractedItem::attr_value).collect();
    assert_eq!(srcs, ["https://shop.example.com/img/bolt.png", "https://shop.example.com/img/nut.png"]);
    assert_eq!(extraction.skipped, 1);

    let strict = extract_items(&html, base, ".product img", Some("src"), &ExtractConfig { strict: true });
    assert!(matches!(strict, Err(GleanerError::MissingAttribute { index: 2, .. })));
}

#[test]
fn test_extract_table_from_fixture() {
    let html = catalogue_html();
    let table = extract_table(&html, "#stock", &ExtractConfig::default()).expect("should extract");

    assert_eq!(table.headers, ["SKU", "Name", "Price"]);
    assert_eq!(table.records.len(), 3);
    assert_eq!(table.skipped, 1);
    assert_eq!(table.records[1].get("Name"), Some(&Value::from("Lock Nut")));

    let stats = get_statistics(&table.records, "Price").expect("prices are numeric");
    assert_eq!(stats.count, 3);
    assert_eq!(stats.median, 0.25);
}

#[tokio::test]
async fn test_end_to_end_links() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(catalogue_html()).insert_header("content-type", "text/html"),
        )
        .mount(&server)
        .await;

    let outcome =
        fetch_and_extract(&server.uri(), "a.link", Some("href"), &fast_config()).await.expect("should scrape");

    assert_eq!(outcome.items.len(), 3);
    let expected = format!("{}/p", server.uri());
    assert!(outcome.items.iter().all(|item| item.attr_value() == Some(expected.as_str())));

    let summary = outcome.summary();
    assert_eq!(summary.count, 3);
    assert_eq!(summary.attr_items, 3);
    assert_eq!(summary.text_items, 0);
    assert_eq!(summary.top_domains.len(), 1);
    assert_eq!(summary.top_domains[0].1, 3);
}

#[tokio::test]
async fn test_end_to_end_retry_then_export() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/catalogue"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/catalogue"))
        .respond_with(ResponseTemplate::new(200).set_body_string(catalogue_html()))
        .mount(&server)
        .await;

    let scraper = Scraper::connect(&server.uri(), fast_config()).await.expect("should connect");
    let outcome = scraper.scrape_url("/catalogue", ".product .name", None).await.expect("should scrape");

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("data/output.csv");
    save_items(&outcome.items, &out, ExportFormat::Csv).unwrap();

    let back = read_items(&out, ExportFormat::Csv).unwrap();
    assert_eq!(back, outcome.items);
}

#[tokio::test]
async fn test_end_to_end_robots_denial() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /\n"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(catalogue_html()))
        .expect(0)
        .mount(&server)
        .await;

    let result = fetch_and_extract(&server.uri(), "a", None, &fast_config()).await;
    assert!(matches!(result, Err(ref e) if e.is_permission()));
}

#[tokio::test]
async fn test_end_to_end_ignore_robots() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /\n"))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(catalogue_html()))
        .mount(&server)
        .await;

    let config = ScrapeConfig::builder().respect_robots(false).build();
    let outcome = fetch_and_extract(&server.uri(), "a.link", None, &config).await.expect("robots not consulted");

    assert_eq!(outcome.items.len(), 3);
}

#[test]
fn test_records_pipeline_report() {
    let records = product_records(&catalogue_html());
    assert_eq!(records.len(), 3);

    let check = check_required_fields(&records, &["sku", "name", "price"]);
    assert!(check.all_valid);

    let groups = group_by(&records, "category");
    assert_eq!(groups[&Value::from("fasteners")].len(), 2);
    assert_eq!(groups[&Value::from("tools")].len(), 1);

    let cheap = filter_data(&records, "price", &FilterSpec::matches(|v| v.as_f64().is_some_and(|p| p < 1.0)));
    assert_eq!(cheap.len(), 2);

    let report = serde_json::to_value(generate_report(&records, Some("price"))).unwrap();
    assert_eq!(report["total_records"], 3);
    assert_eq!(report["fields"], serde_json::json!(["sku", "name", "price", "category"]));
    assert_eq!(report["price_stats"]["max"], 89.99);
    assert_eq!(report["price_stats"]["median"], 0.25);
}

#[rstest]
#[case(ExportFormat::Csv)]
#[case(ExportFormat::Json)]
fn test_export_round_trip(#[case] format: ExportFormat) {
    let records = product_records(&catalogue_html());
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(format!("out/products.{format}"));

    export_records(&records, &path, format).unwrap();
    let back = read_records(&path, format).unwrap();

    assert_eq!(back.len(), records.len());
    for (read, written) in back.iter().zip(&records) {
        for (field, value) in written.iter() {
            let read_value = read.get(field).expect("field survives export");
            assert_eq!(read_value.to_string(), value.to_string(), "field {field}");
        }
    }
}

#[test]
fn test_dedup_then_count() {
    let records: Vec<Record> = [(1, "a"), (2, "b"), (1, "c")]
        .into_iter()
        .map(|(id, v)| Record::new().with("id", id).with("v", v))
        .collect();

    let unique = remove_duplicates(records, Some("id"));

    assert_eq!(
        unique,
        vec![Record::new().with("id", 1).with("v", "a"), Record::new().with("id", 2).with("v", "b")]
    );
    assert_eq!(count_occurrences(&unique, "id").len(), 2);
}

#[rstest]
#[case("https://www.example.com/shop/", "item/42")]
#[case("https://example.com/a/b", "../c?x=1")]
#[case("http://example.com:8080/", "/root")]
fn test_relative_resolution_keeps_domain(#[case] base: &str, #[case] relative: &str) {
    let resolved = resolve(base, relative).unwrap();
    assert_eq!(domain_of(resolved.as_str()), domain_of(base));
}

#[rstest]
#[case("  Hello   \n world ")]
#[case("\tTabs\tand\u{a0}spaces ")]
#[case("")]
fn test_clean_text_idempotent(#[case] input: &str) {
    let once = clean_text(input);
    assert_eq!(clean_text(&once), once);
}

#[test]
fn test_clean_price_examples() {
    assert_eq!(clean_price("$19.99"), Some(19.99));
    assert_eq!(clean_price("no digits"), None);
}

#[test]
fn test_empty_statistics_is_none() {
    let records = vec![Record::new().with("price", "TBD")];
    assert_eq!(get_statistics(&records, "price"), None);
}
