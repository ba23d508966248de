// Parser tests covering dialect detection, normalization, and rejection.

use super::*;

// ============================================================================
// Dialect detection
// ============================================================================

#[test]
fn detects_rss_root() {
    let doc = r#"<?xml version="1.0"?><rss version="2.0"><channel></channel></rss>"#;
    assert_eq!(detect_dialect(doc), Some(Dialect::Rss2));
}

#[test]
fn detects_atom_root() {
    let doc = r#"<feed xmlns="http://www.w3.org/2005/Atom"></feed>"#;
    assert_eq!(detect_dialect(doc), Some(Dialect::Atom));
}

#[test]
fn detects_job_xml_root() {
    assert_eq!(detect_dialect("<jobs></jobs>"), Some(Dialect::JobXml));
    assert_eq!(
        detect_dialect("<vacancies></vacancies>"),
        Some(Dialect::JobXml)
    );
}

#[test]
fn unknown_root_falls_back_to_generic() {
    assert_eq!(
        detect_dialect("<listings-export></listings-export>"),
        Some(Dialect::Generic)
    );
}

#[test]
fn document_without_elements_has_no_dialect() {
    assert_eq!(detect_dialect(""), None);
    assert_eq!(detect_dialect("just plain text"), None);
}

// ============================================================================
// RSS 2.0
// ============================================================================

const RSS_FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Jobs</title>
    <link>https://jobs.example.com</link>
    <description>Job feed</description>
    <item>
      <title>Senior Rust Engineer</title>
      <author>Acme Corp</author>
      <link>https://jobs.example.com/rust-1</link>
      <guid>rust-1</guid>
      <category>Engineering</category>
      <pubDate>Mon, 10 Aug 2026 09:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Data Analyst</title>
      <author>Beta Ltd</author>
      <link>https://jobs.example.com/data-2</link>
      <guid>data-2</guid>
    </item>
  </channel>
</rss>"#;

#[test]
fn rss_items_map_to_candidates() {
    let outcome = parse(RSS_FEED, None).unwrap();
    assert_eq!(outcome.jobs.len(), 2);
    assert!(outcome.failed.is_empty());

    let first = &outcome.jobs[0];
    assert_eq!(first.external_id, "rust-1");
    assert_eq!(first.title, "Senior Rust Engineer");
    assert_eq!(first.company, "Acme Corp");
    assert_eq!(
        first.application_url.as_deref(),
        Some("https://jobs.example.com/rust-1")
    );
    assert_eq!(first.category.as_deref(), Some("Engineering"));
    let published = first.published_date.unwrap();
    assert_eq!(published.to_rfc3339(), "2026-08-10T09:00:00+00:00");
}

#[test]
fn rss_item_without_pub_date_has_no_published() {
    let outcome = parse(RSS_FEED, None).unwrap();
    assert!(outcome.jobs[1].published_date.is_none());
}

#[test]
fn malformed_rss_is_a_document_error() {
    let err = parse("<rss><channel><item>", Some(Dialect::Rss2)).unwrap_err();
    assert!(matches!(err, Error::Parse(_)), "got {err:?}");
}

// ============================================================================
// Atom
// ============================================================================

const ATOM_FEED: &str = r#"<?xml version="1.0"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Jobs</title>
  <id>urn:jobs</id>
  <updated>2026-08-12T10:00:00Z</updated>
  <entry>
    <title>Backend Developer</title>
    <id>urn:job:77</id>
    <updated>2026-08-12T10:00:00Z</updated>
    <published>2026-08-11T08:30:00Z</published>
    <author><name>Gamma GmbH</name></author>
    <link href="https://jobs.example.com/77"/>
    <category term="Engineering"/>
  </entry>
</feed>"#;

#[test]
fn atom_entries_map_to_candidates() {
    let outcome = parse(ATOM_FEED, None).unwrap();
    assert_eq!(outcome.jobs.len(), 1);

    let job = &outcome.jobs[0];
    assert_eq!(job.external_id, "urn:job:77");
    assert_eq!(job.title, "Backend Developer");
    assert_eq!(job.company, "Gamma GmbH");
    assert_eq!(
        job.application_url.as_deref(),
        Some("https://jobs.example.com/77")
    );
    assert_eq!(
        job.published_date.unwrap().to_rfc3339(),
        "2026-08-11T08:30:00+00:00"
    );
}

#[test]
fn atom_entry_without_published_uses_updated() {
    let doc = r#"<feed xmlns="http://www.w3.org/2005/Atom">
      <title>Jobs</title><id>urn:jobs</id>
      <updated>2026-08-12T10:00:00Z</updated>
      <entry>
        <title>Ops Engineer</title>
        <id>urn:job:78</id>
        <updated>2026-08-12T10:00:00Z</updated>
      </entry>
    </feed>"#;

    let outcome = parse(doc, None).unwrap();
    assert_eq!(
        outcome.jobs[0].published_date.unwrap().to_rfc3339(),
        "2026-08-12T10:00:00+00:00"
    );
}

// ============================================================================
// Bespoke job XML
// ============================================================================

const JOB_XML: &str = r#"<?xml version="1.0"?>
<jobs>
  <job>
    <id>J-100</id>
    <title>Platform Engineer</title>
    <company>Delta Inc</company>
    <location>Berlin</location>
    <type>full-time</type>
    <category>Infrastructure</category>
    <salary_min>70,000</salary_min>
    <salary_max>90000</salary_max>
    <currency>EUR</currency>
    <requirements>
      <requirement>Rust</requirement>
      <requirement>SQL</requirement>
    </requirements>
    <benefits>
      <benefit>Remote work</benefit>
    </benefits>
    <url>https://jobs.example.com/J-100</url>
    <published>2026-08-01</published>
  </job>
  <job>
    <title>Untitled budget role</title>
  </job>
</jobs>"#;

#[test]
fn job_xml_collects_all_fields() {
    let outcome = parse(JOB_XML, None).unwrap();
    assert_eq!(outcome.jobs.len(), 2);

    let job = &outcome.jobs[0];
    assert_eq!(job.external_id, "J-100");
    assert_eq!(job.title, "Platform Engineer");
    assert_eq!(job.company, "Delta Inc");
    assert_eq!(job.location.as_deref(), Some("Berlin"));
    assert_eq!(job.job_type.as_deref(), Some("full-time"));
    assert_eq!(job.category.as_deref(), Some("Infrastructure"));
    assert_eq!(job.salary_min, Some(70_000.0));
    assert_eq!(job.salary_max, Some(90_000.0));
    assert_eq!(job.salary_currency.as_deref(), Some("EUR"));
    assert_eq!(job.requirements, vec!["Rust", "SQL"]);
    assert_eq!(job.benefits, vec!["Remote work"]);
    assert_eq!(
        job.application_url.as_deref(),
        Some("https://jobs.example.com/J-100")
    );
    assert_eq!(
        job.published_date.unwrap().to_rfc3339(),
        "2026-08-01T00:00:00+00:00"
    );
}

#[test]
fn job_xml_alias_element_names_are_recognized() {
    let doc = r#"<positions>
      <position>
        <reference>REF-9</reference>
        <jobtitle>QA Lead</jobtitle>
        <employer>Epsilon</employer>
        <apply_url>https://jobs.example.com/REF-9</apply_url>
      </position>
    </positions>"#;

    let outcome = parse(doc, None).unwrap();
    let job = &outcome.jobs[0];
    assert_eq!(job.external_id, "REF-9");
    assert_eq!(job.title, "QA Lead");
    assert_eq!(job.company, "Epsilon");
}

#[test]
fn cdata_content_is_extracted() {
    let doc = r#"<jobs><job>
      <id>C-1</id>
      <title><![CDATA[C++ Developer <senior>]]></title>
      <company>Zeta</company>
    </job></jobs>"#;

    let outcome = parse(doc, None).unwrap();
    assert_eq!(outcome.jobs[0].title, "C++ Developer <senior>");
}

#[test]
fn malformed_job_xml_is_a_document_error() {
    let err = parse("<jobs><job><title>Broken</jobs>", Some(Dialect::JobXml)).unwrap_err();
    assert!(matches!(err, Error::Parse(_)), "got {err:?}");
}

// ============================================================================
// Generic fallback
// ============================================================================

#[test]
fn generic_extractor_handles_unknown_roots() {
    let doc = r#"<export>
      <item>
        <title>Designer</title>
        <company>Eta Studio</company>
        <link>https://jobs.example.com/design-1</link>
      </item>
    </export>"#;

    let outcome = parse(doc, None).unwrap();
    assert_eq!(outcome.jobs.len(), 1);
    assert_eq!(outcome.jobs[0].title, "Designer");
}

#[test]
fn well_formed_document_with_no_items_is_an_empty_feed() {
    let outcome = parse("<jobs></jobs>", None).unwrap();
    assert!(outcome.jobs.is_empty());
    assert!(outcome.failed.is_empty());
}

// ============================================================================
// Normalization and rejection
// ============================================================================

#[test]
fn item_missing_title_company_and_link_is_rejected() {
    let doc = r#"<jobs>
      <job>
        <id>GHOST-1</id>
        <location>Nowhere</location>
      </job>
      <job>
        <title>Real Job</title>
        <company>Theta</company>
      </job>
    </jobs>"#;

    let outcome = parse(doc, None).unwrap();
    assert_eq!(outcome.jobs.len(), 1);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].item, "GHOST-1");
    assert_eq!(outcome.failed[0].reason, "missing required fields");
}

#[test]
fn rejected_item_without_id_is_labeled_by_position() {
    let doc = r#"<jobs>
      <job><location>Nowhere</location></job>
    </jobs>"#;

    let outcome = parse(doc, None).unwrap();
    assert_eq!(outcome.failed[0].item, "item 1");
}

#[test]
fn item_with_only_a_link_survives_with_derived_id() {
    let doc = r#"<jobs>
      <job><url>https://jobs.example.com/mystery</url></job>
    </jobs>"#;

    let outcome = parse(doc, None).unwrap();
    assert_eq!(outcome.jobs.len(), 1);
    assert_eq!(outcome.jobs[0].external_id.len(), 64, "sha-256 hex");
}

#[test]
fn derived_external_id_is_stable_across_reparses() {
    let doc = r#"<jobs>
      <job>
        <title>Repeat Role</title>
        <company>Iota</company>
        <published>2026-08-01</published>
      </job>
    </jobs>"#;

    let first = parse(doc, None).unwrap();
    let second = parse(doc, None).unwrap();
    assert_eq!(first.jobs[0].external_id, second.jobs[0].external_id);
    assert_eq!(first.jobs[0].external_id.len(), 64);
}

#[test]
fn derived_ids_differ_when_identity_fields_differ() {
    let a = r#"<jobs><job><title>Role A</title><company>K</company></job></jobs>"#;
    let b = r#"<jobs><job><title>Role B</title><company>K</company></job></jobs>"#;

    let job_a = parse(a, None).unwrap().jobs.remove(0);
    let job_b = parse(b, None).unwrap().jobs.remove(0);
    assert_ne!(job_a.external_id, job_b.external_id);
}

#[test]
fn hint_overrides_detection() {
    // Root says generic, but the hint forces the bespoke extractor, which
    // only recognizes job-like item names and so finds nothing.
    let doc = r#"<export><item><title>Hidden</title><company>X</company></item></export>"#;
    let outcome = parse(doc, Some(Dialect::JobXml)).unwrap();
    assert!(outcome.jobs.is_empty());
}

#[test]
fn equivalent_rss_and_atom_content_normalizes_identically() {
    let rss = r#"<rss version="2.0"><channel>
      <title>Jobs</title><link>https://jobs.example.com</link><description>d</description>
      <item>
        <title>Backend Developer</title>
        <author>Gamma GmbH</author>
        <guid>job-77</guid>
        <link>https://jobs.example.com/77</link>
        <pubDate>Tue, 11 Aug 2026 08:30:00 GMT</pubDate>
      </item>
    </channel></rss>"#;

    let atom = r#"<feed xmlns="http://www.w3.org/2005/Atom">
      <title>Jobs</title><id>urn:jobs</id>
      <updated>2026-08-12T10:00:00Z</updated>
      <entry>
        <title>Backend Developer</title>
        <id>job-77</id>
        <updated>2026-08-12T10:00:00Z</updated>
        <published>2026-08-11T08:30:00Z</published>
        <author><name>Gamma GmbH</name></author>
        <link href="https://jobs.example.com/77"/>
      </entry>
    </feed>"#;

    let from_rss = parse(rss, None).unwrap().jobs.remove(0);
    let from_atom = parse(atom, None).unwrap().jobs.remove(0);

    assert_eq!(from_rss.external_id, from_atom.external_id);
    assert_eq!(from_rss.title, from_atom.title);
    assert_eq!(from_rss.company, from_atom.company);
    assert_eq!(from_rss.application_url, from_atom.application_url);
    assert_eq!(from_rss.published_date, from_atom.published_date);
}

#[test]
fn dates_parse_in_all_supported_formats() {
    for (text, expected) in [
        ("2026-08-01T12:00:00Z", "2026-08-01T12:00:00+00:00"),
        ("Mon, 10 Aug 2026 09:00:00 GMT", "2026-08-10T09:00:00+00:00"),
        ("2026-08-01 08:15:00", "2026-08-01T08:15:00+00:00"),
        ("2026-08-01", "2026-08-01T00:00:00+00:00"),
    ] {
        let doc = format!(
            "<jobs><job><title>T</title><company>C</company><published>{}</published></job></jobs>",
            text
        );
        let outcome = parse(&doc, None).unwrap();
        assert_eq!(
            outcome.jobs[0].published_date.unwrap().to_rfc3339(),
            expected,
            "input {text}"
        );
    }
}
