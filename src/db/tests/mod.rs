// Database tests share a temp-file fixture; each test gets a fresh database.

use super::*;
use tempfile::NamedTempFile;


/// Create a database backed by a temp file
///
/// The returned guard keeps the file alive for the duration of the test.
async fn test_db() -> (Database, NamedTempFile) {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();
    (db, temp_file)
}

/// A representative listing for insert/update tests
fn sample_job(external_id: &str, source_url: &str) -> NewJob {
    NewJob {
        external_id: external_id.to_string(),
        source_url: source_url.to_string(),
        title: "Senior Rust Engineer".to_string(),
        company: "Acme Corp".to_string(),
        location: Some("Berlin".to_string()),
        job_type: Some("full-time".to_string()),
        category: Some("Engineering".to_string()),
        salary_min: Some(70_000.0),
        salary_max: Some(90_000.0),
        salary_currency: Some("EUR".to_string()),
        requirements: vec!["Rust".to_string(), "SQL".to_string()],
        benefits: vec!["Remote work".to_string()],
        application_url: Some("https://jobs.example.com/rust-1".to_string()),
        published_date: Some(1_754_000_000),
    }
}
