//! Multi-dialect feed parsing and normalization.
//!
//! This module converts raw feed documents into normalized [`CandidateJob`]
//! records. It accepts RSS 2.0, Atom, and bespoke job-XML documents, with a
//! best-effort generic extractor as a fallback. Dialect is auto-detected by
//! probing the root element when no hint is configured. Parsing is pure
//! computation: the same input always yields the same sequence.

use crate::error::{Error, Result};
use crate::types::{Dialect, FailedItem};
use chrono::{DateTime, Utc};
use quick_xml::Reader;
use quick_xml::events::Event;
use sha2::{Digest, Sha256};

/// A normalized job listing candidate, not yet validated against business rules
#[derive(Clone, Debug, PartialEq)]
pub struct CandidateJob {
    /// Stable identifier: the feed's native guid/id, or a hash derived from
    /// title + company + publish date when the feed has none
    pub external_id: String,
    /// Listing title (may be empty; validated by the upserter)
    pub title: String,
    /// Hiring company (may be empty; validated by the upserter)
    pub company: String,
    /// Work location
    pub location: Option<String>,
    /// Employment type (full-time, contract, ...)
    pub job_type: Option<String>,
    /// Listing category or sector
    pub category: Option<String>,
    /// Lower salary bound
    pub salary_min: Option<f64>,
    /// Upper salary bound
    pub salary_max: Option<f64>,
    /// Salary currency code
    pub salary_currency: Option<String>,
    /// Listed requirements
    pub requirements: Vec<String>,
    /// Listed benefits
    pub benefits: Vec<String>,
    /// Application link
    pub application_url: Option<String>,
    /// Publication date
    pub published_date: Option<DateTime<Utc>>,
}

/// Result of parsing one feed document
#[derive(Clone, Debug, Default)]
pub struct ParseOutcome {
    /// Successfully normalized candidates, in document order
    pub jobs: Vec<CandidateJob>,
    /// Items rejected during parsing, with reasons
    pub failed: Vec<FailedItem>,
}

/// Item element names recognized by the bespoke job-XML extractor
const JOB_ITEM_NAMES: &[&str] = &["job", "position", "vacancy", "listing"];

/// Item element names recognized by the generic fallback extractor
const GENERIC_ITEM_NAMES: &[&str] = &["job", "position", "vacancy", "listing", "item", "entry"];

/// Parse a feed document into normalized candidates
///
/// `hint` pins the dialect; when absent the document's root element is probed.
/// A document that cannot be parsed in its (detected) dialect is a whole-document
/// failure; individual malformed items are collected into [`ParseOutcome::failed`]
/// and never abort the rest of the feed.
pub fn parse(content: &str, hint: Option<Dialect>) -> Result<ParseOutcome> {
    let dialect = match hint.or_else(|| detect_dialect(content)) {
        Some(d) => d,
        None => {
            return Err(Error::Parse(
                "document has no recognizable root element".into(),
            ));
        }
    };

    tracing::debug!(dialect = ?dialect, "Parsing feed document");

    let raw_items = match dialect {
        Dialect::Rss2 => parse_rss(content)?,
        Dialect::Atom => parse_atom(content)?,
        Dialect::JobXml => extract_items(content, JOB_ITEM_NAMES)?,
        Dialect::Generic => extract_items(content, GENERIC_ITEM_NAMES)?,
    };

    let mut outcome = ParseOutcome::default();
    for (index, raw) in raw_items.into_iter().enumerate() {
        match normalize(raw, index) {
            Ok(job) => outcome.jobs.push(job),
            Err(failed) => outcome.failed.push(failed),
        }
    }

    Ok(outcome)
}

/// Probe the document's root element to guess its dialect
///
/// Returns `None` when no start element can be found at all, which callers
/// treat as a whole-document parse failure.
pub fn detect_dialect(content: &str) -> Option<Dialect> {
    let mut reader = Reader::from_reader(content.as_bytes());
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().local_name().as_ref()).to_lowercase();
                return Some(match name.as_str() {
                    "rss" | "channel" => Dialect::Rss2,
                    "feed" => Dialect::Atom,
                    "jobs" | "joblist" | "positions" | "vacancies" | "jobfeed" => Dialect::JobXml,
                    _ => Dialect::Generic,
                });
            }
            Ok(Event::Eof) => return None,
            Ok(_) => {}
            Err(_) => return None,
        }
        buf.clear();
    }
}

/// Intermediate record collected per item before normalization
#[derive(Debug, Default)]
struct RawCandidate {
    external_id: Option<String>,
    title: Option<String>,
    company: Option<String>,
    location: Option<String>,
    job_type: Option<String>,
    category: Option<String>,
    salary_min: Option<f64>,
    salary_max: Option<f64>,
    salary_currency: Option<String>,
    requirements: Vec<String>,
    benefits: Vec<String>,
    application_url: Option<String>,
    published_date: Option<DateTime<Utc>>,
}

/// Parse an RSS 2.0 channel
fn parse_rss(content: &str) -> Result<Vec<RawCandidate>> {
    let channel = content
        .parse::<rss::Channel>()
        .map_err(|e| Error::Parse(format!("RSS parse error: {}", e)))?;

    let items = channel
        .items()
        .iter()
        .map(|item| {
            // Company: prefer Dublin Core creator, fall back to the author field
            let company = item
                .dublin_core_ext()
                .and_then(|dc| dc.creators().first().cloned())
                .or_else(|| item.author().map(|a| a.to_string()));

            let pub_date = item.pub_date().and_then(parse_date);

            RawCandidate {
                external_id: item.guid().map(|g| g.value().to_string()),
                title: item.title().map(|t| t.to_string()),
                company,
                category: item.categories().first().map(|c| c.name().to_string()),
                application_url: item.link().map(|l| l.to_string()),
                published_date: pub_date,
                ..RawCandidate::default()
            }
        })
        .collect();

    Ok(items)
}

/// Parse an Atom feed
fn parse_atom(content: &str) -> Result<Vec<RawCandidate>> {
    let feed = atom_syndication::Feed::read_from(content.as_bytes())
        .map_err(|e| Error::Parse(format!("Atom parse error: {}", e)))?;

    let items = feed
        .entries()
        .iter()
        .map(|entry| {
            // Publication date: prefer published, fall back to updated
            let published = entry
                .published()
                .copied()
                .unwrap_or_else(|| *entry.updated());

            RawCandidate {
                external_id: Some(entry.id().to_string()),
                title: Some(entry.title().as_str().to_string()),
                company: entry.authors().first().map(|p| p.name().to_string()),
                category: entry.categories().first().map(|c| c.term().to_string()),
                application_url: entry.links().first().map(|l| l.href().to_string()),
                published_date: Some(published.with_timezone(&Utc)),
                ..RawCandidate::default()
            }
        })
        .collect();

    Ok(items)
}

/// Pull-parse a job-XML or unknown document, collecting one record per item element
///
/// Field values are keyed by the innermost element name; `requirements` and
/// `benefits` children accumulate into lists. Malformed XML is a whole-document
/// failure.
fn extract_items(content: &str, item_names: &[&str]) -> Result<Vec<RawCandidate>> {
    let mut reader = Reader::from_reader(content.as_bytes());
    let mut buf = Vec::new();

    let mut items: Vec<RawCandidate> = Vec::new();
    let mut current: Option<RawCandidate> = None;
    // Element path inside the current item, lowercased local names
    let mut path: Vec<String> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().local_name().as_ref()).to_lowercase();
                if current.is_none() {
                    if item_names.contains(&name.as_str()) {
                        current = Some(RawCandidate::default());
                        path.clear();
                    }
                } else {
                    path.push(name);
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().local_name().as_ref()).to_lowercase();
                if current.is_some() && path.is_empty() && item_names.contains(&name.as_str()) {
                    if let Some(raw) = current.take() {
                        items.push(raw);
                    }
                } else if !path.is_empty() {
                    path.pop();
                }
            }
            Ok(Event::Text(t)) => {
                if let Some(raw) = current.as_mut() {
                    let text = t
                        .unescape()
                        .map(|c| c.trim().to_string())
                        .unwrap_or_default();
                    if !text.is_empty() {
                        assign_field(raw, &path, &text);
                    }
                }
            }
            Ok(Event::CData(t)) => {
                if let Some(raw) = current.as_mut() {
                    let text = String::from_utf8_lossy(&t.into_inner()).trim().to_string();
                    if !text.is_empty() {
                        assign_field(raw, &path, &text);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(Error::Parse(format!(
                    "malformed XML at byte {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
        }
        buf.clear();
    }

    Ok(items)
}

/// Route one text value into the raw candidate based on the element path
fn assign_field(raw: &mut RawCandidate, path: &[String], text: &str) {
    let leaf = match path.last() {
        Some(l) => l.as_str(),
        None => return, // text directly inside the item element
    };
    let in_section = |name: &str| path.iter().any(|p| p == name);

    if in_section("requirements") || leaf == "requirement" || leaf == "skill" {
        raw.requirements.push(text.to_string());
        return;
    }
    if in_section("benefits") || leaf == "benefit" || leaf == "perk" {
        raw.benefits.push(text.to_string());
        return;
    }

    match leaf {
        "id" | "guid" | "reference" | "jobid" | "job_id" => {
            set_if_empty(&mut raw.external_id, text);
        }
        "title" | "jobtitle" | "job_title" | "name" => set_if_empty(&mut raw.title, text),
        "company" | "employer" | "companyname" | "company_name" | "hiringorganization" => {
            set_if_empty(&mut raw.company, text);
        }
        "location" | "city" | "region" | "joblocation" | "job_location" => {
            set_if_empty(&mut raw.location, text);
        }
        "jobtype" | "job_type" | "type" | "employmenttype" | "employment_type"
        | "contracttype" => set_if_empty(&mut raw.job_type, text),
        "category" | "sector" | "industry" => set_if_empty(&mut raw.category, text),
        "salarymin" | "salary_min" | "minsalary" | "min_salary" => {
            raw.salary_min = raw.salary_min.or_else(|| parse_number(text));
        }
        "salarymax" | "salary_max" | "maxsalary" | "max_salary" => {
            raw.salary_max = raw.salary_max.or_else(|| parse_number(text));
        }
        "currency" | "salarycurrency" | "salary_currency" => {
            set_if_empty(&mut raw.salary_currency, text);
        }
        "url" | "link" | "applyurl" | "apply_url" | "applicationurl" | "application_url"
        | "applylink" => set_if_empty(&mut raw.application_url, text),
        "published" | "pubdate" | "date" | "posted" | "publisheddate" | "published_date"
        | "dateposted" => {
            if raw.published_date.is_none() {
                raw.published_date = parse_date(text);
            }
        }
        _ => {}
    }
}

fn set_if_empty(slot: &mut Option<String>, text: &str) {
    if slot.is_none() {
        *slot = Some(text.to_string());
    }
}

/// Parse a numeric field, tolerating thousands separators
fn parse_number(text: &str) -> Option<f64> {
    text.replace(',', "").trim().parse::<f64>().ok()
}

/// Parse a date in any of the formats seen across feed dialects
fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }
    if let Ok(d) = chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    None
}

/// Turn a raw candidate into a normalized one, or reject it
///
/// A record missing all of title, company, and link cannot be matched to
/// anything and is rejected. The stable external id is derived here when the
/// feed provided none, so re-imports of the same listing converge.
fn normalize(raw: RawCandidate, index: usize) -> std::result::Result<CandidateJob, FailedItem> {
    let title = raw.title.unwrap_or_default();
    let company = raw.company.unwrap_or_default();

    if title.is_empty() && company.is_empty() && raw.application_url.is_none() {
        let item = raw
            .external_id
            .unwrap_or_else(|| format!("item {}", index + 1));
        return Err(FailedItem {
            item,
            reason: "missing required fields".into(),
        });
    }

    let external_id = raw
        .external_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| derive_external_id(&title, &company, raw.published_date.as_ref()));

    Ok(CandidateJob {
        external_id,
        title,
        company,
        location: raw.location,
        job_type: raw.job_type,
        category: raw.category,
        salary_min: raw.salary_min,
        salary_max: raw.salary_max,
        salary_currency: raw.salary_currency,
        requirements: raw.requirements,
        benefits: raw.benefits,
        application_url: raw.application_url,
        published_date: raw.published_date,
    })
}

/// Derive a stable external id from listing identity fields
///
/// SHA-256 over title + company + publish date, hex encoded, so re-imports of
/// the same listing converge to the same id even without a native guid.
fn derive_external_id(title: &str, company: &str, published: Option<&DateTime<Utc>>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update(b"|");
    hasher.update(company.as_bytes());
    hasher.update(b"|");
    if let Some(date) = published {
        hasher.update(date.to_rfc3339().as_bytes());
    }
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
