//! HTML extraction for website listing and detail pages
//!
//! `scraper::Html` cannot cross an `.await`, so every function here parses a
//! complete body synchronously and returns owned data.
//!
//! Field extraction is best-effort. Each field has an ordered list of
//! extractors and the first one that yields a value wins; a field nobody can
//! resolve is simply absent.

use crate::media::{CandidateItem, ContentType};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Candidates and pagination extracted from one listing page
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    pub items: Vec<CandidateItem>,
    pub next_url: Option<Url>,
}

/// Fields scraped from a detail page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WebDetail {
    pub title: Option<String>,
    pub overview: Option<String>,
    /// Score on a 0-10 scale
    pub rating: Option<f64>,
    pub genres: Vec<String>,
    pub status: Option<String>,
    pub runtime: Option<u32>,
    pub release_date: Option<String>,
    pub first_air_date: Option<String>,
    pub last_air_date: Option<String>,
    pub created_by: Vec<String>,
    pub networks: Vec<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub cast: Vec<WebCastMember>,
    pub keywords: Vec<WebKeyword>,
}

/// Top-billed cast entry from a detail page
#[derive(Debug, Clone, PartialEq)]
pub struct WebCastMember {
    pub id: Option<u64>,
    pub name: String,
    pub character: Option<String>,
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WebKeyword {
    pub id: Option<u64>,
    pub name: String,
}

type TextExtractor = fn(&Html) -> Option<String>;
type NextPageStrategy = fn(&Html, &Url) -> Option<Url>;

/// Next-page rules in priority order
const NEXT_PAGE_STRATEGIES: &[NextPageStrategy] = &[
    infinite_scroll_next,
    rel_next_anchor,
    next_class_anchor,
    next_text_anchor,
];

const NEXT_SELECTORS: &[&str] = &[
    ".pagination a[rel~=\"next\"]",
    ".pagination .next a",
    ".pagination a.next",
    "a[aria-label=\"next\"]",
    "a[aria-label=\"Next\"]",
];

const TITLE_EXTRACTORS: &[TextExtractor] = &[header_title, hero_title];
const OVERVIEW_EXTRACTORS: &[TextExtractor] = &[overview_block, overview_testid, panel_paragraph];
const POSTER_EXTRACTORS: &[TextExtractor] = &[poster_image, profile_image];
const BACKDROP_EXTRACTORS: &[TextExtractor] = &[backdrop_image];

static CONTENT_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/(movie|tv)/(\d+)").expect("content link regex should compile"));
static PERSON_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/person/(\d+)").expect("person link regex should compile"));
static KEYWORD_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/keyword/(\d+)").expect("keyword link regex should compile"));
static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)").expect("number regex should compile"));
static MOVIE_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{4}-\d{2}-\d{2}|\d{4})").expect("release date regex should compile")
});
static FIRST_AIRED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)First Aired\s+([A-Za-z]+\s+\d{1,2},\s+\d{4})")
        .expect("first aired regex should compile")
});
static LAST_AIRED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Last Aired\s+([A-Za-z]+\s+\d{1,2},\s+\d{4})")
        .expect("last aired regex should compile")
});
static MINUTES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+)\s*min").expect("minutes regex should compile"));
static HOURS_MINUTES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+)\s*h(?:\s*(\d+)\s*m)?").expect("runtime regex should compile")
});

/// Parses a listing page into candidates for `content_type`
///
/// Cards whose detail link does not point at `content_type` are ignored, and
/// an id repeated within the page is kept once.
pub fn parse_listing(html: &str, page_url: &Url, content_type: ContentType) -> ListingPage {
    let document = Html::parse_document(html);
    let segment = content_type.path_segment();

    let mut items: Vec<CandidateItem> = Vec::new();
    if let (Some(card_selector), Some(link_selector)) = (
        selector(".card"),
        selector(&format!("a[href^=\"/{}/\"]", segment)),
    ) {
        for card in document.select(&card_selector) {
            let Some(link) = card.select(&link_selector).next() else {
                continue;
            };
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            let Some(id) = content_id_from_href(href, segment) else {
                continue;
            };
            if items.iter().any(|item| item.id == id) {
                continue;
            }

            let title = element_first_text(card, "h2, h3")
                .or_else(|| clean_text(link))
                .unwrap_or_default();
            let poster_ref = element_first_attr(card, "img.poster", "data-src")
                .or_else(|| element_first_attr(card, "img.poster", "src"));

            items.push(CandidateItem {
                id,
                title,
                overview: element_first_text(card, ".overview p"),
                release_or_air_date: element_first_text(card, ".release_date"),
                poster_ref,
                detail_locator: page_url.join(href).ok(),
            });
        }
    }

    let next_url = NEXT_PAGE_STRATEGIES
        .iter()
        .find_map(|strategy| strategy(&document, page_url));

    ListingPage { items, next_url }
}

/// Extracts the numeric id from a detail link, if it names `segment`
pub fn content_id_from_href(href: &str, segment: &str) -> Option<u64> {
    let captures = CONTENT_LINK.captures(href)?;
    if captures.get(1)?.as_str() != segment {
        return None;
    }
    captures.get(2)?.as_str().parse().ok().filter(|id| *id > 0)
}

/// Parses a detail page for `content_type`
pub fn parse_detail(html: &str, content_type: ContentType) -> WebDetail {
    let document = Html::parse_document(html);

    let mut detail = WebDetail {
        title: first_of(&document, TITLE_EXTRACTORS),
        overview: first_of(&document, OVERVIEW_EXTRACTORS),
        rating: extract_rating(&document),
        genres: distinct_texts(&document, ".genres a, .genre, [data-testid=\"genres\"] a"),
        poster_path: first_of(&document, POSTER_EXTRACTORS),
        backdrop_path: first_of(&document, BACKDROP_EXTRACTORS),
        created_by: distinct_texts(&document, ".created_by a"),
        networks: distinct_texts(&document, ".networks li"),
        cast: extract_cast(&document),
        keywords: extract_keywords(&document),
        ..WebDetail::default()
    };

    for (label, value) in facts(&document) {
        if content_type == ContentType::Movie && label.contains("runtime") {
            detail.runtime = parse_runtime(&value);
        }
        if label.contains("status") && !value.is_empty() {
            detail.status = Some(value);
        }
    }

    match content_type {
        ContentType::Movie => {
            let text = joined_text(&document, ".release_date, .facts p");
            detail.release_date = MOVIE_DATE
                .captures(&text)
                .and_then(|c| c.get(1))
                .map(|m| {
                    let date = m.as_str();
                    if date.len() == 4 {
                        format!("{}-01-01", date)
                    } else {
                        date.to_string()
                    }
                });
        }
        ContentType::Series => {
            let first = joined_text(&document, ".first_air_date, .facts p");
            detail.first_air_date = capture(&FIRST_AIRED, &first);
            let last = joined_text(&document, ".last_air_date, .facts p");
            detail.last_air_date = capture(&LAST_AIRED, &last);
        }
    }

    detail
}

// ===== Next-page strategies =====

fn infinite_scroll_next(document: &Html, current: &Url) -> Option<Url> {
    let marker = selector("[id^=\"pagination_page_\"][data-next-page]")?;
    let next_page = document
        .select(&marker)
        .next()?
        .value()
        .attr("data-next-page")?
        .trim()
        .to_string();
    if next_page.is_empty() {
        return None;
    }

    let mut next = current.clone();
    let pairs: Vec<(String, String)> = current
        .query_pairs()
        .filter(|(key, _)| key != "page")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    next.query_pairs_mut()
        .clear()
        .extend_pairs(pairs)
        .append_pair("page", &next_page);
    Some(next)
}

fn rel_next_anchor(document: &Html, current: &Url) -> Option<Url> {
    anchor_href(document, "a[rel~=\"next\"]", current)
}

fn next_class_anchor(document: &Html, current: &Url) -> Option<Url> {
    NEXT_SELECTORS
        .iter()
        .find_map(|css| anchor_href(document, css, current))
}

fn next_text_anchor(document: &Html, current: &Url) -> Option<Url> {
    let anchors = selector(".pagination a")?;
    document
        .select(&anchors)
        .find(|anchor| {
            let text = anchor.text().collect::<String>().trim().to_lowercase();
            text == "›" || text == "»" || text.contains("next")
        })
        .and_then(|anchor| anchor.value().attr("href"))
        .and_then(|href| current.join(href).ok())
}

fn anchor_href(document: &Html, css: &str, current: &Url) -> Option<Url> {
    let href = document.select(&selector(css)?).next()?.value().attr("href")?;
    current.join(href).ok()
}

// ===== Detail fields =====

fn header_title(document: &Html) -> Option<String> {
    first_text(document, ".title h2, .header h2, h1")
}

fn hero_title(document: &Html) -> Option<String> {
    first_text(document, "[data-testid=\"hero-title\"]")
}

fn overview_block(document: &Html) -> Option<String> {
    first_text(
        document,
        "[data-testid=\"series_overview\"] p, .overview p, .plot, .summary",
    )
}

fn overview_testid(document: &Html) -> Option<String> {
    first_text(document, "[data-testid=\"overview\"]")
}

fn panel_paragraph(document: &Html) -> Option<String> {
    first_text(document, ".panel h3 + p")
}

fn poster_image(document: &Html) -> Option<String> {
    first_attr(document, ".poster img", "src")
}

fn profile_image(document: &Html) -> Option<String> {
    first_attr(document, ".profile img", "src")
}

fn backdrop_image(document: &Html) -> Option<String> {
    first_attr(document, ".backdrop img, .hero_image img", "src")
}

fn extract_rating(document: &Html) -> Option<f64> {
    if let Some(percent) = first_attr(document, ".user_score_chart", "data-percent") {
        if let Some(value) = first_number(&percent) {
            return Some(value / 10.0);
        }
    }

    let text = first_text(document, "[data-testid=\"score\"]")
        .or_else(|| first_text(document, ".vote_average"))?;
    let value = first_number(&text)?;
    Some(if text.contains('%') { value / 10.0 } else { value })
}

fn extract_cast(document: &Html) -> Vec<WebCastMember> {
    let (Some(cards), Some(link)) = (
        selector("ol.people li.card, .cast li.card, [data-testid=\"cast\"] li"),
        selector("p a, a[href^=\"/person/\"]"),
    ) else {
        return Vec::new();
    };

    document
        .select(&cards)
        .filter_map(|card| {
            let anchor = card
                .select(&link)
                .find(|a| a.text().any(|t| !t.trim().is_empty()))?;
            let name = clean_text(anchor)?;
            let id = anchor
                .value()
                .attr("href")
                .and_then(|href| capture(&PERSON_LINK, href))
                .and_then(|id| id.parse().ok());
            Some(WebCastMember {
                id,
                name,
                character: element_first_text(card, "p.character"),
                profile_path: element_first_attr(card, "img.profile, img", "src"),
            })
        })
        .collect()
}

fn extract_keywords(document: &Html) -> Vec<WebKeyword> {
    let Some(links) = selector("section.keywords li a, .keywords li a") else {
        return Vec::new();
    };

    let mut keywords: Vec<WebKeyword> = Vec::new();
    for anchor in document.select(&links) {
        let Some(name) = clean_text(anchor) else {
            continue;
        };
        if keywords.iter().any(|k| k.name == name) {
            continue;
        }
        let id = anchor
            .value()
            .attr("href")
            .and_then(|href| capture(&KEYWORD_LINK, href))
            .and_then(|id| id.parse().ok());
        keywords.push(WebKeyword { id, name });
    }
    keywords
}

/// `.facts p` entries as (lowercased label, unlabelled text)
fn facts(document: &Html) -> Vec<(String, String)> {
    let (Some(paragraphs), Some(strong)) = (selector(".facts p"), selector("strong")) else {
        return Vec::new();
    };

    document
        .select(&paragraphs)
        .map(|p| {
            let label = p
                .select(&strong)
                .flat_map(|s| s.text())
                .collect::<String>()
                .to_lowercase();
            let value = p
                .children()
                .filter_map(|child| child.value().as_text().map(|t| t.to_string()))
                .collect::<String>()
                .trim()
                .to_string();
            (label, value)
        })
        .collect()
}

fn parse_runtime(value: &str) -> Option<u32> {
    if let Some(minutes) = capture(&MINUTES, value).and_then(|m| m.parse().ok()) {
        return Some(minutes);
    }
    let captures = HOURS_MINUTES.captures(value)?;
    let hours: u32 = captures.get(1)?.as_str().parse().ok()?;
    let minutes: u32 = captures
        .get(2)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0);
    Some(hours * 60 + minutes)
}

// ===== Helpers =====

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn first_of(document: &Html, extractors: &[TextExtractor]) -> Option<String> {
    extractors.iter().find_map(|extract| extract(document))
}

fn clean_text(element: ElementRef<'_>) -> Option<String> {
    let text = element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    (!text.is_empty()).then_some(text)
}

fn first_text(document: &Html, css: &str) -> Option<String> {
    document.select(&selector(css)?).next().and_then(clean_text)
}

fn first_attr(document: &Html, css: &str, attr: &str) -> Option<String> {
    let value = document.select(&selector(css)?).next()?.value().attr(attr)?.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn element_first_text(element: ElementRef<'_>, css: &str) -> Option<String> {
    element.select(&selector(css)?).next().and_then(clean_text)
}

fn element_first_attr(element: ElementRef<'_>, css: &str, attr: &str) -> Option<String> {
    let value = element.select(&selector(css)?).next()?.value().attr(attr)?.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn distinct_texts(document: &Html, css: &str) -> Vec<String> {
    let Some(sel) = selector(css) else {
        return Vec::new();
    };
    let mut values: Vec<String> = Vec::new();
    for text in document.select(&sel).filter_map(clean_text) {
        if !values.contains(&text) {
            values.push(text);
        }
    }
    values
}

fn joined_text(document: &Html, css: &str) -> String {
    selector(css)
        .map(|sel| {
            document
                .select(&sel)
                .flat_map(|e| e.text())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default()
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)?
        .get(1)
        .map(|m| m.as_str().trim().to_string())
}

fn first_number(text: &str) -> Option<f64> {
    capture(&NUMBER, text)?.parse().ok()
}
