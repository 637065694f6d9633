//! Document parsing for archive pages
//!
//! Pure functions that turn fetched HTML into scraped records. No
//! network access, no mutation of external state. A fragment missing
//! its required fields yields `None` and is skipped by the caller; a
//! malformed numeric field degrades to zero rather than failing the
//! whole record.

use crate::crawler::records::{
    FandomEntry, ScrapedAuthor, ScrapedWork, TagCount, TagStatistics,
};
use crate::store::{ContentRating, WorkStatus};
use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Parses a number from text, stripping thousands separators
///
/// Unparsable input yields zero.
pub fn parse_count(text: &str) -> i64 {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

/// Parses an archive date (YYYY-MM-DD); invalid input yields None
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").ok()
}

/// Maps archive rating text onto the normalized rating enum
pub fn map_rating(text: &str) -> ContentRating {
    let lower = text.to_lowercase();
    if lower.contains("general") {
        ContentRating::General
    } else if lower.contains("teen") {
        ContentRating::Teen
    } else if lower.contains("mature") {
        ContentRating::Mature
    } else if lower.contains("explicit") {
        ContentRating::Explicit
    } else {
        ContentRating::NotRated
    }
}

/// Maps archive completion text onto the normalized status enum
pub fn map_status(text: &str) -> WorkStatus {
    let lower = text.to_lowercase();
    if lower.contains("complete") {
        WorkStatus::Completed
    } else if lower.contains("progress") {
        WorkStatus::Ongoing
    } else {
        WorkStatus::Unknown
    }
}

fn text_of(element: &ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn first_text(scope: &ElementRef, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    scope.select(&sel).next().map(|el| text_of(&el))
}

/// Collects the link texts of a `<li><a>` list under the first element
/// matching `selector`
fn tag_list(scope: &ElementRef, selector: &str) -> Vec<String> {
    let Ok(sel) = Selector::parse(selector) else {
        return Vec::new();
    };
    let Ok(link_sel) = Selector::parse("li a") else {
        return Vec::new();
    };
    scope
        .select(&sel)
        .next()
        .map(|dd| dd.select(&link_sel).map(|a| text_of(&a)).collect())
        .unwrap_or_default()
}

fn parse_author_link(link: &ElementRef, base_url: &Url) -> ScrapedAuthor {
    let href = link.value().attr("href").unwrap_or("");
    let author_id = href
        .split("/users/")
        .nth(1)
        .and_then(|rest| rest.split('/').next())
        .unwrap_or("")
        .to_string();

    ScrapedAuthor {
        platform_author_id: author_id,
        username: text_of(link),
        profile_url: (!href.is_empty())
            .then(|| base_url.join(href).ok().map(|u| u.to_string()))
            .flatten(),
        ..Default::default()
    }
}

/// Parses one work blurb from a search/listing page
///
/// Returns `None` when the blurb lacks its work id or title link; the
/// caller logs and skips such fragments.
pub fn parse_listing_item(blurb: &ElementRef, base_url: &Url) -> Option<ScrapedWork> {
    let id_attr = blurb.value().attr("id")?;
    let work_id = id_attr.trim_start_matches("work_").to_string();
    if work_id.is_empty() {
        return None;
    }

    let title_sel = Selector::parse("h4.heading a").ok()?;
    let title_link = blurb.select(&title_sel).next()?;
    let title = text_of(&title_link);
    let href = title_link.value().attr("href").unwrap_or("");
    let url = base_url
        .join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| base_url.to_string());

    let author_sel = Selector::parse("h4.heading a[rel='author']").ok()?;
    let author = blurb
        .select(&author_sel)
        .next()
        .map(|link| parse_author_link(&link, base_url));

    let fandom_sel = Selector::parse("h5.fandoms a.tag").ok()?;
    let fandoms: Vec<String> = blurb.select(&fandom_sel).map(|a| text_of(&a)).collect();

    // Required classification squares: rating, warnings, completion
    let mut rating = ContentRating::NotRated;
    let mut status = WorkStatus::Unknown;
    let mut warnings = Vec::new();

    let required_sel = Selector::parse("ul.required-tags li span").ok()?;
    for span in blurb.select(&required_sel) {
        let classes: Vec<&str> = span.value().classes().collect();
        let text = text_of(&span);
        if classes.contains(&"rating") {
            rating = map_rating(&text);
        } else if classes.contains(&"warnings") || classes.contains(&"warning") {
            if !text.is_empty() {
                warnings.push(text);
            }
        } else if classes.contains(&"iswip") {
            status = map_status(&text);
        }
    }

    // Additional tags, partitioned by role
    let mut relationships = Vec::new();
    let mut characters = Vec::new();
    let mut freeform_tags = Vec::new();

    let tags_sel = Selector::parse("ul.tags li").ok()?;
    let link_sel = Selector::parse("a").ok()?;
    for li in blurb.select(&tags_sel) {
        let classes: Vec<&str> = li.value().classes().collect();
        if let Some(link) = li.select(&link_sel).next() {
            let text = text_of(&link);
            if classes.contains(&"relationships") {
                relationships.push(text);
            } else if classes.contains(&"characters") {
                characters.push(text);
            } else if classes.contains(&"freeforms") {
                freeform_tags.push(text);
            }
        }
    }

    let summary = first_text(blurb, "blockquote.userstuff.summary").filter(|s| !s.is_empty());

    let mut language = "English".to_string();
    let mut word_count = 0;
    let mut chapter_count = 0;
    let mut views = 0;
    let mut likes = 0;
    let mut comments = 0;
    let mut bookmarks = 0;

    let stats_sel = Selector::parse("dl.stats").ok()?;
    if let Some(stats) = blurb.select(&stats_sel).next() {
        if let Some(lang) = first_text(&stats, "dd.language") {
            if !lang.is_empty() {
                language = lang;
            }
        }
        if let Some(words) = first_text(&stats, "dd.words") {
            word_count = parse_count(&words);
        }
        if let Some(chapters) = first_text(&stats, "dd.chapters") {
            // Format is "X/Y" where Y may be "?"
            chapter_count = chapters
                .split('/')
                .next()
                .map(parse_count)
                .unwrap_or(0);
        }
        if let Some(hits) = first_text(&stats, "dd.hits") {
            views = parse_count(&hits);
        }
        if let Some(kudos) = first_text(&stats, "dd.kudos") {
            likes = parse_count(&kudos);
        }
        if let Some(text) = first_text(&stats, "dd.comments") {
            comments = parse_count(&text);
        }
        if let Some(text) = first_text(&stats, "dd.bookmarks") {
            bookmarks = parse_count(&text);
        }
    }

    // Listing pages show the last-updated date
    let published_at = first_text(blurb, "p.datetime").and_then(|text| parse_date(&text));

    Some(ScrapedWork {
        platform_work_id: work_id,
        title,
        url,
        author,
        summary,
        rating,
        language,
        status,
        chapter_count,
        word_count,
        published_at,
        updated_at: published_at,
        views,
        likes,
        comments,
        bookmarks,
        tags: freeform_tags,
        fandoms,
        relationships,
        characters,
        warnings,
    })
}

/// Parses a whole listing page into its blurbs plus the next-page flag
///
/// Per-blurb failures are skipped with a warning; they never abort the
/// page.
pub fn parse_listing_page(html: &str, base_url: &Url) -> (Vec<ScrapedWork>, bool) {
    let document = Html::parse_document(html);

    let mut works = Vec::new();
    if let Ok(blurb_sel) = Selector::parse("li.work.blurb") {
        for blurb in document.select(&blurb_sel) {
            match parse_listing_item(&blurb, base_url) {
                Some(work) => works.push(work),
                None => {
                    tracing::warn!("skipping blurb with missing required fields");
                }
            }
        }
    }

    let has_next = Selector::parse("li.next a")
        .map(|sel| document.select(&sel).next().is_some())
        .unwrap_or(false);

    (works, has_next)
}

/// Parses a full work page
///
/// Completion is inferred from the chapter counter: a known expected
/// total equal to the published count means completed, anything else
/// means ongoing. An explicit not-found page yields `None`.
pub fn parse_detail_page(html: &str, work_id: &str, base_url: &Url) -> Option<ScrapedWork> {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let error_sel = Selector::parse("div.error").ok()?;
    if document.select(&error_sel).next().is_some() || html.contains("Error 404") {
        return None;
    }

    let title = first_text(&root, "h2.title").filter(|t| !t.is_empty())?;

    let url = base_url
        .join(&format!("works/{}", work_id))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| base_url.to_string());

    let author_sel = Selector::parse("h3.byline a[rel='author']").ok()?;
    let author = document
        .select(&author_sel)
        .next()
        .map(|link| parse_author_link(&link, base_url));

    let meta_sel = Selector::parse("dl.work.meta").ok()?;
    let meta = document.select(&meta_sel).next();

    let mut rating = ContentRating::NotRated;
    let mut warnings = Vec::new();
    let mut fandoms = Vec::new();
    let mut relationships = Vec::new();
    let mut characters = Vec::new();
    let mut tags = Vec::new();
    let mut language = "English".to_string();

    if let Some(meta) = meta {
        if let Some(text) = first_text(&meta, "dd.rating") {
            rating = map_rating(&text);
        }
        warnings = tag_list(&meta, "dd.warning");
        fandoms = tag_list(&meta, "dd.fandom");
        relationships = tag_list(&meta, "dd.relationship");
        characters = tag_list(&meta, "dd.character");
        tags = tag_list(&meta, "dd.freeform");
        if let Some(lang) = first_text(&meta, "dd.language") {
            if !lang.is_empty() {
                language = lang;
            }
        }
    }

    let summary = first_text(&root, "div.summary blockquote.userstuff").filter(|s| !s.is_empty());

    let mut published_at = None;
    let mut updated_at = None;
    let mut word_count = 0;
    let mut chapter_count = 0;
    let mut views = 0;
    let mut likes = 0;
    let mut comments = 0;
    let mut bookmarks = 0;
    let mut status = WorkStatus::Unknown;

    let stats_sel = Selector::parse("dl.stats").ok()?;
    if let Some(stats) = document.select(&stats_sel).next() {
        published_at = first_text(&stats, "dd.published").and_then(|t| parse_date(&t));
        updated_at = first_text(&stats, "dd.status")
            .and_then(|t| parse_date(&t))
            .or(published_at);
        if let Some(words) = first_text(&stats, "dd.words") {
            word_count = parse_count(&words);
        }
        if let Some(chapters) = first_text(&stats, "dd.chapters") {
            let mut parts = chapters.splitn(2, '/');
            chapter_count = parts.next().map(parse_count).unwrap_or(0);
            if let Some(expected) = parts.next() {
                let expected = expected.trim();
                if expected != "?" && parse_count(expected) == chapter_count {
                    status = WorkStatus::Completed;
                } else {
                    status = WorkStatus::Ongoing;
                }
            }
        }
        if let Some(hits) = first_text(&stats, "dd.hits") {
            views = parse_count(&hits);
        }
        if let Some(kudos) = first_text(&stats, "dd.kudos") {
            likes = parse_count(&kudos);
        }
        if let Some(text) = first_text(&stats, "dd.comments") {
            comments = parse_count(&text);
        }
        if let Some(text) = first_text(&stats, "dd.bookmarks") {
            bookmarks = parse_count(&text);
        }
    }

    Some(ScrapedWork {
        platform_work_id: work_id.to_string(),
        title,
        url,
        author,
        summary,
        rating,
        language,
        status,
        chapter_count,
        word_count,
        published_at,
        updated_at,
        views,
        likes,
        comments,
        bookmarks,
        tags,
        fandoms,
        relationships,
        characters,
        warnings,
    })
}

/// Parses a tag-browse page into aggregate statistics
///
/// The total comes from the first "… of N Works …" heading; each of the
/// six filter sections yields labeled counts. Missing sections produce
/// empty lists rather than errors.
pub fn parse_tag_statistics(html: &str, fandom_tag: &str) -> TagStatistics {
    let document = Html::parse_document(html);

    let mut stats = TagStatistics {
        fandom: fandom_tag.to_string(),
        ..Default::default()
    };

    if let (Ok(heading_sel), Ok(total_re)) = (
        Selector::parse("h2.heading"),
        Regex::new(r"of\s+([\d,]+)\s+Works"),
    ) {
        for heading in document.select(&heading_sel) {
            let text = heading.text().collect::<String>();
            if let Some(caps) = total_re.captures(&text) {
                stats.total_works = parse_count(&caps[1]) as u64;
                break;
            }
        }
    }

    stats.ratings = parse_filter_section(&document, "rating");
    stats.warnings = parse_filter_section(&document, "warning");
    stats.categories = parse_filter_section(&document, "category");
    stats.freeform = parse_filter_section(&document, "freeform");
    stats.relationships = parse_filter_section(&document, "relationship");
    stats.characters = parse_filter_section(&document, "character");

    stats
}

/// Extracts "name (count)" entries from one labeled filter section
fn parse_filter_section(document: &Html, dd_class: &str) -> Vec<TagCount> {
    let Ok(section_sel) = Selector::parse(&format!("dd.{}.tags", dd_class)) else {
        return Vec::new();
    };
    let Ok(label_sel) = Selector::parse("li label") else {
        return Vec::new();
    };
    let Ok(label_re) = Regex::new(r"^(.+?)\s*\((\d[\d,]*)\)$") else {
        return Vec::new();
    };

    let Some(section) = document.select(&section_sel).next() else {
        return Vec::new();
    };

    section
        .select(&label_sel)
        .filter_map(|label| {
            let text = text_of(&label);
            let caps = label_re.captures(&text)?;
            Some(TagCount {
                name: caps[1].trim().to_string(),
                count: parse_count(&caps[2]) as u64,
            })
        })
        .collect()
}

/// Parses the fandom directory page into (name, count, category) entries
///
/// Entries are grouped under category headings; the work count trails
/// each link in parentheses.
pub fn parse_fandom_directory(html: &str) -> Vec<FandomEntry> {
    let document = Html::parse_document(html);

    let Ok(section_sel) = Selector::parse("li.medium.listbox.group") else {
        return Vec::new();
    };
    let Ok(item_sel) = Selector::parse("ol.index.group > li") else {
        return Vec::new();
    };
    let Ok(link_sel) = Selector::parse("a.tag") else {
        return Vec::new();
    };
    let Ok(count_re) = Regex::new(r"\((\d[\d,]*)\)") else {
        return Vec::new();
    };

    let mut entries = Vec::new();
    for section in document.select(&section_sel) {
        let category = first_text(&section, "h3.heading").filter(|c| !c.is_empty());

        for item in section.select(&item_sel) {
            let Some(link) = item.select(&link_sel).next() else {
                continue;
            };
            let name = text_of(&link);
            let full_text = item.text().collect::<String>();
            let work_count = count_re
                .captures(&full_text)
                .map(|caps| parse_count(&caps[1]) as u64)
                .unwrap_or(0);

            entries.push(FandomEntry {
                name,
                work_count,
                category: category.clone(),
            });
        }
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://archiveofourown.org/").unwrap()
    }

    const BLURB_HTML: &str = r##"
        <html><body><ol>
        <li id="work_12345" class="work blurb group">
            <div class="header module">
                <h4 class="heading">
                    <a href="/works/12345">The Longest Night</a>
                    by <a rel="author" href="/users/nightwriter/pseuds/nightwriter">nightwriter</a>
                </h4>
                <h5 class="fandoms heading">
                    <a class="tag" href="/tags/Harry%20Potter/works">Harry Potter - J. K. Rowling</a>
                </h5>
                <ul class="required-tags">
                    <li><span class="rating-teen rating"><span class="text">Teen And Up Audiences</span></span></li>
                    <li><span class="warning-no warnings"><span class="text">No Archive Warnings Apply</span></span></li>
                    <li><span class="complete-no iswip"><span class="text">Work in Progress</span></span></li>
                </ul>
            </div>
            <ul class="tags commas">
                <li class="relationships"><a class="tag" href="#">Character A/Character B</a></li>
                <li class="characters"><a class="tag" href="#">Character A</a></li>
                <li class="freeforms"><a class="tag" href="#">Fluff</a></li>
                <li class="freeforms"><a class="tag" href="#">Angst</a></li>
            </ul>
            <blockquote class="userstuff summary"><p>A story about long nights.</p></blockquote>
            <dl class="stats">
                <dt>Language:</dt><dd class="language">English</dd>
                <dt>Words:</dt><dd class="words">12,345</dd>
                <dt>Chapters:</dt><dd class="chapters">3/?</dd>
                <dt>Comments:</dt><dd class="comments">42</dd>
                <dt>Kudos:</dt><dd class="kudos">1,234</dd>
                <dt>Bookmarks:</dt><dd class="bookmarks">56</dd>
                <dt>Hits:</dt><dd class="hits">7,890</dd>
            </dl>
            <p class="datetime">2024-01-15</p>
        </li>
        </ol></body></html>
    "##;

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("1,234,567"), 1_234_567);
        assert_eq!(parse_count("42"), 42);
        assert_eq!(parse_count(""), 0);
        assert_eq!(parse_count("no digits"), 0);
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2024-01-15"),
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
        assert_eq!(parse_date(" 2024-01-15 "), NaiveDate::from_ymd_opt(2024, 1, 15));
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("invalid"), None);
        assert_eq!(parse_date("15/01/2024"), None);
    }

    #[test]
    fn test_map_rating() {
        assert_eq!(map_rating("General Audiences"), ContentRating::General);
        assert_eq!(map_rating("Teen And Up Audiences"), ContentRating::Teen);
        assert_eq!(map_rating("Mature"), ContentRating::Mature);
        assert_eq!(map_rating("EXPLICIT"), ContentRating::Explicit);
        assert_eq!(map_rating("Not Rated"), ContentRating::NotRated);
        assert_eq!(map_rating(""), ContentRating::NotRated);
    }

    #[test]
    fn test_map_status() {
        assert_eq!(map_status("Complete Work"), WorkStatus::Completed);
        assert_eq!(map_status("Work in Progress"), WorkStatus::Ongoing);
        assert_eq!(map_status("something else"), WorkStatus::Unknown);
    }

    #[test]
    fn test_parse_listing_item() {
        let (works, _) = parse_listing_page(BLURB_HTML, &base_url());
        assert_eq!(works.len(), 1);

        let work = &works[0];
        assert_eq!(work.platform_work_id, "12345");
        assert_eq!(work.title, "The Longest Night");
        assert_eq!(work.url, "https://archiveofourown.org/works/12345");
        assert_eq!(work.rating, ContentRating::Teen);
        assert_eq!(work.status, WorkStatus::Ongoing);
        assert_eq!(work.warnings, vec!["No Archive Warnings Apply"]);
        assert_eq!(work.fandoms, vec!["Harry Potter - J. K. Rowling"]);
        assert_eq!(work.relationships, vec!["Character A/Character B"]);
        assert_eq!(work.characters, vec!["Character A"]);
        assert_eq!(work.tags, vec!["Fluff", "Angst"]);
        assert_eq!(work.summary.as_deref(), Some("A story about long nights."));
        assert_eq!(work.word_count, 12_345);
        assert_eq!(work.chapter_count, 3);
        assert_eq!(work.views, 7_890);
        assert_eq!(work.likes, 1_234);
        assert_eq!(work.comments, 42);
        assert_eq!(work.bookmarks, 56);
        assert_eq!(work.published_at, NaiveDate::from_ymd_opt(2024, 1, 15));

        let author = work.author.as_ref().unwrap();
        assert_eq!(author.platform_author_id, "nightwriter");
        assert_eq!(author.username, "nightwriter");
    }

    #[test]
    fn test_blurb_without_id_is_skipped() {
        let html =
            r#"<ol><li class="work blurb"><h4 class="heading"><a href="/works/1">T</a></h4></li></ol>"#;
        let (works, _) = parse_listing_page(html, &base_url());
        assert!(works.is_empty());
    }

    #[test]
    fn test_blurb_without_title_link_is_skipped() {
        let html = r#"<ol><li id="work_1" class="work blurb"><div class="stats"></div></li></ol>"#;
        let (works, _) = parse_listing_page(html, &base_url());
        assert!(works.is_empty());
    }

    #[test]
    fn test_next_page_detection() {
        let with_next = BLURB_HTML.replace(
            "</ol>",
            "</ol><ol class=\"pagination\"><li class=\"next\"><a href=\"?page=2\">Next</a></li></ol>",
        );
        let (_, has_next) = parse_listing_page(&with_next, &base_url());
        assert!(has_next);

        let (_, has_next) = parse_listing_page(BLURB_HTML, &base_url());
        assert!(!has_next);
    }

    fn detail_html(chapters: &str) -> String {
        format!(
            r##"<html><body>
            <div class="wrapper">
                <dl class="work meta group">
                    <dt>Rating:</dt>
                    <dd class="rating tags"><ul><li><a class="tag" href="#">Mature</a></li></ul></dd>
                    <dt>Fandom:</dt>
                    <dd class="fandom tags"><ul><li><a class="tag" href="#">Naruto</a></li></ul></dd>
                    <dt>Relationships:</dt>
                    <dd class="relationship tags"><ul><li><a class="tag" href="#">A/B</a></li></ul></dd>
                    <dt>Characters:</dt>
                    <dd class="character tags"><ul><li><a class="tag" href="#">A</a></li></ul></dd>
                    <dt>Additional Tags:</dt>
                    <dd class="freeform tags"><ul><li><a class="tag" href="#">Slow Burn</a></li></ul></dd>
                    <dt>Language:</dt><dd class="language">English</dd>
                </dl>
                <h2 class="title heading">Shifting Sands</h2>
                <h3 class="byline heading"><a rel="author" href="/users/duneswimmer">duneswimmer</a></h3>
                <div class="summary module">
                    <blockquote class="userstuff">Sand everywhere.</blockquote>
                </div>
                <dl class="stats">
                    <dt>Published:</dt><dd class="published">2023-06-01</dd>
                    <dt>Updated:</dt><dd class="status">2024-02-20</dd>
                    <dt>Words:</dt><dd class="words">88,000</dd>
                    <dt>Chapters:</dt><dd class="chapters">{}</dd>
                    <dt>Comments:</dt><dd class="comments">321</dd>
                    <dt>Kudos:</dt><dd class="kudos">4,500</dd>
                    <dt>Bookmarks:</dt><dd class="bookmarks">700</dd>
                    <dt>Hits:</dt><dd class="hits">123,456</dd>
                </dl>
            </div>
            </body></html>"##,
            chapters
        )
    }

    #[test]
    fn test_parse_detail_page() {
        let work = parse_detail_page(&detail_html("20/20"), "777", &base_url()).unwrap();

        assert_eq!(work.platform_work_id, "777");
        assert_eq!(work.title, "Shifting Sands");
        assert_eq!(work.rating, ContentRating::Mature);
        assert_eq!(work.fandoms, vec!["Naruto"]);
        assert_eq!(work.tags, vec!["Slow Burn"]);
        assert_eq!(work.chapter_count, 20);
        assert_eq!(work.word_count, 88_000);
        assert_eq!(work.views, 123_456);
        assert_eq!(work.published_at, NaiveDate::from_ymd_opt(2023, 6, 1));
        assert_eq!(work.updated_at, NaiveDate::from_ymd_opt(2024, 2, 20));
        assert_eq!(work.author.as_ref().unwrap().username, "duneswimmer");
    }

    #[test]
    fn test_detail_completion_inference() {
        // Published equals expected: completed
        let work = parse_detail_page(&detail_html("20/20"), "1", &base_url()).unwrap();
        assert_eq!(work.status, WorkStatus::Completed);

        // Unknown total: ongoing
        let work = parse_detail_page(&detail_html("5/?"), "1", &base_url()).unwrap();
        assert_eq!(work.status, WorkStatus::Ongoing);

        // Known but unequal total: ongoing
        let work = parse_detail_page(&detail_html("5/20"), "1", &base_url()).unwrap();
        assert_eq!(work.status, WorkStatus::Ongoing);
    }

    #[test]
    fn test_detail_error_page_yields_none() {
        let html = r#"<html><body><div class="error">Error 404</div></body></html>"#;
        assert!(parse_detail_page(html, "1", &base_url()).is_none());
    }

    #[test]
    fn test_parse_tag_statistics() {
        let html = r#"<html><body>
            <h2 class="heading">1 - 20 of 556,855 Works in Harry Potter - J. K. Rowling</h2>
            <dl>
                <dd class="rating tags"><ul>
                    <li><label>Teen And Up Audiences (200,000)</label></li>
                    <li><label>General Audiences (150,000)</label></li>
                </ul></dd>
                <dd class="freeform tags"><ul>
                    <li><label>Fluff (80,123)</label></li>
                </ul></dd>
                <dd class="relationship tags"><ul>
                    <li><label>A/B (30,000)</label></li>
                </ul></dd>
            </dl>
        </body></html>"#;

        let stats = parse_tag_statistics(html, "Harry Potter - J. K. Rowling");
        assert_eq!(stats.total_works, 556_855);
        assert_eq!(stats.ratings.len(), 2);
        assert_eq!(
            stats.ratings[0],
            TagCount {
                name: "Teen And Up Audiences".to_string(),
                count: 200_000
            }
        );
        assert_eq!(stats.freeform.len(), 1);
        assert_eq!(stats.relationships[0].count, 30_000);
        // Missing sections degrade to empty lists
        assert!(stats.warnings.is_empty());
        assert!(stats.categories.is_empty());
        assert!(stats.characters.is_empty());
    }

    #[test]
    fn test_tag_statistics_without_heading() {
        let stats = parse_tag_statistics("<html><body></body></html>", "Unknown");
        assert_eq!(stats.total_works, 0);
        assert!(stats.freeform.is_empty());
    }

    #[test]
    fn test_parse_fandom_directory() {
        let html = r##"<html><body><ul>
            <li class="medium listbox group">
                <h3 class="heading">Anime &amp; Manga</h3>
                <ol class="index group">
                    <li><a class="tag" href="#">Naruto</a> (120,000)</li>
                    <li><a class="tag" href="#">One Piece</a> (90,500)</li>
                </ol>
            </li>
            <li class="medium listbox group">
                <h3 class="heading">Books &amp; Literature</h3>
                <ol class="index group">
                    <li><a class="tag" href="#">Harry Potter - J. K. Rowling</a> (556,855)</li>
                </ol>
            </li>
        </ul></body></html>"##;

        let entries = parse_fandom_directory(html);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].name, "Naruto");
        assert_eq!(entries[0].work_count, 120_000);
        assert_eq!(entries[0].category.as_deref(), Some("Anime & Manga"));
        assert_eq!(entries[2].work_count, 556_855);
    }
}
