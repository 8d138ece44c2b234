//! Building the failure message from a report and the uploaded media.

use super::types::{Accessory, Block, TextObject};
use crate::media::{MediaKind, file_name_of};
use crate::naming::slugify;
use crate::report::{AggregateReport, Test};

/// Block Kit limits Slack enforces on `chat.postMessage`
pub const MAX_BLOCKS: usize = 50;
pub const MAX_SECTION_TEXT: usize = 3000;
pub const MAX_FIELD_TEXT: usize = 2000;

/// Opening line of every failure message
pub const INTRO_TEXT: &str = "Whoops! Looks like tests have fallen! Here is the report:";

/// Links placed in the closing context block
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageContext<'a> {
    /// Public URL of the HTML report
    pub report_url: &'a str,
    /// Human mention, e.g. `<@U024BE7LH>` or `<!here>`
    pub mention: Option<&'a str>,
    /// Link to the CI run, when it could be resolved
    pub back_link: Option<&'a str>,
}

/// Full block sequence: intro, one block per failed test in document order,
/// the media summary (when there is media) and the closing context.
pub fn build_blocks(report: &AggregateReport, media_urls: &[String], context: &MessageContext<'_>) -> Vec<Block> {
    let mut blocks = vec![Block::section(INTRO_TEXT)];

    blocks.extend(
        report
            .failed_tests()
            .into_iter()
            .map(|test| failure_block(test, media_urls)),
    );

    if let Some(block) = media_block(media_urls) {
        blocks.push(block);
    }

    blocks.push(Block::context(closing_text(context)));
    blocks
}

/// Block for one failed test, with the first matching screenshot attached
pub fn failure_block(test: &Test, media_urls: &[String]) -> Block {
    let mut text = format!("*{}*", escape_mrkdwn(&test.full_title));
    if let Some(summary) = test.error_summary() {
        text.push_str("\n\n>");
        text.push_str(&escape_mrkdwn(summary));
    }

    let block = Block::section(text);
    match find_screenshot(&test.title, media_urls) {
        Some(url) => block.with_accessory(Accessory::Image {
            image_url: url.to_string(),
            alt_text: test.full_title.clone(),
        }),
        None => block,
    }
}

/// First screenshot URL whose file name contains `title`.
///
/// A name matches when it contains the title verbatim, or when its slug
/// contains the title's slug (so `checkout flow` matches `checkout-flow.png`).
/// Blank titles match nothing.
pub fn find_screenshot<'a>(title: &str, media_urls: &'a [String]) -> Option<&'a str> {
    let title = title.trim();
    if title.is_empty() {
        return None;
    }
    let title_slug = slugify(title);

    media_urls
        .iter()
        .map(String::as_str)
        .filter(|url| MediaKind::from_name(url) == MediaKind::Screenshot)
        .find(|url| {
            let name = file_name_of(url);
            name.contains(title) || (!title_slug.is_empty() && slugify(&name).contains(&title_slug))
        })
}

/// Screenshot and video links, one field per non-empty kind
pub fn media_block(media_urls: &[String]) -> Option<Block> {
    let mut screenshots = Vec::new();
    let mut videos = Vec::new();

    for url in media_urls {
        let link = format!("<{}|{}>", url, escape_mrkdwn(&file_name_of(url)));
        match MediaKind::from_name(url) {
            MediaKind::Screenshot => screenshots.push(link),
            MediaKind::Video => videos.push(link),
            MediaKind::Other => {}
        }
    }

    let mut fields = Vec::new();
    if !screenshots.is_empty() {
        fields.push(TextObject::mrkdwn(format!("*Screenshots:*\n{}", screenshots.join("\n"))));
    }
    if !videos.is_empty() {
        fields.push(TextObject::mrkdwn(format!("*Videos:*\n{}", videos.join("\n"))));
    }

    (!fields.is_empty()).then(|| Block::fields(fields))
}

/// Closing line with mention, report link and optional run link
pub fn closing_text(context: &MessageContext<'_>) -> String {
    let mention = context
        .mention
        .filter(|m| !m.trim().is_empty())
        .map(|m| format!("{m}, "))
        .unwrap_or_default();

    let mut text = format!(
        "Hey, {mention}check it out! <{}|Full Report>.",
        context.report_url
    );
    if let Some(link) = context.back_link {
        text.push_str(&format!(" Run can be found <{link}|here>"));
    }
    text
}

/// Ways `blocks` exceed the Block Kit limits; empty when the message fits
pub fn limit_violations(blocks: &[Block]) -> Vec<String> {
    let mut violations = Vec::new();
    if blocks.len() > MAX_BLOCKS {
        violations.push(format!("{} blocks (limit {MAX_BLOCKS})", blocks.len()));
    }

    for (index, block) in blocks.iter().enumerate() {
        let Block::Section { text, fields, .. } = block else {
            continue;
        };
        if let Some(text) = text {
            let len = text.text().chars().count();
            if len > MAX_SECTION_TEXT {
                violations.push(format!("block {index}: text of {len} chars (limit {MAX_SECTION_TEXT})"));
            }
        }
        for field in fields {
            let len = field.text().chars().count();
            if len > MAX_FIELD_TEXT {
                violations.push(format!("block {index}: field of {len} chars (limit {MAX_FIELD_TEXT})"));
            }
        }
    }

    violations
}

/// Escape the three characters Slack treats as control sequences
fn escape_mrkdwn(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    fn failed(title: &str, full_title: &str, message: &str) -> Value {
        json!({ "title": title, "fullTitle": full_title, "state": "failed", "err": { "message": message } })
    }

    #[test]
    fn test_limit_violations() {
        let tests: Vec<Value> = (0..60)
            .map(|i| failed(&format!("t{i}"), &format!("suite t{i}"), "boom"))
            .collect();
        let urls: Vec<String> = (0..40)
            .map(|i| format!("{BASE}/screenshots/a-rather-long-spec-file-name.cy.js/screenshot-number-{i}.png"))
            .collect();
        let crowded = report(json!([{ "title": "", "tests": tests, "suites": [] }]));

        let violations = limit_violations(&build_blocks(&crowded, &urls, &MessageContext::default()));
        assert!(violations.iter().any(|v| v.starts_with("63 blocks")), "{violations:?}");
        assert!(violations.iter().any(|v| v.contains("field of")), "{violations:?}");

        let small = report(json!([{ "title": "", "tests": [failed("t", "suite t", "boom")], "suites": [] }]));
        assert!(limit_violations(&build_blocks(&small, &urls[..2], &MessageContext::default())).is_empty());
    }

    fn passed(title: &str) -> Value {
        json!({ "title": title, "fullTitle": title, "state": "passed", "err": {} })
    }

    fn report(results: Value) -> AggregateReport {
        serde_json::from_value(json!({ "stats": {}, "results": results })).unwrap()
    }

    const BASE: &str = "https://storage.googleapis.com/bucket/dir";

    #[test]
    fn test_matching_screenshot_becomes_accessory() {
        let urls = vec![
            format!("{BASE}/videos/login.cy.js.mp4"),
            format!("{BASE}/screenshots/renders-login-form.png"),
        ];
        let test: Test = serde_json::from_value(failed("renders login form", "Login renders login form", "boom")).unwrap();

        let block = failure_block(&test, &urls);
        assert_eq!(
            block.accessory(),
            Some(&Accessory::Image {
                image_url: format!("{BASE}/screenshots/renders-login-form.png"),
                alt_text: "Login renders login form".to_string(),
            })
        );
    }

    #[test]
    fn test_no_matching_screenshot_no_accessory() {
        let urls = vec![format!("{BASE}/screenshots/something-else.png")];
        let test: Test = serde_json::from_value(failed("renders login form", "Login renders login form", "boom")).unwrap();
        assert_eq!(failure_block(&test, &urls).accessory(), None);
    }

    #[test]
    fn test_first_match_wins() {
        let urls = vec![
            format!("{BASE}/screenshots/Cart%20--%20adds%20item%20(failed).png"),
            format!("{BASE}/screenshots/Cart%20--%20adds%20item%20twice%20(failed).png"),
        ];
        assert_eq!(find_screenshot("adds item twice", &urls), Some(urls[1].as_str()));
        assert_eq!(find_screenshot("adds item", &urls), Some(urls[0].as_str()));
        assert_eq!(find_screenshot("  ", &urls), None);
    }

    #[test]
    fn test_videos_are_never_accessories() {
        let urls = vec![format!("{BASE}/videos/checkout-flow.mp4")];
        assert_eq!(find_screenshot("checkout flow", &urls), None);
    }

    #[test]
    fn test_failure_text_uses_first_error_line() {
        let test: Test = serde_json::from_value(failed(
            "checkout flow",
            "Shop checkout flow",
            "CypressError: timeout exceeded\n\nwaiting for <button>",
        ))
        .unwrap();
        assert_eq!(
            failure_block(&test, &[]).text(),
            Some("*Shop checkout flow*\n\n>CypressError: timeout exceeded")
        );
    }

    #[test]
    fn test_one_block_per_failed_test_at_any_depth() {
        let report = report(json!([
            {
                "title": "",
                "tests": [failed("a", "a", "x"), passed("b")],
                "suites": [{
                    "title": "nested",
                    "tests": [failed("c", "nested c", "x")],
                    "suites": [{ "title": "deeper", "tests": [failed("d", "nested deeper d", "x"), passed("e")], "suites": [] }]
                }]
            }
        ]));

        let blocks = build_blocks(&report, &[], &MessageContext { report_url: "u", ..MessageContext::default() });
        // intro + 3 failures + closing, no media block
        assert_eq!(blocks.len(), 5);
        let titles: Vec<&str> = blocks[1..4].iter().filter_map(Block::text).collect();
        assert_eq!(titles, vec!["*a*\n\n>x", "*nested c*\n\n>x", "*nested deeper d*\n\n>x"]);
    }

    #[test]
    fn test_media_block_partitions() {
        let urls = vec![
            format!("{BASE}/screenshots/a%20b.png"),
            format!("{BASE}/videos/spec.cy.js.mp4"),
            format!("{BASE}/screenshots/c.png"),
        ];
        let block = media_block(&urls).unwrap();
        assert_eq!(
            serde_json::to_value(&block).unwrap(),
            json!({
                "type": "section",
                "fields": [
                    { "type": "mrkdwn", "text": format!("*Screenshots:*\n<{BASE}/screenshots/a%20b.png|a b.png>\n<{BASE}/screenshots/c.png|c.png>") },
                    { "type": "mrkdwn", "text": format!("*Videos:*\n<{BASE}/videos/spec.cy.js.mp4|spec.cy.js.mp4>") }
                ]
            })
        );
        assert_eq!(media_block(&[]), None);
    }

    #[test]
    fn test_closing_text_variants() {
        let minimal = MessageContext { report_url: "https://r", ..MessageContext::default() };
        assert_eq!(closing_text(&minimal), "Hey, check it out! <https://r|Full Report>.");

        let full = MessageContext {
            report_url: "https://r",
            mention: Some("<!here>"),
            back_link: Some("https://github.com/acme/shop/runs/42?check_suite_focus=true"),
        };
        assert_eq!(
            closing_text(&full),
            "Hey, <!here>, check it out! <https://r|Full Report>. Run can be found <https://github.com/acme/shop/runs/42?check_suite_focus=true|here>"
        );
    }
}
