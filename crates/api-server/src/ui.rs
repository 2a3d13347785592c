//! Server-rendered HTML for the recommender UI.

use bookrec_core::{Recommendation, RecommenderError};
use std::fmt::Write;

pub const NO_MODEL_NOTICE: &str = "No trained model yet. Train the recommender system first.";

const STYLE: &str = r#"
body { background-color: #1a1a2e; color: #ffffff; font-family: 'Roboto', sans-serif; margin: 0 40px; }
h1 { font-family: 'Playfair Display', serif; text-align: center; padding: 20px 0; font-size: 3rem; }
h2 { border-bottom: 3px solid #3282b8; padding-bottom: 10px; margin-top: 30px; }
.caption { color: #b0bec5; font-size: 14px; }
button { background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); color: white; border-radius: 25px;
         padding: 12px 30px; font-size: 16px; font-weight: 600; border: none; cursor: pointer; }
select { border-radius: 10px; border: 2px solid #3282b8; padding: 8px; min-width: 50%; }
.notice { margin: 16px 0; font-style: italic; }
.grid { display: grid; grid-template-columns: repeat(5, 1fr); gap: 20px; margin-top: 20px; }
.grid img { width: 100%; border-radius: 6px; }
hr { border: 0; height: 2px; background: linear-gradient(to right, transparent, #3282b8, transparent); margin: 30px 0; }
"#;

/// Everything the main page can show.
pub struct Page<'a> {
    pub book_names: &'a [String],
    pub selected: Option<&'a str>,
    pub notice: Option<String>,
    pub recommendation: Option<&'a Recommendation>,
}

pub fn render_page(page: &Page<'_>) -> String {
    let mut html = String::with_capacity(4096 + page.book_names.len() * 64);
    header(&mut html);

    html.push_str("<h2>Model Training</h2>\n");
    html.push_str("<p class=\"caption\">Click below to train or retrain the recommendation model</p>\n");
    html.push_str("<form method=\"post\" action=\"/train\"><button type=\"submit\">Train Recommender System</button></form>\n");
    if let Some(notice) = &page.notice {
        let _ = writeln!(html, "<p class=\"notice\">{}</p>", escape(notice));
    }
    html.push_str("<hr>\n");

    html.push_str("<h2>Get Book Recommendations</h2>\n");
    html.push_str("<p class=\"caption\">Select a book you enjoyed, and we'll suggest similar titles</p>\n");
    html.push_str("<form method=\"get\" action=\"/recommend\">\n");
    html.push_str("<label for=\"title\">Choose a book from the dropdown</label><br>\n<select id=\"title\" name=\"title\">\n");
    for name in page.book_names {
        let selected = if page.selected == Some(name.as_str()) { " selected" } else { "" };
        let name = escape(name);
        let _ = writeln!(html, "<option value=\"{}\"{}>{}</option>", name, selected, name);
    }
    html.push_str("</select>\n<button type=\"submit\">Show Recommendations</button>\n</form>\n");

    if let Some(recommendation) = page.recommendation {
        html.push_str("<div class=\"grid\">\n");
        for (title, url) in recommendation.titles.iter().zip(&recommendation.poster_urls) {
            let _ = writeln!(
                html,
                "<div><p>{}</p><img src=\"{}\" alt=\"{}\"></div>",
                escape(title),
                escape(url),
                escape(title)
            );
        }
        html.push_str("</div>\n");
    }

    footer(&mut html);
    html
}

pub fn render_error(err: &RecommenderError) -> String {
    let mut html = String::new();
    header(&mut html);
    let _ = writeln!(html, "<h2>Something went wrong</h2>\n<pre>{}</pre>", escape(&err.to_string()));
    html.push_str("<p><a href=\"/\" style=\"color:#3282b8\">Back</a></p>\n");
    footer(&mut html);
    html
}

fn header(html: &mut String) {
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>Book Recommender System</title>\n<style>");
    html.push_str(STYLE);
    html.push_str("</style>\n</head>\n<body>\n<h1>Book Recommender System</h1>\n<hr>\n");
}

fn footer(html: &mut String) {
    html.push_str("</body>\n</html>\n");
}

/// Escape text for HTML element content and double-quoted attributes.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
