use textwrap::dedent;

pub const INDEX_SYSTEM_PROMPT: &str = "You write compact, production-ready HTML/CSS/JS.";
pub const SCRIPT_SYSTEM_PROMPT: &str = "You write robust, minimal vanilla JS for static pages.";

fn bullet_list(items: &[String]) -> String {
    if items.is_empty() {
        return "- (none)".to_string();
    }
    items
        .iter()
        .map(|item| format!("- {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn index_html_prompt(brief: &str, checks: &[String], attachments: &[String]) -> String {
    let rules = dedent(
        "
        Rules:
        - No build step, no bundlers, no frameworks. Plain HTML+CSS+JS.
        - If checks mention Bootstrap, include its CSS from jsDelivr.
        - Create elements/IDs referenced in checks (e.g., #total-sales, #product-sales).
        - Parse query params if checks mention ?url= or ?token=.
        - If data files are present (e.g., data.csv, rates.json), load via fetch('./data.csv').
        - Include an aria-live region if instructed.
        - Keep the page accessible and responsive.
        - Link to style.css and script.js.

        Return ONLY the HTML for index.html.
        ",
    );
    format!(
        "You are a senior front-end engineer. Build a **static**, GitHub Pages-friendly\n\
         single-page app that satisfies:\n\n\
         Brief:\n{brief}\n\n\
         Checks to consider (selectors/behaviors expected by graders):\n{checks}\n\n\
         Attachments in repo (filenames):\n{attachments}\n{rules}",
        brief = brief,
        checks = bullet_list(checks),
        attachments = bullet_list(attachments),
        rules = rules,
    )
}

pub fn script_js_prompt(brief: &str, checks: &[String], attachments: &[String]) -> String {
    let requirements = dedent(
        "
        Requirements:
        - Implement the calculations/DOM updates implied by checks.
        - If 'data.csv' exists, fetch('./data.csv') and parse CSV to compute totals.
        - If 'rates.json' exists, fetch('./rates.json') and use it for conversion.
        - If checks reference localStorage or aria-live, implement it.
        - Populate the specific IDs referenced by checks (e.g., #github-created-at).
        - Keep JS short, commented, and robust.

        Return ONLY the JavaScript (no HTML).
        ",
    );
    format!(
        "Write vanilla JavaScript implementing the page logic.\n\n\
         Brief:\n{brief}\n\n\
         Checks:\n{checks}\n\n\
         Attachments available locally:\n{attachments}\n{requirements}",
        brief = brief,
        checks = bullet_list(checks),
        attachments = bullet_list(attachments),
        requirements = requirements,
    )
}
