//! Self-contained calendar widget document.
//!
//! Emits a single HTML file embedding the calendar snapshot as inline JSON
//! and the month navigation as inline script. The initial month grid is
//! rendered server-side from the projector's `MonthView`; the script
//! re-renders the grid with the same markup when navigating. Nothing is
//! fetched after generation.

use chrono::NaiveDate;
use petboard_core::calendar::CalendarIndex;
use petboard_core::project::{MonthView, NO_INFO};

const DAY_HEADERS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

const CSS: &str = r#"
    ::-webkit-scrollbar { display: none; }
    html { -ms-overflow-style: none; scrollbar-width: none; }

    :root {
        --bg-color: #ffffff;
        --text-color: #37352f;
        --grid-border: #e0e0e0;
        --hover-bg: #f7f7f5;
    }
    body {
        font-family: "Courier New", Courier, monospace;
        margin: 0;
        padding: 12px 20px 20px 20px;
        background-color: var(--bg-color);
        color: var(--text-color);
        display: flex;
        flex-direction: column;
        align-items: center;
    }
    .banner {
        width: 100%;
        max-width: 600px;
        padding: 8px 12px;
        margin-bottom: 10px;
        border-radius: 6px;
        background: #fdecea;
        color: #b71c1c;
        font-size: 0.85em;
    }
    .calendar-header {
        display: flex;
        align-items: center;
        justify-content: space-between;
        width: 100%;
        max-width: 600px;
    }
    .calendar-header h1 {
        margin: 0 0 10px 0;
        font-size: 0.9em;
        font-weight: bold;
    }
    .calendar-header button {
        border: none;
        background: none;
        font-family: inherit;
        font-size: 1em;
        cursor: pointer;
        color: var(--text-color);
    }
    .calendar-grid {
        display: grid;
        grid-template-columns: repeat(7, 1fr);
        gap: 8px;
        width: 100%;
        max-width: 600px;
    }
    .day-header {
        text-align: center;
        font-size: 0.8em;
        color: #999;
        padding-bottom: 8px;
    }
    .day-cell {
        aspect-ratio: 1 / 1;
        border-radius: 8px;
        background: #fff;
        box-shadow: 0 0 0 1px var(--grid-border);
        position: relative;
        cursor: pointer;
        transition: background 0.2s;
        display: flex;
        justify-content: center;
        align-items: center;
        font-size: 0.85em;
        font-weight: bold;
    }
    .day-cell:hover { background: var(--hover-bg); z-index: 10; }
    .day-cell.empty { background: transparent; box-shadow: none; cursor: default; }
    .today {
        background: #edf9ee;
        color: #1b5e20;
        box-shadow: 0 0 0 1px #1b5e20;
    }
    .tooltip {
        visibility: hidden;
        width: 200px;
        background-color: #333;
        color: #fff;
        text-align: left;
        border-radius: 6px;
        padding: 8px 12px;
        position: absolute;
        z-index: 100;
        bottom: 125%;
        left: 50%;
        margin-left: -100px;
        opacity: 0;
        transition: opacity 0.3s;
        font-size: 0.8em;
        font-weight: normal;
        pointer-events: none;
        box-shadow: 0 4px 12px rgba(0,0,0,0.15);
    }
    .tooltip::after {
        content: "";
        position: absolute;
        top: 100%;
        left: 50%;
        margin-left: -5px;
        border-width: 5px;
        border-style: solid;
        border-color: #333 transparent transparent transparent;
    }
    .day-cell:hover .tooltip { visibility: visible; opacity: 1; }
    .entry-item {
        margin-bottom: 4px;
        white-space: nowrap;
        overflow: hidden;
        text-overflow: ellipsis;
    }
    .has-entry::after {
        content: '';
        position: absolute;
        bottom: 6px;
        width: 4px;
        height: 4px;
        background-color: #eb5757;
        border-radius: 50%;
    }
"#;

// Placeholders are substituted with `str::replace`; the grid markup this
// script produces must stay in sync with `render_grid` below.
const SCRIPT: &str = r#"
const CALENDAR_DATA = __SNAPSHOT__;
const TODAY = "__TODAY__";
const NO_INFO = "__NO_INFO__";
const MONTH_NAMES = ["January", "February", "March", "April", "May", "June",
    "July", "August", "September", "October", "November", "December"];
const DAY_HEADERS = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
let pointer = { year: __YEAR__, month: __MONTH__ };

function daysInMonth(year, month) { return new Date(year, month, 0).getDate(); }
function pad(n) { return String(n).padStart(2, "0"); }

function render() {
    document.getElementById("month-label").textContent =
        MONTH_NAMES[pointer.month - 1] + " " + pointer.year;
    let html = "";
    for (const header of DAY_HEADERS) {
        html += '<div class="day-header">' + header + '</div>';
    }
    const blanks = new Date(pointer.year, pointer.month - 1, 1).getDay();
    for (let i = 0; i < blanks; i++) {
        html += '<div class="day-cell empty"></div>';
    }
    const total = daysInMonth(pointer.year, pointer.month);
    for (let day = 1; day <= total; day++) {
        const key = pointer.year + "-" + pad(pointer.month) + "-" + pad(day);
        const entries = CALENDAR_DATA[key] || [];
        let classes = "day-cell";
        if (key === TODAY) classes += " today";
        if (entries.length > 0) classes += " has-entry";
        const tooltip = entries.length > 0
            ? entries.map(e => '<div class="entry-item">' + e.display + '</div>').join("")
            : '<div class="entry-item">' + NO_INFO + '</div>';
        html += '<div class="' + classes + '">' + day +
            '<div class="tooltip">' + tooltip + '</div></div>';
    }
    document.getElementById("grid").innerHTML = html;
}

document.getElementById("prev").addEventListener("click", () => {
    if (pointer.month === 1) { pointer.year -= 1; pointer.month = 12; }
    else { pointer.month -= 1; }
    render();
});
document.getElementById("next").addEventListener("click", () => {
    if (pointer.month === 12) { pointer.year += 1; pointer.month = 1; }
    else { pointer.month += 1; }
    render();
});
"#;

/// Render the complete widget document.
pub fn render_document(
    pet_name: &str,
    view: &MonthView,
    index: &CalendarIndex,
    today: NaiveDate,
    banner: Option<&str>,
) -> String {
    let snapshot = serde_json::to_string(index)
        .unwrap_or_else(|_| String::from("{}"))
        .replace("</", "<\\/");

    let script = SCRIPT
        .replace("__SNAPSHOT__", &snapshot)
        .replace("__TODAY__", &today.format("%Y-%m-%d").to_string())
        .replace("__NO_INFO__", NO_INFO)
        .replace("__YEAR__", &view.year.to_string())
        .replace("__MONTH__", &view.month.to_string());

    let banner_html = banner
        .map(|message| format!("<div class=\"banner\">{}</div>\n", escape(message)))
        .unwrap_or_default();

    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head>\n\
         <meta charset=\"UTF-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
         <title>{title}</title>\n\
         <style>{CSS}</style>\n\
         </head>\n\
         <body>\n\
         {banner_html}\
         <div class=\"calendar-header\">\n\
         <button id=\"prev\" aria-label=\"Previous month\">&lt;</button>\n\
         <h1 id=\"month-label\">{label}</h1>\n\
         <button id=\"next\" aria-label=\"Next month\">&gt;</button>\n\
         </div>\n\
         <div class=\"calendar-grid\" id=\"grid\">\n{grid}</div>\n\
         <script>{script}</script>\n\
         </body>\n\
         </html>\n",
        title = escape(&format!("{pet_name}'s Month")),
        label = escape(&view.label),
        grid = render_grid(view),
    )
}

/// Server-side rendering of the initial month grid. Markup mirrors the
/// inline script's `render` function exactly.
fn render_grid(view: &MonthView) -> String {
    let mut out = String::new();
    for header in DAY_HEADERS {
        out.push_str(&format!("<div class=\"day-header\">{header}</div>\n"));
    }
    for _ in 0..view.leading_blanks {
        out.push_str("<div class=\"day-cell empty\"></div>\n");
    }
    for cell in &view.days {
        let mut classes = String::from("day-cell");
        if cell.is_today {
            classes.push_str(" today");
        }
        if !cell.entries.is_empty() {
            classes.push_str(" has-entry");
        }
        let tooltip: String = if cell.entries.is_empty() {
            format!("<div class=\"entry-item\">{NO_INFO}</div>")
        } else {
            cell.entries
                .iter()
                .map(|entry| format!("<div class=\"entry-item\">{}</div>", escape(entry)))
                .collect()
        };
        out.push_str(&format!(
            "<div class=\"{classes}\">{day}<div class=\"tooltip\">{tooltip}</div></div>\n",
            day = cell.day,
        ));
    }
    out
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use petboard_core::calendar::CalendarEntry;
    use petboard_core::project::{month_view, ViewState};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_grid_cell_counts() {
        let today = date(2026, 2, 3);
        let view = month_view(ViewState::at(today), &CalendarIndex::new(), today);
        let grid = render_grid(&view);

        assert_eq!(grid.matches("day-header").count(), 7);
        assert_eq!(grid.matches("day-cell empty").count(), view.leading_blanks as usize);
        assert_eq!(
            grid.matches("<div class=\"day-cell").count(),
            view.leading_blanks as usize + view.days.len()
        );
        assert_eq!(grid.matches("today").count(), 1);
    }

    #[test]
    fn test_empty_index_renders_placeholder_everywhere() {
        let today = date(2026, 2, 3);
        let view = month_view(ViewState::at(today), &CalendarIndex::new(), today);
        let grid = render_grid(&view);
        assert_eq!(grid.matches(NO_INFO).count(), view.days.len());
    }

    #[test]
    fn test_entries_render_and_escape() {
        let mut index = CalendarIndex::new();
        index.insert(
            "2026-02-03".to_string(),
            vec![CalendarEntry {
                id: "a".to_string(),
                title: "<b>Vet</b>".to_string(),
                emoji: "💊".to_string(),
                display: "💊 <b>Vet</b>".to_string(),
            }],
        );
        let today = date(2026, 2, 3);
        let view = month_view(ViewState::at(today), &index, today);
        let grid = render_grid(&view);

        assert!(grid.contains("has-entry"));
        assert!(grid.contains("💊 &lt;b&gt;Vet&lt;/b&gt;"));
        assert!(!grid.contains("<b>Vet</b>"));
    }

    #[test]
    fn test_document_embeds_snapshot_and_banner() {
        let mut index = CalendarIndex::new();
        index.insert(
            "2026-02-03".to_string(),
            vec![CalendarEntry {
                id: "a".to_string(),
                title: "Walk".to_string(),
                emoji: "📝".to_string(),
                display: "📝 Walk".to_string(),
            }],
        );
        let today = date(2026, 2, 3);
        let view = month_view(ViewState::at(today), &index, today);
        let html = render_document("Milk", &view, &index, today, Some("Health Log not found"));

        assert!(html.contains("Milk's Month"));
        assert!(html.contains("\"2026-02-03\""));
        assert!(html.contains("const TODAY = \"2026-02-03\""));
        assert!(html.contains("class=\"banner\""));
        assert!(html.contains("Health Log not found"));
        assert!(html.contains("February 2026"));
    }

    #[test]
    fn test_script_closing_tags_are_broken_in_snapshot() {
        let mut index = CalendarIndex::new();
        index.insert(
            "2026-02-03".to_string(),
            vec![CalendarEntry {
                id: "a".to_string(),
                title: "</script>".to_string(),
                emoji: "📝".to_string(),
                display: "📝 </script>".to_string(),
            }],
        );
        let today = date(2026, 2, 3);
        let view = month_view(ViewState::at(today), &index, today);
        let html = render_document("Milk", &view, &index, today, None);
        assert!(!html.contains("</script>\"}]"));
    }
}
